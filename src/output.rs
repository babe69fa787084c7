use std::fs;
use std::io::{self, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;

use crate::aggregate::SequenceTable;
use crate::app::{BuildResult, ProgressEvent, ProgressSink, SpeciesCoverage};
use crate::client::FailedQuery;
use crate::error::RefDbError;
use crate::fasta::write_record;

pub const DEFAULT_PREFIX: &str = "northeast";
pub const TAXONOMY_HEADER: [&str; 5] = ["species", "superfamily", "family", "genus", "species_name"];

const REPORT_FAILED_LIMIT: usize = 25;
const REPORT_REPLACED_LIMIT: usize = 20;
const FAILED_QUERY_WIDTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputNames {
    pub fasta: String,
    pub taxonomy: String,
    pub report: String,
}

impl OutputNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            fasta: format!("{prefix}_reference_proteins.fasta"),
            taxonomy: format!("{prefix}_taxonomy.tsv"),
            report: format!("{prefix}_protein_report.txt"),
        }
    }
}

impl Default for OutputNames {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub fasta: Utf8PathBuf,
    pub taxonomy: Utf8PathBuf,
    pub report: Utf8PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: &Utf8Path, names: &OutputNames) -> Self {
        Self {
            fasta: dir.join(&names.fasta),
            taxonomy: dir.join(&names.taxonomy),
            report: dir.join(&names.report),
        }
    }
}

/// Everything the coverage report summarizes.
pub struct ReportInput<'a> {
    pub title: &'a str,
    pub generated_at: DateTime<Local>,
    pub table: &'a SequenceTable,
    pub request_count: u64,
    pub failed: &'a [FailedQuery],
    pub coverage: &'a [SpeciesCoverage],
}

/// `>composite_id description` followed by the wrapped residues, sorted by id.
pub fn write_sequence_file<W: Write>(writer: &mut W, table: &SequenceTable) -> io::Result<()> {
    for record in table.records() {
        let header = format!("{} {}", record.composite_id, record.description);
        write_record(writer, &header, &record.sequence)?;
    }
    Ok(())
}

pub fn write_taxonomy_file<W: Write>(writer: W, table: &SequenceTable) -> io::Result<()> {
    let mut tsv = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);
    tsv.write_record(TAXONOMY_HEADER)?;
    for row in table.taxonomy() {
        tsv.write_record([
            row.organism.as_str(),
            row.superfamily.as_str(),
            row.family.as_str(),
            row.genus.as_str(),
            row.species_epithet.as_str(),
        ])?;
    }
    tsv.flush()
}

pub fn write_report<W: Write>(writer: &mut W, input: &ReportInput<'_>) -> io::Result<()> {
    let table = input.table;
    writeln!(writer, "{}", input.title)?;
    writeln!(writer, "{}", "=".repeat(input.title.chars().count().max(1)))?;
    writeln!(
        writer,
        "Generated: {}",
        input.generated_at.to_rfc3339_opts(SecondsFormat::Secs, false)
    )?;
    writeln!(writer)?;
    writeln!(writer, "Total sequences: {}", table.len())?;
    writeln!(writer, "Total requests: {}", input.request_count)?;
    writeln!(writer, "Failed queries: {}", input.failed.len())?;
    writeln!(writer, "Replaced records: {}", table.replaced_ids().len())?;

    writeln!(writer)?;
    writeln!(writer, "Sequences by category:")?;
    for (category, count) in table.counts_by_category() {
        writeln!(writer, "  {:<20}: {:>4}", category.to_string(), count)?;
    }

    writeln!(writer)?;
    writeln!(writer, "Sequences by protein:")?;
    for (label, count) in table.counts_by_protein() {
        writeln!(writer, "  {:<25}: {:>4}", label, count)?;
    }

    if !input.coverage.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Species coverage:")?;
        for species in input.coverage {
            let marker = if species.records == 0 { "  [no records]" } else { "" };
            writeln!(
                writer,
                "  {} ({}) [{}]: {:>4}{}",
                species.scientific_name, species.common_name, species.category, species.records, marker
            )?;
        }
        let missing = input.coverage.iter().filter(|s| s.records == 0).count();
        writeln!(writer, "Species without records: {missing}")?;
    }

    let replaced = table.replaced_ids();
    if !replaced.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Replaced records (first {REPORT_REPLACED_LIMIT}):")?;
        for id in replaced.iter().take(REPORT_REPLACED_LIMIT) {
            writeln!(writer, "  - {id}")?;
        }
    }

    if !input.failed.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Failed queries (first {REPORT_FAILED_LIMIT}):")?;
        for failure in input.failed.iter().take(REPORT_FAILED_LIMIT) {
            writeln!(
                writer,
                "  - {}: {}",
                truncate(&failure.query_text, FAILED_QUERY_WIDTH),
                failure.error_reason
            )?;
        }
    }
    Ok(())
}

/// Writes all three artifacts into their final locations. Each file is
/// staged next to its destination and renamed into place.
pub fn write_outputs(paths: &OutputPaths, input: &ReportInput<'_>) -> Result<(), RefDbError> {
    write_atomic(&paths.fasta, |writer| write_sequence_file(writer, input.table))?;
    write_atomic(&paths.taxonomy, |writer| write_taxonomy_file(writer, input.table))?;
    write_atomic(&paths.report, |writer| write_report(writer, input))?;
    Ok(())
}

fn write_atomic<F>(dest: &Utf8Path, fill: F) -> Result<(), RefDbError>
where
    F: FnOnce(&mut BufWriter<&mut fs::File>) -> io::Result<()>,
{
    let parent = match dest.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| RefDbError::Filesystem(format!("create {parent}: {err}")))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".marker-refdb")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| RefDbError::Filesystem(err.to_string()))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        fill(&mut writer).map_err(|err| RefDbError::Filesystem(format!("write {dest}: {err}")))?;
        writer
            .flush()
            .map_err(|err| RefDbError::Filesystem(format!("write {dest}: {err}")))?;
    }
    temp.persist(dest.as_std_path())
        .map_err(|err| RefDbError::Filesystem(format!("persist {dest}: {err}")))?;
    Ok(())
}

fn truncate(text: &str, width: usize) -> &str {
    match text.char_indices().nth(width) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_build(result: &BuildResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
