use std::io::{self, Write};

pub const LINE_WIDTH: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// Header line without the leading `>`.
    pub header: String,
    pub sequence: String,
}

/// Splits a residue string into lines of at most `width` characters.
pub fn wrap(sequence: &str, width: usize) -> Vec<&str> {
    let width = width.max(1);
    let mut lines = Vec::with_capacity(sequence.len() / width + 1);
    let mut start = 0usize;
    let mut count = 0usize;
    for (idx, _) in sequence.char_indices() {
        if count == width {
            lines.push(&sequence[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < sequence.len() {
        lines.push(&sequence[start..]);
    }
    lines
}

pub fn write_record<W: Write>(writer: &mut W, header: &str, sequence: &str) -> io::Result<()> {
    writeln!(writer, ">{header}")?;
    for line in wrap(sequence, LINE_WIDTH) {
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

pub fn parse_fasta(text: &str) -> Vec<FastaRecord> {
    let mut records = Vec::new();
    let mut current: Option<FastaRecord> = None;
    for line in text.lines() {
        let line = line.trim_end();
        if let Some(header) = line.strip_prefix('>') {
            if let Some(record) = current.take() {
                records.push(record);
            }
            current = Some(FastaRecord {
                header: header.to_string(),
                sequence: String::new(),
            });
        } else if let Some(record) = current.as_mut() {
            record.sequence.push_str(line.trim());
        }
    }
    if let Some(record) = current {
        records.push(record);
    }
    records
}
