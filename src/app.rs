use std::time::{Duration, Instant};

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::SequenceTable;
use crate::catalog::Catalog;
use crate::client::{FailedQuery, RateLimitedClient, RateLimits};
use crate::config::{MaxResults, ResolvedConfig};
use crate::domain::{Category, ProteinTarget, ResolvedName, Species, SpeciesList, TargetQuery};
use crate::error::RefDbError;
use crate::fasta::parse_fasta;
use crate::names;
use crate::output::{OutputPaths, ReportInput, write_outputs};
use crate::query::{QueryBuilder, QueryStage};
use crate::targets::{Domain, TargetSets};
use crate::uniprot::{ProteinHit, UniprotClient};

/// Label for records found by an organism-wide fallback search.
pub const ORGANISM_SEARCH_LABEL: &str = "organism_search";
const NARROW_PRIMARY_CAP: usize = 2;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Forwards progress to the tracing subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub reviewed_only: bool,
    pub rate_limits: RateLimits,
    pub max_results: MaxResults,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            reviewed_only: true,
            rate_limits: RateLimits::default(),
            max_results: MaxResults::default(),
        }
    }
}

impl From<&ResolvedConfig> for RunSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            reviewed_only: config.reviewed_only,
            rate_limits: config.rate_limits,
            max_results: config.max_results,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesCoverage {
    pub scientific_name: String,
    pub common_name: String,
    pub category: Category,
    pub resolved_name: String,
    /// Records this species added or refreshed in the table.
    pub records: usize,
    pub escalations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub sequences: usize,
    pub requests: u64,
    pub failed_queries: usize,
    pub replaced_records: usize,
    pub species_processed: usize,
    pub species_without_records: usize,
    pub fasta_path: String,
    pub taxonomy_path: String,
    pub report_path: String,
}

pub struct App<U: UniprotClient> {
    client: RateLimitedClient<U>,
    table: SequenceTable,
    queries: QueryBuilder,
    targets: TargetSets,
    max_results: MaxResults,
    coverage: Vec<SpeciesCoverage>,
}

impl<U: UniprotClient> App<U> {
    pub fn new(uniprot: U, settings: RunSettings) -> Self {
        Self {
            client: RateLimitedClient::new(uniprot, settings.rate_limits),
            table: SequenceTable::new(),
            queries: QueryBuilder::new(settings.reviewed_only),
            targets: TargetSets::default(),
            max_results: settings.max_results,
            coverage: Vec::new(),
        }
    }

    pub fn with_targets(mut self, targets: TargetSets) -> Self {
        self.targets = targets;
        self
    }

    /// Search pipeline: every listed species against its domain's targets,
    /// section by section.
    pub fn process_species_list(&mut self, species: &SpeciesList, sink: &dyn ProgressSink) {
        let start = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Search; species={}", species.len()),
            elapsed: None,
        });
        for (idx, entry) in species.iter().enumerate() {
            sink.event(ProgressEvent {
                message: format!(
                    "[{}/{}] {} ({})",
                    idx + 1,
                    species.len(),
                    entry.common_name,
                    entry.scientific_name
                ),
                elapsed: Some(start.elapsed()),
            });
            self.process_species(entry);
        }
        sink.event(ProgressEvent {
            message: format!(
                "phase=Search done; sequences={} requests={}",
                self.table.len(),
                self.client.request_count()
            ),
            elapsed: Some(start.elapsed()),
        });
    }

    pub fn process_species(&mut self, species: &Species) {
        let resolved = names::resolve(&species.scientific_name);
        let (domain, targets) = self.targets.for_species(species);
        debug!(
            species = %species.scientific_name,
            canonical = %resolved.canonical_name,
            genus_level = resolved.is_genus_level,
            ?domain,
            targets = targets.len(),
            "resolved species"
        );
        let mut coverage = SpeciesCoverage {
            scientific_name: species.scientific_name.clone(),
            common_name: species.common_name.clone(),
            category: species.category,
            resolved_name: resolved.canonical_name.clone(),
            records: 0,
            escalations: 0,
        };
        for target in &targets {
            self.process_target(species, &resolved, domain, target, &mut coverage);
        }
        self.record_coverage(coverage);
    }

    /// Accession-table pipeline: curated accessions per species, with an
    /// organism-wide search for species that list none.
    pub fn process_catalog(&mut self, catalog: &Catalog, sink: &dyn ProgressSink) {
        let start = Instant::now();
        sink.event(ProgressEvent {
            message: format!(
                "phase=Fetch; species={} accessions={}",
                catalog.len(),
                catalog.accession_count()
            ),
            elapsed: None,
        });
        for (idx, entry) in catalog.entries().iter().enumerate() {
            sink.event(ProgressEvent {
                message: format!(
                    "[{}/{}] {} ({}) {}",
                    idx + 1,
                    catalog.len(),
                    entry.species.common_name,
                    entry.species.scientific_name,
                    entry.group
                ),
                elapsed: Some(start.elapsed()),
            });
            let species = &entry.species;
            let resolved = ResolvedName::species(species.scientific_name.trim());
            let mut coverage = SpeciesCoverage {
                scientific_name: species.scientific_name.clone(),
                common_name: species.common_name.clone(),
                category: species.category,
                resolved_name: resolved.canonical_name.clone(),
                records: 0,
                escalations: 0,
            };
            if entry.needs_organism_search() {
                self.organism_fallback(species, &mut coverage);
            }
            for target in &entry.targets {
                self.process_target(species, &resolved, Domain::of(species), target, &mut coverage);
            }
            self.record_coverage(coverage);
        }
        sink.event(ProgressEvent {
            message: format!(
                "phase=Fetch done; sequences={} requests={}",
                self.table.len(),
                self.client.request_count()
            ),
            elapsed: Some(start.elapsed()),
        });
    }

    /// Writes the three artifacts. Empty tables still produce well-formed files.
    pub fn finish(&self, paths: &OutputPaths, title: &str) -> Result<BuildResult, RefDbError> {
        if self.table.is_empty() {
            warn!("no sequences collected; writing empty outputs");
        }
        let input = ReportInput {
            title,
            generated_at: Local::now(),
            table: &self.table,
            request_count: self.client.request_count(),
            failed: self.client.failed_queries(),
            coverage: &self.coverage,
        };
        write_outputs(paths, &input)?;
        info!(
            sequences = self.table.len(),
            requests = self.client.request_count(),
            failed = self.client.failed_queries().len(),
            "outputs written"
        );

        Ok(BuildResult {
            sequences: self.table.len(),
            requests: self.client.request_count(),
            failed_queries: self.client.failed_queries().len(),
            replaced_records: self.table.replaced_ids().len(),
            species_processed: self.coverage.len(),
            species_without_records: self.coverage.iter().filter(|c| c.records == 0).count(),
            fasta_path: paths.fasta.to_string(),
            taxonomy_path: paths.taxonomy.to_string(),
            report_path: paths.report.to_string(),
        })
    }

    pub fn table(&self) -> &SequenceTable {
        &self.table
    }

    pub fn coverage(&self) -> &[SpeciesCoverage] {
        &self.coverage
    }

    pub fn request_count(&self) -> u64 {
        self.client.request_count()
    }

    pub fn failed_queries(&self) -> &[FailedQuery] {
        self.client.failed_queries()
    }

    fn process_target(
        &mut self,
        species: &Species,
        resolved: &ResolvedName,
        domain: Domain,
        target: &ProteinTarget,
        coverage: &mut SpeciesCoverage,
    ) {
        match &target.query {
            TargetQuery::Predicate(predicate) => {
                let queries = match domain {
                    Domain::Fungal => QueryBuilder::new(false),
                    _ => self.queries,
                };
                let primary_cap = match domain {
                    Domain::Animal => self.max_results.primary,
                    Domain::Plant | Domain::Fungal => self.max_results.primary.min(NARROW_PRIMARY_CAP),
                };
                let escalated_cap = self.max_results.escalated;
                let client = &mut self.client;
                let outcome = queries.run_escalating(resolved, predicate, |stage, query| {
                    let cap = match stage {
                        QueryStage::Primary => primary_cap,
                        QueryStage::Escalated => escalated_cap,
                    };
                    client.search(query, cap)
                });
                // Failures are already in the client's log.
                let Ok(outcome) = outcome else { return };
                if outcome.stage == QueryStage::Escalated {
                    coverage.escalations += 1;
                    debug!(species = %species.scientific_name, label = %target.label, "escalated to genus");
                }
                self.ingest_all(&outcome.entries, &target.label, species, coverage);
            }
            TargetQuery::Accessions(accessions) => {
                for accession in accessions {
                    let Ok(text) = self.client.fetch_by_accession(accession) else {
                        continue;
                    };
                    let hits: Vec<ProteinHit> = parse_fasta(&text)
                        .iter()
                        .filter_map(ProteinHit::from_fasta)
                        .collect();
                    if hits.is_empty() {
                        warn!(accession = %accession, "entry returned no sequence");
                    }
                    self.ingest_all(&hits, &target.label, species, coverage);
                }
            }
        }
    }

    fn record_coverage(&mut self, coverage: SpeciesCoverage) {
        if coverage.records == 0 {
            warn!(species = %coverage.scientific_name, "no records collected");
        } else {
            info!(
                species = %coverage.scientific_name,
                records = coverage.records,
                escalations = coverage.escalations,
                "species done"
            );
        }
        self.coverage.push(coverage);
    }

    fn organism_fallback(&mut self, species: &Species, coverage: &mut SpeciesCoverage) {
        let query = self.queries.organism_search(&species.scientific_name);
        let Ok(hits) = self.client.broad_search(&query, self.max_results.broad) else {
            return;
        };
        self.ingest_all(&hits, ORGANISM_SEARCH_LABEL, species, coverage);
    }

    /// Entries without an organism are filed under the species' listed name.
    fn ingest_all(
        &mut self,
        hits: &[ProteinHit],
        label: &str,
        species: &Species,
        coverage: &mut SpeciesCoverage,
    ) {
        for hit in hits {
            let outcome = self.table.ingest(
                hit,
                label,
                species.category,
                species.scientific_name.trim(),
            );
            if outcome.is_stored() {
                coverage.records += 1;
            }
        }
    }
}
