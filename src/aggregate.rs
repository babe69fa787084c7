use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::Category;
use crate::names::genus_of;
use crate::uniprot::ProteinHit;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceRecord {
    pub composite_id: String,
    pub sequence: String,
    pub description: String,
    pub accession: String,
    pub organism: String,
    pub protein_label: String,
    pub category: Category,
    pub taxon_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted,
    /// An existing record with different content was overwritten.
    Replaced,
    /// Identical to the record already stored.
    Unchanged,
    Discarded,
}

impl IngestOutcome {
    pub fn is_stored(self) -> bool {
        !matches!(self, IngestOutcome::Discarded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyEntry {
    pub organism: String,
    pub superfamily: String,
    pub family: String,
    pub genus: String,
    pub species_epithet: String,
    pub taxon_id: String,
}

pub fn composite_id(accession: &str, organism: &str, protein_label: &str) -> String {
    format!("{accession}_{}_{protein_label}", organism.replace(' ', "_"))
}

/// Run-wide table of sequences keyed by composite id.
#[derive(Debug, Default)]
pub struct SequenceTable {
    records: BTreeMap<String, SequenceRecord>,
    replaced: Vec<String>,
}

impl SequenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one repository hit into the table. Later hits with the same
    /// composite id win.
    pub fn ingest(
        &mut self,
        hit: &ProteinHit,
        protein_label: &str,
        category: Category,
        fallback_organism: &str,
    ) -> IngestOutcome {
        if hit.sequence.is_empty() {
            return IngestOutcome::Discarded;
        }
        let organism = hit
            .organism
            .clone()
            .unwrap_or_else(|| fallback_organism.trim().to_string());
        let protein_name = hit.protein_name.as_deref().unwrap_or(protein_label);
        let id = composite_id(&hit.accession, &organism, protein_label);
        let record = SequenceRecord {
            composite_id: id.clone(),
            sequence: hit.sequence.clone(),
            description: format!("{protein_name} [{organism}]"),
            accession: hit.accession.clone(),
            organism,
            protein_label: protein_label.to_string(),
            category,
            taxon_id: hit.taxon_id.map(|id| id.to_string()).unwrap_or_default(),
        };

        match self.records.insert(id.clone(), record) {
            None => IngestOutcome::Inserted,
            Some(previous) if previous == self.records[&id] => IngestOutcome::Unchanged,
            Some(_) => {
                self.replaced.push(id);
                IngestOutcome::Replaced
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, composite_id: &str) -> Option<&SequenceRecord> {
        self.records.get(composite_id)
    }

    /// Records in composite-id order.
    pub fn records(&self) -> impl Iterator<Item = &SequenceRecord> {
        self.records.values()
    }

    /// Composite ids whose earlier content was overwritten, in event order.
    pub fn replaced_ids(&self) -> &[String] {
        &self.replaced
    }

    pub fn counts_by_category(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.values() {
            *counts.entry(record.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn counts_by_protein(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.values() {
            *counts.entry(record.protein_label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// One row per distinct organism, sorted by organism name.
    pub fn taxonomy(&self) -> Vec<TaxonomyEntry> {
        let mut by_organism: BTreeMap<&str, TaxonomyEntry> = BTreeMap::new();
        for record in self.records.values() {
            let entry = by_organism
                .entry(record.organism.as_str())
                .or_insert_with(|| taxonomy_entry(&record.organism, record.category));
            if entry.taxon_id.is_empty() {
                entry.taxon_id = record.taxon_id.clone();
            }
        }
        by_organism.into_values().collect()
    }
}

fn taxonomy_entry(organism: &str, category: Category) -> TaxonomyEntry {
    let genus = genus_of(organism).to_string();
    let species_epithet = organism
        .split_whitespace()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    TaxonomyEntry {
        organism: organism.to_string(),
        superfamily: category.superfamily().to_string(),
        family: genus.clone(),
        genus,
        species_epithet,
        taxon_id: String::new(),
    }
}
