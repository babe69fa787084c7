//! Curated species-to-accession tables.
//!
//! Tables are immutable JSON documents keyed by `Genus_species`, either
//! embedded in the binary or read from disk:
//!
//! ```json
//! { "Odocoileus_virginianus": {
//!     "common_name": "White-tailed deer",
//!     "category": "Mammal - Ungulate",
//!     "proteins": { "COL1A1": ["P02453"] } } }
//! ```

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::{Accession, Category, ProteinTarget, Species, TargetQuery};
use crate::error::RefDbError;

const NORTHEAST_JSON: &str = include_str!("../data/northeast_catalog.json");
const PLANTS_JSON: &str = include_str!("../data/plant_catalog.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogSet {
    /// Fauna, fish, shellfish and plants of Northeast North American sites.
    Northeast,
    /// Native American cultivated and wild plants.
    Plants,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogSpecies {
    #[serde(default)]
    common_name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    /// Label to accession list, in table order.
    #[serde(default)]
    proteins: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub species: Species,
    /// Free-text grouping from the table, e.g. "Fish - Freshwater".
    pub group: String,
    pub targets: Vec<ProteinTarget>,
    /// Listed accessions that failed validation and are never fetched.
    pub rejected: Vec<String>,
}

impl CatalogEntry {
    /// Species listed without any accessions are searched organism-wide.
    pub fn needs_organism_search(&self) -> bool {
        self.targets.is_empty() && self.rejected.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn embedded(set: CatalogSet) -> Result<Self, RefDbError> {
        match set {
            CatalogSet::Northeast => Self::from_json(NORTHEAST_JSON),
            CatalogSet::Plants => Self::from_json(PLANTS_JSON),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, RefDbError> {
        let content = fs::read_to_string(path)
            .map_err(|err| RefDbError::CatalogParse(format!("{}: {err}", path.display())))?;
        Self::from_json(&content)
    }

    /// Species keep the order they are listed in. Malformed accessions are
    /// skipped with a warning; the rest of the table still loads.
    pub fn from_json(content: &str) -> Result<Self, RefDbError> {
        let raw: Map<String, Value> = serde_json::from_str(content)
            .map_err(|err| RefDbError::CatalogParse(err.to_string()))?;
        let entries = raw
            .into_iter()
            .map(|(key, value)| parse_entry(&key, value))
            .collect::<Result<Vec<_>, RefDbError>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn accession_count(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|entry| entry.targets.iter())
            .map(|target| match &target.query {
                TargetQuery::Accessions(list) => list.len(),
                TargetQuery::Predicate(_) => 0,
            })
            .sum()
    }
}

fn parse_entry(key: &str, value: Value) -> Result<CatalogEntry, RefDbError> {
    let value: CatalogSpecies = serde_json::from_value(value)
        .map_err(|err| RefDbError::CatalogParse(format!("{key}: {err}")))?;
    let scientific_name = key.replace('_', " ");
    let group = value.category.unwrap_or_else(|| "Unknown".to_string());
    let common_name = value
        .common_name
        .unwrap_or_else(|| scientific_name.clone());

    let mut targets = Vec::new();
    let mut rejected = Vec::new();
    for (label, listed) in value.proteins {
        let listed: Vec<String> = serde_json::from_value(listed)
            .map_err(|err| RefDbError::CatalogParse(format!("{key}.{label}: {err}")))?;
        let mut accessions = Vec::with_capacity(listed.len());
        for raw in listed {
            match raw.parse::<Accession>() {
                Ok(accession) => accessions.push(accession),
                Err(err) => {
                    warn!(species = %scientific_name, label = %label, error = %err, "skipping accession");
                    rejected.push(raw);
                }
            }
        }
        if !accessions.is_empty() {
            targets.push(ProteinTarget::accessions(&label, accessions));
        }
    }

    Ok(CatalogEntry {
        species: Species::new(
            &common_name,
            &scientific_name,
            Category::from_catalog_label(&group),
        ),
        group,
        targets,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_tables_parse() {
        let northeast = Catalog::embedded(CatalogSet::Northeast).unwrap();
        assert_eq!(northeast.len(), 50);
        let plants = Catalog::embedded(CatalogSet::Plants).unwrap();
        assert_eq!(plants.len(), 13);
        assert!(
            plants
                .entries()
                .iter()
                .all(|entry| entry.species.category == Category::Floral)
        );
    }

    #[test]
    fn keys_become_scientific_names() {
        let northeast = Catalog::embedded(CatalogSet::Northeast).unwrap();
        let deer = northeast
            .entries()
            .iter()
            .find(|entry| entry.species.scientific_name == "Odocoileus virginianus")
            .unwrap();
        assert_eq!(deer.species.category, Category::Faunal);
        assert_eq!(deer.group, "Mammal - Ungulate");
        assert!(deer.targets.iter().any(|target| target.label == "COL1A1"));
    }

    #[test]
    fn entries_keep_table_order() {
        let catalog = Catalog::from_json(
            r#"{"Zea_mays": {"category": "Plant", "proteins": {"zein": ["P04698"], "globulin": ["P15590"]}},
                "Acer_saccharum": {"category": "Plant", "proteins": {}}}"#,
        )
        .unwrap();
        let names: Vec<_> = catalog
            .entries()
            .iter()
            .map(|entry| entry.species.scientific_name.as_str())
            .collect();
        assert_eq!(names, vec!["Zea mays", "Acer saccharum"]);
        let labels: Vec<_> = catalog.entries()[0]
            .targets
            .iter()
            .map(|target| target.label.as_str())
            .collect();
        assert_eq!(labels, vec!["zein", "globulin"]);
        assert!(catalog.entries()[1].needs_organism_search());
    }
}
