use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::RateLimits;
use crate::domain::{Category, Species, SpeciesList};
use crate::error::RefDbError;
use crate::output::OutputNames;

pub const DEFAULT_CONFIG_FILE: &str = "marker-refdb.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub species: SpeciesSections,
    #[serde(default)]
    pub reviewed_only: Option<bool>,
    #[serde(default)]
    pub delays_ms: Option<DelayConfig>,
    #[serde(default)]
    pub max_results: Option<MaxResultsConfig>,
    #[serde(default)]
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SpeciesSections {
    #[serde(rename = "Faunal", default)]
    pub faunal: Vec<SpeciesEntry>,
    #[serde(rename = "Fish", default)]
    pub fish: Vec<SpeciesEntry>,
    #[serde(rename = "Reptile", default)]
    pub reptile: Vec<SpeciesEntry>,
    #[serde(rename = "Floral", default)]
    pub floral: Vec<SpeciesEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SpeciesEntry {
    Shorthand(String),
    Detailed(SpeciesEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SpeciesEntryObject {
    pub scientific_name: String,
    #[serde(default)]
    pub common_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DelayConfig {
    #[serde(default)]
    pub accession: Option<u64>,
    #[serde(default)]
    pub search: Option<u64>,
    #[serde(default)]
    pub broad: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MaxResultsConfig {
    #[serde(default)]
    pub primary: Option<usize>,
    #[serde(default)]
    pub escalated: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub fasta: Option<String>,
    #[serde(default)]
    pub taxonomy: Option<String>,
    #[serde(default)]
    pub report: Option<String>,
}

/// Result caps per query stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaxResults {
    pub primary: usize,
    pub escalated: usize,
    /// Organism-wide fallback searches in accession-table runs.
    pub broad: usize,
}

impl Default for MaxResults {
    fn default() -> Self {
        Self {
            primary: 3,
            escalated: 2,
            broad: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub species: SpeciesList,
    pub reviewed_only: bool,
    pub rate_limits: RateLimits,
    pub max_results: MaxResults,
    pub output: OutputNames,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            species: SpeciesList::new(),
            reviewed_only: true,
            rate_limits: RateLimits::default(),
            max_results: MaxResults::default(),
            output: OutputNames::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, RefDbError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(RefDbError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| RefDbError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| RefDbError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, RefDbError> {
        let defaults = ResolvedConfig::default();

        let delays = config.delays_ms.unwrap_or_default();
        let rate_limits = RateLimits {
            accession_ms: delays.accession.unwrap_or(defaults.rate_limits.accession_ms),
            search_ms: delays.search.unwrap_or(defaults.rate_limits.search_ms),
            broad_ms: delays.broad.unwrap_or(defaults.rate_limits.broad_ms),
        };

        let caps = config.max_results.unwrap_or_default();
        let max_results = MaxResults {
            primary: caps.primary.unwrap_or(defaults.max_results.primary).max(1),
            escalated: caps.escalated.unwrap_or(defaults.max_results.escalated).max(1),
            broad: defaults.max_results.broad,
        };

        let names = config.output.unwrap_or_default();
        let output = OutputNames {
            fasta: names.fasta.unwrap_or(defaults.output.fasta),
            taxonomy: names.taxonomy.unwrap_or(defaults.output.taxonomy),
            report: names.report.unwrap_or(defaults.output.report),
        };

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            species: resolve_sections(config.species),
            reviewed_only: config.reviewed_only.unwrap_or(true),
            rate_limits,
            max_results,
            output,
        })
    }

    /// Reads a species list from a JSON section object or a tab-separated
    /// sheet, chosen by file extension.
    pub fn load_species(path: &Path) -> Result<SpeciesList, RefDbError> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            let content = fs::read_to_string(path)
                .map_err(|_| RefDbError::SpeciesListRead(path.to_path_buf()))?;
            let sections: SpeciesSections = serde_json::from_str(&content)
                .map_err(|err| RefDbError::SpeciesListParse(err.to_string()))?;
            return Ok(resolve_sections(sections));
        }

        let reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|_| RefDbError::SpeciesListRead(path.to_path_buf()))?;
        parse_species_sheet(reader)
    }
}

#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Common name", default)]
    common_name: Option<String>,
    #[serde(rename = "Scientific name", default)]
    scientific_name: Option<String>,
}

fn parse_species_sheet<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<SpeciesList, RefDbError> {
    let mut list = SpeciesList::new();
    for row in reader.deserialize::<SheetRow>() {
        let row = row.map_err(|err| RefDbError::SpeciesListParse(err.to_string()))?;
        let category = match row.category.parse::<Category>() {
            Ok(category) if category != Category::Other => category,
            _ => {
                warn!(category = %row.category, "skipping row with unknown section");
                continue;
            }
        };
        if let Some(species) = species_from_parts(row.scientific_name, row.common_name, category) {
            list.push(species);
        }
    }
    Ok(list)
}

fn resolve_sections(sections: SpeciesSections) -> SpeciesList {
    let SpeciesSections {
        faunal,
        fish,
        reptile,
        floral,
    } = sections;
    [
        (Category::Faunal, faunal),
        (Category::Fish, fish),
        (Category::Reptile, reptile),
        (Category::Floral, floral),
    ]
    .into_iter()
    .flat_map(|(category, entries)| {
        entries.into_iter().filter_map(move |entry| match entry {
            SpeciesEntry::Shorthand(name) => species_from_parts(Some(name), None, category),
            SpeciesEntry::Detailed(obj) => {
                species_from_parts(Some(obj.scientific_name), obj.common_name, category)
            }
        })
    })
    .collect()
}

fn species_from_parts(
    scientific_name: Option<String>,
    common_name: Option<String>,
    category: Category,
) -> Option<Species> {
    let scientific_name = scientific_name.unwrap_or_default();
    let scientific_name = scientific_name.trim();
    if scientific_name.is_empty() {
        return None;
    }
    let common_name = common_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());
    Some(Species::new(&common_name, scientific_name, category))
}
