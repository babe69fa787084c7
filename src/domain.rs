use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RefDbError;

/// Ecological section a species was listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Faunal,
    Fish,
    Reptile,
    Floral,
    Other,
}

impl Category {
    /// Sections read from a species list, in processing order.
    pub const SECTIONS: [Category; 4] = [
        Category::Faunal,
        Category::Fish,
        Category::Reptile,
        Category::Floral,
    ];

    pub fn superfamily(self) -> &'static str {
        match self {
            Category::Faunal => "Mammalia/Aves",
            Category::Fish => "Actinopterygii",
            Category::Reptile => "Reptilia",
            Category::Floral => "Plantae",
            Category::Other => "Unknown",
        }
    }

    pub fn is_animal(self) -> bool {
        matches!(self, Category::Faunal | Category::Fish | Category::Reptile)
    }

    /// Maps free-text catalog labels such as "Mammal - Ungulate" onto a section.
    pub fn from_catalog_label(label: &str) -> Self {
        let lower = label.trim().to_lowercase();
        if lower.starts_with("mammal") || lower.starts_with("bird") {
            Category::Faunal
        } else if lower.starts_with("fish") {
            Category::Fish
        } else if lower.starts_with("reptile") || lower.starts_with("amphibian") {
            Category::Reptile
        } else if lower.starts_with("plant") {
            Category::Floral
        } else {
            Category::Other
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Faunal => "Faunal",
            Category::Fish => "Fish",
            Category::Reptile => "Reptile",
            Category::Floral => "Floral",
            Category::Other => "Other",
        };
        write!(f, "{label}")
    }
}

impl FromStr for Category {
    type Err = RefDbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "faunal" => Ok(Category::Faunal),
            "fish" => Ok(Category::Fish),
            "reptile" => Ok(Category::Reptile),
            "floral" => Ok(Category::Floral),
            "other" => Ok(Category::Other),
            _ => Err(RefDbError::InvalidCategory(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub common_name: String,
    pub scientific_name: String,
    pub category: Category,
}

impl Species {
    pub fn new(common_name: &str, scientific_name: &str, category: Category) -> Self {
        Self {
            common_name: common_name.to_string(),
            scientific_name: scientific_name.to_string(),
            category,
        }
    }
}

/// Species grouped by section. Sections that were never filled are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesList {
    sections: BTreeMap<Category, Vec<Species>>,
}

impl SpeciesList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, species: Species) {
        self.sections
            .entry(species.category)
            .or_default()
            .push(species);
    }

    pub fn section(&self, category: Category) -> &[Species] {
        self.sections
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Faunal, Fish, Reptile, then Floral; `Other` last.
    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.sections.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Species> for SpeciesList {
    fn from_iter<I: IntoIterator<Item = Species>>(iter: I) -> Self {
        let mut list = SpeciesList::new();
        for species in iter {
            list.push(species);
        }
        list
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = RefDbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let mut chars = normalized.chars();
        let is_valid = matches!(normalized.len(), 6 | 10)
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric())
            && chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
            && chars.next().is_some_and(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(RefDbError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for Accession {
    type Error = RefDbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Accession> for String {
    fn from(value: Accession) -> Self {
        value.0
    }
}

/// How a protein target is looked up in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetQuery {
    /// Query fragment combined with an organism or taxonomy scope.
    Predicate(String),
    /// Curated accessions fetched one by one.
    Accessions(Vec<Accession>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinTarget {
    pub label: String,
    pub query: TargetQuery,
}

impl ProteinTarget {
    pub fn predicate(label: &str, predicate: &str) -> Self {
        Self {
            label: label.to_string(),
            query: TargetQuery::Predicate(predicate.to_string()),
        }
    }

    pub fn accessions(label: &str, accessions: Vec<Accession>) -> Self {
        Self {
            label: label.to_string(),
            query: TargetQuery::Accessions(accessions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub canonical_name: String,
    pub is_genus_level: bool,
}

impl ResolvedName {
    pub fn species(name: &str) -> Self {
        Self {
            canonical_name: name.to_string(),
            is_genus_level: false,
        }
    }

    pub fn genus(name: &str) -> Self {
        Self {
            canonical_name: name.to_string(),
            is_genus_level: true,
        }
    }
}
