use serde::Serialize;

use crate::domain::{ProteinTarget, Species};

const FUNGAL_KEYWORDS: [&str; 4] = ["mushroom", "morel", "bolete", "puffball"];
const TREE_NUT_KEYWORDS: [&str; 4] = ["walnut", "hazelnut", "chestnut", "beech"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Animal,
    Plant,
    Fungal,
}

impl Domain {
    pub fn of(species: &Species) -> Self {
        if species.category.is_animal() {
            return Domain::Animal;
        }
        let common = species.common_name.to_lowercase();
        if FUNGAL_KEYWORDS.iter().any(|word| common.contains(word)) {
            Domain::Fungal
        } else {
            Domain::Plant
        }
    }
}

/// Protein families searched per domain.
#[derive(Debug, Clone)]
pub struct TargetSets {
    pub animal: Vec<ProteinTarget>,
    pub plant: Vec<ProteinTarget>,
    pub fungal: Vec<ProteinTarget>,
    /// Targets only reachable through per-species narrowing.
    pub narrowing_extras: Vec<ProteinTarget>,
}

impl Default for TargetSets {
    fn default() -> Self {
        Self {
            animal: animal_targets(),
            plant: plant_targets(),
            fungal: fungal_targets(),
            narrowing_extras: vec![ProteinTarget::predicate("allergen", "keyword:Allergen")],
        }
    }
}

impl TargetSets {
    pub fn for_species(&self, species: &Species) -> (Domain, Vec<ProteinTarget>) {
        let domain = Domain::of(species);
        let targets = match domain {
            Domain::Animal => self.animal.clone(),
            Domain::Fungal => self.fungal.clone(),
            Domain::Plant => match plant_narrowing(species) {
                Some(labels) => self.pick(labels),
                None => self.plant.clone(),
            },
        };
        (domain, targets)
    }

    fn pick(&self, labels: &[&str]) -> Vec<ProteinTarget> {
        labels
            .iter()
            .filter_map(|label| {
                self.plant
                    .iter()
                    .chain(self.narrowing_extras.iter())
                    .find(|target| target.label == *label)
                    .cloned()
            })
            .collect()
    }
}

fn plant_narrowing(species: &Species) -> Option<&'static [&'static str]> {
    let common = species.common_name.to_lowercase();
    if species.scientific_name.contains("Zea mays") || common.contains("maize") {
        Some(&["zein", "globulin"])
    } else if TREE_NUT_KEYWORDS.iter().any(|nut| common.contains(nut)) {
        Some(&["allergen", "albumin"])
    } else if common.contains("rice") {
        Some(&["glutelin", "globulin"])
    } else {
        None
    }
}

pub fn animal_targets() -> Vec<ProteinTarget> {
    vec![
        ProteinTarget::predicate(
            "collagen",
            "gene:COL1A1 OR gene:COL1A2 OR gene:COL2A1 OR gene:COL3A1",
        ),
        ProteinTarget::predicate(
            "myosin",
            "gene:MYH1 OR gene:MYH2 OR gene:MYH4 OR gene:MYH7",
        ),
        ProteinTarget::predicate("actin", "gene:ACTA1 OR gene:ACTB OR gene:ACTG1"),
        ProteinTarget::predicate("tropomyosin", "gene:TPM1 OR gene:TPM2 OR gene:TPM3"),
        ProteinTarget::predicate("hemoglobin", "gene:HBA OR gene:HBB OR gene:HBD"),
        ProteinTarget::predicate("myoglobin", "gene:MB"),
        ProteinTarget::predicate("albumin", "gene:ALB"),
        ProteinTarget::predicate("parvalbumin", "gene:PVALB"),
    ]
}

pub fn plant_targets() -> Vec<ProteinTarget> {
    vec![
        ProteinTarget::predicate(
            "globulin",
            "protein_name:\"11S globulin\" OR protein_name:legumin OR protein_name:glycinin",
        ),
        ProteinTarget::predicate(
            "albumin",
            "protein_name:\"2S albumin\" OR protein_name:napin",
        ),
        ProteinTarget::predicate(
            "vicilin",
            "protein_name:\"7S globulin\" OR protein_name:vicilin",
        ),
        ProteinTarget::predicate("zein", "protein_name:zein"),
        ProteinTarget::predicate("glutelin", "protein_name:glutelin OR protein_name:oryzin"),
        ProteinTarget::predicate(
            "protease_inhibitor",
            "protein_name:\"trypsin inhibitor\" OR protein_name:\"protease inhibitor\"",
        ),
        ProteinTarget::predicate("amylase_inhibitor", "protein_name:\"amylase inhibitor\""),
    ]
}

pub fn fungal_targets() -> Vec<ProteinTarget> {
    vec![
        ProteinTarget::predicate("hydrophobin", "protein_name:hydrophobin"),
        ProteinTarget::predicate("laccase", "protein_name:laccase"),
        ProteinTarget::predicate(
            "chitin",
            "protein_name:\"chitin synthase\" OR protein_name:chitinase",
        ),
    ]
}
