use assert_matches::assert_matches;

use marker_refdb::catalog::{Catalog, CatalogSet};
use marker_refdb::domain::{Category, TargetQuery};
use marker_refdb::error::RefDbError;

#[test]
fn external_catalog_maps_labels_and_targets() {
    let catalog = Catalog::from_json(
        r#"{
            "Crassostrea_virginica": {"common_name": "Eastern oyster", "category": "Shellfish - Bivalve",
                                      "proteins": {"tropomyosin": ["Q9GZ71"]}},
            "Chelydra_serpentina": {"common_name": "Snapping turtle", "category": "Reptile - Turtle",
                                    "proteins": {}}
        }"#,
    )
    .unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.accession_count(), 1);

    let turtle = &catalog.entries()[1];
    assert_eq!(turtle.species.scientific_name, "Chelydra serpentina");
    assert_eq!(turtle.species.category, Category::Reptile);
    assert!(turtle.targets.is_empty());
    assert!(turtle.needs_organism_search());

    let oyster = &catalog.entries()[0];
    assert_eq!(oyster.species.category, Category::Other);
    assert_eq!(oyster.targets[0].label, "tropomyosin");
    assert_matches!(&oyster.targets[0].query, TargetQuery::Accessions(list) if list.len() == 1);
}

#[test]
fn malformed_accession_is_skipped_and_table_still_loads() {
    let catalog = Catalog::from_json(
        r#"{
            "Odocoileus_virginianus": {"common_name": "White-tailed deer", "category": "Mammal - Ungulate",
                                       "proteins": {"COL1A1": ["P02453"]}},
            "Castor_canadensis": {"common_name": "Beaver", "category": "Mammal - Rodent",
                                  "proteins": {"COL1A1": ["Q9XXX", "P02454"], "LDH_A": ["Q9XXX"]}}
        }"#,
    )
    .unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.accession_count(), 2);

    let deer = &catalog.entries()[0];
    assert_eq!(deer.species.scientific_name, "Odocoileus virginianus");
    assert!(deer.rejected.is_empty());

    let beaver = &catalog.entries()[1];
    assert_eq!(beaver.targets.len(), 1);
    assert_eq!(beaver.targets[0].label, "COL1A1");
    assert_matches!(&beaver.targets[0].query, TargetQuery::Accessions(list) if list.len() == 1);
    assert_eq!(beaver.rejected, vec!["Q9XXX".to_string(), "Q9XXX".to_string()]);
    assert!(!beaver.needs_organism_search());
}

#[test]
fn non_list_proteins_reject_catalog() {
    let err = Catalog::from_json(
        r#"{"Bos_taurus": {"common_name": "Cattle", "category": "Mammal", "proteins": {"x": "P02453"}}}"#,
    )
    .unwrap_err();
    assert_matches!(err, RefDbError::CatalogParse(_));
}

#[test]
fn embedded_northeast_has_curated_accessions() {
    let catalog = Catalog::embedded(CatalogSet::Northeast).unwrap();
    assert!(catalog.accession_count() > 0);
    assert!(
        catalog
            .entries()
            .iter()
            .any(|entry| entry.species.category == Category::Fish)
    );
}
