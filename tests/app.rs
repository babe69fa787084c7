use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;

use camino::Utf8PathBuf;

use marker_refdb::app::{App, LogSink, RunSettings};
use marker_refdb::catalog::Catalog;
use marker_refdb::client::RateLimits;
use marker_refdb::domain::{Accession, Category, ProteinTarget, Species, SpeciesList};
use marker_refdb::error::RefDbError;
use marker_refdb::output::{JsonOutput, OutputNames, OutputPaths};
use marker_refdb::targets::TargetSets;
use marker_refdb::uniprot::{SearchResponse, UniprotClient, parse_search_response};

/// Answers searches from a table of canned JSON bodies; unknown queries come
/// back empty.
#[derive(Default)]
struct MockUniprot {
    search_bodies: HashMap<String, String>,
    fasta_bodies: HashMap<String, String>,
    searches: RefCell<Vec<String>>,
    fetches: RefCell<Vec<String>>,
}

impl UniprotClient for MockUniprot {
    fn fetch_fasta(&self, accession: &Accession) -> Result<String, RefDbError> {
        self.fetches.borrow_mut().push(accession.to_string());
        self.fasta_bodies
            .get(accession.as_str())
            .cloned()
            .ok_or_else(|| RefDbError::UniprotStatus {
                status: 404,
                message: "not found".to_string(),
            })
    }

    fn search(&self, query: &str, _size: usize) -> Result<SearchResponse, RefDbError> {
        self.searches.borrow_mut().push(query.to_string());
        match self.search_bodies.get(query) {
            Some(body) => parse_search_response(body),
            None => Ok(SearchResponse::default()),
        }
    }
}

fn settings() -> RunSettings {
    RunSettings {
        rate_limits: RateLimits::none(),
        ..RunSettings::default()
    }
}

fn collagen_only() -> TargetSets {
    TargetSets {
        animal: vec![ProteinTarget::predicate("collagen", "gene:COL1A1")],
        ..TargetSets::default()
    }
}

fn deer_list() -> SpeciesList {
    [Species::new(
        "White-tailed deer",
        "Odocoileus virginianus",
        Category::Faunal,
    )]
    .into_iter()
    .collect()
}

fn temp_paths(temp: &tempfile::TempDir) -> OutputPaths {
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    OutputPaths::in_dir(&dir, &OutputNames::default())
}

#[test]
fn deer_collagen_end_to_end() {
    let mut mock = MockUniprot::default();
    mock.search_bodies.insert(
        "(organism_name:\"Odocoileus virginianus\") AND (gene:COL1A1) AND reviewed:true".to_string(),
        fs::read_to_string("tests/fixtures/uniprot_search_deer.json").unwrap(),
    );
    let mut app = App::new(mock, settings()).with_targets(collagen_only());
    app.process_species_list(&deer_list(), &JsonOutput);

    assert_eq!(app.table().len(), 1);
    let record = app
        .table()
        .get("P02453_Odocoileus_virginianus_collagen")
        .unwrap();
    assert!(record.sequence.starts_with("MGSRL"));
    assert_eq!(app.request_count(), 1);

    let temp = tempfile::tempdir().unwrap();
    let paths = temp_paths(&temp);
    let result = app.finish(&paths, "Deer").unwrap();
    assert_eq!(result.sequences, 1);
    assert_eq!(result.failed_queries, 0);

    let taxonomy = fs::read_to_string(&paths.taxonomy).unwrap();
    assert_eq!(
        taxonomy.lines().nth(1),
        Some("Odocoileus virginianus\tMammalia/Aves\tOdocoileus\tOdocoileus\tvirginianus")
    );
    let report = fs::read_to_string(&paths.report).unwrap();
    assert!(report.contains(&format!("  {:<20}: {:>4}\n", "Faunal", 1)));
    assert!(report.contains(&format!("  {:<25}: {:>4}\n", "collagen", 1)));
    let fasta = fs::read_to_string(&paths.fasta).unwrap();
    assert!(fasta.starts_with(
        ">P02453_Odocoileus_virginianus_collagen Collagen alpha-1(I) chain [Odocoileus virginianus]\n"
    ));
}

#[test]
fn empty_primary_escalates_to_genus() {
    let mut mock = MockUniprot::default();
    mock.search_bodies.insert(
        "(taxonomy_name:\"Odocoileus\") AND (gene:COL1A1) AND reviewed:true".to_string(),
        fs::read_to_string("tests/fixtures/uniprot_search_deer.json").unwrap(),
    );
    let mut app = App::new(mock, settings()).with_targets(collagen_only());
    app.process_species_list(&deer_list(), &LogSink);

    assert_eq!(app.request_count(), 2);
    assert_eq!(app.table().len(), 1);
    assert_eq!(app.coverage()[0].escalations, 1);
    assert_eq!(app.coverage()[0].records, 1);
}

#[test]
fn failures_are_logged_and_not_fatal() {
    let mut mock = MockUniprot::default();
    mock.search_bodies.insert(
        "(organism_name:\"Odocoileus virginianus\") AND (gene:COL1A1) AND reviewed:true".to_string(),
        "{'results': []}".to_string(),
    );
    let list: SpeciesList = [
        Species::new("White-tailed deer", "Odocoileus virginianus", Category::Faunal),
        Species::new("Black bear", "Ursus americanus", Category::Faunal),
    ]
    .into_iter()
    .collect();
    let mut app = App::new(mock, settings()).with_targets(collagen_only());
    app.process_species_list(&list, &JsonOutput);

    // Deer fails once with no escalation; bear gets a primary and an escalation.
    assert_eq!(app.request_count(), 3);
    assert_eq!(app.failed_queries().len(), 1);
    assert!(app.failed_queries()[0].query_text.contains("Odocoileus virginianus"));
    assert!(app.failed_queries()[0].error_reason.contains("malformed"));
    assert_eq!(app.coverage().len(), 2);

    let temp = tempfile::tempdir().unwrap();
    let result = app.finish(&temp_paths(&temp), "Failures").unwrap();
    assert_eq!(result.sequences, 0);
    assert_eq!(result.failed_queries, 1);
    assert_eq!(result.species_without_records, 2);
}

#[test]
fn catalog_accessions_are_fetched_and_parsed() {
    let mut mock = MockUniprot::default();
    mock.fasta_bodies.insert(
        "P02453".to_string(),
        ">sp|P02453|CO1A1_BOVIN Collagen alpha-1(I) chain OS=Bos taurus OX=9913 GN=COL1A1 PE=1 SV=3\nMFSFVDLRLLLLLAATALLTHG\n".to_string(),
    );
    let catalog = Catalog::from_json(
        r#"{"Bos_taurus": {"common_name": "Cattle", "category": "Mammal - Domestic",
            "proteins": {"COL1A1": ["P02453", "P02465"]}}}"#,
    )
    .unwrap();
    let mut app = App::new(mock, settings());
    app.process_catalog(&catalog, &JsonOutput);

    assert_eq!(app.request_count(), 2);
    assert_eq!(app.failed_queries().len(), 1);
    assert_eq!(app.failed_queries()[0].query_text, "accession:P02465");
    let record = app.table().get("P02453_Bos_taurus_COL1A1").unwrap();
    assert_eq!(record.category, Category::Faunal);
    assert_eq!(record.taxon_id, "9913");
    assert_eq!(record.description, "Collagen alpha-1(I) chain [Bos taurus]");
}

#[test]
fn entries_without_organism_keep_listed_species_name() {
    let body = r#"{"results": [{"primaryAccession": "P04698", "sequence": {"value": "MAAK"}}]}"#;
    let mut mock = MockUniprot::default();
    mock.search_bodies.insert(
        "(taxonomy_name:\"Zea\") AND (protein_name:zein) AND reviewed:true".to_string(),
        body.to_string(),
    );
    mock.search_bodies.insert(
        "(organism_name:\"Quercus alba\") AND (protein_name:zein) AND reviewed:true".to_string(),
        body.to_string(),
    );
    let list: SpeciesList = [
        Species::new("Teosinte", "Zea sp.", Category::Floral),
        Species::new("Oak hybrid", "Quercus alba × Quercus rubra", Category::Floral),
    ]
    .into_iter()
    .collect();
    let targets = TargetSets {
        plant: vec![ProteinTarget::predicate("zein", "protein_name:zein")],
        ..TargetSets::default()
    };
    let mut app = App::new(mock, settings()).with_targets(targets);
    app.process_species_list(&list, &JsonOutput);

    assert_eq!(app.table().len(), 2);
    let genus_level = app.table().get("P04698_Zea_sp._zein").unwrap();
    assert_eq!(genus_level.organism, "Zea sp.");
    assert_eq!(genus_level.description, "zein [Zea sp.]");
    let hybrid = app
        .table()
        .get("P04698_Quercus_alba_×_Quercus_rubra_zein")
        .unwrap();
    assert_eq!(hybrid.organism, "Quercus alba × Quercus rubra");
}
