use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RefDbError {
    #[error("invalid UniProt accession: {0}")]
    InvalidAccession(String),

    #[error("invalid species category: {0}")]
    InvalidCategory(String),

    #[error("missing config file marker-refdb.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read species list at {0}")]
    SpeciesListRead(PathBuf),

    #[error("failed to parse species list: {0}")]
    SpeciesListParse(String),

    #[error("failed to parse accession catalog: {0}")]
    CatalogParse(String),

    #[error("uniprot request failed: {0}")]
    UniprotHttp(String),

    #[error("uniprot returned status {status}: {message}")]
    UniprotStatus { status: u16, message: String },

    #[error("uniprot returned a malformed response: {0}")]
    UniprotDecode(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
