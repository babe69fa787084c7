use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::Accession;
use crate::error::RefDbError;
use crate::fasta::FastaRecord;

const SEARCH_FIELDS: &str =
    "accession,id,protein_name,organism_name,organism_id,sequence,gene_names,reviewed";

static ORGANISM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bOS=(.+?)(?:\s+[A-Z]{2}=|$)").unwrap());
static TAXON_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bOX=(\d+)").unwrap());

/// Search payload. `results` is required; anything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<UniprotEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniprotEntry {
    #[serde(default)]
    pub primary_accession: String,
    #[serde(default)]
    pub protein_description: Option<ProteinDescription>,
    #[serde(default)]
    pub organism: Option<Organism>,
    #[serde(default)]
    pub sequence: Option<SequenceValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinDescription {
    #[serde(default)]
    pub recommended_name: Option<ProteinName>,
    #[serde(default)]
    pub submission_names: Vec<ProteinName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinName {
    #[serde(default)]
    pub full_name: Option<TextValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organism {
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub taxon_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SequenceValue {
    #[serde(default)]
    pub value: String,
}

/// A repository entry that carries a usable sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinHit {
    pub accession: String,
    pub protein_name: Option<String>,
    pub organism: Option<String>,
    pub taxon_id: Option<u64>,
    pub sequence: String,
}

impl UniprotEntry {
    /// Display name: recommended name, else the first submission name.
    pub fn protein_name(&self) -> Option<&str> {
        let description = self.protein_description.as_ref()?;
        description
            .recommended_name
            .iter()
            .chain(description.submission_names.first())
            .filter_map(ProteinName::value)
            .next()
    }

    /// Entries without a non-empty sequence are dropped here.
    pub fn into_hit(self) -> Option<ProteinHit> {
        let protein_name = self.protein_name().map(str::to_string);
        let sequence = self
            .sequence
            .map(|seq| seq.value.trim().to_string())
            .filter(|value| !value.is_empty())?;
        let (organism, taxon_id) = match self.organism {
            Some(org) => (org.scientific_name.filter(|v| !v.is_empty()), org.taxon_id),
            None => (None, None),
        };
        Some(ProteinHit {
            accession: self.primary_accession,
            protein_name,
            organism,
            taxon_id,
            sequence,
        })
    }
}

impl ProteinName {
    fn value(&self) -> Option<&str> {
        self.full_name
            .as_ref()
            .map(|text| text.value.trim())
            .filter(|value| !value.is_empty())
    }
}

impl ProteinHit {
    /// Reads a UniProt FASTA record (`>sp|P02453|CO1A1_BOVIN Name OS=... OX=...`).
    pub fn from_fasta(record: &FastaRecord) -> Option<ProteinHit> {
        if record.sequence.is_empty() {
            return None;
        }
        let (id, description) = match record.header.split_once(char::is_whitespace) {
            Some((id, rest)) => (id, rest.trim()),
            None => (record.header.as_str(), ""),
        };
        let accession = match id.split('|').collect::<Vec<_>>().as_slice() {
            [_, accession, ..] => accession.to_string(),
            _ => id.to_string(),
        };
        let protein_name = description
            .split(" OS=")
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty() && !name.starts_with("OS="))
            .map(str::to_string);
        let organism = ORGANISM_RE
            .captures(description)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());
        let taxon_id = TAXON_RE
            .captures(description)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
        Some(ProteinHit {
            accession,
            protein_name,
            organism,
            taxon_id,
            sequence: record.sequence.clone(),
        })
    }
}

pub fn parse_search_response(body: &str) -> Result<SearchResponse, RefDbError> {
    serde_json::from_str(body).map_err(|err| RefDbError::UniprotDecode(err.to_string()))
}

pub trait UniprotClient {
    /// Single-entry FASTA text for an accession.
    fn fetch_fasta(&self, accession: &Accession) -> Result<String, RefDbError>;
    fn search(&self, query: &str, size: usize) -> Result<SearchResponse, RefDbError>;
}

#[derive(Clone)]
pub struct UniprotHttpClient {
    client: Client,
    base_url: String,
}

impl UniprotHttpClient {
    pub fn new() -> Result<Self, RefDbError> {
        Self::with_base_url("https://rest.uniprot.org")
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, RefDbError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("marker-refdb/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| RefDbError::UniprotHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| RefDbError::UniprotHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, RefDbError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "UniProt request failed".to_string());
        Err(RefDbError::UniprotStatus { status, message })
    }

    fn fasta_url(&self, accession: &Accession) -> String {
        format!("{}/uniprotkb/{}.fasta", self.base_url, accession.as_str())
    }

    fn search_url(&self) -> String {
        format!("{}/uniprotkb/search", self.base_url)
    }
}

impl UniprotClient for UniprotHttpClient {
    fn fetch_fasta(&self, accession: &Accession) -> Result<String, RefDbError> {
        let response = self
            .client
            .get(self.fasta_url(accession))
            .send()
            .map_err(|err| RefDbError::UniprotHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| RefDbError::UniprotHttp(err.to_string()))
    }

    fn search(&self, query: &str, size: usize) -> Result<SearchResponse, RefDbError> {
        let size = size.to_string();
        let response = self
            .client
            .get(self.search_url())
            .query(&[
                ("query", query),
                ("format", "json"),
                ("size", size.as_str()),
                ("fields", SEARCH_FIELDS),
            ])
            .send()
            .map_err(|err| RefDbError::UniprotHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| RefDbError::UniprotHttp(err.to_string()))?;
        parse_search_response(&body)
    }
}
