//! Sequential, rate-limited access to the protein repository.
//!
//! Every call waits a fixed interval before going out, counts towards the
//! request total, and on failure is appended to the failed-query log. No
//! call is retried.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::Accession;
use crate::error::RefDbError;
use crate::uniprot::{ProteinHit, UniprotClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Accession,
    Search,
    Broad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    pub accession_ms: u64,
    pub search_ms: u64,
    pub broad_ms: u64,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            accession_ms: 200,
            search_ms: 350,
            broad_ms: 500,
        }
    }
}

impl RateLimits {
    pub fn none() -> Self {
        Self {
            accession_ms: 0,
            search_ms: 0,
            broad_ms: 0,
        }
    }

    pub fn delay_for(&self, kind: CallKind) -> Duration {
        let millis = match kind {
            CallKind::Accession => self.accession_ms,
            CallKind::Search => self.search_ms,
            CallKind::Broad => self.broad_ms,
        };
        Duration::from_millis(millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedQuery {
    pub query_text: String,
    pub error_reason: String,
}

pub struct RateLimitedClient<C: UniprotClient> {
    inner: C,
    limits: RateLimits,
    request_count: u64,
    failed: Vec<FailedQuery>,
}

impl<C: UniprotClient> RateLimitedClient<C> {
    pub fn new(inner: C, limits: RateLimits) -> Self {
        Self {
            inner,
            limits,
            request_count: 0,
            failed: Vec::new(),
        }
    }

    pub fn fetch_by_accession(&mut self, accession: &Accession) -> Result<String, RefDbError> {
        self.pace(CallKind::Accession);
        debug!(accession = %accession, "fetching entry");
        self.inner
            .fetch_fasta(accession)
            .inspect_err(|err| self.record_failure(&format!("accession:{accession}"), err))
    }

    /// Structured search; entries without a sequence are discarded.
    pub fn search(&mut self, query: &str, max_results: usize) -> Result<Vec<ProteinHit>, RefDbError> {
        self.run_search(CallKind::Search, query, max_results)
    }

    /// Organism-wide search, paced by the slower broad interval.
    pub fn broad_search(
        &mut self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ProteinHit>, RefDbError> {
        self.run_search(CallKind::Broad, query, max_results)
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn failed_queries(&self) -> &[FailedQuery] {
        &self.failed
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn run_search(
        &mut self,
        kind: CallKind,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ProteinHit>, RefDbError> {
        self.pace(kind);
        debug!(query, max_results, "searching");
        let response = self
            .inner
            .search(query, max_results)
            .inspect_err(|err| self.record_failure(query, err))?;
        Ok(response
            .results
            .into_iter()
            .filter_map(|entry| entry.into_hit())
            .collect())
    }

    fn pace(&mut self, kind: CallKind) {
        let delay = self.limits.delay_for(kind);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.request_count += 1;
    }

    fn record_failure(&mut self, query: &str, err: &RefDbError) {
        warn!(query, error = %err, "query failed");
        self.failed.push(FailedQuery {
            query_text: query.to_string(),
            error_reason: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Instant;

    use assert_matches::assert_matches;

    use super::*;
    use crate::uniprot::SearchResponse;

    const LIMITS: RateLimits = RateLimits {
        accession_ms: 15,
        search_ms: 30,
        broad_ms: 60,
    };

    struct FlakyClient {
        fail: bool,
        last_size: Cell<usize>,
    }

    impl FlakyClient {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                last_size: Cell::new(0),
            }
        }
    }

    impl UniprotClient for FlakyClient {
        fn fetch_fasta(&self, accession: &Accession) -> Result<String, RefDbError> {
            if self.fail {
                return Err(RefDbError::UniprotHttp("connection reset".to_string()));
            }
            Ok(format!(">sp|{accession}|X\nMA\n"))
        }

        fn search(&self, _query: &str, size: usize) -> Result<SearchResponse, RefDbError> {
            self.last_size.set(size);
            if self.fail {
                return Err(RefDbError::UniprotStatus {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(SearchResponse::default())
        }
    }

    #[test]
    fn delay_per_call_kind() {
        assert_eq!(LIMITS.delay_for(CallKind::Accession), Duration::from_millis(15));
        assert_eq!(LIMITS.delay_for(CallKind::Search), Duration::from_millis(30));
        assert_eq!(LIMITS.delay_for(CallKind::Broad), Duration::from_millis(60));
        assert!(RateLimits::none().delay_for(CallKind::Broad).is_zero());
    }

    #[test]
    fn each_call_waits_its_floor() {
        let mut client = RateLimitedClient::new(FlakyClient::new(false), LIMITS);
        let accession: Accession = "P02453".parse().unwrap();

        let start = Instant::now();
        client.fetch_by_accession(&accession).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(LIMITS.accession_ms));

        let start = Instant::now();
        client.search("gene:MB", 3).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(LIMITS.search_ms));
        assert_eq!(client.inner().last_size.get(), 3);

        let start = Instant::now();
        client.broad_search("organism_name:\"Bos taurus\"", 100).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(LIMITS.broad_ms));
        assert_eq!(client.inner().last_size.get(), 100);

        assert_eq!(client.request_count(), 3);
        assert!(client.failed_queries().is_empty());
    }

    #[test]
    fn failed_calls_are_paced_counted_and_logged() {
        let mut client = RateLimitedClient::new(FlakyClient::new(true), LIMITS);
        let accession: Accession = "P02453".parse().unwrap();

        let start = Instant::now();
        let err = client.broad_search("organism_name:\"Bos taurus\"", 100).unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(LIMITS.broad_ms));
        assert_matches!(err, RefDbError::UniprotStatus { status: 503, .. });

        let err = client.fetch_by_accession(&accession).unwrap_err();
        assert_matches!(err, RefDbError::UniprotHttp(_));
        client.search("gene:MB", 3).unwrap_err();

        assert_eq!(client.request_count(), 3);
        let failed: Vec<_> = client
            .failed_queries()
            .iter()
            .map(|failure| failure.query_text.as_str())
            .collect();
        assert_eq!(
            failed,
            vec!["organism_name:\"Bos taurus\"", "accession:P02453", "gene:MB"]
        );
        assert!(client.failed_queries()[2].error_reason.contains("503"));
    }
}
