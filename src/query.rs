//! Search expressions for the UniProt query language and the
//! species-to-genus escalation policy.

use serde::Serialize;

use crate::domain::ResolvedName;
use crate::names::genus_of;

pub const REVIEWED_FILTER: &str = "reviewed:true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStage {
    Primary,
    Escalated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationOutcome<T> {
    pub stage: QueryStage,
    pub entries: Vec<T>,
    pub attempts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryBuilder {
    reviewed_only: bool,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl QueryBuilder {
    /// `reviewed_only` appends the reviewed filter to species-level primaries.
    /// Genus-level and escalated queries always carry it.
    pub fn new(reviewed_only: bool) -> Self {
        Self { reviewed_only }
    }

    pub fn reviewed_only(&self) -> bool {
        self.reviewed_only
    }

    pub fn build(&self, canonical_name: &str, is_genus_level: bool, predicate: &str) -> String {
        if is_genus_level {
            return reviewed(&format!(
                "{} AND ({predicate})",
                taxonomy_scope(canonical_name)
            ));
        }
        let query = format!("{} AND ({predicate})", organism_scope(canonical_name));
        if self.reviewed_only {
            reviewed(&query)
        } else {
            query
        }
    }

    /// Genus-scoped, reviewed-only retry for a species-level name.
    /// Genus-level names have nowhere further to go.
    pub fn escalate(&self, name: &ResolvedName, predicate: &str) -> Option<String> {
        if name.is_genus_level {
            return None;
        }
        let genus = genus_of(&name.canonical_name);
        if genus.is_empty() {
            return None;
        }
        Some(reviewed(&format!(
            "{} AND ({predicate})",
            taxonomy_scope(genus)
        )))
    }

    /// Broad reviewed search over everything recorded for an organism.
    pub fn organism_search(&self, organism: &str) -> String {
        reviewed(&format!("organism_name:\"{}\"", sanitize(organism)))
    }

    /// Runs the primary query and, when it comes back empty, at most one
    /// escalated query. A failed call ends the sequence with the error.
    pub fn run_escalating<T, E, F>(
        &self,
        name: &ResolvedName,
        predicate: &str,
        mut execute: F,
    ) -> Result<EscalationOutcome<T>, E>
    where
        F: FnMut(QueryStage, &str) -> Result<Vec<T>, E>,
    {
        let mut stage = QueryStage::Primary;
        let mut query = self.build(&name.canonical_name, name.is_genus_level, predicate);
        let mut attempts = 0usize;
        loop {
            attempts += 1;
            let entries = execute(stage, &query)?;
            if !entries.is_empty() {
                return Ok(EscalationOutcome {
                    stage,
                    entries,
                    attempts,
                });
            }
            match self.next_stage(stage, name, predicate) {
                Some((next, next_query)) => {
                    stage = next;
                    query = next_query;
                }
                None => {
                    return Ok(EscalationOutcome {
                        stage,
                        entries,
                        attempts,
                    });
                }
            }
        }
    }

    fn next_stage(
        &self,
        stage: QueryStage,
        name: &ResolvedName,
        predicate: &str,
    ) -> Option<(QueryStage, String)> {
        match stage {
            QueryStage::Primary => self
                .escalate(name, predicate)
                .map(|query| (QueryStage::Escalated, query)),
            QueryStage::Escalated => None,
        }
    }
}

fn organism_scope(name: &str) -> String {
    format!("(organism_name:\"{}\")", sanitize(name))
}

fn taxonomy_scope(name: &str) -> String {
    format!("(taxonomy_name:\"{}\")", sanitize(name))
}

fn reviewed(query: &str) -> String {
    format!("{query} AND {REVIEWED_FILTER}")
}

fn sanitize(name: &str) -> String {
    name.replace('"', "").trim().to_string()
}
