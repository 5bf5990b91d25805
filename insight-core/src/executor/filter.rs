//! WHERE clause evaluation.
//!
//! Records are addressed by their position in the input slice, so OR and NOT
//! deduplicate by record identity rather than by value: two distinct records
//! with identical content both survive a union.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use super::helpers::{get_number, get_str};
use super::QueryLimits;
use crate::ast::Filter;
use crate::error::{InsightError, InsightResult};

/// Evaluates a validated filter tree against a record collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEvaluator {
    limits: QueryLimits,
}

impl FilterEvaluator {
    pub fn new(limits: QueryLimits) -> Self {
        Self { limits }
    }

    /// Records matching `filter`, in input order.
    pub fn evaluate<'r>(
        &self,
        filter: &Filter,
        records: &'r [Value],
    ) -> InsightResult<Vec<&'r Value>> {
        let all: Vec<usize> = (0..records.len()).collect();
        let matched = self.select(filter, records, &all)?;
        debug!("WHERE matched {} of {} records", matched.len(), records.len());
        Ok(matched.into_iter().map(|i| &records[i]).collect())
    }

    /// Positions (subset of `candidates`) whose records match `filter`.
    fn select(
        &self,
        filter: &Filter,
        records: &[Value],
        candidates: &[usize],
    ) -> InsightResult<Vec<usize>> {
        let selected = match filter {
            Filter::All => return Ok(candidates.to_vec()),
            Filter::Compare { op, field, value } => candidates
                .iter()
                .copied()
                .filter(|&i| {
                    get_number(&records[i], field)
                        .map(|actual| op.holds(actual, *value))
                        .unwrap_or(false)
                })
                .collect(),
            Filter::Is { field, pattern } => candidates
                .iter()
                .copied()
                .filter(|&i| {
                    get_str(&records[i], field)
                        .map(|actual| pattern.matches(actual))
                        .unwrap_or(false)
                })
                .collect(),
            Filter::And(children) => {
                let mut current = candidates.to_vec();
                for child in children {
                    current = self.select(child, records, &current)?;
                }
                current
            }
            Filter::Or(children) => {
                let mut seen = HashSet::new();
                let mut union = Vec::new();
                for child in children {
                    for i in self.select(child, records, candidates)? {
                        if seen.insert(i) {
                            union.push(i);
                        }
                    }
                }
                union
            }
            Filter::Not(child) => {
                let excluded: HashSet<usize> =
                    self.select(child, records, candidates)?.into_iter().collect();
                candidates
                    .iter()
                    .copied()
                    .filter(|i| !excluded.contains(i))
                    .collect()
            }
        };

        self.check_ceiling(selected.len())?;
        Ok(selected)
    }

    // Applied at every completed node, intermediate ones included.
    fn check_ceiling(&self, count: usize) -> InsightResult<()> {
        if count > self.limits.max_results {
            return Err(InsightError::ResultTooLarge {
                count,
                limit: self.limits.max_results,
            });
        }
        Ok(())
    }
}
