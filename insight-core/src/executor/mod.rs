//! Executor module for dataset queries.
//!
//! This module provides the evaluation stages (filter, grouping, apply,
//! projection) and a trait-based engine that runs queries against any
//! dataset store implementing the [`DatasetStore`] trait.

mod apply;
mod filter;
mod grouping;
mod helpers;
mod local;
mod options;

pub use apply::process_apply_rules;
pub use filter::FilterEvaluator;
pub use grouping::{group_by_keys, Group};
pub use helpers::*;
pub use local::{referenced_dataset, QueryEngine};
pub use options::OptionsStage;

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::schema::{DatasetKind, DatasetSchema};

/// Default maximum number of matched records a query may produce
pub const DEFAULT_MAX_RESULTS: usize = 5000;

/// An ingested dataset: flat records tagged with the dataset's field prefix.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: String,
    pub kind: DatasetKind,
    pub records: Vec<Value>,
}

impl Dataset {
    pub fn new(id: impl Into<String>, kind: DatasetKind, records: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            kind,
            records,
        }
    }

    pub fn schema(&self) -> DatasetSchema {
        DatasetSchema::new(self.id.clone(), self.kind)
    }

    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            id: self.id.clone(),
            kind: self.kind,
            num_rows: self.records.len(),
        }
    }
}

/// Summary of a stored dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetInfo {
    pub id: String,
    pub kind: DatasetKind,
    #[serde(rename = "numRows")]
    pub num_rows: usize,
}

/// Trait for stores that can hand datasets to the engine.
///
/// The engine only ever reads through `&self`; mutation of a store while a
/// query runs is the caller's responsibility to rule out.
pub trait DatasetStore {
    /// Look up a dataset by id.
    fn dataset(&self, id: &str) -> Option<&Dataset>;

    /// Summaries of every stored dataset.
    fn list(&self) -> Vec<DatasetInfo> {
        vec![]
    }
}

impl<S: DatasetStore + ?Sized> DatasetStore for &S {
    fn dataset(&self, id: &str) -> Option<&Dataset> {
        (**self).dataset(id)
    }

    fn list(&self) -> Vec<DatasetInfo> {
        (**self).list()
    }
}

/// Configuration for query execution limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Maximum number of matched records (default: 5000)
    pub max_results: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl QueryLimits {
    pub fn with_max_results(max_results: usize) -> Self {
        Self { max_results }
    }
}

/// In-memory dataset store
#[derive(Debug, Default)]
pub struct InMemoryDatasetStore {
    datasets: HashMap<String, Dataset>,
}

impl InMemoryDatasetStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a dataset
    pub fn insert(&mut self, dataset: Dataset) {
        self.datasets.insert(dataset.id.clone(), dataset);
    }

    /// Remove a dataset, returning it if it was present
    pub fn remove(&mut self, id: &str) -> Option<Dataset> {
        self.datasets.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.datasets.contains_key(id)
    }

    /// Stored dataset ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.datasets.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl DatasetStore for InMemoryDatasetStore {
    fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.get(id)
    }

    fn list(&self) -> Vec<DatasetInfo> {
        let mut infos: Vec<DatasetInfo> = self.datasets.values().map(Dataset::info).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}
