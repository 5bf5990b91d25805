//! Query engine over an injected dataset store.
//!
//! Resolves which dataset a query targets, then runs the construct / validate
//! / evaluate lifecycle against that dataset's records.

use serde_json::Value;
use tracing::{debug, warn};

use super::{DatasetStore, QueryLimits};
use crate::error::{InsightError, InsightResult};
use crate::query::Query;
use crate::schema::dataset_prefix;

/// Runs JSON queries against any [`DatasetStore`] implementation.
pub struct QueryEngine<S: DatasetStore> {
    store: S,
    limits: QueryLimits,
}

impl<S: DatasetStore> QueryEngine<S> {
    /// Create a new engine with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            limits: QueryLimits::default(),
        }
    }

    /// Create a new engine with custom limits.
    pub fn with_limits(store: S, limits: QueryLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Execute a query in its JSON form.
    ///
    /// # Returns
    /// The projected (and possibly ordered) result records
    pub fn perform_query(&self, raw: &Value) -> InsightResult<Vec<Value>> {
        let dataset_id = referenced_dataset(raw)
            .ok_or_else(|| InsightError::query("Query does not reference any dataset"))?;
        let dataset = self.store.dataset(&dataset_id).ok_or_else(|| {
            warn!("Query references unknown dataset '{}'", dataset_id);
            InsightError::query(format!("Dataset was not found for ID: {}", dataset_id))
        })?;

        let schema = dataset.schema();
        let query = Query::new(raw, &schema)?.validate()?;
        let results = query.evaluate(&dataset.records, self.limits)?;

        if results.len() > self.limits.max_results {
            return Err(InsightError::ResultTooLarge {
                count: results.len(),
                limit: self.limits.max_results,
            });
        }

        debug!(
            "Query on '{}' returned {} records",
            dataset_id,
            results.len()
        );
        Ok(results)
    }
}

/// Dataset id a query refers to: the prefix of the first field found in
/// WHERE (depth first), otherwise of the first prefixed COLUMNS entry.
pub fn referenced_dataset(raw: &Value) -> Option<String> {
    raw.get("WHERE")
        .and_then(dataset_in_filter)
        .or_else(|| {
            raw.get("OPTIONS")?
                .get("COLUMNS")?
                .as_array()?
                .iter()
                .filter_map(Value::as_str)
                .find_map(dataset_prefix)
        })
        .map(str::to_string)
}

fn dataset_in_filter(node: &Value) -> Option<&str> {
    node.as_object()?.iter().find_map(|(key, value)| match key.as_str() {
        "AND" | "OR" => value.as_array()?.iter().find_map(dataset_in_filter),
        "NOT" => dataset_in_filter(value),
        _ => value.as_object()?.keys().find_map(|field| dataset_prefix(field)),
    })
}
