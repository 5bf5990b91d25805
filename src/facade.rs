//! Dataset management and query entry point.
//!
//! `InsightFacade` owns the dataset store and hands it by reference to a
//! [`QueryEngine`] for each query.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use insight_core::{
    Dataset, DatasetInfo, DatasetKind, DatasetStore, InMemoryDatasetStore, QueryEngine,
    QueryLimits,
};

use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct InsightFacade {
    store: InMemoryDatasetStore,
    limits: QueryLimits,
}

impl InsightFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: QueryLimits) -> Self {
        Self {
            store: InMemoryDatasetStore::new(),
            limits,
        }
    }

    pub fn store(&self) -> &InMemoryDatasetStore {
        &self.store
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Register a dataset under `id`.
    ///
    /// Record keys that do not already carry the `<id>_` prefix are tagged
    /// with it. Returns the ids of every stored dataset, sorted.
    pub fn add_dataset(
        &mut self,
        id: &str,
        kind: DatasetKind,
        records: Vec<Value>,
    ) -> AppResult<Vec<String>> {
        validate_id(id)?;
        if self.store.contains(id) {
            warn!("Rejected duplicate dataset '{}'", id);
            return Err(AppError::InvalidDataset(format!(
                "Dataset '{}' already exists",
                id
            )));
        }

        let prefix = format!("{}_", id);
        let records = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| tag_record(record, &prefix, i))
            .collect::<AppResult<Vec<Value>>>()?;

        info!(
            "Added {} dataset '{}' with {} records",
            kind,
            id,
            records.len()
        );
        self.store.insert(Dataset::new(id, kind, records));
        Ok(self.store.ids())
    }

    /// Drop a dataset, returning its id.
    pub fn remove_dataset(&mut self, id: &str) -> AppResult<String> {
        validate_id(id)?;
        match self.store.remove(id) {
            Some(_) => {
                info!("Removed dataset '{}'", id);
                Ok(id.to_string())
            }
            None => Err(AppError::DatasetNotFound(id.to_string())),
        }
    }

    /// Summaries of every dataset, sorted by id.
    pub fn list_datasets(&self) -> Vec<DatasetInfo> {
        self.store.list()
    }

    /// Run a query against the registered datasets.
    pub fn perform_query(&self, query: &Value) -> AppResult<Vec<Value>> {
        let engine = QueryEngine::with_limits(&self.store, self.limits);
        match engine.perform_query(query) {
            Ok(results) => Ok(results),
            Err(e) => {
                debug!("Query failed: {}", e);
                Err(e.into())
            }
        }
    }
}

/// A dataset id is non-blank and contains no underscore.
fn validate_id(id: &str) -> AppResult<()> {
    if id.trim().is_empty() {
        return Err(AppError::InvalidDataset(
            "Dataset id must not be blank".to_string(),
        ));
    }
    if id.contains('_') {
        return Err(AppError::InvalidDataset(format!(
            "Dataset id '{}' must not contain an underscore",
            id
        )));
    }
    Ok(())
}

fn tag_record(record: Value, prefix: &str, index: usize) -> AppResult<Value> {
    let Value::Object(fields) = record else {
        return Err(AppError::InvalidDataset(format!(
            "Record {} is not an object",
            index
        )));
    };

    let tagged: Map<String, Value> = fields
        .into_iter()
        .map(|(key, value)| {
            if key.starts_with(prefix) {
                (key, value)
            } else {
                (format!("{}{}", prefix, key), value)
            }
        })
        .collect();
    Ok(Value::Object(tagged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sections() -> Vec<Value> {
        vec![
            json!({"dept": "cpsc", "avg": 95, "title": "310"}),
            json!({"sections_dept": "math", "sections_avg": 85, "sections_title": "210"}),
        ]
    }

    #[test]
    fn test_add_dataset_tags_fields() {
        let mut facade = InsightFacade::new();
        let ids = facade
            .add_dataset("sections", DatasetKind::Sections, sections())
            .unwrap();
        assert_eq!(ids, vec!["sections"]);

        let stored = facade.store().dataset("sections").unwrap();
        assert_eq!(
            stored.records[0],
            json!({"sections_dept": "cpsc", "sections_avg": 95, "sections_title": "310"})
        );
        assert_eq!(stored.records[1]["sections_dept"], "math");
    }

    #[test]
    fn test_add_dataset_returns_sorted_ids() {
        let mut facade = InsightFacade::new();
        facade
            .add_dataset("sections", DatasetKind::Sections, vec![])
            .unwrap();
        let ids = facade
            .add_dataset("rooms", DatasetKind::Rooms, vec![])
            .unwrap();
        assert_eq!(ids, vec!["rooms", "sections"]);
    }

    #[test]
    fn test_add_dataset_rejects_bad_ids() {
        let mut facade = InsightFacade::new();
        for id in ["", "   ", "my_sections"] {
            assert!(matches!(
                facade.add_dataset(id, DatasetKind::Sections, vec![]),
                Err(AppError::InvalidDataset(_))
            ));
        }

        facade
            .add_dataset("sections", DatasetKind::Sections, vec![])
            .unwrap();
        assert!(matches!(
            facade.add_dataset("sections", DatasetKind::Rooms, vec![]),
            Err(AppError::InvalidDataset(_))
        ));
    }

    #[test]
    fn test_add_dataset_rejects_non_object_records() {
        let mut facade = InsightFacade::new();
        let err = facade
            .add_dataset("sections", DatasetKind::Sections, vec![json!([1, 2])])
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDataset(_)));
        assert!(facade.list_datasets().is_empty());
    }

    #[test]
    fn test_remove_dataset() {
        let mut facade = InsightFacade::new();
        facade
            .add_dataset("rooms", DatasetKind::Rooms, vec![])
            .unwrap();

        assert_eq!(facade.remove_dataset("rooms").unwrap(), "rooms");
        assert!(matches!(
            facade.remove_dataset("rooms"),
            Err(AppError::DatasetNotFound(_))
        ));
        assert!(matches!(
            facade.remove_dataset("a_b"),
            Err(AppError::InvalidDataset(_))
        ));
    }

    #[test]
    fn test_list_datasets() {
        let mut facade = InsightFacade::new();
        facade
            .add_dataset("sections", DatasetKind::Sections, sections())
            .unwrap();
        facade
            .add_dataset("rooms", DatasetKind::Rooms, vec![json!({"name": "DMP_110"})])
            .unwrap();

        let infos = facade.list_datasets();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].id, "rooms");
        assert_eq!(infos[0].kind, DatasetKind::Rooms);
        assert_eq!(infos[0].num_rows, 1);
        assert_eq!(infos[1].num_rows, 2);
    }

    #[test]
    fn test_perform_query() {
        let mut facade = InsightFacade::new();
        facade
            .add_dataset("sections", DatasetKind::Sections, sections())
            .unwrap();

        let results = facade
            .perform_query(&json!({
                "WHERE": {"GT": {"sections_avg": 90}},
                "OPTIONS": {"COLUMNS": ["sections_dept", "sections_avg"]}
            }))
            .unwrap();
        assert_eq!(results, vec![json!({"sections_dept": "cpsc", "sections_avg": 95})]);

        let err = facade
            .perform_query(&json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["rooms_name"]}}))
            .unwrap_err();
        assert!(matches!(err, AppError::Insight(_)));
    }

    #[test]
    fn test_perform_query_respects_limits() {
        let mut facade = InsightFacade::with_limits(QueryLimits::with_max_results(1));
        facade
            .add_dataset("sections", DatasetKind::Sections, sections())
            .unwrap();

        let err = facade
            .perform_query(&json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["sections_avg"]}}))
            .unwrap_err();
        assert!(err.is_result_too_large());
    }
}
