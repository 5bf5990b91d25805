//! Insight Core - Storage-independent query validator and executor.
//!
//! This crate validates and evaluates JSON queries against in-memory datasets
//! of flat records (course sections or room listings). It has no I/O: callers
//! hand it a dataset store and a query, and get back result records or a
//! typed error.
//!
//! # Main Components
//!
//! - **Validator**: Checks WHERE filters and GROUP/APPLY clauses against the
//!   dataset's attribute whitelist
//! - **AST**: Typed representation of a validated query
//! - **Executor**: Filter, grouping, aggregation and projection stages, plus a
//!   `QueryEngine` that runs queries against a `DatasetStore`
//!
//! # Example
//!
//! ```rust
//! use insight_core::{Dataset, DatasetKind, InMemoryDatasetStore, QueryEngine};
//! use serde_json::json;
//!
//! let mut store = InMemoryDatasetStore::new();
//! store.insert(Dataset::new(
//!     "sections",
//!     DatasetKind::Sections,
//!     vec![
//!         json!({"sections_dept": "cpsc", "sections_avg": 95}),
//!         json!({"sections_dept": "math", "sections_avg": 85}),
//!     ],
//! ));
//!
//! let engine = QueryEngine::new(store);
//! let results = engine
//!     .perform_query(&json!({
//!         "WHERE": {"GT": {"sections_avg": 90}},
//!         "OPTIONS": {"COLUMNS": ["sections_dept"]}
//!     }))
//!     .unwrap();
//! assert_eq!(results, vec![json!({"sections_dept": "cpsc"})]);
//! ```

pub mod ast;
pub mod error;
pub mod executor;
pub mod query;
pub mod schema;
pub mod validator;

// Re-export main types for convenience
pub use ast::{
    AggregateOp, ApplyRule, Direction, Filter, MatchMode, NumericOp, Options, Order,
    StringPattern, Transformations,
};
pub use error::{InsightError, InsightResult};
pub use executor::{
    Dataset, DatasetInfo, DatasetStore, InMemoryDatasetStore, QueryEngine, QueryLimits,
    DEFAULT_MAX_RESULTS,
};
pub use query::{Query, ValidatedQuery};
pub use schema::{DatasetKind, DatasetSchema, FieldType};
pub use validator::FilterValidator;
