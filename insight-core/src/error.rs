//! Error types for insight-core.
//!
//! The engine only knows two failure kinds: a query that is rejected, and a
//! query whose matched set grew past the result ceiling.

use thiserror::Error;

/// Query engine error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightError {
    #[error("Invalid query: {0}")]
    Query(String),

    #[error("Result too large: {count} records exceed the limit of {limit}")]
    ResultTooLarge { count: usize, limit: usize },
}

impl InsightError {
    /// Shorthand for building a query error from anything string-like.
    pub fn query(msg: impl Into<String>) -> Self {
        InsightError::Query(msg.into())
    }

    pub fn is_result_too_large(&self) -> bool {
        matches!(self, InsightError::ResultTooLarge { .. })
    }
}

/// Result type for query engine operations
pub type InsightResult<T> = Result<T, InsightError>;

impl serde::Serialize for InsightError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
