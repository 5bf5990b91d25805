use insight_core::InsightError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Insight(#[from] InsightError),

    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True when the underlying failure is the query result ceiling.
    pub fn is_result_too_large(&self) -> bool {
        matches!(self, AppError::Insight(e) if e.is_result_too_large())
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AppError::DatasetNotFound("rooms".to_string());
        assert_eq!(err.to_string(), "Dataset 'rooms' not found");

        let err = AppError::InvalidDataset("id contains an underscore".to_string());
        assert_eq!(err.to_string(), "Invalid dataset: id contains an underscore");

        let err = AppError::Config("bad max_results".to_string());
        assert_eq!(err.to_string(), "Config error: bad max_results");

        let err: AppError = InsightError::query("Missing COLUMNS").into();
        assert_eq!(err.to_string(), "Invalid query: Missing COLUMNS");
    }

    #[test]
    fn test_result_too_large_passthrough() {
        let err: AppError = InsightError::ResultTooLarge {
            count: 5001,
            limit: 5000,
        }
        .into();
        assert!(err.is_result_too_large());
        assert!(!AppError::DatasetNotFound("x".to_string()).is_result_too_large());
    }

    #[test]
    fn test_error_serialization() {
        let err = AppError::DatasetNotFound("sections".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!("Dataset 'sections' not found"));
    }

    #[test]
    fn test_app_result_type() {
        let ok_result: AppResult<i32> = Ok(42);
        assert_eq!(ok_result.unwrap(), 42);

        let err_result: AppResult<i32> = Err(AppError::Config("x".to_string()));
        assert!(err_result.is_err());
    }
}
