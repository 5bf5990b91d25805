pub mod config;
pub mod error;
pub mod facade;
pub mod loader;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use facade::InsightFacade;
pub use loader::{load_snapshots, remove_snapshot, write_snapshot};

pub use insight_core::{DatasetInfo, DatasetKind, InsightError, QueryLimits};
