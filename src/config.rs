//! Configuration handling for the insightql binary
//!
//! Settings come from an optional `insightql.toml` file, then environment
//! overrides, then command-line flags (applied by the binary).
//!
//! ## Environment Variables
//!
//! - `INSIGHTQL_DATA_DIR` - Directory holding dataset snapshots
//! - `INSIGHTQL_MAX_RESULTS` - Result ceiling for a single query
//! - `INSIGHTQL_LOG` - Tracing filter directive
//!
//! These can be set in a `.env` file next to the config file.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use insight_core::{QueryLimits, DEFAULT_MAX_RESULTS};

use crate::error::{AppError, AppResult};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "insightql.toml";

/// Environment variable names
pub const ENV_DATA_DIR: &str = "INSIGHTQL_DATA_DIR";
pub const ENV_MAX_RESULTS: &str = "INSIGHTQL_MAX_RESULTS";
pub const ENV_LOG: &str = "INSIGHTQL_LOG";

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "insightql=info,insight_core=info";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Directory holding dataset snapshots
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Maximum number of records a query may produce
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Tracing filter directive
    #[serde(default = "default_log")]
    pub log: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_log() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_results: default_max_results(),
            log: default_log(),
        }
    }
}

impl Config {
    /// Load configuration from a directory
    ///
    /// This also loads any `.env` file in the directory and applies
    /// environment variable overrides. A missing config file yields the
    /// defaults.
    pub fn load(dir: &Path) -> AppResult<Self> {
        Self::load_with_env(dir, ".env")
    }

    /// Load configuration with a specific env file
    fn load_with_env(dir: &Path, env_file: &str) -> AppResult<Self> {
        // Load env file if present (ignore errors)
        let env_path = dir.join(env_file);
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let mut config = Self::from_file(&dir.join(CONFIG_FILE_NAME))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Read a config file, or the defaults when it does not exist
    pub fn from_file(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    pub fn apply_env_overrides(&mut self) -> AppResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            if !dir.is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }

        if let Some(max) = lookup(ENV_MAX_RESULTS) {
            self.max_results = max.trim().parse::<usize>().map_err(|_| {
                AppError::Config(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_MAX_RESULTS, max
                ))
            })?;
        }

        if let Some(log) = lookup(ENV_LOG) {
            if !log.is_empty() {
                self.log = log;
            }
        }

        self.check()
    }

    fn check(&self) -> AppResult<()> {
        if self.max_results == 0 {
            return Err(AppError::Config("max_results must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Query limits derived from this configuration
    pub fn limits(&self) -> QueryLimits {
        QueryLimits::with_max_results(self.max_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.max_results, 5000);
        assert_eq!(config.limits(), QueryLimits::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::from_file(&tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "max_results = 10\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.max_results, 10);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_invalid_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, "max_results = \"lots\"\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(AppError::Config(_))));

        std::fs::write(&path, "max_results = 0\n").unwrap();
        assert!(matches!(Config::from_file(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_full_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "data_dir = \"/var/lib/insightql\"\nmax_results = 250\nlog = \"insightql=debug\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/insightql"));
        assert_eq!(config.max_results, 250);
        assert_eq!(config.log, "insightql=debug");
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup_from(&[
                (ENV_DATA_DIR, "/tmp/datasets"),
                (ENV_MAX_RESULTS, "42"),
                (ENV_LOG, "insight_core=trace"),
            ]))
            .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/datasets"));
        assert_eq!(config.max_results, 42);
        assert_eq!(config.log, "insight_core=trace");

        // Empty values leave the setting alone
        config
            .apply_overrides(lookup_from(&[(ENV_DATA_DIR, "")]))
            .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/datasets"));
    }

    #[test]
    fn test_bad_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup_from(&[(ENV_MAX_RESULTS, "many")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_RESULTS));
    }
}
