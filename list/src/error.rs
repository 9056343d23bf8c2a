use catalog_backend_client::CatalogClientError;
use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Why the latest query did not produce entities. Stored in snapshots, so it
/// is cheap to clone and serializable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum QueryFailure {
    #[error("catalog request failed: {0}")]
    Backend(String),

    #[error("catalog request timed out after {0} ms")]
    Timeout(u64),
}

impl From<CatalogClientError> for QueryFailure {
    fn from(err: CatalogClientError) -> Self {
        QueryFailure::Backend(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
