use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogClientError {
    #[error("catalog backend error: {0}")]
    Backend(String),

    #[error("catalog backend unavailable: {0}")]
    Unavailable(String),

    #[error("request was cancelled")]
    Cancelled,

    #[error("invalid catalog response: {0}")]
    InvalidResponse(String),

    #[error("identity lookup failed: {0}")]
    Identity(String),
}

impl From<serde_json::Error> for CatalogClientError {
    fn from(err: serde_json::Error) -> Self {
        CatalogClientError::InvalidResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogClientError>;
