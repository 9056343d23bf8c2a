use catalog_protocol::FacetId;
use catalog_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid value for facet {facet}: {reason}")]
    InvalidValue { facet: FacetId, reason: String },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T, FilterError>;
