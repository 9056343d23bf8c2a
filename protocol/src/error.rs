use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid entity reference {raw:?}: {reason}")]
    InvalidEntityRef { raw: String, reason: String },

    #[error("unknown facet {0:?}")]
    UnknownFacet(String),

    #[error("unknown user scope {0:?} (expected owned, starred or all)")]
    UnknownUserScope(String),
}
