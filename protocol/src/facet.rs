use crate::error::ProtocolError;
use serde::Deserialize;
use serde::Serialize;
use std::str::FromStr;
use strum_macros::Display;
use strum_macros::EnumIter;
use strum_macros::IntoStaticStr;

/// One independently controllable filter dimension of the catalog list.
///
/// Declaration order is the order pickers are laid out on the catalog page
/// and the iteration order of compiled filters.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacetId {
    Kind,
    Type,
    User,
    Owner,
    Lifecycle,
    Tag,
    Text,
}

impl FacetId {
    /// Whether the facet accepts a set of values (OR within the facet).
    pub const fn is_multi_valued(self) -> bool {
        matches!(
            self,
            FacetId::Type | FacetId::Owner | FacetId::Lifecycle | FacetId::Tag
        )
    }

    /// Whether pickers for this facet offer a finite list of options.
    pub const fn is_enumerable(self) -> bool {
        !matches!(self, FacetId::Text)
    }

    /// Free-text facets change on every keystroke and are coalesced before a
    /// request is issued.
    pub const fn is_debounced(self) -> bool {
        matches!(self, FacetId::Text)
    }

    /// Facets whose values are compared without regard to case.
    pub const fn is_case_insensitive(self) -> bool {
        matches!(self, FacetId::Kind | FacetId::Type)
    }
}

impl FromStr for FacetId {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "kind" => Ok(FacetId::Kind),
            "type" => Ok(FacetId::Type),
            "user" | "user_scope" | "userscope" => Ok(FacetId::User),
            "owner" | "owners" => Ok(FacetId::Owner),
            "lifecycle" | "lifecycles" => Ok(FacetId::Lifecycle),
            "tag" | "tags" => Ok(FacetId::Tag),
            "text" => Ok(FacetId::Text),
            _ => Err(ProtocolError::UnknownFacet(raw.to_string())),
        }
    }
}

/// The "whose entities" picker: entities owned by the caller, entities the
/// caller starred, or everything.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
    Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserScope {
    #[default]
    Owned,
    Starred,
    All,
}

impl FromStr for UserScope {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "owned" => Ok(UserScope::Owned),
            "starred" => Ok(UserScope::Starred),
            "all" => Ok(UserScope::All),
            _ => Err(ProtocolError::UnknownUserScope(raw.to_string())),
        }
    }
}
