use crate::error::FilterError;
use crate::error::Result;
use catalog_protocol::DEFAULT_OWNER_KIND;
use catalog_protocol::EntityRef;
use catalog_protocol::FacetId;
use catalog_protocol::UserScope;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;

/// Value held by a facet. Multi-valued facets always normalize to `Many`,
/// single-valued ones to `One`, so structurally equal selections compare
/// equal no matter how a picker phrased them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetValue {
    #[default]
    Unset,
    One(String),
    Many(BTreeSet<String>),
}

impl FacetValue {
    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FacetValue::Many(values.into_iter().map(Into::into).collect())
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, FacetValue::Unset)
    }

    pub fn values(&self) -> BTreeSet<String> {
        match self {
            FacetValue::Unset => BTreeSet::new(),
            FacetValue::One(value) => BTreeSet::from([value.clone()]),
            FacetValue::Many(values) => values.clone(),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            FacetValue::One(value) => Some(value),
            FacetValue::Many(values) if values.len() == 1 => {
                values.iter().next().map(String::as_str)
            }
            _ => None,
        }
    }

    /// Canonical form of `self` for `facet`, or an error when the value makes
    /// no sense for that facet (unknown user scope, unparsable owner, several
    /// values on a single-valued facet).
    pub fn normalize(self, facet: FacetId) -> Result<FacetValue> {
        let raw: Vec<String> = match self {
            FacetValue::Unset => return Ok(FacetValue::Unset),
            FacetValue::One(value) => vec![value],
            FacetValue::Many(values) => values.into_iter().collect(),
        };
        let mut values = BTreeSet::new();
        for value in raw {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            values.insert(canonical_value(facet, trimmed)?);
        }
        if values.is_empty() {
            return Ok(FacetValue::Unset);
        }
        if facet.is_multi_valued() {
            return Ok(FacetValue::Many(values));
        }
        if values.len() > 1 {
            return Err(FilterError::InvalidValue {
                facet,
                reason: format!("expected a single value, got {}", values.len()),
            });
        }
        Ok(values
            .into_iter()
            .next()
            .map_or(FacetValue::Unset, FacetValue::One))
    }
}

fn canonical_value(facet: FacetId, value: &str) -> Result<String> {
    if facet.is_case_insensitive() {
        return Ok(value.to_ascii_lowercase());
    }
    match facet {
        FacetId::Owner => {
            Ok(EntityRef::parse_with_default_kind(value, DEFAULT_OWNER_KIND)?.to_string())
        }
        FacetId::User => Ok(value.parse::<UserScope>()?.to_string()),
        FacetId::Kind | FacetId::Type | FacetId::Lifecycle | FacetId::Tag | FacetId::Text => {
            Ok(value.to_string())
        }
    }
}

impl From<&str> for FacetValue {
    fn from(value: &str) -> Self {
        FacetValue::One(value.to_string())
    }
}

impl From<String> for FacetValue {
    fn from(value: String) -> Self {
        FacetValue::One(value)
    }
}

impl From<UserScope> for FacetValue {
    fn from(scope: UserScope) -> Self {
        FacetValue::One(scope.to_string())
    }
}

impl From<Vec<&str>> for FacetValue {
    fn from(values: Vec<&str>) -> Self {
        FacetValue::many(values)
    }
}

impl From<Vec<String>> for FacetValue {
    fn from(values: Vec<String>) -> Self {
        FacetValue::many(values)
    }
}

impl<const N: usize> From<[&str; N]> for FacetValue {
    fn from(values: [&str; N]) -> Self {
        FacetValue::many(values)
    }
}

impl<T: Into<FacetValue>> From<Option<T>> for FacetValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FacetValue::Unset, Into::into)
    }
}
