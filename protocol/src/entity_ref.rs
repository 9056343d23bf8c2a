use crate::error::ProtocolError;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_NAMESPACE: &str = "default";

/// Fully qualified `kind:namespace/name` reference to a catalog entity.
///
/// All three parts are stored lower-cased so that references coming from
/// relations, spec fields and user input compare equal regardless of casing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    kind: String,
    namespace: String,
    name: String,
}

impl EntityRef {
    pub fn new(
        kind: impl AsRef<str>,
        namespace: impl AsRef<str>,
        name: impl AsRef<str>,
    ) -> Result<Self, ProtocolError> {
        let kind = normalize_part("kind", kind.as_ref())?;
        let namespace = normalize_part("namespace", namespace.as_ref())?;
        let name = normalize_part("name", name.as_ref())?;
        Ok(Self {
            kind,
            namespace,
            name,
        })
    }

    /// Parses a reference, filling in a missing kind from `default_kind` and a
    /// missing namespace from [`DEFAULT_NAMESPACE`].
    pub fn parse_with_default_kind(raw: &str, default_kind: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ProtocolError::InvalidEntityRef {
                raw: raw.to_string(),
                reason: "reference is empty".to_string(),
            });
        }
        let (kind, rest) = match raw.split_once(':') {
            Some((kind, rest)) => (kind, rest),
            None => (default_kind, raw),
        };
        let (namespace, name) = match rest.split_once('/') {
            Some((namespace, name)) => (namespace, name),
            None => (DEFAULT_NAMESPACE, rest),
        };
        if name.contains('/') || name.contains(':') {
            return Err(ProtocolError::InvalidEntityRef {
                raw: raw.to_string(),
                reason: "name must not contain ':' or '/'".to_string(),
            });
        }
        Self::new(kind, namespace, name).map_err(|err| match err {
            ProtocolError::InvalidEntityRef { reason, .. } => ProtocolError::InvalidEntityRef {
                raw: raw.to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short human form used by link renderers: the namespace is dropped when
    /// it is the default one and the kind is dropped when it matches
    /// `default_kind`.
    pub fn humanize(&self, default_kind: Option<&str>) -> String {
        let mut out = String::new();
        if default_kind.is_none_or(|kind| !kind.eq_ignore_ascii_case(&self.kind)) {
            out.push_str(&self.kind);
            out.push(':');
        }
        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push('/');
        }
        out.push_str(&self.name);
        out
    }
}

fn normalize_part(part: &str, value: &str) -> Result<String, ProtocolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::InvalidEntityRef {
            raw: value.to_string(),
            reason: format!("{part} is empty"),
        });
    }
    Ok(trimmed.to_ascii_lowercase())
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.kind, self.namespace, self.name)
    }
}

impl FromStr for EntityRef {
    type Err = ProtocolError;

    /// Strict parse: the kind is mandatory.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if !raw.contains(':') {
            return Err(ProtocolError::InvalidEntityRef {
                raw: raw.to_string(),
                reason: "missing kind".to_string(),
            });
        }
        Self::parse_with_default_kind(raw, "")
    }
}

impl Serialize for EntityRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
