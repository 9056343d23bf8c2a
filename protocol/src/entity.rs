use crate::entity_ref::DEFAULT_NAMESPACE;
use crate::entity_ref::EntityRef;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use std::collections::BTreeMap;

pub const RELATION_OWNED_BY: &str = "ownedBy";
pub const RELATION_MEMBER_OF: &str = "memberOf";

/// Kind assumed for bare owner names such as `spec.owner: team-a`.
pub const DEFAULT_OWNER_KIND: &str = "group";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityLink {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<EntityLink>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRelation {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub target_ref: String,
}

/// A catalog entity as returned by the backend.
///
/// Only the fields the list controller filters on are typed; the rest of the
/// `spec` is kept as raw JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMetadata,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub spec: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<EntityRelation>,
}

fn default_api_version() -> String {
    "backstage.io/v1alpha1".to_string()
}

impl Entity {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: kind.into(),
            metadata: EntityMetadata {
                name: name.into(),
                ..Default::default()
            },
            spec: Map::new(),
            relations: Vec::new(),
        }
    }

    pub fn with_spec(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.spec.insert(key.to_string(), value.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relation(mut self, relation_type: &str, target_ref: impl Into<String>) -> Self {
        self.relations.push(EntityRelation {
            relation_type: relation_type.to_string(),
            target_ref: target_ref.into(),
        });
        self
    }

    pub fn namespace(&self) -> &str {
        self.metadata
            .namespace
            .as_deref()
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Identity used for selection and favorites. `None` when the kind or
    /// name is blank.
    pub fn entity_ref(&self) -> Option<EntityRef> {
        EntityRef::new(&self.kind, self.namespace(), &self.metadata.name).ok()
    }

    pub fn spec_str(&self, key: &str) -> Option<&str> {
        self.spec
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// `spec.type`, e.g. `service` or `website`.
    pub fn spec_type(&self) -> Option<&str> {
        self.spec_str("type")
    }

    pub fn lifecycle(&self) -> Option<&str> {
        self.spec_str("lifecycle")
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.metadata
            .tags
            .iter()
            .map(String::as_str)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }

    pub fn relation_targets<'a>(
        &'a self,
        relation_type: &'a str,
    ) -> impl Iterator<Item = EntityRef> + 'a {
        self.relations
            .iter()
            .filter(move |relation| relation.relation_type == relation_type)
            .filter_map(|relation| {
                EntityRef::parse_with_default_kind(&relation.target_ref, DEFAULT_OWNER_KIND).ok()
            })
    }

    /// Owners from `ownedBy` relations; falls back to `spec.owner` for
    /// entities that have not been processed into relations yet.
    pub fn owner_refs(&self) -> Vec<EntityRef> {
        let mut owners: Vec<EntityRef> = self.relation_targets(RELATION_OWNED_BY).collect();
        if owners.is_empty()
            && let Some(owner) = self.spec_str("owner")
            && let Ok(parsed) = EntityRef::parse_with_default_kind(owner, DEFAULT_OWNER_KIND)
        {
            owners.push(parsed);
        }
        owners.sort();
        owners.dedup();
        owners
    }

    pub fn display_title(&self) -> &str {
        self.metadata
            .title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(&self.metadata.name)
    }
}
