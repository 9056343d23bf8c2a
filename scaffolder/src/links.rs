use catalog_protocol::EntityLink;
use serde::Serialize;
use std::collections::BTreeSet;

/// Icon shown for links whose key is missing or unknown.
pub const FALLBACK_ICON: &str = "language";

const SYSTEM_ICONS: &[&str] = &[
    "brokenImage",
    "catalog",
    "chat",
    "dashboard",
    "docs",
    "email",
    "github",
    "group",
    "help",
    "kind:api",
    "kind:component",
    "kind:domain",
    "kind:group",
    "kind:location",
    "kind:system",
    "kind:user",
    "kind:resource",
    "kind:template",
    "scaffolder",
    "search",
    "techdocs",
    "user",
    "warning",
];

/// Maps link icon keys to icons the app knows how to draw.
#[derive(Clone, Debug)]
pub struct IconResolver {
    known: BTreeSet<String>,
}

impl Default for IconResolver {
    fn default() -> Self {
        Self::new(SYSTEM_ICONS.iter().copied())
    }
}

impl IconResolver {
    pub fn new<I, S>(icons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: icons.into_iter().map(Into::into).collect(),
        }
    }

    pub fn resolve(&self, key: Option<&str>) -> String {
        key.map(str::trim)
            .filter(|key| self.known.contains(*key))
            .unwrap_or(FALLBACK_ICON)
            .to_string()
    }
}

/// A link row on a template card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardLink {
    pub icon: String,
    pub text: String,
    pub url: String,
}

impl CardLink {
    /// Blank text is replaced by the url.
    pub fn new(icon: impl Into<String>, text: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let text = text.into();
        let text = if text.trim().is_empty() {
            url.clone()
        } else {
            text
        };
        Self {
            icon: icon.into(),
            text,
            url,
        }
    }

    pub(crate) fn from_entity_link(link: &EntityLink, icons: &IconResolver) -> Self {
        Self::new(
            icons.resolve(link.icon.as_deref()),
            link.title.clone().unwrap_or_default(),
            link.url.clone(),
        )
    }
}
