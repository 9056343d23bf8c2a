//! Catalog page layout: the title and the pickers the page mounts.

use crate::config::ListConfig;
use crate::error::ConfigError;
use crate::error::Result;
use catalog_filter::FacetRegistration;
use catalog_protocol::FacetId;
use catalog_protocol::UserScope;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;

pub const SUPPORT_TEXT: &str = "All your software catalog entities";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPageConfig {
    #[serde(default = "default_organization_name")]
    pub organization_name: String,

    /// Scope the user picker starts from.
    #[serde(default)]
    pub initially_selected_filter: UserScope,

    /// Kind the kind picker is locked to.
    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default = "default_true")]
    pub hide_kind_picker: bool,

    #[serde(default)]
    pub list: ListConfig,
}

fn default_organization_name() -> String {
    "Backstage".to_string()
}

fn default_kind() -> String {
    "component".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CatalogPageConfig {
    fn default() -> Self {
        Self {
            organization_name: default_organization_name(),
            initially_selected_filter: UserScope::default(),
            kind: default_kind(),
            hide_kind_picker: true,
            list: ListConfig::default(),
        }
    }
}

impl CatalogPageConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kind.trim().is_empty() {
            return Err(ConfigError::Invalid("kind must not be empty".to_string()));
        }
        self.list.validate()
    }

    pub fn title(&self) -> String {
        let org = self.organization_name.trim();
        let org = if org.is_empty() { "Backstage" } else { org };
        format!("{org} Catalog")
    }

    /// Pickers in page order. The kind picker is locked to `kind`; hiding it
    /// does not stop it from filtering.
    pub fn default_registrations(&self) -> Vec<FacetRegistration> {
        vec![
            FacetRegistration::new(FacetId::Kind)
                .initial(self.kind.as_str())
                .hidden(self.hide_kind_picker),
            FacetRegistration::new(FacetId::Type),
            FacetRegistration::new(FacetId::User).initial(self.initially_selected_filter),
            FacetRegistration::new(FacetId::Owner),
            FacetRegistration::new(FacetId::Lifecycle),
            FacetRegistration::new(FacetId::Tag),
        ]
    }
}
