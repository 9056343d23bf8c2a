use crate::links::CardLink;
use crate::links::IconResolver;
use catalog_backend_client::InMemoryStarredEntities;
use catalog_backend_client::PermissionApi;
use catalog_backend_client::StarredEntitiesApi;
use catalog_protocol::DEFAULT_OWNER_KIND;
use catalog_protocol::Entity;
use catalog_protocol::EntityRef;
use catalog_protocol::RELATION_OWNED_BY;
use chrono::DateTime;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Permission a user needs before a template can be chosen.
pub const TASK_CREATE_PERMISSION: &str = "scaffolder.task.create";

pub const NO_DESCRIPTION: &str = "No description";

const CREATED_AT_ANNOTATION: &str = "created-at";
const UPDATED_AT_ANNOTATION: &str = "updated-at";

/// Which separators the card draws between its sections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CardSections {
    pub default_divider: bool,
    pub tags_divider: bool,
    pub links_divider: bool,
}

impl CardSections {
    fn new(has_tags: bool, has_links: bool) -> Self {
        Self {
            default_divider: !has_tags && !has_links,
            tags_divider: has_tags,
            links_divider: has_links,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TemplateCardOptions {
    /// Rendered ahead of the template's own links.
    pub additional_links: Vec<CardLink>,
    pub icons: IconResolver,
}

/// Everything a template card shows, resolved from a template entity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TemplateCard {
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub template_type: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub links: Vec<CardLink>,
    pub owners: Vec<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDate>,
    pub sections: CardSections,
    pub can_choose: bool,
    /// Whether the template is one of the user's favorites.
    pub starred: bool,
    #[serde(skip)]
    template: Entity,
}

impl TemplateCard {
    pub fn new(template: Entity, can_choose: bool, options: TemplateCardOptions) -> Self {
        let tags: Vec<String> = template.tags().map(str::to_string).collect();
        let mut links = options.additional_links;
        links.extend(
            template
                .metadata
                .links
                .iter()
                .map(|link| CardLink::from_entity_link(link, &options.icons)),
        );
        let description = template
            .metadata
            .description
            .as_deref()
            .filter(|description| !description.trim().is_empty())
            .unwrap_or(NO_DESCRIPTION)
            .to_string();

        Self {
            title: template.display_title().to_string(),
            template_type: template.spec_type().map(str::to_string),
            description,
            sections: CardSections::new(!tags.is_empty(), !links.is_empty()),
            tags,
            links,
            owners: template.relation_targets(RELATION_OWNED_BY).collect(),
            created_at: annotation_date(&template, CREATED_AT_ANNOTATION),
            updated_at: annotation_date(&template, UPDATED_AT_ANNOTATION),
            can_choose,
            starred: false,
            template,
        }
    }

    /// Builds the card after asking `permissions` whether tasks may be
    /// created and `favorites` whether the template is starred.
    pub async fn resolve(
        template: Entity,
        permissions: &dyn PermissionApi,
        favorites: &dyn StarredEntitiesApi,
        options: TemplateCardOptions,
    ) -> Self {
        let can_choose = permissions.authorize(TASK_CREATE_PERMISSION).await;
        let starred = match (template.entity_ref(), favorites.starred().await) {
            (Some(entity_ref), Ok(starred)) => starred.contains(&entity_ref),
            (None, _) => false,
            (Some(_), Err(err)) => {
                warn!("failed to load starred entities: {err}");
                false
            }
        };
        let mut card = Self::new(template, can_choose, options);
        card.starred = starred;
        card
    }

    /// Flips the favorite star in `favorites` and on the card. Returns the
    /// new state.
    pub fn toggle_star(&mut self, favorites: &InMemoryStarredEntities) -> bool {
        let Some(entity_ref) = self.template.entity_ref() else {
            debug!("template {} has no valid ref to star", self.template.metadata.name);
            return self.starred;
        };
        self.starred = favorites.toggle(&entity_ref);
        self.starred
    }

    pub fn template(&self) -> &Entity {
        &self.template
    }

    /// Owner names as the card footer prints them.
    pub fn owner_labels(&self) -> Vec<String> {
        self.owners
            .iter()
            .map(|owner| owner.humanize(Some(DEFAULT_OWNER_KIND)))
            .collect()
    }

    /// Hands the template to `on_selected` when the user may choose it.
    /// Returns whether the callback ran.
    pub fn choose<F>(&self, on_selected: F) -> bool
    where
        F: FnOnce(&Entity),
    {
        if !self.can_choose {
            debug!("template {} is not choosable", self.template.metadata.name);
            return false;
        }
        info!(template = %self.template.metadata.name, "template has been opened");
        on_selected(&self.template);
        true
    }
}

fn annotation_date(template: &Entity, key: &str) -> Option<NaiveDate> {
    let raw = template.metadata.annotations.get(key)?.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));
    match parsed {
        Ok(date) => Some(date),
        Err(err) => {
            debug!("ignoring {key} annotation {raw:?}: {err}");
            None
        }
    }
}
