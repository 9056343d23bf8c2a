use crate::compile::CompoundFilter;
use crate::context::UserContext;
use crate::facet::FacetSet;
use catalog_protocol::Entity;
use catalog_protocol::FacetId;
use catalog_protocol::UserScope;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::collections::HashMap;
use strum::IntoEnumIterator;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOption {
    pub value: String,
    /// `None` when the universe the option came from was narrowed by the
    /// facet itself, so only selected values could be counted.
    pub count: Option<usize>,
}

/// Values a picker can still offer given every other active facet.
///
/// `selected` is copied from the facet and never pruned; values that are
/// selected but no longer available are listed in `unavailable_selected` so
/// the picker can mark them instead of dropping them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSet {
    pub facet: Option<FacetId>,
    pub available: Vec<FacetOption>,
    pub selected: BTreeSet<String>,
    pub unavailable_selected: BTreeSet<String>,
}

impl OptionSet {
    pub fn available_values(&self) -> BTreeSet<&str> {
        self.available
            .iter()
            .map(|option| option.value.as_str())
            .collect()
    }

    pub fn is_available(&self, value: &str) -> bool {
        self.available.iter().any(|option| option.value == value)
    }

    /// Known count of `value`. `None` when it is not offered or its count
    /// is unknown.
    pub fn count(&self, value: &str) -> Option<usize> {
        self.available
            .iter()
            .find(|option| option.value == value)
            .and_then(|option| option.count)
    }
}

/// Derives the option set for `target` from `universe`, constrained by the
/// compiled filter of every *other* facet.
///
/// Entities that lack the target field contribute nothing, so a universe
/// without that data yields an empty option list rather than an error.
pub fn derive_options(
    target: FacetId,
    facets: &FacetSet,
    ctx: &UserContext,
    universe: &[Entity],
) -> OptionSet {
    let others = facets.compile(ctx).without(target);
    derive_with_filter(target, facets, ctx, &others, universe, true)
}

/// `exact` is false when `universe` was narrowed by `target` itself. Only
/// selected values are then counted in full; other counts are unknown.
pub(crate) fn derive_with_filter(
    target: FacetId,
    facets: &FacetSet,
    ctx: &UserContext,
    others: &CompoundFilter,
    universe: &[Entity],
    exact: bool,
) -> OptionSet {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entity in universe.iter().filter(|entity| others.matches(entity)) {
        for value in facet_values(target, entity, ctx) {
            *counts.entry(value).or_default() += 1;
        }
    }
    let selected = facets.value(target).values();
    let known = |value: &str| exact || selected.contains(value);
    let available = if target == FacetId::User {
        user_scope_options(&counts, known)
    } else {
        sort_options(counts, known)
    };
    let unavailable_selected = selected
        .iter()
        .filter(|value| !available.iter().any(|option| &option.value == *value))
        .cloned()
        .collect();
    OptionSet {
        facet: Some(target),
        available,
        selected,
        unavailable_selected,
    }
}

/// Projects the values `entity` has along `facet`, in the same canonical form
/// facet values normalize to.
pub fn facet_values(facet: FacetId, entity: &Entity, ctx: &UserContext) -> Vec<String> {
    match facet {
        FacetId::Kind => {
            let kind = entity.kind.trim();
            if kind.is_empty() {
                Vec::new()
            } else {
                vec![kind.to_ascii_lowercase()]
            }
        }
        FacetId::Type => entity
            .spec_type()
            .map(str::to_ascii_lowercase)
            .into_iter()
            .collect(),
        FacetId::Lifecycle => entity.lifecycle().map(str::to_string).into_iter().collect(),
        FacetId::Owner => entity
            .owner_refs()
            .iter()
            .map(ToString::to_string)
            .collect(),
        FacetId::Tag => {
            let tags: BTreeSet<&str> = entity.tags().collect();
            tags.into_iter().map(str::to_string).collect()
        }
        FacetId::User => {
            let mut scopes = vec![UserScope::All.to_string()];
            if entity
                .owner_refs()
                .iter()
                .any(|owner| ctx.ownership_refs.contains(owner))
            {
                scopes.push(UserScope::Owned.to_string());
            }
            if entity
                .entity_ref()
                .is_some_and(|entity_ref| ctx.starred.contains(&entity_ref))
            {
                scopes.push(UserScope::Starred.to_string());
            }
            scopes
        }
        FacetId::Text => Vec::new(),
    }
}

/// Count desc, unknown counts last, then by value.
fn sort_options<F>(counts: HashMap<String, usize>, known: F) -> Vec<FacetOption>
where
    F: Fn(&str) -> bool,
{
    let mut options: Vec<FacetOption> = counts
        .into_iter()
        .map(|(value, count)| {
            let count = known(value.as_str()).then_some(count);
            FacetOption { value, count }
        })
        .collect();
    options.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    options
}

/// The user picker always lists every scope, in picker order, even at zero.
fn user_scope_options<F>(counts: &HashMap<String, usize>, known: F) -> Vec<FacetOption>
where
    F: Fn(&str) -> bool,
{
    UserScope::iter()
        .map(|scope| {
            let value = scope.to_string();
            let count = known(value.as_str()).then(|| counts.get(&value).copied().unwrap_or(0));
            FacetOption { value, count }
        })
        .collect()
}
