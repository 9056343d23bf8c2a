use crate::context::UserContext;
use crate::value::FacetValue;
use catalog_protocol::DEFAULT_OWNER_KIND;
use catalog_protocol::Entity;
use catalog_protocol::EntityRef;
use catalog_protocol::FacetId;
use catalog_protocol::UserScope;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Compiled constraint contributed by one facet. Sets are OR-within.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "values")]
pub enum Predicate {
    Kind(String),
    Type(BTreeSet<String>),
    Lifecycle(BTreeSet<String>),
    Owner(BTreeSet<EntityRef>),
    Tag(BTreeSet<String>),
    OwnedBy(BTreeSet<EntityRef>),
    Starred(BTreeSet<EntityRef>),
    /// Lower-cased terms; every term must appear in some searchable field.
    Text(Vec<String>),
}

impl Predicate {
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Predicate::Kind(kind) => entity.kind.eq_ignore_ascii_case(kind),
            Predicate::Type(types) => entity
                .spec_type()
                .is_some_and(|value| types.contains(&value.to_ascii_lowercase())),
            Predicate::Lifecycle(lifecycles) => entity
                .lifecycle()
                .is_some_and(|value| lifecycles.contains(value)),
            Predicate::Owner(owners) | Predicate::OwnedBy(owners) => entity
                .owner_refs()
                .iter()
                .any(|owner| owners.contains(owner)),
            Predicate::Tag(tags) => entity.tags().any(|tag| tags.contains(tag)),
            Predicate::Starred(starred) => entity
                .entity_ref()
                .is_some_and(|entity_ref| starred.contains(&entity_ref)),
            Predicate::Text(terms) => {
                let haystack = searchable_fields(entity);
                terms
                    .iter()
                    .all(|term| haystack.iter().any(|field| field.contains(term.as_str())))
            }
        }
    }
}

fn searchable_fields(entity: &Entity) -> Vec<String> {
    let mut fields = vec![
        entity.metadata.name.to_ascii_lowercase(),
        entity.kind.to_ascii_lowercase(),
    ];
    fields.extend(
        [
            entity.metadata.title.as_deref(),
            entity.metadata.description.as_deref(),
            entity.spec_type(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_lowercase),
    );
    fields.extend(entity.tags().map(str::to_lowercase));
    fields
}

/// Compiles one facet value. `None` means the facet does not constrain the
/// list (unset, or the `all` user scope).
pub fn compile_facet(facet: FacetId, value: &FacetValue, ctx: &UserContext) -> Option<Predicate> {
    if value.is_unset() {
        return None;
    }
    let values = value.values();
    match facet {
        FacetId::Kind => value
            .as_single()
            .map(|kind| Predicate::Kind(kind.to_ascii_lowercase())),
        FacetId::Type => Some(Predicate::Type(
            values.iter().map(|v| v.to_ascii_lowercase()).collect(),
        )),
        FacetId::Lifecycle => Some(Predicate::Lifecycle(values)),
        FacetId::Tag => Some(Predicate::Tag(values)),
        FacetId::Owner => Some(Predicate::Owner(
            values
                .iter()
                .filter_map(|raw| EntityRef::parse_with_default_kind(raw, DEFAULT_OWNER_KIND).ok())
                .collect(),
        )),
        FacetId::User => match value.as_single()?.parse::<UserScope>().ok()? {
            UserScope::Owned => Some(Predicate::OwnedBy(ctx.ownership_refs.clone())),
            UserScope::Starred => Some(Predicate::Starred(ctx.starred.clone())),
            UserScope::All => None,
        },
        FacetId::Text => {
            let terms: Vec<String> = value
                .as_single()?
                .split_whitespace()
                .map(str::to_lowercase)
                .collect();
            (!terms.is_empty()).then_some(Predicate::Text(terms))
        }
    }
}

/// AND-combination of facet predicates keyed by facet. Absent facets do not
/// constrain the result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundFilter {
    predicates: BTreeMap<FacetId, Predicate>,
}

impl CompoundFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, facet: FacetId, predicate: Predicate) {
        self.predicates.insert(facet, predicate);
    }

    pub fn get(&self, facet: FacetId) -> Option<&Predicate> {
        self.predicates.get(&facet)
    }

    pub fn constrains(&self, facet: FacetId) -> bool {
        self.predicates.contains_key(&facet)
    }

    pub fn facets(&self) -> BTreeSet<FacetId> {
        self.predicates.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FacetId, &Predicate)> {
        self.predicates.iter().map(|(facet, predicate)| (*facet, predicate))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.predicates
            .values()
            .all(|predicate| predicate.matches(entity))
    }

    /// Filter of every facet except `facet`; what a picker for `facet` has to
    /// choose from.
    pub fn without(&self, facet: FacetId) -> CompoundFilter {
        let mut predicates = self.predicates.clone();
        predicates.remove(&facet);
        CompoundFilter { predicates }
    }

    /// Keeps only the given facets, e.g. the ones a backend filters on.
    pub fn restricted_to(&self, facets: &BTreeSet<FacetId>) -> CompoundFilter {
        CompoundFilter {
            predicates: self
                .predicates
                .iter()
                .filter(|(facet, _)| facets.contains(facet))
                .map(|(facet, predicate)| (*facet, predicate.clone()))
                .collect(),
        }
    }

    pub fn apply<'a, I>(&self, entities: I) -> Vec<Entity>
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        entities
            .into_iter()
            .filter(|entity| self.matches(entity))
            .cloned()
            .collect()
    }
}
