use crate::compile::CompoundFilter;
use crate::compile::compile_facet;
use crate::context::UserContext;
use crate::error::Result;
use crate::value::FacetValue;
use catalog_protocol::Entity;
use catalog_protocol::FacetId;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One live filter dimension. `hidden` is a display hint for pickers and
/// never changes what the facet matches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub id: FacetId,
    pub value: FacetValue,
    #[serde(default)]
    pub hidden: bool,
}

impl Facet {
    pub fn matches(&self, entity: &Entity, ctx: &UserContext) -> bool {
        compile_facet(self.id, &self.value, ctx).is_none_or(|predicate| predicate.matches(entity))
    }
}

/// What a picker declares when it mounts: which facet it drives, the value
/// to start from, and whether it is shown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetRegistration {
    pub id: FacetId,
    #[serde(default)]
    pub initial: FacetValue,
    #[serde(default)]
    pub hidden: bool,
}

impl FacetRegistration {
    pub fn new(id: FacetId) -> Self {
        Self {
            id,
            initial: FacetValue::Unset,
            hidden: false,
        }
    }

    pub fn initial(mut self, value: impl Into<FacetValue>) -> Self {
        self.initial = value.into();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOutcome {
    Changed,
    Unchanged,
}

/// The active facets, at most one per [`FacetId`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetSet {
    facets: BTreeMap<FacetId, Facet>,
}

impl FacetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a facet, replacing any previous instance with the same id. An
    /// initial value that does not normalize is dropped and the facet starts
    /// unset.
    pub fn register(&mut self, registration: FacetRegistration) -> SetOutcome {
        let value = match registration.initial.normalize(registration.id) {
            Ok(value) => value,
            Err(err) => {
                debug!("ignoring initial value for {}: {err}", registration.id);
                FacetValue::Unset
            }
        };
        let facet = Facet {
            id: registration.id,
            value,
            hidden: registration.hidden,
        };
        match self.facets.insert(registration.id, facet.clone()) {
            Some(previous) if previous == facet => SetOutcome::Unchanged,
            _ => SetOutcome::Changed,
        }
    }

    /// Normalizes and stores `value`. Setting a facet that was never
    /// registered creates a visible one, unless the value is unset.
    pub fn set(&mut self, id: FacetId, value: FacetValue) -> Result<SetOutcome> {
        let value = value.normalize(id)?;
        match self.facets.get_mut(&id) {
            Some(facet) if facet.value == value => Ok(SetOutcome::Unchanged),
            Some(facet) => {
                facet.value = value;
                Ok(SetOutcome::Changed)
            }
            None if value.is_unset() => Ok(SetOutcome::Unchanged),
            None => {
                self.facets.insert(
                    id,
                    Facet {
                        id,
                        value,
                        hidden: false,
                    },
                );
                Ok(SetOutcome::Changed)
            }
        }
    }

    pub fn get(&self, id: FacetId) -> Option<&Facet> {
        self.facets.get(&id)
    }

    pub fn value(&self, id: FacetId) -> FacetValue {
        self.facets
            .get(&id)
            .map(|facet| facet.value.clone())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Facet> {
        self.facets.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = FacetId> + '_ {
        self.facets.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Pure: equal facet sets and contexts always produce equal filters.
    pub fn compile(&self, ctx: &UserContext) -> CompoundFilter {
        let mut filter = CompoundFilter::new();
        for facet in self.facets.values() {
            if let Some(predicate) = compile_facet(facet.id, &facet.value, ctx) {
                filter.insert(facet.id, predicate);
            }
        }
        filter
    }
}
