use crate::compile::CompoundFilter;
use crate::context::UserContext;
use crate::facet::FacetSet;
use crate::options::OptionSet;
use crate::options::derive_with_filter;
use catalog_protocol::Entity;
use catalog_protocol::FacetId;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::trace;

/// Which part of a compound filter the backend actually applied to the
/// entities it returned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCoverage {
    /// The response is exactly the filtered set.
    #[default]
    Full,
    /// Only these facets were applied server-side; the response is a
    /// superset of the filtered set.
    Partial(BTreeSet<FacetId>),
}

impl FilterCoverage {
    pub fn applied(&self, filter: &CompoundFilter) -> CompoundFilter {
        match self {
            FilterCoverage::Full => filter.clone(),
            FilterCoverage::Partial(facets) => filter.restricted_to(facets),
        }
    }
}

/// A backend response together with the predicates that shaped it.
#[derive(Clone, Debug)]
struct Universe {
    entities: Arc<Vec<Entity>>,
    applied: CompoundFilter,
}

impl Universe {
    /// True when every predicate that narrowed this universe, other than the
    /// one for `target`, is still active unchanged in `current`. Such a
    /// universe contains everything the other facets currently select.
    fn covers_others(&self, target: FacetId, current: &CompoundFilter) -> bool {
        self.applied
            .iter()
            .filter(|(facet, _)| *facet != target)
            .all(|(facet, predicate)| current.get(facet) == Some(predicate))
    }
}

/// Option Deriver with memory of earlier responses.
///
/// When the latest response was itself narrowed by the target facet,
/// deriving options from it would collapse the picker to the values already
/// selected. In that case the deriver falls back to the most recent response
/// that was not narrowed by the target.
#[derive(Clone, Debug, Default)]
pub struct OptionDeriver {
    current: Option<Universe>,
    unconstrained_by: BTreeMap<FacetId, Universe>,
}

impl OptionDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful response for the filter that produced it.
    pub fn record(
        &mut self,
        entities: Arc<Vec<Entity>>,
        filter: &CompoundFilter,
        coverage: &FilterCoverage,
    ) {
        let universe = Universe {
            entities,
            applied: coverage.applied(filter),
        };
        for facet in FacetId::iter().filter(|facet| facet.is_enumerable()) {
            if !universe.applied.constrains(facet) {
                self.unconstrained_by.insert(facet, universe.clone());
            }
        }
        self.current = Some(universe);
    }

    /// The universe to derive `target` options from, and whether counts
    /// taken from it are exact for unselected values.
    fn universe_for(
        &self,
        target: FacetId,
        current_filter: &CompoundFilter,
    ) -> (&[Entity], bool) {
        let Some(current) = &self.current else {
            return (&[], true);
        };
        if !current.applied.constrains(target) {
            return (current.entities.as_slice(), true);
        }
        match self.unconstrained_by.get(&target) {
            Some(fallback) if fallback.covers_others(target, current_filter) => {
                trace!("deriving {target} options from an earlier unconstrained response");
                (fallback.entities.as_slice(), true)
            }
            _ => {
                trace!("no unconstrained response for {target}; unselected counts unknown");
                (current.entities.as_slice(), false)
            }
        }
    }

    pub fn derive(&self, target: FacetId, facets: &FacetSet, ctx: &UserContext) -> OptionSet {
        let filter = facets.compile(ctx);
        let others = filter.without(target);
        let (universe, exact) = self.universe_for(target, &filter);
        derive_with_filter(target, facets, ctx, &others, universe, exact)
    }

    /// Option sets for every registered, enumerable facet.
    pub fn derive_all(&self, facets: &FacetSet, ctx: &UserContext) -> BTreeMap<FacetId, OptionSet> {
        facets
            .ids()
            .filter(|facet| facet.is_enumerable())
            .map(|facet| (facet, self.derive(facet, facets, ctx)))
            .collect()
    }
}
