use crate::error::QueryFailure;
use catalog_backend_client::RequestId;
use catalog_filter::CompoundFilter;
use catalog_filter::Facet;
use catalog_filter::FacetSet;
use catalog_filter::OptionSet;
use catalog_protocol::Entity;
use catalog_protocol::FacetId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use strum_macros::Display;

/// Lifecycle of one controller instance.
///
/// `Uninitialized -> Loading -> Ready <-> Loading`, `Loading -> Error`,
/// `Error -> Loading`, and `TornDown` from anywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ListPhase {
    Uninitialized,
    Loading,
    Ready,
    Error,
    TornDown,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QueryState {
    Idle,
    Loading {
        request_id: RequestId,
    },
    Success {
        request_id: RequestId,
        #[serde(skip)]
        entities: Arc<Vec<Entity>>,
    },
    Error {
        request_id: RequestId,
        failure: QueryFailure,
    },
}

/// Everything a view needs, published as one immutable value.
///
/// A mutation that changes nothing publishes nothing, so consumers can use
/// `Arc::ptr_eq` on snapshots to skip work.
#[derive(Clone, Debug, Serialize)]
pub struct ListSnapshot {
    /// Increases by one with every published snapshot.
    pub version: u64,
    pub phase: ListPhase,
    pub facets: FacetSet,
    pub filter: CompoundFilter,
    /// Entities of the latest successful response, narrowed by `filter`.
    /// Kept while a later request is loading or has failed.
    pub entities: Arc<Vec<Entity>>,
    pub query_state: QueryState,
    pub options_by_facet: BTreeMap<FacetId, OptionSet>,
    pub error: Option<QueryFailure>,
}

impl ListSnapshot {
    pub(crate) fn initial(facets: FacetSet, filter: CompoundFilter) -> Self {
        Self {
            version: 0,
            phase: ListPhase::Uninitialized,
            facets,
            filter,
            entities: Arc::new(Vec::new()),
            query_state: QueryState::Idle,
            options_by_facet: BTreeMap::new(),
            error: None,
        }
    }

    pub fn facet(&self, id: FacetId) -> Option<&Facet> {
        self.facets.get(id)
    }

    pub fn options(&self, id: FacetId) -> Option<&OptionSet> {
        self.options_by_facet.get(&id)
    }

    pub fn is_loading(&self) -> bool {
        self.phase == ListPhase::Loading
    }
}
