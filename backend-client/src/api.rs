use crate::error::Result;
use async_trait::async_trait;
use catalog_filter::CompoundFilter;
use catalog_filter::FilterCoverage;
use catalog_protocol::Entity;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Monotonic per-controller request token.
pub type RequestId = u64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityQuery {
    pub request_id: RequestId,
    pub filter: CompoundFilter,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityQueryResponse {
    pub entities: Vec<Entity>,
    /// Which predicates of the query shaped `entities`.
    #[serde(default)]
    pub coverage: FilterCoverage,
}

/// Catalog backend the list controller queries.
///
/// Implementations should stop work when `cancel` fires but are not required
/// to; callers discard superseded responses regardless.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn query_entities(
        &self,
        query: EntityQuery,
        cancel: CancellationToken,
    ) -> Result<EntityQueryResponse>;
}
