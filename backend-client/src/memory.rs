use crate::api::CatalogApi;
use crate::api::EntityQuery;
use crate::api::EntityQueryResponse;
use crate::error::CatalogClientError;
use crate::error::Result;
use async_trait::async_trait;
use catalog_async_utils::OrCancelExt;
use catalog_filter::FilterCoverage;
use catalog_protocol::Entity;
use catalog_protocol::FacetId;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Configuration for [`InMemoryCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryCatalogConfig {
    /// Facets the catalog filters on before responding. `None` applies the
    /// whole filter; anything else returns a superset that callers narrow
    /// locally.
    #[serde(default)]
    pub server_side_facets: Option<BTreeSet<FacetId>>,

    /// Artificial latency added to every query.
    #[serde(default)]
    pub latency_ms: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntityDocument {
    List(Vec<Entity>),
    Items { items: Vec<Entity> },
}

/// Catalog backend over a fixed entity list, used by the CLI and tests.
pub struct InMemoryCatalog {
    entities: Vec<Entity>,
    config: InMemoryCatalogConfig,
    queued_failures: Mutex<VecDeque<CatalogClientError>>,
    queries: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self::with_config(entities, InMemoryCatalogConfig::default())
    }

    pub fn with_config(entities: Vec<Entity>, config: InMemoryCatalogConfig) -> Self {
        Self {
            entities,
            config,
            queued_failures: Mutex::new(VecDeque::new()),
            queries: AtomicUsize::new(0),
        }
    }

    /// Parses either a bare JSON array of entities or an `{"items": [...]}`
    /// envelope.
    pub fn parse_entities(json: &str) -> Result<Vec<Entity>> {
        let document: EntityDocument = serde_json::from_str(json)?;
        Ok(match document {
            EntityDocument::List(entities) | EntityDocument::Items { items: entities } => entities,
        })
    }

    /// Makes the next query fail with `error`. Queued failures are consumed
    /// in order.
    pub fn fail_next(&self, error: CatalogClientError) {
        if let Ok(mut queue) = self.queued_failures.lock() {
            queue.push_back(error);
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn coverage(&self) -> FilterCoverage {
        match &self.config.server_side_facets {
            None => FilterCoverage::Full,
            Some(facets) => FilterCoverage::Partial(facets.clone()),
        }
    }

    fn take_failure(&self) -> Option<CatalogClientError> {
        self.queued_failures
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
    }
}

#[async_trait]
impl CatalogApi for InMemoryCatalog {
    async fn query_entities(
        &self,
        query: EntityQuery,
        cancel: CancellationToken,
    ) -> Result<EntityQueryResponse> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.config.latency_ms > 0 {
            sleep(Duration::from_millis(self.config.latency_ms))
                .or_cancel(&cancel)
                .await
                .map_err(|_| CatalogClientError::Cancelled)?;
        }
        if let Some(err) = self.take_failure() {
            debug!(request_id = query.request_id, "in-memory catalog failing query: {err}");
            return Err(err);
        }
        let coverage = self.coverage();
        let applied = coverage.applied(&query.filter);
        let entities = applied.apply(self.entities.iter());
        debug!(
            request_id = query.request_id,
            returned = entities.len(),
            "in-memory catalog answered query"
        );
        Ok(EntityQueryResponse { entities, coverage })
    }
}
