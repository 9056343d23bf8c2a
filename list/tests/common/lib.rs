use anyhow::Context;
use async_trait::async_trait;
use catalog_async_utils::OrCancelExt;
use catalog_backend_client::CatalogApi;
use catalog_backend_client::CatalogClientError;
use catalog_backend_client::EntityQuery;
use catalog_backend_client::EntityQueryResponse;
use catalog_backend_client::RequestId;
use catalog_filter::FilterCoverage;
use catalog_list::ListController;
use catalog_list::ListSnapshot;
use catalog_protocol::Entity;
use catalog_protocol::EntityRef;
use catalog_protocol::RELATION_OWNED_BY;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

type Responder = oneshot::Sender<catalog_backend_client::Result<EntityQueryResponse>>;

/// Catalog backend whose responses are released by the test, in whatever
/// order the test chooses.
#[derive(Default)]
pub struct ScriptedCatalog {
    queries: Mutex<Vec<EntityQuery>>,
    consumed: Mutex<usize>,
    responders: Mutex<HashMap<RequestId, Responder>>,
    tokens: Mutex<Vec<(RequestId, CancellationToken)>>,
    arrived: Notify,
}

impl ScriptedCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Waits for the next query the controller issues.
    pub async fn next_query(&self) -> anyhow::Result<EntityQuery> {
        tokio::time::timeout(WAIT_TIMEOUT, async {
            loop {
                {
                    let queries = self.queries.lock().expect("queries lock");
                    let mut consumed = self.consumed.lock().expect("consumed lock");
                    if let Some(query) = queries.get(*consumed) {
                        *consumed += 1;
                        return query.clone();
                    }
                }
                self.arrived.notified().await;
            }
        })
        .await
        .context("timed out waiting for a catalog query")
    }

    pub fn respond(&self, request_id: RequestId, entities: Vec<Entity>) -> anyhow::Result<()> {
        self.respond_with(
            request_id,
            Ok(EntityQueryResponse {
                entities,
                coverage: FilterCoverage::Full,
            }),
        )
    }

    pub fn fail(&self, request_id: RequestId, message: &str) -> anyhow::Result<()> {
        self.respond_with(
            request_id,
            Err(CatalogClientError::Backend(message.to_string())),
        )
    }

    pub fn respond_with(
        &self,
        request_id: RequestId,
        result: catalog_backend_client::Result<EntityQueryResponse>,
    ) -> anyhow::Result<()> {
        let responder = self
            .responders
            .lock()
            .expect("responders lock")
            .remove(&request_id)
            .with_context(|| format!("no pending query {request_id}"))?;
        // The controller may have stopped listening; that is not an error.
        let _ = responder.send(result);
        Ok(())
    }

    pub fn queries(&self) -> Vec<EntityQuery> {
        self.queries.lock().expect("queries lock").clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().expect("queries lock").len()
    }

    /// Request ids whose abort signal has fired, in issue order.
    pub fn cancelled(&self) -> Vec<RequestId> {
        self.tokens
            .lock()
            .expect("tokens lock")
            .iter()
            .filter(|(_, token)| token.is_cancelled())
            .map(|(request_id, _)| *request_id)
            .collect()
    }
}

#[async_trait]
impl CatalogApi for ScriptedCatalog {
    async fn query_entities(
        &self,
        query: EntityQuery,
        cancel: CancellationToken,
    ) -> catalog_backend_client::Result<EntityQueryResponse> {
        let request_id = query.request_id;
        let (tx, rx) = oneshot::channel();
        self.responders
            .lock()
            .expect("responders lock")
            .insert(request_id, tx);
        self.tokens
            .lock()
            .expect("tokens lock")
            .push((request_id, cancel.clone()));
        self.queries.lock().expect("queries lock").push(query);
        self.arrived.notify_one();
        match rx.or_cancel(&cancel).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CatalogClientError::Unavailable(
                "responder dropped".to_string(),
            )),
            Err(_) => Err(CatalogClientError::Cancelled),
        }
    }
}

/// Waits until the controller publishes a snapshot matching `predicate`.
pub async fn wait_for_snapshot<F>(
    controller: &ListController,
    mut predicate: F,
) -> anyhow::Result<Arc<ListSnapshot>>
where
    F: FnMut(&ListSnapshot) -> bool,
{
    let mut rx = controller.watch();
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            let snapshot = Arc::clone(&rx.borrow_and_update());
            if predicate(&snapshot) {
                return Ok::<_, anyhow::Error>(snapshot);
            }
            rx.changed()
                .await
                .context("controller dropped its snapshot channel")?;
        }
    })
    .await
    .context("timed out waiting for a matching snapshot")?
}

pub fn jdoe() -> EntityRef {
    EntityRef::new("user", "default", "jdoe").expect("valid ref")
}

pub fn team_a() -> EntityRef {
    EntityRef::new("group", "default", "team-a").expect("valid ref")
}

pub fn component(name: &str, lifecycle: &str, owner: &str) -> Entity {
    Entity::new("Component", name)
        .with_spec("type", "service")
        .with_spec("lifecycle", lifecycle)
        .with_relation(RELATION_OWNED_BY, owner)
}

/// Five components owned by jdoe or jdoe's team (three in production, two
/// experimental) plus two owned by someone else.
pub fn owned_fixture() -> Vec<Entity> {
    vec![
        component("ledger", "production", "user:default/jdoe").with_tags(["java"]),
        component("billing", "production", "user:default/jdoe").with_tags(["java", "payments"]),
        component("invoices", "production", "group:default/team-a").with_tags(["rust"]),
        component("sandbox", "experimental", "group:default/team-a").with_tags(["alpha"]),
        component("prototype", "experimental", "user:default/jdoe").with_tags(["alpha"]),
        component("search", "production", "group:default/team-b").with_tags(["java"]),
        component("gateway", "deprecated", "user:default/someone").with_tags(["go"]),
    ]
}
