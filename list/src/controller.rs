use crate::config::ListConfig;
use crate::error::QueryFailure;
use crate::executor::Dispatch;
use crate::executor::QueryExecutor;
use crate::snapshot::ListPhase;
use crate::snapshot::ListSnapshot;
use crate::snapshot::QueryState;
use catalog_async_utils::sleep_or_cancel;
use catalog_backend_client::CatalogApi;
use catalog_backend_client::EntityQueryResponse;
use catalog_backend_client::IdentityApi;
use catalog_backend_client::RequestId;
use catalog_backend_client::StarredEntitiesApi;
use catalog_backend_client::resolve_user_context;
use catalog_filter::CompoundFilter;
use catalog_filter::Facet;
use catalog_filter::FacetRegistration;
use catalog_filter::FacetSet;
use catalog_filter::FacetValue;
use catalog_filter::OptionDeriver;
use catalog_filter::OptionSet;
use catalog_filter::SetOutcome;
use catalog_filter::UserContext;
use catalog_protocol::Entity;
use catalog_protocol::FacetId;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

type Listener = Arc<dyn Fn(&Arc<ListSnapshot>) + Send + Sync>;

/// Owns the facet set of one catalog view and keeps entities and picker
/// options in sync with it.
///
/// Mutations apply synchronously in call order and never fail; the only
/// asynchronous work is the backend fetch, whose outcome is applied only if
/// it belongs to the latest issued request. Clones share the same state.
#[derive(Clone)]
pub struct ListController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    listeners: Mutex<BTreeMap<u64, Listener>>,
    next_listener_id: AtomicU64,
    notified_version: AtomicU64,
    snapshots: watch::Sender<Arc<ListSnapshot>>,
    identity: Option<Arc<dyn IdentityApi>>,
    starred: Option<Arc<dyn StarredEntitiesApi>>,
}

struct State {
    phase: ListPhase,
    facets: FacetSet,
    user_context: UserContext,
    executor: QueryExecutor,
    deriver: OptionDeriver,
    entities: Arc<Vec<Entity>>,
    query_state: QueryState,
    error: Option<QueryFailure>,
    snapshot: Arc<ListSnapshot>,
    runtime: Option<Handle>,
}

impl State {
    /// Builds the next snapshot from current state and hands it to watchers.
    /// Runs under the state lock so watchers see versions in order.
    fn publish(&mut self, snapshots: &watch::Sender<Arc<ListSnapshot>>) -> Arc<ListSnapshot> {
        let snapshot = Arc::new(ListSnapshot {
            version: self.snapshot.version + 1,
            phase: self.phase,
            facets: self.facets.clone(),
            filter: self.facets.compile(&self.user_context),
            entities: Arc::clone(&self.entities),
            query_state: self.query_state.clone(),
            options_by_facet: self.deriver.derive_all(&self.facets, &self.user_context),
            error: self.error.clone(),
        });
        self.snapshot = Arc::clone(&snapshot);
        snapshots.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    fn compiled(&self) -> CompoundFilter {
        self.facets.compile(&self.user_context)
    }

    fn is_live(&self) -> bool {
        !matches!(self.phase, ListPhase::Uninitialized | ListPhase::TornDown)
    }
}

pub struct ListControllerBuilder {
    api: Arc<dyn CatalogApi>,
    config: ListConfig,
    registrations: Vec<FacetRegistration>,
    user_context: UserContext,
    identity: Option<Arc<dyn IdentityApi>>,
    starred: Option<Arc<dyn StarredEntitiesApi>>,
}

impl ListControllerBuilder {
    pub fn config(mut self, config: ListConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register(mut self, registration: FacetRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    pub fn registrations<I>(mut self, registrations: I) -> Self
    where
        I: IntoIterator<Item = FacetRegistration>,
    {
        self.registrations.extend(registrations);
        self
    }

    /// Context used until providers resolve, or for good when none are set.
    pub fn user_context(mut self, user_context: UserContext) -> Self {
        self.user_context = user_context;
        self
    }

    pub fn providers(
        mut self,
        identity: Arc<dyn IdentityApi>,
        starred: Arc<dyn StarredEntitiesApi>,
    ) -> Self {
        self.identity = Some(identity);
        self.starred = Some(starred);
        self
    }

    /// Builds an `Uninitialized` controller. Nothing is fetched until
    /// [`ListController::start`].
    pub fn build(self) -> ListController {
        let mut facets = FacetSet::new();
        for registration in self.registrations {
            facets.register(registration);
        }
        let filter = facets.compile(&self.user_context);
        let snapshot = Arc::new(ListSnapshot::initial(facets.clone(), filter));
        let (snapshots, _) = watch::channel(Arc::clone(&snapshot));
        let state = State {
            phase: ListPhase::Uninitialized,
            facets,
            user_context: self.user_context,
            executor: QueryExecutor::new(self.api, self.config, CancellationToken::new()),
            deriver: OptionDeriver::new(),
            entities: Arc::new(Vec::new()),
            query_state: QueryState::Idle,
            error: None,
            snapshot,
            runtime: None,
        };
        ListController {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener_id: AtomicU64::new(0),
                notified_version: AtomicU64::new(0),
                snapshots,
                identity: self.identity,
                starred: self.starred,
            }),
        }
    }
}

impl ListController {
    pub fn builder(api: Arc<dyn CatalogApi>) -> ListControllerBuilder {
        ListControllerBuilder {
            api,
            config: ListConfig::default(),
            registrations: Vec::new(),
            user_context: UserContext::default(),
            identity: None,
            starred: None,
        }
    }

    /// Resolves the user context and issues the first request.
    pub async fn start(&self) {
        let resolved = self.resolve_providers().await;
        let published = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if state.phase != ListPhase::Uninitialized {
                return;
            }
            if let Some(user_context) = resolved {
                state.user_context = user_context;
            }
            state.runtime = Handle::try_current().ok();
            if state.runtime.is_none() {
                warn!("list controller started outside a tokio runtime; nothing will be fetched");
            }
            let filter = state.compiled();
            let dispatch = state.executor.issue(filter, true);
            match dispatch {
                Some(dispatch) => self.spawn_dispatch(&mut state, dispatch),
                None => state.phase = ListPhase::Ready,
            }
            state.publish(&self.inner.snapshots)
        };
        self.notify(published);
    }

    /// Current published state.
    pub fn snapshot(&self) -> Arc<ListSnapshot> {
        Arc::clone(&self.inner.snapshots.borrow())
    }

    /// A receiver that always holds the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<ListSnapshot>> {
        self.inner.snapshots.subscribe()
    }

    pub fn facet(&self, id: FacetId) -> Option<Facet> {
        self.snapshot().facet(id).cloned()
    }

    pub fn options(&self, id: FacetId) -> Option<OptionSet> {
        self.snapshot().options(id).cloned()
    }

    /// Sets one facet. Values that do not normalize are ignored and the
    /// previous value is kept; an unchanged value publishes nothing.
    pub fn set_facet(&self, id: FacetId, value: impl Into<FacetValue>) {
        let value = value.into();
        self.mutate(id, |facets| match facets.set(id, value) {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!("ignoring value for {id}: {err}");
                SetOutcome::Unchanged
            }
        });
    }

    pub fn clear_facet(&self, id: FacetId) {
        self.set_facet(id, FacetValue::Unset);
    }

    /// Installs a picker's facet, replacing any facet with the same id.
    pub fn register_facet(&self, registration: FacetRegistration) {
        let id = registration.id;
        self.mutate(id, |facets| facets.register(registration));
    }

    /// Re-issues the current filter even if it was issued before.
    pub fn retry(&self) {
        let published = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if !state.is_live() {
                return;
            }
            let filter = state.compiled();
            let Some(dispatch) = state.executor.issue(filter, true) else {
                return;
            };
            info!(request_id = dispatch.request_id, "retrying catalog request");
            self.spawn_dispatch(&mut state, dispatch);
            state.publish(&self.inner.snapshots)
        };
        self.notify(published);
    }

    /// Re-resolves identity and favorites. Refetches when the compiled
    /// filter changes as a result.
    pub async fn refresh_user_context(&self) {
        let Some(user_context) = self.resolve_providers().await else {
            return;
        };
        let published = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if state.phase == ListPhase::TornDown || state.user_context == user_context {
                return;
            }
            state.user_context = user_context;
            if state.is_live() {
                let filter = state.compiled();
                if let Some(dispatch) = state.executor.issue(filter, false) {
                    self.spawn_dispatch(&mut state, dispatch);
                }
            }
            state.publish(&self.inner.snapshots)
        };
        self.notify(published);
    }

    /// Registers `listener` for every snapshot published from now on.
    /// Listeners run outside the controller lock and may call back into it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<ListSnapshot>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        let torn_down = self.snapshot().phase == ListPhase::TornDown;
        if !torn_down && let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.insert(id, Arc::new(listener));
        }
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Cancels outstanding work and releases listeners. Responses that
    /// arrive afterwards are dropped. Idempotent.
    pub fn teardown(&self) {
        {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if state.phase == ListPhase::TornDown {
                return;
            }
            state.executor.shutdown();
            state.phase = ListPhase::TornDown;
            state.publish(&self.inner.snapshots);
        }
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.clear();
        }
        debug!("list controller torn down");
    }

    fn mutate<F>(&self, id: FacetId, apply: F)
    where
        F: FnOnce(&mut FacetSet) -> SetOutcome,
    {
        let published = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if state.phase == ListPhase::TornDown {
                return;
            }
            if apply(&mut state.facets) == SetOutcome::Unchanged {
                return;
            }
            if state.is_live() {
                if id.is_debounced() {
                    self.spawn_debounce(&mut state);
                } else {
                    let filter = state.compiled();
                    if let Some(dispatch) = state.executor.issue(filter, false) {
                        self.spawn_dispatch(&mut state, dispatch);
                    }
                }
            }
            state.publish(&self.inner.snapshots)
        };
        self.notify(published);
    }

    fn spawn_dispatch(&self, state: &mut State, dispatch: Dispatch) {
        let request_id = dispatch.request_id;
        state.query_state = QueryState::Loading { request_id };
        state.phase = ListPhase::Loading;
        state.error = None;
        let Some(runtime) = &state.runtime else {
            return;
        };
        let this = self.clone();
        runtime.spawn(async move {
            let filter = dispatch.filter.clone();
            if let Some(outcome) = dispatch.run().await {
                this.complete(request_id, &filter, outcome);
            }
        });
    }

    fn spawn_debounce(&self, state: &mut State) {
        let (generation, cancel) = state.executor.schedule_debounce();
        let delay = state.executor.debounce_window();
        let Some(runtime) = &state.runtime else {
            return;
        };
        let this = self.clone();
        runtime.spawn(async move {
            if sleep_or_cancel(delay, &cancel).await {
                this.flush_debounce(generation);
            }
        });
    }

    fn flush_debounce(&self, generation: u64) {
        let published = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if !state.is_live() || !state.executor.take_debounce(generation) {
                return;
            }
            let filter = state.compiled();
            let Some(dispatch) = state.executor.issue(filter, false) else {
                return;
            };
            self.spawn_dispatch(&mut state, dispatch);
            state.publish(&self.inner.snapshots)
        };
        self.notify(published);
    }

    fn complete(
        &self,
        request_id: RequestId,
        filter: &CompoundFilter,
        outcome: Result<EntityQueryResponse, QueryFailure>,
    ) {
        let published = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if state.phase == ListPhase::TornDown || !state.executor.is_latest(request_id) {
                debug!(
                    request_id,
                    latest = state.executor.latest(),
                    "discarding stale catalog response"
                );
                return;
            }
            state.executor.settle(request_id);
            match outcome {
                Ok(response) => {
                    let universe = Arc::new(response.entities);
                    let entities = Arc::new(filter.apply(universe.iter()));
                    debug!(
                        request_id,
                        returned = universe.len(),
                        matched = entities.len(),
                        "catalog response applied"
                    );
                    state.deriver.record(universe, filter, &response.coverage);
                    state.entities = Arc::clone(&entities);
                    state.query_state = QueryState::Success {
                        request_id,
                        entities,
                    };
                    state.phase = ListPhase::Ready;
                    state.error = None;
                }
                Err(failure) => {
                    warn!(request_id, "catalog request failed: {failure}");
                    state.query_state = QueryState::Error {
                        request_id,
                        failure: failure.clone(),
                    };
                    state.phase = ListPhase::Error;
                    state.error = Some(failure);
                }
            }
            state.publish(&self.inner.snapshots)
        };
        self.notify(published);
    }

    async fn resolve_providers(&self) -> Option<UserContext> {
        let (Some(identity), Some(starred)) = (&self.inner.identity, &self.inner.starred) else {
            return None;
        };
        match resolve_user_context(identity.as_ref(), starred.as_ref()).await {
            Ok(user_context) => Some(user_context),
            Err(err) => {
                warn!("failed to resolve user context: {err}");
                None
            }
        }
    }

    /// Delivers `snapshot` to listeners unless a newer one already went out.
    fn notify(&self, snapshot: Arc<ListSnapshot>) {
        let previous = self
            .inner
            .notified_version
            .fetch_max(snapshot.version, Ordering::SeqCst);
        if previous >= snapshot.version {
            return;
        }
        let listeners: Vec<Listener> = match self.inner.listeners.lock() {
            Ok(listeners) => listeners.values().cloned().collect(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade()
            && let Ok(mut listeners) = inner.listeners.lock()
        {
            listeners.remove(&self.id);
        }
    }
}
