//! Request bookkeeping for the list controller.
//!
//! The executor hands out request ids, remembers which one is the latest,
//! and owns the cancellation tokens of the in-flight request and of a pending
//! debounce. It never touches controller state; the controller spawns the
//! [`Dispatch`] it returns and reports completions back through
//! [`QueryExecutor::is_latest`].

use crate::config::ListConfig;
use crate::error::QueryFailure;
use catalog_async_utils::Interrupted;
use catalog_async_utils::OrCancelExt;
use catalog_backend_client::CatalogApi;
use catalog_backend_client::EntityQuery;
use catalog_backend_client::EntityQueryResponse;
use catalog_backend_client::RequestId;
use catalog_filter::CompoundFilter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A request ready to run on a spawned task.
pub(crate) struct Dispatch {
    pub(crate) request_id: RequestId,
    pub(crate) filter: CompoundFilter,
    api: Arc<dyn CatalogApi>,
    cancel: CancellationToken,
    timeout: Duration,
}

impl Dispatch {
    /// Runs the query. `None` means the request was cancelled and its
    /// outcome must not be applied.
    pub(crate) async fn run(self) -> Option<Result<EntityQueryResponse, QueryFailure>> {
        let query = EntityQuery {
            request_id: self.request_id,
            filter: self.filter.clone(),
        };
        let fetch = self.api.query_entities(query, self.cancel.clone());
        match fetch.within(self.timeout, &self.cancel).await {
            Err(Interrupted::Cancelled) => {
                debug!(request_id = self.request_id, "catalog request cancelled");
                None
            }
            Err(Interrupted::TimedOut(limit)) => {
                let limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                Some(Err(QueryFailure::Timeout(limit_ms)))
            }
            Ok(result) => Some(result.map_err(QueryFailure::from)),
        }
    }
}

/// A coalescing window waiting to issue the latest filter.
pub(crate) struct PendingDebounce {
    pub(crate) generation: u64,
    pub(crate) cancel: CancellationToken,
}

pub(crate) struct QueryExecutor {
    api: Arc<dyn CatalogApi>,
    config: ListConfig,
    parent: CancellationToken,
    latest: RequestId,
    in_flight: Option<CancellationToken>,
    last_issued: Option<CompoundFilter>,
    debounce: Option<PendingDebounce>,
    debounce_generation: u64,
}

impl QueryExecutor {
    /// Every token the executor creates is a child of `parent`, so cancelling
    /// it aborts all outstanding work.
    pub(crate) fn new(
        api: Arc<dyn CatalogApi>,
        config: ListConfig,
        parent: CancellationToken,
    ) -> Self {
        Self {
            api,
            config,
            parent,
            latest: 0,
            in_flight: None,
            last_issued: None,
            debounce: None,
            debounce_generation: 0,
        }
    }

    pub(crate) fn latest(&self) -> RequestId {
        self.latest
    }

    pub(crate) fn is_latest(&self, request_id: RequestId) -> bool {
        request_id == self.latest
    }

    pub(crate) fn debounce_window(&self) -> Duration {
        self.config.debounce()
    }

    /// Issues `filter` under a fresh request id, superseding whatever is in
    /// flight. Returns `None` when `filter` equals the last issued filter and
    /// `force` is not set.
    pub(crate) fn issue(&mut self, filter: CompoundFilter, force: bool) -> Option<Dispatch> {
        self.cancel_debounce();
        if !force && self.last_issued.as_ref() == Some(&filter) {
            debug!("compiled filter unchanged; not issuing a request");
            return None;
        }
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        self.latest += 1;
        let cancel = self.parent.child_token();
        self.in_flight = Some(cancel.clone());
        self.last_issued = Some(filter.clone());
        debug!(request_id = self.latest, facets = filter.len(), "issuing catalog request");
        Some(Dispatch {
            request_id: self.latest,
            filter,
            api: Arc::clone(&self.api),
            cancel,
            timeout: self.config.request_timeout(),
        })
    }

    /// Marks the latest request as settled. Later identical filters are still
    /// skipped; a failed request is only re-run through a forced issue.
    pub(crate) fn settle(&mut self, request_id: RequestId) {
        if self.is_latest(request_id) {
            self.in_flight = None;
        }
    }

    /// Opens (or restarts) the coalescing window. The caller sleeps on the
    /// returned token and then calls [`QueryExecutor::take_debounce`].
    pub(crate) fn schedule_debounce(&mut self) -> (u64, CancellationToken) {
        self.cancel_debounce();
        self.debounce_generation += 1;
        let cancel = self.parent.child_token();
        self.debounce = Some(PendingDebounce {
            generation: self.debounce_generation,
            cancel: cancel.clone(),
        });
        (self.debounce_generation, cancel)
    }

    /// True when `generation` is still the pending window; consumes it.
    pub(crate) fn take_debounce(&mut self, generation: u64) -> bool {
        match &self.debounce {
            Some(pending) if pending.generation == generation => {
                self.debounce = None;
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn has_pending_debounce(&self) -> bool {
        self.debounce.is_some()
    }

    fn cancel_debounce(&mut self) {
        if let Some(pending) = self.debounce.take() {
            pending.cancel.cancel();
        }
    }

    /// Cancels the in-flight request and any pending debounce. Outstanding
    /// ids stop being latest.
    pub(crate) fn shutdown(&mut self) {
        self.cancel_debounce();
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel();
        }
        self.parent.cancel();
        self.latest += 1;
    }
}
