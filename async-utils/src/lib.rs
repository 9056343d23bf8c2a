//! Cancellation-aware future combinators shared by the catalog crates.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelErr {
    Cancelled,
}

/// Why a bounded future stopped before producing its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    Cancelled,
    TimedOut(Duration),
}

/// Races a future against a [`CancellationToken`].
#[async_trait]
pub trait OrCancelExt: Sized {
    type Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr>;

    /// Like [`OrCancelExt::or_cancel`], but also gives up after `limit`.
    /// Cancellation wins when both fire in the same poll.
    async fn within(
        self,
        limit: Duration,
        token: &CancellationToken,
    ) -> Result<Self::Output, Interrupted>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(CancelErr::Cancelled),
            res = self => Ok(res),
        }
    }

    async fn within(
        self,
        limit: Duration,
        token: &CancellationToken,
    ) -> Result<Self::Output, Interrupted> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Interrupted::Cancelled),
            res = tokio::time::timeout(limit, self) => res.map_err(|_| Interrupted::TimedOut(limit)),
        }
    }
}

/// Sleeps for `delay` unless `token` fires first. Returns true when the full
/// delay elapsed.
pub async fn sleep_or_cancel(delay: Duration, token: &CancellationToken) -> bool {
    tokio::time::sleep(delay).or_cancel(token).await.is_ok()
}
