//! Evidence sources and the plumbing that runs them concurrently.
//!
//! Every source answers the three pairwise checks for a
//! [`NormalizedInput`]. Results travel over `oneshot` channels, so each
//! check delivers at most one value, and a check that dies without
//! sending is seen by the receiver as an empty result.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::{NormalizedInput, PairMatching};

/// A source of pairwise evidence (list index, geocoder, local database).
#[async_trait::async_trait]
pub trait PairMatcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Runs all three pairwise checks and returns whatever evidence was
    /// collected before `deadline`.
    async fn handle(&self, input: &NormalizedInput, deadline: Instant) -> PairMatching;
}

/// A matcher running on its own task.
///
/// Resolves to the matcher's evidence, or to an empty result if the task
/// died. Dropping it aborts the task, so a matcher nobody waits for stops
/// at its next await point.
#[derive(Debug)]
pub struct SpawnedMatcher {
    rx: oneshot::Receiver<PairMatching>,
    task: AbortHandle,
}

impl Future for SpawnedMatcher {
    type Output = PairMatching;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| {
            result.unwrap_or_else(|_| {
                log::warn!("Matcher task ended without a result");
                PairMatching::default()
            })
        })
    }
}

impl Drop for SpawnedMatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Runs `matcher` on its own task.
#[must_use]
pub fn spawn_handle(
    matcher: Arc<dyn PairMatcher>,
    input: NormalizedInput,
    deadline: Instant,
) -> SpawnedMatcher {
    let (tx, rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let result = matcher.handle(&input, deadline).await;
        if tx.send(result).is_err() {
            log::debug!("{} finished after nobody was waiting", matcher.name());
        }
    });

    SpawnedMatcher {
        rx,
        task: task.abort_handle(),
    }
}

/// Runs a CPU-bound check on the blocking pool.
#[must_use]
pub fn spawn_blocking_check<F>(check: F) -> oneshot::Receiver<PairMatching>
where
    F: FnOnce() -> PairMatching + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    tokio::task::spawn_blocking(move || {
        // The receiver is gone once the deadline has passed.
        let _ = tx.send(check());
    });

    rx
}

/// Waits for a spawned check, treating a vanished sender as no evidence.
pub async fn receive(rx: oneshot::Receiver<PairMatching>) -> PairMatching {
    rx.await.unwrap_or_else(|_| {
        log::warn!("Pairwise check ended without a result");
        PairMatching::default()
    })
}

/// Drives `checks` concurrently and merges every result that arrives
/// before `deadline`. Checks still running at the deadline are dropped.
pub async fn merge_until<I>(deadline: Instant, checks: I) -> PairMatching
where
    I: IntoIterator,
    I::Item: Future<Output = PairMatching>,
{
    let mut pending: FuturesUnordered<I::Item> = checks.into_iter().collect();
    let mut result = PairMatching::default();

    loop {
        match tokio::time::timeout_at(deadline, pending.next()).await {
            Ok(Some(partial)) => result.merge(partial),
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "Deadline reached with {} pairwise checks outstanding",
                    pending.len()
                );
                break;
            }
        }
    }

    result
}
