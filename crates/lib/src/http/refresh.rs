//! Single-flight token refresh.
//!
//! Every request that sees a 401 funnels through [`RefreshGate::run`]. The
//! gate serializes them: the first caller performs the refresh, callers that
//! were already queued behind it receive its outcome instead of starting
//! another one.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use super::errors::HttpError;
use crate::models::TokenPair;

pub(crate) type RefreshOutcome = Result<TokenPair, HttpError>;

#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
    /// Bumped every time a refresh finishes, success or not.
    completed: AtomicU64,
    last: Mutex<Option<RefreshOutcome>>,
}

impl RefreshGate {
    /// Run `refresh` unless a refresh finished while this caller was queued,
    /// in which case that outcome is returned.
    ///
    /// `current` is consulted after the gate is acquired; when it yields a
    /// pair, the credentials already changed since the caller's request went
    /// out and no network call is made.
    pub(crate) async fn run<C, F, Fut>(&self, current: C, refresh: F) -> RefreshOutcome
    where
        C: FnOnce() -> Option<RefreshOutcome>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        let queued_at = self.completed.load(Ordering::Acquire);
        let mut last = self.last.lock().await;

        if self.completed.load(Ordering::Acquire) != queued_at {
            if let Some(outcome) = last.as_ref() {
                return outcome.clone();
            }
        }
        if let Some(outcome) = current() {
            return outcome;
        }

        let outcome = refresh().await;
        *last = Some(outcome.clone());
        self.completed.fetch_add(1, Ordering::Release);
        outcome
    }

    #[cfg(test)]
    pub(crate) fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }
}
