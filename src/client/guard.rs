//! Connection Timeout Guard
//!
//! Races a connect attempt against a single-shot deadline and an external
//! cancel signal. The outcome is returned to the caller so the connect
//! future itself fails on timeout, rather than a detached timer merely
//! logging it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Result of racing a connect phase against the guard
pub(crate) enum GuardOutcome<T> {
    /// The guarded future finished first
    Completed(T),
    /// The deadline elapsed
    TimedOut,
    /// The cancel signal fired (reset during a pending attempt)
    Cancelled,
}

pub(crate) struct TimeoutGuard {
    timeout: Duration,
    cancel: Arc<Notify>,
}

impl TimeoutGuard {
    pub(crate) fn new(timeout: Duration, cancel: Arc<Notify>) -> Self {
        Self { timeout, cancel }
    }

    /// Drive `fut` to completion unless the deadline or cancel signal wins
    pub(crate) async fn run<F, T>(&self, fut: F) -> GuardOutcome<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            out = fut => GuardOutcome::Completed(out),
            _ = tokio::time::sleep(self.timeout) => GuardOutcome::TimedOut,
            _ = self.cancel.notified() => GuardOutcome::Cancelled,
        }
    }
}
