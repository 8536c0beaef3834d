//! Cancellable one-shot hold timer.
//!
//! The delay is an explicit value with a cancel handle rather than a
//! fire-and-forget callback, so the driver can race it against
//! shutdown and tests can run it under tokio's paused clock.

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a hold window ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldOutcome {
    Fired,
    Cancelled,
}

/// One-shot delay gating a transition window.
#[derive(Debug)]
pub struct HoldTimer {
    duration: Duration,
    token: CancellationToken,
}

/// Cheap clonable handle for cancelling a [`HoldTimer`] from elsewhere.
#[derive(Clone, Debug)]
pub struct HoldCancelHandle {
    token: CancellationToken,
}

impl HoldCancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl HoldTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            token: CancellationToken::new(),
        }
    }

    pub fn cancel_handle(&self) -> HoldCancelHandle {
        HoldCancelHandle {
            token: self.token.clone(),
        }
    }

    /// Waits out the hold. Resolves early with [`HoldOutcome::Cancelled`]
    /// if the cancel handle fires first.
    pub async fn wait(self) -> HoldOutcome {
        tokio::select! {
            _ = self.token.cancelled() => {
                debug!("hold timer cancelled after <{:?}", self.duration);
                HoldOutcome::Cancelled
            }
            _ = sleep(self.duration) => HoldOutcome::Fired,
        }
    }
}
