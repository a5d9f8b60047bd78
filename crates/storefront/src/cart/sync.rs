//! Debounced reconciliation of dirty cart lines with the remote cart.
//!
//! # Timing
//!
//! Every quantity mutation re-arms a single timer. Only the last arm fires;
//! earlier ones are cancelled before they start any work. When the timer
//! fires, every dirty line is reconciled concurrently, one request per line,
//! with no ordering between lines.
//!
//! Cancelling the timer never cancels requests that are already in flight:
//! the round itself runs on its own task.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::debug;

use buildmart_core::{ProductId, RemoteCartService, ServiceError};

/// Inactivity window before dirty lines are pushed to the server.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(3000);

/// A job that will run once after a delay unless cancelled first.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Start the delay. Must be called inside a Tokio runtime.
    pub fn schedule<F, Fut>(delay: Duration, job: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so a later cancel() cannot abort the job midway.
            tokio::spawn(job());
        });
        Self { handle }
    }

    /// Prevent the job from starting. No effect once it has started.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// True once the delay has elapsed (or the task was cancelled).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Single re-armable debounce timer.
#[derive(Debug)]
pub struct SyncScheduler {
    delay: Duration,
    pending: Mutex<Option<ScheduledTask>>,
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SyncScheduler {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending job with `job`, firing after the full delay.
    pub fn arm<F, Fut>(&self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.cancel();
        }
        *pending = Some(ScheduledTask::schedule(self.delay, job));
    }

    /// Cancel the pending job. Returns whether one was waiting.
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.take().is_some_and(|task| {
            let waiting = !task.is_finished();
            task.cancel();
            waiting
        })
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

/// One request in a sync round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyncOp {
    Update {
        product_id: ProductId,
        quantity: u32,
        revision: u64,
    },
    Delete {
        product_id: ProductId,
        revision: u64,
    },
}

impl SyncOp {
    pub(crate) const fn product_id(&self) -> ProductId {
        match self {
            Self::Update { product_id, .. } | Self::Delete { product_id, .. } => *product_id,
        }
    }
}

#[derive(Debug)]
pub(crate) struct SyncOutcome {
    pub op: SyncOp,
    pub result: Result<(), ServiceError>,
}

/// Issue every op concurrently and collect the results in op order.
pub(crate) async fn run_round(remote: &dyn RemoteCartService, ops: Vec<SyncOp>) -> Vec<SyncOutcome> {
    debug!(count = ops.len(), "Starting cart sync round");
    join_all(ops.into_iter().map(|op| async move {
        let result = match op {
            SyncOp::Update {
                product_id,
                quantity,
                ..
            } => remote.update_line(product_id, quantity).await,
            SyncOp::Delete { product_id, .. } => remote.remove_line(product_id).await,
        };
        SyncOutcome { op, result }
    }))
    .await
}

/// What a sync round did, per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Lines whose new quantity the server accepted.
    pub updated: Vec<ProductId>,
    /// Lines the server deleted.
    pub deleted: Vec<ProductId>,
    /// Lines whose request failed.
    pub failed: Vec<(ProductId, ServiceError)>,
    /// Responses ignored because a newer local edit superseded them.
    pub stale: Vec<ProductId>,
}

impl SyncReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn requests(&self) -> usize {
        self.updated.len() + self.deleted.len() + self.failed.len() + self.stale.len()
    }
}
