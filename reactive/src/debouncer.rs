//! Per-instance delayed single-action executor.
//!
//! Every [`Debouncer::call`] cancels the previously scheduled timer (if it has
//! not fired yet) and schedules a fresh one, so only the most recent call
//! within the debounce window actually executes the action. The action runs
//! under a caller-supplied [`TaskRunner`] wrapper so it can participate in an
//! outer boundary (e.g. a transactional one); the debouncer itself holds no
//! business logic, only timing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Bounded wait for an in-flight action during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(1_000);

/// Execution wrapper for debounced actions.
pub trait TaskRunner: Send + Sync {
    fn run(&self, action: &(dyn Fn() + Send + Sync));
}

/// Runs the action directly, with no wrapping.
pub struct PassthroughRunner;

impl TaskRunner for PassthroughRunner {
    fn run(&self, action: &(dyn Fn() + Send + Sync)) {
        action()
    }
}

/// Coalesces repeated `call()` invocations into one delayed execution.
///
/// At most one scheduled-but-not-yet-fired task exists per instance at any
/// time. After [`shutdown`](Debouncer::shutdown), further calls are no-ops.
pub struct Debouncer {
    action: Arc<dyn Fn() + Send + Sync>,
    delay: Duration,
    runner: Arc<dyn TaskRunner>,
    /// The single pending timer task, if any.
    pending: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Debouncer {
    pub fn new(
        action: Arc<dyn Fn() + Send + Sync>,
        delay: Duration,
        runner: Arc<dyn TaskRunner>,
    ) -> Self {
        Self {
            action,
            delay,
            runner,
            pending: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Cancel any pending timer and schedule the action to fire after the
    /// configured delay from now.
    ///
    /// The cancel-then-reschedule sequence is atomic with respect to
    /// concurrent `call()` invocations on the same instance.
    pub fn call(&self) {
        let action = Arc::clone(&self.action);
        let runner = Arc::clone(&self.runner);
        let delay = self.delay;

        let mut pending = self.pending.lock().expect("debouncer lock poisoned");
        // Checked under the lock so a concurrent shutdown cannot miss a
        // freshly scheduled task.
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if let Some(handle) = pending.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            runner.run(action.as_ref());
        }));
    }

    /// Cancel the pending timer without running the action and stop this
    /// instance's scheduling capability.
    ///
    /// Idempotent. Waits a bounded grace period for an action that is already
    /// executing, then abandons it.
    pub async fn shutdown(&self) {
        let handle = {
            let mut pending = self.pending.lock().expect("debouncer lock poisoned");
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            pending.take()
        };

        if let Some(handle) = handle {
            handle.abort();
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, handle).await;
        }
    }

    /// Whether `shutdown()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
