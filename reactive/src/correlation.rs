//! Correlation-id keyed request/response waiting.
//!
//! A caller registers a slot for a correlation id and suspends on the
//! returned receiver; a producer resolves it later from an unrelated
//! asynchronous event. Slots resolve at most once and are removed on
//! resolution. Completing an unknown id is a deliberate no-op — races
//! between timeout cleanup and late completion are expected.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum CorrelationError {
    #[error("a live slot already exists for correlation id {0}")]
    SlotExists(String),

    #[error("timed out waiting for correlation id {0}")]
    TimedOut(String),

    #[error("slot for correlation id {0} was abandoned before resolution")]
    Abandoned(String),
}

/// Maps correlation ids to pending one-shot result slots.
pub struct CorrelationWaiter<T> {
    pending: DashMap<String, oneshot::Sender<T>>,
}

impl<T> CorrelationWaiter<T> {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Register a new slot for `correlation_id` and return its receiver.
    ///
    /// Fails if the id already has a live slot.
    pub fn create_wait(&self, correlation_id: &str) -> Result<oneshot::Receiver<T>, CorrelationError> {
        match self.pending.entry(correlation_id.to_string()) {
            Entry::Occupied(_) => {
                Err(CorrelationError::SlotExists(correlation_id.to_string()))
            }
            Entry::Vacant(vacant) => {
                let (tx, rx) = oneshot::channel();
                vacant.insert(tx);
                Ok(rx)
            }
        }
    }

    /// Resolve and remove the slot for `correlation_id`.
    ///
    /// Unknown ids (already resolved, timed out, or never created) are
    /// silently ignored; a second `complete` for the same id has no effect.
    pub fn complete(&self, correlation_id: &str, value: T) {
        match self.pending.remove(correlation_id) {
            Some((_, tx)) => {
                // The receiver may have been dropped; that's fine.
                let _ = tx.send(value);
            }
            None => {
                tracing::debug!(correlation_id, "completion for unknown correlation id ignored");
            }
        }
    }

    /// Remove a slot without resolving it.
    ///
    /// Callers driving their own receiver must call this on timeout to bound
    /// memory.
    pub fn remove(&self, correlation_id: &str) {
        self.pending.remove(correlation_id);
    }

    /// Register, then await resolution with a timeout.
    ///
    /// The slot is removed on timeout or abandonment before returning, so
    /// stale slots never accumulate.
    pub async fn wait(&self, correlation_id: &str, timeout: Duration) -> Result<T, CorrelationError> {
        let rx = self.create_wait(correlation_id)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => {
                self.remove(correlation_id);
                Err(CorrelationError::Abandoned(correlation_id.to_string()))
            }
            Err(_) => {
                self.remove(correlation_id);
                Err(CorrelationError::TimedOut(correlation_id.to_string()))
            }
        }
    }

    /// Number of unresolved slots.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl<T> Default for CorrelationWaiter<T> {
    fn default() -> Self {
        Self::new()
    }
}
