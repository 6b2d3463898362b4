//! Concurrent write-buffer of per-transaction status updates.
//!
//! Producers merge updates at any time; a scheduled flush snapshots the
//! buffer, applies the snapshot against the ledger store outside the lock,
//! and on success removes exactly the snapshot's keys. A failed flush leaves
//! every snapshot key in place for the next cycle, giving at-least-once
//! delivery to the (idempotent) store.

use crate::store::{LedgerError, LedgerStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tally_types::TxStatusUpdate;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Result of one flush attempt, consumed by the scheduler for logging and
/// metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing buffered.
    Empty,
    /// All snapshot entries applied and removed from the buffer.
    Flushed { count: usize },
    /// The store call failed; every snapshot entry was retained.
    Failed { retained: usize },
}

/// Buffers status updates and flushes them transactionally on a cadence.
pub struct StatusUpdateAggregator {
    /// Producers and the flush snapshot contend only on this map; the
    /// critical section never includes store I/O.
    buffer: Mutex<HashMap<String, TxStatusUpdate>>,
    store: Arc<dyn LedgerStore>,
    /// Warn-only visibility threshold; merges are never rejected.
    soft_limit: usize,
}

impl StatusUpdateAggregator {
    pub fn new(store: Arc<dyn LedgerStore>, soft_limit: usize) -> Self {
        Self {
            buffer: Mutex::new(HashMap::new()),
            store,
            soft_limit,
        }
    }

    /// Merge updates into the buffer, last-write-wins per transaction id.
    ///
    /// Thread-safe and never blocked by an in-flight flush.
    pub fn merge(&self, updates: HashMap<String, TxStatusUpdate>) {
        let size = {
            let mut buffer = self.buffer.lock().expect("aggregator lock poisoned");
            buffer.extend(updates);
            buffer.len()
        };

        if size > self.soft_limit {
            tracing::warn!(
                size,
                soft_limit = self.soft_limit,
                "status update buffer exceeded its soft size limit"
            );
        }
    }

    /// Snapshot the buffer and apply it against the ledger store.
    ///
    /// The snapshot is taken under the lock; all store calls happen after the
    /// lock is released. On success only the snapshot's keys are removed, so
    /// updates merged during the flush window survive.
    pub async fn flush_if_nonempty(&self) -> FlushOutcome {
        let snapshot: HashMap<String, TxStatusUpdate> = {
            self.buffer.lock().expect("aggregator lock poisoned").clone()
        };

        if snapshot.is_empty() {
            tracing::debug!("no status updates to flush");
            return FlushOutcome::Empty;
        }

        let count = snapshot.len();
        tracing::info!(count, "flushing transaction status updates");

        match self.apply_snapshot(&snapshot).await {
            Ok(()) => {
                let mut buffer = self.buffer.lock().expect("aggregator lock poisoned");
                for tx_id in snapshot.keys() {
                    buffer.remove(tx_id);
                }
                tracing::info!(count, remaining = buffer.len(), "status update flush succeeded");
                FlushOutcome::Flushed { count }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    retained = count,
                    "status update flush failed; entries retained for the next cycle"
                );
                FlushOutcome::Failed { retained: count }
            }
        }
    }

    async fn apply_snapshot(&self, snapshot: &HashMap<String, TxStatusUpdate>) -> Result<(), LedgerError> {
        let records = self.store.apply_status_updates(snapshot).await?;
        self.store.persist_records(&records).await?;
        self.store.recompute_batch_stats(snapshot).await?;
        Ok(())
    }

    /// Number of currently buffered updates.
    pub fn buffered_count(&self) -> usize {
        self.buffer.lock().expect("aggregator lock poisoned").len()
    }

    /// Spawn the periodic flush schedule.
    ///
    /// Independent of the sync monitor's schedule; a failed tick logs and
    /// retains, it never unwinds the loop. `on_outcome` is invoked with the
    /// result of every flush attempt (metrics, gauges, ...).
    pub fn spawn_flush_task(
        self: &Arc<Self>,
        interval: Duration,
        initial_delay: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
        on_outcome: impl Fn(FlushOutcome) + Send + 'static,
    ) -> JoinHandle<()> {
        let aggregator = Arc::clone(self);

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    tracing::info!("status flush task shutting down");
                    return;
                }
                _ = tokio::time::sleep(initial_delay) => {}
            }

            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("status flush task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let outcome = aggregator.flush_if_nonempty().await;
                        on_outcome(outcome);
                    }
                }
            }
        })
    }
}
