//! Sync status monitor — drift computation and classification.
//!
//! On every poll tick the monitor fetches the latest block from the reference
//! and tracked sources, computes `diff = reference_slot - tracked_slot`, and
//! classifies the result against the configured sync buffer. Faults never
//! propagate to callers: they degrade into `UNKNOWN_ERROR` / `ERROR`
//! snapshots while the previous cached snapshot stays readable until the swap.

use crate::source::{BlockSource, BlockSourceError};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tally_types::SyncStatus;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Polls two block sources and caches the latest [`SyncStatus`].
pub struct SyncStatusMonitor {
    reference: Arc<dyn BlockSource>,
    tracked: Arc<dyn BlockSource>,
    /// Slots the tracked source may lag and still count as synced.
    sync_buffer: i64,
    /// Latest snapshot, atomically replaced on every recomputation.
    cached: ArcSwap<SyncStatus>,
}

impl SyncStatusMonitor {
    pub fn new(reference: Arc<dyn BlockSource>, tracked: Arc<dyn BlockSource>, sync_buffer: i64) -> Self {
        Self {
            reference,
            tracked,
            sync_buffer,
            cached: ArcSwap::from_pointee(SyncStatus::not_yet_unknown()),
        }
    }

    /// Recompute the sync status and atomically replace the cached snapshot.
    ///
    /// Never fails: source errors are classified into the returned status.
    pub async fn refresh(&self) -> SyncStatus {
        let status = self.fetch_sync_status().await;
        let previous = self.cached.swap(Arc::new(status.clone()));

        if status.is_synced() {
            tracing::info!(
                status = %status,
                previous = %previous,
                "tracked source is synced with the reference chain"
            );
        } else {
            tracing::warn!(
                status = %status,
                previous = %previous,
                "tracked source is not synced with the reference chain"
            );
        }

        status
    }

    /// Latest cached snapshot, or a fresh computation.
    ///
    /// The uncached read never replaces the cached snapshot; only the
    /// scheduled [`refresh`](SyncStatusMonitor::refresh) does that.
    pub async fn get(&self, use_cache: bool) -> SyncStatus {
        if use_cache {
            return self.cached.load().as_ref().clone();
        }
        self.fetch_sync_status().await
    }

    async fn fetch_sync_status(&self) -> SyncStatus {
        let (reference_tip, tracked_tip) =
            tokio::join!(self.reference.latest_block(), self.tracked.latest_block());

        match (reference_tip, tracked_tip) {
            (Ok(reference), Ok(tracked)) => {
                let diff = reference.slot.signed_diff(tracked.slot);
                tracing::debug!(
                    diff,
                    reference_slot = %reference.slot,
                    tracked_slot = %tracked.slot,
                    "computed slot drift"
                );

                // Negative drift (tracked transiently ahead) trivially
                // satisfies the buffer check and counts as synced.
                if diff <= self.sync_buffer {
                    SyncStatus::ok(diff)
                } else {
                    SyncStatus::not_yet(diff)
                }
            }
            (Err(e), _) | (_, Err(e)) => self.classify_error(e),
        }
    }

    fn classify_error(&self, error: BlockSourceError) -> SyncStatus {
        if error.is_fault() {
            tracing::error!(error = %error, "chain source poll faulted");
            SyncStatus::error(error.to_string())
        } else {
            tracing::error!(error = %error, "chain source returned a failure result");
            SyncStatus::unknown_error()
        }
    }

    /// Spawn the periodic poll schedule.
    ///
    /// Runs independently of any other schedule; every tick is its own fault
    /// boundary since `refresh` cannot fail. `on_status` is invoked with the
    /// freshly computed snapshot after every tick (metrics, gauges, ...).
    pub fn spawn_poll_task(
        self: &Arc<Self>,
        interval: Duration,
        initial_delay: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
        on_status: impl Fn(&SyncStatus) + Send + 'static,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    tracing::info!("sync status poll task shutting down");
                    return;
                }
                _ = tokio::time::sleep(initial_delay) => {}
            }

            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("sync status poll task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let status = monitor.refresh().await;
                        on_status(&status);
                    }
                }
            }
        })
    }
}
