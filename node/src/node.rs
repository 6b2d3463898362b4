//! The tally node — owns the subsystems and their periodic schedules.
//!
//! Three independent tasks run on the shared runtime: the sync-status poll,
//! the status-update flush, and the debouncer idle sweep. They share no lock
//! and none of them can stall another's schedule; each tick catches its own
//! faults (the subsystems surface faults as values, never panics) and hands
//! control back to the scheduler.

use std::sync::Arc;
use std::time::Duration;

use tally_chainsync::{BlockSource, SyncStatusMonitor};
use tally_ledger::{FlushOutcome, LedgerStore, StatusUpdateAggregator};
use tally_reactive::{DebouncerManager, PassthroughRunner};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::{NodeConfig, NodeError, NodeMetrics};

/// Fans the stop signal out to every periodic task.
///
/// One broadcast channel; each task holds a receiver and `select!`s on it
/// alongside its ticker, so a single [`trigger`](ShutdownController::trigger)
/// wakes all of them.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for one task; notified exactly once on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Wake every subscribed task. Harmless when nothing is subscribed yet.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrates the aggregator, the sync monitor, and the debouncer registry.
pub struct TallyNode {
    config: NodeConfig,
    metrics: Arc<NodeMetrics>,
    aggregator: Arc<StatusUpdateAggregator>,
    monitor: Arc<SyncStatusMonitor>,
    debouncers: Arc<DebouncerManager>,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
}

impl TallyNode {
    pub fn new(
        config: NodeConfig,
        store: Arc<dyn LedgerStore>,
        reference: Arc<dyn BlockSource>,
        tracked: Arc<dyn BlockSource>,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let aggregator = Arc::new(StatusUpdateAggregator::new(
            store,
            config.status_buffer_soft_limit,
        ));
        let monitor = Arc::new(SyncStatusMonitor::new(
            reference,
            tracked,
            config.chain_sync_buffer,
        ));
        let debouncers = Arc::new(DebouncerManager::new(
            config.debounce_idle_eviction(),
            Arc::new(PassthroughRunner),
        ));

        Ok(Self {
            config,
            metrics: Arc::new(NodeMetrics::new()),
            aggregator,
            monitor,
            debouncers,
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        })
    }

    /// Spawn the periodic tasks. Idempotence is not needed — call once.
    pub fn start(&mut self) {
        self.spawn_sync_poll_task();
        self.spawn_status_flush_task();
        self.spawn_debouncer_sweep_task();
        tracing::info!(
            sync_interval_ms = self.config.sync_check_interval_ms,
            flush_interval_ms = self.config.status_flush_interval_ms,
            "tally node started"
        );
    }

    fn spawn_sync_poll_task(&mut self) {
        let metrics = Arc::clone(&self.metrics);
        let handle = self.monitor.spawn_poll_task(
            self.config.sync_check_interval(),
            self.config.sync_check_initial_delay(),
            self.shutdown.subscribe(),
            move |status| {
                metrics.sync_checks.inc();
                metrics.chain_synced.set(status.is_synced() as i64);
                if let Some(diff) = status.diff {
                    metrics.chain_sync_drift_slots.set(diff);
                }
            },
        );
        self.task_handles.push(handle);
    }

    fn spawn_status_flush_task(&mut self) {
        let metrics = Arc::clone(&self.metrics);
        let aggregator = Arc::clone(&self.aggregator);
        let handle = self.aggregator.spawn_flush_task(
            self.config.status_flush_interval(),
            self.config.status_flush_initial_delay(),
            self.shutdown.subscribe(),
            move |outcome| {
                match outcome {
                    FlushOutcome::Flushed { count } => {
                        metrics.status_flush_success.inc();
                        metrics.status_updates_applied.inc_by(count as u64);
                    }
                    FlushOutcome::Failed { .. } => {
                        metrics.status_flush_failure.inc();
                    }
                    FlushOutcome::Empty => {}
                }
                metrics.status_buffer_size.set(aggregator.buffered_count() as i64);
            },
        );
        self.task_handles.push(handle);
    }

    fn spawn_debouncer_sweep_task(&mut self) {
        let debouncers = Arc::clone(&self.debouncers);
        let metrics = Arc::clone(&self.metrics);
        let mut shutdown_rx = self.shutdown.subscribe();
        let interval = self.config.debounce_sweep_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("debouncer sweep task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        debouncers.cleanup().await;
                        metrics.debouncer_entries.set(debouncers.len() as i64);
                    }
                }
            }
        });
        self.task_handles.push(handle);
    }

    /// Trigger shutdown and join every task within `grace`.
    ///
    /// Tasks still running when the grace period expires are aborted and the
    /// call reports [`NodeError::ShutdownTimeout`].
    pub async fn stop(&mut self, grace: Duration) -> Result<(), NodeError> {
        self.shutdown.trigger();

        let mut timed_out = false;
        for mut handle in self.task_handles.drain(..) {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(_) => {}
                Err(_) => {
                    handle.abort();
                    timed_out = true;
                }
            }
        }

        if timed_out {
            tracing::warn!("some node tasks did not stop within the grace period");
            return Err(NodeError::ShutdownTimeout);
        }
        tracing::info!("tally node stopped");
        Ok(())
    }

    pub fn aggregator(&self) -> &Arc<StatusUpdateAggregator> {
        &self.aggregator
    }

    pub fn monitor(&self) -> &Arc<SyncStatusMonitor> {
        &self.monitor
    }

    pub fn debouncers(&self) -> &Arc<DebouncerManager> {
        &self.debouncers
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tally_chainsync::{BlockSourceError, ChainTip};
    use tally_ledger::LedgerError;
    use tally_types::{DispatchStatus, Slot, TransactionRecord, TxStatusUpdate};
    use tokio::sync::Notify;

    struct InMemoryStore {
        applied: Mutex<Vec<HashMap<String, TxStatusUpdate>>>,
    }

    #[async_trait]
    impl LedgerStore for InMemoryStore {
        async fn apply_status_updates(
            &self,
            updates: &HashMap<String, TxStatusUpdate>,
        ) -> Result<Vec<TransactionRecord>, LedgerError> {
            self.applied.lock().unwrap().push(updates.clone());
            Ok(updates.values().map(TransactionRecord::from_update).collect())
        }

        async fn persist_records(&self, _records: &[TransactionRecord]) -> Result<(), LedgerError> {
            Ok(())
        }

        async fn recompute_batch_stats(
            &self,
            _updates: &HashMap<String, TxStatusUpdate>,
        ) -> Result<(), LedgerError> {
            Ok(())
        }
    }

    /// Store whose apply call parks on a notify until the test releases it.
    struct WedgedStore {
        entered: Notify,
        release: Notify,
        applied: Mutex<Vec<HashMap<String, TxStatusUpdate>>>,
    }

    impl WedgedStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                entered: Notify::new(),
                release: Notify::new(),
                applied: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LedgerStore for WedgedStore {
        async fn apply_status_updates(
            &self,
            updates: &HashMap<String, TxStatusUpdate>,
        ) -> Result<Vec<TransactionRecord>, LedgerError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.applied.lock().unwrap().push(updates.clone());
            Ok(updates.values().map(TransactionRecord::from_update).collect())
        }

        async fn persist_records(&self, _records: &[TransactionRecord]) -> Result<(), LedgerError> {
            Ok(())
        }

        async fn recompute_batch_stats(
            &self,
            _updates: &HashMap<String, TxStatusUpdate>,
        ) -> Result<(), LedgerError> {
            Ok(())
        }
    }

    struct StaticSource {
        label: &'static str,
        slot: u64,
    }

    #[async_trait]
    impl BlockSource for StaticSource {
        async fn latest_block(&self) -> Result<ChainTip, BlockSourceError> {
            Ok(ChainTip::new(Slot::new(self.slot), "hash"))
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    fn fast_config() -> NodeConfig {
        NodeConfig {
            sync_check_interval_ms: 20,
            sync_check_initial_delay_ms: 0,
            status_flush_interval_ms: 20,
            status_flush_initial_delay_ms: 0,
            debounce_sweep_interval_ms: 20,
            chain_sync_buffer: 10,
            ..NodeConfig::default()
        }
    }

    fn node_with_slots(reference: u64, tracked: u64) -> TallyNode {
        TallyNode::new(
            fast_config(),
            Arc::new(InMemoryStore {
                applied: Mutex::new(Vec::new()),
            }),
            Arc::new(StaticSource {
                label: "reference",
                slot: reference,
            }),
            Arc::new(StaticSource {
                label: "tracked",
                slot: tracked,
            }),
        )
        .expect("valid config")
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let config = NodeConfig {
            status_flush_interval_ms: 0,
            ..NodeConfig::default()
        };
        let result = TallyNode::new(
            config,
            Arc::new(InMemoryStore {
                applied: Mutex::new(Vec::new()),
            }),
            Arc::new(StaticSource {
                label: "reference",
                slot: 0,
            }),
            Arc::new(StaticSource {
                label: "tracked",
                slot: 0,
            }),
        );
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[tokio::test]
    async fn started_node_flushes_and_polls_then_stops_cleanly() {
        let mut node = node_with_slots(1000, 995);
        node.start();

        node.aggregator().merge(HashMap::from([(
            "tx-1".to_string(),
            TxStatusUpdate::new("tx-1", DispatchStatus::Dispatched),
        )]));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(node.aggregator().buffered_count(), 0);
        assert!(node.monitor().get(true).await.is_synced());
        assert!(node.metrics().sync_checks.get() >= 1);
        assert!(node.metrics().status_flush_success.get() >= 1);
        assert_eq!(node.metrics().chain_synced.get(), 1);
        assert_eq!(node.metrics().chain_sync_drift_slots.get(), 5);

        node.stop(Duration::from_secs(1)).await.expect("clean stop");
    }

    #[tokio::test]
    async fn stop_before_start_is_clean() {
        let mut node = node_with_slots(0, 0);
        node.stop(Duration::from_millis(100)).await.expect("nothing to join");
    }

    #[tokio::test]
    async fn stop_aborts_tasks_that_outlive_the_grace_period() {
        let store = WedgedStore::new();
        let mut node = TallyNode::new(
            fast_config(),
            Arc::clone(&store) as Arc<dyn LedgerStore>,
            Arc::new(StaticSource {
                label: "reference",
                slot: 0,
            }),
            Arc::new(StaticSource {
                label: "tracked",
                slot: 0,
            }),
        )
        .expect("valid config");
        node.start();

        node.aggregator().merge(HashMap::from([(
            "tx-1".to_string(),
            TxStatusUpdate::new("tx-1", DispatchStatus::Dispatched),
        )]));

        // Wait until the flush task is parked inside the store call, then
        // stop with a grace period it cannot meet.
        store.entered.notified().await;
        let err = node
            .stop(Duration::from_millis(50))
            .await
            .expect_err("wedged task cannot stop in time");
        assert!(matches!(err, NodeError::ShutdownTimeout));

        // The task was aborted, not detached: releasing the store must not
        // let it resume and complete the apply.
        store.release.notify_one();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.applied.lock().unwrap().len(), 0);
        assert_eq!(node.aggregator().buffered_count(), 1);
    }

    #[tokio::test]
    async fn shutdown_trigger_reaches_every_subscriber() {
        let controller = ShutdownController::new();
        let mut rx1 = controller.subscribe();
        let mut rx2 = controller.subscribe();
        controller.trigger();
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_trigger_without_subscribers_is_harmless() {
        ShutdownController::new().trigger();
    }

    #[tokio::test]
    async fn sweep_task_evicts_idle_debouncers() {
        let config = NodeConfig {
            debounce_idle_eviction_ms: 30,
            ..fast_config()
        };
        let mut node = TallyNode::new(
            config,
            Arc::new(InMemoryStore {
                applied: Mutex::new(Vec::new()),
            }),
            Arc::new(StaticSource {
                label: "reference",
                slot: 0,
            }),
            Arc::new(StaticSource {
                label: "tracked",
                slot: 0,
            }),
        )
        .expect("valid config");
        node.start();

        node.debouncers()
            .get_or_create("batch-1", Arc::new(|| {}), Duration::from_millis(10));
        assert_eq!(node.debouncers().len(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(node.debouncers().len(), 0);

        node.stop(Duration::from_secs(1)).await.expect("clean stop");
    }
}
