//! Prometheus metrics for the tally node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`] that an exporter
//! can encode into the Prometheus text exposition format via
//! [`NodeMetrics::encode`].

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

/// Central collection of node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Flush cycles that applied their snapshot successfully.
    pub status_flush_success: IntCounter,
    /// Flush cycles that failed and retained their snapshot.
    pub status_flush_failure: IntCounter,
    /// Individual status updates delivered to the ledger store.
    pub status_updates_applied: IntCounter,
    /// Completed sync-status polls (any classification).
    pub sync_checks: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current number of buffered status updates.
    pub status_buffer_size: IntGauge,
    /// Latest computed slot drift (reference - tracked); unset until the
    /// first successful dual fetch.
    pub chain_sync_drift_slots: IntGauge,
    /// 1 when the latest classification is OK, 0 otherwise.
    pub chain_synced: IntGauge,
    /// Live debouncer registry entries.
    pub debouncer_entries: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics registered under a new [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let status_flush_success = register_int_counter_with_registry!(
            Opts::new(
                "tally_status_flush_success_total",
                "Flush cycles that applied their snapshot successfully"
            ),
            registry
        )
        .expect("failed to register status_flush_success counter");

        let status_flush_failure = register_int_counter_with_registry!(
            Opts::new(
                "tally_status_flush_failure_total",
                "Flush cycles that failed and retained their snapshot"
            ),
            registry
        )
        .expect("failed to register status_flush_failure counter");

        let status_updates_applied = register_int_counter_with_registry!(
            Opts::new(
                "tally_status_updates_applied_total",
                "Individual status updates delivered to the ledger store"
            ),
            registry
        )
        .expect("failed to register status_updates_applied counter");

        let sync_checks = register_int_counter_with_registry!(
            Opts::new("tally_sync_checks_total", "Completed sync-status polls"),
            registry
        )
        .expect("failed to register sync_checks counter");

        let status_buffer_size = register_int_gauge_with_registry!(
            Opts::new(
                "tally_status_buffer_size",
                "Current number of buffered status updates"
            ),
            registry
        )
        .expect("failed to register status_buffer_size gauge");

        let chain_sync_drift_slots = register_int_gauge_with_registry!(
            Opts::new(
                "tally_chain_sync_drift_slots",
                "Latest computed slot drift (reference - tracked)"
            ),
            registry
        )
        .expect("failed to register chain_sync_drift_slots gauge");

        let chain_synced = register_int_gauge_with_registry!(
            Opts::new(
                "tally_chain_synced",
                "1 when the latest sync classification is OK, 0 otherwise"
            ),
            registry
        )
        .expect("failed to register chain_synced gauge");

        let debouncer_entries = register_int_gauge_with_registry!(
            Opts::new("tally_debouncer_entries", "Live debouncer registry entries"),
            registry
        )
        .expect("failed to register debouncer_entries gauge");

        Self {
            registry,
            status_flush_success,
            status_flush_failure,
            status_updates_applied,
            sync_checks,
            status_buffer_size,
            chain_sync_drift_slots,
            chain_synced,
            debouncer_entries,
        }
    }

    /// Encode all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buf)
            .expect("metrics encoding cannot fail for a valid registry");
        String::from_utf8(buf).expect("prometheus text format is valid UTF-8")
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
