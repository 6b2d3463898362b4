//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::NodeError;

/// Configuration for a tally node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Intervals are plain
/// milliseconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// How often to poll both chain sources for sync drift.
    #[serde(default = "default_sync_check_interval_ms")]
    pub sync_check_interval_ms: u64,

    /// Delay before the first sync poll after startup.
    #[serde(default = "default_sync_check_initial_delay_ms")]
    pub sync_check_initial_delay_ms: u64,

    /// Slots the tracked source may lag behind the reference source and
    /// still count as synced.
    #[serde(default = "default_chain_sync_buffer")]
    pub chain_sync_buffer: i64,

    /// Maximum dispatchable transactions the dispatch job pulls per run.
    #[serde(default = "default_dispatch_pull_limit")]
    pub dispatch_pull_limit: usize,

    /// How often to flush buffered status updates to the ledger store.
    #[serde(default = "default_status_flush_interval_ms")]
    pub status_flush_interval_ms: u64,

    /// Delay before the first flush after startup.
    #[serde(default = "default_status_flush_initial_delay_ms")]
    pub status_flush_initial_delay_ms: u64,

    /// Buffered update count above which a warning is emitted (visibility
    /// only, merges are never rejected).
    #[serde(default = "default_status_buffer_soft_limit")]
    pub status_buffer_soft_limit: usize,

    /// Idle period after which an unused debouncer is evicted and shut down.
    #[serde(default = "default_debounce_idle_eviction_ms")]
    pub debounce_idle_eviction_ms: u64,

    /// How often the debouncer registry sweeps for idle entries.
    #[serde(default = "default_debounce_sweep_interval_ms")]
    pub debounce_sweep_interval_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_sync_check_interval_ms() -> u64 {
    30_000
}

fn default_sync_check_initial_delay_ms() -> u64 {
    5_000
}

fn default_chain_sync_buffer() -> i64 {
    60
}

fn default_dispatch_pull_limit() -> usize {
    1_000
}

fn default_status_flush_interval_ms() -> u64 {
    30_000
}

fn default_status_flush_initial_delay_ms() -> u64 {
    30_000
}

fn default_status_buffer_soft_limit() -> usize {
    1_000
}

fn default_debounce_idle_eviction_ms() -> u64 {
    60_000
}

fn default_debounce_sweep_interval_ms() -> u64 {
    30_000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Reject values the schedulers cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.sync_check_interval_ms == 0 {
            return Err(NodeError::Config("sync_check_interval_ms must be > 0".into()));
        }
        if self.status_flush_interval_ms == 0 {
            return Err(NodeError::Config("status_flush_interval_ms must be > 0".into()));
        }
        if self.debounce_sweep_interval_ms == 0 {
            return Err(NodeError::Config("debounce_sweep_interval_ms must be > 0".into()));
        }
        if self.chain_sync_buffer < 0 {
            return Err(NodeError::Config("chain_sync_buffer must be non-negative".into()));
        }
        if self.dispatch_pull_limit == 0 {
            return Err(NodeError::Config("dispatch_pull_limit must be > 0".into()));
        }
        Ok(())
    }

    pub fn sync_check_interval(&self) -> Duration {
        Duration::from_millis(self.sync_check_interval_ms)
    }

    pub fn sync_check_initial_delay(&self) -> Duration {
        Duration::from_millis(self.sync_check_initial_delay_ms)
    }

    pub fn status_flush_interval(&self) -> Duration {
        Duration::from_millis(self.status_flush_interval_ms)
    }

    pub fn status_flush_initial_delay(&self) -> Duration {
        Duration::from_millis(self.status_flush_initial_delay_ms)
    }

    pub fn debounce_idle_eviction(&self) -> Duration {
        Duration::from_millis(self.debounce_idle_eviction_ms)
    }

    pub fn debounce_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_sweep_interval_ms)
    }

    /// Parsed log format for [`crate::init_logging`].
    pub fn log_format(&self) -> Result<crate::LogFormat, NodeError> {
        self.log_format.parse().map_err(NodeError::Config)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            sync_check_interval_ms: default_sync_check_interval_ms(),
            sync_check_initial_delay_ms: default_sync_check_initial_delay_ms(),
            chain_sync_buffer: default_chain_sync_buffer(),
            dispatch_pull_limit: default_dispatch_pull_limit(),
            status_flush_interval_ms: default_status_flush_interval_ms(),
            status_flush_initial_delay_ms: default_status_flush_initial_delay_ms(),
            status_buffer_soft_limit: default_status_buffer_soft_limit(),
            debounce_idle_eviction_ms: default_debounce_idle_eviction_ms(),
            debounce_sweep_interval_ms: default_debounce_sweep_interval_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
