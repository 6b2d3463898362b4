//! Chain synchronization status monitoring.
//!
//! Polls two independent "latest block" sources — a reference chain source
//! and the locally tracked one — computes slot drift, and classifies whether
//! the tracked source has caught up. The latest classification is held in an
//! atomically replaced snapshot cell so concurrent readers never observe a
//! half-written value.

pub mod monitor;
pub mod source;

pub use monitor::SyncStatusMonitor;
pub use source::{BlockSource, BlockSourceError, ChainTip};
