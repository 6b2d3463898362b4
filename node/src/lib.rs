//! Tally node — owns configuration and the periodic schedules.
//!
//! Wires the status-update aggregator, the chain-sync monitor, and the
//! debouncer registry to a small fixed set of independent periodic tasks on
//! the shared runtime. Each task carries its own fault boundary: a tick that
//! fails logs and returns control to the scheduler, it never takes the
//! schedule down with it.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{ShutdownController, TallyNode};
