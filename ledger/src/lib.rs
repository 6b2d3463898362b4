//! Ledger status-update aggregation.
//!
//! The [`StatusUpdateAggregator`] buffers per-transaction status changes and
//! flushes them on a fixed cadence against the external ledger store. The
//! store and the dispatch selector are trait seams ([`LedgerStore`],
//! [`DispatchSelector`]) — persistence and submission live outside this core.

pub mod aggregator;
pub mod store;

pub use aggregator::{FlushOutcome, StatusUpdateAggregator};
pub use store::{DispatchSelector, LedgerError, LedgerStore};
