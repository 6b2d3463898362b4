//! Fundamental types for the tally ledger tracker.
//!
//! Shared vocabulary between the chain-sync monitor, the status-update
//! aggregator, and the external dispatch job:
//! - Chain position ([`Slot`]) and drift arithmetic
//! - The ledger dispatch lifecycle ([`DispatchStatus`]) and its classifier
//!   predicates
//! - Per-transaction status updates ([`TxStatusUpdate`]) and the records the
//!   ledger store hands back ([`TransactionRecord`])
//! - Chain synchronization snapshots ([`SyncStatus`])

pub mod slot;
pub mod status;
pub mod sync;

pub use slot::Slot;
pub use status::{BlockchainReceipt, DispatchStatus, TransactionRecord, TxStatusUpdate};
pub use sync::{SyncState, SyncStatus};
