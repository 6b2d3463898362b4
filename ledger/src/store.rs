//! Collaborator seams for the ledger store and the dispatch job.

use async_trait::async_trait;
use std::collections::HashMap;
use tally_types::{TransactionRecord, TxStatusUpdate};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The store rejected or failed the operation.
    #[error("ledger store error: {0}")]
    Store(String),

    /// The store could not be reached.
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),
}

/// Durable ledger of transaction records, idempotent per transaction id.
///
/// Implementations own their timeout policy; aggregator flushes never wait
/// unboundedly.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Apply a mapping of transaction id → status update, returning the
    /// updated records.
    async fn apply_status_updates(
        &self,
        updates: &HashMap<String, TxStatusUpdate>,
    ) -> Result<Vec<TransactionRecord>, LedgerError>;

    /// Persist previously applied records.
    async fn persist_records(&self, records: &[TransactionRecord]) -> Result<(), LedgerError>;

    /// Recompute batch-level statistics for the transactions touched by
    /// `updates`.
    async fn recompute_batch_stats(
        &self,
        updates: &HashMap<String, TxStatusUpdate>,
    ) -> Result<(), LedgerError>;
}

/// Pulls transactions eligible for on-chain submission.
///
/// The dispatch/submission logic itself is external to this core; only the
/// dispatchability vocabulary ([`tally_types::DispatchStatus`]) is shared.
#[async_trait]
pub trait DispatchSelector: Send + Sync {
    /// Pull up to `limit` transactions whose status is dispatchable.
    async fn pull_dispatchable(&self, limit: usize) -> Result<Vec<TransactionRecord>, LedgerError>;
}
