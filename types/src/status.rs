//! Ledger dispatch lifecycle and per-transaction status updates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Dispatch state of a ledger transaction on its way to on-chain settlement.
///
/// The happy path is `NotDispatched → MarkDispatch → Dispatched → Completed →
/// Finalized`; `Retrying` and `Failed` are reachable from any dispatched
/// state. This type is a classifier only — transition legality is decided by
/// the external dispatch job, not enforced here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    /// Not yet picked up for on-chain submission.
    NotDispatched,
    /// Stored by the publisher and marked for dispatch.
    MarkDispatch,
    /// Submitted to the chain; a transaction hash exists.
    Dispatched,
    /// On chain with a finality score good enough to consider it done.
    Completed,
    /// Durably finalised on chain.
    Finalized,
    /// Submission is being retried after a transient failure.
    Retrying,
    /// Abandoned, unless externally reset to `NotDispatched`.
    Failed,
}

impl DispatchStatus {
    /// Whether the transaction is eligible to be picked up for submission.
    pub fn is_dispatchable(&self) -> bool {
        *self == DispatchStatus::NotDispatched
    }

    /// Whether the transaction is already somewhere in the dispatch pipeline.
    pub fn is_in_flight(&self) -> bool {
        !self.is_dispatchable()
    }

    /// Every status except `NotDispatched` — used to filter transactions
    /// already in flight.
    pub fn all_dispatched() -> [DispatchStatus; 6] {
        [
            DispatchStatus::MarkDispatch,
            DispatchStatus::Dispatched,
            DispatchStatus::Completed,
            DispatchStatus::Finalized,
            DispatchStatus::Retrying,
            DispatchStatus::Failed,
        ]
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatchStatus::NotDispatched => "NOT_DISPATCHED",
            DispatchStatus::MarkDispatch => "MARK_DISPATCH",
            DispatchStatus::Dispatched => "DISPATCHED",
            DispatchStatus::Completed => "COMPLETED",
            DispatchStatus::Finalized => "FINALIZED",
            DispatchStatus::Retrying => "RETRYING",
            DispatchStatus::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// Proof that a transaction landed on a particular chain.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockchainReceipt {
    /// Chain or backend the receipt comes from.
    pub platform: String,
    /// On-chain transaction hash.
    pub tx_hash: String,
}

impl BlockchainReceipt {
    pub fn new(platform: impl Into<String>, tx_hash: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            tx_hash: tx_hash.into(),
        }
    }
}

/// A pending status change for one ledger transaction.
///
/// Keyed by `tx_id` in the aggregator buffer; a later update for the same id
/// overwrites the earlier one wholesale. Receipts are not merged across
/// updates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatusUpdate {
    pub tx_id: String,
    pub status: DispatchStatus,
    /// Failure detail when `status` is `Failed` or `Retrying`.
    pub error_reason: Option<String>,
    /// Receipts collected so far (unique, deterministic order).
    pub receipts: BTreeSet<BlockchainReceipt>,
}

impl TxStatusUpdate {
    pub fn new(tx_id: impl Into<String>, status: DispatchStatus) -> Self {
        Self {
            tx_id: tx_id.into(),
            status,
            error_reason: None,
            receipts: BTreeSet::new(),
        }
    }

    pub fn with_error(tx_id: impl Into<String>, status: DispatchStatus, reason: impl Into<String>) -> Self {
        Self {
            error_reason: Some(reason.into()),
            ..Self::new(tx_id, status)
        }
    }

    pub fn with_receipts(
        tx_id: impl Into<String>,
        status: DispatchStatus,
        receipts: BTreeSet<BlockchainReceipt>,
    ) -> Self {
        Self {
            receipts,
            ..Self::new(tx_id, status)
        }
    }
}

/// The updated row the ledger store hands back after applying an update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub tx_id: String,
    pub status: DispatchStatus,
    pub error_reason: Option<String>,
    pub receipts: BTreeSet<BlockchainReceipt>,
}

impl TransactionRecord {
    /// Record as it looks after the given update was applied.
    pub fn from_update(update: &TxStatusUpdate) -> Self {
        Self {
            tx_id: update.tx_id.clone(),
            status: update.status,
            error_reason: update.error_reason.clone(),
            receipts: update.receipts.clone(),
        }
    }
}
