//! Collaborator seam for chain-reading backends.

use async_trait::async_trait;
use tally_types::Slot;
use thiserror::Error;

/// The newest block a chain source knows about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainTip {
    pub slot: Slot,
    pub block_hash: String,
}

impl ChainTip {
    pub fn new(slot: Slot, block_hash: impl Into<String>) -> Self {
        Self {
            slot,
            block_hash: block_hash.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BlockSourceError {
    /// The source answered, but with a failure result.
    #[error("block source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with something we could not interpret.
    #[error("block source protocol error: {0}")]
    Protocol(String),

    /// The request did not complete in time.
    #[error("block source request timed out")]
    Timeout,

    /// Connection-level fault (refused, reset, DNS).
    #[error("block source transport fault: {0}")]
    Transport(String),
}

impl BlockSourceError {
    /// Whether this error is a fault of the polling machinery itself rather
    /// than a failure result returned by the source.
    pub fn is_fault(&self) -> bool {
        matches!(self, BlockSourceError::Timeout | BlockSourceError::Transport(_))
    }
}

/// A backend capable of reporting its latest block.
///
/// Implementations own their timeout policy; the monitor never waits
/// unboundedly on a source.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn latest_block(&self) -> Result<ChainTip, BlockSourceError>;

    /// Short label for log lines.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_transport_are_faults() {
        assert!(BlockSourceError::Timeout.is_fault());
        assert!(BlockSourceError::Transport("connection refused".into()).is_fault());
    }

    #[test]
    fn failure_results_are_not_faults() {
        assert!(!BlockSourceError::Unavailable("maintenance".into()).is_fault());
        assert!(!BlockSourceError::Protocol("bad payload".into()).is_fault());
    }
}
