//! Chain synchronization status snapshots.
//!
//! A [`SyncStatus`] is an immutable classification of how far the locally
//! tracked chain source lags behind the reference source, recomputed on every
//! poll tick of the monitor. Construct via the factory methods; the struct
//! itself never changes after construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of the tracked source relative to the reference source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    /// Drift is within the configured tolerance.
    Ok,
    /// Drift exceeds the tolerance (or was never computed).
    NotYet,
    /// Both sources answered but at least one reported failure.
    UnknownError,
    /// A fault (timeout, transport error) occurred while polling.
    Error,
}

/// Snapshot of the chain sync state at one poll tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Slot drift `reference - tracked`; `None` when never computed or the
    /// poll faulted before both slots were known.
    pub diff: Option<i64>,
    /// Fault description when `state` is `Error`.
    pub error_detail: Option<String>,
}

impl SyncStatus {
    /// Within tolerance.
    pub fn ok(diff: i64) -> Self {
        Self {
            state: SyncState::Ok,
            diff: Some(diff),
            error_detail: None,
        }
    }

    /// Behind by more than the tolerance.
    pub fn not_yet(diff: i64) -> Self {
        Self {
            state: SyncState::NotYet,
            diff: Some(diff),
            error_detail: None,
        }
    }

    /// Never computed yet (monitor has not completed a poll).
    pub fn not_yet_unknown() -> Self {
        Self {
            state: SyncState::NotYet,
            diff: None,
            error_detail: None,
        }
    }

    /// A source answered, but with a failure result.
    pub fn unknown_error() -> Self {
        Self {
            state: SyncState::UnknownError,
            diff: None,
            error_detail: None,
        }
    }

    /// The poll itself faulted.
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            state: SyncState::Error,
            diff: None,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Ok
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.state, self.diff, &self.error_detail) {
            (SyncState::Ok, Some(diff), _) => write!(f, "OK (drift {diff} slots)"),
            (SyncState::NotYet, Some(diff), _) => write!(f, "NOT_YET (drift {diff} slots)"),
            (SyncState::NotYet, None, _) => write!(f, "NOT_YET (never computed)"),
            (SyncState::UnknownError, _, _) => write!(f, "UNKNOWN_ERROR"),
            (SyncState::Error, _, Some(detail)) => write!(f, "ERROR ({detail})"),
            (state, _, _) => write!(f, "{state:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_preserves_diff() {
        let status = SyncStatus::ok(5);
        assert!(status.is_synced());
        assert_eq!(status.diff, Some(5));
        assert_eq!(status.error_detail, None);
    }

    #[test]
    fn not_yet_preserves_diff() {
        let status = SyncStatus::not_yet(20);
        assert!(!status.is_synced());
        assert_eq!(status.diff, Some(20));
    }

    #[test]
    fn never_computed_has_no_diff() {
        let status = SyncStatus::not_yet_unknown();
        assert_eq!(status.state, SyncState::NotYet);
        assert_eq!(status.diff, None);
    }

    #[test]
    fn unknown_error_is_not_synced() {
        assert!(!SyncStatus::unknown_error().is_synced());
    }

    #[test]
    fn error_carries_detail() {
        let status = SyncStatus::error("connection refused");
        assert_eq!(status.state, SyncState::Error);
        assert_eq!(status.error_detail.as_deref(), Some("connection refused"));
        assert!(!status.is_synced());
    }

    #[test]
    fn display_includes_drift() {
        assert_eq!(SyncStatus::ok(5).to_string(), "OK (drift 5 slots)");
        assert_eq!(SyncStatus::not_yet(20).to_string(), "NOT_YET (drift 20 slots)");
        assert_eq!(SyncStatus::not_yet_unknown().to_string(), "NOT_YET (never computed)");
    }
}
