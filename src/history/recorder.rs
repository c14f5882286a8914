//! History recorder port and entry type.

use crate::case::domain::{CaseId, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One immutable audit event on a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Display name of the acting user.
    pub actor: String,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Human-readable event message.
    pub message: String,
}

/// Errors raised by a history recorder.
///
/// Append failures are part of the enclosing operation's atomicity
/// contract and must propagate; they are never best-effort.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A stored entry could not be decoded.
    #[error("corrupt history entry for case {case}: {reason}")]
    Corrupt {
        /// Case whose log is damaged.
        case: CaseId,
        /// Decoder diagnostic.
        reason: String,
    },

    /// The underlying store failed.
    #[error("history store failure: {0}")]
    Store(#[from] std::io::Error),
}

/// Append-only, per-case audit log contract.
///
/// The log is keyed by the case id and outlives repository rollbacks; it
/// survives case deletion until [`HistoryRecorder::purge`] is called as
/// the final step of that deletion.
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Appends one event to the case's log.
    async fn append(&self, case: CaseId, actor: &User, message: &str) -> Result<(), HistoryError>;

    /// Reads the full log in append order. A case with no log yields an
    /// empty sequence.
    async fn read_all(&self, case: CaseId) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Discards the case's log. Tolerates an already-absent log.
    async fn purge(&self, case: CaseId) -> Result<(), HistoryError>;
}
