//! Append-only history/audit trail for cases.
//!
//! Every lifecycle operation appends an immutable event keyed by the case
//! id. The log is a separate durable resource from the repository: it is
//! not rolled back with a failed transaction, and it survives case
//! deletion until explicitly purged as the final deletion step.

mod fs_store;
mod memory;
mod recorder;

pub use fs_store::FsHistoryStore;
pub use memory::InMemoryHistory;
pub use recorder::{HistoryEntry, HistoryError, HistoryRecorder};

#[cfg(test)]
mod tests;
