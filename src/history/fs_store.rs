//! Filesystem-backed history store.
//!
//! One JSON-lines file per case, named by the case id, inside a
//! capability-scoped directory. Appends go straight to disk so the log
//! survives repository rollbacks; reversal is only ever the explicit
//! purge at case deletion.

use super::{HistoryEntry, HistoryError, HistoryRecorder};
use crate::case::domain::{CaseId, User};
use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::OpenOptions;
use cap_std::fs_utf8::Dir;
use mockable::Clock;
use std::io::{ErrorKind, Write};
use std::sync::Arc;

/// History recorder writing one append-only file per case.
pub struct FsHistoryStore<C>
where
    C: Clock + Send + Sync,
{
    dir: Dir,
    clock: Arc<C>,
}

impl<C> FsHistoryStore<C>
where
    C: Clock + Send + Sync,
{
    /// Opens the store rooted at `path`, which must already exist.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be opened.
    pub fn open(path: &str, clock: Arc<C>) -> std::io::Result<Self> {
        let dir = Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self { dir, clock })
    }

    /// Wraps an already-opened capability directory.
    #[must_use]
    pub const fn from_dir(dir: Dir, clock: Arc<C>) -> Self {
        Self { dir, clock }
    }

    fn file_name(case: CaseId) -> String {
        case.to_string()
    }
}

#[async_trait]
impl<C> HistoryRecorder for FsHistoryStore<C>
where
    C: Clock + Send + Sync,
{
    async fn append(&self, case: CaseId, actor: &User, message: &str) -> Result<(), HistoryError> {
        let entry = HistoryEntry {
            actor: actor.name().to_owned(),
            timestamp: self.clock.utc(),
            message: message.to_owned(),
        };
        let line = serde_json::to_string(&entry).map_err(|err| HistoryError::Corrupt {
            case,
            reason: err.to_string(),
        })?;
        let mut file = self.dir.open_with(
            Self::file_name(case),
            OpenOptions::new().create(true).append(true),
        )?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    async fn read_all(&self, case: CaseId) -> Result<Vec<HistoryEntry>, HistoryError> {
        let raw = match self.dir.read_to_string(Self::file_name(case)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(HistoryError::Store(err)),
        };
        let mut entries = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: HistoryEntry =
                serde_json::from_str(line).map_err(|err| HistoryError::Corrupt {
                    case,
                    reason: err.to_string(),
                })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn purge(&self, case: CaseId) -> Result<(), HistoryError> {
        match self.dir.remove_file(Self::file_name(case)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(HistoryError::Store(err)),
        }
    }
}

impl<C> std::fmt::Debug for FsHistoryStore<C>
where
    C: Clock + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsHistoryStore").finish_non_exhaustive()
    }
}
