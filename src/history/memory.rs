//! In-memory history recorder for tests.

use super::{HistoryEntry, HistoryError, HistoryRecorder};
use crate::case::domain::{CaseId, User};
use async_trait::async_trait;
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory history recorder.
pub struct InMemoryHistory<C>
where
    C: Clock + Send + Sync,
{
    logs: Arc<RwLock<HashMap<CaseId, Vec<HistoryEntry>>>>,
    clock: Arc<C>,
    fail_appends: Arc<RwLock<bool>>,
}

impl<C> InMemoryHistory<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty recorder.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            logs: Arc::new(RwLock::new(HashMap::new())),
            clock,
            fail_appends: Arc::new(RwLock::new(false)),
        }
    }

    /// Makes every subsequent append fail, for atomicity tests.
    pub fn fail_next_appends(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_appends.write() {
            *flag = fail;
        }
    }

    /// Returns whether the case currently has a log.
    #[must_use]
    pub fn has_log(&self, case: CaseId) -> bool {
        self.logs
            .read()
            .map(|logs| logs.contains_key(&case))
            .unwrap_or(false)
    }
}

impl<C> Clone for InMemoryHistory<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            logs: Arc::clone(&self.logs),
            clock: Arc::clone(&self.clock),
            fail_appends: Arc::clone(&self.fail_appends),
        }
    }
}

fn poisoned(case: CaseId) -> HistoryError {
    HistoryError::Corrupt {
        case,
        reason: "history lock poisoned".to_owned(),
    }
}

#[async_trait]
impl<C> HistoryRecorder for InMemoryHistory<C>
where
    C: Clock + Send + Sync,
{
    async fn append(&self, case: CaseId, actor: &User, message: &str) -> Result<(), HistoryError> {
        let failing = self
            .fail_appends
            .read()
            .map(|flag| *flag)
            .map_err(|_| poisoned(case))?;
        if failing {
            return Err(HistoryError::Store(std::io::Error::other(
                "history store unavailable",
            )));
        }
        let mut logs = self.logs.write().map_err(|_| poisoned(case))?;
        logs.entry(case).or_default().push(HistoryEntry {
            actor: actor.name().to_owned(),
            timestamp: self.clock.utc(),
            message: message.to_owned(),
        });
        Ok(())
    }

    async fn read_all(&self, case: CaseId) -> Result<Vec<HistoryEntry>, HistoryError> {
        let logs = self.logs.read().map_err(|_| poisoned(case))?;
        Ok(logs.get(&case).cloned().unwrap_or_default())
    }

    async fn purge(&self, case: CaseId) -> Result<(), HistoryError> {
        let mut logs = self.logs.write().map_err(|_| poisoned(case))?;
        logs.remove(&case);
        Ok(())
    }
}

impl<C> std::fmt::Debug for InMemoryHistory<C>
where
    C: Clock + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryHistory").finish_non_exhaustive()
    }
}
