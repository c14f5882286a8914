//! In-memory collaborator adapters: notification recording, byte storage,
//! scripted modules, and a canned pad client.

use crate::case::domain::{CaseId, CaseSnapshot, FileHandle, OrgId, User, UserId};
use crate::case::ports::{
    CaseModule, FileStore, FileStoreError, InstanceBinding, ModuleError, ModuleOutcome, Notifier,
    NotifyError, PadClient, PadError,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

/// The scope a recorded notification targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyScope {
    /// One participant org.
    Org(OrgId),
    /// Every org participating in the case.
    CaseOrgs,
    /// One user.
    User(UserId),
}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedNotification {
    /// Message text.
    pub message: String,
    /// Case the notification concerned.
    pub case: CaseId,
    /// Dispatch scope.
    pub scope: NotifyScope,
    /// Display icon name.
    pub icon: String,
}

/// Notifier adapter that records every dispatch.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<RecordedNotification>>>,
    fail: Arc<RwLock<bool>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent dispatch fail, to exercise the
    /// fire-and-forget contract.
    pub fn fail_dispatch(&self, fail: bool) {
        if let Ok(mut flag) = self.fail.write() {
            *flag = fail;
        }
    }

    /// Returns the recorded notifications in dispatch order.
    #[must_use]
    pub fn sent(&self) -> Vec<RecordedNotification> {
        self.sent.read().map(|sent| sent.clone()).unwrap_or_default()
    }

    fn record(&self, notification: RecordedNotification) -> Result<(), NotifyError> {
        let failing = self.fail.read().map(|flag| *flag).unwrap_or(false);
        if failing {
            return Err(NotifyError("dispatcher offline".to_owned()));
        }
        if let Ok(mut sent) = self.sent.write() {
            sent.push(notification);
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_org(
        &self,
        message: &str,
        case: CaseId,
        org: OrgId,
        icon: &str,
    ) -> Result<(), NotifyError> {
        self.record(RecordedNotification {
            message: message.to_owned(),
            case,
            scope: NotifyScope::Org(org),
            icon: icon.to_owned(),
        })
    }

    async fn notify_case_orgs(
        &self,
        message: &str,
        case: CaseId,
        icon: &str,
    ) -> Result<(), NotifyError> {
        self.record(RecordedNotification {
            message: message.to_owned(),
            case,
            scope: NotifyScope::CaseOrgs,
            icon: icon.to_owned(),
        })
    }

    async fn notify_user(
        &self,
        message: &str,
        case: CaseId,
        user: UserId,
        icon: &str,
    ) -> Result<(), NotifyError> {
        self.record(RecordedNotification {
            message: message.to_owned(),
            case,
            scope: NotifyScope::User(user),
            icon: icon.to_owned(),
        })
    }
}

impl std::fmt::Debug for RecordingNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingNotifier").finish_non_exhaustive()
    }
}

/// File-storage adapter keeping bytes in a map keyed by generated handles.
#[derive(Clone, Default)]
pub struct InMemoryFileStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryFileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects
            .read()
            .map(|objects| objects.len())
            .unwrap_or(0)
    }
}

fn storage_poisoned() -> FileStoreError {
    FileStoreError::Storage("store lock poisoned".to_owned())
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<FileHandle, FileStoreError> {
        let handle = format!("{}-{name}", uuid::Uuid::new_v4());
        let mut objects = self.objects.write().map_err(|_| storage_poisoned())?;
        objects.insert(handle.clone(), bytes.to_vec());
        Ok(FileHandle::new(handle))
    }

    async fn retrieve(&self, handle: &FileHandle) -> Result<Vec<u8>, FileStoreError> {
        let objects = self.objects.read().map_err(|_| storage_poisoned())?;
        objects
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| FileStoreError::MissingObject(handle.as_str().to_owned()))
    }

    async fn delete(&self, handle: &FileHandle) -> Result<(), FileStoreError> {
        let mut objects = self.objects.write().map_err(|_| storage_poisoned())?;
        objects
            .remove(handle.as_str())
            .map(|_| ())
            .ok_or_else(|| FileStoreError::MissingObject(handle.as_str().to_owned()))
    }
}

impl std::fmt::Debug for InMemoryFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryFileStore").finish_non_exhaustive()
    }
}

/// One recorded module invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInvocation {
    /// Binding the module was invoked with.
    pub binding: InstanceBinding,
    /// Case the snapshot described.
    pub case: CaseId,
}

/// Module adapter replaying a scripted queue of outcomes, one per
/// invocation, recording the bindings it was handed.
#[derive(Default)]
pub struct ScriptedModule {
    outcomes: Mutex<VecDeque<ModuleOutcome>>,
    invocations: Mutex<Vec<RecordedInvocation>>,
}

impl ScriptedModule {
    /// Creates a module that replays `outcomes` in order.
    #[must_use]
    pub fn new(outcomes: impl IntoIterator<Item = ModuleOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Returns the recorded invocations in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations
            .lock()
            .map(|invocations| invocations.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CaseModule for ScriptedModule {
    async fn invoke(
        &self,
        instance: &InstanceBinding,
        case: &CaseSnapshot,
        _actor: &User,
    ) -> Result<ModuleOutcome, ModuleError> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(RecordedInvocation {
                binding: instance.clone(),
                case: case.id,
            });
        }
        let outcome = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.pop_front());
        outcome.ok_or_else(|| ModuleError("script exhausted".to_owned()))
    }
}

impl std::fmt::Debug for ScriptedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedModule").finish_non_exhaustive()
    }
}

/// Pad client returning one canned response for every URL.
#[derive(Debug, Clone)]
pub struct StaticPadClient {
    response: Result<String, PadError>,
}

impl StaticPadClient {
    /// Creates a client serving `body` for every download.
    #[must_use]
    pub const fn serving(body: String) -> Self {
        Self {
            response: Ok(body),
        }
    }

    /// Creates a client failing every download with `error`.
    #[must_use]
    pub const fn failing(error: PadError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[async_trait]
impl PadClient for StaticPadClient {
    async fn download(&self, _url: &str) -> Result<String, PadError> {
        self.response.clone()
    }
}
