//! Orchestration services for the case/task lifecycle.
//!
//! Services coordinate the domain aggregates with the repository, the
//! history recorder, and the external collaborators. Every mutating
//! operation checks permissions before touching state, appends its audit
//! event as part of the operation, and treats notification dispatch as
//! fire-and-forget.

mod case_lifecycle;
mod modules;
mod reconcile;
mod task_lifecycle;
mod template;

pub use case_lifecycle::{CaseLifecycleService, PadNotes};
pub use modules::ModuleRunner;
pub use reconcile::{AssociationReconciler, ReconcileReport};
pub use task_lifecycle::TaskLifecycleService;
pub use template::TemplateEngine;

use crate::case::domain::{
    AssociationKind, Case, CaseDomainError, CaseId, CaseTemplateId, FileId, NoteId, OrgId,
    StatusId, TaskId, TaskTemplateId, User, UserId,
};
use crate::case::ports::{NotifyError, RepositoryError};
use crate::history::HistoryError;
use thiserror::Error;

/// Result type for lifecycle service operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Service-level error taxonomy.
///
/// Variants group into the classes the interface contract names:
/// not-found (entity and name lookups), conflict (unique titles),
/// forbidden (membership and connector entitlement), invalid input
/// (status vocabulary, recurrence dates, domain validation), and
/// external failure (module and storage collaborators). Repository and
/// history failures pass through transparently.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No case with the given id.
    #[error("case not found: {0}")]
    CaseNotFound(CaseId),

    /// No task with the given id.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// No organisation with the given id.
    #[error("org not found: {0}")]
    OrgNotFound(OrgId),

    /// No user with the given id.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// No note with the given id on the targeted task.
    #[error("note not found: {0}")]
    NoteNotFound(NoteId),

    /// No file record with the given id on the targeted task.
    #[error("file not found: {0}")]
    FileNotFound(FileId),

    /// No case template with the given id.
    #[error("case template not found: {0}")]
    CaseTemplateNotFound(CaseTemplateId),

    /// No task template with the given id.
    #[error("task template not found: {0}")]
    TaskTemplateNotFound(TaskTemplateId),

    /// An association name did not resolve to a canonical record.
    #[error("unknown {kind}: {name}")]
    UnknownName {
        /// Association kind searched.
        kind: AssociationKind,
        /// Unresolvable name.
        name: String,
    },

    /// No module registered under the given name.
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// The two cases are not linked.
    #[error("case {case} is not linked to case {other}")]
    LinkNotFound {
        /// Case the removal was requested on.
        case: CaseId,
        /// The other side of the missing pair.
        other: CaseId,
    },

    /// A unique title is already in use.
    #[error("title already exists: {0}")]
    TitleTaken(String),

    /// The actor is not an admin and belongs to no participant org.
    #[error("user {user} has no access to case {case}")]
    PermissionDenied {
        /// Acting user.
        user: UserId,
        /// Targeted case.
        case: CaseId,
    },

    /// The actor holds no credential for a requested connector instance.
    #[error("user {user} is not entitled to connector instance {instance}")]
    ConnectorNotEntitled {
        /// Acting user.
        user: UserId,
        /// Requested instance name.
        instance: String,
    },

    /// A status id outside the configured vocabulary.
    #[error("unknown status: {0}")]
    UnknownStatus(StatusId),

    /// A recurrence watcher must belong to a participant org.
    #[error("user {user} is not in a participant org of case {case}")]
    WatcherNotParticipant {
        /// Requested watcher.
        user: UserId,
        /// Targeted case.
        case: CaseId,
    },

    /// A module returned a structured error payload. Instances processed
    /// before the failure keep their persisted references.
    #[error("module returned an error payload")]
    ModuleFailure(serde_json::Value),

    /// An external collaborator failed (module transport, file storage).
    #[error("external collaborator failure: {0}")]
    External(String),

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] CaseDomainError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// History append or purge failed; history is part of the operation's
    /// atomicity contract.
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Checks the membership/admin gate every mutating operation applies
/// before touching state.
pub(crate) fn ensure_member(case: &Case, actor: &User) -> LifecycleResult<()> {
    if actor.is_admin() || case.has_org(actor.org_id()) {
        return Ok(());
    }
    Err(LifecycleError::PermissionDenied {
        user: actor.id(),
        case: case.id(),
    })
}

/// Logs and swallows a notification dispatch failure; delivery is
/// fire-and-forget and never aborts the lifecycle operation.
pub(crate) fn swallow_notify(result: Result<(), NotifyError>) {
    if let Err(err) = result {
        tracing::warn!(error = %err, "notification dispatch failed");
    }
}

/// One-based order index for appending to a sequence of `len` items.
pub(crate) fn next_order(len: usize) -> u32 {
    u32::try_from(len).map_or(u32::MAX, |count| count.saturating_add(1))
}
