//! Notification dispatcher port.
//!
//! Fire-and-forget message emission to org, user, or all-participant
//! scopes. Delivery is owned by the collaborator; the engines log and
//! swallow dispatch failures rather than aborting lifecycle operations.

use crate::case::domain::{CaseId, OrgId, UserId};
use async_trait::async_trait;
use thiserror::Error;

/// Error raised by a notification dispatcher. Never aborts the caller.
#[derive(Debug, Clone, Error)]
#[error("notification dispatch failed: {0}")]
pub struct NotifyError(pub String);

/// Notification dispatch contract.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Notifies every member of one participant org.
    async fn notify_org(
        &self,
        message: &str,
        case: CaseId,
        org: OrgId,
        icon: &str,
    ) -> Result<(), NotifyError>;

    /// Notifies every org participating in the case.
    async fn notify_case_orgs(&self, message: &str, case: CaseId, icon: &str)
    -> Result<(), NotifyError>;

    /// Notifies a single user.
    async fn notify_user(
        &self,
        message: &str,
        case: CaseId,
        user: UserId,
        icon: &str,
    ) -> Result<(), NotifyError>;
}
