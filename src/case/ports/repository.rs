//! Repository port: transactional persistence for cases, tasks, templates,
//! and the reference data they resolve against.
//!
//! The engine assumes the backing store serialises conflicting writes to
//! the same entity; there is no optimistic-concurrency token, so
//! last-writer-wins is acceptable for concurrent edits.

use crate::case::domain::{
    AssociationKind, AssociationRecord, Case, CaseId, CaseTemplate, CaseTemplateId, Org, OrgId,
    Task, TaskId, TaskTemplate, TaskTemplateId, User, UserId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Hard page-size ceiling for paginated listings.
pub const MAX_PAGE_SIZE: usize = 50;

/// A pagination request. Page numbers are one-based; sizes are clamped to
/// [`MAX_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    number: usize,
    size: usize,
}

impl Page {
    /// Creates a page request, clamping the size to [`MAX_PAGE_SIZE`] and
    /// the number to at least one.
    #[must_use]
    pub fn new(number: usize, size: usize) -> Self {
        Self {
            number: number.max(1),
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Returns the one-based page number.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Returns the clamped page size.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 25)
    }
}

/// One page of results plus paging metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageOf<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// The request that produced this page.
    pub page: Page,
    /// Total number of pages.
    pub pages: usize,
    /// Total number of matching items.
    pub total: usize,
}

/// Sort keys for case listings, always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSort {
    /// Most recently created first.
    CreationDate,
    /// Most recently modified first.
    LastModified,
    /// Nearest deadline first; cases without a deadline are excluded.
    Deadline,
}

/// Predicate for case search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFilter {
    /// Match the completion flag.
    pub completed: bool,
    /// When non-empty, require at least one of these tag names.
    pub tags: Vec<String>,
    /// When non-empty, require at least one of these cluster names.
    pub clusters: Vec<String>,
    /// Optional sort key.
    pub sort: Option<CaseSort>,
}

/// Per-user connector entitlement: the credential a user holds for a
/// configured connector instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInstance {
    /// API key the user registered for the instance.
    pub api_key: String,
}

/// Transactional persistence contract for the lifecycle engines.
///
/// Each lifecycle operation runs as one logical transaction; adapters are
/// expected to make the individual calls atomic and to serialise
/// conflicting writes.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Stores a new case.
    async fn insert_case(&self, case: &Case) -> RepositoryResult<()>;

    /// Persists changes to an existing case.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::MissingCase`] when the case does not
    /// exist.
    async fn update_case(&self, case: &Case) -> RepositoryResult<()>;

    /// Finds a case by id.
    async fn fetch_case(&self, id: CaseId) -> RepositoryResult<Option<Case>>;

    /// Finds a case by its unique title.
    async fn fetch_case_by_title(&self, title: &str) -> RepositoryResult<Option<Case>>;

    /// Removes a case row. Child tasks must already be gone; embedded
    /// satellite rows die with the aggregate.
    async fn delete_case(&self, id: CaseId) -> RepositoryResult<()>;

    /// Filters and paginates cases.
    async fn search_cases(&self, filter: &CaseFilter, page: Page) -> RepositoryResult<PageOf<Case>>;

    /// Stores a new task.
    async fn insert_task(&self, task: &Task) -> RepositoryResult<()>;

    /// Persists changes to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::MissingTask`] when the task does not
    /// exist.
    async fn update_task(&self, task: &Task) -> RepositoryResult<()>;

    /// Finds a task by id.
    async fn fetch_task(&self, id: TaskId) -> RepositoryResult<Option<Task>>;

    /// Removes a task row.
    async fn delete_task(&self, id: TaskId) -> RepositoryResult<()>;

    /// Lists a case's tasks ordered by their case order index.
    async fn list_tasks(&self, case: CaseId) -> RepositoryResult<Vec<Task>>;

    /// Finds an organisation by id.
    async fn fetch_org(&self, id: OrgId) -> RepositoryResult<Option<Org>>;

    /// Finds a user by id.
    async fn fetch_user(&self, id: UserId) -> RepositoryResult<Option<User>>;

    /// Lists the members of an organisation.
    async fn list_org_users(&self, org: OrgId) -> RepositoryResult<Vec<User>>;

    /// Resolves an association name to its canonical record, or `None`
    /// when the name is not part of the configured vocabulary.
    async fn resolve_key(
        &self,
        kind: AssociationKind,
        name: &str,
    ) -> RepositoryResult<Option<AssociationRecord>>;

    /// Returns the credential a user holds for a connector instance, or
    /// `None` when the user is not entitled to it.
    async fn user_instance(
        &self,
        user: UserId,
        instance: &str,
    ) -> RepositoryResult<Option<UserInstance>>;

    /// Stores a new case template.
    async fn insert_case_template(&self, template: &CaseTemplate) -> RepositoryResult<()>;

    /// Finds a case template by id.
    async fn fetch_case_template(
        &self,
        id: CaseTemplateId,
    ) -> RepositoryResult<Option<CaseTemplate>>;

    /// Finds a case template by its unique title.
    async fn fetch_case_template_by_title(
        &self,
        title: &str,
    ) -> RepositoryResult<Option<CaseTemplate>>;

    /// Stores a new task template.
    async fn insert_task_template(&self, template: &TaskTemplate) -> RepositoryResult<()>;

    /// Finds a task template by id.
    async fn fetch_task_template(
        &self,
        id: TaskTemplateId,
    ) -> RepositoryResult<Option<TaskTemplate>>;

    /// Finds a task template by its unique title.
    async fn fetch_task_template_by_title(
        &self,
        title: &str,
    ) -> RepositoryResult<Option<TaskTemplate>>;
}

/// Errors returned by repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// An update targeted a case that does not exist.
    #[error("case not found: {0}")]
    MissingCase(CaseId),

    /// An update targeted a task that does not exist.
    #[error("task not found: {0}")]
    MissingTask(TaskId),

    /// A case with the same identifier already exists.
    #[error("duplicate case identifier: {0}")]
    DuplicateCase(CaseId),

    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
