//! Task lifecycle engine: task CRUD, assignment, notes, files, status
//! transitions, and the completion toggle the case cascade drives.

use super::{
    AssociationReconciler, LifecycleError, LifecycleResult, ensure_member, next_order,
    swallow_notify,
};
use crate::case::domain::{
    Case, CaseId, FileHandle, FileId, NoteId, StatusVocabulary, StatusId, Task, TaskDraft, TaskId,
    TaskUpdate, User, UserId, combine_deadline,
};
use crate::case::ports::{CaseRepository, FileStore, FileStoreError, Notifier};
use crate::history::HistoryRecorder;
use mockable::Clock;
use std::sync::Arc;

/// Task lifecycle orchestration service.
pub struct TaskLifecycleService<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    notifier: Arc<dyn Notifier>,
    history: Arc<dyn HistoryRecorder>,
    files: Arc<dyn FileStore>,
    statuses: StatusVocabulary,
    reconciler: AssociationReconciler<R>,
}

impl<R, C> Clone for TaskLifecycleService<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
            notifier: Arc::clone(&self.notifier),
            history: Arc::clone(&self.history),
            files: Arc::clone(&self.files),
            statuses: self.statuses.clone(),
            reconciler: self.reconciler.clone(),
        }
    }
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    /// Creates a task lifecycle service.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        notifier: Arc<dyn Notifier>,
        history: Arc<dyn HistoryRecorder>,
        files: Arc<dyn FileStore>,
        statuses: StatusVocabulary,
    ) -> Self {
        Self {
            reconciler: AssociationReconciler::new(Arc::clone(&repository)),
            repository,
            clock,
            notifier,
            history,
            files,
            statuses,
        }
    }

    /// Returns the configured status vocabulary.
    #[must_use]
    pub const fn statuses(&self) -> &StatusVocabulary {
        &self.statuses
    }

    pub(crate) async fn require_case(&self, id: CaseId) -> LifecycleResult<Case> {
        self.repository
            .fetch_case(id)
            .await?
            .ok_or(LifecycleError::CaseNotFound(id))
    }

    pub(crate) async fn require_task(&self, id: TaskId) -> LifecycleResult<Task> {
        self.repository
            .fetch_task(id)
            .await?
            .ok_or(LifecycleError::TaskNotFound(id))
    }

    /// Creates a task inside a case, appended at the end of the case's
    /// task order, with its status defaulted to `Created`.
    ///
    /// # Errors
    ///
    /// Fails when the case is missing, the actor is not a participant, an
    /// association name does not resolve, or persistence fails.
    pub async fn create_task(
        &self,
        draft: TaskDraft,
        case_id: CaseId,
        actor: &User,
    ) -> LifecycleResult<Task> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;

        let existing = self.repository.list_tasks(case_id).await?;
        let mut task = Task::new(
            case_id,
            &draft.title,
            draft.description,
            draft.url,
            combine_deadline(draft.deadline_date, draft.deadline_time),
            self.statuses.created(),
            next_order(existing.len()),
            &*self.clock,
        )?;
        let _report = self
            .reconciler
            .reconcile(task.associations_mut(), &draft.associations)
            .await?;

        self.repository.insert_task(&task).await?;
        case.touch(&*self.clock);
        self.repository.update_case(&case).await?;
        self.history.append(case_id, actor, "Task created").await?;
        Ok(task)
    }

    /// Edits a task's scalar fields and reconciles its associations.
    pub async fn edit_task(
        &self,
        update: TaskUpdate,
        task_id: TaskId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;

        task.apply_edit(
            &update.title,
            update.description,
            update.url,
            combine_deadline(update.deadline_date, update.deadline_time),
        )?;
        let _report = self
            .reconciler
            .reconcile(task.associations_mut(), &update.associations)
            .await?;
        task.touch(&*self.clock);
        self.repository.update_task(&task).await?;
        self.history.append(case.id(), actor, "Task edited").await?;
        Ok(())
    }

    /// Toggles a task's completion and returns the new completed flag.
    ///
    /// Completing sets the status to `Finished` and remembers the status
    /// it replaced; un-completing restores it. Calling twice returns the
    /// task to its original state.
    pub async fn complete_task(&self, task_id: TaskId, actor: &User) -> LifecycleResult<bool> {
        let mut task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;

        if task.completed() {
            task.uncomplete(self.statuses.created());
            task.touch(&*self.clock);
            self.repository.update_task(&task).await?;
        } else {
            task.complete(self.statuses.finished());
            task.touch(&*self.clock);
            self.repository.update_task(&task).await?;
            self.history
                .append(case.id(), actor, "Task completed")
                .await?;
        }
        Ok(task.completed())
    }

    /// Completes every not-yet-completed task of a case. Used by the case
    /// completion cascade; already-completed tasks are left alone.
    pub(crate) async fn cascade_complete(
        &self,
        case_id: CaseId,
        actor: &User,
    ) -> LifecycleResult<()> {
        for mut task in self.repository.list_tasks(case_id).await? {
            if task.completed() {
                continue;
            }
            task.complete(self.statuses.finished());
            task.touch(&*self.clock);
            self.repository.update_task(&task).await?;
            self.history
                .append(case_id, actor, "Task completed")
                .await?;
        }
        Ok(())
    }

    /// Deletes a task: stored file bytes, then the row. The audit event is
    /// appended before the row disappears because it needs the title.
    pub async fn delete_task(&self, task_id: TaskId, actor: &User) -> LifecycleResult<()> {
        let task = self.require_task(task_id).await?;
        let mut case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;

        for file in task.files() {
            self.files
                .delete(file.handle())
                .await
                .map_err(|err| LifecycleError::External(err.to_string()))?;
        }

        self.history
            .append(case.id(), actor, &format!("Task '{}' deleted", task.title()))
            .await?;
        self.repository.delete_task(task_id).await?;
        case.touch(&*self.clock);
        self.repository.update_case(&case).await?;
        Ok(())
    }

    /// Assigns a user to a task. Idempotent: assigning an already-assigned
    /// user (self-assignment included) is a silent no-op.
    pub async fn assign_task(
        &self,
        task_id: TaskId,
        user_id: UserId,
        actor: &User,
        self_assign: bool,
    ) -> LifecycleResult<()> {
        let mut task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;
        let assignee = self
            .repository
            .fetch_user(user_id)
            .await?
            .ok_or(LifecycleError::UserNotFound(user_id))?;

        if !task.assign(user_id) {
            return Ok(());
        }
        task.touch(&*self.clock);
        self.repository.update_task(&task).await?;
        self.history
            .append(
                case.id(),
                actor,
                &format!("User {} assigned to task '{}'", assignee.name(), task.title()),
            )
            .await?;
        if !self_assign {
            swallow_notify(
                self.notifier
                    .notify_user(
                        &format!("You were assigned to task '{}'", task.title()),
                        case.id(),
                        user_id,
                        "fa-solid fa-user-plus",
                    )
                    .await,
            );
        }
        Ok(())
    }

    /// Removes a user's assignment from a task.
    pub async fn remove_assignment(
        &self,
        task_id: TaskId,
        user_id: UserId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;

        if task.unassign(user_id) {
            task.touch(&*self.clock);
            self.repository.update_task(&task).await?;
            self.history
                .append(
                    case.id(),
                    actor,
                    &format!("User {user_id} removed from task '{}'", task.title()),
                )
                .await?;
        }
        Ok(())
    }

    /// Assigns a status from the configured vocabulary. Beyond the
    /// completed/`Finished` coupling, status is not a finite-state
    /// machine: any vocabulary entry is accepted unconditionally.
    pub async fn change_status(
        &self,
        status: StatusId,
        task_id: TaskId,
        actor: &User,
    ) -> LifecycleResult<()> {
        if !self.statuses.contains(status) {
            return Err(LifecycleError::UnknownStatus(status));
        }
        let mut task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;

        task.set_status(status);
        task.touch(&*self.clock);
        self.repository.update_task(&task).await?;
        self.history
            .append(case.id(), actor, "Task Status changed")
            .await?;
        Ok(())
    }

    /// Creates or edits a note. `None` creates a new note appended at the
    /// next order index; `Some(id)` rewrites that note in place, keeping
    /// its order index. Returns the affected note's id.
    pub async fn modify_note(
        &self,
        task_id: TaskId,
        note_id: Option<NoteId>,
        text: String,
        actor: &User,
    ) -> LifecycleResult<NoteId> {
        let mut task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;

        let affected = match note_id {
            Some(id) => {
                if !task.rewrite_note(id, text) {
                    return Err(LifecycleError::NoteNotFound(id));
                }
                id
            }
            None => task.append_note(text),
        };
        task.touch(&*self.clock);
        self.repository.update_task(&task).await?;
        self.history
            .append(case.id(), actor, "Task's Notes modified")
            .await?;
        Ok(affected)
    }

    /// Deletes a note, leaving a gap in the order sequence.
    pub async fn delete_note(
        &self,
        task_id: TaskId,
        note_id: NoteId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;

        if !task.remove_note(note_id) {
            return Err(LifecycleError::NoteNotFound(note_id));
        }
        task.touch(&*self.clock);
        self.repository.update_task(&task).await?;
        self.history
            .append(case.id(), actor, "Task's Note deleted")
            .await?;
        Ok(())
    }

    /// Stores file bytes with the storage collaborator and records the
    /// attachment on the task.
    pub async fn attach_file(
        &self,
        task_id: TaskId,
        name: &str,
        bytes: &[u8],
        actor: &User,
    ) -> LifecycleResult<FileId> {
        let mut task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;

        let handle = self
            .files
            .store(name, bytes)
            .await
            .map_err(|err| LifecycleError::External(err.to_string()))?;
        let file_id = task.attach_file(name.to_owned(), handle);
        task.touch(&*self.clock);
        self.repository.update_task(&task).await?;
        self.history
            .append(case.id(), actor, &format!("File {name} added"))
            .await?;
        Ok(file_id)
    }

    /// Retrieves an attached file's bytes.
    pub async fn open_file(&self, task_id: TaskId, file_id: FileId) -> LifecycleResult<Vec<u8>> {
        let task = self.require_task(task_id).await?;
        let record = task
            .file(file_id)
            .ok_or(LifecycleError::FileNotFound(file_id))?;
        self.files
            .retrieve(record.handle())
            .await
            .map_err(|err| LifecycleError::External(err.to_string()))
    }

    /// Removes an attachment record and deletes the stored bytes.
    pub async fn detach_file(
        &self,
        task_id: TaskId,
        file_id: FileId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        ensure_member(&case, actor)?;

        let record = task
            .detach_file(file_id)
            .ok_or(LifecycleError::FileNotFound(file_id))?;
        self.files
            .delete(record.handle())
            .await
            .map_err(|err| LifecycleError::External(err.to_string()))?;
        task.touch(&*self.clock);
        self.repository.update_task(&task).await?;
        self.history
            .append(
                case.id(),
                actor,
                &format!("File {} deleted", record.name()),
            )
            .await?;
        Ok(())
    }

    /// Deletes stored bytes on behalf of the case deletion path, which
    /// removes task rows wholesale without per-task audit events.
    pub(crate) async fn delete_stored_file(
        &self,
        handle: &FileHandle,
    ) -> Result<(), FileStoreError> {
        self.files.delete(handle).await
    }

    /// Pings a user about a task. Dispatch is fire-and-forget.
    pub async fn notify_assignee(&self, task_id: TaskId, user_id: UserId) -> LifecycleResult<()> {
        let task = self.require_task(task_id).await?;
        let case = self.require_case(task.case()).await?;
        swallow_notify(
            self.notifier
                .notify_user(
                    &format!(
                        "Notify for task '{}' of case '{}'",
                        task.title(),
                        case.title()
                    ),
                    case.id(),
                    user_id,
                    "fa-solid fa-bell",
                )
                .await,
        );
        Ok(())
    }
}

impl<R, C> std::fmt::Debug for TaskLifecycleService<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLifecycleService").finish_non_exhaustive()
    }
}
