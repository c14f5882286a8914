//! Template engine: snapshot a case into a reusable template and
//! materialise templates back into live cases.

use super::{LifecycleError, LifecycleResult, ensure_member};
use crate::case::domain::{
    Case, CaseId, CaseTemplate, CaseTemplateId, StatusVocabulary, Task, TaskTemplateId,
    TaskTemplate, TemplateNote, TemplateTaskLink, User,
};
use crate::case::ports::CaseRepository;
use crate::history::HistoryRecorder;
use mockable::Clock;
use std::sync::Arc;

/// Case/task template engine.
pub struct TemplateEngine<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    history: Arc<dyn HistoryRecorder>,
    statuses: StatusVocabulary,
}

impl<R, C> Clone for TemplateEngine<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
            history: Arc::clone(&self.history),
            statuses: self.statuses.clone(),
        }
    }
}

impl<R, C> TemplateEngine<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    /// Creates a template engine.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        history: Arc<dyn HistoryRecorder>,
        statuses: StatusVocabulary,
    ) -> Self {
        Self {
            repository,
            clock,
            history,
            statuses,
        }
    }

    /// Snapshots a case into a new case template under `title`.
    ///
    /// Task templates are deduplicated by their globally unique title: a
    /// task whose title already names a template reuses that template
    /// (with the task's own order preserved in the link) instead of
    /// creating a near-duplicate.
    ///
    /// # Errors
    ///
    /// Fails when the case is missing, the actor is not a participant, or
    /// the template title is already in use.
    pub async fn create_from_case(
        &self,
        case_id: CaseId,
        title: String,
        actor: &User,
    ) -> LifecycleResult<CaseTemplate> {
        let case = self
            .repository
            .fetch_case(case_id)
            .await?
            .ok_or(LifecycleError::CaseNotFound(case_id))?;
        ensure_member(&case, actor)?;
        if self
            .repository
            .fetch_case_template_by_title(&title)
            .await?
            .is_some()
        {
            return Err(LifecycleError::TitleTaken(title));
        }

        let mut links = Vec::new();
        for task in self.repository.list_tasks(case_id).await? {
            let task_template = match self
                .repository
                .fetch_task_template_by_title(task.title())
                .await?
            {
                Some(existing) => existing.id(),
                None => {
                    let template = snapshot_task(&task, self.clock.utc());
                    self.repository.insert_task_template(&template).await?;
                    template.id()
                }
            };
            links.push(TemplateTaskLink {
                task_template,
                case_order: task.case_order(),
            });
        }

        let template = CaseTemplate::new(
            title,
            case.description().to_owned(),
            case.associations().clone(),
            links,
            self.clock.utc(),
        );
        self.repository.insert_case_template(&template).await?;
        self.history
            .append(
                case_id,
                actor,
                &format!("Template created, {} - {}", template.id(), template.title()),
            )
            .await?;
        Ok(template)
    }

    /// Materialises a case template into a live case titled `title`, owned
    /// by the actor's org, with every linked task template instantiated at
    /// its preserved order.
    ///
    /// # Errors
    ///
    /// Fails when the template is missing, the case title is already in
    /// use, or a linked task template has disappeared.
    pub async fn materialize(
        &self,
        template_id: CaseTemplateId,
        title: &str,
        actor: &User,
    ) -> LifecycleResult<Case> {
        let template = self
            .repository
            .fetch_case_template(template_id)
            .await?
            .ok_or(LifecycleError::CaseTemplateNotFound(template_id))?;
        if self.repository.fetch_case_by_title(title).await?.is_some() {
            return Err(LifecycleError::TitleTaken(title.to_owned()));
        }

        let mut case = Case::new(
            title,
            template.description().to_owned(),
            None,
            actor.org_id(),
            self.statuses.created(),
            &*self.clock,
        )?;
        *case.associations_mut() = template.associations().clone();
        self.repository.insert_case(&case).await?;

        if let Err(err) = self.populate(&case, &template, actor).await {
            self.discard_partial_case(case.id()).await;
            return Err(err);
        }
        Ok(case)
    }

    /// Instantiates a template's linked tasks onto a freshly inserted case
    /// and records the creation event.
    async fn populate(
        &self,
        case: &Case,
        template: &CaseTemplate,
        actor: &User,
    ) -> LifecycleResult<()> {
        for link in template.tasks() {
            let task = self
                .instantiate_task(case.id(), link.task_template, link.case_order)
                .await?;
            self.repository.insert_task(&task).await?;
        }
        self.history.append(case.id(), actor, "Case Created").await?;
        Ok(())
    }

    /// Best-effort removal of a partially materialised case so a failed
    /// instantiation leaves no partial state behind.
    async fn discard_partial_case(&self, case_id: CaseId) {
        match self.repository.list_tasks(case_id).await {
            Ok(tasks) => {
                for task in tasks {
                    if let Err(err) = self.repository.delete_task(task.id()).await {
                        tracing::warn!(case = %case_id, %err, "rollback task delete failed");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(case = %case_id, %err, "rollback task listing failed");
            }
        }
        if let Err(err) = self.repository.delete_case(case_id).await {
            tracing::warn!(case = %case_id, %err, "rollback case delete failed");
        }
        if let Err(err) = self.history.purge(case_id).await {
            tracing::warn!(case = %case_id, %err, "rollback history purge failed");
        }
    }

    /// Builds a live task from a task template at the given order index.
    /// The caller persists the result.
    pub(crate) async fn instantiate_task(
        &self,
        case: CaseId,
        template_id: TaskTemplateId,
        case_order: u32,
    ) -> LifecycleResult<Task> {
        let template = self
            .repository
            .fetch_task_template(template_id)
            .await?
            .ok_or(LifecycleError::TaskTemplateNotFound(template_id))?;
        let mut task = Task::new(
            case,
            template.title(),
            template.description().to_owned(),
            template.url().map(str::to_owned),
            None,
            self.statuses.created(),
            case_order,
            &*self.clock,
        )?;
        for note in template.notes() {
            let _id = task.append_note(note.content().to_owned());
        }
        *task.associations_mut() = template.associations().clone();
        Ok(task)
    }
}

/// Snapshots a task's structure, re-indexing its notes densely from one so
/// gaps left by deleted notes do not leak into the template.
fn snapshot_task(task: &Task, now: chrono::DateTime<chrono::Utc>) -> TaskTemplate {
    let notes = task
        .notes()
        .iter()
        .enumerate()
        .map(|(idx, note)| {
            TemplateNote::new(
                u32::try_from(idx).map_or(u32::MAX, |value| value.saturating_add(1)),
                note.content().to_owned(),
            )
        })
        .collect();
    TaskTemplate::new(
        task.title().to_owned(),
        task.description().to_owned(),
        task.url().map(str::to_owned),
        notes,
        task.associations().clone(),
        now,
    )
}

impl<R, C> std::fmt::Debug for TemplateEngine<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}
