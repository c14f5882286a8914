//! Case lifecycle engine: case CRUD, completion cascade, participant
//! orgs, recurrence, links, forking, and the collaborative-pad surface.

use super::{
    AssociationReconciler, LifecycleError, LifecycleResult, ModuleRunner, TaskLifecycleService,
    TemplateEngine, ensure_member, next_order, swallow_notify,
};
use crate::case::domain::{
    AssociationKind, Case, CaseDraft, CaseId, CaseUpdate, OrgId, Recurrence, RecurringChange,
    StatusId, StatusVocabulary, TaskDraft, TaskTemplateId, User, UserId, combine_deadline,
};
use crate::case::ports::{
    CaseFilter, CaseRepository, FileStore, ModuleRegistry, Notifier, PadClient, PadError, Page,
    PageOf,
};
use crate::history::{HistoryEntry, HistoryRecorder};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Outcome of fetching a case's collaborative-pad document. Pad failures
/// degrade to a variant instead of failing the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadNotes {
    /// The pad document body (empty when no pad is configured).
    Content(String),
    /// A pad is configured but the document is gone.
    NotFound,
    /// The pad could not be reached.
    Unreachable,
}

/// Case lifecycle orchestration service. Owns the task, template, and
/// module engines operating on the same collaborators.
pub struct CaseLifecycleService<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    notifier: Arc<dyn Notifier>,
    history: Arc<dyn HistoryRecorder>,
    pad: Arc<dyn PadClient>,
    statuses: StatusVocabulary,
    reconciler: AssociationReconciler<R>,
    tasks: TaskLifecycleService<R, C>,
    templates: TemplateEngine<R, C>,
    modules: ModuleRunner<R>,
}

impl<R, C> CaseLifecycleService<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    /// Wires the lifecycle engines over a shared set of collaborators.
    #[must_use]
    #[expect(clippy::too_many_arguments, reason = "composition root")]
    pub fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        notifier: Arc<dyn Notifier>,
        history: Arc<dyn HistoryRecorder>,
        files: Arc<dyn FileStore>,
        pad: Arc<dyn PadClient>,
        registry: ModuleRegistry,
        statuses: StatusVocabulary,
    ) -> Self {
        let tasks = TaskLifecycleService::new(
            Arc::clone(&repository),
            Arc::clone(&clock),
            Arc::clone(&notifier),
            Arc::clone(&history),
            files,
            statuses.clone(),
        );
        let templates = TemplateEngine::new(
            Arc::clone(&repository),
            Arc::clone(&clock),
            Arc::clone(&history),
            statuses.clone(),
        );
        let modules = ModuleRunner::new(
            Arc::clone(&repository),
            Arc::clone(&history),
            registry,
            statuses.clone(),
        );
        Self {
            reconciler: AssociationReconciler::new(Arc::clone(&repository)),
            repository,
            clock,
            notifier,
            history,
            pad,
            statuses,
            tasks,
            templates,
            modules,
        }
    }

    /// Returns the task lifecycle engine.
    #[must_use]
    pub const fn tasks(&self) -> &TaskLifecycleService<R, C> {
        &self.tasks
    }

    /// Returns the template engine.
    #[must_use]
    pub const fn templates(&self) -> &TemplateEngine<R, C> {
        &self.templates
    }

    /// Returns the connector-module runner.
    #[must_use]
    pub const fn modules(&self) -> &ModuleRunner<R> {
        &self.modules
    }

    /// Returns the configured status vocabulary.
    #[must_use]
    pub const fn statuses(&self) -> &StatusVocabulary {
        &self.statuses
    }

    async fn require_case(&self, id: CaseId) -> LifecycleResult<Case> {
        self.repository
            .fetch_case(id)
            .await?
            .ok_or(LifecycleError::CaseNotFound(id))
    }

    async fn ensure_title_free(&self, title: &str) -> LifecycleResult<()> {
        if self.repository.fetch_case_by_title(title).await?.is_some() {
            return Err(LifecycleError::TitleTaken(title.to_owned()));
        }
        Ok(())
    }

    /// Creates a case owned by the actor's org.
    ///
    /// When the draft selects a template, materialisation replaces the
    /// from-scratch path entirely; otherwise the case is built from the
    /// draft's fields and any listed task templates are instantiated in
    /// declaration order.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate title, an unresolvable association name, a
    /// missing template, or persistence failure.
    pub async fn create_case(&self, draft: CaseDraft, actor: &User) -> LifecycleResult<Case> {
        if let Some(selection) = draft.template {
            return self
                .templates
                .materialize(selection.template, &selection.title, actor)
                .await;
        }

        self.ensure_title_free(&draft.title).await?;
        let mut case = Case::new(
            &draft.title,
            draft.description,
            combine_deadline(draft.deadline_date, draft.deadline_time),
            actor.org_id(),
            self.statuses.created(),
            &*self.clock,
        )?;
        let _report = self
            .reconciler
            .reconcile(case.associations_mut(), &draft.associations)
            .await?;
        self.repository.insert_case(&case).await?;

        if let Err(err) = self
            .finish_create(case.id(), &draft.task_templates, actor)
            .await
        {
            self.discard_partial_case(case.id()).await;
            return Err(err);
        }
        Ok(case)
    }

    /// Completes a freshly inserted case: instantiates the draft's task
    /// templates and records the creation event.
    async fn finish_create(
        &self,
        case_id: CaseId,
        task_templates: &[TaskTemplateId],
        actor: &User,
    ) -> LifecycleResult<()> {
        for (idx, template_id) in task_templates.iter().enumerate() {
            let task = self
                .templates
                .instantiate_task(case_id, *template_id, next_order(idx))
                .await?;
            self.repository.insert_task(&task).await?;
        }
        self.history.append(case_id, actor, "Case Created").await?;
        Ok(())
    }

    /// Best-effort removal of a partially created case. The repository has
    /// no transaction demarcation, so the creation paths compensate on
    /// failure to leave no partial state behind.
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

    /// Edits a case's scalar fields and reconciles its associations.
    ///
    /// Every connector instance in the requested set requires the actor
    /// to hold a credential for it, already attached or not; that gate
    /// runs before anything mutates.
    pub async fn edit_case(
        &self,
        update: CaseUpdate,
        case_id: CaseId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;

        for name in &update.associations.connectors {
            if self
                .repository
                .resolve_key(AssociationKind::Connector, name)
                .await?
                .is_none()
            {
                return Err(LifecycleError::UnknownName {
                    kind: AssociationKind::Connector,
                    name: name.clone(),
                });
            }
            if self
                .repository
                .user_instance(actor.id(), name)
                .await?
                .is_none()
            {
                return Err(LifecycleError::ConnectorNotEntitled {
                    user: actor.id(),
                    instance: name.clone(),
                });
            }
        }

        let new_title = update.title.trim();
        if new_title != case.title() {
            self.ensure_title_free(new_title).await?;
        }
        case.apply_edit(
            &update.title,
            update.description,
            combine_deadline(update.deadline_date, update.deadline_time),
        )?;
        let _report = self
            .reconciler
            .reconcile(case.associations_mut(), &update.associations)
            .await?;
        case.touch(&*self.clock);
        self.repository.update_case(&case).await?;
        self.history.append(case_id, actor, "Case edited").await?;
        Ok(())
    }

    /// Toggles a case's completion and returns the new completed flag.
    ///
    /// Completing cascades to every not-yet-completed task, then marks the
    /// case `Finished`; re-toggling revives the case as `Created` but
    /// leaves the tasks completed.
    pub async fn complete_case(&self, case_id: CaseId, actor: &User) -> LifecycleResult<bool> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;

        if case.completed() {
            case.set_completion(false, self.statuses.created());
            case.touch(&*self.clock);
            self.repository.update_case(&case).await?;
            self.history.append(case_id, actor, "Case revived").await?;
            swallow_notify(
                self.notifier
                    .notify_case_orgs(
                        &format!("The case '{}' is now revived", case.title()),
                        case_id,
                        "fa-solid fa-heart-circle-plus",
                    )
                    .await,
            );
        } else {
            self.tasks.cascade_complete(case_id, actor).await?;
            case.set_completion(true, self.statuses.finished());
            case.touch(&*self.clock);
            self.repository.update_case(&case).await?;
            self.history.append(case_id, actor, "Case completed").await?;
            swallow_notify(
                self.notifier
                    .notify_case_orgs(
                        &format!("The case '{}' is now completed", case.title()),
                        case_id,
                        "fa-solid fa-square-check",
                    )
                    .await,
            );
        }
        Ok(case.completed())
    }

    /// Deletes a case: every task (stored file bytes included), the case
    /// row, and finally the audit log.
    pub async fn delete_case(&self, case_id: CaseId, actor: &User) -> LifecycleResult<()> {
        let case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;

        for task in self.repository.list_tasks(case_id).await? {
            for file in task.files() {
                self.tasks
                    .delete_stored_file(file.handle())
                    .await
                    .map_err(|err| LifecycleError::External(err.to_string()))?;
            }
            self.repository.delete_task(task.id()).await?;
        }

        swallow_notify(
            self.notifier
                .notify_case_orgs(
                    &format!("The case '{}' was deleted", case.title()),
                    case_id,
                    "fa-solid fa-trash",
                )
                .await,
        );
        self.repository.delete_case(case_id).await?;
        // Purged last; the log outlives the rows until here.
        self.history.purge(case_id).await?;
        Ok(())
    }

    /// Assigns a status from the configured vocabulary.
    pub async fn change_status(
        &self,
        status: StatusId,
        case_id: CaseId,
        actor: &User,
    ) -> LifecycleResult<()> {
        if !self.statuses.contains(status) {
            return Err(LifecycleError::UnknownStatus(status));
        }
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;

        case.set_status(status);
        case.touch(&*self.clock);
        self.repository.update_case(&case).await?;
        self.history
            .append(case_id, actor, "Case Status changed")
            .await?;
        Ok(())
    }

    /// Adds participant orgs to a case. Every org is validated before any
    /// is added; orgs already participating are skipped silently. When the
    /// case is recurring, members of a newly added org are opted in to
    /// recurrence reminders.
    pub async fn add_orgs(
        &self,
        case_id: CaseId,
        orgs: &[OrgId],
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;
        for org in orgs {
            if self.repository.fetch_org(*org).await?.is_none() {
                return Err(LifecycleError::OrgNotFound(*org));
            }
        }

        for org in orgs {
            if !case.add_org(*org) {
                continue;
            }
            if case.recurring().is_some() {
                for member in self.repository.list_org_users(*org).await? {
                    let _added = case.add_watcher(member.id());
                }
            }
            self.history
                .append(case_id, actor, &format!("Org {org} added"))
                .await?;
            swallow_notify(
                self.notifier
                    .notify_org(
                        &format!("Org added to case '{}'", case.title()),
                        case_id,
                        *org,
                        "fa-solid fa-sitemap",
                    )
                    .await,
            );
        }
        case.touch(&*self.clock);
        self.repository.update_case(&case).await?;
        Ok(())
    }

    /// Removes a participant org, stripping its members' task assignments
    /// and recurrence opt-ins across the case.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::OrgNotFound`] when the org does not
    /// participate in the case.
    pub async fn remove_org(
        &self,
        case_id: CaseId,
        org: OrgId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;
        if !case.remove_org(org) {
            return Err(LifecycleError::OrgNotFound(org));
        }

        let members: BTreeSet<UserId> = self
            .repository
            .list_org_users(org)
            .await?
            .into_iter()
            .map(|member| member.id())
            .collect();
        for mut task in self.repository.list_tasks(case_id).await? {
            let mut changed = false;
            for member in &members {
                changed |= task.unassign(*member);
            }
            if changed {
                self.repository.update_task(&task).await?;
            }
        }
        for member in &members {
            let _removed = case.remove_watcher(*member);
        }

        case.touch(&*self.clock);
        self.repository.update_case(&case).await?;
        self.history
            .append(case_id, actor, &format!("Org {org} removed"))
            .await?;
        swallow_notify(
            self.notifier
                .notify_org(
                    &format!("Org removed from case '{}'", case.title()),
                    case_id,
                    org,
                    "fa-solid fa-door-open",
                )
                .await,
        );
        Ok(())
    }

    /// Transfers ownership to another org. The new owner need not already
    /// participate in the case.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::OrgNotFound`] when the org does not
    /// exist.
    pub async fn change_owner(
        &self,
        case_id: CaseId,
        org: OrgId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;
        if self.repository.fetch_org(org).await?.is_none() {
            return Err(LifecycleError::OrgNotFound(org));
        }

        case.set_owner_org(org);
        case.touch(&*self.clock);
        self.repository.update_case(&case).await?;
        self.history
            .append(case_id, actor, &format!("Org {org} is now owner of this case"))
            .await?;
        swallow_notify(
            self.notifier
                .notify_org(
                    &format!("Org is now owner of case '{}'", case.title()),
                    case_id,
                    org,
                    "fa-solid fa-hand-holding-hand",
                )
                .await,
        );
        Ok(())
    }

    /// Installs, replaces, or removes a case's recurrence rule.
    ///
    /// Installing computes the next anchor date relative to today and
    /// moves the case to the `Recurring` status. Removing clears the rule
    /// and every reminder opt-in and moves the case back to `Created`.
    pub async fn change_recurring(
        &self,
        change: RecurringChange,
        case_id: CaseId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;

        match change {
            RecurringChange::Set(rule) => {
                let anchor = rule.anchor(self.clock.utc().date_naive())?;
                case.set_recurrence(Some(Recurrence {
                    kind: rule.kind(),
                    anchor,
                }));
                case.set_status(self.statuses.recurring());
            }
            RecurringChange::Remove => {
                case.set_recurrence(None);
                case.clear_watchers();
                case.set_status(self.statuses.created());
            }
        }
        self.repository.update_case(&case).await?;
        self.history
            .append(case_id, actor, "Recurring changed")
            .await?;
        Ok(())
    }

    /// Replaces the set of users opted in to recurrence reminders. Every
    /// requested watcher must belong to a participant org.
    pub async fn set_recurring_watchers(
        &self,
        case_id: CaseId,
        watchers: &BTreeSet<UserId>,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;

        for watcher in watchers {
            let user = self
                .repository
                .fetch_user(*watcher)
                .await?
                .ok_or(LifecycleError::UserNotFound(*watcher))?;
            if !case.has_org(user.org_id()) {
                return Err(LifecycleError::WatcherNotParticipant {
                    user: *watcher,
                    case: case_id,
                });
            }
        }

        case.clear_watchers();
        for watcher in watchers {
            let _added = case.add_watcher(*watcher);
        }
        self.repository.update_case(&case).await?;
        Ok(())
    }

    /// Links two cases symmetrically, recording the event on both logs.
    pub async fn link_cases(
        &self,
        case_id: CaseId,
        other_id: CaseId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        let mut other = self.require_case(other_id).await?;
        ensure_member(&case, actor)?;

        if !case.add_link(other_id) {
            return Ok(());
        }
        let _linked = other.add_link(case_id);
        self.repository.update_case(&case).await?;
        self.repository.update_case(&other).await?;
        self.history
            .append(
                case_id,
                actor,
                &format!("Link to case '{}' added", other.title()),
            )
            .await?;
        self.history
            .append(
                other_id,
                actor,
                &format!("Link to case '{}' added from the other case", case.title()),
            )
            .await?;
        Ok(())
    }

    /// Removes a symmetric case link.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::LinkNotFound`] when the cases are not
    /// linked.
    pub async fn unlink_cases(
        &self,
        case_id: CaseId,
        other_id: CaseId,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        let mut other = self.require_case(other_id).await?;
        ensure_member(&case, actor)?;

        if !case.remove_link(other_id) {
            return Err(LifecycleError::LinkNotFound {
                case: case_id,
                other: other_id,
            });
        }
        let _unlinked = other.remove_link(case_id);
        self.repository.update_case(&case).await?;
        self.repository.update_case(&other).await?;
        self.history
            .append(
                case_id,
                actor,
                &format!("Link to case '{}' removed", other.title()),
            )
            .await?;
        self.history
            .append(
                other_id,
                actor,
                &format!("Link to case '{}' removed from the other case", case.title()),
            )
            .await?;
        Ok(())
    }

    /// Replaces the case-level free-text notes.
    pub async fn update_notes(
        &self,
        case_id: CaseId,
        notes: String,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;

        case.set_notes(notes);
        case.touch(&*self.clock);
        self.repository.update_case(&case).await?;
        self.history
            .append(case_id, actor, "Case's Notes modified")
            .await?;
        Ok(())
    }

    /// Records the case's collaborative-pad URL, stripping editor
    /// suffixes a pasted URL commonly carries.
    pub async fn set_pad_url(
        &self,
        case_id: CaseId,
        url: &str,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self.require_case(case_id).await?;
        ensure_member(&case, actor)?;

        case.set_pad_url(url);
        case.touch(&*self.clock);
        self.repository.update_case(&case).await?;
        self.history
            .append(case_id, actor, "Hedgedoc url changed")
            .await?;
        Ok(())
    }

    /// Fetches the case's pad document. Pad failures degrade to a
    /// [`PadNotes`] variant; only a missing case is an error.
    pub async fn pad_notes(&self, case_id: CaseId) -> LifecycleResult<PadNotes> {
        let case = self.require_case(case_id).await?;
        let Some(url) = case.pad_url() else {
            return Ok(PadNotes::Content(String::new()));
        };
        match self.pad.download(url).await {
            Ok(body) => Ok(PadNotes::Content(body)),
            Err(PadError::NotFound) => {
                tracing::warn!(case = %case_id, "pad document not found");
                Ok(PadNotes::NotFound)
            }
            Err(PadError::Unreachable(reason)) => {
                tracing::warn!(case = %case_id, %reason, "pad unreachable");
                Ok(PadNotes::Unreachable)
            }
        }
    }

    /// Renders a Markdown digest of every task note in the case: a
    /// heading per task that has notes, each note under a rule.
    pub async fn task_notes_digest(&self, case_id: CaseId) -> LifecycleResult<String> {
        let _case = self.require_case(case_id).await?;
        let mut digest = String::new();
        for task in self.repository.list_tasks(case_id).await? {
            let notes: Vec<&str> = task
                .notes()
                .iter()
                .map(|note| note.content())
                .filter(|content| !content.is_empty())
                .collect();
            if notes.is_empty() {
                continue;
            }
            digest.push_str(&format!("# {}\n\n", task.title()));
            for note in notes {
                digest.push_str(&format!("---\n\n{note}\n\n"));
            }
        }
        Ok(digest)
    }

    /// Reads the case's audit log in append order.
    pub async fn history(&self, case_id: CaseId) -> LifecycleResult<Vec<HistoryEntry>> {
        let _case = self.require_case(case_id).await?;
        Ok(self.history.read_all(case_id).await?)
    }

    /// Filters and paginates cases.
    pub async fn search(&self, filter: &CaseFilter, page: Page) -> LifecycleResult<PageOf<Case>> {
        Ok(self.repository.search_cases(filter, page).await?)
    }

    /// Forks a case into a fresh one under `new_title`: description,
    /// deadline, associations (connector identifiers included), and every
    /// task are copied; completion state, links, recurrence, watchers,
    /// assignments, notes, and files are not.
    ///
    /// The title conflict is detected before any row is written.
    pub async fn fork_case(
        &self,
        case_id: CaseId,
        new_title: &str,
        actor: &User,
    ) -> LifecycleResult<Case> {
        let source = self.require_case(case_id).await?;
        ensure_member(&source, actor)?;
        self.ensure_title_free(new_title).await?;

        let draft = CaseDraft {
            title: new_title.to_owned(),
            description: source.description().to_owned(),
            deadline_date: source.deadline().map(|deadline| deadline.date()),
            deadline_time: source.deadline().map(|deadline| deadline.time()),
            associations: source.associations().to_selection(),
            task_templates: Vec::new(),
            template: None,
        };
        let fork = self.create_case(draft, actor).await?;
        if let Err(err) = self.finish_fork(case_id, &fork, actor).await {
            self.discard_partial_case(fork.id()).await;
            return Err(err);
        }
        self.require_case(fork.id()).await
    }

    /// Copies the source case's tasks onto the fork and records the fork
    /// event on the source log.
    async fn finish_fork(
        &self,
        source_id: CaseId,
        fork: &Case,
        actor: &User,
    ) -> LifecycleResult<()> {
        for task in self.repository.list_tasks(source_id).await? {
            let task_draft = TaskDraft {
                title: task.title().to_owned(),
                description: task.description().to_owned(),
                url: task.url().map(str::to_owned),
                deadline_date: task.deadline().map(|deadline| deadline.date()),
                deadline_time: task.deadline().map(|deadline| deadline.time()),
                associations: task.associations().to_selection(),
            };
            let _task = self.tasks.create_task(task_draft, fork.id(), actor).await?;
        }

        self.history
            .append(
                source_id,
                actor,
                &format!("Case forked, {} - {}", fork.id(), fork.title()),
            )
            .await?;
        Ok(())
    }
}

impl<R, C> std::fmt::Debug for CaseLifecycleService<R, C>
where
    R: CaseRepository,
    C: Clock + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseLifecycleService").finish_non_exhaustive()
    }
}
