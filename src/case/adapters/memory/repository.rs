//! In-memory repository adapter.
//!
//! Backs the lifecycle engines in tests and demos. Reference data (orgs,
//! users, association vocabularies, connector entitlements) is seeded up
//! front; the engines never create it.

use crate::case::domain::{
    AssociationKind, AssociationRecord, Case, CaseId, CaseTemplate, CaseTemplateId, Org, OrgId,
    Task, TaskId, TaskTemplate, TaskTemplateId, User, UserId,
};
use crate::case::ports::{
    CaseFilter, CaseRepository, CaseSort, Page, PageOf, RepositoryError, RepositoryResult,
    UserInstance,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct State {
    cases: HashMap<CaseId, Case>,
    tasks: HashMap<TaskId, Task>,
    orgs: HashMap<OrgId, Org>,
    users: HashMap<UserId, User>,
    vocabularies: HashMap<AssociationKind, BTreeMap<String, AssociationRecord>>,
    entitlements: HashMap<(UserId, String), UserInstance>,
    case_templates: HashMap<CaseTemplateId, CaseTemplate>,
    task_templates: HashMap<TaskTemplateId, TaskTemplate>,
}

/// Thread-safe in-memory [`CaseRepository`].
#[derive(Clone, Default)]
pub struct InMemoryCaseRepository {
    state: Arc<RwLock<State>>,
}

fn poisoned() -> RepositoryError {
    RepositoryError::persistence(std::io::Error::other("repository lock poisoned"))
}

impl InMemoryCaseRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an organisation.
    pub fn seed_org(&self, org: Org) {
        if let Ok(mut state) = self.state.write() {
            state.orgs.insert(org.id(), org);
        }
    }

    /// Seeds a user.
    pub fn seed_user(&self, user: User) {
        if let Ok(mut state) = self.state.write() {
            state.users.insert(user.id(), user);
        }
    }

    /// Seeds a canonical association name under `kind`.
    pub fn seed_key(&self, kind: AssociationKind, name: impl Into<String>) {
        let name = name.into();
        if let Ok(mut state) = self.state.write() {
            state.vocabularies.entry(kind).or_default().insert(
                name.clone(),
                AssociationRecord {
                    id: uuid::Uuid::new_v4(),
                    name,
                },
            );
        }
    }

    /// Seeds a user's credential for a connector instance.
    pub fn seed_entitlement(&self, user: UserId, instance: impl Into<String>, api_key: &str) {
        if let Ok(mut state) = self.state.write() {
            state.entitlements.insert(
                (user, instance.into()),
                UserInstance {
                    api_key: api_key.to_owned(),
                },
            );
        }
    }

    /// Returns the number of stored cases.
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.state.read().map(|state| state.cases.len()).unwrap_or(0)
    }

    /// Returns the number of stored tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.state.read().map(|state| state.tasks.len()).unwrap_or(0)
    }

    /// Returns the number of stored task templates.
    #[must_use]
    pub fn task_template_count(&self) -> usize {
        self.state
            .read()
            .map(|state| state.task_templates.len())
            .unwrap_or(0)
    }
}

fn matches(case: &Case, filter: &CaseFilter) -> bool {
    if case.completed() != filter.completed {
        return false;
    }
    if !filter.tags.is_empty()
        && !filter
            .tags
            .iter()
            .any(|tag| case.associations().tags().contains(tag))
    {
        return false;
    }
    if !filter.clusters.is_empty()
        && !filter
            .clusters
            .iter()
            .any(|cluster| case.associations().clusters().contains(cluster))
    {
        return false;
    }
    true
}

fn order(cases: &mut Vec<Case>, sort: Option<CaseSort>) {
    match sort {
        None | Some(CaseSort::CreationDate) => {
            cases.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        }
        Some(CaseSort::LastModified) => {
            cases.sort_by(|a, b| b.last_modified().cmp(&a.last_modified()));
        }
        Some(CaseSort::Deadline) => {
            cases.retain(|case| case.deadline().is_some());
            cases.sort_by_key(Case::deadline);
        }
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn insert_case(&self, case: &Case) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if state.cases.contains_key(&case.id()) {
            return Err(RepositoryError::DuplicateCase(case.id()));
        }
        state.cases.insert(case.id(), case.clone());
        Ok(())
    }

    async fn update_case(&self, case: &Case) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if !state.cases.contains_key(&case.id()) {
            return Err(RepositoryError::MissingCase(case.id()));
        }
        state.cases.insert(case.id(), case.clone());
        Ok(())
    }

    async fn fetch_case(&self, id: CaseId) -> RepositoryResult<Option<Case>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.cases.get(&id).cloned())
    }

    async fn fetch_case_by_title(&self, title: &str) -> RepositoryResult<Option<Case>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .cases
            .values()
            .find(|case| case.title() == title)
            .cloned())
    }

    async fn delete_case(&self, id: CaseId) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.cases.remove(&id);
        Ok(())
    }

    async fn search_cases(
        &self,
        filter: &CaseFilter,
        page: Page,
    ) -> RepositoryResult<PageOf<Case>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut found: Vec<Case> = state
            .cases
            .values()
            .filter(|case| matches(case, filter))
            .cloned()
            .collect();
        drop(state);
        order(&mut found, filter.sort);

        let total = found.len();
        let pages = total.div_ceil(page.size()).max(1);
        let items = found
            .into_iter()
            .skip(page.number().saturating_sub(1).saturating_mul(page.size()))
            .take(page.size())
            .collect();
        Ok(PageOf {
            items,
            page,
            pages,
            total,
        })
    }

    async fn insert_task(&self, task: &Task) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if state.tasks.contains_key(&task.id()) {
            return Err(RepositoryError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if !state.tasks.contains_key(&task.id()) {
            return Err(RepositoryError::MissingTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn fetch_task(&self, id: TaskId) -> RepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn delete_task(&self, id: TaskId) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.tasks.remove(&id);
        Ok(())
    }

    async fn list_tasks(&self, case: CaseId) -> RepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.case() == case)
            .cloned()
            .collect();
        tasks.sort_by_key(Task::case_order);
        Ok(tasks)
    }

    async fn fetch_org(&self, id: OrgId) -> RepositoryResult<Option<Org>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.orgs.get(&id).cloned())
    }

    async fn fetch_user(&self, id: UserId) -> RepositoryResult<Option<User>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.users.get(&id).cloned())
    }

    async fn list_org_users(&self, org: OrgId) -> RepositoryResult<Vec<User>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut members: Vec<User> = state
            .users
            .values()
            .filter(|user| user.org_id() == org)
            .cloned()
            .collect();
        members.sort_by_key(User::id);
        Ok(members)
    }

    async fn resolve_key(
        &self,
        kind: AssociationKind,
        name: &str,
    ) -> RepositoryResult<Option<AssociationRecord>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .vocabularies
            .get(&kind)
            .and_then(|records| records.get(name))
            .cloned())
    }

    async fn user_instance(
        &self,
        user: UserId,
        instance: &str,
    ) -> RepositoryResult<Option<UserInstance>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.entitlements.get(&(user, instance.to_owned())).cloned())
    }

    async fn insert_case_template(&self, template: &CaseTemplate) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.case_templates.insert(template.id(), template.clone());
        Ok(())
    }

    async fn fetch_case_template(
        &self,
        id: CaseTemplateId,
    ) -> RepositoryResult<Option<CaseTemplate>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.case_templates.get(&id).cloned())
    }

    async fn fetch_case_template_by_title(
        &self,
        title: &str,
    ) -> RepositoryResult<Option<CaseTemplate>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .case_templates
            .values()
            .find(|template| template.title() == title)
            .cloned())
    }

    async fn insert_task_template(&self, template: &TaskTemplate) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.task_templates.insert(template.id(), template.clone());
        Ok(())
    }

    async fn fetch_task_template(
        &self,
        id: TaskTemplateId,
    ) -> RepositoryResult<Option<TaskTemplate>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.task_templates.get(&id).cloned())
    }

    async fn fetch_task_template_by_title(
        &self,
        title: &str,
    ) -> RepositoryResult<Option<TaskTemplate>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .task_templates
            .values()
            .find(|template| template.title() == title)
            .cloned())
    }
}

impl std::fmt::Debug for InMemoryCaseRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCaseRepository").finish_non_exhaustive()
    }
}
