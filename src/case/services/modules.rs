//! Connector-module runner: project a case and hand it to an external
//! module once per selected instance.

use super::{LifecycleError, LifecycleResult, ensure_member};
use crate::case::domain::{AssociationKind, CaseId, CaseSnapshot, StatusVocabulary, User};
use crate::case::ports::{CaseRepository, InstanceBinding, ModuleOutcome, ModuleRegistry};
use crate::history::HistoryRecorder;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs connector modules against cases.
pub struct ModuleRunner<R>
where
    R: CaseRepository,
{
    repository: Arc<R>,
    history: Arc<dyn HistoryRecorder>,
    registry: ModuleRegistry,
    statuses: StatusVocabulary,
}

impl<R> Clone for ModuleRunner<R>
where
    R: CaseRepository,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            history: Arc::clone(&self.history),
            registry: self.registry.clone(),
            statuses: self.statuses.clone(),
        }
    }
}

impl<R> ModuleRunner<R>
where
    R: CaseRepository,
{
    /// Creates a module runner over the given registry.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        history: Arc<dyn HistoryRecorder>,
        registry: ModuleRegistry,
        statuses: StatusVocabulary,
    ) -> Self {
        Self {
            repository,
            history,
            registry,
            statuses,
        }
    }

    /// Returns the configured registry.
    #[must_use]
    pub const fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Invokes `module_name` once per entry of `instances` (instance name
    /// to optional caller-supplied identifier), in instance-name order.
    ///
    /// Each successful invocation persists the reference the module
    /// returned as the instance's per-case identifier before the next
    /// instance runs. A structured module failure aborts the remaining
    /// instances but leaves the references already persisted standing; the
    /// audit event is appended only after every instance succeeded.
    ///
    /// # Errors
    ///
    /// Fails on unknown module or instance names, module transport
    /// failure, or a structured module error payload.
    pub async fn run(
        &self,
        case_id: CaseId,
        module_name: &str,
        instances: BTreeMap<String, Option<String>>,
        actor: &User,
    ) -> LifecycleResult<()> {
        let mut case = self
            .repository
            .fetch_case(case_id)
            .await?
            .ok_or(LifecycleError::CaseNotFound(case_id))?;
        ensure_member(&case, actor)?;
        let module = self
            .registry
            .get(module_name)
            .ok_or_else(|| LifecycleError::UnknownModule(module_name.to_owned()))?
            .clone();

        let org = self
            .repository
            .fetch_org(case.owner_org())
            .await?
            .ok_or(LifecycleError::OrgNotFound(case.owner_org()))?;
        let tasks = self.repository.list_tasks(case_id).await?;
        let snapshot = CaseSnapshot::project(&case, &tasks, org.name(), &self.statuses);

        for (name, supplied) in &instances {
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
            let api_key = self
                .repository
                .user_instance(actor.id(), name)
                .await?
                .map(|entitlement| entitlement.api_key);
            let stored = case
                .associations()
                .connector_identifier(name)
                .cloned()
                .flatten();
            let binding = InstanceBinding {
                name: name.clone(),
                identifier: supplied.clone().or(stored),
                api_key,
            };

            let outcome = module
                .invoke(&binding, &snapshot, actor)
                .await
                .map_err(|err| LifecycleError::External(err.to_string()))?;
            match outcome {
                ModuleOutcome::Failure(payload) => {
                    return Err(LifecycleError::ModuleFailure(payload));
                }
                ModuleOutcome::Reference(reference) => {
                    if case
                        .associations_mut()
                        .set_connector_identifier(name, reference)
                    {
                        self.repository.update_case(&case).await?;
                    }
                }
            }
        }

        let names: Vec<&str> = instances.keys().map(String::as_str).collect();
        self.history
            .append(
                case_id,
                actor,
                &format!(
                    "Module {module_name} used on instances: {}",
                    names.join(", ")
                ),
            )
            .await?;
        Ok(())
    }
}

impl<R> std::fmt::Debug for ModuleRunner<R>
where
    R: CaseRepository,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRunner")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
