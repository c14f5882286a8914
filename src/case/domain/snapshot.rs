//! Read-only case and task projections.
//!
//! These are the stable cross-boundary JSON shapes handed to presentation
//! layers and to module collaborators. Status ids are resolved to their
//! display names here so consumers never see raw vocabulary indices.

use super::{
    Case, CaseId, OrgId, StatusVocabulary, Task, TaskId, UserId,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Fallback used when a stored status id has left the vocabulary.
const UNKNOWN_STATUS: &str = "Unknown";

/// Projection of a task for module payloads and presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    /// Task identifier.
    pub id: TaskId,
    /// Owning case identifier.
    pub case_id: CaseId,
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Reference URL.
    pub url: Option<String>,
    /// Deadline, if any.
    pub deadline: Option<NaiveDateTime>,
    /// Resolved status name.
    pub status: String,
    /// Completion flag.
    pub completed: bool,
    /// Order within the owning case.
    pub case_order_id: u32,
    /// Assigned users.
    pub assignees: Vec<UserId>,
    /// Note bodies in storage order.
    pub notes: Vec<String>,
    /// Attached tag names.
    pub tags: Vec<String>,
    /// Attached cluster names.
    pub clusters: Vec<String>,
    /// Attached custom-tag names.
    pub custom_tags: Vec<String>,
    /// Attached connector instances with their identifiers.
    pub connectors: BTreeMap<String, Option<String>>,
}

impl TaskSnapshot {
    /// Projects a task, resolving its status against `statuses`.
    #[must_use]
    pub fn project(task: &Task, statuses: &StatusVocabulary) -> Self {
        Self {
            id: task.id(),
            case_id: task.case(),
            title: task.title().to_owned(),
            description: task.description().to_owned(),
            url: task.url().map(str::to_owned),
            deadline: task.deadline(),
            status: statuses
                .name_of(task.status())
                .unwrap_or(UNKNOWN_STATUS)
                .to_owned(),
            completed: task.completed(),
            case_order_id: task.case_order(),
            assignees: task.assignees().iter().copied().collect(),
            notes: task
                .notes()
                .iter()
                .map(|note| note.content().to_owned())
                .collect(),
            tags: task.associations().tags().iter().cloned().collect(),
            clusters: task.associations().clusters().iter().cloned().collect(),
            custom_tags: task.associations().custom_tags().iter().cloned().collect(),
            connectors: task.associations().connectors().clone(),
        }
    }
}

/// Projection of a case, its tasks included, for module payloads and
/// presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSnapshot {
    /// Case identifier (doubles as the immutable external identifier).
    pub id: CaseId,
    /// Case title.
    pub title: String,
    /// Case description.
    pub description: String,
    /// Creation timestamp.
    pub creation_date: DateTime<Utc>,
    /// Last-modification timestamp.
    pub last_modif: DateTime<Utc>,
    /// Deadline, if any.
    pub deadline: Option<NaiveDateTime>,
    /// Resolved status name.
    pub status: String,
    /// Completion flag.
    pub completed: bool,
    /// Owning organisation id.
    pub owner_org_id: OrgId,
    /// Owning organisation name.
    pub org_name: String,
    /// Recurrence kind label, if any.
    pub recurring_type: Option<String>,
    /// Recurrence anchor date, if any.
    pub recurring_date: Option<NaiveDate>,
    /// Collaborative-pad URL, if configured.
    pub hedgedoc_url: Option<String>,
    /// Case-level free-text notes.
    pub notes: String,
    /// Participant org ids, owner first.
    pub orgs: Vec<OrgId>,
    /// Attached tag names.
    pub tags: Vec<String>,
    /// Attached cluster names.
    pub clusters: Vec<String>,
    /// Attached custom-tag names.
    pub custom_tags: Vec<String>,
    /// Attached connector instances with their identifiers.
    pub connectors: BTreeMap<String, Option<String>>,
    /// Projected child tasks, ordered by case order.
    pub tasks: Vec<TaskSnapshot>,
}

impl CaseSnapshot {
    /// Projects a case and its tasks.
    #[must_use]
    pub fn project(
        case: &Case,
        tasks: &[Task],
        org_name: &str,
        statuses: &StatusVocabulary,
    ) -> Self {
        Self {
            id: case.id(),
            title: case.title().to_owned(),
            description: case.description().to_owned(),
            creation_date: case.created_at(),
            last_modif: case.last_modified(),
            deadline: case.deadline(),
            status: statuses
                .name_of(case.status())
                .unwrap_or(UNKNOWN_STATUS)
                .to_owned(),
            completed: case.completed(),
            owner_org_id: case.owner_org(),
            org_name: org_name.to_owned(),
            recurring_type: case
                .recurring()
                .map(|recurrence| recurrence.kind.as_str().to_owned()),
            recurring_date: case.recurring().map(|recurrence| recurrence.anchor),
            hedgedoc_url: case.pad_url().map(str::to_owned),
            notes: case.notes().to_owned(),
            orgs: case.orgs().to_vec(),
            tags: case.associations().tags().iter().cloned().collect(),
            clusters: case.associations().clusters().iter().cloned().collect(),
            custom_tags: case.associations().custom_tags().iter().cloned().collect(),
            connectors: case.associations().connectors().clone(),
            tasks: tasks
                .iter()
                .map(|task| TaskSnapshot::project(task, statuses))
                .collect(),
        }
    }
}
