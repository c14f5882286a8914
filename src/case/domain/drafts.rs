//! Input payloads for the lifecycle engines.

use super::{AssociationSelection, CaseTemplateId, TaskTemplateId};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Combines the (date, time) deadline pair a form submits.
///
/// An absent date means no deadline regardless of the time; an absent time
/// defaults to midnight.
#[must_use]
pub fn combine_deadline(date: Option<NaiveDate>, time: Option<NaiveTime>) -> Option<NaiveDateTime> {
    date.map(|day| day.and_time(time.unwrap_or(NaiveTime::MIN)))
}

/// Template selection carried by a case-creation request. When present the
/// from-scratch path is skipped entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSelection {
    /// Template to materialise.
    pub template: CaseTemplateId,
    /// Title for the materialised case.
    pub title: String,
}

/// Payload for creating a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDraft {
    /// Unique case title.
    pub title: String,
    /// Case description.
    pub description: String,
    /// Deadline date; absent means no deadline.
    pub deadline_date: Option<NaiveDate>,
    /// Deadline time; defaults to midnight when the date is set.
    pub deadline_time: Option<NaiveTime>,
    /// Associations to attach on creation.
    pub associations: AssociationSelection,
    /// Task templates to materialise into tasks, in declaration order.
    pub task_templates: Vec<TaskTemplateId>,
    /// When set, delegate to template materialisation instead of the
    /// from-scratch path.
    pub template: Option<TemplateSelection>,
}

/// Payload for editing a case's scalar fields and associations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseUpdate {
    /// New title.
    pub title: String,
    /// New description.
    pub description: String,
    /// New deadline date.
    pub deadline_date: Option<NaiveDate>,
    /// New deadline time.
    pub deadline_time: Option<NaiveTime>,
    /// Desired association target state.
    pub associations: AssociationSelection,
}

/// Payload for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Reference URL.
    pub url: Option<String>,
    /// Deadline date; absent means no deadline.
    pub deadline_date: Option<NaiveDate>,
    /// Deadline time; defaults to midnight when the date is set.
    pub deadline_time: Option<NaiveTime>,
    /// Associations to attach on creation.
    pub associations: AssociationSelection,
}

/// Payload for editing a task's scalar fields and associations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// New title.
    pub title: String,
    /// New description.
    pub description: String,
    /// New reference URL.
    pub url: Option<String>,
    /// New deadline date.
    pub deadline_date: Option<NaiveDate>,
    /// New deadline time.
    pub deadline_time: Option<NaiveTime>,
    /// Desired association target state.
    pub associations: AssociationSelection,
}
