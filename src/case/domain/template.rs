//! Reusable structural snapshots of cases and tasks.
//!
//! Templates strip instance-specific state (deadline, owner, status,
//! completion, assignments, files) and keep the structure: titles,
//! descriptions, notes, associations, and task ordering.

use super::{AssociationSet, CaseTemplateId, TaskTemplateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note carried by a task template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateNote {
    order: u32,
    #[serde(rename = "note")]
    content: String,
}

impl TemplateNote {
    /// Creates a template note at the given order index.
    #[must_use]
    pub const fn new(order: u32, content: String) -> Self {
        Self { order, content }
    }

    /// Returns the order index.
    #[must_use]
    pub const fn order(&self) -> u32 {
        self.order
    }

    /// Returns the note body.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A reusable task snapshot. Task-template titles are globally unique;
/// two cases sharing a task title converge on one template (intended
/// dedup behaviour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    id: TaskTemplateId,
    title: String,
    description: String,
    url: Option<String>,
    notes: Vec<TemplateNote>,
    associations: AssociationSet,
    #[serde(rename = "last_modif")]
    last_modified: DateTime<Utc>,
}

impl TaskTemplate {
    /// Creates a task template.
    #[must_use]
    pub fn new(
        title: String,
        description: String,
        url: Option<String>,
        notes: Vec<TemplateNote>,
        associations: AssociationSet,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskTemplateId::new(),
            title,
            description,
            url,
            notes,
            associations,
            last_modified,
        }
    }

    /// Returns the template identifier.
    #[must_use]
    pub const fn id(&self) -> TaskTemplateId {
        self.id
    }

    /// Returns the unique template title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the reference URL, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the template notes in order.
    #[must_use]
    pub fn notes(&self) -> &[TemplateNote] {
        &self.notes
    }

    /// Returns the snapshotted associations.
    #[must_use]
    pub const fn associations(&self) -> &AssociationSet {
        &self.associations
    }

    /// Returns the last-modification timestamp.
    #[must_use]
    pub const fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
}

/// An ordered reference from a case template to a task template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateTaskLink {
    /// Linked task template.
    pub task_template: TaskTemplateId,
    /// Order the task held in the source case, preserved so
    /// re-materialisation recreates the same ordering.
    pub case_order: u32,
}

/// A reusable case snapshot owning an ordered list of task-template links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTemplate {
    id: CaseTemplateId,
    title: String,
    description: String,
    associations: AssociationSet,
    tasks: Vec<TemplateTaskLink>,
    #[serde(rename = "last_modif")]
    last_modified: DateTime<Utc>,
}

impl CaseTemplate {
    /// Creates a case template.
    #[must_use]
    pub fn new(
        title: String,
        description: String,
        associations: AssociationSet,
        tasks: Vec<TemplateTaskLink>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CaseTemplateId::new(),
            title,
            description,
            associations,
            tasks,
            last_modified,
        }
    }

    /// Returns the template identifier.
    #[must_use]
    pub const fn id(&self) -> CaseTemplateId {
        self.id
    }

    /// Returns the unique template title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the snapshotted associations.
    #[must_use]
    pub const fn associations(&self) -> &AssociationSet {
        &self.associations
    }

    /// Returns the task links sorted by their preserved case order.
    #[must_use]
    pub fn tasks(&self) -> &[TemplateTaskLink] {
        &self.tasks
    }

    /// Returns the last-modification timestamp.
    #[must_use]
    pub const fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
}
