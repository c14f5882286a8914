//! Task aggregate and its owned satellites (notes, files, assignments).

use super::{
    AssociationSet, CaseDomainError, CaseId, FileId, NoteId, StatusId, TaskId, UserId,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An ordered note attached to a task.
///
/// Order indices are scoped to the task and only ever grow; deleting a note
/// leaves a gap rather than renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    id: NoteId,
    order: u32,
    #[serde(rename = "note")]
    content: String,
}

impl Note {
    /// Returns the note identifier.
    #[must_use]
    pub const fn id(&self) -> NoteId {
        self.id
    }

    /// Returns the order index within the owning task.
    #[must_use]
    pub const fn order(&self) -> u32 {
        self.order
    }

    /// Returns the note body (Markdown, rendered elsewhere).
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Opaque handle issued by the file-storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileHandle(String);

impl FileHandle {
    /// Wraps a storage handle.
    #[must_use]
    pub const fn new(handle: String) -> Self {
        Self(handle)
    }

    /// Returns the raw handle string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A file attached to a task. The bytes live with the file-storage
/// collaborator; the task owns only this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    id: FileId,
    name: String,
    handle: FileHandle,
}

impl FileRecord {
    /// Returns the file record identifier.
    #[must_use]
    pub const fn id(&self) -> FileId {
        self.id
    }

    /// Returns the original file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the storage handle.
    #[must_use]
    pub const fn handle(&self) -> &FileHandle {
        &self.handle
    }
}

/// Task aggregate: a unit of work inside exactly one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    #[serde(rename = "case_id")]
    case: CaseId,
    title: String,
    description: String,
    url: Option<String>,
    deadline: Option<NaiveDateTime>,
    #[serde(rename = "status_id")]
    status: StatusId,
    completed: bool,
    /// Status held before completion, restored when the completion toggle
    /// flips back.
    previous_status: Option<StatusId>,
    #[serde(rename = "case_order_id")]
    case_order: u32,
    #[serde(rename = "creation_date")]
    created_at: DateTime<Utc>,
    #[serde(rename = "last_modif")]
    last_modified: DateTime<Utc>,
    assignees: BTreeSet<UserId>,
    notes: Vec<Note>,
    #[serde(rename = "nb_notes")]
    note_counter: u32,
    files: Vec<FileRecord>,
    associations: AssociationSet,
}

impl Task {
    /// Creates a new task inside `case` at the given order position.
    ///
    /// # Errors
    ///
    /// Returns [`CaseDomainError::EmptyTitle`] when the trimmed title is
    /// empty.
    pub fn new(
        case: CaseId,
        title: &str,
        description: String,
        url: Option<String>,
        deadline: Option<NaiveDateTime>,
        initial_status: StatusId,
        case_order: u32,
        clock: &impl Clock,
    ) -> Result<Self, CaseDomainError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(CaseDomainError::EmptyTitle);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            case,
            title: trimmed.to_owned(),
            description,
            url,
            deadline,
            status: initial_status,
            completed: false,
            previous_status: None,
            case_order,
            created_at: timestamp,
            last_modified: timestamp,
            assignees: BTreeSet::new(),
            notes: Vec::new(),
            note_counter: 0,
            files: Vec::new(),
            associations: AssociationSet::new(),
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning case.
    #[must_use]
    pub const fn case(&self) -> CaseId {
        self.case
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the reference URL, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<NaiveDateTime> {
        self.deadline
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> StatusId {
        self.status
    }

    /// Returns whether the task is completed.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.completed
    }

    /// Returns the ordering index within the owning case.
    #[must_use]
    pub const fn case_order(&self) -> u32 {
        self.case_order
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last-modification timestamp.
    #[must_use]
    pub const fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Returns the assigned user ids.
    #[must_use]
    pub const fn assignees(&self) -> &BTreeSet<UserId> {
        &self.assignees
    }

    /// Returns the notes in storage order.
    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Returns the attached file records.
    #[must_use]
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Returns the attached associations.
    #[must_use]
    pub const fn associations(&self) -> &AssociationSet {
        &self.associations
    }

    /// Returns the associations for reconciliation.
    pub const fn associations_mut(&mut self) -> &mut AssociationSet {
        &mut self.associations
    }

    /// Updates the last-modification timestamp.
    pub fn touch(&mut self, clock: &impl Clock) {
        self.last_modified = clock.utc();
    }

    /// Applies the editable scalar fields.
    ///
    /// # Errors
    ///
    /// Returns [`CaseDomainError::EmptyTitle`] when the trimmed title is
    /// empty.
    pub fn apply_edit(
        &mut self,
        title: &str,
        description: String,
        url: Option<String>,
        deadline: Option<NaiveDateTime>,
    ) -> Result<(), CaseDomainError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(CaseDomainError::EmptyTitle);
        }
        self.title = trimmed.to_owned();
        self.description = description;
        self.url = url;
        self.deadline = deadline;
        Ok(())
    }

    /// Marks the task completed, remembering the status it held so the
    /// symmetric toggle can restore it.
    pub const fn complete(&mut self, finished: StatusId) {
        if !self.completed {
            self.previous_status = Some(self.status);
            self.completed = true;
            self.status = finished;
        }
    }

    /// Reverts a completion, restoring the previously held status (or the
    /// given fallback when none was recorded).
    pub const fn uncomplete(&mut self, fallback: StatusId) {
        if self.completed {
            self.completed = false;
            self.status = match self.previous_status.take() {
                Some(previous) => previous,
                None => fallback,
            };
        }
    }

    /// Assigns a status without touching the completed flag.
    pub const fn set_status(&mut self, status: StatusId) {
        self.status = status;
    }

    /// Assigns a user; returns false when already assigned.
    pub fn assign(&mut self, user: UserId) -> bool {
        self.assignees.insert(user)
    }

    /// Removes an assignment; returns false when absent.
    pub fn unassign(&mut self, user: UserId) -> bool {
        self.assignees.remove(&user)
    }

    /// Appends a new note at order index `counter + 1` and returns its id.
    pub fn append_note(&mut self, content: String) -> NoteId {
        self.note_counter = self.note_counter.saturating_add(1);
        let note = Note {
            id: NoteId::new(),
            order: self.note_counter,
            content,
        };
        let id = note.id;
        self.notes.push(note);
        id
    }

    /// Rewrites an existing note's body, preserving its order index.
    /// Returns false when the note does not exist.
    pub fn rewrite_note(&mut self, id: NoteId, content: String) -> bool {
        match self.notes.iter_mut().find(|note| note.id == id) {
            Some(note) => {
                note.content = content;
                true
            }
            None => false,
        }
    }

    /// Removes a note, leaving a gap in the order sequence. Returns false
    /// when the note does not exist.
    pub fn remove_note(&mut self, id: NoteId) -> bool {
        let before = self.notes.len();
        self.notes.retain(|note| note.id != id);
        self.notes.len() != before
    }

    /// Looks up a note by id.
    #[must_use]
    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    /// Records a file attachment and returns its record id.
    pub fn attach_file(&mut self, name: String, handle: FileHandle) -> FileId {
        let record = FileRecord {
            id: FileId::new(),
            name,
            handle,
        };
        let id = record.id;
        self.files.push(record);
        id
    }

    /// Removes a file record, returning it for storage cleanup.
    pub fn detach_file(&mut self, id: FileId) -> Option<FileRecord> {
        let position = self.files.iter().position(|file| file.id == id)?;
        Some(self.files.remove(position))
    }

    /// Looks up a file record by id.
    #[must_use]
    pub fn file(&self, id: FileId) -> Option<&FileRecord> {
        self.files.iter().find(|file| file.id == id)
    }
}
