//! Domain model for the case/task lifecycle engine.
//!
//! Pure business types with no infrastructure dependencies: identifier
//! newtypes, the status vocabulary, the `Case` and `Task` aggregates and
//! their owned satellites, association sets, recurrence rules, templates,
//! and read-only projections.

mod associations;
mod case;
mod drafts;
mod error;
mod ids;
mod org;
mod recurring;
mod snapshot;
mod status;
mod task;
mod template;

pub use associations::{
    AssociationKind, AssociationRecord, AssociationSelection, AssociationSet,
};
pub use case::{Case, normalize_pad_url};
pub use drafts::{
    CaseDraft, CaseUpdate, TaskDraft, TaskUpdate, TemplateSelection, combine_deadline,
};
pub use error::CaseDomainError;
pub use ids::{
    CaseId, CaseTemplateId, FileId, NoteId, OrgId, TaskId, TaskTemplateId, UserId,
};
pub use org::{Org, User};
pub use recurring::{Recurrence, RecurringChange, RecurringKind, RecurringRule};
pub use snapshot::{CaseSnapshot, TaskSnapshot};
pub use status::{
    STATUS_CREATED, STATUS_FINISHED, STATUS_RECURRING, Status, StatusId, StatusVocabulary,
};
pub use task::{FileHandle, FileRecord, Note, Task};
pub use template::{CaseTemplate, TaskTemplate, TemplateNote, TemplateTaskLink};
