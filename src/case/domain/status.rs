//! Status vocabulary for cases and tasks.
//!
//! Statuses are a configurable lookup vocabulary rather than a closed state
//! machine. Three well-known entries (`Created`, `Finished`, `Recurring`)
//! participate in automatic lifecycle transitions and are resolved by name;
//! any other entry is assignable only through the explicit status-change
//! operations and is never set automatically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known status name driving creation and un-completion transitions.
pub const STATUS_CREATED: &str = "Created";
/// Well-known status name set when a case or task is completed.
pub const STATUS_FINISHED: &str = "Finished";
/// Well-known status name set while a case has a recurrence rule.
pub const STATUS_RECURRING: &str = "Recurring";

/// Identifier of a status entry within a [`StatusVocabulary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(u32);

impl StatusId {
    /// Wraps a raw vocabulary index.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw vocabulary index.
    #[must_use]
    pub const fn into_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single status entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    id: StatusId,
    name: String,
}

impl Status {
    /// Returns the status identifier.
    #[must_use]
    pub const fn id(&self) -> StatusId {
        self.id
    }

    /// Returns the status display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The configured set of assignable statuses.
///
/// Always contains the well-known trio plus `In progress`; callers may add
/// free-form custom entries at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusVocabulary {
    entries: Vec<Status>,
    created: StatusId,
    finished: StatusId,
    recurring: StatusId,
}

impl StatusVocabulary {
    /// Builds a vocabulary from the default entries plus `custom` names.
    ///
    /// Custom names duplicating a default entry are ignored.
    #[must_use]
    pub fn with_custom(custom: impl IntoIterator<Item = String>) -> Self {
        let mut entries: Vec<Status> = [STATUS_CREATED, "In progress", STATUS_FINISHED, STATUS_RECURRING]
            .iter()
            .enumerate()
            .map(|(idx, name)| Status {
                id: StatusId(idx_to_id(idx)),
                name: (*name).to_owned(),
            })
            .collect();
        for name in custom {
            if entries.iter().any(|status| status.name == name) {
                continue;
            }
            let id = StatusId(idx_to_id(entries.len()));
            entries.push(Status { id, name });
        }
        Self {
            created: StatusId(1),
            finished: StatusId(3),
            recurring: StatusId(4),
            entries,
        }
    }

    /// Returns every entry in vocabulary order.
    #[must_use]
    pub fn entries(&self) -> &[Status] {
        &self.entries
    }

    /// Returns whether `id` belongs to the vocabulary.
    #[must_use]
    pub fn contains(&self, id: StatusId) -> bool {
        self.entries.iter().any(|status| status.id == id)
    }

    /// Returns the display name for `id`, if known.
    #[must_use]
    pub fn name_of(&self, id: StatusId) -> Option<&str> {
        self.entries
            .iter()
            .find(|status| status.id == id)
            .map(Status::name)
    }

    /// Resolves a status by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Status> {
        self.entries.iter().find(|status| status.name == name)
    }

    /// Identifier of the `Created` status.
    #[must_use]
    pub const fn created(&self) -> StatusId {
        self.created
    }

    /// Identifier of the `Finished` status.
    #[must_use]
    pub const fn finished(&self) -> StatusId {
        self.finished
    }

    /// Identifier of the `Recurring` status.
    #[must_use]
    pub const fn recurring(&self) -> StatusId {
        self.recurring
    }
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        Self::with_custom([])
    }
}

/// Vocabulary ids are one-based to match the lookup-table convention.
fn idx_to_id(idx: usize) -> u32 {
    u32::try_from(idx).map_or(u32::MAX, |value| value.saturating_add(1))
}
