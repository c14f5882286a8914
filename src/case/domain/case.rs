//! Case aggregate root.

use super::{
    AssociationSet, CaseDomainError, CaseId, OrgId, Recurrence, StatusId, UserId,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Case aggregate root.
///
/// A case exclusively owns its tasks (held in the repository, keyed by
/// `case_id`) and embeds its satellite rows: participant orgs (owner
/// first), directed case links, recurring-notification opt-ins, and the
/// association set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    id: CaseId,
    title: String,
    description: String,
    #[serde(rename = "creation_date")]
    created_at: DateTime<Utc>,
    #[serde(rename = "last_modif")]
    last_modified: DateTime<Utc>,
    deadline: Option<NaiveDateTime>,
    #[serde(rename = "status_id")]
    status: StatusId,
    completed: bool,
    #[serde(rename = "owner_org_id")]
    owner_org: OrgId,
    recurring: Option<Recurrence>,
    #[serde(rename = "hedgedoc_url")]
    pad_url: Option<String>,
    notes: String,
    orgs: Vec<OrgId>,
    links: BTreeSet<CaseId>,
    #[serde(rename = "recurring_notifications")]
    watchers: BTreeSet<UserId>,
    associations: AssociationSet,
}

impl Case {
    /// Creates a new case owned by `owner_org` in the given initial status.
    ///
    /// The owner org is installed as the first participant.
    ///
    /// # Errors
    ///
    /// Returns [`CaseDomainError::EmptyTitle`] when the trimmed title is
    /// empty.
    pub fn new(
        title: &str,
        description: String,
        deadline: Option<NaiveDateTime>,
        owner_org: OrgId,
        initial_status: StatusId,
        clock: &impl Clock,
    ) -> Result<Self, CaseDomainError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(CaseDomainError::EmptyTitle);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: CaseId::new(),
            title: trimmed.to_owned(),
            description,
            created_at: timestamp,
            last_modified: timestamp,
            deadline,
            status: initial_status,
            completed: false,
            owner_org,
            recurring: None,
            pad_url: None,
            notes: String::new(),
            orgs: vec![owner_org],
            links: BTreeSet::new(),
            watchers: BTreeSet::new(),
            associations: AssociationSet::new(),
        })
    }

    /// Returns the case identifier.
    #[must_use]
    pub const fn id(&self) -> CaseId {
        self.id
    }

    /// Returns the unique case title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the case description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
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

    /// Returns whether the case is completed.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.completed
    }

    /// Returns the owning organisation.
    #[must_use]
    pub const fn owner_org(&self) -> OrgId {
        self.owner_org
    }

    /// Returns the recurrence state, if any.
    #[must_use]
    pub const fn recurring(&self) -> Option<Recurrence> {
        self.recurring
    }

    /// Returns the collaborative-pad URL, if configured.
    #[must_use]
    pub fn pad_url(&self) -> Option<&str> {
        self.pad_url.as_deref()
    }

    /// Returns the case-level free-text notes.
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Returns the participant org ids, owner first.
    #[must_use]
    pub fn orgs(&self) -> &[OrgId] {
        &self.orgs
    }

    /// Returns whether `org` participates in this case.
    #[must_use]
    pub fn has_org(&self, org: OrgId) -> bool {
        self.orgs.contains(&org)
    }

    /// Returns the linked case ids (this side of each symmetric pair).
    #[must_use]
    pub const fn links(&self) -> &BTreeSet<CaseId> {
        &self.links
    }

    /// Returns the users opted in to recurrence reminders.
    #[must_use]
    pub const fn watchers(&self) -> &BTreeSet<UserId> {
        &self.watchers
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
        deadline: Option<NaiveDateTime>,
    ) -> Result<(), CaseDomainError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(CaseDomainError::EmptyTitle);
        }
        self.title = trimmed.to_owned();
        self.description = description;
        self.deadline = deadline;
        Ok(())
    }

    /// Sets the completed flag and status together; the coupling between
    /// the two is an invariant owned by the lifecycle engine.
    pub const fn set_completion(&mut self, completed: bool, status: StatusId) {
        self.completed = completed;
        self.status = status;
    }

    /// Assigns a status without touching the completed flag.
    pub const fn set_status(&mut self, status: StatusId) {
        self.status = status;
    }

    /// Reassigns ownership to another org.
    pub const fn set_owner_org(&mut self, org: OrgId) {
        self.owner_org = org;
    }

    /// Installs or clears the recurrence state.
    pub const fn set_recurrence(&mut self, recurrence: Option<Recurrence>) {
        self.recurring = recurrence;
    }

    /// Replaces the case-level notes.
    pub fn set_notes(&mut self, notes: String) {
        self.notes = notes;
    }

    /// Sets the collaborative-pad URL, stripping editor suffixes.
    pub fn set_pad_url(&mut self, url: &str) {
        self.pad_url = Some(normalize_pad_url(url).to_owned());
    }

    /// Adds a participant org; returns false when already present.
    pub fn add_org(&mut self, org: OrgId) -> bool {
        if self.orgs.contains(&org) {
            return false;
        }
        self.orgs.push(org);
        true
    }

    /// Removes a participant org; returns false when absent.
    pub fn remove_org(&mut self, org: OrgId) -> bool {
        let before = self.orgs.len();
        self.orgs.retain(|existing| *existing != org);
        self.orgs.len() != before
    }

    /// Records a directed link to another case.
    pub fn add_link(&mut self, other: CaseId) -> bool {
        self.links.insert(other)
    }

    /// Removes a directed link; returns false when absent.
    pub fn remove_link(&mut self, other: CaseId) -> bool {
        self.links.remove(&other)
    }

    /// Opts a user in to recurrence reminders.
    pub fn add_watcher(&mut self, user: UserId) -> bool {
        self.watchers.insert(user)
    }

    /// Opts a user out of recurrence reminders.
    pub fn remove_watcher(&mut self, user: UserId) -> bool {
        self.watchers.remove(&user)
    }

    /// Drops every recurrence opt-in.
    pub fn clear_watchers(&mut self) {
        self.watchers.clear();
    }
}

/// Strips the trailing `#`, `?both`, and `?edit` editor suffixes a pasted
/// pad URL commonly carries.
#[must_use]
pub fn normalize_pad_url(url: &str) -> &str {
    let mut trimmed = url;
    if let Some(stripped) = trimmed.strip_suffix('#') {
        trimmed = stripped;
    }
    if let Some(stripped) = trimmed.strip_suffix("?both") {
        trimmed = stripped;
    } else if let Some(stripped) = trimmed.strip_suffix("?edit") {
        trimmed = stripped;
    }
    trimmed
}
