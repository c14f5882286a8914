//! Tag, galaxy-cluster, custom-tag, and connector-instance associations.
//!
//! Cases and tasks carry the same four association kinds. Associations are
//! keyed by canonical name; connector instances additionally carry a
//! per-attachment identifier (an external event reference) that is
//! reconciled independently of the membership itself.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The four association kinds shared by cases and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// Taxonomy tag.
    Tag,
    /// Galaxy cluster.
    Cluster,
    /// Locally defined custom tag.
    CustomTag,
    /// Configured connector instance.
    Connector,
}

impl AssociationKind {
    /// Returns a lowercase label for log and error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Cluster => "cluster",
            Self::CustomTag => "custom tag",
            Self::Connector => "connector instance",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The associations currently attached to a case or task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSet {
    tags: BTreeSet<String>,
    clusters: BTreeSet<String>,
    custom_tags: BTreeSet<String>,
    connectors: BTreeMap<String, Option<String>>,
}

impl AssociationSet {
    /// Creates an empty association set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tags: BTreeSet::new(),
            clusters: BTreeSet::new(),
            custom_tags: BTreeSet::new(),
            connectors: BTreeMap::new(),
        }
    }

    /// Returns the attached tag names.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the attached cluster names.
    #[must_use]
    pub const fn clusters(&self) -> &BTreeSet<String> {
        &self.clusters
    }

    /// Returns the attached custom-tag names.
    #[must_use]
    pub const fn custom_tags(&self) -> &BTreeSet<String> {
        &self.custom_tags
    }

    /// Returns the attached connector instances and their identifiers.
    #[must_use]
    pub const fn connectors(&self) -> &BTreeMap<String, Option<String>> {
        &self.connectors
    }

    /// Returns the current names for `kind`, connector identifiers aside.
    #[must_use]
    pub fn names(&self, kind: AssociationKind) -> BTreeSet<String> {
        match kind {
            AssociationKind::Tag => self.tags.clone(),
            AssociationKind::Cluster => self.clusters.clone(),
            AssociationKind::CustomTag => self.custom_tags.clone(),
            AssociationKind::Connector => self.connectors.keys().cloned().collect(),
        }
    }

    /// Attaches `name` under `kind`. Connector attachments start without an
    /// identifier; use [`Self::set_connector_identifier`] afterwards.
    pub fn attach(&mut self, kind: AssociationKind, name: String) {
        match kind {
            AssociationKind::Tag => {
                self.tags.insert(name);
            }
            AssociationKind::Cluster => {
                self.clusters.insert(name);
            }
            AssociationKind::CustomTag => {
                self.custom_tags.insert(name);
            }
            AssociationKind::Connector => {
                self.connectors.entry(name).or_insert(None);
            }
        }
    }

    /// Detaches `name` from `kind`. Absent names are ignored.
    pub fn detach(&mut self, kind: AssociationKind, name: &str) {
        match kind {
            AssociationKind::Tag => {
                self.tags.remove(name);
            }
            AssociationKind::Cluster => {
                self.clusters.remove(name);
            }
            AssociationKind::CustomTag => {
                self.custom_tags.remove(name);
            }
            AssociationKind::Connector => {
                self.connectors.remove(name);
            }
        }
    }

    /// Returns the identifier stored for a connector attachment.
    ///
    /// `None` when the connector is not attached; `Some(None)` when it is
    /// attached without an identifier.
    #[must_use]
    pub fn connector_identifier(&self, name: &str) -> Option<&Option<String>> {
        self.connectors.get(name)
    }

    /// Stores `identifier` for an attached connector, creating the
    /// attachment when absent. Returns whether anything changed.
    pub fn set_connector_identifier(&mut self, name: &str, identifier: Option<String>) -> bool {
        match self.connectors.get_mut(name) {
            Some(existing) if *existing == identifier => false,
            Some(existing) => {
                *existing = identifier;
                true
            }
            None => {
                self.connectors.insert(name.to_owned(), identifier);
                true
            }
        }
    }

    /// Flattens the set back into a selection, preserving connector
    /// identifiers. Used when forking a case or task.
    #[must_use]
    pub fn to_selection(&self) -> AssociationSelection {
        AssociationSelection {
            tags: self.tags.clone(),
            clusters: self.clusters.clone(),
            custom_tags: self.custom_tags.clone(),
            connectors: self.connectors.keys().cloned().collect(),
            identifiers: self.connectors.clone(),
        }
    }
}

/// The desired target state the reconciler drives an [`AssociationSet`]
/// towards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSelection {
    /// Desired tag names.
    pub tags: BTreeSet<String>,
    /// Desired cluster names.
    pub clusters: BTreeSet<String>,
    /// Desired custom-tag names.
    pub custom_tags: BTreeSet<String>,
    /// Desired connector instance names.
    pub connectors: BTreeSet<String>,
    /// Per-connector identifiers; connectors missing from this map keep or
    /// start with no identifier.
    pub identifiers: BTreeMap<String, Option<String>>,
}

impl AssociationSelection {
    /// Creates an empty selection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tags: BTreeSet::new(),
            clusters: BTreeSet::new(),
            custom_tags: BTreeSet::new(),
            connectors: BTreeSet::new(),
            identifiers: BTreeMap::new(),
        }
    }

    /// Returns the desired names for `kind`.
    #[must_use]
    pub const fn names(&self, kind: AssociationKind) -> &BTreeSet<String> {
        match kind {
            AssociationKind::Tag => &self.tags,
            AssociationKind::Cluster => &self.clusters,
            AssociationKind::CustomTag => &self.custom_tags,
            AssociationKind::Connector => &self.connectors,
        }
    }

    /// Returns the desired identifier for a connector name.
    #[must_use]
    pub fn identifier_for(&self, name: &str) -> Option<String> {
        self.identifiers.get(name).cloned().flatten()
    }
}

/// A canonical record resolved from an association name by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRecord {
    /// Canonical record identifier.
    pub id: uuid::Uuid,
    /// Canonical name, the reconciliation key.
    pub name: String,
}
