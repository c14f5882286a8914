//! Association reconciliation: drive an attached set towards a desired
//! target set.
//!
//! One generic routine serves all four association kinds, replacing four
//! near-duplicate diff loops. Adds are resolved against the canonical
//! vocabulary before anything mutates, so an unresolvable name fails the
//! whole call; removals need no resolution. Connector identifiers are
//! reconciled independently: a connector present on both sides with a
//! differing identifier is updated in place, never removed and re-added.

use super::{LifecycleError, LifecycleResult};
use crate::case::domain::{AssociationKind, AssociationSelection, AssociationSet};
use crate::case::ports::CaseRepository;
use std::sync::Arc;

const ALL_KINDS: [AssociationKind; 4] = [
    AssociationKind::Tag,
    AssociationKind::Cluster,
    AssociationKind::CustomTag,
    AssociationKind::Connector,
];

/// Counts of the writes a reconciliation performed. A second call with the
/// same desired set reports all zeroes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Associations attached.
    pub added: usize,
    /// Associations detached.
    pub removed: usize,
    /// Connector identifiers rewritten in place.
    pub updated: usize,
}

impl ReconcileReport {
    /// Returns whether the reconciliation changed nothing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.updated == 0
    }
}

/// Reconciles association sets against the repository's canonical
/// vocabularies.
#[derive(Debug)]
pub struct AssociationReconciler<R>
where
    R: CaseRepository,
{
    repository: Arc<R>,
}

// Derived Clone would demand `R: Clone`; only the Arc is cloned.
impl<R> Clone for AssociationReconciler<R>
where
    R: CaseRepository,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> AssociationReconciler<R>
where
    R: CaseRepository,
{
    /// Creates a reconciler backed by `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Drives `set` to match `desired`, returning what changed.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownName`] when any name to add does
    /// not resolve; the set is untouched in that case.
    pub async fn reconcile(
        &self,
        set: &mut AssociationSet,
        desired: &AssociationSelection,
    ) -> LifecycleResult<ReconcileReport> {
        // Resolve every addition up front so a bad name fails the whole
        // call before the first mutation.
        for kind in ALL_KINDS {
            let current = set.names(kind);
            for name in desired.names(kind).difference(&current) {
                if self.repository.resolve_key(kind, name).await?.is_none() {
                    return Err(LifecycleError::UnknownName {
                        kind,
                        name: name.clone(),
                    });
                }
            }
        }

        let mut report = ReconcileReport::default();
        for kind in ALL_KINDS {
            let current = set.names(kind);
            let want = desired.names(kind);

            let to_add: Vec<String> = want.difference(&current).cloned().collect();
            let to_remove: Vec<String> = current.difference(want).cloned().collect();

            for name in to_add {
                let identifier = desired.identifiers.get(&name).cloned().flatten();
                set.attach(kind, name.clone());
                if kind == AssociationKind::Connector && identifier.is_some() {
                    let _changed: bool = set.set_connector_identifier(&name, identifier);
                }
                report.added = report.added.saturating_add(1);
            }
            for name in to_remove {
                set.detach(kind, &name);
                report.removed = report.removed.saturating_add(1);
            }

            if kind == AssociationKind::Connector {
                report.updated = report
                    .updated
                    .saturating_add(update_identifiers_in_place(set, desired, &current));
            }
        }
        Ok(report)
    }
}

/// Rewrites identifiers for connectors that were already attached and stay
/// attached; identifiers absent from the desired map are left alone.
fn update_identifiers_in_place(
    set: &mut AssociationSet,
    desired: &AssociationSelection,
    previously_attached: &std::collections::BTreeSet<String>,
) -> usize {
    let mut updated = 0_usize;
    for name in desired.connectors.intersection(previously_attached) {
        if let Some(identifier) = desired.identifiers.get(name) {
            if set.set_connector_identifier(name, identifier.clone()) {
                updated = updated.saturating_add(1);
            }
        }
    }
    updated
}
