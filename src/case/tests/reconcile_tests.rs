//! Association reconciliation against the canonical vocabularies.

use super::support::{harness, tag_selection};
use crate::case::domain::{AssociationKind, AssociationSelection, AssociationSet};
use crate::case::services::{AssociationReconciler, LifecycleError};
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_name_aborts_before_any_mutation() {
    let fixture = harness();
    let reconciler = AssociationReconciler::new(Arc::clone(&fixture.repository));
    let mut set = AssociationSet::new();
    set.attach(AssociationKind::Tag, "tlp:red".to_owned());

    let mut desired = tag_selection(&["tlp:green"]);
    desired.clusters.insert("no-such-cluster".to_owned());

    let result = reconciler.reconcile(&mut set, &desired).await;
    assert!(matches!(
        result,
        Err(LifecycleError::UnknownName {
            kind: AssociationKind::Cluster,
            ..
        })
    ));
    // The bad cluster kept the valid tag swap from happening too.
    assert!(set.tags().contains("tlp:red"));
    assert!(!set.tags().contains("tlp:green"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn drives_set_to_desired_state_and_reports_writes() {
    let fixture = harness();
    let reconciler = AssociationReconciler::new(Arc::clone(&fixture.repository));
    let mut set = AssociationSet::new();
    set.attach(AssociationKind::Tag, "tlp:red".to_owned());

    let mut desired = tag_selection(&["tlp:green"]);
    desired.clusters.insert("apt29".to_owned());

    let report = reconciler
        .reconcile(&mut set, &desired)
        .await
        .expect("reconcile");
    assert_eq!(report.added, 2);
    assert_eq!(report.removed, 1);
    assert!(set.tags().contains("tlp:green"));
    assert!(!set.tags().contains("tlp:red"));
    assert!(set.clusters().contains("apt29"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_pass_with_same_target_is_a_noop() {
    let fixture = harness();
    let reconciler = AssociationReconciler::new(Arc::clone(&fixture.repository));
    let mut set = AssociationSet::new();
    let mut desired = tag_selection(&["tlp:red", "tlp:green"]);
    desired.connectors.insert("misp-local".to_owned());
    desired
        .identifiers
        .insert("misp-local".to_owned(), Some("evt-1".to_owned()));

    let first = reconciler
        .reconcile(&mut set, &desired)
        .await
        .expect("first pass");
    assert!(!first.is_noop());

    let second = reconciler
        .reconcile(&mut set, &desired)
        .await
        .expect("second pass");
    assert!(second.is_noop());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connector_identifier_updates_in_place() {
    let fixture = harness();
    let reconciler = AssociationReconciler::new(Arc::clone(&fixture.repository));
    let mut set = AssociationSet::new();
    set.attach(AssociationKind::Connector, "misp-local".to_owned());
    let _changed = set.set_connector_identifier("misp-local", Some("evt-1".to_owned()));

    let mut desired = AssociationSelection::new();
    desired.connectors.insert("misp-local".to_owned());
    desired
        .identifiers
        .insert("misp-local".to_owned(), Some("evt-2".to_owned()));

    let report = reconciler
        .reconcile(&mut set, &desired)
        .await
        .expect("reconcile");
    assert_eq!(report.added, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(
        set.connector_identifier("misp-local"),
        Some(&Some("evt-2".to_owned()))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cloned_reconciler_resolves_against_the_same_vocabularies() {
    let fixture = harness();
    let reconciler = AssociationReconciler::new(Arc::clone(&fixture.repository));
    let cloned = reconciler.clone();

    let mut set = AssociationSet::new();
    let report = cloned
        .reconcile(&mut set, &tag_selection(&["tlp:red"]))
        .await
        .expect("reconcile");
    assert_eq!(report.added, 1);
    assert!(set.tags().contains("tlp:red"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn absent_identifier_entry_keeps_the_stored_identifier() {
    let fixture = harness();
    let reconciler = AssociationReconciler::new(Arc::clone(&fixture.repository));
    let mut set = AssociationSet::new();
    set.attach(AssociationKind::Connector, "misp-local".to_owned());
    let _changed = set.set_connector_identifier("misp-local", Some("evt-1".to_owned()));

    let mut desired = AssociationSelection::new();
    desired.connectors.insert("misp-local".to_owned());

    let report = reconciler
        .reconcile(&mut set, &desired)
        .await
        .expect("reconcile");
    assert!(report.is_noop());
    assert_eq!(
        set.connector_identifier("misp-local"),
        Some(&Some("evt-1".to_owned()))
    );
}
