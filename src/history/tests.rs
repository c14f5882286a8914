//! History recorder tests: append order, purge tolerance, durability.

use super::{FsHistoryStore, HistoryRecorder, InMemoryHistory};
use crate::case::domain::{CaseId, OrgId, User, UserId};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use std::sync::Arc;

#[fixture]
fn actor() -> User {
    User::new(UserId::new(), "alice".to_owned(), OrgId::new(), false)
}

fn fs_store() -> FsHistoryStore<DefaultClock> {
    let root = std::env::temp_dir().join(format!("caseflow-history-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).expect("create temp dir");
    FsHistoryStore::open(&root.to_string_lossy(), Arc::new(DefaultClock))
        .expect("open store")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fs_store_appends_and_reads_in_order(actor: User) {
    let store = fs_store();
    let case = CaseId::new();

    store.append(case, &actor, "Case Created").await.expect("append");
    store.append(case, &actor, "Case edited").await.expect("append");

    let entries = store.read_all(case).await.expect("read");
    let messages: Vec<&str> = entries.iter().map(|entry| entry.message.as_str()).collect();
    assert_eq!(messages, ["Case Created", "Case edited"]);
    assert!(entries.iter().all(|entry| entry.actor == "alice"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fs_store_yields_empty_log_for_unknown_case() {
    let store = fs_store();
    let entries = store.read_all(CaseId::new()).await.expect("read");
    assert!(entries.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fs_store_purge_tolerates_an_absent_log(actor: User) {
    let store = fs_store();
    let case = CaseId::new();

    store.purge(case).await.expect("purge of nothing");

    store.append(case, &actor, "Case Created").await.expect("append");
    store.purge(case).await.expect("purge");
    store.purge(case).await.expect("second purge");
    assert!(store.read_all(case).await.expect("read").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn logs_are_isolated_per_case(actor: User) {
    let store = InMemoryHistory::new(Arc::new(DefaultClock));
    let one = CaseId::new();
    let two = CaseId::new();

    store.append(one, &actor, "Case Created").await.expect("append");
    store.append(two, &actor, "Case Created").await.expect("append");
    store.purge(one).await.expect("purge");

    assert!(!store.has_log(one));
    assert!(store.has_log(two));
    assert_eq!(store.read_all(two).await.expect("read").len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn in_memory_append_failures_surface(actor: User) {
    let store = InMemoryHistory::new(Arc::new(DefaultClock));
    let case = CaseId::new();

    store.fail_next_appends(true);
    assert!(store.append(case, &actor, "Case Created").await.is_err());

    store.fail_next_appends(false);
    store.append(case, &actor, "Case Created").await.expect("append");
    assert_eq!(store.read_all(case).await.expect("read").len(), 1);
}
