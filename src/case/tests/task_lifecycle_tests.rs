//! Task lifecycle behaviour: ordering, completion, notes, files,
//! assignments.

use super::support::{draft, harness, task_draft, Harness};
use crate::case::adapters::memory::NotifyScope;
use crate::case::domain::{CaseId, StatusId};
use crate::case::ports::CaseRepository;
use crate::case::services::LifecycleError;
use rstest::rstest;

async fn case_with_tasks(fixture: &Harness, titles: &[&str]) -> CaseId {
    let case = fixture
        .service
        .create_case(draft("incident"), &fixture.admin)
        .await
        .expect("case");
    for title in titles {
        let _task = fixture
            .service
            .tasks()
            .create_task(task_draft(title), case.id(), &fixture.admin)
            .await
            .expect("task");
    }
    case.id()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_are_appended_in_case_order() {
    let fixture = harness();
    let case_id = case_with_tasks(&fixture, &["triage", "contain", "report"]).await;

    let tasks = fixture.repository.list_tasks(case_id).await.expect("list");
    let titles: Vec<&str> = tasks.iter().map(|task| task.title()).collect();
    assert_eq!(titles, ["triage", "contain", "report"]);
    let orders: Vec<u32> = tasks.iter().map(|task| task.case_order()).collect();
    assert_eq!(orders, [1, 2, 3]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn outside_user_cannot_touch_tasks() {
    let fixture = harness();
    let case_id = case_with_tasks(&fixture, &["triage"]).await;

    let result = fixture
        .service
        .tasks()
        .create_task(task_draft("intrude"), case_id, &fixture.bob)
        .await;
    assert!(matches!(result, Err(LifecycleError::PermissionDenied { .. })));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_toggle_restores_the_previous_status() {
    let fixture = harness();
    let case_id = case_with_tasks(&fixture, &["triage"]).await;
    let task = fixture
        .repository
        .list_tasks(case_id)
        .await
        .expect("list")
        .pop()
        .expect("task");
    let in_progress = StatusId::from_raw(2);
    fixture
        .service
        .tasks()
        .change_status(in_progress, task.id(), &fixture.admin)
        .await
        .expect("status");

    let completed = fixture
        .service
        .tasks()
        .complete_task(task.id(), &fixture.admin)
        .await
        .expect("complete");
    assert!(completed);
    let finished = fixture
        .repository
        .fetch_task(task.id())
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(finished.status(), fixture.service.statuses().finished());

    let completed = fixture
        .service
        .tasks()
        .complete_task(task.id(), &fixture.admin)
        .await
        .expect("uncomplete");
    assert!(!completed);
    let restored = fixture
        .repository
        .fetch_task(task.id())
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(restored.status(), in_progress);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_status_is_rejected() {
    let fixture = harness();
    let case_id = case_with_tasks(&fixture, &["triage"]).await;
    let task = fixture
        .repository
        .list_tasks(case_id)
        .await
        .expect("list")
        .pop()
        .expect("task");

    let result = fixture
        .service
        .tasks()
        .change_status(StatusId::from_raw(99), task.id(), &fixture.admin)
        .await;
    assert!(matches!(result, Err(LifecycleError::UnknownStatus(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn notes_grow_monotonic_orders_and_deletion_leaves_gaps() {
    let fixture = harness();
    let case_id = case_with_tasks(&fixture, &["triage"]).await;
    let task_id = fixture
        .repository
        .list_tasks(case_id)
        .await
        .expect("list")
        .pop()
        .expect("task")
        .id();
    let tasks = fixture.service.tasks();

    let first = tasks
        .modify_note(task_id, None, "first".to_owned(), &fixture.admin)
        .await
        .expect("note");
    let second = tasks
        .modify_note(task_id, None, "second".to_owned(), &fixture.admin)
        .await
        .expect("note");
    tasks
        .delete_note(task_id, first, &fixture.admin)
        .await
        .expect("delete");
    let third = tasks
        .modify_note(task_id, None, "third".to_owned(), &fixture.admin)
        .await
        .expect("note");

    let task = fixture
        .repository
        .fetch_task(task_id)
        .await
        .expect("fetch")
        .expect("present");
    let orders: Vec<u32> = task.notes().iter().map(|note| note.order()).collect();
    // First note's slot is gone for good; the third lands at index three.
    assert_eq!(orders, [2, 3]);

    let rewritten = tasks
        .modify_note(task_id, Some(second), "second, edited".to_owned(), &fixture.admin)
        .await
        .expect("rewrite");
    assert_eq!(rewritten, second);
    let task = fixture
        .repository
        .fetch_task(task_id)
        .await
        .expect("fetch")
        .expect("present");
    let edited = task.note(second).expect("note kept");
    assert_eq!(edited.content(), "second, edited");
    assert_eq!(edited.order(), 2);

    assert_eq!(task.note(third).expect("third note").order(), 3);

    let missing = tasks
        .modify_note(task_id, Some(first), "ghost".to_owned(), &fixture.admin)
        .await;
    assert!(matches!(missing, Err(LifecycleError::NoteNotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn files_round_trip_through_the_store() {
    let fixture = harness();
    let case_id = case_with_tasks(&fixture, &["triage"]).await;
    let task_id = fixture
        .repository
        .list_tasks(case_id)
        .await
        .expect("list")
        .pop()
        .expect("task")
        .id();
    let tasks = fixture.service.tasks();

    let file_id = tasks
        .attach_file(task_id, "evidence.pcap", b"\x00\x01", &fixture.admin)
        .await
        .expect("attach");
    assert_eq!(fixture.files.object_count(), 1);

    let bytes = tasks.open_file(task_id, file_id).await.expect("open");
    assert_eq!(bytes, b"\x00\x01");

    tasks
        .detach_file(task_id, file_id, &fixture.admin)
        .await
        .expect("detach");
    assert_eq!(fixture.files.object_count(), 0);
    let gone = tasks.open_file(task_id, file_id).await;
    assert!(matches!(gone, Err(LifecycleError::FileNotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn assignment_is_idempotent_and_notifies_explicit_assignees() {
    let fixture = harness();
    let case_id = case_with_tasks(&fixture, &["triage"]).await;
    let task_id = fixture
        .repository
        .list_tasks(case_id)
        .await
        .expect("list")
        .pop()
        .expect("task")
        .id();
    let tasks = fixture.service.tasks();

    tasks
        .assign_task(task_id, fixture.alice.id(), &fixture.admin, false)
        .await
        .expect("assign");
    tasks
        .assign_task(task_id, fixture.alice.id(), &fixture.admin, false)
        .await
        .expect("re-assign is a no-op");

    let task = fixture
        .repository
        .fetch_task(task_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(task.assignees().len(), 1);

    let to_alice: Vec<_> = fixture
        .notifier
        .sent()
        .into_iter()
        .filter(|sent| sent.scope == NotifyScope::User(fixture.alice.id()))
        .collect();
    assert_eq!(to_alice.len(), 1);
    let notification = to_alice.first().expect("one notification");
    assert!(notification.message.contains("triage"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn self_assignment_stays_silent() {
    let fixture = harness();
    let case_id = case_with_tasks(&fixture, &["triage"]).await;
    let task_id = fixture
        .repository
        .list_tasks(case_id)
        .await
        .expect("list")
        .pop()
        .expect("task")
        .id();

    fixture
        .service
        .tasks()
        .assign_task(task_id, fixture.admin.id(), &fixture.admin, true)
        .await
        .expect("self-assign");
    assert!(
        fixture
            .notifier
            .sent()
            .iter()
            .all(|sent| sent.scope != NotifyScope::User(fixture.admin.id()))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_task_records_its_title_and_drops_stored_bytes() {
    let fixture = harness();
    let case_id = case_with_tasks(&fixture, &["triage"]).await;
    let task_id = fixture
        .repository
        .list_tasks(case_id)
        .await
        .expect("list")
        .pop()
        .expect("task")
        .id();
    let _file = fixture
        .service
        .tasks()
        .attach_file(task_id, "evidence.pcap", b"\x00", &fixture.admin)
        .await
        .expect("attach");

    fixture
        .service
        .tasks()
        .delete_task(task_id, &fixture.admin)
        .await
        .expect("delete");

    assert_eq!(fixture.repository.task_count(), 0);
    assert_eq!(fixture.files.object_count(), 0);
    let log = fixture.service.history(case_id).await.expect("history");
    assert!(
        log.iter()
            .any(|entry| entry.message == "Task 'triage' deleted")
    );
}
