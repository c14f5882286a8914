//! Case lifecycle behaviour: CRUD, completion cascade, orgs, recurrence,
//! links, pad, digest, forking.

use super::support::{draft, harness, harness_with, tag_selection, task_draft, today, Harness};
use crate::case::adapters::memory::{NotifyScope, StaticPadClient};
use crate::case::domain::{
    CaseDraft, CaseId, CaseUpdate, RecurringChange, RecurringKind, RecurringRule, TaskTemplateId,
};
use crate::case::ports::{CaseRepository, PadError};
use crate::case::services::{LifecycleError, PadNotes};
use chrono::NaiveDate;
use rstest::rstest;
use std::collections::BTreeSet;
use std::sync::Arc;

async fn seeded_case(fixture: &Harness) -> CaseId {
    let case = fixture
        .service
        .create_case(draft("incident"), &fixture.admin)
        .await
        .expect("case");
    case.id()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_rejects_duplicate_titles() {
    let fixture = harness();
    let _case = seeded_case(&fixture).await;
    let result = fixture
        .service
        .create_case(draft("incident"), &fixture.admin)
        .await;
    assert!(matches!(result, Err(LifecycleError::TitleTaken(_))));
    assert_eq!(fixture.repository.case_count(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_trims_the_title_and_installs_the_owner_org() {
    let fixture = harness();
    let case = fixture
        .service
        .create_case(draft("  spaced out  "), &fixture.alice)
        .await
        .expect("case");
    assert_eq!(case.title(), "spaced out");
    assert_eq!(case.owner_org(), fixture.org_a);
    assert_eq!(case.orgs(), [fixture.org_a].as_slice());
    assert_eq!(case.status(), fixture.service.statuses().created());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_creation_rolls_back_every_row() {
    let fixture = harness();

    // A stale task-template id fails after the case row went in.
    let result = fixture
        .service
        .create_case(
            CaseDraft {
                task_templates: vec![TaskTemplateId::new()],
                ..draft("incident")
            },
            &fixture.admin,
        )
        .await;
    assert!(matches!(
        result,
        Err(LifecycleError::TaskTemplateNotFound(_))
    ));
    assert_eq!(fixture.repository.case_count(), 0);
    assert_eq!(fixture.repository.task_count(), 0);

    // Same when the creation event cannot be recorded.
    fixture.history.fail_next_appends(true);
    let result = fixture
        .service
        .create_case(draft("incident"), &fixture.admin)
        .await;
    assert!(matches!(result, Err(LifecycleError::History(_))));
    assert_eq!(fixture.repository.case_count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn edit_reconciles_associations_and_appends_one_event() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;

    let update = CaseUpdate {
        title: "incident".to_owned(),
        description: "updated".to_owned(),
        associations: tag_selection(&["tlp:red"]),
        ..CaseUpdate::default()
    };
    fixture
        .service
        .edit_case(update, case_id, &fixture.admin)
        .await
        .expect("edit");

    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(case.description(), "updated");
    assert!(case.associations().tags().contains("tlp:red"));
    let edits = fixture
        .service
        .history(case_id)
        .await
        .expect("history")
        .into_iter()
        .filter(|entry| entry.message == "Case edited")
        .count();
    assert_eq!(edits, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn attaching_a_connector_requires_an_entitlement() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;

    let mut update = CaseUpdate {
        title: "incident".to_owned(),
        ..CaseUpdate::default()
    };
    update.associations.connectors.insert("misp-remote".to_owned());

    // Alice holds a credential for misp-local only.
    let result = fixture
        .service
        .edit_case(update.clone(), case_id, &fixture.alice)
        .await;
    assert!(matches!(
        result,
        Err(LifecycleError::ConnectorNotEntitled { .. })
    ));

    fixture
        .service
        .edit_case(update, case_id, &fixture.admin)
        .await
        .expect("admin is entitled");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn entitlement_covers_already_attached_connectors() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;

    let mut update = CaseUpdate {
        title: "incident".to_owned(),
        ..CaseUpdate::default()
    };
    update.associations.connectors.insert("misp-remote".to_owned());
    fixture
        .service
        .edit_case(update.clone(), case_id, &fixture.admin)
        .await
        .expect("attach");

    // Keeping an attached connector in the request still needs the
    // credential; alice holds one for misp-local only.
    update.description = "triage notes".to_owned();
    let result = fixture
        .service
        .edit_case(update, case_id, &fixture.alice)
        .await;
    assert!(matches!(
        result,
        Err(LifecycleError::ConnectorNotEntitled { .. })
    ));
    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_ne!(case.description(), "triage notes");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_cascades_and_reviving_leaves_tasks_completed() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;
    for title in ["triage", "contain"] {
        let _task = fixture
            .service
            .tasks()
            .create_task(task_draft(title), case_id, &fixture.admin)
            .await
            .expect("task");
    }
    let done = fixture
        .repository
        .list_tasks(case_id)
        .await
        .expect("list")
        .remove(0);
    let _completed = fixture
        .service
        .tasks()
        .complete_task(done.id(), &fixture.admin)
        .await
        .expect("pre-complete");

    let completed = fixture
        .service
        .complete_case(case_id, &fixture.admin)
        .await
        .expect("complete");
    assert!(completed);
    let statuses = fixture.service.statuses();
    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(case.status(), statuses.finished());
    for task in fixture.repository.list_tasks(case_id).await.expect("list") {
        assert!(task.completed());
    }

    let completed = fixture
        .service
        .complete_case(case_id, &fixture.admin)
        .await
        .expect("revive");
    assert!(!completed);
    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(case.status(), statuses.created());
    // The cascade is one-way: reviving the case does not revive tasks.
    for task in fixture.repository.list_tasks(case_id).await.expect("list") {
        assert!(task.completed());
    }

    let icons: Vec<String> = fixture
        .notifier
        .sent()
        .into_iter()
        .filter(|sent| sent.scope == NotifyScope::CaseOrgs)
        .map(|sent| sent.icon)
        .collect();
    assert_eq!(
        icons,
        ["fa-solid fa-square-check", "fa-solid fa-heart-circle-plus"]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_drops_tasks_files_and_finally_the_log() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;
    let task = fixture
        .service
        .tasks()
        .create_task(task_draft("triage"), case_id, &fixture.admin)
        .await
        .expect("task");
    let _file = fixture
        .service
        .tasks()
        .attach_file(task.id(), "evidence.pcap", b"\x00", &fixture.admin)
        .await
        .expect("attach");

    fixture
        .service
        .delete_case(case_id, &fixture.admin)
        .await
        .expect("delete");

    assert_eq!(fixture.repository.case_count(), 0);
    assert_eq!(fixture.repository.task_count(), 0);
    assert_eq!(fixture.files.object_count(), 0);
    assert!(!fixture.history.has_log(case_id));
    assert!(
        fixture
            .notifier
            .sent()
            .iter()
            .any(|sent| sent.icon == "fa-solid fa-trash")
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn add_orgs_validates_every_org_before_adding_any() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;

    let phantom = crate::case::domain::OrgId::new();
    let result = fixture
        .service
        .add_orgs(case_id, &[fixture.org_b, phantom], &fixture.admin)
        .await;
    assert!(matches!(result, Err(LifecycleError::OrgNotFound(_))));
    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert!(!case.has_org(fixture.org_b));

    fixture
        .service
        .add_orgs(case_id, &[fixture.org_b], &fixture.admin)
        .await
        .expect("add");
    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert!(case.has_org(fixture.org_b));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn adding_an_org_to_a_recurring_case_opts_its_members_in() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;
    fixture
        .service
        .change_recurring(
            RecurringChange::Set(RecurringRule::Daily),
            case_id,
            &fixture.admin,
        )
        .await
        .expect("recurring");

    fixture
        .service
        .add_orgs(case_id, &[fixture.org_b], &fixture.admin)
        .await
        .expect("add");
    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert!(case.watchers().contains(&fixture.bob.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn removing_an_org_strips_its_members_everywhere() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;
    fixture
        .service
        .add_orgs(case_id, &[fixture.org_b], &fixture.admin)
        .await
        .expect("add");
    let task = fixture
        .service
        .tasks()
        .create_task(task_draft("triage"), case_id, &fixture.admin)
        .await
        .expect("task");
    for user in [&fixture.alice, &fixture.bob] {
        fixture
            .service
            .tasks()
            .assign_task(task.id(), user.id(), &fixture.admin, false)
            .await
            .expect("assign");
    }

    fixture
        .service
        .remove_org(case_id, fixture.org_b, &fixture.admin)
        .await
        .expect("remove");

    let task = fixture
        .repository
        .fetch_task(task.id())
        .await
        .expect("fetch")
        .expect("present");
    assert!(task.assignees().contains(&fixture.alice.id()));
    assert!(!task.assignees().contains(&fixture.bob.id()));

    let again = fixture
        .service
        .remove_org(case_id, fixture.org_b, &fixture.admin)
        .await;
    assert!(matches!(again, Err(LifecycleError::OrgNotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn ownership_moves_to_any_existing_org() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;

    let phantom = crate::case::domain::OrgId::new();
    let result = fixture
        .service
        .change_owner(case_id, phantom, &fixture.admin)
        .await;
    assert!(matches!(result, Err(LifecycleError::OrgNotFound(_))));

    // Org B does not participate in the case; the transfer still lands.
    fixture
        .service
        .change_owner(case_id, fixture.org_b, &fixture.admin)
        .await
        .expect("transfer");
    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(case.owner_org(), fixture.org_b);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn recurrence_set_and_remove_drive_status_and_watchers() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;
    let statuses = fixture.service.statuses();

    // A past Monday; from the pinned Tuesday the next Monday is Mar 11.
    let rule = RecurringRule::Weekly {
        date: NaiveDate::from_ymd_opt(2024, 2, 5).expect("date"),
    };
    fixture
        .service
        .change_recurring(RecurringChange::Set(rule), case_id, &fixture.admin)
        .await
        .expect("set");
    let watchers: BTreeSet<_> = [fixture.alice.id()].into();
    fixture
        .service
        .set_recurring_watchers(case_id, &watchers, &fixture.admin)
        .await
        .expect("watchers");

    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(case.status(), statuses.recurring());
    let recurrence = case.recurring().expect("recurrence");
    assert_eq!(recurrence.kind, RecurringKind::Weekly);
    assert_eq!(
        recurrence.anchor,
        NaiveDate::from_ymd_opt(2024, 3, 11).expect("date")
    );
    assert!(recurrence.anchor > today());

    fixture
        .service
        .change_recurring(RecurringChange::Remove, case_id, &fixture.admin)
        .await
        .expect("remove");
    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(case.status(), statuses.created());
    assert!(case.recurring().is_none());
    assert!(case.watchers().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn watchers_must_belong_to_a_participant_org() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;
    let watchers: BTreeSet<_> = [fixture.bob.id()].into();
    let result = fixture
        .service
        .set_recurring_watchers(case_id, &watchers, &fixture.admin)
        .await;
    assert!(matches!(
        result,
        Err(LifecycleError::WatcherNotParticipant { .. })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn links_are_symmetric_and_audited_on_both_cases() {
    let fixture = harness();
    let left = seeded_case(&fixture).await;
    let right = fixture
        .service
        .create_case(draft("second incident"), &fixture.admin)
        .await
        .expect("case")
        .id();

    fixture
        .service
        .link_cases(left, right, &fixture.admin)
        .await
        .expect("link");
    let left_case = fixture
        .repository
        .fetch_case(left)
        .await
        .expect("fetch")
        .expect("present");
    let right_case = fixture
        .repository
        .fetch_case(right)
        .await
        .expect("fetch")
        .expect("present");
    assert!(left_case.links().contains(&right));
    assert!(right_case.links().contains(&left));
    assert!(
        fixture
            .service
            .history(right)
            .await
            .expect("history")
            .iter()
            .any(|entry| entry.message.contains("from the other case"))
    );

    fixture
        .service
        .unlink_cases(left, right, &fixture.admin)
        .await
        .expect("unlink");
    let again = fixture.service.unlink_cases(left, right, &fixture.admin).await;
    assert!(matches!(again, Err(LifecycleError::LinkNotFound { .. })));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pad_url_is_normalised_and_pad_failures_degrade() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;

    assert_eq!(
        fixture.service.pad_notes(case_id).await.expect("no pad"),
        PadNotes::Content(String::new())
    );

    fixture
        .service
        .set_pad_url(case_id, "https://pad.example/s/abc?edit", &fixture.admin)
        .await
        .expect("pad url");
    let case = fixture
        .repository
        .fetch_case(case_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(case.pad_url(), Some("https://pad.example/s/abc"));

    let degraded = harness_with(
        Arc::new(StaticPadClient::failing(PadError::Unreachable(
            "connection refused".to_owned(),
        ))),
        [],
    );
    let other = seeded_case(&degraded).await;
    degraded
        .service
        .set_pad_url(other, "https://pad.example/s/xyz", &degraded.admin)
        .await
        .expect("pad url");
    assert_eq!(
        degraded.service.pad_notes(other).await.expect("degrades"),
        PadNotes::Unreachable
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn notes_digest_renders_a_heading_per_task_with_notes() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;
    for title in ["triage", "contain"] {
        let _task = fixture
            .service
            .tasks()
            .create_task(task_draft(title), case_id, &fixture.admin)
            .await
            .expect("task");
    }
    let first = fixture
        .repository
        .list_tasks(case_id)
        .await
        .expect("list")
        .remove(0);
    for text in ["check the proxy logs", "image the host"] {
        let _note = fixture
            .service
            .tasks()
            .modify_note(first.id(), None, text.to_owned(), &fixture.admin)
            .await
            .expect("note");
    }

    let digest = fixture
        .service
        .task_notes_digest(case_id)
        .await
        .expect("digest");
    assert_eq!(
        digest,
        "# triage\n\n---\n\ncheck the proxy logs\n\n---\n\nimage the host\n\n"
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fork_copies_structure_but_not_state() {
    let fixture = harness();
    let source = fixture
        .service
        .create_case(
            crate::case::domain::CaseDraft {
                associations: tag_selection(&["tlp:red"]),
                ..draft("incident")
            },
            &fixture.admin,
        )
        .await
        .expect("case");
    let task = fixture
        .service
        .tasks()
        .create_task(task_draft("triage"), source.id(), &fixture.admin)
        .await
        .expect("task");
    let _assigned = fixture
        .service
        .tasks()
        .assign_task(task.id(), fixture.alice.id(), &fixture.admin, false)
        .await
        .expect("assign");

    let fork = fixture
        .service
        .fork_case(source.id(), "incident (fork)", &fixture.admin)
        .await
        .expect("fork");

    assert!(fork.associations().tags().contains("tlp:red"));
    assert!(fork.links().is_empty());
    let forked_tasks = fixture
        .repository
        .list_tasks(fork.id())
        .await
        .expect("list");
    assert_eq!(forked_tasks.len(), 1);
    let forked = forked_tasks.first().expect("task");
    assert_eq!(forked.title(), "triage");
    // Assignments stay behind on the source.
    assert!(forked.assignees().is_empty());

    assert!(
        fixture
            .service
            .history(source.id())
            .await
            .expect("history")
            .iter()
            .any(|entry| entry.message.starts_with("Case forked,"))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fork_title_conflict_writes_no_rows() {
    let fixture = harness();
    let source = seeded_case(&fixture).await;
    let _task = fixture
        .service
        .tasks()
        .create_task(task_draft("triage"), source, &fixture.admin)
        .await
        .expect("task");

    let result = fixture
        .service
        .fork_case(source, "incident", &fixture.admin)
        .await;
    assert!(matches!(result, Err(LifecycleError::TitleTaken(_))));
    assert_eq!(fixture.repository.case_count(), 1);
    assert_eq!(fixture.repository.task_count(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn search_pages_are_clamped_and_counted() {
    let fixture = harness();
    for idx in 0..3_u32 {
        let _case = fixture
            .service
            .create_case(draft(&format!("incident {idx}")), &fixture.admin)
            .await
            .expect("case");
    }

    let oversized = crate::case::ports::Page::new(1, 500);
    assert_eq!(oversized.size(), crate::case::ports::MAX_PAGE_SIZE);

    let page = fixture
        .service
        .search(
            &crate::case::ports::CaseFilter::default(),
            crate::case::ports::Page::new(2, 2),
        )
        .await
        .expect("search");
    assert_eq!(page.total, 3);
    assert_eq!(page.pages, 2);
    assert_eq!(page.items.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn history_append_failure_fails_the_operation() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;

    fixture.history.fail_next_appends(true);
    let result = fixture
        .service
        .update_notes(case_id, "observations".to_owned(), &fixture.admin)
        .await;
    assert!(matches!(result, Err(LifecycleError::History(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn notification_failure_never_aborts_the_operation() {
    let fixture = harness();
    let case_id = seeded_case(&fixture).await;

    fixture.notifier.fail_dispatch(true);
    let completed = fixture
        .service
        .complete_case(case_id, &fixture.admin)
        .await
        .expect("dispatch failure is swallowed");
    assert!(completed);
}
