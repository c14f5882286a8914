//! Shared fixtures for the case lifecycle tests.

use crate::case::adapters::memory::{
    InMemoryCaseRepository, InMemoryFileStore, RecordingNotifier, ScriptedModule, StaticPadClient,
};
use crate::case::domain::{
    AssociationKind, AssociationSelection, CaseDraft, Org, OrgId, StatusVocabulary, TaskDraft,
    User, UserId,
};
use crate::case::ports::{ModuleOutcome, ModuleRegistry, PadClient};
use crate::case::services::CaseLifecycleService;
use crate::history::InMemoryHistory;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use mockable::Clock;
use std::sync::{Arc, RwLock};

/// Deterministic clock pinned to a settable instant.
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Pins the clock to midnight UTC on `date`.
    pub fn at(date: NaiveDate) -> Self {
        Self {
            now: RwLock::new(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())),
        }
    }

    /// Moves the pinned instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut now) = self.now.write() {
            *now = instant;
        }
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now.read().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// A Tuesday, so weekday arithmetic in the tests is easy to eyeball.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

/// Everything a lifecycle test needs, wired over in-memory adapters.
pub struct Harness {
    pub repository: Arc<InMemoryCaseRepository>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub history: Arc<InMemoryHistory<FixedClock>>,
    pub files: Arc<InMemoryFileStore>,
    pub module: Arc<ScriptedModule>,
    pub service: CaseLifecycleService<InMemoryCaseRepository, FixedClock>,
    pub admin: User,
    pub alice: User,
    pub bob: User,
    pub org_a: OrgId,
    pub org_b: OrgId,
}

/// Builds a harness whose scripted module replays `outcomes` and whose pad
/// client is `pad`.
pub fn harness_with(
    pad: Arc<dyn PadClient>,
    outcomes: impl IntoIterator<Item = ModuleOutcome>,
) -> Harness {
    let repository = Arc::new(InMemoryCaseRepository::new());
    let clock = Arc::new(FixedClock::at(today()));
    let notifier = Arc::new(RecordingNotifier::new());
    let history = Arc::new(InMemoryHistory::new(Arc::clone(&clock)));
    let files = Arc::new(InMemoryFileStore::new());
    let module = Arc::new(ScriptedModule::new(outcomes));

    let org_a = OrgId::new();
    let org_b = OrgId::new();
    repository.seed_org(Org::new(org_a, "Orange CERT".to_owned()));
    repository.seed_org(Org::new(org_b, "Blue CERT".to_owned()));

    let admin = User::new(UserId::new(), "admin".to_owned(), org_a, true);
    let alice = User::new(UserId::new(), "alice".to_owned(), org_a, false);
    let bob = User::new(UserId::new(), "bob".to_owned(), org_b, false);
    for user in [&admin, &alice, &bob] {
        repository.seed_user(user.clone());
    }

    for tag in ["tlp:red", "tlp:green"] {
        repository.seed_key(AssociationKind::Tag, tag);
    }
    repository.seed_key(AssociationKind::Cluster, "apt29");
    repository.seed_key(AssociationKind::CustomTag, "internal");
    for instance in ["misp-local", "misp-remote"] {
        repository.seed_key(AssociationKind::Connector, instance);
    }
    repository.seed_entitlement(alice.id(), "misp-local", "alice-key");
    repository.seed_entitlement(admin.id(), "misp-local", "admin-key");
    repository.seed_entitlement(admin.id(), "misp-remote", "admin-key");

    let registry = ModuleRegistry::new().with_module("misp", Arc::clone(&module) as _);
    let service = CaseLifecycleService::new(
        Arc::clone(&repository),
        Arc::clone(&clock),
        Arc::clone(&notifier) as _,
        Arc::clone(&history) as _,
        Arc::clone(&files) as _,
        pad,
        registry,
        StatusVocabulary::default(),
    );

    Harness {
        repository,
        clock,
        notifier,
        history,
        files,
        module,
        service,
        admin,
        alice,
        bob,
        org_a,
        org_b,
    }
}

/// Builds the default harness: pad serving an empty body, no scripted
/// module outcomes.
pub fn harness() -> Harness {
    harness_with(Arc::new(StaticPadClient::serving(String::new())), [])
}

/// A minimal case draft titled `title`.
pub fn draft(title: &str) -> CaseDraft {
    CaseDraft {
        title: title.to_owned(),
        description: "demo case".to_owned(),
        ..CaseDraft::default()
    }
}

/// A minimal task draft titled `title`.
pub fn task_draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_owned(),
        description: "demo task".to_owned(),
        ..TaskDraft::default()
    }
}

/// A selection carrying only the given tags.
pub fn tag_selection(tags: &[&str]) -> AssociationSelection {
    AssociationSelection {
        tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
        ..AssociationSelection::default()
    }
}
