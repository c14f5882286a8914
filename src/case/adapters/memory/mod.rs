//! In-memory adapters for every port, used by tests and demos.

mod collaborators;
mod repository;

pub use collaborators::{
    InMemoryFileStore, NotifyScope, RecordedInvocation, RecordedNotification, RecordingNotifier,
    ScriptedModule, StaticPadClient,
};
pub use repository::InMemoryCaseRepository;
