//! Port contracts for the case/task lifecycle engines.
//!
//! Ports define infrastructure-agnostic interfaces for the external
//! collaborators: the transactional repository, the notification
//! dispatcher, connector modules, file storage, and the collaborative pad.

pub mod files;
pub mod module;
pub mod notifier;
pub mod pad;
pub mod repository;

pub use files::{FileStore, FileStoreError};
pub use module::{CaseModule, InstanceBinding, ModuleError, ModuleOutcome, ModuleRegistry};
pub use notifier::{Notifier, NotifyError};
pub use pad::{PadClient, PadError};
pub use repository::{
    CaseFilter, CaseRepository, CaseSort, MAX_PAGE_SIZE, Page, PageOf, RepositoryError,
    RepositoryResult, UserInstance,
};
