//! Connector module port: opaque external capabilities invoked with a
//! case snapshot.

use crate::case::domain::{CaseSnapshot, User};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// The connector-instance binding handed to a module invocation: the
/// instance name, the per-case identifier (external reference) if one is
/// already stored, and the acting user's API key for that instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceBinding {
    /// Configured instance name.
    pub name: String,
    /// Stored or caller-supplied external reference.
    pub identifier: Option<String>,
    /// Acting user's credential for the instance.
    pub api_key: Option<String>,
}

/// What a module invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    /// The external reference to persist as the instance's per-case
    /// identifier (`None` when the module produced nothing to store).
    Reference(Option<String>),
    /// A structured error payload; aborts further instance processing and
    /// is returned to the caller verbatim.
    Failure(Value),
}

/// Transport or execution failure talking to a module. Fail-fast; the
/// engine never retries.
#[derive(Debug, Clone, Error)]
#[error("module invocation failed: {0}")]
pub struct ModuleError(pub String);

/// An external connector module.
#[async_trait]
pub trait CaseModule: Send + Sync {
    /// Invokes the module against one configured instance.
    async fn invoke(
        &self,
        instance: &InstanceBinding,
        case: &CaseSnapshot,
        actor: &User,
    ) -> Result<ModuleOutcome, ModuleError>;
}

/// Capability table of configured modules, injected into the case
/// lifecycle engine at construction instead of living in global state.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<dyn CaseModule>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Registers a module under `name`, replacing any previous entry.
    #[must_use]
    pub fn with_module(mut self, name: impl Into<String>, module: Arc<dyn CaseModule>) -> Self {
        self.modules.insert(name.into(), module);
        self
    }

    /// Looks up a module by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CaseModule>> {
        self.modules.get(name)
    }

    /// Returns the registered module names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}
