//! Collaborative case and task lifecycle management.
//!
//! Cases are investigation containers owned by an organisation and worked
//! by participant orgs; tasks are the units of work inside them. This
//! module covers the full lifecycle: creation (from scratch or from
//! templates), editing with association reconciliation, the completion
//! toggle and its task cascade, recurrence scheduling, symmetric case
//! links, forking, connector-module invocation, and the per-case audit
//! trail. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
