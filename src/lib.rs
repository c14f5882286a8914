//! Caseflow: collaborative investigation case management.
//!
//! This crate provides the core engine for managing investigation cases
//! and their tasks: lifecycle state, cascading completion, recurrence
//! scheduling, templates, forking, connector modules, and a per-case
//! audit trail.
//!
//! # Architecture
//!
//! Caseflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (storage, modules,
//!   notification, the collaborative pad)
//!
//! # Modules
//!
//! - [`case`]: Case and task lifecycle engines
//! - [`history`]: Append-only per-case audit trail

pub mod case;
pub mod history;
