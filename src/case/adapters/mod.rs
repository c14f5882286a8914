//! Infrastructure adapters implementing the port contracts.

pub mod memory;
