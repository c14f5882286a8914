//! Error types for case domain validation.

use thiserror::Error;

/// Errors returned while constructing or mutating domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaseDomainError {
    /// The case or task title is empty after trimming.
    #[error("title must not be empty")]
    EmptyTitle,

    /// A date computation left the range `chrono` can represent.
    #[error("date arithmetic out of range")]
    DateOutOfRange,
}
