//! Collaborative-pad (Hedgedoc) client port.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised fetching a pad document. The engine degrades these to an
/// empty/error payload; they never propagate to its caller.
#[derive(Debug, Clone, Error)]
pub enum PadError {
    /// The pad responded but the document is gone.
    #[error("pad document not found")]
    NotFound,

    /// Network or protocol failure reaching the pad.
    #[error("pad unreachable: {0}")]
    Unreachable(String),
}

/// Pad download contract.
#[async_trait]
pub trait PadClient: Send + Sync {
    /// Fetches the Markdown body of `{url}/download`.
    async fn download(&self, url: &str) -> Result<String, PadError>;
}
