//! File-storage port for task attachments.

use crate::case::domain::FileHandle;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by the file-storage collaborator.
#[derive(Debug, Clone, Error)]
pub enum FileStoreError {
    /// The handle does not name a stored object.
    #[error("no stored object for handle {0}")]
    MissingObject(String),

    /// Storage-layer failure.
    #[error("file storage failure: {0}")]
    Storage(String),
}

/// Byte storage contract. The engine owns the Task↔File association rows;
/// the collaborator owns the bytes.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `bytes` and returns an opaque handle.
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<FileHandle, FileStoreError>;

    /// Retrieves the bytes behind a handle.
    async fn retrieve(&self, handle: &FileHandle) -> Result<Vec<u8>, FileStoreError>;

    /// Deletes the bytes behind a handle.
    async fn delete(&self, handle: &FileHandle) -> Result<(), FileStoreError>;
}
