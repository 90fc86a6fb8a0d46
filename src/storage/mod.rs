pub mod blob;
pub mod hybrid;
pub mod local;
pub mod retry;

use thiserror::Error;

pub use blob::{BlobStore, S3BlobStore};
pub use hybrid::{HealthReport, HybridStorage, SessionPatch};
pub use local::LocalBlobStore;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StorageError::NotFound(what.into())
    }

    /// Retry eligibility for the read-side backoff wrapper. A just-written
    /// record can be invisible to reads for a moment (object-store eventual
    /// consistency), and a flaky backend can fail a fetch outright; both are
    /// worth masking. Validation and conflict errors never are.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::NotFound(_) | StorageError::Backend(_))
    }
}
