//! Error taxonomy for memory operations.
//!
//! [`MemoryError`] is what the storage layer and the service return. Embedding
//! failures have their own type ([`crate::embedding::EmbeddingError`]) because the
//! search engine absorbs them instead of propagating.

/// Errors surfaced to callers of the memory service.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Malformed or missing input. Never retried.
    #[error("{0}")]
    Validation(String),
    /// Underlying SQLite failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    /// Filesystem failure around the database file.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    /// Lock poisoning, join failures and the like.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MemoryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<tokio::task::JoinError> for MemoryError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {e}"))
    }
}

pub type Result<T, E = MemoryError> = std::result::Result<T, E>;
