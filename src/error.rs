//! Error taxonomy for the retrieval and generation pipeline.
//!
//! Every fallible library operation returns [`Result`]. Errors are never
//! retried or swallowed inside the pipeline; they propagate to the caller
//! verbatim and the HTTP boundary turns them into a failure response.

use thiserror::Error;

/// Errors raised by indexing, retrieval, and generation.
#[derive(Debug, Error)]
pub enum RagError {
    /// A record is malformed or incomplete.
    #[error("validation error: {0}")]
    Validation(String),

    /// An embedding's length disagrees with the collection's dimensionality.
    #[error("dimension mismatch in collection '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    /// A query or lookup named a collection that was never created.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The query embedder is not the model the collection was built with.
    #[error("collection '{collection}' was built with model '{expected}', query embedder is '{actual}'")]
    ModelMismatch {
        collection: String,
        expected: String,
        actual: String,
    },

    /// The selected generation backend cannot be reached or loaded.
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// The backend answered, but with an error status or an unreadable body.
    #[error("{backend} backend error: {message}")]
    BackendResponse { backend: String, message: String },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub(crate) fn unavailable(backend: &str, reason: impl ToString) -> Self {
        RagError::BackendUnavailable {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn response(backend: &str, message: impl ToString) -> Self {
        RagError::BackendResponse {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }
}
