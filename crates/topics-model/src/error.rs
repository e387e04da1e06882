//! Model layer error types.

use thiserror::Error;

/// Errors that can occur in the decision and pipeline layer.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Zero eligible documents for training; reported, not retried
    #[error("No documents found for training")]
    NoCorpus,

    /// Transform requested with no usable prior model; caller should
    /// fall back to full training
    #[error("No usable model: {0}")]
    NoModel(String),

    /// Exception during fit/persist; the session has been marked failed
    #[error("Training failed for session {session_id}: {message}")]
    Training {
        /// Session that was marked failed
        session_id: String,
        /// Captured failure cause
        message: String,
    },

    /// Per-document LLM classification failure; caught and counted by
    /// the classifier, never aborts a batch
    #[error("Classification error: {0}")]
    Classification(String),

    /// Clustering backend error
    #[error("Cluster backend error: {0}")]
    Backend(String),

    /// LLM capability error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] topics_storage::StorageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
