//! Error types for the `raglab-retrieval` crate.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Malformed fusion weights, mismatched retriever/weight counts, or a
    /// non-positive `k`.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector index backend.
    #[error("Vector index error ({backend}): {message}")]
    VectorIndex {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A retriever call failed or returned malformed data.
    #[error("Retrieval failed ({retriever}): {message}")]
    Retrieval {
        /// The retriever that produced the error.
        retriever: String,
        /// A description of the failure.
        message: String,
    },

    /// A persisted index was missing when reuse was requested, corrupt on
    /// load, or would be silently overwritten.
    #[error("Index state error: {0}")]
    IndexState(String),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;
