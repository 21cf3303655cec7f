//! Error types for the `raglab-model` crate.

use thiserror::Error;

/// Errors that can occur when calling a completion model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A configuration validation error (missing API key, empty model name).
    #[error("Model configuration error: {0}")]
    Config(String),

    /// The completion service failed or returned an unparseable response.
    #[error("Completion error ({provider}): {message}")]
    Completion {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion service returned an empty or whitespace-only answer.
    #[error("Completion service ({provider}) returned an empty response")]
    EmptyResponse {
        /// The provider that produced the empty response.
        provider: String,
    },
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
