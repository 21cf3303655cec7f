//! Completion model trait for text generation services.

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation service consumed as a black box.
///
/// The async form serves both batch evaluation (driven concurrently) and
/// one-off callers (who may block on it). Implementations perform no
/// retries; a failed call surfaces to the caller.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Completion`](crate::error::ModelError::Completion)
    /// when the service fails and
    /// [`ModelError::EmptyResponse`](crate::error::ModelError::EmptyResponse)
    /// when it produces empty output.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// A short name identifying this model in logs and error messages.
    fn name(&self) -> &str;
}
