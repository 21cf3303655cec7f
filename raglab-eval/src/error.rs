//! Error types for the `raglab-eval` crate.

use raglab_retrieval::RetrievalError;
use thiserror::Error;

/// Errors that can occur while running an evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A configuration validation error (zero top-k, zero concurrency,
    /// missing harness component).
    #[error("Evaluation configuration error: {0}")]
    Config(String),

    /// An evaluation dataset could not be read or parsed.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// A retrieval call failed during an evaluation pass. The whole run
    /// fails; skipping the example would bias the metric.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Answer generation failed or produced empty output.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The grounding/relevance scoring service failed for the triple at
    /// `index`. The whole batch fails; no partial mean is produced.
    #[error("Scoring failed for triple {index}: {message}")]
    Scoring {
        /// The input index of the failing triple.
        index: usize,
        /// A description of the failure.
        message: String,
    },
}

/// A convenience result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
