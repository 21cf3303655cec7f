//! # raglab-model
//!
//! Completion model integrations for the raglab evaluation harness.
//!
//! The [`CompletionModel`] trait is the generation-service seam: the
//! harness drives it for answer generation and (via the LLM judge in
//! `raglab-eval`) answer scoring. Provided implementations:
//!
//! - [`OpenAICompletionModel`] — OpenAI and OpenAI-compatible chat APIs
//!   (feature `openai`, enabled by default)
//! - [`MockCompletionModel`] — scripted model for tests

pub mod completion;
pub mod error;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use completion::CompletionModel;
pub use error::{ModelError, Result};
pub use mock::MockCompletionModel;
#[cfg(feature = "openai")]
pub use openai::OpenAICompletionModel;
