//! Answer generation from retrieved context.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use raglab_model::CompletionModel;
use raglab_retrieval::Document;
use tracing::{debug, error};

use crate::error::{EvalError, Result};

/// A generated answer paired with the exact context that produced it.
///
/// Grounding is scored against the context actually given to the model, so
/// the pairing is preserved here rather than recomputed downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    /// The model's raw text answer.
    pub answer: String,
    /// The ordered context documents embedded in the prompt.
    pub context_used: Vec<Document>,
}

/// Generates answers by prompting a completion model with retrieved context.
pub struct AnswerGenerator {
    model: Arc<dyn CompletionModel>,
}

/// Build the generation prompt: numbered context passages, then the question.
fn build_prompt(question: &str, context: &[Document]) -> String {
    let mut prompt = String::from(
        "Answer the question using only the context passages below.\n\nContext:\n",
    );
    for (idx, doc) in context.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", idx + 1, doc.text));
    }
    prompt.push_str(&format!("\nQuestion: {question}\nAnswer:"));
    prompt
}

impl AnswerGenerator {
    /// Create a generator over the given completion model.
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Generate an answer for `question` grounded in `context`.
    ///
    /// Returns the answer together with the exact context list embedded in
    /// the prompt.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Generation`] if the model call fails or produces
    /// an empty answer. No retries are attempted; callers may wrap with
    /// retry externally.
    pub async fn generate(
        &self,
        question: &str,
        context: &[Document],
    ) -> Result<GeneratedAnswer> {
        let prompt = build_prompt(question, context);

        let answer = self.model.complete(&prompt).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "generation call failed");
            EvalError::Generation(e.to_string())
        })?;

        if answer.trim().is_empty() {
            return Err(EvalError::Generation(format!(
                "model '{}' returned an empty answer",
                self.model.name()
            )));
        }

        debug!(model = self.model.name(), answer_len = answer.len(), "generated answer");

        Ok(GeneratedAnswer { answer, context_used: context.to_vec() })
    }

    /// Generate answers for a batch of independent (question, context)
    /// pairs with up to `max_concurrency` calls in flight.
    ///
    /// Results are returned in input order — collection is index-keyed,
    /// never completion-order-keyed.
    ///
    /// # Errors
    ///
    /// Fail-fast: the first failed generation aborts the batch and in-flight
    /// calls are abandoned; no partial result escapes.
    pub async fn generate_batch(
        &self,
        items: Vec<(String, Vec<Document>)>,
        max_concurrency: usize,
    ) -> Result<Vec<GeneratedAnswer>> {
        let total = items.len();
        let mut results: Vec<Option<GeneratedAnswer>> = Vec::new();
        results.resize_with(total, || None);

        let mut in_flight = stream::iter(items.into_iter().enumerate().map(
            |(idx, (question, context))| async move {
                (idx, self.generate(&question, &context).await)
            },
        ))
        .buffer_unordered(max_concurrency.max(1));

        while let Some((idx, result)) = in_flight.next().await {
            match result {
                Ok(generated) => results[idx] = Some(generated),
                Err(e) => {
                    return Err(EvalError::Generation(format!("batch item {idx}: {e}")));
                }
            }
        }

        debug!(count = total, "generated answer batch");
        Ok(results.into_iter().flatten().collect())
    }
}
