//! Retrieval-quality evaluation: Hit Rate and Mean Reciprocal Rank.

use raglab_retrieval::Retriever;
use tracing::{debug, info};

use crate::dataset::EvaluationExample;
use crate::error::Result;

/// Aggregate retrieval metrics over one evaluation pass.
///
/// Always built from a complete pass over the example set, never partially
/// updated. Both metrics are bounded to `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationResult {
    /// Fraction of examples whose reference document appeared anywhere in
    /// the retrieved list.
    pub hit_rate: f64,
    /// Mean of reciprocal ranks; a miss contributes 0 and the denominator is
    /// always the full example count.
    pub mrr: f64,
    /// Number of examples evaluated.
    pub num_examples: usize,
}

impl std::fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Retrieval metrics ({} examples):", self.num_examples)?;
        writeln!(f, "  Hit Rate: {:.4}", self.hit_rate)?;
        writeln!(f, "  MRR: {:.4}", self.mrr)
    }
}

/// Computes Hit Rate and MRR for a retriever over a labeled example set.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalEvaluator {
    top_k: usize,
}

impl RetrievalEvaluator {
    /// Create an evaluator that requests `top_k` hits per query.
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    /// Evaluate `retriever` over `examples`.
    ///
    /// For each example the reference document is located by its first
    /// (lowest-index) occurrence in the returned id list, so duplicate ids
    /// cannot inflate the metric. A deterministic retriever yields an
    /// identical result on every call.
    ///
    /// # Errors
    ///
    /// A single failed retrieval fails the whole run — skipping the example
    /// would silently bias the metric. No retries are attempted.
    pub async fn evaluate(
        &self,
        retriever: &dyn Retriever,
        examples: &[EvaluationExample],
    ) -> Result<EvaluationResult> {
        if examples.is_empty() {
            return Ok(EvaluationResult::default());
        }

        let mut hits = 0usize;
        let mut reciprocal_rank_sum = 0.0f64;

        for example in examples {
            let ranked = retriever.retrieve(&example.question, self.top_k).await?;
            let position =
                ranked.iter().position(|hit| hit.document_id == example.ref_doc_id);

            match position {
                Some(idx) => {
                    hits += 1;
                    reciprocal_rank_sum += 1.0 / (idx + 1) as f64;
                }
                None => {
                    debug!(
                        retriever = retriever.name(),
                        ref_doc_id = %example.ref_doc_id,
                        "reference document not retrieved"
                    );
                }
            }
        }

        let n = examples.len() as f64;
        let result = EvaluationResult {
            hit_rate: hits as f64 / n,
            mrr: reciprocal_rank_sum / n,
            num_examples: examples.len(),
        };

        info!(
            retriever = retriever.name(),
            hit_rate = result.hit_rate,
            mrr = result.mrr,
            num_examples = result.num_examples,
            "retrieval evaluation completed"
        );

        Ok(result)
    }
}
