//! End-to-end evaluation harness.
//!
//! The [`EvalHarness`] compares candidate retrievers on Hit Rate and MRR,
//! feeds the best one's context into answer generation, and scores the
//! generated answers for grounding and relevance. Construct one via
//! [`EvalHarness::builder()`].
//!
//! # Example
//!
//! ```rust,ignore
//! use raglab_eval::{EvalConfig, EvalHarness, LlmAnswerScorer, LogSink};
//!
//! let harness = EvalHarness::builder()
//!     .config(EvalConfig::default())
//!     .corpus(corpus)
//!     .retriever("dense", dense)
//!     .retriever("hybrid", hybrid)
//!     .model(model)
//!     .scorer(Arc::new(LlmAnswerScorer::new(judge)))
//!     .sink(Arc::new(LogSink))
//!     .build()?;
//!
//! let report = harness.run(&examples).await?;
//! ```

use std::sync::Arc;

use raglab_model::CompletionModel;
use raglab_retrieval::{Corpus, Document, RankedHit, RetrievalError, Retriever};
use tracing::{info, warn};

use crate::config::EvalConfig;
use crate::dataset::EvaluationExample;
use crate::error::{EvalError, Result};
use crate::generation::AnswerGenerator;
use crate::retrieval::{EvaluationResult, RetrievalEvaluator};
use crate::scoring::{AnswerEvaluator, AnswerScorer, AnswerTriple, BatchAnswerScore};
use crate::sink::MetricsSink;

/// The outcome of one harness run.
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Retrieval metrics per candidate, in registration order.
    pub retrieval: Vec<(String, EvaluationResult)>,
    /// Name of the candidate selected for answer generation.
    pub best_retriever: String,
    /// Aggregate answer-quality scores for the selected candidate.
    pub answers: BatchAnswerScore,
}

/// Orchestrates retrieval comparison, answer generation, and answer scoring.
pub struct EvalHarness {
    config: EvalConfig,
    corpus: Arc<Corpus>,
    retrievers: Vec<(String, Arc<dyn Retriever>)>,
    generator: AnswerGenerator,
    answer_evaluator: AnswerEvaluator,
    sink: Option<Arc<dyn MetricsSink>>,
}

impl std::fmt::Debug for EvalHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalHarness")
            .field("config", &self.config)
            .field("retrievers", &self.retrievers.len())
            .finish_non_exhaustive()
    }
}

impl EvalHarness {
    /// Create a new [`EvalHarnessBuilder`].
    pub fn builder() -> EvalHarnessBuilder {
        EvalHarnessBuilder::default()
    }

    /// Record a metric, degrading gracefully when the sink is unavailable.
    async fn record(&self, metric: &str, value: f64) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record(&self.config.run_name, metric, value).await {
                warn!(metric, error = %e, "metrics sink unavailable");
            }
        }
    }

    /// Resolve ranked hits into corpus documents.
    ///
    /// An id the corpus does not know is malformed retriever output.
    fn resolve_context(
        &self,
        retriever_name: &str,
        question: &str,
        hits: &[RankedHit],
    ) -> Result<Vec<Document>> {
        hits.iter()
            .map(|hit| {
                self.corpus.get(&hit.document_id).cloned().ok_or_else(|| {
                    EvalError::Retrieval(RetrievalError::Retrieval {
                        retriever: retriever_name.to_string(),
                        message: format!(
                            "unknown document id '{}' for query '{question}'",
                            hit.document_id
                        ),
                    })
                })
            })
            .collect()
    }

    /// Run the full evaluation over `examples`.
    ///
    /// 1. Evaluate every candidate retriever (Hit Rate, MRR).
    /// 2. Select the best candidate by MRR (ties fall to registration order).
    /// 3. Generate answers from the best candidate's context, with bounded
    ///    concurrency.
    /// 4. Score all (question, context, answer) triples concurrently.
    ///
    /// Metrics are recorded to the sink at each step. Any retrieval,
    /// generation, or scoring failure fails the whole run.
    pub async fn run(&self, examples: &[EvaluationExample]) -> Result<EvalReport> {
        let evaluator = RetrievalEvaluator::new(self.config.top_k);

        let mut retrieval = Vec::with_capacity(self.retrievers.len());
        for (name, retriever) in &self.retrievers {
            let result = evaluator.evaluate(retriever.as_ref(), examples).await?;
            self.record(&format!("{name}/hit_rate"), result.hit_rate).await;
            self.record(&format!("{name}/mrr"), result.mrr).await;
            retrieval.push((name.clone(), result));
        }

        let mut best_idx = 0;
        for (idx, (_, result)) in retrieval.iter().enumerate() {
            if result.mrr > retrieval[best_idx].1.mrr {
                best_idx = idx;
            }
        }
        let (best_name, best_retriever) = &self.retrievers[best_idx];
        info!(best_retriever = %best_name, mrr = retrieval[best_idx].1.mrr, "selected retriever");

        let mut items = Vec::with_capacity(examples.len());
        for example in examples {
            let hits = best_retriever.retrieve(&example.question, self.config.top_k).await?;
            let context = self.resolve_context(best_name, &example.question, &hits)?;
            items.push((example.question.clone(), context));
        }

        let generated =
            self.generator.generate_batch(items, self.config.max_concurrency).await?;

        let triples: Vec<AnswerTriple> = examples
            .iter()
            .zip(&generated)
            .map(|(example, answer)| AnswerTriple {
                question: example.question.clone(),
                context: answer.context_used.iter().map(|d| d.text.clone()).collect(),
                answer: answer.answer.clone(),
            })
            .collect();

        let answers = self.answer_evaluator.evaluate_batch(&triples).await?;
        self.record("mean_grounding", answers.mean_grounding).await;
        self.record("mean_relevance", answers.mean_relevance).await;

        info!(
            best_retriever = %best_name,
            mean_grounding = answers.mean_grounding,
            mean_relevance = answers.mean_relevance,
            "evaluation run completed"
        );

        Ok(EvalReport { retrieval, best_retriever: best_name.clone(), answers })
    }
}

/// Builder for constructing an [`EvalHarness`].
///
/// `corpus`, at least one `retriever`, `model`, and `scorer` are required;
/// `config` defaults and `sink` is optional.
#[derive(Default)]
pub struct EvalHarnessBuilder {
    config: Option<EvalConfig>,
    corpus: Option<Arc<Corpus>>,
    retrievers: Vec<(String, Arc<dyn Retriever>)>,
    model: Option<Arc<dyn CompletionModel>>,
    scorer: Option<Arc<dyn AnswerScorer>>,
    sink: Option<Arc<dyn MetricsSink>>,
}

impl EvalHarnessBuilder {
    /// Set the run configuration.
    pub fn config(mut self, config: EvalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document corpus used to resolve retrieved ids.
    pub fn corpus(mut self, corpus: Arc<Corpus>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Register a named candidate retriever. Call once per candidate.
    pub fn retriever(mut self, name: impl Into<String>, retriever: Arc<dyn Retriever>) -> Self {
        self.retrievers.push((name.into(), retriever));
        self
    }

    /// Set the completion model used for answer generation.
    pub fn model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the grounding/relevance scoring service.
    pub fn scorer(mut self, scorer: Arc<dyn AnswerScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Set an optional metrics sink for experiment tracking.
    pub fn sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the [`EvalHarness`], validating that all required parts are set.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Config`] if the corpus, model, or scorer is
    /// missing, or no retriever was registered.
    pub fn build(self) -> Result<EvalHarness> {
        let config = match self.config {
            Some(config) => config,
            None => EvalConfig::builder().build()?,
        };
        let corpus =
            self.corpus.ok_or_else(|| EvalError::Config("corpus is required".to_string()))?;
        if self.retrievers.is_empty() {
            return Err(EvalError::Config("at least one retriever is required".to_string()));
        }
        let model =
            self.model.ok_or_else(|| EvalError::Config("model is required".to_string()))?;
        let scorer =
            self.scorer.ok_or_else(|| EvalError::Config("scorer is required".to_string()))?;

        let answer_evaluator = AnswerEvaluator::new(scorer, config.max_concurrency)?;

        Ok(EvalHarness {
            generator: AnswerGenerator::new(model),
            answer_evaluator,
            config,
            corpus,
            retrievers: self.retrievers,
            sink: self.sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raglab_model::MockCompletionModel;
    use crate::scoring::AnswerScore;

    struct FixedScorer;

    #[async_trait::async_trait]
    impl AnswerScorer for FixedScorer {
        async fn score(
            &self,
            _context: &str,
            _question: &str,
            _answer: &str,
        ) -> anyhow::Result<AnswerScore> {
            Ok(AnswerScore { grounding: 1.0, relevance: 1.0 })
        }
    }

    #[test]
    fn builder_requires_all_components() {
        let result = EvalHarness::builder().build();
        assert!(matches!(result.unwrap_err(), EvalError::Config(_)));

        let result = EvalHarness::builder()
            .corpus(Arc::new(Corpus::default()))
            .model(Arc::new(MockCompletionModel::with_response("a")))
            .scorer(Arc::new(FixedScorer))
            .build();
        assert!(matches!(result.unwrap_err(), EvalError::Config(_)));
    }
}
