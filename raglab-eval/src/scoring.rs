//! Concurrent answer-quality scoring: grounding and relevance.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use raglab_model::CompletionModel;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{EvalError, Result};

/// Quality scores for one (question, context, answer) triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerScore {
    /// Whether the answer's claims are supported by the context, in `[0, 1]`.
    pub grounding: f64,
    /// Whether the answer addresses the question, in `[0, 1]`.
    pub relevance: f64,
}

/// One scoring input: a question, the context passages the answer was
/// generated from, and the answer itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerTriple {
    /// The question posed.
    pub question: String,
    /// The context passages, joined with newlines before scoring.
    pub context: Vec<String>,
    /// The generated answer.
    pub answer: String,
}

/// Batch-level aggregate of answer scores.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchAnswerScore {
    /// Arithmetic mean of grounding scores across the batch.
    pub mean_grounding: f64,
    /// Arithmetic mean of relevance scores across the batch.
    pub mean_relevance: f64,
    /// Number of triples scored.
    pub num_scored: usize,
}

/// A grounding/relevance scoring service consumed as a black box.
#[async_trait]
pub trait AnswerScorer: Send + Sync {
    /// Score an answer against the context it was generated from and the
    /// question it should address.
    async fn score(
        &self,
        context: &str,
        question: &str,
        answer: &str,
    ) -> anyhow::Result<AnswerScore>;
}

/// Scores (question, context, answer) triples concurrently.
///
/// Dispatches up to `max_concurrency` scoring calls at a time and collects
/// exactly one score per input triple, keyed by input index. The first
/// failure aborts the whole batch — evaluation means are only meaningful
/// over a complete sample, so no partial aggregate is ever produced.
pub struct AnswerEvaluator {
    scorer: Arc<dyn AnswerScorer>,
    max_concurrency: usize,
}

impl AnswerEvaluator {
    /// Create an evaluator over the given scorer.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Config`] if `max_concurrency == 0`.
    pub fn new(scorer: Arc<dyn AnswerScorer>, max_concurrency: usize) -> Result<Self> {
        if max_concurrency == 0 {
            return Err(EvalError::Config("max_concurrency must be at least 1".to_string()));
        }
        Ok(Self { scorer, max_concurrency })
    }

    /// Score every triple and aggregate the means.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Scoring`] naming the index of the first failing
    /// triple; in-flight calls are abandoned and no partial mean escapes.
    pub async fn evaluate_batch(&self, triples: &[AnswerTriple]) -> Result<BatchAnswerScore> {
        if triples.is_empty() {
            return Ok(BatchAnswerScore::default());
        }

        let mut scores: Vec<Option<AnswerScore>> = vec![None; triples.len()];

        let mut in_flight = stream::iter(triples.iter().enumerate().map(|(idx, triple)| {
            let scorer = Arc::clone(&self.scorer);
            async move {
                let joined = triple.context.join("\n");
                let result = scorer.score(&joined, &triple.question, &triple.answer).await;
                (idx, result)
            }
        }))
        .buffer_unordered(self.max_concurrency);

        while let Some((idx, result)) = in_flight.next().await {
            match result {
                Ok(score) => {
                    debug!(index = idx, ?score, "scored triple");
                    scores[idx] = Some(score);
                }
                Err(e) => {
                    return Err(EvalError::Scoring { index: idx, message: format!("{e:#}") });
                }
            }
        }

        let n = triples.len() as f64;
        let (grounding_sum, relevance_sum) = scores
            .iter()
            .flatten()
            .fold((0.0, 0.0), |(g, r), s| (g + s.grounding, r + s.relevance));

        let batch = BatchAnswerScore {
            mean_grounding: grounding_sum / n,
            mean_relevance: relevance_sum / n,
            num_scored: triples.len(),
        };

        info!(
            mean_grounding = batch.mean_grounding,
            mean_relevance = batch.mean_relevance,
            num_scored = batch.num_scored,
            "answer evaluation completed"
        );

        Ok(batch)
    }
}

/// Shape of the judge model's JSON verdict.
#[derive(Deserialize)]
struct ScoreVerdict {
    grounding: f64,
    relevance: f64,
}

/// Extract the first JSON object embedded in model output.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// An [`AnswerScorer`] that judges grounding and relevance with a
/// completion model.
///
/// The judge is asked for a bare JSON object; prose around the object is
/// tolerated, but a missing metric field is a scoring failure.
pub struct LlmAnswerScorer {
    model: Arc<dyn CompletionModel>,
}

impl LlmAnswerScorer {
    /// Create a scorer over the given judge model.
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    fn build_prompt(context: &str, question: &str, answer: &str) -> String {
        format!(
            "You are grading a generated answer.\n\
             Context:\n{context}\n\n\
             Question: {question}\n\
             Answer: {answer}\n\n\
             Reply with only a JSON object of the form \
             {{\"grounding\": <0..1>, \"relevance\": <0..1>}} where grounding \
             measures whether the answer is supported by the context and \
             relevance measures whether it addresses the question."
        )
    }
}

#[async_trait]
impl AnswerScorer for LlmAnswerScorer {
    async fn score(
        &self,
        context: &str,
        question: &str,
        answer: &str,
    ) -> anyhow::Result<AnswerScore> {
        let prompt = Self::build_prompt(context, question, answer);
        let reply = self
            .model
            .complete(&prompt)
            .await
            .with_context(|| format!("judge model '{}' failed", self.model.name()))?;

        let json = extract_json(&reply)
            .ok_or_else(|| anyhow::anyhow!("judge reply contained no JSON object: {reply}"))?;
        let verdict: ScoreVerdict = serde_json::from_str(json)
            .context("judge reply omitted an expected metric")?;

        Ok(AnswerScore {
            grounding: verdict.grounding.clamp(0.0, 1.0),
            relevance: verdict.relevance.clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use raglab_model::MockCompletionModel;

    use super::*;

    /// Parses "g|r" from the answer text, erroring on the answer "fail".
    struct ParsingScorer;

    #[async_trait]
    impl AnswerScorer for ParsingScorer {
        async fn score(
            &self,
            _context: &str,
            _question: &str,
            answer: &str,
        ) -> anyhow::Result<AnswerScore> {
            if answer == "fail" {
                anyhow::bail!("scripted scoring failure");
            }
            let (g, r) = answer.split_once('|').unwrap();
            Ok(AnswerScore { grounding: g.parse()?, relevance: r.parse()? })
        }
    }

    fn triple(answer: &str) -> AnswerTriple {
        AnswerTriple {
            question: "q".into(),
            context: vec!["c1".into(), "c2".into()],
            answer: answer.into(),
        }
    }

    #[tokio::test]
    async fn means_aggregate_across_the_batch() {
        let evaluator = AnswerEvaluator::new(Arc::new(ParsingScorer), 4).unwrap();
        let triples = vec![triple("1.0|0.5"), triple("0.5|0.5"), triple("0.0|0.5")];

        let batch = evaluator.evaluate_batch(&triples).await.unwrap();

        assert_eq!(batch.num_scored, 3);
        assert!((batch.mean_grounding - 0.5).abs() < 1e-9);
        assert!((batch.mean_relevance - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failure_surfaces_the_failing_index() {
        let evaluator = AnswerEvaluator::new(Arc::new(ParsingScorer), 1).unwrap();
        let triples = vec![triple("1.0|1.0"), triple("fail"), triple("0.5|0.5")];

        let err = evaluator.evaluate_batch(&triples).await.unwrap_err();
        match err {
            EvalError::Scoring { index, .. } => assert_eq!(index, 1),
            other => panic!("expected scoring failure, got {other}"),
        }
    }

    #[tokio::test]
    async fn concurrency_level_does_not_change_the_result() {
        let triples = vec![triple("1.0|0.0"), triple("0.0|1.0"), triple("0.5|0.5")];

        let serial = AnswerEvaluator::new(Arc::new(ParsingScorer), 1).unwrap();
        let wide = AnswerEvaluator::new(Arc::new(ParsingScorer), 8).unwrap();

        assert_eq!(
            serial.evaluate_batch(&triples).await.unwrap(),
            wide.evaluate_batch(&triples).await.unwrap()
        );
    }

    #[tokio::test]
    async fn empty_batch_yields_zero_result() {
        let evaluator = AnswerEvaluator::new(Arc::new(ParsingScorer), 4).unwrap();
        assert_eq!(evaluator.evaluate_batch(&[]).await.unwrap(), BatchAnswerScore::default());
    }

    #[tokio::test]
    async fn zero_concurrency_is_rejected() {
        assert!(AnswerEvaluator::new(Arc::new(ParsingScorer), 0).is_err());
    }

    #[tokio::test]
    async fn llm_scorer_parses_judge_json() {
        let judge = Arc::new(MockCompletionModel::with_response(
            r#"Here is my verdict: {"grounding": 0.9, "relevance": 0.8}"#,
        ));
        let scorer = LlmAnswerScorer::new(judge);

        let score = scorer.score("ctx", "q", "a").await.unwrap();
        assert!((score.grounding - 0.9).abs() < 1e-9);
        assert!((score.relevance - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn llm_scorer_rejects_missing_metric() {
        let judge =
            Arc::new(MockCompletionModel::with_response(r#"{"grounding": 0.9}"#));
        let scorer = LlmAnswerScorer::new(judge);

        assert!(scorer.score("ctx", "q", "a").await.is_err());
    }

    #[tokio::test]
    async fn llm_scorer_rejects_non_json_reply() {
        let judge = Arc::new(MockCompletionModel::with_response("looks great!"));
        let scorer = LlmAnswerScorer::new(judge);

        assert!(scorer.score("ctx", "q", "a").await.is_err());
    }
}
