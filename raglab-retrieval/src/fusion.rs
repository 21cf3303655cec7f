//! Weighted rank fusion across multiple retrievers.
//!
//! Per-retriever score scales (BM25 vs. cosine similarity) are not
//! comparable, so fusion weights by retriever instead of by raw score: each
//! retriever's top-`k` list is an implicit vote, and a document's fused score
//! is the sum of the normalized weights of the retrievers that returned it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::document::RankedHit;
use crate::error::{RetrievalError, Result};
use crate::retriever::Retriever;

/// Merges ranked lists from multiple retrievers into one combined ranking.
///
/// Pure function of its inputs plus the retriever calls; holds no mutable
/// cross-call state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankFusionEngine;

/// Accumulated fusion state for one document.
struct FusedEntry {
    score: f32,
    /// Normalized weight of the highest-weighted retriever that returned
    /// the document.
    best_weight: f32,
    /// The document's 1-based rank within that retriever's list.
    best_rank: usize,
}

/// Validate retriever/weight counts and weight values.
fn validate(retriever_count: usize, weights: &[f32], k: usize) -> Result<Vec<f32>> {
    if retriever_count == 0 {
        return Err(RetrievalError::InvalidConfiguration(
            "at least one retriever is required".to_string(),
        ));
    }
    if weights.len() != retriever_count {
        return Err(RetrievalError::InvalidConfiguration(format!(
            "{} retrievers but {} weights",
            retriever_count,
            weights.len()
        )));
    }
    if k == 0 {
        return Err(RetrievalError::InvalidConfiguration(
            "k must be at least 1".to_string(),
        ));
    }
    if let Some(w) = weights.iter().find(|w| **w < 0.0 || !w.is_finite()) {
        return Err(RetrievalError::InvalidConfiguration(format!(
            "weights must be non-negative and finite, got {w}"
        )));
    }
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return Err(RetrievalError::InvalidConfiguration(
            "fusion weights must sum to a positive value".to_string(),
        ));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

impl RankFusionEngine {
    /// Create a fusion engine.
    pub fn new() -> Self {
        Self
    }

    /// Fuse the top-`k` lists of `retrievers` for `query` under `weights`.
    ///
    /// Weights are normalized internally and must pair one-to-one with the
    /// retrievers. Each retriever contributes its normalized weight once per
    /// document it returned; documents returned by no retriever are absent
    /// from the result. Ties are broken by the lowest original rank in the
    /// highest-weighted retriever that returned the document (first
    /// registered wins among equal weights), then by document id, so
    /// identical inputs always produce identical output.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidConfiguration`] for mismatched
    /// retriever/weight counts, `k == 0`, negative weights, or all-zero
    /// weights. A failed retriever call is propagated as-is.
    pub async fn fuse(
        &self,
        query: &str,
        retrievers: &[Arc<dyn Retriever>],
        weights: &[f32],
        k: usize,
    ) -> Result<Vec<RankedHit>> {
        let normalized = validate(retrievers.len(), weights, k)?;

        let mut fused: HashMap<String, FusedEntry> = HashMap::new();
        for (retriever, &weight) in retrievers.iter().zip(&normalized) {
            let hits = retriever.retrieve(query, k).await?;
            debug!(
                retriever = retriever.name(),
                weight,
                hit_count = hits.len(),
                "collected candidate list"
            );

            let mut seen_this_retriever: HashSet<&str> = HashSet::new();
            for hit in &hits {
                // A duplicate id within one list only votes once, at its
                // first (best) rank.
                if !seen_this_retriever.insert(&hit.document_id) {
                    continue;
                }
                fused
                    .entry(hit.document_id.clone())
                    .and_modify(|entry| {
                        entry.score += weight;
                        if weight > entry.best_weight {
                            entry.best_weight = weight;
                            entry.best_rank = hit.rank;
                        }
                    })
                    .or_insert(FusedEntry {
                        score: weight,
                        best_weight: weight,
                        best_rank: hit.rank,
                    });
            }
        }

        // Zero-weight retrievers contribute nothing; drop their orphans.
        let mut combined: Vec<(String, FusedEntry)> =
            fused.into_iter().filter(|(_, entry)| entry.score > 0.0).collect();

        combined.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.best_rank.cmp(&b.1.best_rank))
                .then_with(|| a.0.cmp(&b.0))
        });
        combined.truncate(k);

        Ok(combined
            .into_iter()
            .enumerate()
            .map(|(idx, (document_id, entry))| RankedHit {
                document_id,
                score: entry.score,
                rank: idx + 1,
            })
            .collect())
    }
}

/// Adapts a [`RankFusionEngine`] plus its retrievers and weights to the
/// [`Retriever`] trait, so fused ranking can be consumed anywhere a single
/// retriever is expected.
pub struct HybridRetriever {
    name: String,
    engine: RankFusionEngine,
    retrievers: Vec<Arc<dyn Retriever>>,
    weights: Vec<f32>,
}

impl HybridRetriever {
    /// Create a hybrid retriever over `retrievers` with one weight each.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidConfiguration`] under the same rules
    /// as [`RankFusionEngine::fuse`] (count mismatch, negative or all-zero
    /// weights).
    pub fn new(retrievers: Vec<Arc<dyn Retriever>>, weights: Vec<f32>) -> Result<Self> {
        validate(retrievers.len(), &weights, 1)?;
        Ok(Self { name: "hybrid".to_string(), engine: RankFusionEngine::new(), retrievers, weights })
    }

    /// Override the retriever's name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedHit>> {
        self.engine.fuse(query, &self.retrievers, &self.weights, k).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns a scripted hit list regardless of the query.
    struct StaticRetriever {
        name: String,
        hits: Vec<RankedHit>,
    }

    impl StaticRetriever {
        fn new(name: &str, ids: &[&str]) -> Arc<dyn Retriever> {
            let hits = ids
                .iter()
                .enumerate()
                .map(|(idx, id)| RankedHit {
                    document_id: id.to_string(),
                    score: 1.0 / (idx + 1) as f32,
                    rank: idx + 1,
                })
                .collect();
            Arc::new(Self { name: name.to_string(), hits })
        }
    }

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<RankedHit>> {
            Ok(self.hits.iter().take(k).cloned().collect())
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn ids(hits: &[RankedHit]) -> Vec<&str> {
        hits.iter().map(|h| h.document_id.as_str()).collect()
    }

    #[tokio::test]
    async fn mismatched_weight_count_is_invalid() {
        let engine = RankFusionEngine::new();
        let retrievers = vec![StaticRetriever::new("a", &["d1"])];

        let err = engine.fuse("q", &retrievers, &[0.5, 0.5], 3).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn zero_k_is_invalid() {
        let engine = RankFusionEngine::new();
        let retrievers = vec![StaticRetriever::new("a", &["d1"])];

        let err = engine.fuse("q", &retrievers, &[1.0], 0).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn all_zero_weights_are_invalid() {
        let engine = RankFusionEngine::new();
        let retrievers =
            vec![StaticRetriever::new("a", &["d1"]), StaticRetriever::new("b", &["d2"])];

        let err = engine.fuse("q", &retrievers, &[0.0, 0.0], 3).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn negative_weight_is_invalid() {
        let engine = RankFusionEngine::new();
        let retrievers =
            vec![StaticRetriever::new("a", &["d1"]), StaticRetriever::new("b", &["d2"])];

        let err = engine.fuse("q", &retrievers, &[1.0, -0.5], 3).await.unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn zero_weight_reproduces_first_retriever_exactly() {
        let engine = RankFusionEngine::new();
        let retrievers = vec![
            StaticRetriever::new("a", &["d3", "d1", "d2"]),
            StaticRetriever::new("b", &["d9", "d8", "d7"]),
        ];

        let fused = engine.fuse("q", &retrievers, &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(ids(&fused), vec!["d3", "d1", "d2"]);
        assert_eq!(fused[0].rank, 1);
        assert_eq!(fused[2].rank, 3);
    }

    #[tokio::test]
    async fn overlapping_documents_accumulate_weight() {
        let engine = RankFusionEngine::new();
        let retrievers = vec![
            StaticRetriever::new("a", &["d1", "shared"]),
            StaticRetriever::new("b", &["shared", "d2"]),
        ];

        let fused = engine.fuse("q", &retrievers, &[0.5, 0.5], 4).await.unwrap();
        assert_eq!(fused[0].document_id, "shared");
        assert!((fused[0].score - 1.0).abs() < 1e-6);
        assert!((fused[1].score - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn hand_computed_end_to_end_order() {
        // Reference doc at dense rank 3 and sparse rank 1, weights
        // [0.75, 0.25]: ref = 1.0, a = b = 0.75, c = d = 0.25.
        let engine = RankFusionEngine::new();
        let retrievers = vec![
            StaticRetriever::new("dense", &["a", "b", "ref"]),
            StaticRetriever::new("sparse", &["ref", "c", "d"]),
        ];

        let fused = engine.fuse("q", &retrievers, &[0.75, 0.25], 3).await.unwrap();
        assert_eq!(ids(&fused), vec!["ref", "a", "b"]);
        assert!((fused[0].score - 1.0).abs() < 1e-6);
        assert!((fused[1].score - 0.75).abs() < 1e-6);
    }

    #[tokio::test]
    async fn ties_break_by_rank_in_highest_weighted_retriever() {
        // d1 and d2 both accumulate the full weight; d1 sits at rank 1 in
        // the heavier list.
        let engine = RankFusionEngine::new();
        let retrievers = vec![
            StaticRetriever::new("a", &["d1", "d2"]),
            StaticRetriever::new("b", &["d2", "d1"]),
        ];

        let fused = engine.fuse("q", &retrievers, &[0.6, 0.4], 2).await.unwrap();
        assert_eq!(ids(&fused), vec!["d1", "d2"]);
    }

    #[tokio::test]
    async fn short_candidate_lists_fuse_without_padding() {
        let engine = RankFusionEngine::new();
        let retrievers =
            vec![StaticRetriever::new("a", &["d1"]), StaticRetriever::new("b", &[])];

        let fused = engine.fuse("q", &retrievers, &[0.5, 0.5], 5).await.unwrap();
        assert_eq!(ids(&fused), vec!["d1"]);
    }

    #[tokio::test]
    async fn hybrid_retriever_validates_at_construction() {
        let retrievers = vec![StaticRetriever::new("a", &["d1"])];
        assert!(HybridRetriever::new(retrievers, vec![0.5, 0.5]).is_err());
    }

    #[tokio::test]
    async fn hybrid_retriever_matches_engine_output() {
        let retrievers = vec![
            StaticRetriever::new("dense", &["a", "b", "ref"]),
            StaticRetriever::new("sparse", &["ref", "c", "d"]),
        ];
        let hybrid =
            HybridRetriever::new(retrievers.clone(), vec![0.75, 0.25]).unwrap();

        let engine = RankFusionEngine::new();
        let direct = engine.fuse("q", &retrievers, &[0.75, 0.25], 3).await.unwrap();
        let adapted = hybrid.retrieve("q", 3).await.unwrap();
        assert_eq!(direct, adapted);
    }
}
