//! Sparse retrieval: BM25 lexical ranking over the in-memory corpus.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::document::{Corpus, RankedHit};
use crate::error::Result;
use crate::retriever::Retriever;

/// Term-frequency saturation parameter.
const DEFAULT_K1: f32 = 1.2;
/// Length normalization parameter.
const DEFAULT_B: f32 = 0.75;

/// Per-document term statistics.
struct DocStats {
    id: String,
    term_freqs: HashMap<String, usize>,
    length: usize,
}

/// A BM25 index fitted once over the full corpus.
///
/// Read-only after construction; safely shared across concurrent queries.
pub struct Bm25Index {
    docs: Vec<DocStats>,
    doc_frequency: HashMap<String, usize>,
    avg_doc_length: f32,
    k1: f32,
    b: f32,
}

/// Lowercase alphanumeric tokenization.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Bm25Index {
    /// Fit a BM25 index over every document in the corpus.
    pub fn fit(corpus: &Corpus) -> Self {
        Self::fit_with_params(corpus, DEFAULT_K1, DEFAULT_B)
    }

    /// Fit with explicit `k1` and `b` parameters.
    pub fn fit_with_params(corpus: &Corpus, k1: f32, b: f32) -> Self {
        let mut docs = Vec::with_capacity(corpus.len());
        let mut doc_frequency: HashMap<String, usize> = HashMap::new();
        let mut total_length = 0usize;

        for document in corpus.iter() {
            let terms = tokenize(&document.text);
            let mut term_freqs: HashMap<String, usize> = HashMap::new();
            for term in &terms {
                *term_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            for term in term_freqs.keys() {
                *doc_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            total_length += terms.len();
            docs.push(DocStats { id: document.id.clone(), term_freqs, length: terms.len() });
        }

        let avg_doc_length =
            if docs.is_empty() { 0.0 } else { total_length as f32 / docs.len() as f32 };

        debug!(documents = docs.len(), vocabulary = doc_frequency.len(), "fitted BM25 index");

        Self { docs, doc_frequency, avg_doc_length, k1, b }
    }

    /// BM25 contribution of one query term for one document.
    fn term_score(&self, term: &str, doc_tf: usize, doc_length: usize) -> f32 {
        let n = self.docs.len() as f32;
        let df = self.doc_frequency.get(term).copied().unwrap_or(0) as f32;
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

        let tf = doc_tf as f32;
        let norm_length = doc_length as f32 / self.avg_doc_length.max(1.0);
        let tf_component =
            (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * norm_length));

        idf * tf_component
    }

    /// Rank corpus documents against `query`, keeping only positive scores.
    ///
    /// Documents with no term overlap are absent from the result. Ties are
    /// broken by document id for deterministic ordering.
    pub fn rank(&self, query: &str, k: usize) -> Vec<RankedHit> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(&str, f32)> = self
            .docs
            .iter()
            .filter_map(|doc| {
                let score: f32 = query_terms
                    .iter()
                    .filter_map(|term| {
                        doc.term_freqs
                            .get(term)
                            .map(|&tf| self.term_score(term, tf, doc.length))
                    })
                    .sum();
                (score > 0.0).then_some((doc.id.as_str(), score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .enumerate()
            .map(|(idx, (id, score))| RankedHit {
                document_id: id.to_string(),
                score,
                rank: idx + 1,
            })
            .collect()
    }
}

/// A retriever that ranks documents by lexical (term-overlap) relevance.
pub struct SparseRetriever {
    name: String,
    index: Bm25Index,
}

impl SparseRetriever {
    /// Build a sparse retriever by fitting a BM25 index over the corpus.
    pub fn new(corpus: &Corpus) -> Self {
        Self { name: "sparse".to_string(), index: Bm25Index::fit(corpus) }
    }

    /// Override the retriever's name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Retriever for SparseRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedHit>> {
        let hits = self.index.rank(query, k);
        debug!(retriever = %self.name, hit_count = hits.len(), "sparse retrieval completed");
        Ok(hits)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
