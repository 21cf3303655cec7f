//! In-memory vector index using cosine similarity, with blob persistence.
//!
//! [`InMemoryVectorIndex`] is a zero-dependency index backed by a `HashMap`
//! protected by a `tokio::sync::RwLock`. It serializes itself to an opaque
//! blob on disk with write-once, read-many semantics:
//! [`persist`](InMemoryVectorIndex::persist) refuses to overwrite,
//! [`load`](InMemoryVectorIndex::load) fails on a missing or corrupt blob,
//! and [`open_or_build`](InMemoryVectorIndex::open_or_build) reuses an
//! existing blob or builds and persists a fresh one.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Corpus, RankedHit};
use crate::embedding::EmbeddingProvider;
use crate::error::{RetrievalError, Result};
use crate::index::{IndexEntry, VectorIndex};

/// An in-memory vector index using cosine similarity for search.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    dimensions: usize,
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

/// On-disk form of an [`InMemoryVectorIndex`].
#[derive(Serialize, Deserialize)]
struct IndexBlob {
    dimensions: usize,
    created_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl InMemoryVectorIndex {
    /// Create a new empty index for embeddings of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, entries: RwLock::new(HashMap::new()) }
    }

    /// The dimensionality this index was built for.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of entries currently indexed.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the index holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Serialize the index to `path` as an opaque blob.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::IndexState`] if `path` already exists
    /// (persisted indexes are never silently overwritten) or the write fails.
    pub async fn persist(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(RetrievalError::IndexState(format!(
                "refusing to overwrite existing index at '{}'",
                path.display()
            )));
        }

        let blob = {
            let entries = self.entries.read().await;
            IndexBlob {
                dimensions: self.dimensions,
                created_at: Utc::now(),
                entries: entries
                    .iter()
                    .map(|(id, embedding)| IndexEntry {
                        document_id: id.clone(),
                        embedding: embedding.clone(),
                    })
                    .collect(),
            }
        };

        let bytes = serde_json::to_vec(&blob).map_err(|e| {
            RetrievalError::IndexState(format!("failed to serialize index: {e}"))
        })?;
        tokio::fs::write(path, bytes).await.map_err(|e| {
            RetrievalError::IndexState(format!(
                "failed to write index to '{}': {e}",
                path.display()
            ))
        })?;

        info!(path = %path.display(), entries = blob.entries.len(), "persisted vector index");
        Ok(())
    }

    /// Load a previously persisted index from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::IndexState`] if the blob is missing or
    /// corrupt.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            RetrievalError::IndexState(format!(
                "persisted index missing at '{}': {e}",
                path.display()
            ))
        })?;
        let blob: IndexBlob = serde_json::from_slice(&bytes).map_err(|e| {
            RetrievalError::IndexState(format!(
                "corrupt index blob at '{}': {e}",
                path.display()
            ))
        })?;

        let index = Self::new(blob.dimensions);
        index.add(&blob.entries).await?;

        info!(path = %path.display(), entries = blob.entries.len(), "loaded vector index");
        Ok(index)
    }

    /// Load the index at `path` if it exists; otherwise embed the corpus,
    /// build the index, persist it, and return it.
    ///
    /// Index construction and querying are temporally disjoint: the returned
    /// index is treated as read-only for the process lifetime.
    pub async fn open_or_build(
        path: &Path,
        embedder: &dyn EmbeddingProvider,
        corpus: &Corpus,
    ) -> Result<Self> {
        if path.exists() {
            debug!(path = %path.display(), "reusing persisted vector index");
            return Self::load(path).await;
        }

        let texts: Vec<&str> = corpus.iter().map(|d| d.text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        let entries: Vec<IndexEntry> = corpus
            .iter()
            .zip(embeddings)
            .map(|(doc, embedding)| IndexEntry { document_id: doc.id.clone(), embedding })
            .collect();

        let index = Self::new(embedder.dimensions());
        index.add(&entries).await?;
        index.persist(path).await?;
        Ok(index)
    }

    fn check_dimensions(&self, len: usize, what: &str) -> Result<()> {
        if len != self.dimensions {
            return Err(RetrievalError::VectorIndex {
                backend: "InMemory".to_string(),
                message: format!(
                    "{what} has dimension {len}, index expects {}",
                    self.dimensions
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn add(&self, new_entries: &[IndexEntry]) -> Result<()> {
        for entry in new_entries {
            self.check_dimensions(entry.embedding.len(), "entry embedding")?;
        }
        let mut entries = self.entries.write().await;
        for entry in new_entries {
            entries.insert(entry.document_id.clone(), entry.embedding.clone());
        }
        Ok(())
    }

    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<RankedHit>> {
        self.check_dimensions(embedding.len(), "query embedding")?;

        let entries = self.entries.read().await;
        let mut scored: Vec<(&String, f32)> = entries
            .iter()
            .map(|(id, stored)| (id, cosine_similarity(stored, embedding)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(idx, (id, score))| RankedHit {
                document_id: id.clone(),
                score,
                rank: idx + 1,
            })
            .collect())
    }
}
