//! Vector index trait for nearest-neighbor search over document embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::RankedHit;
use crate::error::Result;

/// A document embedding stored in a vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The id of the embedded document.
    pub document_id: String,
    /// The embedding vector for the document's text.
    pub embedding: Vec<f32>,
}

/// A nearest-neighbor search service over document embeddings.
///
/// Implementations index [`IndexEntry`] values and answer top-`k` similarity
/// queries. The index is treated as write-once: it is populated during a
/// build phase and read-only while queries run, so concurrent readers never
/// race with a writer.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Add entries to the index. An entry with an existing id replaces it.
    async fn add(&self, entries: &[IndexEntry]) -> Result<()>;

    /// Search for the `k` entries most similar to the given embedding.
    ///
    /// Returns hits ordered by descending similarity score with 1-based
    /// ranks. Fewer than `k` hits are returned when the index is smaller.
    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<RankedHit>>;
}
