//! Dense retrieval: embed the query, search a vector index.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::document::RankedHit;
use crate::embedding::EmbeddingProvider;
use crate::error::{RetrievalError, Result};
use crate::index::VectorIndex;
use crate::retriever::Retriever;

/// A retriever that ranks documents by embedding similarity.
///
/// Wraps an [`EmbeddingProvider`] and a [`VectorIndex`]: the query is
/// embedded, the index is searched, and the index's ranked ids are returned
/// as [`RankedHit`]s. Holds no mutable state; safely shared across
/// concurrent queries.
pub struct DenseRetriever {
    name: String,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl DenseRetriever {
    /// Create a dense retriever over the given embedder and index.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { name: "dense".to_string(), embedder, index }
    }

    /// Override the retriever's name (useful when comparing variants).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn failure(&self, message: String) -> RetrievalError {
        RetrievalError::Retrieval { retriever: self.name.clone(), message }
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedHit>> {
        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(retriever = %self.name, error = %e, "query embedding failed");
            self.failure(format!("query embedding failed: {e}"))
        })?;

        let hits = self.index.search(&query_embedding, k).await.map_err(|e| {
            error!(retriever = %self.name, error = %e, "vector index search failed");
            self.failure(format!("vector search failed: {e}"))
        })?;

        // The index is a black-box service; reject malformed results.
        if hits.iter().any(|h| h.document_id.is_empty()) {
            return Err(self.failure("vector search returned a hit without a document id".into()));
        }

        debug!(retriever = %self.name, hit_count = hits.len(), "dense retrieval completed");

        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(idx, hit)| RankedHit { rank: idx + 1, ..hit })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Corpus, Document};
    use crate::index::IndexEntry;
    use crate::inmemory::InMemoryVectorIndex;

    /// Maps known texts to fixed two-dimensional embeddings.
    struct FixtureEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixtureEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(match text {
                "apples" => vec![1.0, 0.0],
                "oranges" => vec![0.0, 1.0],
                _ => vec![0.7, 0.7],
            })
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    async fn fixture_index() -> InMemoryVectorIndex {
        let index = InMemoryVectorIndex::new(2);
        index
            .add(&[
                IndexEntry { document_id: "fruit".into(), embedding: vec![1.0, 0.0] },
                IndexEntry { document_id: "citrus".into(), embedding: vec![0.0, 1.0] },
            ])
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn retrieves_nearest_documents_in_rank_order() {
        let retriever =
            DenseRetriever::new(Arc::new(FixtureEmbedder), Arc::new(fixture_index().await));

        let hits = retriever.retrieve("apples", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, "fruit");
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].document_id, "citrus");
        assert_eq!(hits[1].rank, 2);
    }

    #[tokio::test]
    async fn embedding_failure_surfaces_as_retrieval_error() {
        struct FailingEmbedder;

        #[async_trait]
        impl EmbeddingProvider for FailingEmbedder {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Err(RetrievalError::Embedding {
                    provider: "test".into(),
                    message: "boom".into(),
                })
            }

            fn dimensions(&self) -> usize {
                2
            }
        }

        let retriever =
            DenseRetriever::new(Arc::new(FailingEmbedder), Arc::new(fixture_index().await));
        let err = retriever.retrieve("apples", 1).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Retrieval { .. }));
    }

    #[tokio::test]
    async fn open_or_build_index_feeds_dense_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.blob");
        let corpus =
            Corpus::new(vec![Document::new("fruit", "apples"), Document::new("citrus", "oranges")]);

        let index = InMemoryVectorIndex::open_or_build(&path, &FixtureEmbedder, &corpus)
            .await
            .unwrap();
        let retriever = DenseRetriever::new(Arc::new(FixtureEmbedder), Arc::new(index));

        let hits = retriever.retrieve("oranges", 1).await.unwrap();
        assert_eq!(hits[0].document_id, "citrus");
    }
}
