//! Retriever trait implemented by every retrieval strategy.

use async_trait::async_trait;

use crate::document::RankedHit;
use crate::error::Result;

/// A retrieval strategy that ranks corpus documents against a query.
///
/// Implemented by [`DenseRetriever`](crate::dense::DenseRetriever),
/// [`SparseRetriever`](crate::sparse::SparseRetriever), and
/// [`HybridRetriever`](crate::fusion::HybridRetriever), and consumed
/// polymorphically by the fusion engine and the evaluation harness.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve up to `k` hits for `query`, ordered by descending score
    /// with 1-based ranks.
    ///
    /// A retriever may return fewer than `k` hits; it never pads the list.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RankedHit>>;

    /// A short name identifying this retriever in logs and error messages.
    fn name(&self) -> &str;
}
