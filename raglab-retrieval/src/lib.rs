//! # raglab-retrieval
//!
//! Document retrieval strategies for the raglab evaluation harness:
//!
//! - [`DenseRetriever`] — embedding-similarity search over a [`VectorIndex`]
//! - [`SparseRetriever`] — BM25 lexical ranking over the in-memory corpus
//! - [`RankFusionEngine`] / [`HybridRetriever`] — weighted rank fusion of
//!   multiple retrievers into a single ranked list
//!
//! All strategies implement the [`Retriever`] trait and are read-only after
//! construction, so they can be shared (`Arc`) across concurrent query
//! evaluations.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use raglab_retrieval::{
//!     Corpus, DenseRetriever, HybridRetriever, InMemoryVectorIndex, SparseRetriever,
//! };
//!
//! let corpus = Arc::new(Corpus::new(documents));
//! let index = InMemoryVectorIndex::open_or_build(&path, &embedder, &corpus).await?;
//!
//! let dense = Arc::new(DenseRetriever::new(embedder, Arc::new(index)));
//! let sparse = Arc::new(SparseRetriever::new(&corpus));
//! let hybrid = HybridRetriever::new(vec![dense, sparse], vec![0.75, 0.25])?;
//!
//! let hits = hybrid.retrieve("how does rank fusion work?", 5).await?;
//! ```

pub mod dense;
pub mod document;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod index;
pub mod inmemory;
pub mod retriever;
pub mod sparse;

pub use dense::DenseRetriever;
pub use document::{Corpus, Document, RankedHit};
pub use embedding::EmbeddingProvider;
pub use error::{RetrievalError, Result};
pub use fusion::{HybridRetriever, RankFusionEngine};
pub use index::{IndexEntry, VectorIndex};
pub use inmemory::InMemoryVectorIndex;
pub use retriever::Retriever;
pub use sparse::{Bm25Index, SparseRetriever};
