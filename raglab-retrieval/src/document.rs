//! Data types for documents, the corpus, and ranked retrieval hits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing text content and metadata.
///
/// Documents are created once at corpus-build time and are immutable
/// thereafter. Retrieval results refer to documents by id, never by copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new() }
    }
}

/// A single entry in a ranked result list.
///
/// Produced fresh per query and never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedHit {
    /// The id of the retrieved document.
    pub document_id: String,
    /// The relevance score (higher is more relevant).
    pub score: f32,
    /// Position in the result list (1-based).
    pub rank: usize,
}

/// A read-only collection of documents with O(1) id lookup.
///
/// Built once, then shared (`Arc`) across concurrent query evaluations.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    by_id: HashMap<String, usize>,
}

impl Corpus {
    /// Build a corpus from a list of documents.
    ///
    /// A later document with a duplicate id replaces the earlier one.
    pub fn new(documents: Vec<Document>) -> Self {
        let mut by_id = HashMap::with_capacity(documents.len());
        for (idx, doc) in documents.iter().enumerate() {
            by_id.insert(doc.id.clone(), idx);
        }
        Self { documents, by_id }
    }

    /// Look up a document by id.
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.by_id.get(id).map(|&idx| &self.documents[idx])
    }

    /// Iterate over all documents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    /// Number of documents in the corpus.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_lookup_by_id() {
        let corpus = Corpus::new(vec![
            Document::new("d1", "first document"),
            Document::new("d2", "second document"),
        ]);

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get("d2").unwrap().text, "second document");
        assert!(corpus.get("d3").is_none());
    }

    #[test]
    fn corpus_duplicate_id_uses_latest() {
        let corpus = Corpus::new(vec![
            Document::new("d1", "old"),
            Document::new("d1", "new"),
        ]);

        assert_eq!(corpus.get("d1").unwrap().text, "new");
    }
}
