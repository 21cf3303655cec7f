//! Labeled evaluation examples and dataset loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EvalError, Result};

/// A labeled question for evaluation.
///
/// Immutable; loaded once per evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationExample {
    /// The question posed to the retriever and the answer generator.
    pub question: String,
    /// The id of the document known to answer the question.
    pub ref_doc_id: String,
    /// The expected answer, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_truth_answer: Option<String>,
}

impl EvaluationExample {
    /// Create an example without a ground-truth answer.
    pub fn new(question: impl Into<String>, ref_doc_id: impl Into<String>) -> Self {
        Self { question: question.into(), ref_doc_id: ref_doc_id.into(), ground_truth_answer: None }
    }
}

/// Load evaluation examples from a JSON array file.
///
/// # Errors
///
/// Returns [`EvalError::Dataset`] if the file cannot be read or parsed.
pub async fn load_examples(path: &Path) -> Result<Vec<EvaluationExample>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        EvalError::Dataset(format!("failed to read '{}': {e}", path.display()))
    })?;
    let examples: Vec<EvaluationExample> = serde_json::from_slice(&bytes).map_err(|e| {
        EvalError::Dataset(format!("failed to parse '{}': {e}", path.display()))
    })?;

    info!(path = %path.display(), count = examples.len(), "loaded evaluation examples");
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_examples_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.json");
        tokio::fs::write(
            &path,
            r#"[
                {"question": "what is rank fusion?", "ref_doc_id": "d1"},
                {"question": "what is mrr?", "ref_doc_id": "d2", "ground_truth_answer": "a metric"}
            ]"#,
        )
        .await
        .unwrap();

        let examples = load_examples(&path).await.unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0], EvaluationExample::new("what is rank fusion?", "d1"));
        assert_eq!(examples[1].ground_truth_answer.as_deref(), Some("a metric"));
    }

    #[tokio::test]
    async fn missing_and_malformed_files_fail() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("absent.json");
        assert!(matches!(load_examples(&missing).await.unwrap_err(), EvalError::Dataset(_)));

        let malformed = dir.path().join("bad.json");
        tokio::fs::write(&malformed, b"{not json").await.unwrap();
        assert!(matches!(load_examples(&malformed).await.unwrap_err(), EvalError::Dataset(_)));
    }
}
