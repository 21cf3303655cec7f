//! Mock completion model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::completion::CompletionModel;
use crate::error::{ModelError, Result};

/// A scripted [`CompletionModel`] for tests.
///
/// Replies with a fixed response, or pops from a response queue when one is
/// set. Records every received prompt for assertions, and can be switched
/// into a failing mode.
#[derive(Default)]
pub struct MockCompletionModel {
    fixed_response: Option<String>,
    queue: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl MockCompletionModel {
    /// A mock that always replies with `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self { fixed_response: Some(response.into()), ..Self::default() }
    }

    /// A mock that replies with each response in order, then errors.
    pub fn with_queue(responses: Vec<String>) -> Self {
        Self { queue: Mutex::new(responses.into()), ..Self::default() }
    }

    /// A mock whose every call fails.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// The prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for MockCompletionModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.fail {
            return Err(ModelError::Completion {
                provider: "mock".into(),
                message: "scripted failure".into(),
            });
        }

        if let Some(response) = &self.fixed_response {
            return Ok(response.clone());
        }

        self.queue.lock().unwrap().pop_front().ok_or_else(|| ModelError::Completion {
            provider: "mock".into(),
            message: "response queue exhausted".into(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_response_and_prompt_recording() {
        let model = MockCompletionModel::with_response("forty-two");

        assert_eq!(model.complete("first").await.unwrap(), "forty-two");
        assert_eq!(model.complete("second").await.unwrap(), "forty-two");
        assert_eq!(model.prompts(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn queue_drains_then_errors() {
        let model = MockCompletionModel::with_queue(vec!["a".into(), "b".into()]);

        assert_eq!(model.complete("q").await.unwrap(), "a");
        assert_eq!(model.complete("q").await.unwrap(), "b");
        assert!(model.complete("q").await.is_err());
    }

    #[tokio::test]
    async fn failing_mode_always_errors() {
        let model = MockCompletionModel::failing();
        assert!(matches!(
            model.complete("q").await.unwrap_err(),
            ModelError::Completion { .. }
        ));
    }
}
