//! Configuration for evaluation runs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EvalError, Result};

/// Configuration parameters for an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalConfig {
    /// Number of top hits requested from each retriever.
    pub top_k: usize,
    /// Maximum concurrent generation/scoring calls in flight.
    pub max_concurrency: usize,
    /// Name tagging this run's metrics in the sink.
    pub run_name: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_concurrency: 4,
            run_name: format!("eval-{}", Uuid::new_v4()),
        }
    }
}

impl EvalConfig {
    /// Create a new builder for constructing an [`EvalConfig`].
    pub fn builder() -> EvalConfigBuilder {
        EvalConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`EvalConfig`].
#[derive(Debug, Clone, Default)]
pub struct EvalConfigBuilder {
    top_k: Option<usize>,
    max_concurrency: Option<usize>,
    run_name: Option<String>,
}

impl EvalConfigBuilder {
    /// Set the number of top hits requested from each retriever.
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set the maximum number of concurrent generation/scoring calls.
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Set the run name used to tag metrics.
    pub fn run_name(mut self, name: impl Into<String>) -> Self {
        self.run_name = Some(name.into());
        self
    }

    /// Build the [`EvalConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Config`] if `top_k == 0` or
    /// `max_concurrency == 0`.
    pub fn build(self) -> Result<EvalConfig> {
        let defaults = EvalConfig::default();
        let config = EvalConfig {
            top_k: self.top_k.unwrap_or(defaults.top_k),
            max_concurrency: self.max_concurrency.unwrap_or(defaults.max_concurrency),
            run_name: self.run_name.unwrap_or(defaults.run_name),
        };

        if config.top_k == 0 {
            return Err(EvalError::Config("top_k must be at least 1".to_string()));
        }
        if config.max_concurrency == 0 {
            return Err(EvalError::Config("max_concurrency must be at least 1".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EvalConfig::builder().build().unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.max_concurrency, 4);
        assert!(config.run_name.starts_with("eval-"));
    }

    #[test]
    fn zero_top_k_is_rejected() {
        assert!(matches!(
            EvalConfig::builder().top_k(0).build().unwrap_err(),
            EvalError::Config(_)
        ));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(matches!(
            EvalConfig::builder().max_concurrency(0).build().unwrap_err(),
            EvalError::Config(_)
        ));
    }
}
