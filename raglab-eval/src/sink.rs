//! Metrics sink for experiment tracking.

use async_trait::async_trait;
use tracing::info;

/// A sink for named numeric metrics tagged by run name.
///
/// An optional collaborator: the harness logs a warning and continues when a
/// sink call fails, so sink unavailability never affects evaluation
/// correctness, only observability.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Record one metric value for the named run.
    async fn record(&self, run: &str, metric: &str, value: f64) -> anyhow::Result<()>;
}

/// A [`MetricsSink`] that emits metrics as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl MetricsSink for LogSink {
    async fn record(&self, run: &str, metric: &str, value: f64) -> anyhow::Result<()> {
        info!(run, metric, value, "metric recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sink_never_fails() {
        assert!(LogSink.record("run-1", "hit_rate", 0.5).await.is_ok());
    }
}
