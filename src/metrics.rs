//! Prometheus metrics registration and export.
//!
//! Records run outcomes and provider-reported token usage, and renders
//! the registry in Prometheus text format for the `/metrics` endpoint.

use prometheus::{CounterVec, Encoder, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

use crate::capability::AggregateMetrics;

/// Global Prometheus registry for all webgauge metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total runs executed, labeled by workflow and status.
pub static RUNS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Run duration in seconds, labeled by workflow.
pub static RUN_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Total provider-reported tokens, labeled by workflow and type.
pub static PROVIDER_TOKENS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Call once at application startup.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails, typically
/// due to duplicate metric names.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    let runs_total = CounterVec::new(
        Opts::new("webgauge_runs_total", "Total number of runs executed"),
        &["workflow", "status"],
    )?;

    let run_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "webgauge_run_duration_seconds",
            "Run duration in seconds",
        )
        .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["workflow"],
    )?;

    let provider_tokens_total = CounterVec::new(
        Opts::new(
            "webgauge_provider_tokens_total",
            "Total provider-reported tokens",
        ),
        &["workflow", "type"],
    )?;

    registry.register(Box::new(runs_total.clone()))?;
    registry.register(Box::new(run_duration.clone()))?;
    registry.register(Box::new(provider_tokens_total.clone()))?;

    let _ = RUNS_TOTAL.set(runs_total);
    let _ = RUN_DURATION.set(run_duration);
    let _ = PROVIDER_TOKENS_TOTAL.set(provider_tokens_total);
    let _ = REGISTRY.set(registry);

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
///
/// Returns an empty string if metrics were never initialized.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return String::new();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Convenience facade for recording run metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    /// Creates a new collector.
    pub fn new() -> Self {
        Self
    }

    /// Records one finished run.
    pub fn record_run(
        &self,
        workflow: &str,
        status: &str,
        duration_secs: f64,
        usage: Option<&AggregateMetrics>,
    ) {
        if let Some(runs) = RUNS_TOTAL.get() {
            runs.with_label_values(&[workflow, status]).inc();
        }
        if let Some(duration) = RUN_DURATION.get() {
            duration.with_label_values(&[workflow]).observe(duration_secs);
        }
        if let (Some(tokens), Some(usage)) = (PROVIDER_TOKENS_TOTAL.get(), usage) {
            tokens
                .with_label_values(&[workflow, "prompt"])
                .inc_by(usage.total_prompt_tokens as f64);
            tokens
                .with_label_values(&[workflow, "completion"])
                .inc_by(usage.total_completion_tokens as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_and_record() {
        // init_metrics is idempotent only through OnceLock; ignore a
        // second-registration error from other tests.
        let _ = init_metrics();

        let collector = MetricsCollector::new();
        let usage = AggregateMetrics {
            total_prompt_tokens: 100,
            total_completion_tokens: 50,
            total_inference_time_ms: 1200,
            extra: Default::default(),
        };
        collector.record_run("agent", "success", 12.5, Some(&usage));

        let exported = export_metrics();
        assert!(exported.contains("webgauge_runs_total"));
        assert!(exported.contains("webgauge_provider_tokens_total"));
    }

    #[test]
    fn test_export_without_init_is_empty_or_text() {
        // Depending on test order the registry may already exist; either
        // way export must not panic.
        let _ = export_metrics();
    }
}
