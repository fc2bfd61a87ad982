//! Run artifacts: screenshots and the terminal run result.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::capability::AggregateMetrics;

/// A screenshot captured at one run checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    /// Checkpoint label (e.g. "Initial page load").
    pub step: String,
    /// PNG image encoded as a data URI.
    pub screenshot: String,
}

impl ScreenshotRecord {
    /// Encodes raw PNG bytes into a checkpoint record.
    pub fn from_png(step: impl Into<String>, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            step: step.into(),
            screenshot: format!("data:image/png;base64,{}", encoded),
        }
    }
}

/// Reduced view of a run for downstream automated grading: raw screenshot
/// payloads (no step labels) paired with the traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalInput {
    /// Data-URI screenshot payloads in checkpoint order.
    pub screenshots: Vec<String>,
    /// Action descriptions in execution order.
    pub action_history: Vec<String>,
    /// Reasoning trace aligned with the action history.
    pub thoughts: Vec<String>,
}

/// Terminal artifact of one task run.
///
/// Assembled fully before being returned and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Unique identifier for this run.
    pub run_id: String,
    /// Timestamp when the run started.
    pub started_at: DateTime<Utc>,
    /// Total duration of the run.
    pub duration: Duration,
    /// Usage counters reported by the capability.
    pub metrics: AggregateMetrics,
    /// Screenshots in checkpoint order.
    pub screenshots: Vec<ScreenshotRecord>,
    /// Extracted field values; empty when extraction failed or none ran.
    pub extracted: Map<String, Value>,
    /// Overall success verdict.
    pub success: bool,
    /// Action descriptions in execution order.
    pub action_history: Vec<String>,
    /// Reasoning trace aligned with the action history.
    pub thoughts: Vec<String>,
    /// Companion reduced view for downstream grading.
    pub eval_input: EvalInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_record_encodes_data_uri() {
        let record = ScreenshotRecord::from_png("Initial page load", b"hello world");
        assert_eq!(record.step, "Initial page load");
        assert_eq!(
            record.screenshot,
            "data:image/png;base64,aGVsbG8gd29ybGQ="
        );
    }

    #[test]
    fn test_run_result_serializes_camel_case() {
        let result = RunResult {
            run_id: "run-1".to_string(),
            started_at: Utc::now(),
            duration: Duration::from_secs(3),
            metrics: AggregateMetrics::default(),
            screenshots: vec![],
            extracted: Map::new(),
            success: true,
            action_history: vec!["clicked".to_string()],
            thoughts: vec!["thinking".to_string()],
            eval_input: EvalInput {
                screenshots: vec![],
                action_history: vec!["clicked".to_string()],
                thoughts: vec!["thinking".to_string()],
            },
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["runId"], "run-1");
        assert_eq!(json["actionHistory"][0], "clicked");
        assert_eq!(json["evalInput"]["thoughts"][0], "thinking");
    }
}
