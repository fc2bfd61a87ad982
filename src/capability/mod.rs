//! Browser automation capability.
//!
//! The capability is the one external power this system orchestrates:
//! "given an instruction, drive the browser and report what happened".
//! The trait keeps the task runner independent of any concrete SDK, so
//! production runs use the HTTP-backed [`RemoteCapability`] while tests
//! substitute doubles.

pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

pub use remote::{AutomationConfig, RemoteCapability};

/// Uniform interface to the external browser automation capability.
///
/// One instance is bound to one remote browser session. `close` must be
/// called exactly once per instance; the task runner guarantees this on
/// every exit path.
#[async_trait]
pub trait BrowserCapability: Send + Sync {
    /// Loads the given URL in the session's page.
    async fn navigate(&mut self, url: &str) -> Result<(), CapabilityError>;

    /// Performs a single natural-language action on the current page.
    async fn act(&mut self, instruction: &str) -> Result<(), CapabilityError>;

    /// Extracts structured data from the current page against a JSON schema.
    async fn extract(
        &mut self,
        instruction: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, CapabilityError>;

    /// Hands the whole task to the autonomous agent and awaits completion.
    async fn agent_execute(&mut self, instruction: &str) -> Result<(), CapabilityError>;

    /// Captures a screenshot of the current page as raw image bytes.
    async fn screenshot(&mut self) -> Result<Vec<u8>, CapabilityError>;

    /// Returns aggregate usage counters reported by the capability.
    async fn metrics(&self) -> Result<AggregateMetrics, CapabilityError>;

    /// Returns the raw history of operations performed in this session.
    async fn history(&self) -> Result<Vec<HistoryEntry>, CapabilityError>;

    /// Returns one action description per history entry.
    async fn action_history(&self) -> Result<Vec<String>, CapabilityError> {
        Ok(action_descriptions(&self.history().await?))
    }

    /// Returns the reasoning trace recorded alongside the history.
    async fn thoughts(&self) -> Result<Vec<String>, CapabilityError> {
        Ok(thought_log(&self.history().await?))
    }

    /// Ends the session and releases the remote browser.
    async fn close(&mut self) -> Result<(), CapabilityError>;
}

/// Aggregate usage counters reported by the automation capability.
///
/// The named fields are the ones this system reads; anything else the
/// capability reports is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetrics {
    #[serde(default)]
    pub total_prompt_tokens: u64,
    #[serde(default)]
    pub total_completion_tokens: u64,
    #[serde(default)]
    pub total_inference_time_ms: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AggregateMetrics {
    /// Total tokens across prompt and completion.
    pub fn total_tokens(&self) -> u64 {
        self.total_prompt_tokens + self.total_completion_tokens
    }
}

/// One entry in the capability's operation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Capability method that was invoked (e.g. "act", "navigate").
    pub method: String,
    /// Individual browser actions the method resolved to.
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    /// Free-form message the capability attached to the entry.
    #[serde(default)]
    pub message: Option<String>,
}

/// A single resolved browser action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Human-readable description of the action.
    pub description: String,
}

/// Flattens history entries into one action description per entry.
///
/// An entry with resolved actions joins their descriptions; otherwise the
/// entry's message stands in, and failing that the bare method name.
pub fn action_descriptions(history: &[HistoryEntry]) -> Vec<String> {
    history
        .iter()
        .map(|entry| {
            if !entry.actions.is_empty() {
                entry
                    .actions
                    .iter()
                    .map(|a| a.description.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            } else if let Some(message) = &entry.message {
                message.clone()
            } else {
                entry.method.clone()
            }
        })
        .collect()
}

/// Extracts the reasoning trace from history entries.
///
/// Entries without a message fall back to a "Performed <method>" line so
/// the trace stays aligned with the action history.
pub fn thought_log(history: &[HistoryEntry]) -> Vec<String> {
    history
        .iter()
        .map(|entry| match &entry.message {
            Some(message) => message.clone(),
            None => format!("Performed {}", entry.method),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: &str, actions: &[&str], message: Option<&str>) -> HistoryEntry {
        HistoryEntry {
            method: method.to_string(),
            actions: actions
                .iter()
                .map(|d| ActionRecord {
                    description: d.to_string(),
                })
                .collect(),
            message: message.map(String::from),
        }
    }

    #[test]
    fn test_action_descriptions_joins_actions() {
        let history = vec![entry(
            "act",
            &["click the search button", "wait for results"],
            Some("performed two actions"),
        )];
        assert_eq!(
            action_descriptions(&history),
            vec!["click the search button; wait for results"]
        );
    }

    #[test]
    fn test_action_descriptions_falls_back_to_message_then_method() {
        let history = vec![
            entry("extract", &[], Some("extracted 3 fields")),
            entry("navigate", &[], None),
        ];
        assert_eq!(
            action_descriptions(&history),
            vec!["extracted 3 fields", "navigate"]
        );
    }

    #[test]
    fn test_thought_log_falls_back_to_method() {
        let history = vec![
            entry("act", &["click"], Some("clicked the button")),
            entry("navigate", &[], None),
        ];
        assert_eq!(
            thought_log(&history),
            vec!["clicked the button", "Performed navigate"]
        );
    }

    #[test]
    fn test_aggregate_metrics_total_and_extras() {
        let metrics: AggregateMetrics = serde_json::from_str(
            r#"{"totalPromptTokens":1200,"totalCompletionTokens":300,"totalInferenceTimeMs":4500,"cachedTokens":100}"#,
        )
        .unwrap();
        assert_eq!(metrics.total_tokens(), 1500);
        assert_eq!(metrics.extra["cachedTokens"], 100);
    }
}
