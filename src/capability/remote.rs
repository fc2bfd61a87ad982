//! HTTP-backed implementation of the browser capability.
//!
//! Talks to the automation service, which wraps the browser SDK and
//! exposes per-session operations. One `RemoteCapability` is bound to one
//! automation session for its whole life.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{AggregateMetrics, BrowserCapability, HistoryEntry};
use crate::error::CapabilityError;
use crate::session::BrowserSettings;

/// Default model handed to the automation service when none is configured.
const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Configuration for the automation service connection.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// Base URL of the automation service.
    pub api_base: String,
    /// Optional API key for the service.
    pub api_key: Option<String>,
    /// Model the service should drive the browser with.
    pub model: String,
}

impl AutomationConfig {
    /// Creates a configuration with explicit values.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Creates a configuration from environment variables.
    ///
    /// Reads:
    /// - `AUTOMATION_API_BASE`: service base URL (required)
    /// - `AUTOMATION_API_KEY`: API key (optional)
    /// - `AUTOMATION_MODEL`: model override (optional)
    pub fn from_env() -> Result<Self, CapabilityError> {
        let api_base =
            env::var("AUTOMATION_API_BASE").map_err(|_| CapabilityError::MissingApiBase)?;
        let api_key = env::var("AUTOMATION_API_KEY").ok();
        let model = env::var("AUTOMATION_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self {
            api_base,
            api_key,
            model,
        })
    }
}

/// Capability implementation backed by the automation service.
pub struct RemoteCapability {
    /// Service base URL.
    api_base: String,
    /// Optional API key.
    api_key: Option<String>,
    /// Automation session this instance is bound to.
    session_id: String,
    /// HTTP client for service requests.
    http_client: Client,
}

impl RemoteCapability {
    /// Starts a new automation session and returns a capability bound to it.
    ///
    /// The service creates the underlying hosted browser session itself and
    /// reports its id, so live-view URLs can be resolved through the session
    /// provider afterwards.
    pub async fn start(
        config: &AutomationConfig,
        settings: &BrowserSettings,
    ) -> Result<Self, CapabilityError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to build HTTP client");

        let body = serde_json::json!({
            "model": config.model,
            "browserSettings": settings,
        });

        let url = format!("{}/v1/sessions", config.api_base);
        let mut request = http_client.post(&url).json(&body);
        if let Some(key) = &config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| CapabilityError::Transport(e.to_string()))?;

        let created: CreatedAutomationSession = read_json(response).await?;
        debug!(session_id = %created.session_id, "Started automation session");

        Ok(Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            session_id: created.session_id,
            http_client,
        })
    }

    /// The hosted session id this capability is bound to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn session_url(&self, operation: &str) -> String {
        format!(
            "{}/v1/sessions/{}/{}",
            self.api_base, self.session_id, operation
        )
    }

    async fn post(&self, operation: &str, body: Value) -> Result<reqwest::Response, CapabilityError> {
        let mut request = self.http_client.post(self.session_url(operation)).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        request
            .send()
            .await
            .map_err(|e| CapabilityError::Transport(e.to_string()))
    }

    async fn get(&self, operation: &str) -> Result<reqwest::Response, CapabilityError> {
        let mut request = self.http_client.get(self.session_url(operation));
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        request
            .send()
            .await
            .map_err(|e| CapabilityError::Transport(e.to_string()))
    }
}

#[async_trait]
impl BrowserCapability for RemoteCapability {
    async fn navigate(&mut self, url: &str) -> Result<(), CapabilityError> {
        let response = self
            .post("navigate", serde_json::json!({ "url": url }))
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn act(&mut self, instruction: &str) -> Result<(), CapabilityError> {
        let response = self
            .post("act", serde_json::json!({ "action": instruction }))
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn extract(
        &mut self,
        instruction: &str,
        schema: &Value,
    ) -> Result<Value, CapabilityError> {
        let response = self
            .post(
                "extract",
                serde_json::json!({
                    "instruction": instruction,
                    "schema": schema,
                }),
            )
            .await?;
        read_json(response).await
    }

    async fn agent_execute(&mut self, instruction: &str) -> Result<(), CapabilityError> {
        let response = self
            .post("agent/execute", serde_json::json!({ "instruction": instruction }))
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, CapabilityError> {
        let response = self.get("screenshot").await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(CapabilityError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CapabilityError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn metrics(&self) -> Result<AggregateMetrics, CapabilityError> {
        let response = self.get("metrics").await?;
        read_json(response).await
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, CapabilityError> {
        let response = self.get("history").await?;
        read_json(response).await
    }

    async fn close(&mut self) -> Result<(), CapabilityError> {
        let response = self.post("end", serde_json::json!({})).await?;
        ensure_success(response).await?;
        debug!(session_id = %self.session_id, "Closed automation session");
        Ok(())
    }
}

/// Service response for session creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedAutomationSession {
    session_id: String,
}

/// Maps a non-success response to `CapabilityError::Api`.
async fn ensure_success(response: reqwest::Response) -> Result<(), CapabilityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    Err(CapabilityError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Reads a JSON body, mapping non-success statuses to `CapabilityError::Api`.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CapabilityError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        return Err(CapabilityError::Api {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json()
        .await
        .map_err(|e| CapabilityError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_automation_config_builder() {
        let config = AutomationConfig::new("http://localhost:4100")
            .with_api_key("secret")
            .with_model("anthropic/claude-sonnet-4-20250514");
        assert_eq!(config.api_base, "http://localhost:4100");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.model, "anthropic/claude-sonnet-4-20250514");
    }

    #[test]
    fn test_automation_config_default_model() {
        let config = AutomationConfig::new("http://localhost:4100");
        assert_eq!(config.model, DEFAULT_MODEL);
    }
}
