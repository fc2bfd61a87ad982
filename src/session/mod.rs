//! Client for the remote browser session hosting provider.
//!
//! The provider owns the actual browser: sessions are created against a
//! project, observed through live-view/debug URLs, screenshotted by id,
//! and released when a run finishes. Everything here is a thin HTTP
//! surface; no session state is kept client-side beyond the handle.

use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionError;

/// Default viewport for new sessions.
const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 1280,
    height: 720,
};

/// Browser viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        DEFAULT_VIEWPORT
    }
}

/// Settings for a new browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSettings {
    /// Viewport dimensions.
    #[serde(default)]
    pub viewport: Viewport,
    /// Route traffic through the provider's proxy pool.
    #[serde(default)]
    pub proxies: bool,
    /// Enable the provider's advanced stealth mode.
    #[serde(default)]
    pub advanced_stealth: bool,
    /// Device profile to emulate (e.g. "mac", "windows", "mobile").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            proxies: false,
            advanced_stealth: false,
            device_type: None,
        }
    }
}

/// Handle to a live provider session, including its observation URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    /// Provider-assigned session id.
    pub session_id: String,
    /// Provider dashboard URL for the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_url: Option<String>,
    /// Embeddable live-view URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_url: Option<String>,
    /// Fullscreen live-view URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_fullscreen_url: Option<String>,
    /// CDP websocket URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
}

/// Live-view/debug information for an existing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDebugInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_fullscreen_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    /// Per-page live-view entries, passed through untouched.
    #[serde(default)]
    pub pages: Vec<serde_json::Value>,
}

/// Client for the session hosting provider API.
pub struct SessionClient {
    /// Base URL for the provider API.
    api_base: String,
    /// API key sent on every request.
    api_key: String,
    /// Project the sessions are billed against.
    project_id: String,
    /// HTTP client for provider requests.
    http_client: Client,
}

impl SessionClient {
    /// Creates a client with explicit configuration.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            project_id: project_id.into(),
            http_client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `PROVIDER_API_BASE`: provider base URL (defaults to the hosted API)
    /// - `PROVIDER_API_KEY`: API key (required)
    /// - `PROVIDER_PROJECT_ID`: project id (required)
    pub fn from_env() -> Result<Self, SessionError> {
        let api_base = env::var("PROVIDER_API_BASE")
            .unwrap_or_else(|_| "https://api.sessionhost.dev".to_string());
        let api_key = env::var("PROVIDER_API_KEY").map_err(|_| SessionError::MissingApiKey)?;
        let project_id =
            env::var("PROVIDER_PROJECT_ID").map_err(|_| SessionError::MissingProjectId)?;
        Ok(Self::new(api_base, api_key, project_id))
    }

    /// Gets the provider API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Creates a session and resolves its live-view URLs.
    pub async fn create(&self, settings: &BrowserSettings) -> Result<SessionHandle, SessionError> {
        let body = serde_json::json!({
            "projectId": self.project_id,
            "browserSettings": {
                "viewport": settings.viewport,
                "advancedStealth": settings.advanced_stealth,
            },
            "proxies": settings.proxies,
        });

        let url = format!("{}/v1/sessions", self.api_base);
        let response = self
            .http_client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let created: CreatedSession = parse_response(response).await?;
        debug!(session_id = %created.id, "Created provider session");

        let debug_info = self.debug_info(&created.id).await?;

        Ok(SessionHandle {
            session_id: created.id,
            session_url: created.session_url,
            debugger_url: debug_info.debugger_url,
            debugger_fullscreen_url: debug_info.debugger_fullscreen_url,
            ws_url: debug_info.ws_url,
        })
    }

    /// Fetches live-view/debug URLs for an existing session.
    pub async fn debug_info(&self, session_id: &str) -> Result<SessionDebugInfo, SessionError> {
        let url = format!("{}/v1/sessions/{}/debug", self.api_base, session_id);
        let response = self
            .http_client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        parse_response(response).await
    }

    /// Captures a screenshot of the session's current page as raw image bytes.
    pub async fn screenshot(&self, session_id: &str) -> Result<Vec<u8>, SessionError> {
        let url = format!("{}/v1/sessions/{}/screenshot", self.api_base, session_id);
        let response = self
            .http_client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(SessionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Requests release of a session so the provider can reclaim it.
    pub async fn release(&self, session_id: &str) -> Result<(), SessionError> {
        let url = format!("{}/v1/sessions/{}", self.api_base, session_id);
        let body = serde_json::json!({
            "projectId": self.project_id,
            "status": "REQUEST_RELEASE",
        });

        let response = self
            .http_client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(SessionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(session_id, "Released provider session");
        Ok(())
    }
}

/// Provider response for session creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSession {
    id: String,
    #[serde(default)]
    session_url: Option<String>,
}

/// Reads a JSON response body, mapping non-success statuses to
/// `SessionError::Api` with the raw body as the message.
async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SessionError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        return Err(SessionError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| SessionError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_settings_defaults() {
        let settings = BrowserSettings::default();
        assert_eq!(settings.viewport.width, 1280);
        assert_eq!(settings.viewport.height, 720);
        assert!(!settings.proxies);
        assert!(!settings.advanced_stealth);
        assert!(settings.device_type.is_none());
    }

    #[test]
    fn test_browser_settings_deserialize_camel_case() {
        let settings: BrowserSettings = serde_json::from_str(
            r#"{"viewport":{"width":800,"height":600},"advancedStealth":true,"deviceType":"mobile"}"#,
        )
        .unwrap();
        assert_eq!(settings.viewport.width, 800);
        assert!(settings.advanced_stealth);
        assert_eq!(settings.device_type.as_deref(), Some("mobile"));
    }

    #[test]
    fn test_session_handle_serializes_without_empty_urls() {
        let handle = SessionHandle {
            session_id: "sess-1".to_string(),
            session_url: None,
            debugger_url: Some("https://live.example/sess-1".to_string()),
            debugger_fullscreen_url: None,
            ws_url: None,
        };
        let json = serde_json::to_value(&handle).unwrap();
        assert_eq!(json["sessionId"], "sess-1");
        assert!(json.get("sessionUrl").is_none());
        assert_eq!(json["debuggerUrl"], "https://live.example/sess-1");
    }
}
