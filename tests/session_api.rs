//! Integration tests for the provider and automation HTTP clients.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webgauge::capability::{AutomationConfig, BrowserCapability, RemoteCapability};
use webgauge::error::SessionError;
use webgauge::session::{BrowserSettings, SessionClient};

fn client(server: &MockServer) -> SessionClient {
    SessionClient::new(server.uri(), "test-key", "proj-1")
}

#[tokio::test]
async fn create_session_resolves_live_view_urls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions"))
        .and(header("X-API-Key", "test-key"))
        .and(body_partial_json(json!({"projectId": "proj-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sess-42",
            "sessionUrl": "https://provider.example/sessions/sess-42",
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/sessions/sess-42/debug"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "debuggerUrl": "https://live.example/sess-42",
            "debuggerFullscreenUrl": "https://live.example/sess-42/full",
            "wsUrl": "wss://live.example/sess-42",
            "pages": [],
        })))
        .mount(&server)
        .await;

    let handle = client(&server)
        .create(&BrowserSettings::default())
        .await
        .unwrap();

    assert_eq!(handle.session_id, "sess-42");
    assert_eq!(
        handle.debugger_url.as_deref(),
        Some("https://live.example/sess-42")
    );
    assert_eq!(handle.ws_url.as_deref(), Some("wss://live.example/sess-42"));
}

#[tokio::test]
async fn create_session_surfaces_provider_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server)
        .create(&BrowserSettings::default())
        .await
        .unwrap_err();

    match err {
        SessionError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn screenshot_returns_raw_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/sessions/sess-42/screenshot"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
        .mount(&server)
        .await;

    let bytes = client(&server).screenshot("sess-42").await.unwrap();
    assert_eq!(bytes, vec![0x89, 0x50, 0x4e, 0x47]);
}

#[tokio::test]
async fn release_posts_release_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions/sess-42"))
        .and(body_partial_json(json!({"status": "REQUEST_RELEASE"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "sess-42"})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).release("sess-42").await.unwrap();
}

#[tokio::test]
async fn remote_capability_drives_the_automation_service() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions"))
        .and(header("Authorization", "Bearer auto-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"sessionId": "auto-7"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions/auto-7/navigate"))
        .and(body_partial_json(json!({"url": "https://example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions/auto-7/extract"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"title": "Example Domain"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/sessions/auto-7/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalPromptTokens": 500,
            "totalCompletionTokens": 100,
            "totalInferenceTimeMs": 2000,
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions/auto-7/end"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let config = AutomationConfig::new(server.uri()).with_api_key("auto-key");
    let mut capability = RemoteCapability::start(&config, &BrowserSettings::default())
        .await
        .unwrap();

    assert_eq!(capability.session_id(), "auto-7");

    capability.navigate("https://example.com").await.unwrap();

    let extracted = capability
        .extract("Extract the title", &json!({"type": "object"}))
        .await
        .unwrap();
    assert_eq!(extracted["title"], "Example Domain");

    let metrics = capability.metrics().await.unwrap();
    assert_eq!(metrics.total_tokens(), 600);

    capability.close().await.unwrap();
}

#[tokio::test]
async fn remote_capability_maps_upstream_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"sessionId": "auto-8"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/sessions/auto-8/navigate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("browser crashed"))
        .mount(&server)
        .await;

    let config = AutomationConfig::new(server.uri());
    let mut capability = RemoteCapability::start(&config, &BrowserSettings::default())
        .await
        .unwrap();

    let err = capability.navigate("https://example.com").await.unwrap_err();
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("browser crashed"));
}
