//! HTTP API server.
//!
//! Thin boundary over the task runner and the provider clients:
//!
//! ```text
//! /api/tasks
//!   POST /api/tasks/agent      - Run the agent-directed workflow
//!   POST /api/tasks/flight     - Run the scripted flight workflow
//!
//! /api/sessions
//!   POST /api/sessions             - Create a provider session
//!   POST /api/sessions/liveview    - Live-view URLs for a session
//!   POST /api/sessions/screenshot  - Screenshot a session by id
//!
//! POST /api/compare  - Compare two screenshots
//! POST /api/robots   - Probe a site's robots.txt
//!
//! GET /health   - Health check
//! GET /metrics  - Prometheus metrics
//! ```
//!
//! Missing required fields answer 400, upstream and internal failures
//! answer 500, both with a JSON `{"error": "..."}` body.

pub mod error;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use state::AppState;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/tasks/agent", post(handlers::execute_agent_task))
        .route("/api/tasks/flight", post(handlers::execute_flight_task))
        .route("/api/sessions", post(handlers::create_session))
        .route("/api/sessions/liveview", post(handlers::session_liveview))
        .route("/api/sessions/screenshot", post(handlers::session_screenshot))
        .route("/api/compare", post(handlers::compare_screenshots))
        .route("/api/robots", post(handlers::check_robots))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The API server.
pub struct ApiServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new server.
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Gets the server address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Starts the server.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let app = router(self.state.clone());

        let addr: SocketAddr = self.addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!("API server listening on {}", addr);
        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_server_addr_format() {
        let config = ServerConfig::new("0.0.0.0", 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
    }
}
