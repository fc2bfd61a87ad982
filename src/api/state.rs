//! Shared state for API handlers.

use reqwest::Client;

use crate::capability::AutomationConfig;
use crate::metrics::MetricsCollector;
use crate::runner::RunConfig;
use crate::session::SessionClient;

/// State shared across all API handlers.
///
/// All external configuration is resolved before construction; handlers
/// never read the environment themselves.
pub struct AppState {
    /// Client for the session hosting provider.
    pub provider: SessionClient,
    /// Automation service configuration for capability construction.
    pub automation: AutomationConfig,
    /// Runner configuration applied to every run.
    pub run_config: RunConfig,
    /// Metrics facade.
    pub collector: MetricsCollector,
    /// General-purpose HTTP client (robots probing).
    pub http_client: Client,
}

impl AppState {
    /// Creates the state from resolved configuration.
    pub fn new(provider: SessionClient, automation: AutomationConfig, run_config: RunConfig) -> Self {
        Self {
            provider,
            automation,
            run_config,
            collector: MetricsCollector::new(),
            http_client: Client::new(),
        }
    }
}
