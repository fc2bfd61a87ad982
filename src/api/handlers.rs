//! API handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use base64::Engine;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::error::ApiError;
use super::state::AppState;
use crate::capability::{AggregateMetrics, RemoteCapability};
use crate::eval::{compare_data_uris, EvalSpec};
use crate::metrics::export_metrics;
use crate::runner::{
    AgentDirectedRun, FindFlightRun, RunResult, RunStrategy, TaskRequest, TaskRunner,
};
use crate::session::{BrowserSettings, SessionHandle};

/// A field that accepts either one value or an array of values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Per-run parameter set. Each set gets its own session; an array of
/// sets runs concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunParameters {
    /// Model to drive the browser with; the service default applies
    /// when unset.
    pub model_name: Option<String>,
    /// Enable the provider's advanced stealth mode.
    pub advanced_stealth: bool,
    /// Route through the provider's proxy pool.
    pub proxies: bool,
    /// Opt into experimental capability features.
    pub experimental: bool,
    /// Device profile to emulate.
    pub device_type: Option<String>,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            model_name: None,
            advanced_stealth: false,
            proxies: false,
            experimental: false,
            device_type: Some("mac".to_string()),
        }
    }
}

/// Frontend-shaped metrics summary derived from the aggregate counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsView {
    pub execution_time: u64,
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl From<&AggregateMetrics> for MetricsView {
    fn from(metrics: &AggregateMetrics) -> Self {
        Self {
            execution_time: metrics.total_inference_time_ms,
            total_tokens: metrics.total_tokens(),
            prompt_tokens: metrics.total_prompt_tokens,
            completion_tokens: metrics.total_completion_tokens,
        }
    }
}

/// Outcome of one workflow execution within a task request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunReport {
    /// Live-view URL for the session, when it could be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_url: Option<String>,
    /// Metrics summary for the frontend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsView>,
    /// The full run result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunResult>,
    /// Error message when this workflow failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The parameter set this workflow ran with.
    pub params: RunParameters,
}

/// Response for task execution endpoints.
#[derive(Debug, Serialize)]
pub struct TaskRunResponse {
    pub results: Vec<WorkflowRunReport>,
}

/// Request body for the agent-directed workflow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTaskBody {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub eval_spec: EvalSpec,
    #[serde(default)]
    pub parameters: Option<OneOrMany<RunParameters>>,
}

/// Request body for the scripted flight workflow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightTaskBody {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub confirmation_number: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub eval_spec: EvalSpec,
    #[serde(default)]
    pub parameters: Option<OneOrMany<RunParameters>>,
}

/// Runs the agent-directed workflow for each parameter set.
pub async fn execute_agent_task(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AgentTaskBody>,
) -> Result<Json<TaskRunResponse>, ApiError> {
    let parameter_sets = parameter_sets(body.parameters);
    let task = TaskRequest {
        url: body.url,
        instruction: body.instruction.clone(),
        eval_spec: body.eval_spec,
    }
    .validate()?;

    let strategy = AgentDirectedRun::new(&body.instruction);
    let results = run_parameter_sets(&state, &task, &strategy, parameter_sets).await;

    Ok(Json(TaskRunResponse { results }))
}

/// Runs the scripted flight workflow for each parameter set.
pub async fn execute_flight_task(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FlightTaskBody>,
) -> Result<Json<TaskRunResponse>, ApiError> {
    if body.confirmation_number.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required field: confirmationNumber".to_string(),
        ));
    }
    if body.last_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required field: lastName".to_string(),
        ));
    }

    let parameter_sets = parameter_sets(body.parameters);
    let task = TaskRequest {
        url: body.url,
        instruction: String::new(),
        eval_spec: body.eval_spec,
    }
    .validate_scripted()?;

    let strategy = FindFlightRun::new(&body.confirmation_number, &body.last_name);
    let results = run_parameter_sets(&state, &task, &strategy, parameter_sets).await;

    Ok(Json(TaskRunResponse { results }))
}

fn parameter_sets(parameters: Option<OneOrMany<RunParameters>>) -> Vec<RunParameters> {
    let sets = parameters.map(OneOrMany::into_vec).unwrap_or_default();
    if sets.is_empty() {
        vec![RunParameters::default()]
    } else {
        sets
    }
}

/// Runs one workflow per parameter set, concurrently, each against its
/// own session. Failures are isolated per set.
async fn run_parameter_sets(
    state: &AppState,
    task: &crate::runner::TaskSpec,
    strategy: &dyn RunStrategy,
    parameter_sets: Vec<RunParameters>,
) -> Vec<WorkflowRunReport> {
    info!(
        workflow = strategy.name(),
        sets = parameter_sets.len(),
        "Starting workflow execution"
    );

    let runs = parameter_sets
        .into_iter()
        .map(|params| run_workflow(state, task, strategy, params));
    join_all(runs).await
}

/// Runs one workflow with one parameter set against a fresh session.
async fn run_workflow(
    state: &AppState,
    task: &crate::runner::TaskSpec,
    strategy: &dyn RunStrategy,
    params: RunParameters,
) -> WorkflowRunReport {
    let settings = BrowserSettings {
        proxies: params.proxies,
        advanced_stealth: params.advanced_stealth,
        device_type: params.device_type.clone(),
        ..Default::default()
    };

    let mut automation = state.automation.clone();
    if let Some(model) = &params.model_name {
        automation.model = model.clone();
    }

    let capability = match RemoteCapability::start(&automation, &settings).await {
        Ok(capability) => capability,
        Err(e) => {
            error!("Failed to start automation session: {}", e);
            state.collector.record_run(strategy.name(), "error", 0.0, None);
            return WorkflowRunReport {
                debugger_url: None,
                metrics: None,
                run: None,
                error: Some(e.to_string()),
                params,
            };
        }
    };

    // Live view is best-effort; a run is still useful without it.
    let debugger_url = match state.provider.debug_info(capability.session_id()).await {
        Ok(debug_info) => debug_info.debugger_url,
        Err(e) => {
            warn!("Failed to resolve live-view URL: {}", e);
            None
        }
    };

    let runner = TaskRunner::new(state.run_config.clone());
    match runner.run(task, strategy, Box::new(capability)).await {
        Ok(result) => {
            let status = if result.success { "success" } else { "failed" };
            state.collector.record_run(
                strategy.name(),
                status,
                result.duration.as_secs_f64(),
                Some(&result.metrics),
            );
            WorkflowRunReport {
                debugger_url,
                metrics: Some(MetricsView::from(&result.metrics)),
                run: Some(result),
                error: None,
                params,
            }
        }
        Err(e) => {
            error!("Workflow failed: {}", e);
            state.collector.record_run(strategy.name(), "error", 0.0, None);
            WorkflowRunReport {
                debugger_url,
                metrics: None,
                run: None,
                error: Some(e.to_string()),
                params,
            }
        }
    }
}

/// Request body for session creation.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionBody {
    #[serde(default)]
    pub settings: Option<BrowserSettings>,
}

/// Creates a provider session and returns its handle with live-view URLs.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<SessionHandle>, ApiError> {
    let settings = body.settings.unwrap_or_default();
    let handle = state.provider.create(&settings).await?;
    Ok(Json(handle))
}

/// Request body naming an existing session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdBody {
    #[serde(default)]
    pub session_id: String,
}

/// Response for the live-view endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveViewResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_fullscreen_url: Option<String>,
    pub pages: Vec<serde_json::Value>,
}

/// Resolves live-view/debug URLs for an existing session.
pub async fn session_liveview(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SessionIdBody>,
) -> Result<Json<LiveViewResponse>, ApiError> {
    if body.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required field: sessionId".to_string(),
        ));
    }

    let debug_info = state.provider.debug_info(&body.session_id).await?;
    Ok(Json(LiveViewResponse {
        session_id: body.session_id,
        debugger_url: debug_info.debugger_url,
        debugger_fullscreen_url: debug_info.debugger_fullscreen_url,
        pages: debug_info.pages,
    }))
}

/// Response for the screenshot endpoint.
#[derive(Debug, Serialize)]
pub struct ScreenshotResponse {
    /// PNG image encoded as a data URI.
    pub screenshot: String,
}

/// Captures a screenshot of a session's current page.
pub async fn session_screenshot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SessionIdBody>,
) -> Result<Json<ScreenshotResponse>, ApiError> {
    if body.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required field: sessionId".to_string(),
        ));
    }

    let bytes = state.provider.screenshot(&body.session_id).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(Json(ScreenshotResponse {
        screenshot: format!("data:image/png;base64,{}", encoded),
    }))
}

/// Request body for screenshot comparison.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareBody {
    #[serde(default)]
    pub manual_screenshot: String,
    #[serde(default)]
    pub agent_screenshot: String,
}

/// Response for screenshot comparison.
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub score: u32,
    pub success: bool,
    pub message: String,
}

/// Compares a manually captured screenshot against the agent's.
pub async fn compare_screenshots(
    Json(body): Json<CompareBody>,
) -> Result<Json<CompareResponse>, ApiError> {
    if body.manual_screenshot.is_empty() || body.agent_screenshot.is_empty() {
        return Err(ApiError::BadRequest(
            "Both manual and agent screenshots are required".to_string(),
        ));
    }

    let outcome = compare_data_uris(&body.manual_screenshot, &body.agent_screenshot);
    let message = if outcome.success {
        "Agent successfully completed the task!"
    } else {
        "Agent did not match the expected result."
    };

    Ok(Json(CompareResponse {
        score: outcome.score,
        success: outcome.success,
        message: message.to_string(),
    }))
}

/// Request body for the robots.txt probe.
#[derive(Debug, Deserialize)]
pub struct RobotsBody {
    #[serde(default)]
    pub url: String,
}

/// Response for the robots.txt probe.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsResponse {
    pub has_robots: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probes whether the target site serves a robots.txt.
///
/// Probe failures are reported in-band (`hasRobots: false` plus an error
/// message) rather than as an HTTP error.
pub async fn check_robots(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RobotsBody>,
) -> Result<Json<RobotsResponse>, ApiError> {
    if body.url.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Missing required field: url".to_string(),
        ));
    }

    let normalized = if body.url.starts_with("http") {
        body.url.clone()
    } else {
        format!("https://{}", body.url)
    };

    let robots_url = reqwest::Url::parse(&normalized)
        .and_then(|base| base.join("/robots.txt"))
        .map_err(|e| ApiError::BadRequest(format!("Invalid URL: {}", e)))?;

    match state.http_client.get(robots_url).send().await {
        Ok(response) => Ok(Json(RobotsResponse {
            has_robots: response.status() == reqwest::StatusCode::OK,
            error: None,
        })),
        Err(e) => {
            warn!("robots.txt probe failed: {}", e);
            Ok(Json(RobotsResponse {
                has_robots: false,
                error: Some(e.to_string()),
            }))
        }
    }
}

/// Health check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Prometheus metrics in text format.
pub async fn metrics() -> String {
    export_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_accept_single_object() {
        let body: AgentTaskBody = serde_json::from_str(
            r#"{"url":"https://example.com","instruction":"go","parameters":{"modelName":"gpt-4o"}}"#,
        )
        .unwrap();
        let sets = parameter_sets(body.parameters);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].model_name.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_parameters_accept_array() {
        let body: AgentTaskBody = serde_json::from_str(
            r#"{"url":"u","instruction":"i","parameters":[{"proxies":true},{"advancedStealth":true}]}"#,
        )
        .unwrap();
        let sets = parameter_sets(body.parameters);
        assert_eq!(sets.len(), 2);
        assert!(sets[0].proxies);
        assert!(sets[1].advanced_stealth);
    }

    #[test]
    fn test_parameters_default_when_absent() {
        let body: AgentTaskBody =
            serde_json::from_str(r#"{"url":"u","instruction":"i"}"#).unwrap();
        let sets = parameter_sets(body.parameters);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].device_type.as_deref(), Some("mac"));
        assert!(!sets[0].proxies);
    }

    #[test]
    fn test_metrics_view_from_aggregate() {
        let metrics = AggregateMetrics {
            total_prompt_tokens: 1000,
            total_completion_tokens: 200,
            total_inference_time_ms: 9000,
            extra: Default::default(),
        };
        let view = MetricsView::from(&metrics);
        assert_eq!(view.execution_time, 9000);
        assert_eq!(view.total_tokens, 1200);
    }
}
