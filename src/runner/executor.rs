//! Task executor - the main runner logic.

use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::RunConfig;
use super::result::{EvalInput, RunResult, ScreenshotRecord};
use super::strategy::RunStrategy;
use super::task::TaskSpec;
use crate::capability::{action_descriptions, thought_log, AggregateMetrics, BrowserCapability};
use crate::error::CapabilityError;
use crate::eval::score;

/// The main task runner.
///
/// Each call to [`TaskRunner::run`] drives exactly one capability
/// instance through one task and closes it on every exit path, so a
/// remote session is never leaked.
pub struct TaskRunner {
    /// Configuration for runs.
    config: RunConfig,
}

impl TaskRunner {
    /// Creates a runner with the given configuration.
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Runs a task with the given strategy against the capability.
    ///
    /// The capability is closed unconditionally before this returns,
    /// whether the run succeeded or failed. Close failures are logged and
    /// never mask the run's own outcome.
    pub async fn run(
        &self,
        task: &TaskSpec,
        strategy: &dyn RunStrategy,
        mut capability: Box<dyn BrowserCapability>,
    ) -> Result<RunResult, RunnerError> {
        let run_id = format!("run-{}", Uuid::new_v4());
        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            "Starting run {} with workflow {} on {}",
            run_id,
            strategy.name(),
            task.url
        );

        let outcome = self.drive(task, strategy, capability.as_mut()).await;

        if let Err(e) = capability.close().await {
            warn!("Run {}: failed to close capability session: {}", run_id, e);
        }

        let artifacts = match outcome {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!("Run {} failed: {}", run_id, e);
                return Err(e);
            }
        };

        let duration = start.elapsed();
        info!(
            "Run {} completed in {:?} with success={}",
            run_id, duration, artifacts.success
        );

        let eval_input = EvalInput {
            screenshots: artifacts
                .screenshots
                .iter()
                .map(|s| s.screenshot.clone())
                .collect(),
            action_history: artifacts.action_history.clone(),
            thoughts: artifacts.thoughts.clone(),
        };

        Ok(RunResult {
            run_id,
            started_at,
            duration,
            metrics: artifacts.metrics,
            screenshots: artifacts.screenshots,
            extracted: artifacts.extracted,
            success: artifacts.success,
            action_history: artifacts.action_history,
            thoughts: artifacts.thoughts,
            eval_input,
        })
    }

    /// Performs the run steps against an open capability. The caller owns
    /// closing the capability regardless of this function's outcome.
    async fn drive(
        &self,
        task: &TaskSpec,
        strategy: &dyn RunStrategy,
        capability: &mut dyn BrowserCapability,
    ) -> Result<DriveArtifacts, RunnerError> {
        let limit = self.config.step_timeout;

        // Navigation failure is fatal for the run; no retry at this layer.
        match tokio::time::timeout(limit, capability.navigate(&task.url)).await {
            Ok(Ok(())) => {}
            Ok(Err(source)) => return Err(RunnerError::Navigation(source)),
            Err(_) => {
                return Err(RunnerError::Timeout {
                    step: "navigate".to_string(),
                    limit,
                })
            }
        }

        let mut screenshots = Vec::new();
        let bytes = capability.screenshot().await?;
        screenshots.push(ScreenshotRecord::from_png("Initial page load", &bytes));

        let strategy_outcome = strategy.execute(capability, limit).await?;
        screenshots.extend(strategy_outcome.checkpoints);

        let bytes = capability.screenshot().await?;
        screenshots.push(ScreenshotRecord::from_png("Task completion", &bytes));

        let (extracted, success) = match &task.eval {
            Some(eval) => {
                // Extraction failures are recovered locally: the run
                // completes with an empty result and success forced false.
                let extraction = tokio::time::timeout(
                    limit,
                    capability.extract(&eval.extraction_prompt(), &eval.extraction_schema()),
                )
                .await;

                match extraction {
                    Ok(Ok(value)) => {
                        let map = value.as_object().cloned().unwrap_or_default();
                        let report = score(&map, eval);
                        for check in report.checks.iter().filter(|c| !c.passed) {
                            debug!(
                                field = %check.field,
                                expected = %check.expected,
                                actual = %check.actual,
                                "Field check failed"
                            );
                        }
                        (map, report.success)
                    }
                    Ok(Err(e)) => {
                        warn!("Extraction failed, completing run as unsuccessful: {}", e);
                        (Map::new(), false)
                    }
                    Err(_) => {
                        warn!("Extraction timed out, completing run as unsuccessful");
                        (Map::new(), false)
                    }
                }
            }
            None => match strategy_outcome.extraction {
                Some(value) => {
                    let map = value.as_object().cloned().unwrap_or_default();
                    let success = map
                        .get("success")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    (map, success)
                }
                None => (Map::new(), false),
            },
        };

        let metrics = capability.metrics().await?;
        let history = capability.history().await?;
        let action_history = action_descriptions(&history);
        let thoughts = thought_log(&history);

        Ok(DriveArtifacts {
            screenshots,
            extracted,
            success,
            metrics,
            action_history,
            thoughts,
        })
    }
}

/// Everything a completed drive produced, before the run envelope is added.
struct DriveArtifacts {
    screenshots: Vec<ScreenshotRecord>,
    extracted: Map<String, Value>,
    success: bool,
    metrics: AggregateMetrics,
    action_history: Vec<String>,
    thoughts: Vec<String>,
}

/// Error types for the runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Navigation failed: {0}")]
    Navigation(#[source] CapabilityError),

    #[error("Action '{step}' failed: {source}")]
    Action {
        step: String,
        #[source]
        source: CapabilityError,
    },

    #[error("Step '{step}' timed out after {limit:?}")]
    Timeout { step: String, limit: Duration },

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_creation() {
        let runner = TaskRunner::new(RunConfig::new().with_step_timeout(Duration::from_secs(10)));
        assert_eq!(runner.config.step_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_runner_error_display() {
        let err = RunnerError::Timeout {
            step: "navigate".to_string(),
            limit: Duration::from_secs(5),
        };
        assert!(err.to_string().contains("navigate"));
    }
}
