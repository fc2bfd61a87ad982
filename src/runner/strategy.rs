//! Run strategies: how the task's actions are performed.
//!
//! The choice between handing the whole task to the autonomous agent and
//! replaying a fixed scripted sequence is a property of which strategy is
//! invoked, not a runtime branch inside the runner. The interface stays
//! narrow: execute against the capability, return any checkpoints and
//! self-describing extraction the strategy produced.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::executor::RunnerError;
use super::result::ScreenshotRecord;
use crate::capability::BrowserCapability;
use crate::error::CapabilityError;

/// Partial result produced by a strategy.
#[derive(Debug, Default)]
pub struct StrategyOutcome {
    /// Checkpoints captured while the strategy ran, in order.
    pub checkpoints: Vec<ScreenshotRecord>,
    /// Self-describing extraction (carries its own `success` flag), for
    /// strategies that extract as part of their script.
    pub extraction: Option<Value>,
}

/// One way of performing a task's actions against the capability.
#[async_trait]
pub trait RunStrategy: Send + Sync {
    /// Short name, used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Performs the task's actions. The capability is already navigated
    /// to the task URL when this is called.
    async fn execute(
        &self,
        capability: &mut dyn BrowserCapability,
        step_timeout: Duration,
    ) -> Result<StrategyOutcome, RunnerError>;
}

/// Hands the task to the autonomous agent as a single directive.
#[derive(Debug, Clone)]
pub struct AgentDirectedRun {
    instruction: String,
}

impl AgentDirectedRun {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
        }
    }
}

#[async_trait]
impl RunStrategy for AgentDirectedRun {
    fn name(&self) -> &'static str {
        "agent"
    }

    async fn execute(
        &self,
        capability: &mut dyn BrowserCapability,
        step_timeout: Duration,
    ) -> Result<StrategyOutcome, RunnerError> {
        info!("Handing task to the autonomous agent");
        timed_action(
            "agent execution",
            step_timeout,
            capability.agent_execute(&self.instruction),
        )
        .await?;
        Ok(StrategyOutcome::default())
    }
}

/// Scripted flight lookup: fill the confirmation form, submit, then
/// extract the flight information with a self-describing schema.
#[derive(Debug, Clone)]
pub struct FindFlightRun {
    confirmation_number: String,
    last_name: String,
}

impl FindFlightRun {
    pub fn new(confirmation_number: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            confirmation_number: confirmation_number.into(),
            last_name: last_name.into(),
        }
    }

    fn extraction_schema() -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "success": {
                    "type": "boolean",
                    "description": "Whether flight info was found successfully",
                },
                "message": { "type": "string" },
                "flightInformation": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "flightNumber": { "type": "string" },
                            "departureDate": { "type": "string" },
                            "arrivalDate": { "type": "string" },
                            "departureAirport": { "type": "string" },
                            "arrivalAirport": { "type": "string" },
                        },
                    },
                },
            },
            "required": ["success"],
        })
    }
}

#[async_trait]
impl RunStrategy for FindFlightRun {
    fn name(&self) -> &'static str {
        "find-flight"
    }

    async fn execute(
        &self,
        capability: &mut dyn BrowserCapability,
        step_timeout: Duration,
    ) -> Result<StrategyOutcome, RunnerError> {
        let mut outcome = StrategyOutcome::default();

        timed_action(
            "fill confirmation number",
            step_timeout,
            capability.act(&format!(
                "Fill in the Confirmation Number field with \"{}\"",
                self.confirmation_number
            )),
        )
        .await?;

        timed_action(
            "fill last name",
            step_timeout,
            capability.act(&format!(
                "Fill in the Last Name field with \"{}\"",
                self.last_name
            )),
        )
        .await?;

        let bytes = capability.screenshot().await?;
        outcome
            .checkpoints
            .push(ScreenshotRecord::from_png("Filled confirmation and last name", &bytes));

        timed_action(
            "submit search",
            step_timeout,
            capability.act("Click the next or search button to find the flight"),
        )
        .await?;

        let bytes = capability.screenshot().await?;
        outcome
            .checkpoints
            .push(ScreenshotRecord::from_png("Search results page", &bytes));

        info!("Extracting flight information");
        let extraction = timed_action(
            "extract flight information",
            step_timeout,
            capability.extract(
                "Extract the flight information shown on the page (flight number, airports, and dates).",
                &Self::extraction_schema(),
            ),
        )
        .await?;
        outcome.extraction = Some(extraction);

        Ok(outcome)
    }
}

/// Bounds a capability call with the per-step timeout, mapping failures
/// to action errors for the given step label.
pub(crate) async fn timed_action<T>(
    step: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T, CapabilityError>> + Send,
) -> Result<T, RunnerError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(RunnerError::Action {
            step: step.to_string(),
            source,
        }),
        Err(_) => Err(RunnerError::Timeout {
            step: step.to_string(),
            limit,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names() {
        assert_eq!(AgentDirectedRun::new("x").name(), "agent");
        assert_eq!(FindFlightRun::new("ABC123", "Doe").name(), "find-flight");
    }

    #[test]
    fn test_flight_schema_is_self_describing() {
        let schema = FindFlightRun::extraction_schema();
        assert_eq!(schema["properties"]["success"]["type"], "boolean");
        assert_eq!(schema["required"][0], "success");
    }

    #[tokio::test]
    async fn test_timed_action_times_out() {
        let err = timed_action("slow step", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), CapabilityError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { .. }));
    }
}
