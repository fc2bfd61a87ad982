//! Task runner for browser automation runs.
//!
//! This module orchestrates one task execution end to end:
//!
//! ```text
//! TaskRequest → validate → navigate → act → screenshots → extract → score → close
//! ```
//!
//! The runner:
//! 1. Validates the request (including eval spec compilation) before any
//!    remote session exists
//! 2. Drives the browser capability through the run strategy
//! 3. Captures screenshots at the defined checkpoints
//! 4. Extracts and scores results when an eval spec was supplied
//! 5. Closes the capability on every exit path
//!
//! # Example
//!
//! ```ignore
//! use webgauge::runner::{AgentDirectedRun, RunConfig, TaskRequest, TaskRunner};
//!
//! let task = TaskRequest::new("https://shop.example", "Add a blue mug to the cart")
//!     .validate()?;
//! let strategy = AgentDirectedRun::new("Add a blue mug to the cart");
//!
//! let runner = TaskRunner::new(RunConfig::default());
//! let result = runner.run(&task, &strategy, capability).await?;
//!
//! println!("success: {}", result.success);
//! ```

pub mod config;
pub mod executor;
pub mod result;
pub mod strategy;
pub mod task;

pub use config::RunConfig;
pub use executor::{RunnerError, TaskRunner};
pub use result::{EvalInput, RunResult, ScreenshotRecord};
pub use strategy::{AgentDirectedRun, FindFlightRun, RunStrategy, StrategyOutcome};
pub use task::{TaskRequest, TaskSpec};
