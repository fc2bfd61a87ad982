//! Task inputs and their validation.
//!
//! A `TaskRequest` is raw user input. Validation turns it into a
//! `TaskSpec` with a compiled evaluation spec, so a malformed request is
//! rejected before any remote session is created.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::eval::{compile, CompiledEval, EvalSpec};

/// Raw input for one task run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    /// Page the run starts on.
    pub url: String,
    /// Natural-language instruction for the agent-directed workflow.
    /// Scripted workflows carry their inputs in the strategy instead.
    #[serde(default)]
    pub instruction: String,
    /// Expected output fields for scoring; empty skips evaluation.
    #[serde(default)]
    pub eval_spec: EvalSpec,
}

impl TaskRequest {
    /// Creates a request with no evaluation spec.
    pub fn new(url: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            instruction: instruction.into(),
            eval_spec: EvalSpec::new(),
        }
    }

    /// Sets the evaluation spec.
    pub fn with_eval_spec(mut self, eval_spec: EvalSpec) -> Self {
        self.eval_spec = eval_spec;
        self
    }

    /// Validates the request into a runnable task.
    ///
    /// Requires a URL and an instruction, and compiles the evaluation
    /// spec. Scripted workflows that carry their own inputs should use
    /// [`TaskRequest::validate_scripted`].
    pub fn validate(self) -> Result<TaskSpec, ValidationError> {
        if self.instruction.trim().is_empty() {
            return Err(ValidationError::MissingField("instruction"));
        }
        self.validate_scripted()
    }

    /// Validates the request for a scripted workflow, which needs a URL
    /// but no instruction.
    pub fn validate_scripted(self) -> Result<TaskSpec, ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingField("url"));
        }
        let eval = compile(&self.eval_spec)?;
        Ok(TaskSpec {
            url: self.url,
            instruction: self.instruction,
            eval,
        })
    }
}

/// A validated, runnable task.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Page the run starts on.
    pub url: String,
    /// Instruction for the agent-directed workflow (may be empty for
    /// scripted workflows).
    pub instruction: String,
    /// Compiled evaluation spec; `None` when the request had no fields.
    pub eval: Option<CompiledEval>,
}
