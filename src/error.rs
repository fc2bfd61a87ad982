//! Error types for webgauge operations.
//!
//! Defines error types for the major subsystems:
//! - Task input validation and evaluation spec compilation
//! - Remote session hosting provider calls
//! - Browser automation capability calls

use thiserror::Error;

/// Errors raised while validating a task request, before any remote
/// session is created.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field '{field}' expects a numeric value, got '{value}'")]
    UnparsableNumber { field: String, value: String },
}

/// Errors from the remote session hosting provider.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing API key: provider API key not configured")]
    MissingApiKey,

    #[error("Missing project id: provider project id not configured")]
    MissingProjectId,

    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

/// Errors from the browser automation capability.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Missing API base URL: automation endpoint not configured")]
    MissingApiBase,

    #[error("Automation API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Automation request failed: {0}")]
    Transport(String),

    #[error("Failed to parse automation response: {0}")]
    Parse(String),
}
