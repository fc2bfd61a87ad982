//! webgauge: run, capture and score AI-agent web automation tasks.
//!
//! This library orchestrates browser automation runs against remote
//! sessions: navigate, act (agent-directed or scripted), capture
//! screenshots at checkpoints, extract structured results, and score
//! them against declarative expectations.

// Core modules
pub mod api;
pub mod capability;
pub mod cli;
pub mod error;
pub mod eval;
pub mod metrics;
pub mod runner;
pub mod session;

// Re-export commonly used error types
pub use error::{CapabilityError, SessionError, ValidationError};
