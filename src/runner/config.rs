//! Configuration for task runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for running a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Upper bound for any single capability call (navigate, act, agent
    /// execution, extraction). The upstream capability can hang
    /// indefinitely on a broken page; exceeding the bound fails the run
    /// like any other step error.
    pub step_timeout: Duration,
}

impl RunConfig {
    /// Creates a run configuration with defaults.
    pub fn new() -> Self {
        Self {
            step_timeout: Duration::from_secs(300),
        }
    }

    /// Sets the per-step timeout.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::new();
        assert_eq!(config.step_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_run_config_builder() {
        let config = RunConfig::new().with_step_timeout(Duration::from_secs(30));
        assert_eq!(config.step_timeout, Duration::from_secs(30));
    }
}
