//! Runtime configuration consumed by the host.

use std::time::Duration;

use crate::deadline::DEFAULT_DEADLINE_BUFFER;

/// Configuration for the invocation runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Safety margin subtracted from the platform deadline.
    pub deadline_buffer: Duration,
}

impl RuntimeConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self {
            deadline_buffer: DEFAULT_DEADLINE_BUFFER,
        }
    }

    /// Set the deadline safety buffer.
    pub fn with_deadline_buffer(mut self, buffer: Duration) -> Self {
        self.deadline_buffer = buffer;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
