//! Error types for pipeline execution.

use thiserror::Error;

/// Errors raised while executing the invocation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The handler or a middleware failed. Propagates out of the chain
    /// unmodified unless a middleware explicitly catches it.
    #[error("Handler failed: {0}")]
    Handler(#[from] anyhow::Error),

    /// A declared parameter could not be resolved before the terminal handler.
    #[error("Parameter binding failed for '{name}': {reason}")]
    Binding { name: String, reason: String },
}

impl PipelineError {
    /// Create a binding error.
    pub fn binding(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Binding {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
