//! Error types for the function host.

use thiserror::Error;

use nimbus_envelope::EnvelopeError;
use nimbus_pipeline::PipelineError;

use crate::lifecycle::LifecycleState;

/// Errors surfaced by the host to the platform caller.
#[derive(Debug, Error)]
pub enum HostError {
    /// An init hook failed. Captured once at cold start and replayed to
    /// every subsequent invocation attempt without re-running init.
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Structural misuse of the builder surface, e.g. finalizing more than
    /// one handler pipeline. Surfaced at build time, before any invocation.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The host was asked to do something its current state forbids.
    #[error("Host is {state:?}: request rejected")]
    InvalidState {
        /// The state the host was in.
        state: LifecycleState,
    },

    /// Envelope extraction or packing failed for this invocation.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The handler or a middleware failed for this invocation.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
