//! Error types for envelope extraction and packing.

use thiserror::Error;

/// Errors raised at the envelope boundary.
///
/// These propagate to the invocation caller as an invocation failure;
/// nothing at this layer retries or swallows them.
#[derive(Debug, Clone, Error)]
pub enum EnvelopeError {
    /// Malformed input on the request path.
    #[error("Payload deserialization failed: {0}")]
    PayloadDeserialization(String),

    /// Unserializable output on the response path.
    #[error("Payload serialization failed: {0}")]
    PayloadSerialization(String),

    /// `pack_payload` called before a payload was set or extracted.
    #[error("No payload to pack")]
    MissingPayload,
}
