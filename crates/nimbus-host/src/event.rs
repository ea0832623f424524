//! Raw platform event and response shapes.

use tokio::time::Instant;

/// One platform delivery: the opaque event body plus invocation metadata.
///
/// The platform poll loop that produces these is an external collaborator;
/// the host only consumes them.
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// Platform-assigned invocation identifier, if any.
    pub invocation_id: Option<String>,
    /// Opaque event body.
    pub body: Vec<u8>,
    /// Absolute deadline the platform reported for this invocation.
    pub deadline: Option<Instant>,
}

impl RawEvent {
    /// Create an event from a body.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            invocation_id: None,
            body: body.into(),
            deadline: None,
        }
    }

    /// Set the platform invocation identifier.
    pub fn with_invocation_id(mut self, id: impl Into<String>) -> Self {
        self.invocation_id = Some(id.into());
        self
    }

    /// Set the platform-reported deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Packed response body returned to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Packed response body.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// The response body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the response, returning the body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}
