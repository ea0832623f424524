//! Single request/response event envelope.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EnvelopeError;
use crate::serialization::SerializationConfig;
use crate::Envelope;

/// Envelope for API-style event sources carrying one body per invocation.
///
/// On the request path the envelope is created from the platform body and
/// `extract_payload` populates the typed value; on the response path it is
/// created from the handler's typed result and `pack_payload` serializes it
/// into the body returned to the platform.
#[derive(Debug, Clone)]
pub struct EventEnvelope<T> {
    body: Vec<u8>,
    payload: Option<T>,
}

impl<T> EventEnvelope<T> {
    /// Create an envelope from a raw platform body.
    pub fn from_body(body: Vec<u8>) -> Self {
        Self {
            body,
            payload: None,
        }
    }

    /// Create an envelope from a typed payload awaiting packing.
    pub fn from_payload(payload: T) -> Self {
        Self {
            body: Vec::new(),
            payload: Some(payload),
        }
    }

    /// The extracted payload, if present.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Take ownership of the extracted payload.
    pub fn take_payload(&mut self) -> Option<T> {
        self.payload.take()
    }

    /// Replace the payload.
    pub fn set_payload(&mut self, payload: T) {
        self.payload = Some(payload);
    }

    /// The native body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the envelope, returning the native body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

impl<T> Envelope for EventEnvelope<T>
where
    T: Serialize + DeserializeOwned,
{
    type Payload = T;

    fn extract_payload(&mut self, config: &SerializationConfig) -> Result<(), EnvelopeError> {
        self.payload = Some(config.decode(&self.body)?);
        Ok(())
    }

    fn pack_payload(&mut self, config: &SerializationConfig) -> Result<(), EnvelopeError> {
        let payload = self.payload.as_ref().ok_or(EnvelopeError::MissingPayload)?;
        self.body = config.encode(payload)?;
        Ok(())
    }
}
