//! Envelope contract for the Nimbus function-invocation runtime.
//!
//! An envelope pairs a platform-native event body with a typed payload and
//! is the only place payload (de)serialization happens: `extract_payload`
//! populates the typed value from the native body on the request path,
//! `pack_payload` serializes it back on the response path. Handlers never
//! touch raw bytes.

mod batch;
mod error;
mod event;
mod serialization;

pub use batch::*;
pub use error::*;
pub use event::*;
pub use serialization::*;

/// Bidirectional adapter between a raw event body and a typed payload.
///
/// Extraction and packing are idempotent for a fixed configuration; core
/// code depends only on this contract, never on a concrete variant.
pub trait Envelope {
    /// The typed payload carried by this envelope.
    type Payload;

    /// Populate the typed payload from the native body.
    fn extract_payload(&mut self, config: &SerializationConfig) -> Result<(), EnvelopeError>;

    /// Serialize the typed payload back into the native body.
    fn pack_payload(&mut self, config: &SerializationConfig) -> Result<(), EnvelopeError>;
}
