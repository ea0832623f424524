//! Envelope codecs bridging raw bodies and the feature set.
//!
//! A codec runs at the edges of one invocation cycle: `extract` turns the
//! raw request body into a typed payload in the context's feature set before
//! the pipeline runs, `pack` serializes the typed response the terminal
//! handler left in the feature set back into the response body. Core code
//! depends only on this trait, never on a concrete envelope variant.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use nimbus_core::InvocationContext;
use nimbus_envelope::{BatchEnvelope, Envelope, EnvelopeError, EventEnvelope, SerializationConfig};

/// Extracts the request envelope and packs the response envelope for one
/// invocation.
pub trait EventCodec: Send + Sync {
    /// Populate the feature set from the raw request body.
    fn extract(
        &self,
        ctx: &mut InvocationContext,
        config: &SerializationConfig,
    ) -> Result<(), EnvelopeError>;

    /// Serialize the typed response from the feature set into the raw
    /// response body.
    fn pack(
        &self,
        ctx: &mut InvocationContext,
        config: &SerializationConfig,
    ) -> Result<(), EnvelopeError>;
}

/// Codec for API-style single-payload events: `T` in, `R` out.
pub struct EventPayloadCodec<T, R> {
    _marker: PhantomData<fn() -> (T, R)>,
}

impl<T, R> EventPayloadCodec<T, R> {
    /// Create the codec.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T, R> Default for EventPayloadCodec<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> EventCodec for EventPayloadCodec<T, R>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn extract(
        &self,
        ctx: &mut InvocationContext,
        config: &SerializationConfig,
    ) -> Result<(), EnvelopeError> {
        let mut envelope = EventEnvelope::<T>::from_body(ctx.request_body.clone());
        envelope.extract_payload(config)?;
        let payload = envelope.take_payload().ok_or(EnvelopeError::MissingPayload)?;
        ctx.features.insert(payload);
        Ok(())
    }

    fn pack(
        &self,
        ctx: &mut InvocationContext,
        config: &SerializationConfig,
    ) -> Result<(), EnvelopeError> {
        // A short-circuiting middleware may finish the invocation without a
        // typed response; the response body then stays empty.
        let Some(response) = ctx.features.remove::<R>() else {
            return Ok(());
        };
        let mut envelope = EventEnvelope::from_payload(response);
        envelope.pack_payload(config)?;
        ctx.response_body = envelope.into_body();
        Ok(())
    }
}

/// Codec for batched stream-style events: the whole [`BatchEnvelope`] moves
/// through the feature set so per-record statuses survive the pipeline.
pub struct BatchPayloadCodec<T, R> {
    _marker: PhantomData<fn() -> (T, R)>,
}

impl<T, R> BatchPayloadCodec<T, R> {
    /// Create the codec.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T, R> Default for BatchPayloadCodec<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> EventCodec for BatchPayloadCodec<T, R>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn extract(
        &self,
        ctx: &mut InvocationContext,
        config: &SerializationConfig,
    ) -> Result<(), EnvelopeError> {
        let mut envelope = BatchEnvelope::<T>::from_body(&ctx.request_body)?;
        envelope.extract_payload(config)?;
        ctx.features.insert(envelope);
        Ok(())
    }

    fn pack(
        &self,
        ctx: &mut InvocationContext,
        config: &SerializationConfig,
    ) -> Result<(), EnvelopeError> {
        let Some(mut envelope) = ctx.features.remove::<BatchEnvelope<R>>() else {
            return Ok(());
        };
        envelope.pack_payload(config)?;
        ctx.response_body = envelope.into_body()?;
        Ok(())
    }
}
