//! Per-invocation context passed through the handler pipeline.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio_util::sync::CancellationToken;

use crate::features::FeatureSet;
use crate::services::ServiceScope;

/// Unique invocation identifier for correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvocationId(pub String);

impl InvocationId {
    /// Generate a new invocation ID when the platform did not supply one.
    pub fn generate() -> Self {
        static SEQUENCE: AtomicU32 = AtomicU32::new(0);
        let id = format!(
            "{:x}-{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
            SEQUENCE.fetch_add(1, Ordering::Relaxed),
        );
        Self(id)
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-invocation aggregate handed to middleware and the terminal handler.
///
/// Created at the start of one invocation and dropped at its end; never
/// shared across invocations. Handlers do not touch the raw bodies directly,
/// envelope extraction and packing are the only readers/writers of those.
pub struct InvocationContext {
    /// Unique invocation identifier.
    pub invocation_id: InvocationId,
    /// Raw request body as delivered by the platform.
    pub request_body: Vec<u8>,
    /// Raw response body returned to the platform after packing.
    pub response_body: Vec<u8>,
    /// Invocation-scoped state, mutated only by this invocation's pipeline.
    pub features: FeatureSet,
    /// Invocation-scoped service resolver.
    pub services: ServiceScope,
    cancellation: CancellationToken,
}

impl InvocationContext {
    /// Create a context for one invocation.
    pub fn new(
        invocation_id: InvocationId,
        request_body: Vec<u8>,
        cancellation: CancellationToken,
        services: ServiceScope,
    ) -> Self {
        Self {
            invocation_id,
            request_body,
            response_body: Vec::new(),
            features: FeatureSet::new(),
            services,
            cancellation,
        }
    }

    /// The cooperative cancellation signal for this invocation.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the invocation deadline signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("invocation_id", &self.invocation_id)
            .field("request_len", &self.request_body.len())
            .field("response_len", &self.response_body.len())
            .field("features", &self.features)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceRegistry;
    use std::sync::Arc;

    fn context_with_body(body: &[u8]) -> InvocationContext {
        InvocationContext::new(
            InvocationId::generate(),
            body.to_vec(),
            CancellationToken::new(),
            ServiceScope::new(Arc::new(ServiceRegistry::new())),
        )
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let first = InvocationId::generate();
        let second = InvocationId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn test_new_context_starts_clean() {
        let ctx = context_with_body(b"{}");

        assert_eq!(ctx.request_body, b"{}");
        assert!(ctx.response_body.is_empty());
        assert!(ctx.features.is_empty());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_cancellation_is_observable() {
        let token = CancellationToken::new();
        let ctx = InvocationContext::new(
            InvocationId::from_string("inv-1"),
            Vec::new(),
            token.clone(),
            ServiceScope::new(Arc::new(ServiceRegistry::new())),
        );

        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
