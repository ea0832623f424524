//! Staged construction of the middleware chain.

use nimbus_core::InvocationContext;

use crate::error::PipelineError;
use crate::middleware::{
    middleware_transform, InvocationDelegate, Middleware, MiddlewareTransform,
};

/// Builder for the invocation pipeline.
///
/// Transforms are appended in registration order and the builder is
/// consumed by [`PipelineBuilder::build`], so a finalized pipeline can
/// never be mutated afterwards.
#[derive(Default)]
pub struct PipelineBuilder {
    transforms: Vec<MiddlewareTransform>,
}

impl PipelineBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Append a middleware transform to the chain.
    pub fn wrap(mut self, transform: MiddlewareTransform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Append a struct-style middleware to the chain.
    pub fn with_middleware<M: Middleware>(self, middleware: M) -> Self {
        self.wrap(middleware_transform(middleware))
    }

    /// Number of registered transforms.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether no middleware has been registered.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Compose the final pipeline around the terminal handler delegate.
    ///
    /// Transforms are folded in reverse registration order, so the
    /// first-registered middleware ends up outermost: for `wrap(A); wrap(B)`
    /// execution runs `A.before, B.before, handler, B.after, A.after`. With
    /// no middleware the pipeline is the raw handler.
    pub fn build(self, handler: InvocationDelegate) -> Pipeline {
        let mut entry = handler;
        for transform in self.transforms.into_iter().rev() {
            entry = transform(entry);
        }
        Pipeline { entry }
    }
}

/// Finalized, immutable invocation pipeline.
#[derive(Clone)]
pub struct Pipeline {
    entry: InvocationDelegate,
}

impl Pipeline {
    /// Execute the pipeline for one invocation.
    ///
    /// Any error raised by the handler or a middleware propagates here
    /// unmodified; nothing in the chain catches it implicitly.
    pub async fn execute(
        &self,
        ctx: InvocationContext,
    ) -> Result<InvocationContext, PipelineError> {
        (self.entry)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::delegate;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use nimbus_core::{InvocationId, ServiceRegistry, ServiceScope};
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    fn empty_context() -> InvocationContext {
        InvocationContext::new(
            InvocationId::generate(),
            Vec::new(),
            CancellationToken::new(),
            ServiceScope::new(Arc::new(ServiceRegistry::new())),
        )
    }

    type Trace = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        trace: Trace,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn handle(
            &self,
            ctx: InvocationContext,
            next: &InvocationDelegate,
        ) -> Result<InvocationContext, PipelineError> {
            self.trace.lock().unwrap().push(format!("{}.before", self.name));
            let ctx = next(ctx).await?;
            self.trace.lock().unwrap().push(format!("{}.after", self.name));
            Ok(ctx)
        }
    }

    fn tracing_handler(trace: Trace) -> InvocationDelegate {
        delegate(move |ctx| {
            let trace = trace.clone();
            async move {
                trace.lock().unwrap().push("handler".to_string());
                Ok(ctx)
            }
        })
    }

    #[tokio::test]
    async fn test_nesting_is_symmetric() {
        let trace: Trace = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PipelineBuilder::new()
            .with_middleware(Recorder {
                name: "M1",
                trace: trace.clone(),
            })
            .with_middleware(Recorder {
                name: "M2",
                trace: trace.clone(),
            })
            .with_middleware(Recorder {
                name: "M3",
                trace: trace.clone(),
            })
            .build(tracing_handler(trace.clone()));

        pipeline.execute(empty_context()).await.unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            vec![
                "M1.before", "M2.before", "M3.before", "handler", "M3.after", "M2.after",
                "M1.after",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_chain_is_raw_handler() {
        let trace: Trace = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PipelineBuilder::new().build(tracing_handler(trace.clone()));

        pipeline.execute(empty_context()).await.unwrap();
        assert_eq!(*trace.lock().unwrap(), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        struct ShortCircuit;

        #[async_trait]
        impl Middleware for ShortCircuit {
            async fn handle(
                &self,
                mut ctx: InvocationContext,
                _next: &InvocationDelegate,
            ) -> Result<InvocationContext, PipelineError> {
                ctx.features.insert("short-circuited");
                Ok(ctx)
            }
        }

        let trace: Trace = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PipelineBuilder::new()
            .with_middleware(ShortCircuit)
            .build(tracing_handler(trace.clone()));

        let ctx = pipeline.execute(empty_context()).await.unwrap();
        assert!(trace.lock().unwrap().is_empty());
        assert_eq!(ctx.features.get::<&str>(), Some(&"short-circuited"));
    }

    #[tokio::test]
    async fn test_handler_error_propagates_through_chain() {
        let trace: Trace = Arc::new(Mutex::new(Vec::new()));
        let pipeline = PipelineBuilder::new()
            .with_middleware(Recorder {
                name: "M1",
                trace: trace.clone(),
            })
            .build(delegate(|_ctx| async {
                Err(PipelineError::Handler(anyhow!("boom")))
            }));

        let err = pipeline.execute(empty_context()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Handler(_)));
        // The after phase never runs when the inner chain fails.
        assert_eq!(*trace.lock().unwrap(), vec!["M1.before"]);
    }

    #[tokio::test]
    async fn test_middleware_can_mutate_features() {
        struct Tagger;

        #[async_trait]
        impl Middleware for Tagger {
            async fn handle(
                &self,
                mut ctx: InvocationContext,
                next: &InvocationDelegate,
            ) -> Result<InvocationContext, PipelineError> {
                ctx.features.insert(42u64);
                next(ctx).await
            }
        }

        let pipeline = PipelineBuilder::new()
            .with_middleware(Tagger)
            .build(delegate(|ctx| async move {
                assert_eq!(ctx.features.get::<u64>(), Some(&42));
                Ok(ctx)
            }));

        pipeline.execute(empty_context()).await.unwrap();
    }
}
