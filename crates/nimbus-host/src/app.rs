//! Function application builder and host.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use nimbus_core::{DeadlineProvider, InvocationContext, RuntimeConfig, ServiceRegistry};
use nimbus_envelope::{BatchEnvelope, SerializationConfig};
use nimbus_pipeline::{
    handler_delegate, BinderRegistry, Handler, InvocationDelegate, InvocationFuture, Middleware,
    MiddlewareTransform, PipelineBuilder, PipelineError,
};

use crate::codec::{BatchPayloadCodec, EventCodec, EventPayloadCodec};
use crate::error::HostError;
use crate::event::{RawEvent, RawResponse};
use crate::lifecycle::{HookFuture, LifecycleController, LifecycleHook, LifecycleState};

struct Terminal {
    delegate: InvocationDelegate,
    codec: Box<dyn EventCodec>,
}

/// Builder for a function application.
///
/// Collects configuration, services, lifecycle hooks, middleware and the
/// mapped handler, then is consumed by [`FunctionApp::build`] into an
/// immutable [`FunctionHost`]. Mapping a second handler is a configuration
/// error reported by `build()`, before any invocation runs.
///
/// # Example
///
/// ```rust,ignore
/// let mut host = FunctionApp::new()
///     .on_init(|_services| async { Ok(()) })
///     .map_handler(|req: Greeting| async move {
///         Ok(Reply { message: format!("hello {}", req.name) })
///     })
///     .build()?;
///
/// let response = host.invoke(RawEvent::new(br#"{"name":"world"}"#.to_vec())).await?;
/// ```
#[derive(Default)]
pub struct FunctionApp {
    config: RuntimeConfig,
    serialization: SerializationConfig,
    services: ServiceRegistry,
    init_hooks: Vec<LifecycleHook>,
    shutdown_hooks: Vec<LifecycleHook>,
    middleware: PipelineBuilder,
    binders: BinderRegistry,
    terminal: Option<Terminal>,
    duplicate_handler: bool,
}

impl FunctionApp {
    /// Create an application builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the runtime configuration.
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the deadline safety buffer.
    pub fn with_deadline_buffer(mut self, buffer: Duration) -> Self {
        self.config = self.config.with_deadline_buffer(buffer);
        self
    }

    /// Replace the serialization configuration used by envelopes.
    pub fn with_serialization(mut self, serialization: SerializationConfig) -> Self {
        self.serialization = serialization;
        self
    }

    /// Replace the process-wide service registry.
    pub fn with_services(mut self, services: ServiceRegistry) -> Self {
        self.services = services;
        self
    }

    /// Register a process-wide service.
    pub fn register_service<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.services.register(service);
        self
    }

    /// Replace the parameter binder registry.
    pub fn with_binders(mut self, binders: BinderRegistry) -> Self {
        self.binders = binders;
        self
    }

    /// Register an init hook, run once at cold start in registration order.
    /// A failing init hook aborts startup.
    pub fn on_init<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<ServiceRegistry>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.init_hooks
            .push(Box::new(move |services| Box::pin(hook(services)) as HookFuture));
        self
    }

    /// Register a shutdown hook, drained best-effort in registration order.
    pub fn on_shutdown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<ServiceRegistry>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.shutdown_hooks
            .push(Box::new(move |services| Box::pin(hook(services)) as HookFuture));
        self
    }

    /// Append a middleware transform to the pipeline.
    pub fn wrap(mut self, transform: MiddlewareTransform) -> Self {
        self.middleware = self.middleware.wrap(transform);
        self
    }

    /// Append a struct-style middleware to the pipeline.
    pub fn with_middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware = self.middleware.with_middleware(middleware);
        self
    }

    /// Map the terminal handler for API-style single-payload events.
    ///
    /// The envelope extracts `T` into the feature set before the pipeline
    /// runs; the handler's `R` is packed into the response afterwards.
    pub fn map_handler<T, R, F, Fut>(self, handler: F) -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        R: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let delegate: InvocationDelegate = Arc::new(move |mut ctx: InvocationContext| {
            let handler = handler.clone();
            Box::pin(async move {
                let payload = ctx.features.remove::<T>().ok_or_else(|| {
                    PipelineError::binding("payload", "event payload missing from feature set")
                })?;
                let response = handler(payload).await.map_err(PipelineError::Handler)?;
                ctx.features.insert(response);
                Ok(ctx)
            }) as InvocationFuture
        });
        self.set_terminal(delegate, Box::new(EventPayloadCodec::<T, R>::new()))
    }

    /// Map the terminal handler for batched stream-style events.
    ///
    /// The handler is applied per record; a failing record is marked failed
    /// in the outgoing batch without failing the invocation or its siblings.
    pub fn map_batch_handler<T, R, F, Fut>(self, handler: F) -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        R: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let delegate: InvocationDelegate = Arc::new(move |mut ctx: InvocationContext| {
            let handler = handler.clone();
            Box::pin(async move {
                let batch = ctx.features.remove::<BatchEnvelope<T>>().ok_or_else(|| {
                    PipelineError::binding("batch", "batch envelope missing from feature set")
                })?;
                let mut output = BatchEnvelope::<R>::default();
                for result in batch.into_payload_results() {
                    match result {
                        Ok(payload) => match handler(payload).await {
                            Ok(response) => output.push_payload(response),
                            Err(err) => output.push_failure(format!("{err:#}")),
                        },
                        Err(reason) => output.push_failure(reason),
                    }
                }
                ctx.features.insert(output);
                Ok(ctx)
            }) as InvocationFuture
        });
        self.set_terminal(delegate, Box::new(BatchPayloadCodec::<T, R>::new()))
    }

    /// Map a context-aware terminal handler with an explicit codec.
    ///
    /// For handlers that need the invocation context (cancellation signal,
    /// feature set, scoped services) in addition to the extracted payload.
    pub fn map_handler_with<H, C>(self, handler: H, codec: C) -> Self
    where
        H: Handler,
        C: EventCodec + 'static,
    {
        self.set_terminal(handler_delegate(handler), Box::new(codec))
    }

    fn set_terminal(mut self, delegate: InvocationDelegate, codec: Box<dyn EventCodec>) -> Self {
        if self.terminal.is_some() {
            // Keep the first mapping; build() reports the misuse.
            self.duplicate_handler = true;
            return self;
        }
        self.terminal = Some(Terminal { delegate, codec });
        self
    }

    /// Finalize the application into a host.
    ///
    /// Structural misuse (no handler, or more than one handler mapped) is
    /// reported here, before any invocation can run.
    pub fn build(self) -> Result<FunctionHost, HostError> {
        if self.duplicate_handler {
            return Err(HostError::Configuration(
                "handler pipeline already finalized: a handler was mapped more than once"
                    .to_string(),
            ));
        }
        let Terminal { delegate, codec } = self.terminal.ok_or_else(|| {
            HostError::Configuration("no handler mapped before build".to_string())
        })?;

        // Binders run immediately before the terminal handler, inside the
        // innermost layer of the chain.
        let binders = Arc::new(self.binders);
        let terminal: InvocationDelegate = Arc::new(move |mut ctx: InvocationContext| {
            let binders = binders.clone();
            let delegate = delegate.clone();
            Box::pin(async move {
                binders.apply(&mut ctx)?;
                delegate(ctx).await
            }) as InvocationFuture
        });

        let pipeline = self.middleware.build(terminal);
        let controller = LifecycleController::new(
            self.init_hooks,
            self.shutdown_hooks,
            Arc::new(self.services),
            DeadlineProvider::new(self.config.deadline_buffer),
            self.serialization,
            pipeline,
            codec,
        );
        Ok(FunctionHost { controller })
    }
}

/// A finalized function host serving platform invocations.
pub struct FunctionHost {
    controller: LifecycleController,
}

impl std::fmt::Debug for FunctionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionHost")
            .field("state", &self.controller.state())
            .finish_non_exhaustive()
    }
}

impl FunctionHost {
    /// Run cold start now instead of lazily on the first invocation.
    pub async fn initialize(&mut self) -> Result<(), HostError> {
        self.controller.initialize().await
    }

    /// Serve one platform invocation.
    pub async fn invoke(&mut self, event: RawEvent) -> Result<RawResponse, HostError> {
        self.controller.invoke(event).await
    }

    /// Drain shutdown hooks on the platform shutdown signal.
    pub async fn shutdown(&mut self) -> Result<(), HostError> {
        self.controller.shutdown().await
    }

    /// The host's current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.controller.state()
    }
}
