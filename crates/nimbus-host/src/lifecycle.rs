//! Lifecycle controller: cold start, invocation cycles, shutdown.

use std::sync::Arc;

use futures::future::BoxFuture;
use nimbus_core::{
    DeadlineProvider, InvocationContext, InvocationId, ServiceRegistry, ServiceScope,
};
use nimbus_envelope::SerializationConfig;
use nimbus_pipeline::Pipeline;

use crate::codec::EventCodec;
use crate::error::HostError;
use crate::event::{RawEvent, RawResponse};

/// Lifecycle states of a function host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Built, cold start not yet run.
    Unbuilt,
    /// Init hooks are running.
    Initializing,
    /// An init hook failed; the instance is permanently unhealthy.
    InitFailed,
    /// Ready to serve invocations.
    Ready,
    /// An invocation cycle is in flight.
    Invoking,
    /// Shutdown hooks are draining.
    ShuttingDown,
    /// Shutdown complete.
    Terminated,
}

/// Future returned by init and shutdown hooks.
pub type HookFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Lifecycle hook with access to the process-wide service registry.
///
/// Init hooks run once at cold start and may abort startup by failing;
/// shutdown hooks run best-effort during the drain.
pub type LifecycleHook = Box<dyn Fn(Arc<ServiceRegistry>) -> HookFuture + Send + Sync>;

/// Orchestrates the host lifecycle: init hooks exactly once, one invocation
/// cycle per platform event, shutdown hooks exactly once.
///
/// Invocations never overlap on one controller; the platform delivers
/// events strictly sequentially per execution environment and `&mut self`
/// enforces the same locally.
pub struct LifecycleController {
    state: LifecycleState,
    init_hooks: Vec<LifecycleHook>,
    shutdown_hooks: Vec<LifecycleHook>,
    init_failure: Option<Arc<str>>,
    services: Arc<ServiceRegistry>,
    deadlines: DeadlineProvider,
    serialization: SerializationConfig,
    pipeline: Pipeline,
    codec: Box<dyn EventCodec>,
}

impl LifecycleController {
    pub(crate) fn new(
        init_hooks: Vec<LifecycleHook>,
        shutdown_hooks: Vec<LifecycleHook>,
        services: Arc<ServiceRegistry>,
        deadlines: DeadlineProvider,
        serialization: SerializationConfig,
        pipeline: Pipeline,
        codec: Box<dyn EventCodec>,
    ) -> Self {
        Self {
            state: LifecycleState::Unbuilt,
            init_hooks,
            shutdown_hooks,
            init_failure: None,
            services,
            deadlines,
            serialization,
            pipeline,
            codec,
        }
    }

    /// The controller's current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Run the init hooks, in registration order, exactly once.
    ///
    /// A hook failure moves the controller to [`LifecycleState::InitFailed`]
    /// and the captured failure is replayed to every later attempt without
    /// re-running init.
    pub async fn initialize(&mut self) -> Result<(), HostError> {
        match self.state {
            LifecycleState::Unbuilt => {}
            LifecycleState::Ready => return Ok(()),
            LifecycleState::InitFailed => return Err(self.replay_init_failure()),
            state => return Err(HostError::InvalidState { state }),
        }

        self.state = LifecycleState::Initializing;
        for (index, hook) in self.init_hooks.iter().enumerate() {
            tracing::debug!(hook = index, "running init hook");
            if let Err(err) = hook(self.services.clone()).await {
                let message = format!("{err:#}");
                tracing::error!(hook = index, error = %message, "init hook failed");
                self.init_failure = Some(Arc::from(message.as_str()));
                self.state = LifecycleState::InitFailed;
                return Err(HostError::InitializationFailed(message));
            }
        }
        self.state = LifecycleState::Ready;
        tracing::info!(hooks = self.init_hooks.len(), "cold start complete");
        Ok(())
    }

    fn replay_init_failure(&self) -> HostError {
        let message = self
            .init_failure
            .as_deref()
            .unwrap_or("init failure not captured")
            .to_string();
        HostError::InitializationFailed(message)
    }

    /// Run one invocation cycle.
    ///
    /// The first call triggers cold start. Failure of one invocation leaves
    /// the controller `Ready` for the next; only init failure is sticky.
    pub async fn invoke(&mut self, event: RawEvent) -> Result<RawResponse, HostError> {
        match self.state {
            LifecycleState::Unbuilt => self.initialize().await?,
            LifecycleState::Ready => {}
            LifecycleState::InitFailed => return Err(self.replay_init_failure()),
            state => return Err(HostError::InvalidState { state }),
        }

        self.state = LifecycleState::Invoking;
        let result = self.run_cycle(event).await;
        self.state = LifecycleState::Ready;
        result
    }

    async fn run_cycle(&self, event: RawEvent) -> Result<RawResponse, HostError> {
        let invocation_id = event
            .invocation_id
            .map(InvocationId::from_string)
            .unwrap_or_else(InvocationId::generate);

        // (1) Arm the deadline token. Dropping it at the end of this scope
        // releases the timer on every exit path, including `?` exits.
        let deadline = self.deadlines.acquire(event.deadline);

        // (2)-(3) Open the invocation scope and build the context. Both are
        // owned by this cycle and dropped with it, never reused.
        let scope = ServiceScope::new(self.services.clone());
        let mut ctx = InvocationContext::new(
            invocation_id.clone(),
            event.body,
            deadline.cancellation(),
            scope,
        );
        tracing::debug!(invocation = %invocation_id, "invocation started");

        // (4) Extract the request envelope.
        self.codec.extract(&mut ctx, &self.serialization)?;

        // (5) Run the handler pipeline.
        let mut ctx = self.pipeline.execute(ctx).await?;

        // (6) Pack the response envelope.
        self.codec.pack(&mut ctx, &self.serialization)?;

        tracing::debug!(invocation = %invocation_id, "invocation completed");
        Ok(RawResponse {
            body: ctx.response_body,
        })
    }

    /// Drain the shutdown hooks, in registration order, exactly once.
    ///
    /// A failing hook is logged and does not stop the remaining hooks.
    pub async fn shutdown(&mut self) -> Result<(), HostError> {
        match self.state {
            LifecycleState::Terminated => return Ok(()),
            LifecycleState::Unbuilt | LifecycleState::Ready | LifecycleState::InitFailed => {}
            state => return Err(HostError::InvalidState { state }),
        }

        self.state = LifecycleState::ShuttingDown;
        for (index, hook) in self.shutdown_hooks.iter().enumerate() {
            tracing::debug!(hook = index, "running shutdown hook");
            if let Err(err) = hook(self.services.clone()).await {
                tracing::error!(hook = index, error = %format!("{err:#}"), "shutdown hook failed");
            }
        }
        self.state = LifecycleState::Terminated;
        tracing::info!(hooks = self.shutdown_hooks.len(), "shutdown complete");
        Ok(())
    }
}
