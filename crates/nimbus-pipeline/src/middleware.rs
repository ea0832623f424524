//! Middleware and handler contracts for the invocation pipeline.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use nimbus_core::InvocationContext;

use crate::error::PipelineError;

/// Future returned by a delegate in the chain.
pub type InvocationFuture = BoxFuture<'static, Result<InvocationContext, PipelineError>>;

/// One link of the chain: takes the context by value and returns it (or an
/// error) once the rest of the chain has run. Ownership-passing keeps the
/// composed chain `'static` without borrowing across await points.
pub type InvocationDelegate = Arc<dyn Fn(InvocationContext) -> InvocationFuture + Send + Sync>;

/// A middleware transform: receives "next" (the remainder of the chain) and
/// returns a delegate of identical shape. It may run code before and/or
/// after invoking `next`, or short-circuit by never calling it.
pub type MiddlewareTransform = Box<dyn FnOnce(InvocationDelegate) -> InvocationDelegate + Send>;

/// Struct-style middleware wrapping one invocation.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Handle the invocation, calling `next` to run the inner chain.
    async fn handle(
        &self,
        ctx: InvocationContext,
        next: &InvocationDelegate,
    ) -> Result<InvocationContext, PipelineError>;
}

/// Adapt a [`Middleware`] into a chain transform.
pub fn middleware_transform<M: Middleware>(middleware: M) -> MiddlewareTransform {
    let middleware = Arc::new(middleware);
    Box::new(move |next: InvocationDelegate| {
        let wrapped: InvocationDelegate = Arc::new(move |ctx: InvocationContext| {
            let middleware = middleware.clone();
            let next = next.clone();
            Box::pin(async move { middleware.handle(ctx, &next).await }) as InvocationFuture
        });
        wrapped
    })
}

/// Build a delegate from an async function or closure.
pub fn delegate<F, Fut>(f: F) -> InvocationDelegate
where
    F: Fn(InvocationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<InvocationContext, PipelineError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)) as InvocationFuture)
}

/// Terminal handler mapped at the end of the pipeline.
///
/// By the time this runs, every declared input has been resolved into the
/// context's feature set (envelope payload by the host codec, the rest by
/// the binder registry).
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handle one invocation.
    async fn invoke(&self, ctx: &mut InvocationContext) -> Result<(), PipelineError>;
}

/// Adapt a [`Handler`] into the terminal delegate of a chain.
pub fn handler_delegate<H: Handler>(handler: H) -> InvocationDelegate {
    let handler = Arc::new(handler);
    Arc::new(move |mut ctx: InvocationContext| {
        let handler = handler.clone();
        Box::pin(async move {
            handler.invoke(&mut ctx).await?;
            Ok(ctx)
        }) as InvocationFuture
    })
}
