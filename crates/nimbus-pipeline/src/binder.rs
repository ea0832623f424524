//! Explicit parameter binding for terminal handlers.
//!
//! Replaces codegen'd binding glue with an introspectable registry: each
//! declared parameter maps to a resolution function built once at startup
//! and run per call, immediately before the terminal handler. Resolved
//! values land in the context's feature set.

use std::fmt;
use std::sync::Arc;

use nimbus_core::InvocationContext;

use crate::error::PipelineError;

/// Where a bound parameter's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// The typed event payload extracted by the envelope.
    EventPayload,
    /// A service resolved from the invocation scope.
    Service,
    /// A value derived from the invocation context itself.
    Context,
}

type BindingFn = Arc<dyn Fn(&mut InvocationContext) -> Result<(), PipelineError> + Send + Sync>;

/// One declared parameter and its resolution function.
pub struct ParameterBinding {
    name: String,
    source: BindingSource,
    resolve: BindingFn,
}

impl ParameterBinding {
    /// The parameter's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter's declared source.
    pub fn source(&self) -> BindingSource {
        self.source
    }
}

impl fmt::Debug for ParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBinding")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// Registry of parameter bindings, built once at startup.
#[derive(Debug, Default)]
pub struct BinderRegistry {
    bindings: Vec<ParameterBinding>,
}

impl BinderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Register a binding with an explicit resolution function.
    pub fn bind<F>(mut self, name: impl Into<String>, source: BindingSource, resolve: F) -> Self
    where
        F: Fn(&mut InvocationContext) -> Result<(), PipelineError> + Send + Sync + 'static,
    {
        self.bindings.push(ParameterBinding {
            name: name.into(),
            source,
            resolve: Arc::new(resolve),
        });
        self
    }

    /// Register a service-sourced binding: resolves `Arc<T>` from the
    /// invocation scope into the feature set.
    pub fn bind_service<T: Send + Sync + 'static>(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let binding_name = name.clone();
        self.bind(name, BindingSource::Service, move |ctx| {
            let service = ctx.services.resolve::<T>().ok_or_else(|| {
                PipelineError::binding(binding_name.clone(), "service not registered")
            })?;
            ctx.features.insert(service);
            Ok(())
        })
    }

    /// The declared bindings, in registration order.
    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    /// Whether no bindings are registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Run every binding against the context, in registration order.
    pub fn apply(&self, ctx: &mut InvocationContext) -> Result<(), PipelineError> {
        for binding in &self.bindings {
            (binding.resolve)(ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::{InvocationId, ServiceRegistry, ServiceScope};
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, PartialEq)]
    struct Clock(&'static str);

    fn context_with_services(registry: ServiceRegistry) -> InvocationContext {
        InvocationContext::new(
            InvocationId::generate(),
            Vec::new(),
            CancellationToken::new(),
            ServiceScope::new(Arc::new(registry)),
        )
    }

    #[test]
    fn test_bind_service_resolves_into_features() {
        let registry = BinderRegistry::new().bind_service::<Clock>("clock");
        let mut ctx = context_with_services(ServiceRegistry::new().with(Clock("utc")));

        registry.apply(&mut ctx).unwrap();
        let clock = ctx.features.get::<Arc<Clock>>().unwrap();
        assert_eq!(**clock, Clock("utc"));
    }

    #[test]
    fn test_missing_service_is_a_binding_error() {
        let registry = BinderRegistry::new().bind_service::<Clock>("clock");
        let mut ctx = context_with_services(ServiceRegistry::new());

        let err = registry.apply(&mut ctx).unwrap_err();
        assert!(matches!(err, PipelineError::Binding { ref name, .. } if name == "clock"));
    }

    #[test]
    fn test_bindings_run_in_registration_order() {
        let registry = BinderRegistry::new()
            .bind("first", BindingSource::Context, |ctx| {
                ctx.features.insert(vec!["first"]);
                Ok(())
            })
            .bind("second", BindingSource::Context, |ctx| {
                ctx.features
                    .get_mut::<Vec<&'static str>>()
                    .expect("first binding ran")
                    .push("second");
                Ok(())
            });
        let mut ctx = context_with_services(ServiceRegistry::new());

        registry.apply(&mut ctx).unwrap();
        assert_eq!(
            ctx.features.get::<Vec<&'static str>>(),
            Some(&vec!["first", "second"])
        );
    }

    #[test]
    fn test_registry_is_introspectable() {
        let registry = BinderRegistry::new()
            .bind_service::<Clock>("clock")
            .bind("payload", BindingSource::EventPayload, |_| Ok(()));

        let bindings = registry.bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].name(), "clock");
        assert_eq!(bindings[0].source(), BindingSource::Service);
        assert_eq!(bindings[1].source(), BindingSource::EventPayload);
    }
}
