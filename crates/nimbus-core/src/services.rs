//! Two-level service resolution: a process-wide registry and per-invocation scopes.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Process-wide service registry, built once at cold start.
///
/// After the host finalizes it into an `Arc` the registry is shared
/// read-only by every invocation; per-invocation state goes into a
/// [`ServiceScope`] instead.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a service instance, replacing any previous one of the same type.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Register a service instance, builder-style.
    pub fn with<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.register(service);
        self
    }

    /// Resolve a service by type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// Invocation-scoped resolver layered over the shared registry.
///
/// Resolution checks the scope's own overlay first, then falls back to the
/// process-wide registry. A scope is created at the start of one invocation
/// and dropped at its end; it must never outlive the invocation.
pub struct ServiceScope {
    shared: Arc<ServiceRegistry>,
    overlay: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceScope {
    /// Open a new scope over the shared registry.
    pub fn new(shared: Arc<ServiceRegistry>) -> Self {
        Self {
            shared,
            overlay: HashMap::new(),
        }
    }

    /// Register an invocation-scoped service, shadowing the shared registry.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: T) {
        self.overlay.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Resolve a service, preferring the scope overlay.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.overlay
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
            .or_else(|| self.shared.get::<T>())
    }

    /// Access the shared registry backing this scope.
    pub fn shared(&self) -> &Arc<ServiceRegistry> {
        &self.shared
    }
}

impl fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceScope")
            .field("overlay_len", &self.overlay.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Database(&'static str);

    #[derive(Debug, PartialEq)]
    struct Cache(&'static str);

    #[test]
    fn test_registry_register_and_get() {
        let registry = ServiceRegistry::new().with(Database("primary"));

        let db = registry.get::<Database>().unwrap();
        assert_eq!(*db, Database("primary"));
        assert!(registry.get::<Cache>().is_none());
    }

    #[test]
    fn test_scope_falls_back_to_shared() {
        let shared = Arc::new(ServiceRegistry::new().with(Database("primary")));
        let scope = ServiceScope::new(shared);

        assert_eq!(*scope.resolve::<Database>().unwrap(), Database("primary"));
    }

    #[test]
    fn test_scope_overlay_shadows_shared() {
        let shared = Arc::new(ServiceRegistry::new().with(Database("primary")));
        let mut scope = ServiceScope::new(shared.clone());
        scope.register(Database("scoped"));

        assert_eq!(*scope.resolve::<Database>().unwrap(), Database("scoped"));
        // The shared registry is untouched.
        assert_eq!(*shared.get::<Database>().unwrap(), Database("primary"));
    }

    #[test]
    fn test_scopes_are_isolated() {
        let shared = Arc::new(ServiceRegistry::new());
        let mut first = ServiceScope::new(shared.clone());
        first.register(Cache("warm"));
        let second = ServiceScope::new(shared);

        assert!(first.resolve::<Cache>().is_some());
        assert!(second.resolve::<Cache>().is_none());
    }
}
