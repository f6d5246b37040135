//! Dependency resolution seam.
//!
//! The runtime opens one [`DependencyScope`] per dispatch and per send.
//! Handler factories and interceptor factories receive the scope and
//! resolve whatever services they need from it. Scope release is RAII: the
//! scope counts itself closed when dropped, on every exit path including
//! handler panics unwinding through the dispatcher.
//!
//! The default implementation, [`ScopedResolver`], serves `Arc` singletons
//! out of a [`ServiceCollection`]. Applications with a richer container
//! implement [`DependencyResolver`] themselves.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opens dependency scopes for the runtime.
pub trait DependencyResolver: Send + Sync {
    /// Opens a child scope for one dispatch or send operation.
    fn open_scope(&self) -> DependencyScope;
}

/// Counters tracking scope lifecycle.
///
/// Every opened scope must eventually be closed; the runtime's tests assert
/// `opened() == closed()` after quiescence, including on failure paths.
#[derive(Debug, Default)]
pub struct ScopeMetrics {
    opened: AtomicU64,
    closed: AtomicU64,
}

impl ScopeMetrics {
    /// Number of scopes opened so far.
    #[must_use]
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Number of scopes closed so far.
    #[must_use]
    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::Relaxed)
    }

    /// Returns `true` when every opened scope has been closed.
    #[must_use]
    pub fn all_closed(&self) -> bool {
        self.opened() == self.closed()
    }
}

type ServiceMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Registration surface for the default resolver.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use nimbus_handler::{DependencyResolver, ServiceCollection};
///
/// struct OrderStore;
///
/// let resolver = ServiceCollection::new()
///     .register(OrderStore)
///     .into_resolver();
///
/// let scope = resolver.open_scope();
/// assert!(scope.resolve::<OrderStore>().is_some());
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    services: ServiceMap,
}

impl ServiceCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service by value.
    #[must_use]
    pub fn register<T: Send + Sync + 'static>(self, service: T) -> Self {
        self.register_arc(Arc::new(service))
    }

    /// Registers an already-shared service.
    #[must_use]
    pub fn register_arc<T: Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.services.insert(TypeId::of::<T>(), service);
        self
    }

    /// Finalizes the collection into a resolver.
    #[must_use]
    pub fn into_resolver(self) -> ScopedResolver {
        ScopedResolver {
            services: Arc::new(self.services),
            metrics: Arc::new(ScopeMetrics::default()),
        }
    }
}

/// The default [`DependencyResolver`]: shared singletons plus scope
/// lifecycle counting.
pub struct ScopedResolver {
    services: Arc<ServiceMap>,
    metrics: Arc<ScopeMetrics>,
}

impl ScopedResolver {
    /// Returns the scope lifecycle counters.
    #[must_use]
    pub fn metrics(&self) -> Arc<ScopeMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl DependencyResolver for ScopedResolver {
    fn open_scope(&self) -> DependencyScope {
        self.metrics.opened.fetch_add(1, Ordering::Relaxed);
        DependencyScope {
            services: Arc::clone(&self.services),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// A dependency scope bounded by one dispatch or send operation.
pub struct DependencyScope {
    services: Arc<ServiceMap>,
    metrics: Arc<ScopeMetrics>,
}

impl DependencyScope {
    /// Resolves a service by type.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let service = self.services.get(&TypeId::of::<T>())?;
        Arc::clone(service).downcast::<T>().ok()
    }
}

impl Drop for DependencyScope {
    fn drop(&mut self) {
        self.metrics.closed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Store(u32);

    #[test]
    fn resolves_registered_service() {
        let resolver = ServiceCollection::new().register(Store(7)).into_resolver();
        let scope = resolver.open_scope();

        let store = scope.resolve::<Store>().expect("service registered");
        assert_eq!(store.0, 7);
    }

    #[test]
    fn unregistered_service_resolves_to_none() {
        let resolver = ServiceCollection::new().into_resolver();
        let scope = resolver.open_scope();
        assert!(scope.resolve::<Store>().is_none());
    }

    #[test]
    fn scopes_share_the_same_instance() {
        let shared = Arc::new(Store(1));
        let resolver = ServiceCollection::new()
            .register_arc(Arc::clone(&shared))
            .into_resolver();

        let a = resolver.open_scope().resolve::<Store>().unwrap();
        assert!(Arc::ptr_eq(&a, &shared));
    }

    #[test]
    fn metrics_count_open_and_close() {
        let resolver = ServiceCollection::new().into_resolver();
        let metrics = resolver.metrics();

        {
            let _a = resolver.open_scope();
            let _b = resolver.open_scope();
            assert_eq!(metrics.opened(), 2);
            assert_eq!(metrics.closed(), 0);
        }

        assert_eq!(metrics.closed(), 2);
        assert!(metrics.all_closed());
    }
}
