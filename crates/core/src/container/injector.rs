use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::container::binding::Binder;
use crate::container::key::Key;
use crate::container::registry::BindingRegistry;
use crate::container::resolver::{downcast_shared, ResolutionContext, ResolutionFrame};
use crate::container::scope::SingletonCache;
use crate::container::visualization::DependencyGraph;
use crate::errors::CoreError;
use crate::module::Module;

/// The container: a frozen binding registry plus the singleton cache, behind
/// an `Arc` so clones are cheap and every clone resolves against the same
/// instances.
///
/// ```
/// use std::sync::Arc;
/// use tenon_core::{module, CoreError, Injectable, Injector, ResolutionContext, Scope};
///
/// struct Clock;
///
/// impl Injectable for Clock {
///     fn create(_ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError> {
///         Ok(Clock)
///     }
/// }
///
/// let injector = Injector::create(module("demo", |binder| {
///     binder.bind::<Clock>().in_scope(Scope::Singleton).to::<Clock>();
///     Ok(())
/// }))?;
///
/// let first: Arc<Clock> = injector.get()?;
/// let second: Arc<Clock> = injector.get()?;
/// assert!(Arc::ptr_eq(&first, &second));
/// # Ok::<(), CoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

#[derive(Debug)]
struct InjectorInner {
    id: Uuid,
    registry: BindingRegistry,
    singletons: SingletonCache,
}

impl Injector {
    /// Start a builder accepting several modules
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    /// Build a container from a single module
    pub fn create<M: Module + 'static>(module: M) -> Result<Self, CoreError> {
        Self::builder().module(module).build()
    }

    /// Container identity carried in log events
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Resolve the unqualified binding for `T`
    pub fn get<T>(&self) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_by_key(&Key::of::<T>())
    }

    /// Resolve the binding for `T` under a qualifier label
    pub fn get_qualified<T>(&self, qualifier: impl Into<String>) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_by_key(&Key::qualified::<T>(qualifier))
    }

    /// Resolve `T`, mapping a missing binding to `None`; other failures stay
    /// errors
    pub fn try_get<T>(&self) -> Result<Option<Arc<T>>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.get_by_key(&Key::of::<T>()) {
            Ok(instance) => Ok(Some(instance)),
            Err(CoreError::MissingBinding { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Qualified variant of [`try_get`](Injector::try_get)
    pub fn try_get_qualified<T>(
        &self,
        qualifier: impl Into<String>,
    ) -> Result<Option<Arc<T>>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.get_by_key(&Key::qualified::<T>(qualifier)) {
            Ok(instance) => Ok(Some(instance)),
            Err(CoreError::MissingBinding { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolve a key built by the caller
    pub fn get_by_key<T>(&self, key: &Key) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let mut frame = ResolutionFrame::new();
        let mut ctx =
            ResolutionContext::new(&self.inner.registry, &self.inner.singletons, &mut frame);
        let erased = ctx.resolve_erased(key)?;
        downcast_shared::<T>(key, erased)
    }

    /// Check whether the unqualified key for `T` is bound
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.inner.registry.contains(&Key::of::<T>())
    }

    /// Check whether the qualified key for `T` is bound
    pub fn contains_qualified<T>(&self, qualifier: impl Into<String>) -> bool
    where
        T: ?Sized + 'static,
    {
        self.inner.registry.contains(&Key::qualified::<T>(qualifier))
    }

    /// Number of bindings in the frozen registry
    pub fn binding_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of interceptor bindings in the frozen registry
    pub fn interceptor_count(&self) -> usize {
        self.inner.registry.interceptor_count()
    }

    /// Number of singleton keys whose instance already exists
    pub fn cached_singleton_count(&self) -> usize {
        self.inner.singletons.cached_count()
    }

    /// Read-only dependency-graph view over the frozen registry
    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::from_registry(&self.inner.registry)
    }
}

/// Accumulates modules and builds the [`Injector`].
///
/// Modules are evaluated in registration order against one shared binder;
/// their pending bindings are then merged into the registry, where duplicate
/// and untargeted bindings surface as configuration errors. Build failure
/// returns no partial container.
#[derive(Default)]
pub struct InjectorBuilder {
    modules: Vec<Box<dyn Module>>,
}

impl InjectorBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; evaluation order equals registration order
    pub fn module<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Evaluate every module, merge and freeze the registry, and return the
    /// container
    #[instrument(name = "injector_build", skip(self), fields(modules = self.modules.len()))]
    pub fn build(self) -> Result<Injector, CoreError> {
        let mut binder = Binder::new();
        for module in &self.modules {
            debug!(module = module.name(), "configuring module");
            binder.set_current_module(module.name());
            module.configure(&mut binder)?;
        }

        let (pending, interceptors) = binder.into_parts();
        let mut registry = BindingRegistry::new();
        for entry in pending {
            registry.register(entry.into_binding()?)?;
        }
        for binding in interceptors {
            registry.register_interceptor(binding)?;
        }
        registry.freeze();

        let id = Uuid::new_v4();
        info!(
            container = %id,
            bindings = registry.len(),
            interceptors = registry.interceptor_count(),
            "injector ready"
        );
        Ok(Injector {
            inner: Arc::new(InjectorInner {
                id,
                registry,
                singletons: SingletonCache::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::binding::Injectable;
    use crate::container::scope::Scope;
    use crate::module::module;

    struct Counter;

    impl Injectable for Counter {
        fn create(_ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError> {
            Ok(Counter)
        }
    }

    #[test]
    fn test_create_and_get() {
        let injector = Injector::create(module("demo", |binder| {
            binder.bind::<Counter>().to::<Counter>();
            Ok(())
        }))
        .unwrap();

        assert!(injector.contains::<Counter>());
        assert_eq!(injector.binding_count(), 1);
        let first: Arc<Counter> = injector.get().unwrap();
        let second: Arc<Counter> = injector.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_singleton_identity_across_clones() {
        let injector = Injector::create(module("demo", |binder| {
            binder.bind::<Counter>().in_scope(Scope::Singleton).to::<Counter>();
            Ok(())
        }))
        .unwrap();

        let clone = injector.clone();
        let first: Arc<Counter> = injector.get().unwrap();
        let second: Arc<Counter> = clone.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(injector.cached_singleton_count(), 1);
        assert_eq!(injector.id(), clone.id());
    }

    #[test]
    fn test_duplicate_binding_fails_build() {
        let result = Injector::builder()
            .module(module("base", |binder| {
                binder.bind::<Counter>().to::<Counter>();
                Ok(())
            }))
            .module(module("extras", |binder| {
                binder.bind::<Counter>().to::<Counter>();
                Ok(())
            }))
            .build();

        let err = result.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("'base'"));
        assert!(err.to_string().contains("'extras'"));
    }

    #[test]
    fn test_untargeted_binding_fails_build() {
        let result = Injector::create(module("demo", |binder| {
            binder.bind::<Counter>().in_scope(Scope::Singleton);
            Ok(())
        }));

        let err = result.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("declares no target"));
    }

    #[test]
    fn test_missing_binding_leaves_container_usable() {
        let injector = Injector::create(module("demo", |binder| {
            binder.bind::<Counter>().to::<Counter>();
            Ok(())
        }))
        .unwrap();

        assert!(matches!(
            injector.get::<String>(),
            Err(CoreError::MissingBinding { .. })
        ));
        assert!(injector.try_get::<String>().unwrap().is_none());
        assert!(injector.get::<Counter>().is_ok());
    }

    #[test]
    fn test_module_error_aborts_build() {
        let result = Injector::create(module("broken", |_binder| {
            Err(CoreError::configuration("module refused to configure"))
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_containers_have_distinct_ids() {
        let make = || {
            Injector::create(module("demo", |binder| {
                binder.bind::<Counter>().to::<Counter>();
                Ok(())
            }))
            .unwrap()
        };
        assert_ne!(make().id(), make().id());
    }
}
