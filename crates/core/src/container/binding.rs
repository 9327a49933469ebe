use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::container::deferred::{DeferredFactory, DeferredHandle, DeferredRef};
use crate::container::descriptor::{Binding, BindingStrategy, ProvideFn, SharedInstance, TypeMeta};
use crate::container::interceptor::{
    Aspect, AspectHook, InterceptorBinding, InterceptorPipeline, MethodInterceptor,
};
use crate::container::key::Key;
use crate::container::matcher::{MethodMatcher, TypeMatcher};
use crate::container::resolver::ResolutionContext;
use crate::container::scope::Scope;
use crate::errors::CoreError;

/// Construction recipe for a component type.
///
/// Implementations declare their dependency keys statically (the dependency
/// descriptor the registry stores) and construct themselves through the
/// active [`ResolutionContext`]. `wire` runs after `create` for member-style
/// injection and defaults to a no-op.
///
/// ```
/// use std::sync::Arc;
/// use tenon_core::{CoreError, Injectable, Key, ResolutionContext};
///
/// struct Engine;
///
/// impl Injectable for Engine {
///     fn create(_ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError> {
///         Ok(Engine)
///     }
/// }
///
/// struct Car {
///     engine: Arc<Engine>,
/// }
///
/// impl Injectable for Car {
///     fn dependencies() -> Vec<Key> {
///         vec![Key::of::<Engine>()]
///     }
///
///     fn create(ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError> {
///         Ok(Car {
///             engine: ctx.resolve()?,
///         })
///     }
/// }
/// ```
pub trait Injectable: Send + Sync + 'static {
    /// Constructor dependency keys, in resolution order
    fn dependencies() -> Vec<Key> {
        Vec::new()
    }

    /// Member dependency keys resolved by `wire` after construction
    fn member_dependencies() -> Vec<Key> {
        Vec::new()
    }

    /// Construct the instance, resolving constructor dependencies through the
    /// context
    fn create(ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError>
    where
        Self: Sized;

    /// Inject member dependencies after construction
    fn wire(&self, _ctx: &mut ResolutionContext<'_>) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Coercion from an implementation type to the type its binding exposes.
///
/// The blanket impl covers self-bindings; binding a concrete type behind a
/// trait-object key takes one line per pair, which is where the unsize
/// coercion stable Rust cannot abstract over actually happens:
///
/// ```
/// use std::sync::Arc;
/// use tenon_core::Exposes;
///
/// trait Inspector: Send + Sync {}
///
/// struct PlainInspector;
///
/// impl Inspector for PlainInspector {}
///
/// impl Exposes<dyn Inspector> for PlainInspector {
///     fn expose(this: Arc<Self>) -> Arc<dyn Inspector> {
///         this
///     }
/// }
/// ```
pub trait Exposes<S: ?Sized> {
    /// Convert a shared instance of `Self` into the exposed type
    fn expose(this: Arc<Self>) -> Arc<S>;
}

impl<S> Exposes<S> for S {
    fn expose(this: Arc<Self>) -> Arc<S> {
        this
    }
}

/// Binding accumulated by the DSL before the registry exists.
pub(crate) struct PendingBinding {
    pub(crate) key: Key,
    pub(crate) scope: Scope,
    pub(crate) strategy: Option<BindingStrategy>,
    pub(crate) dependencies: Vec<Key>,
    pub(crate) member_dependencies: Vec<Key>,
    pub(crate) deferred: Option<DeferredFactory>,
    pub(crate) aspect: Option<AspectHook>,
    pub(crate) meta: TypeMeta,
    pub(crate) module: Option<&'static str>,
}

impl PendingBinding {
    pub(crate) fn into_binding(self) -> Result<Binding, CoreError> {
        let strategy = match self.strategy {
            Some(strategy) => strategy,
            None => {
                return Err(CoreError::configuration(format!(
                    "binding for {} declares no target: use to(), to_instance(), or to_provider()",
                    self.key
                )))
            }
        };
        Ok(Binding {
            key: self.key,
            scope: self.scope,
            strategy,
            dependencies: self.dependencies,
            member_dependencies: self.member_dependencies,
            deferred: self.deferred,
            aspect: self.aspect,
            meta: self.meta,
            module: self.module,
        })
    }
}

/// Collects bindings and interceptor bindings while modules run.
///
/// Each [`Module::configure`] receives the same binder; the builder merges
/// everything it collected into the frozen registry afterwards, which is
/// where duplicate keys are rejected.
///
/// [`Module::configure`]: crate::module::Module::configure
pub struct Binder {
    pending: Vec<PendingBinding>,
    interceptors: Vec<InterceptorBinding>,
    current_module: Option<&'static str>,
}

impl Binder {
    pub(crate) fn new() -> Self {
        Self {
            pending: Vec::new(),
            interceptors: Vec::new(),
            current_module: None,
        }
    }

    pub(crate) fn set_current_module(&mut self, module: &'static str) {
        self.current_module = Some(module);
    }

    /// Start a binding for `T`; registration happens when the returned
    /// builder is dropped at the end of the statement
    pub fn bind<T>(&mut self) -> BindingBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = PendingBinding {
            key: Key::of::<T>(),
            scope: Scope::default(),
            strategy: None,
            dependencies: Vec::new(),
            member_dependencies: Vec::new(),
            deferred: None,
            aspect: None,
            meta: TypeMeta::new::<T>(),
            module: self.current_module,
        };
        BindingBuilder {
            binder: self,
            entry: Some(entry),
            marker: PhantomData,
        }
    }

    /// Register an interceptor binding; chain order equals registration order
    pub fn bind_interceptor(
        &mut self,
        types: TypeMatcher,
        methods: MethodMatcher,
        interceptors: Vec<Arc<dyn MethodInterceptor>>,
    ) {
        debug!(
            types = types.label(),
            methods = methods.label(),
            interceptors = interceptors.len(),
            "registering interceptor binding"
        );
        self.interceptors.push(InterceptorBinding {
            types,
            methods,
            interceptors,
        });
    }

    /// Number of bindings collected so far
    pub fn binding_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of interceptor bindings collected so far
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    pub(crate) fn into_parts(self) -> (Vec<PendingBinding>, Vec<InterceptorBinding>) {
        (self.pending, self.interceptors)
    }
}

/// Fluent builder for one binding.
///
/// All setters are order-free; the pending binding registers with the binder
/// when the builder drops. A builder that never received a target surfaces a
/// configuration error when the container is built, not silently.
pub struct BindingBuilder<'b, T: ?Sized> {
    binder: &'b mut Binder,
    entry: Option<PendingBinding>,
    marker: PhantomData<*const T>,
}

impl<'b, T: ?Sized + Send + Sync + 'static> BindingBuilder<'b, T> {
    /// Qualify the key with a label, making it independent of the
    /// unqualified binding for the same type
    pub fn annotated_with(mut self, qualifier: impl Into<String>) -> Self {
        if let Some(entry) = self.entry.as_mut() {
            entry.key.set_qualifier(qualifier);
        }
        self
    }

    /// Set the binding's scope; the default is [`Scope::Prototype`]
    pub fn in_scope(mut self, scope: Scope) -> Self {
        if let Some(entry) = self.entry.as_mut() {
            entry.scope = scope;
        }
        self
    }

    /// Produce instances by constructing `I`, resolving its declared
    /// dependencies and running its member injection
    pub fn to<I>(mut self) -> Self
    where
        I: Injectable + Exposes<T>,
    {
        if let Some(entry) = self.entry.as_mut() {
            entry.dependencies = I::dependencies();
            entry.member_dependencies = I::member_dependencies();
            entry
                .meta
                .set_implementation(std::any::type_name::<I>(), TypeId::of::<I>());
            let constructor: ProvideFn = Arc::new(|ctx: &mut ResolutionContext<'_>| {
                let built = Arc::new(I::create(ctx)?);
                built.wire(ctx)?;
                let exposed: Arc<T> = I::expose(built);
                Ok(Arc::new(exposed) as SharedInstance)
            });
            entry.strategy = Some(BindingStrategy::Construct(constructor));
        }
        self
    }

    /// Serve an already-constructed instance on every resolution
    pub fn to_instance(mut self, instance: Arc<T>) -> Self {
        if let Some(entry) = self.entry.as_mut() {
            entry.strategy = Some(BindingStrategy::Instance(
                Arc::new(instance) as SharedInstance
            ));
        }
        self
    }

    /// Produce instances through a provider closure; the closure resolves
    /// whatever it needs through the context at call time
    pub fn to_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&mut ResolutionContext<'_>) -> Result<Arc<T>, CoreError> + Send + Sync + 'static,
    {
        if let Some(entry) = self.entry.as_mut() {
            let erased: ProvideFn = Arc::new(move |ctx: &mut ResolutionContext<'_>| {
                let value = provider(ctx)?;
                Ok(Arc::new(value) as SharedInstance)
            });
            entry.strategy = Some(BindingStrategy::Provider(erased));
        }
        self
    }

    /// Register the deferred-proxy factory that lets this binding stand in
    /// for itself while its own construction is in progress.
    ///
    /// The factory receives the write-once slot and returns a forwarding
    /// implementation holding it; the resolver back-fills the slot when the
    /// real instance exists. Without this, a cycle through the binding is an
    /// unresolvable-cycle error.
    pub fn with_cycle_proxy<F>(mut self, make_proxy: F) -> Self
    where
        F: Fn(DeferredRef<T>) -> Arc<T> + Send + Sync + 'static,
    {
        if let Some(entry) = self.entry.as_mut() {
            let factory: DeferredFactory = Arc::new(move || {
                let slot = DeferredRef::<T>::empty();
                let proxy = make_proxy(slot.clone());
                let erased: SharedInstance = Arc::new(proxy);
                let fill: Box<dyn FnOnce(SharedInstance) -> Result<(), CoreError> + Send> =
                    Box::new(move |instance| {
                        let typed = instance.downcast_ref::<Arc<T>>().cloned().ok_or_else(|| {
                            CoreError::type_mismatch(
                                std::any::type_name::<T>(),
                                std::any::type_name::<T>(),
                            )
                        })?;
                        slot.fill(typed)
                    });
                DeferredHandle::new(erased, fill)
            });
            entry.deferred = Some(factory);
        }
        self
    }

    /// Declare the interceptable methods and the hook that wraps instances in
    /// a woven proxy when interceptor bindings match.
    ///
    /// The hook receives the raw instance and the [`Aspect`] dispatch handle
    /// and returns the proxy; it only runs when at least one matcher selected
    /// the binding, so unmatched components never pay for a proxy.
    pub fn with_aspect<F>(mut self, methods: &'static [&'static str], wrap: F) -> Self
    where
        F: Fn(Arc<T>, Aspect) -> Arc<T> + Send + Sync + 'static,
    {
        if let Some(entry) = self.entry.as_mut() {
            entry.meta.set_methods(methods);
            let hook: AspectHook =
                Arc::new(move |instance: SharedInstance, pipeline: Arc<InterceptorPipeline>| {
                    let typed = instance.downcast_ref::<Arc<T>>().cloned().ok_or_else(|| {
                        CoreError::type_mismatch(
                            std::any::type_name::<T>(),
                            std::any::type_name::<T>(),
                        )
                    })?;
                    let woven = wrap(typed, Aspect::new(pipeline));
                    Ok(Arc::new(woven) as SharedInstance)
                });
            entry.aspect = Some(hook);
        }
        self
    }
}

impl<T: ?Sized> Drop for BindingBuilder<'_, T> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.binder.pending.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf;

    impl Injectable for Leaf {
        fn create(_ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError> {
            Ok(Leaf)
        }
    }

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct EnglishGreeter;

    impl Greeter for EnglishGreeter {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    impl Injectable for EnglishGreeter {
        fn create(_ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError> {
            Ok(EnglishGreeter)
        }
    }

    impl Exposes<dyn Greeter> for EnglishGreeter {
        fn expose(this: Arc<Self>) -> Arc<dyn Greeter> {
            this
        }
    }

    #[test]
    fn test_builder_registers_on_drop() {
        let mut binder = Binder::new();
        assert_eq!(binder.binding_count(), 0);
        binder.bind::<Leaf>().to::<Leaf>();
        assert_eq!(binder.binding_count(), 1);

        let (pending, _) = binder.into_parts();
        assert_eq!(pending[0].key, Key::of::<Leaf>());
        assert_eq!(pending[0].scope, Scope::Prototype);
    }

    #[test]
    fn test_setters_are_order_free() {
        let mut binder = Binder::new();
        binder
            .bind::<dyn Greeter>()
            .annotated_with("default")
            .in_scope(Scope::Singleton)
            .to::<EnglishGreeter>();

        let (pending, _) = binder.into_parts();
        let entry = &pending[0];
        assert_eq!(entry.key, Key::qualified::<dyn Greeter>("default"));
        assert_eq!(entry.scope, Scope::Singleton);
        assert!(entry.strategy.is_some());
        assert!(entry.meta.implementation().contains("EnglishGreeter"));
        assert!(entry.meta.satisfies(TypeId::of::<EnglishGreeter>()));
        assert!(entry.meta.satisfies(TypeId::of::<dyn Greeter>()));
    }

    #[test]
    fn test_untargeted_binding_is_a_configuration_error() {
        let mut binder = Binder::new();
        binder.bind::<Leaf>().in_scope(Scope::Singleton);

        let (pending, _) = binder.into_parts();
        let err = pending
            .into_iter()
            .next()
            .unwrap()
            .into_binding()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("declares no target"));
    }

    #[test]
    fn test_instance_binding_strategy() {
        let mut binder = Binder::new();
        binder
            .bind::<dyn Greeter>()
            .to_instance(Arc::new(EnglishGreeter));

        let (pending, _) = binder.into_parts();
        let binding = pending.into_iter().next().unwrap().into_binding().unwrap();
        assert_eq!(binding.strategy_kind(), "instance");
    }

    #[test]
    fn test_interceptor_bindings_accumulate_in_order() {
        struct Nop;

        impl MethodInterceptor for Nop {
            fn invoke(
                &self,
                invocation: crate::container::interceptor::Invocation<'_>,
            ) -> crate::container::interceptor::InvocationResult {
                invocation.proceed()
            }
        }

        let mut binder = Binder::new();
        binder.bind_interceptor(TypeMatcher::any(), MethodMatcher::any(), vec![Arc::new(Nop)]);
        binder.bind_interceptor(
            TypeMatcher::any(),
            MethodMatcher::named("inspect"),
            vec![Arc::new(Nop)],
        );
        assert_eq!(binder.interceptor_count(), 2);
    }

    #[test]
    fn test_module_attribution_flows_into_pending() {
        let mut binder = Binder::new();
        binder.set_current_module("fixtures");
        binder.bind::<Leaf>().to::<Leaf>();

        let (pending, _) = binder.into_parts();
        assert_eq!(pending[0].module, Some("fixtures"));
    }
}
