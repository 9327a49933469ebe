use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::container::deferred::DeferredFactory;
use crate::container::interceptor::AspectHook;
use crate::container::key::Key;
use crate::container::resolver::ResolutionContext;
use crate::container::scope::Scope;
use crate::errors::CoreError;

/// Type-erased shared instance.
///
/// The payload is always an `Arc<T>` for the bound key's `T`, which keeps
/// storage and recovery uniform for concrete and trait-object keys alike: the
/// closure that created the instance knows `T`, erases `Arc<T>` into the
/// outer `Arc<dyn Any>`, and resolution downcasts back to `Arc<T>`.
pub type SharedInstance = Arc<dyn Any + Send + Sync>;

/// Closure producing an instance inside an active resolution
pub type ProvideFn =
    Arc<dyn Fn(&mut ResolutionContext<'_>) -> Result<SharedInstance, CoreError> + Send + Sync>;

/// How a binding produces its instance
pub enum BindingStrategy {
    /// Construct the bound implementation type, resolving its declared
    /// dependencies through the active frame
    Construct(ProvideFn),
    /// Invoke a caller-supplied provider closure
    Provider(ProvideFn),
    /// Return an already-constructed instance
    Instance(SharedInstance),
}

impl BindingStrategy {
    /// Strategy label used in diagnostics and graph exports
    pub fn kind(&self) -> &'static str {
        match self {
            BindingStrategy::Construct(_) => "constructor",
            BindingStrategy::Provider(_) => "provider",
            BindingStrategy::Instance(_) => "instance",
        }
    }
}

impl fmt::Debug for BindingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingStrategy::Construct(_) => f.debug_tuple("Construct").field(&"<constructor>").finish(),
            BindingStrategy::Provider(_) => f.debug_tuple("Provider").field(&"<provider>").finish(),
            BindingStrategy::Instance(_) => f.debug_tuple("Instance").field(&"<instance>").finish(),
        }
    }
}

/// Static metadata about a binding's implementation.
///
/// Interceptor matchers evaluate this instead of runtime reflection: the
/// capability set lists the `TypeId`s the instance satisfies (the bound key
/// type, the implementation type, plus any extras), and `methods` names the
/// invocations an aspect proxy can dispatch.
#[derive(Debug, Clone)]
pub struct TypeMeta {
    exposed: &'static str,
    implementation: &'static str,
    implementation_id: TypeId,
    capabilities: Vec<TypeId>,
    methods: &'static [&'static str],
}

impl TypeMeta {
    pub(crate) fn new<T: ?Sized + 'static>() -> Self {
        let id = TypeId::of::<T>();
        Self {
            exposed: std::any::type_name::<T>(),
            implementation: std::any::type_name::<T>(),
            implementation_id: id,
            capabilities: vec![id],
            methods: &[],
        }
    }

    pub(crate) fn set_implementation(&mut self, name: &'static str, id: TypeId) {
        self.implementation = name;
        self.implementation_id = id;
        if !self.capabilities.contains(&id) {
            self.capabilities.push(id);
        }
    }

    pub(crate) fn set_methods(&mut self, methods: &'static [&'static str]) {
        self.methods = methods;
    }

    /// Name of the type the binding exposes (the key type)
    pub fn exposed(&self) -> &'static str {
        self.exposed
    }

    /// Name of the implementation type behind the binding
    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    /// `TypeId` of the implementation type
    pub fn implementation_id(&self) -> TypeId {
        self.implementation_id
    }

    /// Check whether the instance satisfies a capability type
    pub fn satisfies(&self, capability: TypeId) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Interceptable method names declared by the binding's aspect proxy
    pub fn methods(&self) -> &'static [&'static str] {
        self.methods
    }
}

/// A finalized binding: how instances for one key are produced, for how long
/// they live, what they depend on, and the optional cycle-proxy and aspect
/// hooks.
pub struct Binding {
    pub(crate) key: Key,
    pub(crate) scope: Scope,
    pub(crate) strategy: BindingStrategy,
    pub(crate) dependencies: Vec<Key>,
    pub(crate) member_dependencies: Vec<Key>,
    pub(crate) deferred: Option<DeferredFactory>,
    pub(crate) aspect: Option<AspectHook>,
    pub(crate) meta: TypeMeta,
    pub(crate) module: Option<&'static str>,
}

impl Binding {
    /// The key this binding serves
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The binding's scope
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Strategy label ("constructor", "provider", "instance")
    pub fn strategy_kind(&self) -> &'static str {
        self.strategy.kind()
    }

    /// Constructor dependency keys, in declaration order
    pub fn dependencies(&self) -> &[Key] {
        &self.dependencies
    }

    /// Member (post-construction) dependency keys, in declaration order
    pub fn member_dependencies(&self) -> &[Key] {
        &self.member_dependencies
    }

    /// Static type metadata evaluated by interceptor matchers
    pub fn meta(&self) -> &TypeMeta {
        &self.meta
    }

    /// Name of the module that declared this binding, when known
    pub fn module(&self) -> Option<&'static str> {
        self.module
    }

    /// Whether the binding can stand in for itself with a deferred proxy
    /// while its own construction is in progress
    pub fn supports_deferral(&self) -> bool {
        self.deferred.is_some()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("strategy", &self.strategy)
            .field("dependencies", &self.dependencies)
            .field("member_dependencies", &self.member_dependencies)
            .field("deferred", &self.deferred.is_some())
            .field("aspect", &self.aspect.is_some())
            .field("module", &self.module)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Capability: Send + Sync {}

    struct Implementation;

    #[test]
    fn test_meta_tracks_capabilities() {
        let mut meta = TypeMeta::new::<dyn Capability>();
        assert!(meta.satisfies(TypeId::of::<dyn Capability>()));
        assert!(!meta.satisfies(TypeId::of::<Implementation>()));

        meta.set_implementation(
            std::any::type_name::<Implementation>(),
            TypeId::of::<Implementation>(),
        );
        assert!(meta.satisfies(TypeId::of::<dyn Capability>()));
        assert!(meta.satisfies(TypeId::of::<Implementation>()));
        assert_eq!(meta.implementation_id(), TypeId::of::<Implementation>());
        assert!(meta.implementation().contains("Implementation"));
    }

    #[test]
    fn test_meta_methods_default_empty() {
        let mut meta = TypeMeta::new::<Implementation>();
        assert!(meta.methods().is_empty());
        meta.set_methods(&["inspect", "audit"]);
        assert_eq!(meta.methods(), &["inspect", "audit"]);
    }

    #[test]
    fn test_strategy_kinds() {
        let instance: SharedInstance = Arc::new(Arc::new(5usize));
        let strategy = BindingStrategy::Instance(instance);
        assert_eq!(strategy.kind(), "instance");
        assert!(format!("{:?}", strategy).contains("<instance>"));
    }
}
