use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::container::deferred::DeferredHandle;
use crate::container::descriptor::{Binding, BindingStrategy, SharedInstance};
use crate::container::key::Key;
use crate::container::registry::BindingRegistry;
use crate::container::scope::SingletonCache;
use crate::errors::CoreError;

/// Per-resolution state: the ordered path of keys currently under
/// construction, plus the deferred proxies issued on this path.
///
/// A frame lives for exactly one top-level `get` call and is never shared
/// across threads. A key re-appearing on the path is a cycle; the proxies
/// recorded here are back-filled when their key finishes construction, and
/// discarded wholesale if the resolution fails.
#[derive(Debug, Default)]
pub struct ResolutionFrame {
    path: Vec<Key>,
    deferred: HashMap<Key, DeferredHandle>,
}

impl ResolutionFrame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Current construction depth
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Check if the path contains a key (cycle detection)
    pub fn contains(&self, key: &Key) -> bool {
        self.path.contains(key)
    }

    /// Render the path for error messages
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(|key| key.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub(crate) fn push(&mut self, key: Key) {
        self.path.push(key);
    }

    pub(crate) fn pop(&mut self) -> Option<Key> {
        self.path.pop()
    }

    pub(crate) fn deferred_proxy(&self, key: &Key) -> Option<SharedInstance> {
        self.deferred.get(key).map(|handle| handle.proxy())
    }

    pub(crate) fn record_deferred(&mut self, key: Key, handle: DeferredHandle) {
        self.deferred.insert(key, handle);
    }

    pub(crate) fn take_deferred(&mut self, key: &Key) -> Option<DeferredHandle> {
        self.deferred.remove(key)
    }

    fn cycle_path(&self, key: &Key) -> String {
        format!("{} -> {}", self.path_string(), key)
    }
}

/// Recover the typed `Arc<T>` out of an erased instance.
pub(crate) fn downcast_shared<T: ?Sized + 'static>(
    key: &Key,
    instance: SharedInstance,
) -> Result<Arc<T>, CoreError> {
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| CoreError::type_mismatch(key.to_string(), std::any::type_name::<T>()))
}

/// Handle through which constructors, member wiring, and providers resolve
/// their own dependencies.
///
/// A context borrows the container's frozen registry and singleton cache plus
/// the mutable frame of the current top-level call; recursion threads one
/// context through the whole graph. [`Injectable::create`] receives it to
/// resolve constructor keys, [`Injectable::wire`] for member keys, and
/// provider closures for whatever they need at call time.
///
/// [`Injectable::create`]: crate::container::binding::Injectable::create
/// [`Injectable::wire`]: crate::container::binding::Injectable::wire
pub struct ResolutionContext<'a> {
    registry: &'a BindingRegistry,
    singletons: &'a SingletonCache,
    frame: &'a mut ResolutionFrame,
}

impl<'a> ResolutionContext<'a> {
    pub(crate) fn new(
        registry: &'a BindingRegistry,
        singletons: &'a SingletonCache,
        frame: &'a mut ResolutionFrame,
    ) -> Self {
        Self {
            registry,
            singletons,
            frame,
        }
    }

    /// Resolve the unqualified binding for `T`
    pub fn resolve<T>(&mut self) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve_by_key(&Key::of::<T>())
    }

    /// Resolve the binding for `T` under a qualifier label
    pub fn resolve_qualified<T>(&mut self, qualifier: impl Into<String>) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolve_by_key(&Key::qualified::<T>(qualifier))
    }

    /// Resolve the unqualified binding for `T`, mapping a missing binding to
    /// `None`; every other failure stays an error
    pub fn try_resolve<T>(&mut self) -> Result<Option<Arc<T>>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.resolve_by_key(&Key::of::<T>()) {
            Ok(instance) => Ok(Some(instance)),
            Err(CoreError::MissingBinding { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Qualified variant of [`try_resolve`](ResolutionContext::try_resolve)
    pub fn try_resolve_qualified<T>(
        &mut self,
        qualifier: impl Into<String>,
    ) -> Result<Option<Arc<T>>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.resolve_by_key(&Key::qualified::<T>(qualifier)) {
            Ok(instance) => Ok(Some(instance)),
            Err(CoreError::MissingBinding { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolve a key built by the caller
    pub fn resolve_by_key<T>(&mut self, key: &Key) -> Result<Arc<T>, CoreError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let erased = self.resolve_erased(key)?;
        downcast_shared::<T>(key, erased)
    }

    /// Core resolution algorithm over erased instances.
    ///
    /// Cycle branch first: a key already on the path either reuses the proxy
    /// issued earlier on this frame, gets a fresh one from its binding's
    /// cycle-proxy factory, or fails. Otherwise singletons go through the
    /// per-key cell and prototypes construct directly.
    pub(crate) fn resolve_erased(&mut self, key: &Key) -> Result<SharedInstance, CoreError> {
        trace!(key = %key, depth = self.frame.depth(), "resolving");
        let binding = self
            .registry
            .lookup(key)
            .ok_or_else(|| CoreError::missing_binding(key.to_string()))?;

        if self.frame.contains(key) {
            if let Some(proxy) = self.frame.deferred_proxy(key) {
                return Ok(proxy);
            }
            if let Some(factory) = binding.deferred.as_ref() {
                let handle = factory();
                let proxy = handle.proxy();
                debug!(key = %key, "issued deferred proxy for in-progress key");
                self.frame.record_deferred(key.clone(), handle);
                return Ok(proxy);
            }
            return Err(CoreError::unresolvable_cycle(
                key.to_string(),
                self.frame.cycle_path(key),
            ));
        }

        if binding.scope().is_singleton() {
            let singletons = self.singletons;
            return singletons.get_or_create(key, || self.construct(&binding, key));
        }
        self.construct(&binding, key)
    }

    fn construct(&mut self, binding: &Arc<Binding>, key: &Key) -> Result<SharedInstance, CoreError> {
        self.frame.push(key.clone());
        let result = self.build_instance(binding, key);
        self.frame.pop();
        result
    }

    /// Produce the raw instance, weave it if interceptors match, then
    /// back-fill any proxy issued for this key. Weaving comes before
    /// back-fill and caching so singletons are observed woven everywhere and
    /// proxies forward to the woven instance.
    fn build_instance(
        &mut self,
        binding: &Arc<Binding>,
        key: &Key,
    ) -> Result<SharedInstance, CoreError> {
        let raw = match &binding.strategy {
            BindingStrategy::Construct(make) | BindingStrategy::Provider(make) => make(self)?,
            BindingStrategy::Instance(instance) => instance.clone(),
        };

        let instance = match binding.aspect.as_ref() {
            Some(weave) => match self.registry.interceptors().pipeline_for(binding.meta()) {
                Some(pipeline) => {
                    debug!(key = %key, target = pipeline.target(), "weaving interceptor pipeline");
                    weave(raw, pipeline)?
                }
                None => raw,
            },
            None => raw,
        };

        if let Some(handle) = self.frame.take_deferred(key) {
            debug!(key = %key, "back-filling deferred proxy");
            handle.fill(instance.clone())?;
        }
        Ok(instance)
    }
}
