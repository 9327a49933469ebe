use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::container::descriptor::Binding;
use crate::container::interceptor::{InterceptorBinding, InterceptorRegistry};
use crate::container::key::Key;
use crate::errors::CoreError;

/// Registry mapping keys to their finalized bindings.
///
/// The registry is mutable only during the build phase: the injector builder
/// registers every binding the modules collected, then freezes it. Duplicate
/// keys are rejected at registration, naming both declaring modules; a frozen
/// registry rejects everything. After the freeze the map is shared immutably
/// and lookups take no lock.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: HashMap<Key, Arc<Binding>>,
    interceptors: InterceptorRegistry,
    frozen: bool,
}

impl BindingRegistry {
    /// Create an empty, unfrozen registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding.
    ///
    /// Fails with a frozen-registry error after [`freeze`], and with a
    /// duplicate-binding error when the key is already taken.
    ///
    /// [`freeze`]: BindingRegistry::freeze
    pub fn register(&mut self, binding: Binding) -> Result<(), CoreError> {
        let key = binding.key().clone();
        if self.frozen {
            return Err(CoreError::frozen_registry(key.to_string()));
        }
        if let Some(existing) = self.bindings.get(&key) {
            return Err(CoreError::duplicate_binding(
                key.to_string(),
                existing.module().unwrap_or("<unknown>"),
                binding.module().unwrap_or("<unknown>"),
            ));
        }
        debug!(
            key = %key,
            scope = %binding.scope(),
            strategy = binding.strategy_kind(),
            "registered binding"
        );
        self.bindings.insert(key, Arc::new(binding));
        Ok(())
    }

    /// Register an interceptor binding; chain order equals registration order
    pub fn register_interceptor(&mut self, binding: InterceptorBinding) -> Result<(), CoreError> {
        if self.frozen {
            return Err(CoreError::frozen_registry("interceptor binding"));
        }
        self.interceptors.push(binding);
        Ok(())
    }

    /// Freeze the registry; every later `register` call fails
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Check whether the registry was frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Look up the binding for a key
    pub fn lookup(&self, key: &Key) -> Option<Arc<Binding>> {
        self.bindings.get(key).cloned()
    }

    /// Check whether a key has a binding
    pub fn contains(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
    }

    /// Number of registered bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check whether the registry holds no bindings
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// All registered keys, in no particular order
    pub fn keys(&self) -> Vec<Key> {
        self.bindings.keys().cloned().collect()
    }

    /// Iterate over every registered binding
    pub fn bindings(&self) -> impl Iterator<Item = &Arc<Binding>> {
        self.bindings.values()
    }

    /// Number of interceptor bindings
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    pub(crate) fn interceptors(&self) -> &InterceptorRegistry {
        &self.interceptors
    }
}
