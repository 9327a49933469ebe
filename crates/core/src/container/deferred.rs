use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::container::descriptor::SharedInstance;
use crate::errors::CoreError;

/// Write-once slot behind a deferred proxy.
///
/// A cycle-proxy factory receives a `DeferredRef<T>` and returns a forwarding
/// implementation of `T` that holds it. While the real instance is still
/// under construction the slot is empty; the resolver back-fills it exactly
/// once when construction completes. Forwarding methods call [`get`], which
/// panics with a descriptive message if the proxy is used before back-fill
/// (the documented misuse: invoking a proxied dependency from inside a
/// constructor that is itself part of the cycle).
///
/// [`get`]: DeferredRef::get
pub struct DeferredRef<T: ?Sized> {
    slot: Arc<OnceLock<Arc<T>>>,
}

impl<T: ?Sized> Clone for DeferredRef<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: ?Sized> DeferredRef<T> {
    pub(crate) fn empty() -> Self {
        Self {
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Get the backing instance, if back-fill already happened
    pub fn try_get(&self) -> Option<Arc<T>> {
        self.slot.get().cloned()
    }

    /// Check whether the backing instance arrived
    pub fn is_filled(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Get the backing instance.
    ///
    /// # Panics
    ///
    /// Panics if the underlying instance has not finished construction yet.
    pub fn get(&self) -> Arc<T> {
        match self.slot.get() {
            Some(backing) => backing.clone(),
            None => panic!(
                "deferred proxy for `{}` used before its backing instance finished construction",
                std::any::type_name::<T>()
            ),
        }
    }

    pub(crate) fn fill(&self, value: Arc<T>) -> Result<(), CoreError> {
        self.slot.set(value).map_err(|_| {
            CoreError::configuration(format!(
                "deferred slot for `{}` was back-filled twice",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl<T: ?Sized> fmt::Debug for DeferredRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredRef")
            .field("target", &std::any::type_name::<T>())
            .field("filled", &self.is_filled())
            .finish()
    }
}

/// Factory invoked when a cycle reaches a key that is already in progress:
/// produces the erased proxy instance together with its one-shot back-fill.
pub(crate) type DeferredFactory = Arc<dyn Fn() -> DeferredHandle + Send + Sync>;

/// Proxy issued for an in-progress key, paired with the closure that will
/// back-fill its slot once the real instance exists. The typed slot lives
/// inside both closures; the handle itself is fully erased.
pub(crate) struct DeferredHandle {
    proxy: SharedInstance,
    fill: Box<dyn FnOnce(SharedInstance) -> Result<(), CoreError> + Send>,
}

impl DeferredHandle {
    pub(crate) fn new(
        proxy: SharedInstance,
        fill: Box<dyn FnOnce(SharedInstance) -> Result<(), CoreError> + Send>,
    ) -> Self {
        Self { proxy, fill }
    }

    pub(crate) fn proxy(&self) -> SharedInstance {
        self.proxy.clone()
    }

    pub(crate) fn fill(self, instance: SharedInstance) -> Result<(), CoreError> {
        (self.fill)(instance)
    }
}

impl fmt::Debug for DeferredHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredHandle")
            .field("proxy", &"<instance>")
            .finish()
    }
}
