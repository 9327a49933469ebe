use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::container::descriptor::{SharedInstance, TypeMeta};
use crate::container::matcher::{MethodMatcher, TypeMatcher};
use crate::errors::CoreError;

/// Error carried through an interceptor chain.
///
/// This is deliberately not [`CoreError`]: whatever the real method (or an
/// interceptor) raises crosses the chain boxed and reaches the caller
/// unchanged, ready to be downcast to its original type.
pub type InvocationError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of one intercepted invocation: the (boxed) return value of the
/// real method, or whatever the chain produced instead.
pub type InvocationResult = Result<Box<dyn Any + Send>, InvocationError>;

/// A single intercepted method call, handed to each interceptor in turn.
///
/// The interceptor decides what happens next: call [`proceed`] to continue to
/// the next interceptor (or the real method, if it is last), or skip it and
/// return a result of its own, short-circuiting the rest of the chain.
///
/// [`proceed`]: Invocation::proceed
pub struct Invocation<'a> {
    target: &'static str,
    method: &'static str,
    proceed: Box<dyn FnOnce() -> InvocationResult + 'a>,
}

impl<'a> Invocation<'a> {
    /// Type name of the implementation being invoked
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Name of the invoked method
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Continue down the chain, eventually reaching the real method
    pub fn proceed(self) -> InvocationResult {
        (self.proceed)()
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("target", &self.target)
            .field("method", &self.method)
            .finish()
    }
}

/// Around-advice over intercepted method calls.
///
/// Implementations run arbitrary logic before and after [`Invocation::proceed`],
/// may short-circuit by returning without proceeding, and must let errors
/// from deeper in the chain propagate if they do not handle them.
pub trait MethodInterceptor: Send + Sync {
    /// Interceptor name for diagnostics
    fn name(&self) -> &'static str {
        "MethodInterceptor"
    }

    /// Handle one invocation
    fn invoke(&self, invocation: Invocation<'_>) -> InvocationResult;
}

/// One registered interception rule: which components, which methods, and the
/// interceptors to run (in the order given).
pub struct InterceptorBinding {
    pub(crate) types: TypeMatcher,
    pub(crate) methods: MethodMatcher,
    pub(crate) interceptors: Vec<Arc<dyn MethodInterceptor>>,
}

impl fmt::Debug for InterceptorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.interceptors.iter().map(|i| i.name()).collect();
        f.debug_struct("InterceptorBinding")
            .field("types", &self.types)
            .field("methods", &self.methods)
            .field("interceptors", &names)
            .finish()
    }
}

/// All interceptor bindings of a container, in registration order.
#[derive(Debug, Default)]
pub(crate) struct InterceptorRegistry {
    bindings: Vec<InterceptorBinding>,
}

impl InterceptorRegistry {
    pub(crate) fn push(&mut self, binding: InterceptorBinding) {
        self.bindings.push(binding);
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Build the per-method chains for a binding's type metadata.
    ///
    /// Returns `None` when no type matcher accepts the metadata, or when every
    /// per-method chain comes up empty; the caller then keeps the raw
    /// instance and pays no proxy overhead.
    pub(crate) fn pipeline_for(&self, meta: &TypeMeta) -> Option<Arc<InterceptorPipeline>> {
        let applicable: Vec<&InterceptorBinding> = self
            .bindings
            .iter()
            .filter(|binding| binding.types.matches(meta))
            .collect();
        if applicable.is_empty() {
            return None;
        }

        let mut chains: HashMap<&'static str, Vec<Arc<dyn MethodInterceptor>>> = HashMap::new();
        for method in meta.methods() {
            let mut chain = Vec::new();
            for binding in &applicable {
                if binding.methods.matches(method) {
                    chain.extend(binding.interceptors.iter().cloned());
                }
            }
            if !chain.is_empty() {
                chains.insert(*method, chain);
            }
        }

        if chains.is_empty() {
            return None;
        }
        Some(Arc::new(InterceptorPipeline {
            target: meta.implementation(),
            chains,
        }))
    }
}

/// Precomputed interceptor chains for one woven instance, keyed by method.
pub struct InterceptorPipeline {
    target: &'static str,
    chains: HashMap<&'static str, Vec<Arc<dyn MethodInterceptor>>>,
}

impl InterceptorPipeline {
    /// Type name of the implementation this pipeline wraps
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Check whether a method has a non-empty chain
    pub fn intercepts(&self, method: &str) -> bool {
        self.chains.contains_key(method)
    }

    /// Run `terminal` through the chain registered for `method`.
    ///
    /// Methods without a chain dispatch straight to `terminal`. The chain is
    /// folded outside-in, so the first-registered interceptor sees the
    /// invocation first and its post-logic runs last.
    pub(crate) fn run<'a>(
        &'a self,
        method: &'static str,
        terminal: Box<dyn FnOnce() -> InvocationResult + 'a>,
    ) -> InvocationResult {
        let chain = match self.chains.get(method) {
            Some(chain) => chain,
            None => return terminal(),
        };

        let target = self.target;
        let mut next: Box<dyn FnOnce() -> InvocationResult + 'a> = terminal;
        for interceptor in chain.iter().rev() {
            let interceptor = interceptor.clone();
            let proceed = next;
            next = Box::new(move || {
                interceptor.invoke(Invocation {
                    target,
                    method,
                    proceed,
                })
            });
        }
        next()
    }
}

impl fmt::Debug for InterceptorPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&&'static str> = self.chains.keys().collect();
        methods.sort();
        f.debug_struct("InterceptorPipeline")
            .field("target", &self.target)
            .field("methods", &methods)
            .finish()
    }
}

/// Dispatch handle held by a woven proxy.
///
/// The proxy forwards each interceptable method through [`Aspect::call`],
/// supplying the real invocation as the terminal closure. Return values cross
/// the chain boxed, so the chain can replace them; `call` downcasts the final
/// outcome back to the method's return type.
#[derive(Clone)]
pub struct Aspect {
    pipeline: Arc<InterceptorPipeline>,
}

impl Aspect {
    pub(crate) fn new(pipeline: Arc<InterceptorPipeline>) -> Self {
        Self { pipeline }
    }

    /// Check whether a method has a non-empty chain
    pub fn intercepts(&self, method: &str) -> bool {
        self.pipeline.intercepts(method)
    }

    /// Run a method invocation through its interceptor chain
    pub fn call<R, F>(&self, method: &'static str, terminal: F) -> Result<R, InvocationError>
    where
        R: Any + Send,
        F: FnOnce() -> Result<R, InvocationError>,
    {
        let adapted: Box<dyn FnOnce() -> InvocationResult + '_> =
            Box::new(move || terminal().map(|value| Box::new(value) as Box<dyn Any + Send>));
        let outcome = self.pipeline.run(method, adapted)?;
        match outcome.downcast::<R>() {
            Ok(boxed) => Ok(*boxed),
            Err(_) => Err(format!(
                "interceptor chain for {}#{} returned an unexpected value type",
                self.pipeline.target(),
                method
            )
            .into()),
        }
    }
}

impl fmt::Debug for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Aspect").field(&self.pipeline).finish()
    }
}

/// Hook a binding registers to wrap its raw instance in a woven proxy once a
/// pipeline matched. The closure re-types the erased instance, builds the
/// proxy with the [`Aspect`] handle, and erases the result again.
pub(crate) type AspectHook = Arc<
    dyn Fn(SharedInstance, Arc<InterceptorPipeline>) -> Result<SharedInstance, CoreError>
        + Send
        + Sync,
>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::TypeId;
    use std::sync::Mutex;

    trait Service: Send + Sync {}

    struct ServiceImpl;

    fn service_meta(methods: &'static [&'static str]) -> TypeMeta {
        let mut meta = TypeMeta::new::<dyn Service>();
        meta.set_implementation(
            std::any::type_name::<ServiceImpl>(),
            TypeId::of::<ServiceImpl>(),
        );
        meta.set_methods(methods);
        meta
    }

    struct Recording {
        tag: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
    }

    impl MethodInterceptor for Recording {
        fn name(&self) -> &'static str {
            self.tag
        }

        fn invoke(&self, invocation: Invocation<'_>) -> InvocationResult {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:enter {}", self.tag, invocation.method()));
            let result = invocation.proceed();
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:exit", self.tag));
            result
        }
    }

    struct ShortCircuit;

    impl MethodInterceptor for ShortCircuit {
        fn invoke(&self, _invocation: Invocation<'_>) -> InvocationResult {
            Ok(Box::new("cached".to_string()))
        }
    }

    fn registry_with(
        types: TypeMatcher,
        methods: MethodMatcher,
        interceptors: Vec<Arc<dyn MethodInterceptor>>,
    ) -> InterceptorRegistry {
        let mut registry = InterceptorRegistry::default();
        registry.push(InterceptorBinding {
            types,
            methods,
            interceptors,
        });
        registry
    }

    #[test]
    fn test_no_matching_type_means_no_pipeline() {
        let registry = registry_with(
            TypeMatcher::exposing::<String>(),
            MethodMatcher::any(),
            vec![Arc::new(ShortCircuit)],
        );
        assert!(registry.pipeline_for(&service_meta(&["run"])).is_none());
    }

    #[test]
    fn test_empty_method_chains_mean_no_pipeline() {
        let registry = registry_with(
            TypeMatcher::exposing::<dyn Service>(),
            MethodMatcher::named("other"),
            vec![Arc::new(ShortCircuit)],
        );
        assert!(registry.pipeline_for(&service_meta(&["run"])).is_none());
    }

    #[test]
    fn test_chain_runs_in_registration_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = InterceptorRegistry::default();
        registry.push(InterceptorBinding {
            types: TypeMatcher::exposing::<dyn Service>(),
            methods: MethodMatcher::any(),
            interceptors: vec![Arc::new(Recording {
                tag: "a",
                journal: journal.clone(),
            })],
        });
        registry.push(InterceptorBinding {
            types: TypeMatcher::exposing::<dyn Service>(),
            methods: MethodMatcher::any(),
            interceptors: vec![Arc::new(Recording {
                tag: "b",
                journal: journal.clone(),
            })],
        });

        let pipeline = registry.pipeline_for(&service_meta(&["run"])).unwrap();
        let aspect = Aspect::new(pipeline);
        let journal_inner = journal.clone();
        let value: String = aspect
            .call("run", move || {
                journal_inner.lock().unwrap().push("method".to_string());
                Ok("done".to_string())
            })
            .unwrap();

        assert_eq!(value, "done");
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["a:enter run", "b:enter run", "method", "b:exit", "a:exit"]
        );
    }

    #[test]
    fn test_short_circuit_skips_downstream() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = InterceptorRegistry::default();
        registry.push(InterceptorBinding {
            types: TypeMatcher::any(),
            methods: MethodMatcher::any(),
            interceptors: vec![Arc::new(ShortCircuit)],
        });
        registry.push(InterceptorBinding {
            types: TypeMatcher::any(),
            methods: MethodMatcher::any(),
            interceptors: vec![Arc::new(Recording {
                tag: "after",
                journal: journal.clone(),
            })],
        });

        let pipeline = registry.pipeline_for(&service_meta(&["run"])).unwrap();
        let aspect = Aspect::new(pipeline);
        let journal_inner = journal.clone();
        let value: String = aspect
            .call("run", move || {
                journal_inner.lock().unwrap().push("method".to_string());
                Ok("real".to_string())
            })
            .unwrap();

        assert_eq!(value, "cached");
        assert!(journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_errors_cross_the_chain_unchanged() {
        #[derive(Debug)]
        struct AuditError(&'static str);

        impl fmt::Display for AuditError {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "audit failed: {}", self.0)
            }
        }

        impl std::error::Error for AuditError {}

        let journal = Arc::new(Mutex::new(Vec::new()));
        let registry = registry_with(
            TypeMatcher::any(),
            MethodMatcher::any(),
            vec![Arc::new(Recording {
                tag: "outer",
                journal: journal.clone(),
            })],
        );

        let pipeline = registry.pipeline_for(&service_meta(&["audit"])).unwrap();
        let aspect = Aspect::new(pipeline);
        let result: Result<String, InvocationError> =
            aspect.call("audit", || Err(Box::new(AuditError("broken"))));

        let err = result.unwrap_err();
        let original = err.downcast_ref::<AuditError>().unwrap();
        assert_eq!(original.0, "broken");
        // Post-logic still ran on the error path.
        assert_eq!(*journal.lock().unwrap(), vec!["outer:enter audit", "outer:exit"]);
    }

    #[test]
    fn test_unlisted_method_dispatches_directly() {
        let registry = registry_with(
            TypeMatcher::any(),
            MethodMatcher::named("run"),
            vec![Arc::new(ShortCircuit)],
        );
        let pipeline = registry
            .pipeline_for(&service_meta(&["run", "status"]))
            .unwrap();
        assert!(pipeline.intercepts("run"));
        assert!(!pipeline.intercepts("status"));

        let aspect = Aspect::new(pipeline);
        let value: String = aspect.call("status", || Ok("live".to_string())).unwrap();
        assert_eq!(value, "live");
    }
}
