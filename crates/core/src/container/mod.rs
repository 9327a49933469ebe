pub mod binding;
pub mod deferred;
pub mod descriptor;
pub mod injector;
pub mod interceptor;
pub mod key;
pub mod matcher;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod visualization;


pub use binding::{Binder, BindingBuilder, Exposes, Injectable};
pub use deferred::DeferredRef;
pub use descriptor::{Binding, BindingStrategy, SharedInstance, TypeMeta};
pub use injector::{Injector, InjectorBuilder};
pub use interceptor::{
    Aspect, InterceptorBinding, InterceptorPipeline, Invocation, InvocationError,
    InvocationResult, MethodInterceptor,
};
pub use key::Key;
pub use matcher::{MethodMatcher, TypeMatcher};
pub use registry::BindingRegistry;
pub use resolver::{ResolutionContext, ResolutionFrame};
pub use scope::{Scope, SingletonCache};
pub use visualization::{DependencyGraph, EdgeKind, GraphEdge, GraphNode, GraphStats};
