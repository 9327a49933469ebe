//! Dependency injection container core.
//!
//! Given declarative bindings supplied by [`Module`]s, the container builds
//! fully-wired object graphs, breaks circular dependencies between
//! interface-typed components with deferred proxies, enforces
//! singleton-scoped lifetimes with at-most-once construction, and supports
//! method interception over matcher-selected components.
//!
//! ```
//! use std::sync::Arc;
//! use tenon_core::{module, CoreError, Injectable, Injector, Key, ResolutionContext, Scope};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct PlainGreeter;
//!
//! impl Greeter for PlainGreeter {
//!     fn greet(&self) -> String {
//!         "hello".to_string()
//!     }
//! }
//!
//! impl Injectable for PlainGreeter {
//!     fn create(_ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError> {
//!         Ok(PlainGreeter)
//!     }
//! }
//!
//! impl tenon_core::Exposes<dyn Greeter> for PlainGreeter {
//!     fn expose(this: Arc<Self>) -> Arc<dyn Greeter> {
//!         this
//!     }
//! }
//!
//! struct Door {
//!     greeter: Arc<dyn Greeter>,
//! }
//!
//! impl Injectable for Door {
//!     fn dependencies() -> Vec<Key> {
//!         vec![Key::of::<dyn Greeter>()]
//!     }
//!
//!     fn create(ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError> {
//!         Ok(Door {
//!             greeter: ctx.resolve()?,
//!         })
//!     }
//! }
//!
//! let injector = Injector::create(module("hallway", |binder| {
//!     binder
//!         .bind::<dyn Greeter>()
//!         .in_scope(Scope::Singleton)
//!         .to::<PlainGreeter>();
//!     binder.bind::<Door>().to::<Door>();
//!     Ok(())
//! }))?;
//!
//! let door: Arc<Door> = injector.get()?;
//! assert_eq!(door.greeter.greet(), "hello");
//! # Ok::<(), CoreError>(())
//! ```

pub mod container;
pub mod errors;
pub mod module;

pub use container::{
    Aspect, Binder, Binding, BindingBuilder, BindingRegistry, BindingStrategy, DeferredRef,
    DependencyGraph, EdgeKind, Exposes, GraphEdge, GraphNode, GraphStats, Injectable, Injector,
    InjectorBuilder, InterceptorBinding, InterceptorPipeline, Invocation, InvocationError,
    InvocationResult, Key, MethodInterceptor, MethodMatcher, ResolutionContext, ResolutionFrame,
    Scope, SharedInstance, SingletonCache, TypeMatcher, TypeMeta,
};
pub use errors::CoreError;
pub use module::{module, FnModule, Module};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library information
pub const NAME: &str = "tenon";

/// Get library version
pub fn version() -> &'static str {
    VERSION
}

/// Get library name
pub fn name() -> &'static str {
    NAME
}
