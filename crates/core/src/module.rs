use crate::container::binding::Binder;
use crate::errors::CoreError;

/// A named set of binding declarations.
///
/// Modules are the configuration surface of the container: each one receives
/// the shared [`Binder`] during [`InjectorBuilder::build`] and declares its
/// bindings and interceptor bindings there. The module's name is attached to
/// every binding it declares, so duplicate-key errors can say who collided.
///
/// [`InjectorBuilder::build`]: crate::container::injector::InjectorBuilder::build
pub trait Module: Send + Sync {
    /// Module name used in build logs and configuration errors
    fn name(&self) -> &'static str;

    /// Declare this module's bindings
    fn configure(&self, binder: &mut Binder) -> Result<(), CoreError>;
}

/// Closure-backed module for tests and small programs.
///
/// ```
/// use tenon_core::{module, Injector};
///
/// let injector = Injector::create(module("empty", |_binder| Ok(()))).unwrap();
/// assert_eq!(injector.binding_count(), 0);
/// ```
pub struct FnModule<F> {
    name: &'static str,
    configure: F,
}

/// Wrap a configuration closure as a [`Module`]
pub fn module<F>(name: &'static str, configure: F) -> FnModule<F>
where
    F: Fn(&mut Binder) -> Result<(), CoreError> + Send + Sync,
{
    FnModule { name, configure }
}

impl<F> Module for FnModule<F>
where
    F: Fn(&mut Binder) -> Result<(), CoreError> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn configure(&self, binder: &mut Binder) -> Result<(), CoreError> {
        (self.configure)(binder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::binding::Injectable;
    use crate::container::resolver::ResolutionContext;

    struct Gadget;

    impl Injectable for Gadget {
        fn create(_ctx: &mut ResolutionContext<'_>) -> Result<Self, CoreError> {
            Ok(Gadget)
        }
    }

    struct GadgetModule;

    impl Module for GadgetModule {
        fn name(&self) -> &'static str {
            "gadgets"
        }

        fn configure(&self, binder: &mut Binder) -> Result<(), CoreError> {
            binder.bind::<Gadget>().to::<Gadget>();
            Ok(())
        }
    }

    #[test]
    fn test_trait_module_configures_binder() {
        let mut binder = Binder::new();
        GadgetModule.configure(&mut binder).unwrap();
        assert_eq!(GadgetModule.name(), "gadgets");
        assert_eq!(binder.binding_count(), 1);
    }

    #[test]
    fn test_fn_module_adapts_closures() {
        let adapter = module("inline", |binder: &mut Binder| {
            binder.bind::<Gadget>().to::<Gadget>();
            binder.bind::<Gadget>().annotated_with("spare").to::<Gadget>();
            Ok(())
        });

        let mut binder = Binder::new();
        adapter.configure(&mut binder).unwrap();
        assert_eq!(adapter.name(), "inline");
        assert_eq!(binder.binding_count(), 2);
    }

    #[test]
    fn test_fn_module_propagates_errors() {
        let adapter = module("failing", |_binder: &mut Binder| {
            Err(CoreError::configuration("nothing to declare"))
        });
        let mut binder = Binder::new();
        assert!(adapter.configure(&mut binder).is_err());
    }
}
