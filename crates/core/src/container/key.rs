use std::any::TypeId;
use std::fmt;

/// Identity of a dependency request: a component type plus an optional
/// qualifier label.
///
/// Two keys are equal iff both the type and the qualifier match, so
/// `Key::of::<T>()` and `Key::qualified::<T>("default")` address independent
/// bindings (and independent singleton cache slots). The type may be a trait
/// object, which is how interface-style bindings are keyed:
///
/// ```
/// use tenon_core::Key;
///
/// trait Greeter: Send + Sync {}
///
/// let unqualified = Key::of::<dyn Greeter>();
/// let named = Key::qualified::<dyn Greeter>("default");
/// assert_ne!(unqualified, named);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<String>,
}

impl Key {
    /// Create the unqualified key for a component type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: None,
        }
    }

    /// Create a qualified key for a component type
    pub fn qualified<T: ?Sized + 'static>(qualifier: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier: Some(qualifier.into()),
        }
    }

    /// Get the type ID of the component type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Get the component type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Get the qualifier label, if any
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Check whether this key carries a qualifier
    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }

    pub(crate) fn set_qualifier(&mut self, qualifier: impl Into<String>) {
        self.qualifier = Some(qualifier.into());
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, " @\"{}\"", qualifier)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Sample: Send + Sync {}

    struct Plain;

    #[test]
    fn test_keys_for_same_type_are_equal() {
        assert_eq!(Key::of::<Plain>(), Key::of::<Plain>());
        assert_eq!(
            Key::qualified::<Plain>("default"),
            Key::qualified::<Plain>("default")
        );
    }

    #[test]
    fn test_qualifier_distinguishes_keys() {
        assert_ne!(Key::of::<Plain>(), Key::qualified::<Plain>("default"));
        assert_ne!(
            Key::qualified::<Plain>("default"),
            Key::qualified::<Plain>("extended")
        );
    }

    #[test]
    fn test_trait_object_keys() {
        let key = Key::of::<dyn Sample>();
        assert_eq!(key.type_id(), TypeId::of::<dyn Sample>());
        assert!(key.type_name().contains("Sample"));
        assert!(!key.is_qualified());
    }

    #[test]
    fn test_display_includes_qualifier() {
        let key = Key::qualified::<Plain>("extended");
        let rendered = key.to_string();
        assert!(rendered.contains("Plain"));
        assert!(rendered.contains("@\"extended\""));
    }
}
