use thiserror::Error;

/// Core error type for the tenon container
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Duplicate binding for {key}: first declared in '{existing_module}', redeclared in '{conflicting_module}'")]
    DuplicateBinding {
        key: String,
        existing_module: String,
        conflicting_module: String,
    },

    #[error("Registry is frozen: cannot register binding for {key}")]
    FrozenRegistry { key: String },

    #[error("No binding found for {key}")]
    MissingBinding { key: String },

    #[error("Unresolvable dependency cycle at {key}: {path}")]
    UnresolvableCycle { key: String, path: String },

    #[error("Instance bound for {key} does not hold an Arc<{expected}>")]
    TypeMismatch { key: String, expected: String },

    #[error("Lock poisoned on resource: {resource}")]
    LockPoisoned { resource: String },
}

impl CoreError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        CoreError::Configuration {
            message: message.into(),
        }
    }

    /// Create a duplicate binding error
    pub fn duplicate_binding(
        key: impl Into<String>,
        existing_module: impl Into<String>,
        conflicting_module: impl Into<String>,
    ) -> Self {
        CoreError::DuplicateBinding {
            key: key.into(),
            existing_module: existing_module.into(),
            conflicting_module: conflicting_module.into(),
        }
    }

    /// Create a frozen registry error
    pub fn frozen_registry(key: impl Into<String>) -> Self {
        CoreError::FrozenRegistry { key: key.into() }
    }

    /// Create a missing binding error
    pub fn missing_binding(key: impl Into<String>) -> Self {
        CoreError::MissingBinding { key: key.into() }
    }

    /// Create an unresolvable cycle error
    pub fn unresolvable_cycle(key: impl Into<String>, path: impl Into<String>) -> Self {
        CoreError::UnresolvableCycle {
            key: key.into(),
            path: path.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(key: impl Into<String>, expected: impl Into<String>) -> Self {
        CoreError::TypeMismatch {
            key: key.into(),
            expected: expected.into(),
        }
    }

    /// Create a lock poisoned error
    pub fn lock_poisoned(resource: impl Into<String>) -> Self {
        CoreError::LockPoisoned {
            resource: resource.into(),
        }
    }

    /// Check if this error belongs to the configuration family.
    ///
    /// Configuration errors are raised while modules are evaluated and the
    /// registry is assembled; they are fatal to container construction.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoreError::Configuration { .. }
                | CoreError::DuplicateBinding { .. }
                | CoreError::FrozenRegistry { .. }
        )
    }

    /// Check if this error belongs to the resolution family.
    ///
    /// Resolution errors are raised while an instance graph is built; the
    /// container stays usable for subsequent requests.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            CoreError::MissingBinding { .. }
                | CoreError::UnresolvableCycle { .. }
                | CoreError::TypeMismatch { .. }
                | CoreError::LockPoisoned { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::missing_binding("demo::Foo");
        assert_eq!(err.to_string(), "No binding found for demo::Foo");

        let err = CoreError::unresolvable_cycle("demo::A", "demo::A -> demo::B -> demo::A");
        assert!(err.to_string().contains("demo::A -> demo::B -> demo::A"));
    }

    #[test]
    fn test_duplicate_binding_names_both_modules() {
        let err = CoreError::duplicate_binding("demo::Foo", "base", "extras");
        let rendered = err.to_string();
        assert!(rendered.contains("'base'"));
        assert!(rendered.contains("'extras'"));
    }

    #[test]
    fn test_error_families() {
        assert!(CoreError::configuration("bad").is_configuration());
        assert!(CoreError::duplicate_binding("k", "a", "b").is_configuration());
        assert!(CoreError::frozen_registry("k").is_configuration());
        assert!(!CoreError::configuration("bad").is_resolution());

        assert!(CoreError::missing_binding("k").is_resolution());
        assert!(CoreError::unresolvable_cycle("k", "p").is_resolution());
        assert!(CoreError::type_mismatch("k", "T").is_resolution());
        assert!(CoreError::lock_poisoned("cells").is_resolution());
        assert!(!CoreError::missing_binding("k").is_configuration());
    }
}
