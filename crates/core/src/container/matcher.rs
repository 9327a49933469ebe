use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::container::descriptor::TypeMeta;

/// Predicate over binding type metadata, selecting which components an
/// interceptor binding applies to.
///
/// Matchers are evaluated against [`TypeMeta`] when an instance is woven, so
/// "exposing" means capability-set membership: a matcher built with
/// `TypeMatcher::exposing::<dyn Inspector>()` accepts every binding whose
/// instance satisfies `dyn Inspector`, regardless of implementation type.
#[derive(Clone)]
pub struct TypeMatcher {
    label: String,
    predicate: Arc<dyn Fn(&TypeMeta) -> bool + Send + Sync>,
}

impl TypeMatcher {
    /// Match every binding
    pub fn any() -> Self {
        Self {
            label: "any".to_string(),
            predicate: Arc::new(|_| true),
        }
    }

    /// Match bindings whose capability set contains `T`
    pub fn exposing<T: ?Sized + 'static>() -> Self {
        let capability = TypeId::of::<T>();
        Self {
            label: format!("exposing({})", std::any::type_name::<T>()),
            predicate: Arc::new(move |meta| meta.satisfies(capability)),
        }
    }

    /// Match bindings whose implementation type is exactly `T`
    pub fn of<T: 'static>() -> Self {
        let implementation = TypeId::of::<T>();
        Self {
            label: format!("of({})", std::any::type_name::<T>()),
            predicate: Arc::new(move |meta| meta.implementation_id() == implementation),
        }
    }

    /// Match when both matchers accept
    pub fn and(self, other: TypeMatcher) -> Self {
        let left = self.predicate.clone();
        let right = other.predicate.clone();
        Self {
            label: format!("{} and {}", self.label, other.label),
            predicate: Arc::new(move |meta| left(meta) && right(meta)),
        }
    }

    /// Match when either matcher accepts
    pub fn or(self, other: TypeMatcher) -> Self {
        let left = self.predicate.clone();
        let right = other.predicate.clone();
        Self {
            label: format!("{} or {}", self.label, other.label),
            predicate: Arc::new(move |meta| left(meta) || right(meta)),
        }
    }

    /// Invert the matcher
    pub fn not(self) -> Self {
        let inner = self.predicate.clone();
        Self {
            label: format!("not {}", self.label),
            predicate: Arc::new(move |meta| !inner(meta)),
        }
    }

    /// Human-readable form used in diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn matches(&self, meta: &TypeMeta) -> bool {
        (self.predicate)(meta)
    }
}

impl fmt::Debug for TypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeMatcher").field(&self.label).finish()
    }
}

/// Predicate over method names, selecting which invocations of a matched
/// component run the interceptor chain.
#[derive(Clone)]
pub struct MethodMatcher {
    label: String,
    predicate: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl MethodMatcher {
    /// Match every method
    pub fn any() -> Self {
        Self {
            label: "any".to_string(),
            predicate: Arc::new(|_| true),
        }
    }

    /// Match one method by name
    pub fn named(name: &'static str) -> Self {
        Self {
            label: format!("named({})", name),
            predicate: Arc::new(move |method| method == name),
        }
    }

    /// Match any of the listed method names
    pub fn one_of(names: &'static [&'static str]) -> Self {
        Self {
            label: format!("one_of({})", names.join(", ")),
            predicate: Arc::new(move |method| names.contains(&method)),
        }
    }

    /// Match when both matchers accept
    pub fn and(self, other: MethodMatcher) -> Self {
        let left = self.predicate.clone();
        let right = other.predicate.clone();
        Self {
            label: format!("{} and {}", self.label, other.label),
            predicate: Arc::new(move |method| left(method) && right(method)),
        }
    }

    /// Match when either matcher accepts
    pub fn or(self, other: MethodMatcher) -> Self {
        let left = self.predicate.clone();
        let right = other.predicate.clone();
        Self {
            label: format!("{} or {}", self.label, other.label),
            predicate: Arc::new(move |method| left(method) || right(method)),
        }
    }

    /// Human-readable form used in diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn matches(&self, method: &str) -> bool {
        (self.predicate)(method)
    }
}

impl fmt::Debug for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MethodMatcher").field(&self.label).finish()
    }
}
