//! Variable bindings supplied per evaluation.
//!
//! The evaluator consults the activation only for names that are not bound
//! by an enclosing comprehension. Activations can be layered with
//! [`HierarchicalActivation`]; lookups search the innermost layer first.
//!
//! ```ignore
//! let mut vars = MapActivation::new();
//! vars.insert("user", Value::string("ada"));
//! vars.insert_lazy("now", || Value::Timestamp(Utc::now()));
//! let result = expr.evaluate(&vars)?;
//! ```

use std::fmt;
use std::sync::Arc;

use ecow::EcoString;

use crate::values::{AttributePattern, Value};

/// Resolves variable names to values.
pub trait Activation {
    /// Look up a variable by name.
    ///
    /// Returns `None` if the name is not bound.
    fn find_variable(&self, name: &str) -> Option<Value>;

    /// Attributes to treat as unknown when unknown processing is enabled.
    fn unknown_patterns(&self) -> &[AttributePattern] {
        &[]
    }
}

impl<F> Activation for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn find_variable(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

/// An activation with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl Activation for EmptyActivation {
    fn find_variable(&self, _name: &str) -> Option<Value> {
        None
    }
}

type Provider = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Clone)]
enum Binding {
    Value(Value),
    /// Computed on each lookup.
    Lazy(Provider),
}

impl Binding {
    fn resolve(&self) -> Value {
        match self {
            Binding::Value(value) => value.clone(),
            Binding::Lazy(provider) => provider(),
        }
    }
}

/// Bindings held in a vector sorted by name, looked up by binary search.
#[derive(Clone, Default)]
pub struct MapActivation {
    bindings: Vec<(EcoString, Binding)>,
    unknown_patterns: Vec<AttributePattern>,
}

impl MapActivation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<EcoString>, value: impl Into<Value>) -> &mut Self {
        self.bind(name.into(), Binding::Value(value.into()))
    }

    /// Binds `name` to a value computed on every lookup.
    pub fn insert_lazy<F>(&mut self, name: impl Into<EcoString>, provider: F) -> &mut Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.bind(name.into(), Binding::Lazy(Arc::new(provider)))
    }

    /// Removes a binding, returning whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Ok(index) => {
                self.bindings.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    pub fn with_unknown(mut self, pattern: AttributePattern) -> Self {
        self.unknown_patterns.push(pattern);
        self
    }

    pub fn add_unknown(&mut self, pattern: AttributePattern) -> &mut Self {
        self.unknown_patterns.push(pattern);
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.bindings
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
    }

    fn bind(&mut self, name: EcoString, binding: Binding) -> &mut Self {
        match self.position(&name) {
            Ok(index) => self.bindings[index].1 = binding,
            Err(index) => self.bindings.insert(index, (name, binding)),
        }
        self
    }
}

impl Activation for MapActivation {
    fn find_variable(&self, name: &str) -> Option<Value> {
        self.position(name)
            .ok()
            .map(|index| self.bindings[index].1.resolve())
    }

    fn unknown_patterns(&self) -> &[AttributePattern] {
        &self.unknown_patterns
    }
}

impl<K, V> FromIterator<(K, V)> for MapActivation
where
    K: Into<EcoString>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut activation = MapActivation::new();
        for (name, value) in iter {
            activation.insert(name, value);
        }
        activation
    }
}

impl fmt::Debug for MapActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.bindings.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("MapActivation")
            .field("names", &names)
            .field("unknown_patterns", &self.unknown_patterns)
            .finish()
    }
}

/// Two activations searched child first.
pub struct HierarchicalActivation<'a> {
    parent: &'a dyn Activation,
    child: &'a dyn Activation,
    unknown_patterns: Vec<AttributePattern>,
}

impl<'a> HierarchicalActivation<'a> {
    pub fn new(parent: &'a dyn Activation, child: &'a dyn Activation) -> Self {
        let unknown_patterns = child
            .unknown_patterns()
            .iter()
            .chain(parent.unknown_patterns())
            .cloned()
            .collect();
        Self {
            parent,
            child,
            unknown_patterns,
        }
    }
}

impl Activation for HierarchicalActivation<'_> {
    fn find_variable(&self, name: &str) -> Option<Value> {
        self.child
            .find_variable(name)
            .or_else(|| self.parent.find_variable(name))
    }

    fn unknown_patterns(&self) -> &[AttributePattern] {
        &self.unknown_patterns
    }
}
