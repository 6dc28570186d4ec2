//! Function registry and overload dispatch.
//!
//! Functions are registered once, before compilation, under a
//! [`FunctionDescriptor`]: a name, a call style (global `f(x)` or receiver
//! `x.f()`) and the value kinds each argument accepts. The compiler narrows
//! the candidates for a call site by name, style and arity; the remaining
//! choice happens at run time by inspecting argument kinds.
//!
//! Dispatch of a strict call follows these rules, in order:
//!
//! 1. If any argument is an error, the first error is the result.
//! 2. If any argument is unknown, the merged unknown set is the result.
//! 3. The first overload whose declared kinds accept the arguments runs.
//! 4. Otherwise the result is a `no_matching_overload` error value.
//!
//! Non-strict overloads skip rules 1 and 2 and see errors and unknowns as
//! ordinary arguments.

mod builtins;


pub use builtins::register_builtins;

use std::fmt;
use std::sync::Arc;

use ecow::{EcoString, eco_format};
use hashbrown::HashMap;

use crate::values::{ErrorValue, UnknownSet, Value, ValueKind};

/// A callable registered with the [`FunctionRegistry`].
///
/// Implementations never fail outright: failures are returned as
/// `Value::Error`.
pub trait Function: Send + Sync {
    fn call(&self, args: &[Value]) -> Value;
}

impl<F> Function for F
where
    F: Fn(&[Value]) -> Value + Send + Sync,
{
    fn call(&self, args: &[Value]) -> Value {
        self(args)
    }
}

/// What an argument position accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Any,
    Is(ValueKind),
}

impl ArgKind {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ArgKind::Any => true,
            ArgKind::Is(kind) => value.kind() == kind,
        }
    }
}

impl From<ValueKind> for ArgKind {
    fn from(kind: ValueKind) -> Self {
        ArgKind::Is(kind)
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::Any => f.write_str("dyn"),
            ArgKind::Is(kind) => write!(f, "{kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    name: EcoString,
    overload_id: EcoString,
    receiver_style: bool,
    args: Vec<ArgKind>,
    variadic: bool,
    strict: bool,
}

impl FunctionDescriptor {
    /// A strict, global-style overload. The receiver of a receiver-style
    /// overload counts as its first argument.
    pub fn new<A>(name: impl Into<EcoString>, args: impl IntoIterator<Item = A>) -> Self
    where
        A: Into<ArgKind>,
    {
        let name = name.into();
        let args: Vec<ArgKind> = args.into_iter().map(Into::into).collect();
        let mut overload_id = name.clone();
        for arg in &args {
            overload_id.push('_');
            overload_id.push_str(&eco_format!("{arg}"));
        }
        Self {
            name,
            overload_id,
            receiver_style: false,
            args,
            variadic: false,
            strict: true,
        }
    }

    pub fn receiver(mut self) -> Self {
        self.receiver_style = true;
        self.overload_id = eco_format!("{}_member", self.overload_id);
        self
    }

    /// The last argument kind repeats zero or more times.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Errors and unknowns are passed to the implementation untouched.
    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn with_overload_id(mut self, id: impl Into<EcoString>) -> Self {
        self.overload_id = id.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn overload_id(&self) -> &str {
        &self.overload_id
    }

    pub fn receiver_style(&self) -> bool {
        self.receiver_style
    }

    pub fn args(&self) -> &[ArgKind] {
        &self.args
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn accepts_arity(&self, arity: usize) -> bool {
        if self.variadic {
            arity + 1 >= self.args.len()
        } else {
            arity == self.args.len()
        }
    }

    pub fn matches(&self, args: &[Value]) -> bool {
        if !self.accepts_arity(args.len()) {
            return false;
        }
        args.iter().enumerate().all(|(i, arg)| {
            let kind = self
                .args
                .get(i)
                .or_else(|| self.args.last())
                .copied()
                .unwrap_or(ArgKind::Any);
            kind.accepts(arg)
        })
    }

    /// Two descriptors that could never be told apart at run time.
    fn conflicts_with(&self, other: &FunctionDescriptor) -> bool {
        self.name == other.name
            && self.receiver_style == other.receiver_style
            && self.variadic == other.variadic
            && self.args == other.args
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args = self.args.iter();
        if self.receiver_style {
            if let Some(receiver) = args.next() {
                write!(f, "{receiver}.")?;
            }
        }
        write!(f, "{}(", self.name)?;
        for (i, arg) in args.enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        if self.variadic {
            f.write_str("...")?;
        }
        f.write_str(")")
    }
}

/// A descriptor bound to its implementation.
#[derive(Clone)]
pub struct Overload {
    descriptor: FunctionDescriptor,
    function: Arc<dyn Function>,
}

impl Overload {
    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    pub fn call(&self, args: &[Value]) -> Value {
        self.function.call(args)
    }
}

impl fmt::Debug for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Overload({})", self.descriptor.overload_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("overload '{0}' conflicts with an existing overload")]
    DuplicateOverload(EcoString),
}

/// All functions callable from compiled expressions.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<(EcoString, bool), Vec<Overload>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard operators and conversions.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        register_builtins(&mut registry)?;
        Ok(registry)
    }

    pub fn register(
        &mut self,
        descriptor: FunctionDescriptor,
        function: impl Function + 'static,
    ) -> Result<(), RegistryError> {
        self.register_arc(descriptor, Arc::new(function))
    }

    pub fn register_arc(
        &mut self,
        descriptor: FunctionDescriptor,
        function: Arc<dyn Function>,
    ) -> Result<(), RegistryError> {
        let key = (descriptor.name.clone(), descriptor.receiver_style);
        let overloads = self.functions.entry(key).or_default();
        if overloads.iter().any(|o| {
            o.descriptor.conflicts_with(&descriptor)
                || o.descriptor.overload_id == descriptor.overload_id
        }) {
            return Err(RegistryError::DuplicateOverload(descriptor.overload_id));
        }
        tracing::trace!(overload = %descriptor, "Registered overload");
        overloads.push(Overload {
            descriptor,
            function,
        });
        Ok(())
    }

    /// Overloads of `name` callable with `arity` arguments (receiver
    /// included), in registration order.
    pub fn find_overloads(&self, name: &str, receiver_style: bool, arity: usize) -> Vec<Overload> {
        self.functions
            .get(&(EcoString::from(name), receiver_style))
            .map(|overloads| {
                overloads
                    .iter()
                    .filter(|o| o.descriptor.accepts_arity(arity))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.keys().any(|(n, _)| n == name)
    }

    pub fn overload_count(&self) -> usize {
        self.functions.values().map(Vec::len).sum()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("overloads", &self.overload_count())
            .finish()
    }
}

/// The value a strict call short-circuits to, if any: the first error, or
/// else every unknown merged into one set.
pub fn propagate_exceptional<'a>(args: impl IntoIterator<Item = &'a Value>) -> Option<Value> {
    let mut unknowns: Option<UnknownSet> = None;
    for arg in args {
        match arg {
            Value::Error(_) => return Some(arg.clone()),
            Value::Unknown(set) => {
                unknowns = Some(match unknowns {
                    Some(merged) => merged.merge(set),
                    None => set.clone(),
                });
            }
            _ => {}
        }
    }
    unknowns.map(Value::Unknown)
}

/// Runs the first candidate that accepts `args`.
pub fn dispatch(function: &str, candidates: &[Overload], args: &[Value]) -> Value {
    if candidates.iter().all(|o| o.descriptor.strict) {
        if let Some(exceptional) = propagate_exceptional(args) {
            return exceptional;
        }
    }
    for overload in candidates {
        if !overload.descriptor.matches(args) {
            continue;
        }
        if overload.descriptor.strict {
            if let Some(exceptional) = propagate_exceptional(args) {
                return exceptional;
            }
        }
        return overload.call(args);
    }
    Value::Error(ErrorValue::no_matching_overload(&signature(function, args)))
}

fn signature(function: &str, args: &[Value]) -> String {
    let kinds: Vec<&str> = args.iter().map(|a| a.kind().name()).collect();
    format!("{function}({})", kinds.join(", "))
}
