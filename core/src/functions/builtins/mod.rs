//! The standard operator library.
//!
//! Each submodule registers one family of functions. Implementations are
//! shared between the overloads of a family and match on the argument
//! values themselves, so an overload only has to declare the kinds it
//! accepts.

mod arithmetic;
mod comparison;
mod containers;
mod conversions;
mod logic;
mod strings;


use ecow::EcoString;

use super::{ArgKind, Function, FunctionDescriptor, FunctionRegistry, RegistryError};
use crate::values::{ErrorValue, Value, ValueKind};

/// Registers every built-in operator and conversion.
pub fn register_builtins(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    arithmetic::register(registry)?;
    comparison::register(registry)?;
    logic::register(registry)?;
    containers::register(registry)?;
    strings::register(registry)?;
    conversions::register(registry)?;
    tracing::debug!(overloads = registry.overload_count(), "Registered built-in functions");
    Ok(())
}

fn unary<F>(name: &'static str, f: F) -> impl Function + 'static
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    move |args: &[Value]| match args {
        [a] => f(a),
        _ => no_matching_overload(name),
    }
}

fn binary<F>(name: &'static str, f: F) -> impl Function + 'static
where
    F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
{
    move |args: &[Value]| match args {
        [a, b] => f(a, b),
        _ => no_matching_overload(name),
    }
}

/// Registers `f` once per argument kind in `kinds`.
fn register_unary<F>(
    registry: &mut FunctionRegistry,
    name: &'static str,
    kinds: &[ArgKind],
    f: F,
) -> Result<(), RegistryError>
where
    F: Fn(&Value) -> Value + Clone + Send + Sync + 'static,
{
    for kind in kinds {
        registry.register(FunctionDescriptor::new(name, [*kind]), unary(name, f.clone()))?;
    }
    Ok(())
}

/// Registers `f` once per argument kind pair in `pairs`.
fn register_binary<F>(
    registry: &mut FunctionRegistry,
    name: &'static str,
    pairs: &[(ArgKind, ArgKind)],
    f: F,
) -> Result<(), RegistryError>
where
    F: Fn(&Value, &Value) -> Value + Clone + Send + Sync + 'static,
{
    for (left, right) in pairs {
        registry.register(
            FunctionDescriptor::new(name, [*left, *right]),
            binary(name, f.clone()),
        )?;
    }
    Ok(())
}

fn pair(left: ValueKind, right: ValueKind) -> (ArgKind, ArgKind) {
    (ArgKind::Is(left), ArgKind::Is(right))
}

fn no_matching_overload(name: &str) -> Value {
    Value::Error(ErrorValue::no_matching_overload(name))
}

fn result<T>(value: Result<T, ErrorValue>, wrap: impl FnOnce(T) -> Value) -> Value {
    match value {
        Ok(v) => wrap(v),
        Err(e) => Value::Error(e),
    }
}

fn string_result(s: impl Into<EcoString>) -> Value {
    Value::String(s.into())
}
