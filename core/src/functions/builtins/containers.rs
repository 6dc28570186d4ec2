//! Indexing, membership and size.

use super::{no_matching_overload, pair, register_binary, unary};
use crate::ast::operators;
use crate::functions::{ArgKind, FunctionDescriptor, FunctionRegistry, RegistryError};
use crate::values::{ErrorValue, Value, ValueKind};

const SIZE: &str = "size";

fn index(container: &Value, key: &Value) -> Value {
    let outcome = match (container, key) {
        (Value::List(list), Value::Int(i)) => usize::try_from(*i)
            .map_err(|_| ErrorValue::index_out_of_range(*i, list.size()))
            .and_then(|i| list.get(i)),
        (Value::List(list), Value::Uint(u)) => usize::try_from(*u)
            .map_err(|_| ErrorValue::index_out_of_range(i64::MAX, list.size()))
            .and_then(|i| list.get(i)),
        (Value::Map(map), key) => map.get(key),
        _ => return no_matching_overload(operators::INDEX),
    };
    outcome.unwrap_or_else(Value::Error)
}

fn contains(element: &Value, container: &Value) -> Value {
    match container {
        Value::List(list) => match list.contains(element) {
            Ok(found) => Value::Bool(found),
            Err(e) => Value::Error(e),
        },
        Value::Map(map) => Value::Bool(map.has(element)),
        _ => no_matching_overload(operators::IN),
    }
}

fn size(value: &Value) -> Value {
    let size = match value {
        Value::String(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(l) => l.size(),
        Value::Map(m) => m.size(),
        _ => return no_matching_overload(SIZE),
    };
    i64::try_from(size).map_or_else(|_| Value::Error(ErrorValue::overflow("int")), Value::Int)
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    use ValueKind::{Bytes, Int, List, Map, Uint};
    register_binary(
        registry,
        operators::INDEX,
        &[pair(List, Int), pair(List, Uint), (ArgKind::Is(Map), ArgKind::Any)],
        index,
    )?;
    register_binary(
        registry,
        operators::IN,
        &[(ArgKind::Any, ArgKind::Is(List)), (ArgKind::Any, ArgKind::Is(Map))],
        contains,
    )?;

    for kind in [ValueKind::String, Bytes, List, Map] {
        registry.register(FunctionDescriptor::new(SIZE, [kind]), unary(SIZE, size))?;
        registry.register(
            FunctionDescriptor::new(SIZE, [kind]).receiver(),
            unary(SIZE, size),
        )?;
    }
    Ok(())
}
