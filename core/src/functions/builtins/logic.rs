use super::{no_matching_overload, unary};
use crate::ast::operators;
use crate::functions::{ArgKind, FunctionDescriptor, FunctionRegistry, RegistryError};
use crate::values::{Value, ValueKind};

fn not(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(!b),
        _ => no_matching_overload(operators::LOGICAL_NOT),
    }
}

/// False only for `false`; errors and unknowns count as true.
fn not_strictly_false(value: &Value) -> Value {
    Value::Bool(!matches!(value, Value::Bool(false)))
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    registry.register(
        FunctionDescriptor::new(operators::LOGICAL_NOT, [ValueKind::Bool]),
        unary(operators::LOGICAL_NOT, not),
    )?;
    registry.register(
        FunctionDescriptor::new(operators::NOT_STRICTLY_FALSE, [ArgKind::Any]).non_strict(),
        unary(operators::NOT_STRICTLY_FALSE, not_strictly_false),
    )
}
