use super::{binary, no_matching_overload, pair};
use crate::functions::{FunctionDescriptor, FunctionRegistry, RegistryError};
use crate::values::{Value, ValueKind};

fn string_predicate(
    name: &'static str,
    test: fn(&str, &str) -> bool,
) -> impl Fn(&Value, &Value) -> Value + Clone + Send + Sync + 'static {
    move |receiver: &Value, arg: &Value| match (receiver, arg) {
        (Value::String(s), Value::String(t)) => Value::Bool(test(s, t)),
        _ => no_matching_overload(name),
    }
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    let string = ValueKind::String;
    let functions: [(&'static str, fn(&str, &str) -> bool); 3] = [
        ("contains", |s, t| s.contains(t)),
        ("startsWith", |s, t| s.starts_with(t)),
        ("endsWith", |s, t| s.ends_with(t)),
    ];
    for (name, test) in functions {
        let (receiver, arg) = pair(string, string);
        registry.register(
            FunctionDescriptor::new(name, [receiver, arg]).receiver(),
            binary(name, string_predicate(name, test)),
        )?;
    }
    Ok(())
}
