//! Type conversion functions: `int(x)`, `string(x)`, `type(x)` and friends.

use chrono::{DateTime, Utc};

use super::arithmetic::checked_timestamp;
use super::{no_matching_overload, register_unary, result, string_result};
use crate::functions::{ArgKind, FunctionRegistry, RegistryError};
use crate::values::time::{format_duration, format_timestamp, parse_duration, parse_timestamp};
use crate::values::{ErrorValue, Type, Value, ValueKind};

fn parse_error(text: &str, to: &str) -> Value {
    Value::Error(ErrorValue::type_conversion(
        format_args!("string '{text}'"),
        to,
    ))
}

fn to_int(value: &Value) -> Value {
    match value {
        Value::Int(_) => value.clone(),
        Value::Uint(u) => i64::try_from(*u)
            .map_or_else(|_| Value::Error(ErrorValue::overflow("int")), Value::Int),
        Value::Double(d) => {
            if (i64::MIN as f64..i64::MAX as f64).contains(d) {
                Value::Int(*d as i64)
            } else {
                Value::Error(ErrorValue::overflow("int"))
            }
        }
        Value::String(s) => s.parse().map_or_else(|_| parse_error(s, "int"), Value::Int),
        Value::Timestamp(t) => Value::Int(t.timestamp()),
        _ => no_matching_overload("int"),
    }
}

fn to_uint(value: &Value) -> Value {
    match value {
        Value::Uint(_) => value.clone(),
        Value::Int(i) => u64::try_from(*i)
            .map_or_else(|_| Value::Error(ErrorValue::overflow("uint")), Value::Uint),
        Value::Double(d) => {
            if *d > -1.0 && *d < u64::MAX as f64 {
                Value::Uint(*d as u64)
            } else {
                Value::Error(ErrorValue::overflow("uint"))
            }
        }
        Value::String(s) => s.parse().map_or_else(|_| parse_error(s, "uint"), Value::Uint),
        _ => no_matching_overload("uint"),
    }
}

fn to_double(value: &Value) -> Value {
    match value {
        Value::Double(_) => value.clone(),
        Value::Int(i) => Value::Double(*i as f64),
        Value::Uint(u) => Value::Double(*u as f64),
        Value::String(s) => s
            .parse()
            .map_or_else(|_| parse_error(s, "double"), Value::Double),
        _ => no_matching_overload("double"),
    }
}

fn to_string(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        Value::Bool(b) => string_result(if *b { "true" } else { "false" }),
        Value::Int(i) => string_result(ecow::eco_format!("{i}")),
        Value::Uint(u) => string_result(ecow::eco_format!("{u}")),
        Value::Double(d) => string_result(ecow::eco_format!("{d}")),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => string_result(s),
            Err(_) => Value::Error(ErrorValue::invalid_argument("invalid UTF-8 in bytes")),
        },
        Value::Duration(d) => string_result(format_duration(*d)),
        Value::Timestamp(t) => string_result(format_timestamp(t)),
        _ => no_matching_overload("string"),
    }
}

fn to_bytes(value: &Value) -> Value {
    match value {
        Value::Bytes(_) => value.clone(),
        Value::String(s) => Value::bytes(s.as_bytes()),
        _ => no_matching_overload("bytes"),
    }
}

fn to_bool(value: &Value) -> Value {
    match value {
        Value::Bool(_) => value.clone(),
        Value::String(s) => match s.as_str() {
            "true" | "True" | "TRUE" | "t" | "1" => Value::Bool(true),
            "false" | "False" | "FALSE" | "f" | "0" => Value::Bool(false),
            _ => parse_error(s, "bool"),
        },
        _ => no_matching_overload("bool"),
    }
}

fn to_duration(value: &Value) -> Value {
    match value {
        Value::Duration(_) => value.clone(),
        Value::String(s) => result(parse_duration(s), Value::Duration),
        _ => no_matching_overload("duration"),
    }
}

fn to_timestamp(value: &Value) -> Value {
    match value {
        Value::Timestamp(_) => value.clone(),
        Value::String(s) => result(parse_timestamp(s), Value::Timestamp),
        Value::Int(seconds) => checked_timestamp(DateTime::<Utc>::from_timestamp(*seconds, 0)),
        _ => no_matching_overload("timestamp"),
    }
}

fn to_type(value: &Value) -> Value {
    Value::Type(Type::of(value))
}

fn to_dyn(value: &Value) -> Value {
    value.clone()
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    use ValueKind::{Bool, Bytes, Double, Duration, Int, Timestamp, Uint};
    let string = ValueKind::String;
    let kinds = |kinds: &[ValueKind]| -> Vec<ArgKind> {
        kinds.iter().copied().map(ArgKind::Is).collect()
    };

    register_unary(registry, "int", &kinds(&[Int, Uint, Double, string, Timestamp]), to_int)?;
    register_unary(registry, "uint", &kinds(&[Uint, Int, Double, string]), to_uint)?;
    register_unary(registry, "double", &kinds(&[Double, Int, Uint, string]), to_double)?;
    register_unary(
        registry,
        "string",
        &kinds(&[string, Bool, Int, Uint, Double, Bytes, Duration, Timestamp]),
        to_string,
    )?;
    register_unary(registry, "bytes", &kinds(&[Bytes, string]), to_bytes)?;
    register_unary(registry, "bool", &kinds(&[Bool, string]), to_bool)?;
    register_unary(registry, "duration", &kinds(&[Duration, string]), to_duration)?;
    register_unary(registry, "timestamp", &kinds(&[Timestamp, string, Int]), to_timestamp)?;
    register_unary(registry, "type", &[ArgKind::Any], to_type)?;
    register_unary(registry, "dyn", &[ArgKind::Any], to_dyn)
}
