//! Equality and ordering operators.

use std::cmp::Ordering;

use super::{no_matching_overload, pair, register_binary};
use crate::ast::operators;
use crate::functions::{ArgKind, FunctionRegistry, RegistryError};
use crate::values::{Value, ValueKind};

enum Comparison {
    Ordered(Ordering),
    /// Comparable kinds, but no order exists (NaN).
    Unordered,
    Incomparable,
}

impl From<Option<Ordering>> for Comparison {
    fn from(ordering: Option<Ordering>) -> Self {
        ordering.map_or(Comparison::Unordered, Comparison::Ordered)
    }
}

fn compare_int_uint(i: i64, u: u64) -> Ordering {
    match u64::try_from(i) {
        Ok(i) => i.cmp(&u),
        Err(_) => Ordering::Less,
    }
}

fn compare(a: &Value, b: &Value) -> Comparison {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Comparison::Ordered(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Comparison::Ordered(x.cmp(y)),
        (Value::Uint(x), Value::Uint(y)) => Comparison::Ordered(x.cmp(y)),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y).into(),
        (Value::Int(x), Value::Uint(y)) => Comparison::Ordered(compare_int_uint(*x, *y)),
        (Value::Uint(x), Value::Int(y)) => Comparison::Ordered(compare_int_uint(*y, *x).reverse()),
        (Value::Int(x), Value::Double(y)) => (*x as f64).partial_cmp(y).into(),
        (Value::Double(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)).into(),
        (Value::Uint(x), Value::Double(y)) => (*x as f64).partial_cmp(y).into(),
        (Value::Double(x), Value::Uint(y)) => x.partial_cmp(&(*y as f64)).into(),
        (Value::String(x), Value::String(y)) => Comparison::Ordered(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Comparison::Ordered(x.as_slice().cmp(y.as_slice())),
        (Value::Duration(x), Value::Duration(y)) => Comparison::Ordered(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Comparison::Ordered(x.cmp(y)),
        _ => Comparison::Incomparable,
    }
}

fn relation(name: &'static str, a: &Value, b: &Value, holds: fn(Ordering) -> bool) -> Value {
    match compare(a, b) {
        Comparison::Ordered(ordering) => Value::Bool(holds(ordering)),
        Comparison::Unordered => Value::Bool(false),
        Comparison::Incomparable => no_matching_overload(name),
    }
}

fn equals(a: &Value, b: &Value) -> Value {
    match a.equals(b) {
        Ok(eq) => Value::Bool(eq),
        Err(e) => Value::Error(e),
    }
}

fn not_equals(a: &Value, b: &Value) -> Value {
    match a.equals(b) {
        Ok(eq) => Value::Bool(!eq),
        Err(e) => Value::Error(e),
    }
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    let any = [(ArgKind::Any, ArgKind::Any)];
    register_binary(registry, operators::EQUALS, &any, equals)?;
    register_binary(registry, operators::NOT_EQUALS, &any, not_equals)?;

    use ValueKind::{Bool, Bytes, Double, Duration, Int, Timestamp, Uint};
    let mut orderable = vec![
        pair(Bool, Bool),
        pair(ValueKind::String, ValueKind::String),
        pair(Bytes, Bytes),
        pair(Duration, Duration),
        pair(Timestamp, Timestamp),
    ];
    for left in [Int, Uint, Double] {
        for right in [Int, Uint, Double] {
            orderable.push(pair(left, right));
        }
    }

    let relations: [(&'static str, fn(Ordering) -> bool); 4] = [
        (operators::LESS, Ordering::is_lt),
        (operators::LESS_EQUALS, Ordering::is_le),
        (operators::GREATER, Ordering::is_gt),
        (operators::GREATER_EQUALS, Ordering::is_ge),
    ];
    for (name, holds) in relations {
        register_binary(registry, name, &orderable, move |a: &Value, b: &Value| {
            relation(name, a, b, holds)
        })?;
    }
    Ok(())
}
