//! Arithmetic operators over numbers, strings, bytes, lists and time.

use chrono::{DateTime, Datelike, TimeDelta, Utc};

use super::{no_matching_overload, pair, register_binary, register_unary, result};
use crate::ast::operators;
use crate::functions::{ArgKind, FunctionRegistry, RegistryError};
use crate::values::{ErrorValue, Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithmeticOp {
    fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => operators::ADD,
            ArithmeticOp::Sub => operators::SUBTRACT,
            ArithmeticOp::Mul => operators::MULTIPLY,
            ArithmeticOp::Div => operators::DIVIDE,
            ArithmeticOp::Rem => operators::MODULO,
        }
    }
}

/// Evaluate a binary operation on two integers.
///
/// Overflow is an error, and so is division or modulus by zero.
pub(super) fn eval_binary_int(op: ArithmeticOp, left: i64, right: i64) -> Result<i64, ErrorValue> {
    let result = match op {
        ArithmeticOp::Add => left.checked_add(right),
        ArithmeticOp::Sub => left.checked_sub(right),
        ArithmeticOp::Mul => left.checked_mul(right),
        ArithmeticOp::Div => {
            if right == 0 {
                return Err(ErrorValue::division_by_zero());
            }
            // i64::MIN / -1 overflows
            left.checked_div(right)
        }
        ArithmeticOp::Rem => {
            if right == 0 {
                return Err(ErrorValue::modulo_by_zero());
            }
            left.checked_rem(right)
        }
    };
    result.ok_or_else(|| ErrorValue::overflow("int"))
}

/// Evaluate a binary operation on two unsigned integers.
pub(super) fn eval_binary_uint(op: ArithmeticOp, left: u64, right: u64) -> Result<u64, ErrorValue> {
    let result = match op {
        ArithmeticOp::Add => left.checked_add(right),
        ArithmeticOp::Sub => left.checked_sub(right),
        ArithmeticOp::Mul => left.checked_mul(right),
        ArithmeticOp::Div => {
            if right == 0 {
                return Err(ErrorValue::division_by_zero());
            }
            left.checked_div(right)
        }
        ArithmeticOp::Rem => {
            if right == 0 {
                return Err(ErrorValue::modulo_by_zero());
            }
            left.checked_rem(right)
        }
    };
    result.ok_or_else(|| ErrorValue::overflow("uint"))
}

/// Evaluate a binary operation on two doubles.
///
/// Follows IEEE 754 semantics (produces inf/nan rather than failing).
pub(super) fn eval_binary_double(op: ArithmeticOp, left: f64, right: f64) -> f64 {
    match op {
        ArithmeticOp::Add => left + right,
        ArithmeticOp::Sub => left - right,
        ArithmeticOp::Mul => left * right,
        ArithmeticOp::Div => left / right,
        ArithmeticOp::Rem => left % right,
    }
}

fn numeric(op: ArithmeticOp, a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => result(eval_binary_int(op, *x, *y), Value::Int),
        (Value::Uint(x), Value::Uint(y)) => result(eval_binary_uint(op, *x, *y), Value::Uint),
        (Value::Double(x), Value::Double(y)) if op != ArithmeticOp::Rem => {
            Value::Double(eval_binary_double(op, *x, *y))
        }
        _ => no_matching_overload(op.name()),
    }
}

/// Timestamps are limited to years 1 through 9999.
pub(super) fn checked_timestamp(timestamp: Option<DateTime<Utc>>) -> Value {
    match timestamp {
        Some(t) if (1..=9999).contains(&t.year()) => Value::Timestamp(t),
        _ => Value::Error(ErrorValue::overflow("timestamp")),
    }
}

fn checked_duration(duration: Option<TimeDelta>) -> Value {
    duration.map_or_else(|| Value::Error(ErrorValue::overflow("duration")), Value::Duration)
}

fn add(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::String(x), Value::String(y)) => {
            let mut joined = x.clone();
            joined.push_str(y);
            Value::String(joined)
        }
        (Value::Bytes(x), Value::Bytes(y)) => {
            let mut joined = x.clone();
            joined.extend_from_slice(y);
            Value::Bytes(joined)
        }
        (Value::List(x), Value::List(y)) => Value::list(x.iter().chain(y.iter())),
        (Value::Duration(x), Value::Duration(y)) => checked_duration(x.checked_add(y)),
        (Value::Timestamp(t), Value::Duration(d)) | (Value::Duration(d), Value::Timestamp(t)) => {
            checked_timestamp(t.checked_add_signed(*d))
        }
        _ => numeric(ArithmeticOp::Add, a, b),
    }
}

fn subtract(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Duration(x), Value::Duration(y)) => checked_duration(x.checked_sub(y)),
        (Value::Timestamp(t), Value::Duration(d)) => checked_timestamp(t.checked_sub_signed(*d)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Value::Duration(x.signed_duration_since(*y)),
        _ => numeric(ArithmeticOp::Sub, a, b),
    }
}

fn negate(a: &Value) -> Value {
    match a {
        Value::Int(i) => i
            .checked_neg()
            .map_or_else(|| Value::Error(ErrorValue::overflow("int")), Value::Int),
        Value::Double(d) => Value::Double(-d),
        _ => no_matching_overload(operators::NEGATE),
    }
}

pub(super) fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    use ValueKind::{Bytes, Double, Duration, Int, List, Timestamp, Uint};
    let numbers = [pair(Int, Int), pair(Uint, Uint), pair(Double, Double)];

    let mut addable: Vec<(ArgKind, ArgKind)> = numbers.to_vec();
    addable.extend([
        pair(ValueKind::String, ValueKind::String),
        pair(Bytes, Bytes),
        pair(List, List),
        pair(Duration, Duration),
        pair(Timestamp, Duration),
        pair(Duration, Timestamp),
    ]);
    register_binary(registry, operators::ADD, &addable, add)?;

    let mut subtractable: Vec<(ArgKind, ArgKind)> = numbers.to_vec();
    subtractable.extend([
        pair(Duration, Duration),
        pair(Timestamp, Duration),
        pair(Timestamp, Timestamp),
    ]);
    register_binary(registry, operators::SUBTRACT, &subtractable, subtract)?;

    for op in [ArithmeticOp::Mul, ArithmeticOp::Div] {
        register_binary(registry, op.name(), &numbers, move |a: &Value, b: &Value| {
            numeric(op, a, b)
        })?;
    }
    register_binary(
        registry,
        operators::MODULO,
        &numbers[..2],
        |a: &Value, b: &Value| numeric(ArithmeticOp::Rem, a, b),
    )?;

    register_unary(
        registry,
        operators::NEGATE,
        &[ArgKind::Is(Int), ArgKind::Is(Double)],
        negate,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(eval_binary_int(ArithmeticOp::Add, 2, 3).unwrap(), 5);
        assert_eq!(eval_binary_int(ArithmeticOp::Sub, 3, 10).unwrap(), -7);
        assert_eq!(eval_binary_int(ArithmeticOp::Mul, -2, 5).unwrap(), -10);
        assert_eq!(eval_binary_int(ArithmeticOp::Div, 7, 3).unwrap(), 2);
        assert_eq!(eval_binary_int(ArithmeticOp::Rem, -7, 3).unwrap(), -1);
    }

    #[test]
    fn test_int_division_by_zero() {
        let err = eval_binary_int(ArithmeticOp::Div, 10, 0).unwrap_err();
        assert_eq!(err, ErrorValue::division_by_zero());
        let err = eval_binary_int(ArithmeticOp::Rem, 10, 0).unwrap_err();
        assert_eq!(err, ErrorValue::modulo_by_zero());
    }

    #[test]
    fn test_int_overflow_is_an_error() {
        assert!(eval_binary_int(ArithmeticOp::Add, i64::MAX, 1).is_err());
        assert!(eval_binary_int(ArithmeticOp::Mul, i64::MAX, 2).is_err());
        assert!(eval_binary_int(ArithmeticOp::Div, i64::MIN, -1).is_err());
        assert!(eval_binary_uint(ArithmeticOp::Sub, 0, 1).is_err());
    }

    #[test]
    fn test_double_follows_ieee() {
        let result = eval_binary_double(ArithmeticOp::Div, 10.0, 0.0);
        assert!(result.is_infinite() && result.is_sign_positive());
        assert!((eval_binary_double(ArithmeticOp::Add, 3.14, 2.0) - 5.14).abs() < 1e-9);
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(add(&Value::string("ab"), &Value::string("c")), Value::string("abc"));
        assert_eq!(add(&Value::bytes(b"a"), &Value::bytes(b"b")), Value::bytes(b"ab"));
        assert_eq!(
            add(&Value::list([Value::Int(1)]), &Value::list([Value::Int(2)])),
            Value::list([Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_time_arithmetic() {
        let epoch = Value::Timestamp(DateTime::<Utc>::UNIX_EPOCH);
        let second = Value::Duration(TimeDelta::seconds(1));
        let later = add(&epoch, &second);
        assert_eq!(
            later,
            Value::Timestamp(DateTime::<Utc>::from_timestamp(1, 0).unwrap())
        );
        assert_eq!(subtract(&later, &epoch), second);
        assert!(subtract(&epoch, &Value::Duration(TimeDelta::days(365 * 2000))).is_error());
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(&Value::Int(4)), Value::Int(-4));
        assert!(negate(&Value::Int(i64::MIN)).is_error());
        assert_eq!(negate(&Value::Double(1.5)), Value::Double(-1.5));
    }
}
