//! Expression-level errors.
//!
//! An [`ErrorValue`] is data: it travels through the operand stack inside
//! `Value::Error` like any other value. Engine failures (a corrupt plan, a
//! broken stack) are reported separately by `vm::EvalError` and never end up
//! here.

use std::fmt;

use ecow::EcoString;

use super::ValueKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoSuchKey,
    NoSuchField,
    IndexOutOfRange,
    InvalidMapKeyType,
    DuplicateKey,
    NoMatchingOverload,
    TypeConversion,
    DivisionByZero,
    ModuloByZero,
    Overflow,
    InvalidArgument,
    UndeclaredReference,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::NoSuchKey => "no_such_key",
            ErrorCode::NoSuchField => "no_such_field",
            ErrorCode::IndexOutOfRange => "index_out_of_range",
            ErrorCode::InvalidMapKeyType => "invalid_map_key_type",
            ErrorCode::DuplicateKey => "duplicate_key",
            ErrorCode::NoMatchingOverload => "no_matching_overload",
            ErrorCode::TypeConversion => "type_conversion",
            ErrorCode::DivisionByZero => "division_by_zero",
            ErrorCode::ModuloByZero => "modulo_by_zero",
            ErrorCode::Overflow => "overflow",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::UndeclaredReference => "undeclared_reference",
        };
        f.write_str(name)
    }
}

/// A carried failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ErrorValue {
    code: ErrorCode,
    message: EcoString,
}

impl ErrorValue {
    pub fn new(code: ErrorCode, message: impl Into<EcoString>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    // === Constructors for the common failures ===

    pub fn no_such_key(key: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NoSuchKey, ecow::eco_format!("key not found: {key}"))
    }

    pub fn no_such_field(field: &str) -> Self {
        Self::new(
            ErrorCode::NoSuchField,
            ecow::eco_format!("no such field: {field}"),
        )
    }

    pub fn index_out_of_range(index: i64, size: usize) -> Self {
        Self::new(
            ErrorCode::IndexOutOfRange,
            ecow::eco_format!("index out of range: {index} (size {size})"),
        )
    }

    pub fn invalid_map_key_type(kind: ValueKind) -> Self {
        Self::new(
            ErrorCode::InvalidMapKeyType,
            ecow::eco_format!("invalid map key type: {kind}"),
        )
    }

    pub fn duplicate_key(key: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::DuplicateKey,
            ecow::eco_format!("duplicate key in map: {key}"),
        )
    }

    pub fn no_matching_overload(function: &str) -> Self {
        Self::new(
            ErrorCode::NoMatchingOverload,
            ecow::eco_format!("no matching overload for '{function}'"),
        )
    }

    pub fn type_conversion(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::TypeConversion,
            ecow::eco_format!("type conversion error from '{from}' to '{to}'"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorCode::DivisionByZero, "divide by zero")
    }

    pub fn modulo_by_zero() -> Self {
        Self::new(ErrorCode::ModuloByZero, "modulus by zero")
    }

    pub fn overflow(what: &str) -> Self {
        Self::new(ErrorCode::Overflow, ecow::eco_format!("{what} overflow"))
    }

    pub fn invalid_argument(message: impl Into<EcoString>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn undeclared_reference(name: &str) -> Self {
        Self::new(
            ErrorCode::UndeclaredReference,
            ecow::eco_format!("no value with name '{name}' found in activation"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_message() {
        let err = ErrorValue::no_such_key("\"a\"");
        assert_eq!(err.code(), ErrorCode::NoSuchKey);
        assert_eq!(err.to_string(), "key not found: \"a\"");
    }

    #[test]
    fn test_invalid_map_key_names_kind() {
        let err = ErrorValue::invalid_map_key_type(ValueKind::Double);
        assert_eq!(err.message(), "invalid map key type: double");
    }
}
