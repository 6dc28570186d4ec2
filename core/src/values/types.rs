//! Type descriptors.
//!
//! A [`Type`] describes the declared type of an expression (as annotated by
//! an external checker) and is also a first-class runtime value
//! (`Value::Type`), produced by the `type()` conversion.

use std::fmt;
use std::sync::Arc;

use ecow::EcoString;

use super::{Value, ValueKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Dynamically typed; accepts any value.
    Dyn,
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,
    List(Arc<Type>),
    Map(Arc<Type>, Arc<Type>),
    Struct(EcoString),
    Type,
    Error,
}

impl Type {
    pub fn list(element: Type) -> Type {
        Type::List(Arc::new(element))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Arc::new(key), Arc::new(value))
    }

    pub fn struct_type(name: impl Into<EcoString>) -> Type {
        Type::Struct(name.into())
    }

    /// The value kind this type admits, or `None` for `dyn`.
    pub fn kind(&self) -> Option<ValueKind> {
        Some(match self {
            Type::Dyn => return None,
            Type::Null => ValueKind::Null,
            Type::Bool => ValueKind::Bool,
            Type::Int => ValueKind::Int,
            Type::Uint => ValueKind::Uint,
            Type::Double => ValueKind::Double,
            Type::String => ValueKind::String,
            Type::Bytes => ValueKind::Bytes,
            Type::Duration => ValueKind::Duration,
            Type::Timestamp => ValueKind::Timestamp,
            Type::List(_) => ValueKind::List,
            Type::Map(_, _) => ValueKind::Map,
            Type::Struct(_) => ValueKind::Struct,
            Type::Type => ValueKind::Type,
            Type::Error => ValueKind::Error,
        })
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self, Type::Dyn)
    }

    /// Shallow check that `value` may be stored in a slot declared with this
    /// type. Container element types are not inspected.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Type::Dyn, _) => true,
            (Type::Struct(name), Value::Struct(s)) => s.type_name() == name.as_str(),
            _ => self.kind() == Some(value.kind()),
        }
    }

    /// The runtime type of a value.
    pub fn of(value: &Value) -> Type {
        match value {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Uint(_) => Type::Uint,
            Value::Double(_) => Type::Double,
            Value::String(_) => Type::String,
            Value::Bytes(_) => Type::Bytes,
            Value::Duration(_) => Type::Duration,
            Value::Timestamp(_) => Type::Timestamp,
            Value::List(_) => Type::list(Type::Dyn),
            Value::Map(_) => Type::map(Type::Dyn, Type::Dyn),
            Value::Struct(s) => Type::Struct(EcoString::from(s.type_name())),
            Value::Type(_) => Type::Type,
            Value::Error(_) | Value::Unknown(_) => Type::Error,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Dyn => f.write_str("dyn"),
            Type::List(element) => write!(f, "list({element})"),
            Type::Map(key, value) => write!(f, "map({key}, {value})"),
            Type::Struct(name) => f.write_str(name),
            other => match other.kind() {
                Some(kind) => f.write_str(kind.name()),
                None => f.write_str("dyn"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Type::Int.to_string(), "int");
        assert_eq!(Type::list(Type::String).to_string(), "list(string)");
        assert_eq!(
            Type::map(Type::String, Type::Dyn).to_string(),
            "map(string, dyn)"
        );
        assert_eq!(Type::struct_type("acme.User").to_string(), "acme.User");
    }

    #[test]
    fn test_accepts() {
        assert!(Type::Dyn.accepts(&Value::Null));
        assert!(Type::Int.accepts(&Value::Int(3)));
        assert!(!Type::Int.accepts(&Value::Uint(3)));
        assert!(Type::list(Type::Int).accepts(&Value::list([Value::Int(1)])));
    }
}
