//! The runtime value type.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::{EcoString, EcoVec};

use super::{
    ErrorValue, ListValue, MapKey, MapValue, StructValue, Type, UnknownSet, ValueKind, list,
    map, structs, time,
};

/// A dynamically typed value.
///
/// Scalars are stored inline; strings and bytes are reference counted
/// (`EcoString`/`EcoVec`), and the structured kinds are shared trait objects
/// so that several backing representations can coexist behind one kind.
/// Cloning a `Value` never deep-copies.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(EcoString),
    Bytes(EcoVec<u8>),
    Duration(TimeDelta),
    Timestamp(DateTime<Utc>),
    List(Arc<dyn ListValue>),
    Map(Arc<dyn MapValue>),
    Struct(Arc<dyn StructValue>),
    Type(Type),
    Error(ErrorValue),
    Unknown(UnknownSet),
}

static_assertions::assert_impl_all!(Value: Send, Sync);

impl Value {
    // === Constructors ===

    pub fn string(value: impl Into<EcoString>) -> Value {
        Value::String(value.into())
    }

    pub fn bytes(value: impl AsRef<[u8]>) -> Value {
        Value::Bytes(EcoVec::from(value.as_ref()))
    }

    /// Builds a dynamically typed list.
    pub fn list(elements: impl IntoIterator<Item = Value>) -> Value {
        Value::List(Arc::new(list::VecList::new(elements.into_iter().collect())))
    }

    /// Builds a dynamically typed map, rejecting invalid and duplicate keys.
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Result<Value, ErrorValue> {
        let mut builder = map::MapBuilder::<MapKey>::new(Type::Dyn, Type::Dyn);
        for (key, value) in entries {
            builder.put(key, value)?;
        }
        Ok(builder.build())
    }

    pub fn error(error: ErrorValue) -> Value {
        Value::Error(error)
    }

    pub fn unknown(unknowns: UnknownSet) -> Value {
        Value::Unknown(unknowns)
    }

    // === Inspection ===

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Uint(_) => ValueKind::Uint,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Duration(_) => ValueKind::Duration,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Struct(_) => ValueKind::Struct,
            Value::Type(_) => ValueKind::Type,
            Value::Error(_) => ValueKind::Error,
            Value::Unknown(_) => ValueKind::Unknown,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Arc<dyn ListValue>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Arc<dyn MapValue>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Arc<dyn StructValue>> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Heterogeneous equality.
    ///
    /// Values of different kinds are never equal and never raise an error.
    /// NaN compares equal to NaN so that every value equals itself. Errors
    /// only arise from structured values whose backing store fails to
    /// answer a lookup.
    pub fn equals(&self, other: &Value) -> Result<bool, ErrorValue> {
        Ok(match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::List(a), Value::List(b)) => list::list_equal(a, b)?,
            (Value::Map(a), Value::Map(b)) => map::map_equal(a, b)?,
            (Value::Struct(a), Value::Struct(b)) => structs::struct_equal(a, b)?,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Unknown(a), Value::Unknown(b)) => a == b,
            _ => false,
        })
    }

    /// Whether this is the default value of its kind.
    pub fn is_zero_value(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Uint(u) => *u == 0,
            Value::Double(d) => *d == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Duration(d) => d.is_zero(),
            Value::Timestamp(t) => *t == DateTime::<Utc>::UNIX_EPOCH,
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::Struct(s) => s.is_zero_value(),
            Value::Type(_) | Value::Error(_) | Value::Unknown(_) => false,
        }
    }

    pub fn debug_string(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other).unwrap_or(false)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}u"),
            Value::Double(d) => write!(f, "{d:?}"),
            Value::String(s) => write!(f, "{:?}", s.as_str()),
            Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            Value::Duration(d) => f.write_str(&time::format_duration(*d)),
            Value::Timestamp(t) => f.write_str(&time::format_timestamp(t)),
            Value::List(l) => {
                f.write_str("[")?;
                for (i, element) in l.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Value::Map(m) => {
                // Sorted by key so that the output is deterministic.
                let mut entries = Vec::with_capacity(m.size());
                m.for_each(&mut |key, value| {
                    if let Ok(key) = MapKey::from_value(key) {
                        entries.push((key, value.clone()));
                    }
                    true
                });
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Struct(s) => {
                write!(f, "{}{{", s.type_name())?;
                let mut first = true;
                let mut result = Ok(());
                s.for_each_field(&mut |name, value| {
                    let sep = if first { "" } else { ", " };
                    first = false;
                    result = write!(f, "{sep}{name}: {value}");
                    result.is_ok()
                });
                result?;
                f.write_str("}")
            }
            Value::Type(t) => write!(f, "{t}"),
            Value::Error(e) => write!(f, "error({e})"),
            Value::Unknown(u) => write!(f, "{u}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Uint(u) => f.debug_tuple("Uint").field(u).finish(),
            Value::Double(d) => f.debug_tuple("Double").field(d).finish(),
            Value::Error(e) => f.debug_tuple("Error").field(e).finish(),
            other => write!(f, "{:?}({other})", other.kind()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

impl From<EcoString> for Value {
    fn from(value: EcoString) -> Self {
        Value::String(value)
    }
}

impl From<TimeDelta> for Value {
    fn from(value: TimeDelta) -> Self {
        Value::Duration(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<ErrorValue> for Value {
    fn from(value: ErrorValue) -> Self {
        Value::Error(value)
    }
}

impl From<Type> for Value {
    fn from(value: Type) -> Self {
        Value::Type(value)
    }
}
