use std::fmt;

/// The discriminant of [`Value`](super::Value).
///
/// The ordering of the variants is also the ordering used when comparing
/// map keys of different kinds: `Bool < Int < Uint < String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,
    List,
    Map,
    Struct,
    Type,
    Error,
    Unknown,
}

impl ValueKind {
    /// Returns `true` for the kinds that may be used as map keys.
    pub fn is_map_key(self) -> bool {
        matches!(
            self,
            ValueKind::Bool | ValueKind::Int | ValueKind::Uint | ValueKind::String
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null_type",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Uint => "uint",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Duration => "google.protobuf.Duration",
            ValueKind::Timestamp => "google.protobuf.Timestamp",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Struct => "struct",
            ValueKind::Type => "type",
            ValueKind::Error => "*error*",
            ValueKind::Unknown => "*unknown*",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
