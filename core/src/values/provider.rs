//! Registry of struct types that struct literals may construct.
//!
//! The provider is built once, before compilation, and shared read-only by
//! every plan compiled against it.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use ecow::EcoString;
use hashbrown::HashMap;

use super::{ErrorValue, StructBuilder, StructType, StructValueBuilder, Value};

/// Creates a fresh builder for one struct type per construction.
pub trait StructBuilderFactory: Send + Sync {
    fn new_builder(&self) -> Box<dyn StructValueBuilder>;
}

struct SchemaFactory(Arc<StructType>);

impl StructBuilderFactory for SchemaFactory {
    fn new_builder(&self) -> Box<dyn StructValueBuilder> {
        Box::new(StructBuilder::new(self.0.clone()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("struct type '{0}' is already registered")]
    DuplicateType(EcoString),
}

#[derive(Default)]
pub struct TypeProvider {
    factories: HashMap<EcoString, Arc<dyn StructBuilderFactory>>,
}

impl TypeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that knows the `google.protobuf` wrapper, duration and
    /// timestamp types.
    pub fn with_well_known_types() -> Self {
        let mut provider = Self::new();
        for wrapper in WRAPPERS {
            provider.factories.insert(
                EcoString::from(wrapper.type_name()),
                Arc::new(*wrapper) as Arc<dyn StructBuilderFactory>,
            );
        }
        provider
    }

    pub fn register_struct_type(&mut self, schema: StructType) -> Result<(), ProviderError> {
        let name = EcoString::from(schema.name());
        self.register_factory(name, Arc::new(SchemaFactory(Arc::new(schema))))
    }

    pub fn register_factory(
        &mut self,
        name: impl Into<EcoString>,
        factory: Arc<dyn StructBuilderFactory>,
    ) -> Result<(), ProviderError> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(ProviderError::DuplicateType(name));
        }
        tracing::debug!(type_name = %name, "Registered struct type");
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn find_struct_builder(&self, name: &str) -> Option<Arc<dyn StructBuilderFactory>> {
        self.factories.get(name).cloned()
    }

    /// Registered type names with their builders, in no particular order.
    pub fn factories(
        &self,
    ) -> impl Iterator<Item = (&EcoString, &Arc<dyn StructBuilderFactory>)> + '_ {
        self.factories.iter()
    }
}

// ============================================================================
// Well-known wrapper types
// ============================================================================

/// A `google.protobuf` message that unwraps to a primitive when built.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Wrapper {
    Bool,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,
}

const WRAPPERS: &[Wrapper] = &[
    Wrapper::Bool,
    Wrapper::Int32,
    Wrapper::Int64,
    Wrapper::UInt32,
    Wrapper::UInt64,
    Wrapper::Float,
    Wrapper::Double,
    Wrapper::String,
    Wrapper::Bytes,
    Wrapper::Duration,
    Wrapper::Timestamp,
];

impl Wrapper {
    fn type_name(self) -> &'static str {
        match self {
            Wrapper::Bool => "google.protobuf.BoolValue",
            Wrapper::Int32 => "google.protobuf.Int32Value",
            Wrapper::Int64 => "google.protobuf.Int64Value",
            Wrapper::UInt32 => "google.protobuf.UInt32Value",
            Wrapper::UInt64 => "google.protobuf.UInt64Value",
            Wrapper::Float => "google.protobuf.FloatValue",
            Wrapper::Double => "google.protobuf.DoubleValue",
            Wrapper::String => "google.protobuf.StringValue",
            Wrapper::Bytes => "google.protobuf.BytesValue",
            Wrapper::Duration => "google.protobuf.Duration",
            Wrapper::Timestamp => "google.protobuf.Timestamp",
        }
    }
}

impl StructBuilderFactory for Wrapper {
    fn new_builder(&self) -> Box<dyn StructValueBuilder> {
        Box::new(WrapperBuilder {
            wrapper: *self,
            value: None,
            seconds: 0,
            nanos: 0,
        })
    }
}

struct WrapperBuilder {
    wrapper: Wrapper,
    value: Option<Value>,
    seconds: i64,
    nanos: i64,
}

impl WrapperBuilder {
    fn set_value(&mut self, value: Value) -> Result<(), ErrorValue> {
        let accepted = match (self.wrapper, &value) {
            (Wrapper::Bool, Value::Bool(_)) => true,
            (Wrapper::Int64, Value::Int(_)) => true,
            (Wrapper::Int32, Value::Int(i)) => {
                i32::try_from(*i).map_err(|_| ErrorValue::overflow("int32"))?;
                true
            }
            (Wrapper::UInt64, Value::Uint(_)) => true,
            (Wrapper::UInt32, Value::Uint(u)) => {
                u32::try_from(*u).map_err(|_| ErrorValue::overflow("uint32"))?;
                true
            }
            (Wrapper::Double, Value::Double(_)) => true,
            (Wrapper::Float, Value::Double(d)) => {
                self.value = Some(Value::Double(*d as f32 as f64));
                return Ok(());
            }
            (Wrapper::String, Value::String(_)) => true,
            (Wrapper::Bytes, Value::Bytes(_)) => true,
            _ => false,
        };
        if !accepted {
            return Err(ErrorValue::type_conversion(value.kind(), self.wrapper.type_name()));
        }
        self.value = Some(value);
        Ok(())
    }

    fn set_time_part(&mut self, name: &str, value: Value) -> Result<(), ErrorValue> {
        let Value::Int(v) = value else {
            return Err(ErrorValue::type_conversion(value.kind(), "int"));
        };
        match name {
            "seconds" => self.seconds = v,
            "nanos" => self.nanos = v,
            _ => return Err(ErrorValue::no_such_field(name)),
        }
        Ok(())
    }

    fn is_time(&self) -> bool {
        matches!(self.wrapper, Wrapper::Duration | Wrapper::Timestamp)
    }
}

impl StructValueBuilder for WrapperBuilder {
    fn set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), ErrorValue> {
        if let Value::Error(error) = value {
            return Err(error);
        }
        if self.is_time() {
            return self.set_time_part(name, value);
        }
        if name != "value" {
            return Err(ErrorValue::no_such_field(name));
        }
        self.set_value(value)
    }

    fn set_field_by_number(&mut self, number: i64, value: Value) -> Result<(), ErrorValue> {
        let name = match (self.is_time(), number) {
            (false, 1) => "value",
            (true, 1) => "seconds",
            (true, 2) => "nanos",
            _ => return Err(ErrorValue::no_such_field(&number.to_string())),
        };
        self.set_field_by_name(name, value)
    }

    fn build(self: Box<Self>) -> Result<Value, ErrorValue> {
        let nanos = TimeDelta::nanoseconds(self.nanos);
        Ok(match self.wrapper {
            Wrapper::Duration => {
                let duration = TimeDelta::try_seconds(self.seconds)
                    .and_then(|seconds| seconds.checked_add(&nanos))
                    .ok_or_else(|| ErrorValue::overflow("duration"))?;
                Value::Duration(duration)
            }
            Wrapper::Timestamp => {
                let at = DateTime::<Utc>::from_timestamp(self.seconds, 0)
                    .and_then(|t| t.checked_add_signed(nanos))
                    .ok_or_else(|| ErrorValue::overflow("timestamp"))?;
                Value::Timestamp(at)
            }
            wrapper => match self.value {
                Some(value) => value,
                None => match wrapper {
                    Wrapper::Bool => Value::Bool(false),
                    Wrapper::Int32 | Wrapper::Int64 => Value::Int(0),
                    Wrapper::UInt32 | Wrapper::UInt64 => Value::Uint(0),
                    Wrapper::Float | Wrapper::Double => Value::Double(0.0),
                    Wrapper::String => Value::string(""),
                    _ => Value::bytes(b""),
                },
            },
        })
    }
}
