//! Struct values: named records described by a [`StructType`] schema.

use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashMap;

use super::{ErrorValue, Json, Type, Value};

/// A record with named, numbered fields.
pub trait StructValue: Send + Sync {
    fn type_name(&self) -> &str;

    /// Fails with `NoSuchField` if the schema has no such field.
    fn has_field_by_name(&self, name: &str) -> Result<bool, ErrorValue>;
    fn has_field_by_number(&self, number: i64) -> Result<bool, ErrorValue>;

    /// Unset fields read as the zero value of their declared type.
    fn get_field_by_name(&self, name: &str) -> Result<Value, ErrorValue>;
    fn get_field_by_number(&self, number: i64) -> Result<Value, ErrorValue>;

    /// Visits set fields until the callback returns `false`.
    fn for_each_field(&self, callback: &mut dyn FnMut(&str, &Value) -> bool);

    /// Number of set fields.
    fn field_count(&self) -> usize;

    fn is_zero_value(&self) -> bool {
        self.field_count() == 0
    }

    fn convert_to_json(&self) -> Result<Json, ErrorValue> {
        let mut object = serde_json::Map::new();
        let mut result = Ok(());
        self.for_each_field(&mut |name, value| match value.convert_to_json() {
            Ok(json) => {
                object.insert(name.to_string(), json);
                true
            }
            Err(e) => {
                result = Err(e);
                false
            }
        });
        result.map(|()| Json::Object(object))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: EcoString,
    pub number: i64,
    pub ty: Type,
}

/// Schema of a struct type, registered with the
/// [`TypeProvider`](super::TypeProvider).
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    name: EcoString,
    fields: Vec<FieldDescriptor>,
}

impl StructType {
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<EcoString>, number: i64, ty: Type) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            number,
            ty,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    fn index_by_name(&self, name: &str) -> Result<usize, ErrorValue> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| ErrorValue::no_such_field(name))
    }

    fn index_by_number(&self, number: i64) -> Result<usize, ErrorValue> {
        self.fields
            .iter()
            .position(|f| f.number == number)
            .ok_or_else(|| ErrorValue::no_such_field(&number.to_string()))
    }
}

/// Zero value for a declared field type.
pub fn default_value(ty: &Type) -> Value {
    match ty {
        Type::Bool => Value::Bool(false),
        Type::Int => Value::Int(0),
        Type::Uint => Value::Uint(0),
        Type::Double => Value::Double(0.0),
        Type::String => Value::string(""),
        Type::Bytes => Value::bytes(b""),
        Type::Duration => Value::Duration(chrono::TimeDelta::zero()),
        Type::Timestamp => Value::Timestamp(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH),
        Type::List(_) => Value::list([]),
        Type::Map(_, _) => Value::Map(Arc::new(super::DynamicMap::default())),
        Type::Dyn | Type::Null | Type::Struct(_) | Type::Type | Type::Error => Value::Null,
    }
}

/// The struct representation produced by evaluation.
pub struct FieldStruct {
    schema: Arc<StructType>,
    values: Vec<Option<Value>>,
}

impl StructValue for FieldStruct {
    fn type_name(&self) -> &str {
        self.schema.name()
    }

    fn has_field_by_name(&self, name: &str) -> Result<bool, ErrorValue> {
        let index = self.schema.index_by_name(name)?;
        Ok(self.values[index].is_some())
    }

    fn has_field_by_number(&self, number: i64) -> Result<bool, ErrorValue> {
        let index = self.schema.index_by_number(number)?;
        Ok(self.values[index].is_some())
    }

    fn get_field_by_name(&self, name: &str) -> Result<Value, ErrorValue> {
        let index = self.schema.index_by_name(name)?;
        Ok(self.field_at(index))
    }

    fn get_field_by_number(&self, number: i64) -> Result<Value, ErrorValue> {
        let index = self.schema.index_by_number(number)?;
        Ok(self.field_at(index))
    }

    fn for_each_field(&self, callback: &mut dyn FnMut(&str, &Value) -> bool) {
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            if let Some(value) = value {
                if !callback(&field.name, value) {
                    break;
                }
            }
        }
    }

    fn field_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

impl FieldStruct {
    fn field_at(&self, index: usize) -> Value {
        match &self.values[index] {
            Some(value) => value.clone(),
            None => default_value(&self.schema.fields()[index].ty),
        }
    }
}

/// Single-use accumulator for struct construction.
pub trait StructValueBuilder {
    fn set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), ErrorValue>;
    fn set_field_by_number(&mut self, number: i64, value: Value) -> Result<(), ErrorValue>;
    fn build(self: Box<Self>) -> Result<Value, ErrorValue>;
}

pub struct StructBuilder {
    schema: Arc<StructType>,
    values: Vec<Option<Value>>,
}

impl StructBuilder {
    pub fn new(schema: Arc<StructType>) -> Self {
        let values = vec![None; schema.fields().len()];
        Self { schema, values }
    }

    fn set(&mut self, index: usize, value: Value) -> Result<(), ErrorValue> {
        if let Value::Error(error) = value {
            return Err(error);
        }
        let field = &self.schema.fields()[index];
        if !field.ty.accepts(&value) {
            return Err(ErrorValue::type_conversion(value.kind(), &field.ty));
        }
        self.values[index] = Some(value);
        Ok(())
    }
}

impl StructValueBuilder for StructBuilder {
    fn set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), ErrorValue> {
        let index = self.schema.index_by_name(name)?;
        self.set(index, value)
    }

    fn set_field_by_number(&mut self, number: i64, value: Value) -> Result<(), ErrorValue> {
        let index = self.schema.index_by_number(number)?;
        self.set(index, value)
    }

    fn build(self: Box<Self>) -> Result<Value, ErrorValue> {
        Ok(Value::Struct(Arc::new(FieldStruct {
            schema: self.schema,
            values: self.values,
        })))
    }
}

/// Struct equality: same type name, same set fields, equal field values.
pub(crate) fn struct_equal(
    a: &Arc<dyn StructValue>,
    b: &Arc<dyn StructValue>,
) -> Result<bool, ErrorValue> {
    if std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)) {
        return Ok(true);
    }
    if a.type_name() != b.type_name() || a.field_count() != b.field_count() {
        return Ok(false);
    }

    let mut scratch: HashMap<EcoString, Value> = HashMap::with_capacity(a.field_count());
    a.for_each_field(&mut |name, value| {
        scratch.insert(EcoString::from(name), value.clone());
        true
    });

    let mut result = Ok(true);
    b.for_each_field(&mut |name, value| {
        let Some(expected) = scratch.remove(name) else {
            result = Ok(false);
            return false;
        };
        match expected.equals(value) {
            Ok(true) => true,
            other => {
                result = other;
                false
            }
        }
    });

    match result {
        Ok(true) => Ok(scratch.is_empty()),
        other => other,
    }
}
