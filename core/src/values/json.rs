//! Conversion to and from JSON.
//!
//! [`Value::convert_to_json`] produces the JSON form used when a value is
//! handed to a `google.protobuf.Value`-shaped consumer. [`Value::from_json`]
//! goes the other way, wrapping JSON arrays and objects in adapters that
//! convert elements lazily on access instead of copying the document.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STD;

use super::{
    ErrorValue, ListValue, MapValue, Value, ValueIter, list::VecList, time,
};

pub type Json = serde_json::Value;

/// Integers beyond this magnitude lose precision as JSON numbers and are
/// emitted as strings instead.
const MAX_SAFE_JSON_INTEGER: i64 = (1 << 53) - 1;

impl Value {
    pub fn convert_to_json(&self) -> Result<Json, ErrorValue> {
        match self {
            Value::Null => Ok(Json::Null),
            Value::Bool(b) => Ok(Json::Bool(*b)),
            Value::Int(i) => Ok(if i.unsigned_abs() <= MAX_SAFE_JSON_INTEGER as u64 {
                Json::from(*i)
            } else {
                Json::String(i.to_string())
            }),
            Value::Uint(u) => Ok(if *u <= MAX_SAFE_JSON_INTEGER as u64 {
                Json::from(*u)
            } else {
                Json::String(u.to_string())
            }),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(Json::Number)
                .ok_or_else(|| ErrorValue::type_conversion(d, "google.protobuf.Value")),
            Value::String(s) => Ok(Json::String(s.to_string())),
            Value::Bytes(b) => Ok(Json::String(BASE64_STD.encode(b.as_slice()))),
            Value::Duration(d) => Ok(Json::String(time::format_duration(*d))),
            Value::Timestamp(t) => Ok(Json::String(time::format_timestamp(t))),
            Value::List(l) => l.convert_to_json(),
            Value::Map(m) => m.convert_to_json(),
            Value::Struct(s) => s.convert_to_json(),
            Value::Type(_) | Value::Error(_) | Value::Unknown(_) => Err(
                ErrorValue::type_conversion(self.kind(), "google.protobuf.Value"),
            ),
        }
    }

    /// Wraps a JSON document. Numbers become doubles.
    pub fn from_json(json: Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::string(s),
            Json::Array(items) => Value::List(Arc::new(JsonList {
                items: items.into(),
            })),
            Json::Object(entries) => Value::Map(Arc::new(JsonMap {
                entries: Arc::new(entries),
            })),
        }
    }
}

/// A JSON array viewed as a list.
pub struct JsonList {
    items: Arc<[Json]>,
}

impl ListValue for JsonList {
    fn size(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> Result<Value, ErrorValue> {
        self.items
            .get(index)
            .map(|item| Value::from_json(item.clone()))
            .ok_or_else(|| ErrorValue::index_out_of_range(index as i64, self.items.len()))
    }

    fn convert_to_json(&self) -> Result<Json, ErrorValue> {
        Ok(Json::Array(self.items.to_vec()))
    }
}

/// A JSON object viewed as a map with string keys.
pub struct JsonMap {
    entries: Arc<serde_json::Map<String, Json>>,
}

impl MapValue for JsonMap {
    fn size(&self) -> usize {
        self.entries.len()
    }

    fn find(&self, key: &Value) -> Option<Value> {
        let key = key.as_str()?;
        self.entries.get(key).map(|v| Value::from_json(v.clone()))
    }

    fn list_keys(&self) -> Arc<dyn ListValue> {
        Arc::new(VecList::new(self.entries.keys().map(|k| Value::string(k.as_str())).collect()))
    }

    fn for_each(&self, callback: &mut dyn FnMut(&Value, &Value) -> bool) {
        for (key, value) in self.entries.iter() {
            if !callback(&Value::string(key.as_str()), &Value::from_json(value.clone())) {
                break;
            }
        }
    }

    fn iter(&self) -> ValueIter<'_> {
        Box::new(self.entries.keys().map(|k| Value::string(k.as_str())))
    }

    fn convert_to_json(&self) -> Result<Json, ErrorValue> {
        Ok(Json::Object(serde_json::Map::clone(&self.entries)))
    }
}
