//! Map values, map keys and map builders.
//!
//! Keys are restricted to the bool, int, uint and string kinds. Maps built by
//! evaluation are specialized on the declared key type: a `map(int, V)`
//! literal stores native `i64` keys, while a dynamically typed map stores
//! [`MapKey`]s. Both answer lookups made with a plain [`Value`], so they are
//! interchangeable at the value level.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashMap;
use indexmap::{IndexMap, map::Entry};

use super::{ErrorValue, Json, ListValue, Type, Value, ValueIter, list::VecList};

/// A key-eligible value.
///
/// The derived ordering (`Bool < Int < Uint < String`, then by payload) is
/// only used for deterministic printing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(EcoString),
}

impl MapKey {
    pub fn from_value(value: &Value) -> Result<MapKey, ErrorValue> {
        match value {
            Value::Bool(b) => Ok(MapKey::Bool(*b)),
            Value::Int(i) => Ok(MapKey::Int(*i)),
            Value::Uint(u) => Ok(MapKey::Uint(*u)),
            Value::String(s) => Ok(MapKey::String(s.clone())),
            Value::Error(e) => Err(e.clone()),
            other => Err(ErrorValue::invalid_map_key_type(other.kind())),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(i) => Value::Int(*i),
            MapKey::Uint(u) => Value::Uint(*u),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Fails with `InvalidMapKeyType` unless `key` is of a key-eligible kind.
pub fn check_map_key(key: &Value) -> Result<(), ErrorValue> {
    if key.kind().is_map_key() {
        Ok(())
    } else {
        Err(ErrorValue::invalid_map_key_type(key.kind()))
    }
}

/// An unordered collection of unique keys with associated values.
pub trait MapValue: Send + Sync {
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Looks up `key`. Never fails: keys of the wrong kind are simply absent.
    fn find(&self, key: &Value) -> Option<Value>;

    /// Fails with `NoSuchKey` when absent and `InvalidMapKeyType` for keys
    /// that can never be present.
    fn get(&self, key: &Value) -> Result<Value, ErrorValue> {
        check_map_key(key)?;
        self.find(key)
            .ok_or_else(|| ErrorValue::no_such_key(key))
    }

    fn has(&self, key: &Value) -> bool {
        self.find(key).is_some()
    }

    /// Snapshot of the keys, in unspecified order.
    fn list_keys(&self) -> Arc<dyn ListValue>;

    /// Visits entries until the callback returns `false`.
    fn for_each(&self, callback: &mut dyn FnMut(&Value, &Value) -> bool);

    /// Iterates over the keys.
    fn iter(&self) -> ValueIter<'_>;

    fn convert_to_json(&self) -> Result<Json, ErrorValue> {
        let mut object = serde_json::Map::with_capacity(self.size());
        let mut result = Ok(());
        self.for_each(&mut |key, value| {
            let Value::String(key) = key else {
                result = Err(ErrorValue::type_conversion(
                    format_args!("map({}, ...)", key.kind()),
                    "google.protobuf.Struct",
                ));
                return false;
            };
            match value.convert_to_json() {
                Ok(json) => {
                    object.insert(key.to_string(), json);
                    true
                }
                Err(e) => {
                    result = Err(e);
                    false
                }
            }
        });
        result.map(|()| Json::Object(object))
    }
}

/// Native key representation used by the specialized maps.
pub trait NativeKey: Clone + Eq + Hash + Send + Sync + 'static {
    /// `None` when `value` is not of this key's kind.
    fn from_value(value: &Value) -> Option<Self>;
    fn to_value(&self) -> Value;
}

impl NativeKey for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl NativeKey for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
}

impl NativeKey for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Uint(u) => Some(*u),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Uint(*self)
    }
}

impl NativeKey for EcoString {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl NativeKey for MapKey {
    fn from_value(value: &Value) -> Option<Self> {
        MapKey::from_value(value).ok()
    }

    fn to_value(&self) -> Value {
        MapKey::to_value(self)
    }
}

/// Hash map keyed by a native key representation.
///
/// Keys iterate in insertion order.
pub struct HashMapValue<K: NativeKey> {
    entries: IndexMap<K, Value>,
}

/// A map whose keys may be of any key-eligible kind.
pub type DynamicMap = HashMapValue<MapKey>;

impl<K: NativeKey> Default for HashMapValue<K> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<K: NativeKey> MapValue for HashMapValue<K> {
    fn size(&self) -> usize {
        self.entries.len()
    }

    fn find(&self, key: &Value) -> Option<Value> {
        let key = K::from_value(key)?;
        self.entries.get(&key).cloned()
    }

    fn list_keys(&self) -> Arc<dyn ListValue> {
        Arc::new(VecList::new(self.entries.keys().map(K::to_value).collect()))
    }

    fn for_each(&self, callback: &mut dyn FnMut(&Value, &Value) -> bool) {
        for (key, value) in &self.entries {
            if !callback(&key.to_value(), value) {
                break;
            }
        }
    }

    fn iter(&self) -> ValueIter<'_> {
        Box::new(self.entries.keys().map(K::to_value))
    }
}

/// Single-use accumulator for map construction.
pub trait MapValueBuilder {
    /// Rejects error keys or values (returning the carried error), keys of a
    /// kind that cannot be used in maps, and keys already present.
    fn put(&mut self, key: Value, value: Value) -> Result<(), ErrorValue>;
    fn size(&self) -> usize;
    fn build(self: Box<Self>) -> Value;
}

pub struct MapBuilder<K: NativeKey> {
    key_type: Type,
    value_type: Type,
    entries: IndexMap<K, Value>,
}

impl<K: NativeKey> MapBuilder<K> {
    pub fn new(key_type: Type, value_type: Type) -> Self {
        Self {
            key_type,
            value_type,
            entries: IndexMap::new(),
        }
    }

    pub fn put(&mut self, key: Value, value: Value) -> Result<(), ErrorValue> {
        if let Value::Error(error) = key {
            return Err(error);
        }
        if let Value::Error(error) = value {
            return Err(error);
        }
        check_map_key(&key)?;
        let native = K::from_value(&key)
            .ok_or_else(|| ErrorValue::type_conversion(key.kind(), &self.key_type))?;
        if !self.value_type.accepts(&value) {
            return Err(ErrorValue::type_conversion(value.kind(), &self.value_type));
        }
        match self.entries.entry(native) {
            Entry::Occupied(_) => Err(ErrorValue::duplicate_key(&key)),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    pub fn build(self) -> Value {
        Value::Map(Arc::new(HashMapValue {
            entries: self.entries,
        }))
    }
}

impl<K: NativeKey> MapValueBuilder for MapBuilder<K> {
    fn put(&mut self, key: Value, value: Value) -> Result<(), ErrorValue> {
        MapBuilder::put(self, key, value)
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn build(self: Box<Self>) -> Value {
        MapBuilder::build(*self)
    }
}

/// Picks the builder specialized for the declared key type. Anything but a
/// concrete key kind falls back to the dynamic builder.
pub fn new_map_builder(key_type: &Type, value_type: &Type) -> Box<dyn MapValueBuilder> {
    let value_type = value_type.clone();
    match key_type {
        Type::Bool => Box::new(MapBuilder::<bool>::new(Type::Bool, value_type)),
        Type::Int => Box::new(MapBuilder::<i64>::new(Type::Int, value_type)),
        Type::Uint => Box::new(MapBuilder::<u64>::new(Type::Uint, value_type)),
        Type::String => Box::new(MapBuilder::<EcoString>::new(Type::String, value_type)),
        _ => Box::new(MapBuilder::<MapKey>::new(Type::Dyn, value_type)),
    }
}

/// Representation-agnostic map equality.
///
/// Snapshots `a` into a scratch table, then probes it with every entry of
/// `b`. Every scratch entry must be consumed for the maps to be equal.
pub(crate) fn map_equal(a: &Arc<dyn MapValue>, b: &Arc<dyn MapValue>) -> Result<bool, ErrorValue> {
    if std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)) {
        return Ok(true);
    }
    if a.size() != b.size() {
        return Ok(false);
    }

    let mut scratch: HashMap<MapKey, Value> = HashMap::with_capacity(a.size());
    a.for_each(&mut |key, value| {
        if let Ok(key) = MapKey::from_value(key) {
            scratch.insert(key, value.clone());
        }
        true
    });

    let mut result = Ok(true);
    b.for_each(&mut |key, value| {
        let probe = MapKey::from_value(key)
            .ok()
            .and_then(|key| scratch.remove(&key));
        let Some(expected) = probe else {
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
