//! Runtime values.
//!
//! [`Value`] is a closed sum type over fifteen kinds. Lists, maps and
//! structs are held behind the [`ListValue`], [`MapValue`] and
//! [`StructValue`] traits so that values built during evaluation and values
//! adapted from host data (such as [`Value::from_json`]) are interchangeable.
//!
//! # Example
//!
//! ```ignore
//! use predica_core::values::{MapValue, Value};
//!
//! let map = Value::map([(Value::string("a"), Value::Int(1))])?;
//! assert_eq!(map.as_map().unwrap().get(&Value::string("a"))?, Value::Int(1));
//! ```

mod error;
mod json;
mod kind;
pub mod list;
pub mod map;
mod provider;
mod structs;
pub mod time;
mod types;
mod unknown;
mod value;

pub use error::{ErrorCode, ErrorValue};
pub use json::{Json, JsonList, JsonMap};
pub use kind::ValueKind;
pub use list::{ListBuilder, ListValue, ListValueBuilder, ValueIter, VecList};
pub use map::{
    DynamicMap, HashMapValue, MapBuilder, MapKey, MapValue, MapValueBuilder, NativeKey,
    check_map_key, new_map_builder,
};
pub use provider::{ProviderError, StructBuilderFactory, TypeProvider};
pub use structs::{
    FieldDescriptor, FieldStruct, StructBuilder, StructType, StructValue, StructValueBuilder,
    default_value,
};
pub use types::Type;
pub use unknown::{Attribute, AttributePattern, AttributeTrail, PatternSegment, UnknownSet};
pub use value::Value;
