//! List values and the list builder.

use std::sync::Arc;

use super::{ErrorValue, Json, Type, Value};

/// Iterator handed out by list and map values.
///
/// Forward-only and not restartable: ask the container for a new one.
pub type ValueIter<'a> = Box<dyn Iterator<Item = Value> + 'a>;

/// An ordered, 0-indexed sequence of values.
pub trait ListValue: Send + Sync {
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Fails with `IndexOutOfRange` when `index >= size()`.
    fn get(&self, index: usize) -> Result<Value, ErrorValue>;

    fn iter(&self) -> ValueIter<'_> {
        Box::new((0..self.size()).map(move |i| self.get(i).unwrap_or_else(Value::Error)))
    }

    fn contains(&self, value: &Value) -> Result<bool, ErrorValue> {
        for element in self.iter() {
            if element.equals(value)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn convert_to_json(&self) -> Result<Json, ErrorValue> {
        self.iter()
            .map(|element| element.convert_to_json())
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array)
    }
}

/// The list representation produced by evaluation.
pub struct VecList {
    elements: Vec<Value>,
}

impl VecList {
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements }
    }
}

impl ListValue for VecList {
    fn size(&self) -> usize {
        self.elements.len()
    }

    fn get(&self, index: usize) -> Result<Value, ErrorValue> {
        self.elements
            .get(index)
            .cloned()
            .ok_or_else(|| ErrorValue::index_out_of_range(index as i64, self.elements.len()))
    }

    fn iter(&self) -> ValueIter<'_> {
        Box::new(self.elements.iter().cloned())
    }
}

pub(crate) fn list_equal(a: &Arc<dyn ListValue>, b: &Arc<dyn ListValue>) -> Result<bool, ErrorValue> {
    if std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)) {
        return Ok(true);
    }
    if a.size() != b.size() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b.iter()) {
        if !x.equals(&y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Single-use accumulator for list construction.
pub trait ListValueBuilder {
    /// Rejects error values (returning the carried error) and values that
    /// do not fit the declared element type.
    fn add(&mut self, value: Value) -> Result<(), ErrorValue>;
    fn size(&self) -> usize;
    fn reserve(&mut self, additional: usize);
    fn build(self: Box<Self>) -> Value;
}

pub struct ListBuilder {
    element_type: Type,
    elements: Vec<Value>,
}

impl ListBuilder {
    pub fn new(element_type: Type) -> Self {
        Self {
            element_type,
            elements: Vec::new(),
        }
    }

    pub fn add(&mut self, value: Value) -> Result<(), ErrorValue> {
        if let Value::Error(error) = value {
            return Err(error);
        }
        if !self.element_type.accepts(&value) {
            return Err(ErrorValue::type_conversion(value.kind(), &self.element_type));
        }
        self.elements.push(value);
        Ok(())
    }

    pub fn build(self) -> Value {
        Value::List(Arc::new(VecList::new(self.elements)))
    }
}

impl ListValueBuilder for ListBuilder {
    fn add(&mut self, value: Value) -> Result<(), ErrorValue> {
        ListBuilder::add(self, value)
    }

    fn size(&self) -> usize {
        self.elements.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.elements.reserve(additional);
    }

    fn build(self: Box<Self>) -> Value {
        ListBuilder::build(*self)
    }
}
