//! Navigable wrapper over arbitrary JSON objects.
//!
//! Nested objects (and arrays of objects) are wrapped into [`Record`]s the
//! first time a field is read and the wrapped form is cached on the field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// A field value as seen through [`Record::get`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Primitive, null, or an array that does not hold objects.
    Value(Value),
    /// A nested object.
    Record(Record),
    /// A non-empty array whose elements are all objects. An array mixing
    /// objects with other values stays `Field::Value`.
    Records(Vec<Record>),
}

impl Field {
    fn convert(raw: &Value) -> Self {
        match raw {
            Value::Object(map) => Field::Record(Record::from(map.clone())),
            Value::Array(items) if is_object_array(items) => Field::Records(
                items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .map(Record::from)
                    .collect(),
            ),
            other => Field::Value(other.clone()),
        }
    }

    /// Converts a single list element: objects become records, anything else
    /// is kept as a plain value.
    pub fn from_element(value: Value) -> Self {
        match value {
            Value::Object(map) => Field::Record(Record::from(map)),
            other => Field::Value(other),
        }
    }

    /// Returns the nested record, if this field holds one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Field::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the list of records, if this field holds one.
    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            Field::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Returns the plain value, if this field is not a record or record list.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Flattens back to plain JSON.
    pub fn to_value(&self) -> Value {
        match self {
            Field::Value(value) => value.clone(),
            Field::Record(record) => record.to_value(),
            Field::Records(records) => Value::Array(records.iter().map(Record::to_value).collect()),
        }
    }
}

fn is_object_array(items: &[Value]) -> bool {
    items.first().is_some_and(Value::is_object) && items.iter().all(Value::is_object)
}

#[derive(Debug, Clone)]
struct Slot {
    raw: Value,
    converted: OnceLock<Field>,
}

impl Slot {
    fn new(raw: Value) -> Self {
        Self { raw, converted: OnceLock::new() }
    }
}

/// A JSON object with typed accessors and memoized nested conversion.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: BTreeMap<String, Slot>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value, returning `None` if it is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from(map)),
            _ => None,
        }
    }

    /// Reads a field, converting nested objects into records on first access.
    pub fn get(&self, field: &str) -> Option<&Field> {
        self.fields.get(field).map(|slot| slot.converted.get_or_init(|| Field::convert(&slot.raw)))
    }

    /// Reads a field's raw JSON without conversion.
    pub fn raw(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).map(|slot| &slot.raw)
    }

    /// Mutable access to a field's raw JSON. Drops any cached conversion.
    pub(crate) fn raw_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field).map(|slot| {
            slot.converted = OnceLock::new();
            &mut slot.raw
        })
    }

    /// Stores a value verbatim.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), Slot::new(value.into()));
    }

    /// Removes a field, returning its raw value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field).map(|slot| slot.raw)
    }

    pub fn get_record(&self, field: &str) -> Option<&Record> {
        self.get(field).and_then(Field::as_record)
    }

    pub fn get_records(&self, field: &str) -> Option<&[Record]> {
        self.get(field).and_then(Field::as_records)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.raw(field).and_then(Value::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.raw(field).and_then(Value::as_i64)
    }

    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.raw(field).and_then(Value::as_u64)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.raw(field).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.raw(field).and_then(Value::as_bool)
    }

    /// Returns true if the field is absent or explicitly null.
    pub fn is_null(&self, field: &str) -> bool {
        self.raw(field).map_or(true, Value::is_null)
    }

    /// Names of the fields currently stored.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Runs a speculative lookup, returning `default` if any step fails.
    ///
    /// ```
    /// # use tcg_client::Record;
    /// # let record = Record::new();
    /// let name = record.try_or(String::new(), |r| {
    ///     Some(r.get_records("results")?.first()?.get_str("name")?.to_string())
    /// });
    /// assert!(name.is_empty());
    /// ```
    pub fn try_or<T>(&self, default: T, lookup: impl FnOnce(&Self) -> Option<T>) -> T {
        lookup(self).unwrap_or(default)
    }

    /// Flattens back into a plain JSON map.
    pub fn to_map(&self) -> Map<String, Value> {
        self.fields.iter().map(|(key, slot)| (key.clone(), slot.raw.clone())).collect()
    }

    /// Flattens back into a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields.into_iter().map(|(key, slot)| (key, slot.raw)).collect()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self { fields: map.into_iter().map(|(key, value)| (key, Slot::new(value))).collect() }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(key, slot)| other.fields.get(key).is_some_and(|o| o.raw == slot.raw))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, slot) in &self.fields {
            map.serialize_entry(key, &slot.raw)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
