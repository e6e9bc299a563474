//! Property values and dotted-path access into event payloads.
//!
//! An event payload is an open JSON object so that fields the remote service
//! adds later survive a read/modify/write cycle untouched. Writes go in as
//! [`Property`] values and reads come out as [`FieldValue`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::EventTimestamp;

/// Request options and list query parameters, keyed by API parameter name.
pub type Params = BTreeMap<String, Value>;

/// The `{title, url}` pair describing where an event was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    pub title: String,
    pub url: String,
}

impl EventSource {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A value written to an event field.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// Stored as-is at the resolved path.
    Value(Value),
    /// A date or date-time; required by the four date fields.
    Time(EventTimestamp),
    /// A source pair; required by `source`.
    Source(EventSource),
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<i64> for Property {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl From<EventTimestamp> for Property {
    fn from(value: EventTimestamp) -> Self {
        Self::Time(value)
    }
}

impl From<DateTime<Tz>> for Property {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Time(value.into())
    }
}

impl From<DateTime<Utc>> for Property {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value.into())
    }
}

impl From<DateTime<FixedOffset>> for Property {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Time(value.into())
    }
}

impl From<NaiveDate> for Property {
    fn from(value: NaiveDate) -> Self {
        Self::Time(value.into())
    }
}

impl From<EventSource> for Property {
    fn from(value: EventSource) -> Self {
        Self::Source(value)
    }
}

/// The result of reading an event field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// The field is unset (or explicitly null).
    Empty,
    /// A raw payload value.
    Value(Value),
    /// A calendar date (`start.date`, `end.date`).
    Date(NaiveDate),
    /// An instant with its stored offset (`start.dateTime`, `end.dateTime`).
    DateTime(DateTime<FixedOffset>),
    /// The `source` pair.
    Source(EventSource),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::DateTime(at) => Some(*at),
            _ => None,
        }
    }

    pub fn as_source(&self) -> Option<&EventSource> {
        match self {
            Self::Source(source) => Some(source),
            _ => None,
        }
    }

    /// Ordering key used when sorting listed events.
    ///
    /// Dates compare at midnight UTC; anything that is not a date sorts
    /// before every dated value.
    pub fn sort_key(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(date) => Some(date.and_time(NaiveTime::MIN).and_utc()),
            Self::DateTime(at) => Some(at.with_timezone(&Utc)),
            _ => None,
        }
    }
}

/// An ordered set of `(field alias, value)` pairs used to build or patch events.
///
/// Re-inserting a key replaces its value in place. Two bags are equal when
/// they hold the same keys with equal values, in any order.
#[derive(Debug, Clone, Default)]
pub struct PropertyBag {
    entries: Vec<(String, Property)>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a property.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Property>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds or replaces a property.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Property>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for PropertyBag {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyBag
where
    K: Into<String>,
    V: Into<Property>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (key, value) in iter {
            bag.insert(key, value);
        }
        bag
    }
}

/// Reads the value at a dotted path.
pub fn get_path<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Writes a value at a dotted path.
///
/// Missing intermediate objects are created; intermediate values that are
/// not objects are replaced by empty objects.
pub fn set_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                set_path(child, rest, value);
            }
        }
    }
}
