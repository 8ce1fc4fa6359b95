//! Ordered map type for Transit maps.
//!
//! [`TransitMap`] wraps an [`IndexMap`] keyed by [`Value`], so keys can be any Transit
//! value, not just strings. Entries are written in insertion order; the encoder never
//! reorders them.
//!
//! ## Examples
//!
//! ```rust
//! use serde_transit::{TransitMap, Value};
//!
//! let mut map = TransitMap::new();
//! map.insert(Value::keyword("name"), Value::from("Alice"));
//! map.insert(Value::from(1), Value::from("one"));
//!
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.get(&Value::keyword("name")).and_then(|v| v.as_str()), Some("Alice"));
//! ```

use crate::Value;
use indexmap::IndexMap;

/// An insertion-ordered map of Transit values.
///
/// # Examples
///
/// ```rust
/// use serde_transit::{TransitMap, Value};
///
/// let mut map = TransitMap::new();
/// map.insert(Value::from("first"), Value::from(1));
/// map.insert(Value::from("second"), Value::from(2));
///
/// let keys: Vec<_> = map.keys().filter_map(|k| k.as_str()).collect();
/// assert_eq!(keys, vec!["first", "second"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitMap(IndexMap<Value, Value>);

impl TransitMap {
    #[must_use]
    pub fn new() -> Self {
        TransitMap(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        TransitMap(IndexMap::with_capacity(capacity))
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contained this key, the old value is returned and the entry
    /// keeps its original position.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, Value, Value> {
        self.0.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, Value, Value> {
        self.0.values()
    }

    /// Returns an iterator over the entries of the map, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, Value> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a TransitMap {
    type Item = (&'a Value, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for TransitMap {
    type Item = (Value, Value);
    type IntoIter = indexmap::map::IntoIter<Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(Value, Value)> for TransitMap {
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> Self {
        TransitMap(IndexMap::from_iter(iter))
    }
}
