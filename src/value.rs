//! Dynamic value representation for Transit data.
//!
//! [`Value`] is the graph the marshaling engine walks. Each variant carries a
//! [`TypeKey`] naming its runtime type, and the handler registered for that key decides
//! how the value is tagged and represented on the wire.
//!
//! ## Usage Patterns
//!
//! ### Creating Values
//!
//! ```rust
//! use serde_transit::{transit, Value};
//!
//! let null = Value::Null;
//! let number = Value::from(42);
//! let keyword = Value::keyword("status");
//!
//! let obj = transit!({
//!     "name": "Alice",
//!     "age": 30
//! });
//! assert!(obj.is_map());
//! ```
//!
//! ### Custom Types
//!
//! Types the crate knows nothing about travel as [`Extension`]s. They are encoded by
//! whatever handler is registered for their [`TypeKey`]:
//!
//! ```rust
//! use serde_transit::{TypeKey, Value};
//!
//! #[derive(Debug)]
//! struct Point { x: i64, y: i64 }
//!
//! let value = Value::ext(TypeKey::from_static("point"), Point { x: 1, y: 2 });
//! assert_eq!(value.type_key().as_str(), "point");
//! ```

use crate::TransitMap;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;
use uuid::Uuid;

/// The name of a value's runtime type, used as the handler registry key.
///
/// # Examples
///
/// ```rust
/// use serde_transit::TypeKey;
///
/// let key = TypeKey::from_static("point");
/// assert_eq!(key, TypeKey::new("point"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    /// Creates a key from a static name without allocating.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        TypeKey(Cow::Borrowed(name))
    }

    /// Creates a key from any string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        TypeKey(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeKey {
    fn from(name: &'static str) -> Self {
        TypeKey::from_static(name)
    }
}

/// Type keys of the builtin value kinds.
pub mod keys {
    use super::TypeKey;

    pub static NULL: TypeKey = TypeKey::from_static("nil");
    pub static BOOL: TypeKey = TypeKey::from_static("bool");
    pub static INTEGER: TypeKey = TypeKey::from_static("int");
    pub static BIGINT: TypeKey = TypeKey::from_static("bigint");
    pub static FLOAT: TypeKey = TypeKey::from_static("float");
    pub static STRING: TypeKey = TypeKey::from_static("string");
    pub static KEYWORD: TypeKey = TypeKey::from_static("keyword");
    pub static SYMBOL: TypeKey = TypeKey::from_static("symbol");
    pub static CHAR: TypeKey = TypeKey::from_static("char");
    pub static UUID: TypeKey = TypeKey::from_static("uuid");
    pub static URI: TypeKey = TypeKey::from_static("uri");
    pub static BYTES: TypeKey = TypeKey::from_static("bytes");
    pub static TIMESTAMP: TypeKey = TypeKey::from_static("timestamp");
    pub static ARRAY: TypeKey = TypeKey::from_static("array");
    pub static LIST: TypeKey = TypeKey::from_static("list");
    pub static SET: TypeKey = TypeKey::from_static("set");
    pub static MAP: TypeKey = TypeKey::from_static("map");
    pub static TAGGED: TypeKey = TypeKey::from_static("tagged");
}

/// A value paired with an explicit tag.
///
/// The writer uses `TaggedValue::quote` to wrap top-level scalars; callers can also
/// build tagged values directly to emit tags the crate has no type for.
///
/// # Examples
///
/// ```rust
/// use serde_transit::{value_to_string, TaggedValue, Value};
///
/// let point = TaggedValue::new("point", Value::Array(vec![Value::from(1), Value::from(2)]));
/// assert_eq!(value_to_string(&Value::Tagged(point)).unwrap(), r#"["~#point",[1,2]]"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaggedValue {
    pub tag: String,
    pub rep: Box<Value>,
}

impl TaggedValue {
    pub fn new(tag: impl Into<String>, rep: Value) -> Self {
        TaggedValue {
            tag: tag.into(),
            rep: Box::new(rep),
        }
    }

    /// Wraps a value in the quote tag (`'`).
    pub fn quote(rep: Value) -> Self {
        TaggedValue::new(crate::escape::QUOTE, rep)
    }
}

/// A caller-defined value, encoded by the handler registered for its key.
#[derive(Clone)]
pub struct Extension {
    key: TypeKey,
    data: Arc<dyn Any + Send + Sync>,
}

impl Extension {
    pub fn new<T: Any + Send + Sync>(key: TypeKey, data: T) -> Self {
        Extension {
            key,
            data: Arc::new(data),
        }
    }

    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        &self.key
    }

    /// Returns the wrapped data if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension({})", self.key)
    }
}

// Extensions compare by identity: two extensions are equal only if they share data.
impl PartialEq for Extension {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for Extension {}

impl Hash for Extension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        (Arc::as_ptr(&self.data) as *const () as usize).hash(state);
    }
}

/// A dynamically-typed Transit value.
///
/// # Examples
///
/// ```rust
/// use serde_transit::Value;
///
/// let text = Value::from("hello");
/// assert!(text.is_string());
/// assert_eq!(text.type_key().as_str(), "string");
/// ```
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    BigInt(BigInt),
    Float(f64),
    String(String),
    Keyword(String),
    Symbol(String),
    Char(char),
    Uuid(Uuid),
    Uri(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(TransitMap),
    Tagged(TaggedValue),
    Ext(Extension),
}

impl Value {
    /// Returns the key the handler registry resolves this value by.
    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        match self {
            Value::Null => &keys::NULL,
            Value::Bool(_) => &keys::BOOL,
            Value::Integer(_) => &keys::INTEGER,
            Value::BigInt(_) => &keys::BIGINT,
            Value::Float(_) => &keys::FLOAT,
            Value::String(_) => &keys::STRING,
            Value::Keyword(_) => &keys::KEYWORD,
            Value::Symbol(_) => &keys::SYMBOL,
            Value::Char(_) => &keys::CHAR,
            Value::Uuid(_) => &keys::UUID,
            Value::Uri(_) => &keys::URI,
            Value::Bytes(_) => &keys::BYTES,
            Value::Timestamp(_) => &keys::TIMESTAMP,
            Value::Array(_) => &keys::ARRAY,
            Value::List(_) => &keys::LIST,
            Value::Set(_) => &keys::SET,
            Value::Map(_) => &keys::MAP,
            Value::Tagged(_) => &keys::TAGGED,
            Value::Ext(ext) => ext.type_key(),
        }
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Value::Keyword(name.into())
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn ext<T: Any + Send + Sync>(key: TypeKey, data: T) -> Self {
        Value::Ext(Extension::new(key, data))
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// If the value is a boolean, returns it. Otherwise returns `None`.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is a string, returns a reference to it. Otherwise returns `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_transit::Value;
    ///
    /// assert_eq!(Value::from("hello").as_str(), Some("hello"));
    /// assert_eq!(Value::from(42).as_str(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&TransitMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// If the value is an extension holding a `T`, returns it.
    #[must_use]
    pub fn as_ext<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Ext(ext) => ext.downcast_ref::<T>(),
            _ => None,
        }
    }
}

// Floats compare by bit pattern so that `Value` can key a map.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Uri(a), Value::Uri(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Tagged(a), Value::Tagged(b)) => a == b,
            (Value::Ext(a), Value::Ext(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::BigInt(n) => n.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) | Value::Keyword(s) | Value::Symbol(s) | Value::Uri(s) => {
                s.hash(state)
            }
            Value::Char(c) => c.hash(state),
            Value::Uuid(u) => u.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Timestamp(t) => t.hash(state),
            Value::Array(items) | Value::List(items) | Value::Set(items) => items.hash(state),
            // map equality ignores order
            Value::Map(map) => map.len().hash(state),
            Value::Tagged(tv) => tv.hash(state),
            Value::Ext(ext) => ext.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::BigInt(BigInt::from(value)),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Char(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::BigInt(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<TransitMap> for Value {
    fn from(value: TransitMap) -> Self {
        Value::Map(value)
    }
}

impl From<TaggedValue> for Value {
    fn from(value: TaggedValue) -> Self {
        Value::Tagged(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_type_keys() {
        assert_eq!(Value::Null.type_key(), &keys::NULL);
        assert_eq!(Value::from(1).type_key().as_str(), "int");
        assert_eq!(Value::keyword("a").type_key().as_str(), "keyword");
        assert_eq!(Value::List(vec![]).type_key().as_str(), "list");
        assert_eq!(
            Value::ext(TypeKey::new("point"), (1, 2)).type_key(),
            &TypeKey::from_static("point")
        );
    }

    #[test]
    fn test_float_equality_by_bits() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(hash_of(&Value::Float(1.5)), hash_of(&Value::Float(1.5)));
    }

    #[test]
    fn test_extension_identity() {
        let a = Extension::new(TypeKey::new("point"), 1u8);
        let b = Extension::new(TypeKey::new("point"), 1u8);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u8>(), Some(&1));
        assert_eq!(a.downcast_ref::<u16>(), None);
    }

    #[test]
    fn test_from_u64_overflow() {
        assert_eq!(Value::from(7u64), Value::Integer(7));
        assert_eq!(
            Value::from(u64::MAX),
            Value::BigInt(BigInt::from(u64::MAX))
        );
    }

    #[test]
    fn test_distinct_kinds_not_equal() {
        assert_ne!(Value::from("a"), Value::keyword("a"));
        assert_ne!(Value::Array(vec![]), Value::List(vec![]));
    }
}
