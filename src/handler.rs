//! Write handlers.
//!
//! A [`Handler`] tells the marshaling engine how to encode one kind of value:
//!
//! - `tag`: the Transit tag. A one-character tag is scalar-eligible and can be packed
//!   into a prefixed string (`"~:name"`); longer tags always produce a tagged array
//!   (`["~#set", [...]]`).
//! - `rep`: the representation that is marshaled in the value's place.
//! - `string_rep`: a string form for positions that require a string (map keys and
//!   prefer-strings mode), if the value has one.
//!
//! Handlers that need to look at other handlers, such as the map handler deciding
//! between `map` and `cmap`, implement [`HandlerAware`] and are registered through
//! [`Overrides::aware_handler`](crate::Overrides::aware_handler). Each table they are
//! registered in binds its own instance to itself, so one registered handler can serve
//! any number of tables.
//!
//! ## Custom Handlers
//!
//! ```rust
//! use serde_transit::{value_to_string_with_table, Handler, HandlerRegistry, Overrides,
//!     Result, TransitOptions, TypeKey, Value};
//! use std::borrow::Cow;
//! use std::sync::Arc;
//!
//! struct Point { x: i64, y: i64 }
//!
//! struct PointHandler;
//!
//! impl Handler for PointHandler {
//!     fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
//!         Some("point")
//!     }
//!
//!     fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
//!         let p = value.as_ext::<Point>().ok_or_else(|| serde_transit::Error::custom("not a point"))?;
//!         Ok(Cow::Owned(Value::Array(vec![Value::from(p.x), Value::from(p.y)])))
//!     }
//! }
//!
//! let overrides = Overrides::new().handler(TypeKey::from_static("point"), Arc::new(PointHandler));
//! let table = HandlerRegistry::global().table(&overrides).unwrap();
//! let value = Value::ext(TypeKey::from_static("point"), Point { x: 1, y: 2 });
//!
//! let transit = value_to_string_with_table(&value, table, TransitOptions::new()).unwrap();
//! assert_eq!(transit, r#"["~#point",[1,2]]"#);
//! ```

use crate::registry::{HandlerTable, Registration};
use crate::value::keys;
use crate::{Error, Result, TransitMap, TypeKey, Value};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::borrow::Cow;
use std::sync::{Arc, Weak};

/// Encoding strategy for one kind of value.
pub trait Handler: Send + Sync {
    /// The value's tag, or `None` if the handler cannot tag it.
    fn tag<'a>(&'a self, value: &'a Value) -> Option<&'a str>;

    /// The representation marshaled in the value's place.
    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>>;

    /// A string form of the value, used for map keys and in prefer-strings mode.
    fn string_rep<'a>(&self, _value: &'a Value) -> Option<Cow<'a, str>> {
        None
    }
}

/// A handler that needs the handler table it is registered in.
pub trait HandlerAware: Handler {
    /// Returns the handler the table at `table` stores under this registration.
    ///
    /// Called once per table, while the table is being built, so `table` does not
    /// upgrade yet. The returned handler must only upgrade it while encoding. A bind
    /// may look up other tables but must not ask the registry for the one being built.
    fn bind(&self, table: Weak<HandlerTable>) -> Arc<dyn Handler>;
}

/// Returns `true` for tags that are exactly one character long.
#[inline]
#[must_use]
pub fn is_scalar_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some() && chars.next().is_none()
}

fn mismatch(expected: &TypeKey, value: &Value) -> Error {
    Error::invalid_handler(
        value.type_key().as_str(),
        &format!("handler for `{}` cannot represent {:?}", expected, value),
    )
}

/// `nil`, tag `_`.
#[derive(Debug, Default)]
pub struct NullHandler;

impl Handler for NullHandler {
    fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
        Some("_")
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        Ok(Cow::Borrowed(value))
    }
}

/// Booleans, tag `?`.
#[derive(Debug, Default)]
pub struct BoolHandler;

impl Handler for BoolHandler {
    fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
        Some("?")
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::Bool(_) => Ok(Cow::Borrowed(value)),
            _ => Err(mismatch(&keys::BOOL, value)),
        }
    }

    fn string_rep<'a>(&self, value: &'a Value) -> Option<Cow<'a, str>> {
        value
            .as_bool()
            .map(|b| Cow::Borrowed(if b { "t" } else { "f" }))
    }
}

/// 64-bit integers, tag `i`.
#[derive(Debug, Default)]
pub struct IntegerHandler;

impl Handler for IntegerHandler {
    fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
        Some("i")
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::Integer(_) => Ok(Cow::Borrowed(value)),
            _ => Err(mismatch(&keys::INTEGER, value)),
        }
    }

    fn string_rep<'a>(&self, value: &'a Value) -> Option<Cow<'a, str>> {
        value.as_i64().map(|i| Cow::Owned(i.to_string()))
    }
}

/// Arbitrary precision integers, tag `n`.
#[derive(Debug, Default)]
pub struct BigIntHandler;

impl Handler for BigIntHandler {
    fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
        Some("n")
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::BigInt(n) => Ok(Cow::Owned(Value::String(n.to_string()))),
            _ => Err(mismatch(&keys::BIGINT, value)),
        }
    }

    fn string_rep<'a>(&self, value: &'a Value) -> Option<Cow<'a, str>> {
        match value {
            Value::BigInt(n) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }
}

/// Floats: tag `d`, or `z` for NaN and the infinities.
#[derive(Debug, Default)]
pub struct FloatHandler;

impl FloatHandler {
    fn special(f: f64) -> Option<&'static str> {
        if f.is_nan() {
            Some("NaN")
        } else if f == f64::INFINITY {
            Some("INF")
        } else if f == f64::NEG_INFINITY {
            Some("-INF")
        } else {
            None
        }
    }
}

impl Handler for FloatHandler {
    fn tag<'a>(&'a self, value: &'a Value) -> Option<&'a str> {
        match value {
            Value::Float(f) if Self::special(*f).is_some() => Some("z"),
            _ => Some("d"),
        }
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::Float(f) => Ok(match Self::special(*f) {
                Some(name) => Cow::Owned(Value::String(name.to_string())),
                None => Cow::Borrowed(value),
            }),
            _ => Err(mismatch(&keys::FLOAT, value)),
        }
    }

    fn string_rep<'a>(&self, value: &'a Value) -> Option<Cow<'a, str>> {
        match value {
            Value::Float(f) => Some(match Self::special(*f) {
                Some(name) => Cow::Borrowed(name),
                None => Cow::Owned(ryu::Buffer::new().format_finite(*f).to_string()),
            }),
            _ => None,
        }
    }
}

/// Plain strings, tag `s`.
#[derive(Debug, Default)]
pub struct StringHandler;

impl Handler for StringHandler {
    fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
        Some("s")
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::String(_) => Ok(Cow::Borrowed(value)),
            _ => Err(mismatch(&keys::STRING, value)),
        }
    }

    fn string_rep<'a>(&self, value: &'a Value) -> Option<Cow<'a, str>> {
        value.as_str().map(Cow::Borrowed)
    }
}

/// Values whose representation is a string under a one-character tag: keywords,
/// symbols, URIs, characters, UUIDs and byte strings.
#[derive(Debug)]
pub struct TextHandler {
    tag: &'static str,
}

impl TextHandler {
    pub const KEYWORD: TextHandler = TextHandler { tag: ":" };
    pub const SYMBOL: TextHandler = TextHandler { tag: "$" };
    pub const URI: TextHandler = TextHandler { tag: "r" };
    pub const CHAR: TextHandler = TextHandler { tag: "c" };
    pub const UUID: TextHandler = TextHandler { tag: "u" };
    pub const BYTES: TextHandler = TextHandler { tag: "b" };

    fn text<'a>(value: &'a Value) -> Option<Cow<'a, str>> {
        match value {
            Value::Keyword(s) | Value::Symbol(s) | Value::Uri(s) => Some(Cow::Borrowed(s)),
            Value::Char(c) => Some(Cow::Owned(c.to_string())),
            Value::Uuid(u) => Some(Cow::Owned(u.hyphenated().to_string())),
            Value::Bytes(b) => Some(Cow::Owned(STANDARD.encode(b))),
            _ => None,
        }
    }
}

impl Handler for TextHandler {
    fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
        Some(self.tag)
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        Self::text(value)
            .map(|s| Cow::Owned(Value::String(s.into_owned())))
            .ok_or_else(|| {
                Error::invalid_handler(
                    value.type_key().as_str(),
                    &format!("handler for tag `{}` cannot represent {:?}", self.tag, value),
                )
            })
    }

    fn string_rep<'a>(&self, value: &'a Value) -> Option<Cow<'a, str>> {
        Self::text(value)
    }
}

/// Timestamps as milliseconds since the epoch, tag `m`.
#[derive(Debug, Default)]
pub struct TimestampHandler;

impl Handler for TimestampHandler {
    fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
        Some("m")
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::Timestamp(t) => Ok(Cow::Owned(Value::Integer(t.timestamp_millis()))),
            _ => Err(mismatch(&keys::TIMESTAMP, value)),
        }
    }

    fn string_rep<'a>(&self, value: &'a Value) -> Option<Cow<'a, str>> {
        match value {
            Value::Timestamp(t) => Some(Cow::Owned(t.timestamp_millis().to_string())),
            _ => None,
        }
    }
}

/// Arrays, tag `array`.
#[derive(Debug, Default)]
pub struct ArrayHandler;

impl Handler for ArrayHandler {
    fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
        Some("array")
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::Array(_) => Ok(Cow::Borrowed(value)),
            _ => Err(mismatch(&keys::ARRAY, value)),
        }
    }
}

/// Lists and sets: a multi-character tag over an array representation.
#[derive(Debug)]
pub struct SequenceHandler {
    tag: &'static str,
}

impl SequenceHandler {
    pub const LIST: SequenceHandler = SequenceHandler { tag: "list" };
    pub const SET: SequenceHandler = SequenceHandler { tag: "set" };
}

impl Handler for SequenceHandler {
    fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
        Some(self.tag)
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::List(items) | Value::Set(items) => Ok(Cow::Owned(Value::Array(items.clone()))),
            _ => Err(Error::invalid_handler(
                value.type_key().as_str(),
                &format!("handler for tag `{}` cannot represent {:?}", self.tag, value),
            )),
        }
    }
}

/// Maps. Tagged `map` when every key has a one-character tag, otherwise `cmap` with
/// the entries flattened into one array.
#[derive(Debug, Default)]
pub struct MapHandler {
    table: Weak<HandlerTable>,
}

impl MapHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Without a bound table every key is treated as stringable.
    fn stringable_keys(&self, map: &TransitMap) -> bool {
        let Some(table) = self.table.upgrade() else {
            return true;
        };
        map.keys().all(|key| {
            table
                .resolve(key)
                .ok()
                .and_then(|handler| handler.tag(key))
                .map_or(false, is_scalar_tag)
        })
    }
}

impl Handler for MapHandler {
    fn tag<'a>(&'a self, value: &'a Value) -> Option<&'a str> {
        match value {
            Value::Map(map) if !self.stringable_keys(map) => Some("cmap"),
            _ => Some("map"),
        }
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::Map(map) if self.stringable_keys(map) => Ok(Cow::Borrowed(value)),
            Value::Map(map) => {
                let mut flat = Vec::with_capacity(map.len() * 2);
                for (k, v) in map {
                    flat.push(k.clone());
                    flat.push(v.clone());
                }
                Ok(Cow::Owned(Value::Array(flat)))
            }
            _ => Err(mismatch(&keys::MAP, value)),
        }
    }
}

impl HandlerAware for MapHandler {
    fn bind(&self, table: Weak<HandlerTable>) -> Arc<dyn Handler> {
        Arc::new(MapHandler { table })
    }
}

/// Explicitly tagged values; tag and rep come from the [`TaggedValue`](crate::TaggedValue).
#[derive(Debug, Default)]
pub struct TaggedValueHandler;

impl Handler for TaggedValueHandler {
    fn tag<'a>(&'a self, value: &'a Value) -> Option<&'a str> {
        match value {
            Value::Tagged(tv) => Some(&tv.tag),
            _ => None,
        }
    }

    fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
        match value {
            Value::Tagged(tv) => Ok(Cow::Borrowed(&*tv.rep)),
            _ => Err(mismatch(&keys::TAGGED, value)),
        }
    }
}

/// A fresh set of default handlers, one per builtin type key.
pub(crate) fn default_registrations() -> Vec<(TypeKey, Registration)> {
    vec![
        (keys::NULL.clone(), Registration::plain(Arc::new(NullHandler))),
        (keys::BOOL.clone(), Registration::plain(Arc::new(BoolHandler))),
        (keys::INTEGER.clone(), Registration::plain(Arc::new(IntegerHandler))),
        (keys::BIGINT.clone(), Registration::plain(Arc::new(BigIntHandler))),
        (keys::FLOAT.clone(), Registration::plain(Arc::new(FloatHandler))),
        (keys::STRING.clone(), Registration::plain(Arc::new(StringHandler))),
        (keys::KEYWORD.clone(), Registration::plain(Arc::new(TextHandler::KEYWORD))),
        (keys::SYMBOL.clone(), Registration::plain(Arc::new(TextHandler::SYMBOL))),
        (keys::URI.clone(), Registration::plain(Arc::new(TextHandler::URI))),
        (keys::CHAR.clone(), Registration::plain(Arc::new(TextHandler::CHAR))),
        (keys::UUID.clone(), Registration::plain(Arc::new(TextHandler::UUID))),
        (keys::BYTES.clone(), Registration::plain(Arc::new(TextHandler::BYTES))),
        (keys::TIMESTAMP.clone(), Registration::plain(Arc::new(TimestampHandler))),
        (keys::ARRAY.clone(), Registration::plain(Arc::new(ArrayHandler))),
        (keys::LIST.clone(), Registration::plain(Arc::new(SequenceHandler::LIST))),
        (keys::SET.clone(), Registration::plain(Arc::new(SequenceHandler::SET))),
        (keys::MAP.clone(), Registration::aware(Arc::new(MapHandler::new()))),
        (keys::TAGGED.clone(), Registration::plain(Arc::new(TaggedValueHandler))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_scalar_tag_length() {
        assert!(is_scalar_tag("i"));
        assert!(is_scalar_tag("é"));
        assert!(!is_scalar_tag(""));
        assert!(!is_scalar_tag("set"));
    }

    #[test]
    fn test_float_tags() {
        let h = FloatHandler;
        assert_eq!(h.tag(&Value::Float(1.5)), Some("d"));
        assert_eq!(h.tag(&Value::Float(f64::NAN)), Some("z"));
        assert_eq!(
            h.rep(&Value::Float(f64::NEG_INFINITY)).unwrap().into_owned(),
            Value::from("-INF")
        );
        assert_eq!(h.string_rep(&Value::Float(2.0)).as_deref(), Some("2.0"));
    }

    #[test]
    fn test_timestamp_rep_is_millis() {
        let t = Utc.timestamp_millis_opt(1_482_000_000_123).unwrap();
        let h = TimestampHandler;
        let value = Value::Timestamp(t);
        assert_eq!(h.rep(&value).unwrap().into_owned(), Value::Integer(1_482_000_000_123));
        assert_eq!(h.string_rep(&value).as_deref(), Some("1482000000123"));
    }

    #[test]
    fn test_text_reps() {
        let uuid = Uuid::from_u128(0x5a2cbea3_e8c6_428b_b525_21239370dd55);
        assert_eq!(
            TextHandler::UUID.string_rep(&Value::Uuid(uuid)).as_deref(),
            Some("5a2cbea3-e8c6-428b-b525-21239370dd55")
        );
        assert_eq!(
            TextHandler::BYTES.string_rep(&Value::Bytes(b"hello".to_vec())).as_deref(),
            Some("aGVsbG8=")
        );
        assert_eq!(
            TextHandler::KEYWORD.rep(&Value::keyword("a")).unwrap().into_owned(),
            Value::from("a")
        );
    }

    #[test]
    fn test_wrong_variant_is_invalid_handler() {
        assert!(matches!(
            IntegerHandler.rep(&Value::from("x")),
            Err(Error::InvalidHandler { .. })
        ));
        assert!(TaggedValueHandler.tag(&Value::Null).is_none());
    }

    #[test]
    fn test_detached_map_handler_reports_map() {
        let mut map = TransitMap::new();
        map.insert(Value::Array(vec![]), Value::Null);
        assert_eq!(MapHandler::new().tag(&Value::Map(map.clone())), Some("map"));

        let bound = MapHandler::new().bind(Weak::new());
        assert_eq!(bound.tag(&Value::Map(map)), Some("map"));
    }
}
