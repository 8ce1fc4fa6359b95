//! # serde_transit
//!
//! A Serde-compatible encoder for the [Transit](https://github.com/cognitect/transit-format)
//! data format, written as JSON.
//!
//! ## What is Transit?
//!
//! Transit carries values richer than JSON (keywords, symbols, sets, lists, timestamps,
//! UUIDs, big integers, maps with non-string keys and user-defined tagged types) over a
//! JSON carrier. Each value is encoded through a handler that reports a short tag and a
//! representation:
//!
//! - scalars with one-character tags become prefixed strings such as `"~:name"` or
//!   `"~m1700000000000"`
//! - everything else becomes a tagged array such as `["~#set",[1,2]]`
//! - repeated map keys and tag strings are replaced with cache codes (`"^0"`, `"^1"`)
//! - a document is always an array or a map, so a top-level scalar is wrapped as
//!   `["~#'",value]`
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::Serialize;
//! use serde_transit::to_string;
//!
//! #[derive(Serialize)]
//! struct User {
//!     id: u32,
//!     name: String,
//! }
//!
//! let users = vec![
//!     User { id: 1, name: "Alice".into() },
//!     User { id: 2, name: "Bob".into() },
//! ];
//! let json = to_string(&users).unwrap();
//! // the second "name" key is a cache code
//! assert_eq!(json, r#"[["^ ","id",1,"name","Alice"],["^ ","id",2,"^0","Bob"]]"#);
//! ```
//!
//! ### Transit Values
//!
//! [`Value`] covers the Transit ground and extension types:
//!
//! ```rust
//! use serde_transit::{value_to_string, TransitMap, Value};
//!
//! let mut map = TransitMap::new();
//! map.insert(Value::keyword("tags"), Value::Set(vec![Value::symbol("a")]));
//! let json = value_to_string(&Value::Map(map)).unwrap();
//! assert_eq!(json, r#"["^ ","~:tags",["~#set",["~$a"]]]"#);
//! ```
//!
//! ### Custom Handlers
//!
//! Handlers are looked up by [`TypeKey`] in a [`HandlerTable`]. Tables come from a
//! [`HandlerRegistry`], which merges caller [`Overrides`] over the defaults and keeps
//! one table per distinct override set. See [`handler`] for a worked example.
//!
//! ## Errors
//!
//! Encoding is all-or-nothing: a value with no handler, a handler breaking its contract,
//! or a value that cannot appear where it was written fails the whole write and leaves
//! no partial output behind. See [`Error`].
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events for table builds and cache resets. It never
//! installs a subscriber.

pub mod cache;
pub mod error;
pub mod escape;
pub mod handler;
pub mod macros;
pub mod map;
pub mod marshal;
pub mod options;
pub mod registry;
pub mod ser;
pub mod sink;
pub mod value;

pub use error::{Error, Result};
pub use handler::{Handler, HandlerAware};
pub use map::TransitMap;
pub use marshal::{Marshaler, Writer};
pub use options::TransitOptions;
pub use registry::{HandlerRegistry, HandlerTable, Overrides};
pub use ser::{to_value, ValueSerializer};
pub use sink::{JsonSink, Sink};
pub use value::{Extension, TaggedValue, TypeKey, Value};

use serde::Serialize;
use std::io;
use std::sync::Arc;

/// Serialize any `T: Serialize` to a Transit JSON string.
///
/// # Examples
///
/// ```rust
/// use serde_transit::to_string;
///
/// assert_eq!(to_string(&vec![1, 2, 3]).unwrap(), "[1,2,3]");
/// assert_eq!(to_string("hi").unwrap(), r#"["~#'","hi"]"#);
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be encoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    to_string_with_options(value, TransitOptions::default())
}

/// Serialize any `T: Serialize` to a Transit JSON string with custom options.
///
/// # Errors
///
/// Returns an error if the value cannot be encoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options<T>(value: &T, options: TransitOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    value_to_string_with_options(&to_value(value)?, options)
}

/// Serialize any `T: Serialize` to Transit JSON bytes.
///
/// # Errors
///
/// Returns an error if the value cannot be encoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut out = Vec::with_capacity(128);
    to_writer(&mut out, value)?;
    Ok(out)
}

/// Serialize any `T: Serialize` to a writer as Transit JSON.
///
/// Nothing is written if encoding fails.
///
/// # Examples
///
/// ```rust
/// use serde_transit::to_writer;
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &(1, "two")).unwrap();
/// assert_eq!(buffer, br#"[1,"two"]"#);
/// ```
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    to_writer_with_options(writer, value, TransitOptions::default())
}

/// Serialize any `T: Serialize` to a writer as Transit JSON with custom options.
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, T>(writer: W, value: &T, options: TransitOptions) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let value = to_value(value)?;
    let table = HandlerRegistry::global().default_table()?;
    Writer::new(JsonSink::new(writer), table, options).write(&value)
}

/// Encode a [`Value`] as a Transit JSON string.
///
/// # Errors
///
/// Returns an error if the value cannot be encoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn value_to_string(value: &Value) -> Result<String> {
    value_to_string_with_options(value, TransitOptions::default())
}

/// Encode a [`Value`] as a Transit JSON string with custom options.
///
/// # Errors
///
/// Returns an error if the value cannot be encoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn value_to_string_with_options(value: &Value, options: TransitOptions) -> Result<String> {
    let table = HandlerRegistry::global().default_table()?;
    value_to_string_with_table(value, table, options)
}

/// Encode a [`Value`] as a Transit JSON string using the handlers in `table`.
///
/// # Errors
///
/// Returns an error if the value cannot be encoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn value_to_string_with_table(
    value: &Value,
    table: Arc<HandlerTable>,
    options: TransitOptions,
) -> Result<String> {
    let mut writer = Writer::new(JsonSink::new(Vec::with_capacity(128)), table, options);
    writer.write(value)?;
    String::from_utf8(writer.into_inner().into_inner()).map_err(Error::custom)
}

/// Encode a [`Value`] to a writer as Transit JSON.
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn value_to_writer<W: io::Write>(writer: W, value: &Value) -> Result<()> {
    Writer::with_defaults(JsonSink::new(writer))?.write(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_struct_becomes_map() {
        let json = to_string(&Point { x: 1, y: 2 }).unwrap();
        assert_eq!(json, r#"["^ ","x",1,"y",2]"#);
    }

    #[test]
    fn test_top_level_scalars_are_quoted() {
        assert_eq!(to_string(&()).unwrap(), r#"["~#'",null]"#);
        assert_eq!(to_string(&1.5).unwrap(), r#"["~#'",1.5]"#);
        assert_eq!(to_string("~x").unwrap(), r#"["~#'","~~x"]"#);
    }

    #[test]
    fn test_timestamp_prefers_strings() {
        let t = Utc.timestamp_millis_opt(1_500_000_000_123).unwrap();
        let value = Value::Array(vec![Value::Timestamp(t)]);
        assert_eq!(value_to_string(&value).unwrap(), r#"["~m1500000000123"]"#);

        let options = TransitOptions::new().with_prefer_strings(false);
        assert_eq!(
            value_to_string_with_options(&value, options).unwrap(),
            r#"[["~#m",1500000000123]]"#
        );
    }

    #[test]
    fn test_to_vec_matches_to_string() {
        let data = vec!["alpha", "beta"];
        assert_eq!(to_vec(&data).unwrap(), to_string(&data).unwrap().into_bytes());
    }

    #[test]
    fn test_failed_write_leaves_writer_untouched() {
        let mut out = Vec::new();
        let value = Value::Array(vec![Value::from(1), Value::Float(f64::INFINITY)]);
        // non-finite floats are tagged, so this succeeds
        value_to_writer(&mut out, &value).unwrap();
        assert_eq!(out, br#"[1,"~zINF"]"#);

        let mut out = Vec::new();
        let bad = Value::Array(vec![Value::from(1), Value::ext(TypeKey::new("unknown"), ())]);
        assert!(value_to_writer(&mut out, &bad).is_err());
        assert!(out.is_empty());
    }
}
