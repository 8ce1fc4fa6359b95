//! Error types for Transit encoding.
//!
//! Every error aborts the write in flight. The writer never falls back to a
//! "best effort" encoding, and buffered output is discarded when a write fails.
//!
//! ## Error Categories
//!
//! - **Handler resolution**: no handler for a value's type ([`Error::NoHandler`])
//! - **Handler contract**: a handler produced an absent tag or an unusable
//!   representation ([`Error::InvalidHandler`])
//! - **Encoding**: a value cannot occupy the position it was written to, such as a
//!   compound value used as a map key ([`Error::Unencodable`])
//! - **Registry construction**: cyclic type hierarchies ([`Error::CyclicHierarchy`])
//! - **Limits and I/O**: nesting depth guard and sink failures
//!
//! ## Examples
//!
//! ```rust
//! use serde_transit::{value_to_string, Error, TransitMap, Value};
//!
//! let mut map = TransitMap::new();
//! map.insert(Value::from("k"), Value::from(1));
//! let mut outer = TransitMap::new();
//! outer.insert(Value::List(vec![Value::from(1)]), Value::Map(map));
//!
//! // Maps with compound keys are written as `cmap`, so this succeeds.
//! assert!(value_to_string(&Value::Map(outer)).is_ok());
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while encoding Transit.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error while flushing to the underlying writer
    #[error("IO error: {0}")]
    Io(String),

    /// No handler is registered for the value's type or any of its ancestors
    #[error("no handler registered for type `{type_key}` or any of its ancestors")]
    NoHandler { type_key: String },

    /// A handler violated its contract
    #[error("invalid handler for type `{type_key}`: {msg}")]
    InvalidHandler { type_key: String, msg: String },

    /// The value cannot be encoded in the position it appears in
    #[error("cannot encode {value} (tag `{tag}`, rep {rep}): {reason}")]
    Unencodable {
        tag: String,
        rep: String,
        value: String,
        reason: String,
    },

    /// The registered type hierarchy loops back on itself
    #[error("cyclic type hierarchy through `{0}`")]
    CyclicHierarchy(String),

    /// The value graph nests deeper than the configured limit
    #[error("maximum nesting depth of {limit} exceeded")]
    DepthExceeded { limit: usize },

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a missing-handler error for the given type key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_transit::Error;
    ///
    /// let err = Error::no_handler("point");
    /// assert!(err.to_string().contains("`point`"));
    /// ```
    pub fn no_handler(type_key: &str) -> Self {
        Error::NoHandler {
            type_key: type_key.to_string(),
        }
    }

    /// Creates a handler contract violation error.
    pub fn invalid_handler(type_key: &str, msg: &str) -> Self {
        Error::InvalidHandler {
            type_key: type_key.to_string(),
            msg: msg.to_string(),
        }
    }

    /// Creates an encoding error carrying the offending tag, representation and value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_transit::Error;
    ///
    /// let err = Error::unencodable("list", "[1]", "List([1])", "cannot be used as a map key");
    /// assert!(err.to_string().contains("map key"));
    /// ```
    pub fn unencodable<R, V>(tag: &str, rep: R, value: V, reason: &str) -> Self
    where
        R: fmt::Debug,
        V: fmt::Debug,
    {
        Error::Unencodable {
            tag: tag.to_string(),
            rep: format!("{:?}", rep),
            value: format!("{:?}", value),
            reason: reason.to_string(),
        }
    }

    /// Creates a cyclic hierarchy error naming a type on the cycle.
    pub fn cyclic_hierarchy(type_key: &str) -> Self {
        Error::CyclicHierarchy(type_key.to_string())
    }

    /// Creates a depth-limit error.
    pub fn depth_exceeded(limit: usize) -> Self {
        Error::DepthExceeded { limit }
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_transit::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for sink failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(&err.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
