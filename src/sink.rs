//! Value sinks.
//!
//! The marshaling engine reduces every value graph to a stream of primitive events:
//! scalars (with a map-key hint), array boundaries and map boundaries. A [`Sink`]
//! turns that stream into output.
//!
//! - [`JsonSink`] writes Transit JSON. Maps are written as arrays led by the `"^ "`
//!   marker, so map keys do not have to be JSON strings.
//! - [`Recorder`] keeps the events, which is handy for testing handlers and for
//!   adapting the stream to other formats.
//!
//! Sinks buffer until [`Sink::flush`]. When a write fails the writer calls
//! [`Sink::discard`], so a failed write leaves nothing behind.

use crate::escape::MAP_AS_ARRAY;
use crate::{Error, Result};
use std::io::{self, Write};

/// A primitive value handed to a sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
}

/// The primitive event stream consumer.
pub trait Sink {
    fn push_scalar(&mut self, value: Scalar<'_>, as_map_key: bool) -> Result<()>;

    fn push_array_start(&mut self, len: usize) -> Result<()>;

    fn push_array_end(&mut self) -> Result<()>;

    fn push_map_start(&mut self, len: usize) -> Result<()>;

    fn push_map_end(&mut self) -> Result<()>;

    /// Commits everything pushed since the last flush.
    fn flush(&mut self) -> Result<()>;

    /// Drops everything pushed since the last flush.
    fn discard(&mut self) {}
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn push_scalar(&mut self, value: Scalar<'_>, as_map_key: bool) -> Result<()> {
        (**self).push_scalar(value, as_map_key)
    }

    fn push_array_start(&mut self, len: usize) -> Result<()> {
        (**self).push_array_start(len)
    }

    fn push_array_end(&mut self) -> Result<()> {
        (**self).push_array_end()
    }

    fn push_map_start(&mut self, len: usize) -> Result<()> {
        (**self).push_map_start(len)
    }

    fn push_map_end(&mut self) -> Result<()> {
        (**self).push_map_end()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn discard(&mut self) {
        (**self).discard()
    }
}

/// Writes Transit JSON to an [`io::Write`].
///
/// # Examples
///
/// ```rust
/// use serde_transit::sink::{JsonSink, Scalar, Sink};
///
/// let mut sink = JsonSink::new(Vec::new());
/// sink.push_map_start(1).unwrap();
/// sink.push_scalar(Scalar::Str("a"), true).unwrap();
/// sink.push_scalar(Scalar::Int(1), false).unwrap();
/// sink.push_map_end().unwrap();
/// sink.flush().unwrap();
///
/// assert_eq!(sink.into_inner(), br#"["^ ","a",1]"#);
/// ```
pub struct JsonSink<W: io::Write> {
    writer: W,
    buf: Vec<u8>,
    // one entry per open array or map: true until the first element is written
    first: Vec<bool>,
}

impl<W: io::Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        JsonSink {
            writer,
            buf: Vec::with_capacity(256),
            first: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn separate(&mut self) {
        if let Some(first) = self.first.last_mut() {
            if *first {
                *first = false;
            } else {
                self.buf.push(b',');
            }
        }
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        serde_json::to_writer(&mut self.buf, s).map_err(Error::custom)
    }
}

impl<W: io::Write> Sink for JsonSink<W> {
    fn push_scalar(&mut self, value: Scalar<'_>, _as_map_key: bool) -> Result<()> {
        self.separate();
        match value {
            Scalar::Null => self.buf.extend_from_slice(b"null"),
            Scalar::Bool(true) => self.buf.extend_from_slice(b"true"),
            Scalar::Bool(false) => self.buf.extend_from_slice(b"false"),
            Scalar::Int(i) => write!(self.buf, "{}", i)?,
            Scalar::Float(f) if f.is_finite() => {
                let mut buffer = ryu::Buffer::new();
                self.buf.extend_from_slice(buffer.format_finite(f).as_bytes());
            }
            Scalar::Float(f) => {
                return Err(Error::custom(format!("JSON cannot represent the float {}", f)))
            }
            Scalar::Str(s) => self.write_str(s)?,
        }
        Ok(())
    }

    fn push_array_start(&mut self, _len: usize) -> Result<()> {
        self.separate();
        self.buf.push(b'[');
        self.first.push(true);
        Ok(())
    }

    fn push_array_end(&mut self) -> Result<()> {
        self.first.pop();
        self.buf.push(b']');
        Ok(())
    }

    fn push_map_start(&mut self, _len: usize) -> Result<()> {
        self.separate();
        self.buf.push(b'[');
        self.write_str(MAP_AS_ARRAY)?;
        self.first.push(false);
        Ok(())
    }

    fn push_map_end(&mut self) -> Result<()> {
        self.push_array_end()
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.write_all(&self.buf)?;
        self.writer.flush()?;
        self.buf.clear();
        Ok(())
    }

    fn discard(&mut self) {
        self.buf.clear();
        self.first.clear();
    }
}

/// An owned scalar, as kept by a [`Recorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<Scalar<'_>> for Datum {
    fn from(value: Scalar<'_>) -> Self {
        match value {
            Scalar::Null => Datum::Null,
            Scalar::Bool(b) => Datum::Bool(b),
            Scalar::Int(i) => Datum::Int(i),
            Scalar::Float(f) => Datum::Float(f),
            Scalar::Str(s) => Datum::Str(s.to_string()),
        }
    }
}

/// One primitive event. The `bool` on [`Event::Value`] is the map-key hint.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Value(Datum, bool),
    ArrayStart(usize),
    ArrayEnd,
    MapStart(usize),
    MapEnd,
    Flush,
}

impl Event {
    /// A string in value position.
    pub fn string(s: &str) -> Self {
        Event::Value(Datum::Str(s.to_string()), false)
    }

    /// A string in map-key position.
    pub fn key(s: &str) -> Self {
        Event::Value(Datum::Str(s.to_string()), true)
    }

    pub fn int(i: i64) -> Self {
        Event::Value(Datum::Int(i), false)
    }
}

/// A sink that records the event stream.
///
/// # Examples
///
/// ```rust
/// use serde_transit::sink::{Event, Recorder};
/// use serde_transit::{Value, Writer};
///
/// let mut writer = Writer::with_defaults(Recorder::new()).unwrap();
/// writer.write(&Value::from(7)).unwrap();
///
/// assert_eq!(
///     writer.into_inner().events(),
///     &[
///         Event::ArrayStart(2),
///         Event::string("~#'"),
///         Event::int(7),
///         Event::ArrayEnd,
///         Event::Flush,
///     ]
/// );
/// ```
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    events: Vec<Event>,
    committed: usize,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl Sink for Recorder {
    fn push_scalar(&mut self, value: Scalar<'_>, as_map_key: bool) -> Result<()> {
        self.events.push(Event::Value(value.into(), as_map_key));
        Ok(())
    }

    fn push_array_start(&mut self, len: usize) -> Result<()> {
        self.events.push(Event::ArrayStart(len));
        Ok(())
    }

    fn push_array_end(&mut self) -> Result<()> {
        self.events.push(Event::ArrayEnd);
        Ok(())
    }

    fn push_map_start(&mut self, len: usize) -> Result<()> {
        self.events.push(Event::MapStart(len));
        Ok(())
    }

    fn push_map_end(&mut self) -> Result<()> {
        self.events.push(Event::MapEnd);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.events.push(Event::Flush);
        self.committed = self.events.len();
        Ok(())
    }

    fn discard(&mut self) {
        self.events.truncate(self.committed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(f: impl FnOnce(&mut JsonSink<Vec<u8>>) -> Result<()>) -> String {
        let mut sink = JsonSink::new(Vec::new());
        f(&mut sink).unwrap();
        sink.flush().unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_nested_separators() {
        let out = json(|s| {
            s.push_array_start(3)?;
            s.push_scalar(Scalar::Int(1), false)?;
            s.push_array_start(0)?;
            s.push_array_end()?;
            s.push_map_start(1)?;
            s.push_scalar(Scalar::Null, true)?;
            s.push_scalar(Scalar::Float(1.5), false)?;
            s.push_map_end()?;
            s.push_array_end()
        });
        assert_eq!(out, r#"[1,[],["^ ",null,1.5]]"#);
    }

    #[test]
    fn test_empty_map_is_marker_only() {
        let out = json(|s| {
            s.push_map_start(0)?;
            s.push_map_end()
        });
        assert_eq!(out, r#"["^ "]"#);
    }

    #[test]
    fn test_strings_are_json_escaped() {
        let out = json(|s| s.push_scalar(Scalar::Str("a\"b\\c\n"), false));
        assert_eq!(out, r#""a\"b\\c\n""#);
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let mut sink = JsonSink::new(Vec::new());
        assert!(sink.push_scalar(Scalar::Float(f64::NAN), false).is_err());
    }

    #[test]
    fn test_discard_drops_unflushed_output() {
        let mut sink = JsonSink::new(Vec::new());
        sink.push_array_start(1).unwrap();
        sink.push_scalar(Scalar::Bool(true), false).unwrap();
        sink.discard();
        sink.flush().unwrap();
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn test_recorder_discard_keeps_committed() {
        let mut rec = Recorder::new();
        rec.push_scalar(Scalar::Int(1), false).unwrap();
        rec.flush().unwrap();
        rec.push_array_start(2).unwrap();
        rec.discard();
        assert_eq!(rec.events(), &[Event::int(1), Event::Flush]);
    }
}
