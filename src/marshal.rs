//! The marshaling engine.
//!
//! [`Marshaler`] walks a [`Value`] graph and reduces it to [`Sink`] events. For every
//! node it resolves a handler, reads the tag and picks one of:
//!
//! - a primitive (`_` nil, `?` boolean, `i` integer, `d` float),
//! - a plain string (`s`, escaped),
//! - an array or map (`array`, `map`), walked recursively,
//! - a prefixed string (`"~" + tag + rep`) for other one-character tags,
//! - a tagged array (`["~#" + tag, rep]`) for everything else.
//!
//! Map keys are restricted to encodings that end up as strings or numbers. Every
//! emitted string is offered to the write cache first.
//!
//! [`Writer`] is the top-level entry point. It wraps scalar-eligible values in the
//! quote tag so that a document is always an array or a map, owns the cache for the
//! duration of one write and flushes the sink at the end.

use crate::cache::{NoopCache, RollingCache, WriteCache};
use crate::escape::{escape, ESC, QUOTE, TAG};
use crate::handler::{is_scalar_tag, Handler};
use crate::sink::{Scalar, Sink};
use crate::{
    Error, HandlerRegistry, HandlerTable, Result, TaggedValue, TransitOptions, Value,
};
use std::borrow::Cow;
use std::sync::Arc;

fn checked_tag<'a>(handler: &'a dyn Handler, value: &'a Value) -> Result<&'a str> {
    handler
        .tag(value)
        .filter(|tag| !tag.is_empty())
        .ok_or_else(|| {
            Error::invalid_handler(value.type_key().as_str(), "handler returned no tag")
        })
}

fn unexpected_rep(tag: &str, value: &Value, rep: &Value) -> Error {
    Error::invalid_handler(
        value.type_key().as_str(),
        &format!("tag `{}` does not accept the representation {:?}", tag, rep),
    )
}

/// Recursive encoder over one sink and one cache.
///
/// # Examples
///
/// ```rust
/// use serde_transit::cache::NoopCache;
/// use serde_transit::sink::{Event, Recorder};
/// use serde_transit::{HandlerRegistry, Marshaler, TransitOptions, Value};
///
/// let table = HandlerRegistry::global().default_table().unwrap();
/// let mut sink = Recorder::new();
/// let options = TransitOptions::new();
/// let mut marshaler = Marshaler::new(&table, &mut sink, NoopCache, &options);
///
/// marshaler.marshal(&Value::keyword("id"), true).unwrap();
/// assert_eq!(sink.events(), &[Event::key("~:id")]);
/// ```
pub struct Marshaler<'w, S: Sink + ?Sized, C: WriteCache> {
    table: &'w HandlerTable,
    sink: &'w mut S,
    cache: C,
    prefer_strings: bool,
    max_depth: Option<usize>,
    depth: usize,
}

impl<'w, S: Sink + ?Sized, C: WriteCache> Marshaler<'w, S, C> {
    pub fn new(
        table: &'w HandlerTable,
        sink: &'w mut S,
        cache: C,
        options: &TransitOptions,
    ) -> Self {
        Marshaler {
            table,
            sink,
            cache,
            prefer_strings: options.prefer_strings,
            max_depth: options.max_depth,
            depth: 0,
        }
    }

    /// Encodes `value`, in map-key position when `as_map_key` is set.
    ///
    /// # Errors
    ///
    /// - [`Error::NoHandler`] when a value in the graph has no handler
    /// - [`Error::InvalidHandler`] when a handler returns no tag or an unusable rep
    /// - [`Error::Unencodable`] when a value cannot be written where it appears
    /// - [`Error::DepthExceeded`] when the graph is nested too deeply
    pub fn marshal(&mut self, value: &Value, as_map_key: bool) -> Result<()> {
        if let Some(limit) = self.max_depth {
            if self.depth >= limit {
                return Err(Error::depth_exceeded(limit));
            }
        }
        self.depth += 1;
        let result = self.marshal_node(value, as_map_key);
        self.depth -= 1;
        result
    }

    fn marshal_node(&mut self, value: &Value, as_map_key: bool) -> Result<()> {
        let table = self.table;
        let handler = table.resolve(value)?;
        let tag = checked_tag(handler, value)?;

        match tag {
            "_" => self.emit_nil(as_map_key),
            "?" => self.emit_bool(handler, tag, value, as_map_key),
            "s" => {
                let rep = handler.rep(value)?;
                match rep.as_ref() {
                    Value::String(s) => self.emit_string("", "", &escape(s), as_map_key),
                    other => Err(unexpected_rep(tag, value, other)),
                }
            }
            "i" => {
                let rep = handler.rep(value)?;
                match rep.as_ref() {
                    Value::Integer(i) => self.sink.push_scalar(Scalar::Int(*i), as_map_key),
                    other => Err(unexpected_rep(tag, value, other)),
                }
            }
            "d" => self.emit_float(handler, tag, value, as_map_key),
            QUOTE => {
                let rep = handler.rep(value)?;
                self.emit_tagged(tag, &rep)
            }
            "array" => {
                let rep = handler.rep(value)?;
                match rep.as_ref() {
                    Value::Array(items) => self.emit_array(items),
                    other => Err(unexpected_rep(tag, value, other)),
                }
            }
            "map" => {
                let rep = handler.rep(value)?;
                match rep.as_ref() {
                    Value::Map(map) => {
                        self.sink.push_map_start(map.len())?;
                        for (k, v) in map {
                            self.marshal(k, true)?;
                            self.marshal(v, false)?;
                        }
                        self.sink.push_map_end()
                    }
                    other => Err(unexpected_rep(tag, value, other)),
                }
            }
            _ => self.emit_encoded(handler, tag, value, as_map_key),
        }
    }

    fn emit_nil(&mut self, as_map_key: bool) -> Result<()> {
        if as_map_key {
            self.emit_string(ESC, "_", "", true)
        } else {
            self.sink.push_scalar(Scalar::Null, false)
        }
    }

    fn emit_bool(
        &mut self,
        handler: &dyn Handler,
        tag: &str,
        value: &Value,
        as_map_key: bool,
    ) -> Result<()> {
        if as_map_key {
            return self.emit_string_rep(handler, tag, value, true);
        }
        let rep = handler.rep(value)?;
        match rep.as_ref() {
            Value::Bool(b) => self.sink.push_scalar(Scalar::Bool(*b), false),
            other => Err(unexpected_rep(tag, value, other)),
        }
    }

    fn emit_float(
        &mut self,
        handler: &dyn Handler,
        tag: &str,
        value: &Value,
        as_map_key: bool,
    ) -> Result<()> {
        if as_map_key {
            return self.emit_string_rep(handler, tag, value, true);
        }
        let rep = handler.rep(value)?;
        match rep.as_ref() {
            Value::Float(f) => self.sink.push_scalar(Scalar::Float(*f), false),
            other => Err(unexpected_rep(tag, value, other)),
        }
    }

    fn emit_array(&mut self, items: &[Value]) -> Result<()> {
        self.sink.push_array_start(items.len())?;
        for item in items {
            self.marshal(item, false)?;
        }
        self.sink.push_array_end()
    }

    fn emit_encoded(
        &mut self,
        handler: &dyn Handler,
        tag: &str,
        value: &Value,
        as_map_key: bool,
    ) -> Result<()> {
        let rep = handler.rep(value)?;
        if !is_scalar_tag(tag) {
            if as_map_key {
                return Err(Error::unencodable(
                    tag,
                    &*rep,
                    value,
                    "cannot be used as a map key",
                ));
            }
            return self.emit_tagged(tag, &rep);
        }

        if let Value::String(s) = rep.as_ref() {
            self.emit_string(ESC, tag, &escape(s), as_map_key)
        } else if as_map_key || self.prefer_strings {
            self.emit_string_rep(handler, tag, value, as_map_key)
        } else {
            self.emit_tagged(tag, &rep)
        }
    }

    // `~` + tag + string_rep, or an error when the handler has no string form.
    fn emit_string_rep(
        &mut self,
        handler: &dyn Handler,
        tag: &str,
        value: &Value,
        as_map_key: bool,
    ) -> Result<()> {
        match handler.string_rep(value) {
            Some(s) => self.emit_string(ESC, tag, &s, as_map_key),
            None => {
                let rep = handler.rep(value)?;
                Err(Error::unencodable(
                    tag,
                    &*rep,
                    value,
                    "cannot be encoded as a string",
                ))
            }
        }
    }

    fn emit_tagged(&mut self, tag: &str, rep: &Value) -> Result<()> {
        self.sink.push_array_start(2)?;
        self.emit_string(ESC, TAG, tag, false)?;
        self.marshal(rep, false)?;
        self.sink.push_array_end()
    }

    fn emit_string(&mut self, prefix: &str, tag: &str, body: &str, as_map_key: bool) -> Result<()> {
        let encoded: Cow<'_, str> = if prefix.is_empty() && tag.is_empty() {
            Cow::Borrowed(body)
        } else {
            Cow::Owned([prefix, tag, body].concat())
        };
        if self.cache.is_cacheable(&encoded, as_map_key) {
            let cached = self.cache.write(&encoded);
            self.sink.push_scalar(Scalar::Str(&cached), as_map_key)
        } else {
            self.sink.push_scalar(Scalar::Str(&encoded), as_map_key)
        }
    }
}

/// Top-level Transit writer over a [`Sink`].
///
/// Every call to [`Writer::write`] produces one complete document with its own cache.
///
/// # Examples
///
/// ```rust
/// use serde_transit::sink::JsonSink;
/// use serde_transit::{Value, Writer};
///
/// let mut writer = Writer::with_defaults(JsonSink::new(Vec::new())).unwrap();
/// writer.write(&Value::from("hello")).unwrap();
///
/// let out = writer.into_inner().into_inner();
/// assert_eq!(out, br#"["~#'","hello"]"#);
/// ```
pub struct Writer<S: Sink> {
    sink: S,
    table: Arc<HandlerTable>,
    options: TransitOptions,
}

impl<S: Sink> Writer<S> {
    pub fn new(sink: S, table: Arc<HandlerTable>, options: TransitOptions) -> Self {
        Writer {
            sink,
            table,
            options,
        }
    }

    /// A writer using the global registry's default handlers and default options.
    pub fn with_defaults(sink: S) -> Result<Self> {
        let table = HandlerRegistry::global().default_table()?;
        Ok(Writer::new(sink, table, TransitOptions::default()))
    }

    pub fn table(&self) -> &Arc<HandlerTable> {
        &self.table
    }

    pub fn options(&self) -> &TransitOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Writes `value` as one Transit document and flushes the sink.
    ///
    /// On error nothing from this document reaches the sink's output.
    pub fn write(&mut self, value: &Value) -> Result<()> {
        let result = if self.options.caching {
            self.write_with(value, RollingCache::new())
        } else {
            self.write_with(value, NoopCache)
        };
        if let Err(err) = &result {
            tracing::debug!(error = %err, type_key = %value.type_key(), "transit write failed, output discarded");
            self.sink.discard();
        }
        result
    }

    fn write_with<C: WriteCache>(&mut self, value: &Value, cache: C) -> Result<()> {
        let handler = self.table.resolve(value)?;
        let tag = checked_tag(handler, value)?;

        let quoted;
        let root = if is_scalar_tag(tag) {
            quoted = Value::Tagged(TaggedValue::quote(value.clone()));
            &quoted
        } else {
            value
        };

        let mut marshaler = Marshaler::new(&self.table, &mut self.sink, cache, &self.options);
        marshaler.marshal(root, false)?;
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{Datum, Event, Recorder};
    use crate::{Overrides, TransitMap, TypeKey};

    fn events(value: &Value, options: TransitOptions) -> Result<Vec<Event>> {
        let table = HandlerRegistry::global().default_table()?;
        let mut writer = Writer::new(Recorder::new(), table, options);
        writer.write(value)?;
        Ok(writer.into_inner().into_events())
    }

    fn marshal_key(value: &Value) -> Result<Vec<Event>> {
        let table = HandlerRegistry::global().default_table()?;
        let mut sink = Recorder::new();
        let options = TransitOptions::new();
        Marshaler::new(&table, &mut sink, NoopCache, &options).marshal(value, true)?;
        Ok(sink.into_events())
    }

    #[test]
    fn test_top_level_scalar_is_quoted() {
        let out = events(&Value::from(true), TransitOptions::new()).unwrap();
        assert_eq!(
            out,
            vec![
                Event::ArrayStart(2),
                Event::string("~#'"),
                Event::Value(Datum::Bool(true), false),
                Event::ArrayEnd,
                Event::Flush,
            ]
        );
    }

    #[test]
    fn test_nil_and_bool_keys() {
        assert_eq!(marshal_key(&Value::Null).unwrap(), vec![Event::key("~_")]);
        assert_eq!(marshal_key(&Value::from(false)).unwrap(), vec![Event::key("~?f")]);
        assert_eq!(marshal_key(&Value::from(2.5)).unwrap(), vec![Event::key("~d2.5")]);
    }

    #[test]
    fn test_integer_keys_stay_numeric() {
        assert_eq!(
            marshal_key(&Value::from(42)).unwrap(),
            vec![Event::Value(Datum::Int(42), true)]
        );
    }

    #[test]
    fn test_compound_key_is_unencodable() {
        let err = marshal_key(&Value::Set(vec![Value::from(1)])).unwrap_err();
        match err {
            Error::Unencodable { tag, reason, .. } => {
                assert_eq!(tag, "set");
                assert!(reason.contains("map key"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_tagged_array_without_prefer_strings() {
        let t = chrono::TimeZone::timestamp_millis_opt(&chrono::Utc, 1_000).unwrap();
        let out = events(
            &Value::Array(vec![Value::Timestamp(t)]),
            TransitOptions::new().with_prefer_strings(false),
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                Event::ArrayStart(1),
                Event::ArrayStart(2),
                Event::string("~#m"),
                Event::int(1_000),
                Event::ArrayEnd,
                Event::ArrayEnd,
                Event::Flush,
            ]
        );
    }

    #[test]
    fn test_missing_string_rep_in_prefer_strings_mode() {
        struct Opaque;
        impl Handler for Opaque {
            fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
                Some("x")
            }
            fn rep<'a>(&self, _value: &'a Value) -> Result<Cow<'a, Value>> {
                Ok(Cow::Owned(Value::Integer(1)))
            }
        }

        let registry = HandlerRegistry::new();
        let key = TypeKey::from_static("opaque");
        let table = registry
            .table(&Overrides::new().handler(key.clone(), Arc::new(Opaque)))
            .unwrap();
        let value = Value::Array(vec![Value::ext(key, ())]);

        let mut writer = Writer::new(Recorder::new(), table.clone(), TransitOptions::new());
        assert!(matches!(writer.write(&value), Err(Error::Unencodable { .. })));
        assert!(writer.sink().events().is_empty());

        let options = TransitOptions::new().with_prefer_strings(false);
        let mut writer = Writer::new(Recorder::new(), table, options);
        writer.write(&value).unwrap();
        assert_eq!(writer.sink().events()[2], Event::string("~#x"));
    }

    #[test]
    fn test_empty_tag_is_invalid_handler() {
        struct Silent;
        impl Handler for Silent {
            fn tag<'a>(&'a self, _value: &'a Value) -> Option<&'a str> {
                Some("")
            }
            fn rep<'a>(&self, value: &'a Value) -> Result<Cow<'a, Value>> {
                Ok(Cow::Borrowed(value))
            }
        }

        let registry = HandlerRegistry::new();
        let key = TypeKey::from_static("silent");
        let table = registry
            .table(&Overrides::new().handler(key.clone(), Arc::new(Silent)))
            .unwrap();
        let mut writer = Writer::new(Recorder::new(), table, TransitOptions::new());
        assert!(matches!(
            writer.write(&Value::ext(key, ())),
            Err(Error::InvalidHandler { .. })
        ));
    }

    #[test]
    fn test_depth_guard() {
        let mut value = Value::from(1);
        for _ in 0..10 {
            value = Value::Array(vec![value]);
        }
        let err = events(&value, TransitOptions::new().with_max_depth(5)).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { limit: 5 }));
        assert!(events(&value, TransitOptions::new().with_max_depth(11)).is_ok());
        assert!(events(&value, TransitOptions::new().without_depth_limit()).is_ok());
    }

    #[test]
    fn test_map_keys_are_cached() {
        let mut inner = TransitMap::new();
        inner.insert(Value::from("name"), Value::from(1));
        let value = Value::Array(vec![Value::Map(inner.clone()), Value::Map(inner)]);
        let out = events(&value, TransitOptions::new()).unwrap();
        assert!(out.contains(&Event::key("name")));
        assert!(out.contains(&Event::key("^0")));

        let uncached = events(&value, TransitOptions::new().with_caching(false)).unwrap();
        assert!(!uncached.contains(&Event::key("^0")));
    }
}
