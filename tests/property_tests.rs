//! Property-based tests for the wire-level guarantees: escaping, top-level quoting
//! and key caching, checked by parsing the output back with serde_json.

use proptest::prelude::*;
use serde_json::{json, Value as Json};
use serde_transit::{to_string, value_to_string, TransitMap, Value};

fn parse(out: &str) -> Json {
    serde_json::from_str(out).unwrap_or_else(|e| panic!("invalid JSON {out:?}: {e}"))
}

fn escaped(s: &str) -> String {
    if s != "^ " && (s.starts_with('~') || s.starts_with('^') || s.starts_with('`')) {
        format!("~{s}")
    } else {
        s.to_string()
    }
}

proptest! {
    #[test]
    fn prop_strings_in_arrays_are_escaped(s in any::<String>()) {
        let out = value_to_string(&Value::Array(vec![Value::from(s.as_str())])).unwrap();
        prop_assert_eq!(parse(&out), json!([escaped(&s)]));
    }

    #[test]
    fn prop_reserved_prefixes(rest in "[a-z0-9 ]{0,8}", lead in prop::sample::select(vec!['~', '^', '`'])) {
        let s = format!("{lead}{rest}");
        let out = value_to_string(&Value::Array(vec![Value::from(s.as_str())])).unwrap();
        let parsed = parse(&out);
        let written = parsed[0].as_str().unwrap();
        if s == "^ " {
            prop_assert_eq!(written, "^ ");
        } else {
            prop_assert_eq!(written, format!("~{s}"));
        }
    }

    #[test]
    fn prop_top_level_integers_are_quoted(n in any::<i64>()) {
        let out = to_string(&n).unwrap();
        prop_assert_eq!(parse(&out), json!(["~#'", n]));
    }

    #[test]
    fn prop_top_level_strings_are_quoted(s in any::<String>()) {
        let out = to_string(&s).unwrap();
        prop_assert_eq!(parse(&out), json!(["~#'", escaped(&s)]));
    }

    #[test]
    fn prop_integer_vectors_are_plain_json(v in prop::collection::vec(any::<i64>(), 0..20)) {
        let out = to_string(&v).unwrap();
        prop_assert_eq!(parse(&out), json!(v));
    }

    #[test]
    fn prop_repeated_keys_use_cache_codes(key in "[a-z]{1,8}") {
        let mut inner = TransitMap::new();
        inner.insert(Value::from(key.as_str()), Value::from(1));
        let value = Value::Array(vec![Value::Map(inner.clone()), Value::Map(inner)]);

        let parsed = parse(&value_to_string(&value).unwrap());
        prop_assert_eq!(&parsed[0][1], &json!(key));
        let expected = if key.len() >= 4 { "^0".to_string() } else { key.clone() };
        prop_assert_eq!(&parsed[1][1], &json!(expected));
    }
}
