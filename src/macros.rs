/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Object keys must be literals and become [`Value::String`](crate::Value::String)
/// keys. Any other expression goes through [`to_value`](crate::to_value).
///
/// ```rust
/// use serde_transit::{transit, value_to_string};
///
/// let value = transit!({ "ids": [1, 2], "active": true });
/// assert_eq!(value_to_string(&value).unwrap(), r#"["^ ","ids",[1,2],"active",true]"#);
/// ```
#[macro_export]
macro_rules! transit {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::transit!($elem)),*])
    };

    ({}) => {
        $crate::Value::Map($crate::TransitMap::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut map = $crate::TransitMap::new();
        $(
            map.insert($crate::Value::from($key), $crate::transit!($value));
        )*
        $crate::Value::Map(map)
    }};

    // to_value only fails for types whose Serialize impl errors
    ($s:expr) => {{
        $crate::to_value(&$s).unwrap_or($crate::Value::Null)
    }};
}

#[cfg(test)]
mod tests {
    use crate::{TransitMap, Value};

    #[test]
    fn test_transit_macro_primitives() {
        assert_eq!(transit!(null), Value::Null);
        assert_eq!(transit!(true), Value::Bool(true));
        assert_eq!(transit!(false), Value::Bool(false));
        assert_eq!(transit!(42), Value::Integer(42));
        assert_eq!(transit!(3.5), Value::Float(3.5));
        assert_eq!(transit!("hello"), Value::String("hello".to_string()));
        assert_eq!(transit!('c'), Value::Char('c'));
    }

    #[test]
    fn test_transit_macro_arrays() {
        assert_eq!(transit!([]), Value::Array(vec![]));
        assert_eq!(
            transit!([1, [true, null]]),
            Value::Array(vec![
                Value::Integer(1),
                Value::Array(vec![Value::Bool(true), Value::Null]),
            ])
        );
    }

    #[test]
    fn test_transit_macro_maps() {
        assert_eq!(transit!({}), Value::Map(TransitMap::new()));

        let map = transit!({
            "name": "Alice",
            "age": 30
        });
        let map = map.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&Value::from("name")), Some(&Value::from("Alice")));
        assert_eq!(map.get(&Value::from("age")), Some(&Value::Integer(30)));
    }
}
