use serde_transit::{transit, value_to_string, TransitMap, Value};

#[test]
fn test_transit_macro_null() {
    let value = transit!(null);
    assert_eq!(value, Value::Null);
}

#[test]
fn test_transit_macro_booleans() {
    assert_eq!(transit!(true), Value::Bool(true));
    assert_eq!(transit!(false), Value::Bool(false));
}

#[test]
fn test_transit_macro_numbers() {
    assert_eq!(transit!(42), Value::Integer(42));
    assert_eq!(transit!(3.5), Value::Float(3.5));
    assert_eq!(transit!(-123), Value::Integer(-123));
    assert_eq!(transit!(u64::MAX), Value::from(u64::MAX));
}

#[test]
fn test_transit_macro_strings() {
    assert_eq!(transit!("hello world"), Value::String("hello world".to_string()));
    assert_eq!(transit!(""), Value::String(String::new()));
}

#[test]
fn test_transit_macro_arrays() {
    assert_eq!(transit!([]), Value::Array(vec![]));

    let mixed = transit!([1, "hello", true, null]);
    assert_eq!(
        mixed,
        Value::Array(vec![
            Value::Integer(1),
            Value::String("hello".to_string()),
            Value::Bool(true),
            Value::Null,
        ])
    );
}

#[test]
fn test_transit_macro_nested() {
    let nested = transit!({
        "user": {
            "id": 123,
            "name": "Bob",
            "active": true
        },
        "tags": ["admin", "developer"],
        "count": 42
    });

    let map = nested.as_map().unwrap();
    assert_eq!(map.len(), 3);

    let user = map.get(&Value::from("user")).and_then(Value::as_map).unwrap();
    assert_eq!(user.get(&Value::from("id")), Some(&Value::Integer(123)));
    assert_eq!(user.get(&Value::from("active")), Some(&Value::Bool(true)));

    let tags = map.get(&Value::from("tags")).and_then(Value::as_array).unwrap();
    assert_eq!(tags, &vec![Value::from("admin"), Value::from("developer")]);
}

#[test]
fn test_transit_macro_empty_map() {
    assert_eq!(transit!({}), Value::Map(TransitMap::new()));
}

#[test]
fn test_transit_macro_output_is_cached() {
    let value = transit!([{ "name": 1 }, { "name": 2 }]);
    assert_eq!(
        value_to_string(&value).unwrap(),
        r#"[["^ ","name",1],["^ ","^0",2]]"#
    );
}
