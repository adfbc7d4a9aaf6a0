use bincode::config;

use crate::types::{value_test_cases, Value};

#[test]
fn test_value_bincode_serialize_roundtrip() {
    for value in value_test_cases() {
        let bytes = bincode::serde::encode_to_vec(&value, config::legacy()).unwrap();
        let (deserialized, _): (Value, _) =
            bincode::serde::decode_from_slice(&bytes, config::legacy()).unwrap_or_else(|e| {
                panic!("Failed to deserialize value: {value:?} from bytes: {bytes:?}. {e}")
            });
        assert_eq!(value, deserialized);
    }
}

#[test]
fn test_value_json_serialize_roundtrip() {
    for value in value_test_cases() {
        let text = serde_json::to_string(&value).unwrap();
        let deserialized: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, deserialized);
    }
}

#[test]
fn value_serialization_is_never_empty() {
    for value in value_test_cases() {
        let bytes = bincode::serde::encode_to_vec(&value, config::legacy()).unwrap();
        assert!(!bytes.is_empty());
    }
}

#[test]
fn hash_agrees_with_structural_equality() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    // Two maps with the same entries in different insertion order are equal
    // and must hash identically.
    let mut a = crate::types::PropertyMap::new();
    a.insert("x".to_string(), Value::Int(1));
    a.insert("y".to_string(), Value::Int(2));
    let mut b = crate::types::PropertyMap::new();
    b.insert("y".to_string(), Value::Int(2));
    b.insert("x".to_string(), Value::Int(1));

    let (a, b) = (Value::Map(a), Value::Map(b));
    assert_eq!(a, b);

    let mut ha = DefaultHasher::new();
    a.hash(&mut ha);
    let mut hb = DefaultHasher::new();
    b.hash(&mut hb);
    assert_eq!(ha.finish(), hb.finish());
}

#[test]
fn all_nans_collide_for_dedup() {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    assert!(seen.insert(Value::float(f64::NAN)));
    assert!(!seen.insert(Value::float(-f64::NAN)));
}
