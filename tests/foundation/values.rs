//! Integration tests for the Value type.

use std::cmp::Ordering;

use relic_foundation::{Key, Record, RecordRef, Value};

// =============================================================================
// Conversions
// =============================================================================

#[test]
fn scalar_conversions() {
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from(42), Value::Int(42));
    assert_eq!(Value::from(1.5), Value::Float(1.5));
    assert_eq!(Value::from("x"), Value::Str("x".into()));
}

#[test]
fn key_conversion_round_trips() {
    let key = Key::from(10);
    assert_eq!(Key::from_value(&Value::from(key.clone())), Some(key));

    let key = Key::from("abc");
    assert_eq!(Key::from_value(&Value::from(key.clone())), Some(key));
}

#[test]
fn list_conversion() {
    let v = Value::from(vec![Value::from(1), Value::from(2)]);
    assert_eq!(v.as_list().unwrap().len(), 2);
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn compare_is_deterministic_for_refs() {
    let a = Value::Ref(RecordRef::new("user", Key::from(1)));
    let b = Value::Ref(RecordRef::new("user", Key::from(2)));
    assert_eq!(a.compare(&b), Ordering::Less);
    assert_eq!(a.compare(&a.clone()), Ordering::Equal);
}

#[test]
fn nan_has_a_stable_position() {
    let nan = Value::from(f64::NAN);
    // total_cmp: comparing a value with itself is Equal, not unordered.
    assert_eq!(nan.compare(&nan.clone()), Ordering::Equal);
}

#[test]
fn lists_compare_lexicographically() {
    let short = Value::from(vec![Value::from(1)]);
    let long = Value::from(vec![Value::from(1), Value::from(2)]);
    assert_eq!(short.compare(&long), Ordering::Less);
}

// =============================================================================
// Canonical rendering
// =============================================================================

#[test]
fn canonical_rendering_is_stable_across_map_insert_order() {
    let first = Record::new().with("alpha", 1).with("beta", 2).into_value();
    let second = Record::new().with("beta", 2).with("alpha", 1).into_value();

    let mut a = String::new();
    let mut b = String::new();
    first.canonicalize(&mut a);
    second.canonicalize(&mut b);
    assert_eq!(a, b);
}

#[test]
fn canonical_rendering_distinguishes_types() {
    let mut int_out = String::new();
    let mut str_out = String::new();
    Value::from(1).canonicalize(&mut int_out);
    Value::from("1").canonicalize(&mut str_out);
    assert_ne!(int_out, str_out);
}
