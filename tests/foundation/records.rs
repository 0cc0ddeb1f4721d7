//! Integration tests for the Record type.

use relic_foundation::{Key, Record, Value};

#[test]
fn records_share_structure_on_clone() {
    let original = Record::new().with("id", 1).with("name", "John");
    let snapshot = original.clone();

    let mut mutated = original;
    mutated.set("name", "Fred");

    // The clone is an independent logical copy.
    assert_eq!(snapshot.get("name"), Some(&Value::from("John")));
    assert_eq!(mutated.get("name"), Some(&Value::from("Fred")));
}

#[test]
fn key_extraction_respects_id_attribute() {
    let rec = Record::new().with("uuid", "u-1").with("id", 7);
    assert_eq!(rec.key("uuid"), Some(Key::from("u-1")));
    assert_eq!(rec.key("id"), Some(Key::from(7)));
    assert_eq!(rec.key("missing"), None);
}

#[test]
fn merged_is_an_upsert() {
    let stored = Record::new().with("id", 1).with("name", "John").with("age", 30);
    let partial = Record::new().with("id", 1).with("name", "Fred");

    let merged = stored.merged(&partial);
    assert_eq!(merged.get("name"), Some(&Value::from("Fred")));
    assert_eq!(merged.get("age"), Some(&Value::Int(30)));
    assert_eq!(merged.len(), 3);
}

#[test]
fn diff_detects_additions_changes_and_removals() {
    let base = Record::new().with("a", 1).with("b", 2);
    let current = Record::new().with("a", 1).with("b", 3).with("c", 4);

    let diff = current.diff(&base);
    assert!(!diff.contains("a"));
    assert_eq!(diff.get("b"), Some(&Value::Int(3)));
    assert_eq!(diff.get("c"), Some(&Value::Int(4)));

    let reverse = base.diff(&current);
    assert_eq!(reverse.get("c"), Some(&Value::Null));
}

#[test]
fn nested_records_convert_through_value() {
    let nested = Record::new().with("id", 18);
    let outer = Record::new().with("id", 10).with("profile", nested.clone());

    let extracted = Record::from_value(outer.get("profile").unwrap()).unwrap();
    assert_eq!(extracted, nested);
}
