//! Integration tests for the store facade.

use relic_foundation::{ChangeKind, ErrorKind, Key, Params, Record, SortOrder, Value};
use relic_schema::{EngineDefaults, HookSet, HookStage, ResourceDefinition};
use relic_storage::Store;

fn user(id: i64, name: &str) -> Record {
    Record::new().with("id", id).with("name", name)
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn registration_allocates_an_empty_store() {
    let mut store = Store::new();
    store.register("user").unwrap();
    assert!(store.is_registered("user"));
    assert!(store.resource("user").unwrap().is_empty());
}

#[test]
fn duplicate_registration_fails_and_preserves_state() {
    let mut store = Store::new();
    store.register("user").unwrap();
    store.inject("user", user(1, "John")).unwrap();

    let err = store.register("user").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::AlreadyRegistered(_)));
    assert_eq!(store.resource("user").unwrap().len(), 1);
}

#[test]
fn invalid_definition_rolls_back_completely() {
    let mut store = Store::new();
    let err = store
        .register(ResourceDefinition::new("user").with_id_attribute(""))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidDefinition(_)));
    assert!(!store.is_registered("user"));
    assert!(store.resource("user").is_err());

    // The name stayed free.
    assert!(store.register("user").is_ok());
}

#[test]
fn engine_defaults_apply_to_every_resource() {
    let defaults = EngineDefaults::new().with_hooks(HookSet::new().on(
        HookStage::BeforeInject,
        |_, attrs| {
            let mut attrs = attrs.clone();
            attrs.set("stamped", true);
            Ok(attrs)
        },
    ));
    let mut store = Store::new().with_defaults(defaults);
    store.register("user").unwrap();

    store.inject("user", user(1, "John")).unwrap();
    let rec = store.get("user", &Key::from(1)).unwrap().unwrap();
    assert_eq!(rec.get("stamped"), Some(&Value::Bool(true)));
}

// =============================================================================
// Inject / eject / get
// =============================================================================

#[test]
fn inject_upserts_by_key() {
    let mut store = Store::new();
    store.register("user").unwrap();

    store.inject("user", user(1, "John")).unwrap();
    store.inject("user", user(1, "Fred")).unwrap();
    store.inject("user", user(2, "Sue")).unwrap();

    let rs = store.resource("user").unwrap();
    assert_eq!(rs.len(), 2);
    assert_eq!(rs.keys(), &[Key::from(1), Key::from(2)]);
}

#[test]
fn inject_batch_preserves_order() {
    let mut store = Store::new();
    store.register("user").unwrap();

    let stored = store
        .inject_all("user", vec![user(3, "c"), user(1, "a"), user(2, "b")])
        .unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(
        store.resource("user").unwrap().keys(),
        &[Key::from(3), Key::from(1), Key::from(2)]
    );
}

#[test]
fn string_keys_work_throughout() {
    let mut store = Store::new();
    store
        .register(ResourceDefinition::new("doc").with_id_attribute("slug"))
        .unwrap();

    store
        .inject("doc", Record::new().with("slug", "intro").with("title", "Intro"))
        .unwrap();
    let rec = store.get("doc", &Key::from("intro")).unwrap().unwrap();
    assert_eq!(rec.get("title"), Some(&Value::from("Intro")));

    store.eject("doc", &Key::from("intro")).unwrap();
    assert!(store.get("doc", &Key::from("intro")).unwrap().is_none());
}

#[test]
fn eject_all_matches_params() {
    let mut store = Store::new();
    store.register("user").unwrap();
    store.inject("user", user(1, "a").with("age", 30)).unwrap();
    store.inject("user", user(2, "b").with("age", 30)).unwrap();
    store.inject("user", user(3, "c").with("age", 40)).unwrap();

    let removed = store
        .eject_all("user", &Params::new().where_eq("age", 30))
        .unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(store.resource("user").unwrap().len(), 1);
    assert!(store.get("user", &Key::from(3)).unwrap().is_some());
}

// =============================================================================
// Filter
// =============================================================================

#[test]
fn filter_reflects_live_collection_between_calls() {
    let mut store = Store::new();
    store.register("user").unwrap();
    store.inject("user", user(1, "a").with("active", true)).unwrap();
    store.inject("user", user(2, "b").with("active", true)).unwrap();

    let params = Params::new().where_eq("active", true);
    assert_eq!(store.filter("user", &params).unwrap().count(), 2);

    store.inject("user", user(3, "c").with("active", true)).unwrap();
    store.set("user", &Key::from(1), "active", false).unwrap();
    assert_eq!(store.filter("user", &params).unwrap().count(), 2);
}

#[test]
fn filter_sorts_then_windows() {
    let mut store = Store::new();
    store.register("user").unwrap();
    for (id, age) in [(1, 40), (2, 20), (3, 30), (4, 10)] {
        store.inject("user", user(id, "x").with("age", age)).unwrap();
    }

    let params = Params::new()
        .order_by("age", SortOrder::Desc)
        .skip(1)
        .limit(2);
    let ages: Vec<_> = store
        .filter("user", &params)
        .unwrap()
        .map(|r| r.get("age").cloned().unwrap())
        .collect();
    assert_eq!(ages, vec![Value::Int(30), Value::Int(20)]);
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn changes_track_against_last_inject() {
    let mut store = Store::new();
    store.register("user").unwrap();
    store.inject("user", user(1, "John").with("age", 30)).unwrap();

    store.set("user", &Key::from(1), "age", 31).unwrap();
    store.set("user", &Key::from(1), "email", "j@example.com").unwrap();

    let diff = store.changes("user", &Key::from(1)).unwrap().unwrap();
    assert_eq!(diff.len(), 2);
    assert_eq!(diff.get("age"), Some(&Value::Int(31)));

    // Reinject resets the baseline.
    store.inject("user", user(1, "John").with("age", 31)).unwrap();
    assert!(!store.has_changes("user", &Key::from(1)).unwrap());
}

#[test]
fn revert_and_commit_manage_the_baseline() {
    let mut store = Store::new();
    store.register("user").unwrap();
    store.inject("user", user(1, "John")).unwrap();

    store.set("user", &Key::from(1), "name", "Fred").unwrap();
    store.revert("user", &Key::from(1)).unwrap();
    assert_eq!(
        store.get("user", &Key::from(1)).unwrap().unwrap().get("name"),
        Some(&Value::from("John"))
    );

    store.set("user", &Key::from(1), "name", "Max").unwrap();
    store.commit("user", &Key::from(1)).unwrap();
    assert!(!store.has_changes("user", &Key::from(1)).unwrap());
    assert_eq!(
        store.get("user", &Key::from(1)).unwrap().unwrap().get("name"),
        Some(&Value::from("Max"))
    );
}

#[test]
fn modification_stamps_move_forward() {
    let mut store = Store::new();
    store.register("user").unwrap();
    store.inject("user", user(1, "John")).unwrap();

    let first = store.last_modified("user", Some(&Key::from(1))).unwrap().unwrap();
    store.set("user", &Key::from(1), "age", 1).unwrap();
    let second = store.last_modified("user", Some(&Key::from(1))).unwrap().unwrap();
    assert!(second > first);
}

// =============================================================================
// Observers
// =============================================================================

#[test]
fn observer_lifecycle_follows_the_record() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut store = Store::new();
    store.register("user").unwrap();
    store.inject("user", user(1, "John")).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_inner = Rc::clone(&seen);
    store
        .observe("user", &Key::from(1), move |event| {
            seen_inner.borrow_mut().push(event.kind.clone());
        })
        .unwrap();

    store.set("user", &Key::from(1), "age", 40).unwrap();
    store.eject("user", &Key::from(1)).unwrap();

    // Reinjecting does not resurrect the dropped observer.
    store.inject("user", user(1, "again")).unwrap();
    store.set("user", &Key::from(1), "age", 41).unwrap();

    assert_eq!(&*seen.borrow(), &[ChangeKind::Updated, ChangeKind::Ejected]);
}

// =============================================================================
// Endpoints
// =============================================================================

// =============================================================================
// Property tests
// =============================================================================

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn injected_records_are_always_gettable(ids in proptest::collection::vec(0i64..1000, 1..50)) {
            let mut store = Store::new();
            store.register("user").unwrap();

            for id in &ids {
                store.inject("user", Record::new().with("id", *id)).unwrap();
            }
            for id in &ids {
                prop_assert!(store.get("user", &Key::from(*id)).unwrap().is_some());
            }

            // Duplicates collapse: the collection holds each key once.
            let mut unique = ids.clone();
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(store.resource("user").unwrap().len(), unique.len());
        }

        #[test]
        fn ejected_records_are_never_gettable(ids in proptest::collection::vec(0i64..100, 1..30)) {
            let mut store = Store::new();
            store.register("user").unwrap();

            for id in &ids {
                store.inject("user", Record::new().with("id", *id)).unwrap();
            }
            for id in &ids {
                store.eject("user", &Key::from(*id)).unwrap();
            }

            for id in &ids {
                prop_assert!(store.get("user", &Key::from(*id)).unwrap().is_none());
            }
            prop_assert!(store.resource("user").unwrap().is_empty());
        }

        #[test]
        fn filter_never_yields_non_matching_records(ages in proptest::collection::vec(0i64..5, 1..40)) {
            let mut store = Store::new();
            store.register("user").unwrap();

            for (id, age) in ages.iter().enumerate() {
                store
                    .inject("user", Record::new().with("id", id as i64).with("age", *age))
                    .unwrap();
            }

            let params = Params::new().where_eq("age", 3);
            let expected = ages.iter().filter(|a| **a == 3).count();
            let got: Vec<_> = store.filter("user", &params).unwrap().collect();
            prop_assert_eq!(got.len(), expected);
            for rec in got {
                prop_assert_eq!(rec.get("age"), Some(&Value::Int(3)));
            }
        }
    }
}

#[test]
fn endpoint_uses_injected_records_for_parent_keys() {
    use relic_schema::{EndpointOptions, RelationDef};

    let mut store = Store::new();
    store
        .register(ResourceDefinition::new("organization").with_endpoint("organizations"))
        .unwrap();
    store
        .register(
            ResourceDefinition::new("user")
                .with_endpoint("users")
                .with_relation(
                    RelationDef::belongs_to("organization", "organization", "organizationId")
                        .as_parent(),
                ),
        )
        .unwrap();

    store
        .inject("user", user(1, "John").with("organizationId", 42))
        .unwrap();

    // Attrs carry only the record's own key; the stored copy supplies the
    // parent key.
    let attrs = Record::new().with("id", 1);
    let path = store
        .endpoint("user", Some(&attrs), &EndpointOptions::new())
        .unwrap();
    assert_eq!(path, "organizations/42/users");
}
