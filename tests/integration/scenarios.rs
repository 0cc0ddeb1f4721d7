//! Larger end-to-end scenarios combining several subsystems.

use std::sync::Arc;

use relic_engine::{Engine, FindOptions, SaveOptions};
use relic_foundation::{ChangeKind, Key, Params, Record, SortOrder, Value};
use relic_schema::{ComputedDef, RelationDef, ResourceDefinition};
use relic_storage::Related;

use crate::support::ScriptedAdapter;

/// A blog-shaped schema: organizations own users, users own comments and
/// a profile, users derive a display name.
fn blog_engine(adapter: Arc<ScriptedAdapter>) -> Engine {
    let mut engine = Engine::new(adapter);
    engine
        .register(ResourceDefinition::new("organization").with_endpoint("organizations"))
        .unwrap();
    engine.register("profile").unwrap();
    engine.register("comment").unwrap();
    engine
        .register(
            ResourceDefinition::new("user")
                .with_endpoint("users")
                .with_relation(
                    RelationDef::belongs_to("organization", "organization", "organizationId")
                        .as_parent(),
                )
                .with_relation(RelationDef::has_one("profile", "profile", "userId"))
                .with_relation(RelationDef::has_many("comment", "comments", "userId"))
                .with_computed(ComputedDef::new("displayName", ["name", "role"], |deps| {
                    Ok(Value::from(format!(
                        "{} ({})",
                        deps[0].as_str().unwrap_or("?"),
                        deps[1].as_str().unwrap_or("member"),
                    )))
                })),
        )
        .unwrap();
    engine
}

#[test]
fn nested_payload_populates_every_store_and_links() {
    let adapter = ScriptedAdapter::new();
    let mut engine = blog_engine(adapter);

    engine
        .store_mut()
        .inject(
            "user",
            Record::new()
                .with("id", 10)
                .with("name", "John")
                .with("role", "admin")
                .with("organizationId", 42)
                .with("profile", Record::new().with("id", 18).with("userId", 10))
                .with(
                    "comments",
                    Value::from(vec![
                        Record::new().with("id", 1).with("userId", 10).into_value(),
                        Record::new().with("id", 2).with("userId", 10).into_value(),
                    ]),
                ),
        )
        .unwrap();

    let store = engine.store();
    assert_eq!(store.resource("user").unwrap().len(), 1);
    assert_eq!(store.resource("profile").unwrap().len(), 1);
    assert_eq!(store.resource("comment").unwrap().len(), 2);

    // The computed field seeded during the same inject.
    let user = store.get_all("user").unwrap().pop().unwrap();
    assert_eq!(user.get("displayName"), Some(&Value::from("John (admin)")));

    // Hierarchical endpoint resolution picks up the parent key from the
    // injected record.
    let path = store
        .endpoint(
            "user",
            Some(&Record::new().with("id", 10)),
            &relic_schema::EndpointOptions::new(),
        )
        .unwrap();
    assert_eq!(path, "organizations/42/users");
}

#[test]
fn edit_review_save_round_trip() {
    let adapter = ScriptedAdapter::new();
    let mut engine = blog_engine(Arc::clone(&adapter));

    engine
        .store_mut()
        .inject(
            "user",
            Record::new()
                .with("id", 10)
                .with("name", "John")
                .with("role", "admin")
                .with("bio", "hello"),
        )
        .unwrap();

    // Edit locally, inspect the pending diff, then push only the changes.
    engine.store_mut().set("user", &Key::from(10), "bio", "updated").unwrap();
    let diff = engine
        .store()
        .changes("user", &Key::from(10))
        .unwrap()
        .unwrap();
    assert_eq!(diff.len(), 1);

    engine
        .save("user", &Key::from(10), &SaveOptions { changes_only: true })
        .unwrap();
    assert_eq!(adapter.calls(), vec!["update:user:10"]);

    // The save round-trip re-injected the server copy: clean state.
    assert!(!engine.store().has_changes("user", &Key::from(10)).unwrap());
    let user = engine.store_mut().get("user", &Key::from(10)).unwrap().unwrap();
    assert_eq!(user.get("bio"), Some(&Value::from("updated")));
    assert_eq!(user.get("name"), Some(&Value::from("John")));
}

#[test]
fn observers_track_a_record_through_its_life() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let adapter = ScriptedAdapter::new();
    let mut engine = blog_engine(adapter);

    engine
        .store_mut()
        .inject(
            "user",
            Record::new().with("id", 10).with("name", "John").with("role", "admin"),
        )
        .unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_inner = Rc::clone(&seen);
    engine
        .store_mut()
        .observe("user", &Key::from(10), move |event| {
            seen_inner.borrow_mut().push(event.kind.clone());
        })
        .unwrap();

    engine.store_mut().set("user", &Key::from(10), "name", "Fred").unwrap();
    engine.digest().unwrap();
    engine.store_mut().eject("user", &Key::from(10)).unwrap();

    assert_eq!(
        &*seen.borrow(),
        &[
            ChangeKind::Updated,
            ChangeKind::Computed("displayName".to_string()),
            ChangeKind::Ejected,
        ]
    );
}

#[test]
fn find_all_then_filter_compose() {
    let adapter = ScriptedAdapter::new();
    adapter.on_find_all(
        "comment",
        vec![
            Record::new().with("id", 3).with("userId", 10).with("score", 5),
            Record::new().with("id", 1).with("userId", 10).with("score", 9),
            Record::new().with("id", 2).with("userId", 11).with("score", 7),
        ],
    );

    let mut engine = blog_engine(Arc::clone(&adapter));
    engine
        .find_all("comment", &Params::new(), &FindOptions::new())
        .unwrap();

    // Local filtering over the mirrored collection, no further I/O.
    let top: Vec<_> = engine
        .store()
        .filter(
            "comment",
            &Params::new()
                .where_eq("userId", 10)
                .order_by("score", SortOrder::Desc)
                .limit(1),
        )
        .unwrap()
        .collect();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].get("id"), Some(&Value::Int(1)));
    assert_eq!(adapter.call_count(), 1);
}

#[test]
fn resource_handles_scope_operations_by_name() {
    let adapter = ScriptedAdapter::new();
    let mut engine = Engine::new(adapter);
    let users = engine.register("user").unwrap();
    let comments = engine.register("comment").unwrap();

    users
        .inject(&mut engine, Record::new().with("id", 1))
        .unwrap();
    comments
        .inject(&mut engine, Record::new().with("id", 1))
        .unwrap();

    assert_eq!(engine.store().resource("user").unwrap().len(), 1);
    assert_eq!(engine.store().resource("comment").unwrap().len(), 1);

    users.eject(&mut engine, &Key::from(1)).unwrap();
    assert_eq!(engine.store().resource("user").unwrap().len(), 0);
    assert_eq!(engine.store().resource("comment").unwrap().len(), 1);
}

#[test]
fn loaded_relations_stay_after_partial_failure() {
    let adapter = ScriptedAdapter::new();
    adapter.on_find_all("comment", vec![Record::new().with("id", 1).with("userId", 10)]);
    // No profile scripted: that fetch will fail.

    let mut engine = blog_engine(Arc::clone(&adapter));
    engine
        .store_mut()
        .inject(
            "user",
            Record::new().with("id", 10).with("name", "J").with("role", "r"),
        )
        .unwrap();

    assert!(
        engine
            .load_relations("user", &Key::from(10), &["comments", "profile"])
            .is_err()
    );

    let Related::Many(found) = engine
        .store()
        .related("user", &Key::from(10), "comments")
        .unwrap()
    else {
        panic!("expected linked comments");
    };
    assert_eq!(found.len(), 1);
}
