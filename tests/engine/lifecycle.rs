//! Integration tests for the lifecycle pipelines.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use relic_engine::{Engine, SaveOptions};
use relic_foundation::{Error, ErrorKind, Key, Record, Value};
use relic_schema::{HookSet, HookStage, ResourceDefinition};

use crate::support::ScriptedAdapter;

fn trail_hooks(trail: &Rc<RefCell<Vec<&'static str>>>) -> HookSet {
    let mut hooks = HookSet::new();
    for (stage, label) in [
        (HookStage::BeforeValidate, "beforeValidate"),
        (HookStage::Validate, "validate"),
        (HookStage::AfterValidate, "afterValidate"),
        (HookStage::BeforeCreate, "beforeCreate"),
        (HookStage::AfterCreate, "afterCreate"),
        (HookStage::BeforeInject, "beforeInject"),
        (HookStage::AfterInject, "afterInject"),
    ] {
        let trail = Rc::clone(trail);
        hooks = hooks.on(stage, move |_, attrs| {
            trail.borrow_mut().push(label);
            Ok(attrs.clone())
        });
    }
    hooks
}

#[test]
fn create_runs_hooks_in_pipeline_order() {
    let trail = Rc::new(RefCell::new(Vec::new()));
    let adapter = ScriptedAdapter::new();

    let mut engine = Engine::new(adapter);
    engine
        .register(ResourceDefinition::new("user").with_hooks(trail_hooks(&trail)))
        .unwrap();

    engine.create("user", Record::new().with("name", "John")).unwrap();

    assert_eq!(
        &*trail.borrow(),
        &[
            "beforeValidate",
            "validate",
            "afterValidate",
            "beforeCreate",
            "afterCreate",
            "beforeInject",
            "afterInject",
        ]
    );
}

#[test]
fn hooks_transform_attrs_through_the_pipeline() {
    let adapter = ScriptedAdapter::new();
    let mut engine = Engine::new(adapter);
    engine
        .register(
            ResourceDefinition::new("user").with_hooks(
                HookSet::new()
                    .on(HookStage::BeforeCreate, |_, attrs| {
                        let mut attrs = attrs.clone();
                        attrs.set("normalized", true);
                        Ok(attrs)
                    })
                    .on(HookStage::AfterCreate, |_, attrs| {
                        let mut attrs = attrs.clone();
                        attrs.set("post_processed", true);
                        Ok(attrs)
                    }),
            ),
        )
        .unwrap();

    let created = engine.create("user", Record::new().with("id", 1)).unwrap();
    assert_eq!(created.get("normalized"), Some(&Value::Bool(true)));
    assert_eq!(created.get("post_processed"), Some(&Value::Bool(true)));
}

#[test]
fn validation_failure_stops_everything() {
    let adapter = ScriptedAdapter::new();
    let mut engine = Engine::new(adapter.clone());
    engine
        .register(
            ResourceDefinition::new("user").with_hooks(HookSet::new().on(
                HookStage::Validate,
                |resource, _| Err(Error::validation_failed(resource, "name required")),
            )),
        )
        .unwrap();

    let err = engine.create("user", Record::new().with("id", 7)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ValidationFailed { .. }));
    assert_eq!(adapter.call_count(), 0);
    assert!(engine.store_mut().get("user", &Key::from(7)).unwrap().is_none());
}

#[test]
fn adapter_create_failure_leaves_store_unchanged() {
    let adapter = ScriptedAdapter::new();
    *adapter.fail_creates.borrow_mut() = true;
    let mut engine = Engine::new(adapter.clone());
    engine.register("user").unwrap();

    let err = engine.create("user", Record::new().with("id", 7)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Adapter(_)));
    assert!(engine.store_mut().get("user", &Key::from(7)).unwrap().is_none());
}

#[test]
fn after_create_failure_leaves_remote_committed_but_store_empty() {
    let adapter = ScriptedAdapter::new();
    let mut engine = Engine::new(adapter.clone());
    engine
        .register(
            ResourceDefinition::new("user").with_hooks(HookSet::new().on(
                HookStage::AfterCreate,
                |_, _| Err(Error::internal("afterCreate exploded")),
            )),
        )
        .unwrap();

    let err = engine.create("user", Record::new().with("id", 7)).unwrap_err();
    match err.kind {
        ErrorKind::HookFailed { hook, .. } => assert_eq!(hook, "afterCreate"),
        other => panic!("unexpected error kind: {other:?}"),
    }
    // The adapter write happened and is not rolled back.
    assert_eq!(adapter.calls(), vec!["create:user"]);
    assert!(engine.store_mut().get("user", &Key::from(7)).unwrap().is_none());
}

#[test]
fn update_stamps_the_key_when_adapter_omits_it() {
    let adapter = ScriptedAdapter::new();
    let mut engine = Engine::new(adapter);
    engine.register("user").unwrap();
    engine
        .store_mut()
        .inject("user", Record::new().with("id", 1).with("name", "John"))
        .unwrap();

    let updated = engine
        .update("user", &Key::from(1), Record::new().with("name", "Fred"))
        .unwrap();
    assert_eq!(updated.get("id"), Some(&Value::Int(1)));
    assert_eq!(updated.get("name"), Some(&Value::from("Fred")));
}

#[test]
fn save_requires_a_stored_record() {
    let adapter = ScriptedAdapter::new();
    let mut engine = Engine::new(adapter);
    engine.register("user").unwrap();

    let err = engine
        .save("user", &Key::from(1), &SaveOptions::default())
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::RecordNotFound { .. }));
}

#[test]
fn destroy_pipeline_ejects_only_after_adapter_success() {
    let adapter = ScriptedAdapter::new();
    let mut engine = Engine::new(adapter.clone());
    engine.register("user").unwrap();
    engine
        .store_mut()
        .inject("user", Record::new().with("id", 1))
        .unwrap();

    // Failing remote delete: the record stays.
    *adapter.fail_destroys.borrow_mut() = true;
    assert!(engine.destroy("user", &Key::from(1)).is_err());
    assert!(engine.store_mut().get("user", &Key::from(1)).unwrap().is_some());

    // Succeeding remote delete: the record goes.
    *adapter.fail_destroys.borrow_mut() = false;
    let removed = engine.destroy("user", &Key::from(1)).unwrap();
    assert!(removed.is_some());
    assert!(engine.store_mut().get("user", &Key::from(1)).unwrap().is_none());
}

#[test]
fn after_destroy_failure_keeps_the_record_stored() {
    let adapter = ScriptedAdapter::new();
    let mut engine = Engine::new(adapter.clone());
    engine
        .register(
            ResourceDefinition::new("user").with_hooks(HookSet::new().on(
                HookStage::AfterDestroy,
                |_, _| Err(Error::internal("cleanup failed")),
            )),
        )
        .unwrap();
    engine
        .store_mut()
        .inject("user", Record::new().with("id", 1))
        .unwrap();

    let err = engine.destroy("user", &Key::from(1)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::HookFailed { .. }));
    // Remote delete committed, store still holds the record: the
    // documented no-rollback gap.
    assert_eq!(adapter.calls(), vec!["destroy:user:1"]);
    assert!(engine.store_mut().get("user", &Key::from(1)).unwrap().is_some());
}
