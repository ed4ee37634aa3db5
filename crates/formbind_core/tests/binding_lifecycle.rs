mod common;

use common::{edit, fixture, is_field_dirty, note, note_panel, value_of, Fixture};
use formbind_core::{
    BindingController, ConfigError, ControllerConfig, ControllerError, FieldSurface, FieldValue,
    MemoryStore, Record, RecordStore, SaveOutcome, ScriptedDialogs, StoreHandle,
};
use futures::executor::block_on;
use std::cell::Cell;
use std::rc::Rc;
use uuid::Uuid;

#[test]
fn disable_blanks_fields_and_drops_subscription() {
    let fx = fixture(ControllerConfig::default());
    let store = MemoryStore::new().into_handle();
    let record = note(Uuid::new_v4(), "Draft", "body", 4);
    store.add(record.clone());
    fx.controller
        .load(record, Some(store.clone() as StoreHandle))
        .unwrap();
    edit(&fx.panel, "title", "Unsaved");

    fx.controller.disable();

    assert!(fx.panel.is_disabled());
    assert!(!fx.panel.is_dirty());
    for name in ["title", "body", "size", "revision"] {
        assert_eq!(value_of(&fx.panel, name), FieldValue::Null);
    }
    assert!(fx.controller.loaded_record().is_none());
    assert!(fx.controller.attached_store().is_none());
    assert_eq!(store.write_listener_count(), 0);
}

#[test]
fn enable_allows_loading_again() {
    let fx = fixture(ControllerConfig::default());
    fx.controller.disable();
    assert!(matches!(
        fx.controller
            .load(note(Uuid::new_v4(), "Draft", "body", 1), None),
        Err(ControllerError::DisabledSurface)
    ));

    fx.controller.enable();
    fx.controller
        .load(note(Uuid::new_v4(), "Draft", "body", 1), None)
        .unwrap();

    assert!(!fx.panel.is_disabled());
    assert_eq!(value_of(&fx.panel, "title"), FieldValue::from("Draft"));
}

#[test]
fn reset_restores_loaded_values_and_keeps_binding() {
    let fx = fixture(ControllerConfig::default());
    let record = note(Uuid::new_v4(), "Draft", "body", 1);
    fx.controller.load(record.clone(), None).unwrap();
    let epoch = fx.controller.binding_epoch();
    edit(&fx.panel, "title", "Changed");
    edit(&fx.panel, "size", 10_i64);

    fx.controller.reset();

    assert_eq!(value_of(&fx.panel, "title"), FieldValue::from("Draft"));
    assert_eq!(value_of(&fx.panel, "size"), FieldValue::Int(1));
    assert!(!fx.controller.is_dirty());
    assert_eq!(fx.controller.binding_epoch(), epoch);
    assert_eq!(
        fx.controller.loaded_record().map(|loaded| loaded.id()),
        Some(record.id())
    );
}

#[test]
fn dirty_and_valid_follow_the_surface() {
    let fx = fixture(ControllerConfig::default());
    fx.controller
        .load(note(Uuid::new_v4(), "Draft", "body", 1), None)
        .unwrap();
    assert!(!fx.controller.is_dirty());
    assert!(fx.controller.is_valid());

    edit(&fx.panel, "title", "");

    assert!(fx.controller.is_dirty());
    assert!(!fx.controller.is_valid());
}

#[test]
fn update_on_change_mode_is_never_dirty() {
    let fx = fixture(ControllerConfig {
        update_on_change: true,
        ..ControllerConfig::default()
    });
    let record = note(Uuid::new_v4(), "Draft", "body", 1);
    fx.controller.load(record.clone(), None).unwrap();

    edit(&fx.panel, "body", "typed");

    assert!(fx.panel.is_dirty());
    assert!(!fx.controller.is_dirty());
    assert_eq!(record.get("body"), Some(FieldValue::from("typed")));
}

#[test]
fn on_add_focuses_first_matching_field() {
    let fx = fixture(ControllerConfig::default());
    assert!(fx.controller.on_add());
    assert_eq!(fx.panel.focused_field().as_deref(), Some("title"));

    let fx = fixture(ControllerConfig {
        focus_on_add_selector: Some("numberfield".to_string()),
        ..ControllerConfig::default()
    });
    assert!(fx.controller.on_add());
    assert_eq!(fx.panel.focused_field().as_deref(), Some("size"));
}

#[test]
fn on_add_without_target_does_nothing() {
    let fx = fixture(ControllerConfig {
        focus_on_add_selector: None,
        ..ControllerConfig::default()
    });
    assert!(!fx.controller.on_add());
    assert!(fx.panel.focused_field().is_none());

    let fx = fixture(ControllerConfig {
        focus_on_add_selector: Some("checkbox".to_string()),
        ..ControllerConfig::default()
    });
    assert!(!fx.controller.on_add());
    assert!(fx.panel.focused_field().is_none());
}

#[test]
fn invalid_focus_selector_fails_build() {
    let config = ControllerConfig {
        focus_on_add_selector: Some("button#save".to_string()),
        ..ControllerConfig::default()
    };
    let result = BindingController::builder(
        note_panel().into_handle(),
        Rc::new(ScriptedDialogs::default()),
    )
    .config(config)
    .build();

    assert!(matches!(
        result,
        Err(ControllerError::InvalidConfig(
            ConfigError::InvalidFocusSelector(_)
        ))
    ));
}

#[test]
fn store_write_refreshes_record_and_keeps_user_edits() {
    let fx = fixture(ControllerConfig::default());
    let store = MemoryStore::new().into_handle();
    let record = note(Uuid::new_v4(), "Draft", "body", 1);
    store.add(record.clone());
    fx.controller
        .load(record.clone(), Some(store.clone() as StoreHandle))
        .unwrap();
    let epoch = fx.controller.binding_epoch();
    edit(&fx.panel, "body", "typing in progress");

    record.set("title", FieldValue::from("Renamed elsewhere"));
    block_on(Rc::clone(&store).sync()).unwrap();

    assert_eq!(
        value_of(&fx.panel, "title"),
        FieldValue::from("Renamed elsewhere")
    );
    assert!(!is_field_dirty(&fx.panel, "title"));
    assert_eq!(
        value_of(&fx.panel, "body"),
        FieldValue::from("typing in progress")
    );
    assert!(is_field_dirty(&fx.panel, "body"));
    assert_eq!(fx.controller.binding_epoch(), epoch);
    assert_eq!(store.write_listener_count(), 1);
}

#[test]
fn writes_to_a_detached_store_are_ignored() {
    let fx = fixture(ControllerConfig::default());
    let old_store = MemoryStore::new().into_handle();
    let record = note(Uuid::new_v4(), "Draft", "body", 1);
    old_store.add(record.clone());
    fx.controller
        .load(record.clone(), Some(old_store.clone() as StoreHandle))
        .unwrap();
    fx.controller
        .load(note(Uuid::new_v4(), "Other", "other", 2), None)
        .unwrap();

    record.set("title", FieldValue::from("Renamed elsewhere"));
    block_on(Rc::clone(&old_store).sync()).unwrap();

    assert_eq!(value_of(&fx.panel, "title"), FieldValue::from("Other"));
}

#[test]
fn binding_epoch_tracks_identity_changes() {
    let fx = fixture(ControllerConfig::default());
    let store: StoreHandle = MemoryStore::new().into_handle();
    let other_store: StoreHandle = MemoryStore::new().into_handle();
    let record = note(Uuid::new_v4(), "Draft", "body", 1);

    fx.controller.load(record.clone(), Some(store.clone())).unwrap();
    let start = fx.controller.binding_epoch();

    fx.controller.load(record.clone(), Some(store.clone())).unwrap();
    assert_eq!(fx.controller.binding_epoch(), start);

    fx.controller.load(record.clone(), Some(other_store)).unwrap();
    assert_eq!(fx.controller.binding_epoch(), start + 1);

    fx.controller
        .load(note(Uuid::new_v4(), "Other", "body", 1), Some(store))
        .unwrap();
    assert_eq!(fx.controller.binding_epoch(), start + 2);

    fx.controller.disable();
    assert_eq!(fx.controller.binding_epoch(), start + 3);
}

#[test]
fn removed_save_success_listener_is_not_called() {
    let fx = fixture(ControllerConfig::default());
    let store = MemoryStore::new().into_handle();
    let record = note(Uuid::new_v4(), "Draft", "body", 1);
    store.add(record.clone());
    fx.controller
        .load(record, Some(store.clone() as StoreHandle))
        .unwrap();

    let removed_calls = Rc::new(Cell::new(0));
    let kept_calls = Rc::new(Cell::new(0));
    let removed = {
        let calls = Rc::clone(&removed_calls);
        fx.controller
            .on_save_success(move |_| calls.set(calls.get() + 1))
    };
    {
        let calls = Rc::clone(&kept_calls);
        fx.controller
            .on_save_success(move |_| calls.set(calls.get() + 1));
    }
    assert!(fx.controller.remove_save_success_listener(removed));
    assert!(!fx.controller.remove_save_success_listener(removed));

    edit(&fx.panel, "title", "Edited");
    let outcome = block_on(fx.controller.on_save_click()).unwrap();

    assert_eq!(outcome, SaveOutcome::Synced);
    assert_eq!(removed_calls.get(), 0);
    assert_eq!(kept_calls.get(), 1);
}

#[test]
fn dropping_controller_cancels_store_subscription() {
    let Fixture {
        panel, controller, ..
    } = fixture(ControllerConfig::default());
    let store = MemoryStore::new().into_handle();
    let record = note(Uuid::new_v4(), "Draft", "body", 1);
    store.add(record.clone());
    controller
        .load(record.clone(), Some(store.clone() as StoreHandle))
        .unwrap();
    assert_eq!(store.write_listener_count(), 1);

    drop(controller);

    assert_eq!(store.write_listener_count(), 0);
    record.set("title", FieldValue::from("Renamed elsewhere"));
    block_on(Rc::clone(&store).sync()).unwrap();
    assert_eq!(value_of(&panel, "title"), FieldValue::from("Draft"));
}
