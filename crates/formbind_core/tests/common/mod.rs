#![allow(dead_code)]

use formbind_core::{
    BindingController, ConfirmResponse, ControllerConfig, DataRecord, Field, FieldValue,
    FormField, FormPanel, GateDenial, GateFuture, PermissionGate, PersistenceError,
    PersistenceResult, Record, RecordHandle, RecordId, RecordProxy, ScriptedDialogs,
};
use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use uuid::Uuid;

pub const NOTE_FIELDS: [&str; 4] = ["title", "body", "size", "revision"];

pub struct Fixture {
    pub panel: Rc<FormPanel>,
    pub dialogs: Rc<ScriptedDialogs>,
    pub controller: BindingController,
}

pub fn note_panel() -> FormPanel {
    FormPanel::new()
        .with_field(FormField::text("title").required())
        .with_field(FormField::text("body"))
        .with_field(FormField::number("size"))
        .with_field(FormField::display("revision"))
}

pub fn fixture(config: ControllerConfig) -> Fixture {
    build_fixture(config, None)
}

pub fn fixture_with_gate(config: ControllerConfig, gate: Rc<dyn PermissionGate>) -> Fixture {
    build_fixture(config, Some(gate))
}

fn build_fixture(config: ControllerConfig, gate: Option<Rc<dyn PermissionGate>>) -> Fixture {
    let panel = note_panel().into_handle();
    let dialogs = Rc::new(ScriptedDialogs::answering(ConfirmResponse::Yes));
    let mut builder = BindingController::builder(panel.clone(), dialogs.clone()).config(config);
    if let Some(gate) = gate {
        builder = builder.gate(gate);
    }
    let controller = builder.build().expect("controller should build");
    Fixture {
        panel,
        dialogs,
        controller,
    }
}

pub fn note_data(id: RecordId, title: &str, body: &str, size: i64) -> DataRecord {
    DataRecord::with_id(id, NOTE_FIELDS)
        .with_value("title", title)
        .with_value("body", body)
        .with_value("size", size)
}

pub fn note(id: RecordId, title: &str, body: &str, size: i64) -> RecordHandle {
    note_data(id, title, body, size).into_handle()
}

pub fn new_note(title: &str) -> RecordHandle {
    note(Uuid::new_v4(), title, "", 0)
}

pub fn edit(panel: &FormPanel, name: &str, value: impl Into<FieldValue>) {
    panel
        .field(name)
        .unwrap_or_else(|| panic!("field {name} should exist"))
        .set_value(value.into());
}

pub fn value_of(panel: &FormPanel, name: &str) -> FieldValue {
    panel
        .field(name)
        .unwrap_or_else(|| panic!("field {name} should exist"))
        .value()
}

pub fn is_field_dirty(panel: &FormPanel, name: &str) -> bool {
    panel
        .field(name)
        .unwrap_or_else(|| panic!("field {name} should exist"))
        .is_dirty()
}

/// Gate that allows everything and counts calls.
#[derive(Default)]
pub struct CountingGate {
    pub save_calls: Cell<usize>,
    pub delete_calls: Cell<usize>,
}

impl PermissionGate for CountingGate {
    fn allow_save(&self) -> GateFuture {
        self.save_calls.set(self.save_calls.get() + 1);
        future::ready(Ok(())).boxed_local()
    }

    fn allow_delete(&self) -> GateFuture {
        self.delete_calls.set(self.delete_calls.get() + 1);
        future::ready(Ok(())).boxed_local()
    }
}

/// Gate whose answers are supplied later by the test.
#[derive(Default)]
pub struct DeferredGate {
    saves: RefCell<VecDeque<oneshot::Sender<Result<(), GateDenial>>>>,
    deletes: RefCell<VecDeque<oneshot::Sender<Result<(), GateDenial>>>>,
}

impl DeferredGate {
    pub fn pending_saves(&self) -> usize {
        self.saves.borrow().len()
    }

    pub fn pending_deletes(&self) -> usize {
        self.deletes.borrow().len()
    }

    pub fn resolve_save(&self, answer: Result<(), GateDenial>) {
        let sender = self
            .saves
            .borrow_mut()
            .pop_front()
            .expect("a save answer should be pending");
        sender.send(answer).expect("gesture should still be waiting");
    }

    pub fn resolve_delete(&self, answer: Result<(), GateDenial>) {
        let sender = self
            .deletes
            .borrow_mut()
            .pop_front()
            .expect("a delete answer should be pending");
        sender.send(answer).expect("gesture should still be waiting");
    }

    fn defer(queue: &RefCell<VecDeque<oneshot::Sender<Result<(), GateDenial>>>>) -> GateFuture {
        let (sender, receiver) = oneshot::channel();
        queue.borrow_mut().push_back(sender);
        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(GateDenial::Refused("gate dropped".to_string())))
        }
        .boxed_local()
    }
}

impl PermissionGate for DeferredGate {
    fn allow_save(&self) -> GateFuture {
        Self::defer(&self.saves)
    }

    fn allow_delete(&self) -> GateFuture {
        Self::defer(&self.deletes)
    }
}

/// Record transport that counts calls and can be told to fail.
#[derive(Default)]
pub struct CountingProxy {
    pub saves: Cell<usize>,
    pub destroys: Cell<usize>,
    pub fail_with: RefCell<Option<String>>,
}

impl CountingProxy {
    pub fn failing(reason: &str) -> Self {
        let proxy = Self::default();
        *proxy.fail_with.borrow_mut() = Some(reason.to_string());
        proxy
    }

    fn answer(&self) -> PersistenceResult<()> {
        match self.fail_with.borrow().as_ref() {
            Some(reason) => Err(PersistenceError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }
}

impl RecordProxy for CountingProxy {
    fn save(&self, record: RecordHandle) -> LocalBoxFuture<'static, PersistenceResult<()>> {
        self.saves.set(self.saves.get() + 1);
        let result = self.answer();
        if result.is_ok() {
            record.commit();
        }
        future::ready(result).boxed_local()
    }

    fn destroy(&self, _record: RecordHandle) -> LocalBoxFuture<'static, PersistenceResult<()>> {
        self.destroys.set(self.destroys.get() + 1);
        future::ready(self.answer()).boxed_local()
    }
}
