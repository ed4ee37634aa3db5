//! Binding controller: one form surface bound to one record.
//!
//! # Responsibility
//! - Load records into the surface, keeping user edits on same-record
//!   refreshes.
//! - Run validation- and permission-gated save/submit/delete gestures.
//! - Refresh the bound record when its store reports a completed write.
//!
//! # Invariants
//! - Surface values are written inside one layout batch per load/disable.
//! - The bound record is assigned before any field value is written.
//! - At most one store write subscription is active; it is cancelled before
//!   a new one is installed, even for the same store.
//! - Gesture continuations started under an older binding epoch never
//!   touch the current binding; current ones act on the instance bound now.
//! - No `RefCell` borrow of the binding state is held across a collaborator
//!   call or an `.await`.

use crate::config::ControllerConfig;
use crate::controller::error::{ControllerError, ControllerResult};
use crate::controller::state::{BindingState, BindingTicket, Subscription};
use crate::gate::{AllowAll, ConfirmResponse, Dialogs, GateDenial, PermissionGate};
use crate::model::record::{RecordHandle, RecordId};
use crate::model::value::FieldValue;
use crate::store::{ListenerId, Listeners, PersistenceError, StoreHandle};
use crate::surface::{
    FieldKind, FieldSelector, FieldSurface, LayoutBatch, QueryMode, SelectionSource,
    SurfaceHandle,
};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Result of a save or submit gesture that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Store sync succeeded and `savesuccess` fired.
    Synced,
    /// Edits were committed into the record; auto-sync is off, so
    /// persisting is left to the caller.
    Committed,
    /// Record save succeeded, `savesuccess` fired and, without a store, the
    /// record was reloaded.
    Submitted,
    /// The form is invalid; nothing was asked or written.
    Blocked,
    /// The permission gate refused.
    Denied(GateDenial),
    /// The binding changed while the gesture was suspended.
    Superseded,
}

/// Result of a delete gesture that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed from the store and synced.
    Synced,
    /// Removed from the store without sync (auto-sync off).
    Removed,
    /// Destroyed directly and the form disabled (no store).
    Destroyed,
    /// The user declined the confirmation prompt.
    Cancelled,
    Denied(GateDenial),
    Superseded,
}

type SuccessCallback = Box<dyn FnOnce()>;
type FailureCallback = Box<dyn FnOnce(&PersistenceError)>;

/// Caller callbacks for `validate_and_submit`.
///
/// Closures carry their own scope.
#[derive(Default)]
pub struct SubmitOptions {
    success: Option<SuccessCallback>,
    failure: Option<FailureCallback>,
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.success = Some(Box::new(callback));
        self
    }

    pub fn on_failure(mut self, callback: impl FnOnce(&PersistenceError) + 'static) -> Self {
        self.failure = Some(Box::new(callback));
        self
    }
}

type SaveSuccessListener = dyn Fn(Option<&RecordHandle>);

struct Inner {
    surface: SurfaceHandle,
    gate: Rc<dyn PermissionGate>,
    dialogs: Rc<dyn Dialogs>,
    config: ControllerConfig,
    focus_selector: Option<FieldSelector>,
    state: RefCell<BindingState>,
    save_success: Listeners<SaveSuccessListener>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(subscription) = self.state.get_mut().subscription.take() {
            subscription.cancel();
        }
    }
}

/// Builder for `BindingController`.
pub struct BindingControllerBuilder {
    surface: SurfaceHandle,
    dialogs: Rc<dyn Dialogs>,
    gate: Rc<dyn PermissionGate>,
    config: ControllerConfig,
}

impl BindingControllerBuilder {
    pub fn gate(mut self, gate: Rc<dyn PermissionGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and wires change tracking.
    pub fn build(self) -> ControllerResult<BindingController> {
        let focus_selector = self.config.focus_selector().map_err(|err| {
            error!("event=binding_init module=controller status=error error_code=invalid_config error={err}");
            err
        })?;

        let controller = BindingController {
            inner: Rc::new(Inner {
                surface: self.surface,
                gate: self.gate,
                dialogs: self.dialogs,
                config: self.config,
                focus_selector,
                state: RefCell::new(BindingState::default()),
                save_success: Listeners::new(),
            }),
        };

        if controller.inner.config.update_on_change {
            controller.track_field_changes();
        }
        info!(
            "event=binding_init module=controller status=ok update_on_change={} auto_sync={}",
            controller.inner.config.update_on_change, controller.inner.config.auto_sync
        );
        Ok(controller)
    }
}

/// Lifecycle controller binding one form surface to one record.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct BindingController {
    inner: Rc<Inner>,
}

impl BindingController {
    /// Starts a builder with the default config and an `AllowAll` gate.
    pub fn builder(surface: SurfaceHandle, dialogs: Rc<dyn Dialogs>) -> BindingControllerBuilder {
        BindingControllerBuilder {
            surface,
            dialogs,
            gate: Rc::new(AllowAll),
            config: ControllerConfig::default(),
        }
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Binds `record` to the surface and optionally attaches `store`, whose
    /// write notifications refresh this record.
    ///
    /// Reloading a record with the bound record's id keeps every dirty
    /// field's value; everything else is overwritten and made clean.
    ///
    /// # Errors
    /// - `DisabledSurface` when the surface is disabled; nothing changes.
    pub fn load(&self, record: RecordHandle, store: Option<StoreHandle>) -> ControllerResult<()> {
        let surface = &self.inner.surface;
        if surface.is_disabled() {
            error!(
                "event=binding_load module=controller status=error error_code=surface_disabled record_id={}",
                record.id()
            );
            return Err(ControllerError::DisabledSurface);
        }

        self.replace_subscription(store.as_ref(), record.id());

        if self.inner.config.auto_load_combo_box_stores {
            self.prefetch_selection_sources(&record);
        }

        let keep_dirty_values = self
            .inner
            .state
            .borrow_mut()
            .bind(&record, store.as_ref());

        let mut applied = 0_usize;
        let mut preserved = 0_usize;
        {
            let _batch = LayoutBatch::new(surface.as_ref());
            for name in record.field_names() {
                let Some(value) = record.get(&name) else {
                    continue;
                };
                let Some(field) = surface.find_field(&name) else {
                    continue;
                };
                if keep_dirty_values && field.is_dirty() {
                    preserved += 1;
                    continue;
                }
                field.set_value(value);
                field.reset_original_value();
                applied += 1;
            }
        }

        info!(
            "event=binding_load module=controller status=ok record_id={} same_record={} store={} applied={} preserved={}",
            record.id(),
            keep_dirty_values,
            store.is_some(),
            applied,
            preserved
        );
        Ok(())
    }

    /// Commits field values into the bound record and makes them the new
    /// baselines. No-op without a bound record.
    pub fn save(&self) {
        let Some(record) = self.loaded_record() else {
            return;
        };
        let committed = self.update_record(&record);

        let surface = &self.inner.surface;
        for name in record.field_names() {
            if let Some(field) = surface.find_field(&name) {
                field.reset_original_value();
            }
        }
        debug!(
            "event=binding_save module=controller status=ok record_id={} committed={committed}",
            record.id()
        );
    }

    /// Save gesture: validate, consult the gate, then persist through the
    /// attached store or, without one, through the record itself.
    ///
    /// # Errors
    /// - `MissingStore` when auto-sync is off and no store is attached.
    /// - `Persistence` when the store sync or record save fails.
    pub async fn on_save_click(&self) -> ControllerResult<SaveOutcome> {
        let ticket = self.ticket();
        let auto_sync = self.inner.config.auto_sync;
        if ticket.store.is_none() && !auto_sync {
            error!("event=binding_save module=controller status=error error_code=missing_store");
            return Err(ControllerError::MissingStore { operation: "save" });
        }

        if let Some(outcome) = self.gate_save(&ticket).await {
            return Ok(outcome);
        }

        let Some(store) = ticket.store.clone() else {
            return self.submit_after_gate(&ticket, SubmitOptions::default()).await;
        };

        self.save();
        if !auto_sync {
            return Ok(SaveOutcome::Committed);
        }

        if let Err(err) = Rc::clone(&store).sync().await {
            warn!("event=binding_save module=controller status=error error_code=store_sync_failed error={err}");
            return Err(err.into());
        }
        if !self.is_current(&ticket) {
            self.discard("save", &ticket);
            return Ok(SaveOutcome::Superseded);
        }
        self.emit_save_success(None);
        info!("event=binding_save module=controller status=ok mode=store_sync");
        Ok(SaveOutcome::Synced)
    }

    /// Validates, consults the gate, commits edits and saves the record
    /// through its own transport.
    ///
    /// On success fires `savesuccess`, reloads the record when no store is
    /// attached, then calls `options` success. On failure calls `options`
    /// failure and returns the error.
    pub async fn validate_and_submit(&self, options: SubmitOptions) -> ControllerResult<SaveOutcome> {
        let ticket = self.ticket();
        if ticket.record.is_none() {
            error!("event=binding_submit module=controller status=error error_code=no_record");
            return Err(ControllerError::NoRecordLoaded { operation: "submit" });
        }
        if let Some(outcome) = self.gate_save(&ticket).await {
            return Ok(outcome);
        }
        self.submit_after_gate(&ticket, options).await
    }

    /// Delete gesture.
    ///
    /// With auto-sync the user confirms first, then the record is removed
    /// from the store and synced, or destroyed directly (and the form
    /// disabled) when no store is attached. Without auto-sync the record is
    /// only removed from the store.
    pub async fn on_delete_click(&self) -> ControllerResult<DeleteOutcome> {
        let ticket = self.ticket();
        let auto_sync = self.inner.config.auto_sync;
        if ticket.record.is_none() {
            error!("event=binding_delete module=controller status=error error_code=no_record");
            return Err(ControllerError::NoRecordLoaded { operation: "delete" });
        }
        if ticket.store.is_none() && !auto_sync {
            error!("event=binding_delete module=controller status=error error_code=missing_store");
            return Err(ControllerError::MissingStore { operation: "delete" });
        }

        let permission = self.inner.gate.allow_delete();
        if let Err(denial) = permission.await {
            info!("event=binding_delete module=controller status=denied reason={denial}");
            return Ok(DeleteOutcome::Denied(denial));
        }
        if !self.is_current(&ticket) {
            self.discard("delete", &ticket);
            return Ok(DeleteOutcome::Superseded);
        }

        if !auto_sync {
            let Some(record) = self.loaded_record() else {
                return Err(ControllerError::NoRecordLoaded { operation: "delete" });
            };
            let Some(store) = ticket.store.as_ref() else {
                return Err(ControllerError::MissingStore { operation: "delete" });
            };
            store.remove(&record);
            info!(
                "event=binding_delete module=controller status=ok mode=store_remove record_id={}",
                record.id()
            );
            return Ok(DeleteOutcome::Removed);
        }

        let config = &self.inner.config;
        let answer = self
            .inner
            .dialogs
            .confirm(&config.delete_confirm_title, &config.delete_confirm_text);
        if answer.await != ConfirmResponse::Yes {
            return Ok(DeleteOutcome::Cancelled);
        }
        if !self.is_current(&ticket) {
            self.discard("delete", &ticket);
            return Ok(DeleteOutcome::Superseded);
        }
        let Some(record) = self.loaded_record() else {
            return Err(ControllerError::NoRecordLoaded { operation: "delete" });
        };

        match ticket.store.clone() {
            Some(store) => {
                store.remove(&record);
                Rc::clone(&store).sync().await?;
                info!(
                    "event=binding_delete module=controller status=ok mode=store_sync record_id={}",
                    record.id()
                );
                Ok(DeleteOutcome::Synced)
            }
            None => {
                let pending = Rc::clone(&record).destroy();
                self.disable();
                pending.await?;
                info!(
                    "event=binding_delete module=controller status=ok mode=destroy record_id={}",
                    record.id()
                );
                Ok(DeleteOutcome::Destroyed)
            }
        }
    }

    /// Restores every field to its last baseline; the binding is unchanged.
    pub fn reset(&self) {
        self.inner.surface.reset();
    }

    /// Always `false` with `update_on_change`, since edits reach the record
    /// immediately.
    pub fn is_dirty(&self) -> bool {
        if self.inner.config.update_on_change {
            return false;
        }
        self.inner.surface.is_dirty()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.surface.is_valid()
    }

    /// Re-enables the surface; a later `load` is needed to populate it.
    pub fn enable(&self) {
        self.inner.surface.set_disabled(false);
    }

    /// Unbinds the record and store, blanks every field with a clean
    /// baseline and disables the surface.
    pub fn disable(&self) {
        let subscription = self.inner.state.borrow_mut().unbind();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }

        let surface = &self.inner.surface;
        {
            let _batch = LayoutBatch::new(surface.as_ref());
            for field in surface.query(&FieldSelector::all()) {
                field.set_value(FieldValue::Null);
                field.reset_original_value();
            }
        }
        surface.set_disabled(true);
        info!("event=binding_disable module=controller status=ok");
    }

    /// Focuses the configured add target; returns whether one was found.
    pub fn on_add(&self) -> bool {
        let Some(selector) = self.inner.focus_selector.as_ref() else {
            return false;
        };
        self.inner
            .surface
            .down(selector)
            .is_some_and(|field| field.focus())
    }

    pub fn loaded_record(&self) -> Option<RecordHandle> {
        self.inner.state.borrow().record.clone()
    }

    pub fn attached_store(&self) -> Option<StoreHandle> {
        self.inner.state.borrow().store.clone()
    }

    pub fn panel(&self) -> SurfaceHandle {
        Rc::clone(&self.inner.surface)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Current binding epoch; changes whenever the bound identity changes.
    pub fn binding_epoch(&self) -> u64 {
        self.inner.state.borrow().epoch
    }

    /// Subscribes to `savesuccess`. The record is passed on the submit path
    /// and omitted on the store-sync path.
    pub fn on_save_success(&self, listener: impl Fn(Option<&RecordHandle>) + 'static) -> ListenerId {
        self.inner.save_success.subscribe(Rc::new(listener))
    }

    pub fn remove_save_success_listener(&self, id: ListenerId) -> bool {
        self.inner.save_success.unsubscribe(id)
    }

    fn ticket(&self) -> BindingTicket {
        self.inner.state.borrow().ticket()
    }

    fn is_current(&self, ticket: &BindingTicket) -> bool {
        self.inner.state.borrow().epoch == ticket.epoch
    }

    fn discard(&self, gesture: &str, ticket: &BindingTicket) {
        info!(
            "event=continuation_discarded module=controller status=superseded gesture={gesture} started_epoch={} current_epoch={}",
            ticket.epoch,
            self.binding_epoch()
        );
    }

    /// Local validation then the permission gate. `None` means proceed.
    async fn gate_save(&self, ticket: &BindingTicket) -> Option<SaveOutcome> {
        if !self.is_valid() {
            let config = &self.inner.config;
            self.inner
                .dialogs
                .alert(&config.save_validate_error_title, &config.save_validate_error_msg);
            info!("event=binding_save module=controller status=blocked reason=invalid_form");
            return Some(SaveOutcome::Blocked);
        }

        let permission = self.inner.gate.allow_save();
        if let Err(denial) = permission.await {
            info!("event=binding_save module=controller status=denied reason={denial}");
            return Some(SaveOutcome::Denied(denial));
        }
        if !self.is_current(ticket) {
            self.discard("save", ticket);
            return Some(SaveOutcome::Superseded);
        }
        None
    }

    async fn submit_after_gate(
        &self,
        ticket: &BindingTicket,
        options: SubmitOptions,
    ) -> ControllerResult<SaveOutcome> {
        // A same-id refresh may have bound a newer instance during the gate.
        let Some(record) = self.loaded_record().or_else(|| ticket.record.clone()) else {
            error!("event=binding_submit module=controller status=error error_code=no_record");
            return Err(ControllerError::NoRecordLoaded { operation: "submit" });
        };

        self.save();
        let result = Rc::clone(&record).save().await;

        if let Err(err) = result {
            warn!(
                "event=binding_submit module=controller status=error error_code=record_save_failed record_id={} error={err}",
                record.id()
            );
            if let Some(failure) = options.failure {
                failure(&err);
            }
            return Err(err.into());
        }
        if !self.is_current(ticket) {
            self.discard("submit", ticket);
            return Ok(SaveOutcome::Superseded);
        }

        self.emit_save_success(Some(&record));
        if ticket.store.is_none() {
            let bound = self.loaded_record().unwrap_or_else(|| Rc::clone(&record));
            self.load(bound, None)?;
        }
        if let Some(success) = options.success {
            success();
        }
        info!(
            "event=binding_submit module=controller status=ok record_id={}",
            record.id()
        );
        Ok(SaveOutcome::Submitted)
    }

    /// Writes field values into `record`; returns how many fields changed.
    fn update_record(&self, record: &RecordHandle) -> usize {
        let surface = &self.inner.surface;
        record
            .field_names()
            .iter()
            .filter_map(|name| surface.find_field(name))
            .filter(|field| field.kind() != FieldKind::Display)
            .filter(|field| record.set(field.name(), field.value()))
            .count()
    }

    fn emit_save_success(&self, record: Option<&RecordHandle>) {
        for listener in self.inner.save_success.snapshot() {
            listener(record);
        }
    }

    fn replace_subscription(&self, store: Option<&StoreHandle>, record_id: RecordId) {
        let previous = self.inner.state.borrow_mut().subscription.take();
        if let Some(previous) = previous {
            previous.cancel();
        }
        let Some(store) = store else {
            return;
        };

        let weak = Rc::downgrade(&self.inner);
        let listener = store.on_write(Rc::new(move || {
            if let Some(controller) = BindingController::from_weak(&weak) {
                controller.on_store_write(record_id);
            }
        }));
        self.inner.state.borrow_mut().subscription = Some(Subscription {
            store: Rc::clone(store),
            listener,
            record_id,
        });
    }

    fn on_store_write(&self, record_id: RecordId) {
        let (record, store) = {
            let state = self.inner.state.borrow();
            (state.record.clone(), state.store.clone())
        };
        let Some(record) = record.filter(|record| record.id() == record_id) else {
            return;
        };
        debug!("event=store_write_refresh module=controller status=start record_id={record_id}");
        if let Err(err) = self.load(record, store) {
            warn!("event=store_write_refresh module=controller status=error record_id={record_id} error={err}");
        }
    }

    fn prefetch_selection_sources(&self, record: &RecordHandle) {
        let surface = &self.inner.surface;
        for field in surface.query(&FieldSelector::of_kind(FieldKind::ComboBox)) {
            let name = field.name();
            if name.is_empty() || field.query_mode() != QueryMode::Remote {
                continue;
            }
            if matches!(record.get(name), Some(FieldValue::Null)) {
                continue;
            }
            if let Some(source) = field.selection_source() {
                prefetch(name, source.as_ref());
            }
        }
        for field in surface.query(&FieldSelector::of_kind(FieldKind::MultiSelect)) {
            if let Some(source) = field.selection_source() {
                prefetch(field.name(), source.as_ref());
            }
        }
    }

    fn track_field_changes(&self) {
        for field in self.inner.surface.query(&FieldSelector::all()) {
            let weak = Rc::downgrade(&self.inner);
            field.on_change(Rc::new(move |name: &str| {
                if let Some(controller) = BindingController::from_weak(&weak) {
                    controller.commit_field(name);
                }
            }));
        }
    }

    /// Writes one changed field into the bound record.
    fn commit_field(&self, name: &str) {
        let Some(record) = self.loaded_record() else {
            return;
        };
        if let Some(field) = self.inner.surface.find_field(name) {
            if field.kind() != FieldKind::Display {
                record.set(name, field.value());
            }
        }
    }
}

fn prefetch(field_name: &str, source: &dyn SelectionSource) {
    if source.is_loaded() {
        return;
    }
    if let Err(err) = source.load() {
        warn!("event=selection_prefetch module=controller status=error field={field_name} error={err}");
    }
}
