//! Controller binding state and continuation tickets.
//!
//! # Invariants
//! - At most one write subscription exists; it always belongs to `store`.
//! - `epoch` changes whenever the bound identity changes (record id, store
//!   instance, or unbinding) and never on a same-record, same-store refresh.

use crate::model::record::{RecordHandle, RecordId};
use crate::store::{ListenerId, StoreHandle};
use std::rc::Rc;

/// Active write-notification link.
pub(crate) struct Subscription {
    pub(crate) store: StoreHandle,
    pub(crate) listener: ListenerId,
    pub(crate) record_id: RecordId,
}

impl Subscription {
    pub(crate) fn cancel(self) {
        self.store.un_write(self.listener);
    }
}

#[derive(Default)]
pub(crate) struct BindingState {
    pub(crate) record: Option<RecordHandle>,
    pub(crate) store: Option<StoreHandle>,
    pub(crate) subscription: Option<Subscription>,
    pub(crate) epoch: u64,
}

impl BindingState {
    /// Rebinds to `record`/`store`; returns whether this refreshes the same
    /// logical record.
    pub(crate) fn bind(&mut self, record: &RecordHandle, store: Option<&StoreHandle>) -> bool {
        let same_record = self
            .record
            .as_ref()
            .is_some_and(|current| current.id() == record.id());
        let same_store = match (self.store.as_ref(), store) {
            (Some(current), Some(next)) => {
                std::ptr::addr_eq(Rc::as_ptr(current), Rc::as_ptr(next))
            }
            (None, None) => true,
            _ => false,
        };
        if !(same_record && same_store) {
            self.epoch += 1;
        }
        self.record = Some(Rc::clone(record));
        self.store = store.cloned();
        same_record
    }

    /// Drops the binding; the caller cancels the returned subscription.
    pub(crate) fn unbind(&mut self) -> Option<Subscription> {
        self.epoch += 1;
        self.record = None;
        self.store = None;
        self.subscription.take()
    }

    pub(crate) fn ticket(&self) -> BindingTicket {
        BindingTicket {
            epoch: self.epoch,
            record: self.record.clone(),
            store: self.store.clone(),
        }
    }
}

/// Binding snapshot taken when a gesture starts.
///
/// Continuations resuming after a suspension compare `epoch` with the
/// controller's current one and drop their effects on mismatch.
#[derive(Clone)]
pub(crate) struct BindingTicket {
    pub(crate) epoch: u64,
    pub(crate) record: Option<RecordHandle>,
    pub(crate) store: Option<StoreHandle>,
}
