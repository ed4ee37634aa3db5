//! In-process record store.
//!
//! Keeps pending mutations in memory; `sync` commits them and notifies
//! write listeners. A failure can be armed for the next sync.

use crate::model::record::{RecordHandle, RecordId};
use crate::store::{
    ListenerId, Listeners, PersistenceError, PersistenceResult, RecordStore, WriteListener,
};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::{info, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Default)]
pub struct MemoryStore {
    records: RefCell<Vec<RecordHandle>>,
    removed: RefCell<Vec<RecordHandle>>,
    listeners: Listeners<dyn Fn()>,
    fail_next_sync: RefCell<Option<String>>,
    sync_count: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_handle(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Makes the next `sync` fail with `PersistenceError::Rejected`.
    pub fn fail_next_sync(&self, reason: impl Into<String>) {
        *self.fail_next_sync.borrow_mut() = Some(reason.into());
    }

    /// Number of completed sync calls, failed ones included.
    pub fn sync_count(&self) -> usize {
        self.sync_count.get()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn pending_removals(&self) -> usize {
        self.removed.borrow().len()
    }

    pub fn get(&self, id: RecordId) -> Option<RecordHandle> {
        self.records
            .borrow()
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }
}

impl RecordStore for MemoryStore {
    fn add(&self, record: RecordHandle) {
        if self.contains(record.id()) {
            return;
        }
        self.records.borrow_mut().push(record);
    }

    fn remove(&self, record: &RecordHandle) {
        let id = record.id();
        let mut records = self.records.borrow_mut();
        let Some(index) = records.iter().position(|entry| entry.id() == id) else {
            return;
        };
        let removed = records.remove(index);
        self.removed.borrow_mut().push(removed);
        info!("event=store_remove module=store status=ok backend=memory record_id={id}");
    }

    fn contains(&self, id: RecordId) -> bool {
        self.records.borrow().iter().any(|record| record.id() == id)
    }

    fn sync(self: Rc<Self>) -> LocalBoxFuture<'static, PersistenceResult<()>> {
        async move {
            self.sync_count.set(self.sync_count.get() + 1);
            if let Some(reason) = self.fail_next_sync.borrow_mut().take() {
                warn!("event=store_sync module=store status=error backend=memory error={reason}");
                return Err(PersistenceError::Rejected(reason));
            }

            let removed = std::mem::take(&mut *self.removed.borrow_mut());
            let dirty: Vec<RecordHandle> = self
                .records
                .borrow()
                .iter()
                .filter(|record| record.is_modified())
                .cloned()
                .collect();
            for record in &dirty {
                record.commit();
            }

            let written = removed.len() + dirty.len();
            info!(
                "event=store_sync module=store status=ok backend=memory written={} removed={}",
                dirty.len(),
                removed.len()
            );
            if written > 0 {
                for listener in self.listeners.snapshot() {
                    listener();
                }
            }
            Ok(())
        }
        .boxed_local()
    }

    fn on_write(&self, listener: WriteListener) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    fn un_write(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn write_listener_count(&self) -> usize {
        self.listeners.len()
    }
}
