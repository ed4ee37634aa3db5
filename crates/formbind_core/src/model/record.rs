//! Record domain model.
//!
//! # Responsibility
//! - Define the record contract consumed by the binding controller.
//! - Provide `DataRecord`, a keyed field map with modified tracking.
//!
//! # Invariants
//! - `id` is stable for the record lifetime and is the identity used by
//!   same-record refresh detection.
//! - Only declared field names can be written; unknown names are ignored.
//! - `commit()` clears modified state without touching values.

use crate::model::value::FieldValue;
use crate::store::{PersistenceError, PersistenceResult};
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use uuid::Uuid;

/// Stable record key.
pub type RecordId = Uuid;

/// Shared, non-owning-by-contract handle to one record.
///
/// Records are owned by their creator (caller or store); the controller
/// keeps a clone of the handle only while the record is bound.
pub type RecordHandle = Rc<dyn Record>;

/// Capability surface the controller needs from a record.
pub trait Record {
    fn id(&self) -> RecordId;
    /// Declared field names in declaration order.
    fn field_names(&self) -> Vec<String>;
    /// Returns `None` for undeclared names.
    fn get(&self, field: &str) -> Option<FieldValue>;
    /// Writes one declared field. Returns whether the stored value changed.
    fn set(&self, field: &str, value: FieldValue) -> bool;
    /// Snapshot of all declared fields.
    fn data(&self) -> BTreeMap<String, FieldValue>;
    /// Whether any field changed since the last commit.
    fn is_modified(&self) -> bool;
    fn commit(&self);
    /// Persists this record through its own transport.
    fn save(self: Rc<Self>) -> LocalBoxFuture<'static, PersistenceResult<()>>;
    /// Removes this record through its own transport.
    fn destroy(self: Rc<Self>) -> LocalBoxFuture<'static, PersistenceResult<()>>;
}

/// Transport seam used by `DataRecord::save`/`destroy`.
pub trait RecordProxy {
    fn save(&self, record: RecordHandle) -> LocalBoxFuture<'static, PersistenceResult<()>>;
    fn destroy(&self, record: RecordHandle) -> LocalBoxFuture<'static, PersistenceResult<()>>;
}

/// Keyed field map record.
pub struct DataRecord {
    id: RecordId,
    fields: Vec<String>,
    values: RefCell<BTreeMap<String, FieldValue>>,
    modified: RefCell<BTreeSet<String>>,
    destroyed: Cell<bool>,
    proxy: Option<Rc<dyn RecordProxy>>,
}

impl DataRecord {
    /// Creates a record with a generated id and all fields `Null`.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_id(Uuid::new_v4(), fields)
    }

    /// Creates a record with a caller-provided id.
    ///
    /// Used when reloading rows whose identity already exists.
    pub fn with_id<I, S>(id: RecordId, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = Vec::new();
        for name in fields {
            let name = name.into();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        let values = names
            .iter()
            .map(|name| (name.clone(), FieldValue::Null))
            .collect();

        Self {
            id,
            fields: names,
            values: RefCell::new(values),
            modified: RefCell::new(BTreeSet::new()),
            destroyed: Cell::new(false),
            proxy: None,
        }
    }

    /// Creates a clean record whose fields are exactly the keys of `data`.
    pub fn from_data(id: RecordId, data: BTreeMap<String, FieldValue>) -> Self {
        let record = Self::with_id(id, data.keys().cloned().collect::<Vec<_>>());
        *record.values.borrow_mut() = data;
        record
    }

    /// Builder-style initial value; the record stays clean.
    pub fn with_value(self, field: &str, value: impl Into<FieldValue>) -> Self {
        if let Some(slot) = self.values.borrow_mut().get_mut(field) {
            *slot = value.into();
        }
        self
    }

    pub fn with_proxy(mut self, proxy: Rc<dyn RecordProxy>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn into_handle(self) -> RecordHandle {
        Rc::new(self)
    }

    /// Names of fields changed since the last commit.
    pub fn modified_fields(&self) -> Vec<String> {
        self.modified.borrow().iter().cloned().collect()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

impl Record for DataRecord {
    fn id(&self) -> RecordId {
        self.id
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn get(&self, field: &str) -> Option<FieldValue> {
        self.values.borrow().get(field).cloned()
    }

    fn set(&self, field: &str, value: FieldValue) -> bool {
        let mut values = self.values.borrow_mut();
        let Some(slot) = values.get_mut(field) else {
            return false;
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        self.modified.borrow_mut().insert(field.to_string());
        true
    }

    fn data(&self) -> BTreeMap<String, FieldValue> {
        self.values.borrow().clone()
    }

    fn is_modified(&self) -> bool {
        !self.modified.borrow().is_empty()
    }

    fn commit(&self) {
        self.modified.borrow_mut().clear();
    }

    fn save(self: Rc<Self>) -> LocalBoxFuture<'static, PersistenceResult<()>> {
        if self.destroyed.get() {
            return future::ready(Err(PersistenceError::Rejected(format!(
                "record {} was destroyed",
                self.id
            ))))
            .boxed_local();
        }
        match self.proxy.clone() {
            Some(proxy) => {
                let handle: RecordHandle = self;
                proxy.save(handle)
            }
            None => {
                self.commit();
                future::ready(Ok(())).boxed_local()
            }
        }
    }

    fn destroy(self: Rc<Self>) -> LocalBoxFuture<'static, PersistenceResult<()>> {
        let proxy = self.proxy.clone();
        let record = Rc::clone(&self);
        async move {
            if let Some(proxy) = proxy {
                let handle: RecordHandle = record.clone();
                proxy.destroy(handle).await?;
            }
            record.destroyed.set(true);
            Ok(())
        }
        .boxed_local()
    }
}

impl std::fmt::Debug for DataRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRecord")
            .field("id", &self.id)
            .field("fields", &self.fields)
            .field("modified", &self.modified.borrow())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{DataRecord, Record};
    use crate::model::value::FieldValue;
    use futures::executor::block_on;
    use std::rc::Rc;

    #[test]
    fn new_record_is_clean_with_null_fields() {
        let record = DataRecord::new(["title", "body", "title"]);
        assert_eq!(record.field_names(), vec!["title", "body"]);
        assert_eq!(record.get("title"), Some(FieldValue::Null));
        assert!(!record.is_modified());
    }

    #[test]
    fn set_tracks_modified_fields_until_commit() {
        let record = DataRecord::new(["title", "body"]).with_value("title", "draft");
        assert!(!record.set("title", FieldValue::from("draft")));
        assert!(record.set("title", FieldValue::from("final")));
        assert!(!record.set("unknown", FieldValue::from("x")));
        assert_eq!(record.modified_fields(), vec!["title"]);

        record.commit();
        assert!(!record.is_modified());
        assert_eq!(record.get("title"), Some(FieldValue::from("final")));
    }

    #[test]
    fn save_without_proxy_commits_locally() {
        let record = Rc::new(DataRecord::new(["title"]));
        record.set("title", FieldValue::from("x"));
        block_on(Rc::clone(&record).save()).expect("local save should succeed");
        assert!(!record.is_modified());
    }

    #[test]
    fn destroyed_record_rejects_save() {
        let record = Rc::new(DataRecord::new(["title"]));
        block_on(Rc::clone(&record).destroy()).expect("destroy should succeed");
        assert!(record.is_destroyed());
        block_on(Rc::clone(&record).save()).expect_err("save after destroy must fail");
    }
}
