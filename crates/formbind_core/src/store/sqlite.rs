//! SQLite-backed record store and record proxy.
//!
//! # Responsibility
//! - Persist records as JSON rows in the `records` table.
//! - Assign the server-side `revision` on every write and push it back into
//!   the record when the record declares a `revision` field.
//!
//! # Invariants
//! - One `sync` runs all pending removals and upserts in one transaction.
//! - Records are committed only after the transaction commits.
//! - The `revision` column is authoritative; the JSON payload never stores it.

use crate::model::record::{DataRecord, Record, RecordHandle, RecordId, RecordProxy};
use crate::model::value::FieldValue;
use crate::store::{
    ListenerId, Listeners, PersistenceError, PersistenceResult, RecordStore, WriteListener,
};
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use uuid::Uuid;

/// Server-assigned field name stamped into records after each write.
pub const REVISION_FIELD: &str = "revision";

/// Batched store over one SQLite connection.
pub struct SqliteRecordStore {
    conn: Rc<Connection>,
    records: RefCell<Vec<RecordHandle>>,
    removed: RefCell<Vec<RecordId>>,
    listeners: Listeners<dyn Fn()>,
}

impl SqliteRecordStore {
    pub fn new(conn: Rc<Connection>) -> Self {
        Self {
            conn,
            records: RefCell::new(Vec::new()),
            removed: RefCell::new(Vec::new()),
            listeners: Listeners::new(),
        }
    }

    pub fn into_handle(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Loads every persisted row into the store as a clean record.
    ///
    /// Returns the number of records added. Rows already present (by id) are
    /// skipped.
    pub fn load_all(&self) -> PersistenceResult<usize> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data, revision FROM records ORDER BY updated_at ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut added = 0;

        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let id = Uuid::parse_str(&id_text).map_err(|_| {
                PersistenceError::Serialization(format!("invalid record id `{id_text}`"))
            })?;
            if self.contains(id) {
                continue;
            }
            let data_text: String = row.get("data")?;
            let mut data: BTreeMap<String, FieldValue> = serde_json::from_str(&data_text)?;
            let revision: i64 = row.get("revision")?;
            data.insert(REVISION_FIELD.to_string(), FieldValue::Int(revision));

            self.records
                .borrow_mut()
                .push(DataRecord::from_data(id, data).into_handle());
            added += 1;
        }

        info!("event=store_load module=store status=ok backend=sqlite added={added}");
        Ok(added)
    }

    pub fn get(&self, id: RecordId) -> Option<RecordHandle> {
        self.records
            .borrow()
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    fn write_pending(&self) -> PersistenceResult<(Vec<RecordHandle>, usize)> {
        let removed = self.removed.borrow().clone();
        let dirty: Vec<RecordHandle> = self
            .records
            .borrow()
            .iter()
            .filter(|record| record.is_modified())
            .cloned()
            .collect();

        let tx = self.conn.unchecked_transaction()?;
        for id in &removed {
            delete_row(&tx, *id)?;
        }
        let mut revisions = Vec::with_capacity(dirty.len());
        for record in &dirty {
            revisions.push(upsert_row(&tx, record.as_ref())?);
        }
        tx.commit()?;

        self.removed.borrow_mut().clear();
        for (record, revision) in dirty.iter().zip(revisions) {
            stamp_revision(record.as_ref(), revision);
        }
        Ok((dirty, removed.len()))
    }
}

impl RecordStore for SqliteRecordStore {
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
        records.remove(index);
        self.removed.borrow_mut().push(id);
        info!("event=store_remove module=store status=ok backend=sqlite record_id={id}");
    }

    fn contains(&self, id: RecordId) -> bool {
        self.records.borrow().iter().any(|record| record.id() == id)
    }

    fn sync(self: Rc<Self>) -> LocalBoxFuture<'static, PersistenceResult<()>> {
        async move {
            let (written, removed) = self.write_pending().map_err(|err| {
                error!("event=store_sync module=store status=error backend=sqlite error={err}");
                err
            })?;
            info!(
                "event=store_sync module=store status=ok backend=sqlite written={} removed={removed}",
                written.len()
            );
            if !written.is_empty() || removed > 0 {
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

/// Per-record transport for records saved without a store.
pub struct SqliteRecordProxy {
    conn: Rc<Connection>,
}

impl SqliteRecordProxy {
    pub fn new(conn: Rc<Connection>) -> Self {
        Self { conn }
    }

    /// Reads one persisted record back, `None` when no row exists.
    pub fn fetch(&self, id: RecordId) -> PersistenceResult<Option<RecordHandle>> {
        let row = self
            .conn
            .query_row(
                "SELECT data, revision FROM records WHERE id = ?1;",
                params![id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        let Some((data_text, revision)) = row else {
            return Ok(None);
        };
        let mut data: BTreeMap<String, FieldValue> = serde_json::from_str(&data_text)?;
        data.insert(REVISION_FIELD.to_string(), FieldValue::Int(revision));
        Ok(Some(DataRecord::from_data(id, data).into_handle()))
    }
}

impl RecordProxy for SqliteRecordProxy {
    fn save(&self, record: RecordHandle) -> LocalBoxFuture<'static, PersistenceResult<()>> {
        let result = upsert_row(&self.conn, record.as_ref()).map(|revision| {
            stamp_revision(record.as_ref(), revision);
            info!(
                "event=record_save module=store status=ok backend=sqlite record_id={} revision={revision}",
                record.id()
            );
        });
        future::ready(result).boxed_local()
    }

    fn destroy(&self, record: RecordHandle) -> LocalBoxFuture<'static, PersistenceResult<()>> {
        let result = delete_row(&self.conn, record.id());
        future::ready(result).boxed_local()
    }
}

fn upsert_row(conn: &Connection, record: &dyn Record) -> PersistenceResult<i64> {
    let mut data = record.data();
    data.remove(REVISION_FIELD);
    let payload = serde_json::to_string(&data)?;
    let id = record.id().to_string();

    conn.execute(
        "INSERT INTO records (id, data) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            revision = records.revision + 1,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![id, payload],
    )?;
    let revision = conn.query_row(
        "SELECT revision FROM records WHERE id = ?1;",
        params![id],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(revision)
}

fn delete_row(conn: &Connection, id: RecordId) -> PersistenceResult<()> {
    conn.execute("DELETE FROM records WHERE id = ?1;", params![id.to_string()])?;
    Ok(())
}

fn stamp_revision(record: &dyn Record, revision: i64) {
    record.set(REVISION_FIELD, FieldValue::Int(revision));
    record.commit();
}
