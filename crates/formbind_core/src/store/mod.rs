//! Batched record persistence contracts.
//!
//! # Responsibility
//! - Define the store surface the binding controller drives on save/delete.
//! - Provide in-memory and SQLite-backed store implementations.
//!
//! # Invariants
//! - A store emits its write notification only after a sync persisted at
//!   least one pending mutation.
//! - Write listeners are keyed by `ListenerId`; unsubscribing an unknown id
//!   is a no-op.
//!
//! # See also
//! - `crate::controller` for the write-refresh subscription discipline.

use crate::db::DbError;
use crate::model::record::{RecordHandle, RecordId};
use futures::future::LocalBoxFuture;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub mod listeners;
pub mod memory;
pub mod sqlite;

pub use listeners::{ListenerId, Listeners};

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Write-completed notification callback.
pub type WriteListener = Rc<dyn Fn()>;

/// Shared store handle.
pub type StoreHandle = Rc<dyn RecordStore>;

/// Failure reported by a store or record transport.
#[derive(Debug)]
pub enum PersistenceError {
    Db(DbError),
    Serialization(String),
    /// The backing system refused the mutation.
    Rejected(String),
    NotFound(RecordId),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(message) => write!(f, "record serialization failed: {message}"),
            Self::Rejected(message) => write!(f, "persistence rejected: {message}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PersistenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Query(value))
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

/// Collection of records with batched synchronization.
pub trait RecordStore {
    /// Adds a record; a record already present (by id) is not duplicated.
    fn add(&self, record: RecordHandle);
    /// Queues removal of a record; persisted on the next `sync`.
    fn remove(&self, record: &RecordHandle);
    fn contains(&self, id: RecordId) -> bool;
    /// Persists all pending mutations.
    fn sync(self: Rc<Self>) -> LocalBoxFuture<'static, PersistenceResult<()>>;
    fn on_write(&self, listener: WriteListener) -> ListenerId;
    /// Returns whether `id` was subscribed.
    fn un_write(&self, id: ListenerId) -> bool;
    fn write_listener_count(&self) -> usize;
}
