//! SQLite bootstrap for the record store.
//!
//! # Responsibility
//! - Open file or in-memory connections used by `SqliteRecordStore`.
//! - Apply the `records` schema before any record is read or written.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - A database newer than this binary is refused, never downgraded.
//! - A failed migration rolls back and names the schema version it was
//!   applying.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// The connection could not be opened or configured.
    Connect(rusqlite::Error),
    /// Applying schema `version` failed; nothing from that run was kept.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A record row read or write failed.
    Query(rusqlite::Error),
}

impl DbError {
    /// Stable code used in `error_code=` log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "db_connect_failed",
            Self::Migration { .. } => "db_migration_failed",
            Self::UnsupportedSchemaVersion { .. } => "db_schema_too_new",
            Self::Query(_) => "db_query_failed",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(err) => write!(f, "cannot open record database: {err}"),
            Self::Migration { version, source } => {
                write!(f, "record schema migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "record database schema {db_version} is newer than supported {latest_supported}"
            ),
            Self::Query(err) => write!(f, "record query failed: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connect(err) | Self::Query(err) => Some(err),
            Self::Migration { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}
