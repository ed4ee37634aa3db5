//! Record-side domain model.
//!
//! # Responsibility
//! - Define field values and the record contract bound by forms.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - Records are shared through `RecordHandle`; binding never takes ownership.

pub mod record;
pub mod value;
