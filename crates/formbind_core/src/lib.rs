//! Form-to-record binding core.
//! Binds an editable form surface to one record and mediates load, edit,
//! gated save/delete and store write reconciliation.

pub mod config;
pub mod controller;
pub mod db;
pub mod gate;
pub mod logging;
pub mod model;
pub mod store;
pub mod surface;

pub use config::{ConfigError, ControllerConfig};
pub use controller::{
    BindingController, BindingControllerBuilder, ControllerError, ControllerResult,
    DeleteOutcome, SaveOutcome, SubmitOptions,
};
pub use gate::{
    AllowAll, BindingCapability, CapabilityGate, ConfirmResponse, Dialogs, GateDenial,
    GateFuture, PermissionGate, PromptKind, ScriptedDialogs,
};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::record::{DataRecord, Record, RecordHandle, RecordId, RecordProxy};
pub use model::value::FieldValue;
pub use store::memory::MemoryStore;
pub use store::sqlite::{SqliteRecordProxy, SqliteRecordStore, REVISION_FIELD};
pub use store::{
    ListenerId, PersistenceError, PersistenceResult, RecordStore, StoreHandle, WriteListener,
};
pub use surface::{
    ChoiceSource, Field, FieldKind, FieldRef, FieldSelector, FieldSurface, FormField, FormPanel,
    QueryMode, SelectionSource, SurfaceHandle,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
