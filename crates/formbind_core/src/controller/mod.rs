//! Form binding lifecycle.
//!
//! # Responsibility
//! - Own the load/save/delete/reset state machine for one form surface.
//! - Keep the write-refresh subscription and the binding epoch.
//!
//! # States
//! `Unbound` -> `load` -> `Bound(record, store?)`; a store write re-enters
//! `load` for the same record; `disable` returns to `Unbound`.

mod binding;
pub mod error;
mod state;

pub use binding::{
    BindingController, BindingControllerBuilder, DeleteOutcome, SaveOutcome, SubmitOptions,
};
pub use error::{ControllerError, ControllerResult};
