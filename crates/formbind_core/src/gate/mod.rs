//! Permission gates consulted before record mutation.
//!
//! # Responsibility
//! - Define the asynchronous allow-save/allow-delete contract.
//! - Provide stock gates (`AllowAll`, `CapabilityGate`) and the dialog seam.
//!
//! # Invariants
//! - A gate never mutates records; it only answers.
//! - A denying gate owns any user-facing explanation.

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod capability;
pub mod dialog;

pub use capability::{BindingCapability, BindingCapabilityError, CapabilityGate};
pub use dialog::{ConfirmResponse, Dialogs, Prompt, PromptKind, ScriptedDialogs};

/// Pending gate answer.
pub type GateFuture = LocalBoxFuture<'static, Result<(), GateDenial>>;

/// Reason a gate refused a gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    CapabilityDenied(BindingCapability),
    Refused(String),
}

impl Display for GateDenial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapabilityDenied(capability) => {
                write!(f, "capability `{}` is not granted", capability.as_str())
            }
            Self::Refused(reason) => write!(f, "refused: {reason}"),
        }
    }
}

impl Error for GateDenial {}

/// Pluggable asynchronous permission check.
pub trait PermissionGate {
    fn allow_save(&self) -> GateFuture;
    fn allow_delete(&self) -> GateFuture;
}

/// Gate granting every gesture.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn allow_save(&self) -> GateFuture {
        future::ready(Ok(())).boxed_local()
    }

    fn allow_delete(&self) -> GateFuture {
        future::ready(Ok(())).boxed_local()
    }
}
