//! Capability-based permission gate.
//!
//! Grants save/delete gestures according to a declared capability list,
//! e.g. `["save"]` for a form that may edit but never remove records.

use crate::gate::{GateDenial, GateFuture, PermissionGate};
use futures::future;
use futures::FutureExt;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Gesture capability a gate can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BindingCapability {
    Save,
    Delete,
}

impl BindingCapability {
    /// Stable string id used in capability declarations.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Save => BINDING_CAPABILITY_SAVE,
            Self::Delete => BINDING_CAPABILITY_DELETE,
        }
    }

    /// User-facing short description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Save => "Allow writing form edits back into the bound record.",
            Self::Delete => "Allow removing the bound record.",
        }
    }
}

/// Declaration string for the save capability.
pub const BINDING_CAPABILITY_SAVE: &str = "save";
/// Declaration string for the delete capability.
pub const BINDING_CAPABILITY_DELETE: &str = "delete";

const SUPPORTED_BINDING_CAPABILITY_STRINGS: &[&str] =
    &[BINDING_CAPABILITY_SAVE, BINDING_CAPABILITY_DELETE];

/// Returns supported capability declaration strings.
pub fn supported_binding_capability_strings() -> &'static [&'static str] {
    SUPPORTED_BINDING_CAPABILITY_STRINGS
}

/// Parses one capability from its declaration string.
pub fn parse_binding_capability(value: &str) -> Result<BindingCapability, BindingCapabilityError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(BindingCapabilityError::EmptyCapability);
    }

    match normalized {
        BINDING_CAPABILITY_SAVE => Ok(BindingCapability::Save),
        BINDING_CAPABILITY_DELETE => Ok(BindingCapability::Delete),
        other => Err(BindingCapabilityError::UnsupportedCapability(
            other.to_string(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingCapabilityError {
    EmptyCapability,
    UnsupportedCapability(String),
}

impl Display for BindingCapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCapability => write!(f, "binding capability value must not be empty"),
            Self::UnsupportedCapability(value) => {
                write!(f, "binding capability is unsupported: {value}")
            }
        }
    }
}

impl Error for BindingCapabilityError {}

/// Gate that answers immediately from a granted capability set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityGate {
    granted: BTreeSet<BindingCapability>,
}

impl CapabilityGate {
    pub fn new(granted: impl IntoIterator<Item = BindingCapability>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }

    /// Builds a gate from declaration strings; unknown strings are rejected.
    pub fn from_declared<S: AsRef<str>>(declared: &[S]) -> Result<Self, BindingCapabilityError> {
        let granted = declared
            .iter()
            .map(|value| parse_binding_capability(value.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { granted })
    }

    pub fn grants(&self, capability: BindingCapability) -> bool {
        self.granted.contains(&capability)
    }

    fn check(&self, capability: BindingCapability) -> GateFuture {
        let result = if self.grants(capability) {
            Ok(())
        } else {
            Err(GateDenial::CapabilityDenied(capability))
        };
        future::ready(result).boxed_local()
    }
}

impl PermissionGate for CapabilityGate {
    fn allow_save(&self) -> GateFuture {
        self.check(BindingCapability::Save)
    }

    fn allow_delete(&self) -> GateFuture {
        self.check(BindingCapability::Delete)
    }
}
