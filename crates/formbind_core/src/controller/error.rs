//! Binding controller errors.
//!
//! Every variant except `Persistence` is a configuration or call-order bug
//! and is logged at `error` where it is raised.

use crate::config::ConfigError;
use crate::store::PersistenceError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ControllerResult<T> = Result<T, ControllerError>;

#[derive(Debug)]
pub enum ControllerError {
    /// `load` was called while the surface is disabled.
    DisabledSurface,
    /// Save/delete with auto-sync disabled and no store attached.
    MissingStore { operation: &'static str },
    /// The gesture needs a bound record and none is loaded.
    NoRecordLoaded { operation: &'static str },
    /// Store sync or record save/destroy failed.
    Persistence(PersistenceError),
    InvalidConfig(ConfigError),
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DisabledSurface => write!(f, "can't load into disabled form"),
            Self::MissingStore { operation } => write!(
                f,
                "can't {operation} if auto_sync is disabled and no store was provided"
            ),
            Self::NoRecordLoaded { operation } => {
                write!(f, "can't {operation} without a loaded record")
            }
            Self::Persistence(err) => write!(f, "{err}"),
            Self::InvalidConfig(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PersistenceError> for ControllerError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<ConfigError> for ControllerError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}
