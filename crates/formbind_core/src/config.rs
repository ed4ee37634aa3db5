//! Binding controller configuration.
//!
//! # Responsibility
//! - Carry the recognized controller options with their defaults.
//! - Load options from JSON and reject unusable values early.
//!
//! # Invariants
//! - Missing keys take defaults; unknown keys are rejected.
//! - `focus_on_add_selector`, when set, always parses as a `FieldSelector`.

use crate::surface::selector::{FieldSelector, SelectorError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_DELETE_CONFIRM_TITLE: &str = "Delete";
const DEFAULT_DELETE_CONFIRM_TEXT: &str = "Do you really wish to remove this entry?";
const DEFAULT_SAVE_VALIDATE_ERROR_TITLE: &str = "Save";
const DEFAULT_SAVE_VALIDATE_ERROR_MSG: &str =
    "Can't save, please fill all red underlined fields correctly.";
const DEFAULT_FOCUS_ON_ADD_SELECTOR: &str = "field";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Commit every field edit into the bound record immediately.
    pub update_on_change: bool,
    /// Prefetch never-loaded remote selection data on `load`.
    pub auto_load_combo_box_stores: bool,
    /// Save/delete persist immediately instead of leaving it to the caller.
    pub auto_sync: bool,
    pub delete_confirm_title: String,
    pub delete_confirm_text: String,
    pub save_validate_error_title: String,
    pub save_validate_error_msg: String,
    /// Field focused by `on_add`; `None` disables focusing.
    pub focus_on_add_selector: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            update_on_change: false,
            auto_load_combo_box_stores: true,
            auto_sync: true,
            delete_confirm_title: DEFAULT_DELETE_CONFIRM_TITLE.to_string(),
            delete_confirm_text: DEFAULT_DELETE_CONFIRM_TEXT.to_string(),
            save_validate_error_title: DEFAULT_SAVE_VALIDATE_ERROR_TITLE.to_string(),
            save_validate_error_msg: DEFAULT_SAVE_VALIDATE_ERROR_MSG.to_string(),
            focus_on_add_selector: Some(DEFAULT_FOCUS_ON_ADD_SELECTOR.to_string()),
        }
    }
}

impl ControllerConfig {
    /// Parses and validates a JSON object of options.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.focus_selector().map(|_| ())
    }

    /// Parsed focus target, `None` when focusing is disabled.
    pub fn focus_selector(&self) -> Result<Option<FieldSelector>, ConfigError> {
        self.focus_on_add_selector
            .as_deref()
            .map(FieldSelector::parse)
            .transpose()
            .map_err(ConfigError::InvalidFocusSelector)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    InvalidFocusSelector(SelectorError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid controller config: {message}"),
            Self::InvalidFocusSelector(err) => write!(f, "invalid focus_on_add_selector: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidFocusSelector(err) => Some(err),
            Self::Parse(_) => None,
        }
    }
}
