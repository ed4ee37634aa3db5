//! Field Surface contracts.
//!
//! # Responsibility
//! - Define what the binding controller needs from an editable form:
//!   per-field value/dirty/baseline access, aggregate validity, enablement
//!   and layout batching.
//! - Provide `FormPanel`, a headless surface used by the CLI and tests.
//!
//! # Invariants
//! - A field is dirty exactly when its value differs from its baseline.
//! - Layout work requested while suspended runs once, on the outermost resume.

use crate::model::value::FieldValue;
use crate::store::{ListenerId, PersistenceResult};
use std::rc::Rc;

pub mod panel;
pub mod selector;

pub use panel::{ChoiceSource, FormField, FormPanel};
pub use selector::{FieldSelector, SelectorError, SelectorKind};

/// Shared field handle.
pub type FieldRef = Rc<dyn Field>;

/// Shared surface handle.
pub type SurfaceHandle = Rc<dyn FieldSurface>;

/// Field change callback; receives the field name.
pub type ChangeListener = Rc<dyn Fn(&str)>;

/// Widget kind of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Number,
    Checkbox,
    Display,
    ComboBox,
    MultiSelect,
}

impl FieldKind {
    /// Selector token for this kind.
    pub fn xtype(self) -> &'static str {
        match self {
            Self::Text => "textfield",
            Self::Number => "numberfield",
            Self::Checkbox => "checkbox",
            Self::Display => "displayfield",
            Self::ComboBox => "combobox",
            Self::MultiSelect => "multiselectfield",
        }
    }

    pub fn from_xtype(value: &str) -> Option<Self> {
        match value {
            "textfield" => Some(Self::Text),
            "numberfield" => Some(Self::Number),
            "checkbox" => Some(Self::Checkbox),
            "displayfield" => Some(Self::Display),
            "combobox" => Some(Self::ComboBox),
            "multiselectfield" => Some(Self::MultiSelect),
            _ => None,
        }
    }
}

/// Where a selection field gets its choices from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    Local,
    Remote,
}

/// Remote-backed choice data behind a selection field.
pub trait SelectionSource {
    /// Whether a load was ever issued.
    fn is_loaded(&self) -> bool;
    /// Starts loading choices.
    fn load(&self) -> PersistenceResult<()>;
}

/// One editable field.
pub trait Field {
    fn name(&self) -> &str;
    fn kind(&self) -> FieldKind;
    fn value(&self) -> FieldValue;
    /// Writes a value; notifies change listeners when it differs.
    fn set_value(&self, value: FieldValue);
    fn is_dirty(&self) -> bool;
    /// Makes the current value the new baseline.
    fn reset_original_value(&self);
    /// Restores the baseline value.
    fn reset(&self);
    fn is_valid(&self) -> bool;
    /// Returns whether the field accepted focus.
    fn focus(&self) -> bool;
    fn query_mode(&self) -> QueryMode {
        QueryMode::Local
    }
    fn selection_source(&self) -> Option<Rc<dyn SelectionSource>> {
        None
    }
    fn on_change(&self, listener: ChangeListener) -> ListenerId;
}

/// The editable form bound by a controller.
pub trait FieldSurface {
    /// Fields matching `selector`, in declaration order.
    fn query(&self, selector: &FieldSelector) -> Vec<FieldRef>;
    fn find_field(&self, name: &str) -> Option<FieldRef>;
    fn is_disabled(&self) -> bool;
    fn set_disabled(&self, disabled: bool);
    fn suspend_layouts(&self);
    fn resume_layouts(&self);

    /// First field matching `selector`.
    fn down(&self, selector: &FieldSelector) -> Option<FieldRef> {
        self.query(selector).into_iter().next()
    }

    fn is_valid(&self) -> bool {
        self.query(&FieldSelector::all())
            .iter()
            .all(|field| field.is_valid())
    }

    fn is_dirty(&self) -> bool {
        self.query(&FieldSelector::all())
            .iter()
            .any(|field| field.is_dirty())
    }

    /// Restores every field to its baseline.
    fn reset(&self) {
        let _batch = LayoutBatch::new(self);
        for field in self.query(&FieldSelector::all()) {
            field.reset();
        }
    }
}

/// Suspends layout on a surface until dropped.
pub struct LayoutBatch<'a, S: FieldSurface + ?Sized> {
    surface: &'a S,
}

impl<'a, S: FieldSurface + ?Sized> LayoutBatch<'a, S> {
    pub fn new(surface: &'a S) -> Self {
        surface.suspend_layouts();
        Self { surface }
    }
}

impl<S: FieldSurface + ?Sized> Drop for LayoutBatch<'_, S> {
    fn drop(&mut self) {
        self.surface.resume_layouts();
    }
}
