//! Headless reference Field Surface.
//!
//! `FormPanel` keeps field values, baselines and validity in memory and
//! counts layout passes, so callers can observe batching without a real
//! widget toolkit.

use crate::model::value::FieldValue;
use crate::store::{ListenerId, Listeners, PersistenceError, PersistenceResult};
use crate::surface::{
    ChangeListener, Field, FieldKind, FieldRef, FieldSelector, FieldSurface, QueryMode,
    SelectionSource,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Default)]
struct LayoutState {
    suspended: Cell<u32>,
    pending: Cell<bool>,
    runs: Cell<usize>,
}

impl LayoutState {
    fn request(&self) {
        if self.suspended.get() > 0 {
            self.pending.set(true);
        } else {
            self.runs.set(self.runs.get() + 1);
        }
    }
}

type Validator = Box<dyn Fn(&FieldValue) -> bool>;

/// One field of a `FormPanel`.
pub struct FormField {
    name: String,
    kind: FieldKind,
    value: RefCell<FieldValue>,
    original: RefCell<FieldValue>,
    required: bool,
    validator: Option<Validator>,
    query_mode: QueryMode,
    source: Option<Rc<dyn SelectionSource>>,
    listeners: Listeners<dyn Fn(&str)>,
    layout: Rc<LayoutState>,
    focused: Rc<RefCell<Option<String>>>,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value: RefCell::new(FieldValue::Null),
            original: RefCell::new(FieldValue::Null),
            required: false,
            validator: None,
            query_mode: QueryMode::Local,
            source: None,
            listeners: Listeners::new(),
            layout: Rc::default(),
            focused: Rc::default(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn display(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Display)
    }

    pub fn combo(name: impl Into<String>, mode: QueryMode, source: Rc<dyn SelectionSource>) -> Self {
        let mut field = Self::new(name, FieldKind::ComboBox);
        field.query_mode = mode;
        field.source = Some(source);
        field
    }

    pub fn multiselect(name: impl Into<String>, source: Rc<dyn SelectionSource>) -> Self {
        let mut field = Self::new(name, FieldKind::MultiSelect);
        field.query_mode = QueryMode::Remote;
        field.source = Some(source);
        field
    }

    /// Blank values (null or empty text) make the field invalid.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_validator(mut self, validator: impl Fn(&FieldValue) -> bool + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Baseline value, as of the last `reset_original_value`.
    pub fn original_value(&self) -> FieldValue {
        self.original.borrow().clone()
    }

    fn is_blank(value: &FieldValue) -> bool {
        match value {
            FieldValue::Null => true,
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl Field for FormField {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn value(&self) -> FieldValue {
        self.value.borrow().clone()
    }

    fn set_value(&self, value: FieldValue) {
        if *self.value.borrow() == value {
            return;
        }
        *self.value.borrow_mut() = value;
        self.layout.request();
        for listener in self.listeners.snapshot() {
            listener(&self.name);
        }
    }

    fn is_dirty(&self) -> bool {
        self.kind != FieldKind::Display && *self.value.borrow() != *self.original.borrow()
    }

    fn reset_original_value(&self) {
        *self.original.borrow_mut() = self.value.borrow().clone();
    }

    fn reset(&self) {
        let original = self.original.borrow().clone();
        self.set_value(original);
    }

    fn is_valid(&self) -> bool {
        if self.kind == FieldKind::Display {
            return true;
        }
        let value = self.value.borrow();
        if self.required && Self::is_blank(&*value) {
            return false;
        }
        self.validator
            .as_ref()
            .map_or(true, |validator| validator(&*value))
    }

    fn focus(&self) -> bool {
        *self.focused.borrow_mut() = Some(self.name.clone());
        true
    }

    fn query_mode(&self) -> QueryMode {
        self.query_mode
    }

    fn selection_source(&self) -> Option<Rc<dyn SelectionSource>> {
        self.source.clone()
    }

    fn on_change(&self, listener: ChangeListener) -> ListenerId {
        self.listeners.subscribe(listener)
    }
}

/// In-memory form made of `FormField`s.
#[derive(Default)]
pub struct FormPanel {
    fields: Vec<Rc<FormField>>,
    disabled: Cell<bool>,
    layout: Rc<LayoutState>,
    focused: Rc<RefCell<Option<String>>>,
}

impl FormPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field; names are expected to be unique.
    pub fn with_field(mut self, mut field: FormField) -> Self {
        field.layout = Rc::clone(&self.layout);
        field.focused = Rc::clone(&self.focused);
        self.fields.push(Rc::new(field));
        self
    }

    pub fn into_handle(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Concrete access for callers simulating user input.
    pub fn field(&self, name: &str) -> Option<Rc<FormField>> {
        self.fields.iter().find(|field| field.name == name).cloned()
    }

    /// Number of layout passes run so far.
    pub fn layout_runs(&self) -> usize {
        self.layout.runs.get()
    }

    pub fn is_layout_suspended(&self) -> bool {
        self.layout.suspended.get() > 0
    }

    pub fn focused_field(&self) -> Option<String> {
        self.focused.borrow().clone()
    }
}

impl FieldSurface for FormPanel {
    fn query(&self, selector: &FieldSelector) -> Vec<FieldRef> {
        self.fields
            .iter()
            .filter(|field| selector.matches(field.as_ref()))
            .map(|field| Rc::clone(field) as FieldRef)
            .collect()
    }

    fn find_field(&self, name: &str) -> Option<FieldRef> {
        self.field(name).map(|field| field as FieldRef)
    }

    fn is_disabled(&self) -> bool {
        self.disabled.get()
    }

    fn set_disabled(&self, disabled: bool) {
        if self.disabled.replace(disabled) != disabled {
            self.layout.request();
        }
    }

    fn suspend_layouts(&self) {
        self.layout.suspended.set(self.layout.suspended.get() + 1);
    }

    fn resume_layouts(&self) {
        let depth = self.layout.suspended.get().saturating_sub(1);
        self.layout.suspended.set(depth);
        if depth == 0 && self.layout.pending.replace(false) {
            self.layout.runs.set(self.layout.runs.get() + 1);
        }
    }
}

/// Choice list with a counted, optionally failing, load.
#[derive(Debug, Default)]
pub struct ChoiceSource {
    loaded: Cell<bool>,
    load_calls: Cell<usize>,
    failure: RefCell<Option<String>>,
}

impl ChoiceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose loads always fail with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let source = Self::default();
        *source.failure.borrow_mut() = Some(reason.into());
        source
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.get()
    }
}

impl SelectionSource for ChoiceSource {
    fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    fn load(&self) -> PersistenceResult<()> {
        self.load_calls.set(self.load_calls.get() + 1);
        if let Some(reason) = self.failure.borrow().as_ref() {
            return Err(PersistenceError::Rejected(reason.clone()));
        }
        self.loaded.set(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FormField, FormPanel};
    use crate::model::value::FieldValue;
    use crate::surface::{Field, FieldKind, FieldSelector, FieldSurface, LayoutBatch};

    fn panel() -> FormPanel {
        FormPanel::new()
            .with_field(FormField::text("title").required())
            .with_field(FormField::number("size"))
            .with_field(FormField::display("revision"))
    }

    #[test]
    fn dirty_tracks_baseline() {
        let panel = panel();
        let title = panel.field("title").expect("title field");
        title.set_value(FieldValue::from("a"));
        assert!(title.is_dirty());
        assert!(panel.is_dirty());

        title.reset_original_value();
        assert!(!panel.is_dirty());

        title.set_value(FieldValue::from("b"));
        panel.reset();
        assert_eq!(title.value(), FieldValue::from("a"));
    }

    #[test]
    fn required_field_controls_validity() {
        let panel = panel();
        assert!(!panel.is_valid());
        panel
            .field("title")
            .expect("title field")
            .set_value(FieldValue::from("ok"));
        assert!(panel.is_valid());
    }

    #[test]
    fn nested_batches_run_one_layout() {
        let panel = panel();
        let before = panel.layout_runs();
        {
            let _outer = LayoutBatch::new(&panel);
            let _inner = LayoutBatch::new(&panel);
            for field in panel.query(&FieldSelector::all()) {
                field.set_value(FieldValue::Int(1));
            }
        }
        assert_eq!(panel.layout_runs(), before + 1);
        assert!(!panel.is_layout_suspended());
    }

    #[test]
    fn query_filters_by_kind_and_name() {
        let panel = panel();
        let numbers = panel.query(&FieldSelector::of_kind(FieldKind::Number));
        assert_eq!(numbers.len(), 1);
        let named = FieldSelector::parse("field#revision").expect("selector");
        assert_eq!(panel.down(&named).expect("revision").name(), "revision");
    }
}
