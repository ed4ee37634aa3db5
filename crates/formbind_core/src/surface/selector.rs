//! Field selector parsing.
//!
//! Grammar: `<kind>`, `<kind>#<name>` or `<kind>[name=<name>]`, where kind is
//! one of `field|textfield|numberfield|checkbox|displayfield|combobox|multiselectfield`.
//! `field` matches every field kind.

use crate::surface::{Field, FieldKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static SELECTOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<kind>[a-z]+)(?:#(?P<id>[A-Za-z0-9_.\-]+)|\[name=(?P<name>[A-Za-z0-9_.\-]+)\])?$",
    )
    .expect("valid selector regex")
});

/// Field kind filter of a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Any,
    Kind(FieldKind),
}

/// Parsed field selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    pub kind: SelectorKind,
    pub name: Option<String>,
}

impl FieldSelector {
    /// Selector matching every field (`field`).
    pub fn all() -> Self {
        Self {
            kind: SelectorKind::Any,
            name: None,
        }
    }

    pub fn of_kind(kind: FieldKind) -> Self {
        Self {
            kind: SelectorKind::Kind(kind),
            name: None,
        }
    }

    pub fn parse(value: &str) -> Result<Self, SelectorError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }
        let captures = SELECTOR_RE
            .captures(trimmed)
            .ok_or_else(|| SelectorError::Malformed(trimmed.to_string()))?;

        let kind_text = &captures["kind"];
        let kind = match kind_text {
            "field" => SelectorKind::Any,
            other => SelectorKind::Kind(
                FieldKind::from_xtype(other)
                    .ok_or_else(|| SelectorError::UnknownKind(other.to_string()))?,
            ),
        };
        let name = captures
            .name("id")
            .or_else(|| captures.name("name"))
            .map(|m| m.as_str().to_string());

        Ok(Self { kind, name })
    }

    pub fn matches(&self, field: &dyn Field) -> bool {
        let kind_matches = match self.kind {
            SelectorKind::Any => true,
            SelectorKind::Kind(kind) => field.kind() == kind,
        };
        kind_matches && self.name.as_deref().map_or(true, |name| field.name() == name)
    }
}

impl FromStr for FieldSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for FieldSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            SelectorKind::Any => write!(f, "field")?,
            SelectorKind::Kind(kind) => write!(f, "{}", kind.xtype())?,
        }
        if let Some(name) = &self.name {
            write!(f, "[name={name}]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    Empty,
    Malformed(String),
    UnknownKind(String),
}

impl Display for SelectorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "field selector must not be empty"),
            Self::Malformed(value) => write!(f, "field selector is malformed: {value}"),
            Self::UnknownKind(value) => write!(f, "field selector kind is unknown: {value}"),
        }
    }
}

impl Error for SelectorError {}

#[cfg(test)]
mod tests {
    use super::{FieldSelector, SelectorError, SelectorKind};
    use crate::surface::FieldKind;

    #[test]
    fn parses_kind_only_selectors() {
        assert_eq!(
            FieldSelector::parse("field").expect("field"),
            FieldSelector::all()
        );
        assert_eq!(
            FieldSelector::parse(" combobox ").expect("combobox").kind,
            SelectorKind::Kind(FieldKind::ComboBox)
        );
    }

    #[test]
    fn parses_named_selectors_in_both_forms() {
        let by_id = FieldSelector::parse("textfield#title").expect("id form");
        let by_attr = FieldSelector::parse("textfield[name=title]").expect("attr form");
        assert_eq!(by_id, by_attr);
        assert_eq!(by_id.name.as_deref(), Some("title"));
        assert_eq!(by_id.to_string(), "textfield[name=title]");
    }

    #[test]
    fn rejects_bad_selectors() {
        assert_eq!(FieldSelector::parse("  "), Err(SelectorError::Empty));
        assert_eq!(
            FieldSelector::parse("button#save"),
            Err(SelectorError::UnknownKind("button".to_string()))
        );
        assert!(matches!(
            FieldSelector::parse("field[title]"),
            Err(SelectorError::Malformed(_))
        ));
    }
}
