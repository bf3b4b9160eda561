use serde::Serialize;
use thiserror::Error;

use crate::ebinterface::EbInterfaceVersion;

/// Errors that abort an operation outright.
///
/// Per-field findings (schema violations, conversion problems, rule
/// findings) are not errors in this sense; they are collected as
/// [`ErrorItem`]s in an [`ErrorList`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EbiError {
    /// The upload could not be read or was empty.
    #[error("upload error: {0}")]
    Io(String),

    /// The root element's namespace is not an ebInterface namespace.
    #[error("unknown document format: {0}")]
    UnknownFormat(String),

    /// The bytes are not well-formed XML.
    #[error("malformed XML: {0}")]
    Malformed(String),

    /// A known ebInterface version without a registered handler.
    #[error("ebInterface {0} is not supported")]
    UnsupportedVersion(EbInterfaceVersion),

    /// XML generation failed.
    #[error("XML error: {0}")]
    Xml(String),

    /// A report template could not be compiled or rendered.
    #[error("report template error: {0}")]
    Template(String),

    /// A rule set could not be compiled.
    #[error("rule set error: {0}")]
    Rules(String),

    /// The ZUGFeRD profile table could not be compiled.
    #[error("ZUGFeRD profile table error: {0}")]
    Zugferd(String),

    /// A resource that should have been prepared at startup is absent.
    #[error("resource unavailable: {0}")]
    StartupResourceMissing(String),

    /// The target invoice could not be assembled.
    #[error("builder error: {0}")]
    Builder(String),

    /// An amount calculation left the range of `Decimal`.
    #[error("amount out of range: {0}")]
    AmountOverflow(String),
}

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn is_error(self) -> bool {
        self == Self::Error
    }
}

/// A single finding with field path, message and severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorItem {
    /// Path of the offending element (e.g. "/Invoice/Biller/Address/Name")
    /// or a dotted target field (e.g. "seller.contact").
    pub field: String,
    /// Human-readable description.
    pub message: String,
    pub severity: Severity,
    /// Rule identifier if applicable (e.g. "BR-DE-15").
    pub rule: Option<String>,
}

impl std::fmt::Display for ErrorItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "[{}] {}: {}", rule, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ErrorItem {
    /// An error-severity finding without rule ID.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Error,
            rule: None,
        }
    }

    /// A warning-severity finding without rule ID.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(field, message)
        }
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

/// Ordered collection of findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorList {
    items: Vec<ErrorItem>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ErrorItem) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ErrorItem>) {
        self.items.extend(items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if at least one finding has error severity.
    pub fn contains_error(&self) -> bool {
        self.items.iter().any(|i| i.severity.is_error())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorItem> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorItem> {
        self.items.iter().filter(|i| i.severity.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ErrorItem> {
        self.items.iter().filter(|i| !i.severity.is_error())
    }

    pub fn into_vec(self) -> Vec<ErrorItem> {
        self.items
    }
}

impl From<Vec<ErrorItem>> for ErrorList {
    fn from(items: Vec<ErrorItem>) -> Self {
        Self { items }
    }
}

impl FromIterator<ErrorItem> for ErrorList {
    fn from_iter<T: IntoIterator<Item = ErrorItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ErrorList {
    type Item = ErrorItem;
    type IntoIter = std::vec::IntoIter<ErrorItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a ErrorItem;
    type IntoIter = std::slice::Iter<'a, ErrorItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut list = ErrorList::new();
        list.push(ErrorItem::warning("buyer.contact", "recommended"));
        assert!(!list.contains_error());
        list.push(ErrorItem::error("buyer_reference", "missing").with_rule("BR-DE-15"));
        assert!(list.contains_error());
        assert_eq!(list.errors().count(), 1);
        assert_eq!(list.warnings().count(), 1);
    }

    #[test]
    fn owned_iteration_yields_items_in_order() {
        let list = ErrorList::from(vec![
            ErrorItem::error("a", "first"),
            ErrorItem::warning("b", "second"),
        ]);
        let fields: Vec<String> = list.into_iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[test]
    fn display_includes_rule() {
        let item = ErrorItem::error("payment", "missing").with_rule("BR-DE-1");
        assert_eq!(item.to_string(), "[BR-DE-1] payment: missing");
        let item = ErrorItem::error("/Invoice/InvoiceNumber", "missing");
        assert_eq!(item.to_string(), "/Invoice/InvoiceNumber: missing");
    }
}
