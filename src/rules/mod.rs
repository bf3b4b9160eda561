//! Business rules evaluated after schema validation.
//!
//! A [`RuleSet`] is compiled once from an XML resource (see
//! [`RuleSet::compile`]) and then evaluated read-only for every request.
//! Each rule names a context path, each assertion a test on a path
//! relative to that context.

mod compile;

use crate::core::{ErrorItem, ErrorList, Locale, Severity};
use crate::ebinterface::XmlElement;

/// The check an assertion performs on the selected values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Test {
    /// At least one value is selected.
    Exists,
    /// Nothing is selected.
    Absent,
    /// At least one value is selected and none is empty.
    NonEmpty,
    /// No more than this many values are selected.
    MaxCount(usize),
    /// Every selected value is in the list.
    OneOf(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Assertion {
    pub id: String,
    pub test: Test,
    /// Relative path of local names, optionally ending in `@Attribute`.
    pub path: String,
    pub severity: Severity,
    /// Messages by language code, first entry is the fallback.
    pub messages: Vec<(String, String)>,
}

impl Assertion {
    fn message(&self, locale: Locale) -> &str {
        self.messages
            .iter()
            .find(|(lang, _)| lang == locale.language)
            .or_else(|| self.messages.first())
            .map(|(_, text)| text.as_str())
            .unwrap_or(self.id.as_str())
    }

    fn holds(&self, context: &XmlElement) -> bool {
        let values = select_values(context, &self.path);
        match &self.test {
            Test::Exists => !values.is_empty(),
            Test::Absent => values.is_empty(),
            Test::NonEmpty => !values.is_empty() && values.iter().all(|v| !v.trim().is_empty()),
            Test::MaxCount(max) => values.len() <= *max,
            Test::OneOf(allowed) => values.iter().all(|v| allowed.iter().any(|a| a == v)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    /// Absolute context path, e.g. `/Invoice/Biller/Address`.
    pub context: String,
    pub assertions: Vec<Assertion>,
}

/// Compiled, immutable rule set.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn assertion_count(&self) -> usize {
        self.rules.iter().map(|r| r.assertions.len()).sum()
    }

    /// Evaluate every assertion against every matching context node.
    pub fn evaluate(&self, root: &XmlElement, locale: Locale) -> ErrorList {
        let mut findings = ErrorList::new();
        for rule in &self.rules {
            for (path, context) in resolve_context(root, &rule.context) {
                for assertion in &rule.assertions {
                    if !assertion.holds(context) {
                        let field = if assertion.path.is_empty() {
                            path.clone()
                        } else {
                            format!("{path}/{}", assertion.path)
                        };
                        findings.push(ErrorItem {
                            field,
                            message: assertion.message(locale).to_string(),
                            severity: assertion.severity,
                            rule: Some(assertion.id.clone()),
                        });
                    }
                }
            }
        }
        findings
    }
}

/// Nodes matching an absolute path, with a concrete path for each.
/// Steps get a 1-based index when the parent has several children of
/// that name.
fn resolve_context<'a>(root: &'a XmlElement, context: &str) -> Vec<(String, &'a XmlElement)> {
    let mut steps = context.split('/').filter(|s| !s.is_empty());
    if steps.next() != Some(root.name.as_str()) {
        return Vec::new();
    }
    let mut current = vec![(format!("/{}", root.name), root)];
    for step in steps {
        current = current
            .into_iter()
            .flat_map(|(path, el)| {
                let matches: Vec<_> = el.children_named(step).collect();
                let indexed = matches.len() > 1;
                matches.into_iter().enumerate().map(move |(i, child)| {
                    let p = if indexed {
                        format!("{path}/{step}[{}]", i + 1)
                    } else {
                        format!("{path}/{step}")
                    };
                    (p, child)
                })
            })
            .collect();
    }
    current
}

/// Text values (or attribute values for a trailing `@name`) at `path`.
fn select_values<'a>(context: &'a XmlElement, path: &str) -> Vec<&'a str> {
    let (elements, attribute) = match path.rsplit_once('@') {
        Some((prefix, attr)) => (prefix.trim_end_matches('/'), Some(attr)),
        None => (path, None),
    };
    let nodes = context.select(elements);
    match attribute {
        Some(attr) => nodes.into_iter().filter_map(|n| n.attribute(attr)).collect(),
        None => nodes.into_iter().map(|n| n.text.as_str()).collect(),
    }
}
