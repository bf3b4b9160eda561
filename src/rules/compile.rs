use std::path::Path;

use tracing::info;

use super::{Assertion, Rule, RuleSet, Test};
use crate::core::{EbiError, Severity};
use crate::ebinterface::{XmlElement, parse_tree};

impl RuleSet {
    /// Compile a rule set document.
    ///
    /// ```xml
    /// <rules name="...">
    ///   <rule context="/Invoice/Biller">
    ///     <assert id="EBI-01" test="exists" path="Address/Email" role="warning">
    ///       <message lang="de">...</message>
    ///     </assert>
    ///   </rule>
    /// </rules>
    /// ```
    pub fn compile(bytes: &[u8]) -> Result<Self, EbiError> {
        let root = parse_tree(bytes).map_err(|e| EbiError::Rules(e.to_string()))?;
        if root.name != "rules" {
            return Err(EbiError::Rules(format!(
                "expected <rules> as root element, found <{}>",
                root.name
            )));
        }

        let rules = root
            .children_named("rule")
            .map(compile_rule)
            .collect::<Result<Vec<_>, _>>()?;
        if rules.is_empty() {
            return Err(EbiError::Rules("rule set contains no rules".into()));
        }

        Ok(Self {
            name: root.attribute("name").unwrap_or("unnamed").to_string(),
            rules,
        })
    }

    /// Read and compile a rule set file.
    pub fn load(path: &Path) -> Result<Self, EbiError> {
        let bytes = std::fs::read(path)
            .map_err(|e| EbiError::Rules(format!("{}: {e}", path.display())))?;
        let set = Self::compile(&bytes)?;
        info!(
            path = %path.display(),
            rules = set.rules.len(),
            assertions = set.assertion_count(),
            "compiled rule set '{}'",
            set.name
        );
        Ok(set)
    }
}

fn compile_rule(el: &XmlElement) -> Result<Rule, EbiError> {
    let context = required(el, "context")?;
    if !context.starts_with('/') {
        return Err(EbiError::Rules(format!(
            "rule context '{context}' must be an absolute path"
        )));
    }
    let assertions = el
        .children_named("assert")
        .map(compile_assertion)
        .collect::<Result<Vec<_>, _>>()?;
    if assertions.is_empty() {
        return Err(EbiError::Rules(format!(
            "rule for '{context}' has no assertions"
        )));
    }
    Ok(Rule {
        context: context.to_string(),
        assertions,
    })
}

fn compile_assertion(el: &XmlElement) -> Result<Assertion, EbiError> {
    let id = required(el, "id")?;
    let test = match required(el, "test")? {
        "exists" => Test::Exists,
        "absent" => Test::Absent,
        "non-empty" => Test::NonEmpty,
        "max-count" => {
            let count = required(el, "count")?;
            Test::MaxCount(count.parse().map_err(|_| {
                EbiError::Rules(format!("{id}: count '{count}' is not a number"))
            })?)
        }
        "one-of" => Test::OneOf(
            required(el, "values")?
                .split_whitespace()
                .map(String::from)
                .collect(),
        ),
        other => {
            return Err(EbiError::Rules(format!("{id}: unknown test '{other}'")));
        }
    };
    let severity = match el.attribute("role").unwrap_or("error") {
        "error" | "fatal" => Severity::Error,
        "warning" | "info" => Severity::Warning,
        other => {
            return Err(EbiError::Rules(format!("{id}: unknown role '{other}'")));
        }
    };

    let mut messages: Vec<(String, String)> = el
        .children_named("message")
        .map(|m| (m.attribute("lang").unwrap_or("en").to_string(), m.text.clone()))
        .collect();
    if messages.is_empty() && !el.text.is_empty() {
        messages.push(("en".into(), el.text.clone()));
    }
    if messages.is_empty() {
        return Err(EbiError::Rules(format!("{id}: assertion has no message")));
    }

    Ok(Assertion {
        id: id.to_string(),
        test,
        path: el.attribute("path").unwrap_or_default().to_string(),
        severity,
        messages,
    })
}

fn required<'a>(el: &'a XmlElement, name: &str) -> Result<&'a str, EbiError> {
    el.attribute(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| EbiError::Rules(format!("<{}> requires attribute '{name}'", el.name)))
}
