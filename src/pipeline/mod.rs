//! Submission workflows: upload → classify → validate → convert / evaluate
//! rules / render.
//!
//! Every workflow runs the stages strictly in order and stops at the first
//! failing stage. A failure is a value ([`Failure`]) carrying a
//! [`FailureKind`] and every collected finding; it is presented to the user
//! and never propagated as a panic.

mod handler;
mod workflow;

use std::fmt;

use serde::Serialize;

use crate::core::{ErrorItem, ErrorList, Locale};

pub use handler::{EbInterfaceHandler, HandlerRegistry, ValidatedDocument, ValidationOutcome, VersionHandler};
pub use workflow::{
    Converted, Rendered, Validated, convert_submission, render_submission, validate_submission,
};

/// Processing stage of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Received,
    Classifying,
    Validating,
    Converting,
    EvaluatingRules,
    Rendering,
    Succeeded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Received => "received",
            Self::Classifying => "classifying",
            Self::Validating => "validating",
            Self::Converting => "converting",
            Self::EvaluatingRules => "evaluating-rules",
            Self::Rendering => "rendering",
            Self::Succeeded => "succeeded",
        })
    }
}

/// Why a submission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Io,
    UnknownFormat,
    UnsupportedVersion,
    SchemaInvalid,
    ConversionFailed,
    RulesViolated,
    RenderingFailed,
    StartupResourceMissing,
}

impl FailureKind {
    /// Headline shown above the finding list.
    pub fn headline(&self, locale: Locale) -> &'static str {
        match self {
            Self::Io => locale.pick(
                "Die hochgeladene Datei kann nicht verarbeitet werden.",
                "The uploaded file cannot be processed.",
            ),
            Self::UnknownFormat => locale.pick(
                "Die hochgeladene Datei konnte nicht als ebInterface-Datei interpretiert werden.",
                "The uploaded file could not be interpreted as an ebInterface document.",
            ),
            Self::UnsupportedVersion => locale.pick(
                "Diese ebInterface-Version wird nicht unterstützt.",
                "This ebInterface version is not supported.",
            ),
            Self::SchemaInvalid => locale.pick(
                "Die ebInterface-Datei entspricht nicht dem XML Schema und kann daher nicht verarbeitet werden.",
                "The ebInterface document does not conform to the XML schema and cannot be processed.",
            ),
            Self::ConversionFailed => locale.pick(
                "Bei der ebInterface-XRechnung-Konvertierung sind folgende Fehler aufgetreten:",
                "The following errors occurred during the ebInterface to XRechnung conversion:",
            ),
            Self::RulesViolated => locale.pick(
                "Die ebInterface-Datei verletzt folgende Geschäftsregeln:",
                "The ebInterface document violates the following business rules:",
            ),
            Self::RenderingFailed => locale.pick(
                "Der Bericht konnte nicht erstellt werden.",
                "The report could not be created.",
            ),
            Self::StartupResourceMissing => locale.pick(
                "Diese Funktion ist derzeit nicht verfügbar.",
                "This feature is currently unavailable.",
            ),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Io => "io",
            Self::UnknownFormat => "unknown-format",
            Self::UnsupportedVersion => "unsupported-version",
            Self::SchemaInvalid => "schema-invalid",
            Self::ConversionFailed => "conversion-failed",
            Self::RulesViolated => "rules-violated",
            Self::RenderingFailed => "rendering-failed",
            Self::StartupResourceMissing => "startup-resource-missing",
        })
    }
}

/// Terminal failure of a submission.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    /// Stage in which the submission stopped.
    pub stage: Stage,
    pub errors: ErrorList,
}

impl Failure {
    pub fn new(kind: FailureKind, stage: Stage, errors: ErrorList) -> Self {
        Self {
            kind,
            stage,
            errors,
        }
    }

    /// Failure with one error finding.
    pub fn single(
        kind: FailureKind,
        stage: Stage,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            kind,
            stage,
            ErrorList::from(vec![ErrorItem::error(field, message)]),
        )
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in stage {} ({} findings)", self.kind, self.stage, self.errors.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_display_as_kebab_case() {
        assert_eq!(FailureKind::SchemaInvalid.to_string(), "schema-invalid");
        assert_eq!(
            FailureKind::StartupResourceMissing.to_string(),
            "startup-resource-missing"
        );
        assert_eq!(Stage::EvaluatingRules.to_string(), "evaluating-rules");
    }

    #[test]
    fn single_failure_carries_one_error() {
        let failure = Failure::single(FailureKind::Io, Stage::Received, "file", "empty");
        assert_eq!(failure.errors.len(), 1);
        assert!(failure.errors.contains_error());
        assert_eq!(failure.to_string(), "io in stage received (1 findings)");
        assert!(FailureKind::Io.headline(Locale::EN_GB).starts_with("The uploaded file"));
    }
}
