use tracing::{info, warn};

use super::{Failure, FailureKind, Stage, ValidatedDocument, VersionHandler};
use crate::context::AppContext;
use crate::core::{EbiError, ErrorItem, ErrorList};
use crate::ebinterface::{EbInterfaceVersion, EbiInvoice, classify};
use crate::report::render_pdf;
use crate::xrechnung::to_ubl_xml;

/// Successful conversion: UBL XML plus the warnings of the mapping.
#[derive(Debug, Clone)]
pub struct Converted {
    pub version: EbInterfaceVersion,
    pub invoice_number: String,
    pub ubl: String,
    pub warnings: ErrorList,
}

/// Successful validation: the document and all non-fatal findings.
#[derive(Debug, Clone)]
pub struct Validated {
    pub version: EbInterfaceVersion,
    pub invoice: EbiInvoice,
    /// Warning-severity rule findings.
    pub findings: ErrorList,
    /// Hints about checks that could not run.
    pub notices: Vec<String>,
}

/// A rendered PDF report.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub version: EbInterfaceVersion,
    pub invoice_number: String,
    pub pdf: Vec<u8>,
}

/// Upload → classify → validate → convert → UBL XML.
pub fn convert_submission(ctx: &AppContext, bytes: &[u8]) -> Result<Converted, Failure> {
    let (handler, version) = classify_stage(ctx, bytes)?;
    let document = validate_stage(handler, version, bytes)?;

    info!(%version, stage = %Stage::Converting, "converting ebInterface {version} to XRechnung");
    let outcome = handler.convert(&document.invoice, ctx.locale, ctx.locale);
    let invoice = match outcome.usable() {
        Some(invoice) => invoice,
        None => {
            warn!(
                %version,
                errors = outcome.errors.errors().count(),
                "conversion produced errors, output discarded"
            );
            let errors = outcome.errors.errors().cloned().collect();
            return Err(Failure::new(FailureKind::ConversionFailed, Stage::Converting, errors));
        }
    };

    let ubl = to_ubl_xml(invoice).map_err(|e| {
        Failure::single(FailureKind::ConversionFailed, Stage::Converting, "/Invoice", e.to_string())
    })?;
    info!(%version, stage = %Stage::Succeeded, "conversion from ebInterface to XRechnung was successful");

    Ok(Converted {
        version,
        invoice_number: document.invoice.number,
        ubl,
        warnings: outcome.errors,
    })
}

/// Upload → classify → validate → business rules.
pub fn validate_submission(ctx: &AppContext, bytes: &[u8]) -> Result<Validated, Failure> {
    let (handler, version) = classify_stage(ctx, bytes)?;
    let document = validate_stage(handler, version, bytes)?;

    let mut notices = Vec::new();
    let findings = match &ctx.rules {
        Some(rules) => {
            info!(%version, stage = %Stage::EvaluatingRules, rules = %rules.name, "evaluating business rules");
            let findings = rules.evaluate(&document.tree, ctx.locale);
            if findings.contains_error() {
                return Err(Failure::new(
                    FailureKind::RulesViolated,
                    Stage::EvaluatingRules,
                    findings,
                ));
            }
            findings
        }
        None => {
            warn!(%version, "rule set unavailable, business rules skipped");
            notices.push(
                ctx.locale
                    .pick(
                        "Die Geschäftsregeln konnten nicht geprüft werden, da das Regelwerk nicht verfügbar ist.",
                        "Business rules were not checked because the rule set is unavailable.",
                    )
                    .to_string(),
            );
            ErrorList::new()
        }
    };
    info!(%version, stage = %Stage::Succeeded, warnings = findings.len(), "validation finished");

    Ok(Validated {
        version,
        invoice: document.invoice,
        findings,
        notices,
    })
}

/// Upload → classify → validate → PDF report.
pub fn render_submission(ctx: &AppContext, bytes: &[u8]) -> Result<Rendered, Failure> {
    let (handler, version) = classify_stage(ctx, bytes)?;
    let document = validate_stage(handler, version, bytes)?;

    let Some(template) = &ctx.report_template else {
        let err = EbiError::StartupResourceMissing("report template".into());
        warn!(%version, error = %err, "report requested without a compiled template");
        return Err(Failure::single(
            FailureKind::StartupResourceMissing,
            Stage::Rendering,
            "report",
            ctx.locale.pick(
                "Die Berichtsvorlage konnte beim Start nicht geladen werden.",
                "The report template could not be loaded at startup.",
            ),
        ));
    };

    info!(%version, stage = %Stage::Rendering, template = %template.name, "rendering PDF report");
    let pdf = render_pdf(template, &document.invoice).map_err(|e| {
        Failure::single(FailureKind::RenderingFailed, Stage::Rendering, "report", e.to_string())
    })?;
    info!(%version, stage = %Stage::Succeeded, bytes = pdf.len(), "report rendered");

    Ok(Rendered {
        version,
        invoice_number: document.invoice.number,
        pdf,
    })
}

fn classify_stage<'c>(
    ctx: &'c AppContext,
    bytes: &[u8],
) -> Result<(&'c dyn VersionHandler, EbInterfaceVersion), Failure> {
    info!(stage = %Stage::Received, bytes = bytes.len(), "submission received");
    let version = classify(bytes).map_err(|e| {
        info!(stage = %Stage::Classifying, error = %e, "classification failed");
        match e {
            EbiError::Io(msg) => Failure::single(FailureKind::Io, Stage::Received, "file", msg),
            EbiError::Malformed(msg) => Failure::single(
                FailureKind::UnknownFormat,
                Stage::Classifying,
                "file",
                format!(
                    "{} ({msg})",
                    ctx.locale.pick("Die Datei ist kein wohlgeformtes XML", "The file is not well-formed XML")
                ),
            ),
            other => match ctx.zugferd.as_ref().and_then(|z| z.recognise(bytes)) {
                Some(found) => {
                    info!(format = %found.format, profile = ?found.profile, "upload is a ZUGFeRD document");
                    let profile = found.profile.as_deref().unwrap_or("?");
                    Failure::single(
                        FailureKind::UnknownFormat,
                        Stage::Classifying,
                        found.format.clone(),
                        format!(
                            "{} ({} {profile})",
                            ctx.locale.pick(
                                "Die Datei ist eine ZUGFeRD-Rechnung; verarbeitet werden nur ebInterface-Dokumente",
                                "The file is a ZUGFeRD invoice; only ebInterface documents are processed",
                            ),
                            ctx.locale.pick("Profil", "profile"),
                        ),
                    )
                }
                None => Failure::single(
                    FailureKind::UnknownFormat,
                    Stage::Classifying,
                    "file",
                    other.to_string(),
                ),
            },
        }
    })?;

    let Some(handler) = ctx.handlers.get(version) else {
        info!(%version, stage = %Stage::Classifying, "unsupported ebInterface version");
        let message = format!(
            "{} {}",
            ctx.locale.pick(
                "Es können nur ebInterface-Dateien in den folgenden Versionen verarbeitet werden:",
                "Only ebInterface documents of the following versions can be processed:",
            ),
            ctx.handlers.versions_list()
        );
        return Err(Failure::new(
            FailureKind::UnsupportedVersion,
            Stage::Classifying,
            ErrorList::from(vec![ErrorItem::error(
                format!("ebInterface {version}"),
                message,
            )]),
        ));
    };
    info!(%version, stage = %Stage::Classifying, "classified as ebInterface {version}");
    Ok((handler, version))
}

fn validate_stage(
    handler: &dyn VersionHandler,
    version: EbInterfaceVersion,
    bytes: &[u8],
) -> Result<ValidatedDocument, Failure> {
    info!(%version, stage = %Stage::Validating, "parsing upload as ebInterface {version}");
    let outcome = handler.validate(bytes);
    match outcome.document {
        Some(document) => Ok(document),
        None => {
            info!(%version, errors = outcome.errors.len(), "schema validation failed");
            Err(Failure::new(FailureKind::SchemaInvalid, Stage::Validating, outcome.errors))
        }
    }
}
