//! HTML pages. Every function is a pure function of its inputs; all
//! document-derived text goes through [`escape`].

use std::fmt::Write;

use quick_xml::escape::escape;

use crate::config::LandingPage;
use crate::core::{ErrorList, Locale, Severity};
use crate::pipeline::{Converted, Failure, Validated};

/// Page that submitted a conversion form; the result page links back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Start,
    Labs,
}

impl Origin {
    pub fn from_form(value: Option<&str>) -> Self {
        match value {
            Some("labs") => Self::Labs,
            _ => Self::Start,
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Self::Start => "/",
            Self::Labs => "/labs",
        }
    }

    fn form_value(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Labs => "labs",
        }
    }
}

const STYLE: &str = "body{font-family:sans-serif;max-width:60em;margin:2em auto;color:#222}\
pre{background:#f4f4f4;padding:1em;overflow:auto}\
li.error{color:#a00}li.warning{color:#a60}\
form{border:1px solid #ccc;padding:1em;margin:1em 0}\
table{border-collapse:collapse}td,th{padding:.2em .6em;text-align:left}";

fn layout(locale: Locale, title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        lang = locale.language,
        title = escape(title),
    )
}

fn upload_form(action: &str, label: &str, origin: Option<Origin>) -> String {
    let origin_field = origin
        .map(|o| format!("<input type=\"hidden\" name=\"origin\" value=\"{}\">", o.form_value()))
        .unwrap_or_default();
    format!(
        "<form action=\"{action}\" method=\"post\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"file\" accept=\".xml,application/xml,text/xml\" required>\
         {origin_field}<button type=\"submit\">{label}</button></form>"
    )
}

pub fn landing_page(page: LandingPage, locale: Locale) -> String {
    match page {
        LandingPage::Start => start_page(locale),
        LandingPage::Service => service_page(locale),
        LandingPage::Labs => labs_page(locale),
    }
}

pub fn start_page(locale: Locale) -> String {
    let body = format!(
        "<p>{}</p>\n<h2>{}</h2>\n{}\n<h2>{}</h2>\n{}\n<p><a href=\"/service\">Service</a> | <a href=\"/labs\">Labs</a></p>",
        locale.pick(
            "Prüfen Sie ebInterface-Rechnungen der Versionen 4.0 bis 5.0 oder konvertieren Sie sie nach XRechnung.",
            "Check ebInterface invoices of versions 4.0 to 5.0 or convert them to XRechnung.",
        ),
        locale.pick("ebInterface prüfen", "Validate ebInterface"),
        upload_form("/validate", locale.pick("Prüfen", "Validate"), None),
        locale.pick("ebInterface nach XRechnung konvertieren", "Convert ebInterface to XRechnung"),
        upload_form(
            "/convert/xrechnung",
            locale.pick("Konvertieren", "Convert"),
            Some(Origin::Start)
        ),
    );
    layout(locale, "ebInterface Validation", &body)
}

pub fn service_page(locale: Locale) -> String {
    let body = format!(
        "<h2>{}</h2>\n{}\n<h2>{}</h2>\n{}",
        locale.pick("ebInterface prüfen", "Validate ebInterface"),
        upload_form("/validate", locale.pick("Prüfen", "Validate"), None),
        locale.pick("PDF-Bericht erstellen", "Create PDF report"),
        upload_form("/report", locale.pick("Bericht erstellen", "Create report"), None),
    );
    layout(locale, "ebInterface Service", &body)
}

pub fn labs_page(locale: Locale) -> String {
    let body = format!(
        "<p>{}</p>\n<h2>{}</h2>\n{}\n<h2>{}</h2>\n{}\n<h2>{}</h2>\n{}",
        locale.pick(
            "Experimentelle Funktionen.",
            "Experimental features.",
        ),
        locale.pick("ebInterface nach XRechnung konvertieren", "Convert ebInterface to XRechnung"),
        upload_form(
            "/convert/xrechnung",
            locale.pick("Konvertieren", "Convert"),
            Some(Origin::Labs)
        ),
        locale.pick("XRechnung herunterladen", "Download XRechnung"),
        upload_form(
            "/convert/xrechnung/download",
            locale.pick("Herunterladen", "Download"),
            Some(Origin::Labs)
        ),
        locale.pick("PDF-Bericht erstellen", "Create PDF report"),
        upload_form("/report", locale.pick("Bericht erstellen", "Create report"), None),
    );
    layout(locale, "ebInterface Labs", &body)
}

/// `<ul>` with one `<li>` per finding: "field: message".
pub fn findings_list(errors: &ErrorList) -> String {
    let mut html = String::from("<ul class=\"findings\">\n");
    for item in errors {
        let class = match item.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let rule = item
            .rule
            .as_deref()
            .map(|r| format!("[{}] ", escape(r)))
            .unwrap_or_default();
        let _ = writeln!(
            html,
            "<li class=\"{class}\">{rule}<span class=\"field\">{}</span>: {}</li>",
            escape(item.field.as_str()),
            escape(item.message.as_str())
        );
    }
    html.push_str("</ul>");
    html
}

pub fn failure_page(failure: &Failure, origin: Origin, locale: Locale) -> String {
    let body = format!(
        "<p class=\"failure\" data-kind=\"{kind}\"><b>{headline}</b></p>\n{list}\n<p><a href=\"{back}\">{label}</a></p>",
        kind = failure.kind,
        headline = escape(failure.kind.headline(locale)),
        list = findings_list(&failure.errors),
        back = origin.path(),
        label = locale.pick("Zurück", "Back"),
    );
    layout(locale, locale.pick("Verarbeitung fehlgeschlagen", "Processing failed"), &body)
}

pub fn validation_page(result: &Validated, locale: Locale) -> String {
    let inv = &result.invoice;
    let mut body = format!(
        "<p class=\"success\"><b>{}</b></p>\n<table>\n",
        escape(&format!(
            "{} (ebInterface {})",
            locale.pick(
                "Die Datei ist eine gültige ebInterface-Rechnung",
                "The file is a valid ebInterface invoice",
            ),
            result.version
        ))
    );
    let rows = [
        (locale.pick("Rechnungsnummer", "Invoice number"), inv.number.clone()),
        (locale.pick("Rechnungsdatum", "Invoice date"), inv.date.to_string()),
        (locale.pick("Dokumentart", "Document type"), inv.document_type.as_str().to_string()),
        (locale.pick("Rechnungssteller", "Biller"), inv.biller.address.name.clone()),
        (
            locale.pick("Rechnungsempfänger", "Invoice recipient"),
            inv.recipient.address.name.clone(),
        ),
        (locale.pick("Positionen", "Line items"), inv.lines.len().to_string()),
        (
            locale.pick("Gesamtbetrag", "Total gross amount"),
            format!("{} {}", locale.format_amount(inv.total_gross), inv.currency),
        ),
    ];
    for (label, value) in rows {
        let _ = writeln!(body, "<tr><th>{label}</th><td>{}</td></tr>", escape(value.as_str()));
    }
    body.push_str("</table>\n");

    for notice in &result.notices {
        let _ = writeln!(body, "<p class=\"notice\">{}</p>", escape(notice.as_str()));
    }
    if !result.findings.is_empty() {
        let _ = writeln!(body, "<h2>{}</h2>", locale.pick("Hinweise", "Warnings"));
        body.push_str(&findings_list(&result.findings));
    }
    body.push_str(&format!(
        "\n<p><a href=\"/\">{}</a></p>",
        locale.pick("Zurück", "Back")
    ));
    layout(locale, locale.pick("Prüfergebnis", "Validation result"), &body)
}

pub fn conversion_page(result: &Converted, origin: Origin, locale: Locale) -> String {
    let mut body = format!(
        "<p class=\"success\"><b>{}</b></p>\n",
        escape(&format!(
            "{} (ebInterface {}, {})",
            locale.pick(
                "Die Konvertierung nach XRechnung war erfolgreich",
                "The conversion to XRechnung was successful",
            ),
            result.version,
            result.invoice_number
        ))
    );
    if !result.warnings.is_empty() {
        let _ = writeln!(body, "<h2>{}</h2>", locale.pick("Hinweise", "Warnings"));
        body.push_str(&findings_list(&result.warnings));
        body.push('\n');
    }
    let _ = write!(
        body,
        "<h2>XRechnung (UBL)</h2>\n<pre class=\"ubl\">{}</pre>\n<p><a href=\"{}\">{}</a></p>",
        escape(result.ubl.as_str()),
        origin.path(),
        locale.pick("Zurück", "Back")
    );
    layout(locale, locale.pick("Konvertierungsergebnis", "Conversion result"), &body)
}

pub fn error_page(message: &str) -> String {
    layout(
        Locale::EN_GB,
        "Error",
        &format!("<p class=\"failure\">{}</p>\n<p><a href=\"/\">Back</a></p>", escape(message)),
    )
}
