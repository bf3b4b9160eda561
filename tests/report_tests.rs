//! PDF reports rendered from the bundled template.

use std::path::Path;

use ebinterface_web::pipeline::{VersionHandler, render_submission};
use ebinterface_web::report::{CompiledReportTemplate, render_pdf};
use ebinterface_web::{AppConfig, AppContext, bootstrap};
use lopdf::Document;

fn context() -> AppContext {
    let resources = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources");
    bootstrap(&AppConfig::with_resource_dir(resources)).unwrap()
}

fn sample(name: &str) -> String {
    std::fs::read_to_string(format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))).unwrap()
}

/// The 4.3 sample with `count` generated line items.
fn with_lines(count: usize) -> String {
    let xml = sample("ebinterface-4.3.xml");
    let start = xml.find("<ItemList>").unwrap();
    let end = xml.find("</ItemList>").unwrap() + "</ItemList>".len();
    let items: String = (1..=count)
        .map(|n| {
            format!(
                "<ListLineItem><PositionNumber>{n}</PositionNumber>\
                 <Description>Leistung {n}</Description>\
                 <Quantity Unit=\"C62\">1</Quantity><UnitPrice>10.00</UnitPrice>\
                 <TaxItem><TaxableAmount>10.00</TaxableAmount>\
                 <TaxPercent TaxCategoryCode=\"S\">20</TaxPercent></TaxItem>\
                 <LineItemAmount>10.00</LineItemAmount></ListLineItem>"
            )
        })
        .collect();
    format!("{}<ItemList>{items}</ItemList>{}", &xml[..start], &xml[end..])
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

#[test]
fn every_sample_renders_a_single_page() {
    let ctx = context();
    for file in [
        "ebinterface-4.0.xml",
        "ebinterface-4.1.xml",
        "ebinterface-4.2.xml",
        "ebinterface-4.3.xml",
        "ebinterface-5.0.xml",
    ] {
        let rendered = render_submission(&ctx, sample(file).as_bytes())
            .unwrap_or_else(|f| panic!("{file}: {f}"));
        assert!(rendered.pdf.starts_with(b"%PDF-1.7"), "{file}");
        let doc = Document::load_mem(&rendered.pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1, "{file}");
        assert!(contains(&rendered.pdf, "Seite 1 von 1"), "{file}");
    }
}

#[test]
fn report_shows_invoice_data() {
    let rendered = render_submission(&context(), sample("ebinterface-4.3.xml").as_bytes()).unwrap();
    assert_eq!(rendered.invoice_number, "RE-2024-0043");
    assert!(contains(&rendered.pdf, "RE-2024-0043"));
    assert!(contains(&rendered.pdf, "AT611904300234573201"));
    // German number format from the template locale.
    assert!(contains(&rendered.pdf, "2.256,00"));
}

#[test]
fn long_item_lists_continue_on_further_pages() {
    let rendered = render_submission(&context(), with_lines(60).as_bytes()).unwrap();
    let doc = Document::load_mem(&rendered.pdf).unwrap();
    let pages = doc.get_pages().len();
    assert!(pages >= 2, "{pages} pages");
    assert!(contains(&rendered.pdf, &format!("Seite 1 von {pages}")));
    assert!(contains(&rendered.pdf, &format!("Seite {pages} von {pages}")));
    assert!(contains(&rendered.pdf, "Leistung 60"));
}

#[test]
fn more_lines_never_mean_fewer_pages() {
    let template = context().report_template.unwrap();
    let mut previous = 0;
    for count in [1, 20, 40, 80, 120] {
        let pages = page_count(&template, &with_lines(count));
        assert!(pages >= previous, "{count} lines: {pages} < {previous}");
        previous = pages;
    }
    assert!(previous >= 3);
}

fn page_count(template: &CompiledReportTemplate, xml: &str) -> usize {
    let ctx = context();
    let version = ebinterface_web::ebinterface::classify(xml.as_bytes()).unwrap();
    let outcome = ctx.handlers.get(version).unwrap().validate(xml.as_bytes());
    let invoice = outcome.document.unwrap().invoice;
    let pdf = render_pdf(template, &invoice).unwrap();
    Document::load_mem(&pdf).unwrap().get_pages().len()
}

#[test]
fn corrupted_template_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xml");
    std::fs::write(&path, "<report name=\"x\" width=\"595\"><field").unwrap();
    assert!(CompiledReportTemplate::load(&path).is_err());
    assert!(CompiledReportTemplate::load(&dir.path().join("missing.xml")).is_err());
}
