use std::path::Path;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ebinterface_web::ebinterface::{EbInterfaceVersion, classify};
use ebinterface_web::pipeline::{VersionHandler, convert_submission, render_submission};
use ebinterface_web::{AppConfig, AppContext, bootstrap};

fn context() -> AppContext {
    let resources = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources");
    bootstrap(&AppConfig::with_resource_dir(resources)).unwrap()
}

fn sample() -> Vec<u8> {
    std::fs::read(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/ebinterface-4.3.xml"))
        .unwrap()
}

/// The 4.3 sample with 500 line items.
fn large_sample() -> Vec<u8> {
    let xml = String::from_utf8(sample()).unwrap();
    let start = xml.find("<ItemList>").unwrap();
    let end = xml.find("</ItemList>").unwrap() + "</ItemList>".len();
    let items: String = (1..=500)
        .map(|n| {
            format!(
                "<ListLineItem><PositionNumber>{n}</PositionNumber>\
                 <Description>Item {n}</Description>\
                 <Quantity Unit=\"C62\">2</Quantity><UnitPrice>9.99</UnitPrice>\
                 <TaxItem><TaxableAmount>19.98</TaxableAmount>\
                 <TaxPercent TaxCategoryCode=\"S\">20</TaxPercent></TaxItem>\
                 <LineItemAmount>19.98</LineItemAmount></ListLineItem>"
            )
        })
        .collect();
    format!("{}<ItemList>{items}</ItemList>{}", &xml[..start], &xml[end..]).into_bytes()
}

fn bench_classify(c: &mut Criterion) {
    let bytes = sample();
    c.bench_function("classify", |b| {
        b.iter(|| black_box(classify(black_box(&bytes))));
    });
}

fn bench_schema_validate(c: &mut Criterion) {
    let ctx = context();
    let handler = ctx.handlers.get(EbInterfaceVersion::V43).unwrap();
    let bytes = sample();
    let large = large_sample();
    c.bench_function("schema_validate", |b| {
        b.iter(|| black_box(handler.validate(black_box(&bytes))));
    });
    c.bench_function("schema_validate_500_lines", |b| {
        b.iter(|| black_box(handler.validate(black_box(&large))));
    });
}

fn bench_convert(c: &mut Criterion) {
    let ctx = context();
    let bytes = sample();
    let large = large_sample();
    c.bench_function("convert_submission", |b| {
        b.iter(|| black_box(convert_submission(&ctx, black_box(&bytes))));
    });
    c.bench_function("convert_submission_500_lines", |b| {
        b.iter(|| black_box(convert_submission(&ctx, black_box(&large))));
    });
}

fn bench_render(c: &mut Criterion) {
    let ctx = context();
    let bytes = sample();
    let large = large_sample();
    c.bench_function("render_submission", |b| {
        b.iter(|| black_box(render_submission(&ctx, black_box(&bytes))));
    });
    c.bench_function("render_submission_500_lines", |b| {
        b.iter(|| black_box(render_submission(&ctx, black_box(&large))));
    });
}

criterion_group!(
    benches,
    bench_classify,
    bench_schema_validate,
    bench_convert,
    bench_render
);
criterion_main!(benches);
