#![no_main]

use std::sync::LazyLock;

use ebinterface_web::convert::XRechnungConverter;
use ebinterface_web::ebinterface::{SchemaRegistry, classify};
use libfuzzer_sys::fuzz_target;

static SCHEMAS: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::compile_all);

fuzz_target!(|data: &[u8]| {
    let Ok(version) = classify(data) else {
        return;
    };
    let Some(schema) = SCHEMAS.get(version) else {
        return;
    };
    let Ok(tree) = schema.validate(data) else {
        return;
    };
    // A schema-valid tree must read and convert without panicking.
    if let Ok(invoice) = ebinterface_web::ebinterface::read_invoice(version, &tree) {
        let outcome = XRechnungConverter::default().convert(&invoice);
        if let Some(mapped) = outcome.usable() {
            let _ = ebinterface_web::xrechnung::to_ubl_xml(mapped);
        }
    }
});
