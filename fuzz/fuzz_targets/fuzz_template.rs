#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = ebinterface_web::report::CompiledReportTemplate::compile(data);
});
