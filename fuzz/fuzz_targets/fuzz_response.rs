#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // The response parser must never panic on any input; once the line
        // reader runs dry, truncated input must surface as a parse error.
        let _ = hornet_smt::response::parse_response(s, || Ok(String::new()));
    }
});
