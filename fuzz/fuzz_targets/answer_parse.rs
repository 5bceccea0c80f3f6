#![no_main]

use libfuzzer_sys::fuzz_target;
use mt5_webapi::core::response::Response;
use mt5_webapi::core::text;

fuzz_target!(|data: &[u8]| {
    // A reassembled answer body from an untrusted server
    let Ok(answer) = text::from_wire(data) else {
        return;
    };
    let response = Response::parse(&answer);
    let _ = response.retcode();
    let _ = response.json::<serde_json::Value>();
    let _ = text::first_line_end(data);
});
