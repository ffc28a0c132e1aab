//! Fuzz target: parsing `CorrelationId` from `/loading?id=` values.
//!
//! Arbitrary strings must never panic, and anything that parses must
//! print back to the exact same token.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_core::CorrelationId;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(id) = text.parse::<CorrelationId>() {
        assert_eq!(id.to_string(), text, "accepted ids must be canonical");
    }
});
