//! Fuzz target: JSON deserialization and validation of `TunnelRequest`.
//!
//! Validation runs on untrusted input from the web UI; it must reject
//! garbage without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_core::{Tunnel, TunnelRequest};

fuzz_target!(|data: &[u8]| {
    let Ok(request) = serde_json::from_slice::<TunnelRequest>(data) else {
        return;
    };
    if request.validate().is_ok() {
        let tunnel = Tunnel::from_request(request).expect("validated request must build a tunnel");
        assert!(tunnel.client_port > 0);
    }
});
