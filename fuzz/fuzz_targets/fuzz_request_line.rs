//! Fuzz target: console request parsing
//!
//! Drives arbitrary bytes through the command deserializer and the
//! request-to-plan conversion, and asserts that neither panics and that
//! every accepted pump plan has well-formed pin claims.
//!
//! cargo fuzz run fuzz_request_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use tankflow::app::commands::AppCommand;
use tankflow::pins::PinClaims;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(cmd) = serde_json::from_str::<AppCommand>(line) else {
        return;
    };

    match cmd {
        AppCommand::ControlWaterPump(req) => {
            if let Ok(plan) = req.into_plan() {
                let mut claims = PinClaims::new();
                let ok = claims.claim(plan.pump_pin).is_ok()
                    && plan.tanks.iter().all(|t| claims.claim_all(t.pins()).is_ok());
                // A clean claim set holds at least the pump pin.
                assert!(!ok || !claims.is_empty());
            }
        }
        AppCommand::CalculateTankCapacity(req) => {
            let _ = req.into_plan();
        }
    }
});
