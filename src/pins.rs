//! Pin identifiers and per-call pin ownership checks.
//!
//! Pins arrive from the caller per request rather than from a fixed board
//! map, so the only board-level rule enforced here is exclusivity: within
//! one measurement call every pin belongs to exactly one owner.

use std::collections::HashSet;

use crate::error::ConfigError;

/// Abstract GPIO number (BCM numbering on the Pi, GPIO number on ESP32).
pub type PinId = u8;

/// Single-pin register mask for `pin` on a chip with `pin_count` GPIOs.
/// `None` for a pin the chip does not have.
pub fn pin_mask(pin: PinId, pin_count: u32) -> Option<u64> {
    let n = u32::from(pin);
    if n >= pin_count {
        return None;
    }
    1u64.checked_shl(n)
}

/// Accumulates pin claims and rejects the first duplicate.
#[derive(Debug, Default)]
pub struct PinClaims {
    claimed: HashSet<PinId>,
}

impl PinClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `pin`.  Fails with [`ConfigError::PinConflict`] if any earlier
    /// claim already holds it.
    pub fn claim(&mut self, pin: PinId) -> Result<(), ConfigError> {
        if self.claimed.insert(pin) {
            Ok(())
        } else {
            Err(ConfigError::PinConflict(pin))
        }
    }

    /// Claim every present pin in `pins`, skipping absent wiring.
    pub fn claim_all(
        &mut self,
        pins: impl IntoIterator<Item = Option<PinId>>,
    ) -> Result<(), ConfigError> {
        pins.into_iter().flatten().try_for_each(|pin| self.claim(pin))
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
