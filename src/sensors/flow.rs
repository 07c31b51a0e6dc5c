//! YF-S201 hall-effect water flow sensor pulse accounting.
//!
//! The sensor pulls its output low once per turbine increment.  A GPIO
//! interrupt on the falling edge calls [`PulseAccumulator::increment`];
//! the owning session reads and clears the total once, after disarming.
//!
//! One accumulator exists per tank per session.  It is allocated when the
//! window opens, shared with the interrupt callback through an `Arc`, and
//! dropped when the session ends, so no count ever leaks between tanks or
//! between calls.
//!
//! The counter is an `AtomicU32`: lock-free and available on every ESP32
//! core, where 64-bit atomics are not.  At the sensor's maximum pulse
//! rate a u32 lasts for months of continuous flow, far beyond one window.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::app::ports::EdgeCallback;

/// Per-session flow pulse counter.
#[derive(Debug, Default)]
pub struct PulseAccumulator {
    count: AtomicU32,
}

impl PulseAccumulator {
    pub fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Count one pulse.  Lock-free, so callable from interrupt context.
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Current running total, for progress logging only.
    pub fn peek(&self) -> u64 {
        u64::from(self.count.load(Ordering::Relaxed))
    }

    /// Atomically take the total and reset it to zero.
    pub fn read_and_reset(&self) -> u64 {
        u64::from(self.count.swap(0, Ordering::AcqRel))
    }

    /// Build an interrupt callback that increments this accumulator.
    pub fn edge_callback(self: &Arc<Self>) -> EdgeCallback {
        let acc = Arc::clone(self);
        Arc::new(move || acc.increment())
    }
}

/// Convert a pulse total to litres, rounded to 2 decimal places.
pub fn pulses_to_liters(pulses: u64, pulses_per_liter: f64) -> f64 {
    if pulses_per_liter <= 0.0 {
        return 0.0;
    }
    crate::sensors::round2(pulses as f64 / pulses_per_liter)
}
