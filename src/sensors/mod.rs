//! Sensor subsystem: flow pulse accounting, ultrasonic ranging, and
//! tank geometry.

pub mod flow;
pub mod geometry;
pub mod ultrasonic;

/// Round to 2 decimal places, the precision every reported distance and
/// volume carries.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
