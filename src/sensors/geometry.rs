//! Cylindrical tank volume from an ultrasonic distance-to-surface reading.
//!
//! The sensor sits at the top of the tank looking down, so the water
//! column is the tank height minus the measured distance.

use core::f64::consts::PI;

use crate::sensors::round2;

/// Water column height (cm), clamped at zero for an empty tank or a
/// reading past the tank floor.
pub fn water_height_cm(height_cm: f64, avg_distance_cm: f64) -> f64 {
    (height_cm - avg_distance_cm).max(0.0)
}

/// Liquid volume in litres, rounded to 2 decimal places.
pub fn volume_liters(height_cm: f64, radius_cm: f64, avg_distance_cm: f64) -> f64 {
    let water_height = water_height_cm(height_cm, avg_distance_cm);
    round2(PI * radius_cm * radius_cm * water_height / 1000.0)
}
