//! Measurement configuration parameters
//!
//! Hardware calibration (pulses per litre, relay polarity) and the fixed
//! delays of a measurement window.  Calibration differs per deployment, so
//! none of these values are baked into the measurement code.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drivers::relay::RelayPolarity;
use crate::error::ConfigError;

/// Core measurement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    // --- Flow sensor ---
    /// Flow sensor calibration in pulses per litre (YF-S201: 350–450)
    pub pulses_per_liter: f64,

    // --- Relays ---
    /// Electrical level that opens a solenoid valve
    pub valve_polarity: RelayPolarity,
    /// Electrical level that runs the main pump
    pub pump_polarity: RelayPolarity,

    // --- Flow window ---
    /// Pump run time before any valve opens, for line pressure (ms)
    pub pump_warmup_ms: u64,
    /// Residual-flow settle time between disarming and closing a valve (ms)
    pub valve_settle_ms: u64,
    /// Running pulse count log interval during a window (ms)
    pub poll_interval_ms: u64,

    // --- Ultrasonic ---
    /// Trigger held low before each ping (ms)
    pub trigger_settle_ms: u64,
    /// Trigger pulse width (µs)
    pub trigger_pulse_us: u64,
    /// Bound on each echo edge wait, and on the echo window itself (ms)
    pub echo_timeout_ms: u64,
    /// Pings per distance batch
    pub sample_count: usize,
    /// Delay between pings in a batch (ms)
    pub inter_sample_delay_ms: u64,

    // --- Features ---
    /// Cross-check flow volume against an ultrasonic level reading
    pub cross_check_level: bool,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            // Flow sensor
            pulses_per_liter: 450.0,

            // Relays
            valve_polarity: RelayPolarity::ActiveLow,
            pump_polarity: RelayPolarity::ActiveHigh,

            // Flow window
            pump_warmup_ms: 1000,
            valve_settle_ms: 1000,
            poll_interval_ms: 50,

            // Ultrasonic (HC-SR04)
            trigger_settle_ms: 50,
            trigger_pulse_us: 10,
            echo_timeout_ms: 40,
            sample_count: 5,
            inter_sample_delay_ms: 100,

            // Features
            cross_check_level: false,
        }
    }
}

impl MeasurementConfig {
    /// Reject values that would make a measurement meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pulses_per_liter.is_finite() || self.pulses_per_liter <= 0.0 {
            return Err(ConfigError::ValidationFailed("pulses_per_liter must be positive"));
        }
        if self.sample_count == 0 {
            return Err(ConfigError::ValidationFailed("sample_count must be at least 1"));
        }
        if self.echo_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("echo_timeout_ms must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be positive"));
        }
        Ok(())
    }

    pub fn pump_warmup(&self) -> Duration {
        Duration::from_millis(self.pump_warmup_ms)
    }

    pub fn valve_settle(&self) -> Duration {
        Duration::from_millis(self.valve_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn trigger_settle(&self) -> Duration {
        Duration::from_millis(self.trigger_settle_ms)
    }

    pub fn trigger_pulse(&self) -> Duration {
        Duration::from_micros(self.trigger_pulse_us)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn inter_sample_delay(&self) -> Duration {
        Duration::from_millis(self.inter_sample_delay_ms)
    }
}
