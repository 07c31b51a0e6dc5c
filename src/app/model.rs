//! Domain types shared by sessions, the orchestrator and the level sensor.

use std::time::Duration;

use serde::Serialize;

use crate::error::{ConfigError, Error, ErrorKind};
use crate::pins::PinId;

/// Wiring and geometry of one tank.  Borrowed read-only for a call.
///
/// Wiring arrives from the caller, so any field may be absent.  A tank
/// without flow or valve wiring fails its own session; the ultrasonic
/// pins and geometry are only needed for level readings.
#[derive(Debug, Clone, PartialEq)]
pub struct TankSpec {
    pub id: String,
    pub flow_pin: Option<PinId>,
    pub valve_pin: Option<PinId>,
    pub trig_pin: Option<PinId>,
    pub echo_pin: Option<PinId>,
    pub height_cm: Option<f64>,
    pub radius_cm: Option<f64>,
}

impl TankSpec {
    /// A tank with flow wiring only.
    pub fn flow_only(id: impl Into<String>, flow_pin: PinId, valve_pin: PinId) -> Self {
        Self {
            id: id.into(),
            flow_pin: Some(flow_pin),
            valve_pin: Some(valve_pin),
            trig_pin: None,
            echo_pin: None,
            height_cm: None,
            radius_cm: None,
        }
    }

    /// Every pin this tank claims, absent wiring included as `None`.
    pub fn pins(&self) -> [Option<PinId>; 4] {
        [self.flow_pin, self.valve_pin, self.trig_pin, self.echo_pin]
    }

    /// Ultrasonic wiring and geometry, if complete and valid.
    pub fn level_sensor(&self) -> Option<Result<LevelSensorSpec, ConfigError>> {
        let (trig, echo) = (self.trig_pin?, self.echo_pin?);
        let (height, radius) = (self.height_cm?, self.radius_cm?);
        Some(LevelSensorSpec::new(trig, echo, height, radius))
    }
}

/// Validated ultrasonic wiring and cylinder geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSensorSpec {
    pub trig_pin: PinId,
    pub echo_pin: PinId,
    pub height_cm: f64,
    pub radius_cm: f64,
}

impl LevelSensorSpec {
    pub fn new(trig_pin: PinId, echo_pin: PinId, height_cm: f64, radius_cm: f64) -> Result<Self, ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(height_cm) || !positive(radius_cm) {
            return Err(ConfigError::InvalidGeometry);
        }
        if trig_pin == echo_pin {
            return Err(ConfigError::PinConflict(trig_pin));
        }
        Ok(Self {
            trig_pin,
            echo_pin,
            height_cm,
            radius_cm,
        })
    }
}

/// Outcome of one tank's session.  Produced once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementResult {
    pub tank_id: String,
    pub pulses: u64,
    pub liters_from_flow: f64,
    pub liters_from_level: Option<f64>,
    pub error: Option<Error>,
}

impl MeasurementResult {
    pub fn completed(tank_id: &str, pulses: u64, liters_from_flow: f64, liters_from_level: Option<f64>) -> Self {
        Self {
            tank_id: tank_id.to_owned(),
            pulses,
            liters_from_flow,
            liters_from_level,
            error: None,
        }
    }

    /// Failed session: volumes zeroed, error recorded.
    pub fn failed(tank_id: &str, error: Error) -> Self {
        Self {
            tank_id: tank_id.to_owned(),
            pulses: 0,
            liters_from_flow: 0.0,
            liters_from_level: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.map(Error::kind)
    }
}

/// The shared pump interval bracketing every session of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpWindow {
    pub pump_on: Duration,
    pub pump_off: Duration,
}

impl PumpWindow {
    pub fn length(&self) -> Duration {
        self.pump_off.saturating_sub(self.pump_on)
    }
}

/// Result of a level-only measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub average_distance_cm: f64,
    pub water_height_cm: f64,
    pub estimated_volume_liters: f64,
    pub readings: Vec<f64>,
}
