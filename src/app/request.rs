//! Request and response shapes exchanged with the controlling server.
//!
//! Field names follow the server's tank documents (`hardware.waterflow_sensor`,
//! `main_tank.water_pump_duration`, ...).  Every wiring field is optional on
//! the wire: a missing main-pump pin or duration rejects the whole request,
//! a missing per-tank pin fails only that tank's session.

use serde::{Deserialize, Serialize};

use crate::app::model::{LevelReport, MeasurementResult, TankSpec};
use crate::error::{ConfigError, ErrorKind};
use crate::pins::PinId;

// ───────────────────────────────────────────────────────────────
// Pump + flow
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PumpFlowRequest {
    pub main_tank: MainTankRequest,
    #[serde(default)]
    pub tanks: Vec<TankRequest>,
    /// Single-tank form used by older server builds.
    #[serde(default)]
    pub tank: Option<TankRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainTankRequest {
    #[serde(default)]
    pub hardware: MainTankHardware,
    pub water_pump_duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MainTankHardware {
    pub water_pump: Option<PinId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TankRequest {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub hardware: TankHardware,
    pub height: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TankHardware {
    pub waterflow_sensor: Option<PinId>,
    pub solenoid_valve: Option<PinId>,
    pub ultrasonic_sensor_trig: Option<PinId>,
    pub ultrasonic_sensor_echo: Option<PinId>,
}

impl From<TankRequest> for TankSpec {
    fn from(req: TankRequest) -> Self {
        Self {
            id: req.id,
            flow_pin: req.hardware.waterflow_sensor,
            valve_pin: req.hardware.solenoid_valve,
            trig_pin: req.hardware.ultrasonic_sensor_trig,
            echo_pin: req.hardware.ultrasonic_sensor_echo,
            height_cm: req.height,
            radius_cm: req.radius,
        }
    }
}

/// Call-level parameters of a pump + flow request.
#[derive(Debug, Clone, PartialEq)]
pub struct PumpFlowPlan {
    pub pump_pin: PinId,
    pub duration_secs: f64,
    pub tanks: Vec<TankSpec>,
}

impl PumpFlowRequest {
    /// Extract call-level wiring.  Per-tank wiring is passed through as-is.
    pub fn into_plan(self) -> Result<PumpFlowPlan, ConfigError> {
        let pump_pin = self
            .main_tank
            .hardware
            .water_pump
            .ok_or(ConfigError::MissingField("main_tank.hardware.water_pump"))?;
        let duration_secs = self
            .main_tank
            .water_pump_duration
            .ok_or(ConfigError::MissingField("main_tank.water_pump_duration"))?;
        let tanks = self
            .tanks
            .into_iter()
            .chain(self.tank)
            .map(TankSpec::from)
            .collect();
        Ok(PumpFlowPlan {
            pump_pin,
            duration_secs,
            tanks,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PumpFlowResponse {
    pub message: &'static str,
    pub pin: PinId,
    pub duration: f64,
    pub status: &'static str,
    pub tanks: Vec<TankReport>,
}

impl PumpFlowResponse {
    pub fn completed(pin: PinId, duration: f64, results: &[MeasurementResult]) -> Self {
        Self {
            message: "Water pump controlled successfully",
            pin,
            duration,
            status: "completed",
            tanks: results.iter().map(TankReport::from).collect(),
        }
    }
}

/// Wire form of a [`MeasurementResult`].
#[derive(Debug, Clone, Serialize)]
pub struct TankReport {
    pub tank_id: String,
    pub pulses: u64,
    pub liters_from_flow: f64,
    pub liters_from_level: Option<f64>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl From<&MeasurementResult> for TankReport {
    fn from(r: &MeasurementResult) -> Self {
        Self {
            tank_id: r.tank_id.clone(),
            pulses: r.pulses,
            liters_from_flow: r.liters_from_flow,
            liters_from_level: r.liters_from_level,
            error: r.error.map(|e| e.to_string()),
            error_kind: r.error_kind(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Level only
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LevelRequest {
    #[serde(default)]
    pub hardware: LevelHardware,
    pub height: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LevelHardware {
    pub ultrasonic_sensor_trig: Option<PinId>,
    pub ultrasonic_sensor_echo: Option<PinId>,
}

/// Wiring and geometry of a level-only request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelPlan {
    pub trig_pin: PinId,
    pub echo_pin: PinId,
    pub height_cm: f64,
    pub radius_cm: f64,
}

impl LevelRequest {
    pub fn into_plan(self) -> Result<LevelPlan, ConfigError> {
        Ok(LevelPlan {
            trig_pin: self
                .hardware
                .ultrasonic_sensor_trig
                .ok_or(ConfigError::MissingField("hardware.ultrasonic_sensor_trig"))?,
            echo_pin: self
                .hardware
                .ultrasonic_sensor_echo
                .ok_or(ConfigError::MissingField("hardware.ultrasonic_sensor_echo"))?,
            height_cm: self.height.ok_or(ConfigError::MissingField("height"))?,
            radius_cm: self.radius.ok_or(ConfigError::MissingField("radius"))?,
        })
    }
}

/// The level response is the report itself.
pub type LevelResponse = LevelReport;

/// Body returned for any rejected request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_kind: Option<ErrorKind>,
}
