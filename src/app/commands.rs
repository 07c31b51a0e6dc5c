//! Inbound commands and their dispatch.
//!
//! One command per JSON document, tagged by `command` with the names of
//! the server's two endpoints.  [`handle_line`] is the whole console
//! protocol: one request line in, one response line out.

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::app::level::measure_level;
use crate::app::orchestrator::TankOrchestrator;
use crate::app::ports::{Clock, DigitalIo};
use crate::app::request::{
    ErrorResponse, LevelRequest, LevelResponse, PumpFlowRequest, PumpFlowResponse,
};
use crate::config::MeasurementConfig;
use crate::error::Error;

/// Commands the controlling server can send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AppCommand {
    /// Run the main pump and measure flow into every listed tank.
    ControlWaterPump(PumpFlowRequest),

    /// Estimate one tank's volume from its ultrasonic level sensor.
    CalculateTankCapacity(LevelRequest),
}

/// Response body of a successfully executed command.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandResponse {
    PumpFlow(PumpFlowResponse),
    Level(LevelResponse),
}

/// Execute a parsed command and build its response body.
pub fn execute<D: DigitalIo + ?Sized, C: Clock + ?Sized>(
    cmd: AppCommand,
    io: &D,
    clock: &C,
    config: &MeasurementConfig,
) -> Result<CommandResponse, Error> {
    match cmd {
        AppCommand::ControlWaterPump(req) => {
            let plan = req.into_plan()?;
            let results = TankOrchestrator::new(io, clock, config).run(
                plan.pump_pin,
                plan.duration_secs,
                &plan.tanks,
            )?;
            Ok(CommandResponse::PumpFlow(PumpFlowResponse::completed(
                plan.pump_pin,
                plan.duration_secs,
                &results,
            )))
        }
        AppCommand::CalculateTankCapacity(req) => {
            let plan = req.into_plan()?;
            let report = measure_level(
                io,
                clock,
                config,
                plan.trig_pin,
                plan.echo_pin,
                plan.height_cm,
                plan.radius_cm,
            )?;
            Ok(CommandResponse::Level(report))
        }
    }
}

/// Parse one request line, execute it, and render the response line.
pub fn handle_line<D: DigitalIo + ?Sized, C: Clock + ?Sized>(
    line: &str,
    io: &D,
    clock: &C,
    config: &MeasurementConfig,
) -> String {
    match serde_json::from_str::<AppCommand>(line) {
        Ok(cmd) => match execute(cmd, io, clock, config) {
            Ok(response) => render(&response),
            Err(e) => {
                warn!("command failed: {}", e);
                render(&ErrorResponse {
                    error: e.to_string(),
                    error_kind: Some(e.kind()),
                })
            }
        },
        Err(e) => {
            warn!("malformed request: {}", e);
            render(&ErrorResponse {
                error: format!("malformed request: {e}"),
                error_kind: None,
            })
        }
    }
}

/// Sent when a response cannot be encoded, so the caller still gets a line.
const ENCODING_FAILED: &str = r#"{"error":"response encoding failed","error_kind":null}"#;

fn render<T: Serialize>(body: &T) -> String {
    serde_json::to_string(body).unwrap_or_else(|e| {
        error!("response encoding failed: {}", e);
        ENCODING_FAILED.to_owned()
    })
}
