//! Level-only tank volume estimate from the ultrasonic sensor.
//!
//! Used both standalone (no pump, no valves) and by a flow session's
//! optional cross-check.  The sensor owns its two pins only for the
//! duration of one batch and releases them afterwards.

use log::{info, warn};

use crate::app::model::{LevelSensorSpec, LevelReport};
use crate::app::ports::{Bias, Clock, DigitalIo, PinMode};
use crate::config::MeasurementConfig;
use crate::error::{ActuatorError, Error};
use crate::pins::PinId;
use crate::sensors::geometry::{volume_liters, water_height_cm};
use crate::sensors::round2;
use crate::sensors::ultrasonic::DistanceSampler;

/// Validate wiring/geometry and run one level measurement.
pub fn measure_level<D: DigitalIo + ?Sized, C: Clock + ?Sized>(
    io: &D,
    clock: &C,
    config: &MeasurementConfig,
    trig_pin: PinId,
    echo_pin: PinId,
    height_cm: f64,
    radius_cm: f64,
) -> Result<LevelReport, Error> {
    config.validate()?;
    let spec = LevelSensorSpec::new(trig_pin, echo_pin, height_cm, radius_cm)?;
    let report = measure_with(io, clock, config, &spec)?;
    info!(
        "level {}/{}: avg {:.2} cm, water {:.2} cm, {:.2} L ({} readings)",
        trig_pin,
        echo_pin,
        report.average_distance_cm,
        report.water_height_cm,
        report.estimated_volume_liters,
        report.readings.len()
    );
    Ok(report)
}

/// Run one batch against an already-validated sensor.
pub fn measure_with<D: DigitalIo + ?Sized, C: Clock + ?Sized>(
    io: &D,
    clock: &C,
    config: &MeasurementConfig,
    spec: &LevelSensorSpec,
) -> Result<LevelReport, Error> {
    let (trig, echo) = (spec.trig_pin, spec.echo_pin);

    let outcome = io
        .configure(trig, PinMode::Output, Bias::None)
        .map_err(|_| ActuatorError::SetupFailed(trig))
        .and_then(|()| {
            io.configure(echo, PinMode::Input, Bias::None)
                .map_err(|_| ActuatorError::SetupFailed(echo))
        })
        .map_err(Error::from)
        .and_then(|()| DistanceSampler::new(io, clock, config).measure_average(trig, echo));

    for pin in [trig, echo] {
        if let Err(e) = io.release(pin) {
            warn!("ultrasonic pin {} release failed ({})", pin, e);
        }
    }

    let (average_distance_cm, readings) = outcome?;
    Ok(LevelReport {
        average_distance_cm,
        water_height_cm: round2(water_height_cm(spec.height_cm, average_distance_cm)),
        estimated_volume_liters: volume_liters(spec.height_cm, spec.radius_cm, average_distance_cm),
        readings,
    })
}
