//! HC-SR04 time-of-flight ultrasonic ranging.
//!
//! A 10 µs high pulse on TRIG starts a ping; the module then holds ECHO
//! high for the round-trip time of the sound burst.  Distance is the
//! echo width multiplied by half the speed of sound.
//!
//! Every edge wait is bounded by `echo_timeout` (40 ms by default, about
//! 6.8 m one way), so a disconnected or stuck sensor costs at most two
//! timeouts per ping instead of hanging the session.

use std::time::Duration;

use log::{debug, warn};

use crate::app::ports::{Clock, DigitalIo, Level};
use crate::config::MeasurementConfig;
use crate::error::{ActuatorError, Error, SensorError};
use crate::pins::PinId;
use crate::sensors::round2;

/// Half the speed of sound in air at ~20 °C, in cm/s.
pub const HALF_SPEED_OF_SOUND_CM_S: f64 = 17_150.0;

/// One accepted ping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceReading {
    /// Width of the echo high pulse.
    pub pulse_duration: Duration,
    /// Distance to the reflecting surface (cm, 2 dp).
    pub distance_cm: f64,
}

/// Ultrasonic ranging over the [`DigitalIo`] port.
///
/// Stateless between calls: two batches over the same echo trace give the
/// same readings.
pub struct DistanceSampler<'a, D: DigitalIo + ?Sized, C: Clock + ?Sized> {
    io: &'a D,
    clock: &'a C,
    config: &'a MeasurementConfig,
}

impl<'a, D: DigitalIo + ?Sized, C: Clock + ?Sized> DistanceSampler<'a, D, C> {
    pub fn new(io: &'a D, clock: &'a C, config: &'a MeasurementConfig) -> Self {
        Self { io, clock, config }
    }

    /// Run one ping and classify the outcome.
    pub fn ping(&self, trig: PinId, echo: PinId) -> Result<DistanceReading, Error> {
        let timeout = self.config.echo_timeout();

        self.drive(trig, Level::Low)?;
        self.clock.sleep(self.config.trigger_settle());
        self.drive(trig, Level::High)?;
        self.clock.sleep(self.config.trigger_pulse());
        self.drive(trig, Level::Low)?;
        let triggered = self.clock.now();

        let rise = self
            .wait_for(echo, Level::High, triggered, timeout)
            .ok_or(SensorError::Timeout)?;
        let fall = self
            .wait_for(echo, Level::Low, rise, timeout)
            .ok_or(SensorError::Timeout)?;

        let pulse_duration = fall.saturating_sub(rise);
        if pulse_duration.is_zero() || pulse_duration > timeout {
            return Err(SensorError::Implausible.into());
        }

        Ok(DistanceReading {
            pulse_duration,
            distance_cm: round2(pulse_duration.as_secs_f64() * HALF_SPEED_OF_SOUND_CM_S),
        })
    }

    /// One ping; `None` for any timed-out or implausible echo.
    pub fn measure_once(&self, trig: PinId, echo: PinId) -> Option<f64> {
        match self.ping(trig, echo) {
            Ok(reading) => {
                debug!(
                    "ultrasonic {}/{}: {:.2} cm ({} µs)",
                    trig,
                    echo,
                    reading.distance_cm,
                    reading.pulse_duration.as_micros()
                );
                Some(reading.distance_cm)
            }
            Err(e) => {
                debug!("ultrasonic {}/{}: reading rejected ({})", trig, echo, e);
                None
            }
        }
    }

    /// Up to `sample_count` pings spaced by `inter_sample_delay`.  Invalid
    /// pings are skipped, not retried; the result may be empty.
    pub fn measure_n(&self, trig: PinId, echo: PinId) -> Vec<f64> {
        let n = self.config.sample_count;
        let mut readings = Vec::with_capacity(n);
        for i in 0..n {
            if i > 0 {
                self.clock.sleep(self.config.inter_sample_delay());
            }
            if let Some(distance) = self.measure_once(trig, echo) {
                readings.push(distance);
            }
        }
        if readings.len() < n {
            warn!(
                "ultrasonic {}/{}: {} of {} readings valid",
                trig,
                echo,
                readings.len(),
                n
            );
        }
        readings
    }

    /// Mean of a full batch, or [`SensorError::AllReadingsFailed`].
    pub fn measure_average(&self, trig: PinId, echo: PinId) -> Result<(f64, Vec<f64>), Error> {
        let readings = self.measure_n(trig, echo);
        let avg = average(&readings).ok_or(SensorError::AllReadingsFailed)?;
        Ok((avg, readings))
    }

    // ── Internal ──────────────────────────────────────────────

    fn drive(&self, pin: PinId, level: Level) -> Result<(), Error> {
        self.io
            .write(pin, level)
            .map_err(|_| ActuatorError::WriteFailed(pin).into())
    }

    /// Poll `pin` until it reads `level`; the timestamp of the first
    /// matching sample, or `None` once `timeout` past `since` elapses.
    /// A failed read counts as no edge.
    fn wait_for(&self, pin: PinId, level: Level, since: Duration, timeout: Duration) -> Option<Duration> {
        loop {
            let sample = self.io.read(pin).ok()?;
            let now = self.clock.now();
            if sample == level {
                return Some(now);
            }
            if now.saturating_sub(since) > timeout {
                return None;
            }
        }
    }
}

/// Arithmetic mean rounded to 2 dp; `None` for an empty slice.
pub fn average(readings: &[f64]) -> Option<f64> {
    if readings.is_empty() {
        return None;
    }
    Some(round2(readings.iter().sum::<f64>() / readings.len() as f64))
}
