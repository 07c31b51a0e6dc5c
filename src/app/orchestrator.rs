//! Multi-tank orchestrator: one pump window, one session per tank.
//!
//! ```text
//!  validate ──▶ pump ON ──▶ warm-up ──▶ ┌ session(tank 0) ┐ ──▶ join all ──▶ pump OFF
//!                                       ├ session(tank 1) ┤
//!                                       └ session(tank N) ┘
//! ```
//!
//! Sessions run on scoped worker threads, so none outlives the call.  The
//! pump is switched only by the orchestrating thread: on before any worker
//! starts, off after every worker has been joined.  It is held through a
//! [`RelayGuard`](crate::drivers::relay::RelayGuard), so it also goes off
//! if this thread unwinds.
//!
//! Call-level validation (empty tank list, bad duration, pin aliasing,
//! calibration) happens before any pin is touched.  Past that point every
//! failure belongs to a single tank and is reported in its result.

use std::time::Duration;

use log::{error, info};

use crate::app::model::{MeasurementResult, PumpWindow, TankSpec};
use crate::app::ports::{Clock, DigitalIo};
use crate::app::session::FlowSession;
use crate::config::MeasurementConfig;
use crate::drivers::relay::Relay;
use crate::drivers::task_pin::{Core, SESSION_PRIORITY, SESSION_STACK_KB, spawn_scoped_on_core};
use crate::error::{ActuatorError, ConfigError, Error};
use crate::pins::{PinClaims, PinId};

/// Results of one orchestration call, in input tank order.
#[derive(Debug, Clone, PartialEq)]
pub struct PumpRun {
    pub window: PumpWindow,
    pub results: Vec<MeasurementResult>,
}

/// Fans one flow session out per tank under a shared pump window.
pub struct TankOrchestrator<'a, D: DigitalIo + ?Sized, C: Clock + ?Sized> {
    io: &'a D,
    clock: &'a C,
    config: &'a MeasurementConfig,
}

impl<'a, D: DigitalIo + ?Sized, C: Clock + ?Sized> TankOrchestrator<'a, D, C> {
    pub fn new(io: &'a D, clock: &'a C, config: &'a MeasurementConfig) -> Self {
        Self { io, clock, config }
    }

    /// Measure every tank; one result per tank, in input order.
    pub fn run(&self, pump_pin: PinId, duration_secs: f64, tanks: &[TankSpec]) -> Result<Vec<MeasurementResult>, Error> {
        self.run_windowed(pump_pin, duration_secs, tanks)
            .map(|run| run.results)
    }

    /// As [`run`](Self::run), also reporting the pump window.
    pub fn run_windowed(&self, pump_pin: PinId, duration_secs: f64, tanks: &[TankSpec]) -> Result<PumpRun, Error> {
        let duration = self.validate(pump_pin, duration_secs, tanks)?;

        let pump = Relay::new("pump", pump_pin, self.config.pump_polarity).engage(self.io)?;
        let pump_on = self.clock.now();
        info!(
            "pump on pin {} for {:.2}s across {} tank(s)",
            pump_pin,
            duration_secs,
            tanks.len()
        );
        self.clock.sleep(self.config.pump_warmup());

        let results = self.run_sessions(tanks, duration);

        let relay = pump.relay();
        if let Err(e) = pump.release() {
            error!("pump on pin {}: shutdown failed ({}), retrying", pump_pin, e);
            relay.force_off(self.io);
        }
        let window = PumpWindow {
            pump_on,
            pump_off: self.clock.now(),
        };

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!(
            "pump window {:.2}s: {} tank(s) measured, {} failed",
            window.length().as_secs_f64(),
            results.len() - failed,
            failed
        );

        Ok(PumpRun { window, results })
    }

    // ── Internal ──────────────────────────────────────────────

    /// Call-level checks.  Touches no pin.
    fn validate(&self, pump_pin: PinId, duration_secs: f64, tanks: &[TankSpec]) -> Result<Duration, Error> {
        self.config.validate()?;
        if tanks.is_empty() {
            return Err(ConfigError::EmptyTankList.into());
        }
        let duration = match Duration::try_from_secs_f64(duration_secs) {
            Ok(d) if !d.is_zero() => d,
            _ => return Err(ConfigError::InvalidDuration.into()),
        };

        let mut claims = PinClaims::new();
        claims.claim(pump_pin)?;
        for tank in tanks {
            claims.claim_all(tank.pins())?;
        }

        Ok(duration)
    }

    /// Spawn, join, and slot results back by input index.
    fn run_sessions(&self, tanks: &[TankSpec], duration: Duration) -> Vec<MeasurementResult> {
        let mut slots: Vec<Option<MeasurementResult>> = vec![None; tanks.len()];

        std::thread::scope(|scope| {
            let mut workers = Vec::with_capacity(tanks.len());
            for (idx, tank) in tanks.iter().enumerate() {
                let session = FlowSession::new(self.io, self.clock, self.config, tank, duration);
                let name = format!("tank-{idx}");
                match spawn_scoped_on_core(
                    scope,
                    Core::App,
                    SESSION_PRIORITY,
                    SESSION_STACK_KB,
                    &name,
                    move || session.run(),
                ) {
                    Ok(handle) => workers.push((idx, handle)),
                    Err(e) => {
                        error!("tank {}: worker spawn failed ({})", tank.id, e);
                        slots[idx] = Some(MeasurementResult::failed(
                            &tank.id,
                            ActuatorError::SessionAborted.into(),
                        ));
                    }
                }
            }

            for (idx, handle) in workers {
                let result = handle.join().unwrap_or_else(|_| {
                    error!("tank {}: session worker panicked", tanks[idx].id);
                    MeasurementResult::failed(&tanks[idx].id, ActuatorError::SessionAborted.into())
                });
                slots[idx] = Some(result);
            }
        });

        slots
            .into_iter()
            .zip(tanks)
            .map(|(slot, tank)| {
                slot.unwrap_or_else(|| MeasurementResult::failed(&tank.id, ActuatorError::SessionAborted.into()))
            })
            .collect()
    }
}
