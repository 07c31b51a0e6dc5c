//! Per-tank flow measurement session.
//!
//! ```text
//!  Idle ──▶ ValveOpening ──▶ Measuring ──▶ ValveClosing ──▶ Computed
//!    │            │              │               │
//!    └────────────┴──────────────┴───────────────┴──────▶ Failed
//! ```
//!
//! Within one tank the ordering is strict: valve open → interrupt armed →
//! window → interrupt disarmed → settle → valve closed.  The valve is held
//! through a [`RelayGuard`], so it closes on every exit path once it has
//! been opened, including a panic inside the window.  Any failure also
//! drives a wired valve to its closed level, whatever state it reached.
//! Missing wiring is detected in `Idle`, before the session opens anything.
//! The flow pin is released on every exit path once configured.
//!
//! A session never touches the pump and never reads another tank's pins.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::level;
use crate::app::model::{MeasurementResult, TankSpec};
use crate::app::ports::{Bias, Clock, DigitalIo, Edge, PinMode};
use crate::config::MeasurementConfig;
use crate::drivers::relay::{Relay, RelayGuard};
use crate::error::{ActuatorError, ConfigError, Error};
use crate::pins::PinId;
use crate::sensors::flow::{PulseAccumulator, pulses_to_liters};

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ValveOpening,
    Measuring,
    ValveClosing,
    Computed,
    Failed,
}

/// One tank's measurement window.  Consumed by [`FlowSession::run`].
pub struct FlowSession<'a, D: DigitalIo + ?Sized, C: Clock + ?Sized> {
    io: &'a D,
    clock: &'a C,
    config: &'a MeasurementConfig,
    tank: &'a TankSpec,
    duration: Duration,
    state: SessionState,
}

impl<'a, D: DigitalIo + ?Sized, C: Clock + ?Sized> FlowSession<'a, D, C> {
    pub fn new(
        io: &'a D,
        clock: &'a C,
        config: &'a MeasurementConfig,
        tank: &'a TankSpec,
        duration: Duration,
    ) -> Self {
        Self {
            io,
            clock,
            config,
            tank,
            duration,
            state: SessionState::Idle,
        }
    }

    /// Run to a terminal state.  Never fails: errors are carried in the
    /// returned result with zeroed volumes.
    pub fn run(mut self) -> MeasurementResult {
        match self.execute() {
            Ok(result) => {
                self.transition(SessionState::Computed);
                info!(
                    "tank {}: {} pulses → {:.2} L (level: {:?})",
                    self.tank.id, result.pulses, result.liters_from_flow, result.liters_from_level
                );
                result
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                warn!("tank {}: session failed ({})", self.tank.id, e);
                if let Some(valve_pin) = self.tank.valve_pin {
                    Relay::new("valve", valve_pin, self.config.valve_polarity).secure(self.io);
                }
                MeasurementResult::failed(&self.tank.id, e)
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn execute(&mut self) -> Result<MeasurementResult, Error> {
        let flow_pin = self
            .tank
            .flow_pin
            .ok_or(ConfigError::MissingField("waterflow_sensor"))?;
        let valve_pin = self
            .tank
            .valve_pin
            .ok_or(ConfigError::MissingField("solenoid_valve"))?;

        self.transition(SessionState::ValveOpening);
        let valve = Relay::new("valve", valve_pin, self.config.valve_polarity).engage(self.io)?;

        self.transition(SessionState::Measuring);
        let pulses = self.measure_window(flow_pin, valve)?;

        let liters_from_flow = pulses_to_liters(pulses, self.config.pulses_per_liter);
        let liters_from_level = if self.config.cross_check_level {
            self.level_liters()
        } else {
            None
        };

        Ok(MeasurementResult::completed(
            &self.tank.id,
            pulses,
            liters_from_flow,
            liters_from_level,
        ))
    }

    /// Configure the flow pin, count over the window, and release the pin
    /// whatever the outcome.
    fn measure_window(&mut self, flow_pin: PinId, valve: RelayGuard<'a, D>) -> Result<u64, Error> {
        let outcome = self
            .io
            .configure(flow_pin, PinMode::Input, Bias::PullUp)
            .map_err(|_| Error::from(ActuatorError::SetupFailed(flow_pin)))
            .and_then(|()| self.count_pulses(flow_pin, valve));

        if let Err(e) = self.io.release(flow_pin) {
            warn!("tank {}: flow pin {} release failed ({})", self.tank.id, flow_pin, e);
        }
        outcome
    }

    /// Arm the flow interrupt, hold the window, disarm, settle, close.
    fn count_pulses(&mut self, flow_pin: PinId, valve: RelayGuard<'a, D>) -> Result<u64, Error> {
        let acc = Arc::new(PulseAccumulator::new());
        let subscription = Subscription::arm(self.io, flow_pin, &acc)?;

        let start = self.clock.now();
        loop {
            let elapsed = self.clock.now().saturating_sub(start);
            if elapsed >= self.duration {
                break;
            }
            self.clock
                .sleep(self.config.poll_interval().min(self.duration - elapsed));
            debug!("tank {}: pulse count so far {}", self.tank.id, acc.peek());
        }

        self.transition(SessionState::ValveClosing);
        subscription.disarm()?;
        self.clock.sleep(self.config.valve_settle());

        let relay = valve.relay();
        if let Err(e) = valve.release() {
            relay.force_off(self.io);
            return Err(e);
        }

        Ok(acc.read_and_reset())
    }

    /// Optional ultrasonic cross-check.  A missing or failing sensor leaves
    /// the level volume empty without failing the flow measurement.
    fn level_liters(&self) -> Option<f64> {
        let sensor = match self.tank.level_sensor()? {
            Ok(sensor) => sensor,
            Err(e) => {
                warn!("tank {}: level cross-check skipped ({})", self.tank.id, e);
                return None;
            }
        };
        match level::measure_with(self.io, self.clock, self.config, &sensor) {
            Ok(report) => Some(report.estimated_volume_liters),
            Err(e) => {
                warn!("tank {}: level cross-check failed ({})", self.tank.id, e);
                None
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("tank {}: {:?} -> {:?}", self.tank.id, self.state, next);
        self.state = next;
    }
}

/// Edge interrupt registration scoped to the session.  Dropping it
/// without [`Subscription::disarm`] still deregisters the callback.
struct Subscription<'a, D: DigitalIo + ?Sized> {
    io: &'a D,
    pin: PinId,
    armed: bool,
}

impl<'a, D: DigitalIo + ?Sized> Subscription<'a, D> {
    fn arm(io: &'a D, pin: PinId, acc: &Arc<PulseAccumulator>) -> Result<Self, Error> {
        io.subscribe(pin, Edge::Falling, acc.edge_callback())
            .map_err(|_| ActuatorError::SubscribeFailed(pin))?;
        Ok(Self {
            io,
            pin,
            armed: true,
        })
    }

    fn disarm(mut self) -> Result<(), Error> {
        self.armed = false;
        self.io
            .unsubscribe(self.pin)
            .map_err(|_| ActuatorError::SubscribeFailed(self.pin).into())
    }
}

impl<D: DigitalIo + ?Sized> Drop for Subscription<'_, D> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.io.unsubscribe(self.pin) {
                warn!("flow pin {}: interrupt deregistration failed ({})", self.pin, e);
            }
        }
    }
}
