//! Relay-switched actuator driver (solenoid valves, main pump).
//!
//! Relay boards differ in which logic level energises the coil, so every
//! relay carries its [`RelayPolarity`] from configuration.
//!
//! ## Safety contract
//!
//! An energised relay is held through a [`RelayGuard`].  Dropping the
//! guard without calling [`RelayGuard::release`] de-energises the relay
//! anyway (panics and early returns included).  This driver does not
//! decide *when* to switch; sessions and the orchestrator do.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{Bias, DigitalIo, Level, PinMode};
use crate::error::{ActuatorError, Error};
use crate::pins::PinId;

/// Which logic level energises the relay coil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayPolarity {
    /// Coil energised by a LOW output (common opto-isolated boards).
    ActiveLow,
    /// Coil energised by a HIGH output.
    ActiveHigh,
}

impl RelayPolarity {
    pub const fn on_level(self) -> Level {
        match self {
            Self::ActiveLow => Level::Low,
            Self::ActiveHigh => Level::High,
        }
    }

    pub const fn off_level(self) -> Level {
        match self {
            Self::ActiveLow => Level::High,
            Self::ActiveHigh => Level::Low,
        }
    }
}

/// A single relay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relay {
    label: &'static str,
    pin: PinId,
    polarity: RelayPolarity,
}

impl Relay {
    pub const fn new(label: &'static str, pin: PinId, polarity: RelayPolarity) -> Self {
        Self {
            label,
            pin,
            polarity,
        }
    }

    /// Configure the pin as an output and energise the relay.
    ///
    /// If configuration succeeds but the write fails, the relay is forced
    /// off before the error is returned.
    pub fn engage<'a, D: DigitalIo + ?Sized>(&self, io: &'a D) -> Result<RelayGuard<'a, D>, Error> {
        io.configure(self.pin, PinMode::Output, Bias::None)
            .map_err(|_| ActuatorError::SetupFailed(self.pin))?;
        if io.write(self.pin, self.polarity.on_level()).is_err() {
            self.force_off(io);
            return Err(ActuatorError::WriteFailed(self.pin).into());
        }
        info!("{} on pin {} ON ({:?})", self.label, self.pin, self.polarity.on_level());
        Ok(RelayGuard {
            io,
            relay: *self,
            armed: true,
        })
    }

    /// De-energise the relay.
    pub fn disengage<D: DigitalIo + ?Sized>(&self, io: &D) -> Result<(), Error> {
        io.write(self.pin, self.polarity.off_level())
            .map_err(|_| ActuatorError::WriteFailed(self.pin))?;
        info!("{} on pin {} OFF ({:?})", self.label, self.pin, self.polarity.off_level());
        Ok(())
    }

    /// Best-effort de-energise.  Failures are logged and swallowed: there
    /// is no safer action left to take.
    pub fn force_off<D: DigitalIo + ?Sized>(&self, io: &D) {
        if let Err(e) = self.disengage(io) {
            warn!("{} on pin {}: forced off failed ({})", self.label, self.pin, e);
        }
    }

    /// Drive the relay off from any state, configuring the pin first.
    /// Used when the relay may never have been engaged; every failure is
    /// logged and swallowed.
    pub fn secure<D: DigitalIo + ?Sized>(&self, io: &D) {
        if let Err(e) = io.configure(self.pin, PinMode::Output, Bias::None) {
            warn!("{} on pin {}: setup for forced off failed ({})", self.label, self.pin, e);
        }
        self.force_off(io);
    }
}

/// Holds a relay energised.  Releases it exactly once.
pub struct RelayGuard<'a, D: DigitalIo + ?Sized> {
    io: &'a D,
    relay: Relay,
    armed: bool,
}

impl<D: DigitalIo + ?Sized> RelayGuard<'_, D> {
    pub fn relay(&self) -> Relay {
        self.relay
    }

    /// De-energise now and report the outcome.  After this call the drop
    /// handler does nothing, whatever the result.
    pub fn release(mut self) -> Result<(), Error> {
        self.armed = false;
        self.relay.disengage(self.io)
    }
}

impl<D: DigitalIo + ?Sized> Drop for RelayGuard<'_, D> {
    fn drop(&mut self) {
        if self.armed {
            warn!("{} on pin {} released by guard", self.relay.label, self.relay.pin);
            self.relay.force_off(self.io);
        }
    }
}
