//! Port traits: the hexagonal boundary between measurement logic and pins.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FlowSession / TankOrchestrator
//! ```
//!
//! Pin-level primitives (mode, level, edge interrupts) live behind
//! [`DigitalIo`]; time lives behind [`Clock`].  The measurement core is
//! generic over both, so every session runs unchanged against the ESP-IDF
//! GPIO adapter or a host-side mock.
//!
//! Both traits take `&self`: one adapter instance is shared by every
//! per-tank worker thread of a call, so implementations carry their own
//! interior synchronisation.

use std::sync::Arc;
use std::time::Duration;

pub use embedded_hal::digital::PinState as Level;

use crate::pins::PinId;

// ───────────────────────────────────────────────────────────────
// Pin vocabulary
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    None,
    PullUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Falling,
    Rising,
}

/// Callback invoked from interrupt context on every matching edge.
///
/// Held by the adapter only between [`DigitalIo::subscribe`] and
/// [`DigitalIo::unsubscribe`]; the adapter drops its clone on unsubscribe.
pub type EdgeCallback = Arc<dyn Fn() + Send + Sync>;

// ───────────────────────────────────────────────────────────────
// Digital I/O port (driven adapter: domain ↔ GPIO)
// ───────────────────────────────────────────────────────────────

/// Pin configuration, level I/O and edge interrupt registration.
pub trait DigitalIo: Sync {
    /// Configure direction and bias.
    fn configure(&self, pin: PinId, mode: PinMode, bias: Bias) -> Result<(), IoError>;

    /// Drive an output pin.
    fn write(&self, pin: PinId, level: Level) -> Result<(), IoError>;

    /// Sample an input pin.
    fn read(&self, pin: PinId) -> Result<Level, IoError>;

    /// Register `callback` for `edge` on `pin`.  The callback runs on a
    /// separate execution context from the caller.
    fn subscribe(&self, pin: PinId, edge: Edge, callback: EdgeCallback) -> Result<(), IoError>;

    /// Deregister the pin's callback.  Once this returns, the callback is
    /// never invoked again.
    fn unsubscribe(&self, pin: PinId) -> Result<(), IoError>;

    /// Return the pin to an unconfigured, tristate state.
    fn release(&self, pin: PinId) -> Result<(), IoError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source and blocking delay.
pub trait Clock: Sync {
    /// Time since an arbitrary fixed origin.  Never goes backwards.
    fn now(&self) -> Duration;

    /// Block the calling thread for at least `duration`.
    fn sleep(&self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`DigitalIo`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// The pin number does not exist on this board.
    InvalidPin,
    /// The pin has not been configured for this operation.
    NotConfigured,
    /// An interrupt callback is already registered on the pin.
    AlreadySubscribed,
    /// Driver-level failure with its native return code.
    Hardware(i32),
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPin => write!(f, "invalid pin"),
            Self::NotConfigured => write!(f, "pin not configured"),
            Self::AlreadySubscribed => write!(f, "interrupt already registered"),
            Self::Hardware(rc) => write!(f, "hardware error (rc={})", rc),
        }
    }
}
