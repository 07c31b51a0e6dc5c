//! Unified error types for the tank measurement firmware.
//!
//! A single `Error` enum that every subsystem converts into, so a failed
//! tank session can be downgraded into a field of its result without
//! allocation.  All variants are `Copy`.

use core::fmt;

use serde::Serialize;

use crate::pins::PinId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible measurement operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Wiring, geometry or calibration is missing or invalid.
    Config(ConfigError),
    /// A sensor produced no usable reading.
    Sensor(SensorError),
    /// A pin could not be configured, driven or subscribed.
    Actuator(ActuatorError),
}

impl Error {
    /// Coarse classification reported to callers.
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ConfigurationError,
            Self::Sensor(SensorError::Timeout) => ErrorKind::SensorTimeout,
            Self::Sensor(SensorError::Implausible) => ErrorKind::SensorImplausible,
            Self::Sensor(SensorError::AllReadingsFailed) => ErrorKind::AllReadingsFailed,
            Self::Actuator(_) => ErrorKind::ActuatorFault,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
        }
    }
}

impl std::error::Error for Error {}

/// Machine-readable error classification carried in measurement results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ConfigurationError,
    SensorTimeout,
    SensorImplausible,
    AllReadingsFailed,
    ActuatorFault,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A measurement call was made with no tanks.
    EmptyTankList,
    /// A required wiring or geometry field is absent.
    MissingField(&'static str),
    /// Height or radius is not a positive finite number.
    InvalidGeometry,
    /// Measurement duration is not a positive finite number of seconds.
    InvalidDuration,
    /// The same pin is claimed twice within one call.
    PinConflict(PinId),
    /// A calibration or timing parameter is out of range.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTankList => write!(f, "no tanks supplied"),
            Self::MissingField(name) => write!(f, "missing field `{name}`"),
            Self::InvalidGeometry => write!(f, "tank height and radius must be positive"),
            Self::InvalidDuration => write!(f, "duration must be positive"),
            Self::PinConflict(pin) => write!(f, "pin {pin} assigned more than once"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The echo edge never arrived inside the timeout.
    Timeout,
    /// The echo window is outside the physically plausible range.
    Implausible,
    /// Every sample in a batch was rejected.
    AllReadingsFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "echo timed out"),
            Self::Implausible => write!(f, "reading out of range"),
            Self::AllReadingsFailed => write!(f, "all readings failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Pin mode/bias configuration failed.
    SetupFailed(PinId),
    /// Driving an output level failed.
    WriteFailed(PinId),
    /// Edge interrupt registration failed.
    SubscribeFailed(PinId),
    /// The session worker panicked before producing a result.
    SessionAborted,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetupFailed(pin) => write!(f, "pin {pin} setup failed"),
            Self::WriteFailed(pin) => write!(f, "pin {pin} write failed"),
            Self::SubscribeFailed(pin) => write!(f, "pin {pin} interrupt registration failed"),
            Self::SessionAborted => write!(f, "session aborted"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
