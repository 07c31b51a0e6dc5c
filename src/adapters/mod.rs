//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter | Implements | Connects to                       |
//! |---------|------------|-----------------------------------|
//! | `gpio`  | DigitalIo  | ESP32 GPIO + per-pin ISR service  |
//! | `time`  | Clock      | ESP32 system timer / host Instant |

#[cfg(target_os = "espidf")]
pub mod gpio;
pub mod time;
