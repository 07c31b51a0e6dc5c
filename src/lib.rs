//! Tankflow firmware library.
//!
//! Multi-tank irrigation measurement: a shared pump window, one flow
//! session per tank on its own worker, ultrasonic level estimates.
//! Exposes the pure-logic modules for integration testing; all
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod sensors;
