//! Application core: measurement logic behind port traits.
//!
//! Sessions, the orchestrator and the level sensor are generic over the
//! [`ports::DigitalIo`] and [`ports::Clock`] traits, so the whole pipeline
//! runs on the host against mock adapters.

pub mod commands;
pub mod level;
pub mod model;
pub mod orchestrator;
pub mod ports;
pub mod request;
pub mod session;
