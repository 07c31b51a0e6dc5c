//! Tankflow Firmware: Main Entry Point
//!
//! Serial console front end for the measurement core.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  UART / USB-CDC ── one JSON request per line ──┐         │
//! │                                                ▼         │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  commands::handle_line                             │  │
//! │  │  TankOrchestrator · FlowSession · level sensor     │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │        │ DigitalIo                 │ Clock               │
//! │     EspGpio                    SystemClock               │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;

use anyhow::{Result, anyhow};
use log::{info, warn};

use tankflow::adapters::gpio::EspGpio;
use tankflow::adapters::time::SystemClock;
use tankflow::app::commands::handle_line;
use tankflow::config::MeasurementConfig;

/// Build-time calibration override, e.g.
/// `TANKFLOW_CONFIG='{"pulses_per_liter":350.0}' cargo build`.
const CONFIG_OVERRIDE: Option<&str> = option_env!("TANKFLOW_CONFIG");

fn load_config() -> MeasurementConfig {
    let Some(json) = CONFIG_OVERRIDE else {
        info!("Config: defaults");
        return MeasurementConfig::default();
    };
    match serde_json::from_str::<MeasurementConfig>(json) {
        Ok(cfg) => match cfg.validate() {
            Ok(()) => {
                info!("Config: build-time override");
                cfg
            }
            Err(e) => {
                warn!("Config override rejected ({}), using defaults", e);
                MeasurementConfig::default()
            }
        },
        Err(e) => {
            warn!("Config override unparsable ({}), using defaults", e);
            MeasurementConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Tankflow v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config();
    info!(
        "Calibration: {:.1} pulses/L, valve {:?}, pump {:?}, level cross-check {}",
        config.pulses_per_liter,
        config.valve_polarity,
        config.pump_polarity,
        config.cross_check_level
    );

    // ── 3. Adapters ───────────────────────────────────────────
    let io = EspGpio::new().map_err(|e| anyhow!("GPIO init failed: {e}"))?;
    let clock = SystemClock::new();

    // ── 4. Console loop ───────────────────────────────────────
    info!("Ready for requests");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        println!("{}", handle_line(request, &io, &clock, &config));
    }

    Ok(())
}
