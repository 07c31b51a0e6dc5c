//! Monotonic clock adapter.
//!
//! Implements the [`Clock`] port.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` (µs, monotonic).
//!   Sub-millisecond delays busy-wait in `esp_idf_hal::delay::Ets`, because
//!   a FreeRTOS sleep rounds up to a whole scheduler tick and would
//!   stretch the 10 µs ultrasonic trigger pulse to 10 ms.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and
//!   `std::thread::sleep` for host-side runs.

use std::time::Duration;

use crate::app::ports::Clock;

/// System clock for the current platform.
pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(target_os = "espidf")]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        // SAFETY: esp_timer_get_time reads the high-resolution timer; it is
        // callable from any task once the system has booted.
        let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        Duration::from_micros(us.max(0) as u64)
    }

    fn sleep(&self, duration: Duration) {
        if duration < Duration::from_millis(1) {
            esp_idf_hal::delay::Ets::delay_us(duration.as_micros() as u32);
        } else {
            std::thread::sleep(duration);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
