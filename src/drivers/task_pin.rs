//! Core-pinned scoped worker threads for per-tank sessions.
//!
//! Wraps `esp_pthread_set_cfg()` so that a scoped spawn creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority and
//! stack size.  On non-ESP targets, falls back to a plain named thread.
//!
//! Workers are spawned into a [`std::thread::Scope`], so none of them can
//! outlive the measurement call that created them.
//!
//! # ESP-IDF Threading Model
//!
//! `esp_pthread_set_cfg()` sets thread-local configuration that applies to
//! the *next* `pthread_create()` call from the calling thread, so the
//! config→spawn pair must not be interleaved with other thread creation
//! on the same thread.

use std::io;
use std::thread::{Builder, Scope, ScopedJoinHandle};

/// CPU core identifiers for the ESP32 dual-core parts.  Core 0 (PRO_CPU)
/// is left to the protocol stacks and the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 1 (APP_CPU): measurement workers.
    App = 1,
}

/// Stack for one session worker.  Sessions log with formatting and hold
/// a small reading buffer; nothing recursive.
pub const SESSION_STACK_KB: usize = 8;

/// Priority for session workers: above idle, below the WiFi/lwIP tasks.
pub const SESSION_PRIORITY: u8 = 5;

/// Spawn a scoped worker pinned to `core` with explicit priority and stack.
#[cfg(target_os = "espidf")]
pub fn spawn_scoped_on_core<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &str,
    f: F,
) -> io::Result<ScopedJoinHandle<'scope, T>>
where
    T: Send + 'scope,
    F: FnOnce() -> T + Send + 'scope,
{
    let c_name = std::ffi::CString::new(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: the config only lives in this thread's pthread TLS and is
    // consumed by the spawn below; `c_name` outlives that spawn.
    unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = priority as i32;
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = c_name.as_ptr();
        let ret = esp_idf_svc::sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
        }
    }

    log::debug!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        name,
        core,
        priority,
        stack_kb
    );

    let handle = Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn_scoped(scope, f);
    drop(c_name);
    handle
}

/// Simulation fallback.  Ignores core affinity and priority, and keeps
/// the host's default stack (the embedded budget is too tight for debug
/// builds).
#[cfg(not(target_os = "espidf"))]
pub fn spawn_scoped_on_core<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &str,
    f: F,
) -> io::Result<ScopedJoinHandle<'scope, T>>
where
    T: Send + 'scope,
    F: FnOnce() -> T + Send + 'scope,
{
    log::debug!("Spawning '{}' (sim, no core pinning, stack={}KB)", name, stack_kb);

    Builder::new().name(name.into()).spawn_scoped(scope, f)
}
