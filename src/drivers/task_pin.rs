//! Core-pinned thread spawning for the ESP32 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority
//! and stack size. On non-ESP targets, falls back to plain thread spawn.
//!
//! # ESP-IDF Threading Model
//!
//! ESP-IDF implements `std::thread` via pthreads, which are thin wrappers
//! around FreeRTOS tasks. `esp_pthread_set_cfg()` sets thread-local
//! configuration that applies to the *next* `pthread_create()` call from
//! the calling thread. This means the config→spawn pair must not be
//! interleaved with other thread creation on the same thread.

use std::io;
use std::thread::JoinHandle;

use crate::app::ports::TimePort;
use crate::tasks::TaskSpec;

/// CPU core identifiers for the ESP32 Xtensa dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): protocol stacks (WiFi, lwIP, MQTT).
    Pro = 0,
    /// Core 1 (APP_CPU): sampling and relay control.
    App = 1,
}

/// Spawn a thread placed as `spec` describes.
///
/// On ESP-IDF, uses `esp_pthread_set_cfg()` to configure core affinity,
/// priority, and stack size before `std::thread::spawn`. `spec.name` must
/// be NUL-terminated (e.g. `"actuator\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core<F>(spec: TaskSpec, f: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    // SAFETY: `cfg` is fully initialised by the default constructor and
    // `spec.name` is a NUL-terminated 'static string.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as _;
        cfg.thread_name = spec.name.as_ptr().cast();
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    let display_name = spec.name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}

/// Simulation fallback; ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core<F>(spec: TaskSpec, f: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let display_name = spec.name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        display_name,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(spec.stack_kb.max(64) * 1024)
        .spawn(f)
}

/// Block until any thread in `tasks` has finished and return its spec.
///
/// Every handle is checked on each poll, so a task that dies late is seen
/// even while earlier ones keep running.  Periodic tasks never return, so a
/// finished handle means the task panicked.
pub fn wait_for_exit(
    tasks: &[(TaskSpec, JoinHandle<()>)],
    clock: &impl TimePort,
    poll_ms: u64,
) -> TaskSpec {
    loop {
        if let Some((spec, _)) = tasks.iter().find(|(_, h)| h.is_finished()) {
            return *spec;
        }
        clock.sleep_ms(poll_ms);
    }
}
