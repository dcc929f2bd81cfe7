//! Irrigation controller firmware library.
//!
//! Exposes the control core, adapters, and drivers for integration testing
//! and for the firmware binary. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

#[cfg(all(target_os = "espidf", not(feature = "espidf")))]
compile_error!("building for ESP-IDF requires `--features espidf`");

pub mod app;
pub mod config;
pub mod error;
pub mod pins;
pub mod tasks;

// Hardware-facing modules; each has a host simulation behind cfg.
pub mod adapters;
pub mod drivers;
pub mod sensors;

mod esp_link_shims;
