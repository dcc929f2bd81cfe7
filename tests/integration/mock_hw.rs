//! Mock hardware for integration tests.
//!
//! Records every relay write so tests can assert on the full switching
//! history, and lets tests move time forward by hand.

use std::sync::atomic::{AtomicU64, Ordering};

use irrigation::app::ports::{RelayPort, SensorPort, TimePort};
use irrigation::app::readings::ClimateReading;
use irrigation::error::{ActuatorError, SensorError};

// ── ManualClock ───────────────────────────────────────────────

/// Clock that only moves when told to.  `sleep_ms` advances it, so tasks
/// that back off between polls finish instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimePort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

// ── MockRelay ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockRelay {
    pub writes: Vec<bool>,
    pub fail: bool,
}

#[allow(dead_code)]
impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physical level after the last successful write.
    pub fn is_on(&self) -> bool {
        self.writes.last().copied().unwrap_or(false)
    }
}

impl RelayPort for MockRelay {
    fn set_relay(&mut self, on: bool) -> Result<(), ActuatorError> {
        if self.fail {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.writes.push(on);
        Ok(())
    }
}

// ── MockSensors ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct MockSensors {
    pub climate: Result<ClimateReading, SensorError>,
    pub soil_raw: Result<u16, SensorError>,
}

#[allow(dead_code)]
impl MockSensors {
    /// 22.5 °C, 55 % RH, soil ADC mid-scale.
    pub fn new() -> Self {
        Self {
            climate: Ok(ClimateReading {
                temperature_c: 22.5,
                humidity_percent: 55.0,
            }),
            soil_raw: Ok(2048),
        }
    }

    /// Set the soil ADC so that the default dry=0 / wet=4095 calibration
    /// maps it to `percent`.
    pub fn set_soil_percent(&mut self, percent: u8) {
        self.soil_raw = Ok(((u32::from(percent) * 4095).div_ceil(100)) as u16);
    }
}

impl Default for MockSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockSensors {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
        self.climate
    }

    fn read_soil_raw(&mut self) -> Result<u16, SensorError> {
        self.soil_raw
    }
}
