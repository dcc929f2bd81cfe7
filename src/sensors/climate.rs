//! DHT11 air temperature / relative humidity sensor.
//!
//! Single-wire protocol on an open-drain GPIO with external pull-up.  The
//! `dht11` crate does the bit-banging; this module only converts its
//! tenth-unit integers to floats and maps failures to [`SensorError`].
//!
//! ## Dual-target design
//!
//! On ESP-IDF: owns a `PinDriver` and times the protocol with `Ets`.
//! On host/test: reads from static atomics for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use dht11::Dht11;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::{
    delay::Ets,
    gpio::{AnyIOPin, InputOutput, PinDriver},
};

use crate::app::readings::ClimateReading;
use crate::error::SensorError;

/// Simulation: bit patterns of the injected `f32` values.
#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_C: AtomicU32 = AtomicU32::new(0x41C8_0000); // 25.0
#[cfg(not(target_os = "espidf"))]
static SIM_HUMIDITY: AtomicU32 = AtomicU32::new(0x4220_0000); // 40.0
#[cfg(not(target_os = "espidf"))]
static SIM_FAULT: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_climate(temperature_c: f32, humidity_percent: f32) {
    SIM_TEMP_C.store(temperature_c.to_bits(), Ordering::Relaxed);
    SIM_HUMIDITY.store(humidity_percent.to_bits(), Ordering::Relaxed);
}

/// Simulation: make subsequent reads fail as a missing sensor would.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_climate_fault(fault: bool) {
    SIM_FAULT.store(fault, Ordering::Relaxed);
}

#[cfg(target_os = "espidf")]
pub struct ClimateSensor {
    device: Dht11<PinDriver<'static, AnyIOPin, InputOutput>>,
}

#[cfg(target_os = "espidf")]
impl ClimateSensor {
    pub fn new(pin: PinDriver<'static, AnyIOPin, InputOutput>) -> Self {
        Self {
            device: Dht11::new(pin),
        }
    }

    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let mut delay = Ets;
        let m = self.device.perform_measurement(&mut delay).map_err(|e| {
            log::warn!("DHT11: measurement failed: {:?}", e);
            SensorError::ReadFailed
        })?;
        Ok(ClimateReading {
            temperature_c: f32::from(m.temperature) / 10.0,
            humidity_percent: f32::from(m.humidity) / 10.0,
        })
    }
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct ClimateSensor;

#[cfg(not(target_os = "espidf"))]
impl ClimateSensor {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        if SIM_FAULT.load(Ordering::Relaxed) {
            return Err(SensorError::ReadFailed);
        }
        Ok(ClimateReading {
            temperature_c: f32::from_bits(SIM_TEMP_C.load(Ordering::Relaxed)),
            humidity_percent: f32::from_bits(SIM_HUMIDITY.load(Ordering::Relaxed)),
        })
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn sim_injection_and_fault() {
        let mut s = ClimateSensor::new();
        sim_set_climate(21.5, 63.0);
        let r = s.read().unwrap();
        assert_eq!(r.temperature_c, 21.5);
        assert_eq!(r.humidity_percent, 63.0);

        sim_set_climate_fault(true);
        assert_eq!(s.read(), Err(SensorError::ReadFailed));
        sim_set_climate_fault(false);
    }
}
