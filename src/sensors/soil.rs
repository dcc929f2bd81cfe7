//! Capacitive soil-moisture probe.
//!
//! Analog output on ADC1, 12-bit raw domain.  The raw value is mapped
//! linearly between two calibration points (dry → 0 %, wet → 100 %) and
//! clamped, so a probe reading outside its calibrated span saturates
//! rather than being rejected.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the soil channel via the oneshot API (initialised by hw_init).
//! On host/test: reads from static atomics for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use crate::pins;
use crate::error::SensorError;

#[cfg(not(target_os = "espidf"))]
static SIM_SOIL_ADC: AtomicU16 = AtomicU16::new(2048);
#[cfg(not(target_os = "espidf"))]
static SIM_SOIL_FAULT: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_soil_adc(raw: u16) {
    SIM_SOIL_ADC.store(raw, Ordering::Relaxed);
}

/// Simulation: make subsequent ADC reads fail.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_soil_fault(fault: bool) {
    SIM_SOIL_FAULT.store(fault, Ordering::Relaxed);
}

/// Map a raw ADC value to 0–100 % between the `dry` and `wet` calibration
/// points.  Either orientation works (`dry > wet` for probes whose output
/// falls with moisture).  `dry == wet` is rejected by config validation;
/// here it yields 0.
pub fn raw_to_percent(raw: u16, dry: u16, wet: u16) -> u8 {
    let span = i32::from(wet) - i32::from(dry);
    if span == 0 {
        return 0;
    }
    let offset = i32::from(raw) - i32::from(dry);
    (offset * 100 / span).clamp(0, 100) as u8
}

pub struct SoilMoistureSensor {
    channel: u32,
}

impl SoilMoistureSensor {
    pub fn new(adc_channel: u32) -> Self {
        Self { channel: adc_channel }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    #[cfg(target_os = "espidf")]
    pub fn read_raw(&mut self) -> Result<u16, SensorError> {
        hw_init::adc1_read(self.channel).map_err(|e| {
            log::warn!("Soil: GPIO{} {}", pins::SOIL_ADC_GPIO, e);
            SensorError::AdcReadFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read_raw(&mut self) -> Result<u16, SensorError> {
        if SIM_SOIL_FAULT.load(Ordering::Relaxed) {
            return Err(SensorError::AdcReadFailed);
        }
        Ok(SIM_SOIL_ADC.load(Ordering::Relaxed))
    }
}
