//! One-shot hardware peripheral initialization.
//!
//! Configures the soil-moisture ADC channel and the relay output using raw
//! ESP-IDF sys calls.  Called once from `main()` before any task starts.
//! The DHT data line is owned by its driver through `esp_idf_svc::hal`.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization or raw I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    AdcReadFailed(i32),
    GpioConfigFailed(i32),
    GpioWriteFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc)    => write!(f, "ADC1 init failed (rc={})", rc),
            Self::AdcReadFailed(rc)    => write!(f, "ADC1 read failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::GpioWriteFailed(rc)  => write!(f, "GPIO write failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

impl embedded_hal::digital::Error for HwInitError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before any task is spawned.
    unsafe {
        init_relay_output()?;
        init_adc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: `init_adc()` completes before any task starts, and only the
/// sensor sampler reads the ADC afterwards.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    // 12 dB attenuation covers the probe's full 0–3.3 V swing.
    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::SOIL_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    info!("hw_init: ADC1 configured (CH{}=soil, GPIO{})", pins::SOIL_ADC_CHANNEL, pins::SOIL_ADC_GPIO);
    Ok(())
}

/// One 12-bit conversion on ADC1 `channel`.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, HwInitError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single reader after init.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcReadFailed(ret));
    }
    Ok(raw.max(0) as u16)
}

// ── Relay output ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_relay_output() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::RELAY_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    unsafe { gpio_set_level(pins::RELAY_GPIO, 0) };

    info!("hw_init: relay output GPIO{} configured (LOW)", pins::RELAY_GPIO);
    Ok(())
}

/// A push-pull output configured by [`init_peripherals`], exposed through
/// `embedded_hal::digital::OutputPin`.
///
/// On host targets the level is only remembered, for simulation.
#[derive(Debug)]
pub struct GpioOutput {
    pin: i32,
    #[cfg(not(target_os = "espidf"))]
    level: bool,
}

impl GpioOutput {
    /// The relay coil driver pin.
    pub fn relay() -> Self {
        Self::new(pins::RELAY_GPIO)
    }

    fn new(pin: i32) -> Self {
        Self {
            pin,
            #[cfg(not(target_os = "espidf"))]
            level: false,
        }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) -> Result<(), HwInitError> {
        // SAFETY: the pin was configured as an output during init and this
        // driver is its only writer.
        let ret = unsafe { gpio_set_level(self.pin, u32::from(high)) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioWriteFailed(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) -> Result<(), HwInitError> {
        self.level = high;
        Ok(())
    }

    /// Simulation: last level written.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_level(&self) -> bool {
        self.level
    }
}

impl embedded_hal::digital::ErrorType for GpioOutput {
    type Error = HwInitError;
}

impl embedded_hal::digital::OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use embedded_hal::digital::OutputPin;

    #[test]
    fn sim_output_tracks_level() {
        let mut out = GpioOutput::relay();
        assert_eq!(out.pin(), pins::RELAY_GPIO);
        assert!(!out.sim_level());
        out.set_high().unwrap();
        assert!(out.sim_level());
        out.set_low().unwrap();
        assert!(!out.sim_level());
    }

    #[test]
    fn init_is_a_no_op_on_host() {
        assert_eq!(init_peripherals(), Ok(()));
    }
}
