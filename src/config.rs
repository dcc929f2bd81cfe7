//! System configuration parameters
//!
//! All tunable parameters for the irrigation controller.  Values are fixed
//! at build time: the control constants live in [`SystemConfig::default`],
//! network and broker identity come from the build environment.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Network / broker identity (compile-time)
// ---------------------------------------------------------------------------

/// WiFi network name, from `WIFI_SSID` at build time.
pub const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(v) => v,
    None => "",
};

/// WiFi passphrase, from `WIFI_PASS` at build time.
pub const WIFI_PASSWORD: &str = match option_env!("WIFI_PASS") {
    Some(v) => v,
    None => "",
};

/// Broker URL, from `MQTT_BROKER` at build time.
pub const MQTT_BROKER_URL: &str = match option_env!("MQTT_BROKER") {
    Some(v) => v,
    None => "mqtt://localhost:1883",
};

/// MQTT client identifier, from `MQTT_CLIENT_ID` at build time.
pub const MQTT_CLIENT_ID: &str = match option_env!("MQTT_CLIENT_ID") {
    Some(v) => v,
    None => "ESP32_Irrigation_01",
};

/// Capacity of the sensor-reading and relay-command queues.
pub const QUEUE_DEPTH: usize = 10;

// ---------------------------------------------------------------------------
// Control configuration
// ---------------------------------------------------------------------------

/// Core control and timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Soil moisture hysteresis ---
    /// Below this percentage the relay turns on (auto mode).
    pub soil_low_threshold_percent: u8,
    /// Above this percentage the relay turns off (auto mode).
    pub soil_high_threshold_percent: u8,
    /// Raw ADC value mapped to 0 %.
    pub soil_adc_dry: u16,
    /// Raw ADC value mapped to 100 %.
    pub soil_adc_wet: u16,

    // --- Safety ---
    /// Longest the relay may stay on before it is forced off (milliseconds).
    pub max_relay_on_ms: u32,
    /// Task watchdog timeout for the actuator task (milliseconds).
    pub watchdog_timeout_ms: u32,

    // --- Timing ---
    /// Sensor sampling period (milliseconds)
    pub sample_interval_ms: u32,
    /// Actuator control period (milliseconds)
    pub control_interval_ms: u32,
    /// Liveness / relay status report period (milliseconds)
    pub status_interval_ms: u32,
    /// Link supervision period (milliseconds)
    pub link_check_interval_ms: u32,
    /// Broker event-loop service tick (milliseconds)
    pub broker_service_interval_ms: u32,
    /// Minimum spacing between broker session attempts (milliseconds)
    pub broker_reconnect_interval_ms: u32,

    // --- Link bring-up ---
    /// Status polls per reconnection attempt before giving up for this period.
    pub link_connect_attempts: u8,
    /// Delay between status polls while connecting (milliseconds).
    pub link_connect_backoff_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            soil_low_threshold_percent: 30,
            soil_high_threshold_percent: 60,
            soil_adc_dry: 0,
            soil_adc_wet: 4095,

            max_relay_on_ms: 10_000,
            watchdog_timeout_ms: 10_000,

            sample_interval_ms: 5_000,
            control_interval_ms: 2_000,
            status_interval_ms: 30_000,
            link_check_interval_ms: 10_000,
            broker_service_interval_ms: 100,
            broker_reconnect_interval_ms: 5_000,

            link_connect_attempts: 20,
            link_connect_backoff_ms: 500,
        }
    }
}

impl SystemConfig {
    /// Check every field against its legal range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.soil_low_threshold_percent >= self.soil_high_threshold_percent {
            return Err(ConfigError::ValidationFailed(
                "soil low threshold must be below high threshold",
            ));
        }
        if self.soil_high_threshold_percent > 100 {
            return Err(ConfigError::ValidationFailed(
                "soil high threshold above 100%",
            ));
        }
        if self.soil_adc_dry == self.soil_adc_wet {
            return Err(ConfigError::ValidationFailed(
                "soil calibration points must differ",
            ));
        }
        if self.max_relay_on_ms == 0 {
            return Err(ConfigError::ValidationFailed("max relay on-time is zero"));
        }
        let periods = [
            self.sample_interval_ms,
            self.control_interval_ms,
            self.status_interval_ms,
            self.link_check_interval_ms,
            self.broker_service_interval_ms,
            self.broker_reconnect_interval_ms,
        ];
        if periods.contains(&0) {
            return Err(ConfigError::ValidationFailed("task period is zero"));
        }
        if self.link_connect_attempts == 0 {
            return Err(ConfigError::ValidationFailed("link connect attempts is zero"));
        }
        if self.watchdog_timeout_ms <= self.control_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "watchdog timeout must exceed the control period",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.soil_low_threshold_percent, 30);
        assert_eq!(c.soil_high_threshold_percent, 60);
        assert_eq!(c.max_relay_on_ms, 10_000);
        assert_eq!(c.sample_interval_ms, 5_000);
        assert_eq!(c.control_interval_ms, 2_000);
        assert_eq!(c.status_interval_ms, 30_000);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let c = SystemConfig {
            soil_low_threshold_percent: 60,
            soil_high_threshold_percent: 30,
            ..SystemConfig::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn zero_period_rejected() {
        let c = SystemConfig {
            control_interval_ms: 0,
            ..SystemConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn watchdog_must_outlast_control_period() {
        let c = SystemConfig {
            watchdog_timeout_ms: 2_000,
            ..SystemConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn timing_ratios_make_sense() {
        let c = SystemConfig::default();
        assert!(
            c.control_interval_ms < c.max_relay_on_ms,
            "control loop must poll the safety timeout several times per on-window"
        );
        assert!(c.broker_service_interval_ms < c.sample_interval_ms);
        assert!(c.sample_interval_ms < c.status_interval_ms);
    }
}
