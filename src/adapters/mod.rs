//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter | Implements | Connects to              |
//! |---------|------------|--------------------------|
//! | `mqtt`  | BrokerPort | ESP-IDF MQTT client      |
//! | `time`  | TimePort   | ESP32 system timer       |
//! | `wifi`  | LinkPort   | ESP-IDF WiFi STA         |
//!
//! The sensor and relay ports are implemented directly by
//! [`crate::sensors::SensorHub`] and [`crate::drivers::relay::RelayDriver`].

pub mod mqtt;
pub mod time;
pub mod wifi;
