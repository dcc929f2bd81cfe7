//! GPIO / peripheral pin assignments for the irrigation controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Relay (irrigation valve / pump supply)
// ---------------------------------------------------------------------------

/// Digital output driving the relay coil transistor (active HIGH).
pub const RELAY_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Capacitive soil-moisture probe, analog output.
/// ADC1 channel 6 (GPIO 34 on ESP32).
pub const SOIL_ADC_GPIO: i32 = 34;
/// ADC1 channel number for [`SOIL_ADC_GPIO`].
pub const SOIL_ADC_CHANNEL: u32 = 6;

/// DHT11 single-wire data line (open drain with external pull-up).
pub const DHT_GPIO: i32 = 4;
