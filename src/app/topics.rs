//! Topic names and payload formatting for the broker wire protocol.
//!
//! All payloads are plain UTF-8 text.  Climate values go out in decimal
//! with two fractional digits, soil moisture as a bare integer, relay
//! state as `ON` / `OFF`.

use core::fmt::Write;

use heapless::String;

pub const TOPIC_TEMPERATURE: &str = "sensor/temperature";
pub const TOPIC_HUMIDITY: &str = "sensor/humidity";
pub const TOPIC_SOIL_MOISTURE: &str = "sensor/soil_moisture";
/// Liveness: `online` while up, `offline` as the session's last will.
pub const TOPIC_STATUS: &str = "sensor/status";
pub const TOPIC_RELAY_STATUS: &str = "actuator/relay_status";
/// The one inbound topic.
pub const TOPIC_RELAY_CONTROL: &str = "actuator/relay_control";

pub const PAYLOAD_ONLINE: &str = "online";
pub const PAYLOAD_OFFLINE: &str = "offline";

/// Formatted numeric payload.
pub type DecimalPayload = String<16>;

/// `{:.2}` rendering of a measurement.
///
/// Non-finite values render as `nan`; callers only pass screened readings.
pub fn format_decimal(value: f32) -> DecimalPayload {
    let mut s = DecimalPayload::new();
    // 16 bytes fits any f32 in the screened ranges.
    if write!(s, "{:.2}", value).is_err() {
        s.clear();
        let _ = s.push_str("nan");
    }
    s
}

/// Soil moisture percentage, `0`..=`100`.
pub fn format_percent(percent: u8) -> DecimalPayload {
    let mut s = DecimalPayload::new();
    let _ = write!(s, "{}", percent.min(100));
    s
}

pub fn relay_payload(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}
