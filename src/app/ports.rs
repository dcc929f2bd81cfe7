//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ periodic tasks (domain)
//! ```
//!
//! Driven adapters (relay output, sensors, WiFi link, MQTT session, clock)
//! implement these traits.  The tasks in [`crate::tasks`] consume them via
//! generics, so the control core never touches hardware directly.

use core::fmt;
use core::net::Ipv4Addr;

use super::readings::ClimateReading;
use crate::error::{ActuatorError, CommsError, SensorError};

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source and the tasks' only suspension point.
pub trait TimePort: Send + Sync {
    /// Milliseconds since boot (monotonic).
    fn now_ms(&self) -> u64;

    /// Suspend the calling task for `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the sampler calls this once per sampling period.
pub trait SensorPort {
    /// Air temperature and relative humidity.
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError>;

    /// Raw soil-moisture ADC value (nominally 0–4095, not clamped).
    fn read_soil_raw(&mut self) -> Result<u16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the irrigation relay.
pub trait RelayPort {
    /// Drive the physical relay output.
    fn set_relay(&mut self, on: bool) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Link port (WiFi station)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl From<ConnectivityError> for CommsError {
    fn from(_: ConnectivityError) -> Self {
        CommsError::WifiConnectFailed
    }
}

/// Network link status and bring-up.
pub trait LinkPort {
    /// True when associated and the interface has an address.
    fn is_connected(&mut self) -> bool;

    /// Kick off association.  Returns once the request is issued; the
    /// caller polls [`is_connected`](LinkPort::is_connected) for completion.
    fn begin_connect(&mut self) -> Result<(), ConnectivityError>;

    /// Station IPv4 address while connected.
    fn ip_address(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Broker port (publish/subscribe session)
// ───────────────────────────────────────────────────────────────

/// The publish/subscribe client.  One instance is shared behind a lock by
/// the broker link manager and the status reporter.
pub trait BrokerPort {
    /// Establish a session.  Blocks for at most the adapter's own timeout.
    fn connect(&mut self) -> Result<(), CommsError>;

    /// Whether the session is currently up, as last seen by the client.
    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError>;

    /// Run one turn of the client's event loop, handing each inbound
    /// message to `on_message` as `(topic, payload)`.
    fn service(&mut self, on_message: &mut dyn FnMut(&str, &[u8]));
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
