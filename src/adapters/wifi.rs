//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`], the hexagonal boundary for the network link.
//! Association is started by [`LinkPort::begin_connect`] and completes in
//! the background; the connectivity supervisor polls
//! [`LinkPort::is_connected`] with its own bounded backoff.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulated access point for host-side tests.

use core::net::Ipv4Addr;

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConnectivityError, LinkPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    sys::EspError,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

#[cfg(not(target_os = "espidf"))]
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

/// Simulated association completes on this status poll after a request.
#[cfg(not(target_os = "espidf"))]
const SIM_POLLS_TO_ASSOCIATE: u8 = 2;

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(target_os = "espidf")]
    started: bool,
    /// Simulation: whether the access point is in range.
    #[cfg(not(target_os = "espidf"))]
    ap_reachable: Arc<AtomicBool>,
    #[cfg(not(target_os = "espidf"))]
    sim_polls: Option<u8>,
    #[cfg(not(target_os = "espidf"))]
    sim_connected: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, EspError> {
        Ok(Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            wifi: EspWifi::new(modem, sysloop, nvs)?,
            started: false,
        })
    }

    /// Simulated adapter with the access point in range.
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            ap_reachable: Arc::new(AtomicBool::new(true)),
            sim_polls: None,
            sim_connected: false,
        }
    }

    /// Simulation: shared switch for the access point's reachability.
    /// Clearing it drops an established link on the next status poll.
    #[cfg(not(target_os = "espidf"))]
    pub fn reachability_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.ap_reachable)
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        self.platform_configure()
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_configure(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        self.wifi.set_configuration(&config).map_err(|e| {
            warn!("WiFi: set_configuration failed: {}", e);
            ConnectivityError::ConnectionFailed
        })?;
        if !self.started {
            self.wifi.start().map_err(|e| {
                warn!("WiFi: start failed: {}", e);
                ConnectivityError::ConnectionFailed
            })?;
            self.started = true;
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_configure(&mut self) -> Result<(), ConnectivityError> {
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// LinkPort
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl LinkPort for WifiAdapter {
    fn is_connected(&mut self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn begin_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        info!("WiFi: associating with '{}'", self.ssid);
        self.wifi.connect().map_err(|e| {
            warn!("WiFi: connect request failed: {}", e);
            ConnectivityError::ConnectionFailed
        })
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| Ipv4Addr::from(info.ip.octets()))
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl LinkPort for WifiAdapter {
    fn is_connected(&mut self) -> bool {
        let reachable = self.ap_reachable.load(Ordering::Acquire);
        if self.sim_connected && !reachable {
            info!("WiFi(sim): access point lost");
            self.sim_connected = false;
        }
        if let Some(polls) = self.sim_polls.as_mut() {
            *polls = polls.saturating_add(1);
            if *polls >= SIM_POLLS_TO_ASSOCIATE && reachable {
                self.sim_connected = true;
                self.sim_polls = None;
            }
        }
        self.sim_connected
    }

    fn begin_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        info!("WiFi(sim): associating with '{}'", self.ssid);
        self.sim_polls = Some(0);
        Ok(())
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.sim_connected.then(|| Ipv4Addr::new(192, 168, 4, 20))
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
