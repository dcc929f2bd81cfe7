//! Shared state crossing task boundaries.
//!
//! | Object | Writer | Readers | Synchronisation |
//! |---|---|---|---|
//! | [`ActuatorState`] | actuator controller | broker link, status reporter | `Mutex` |
//! | [`ConnectivityFlags::link_up`] | connectivity supervisor | all | atomic |
//! | [`ConnectivityFlags::session_up`] | broker link manager | all | atomic |
//! | [`SoilMoistureCell`] | sensor sampler | actuator controller | atomic |
//!
//! The atomics are single-writer scalars: stores use `Release`, loads use
//! `Acquire`, and a reader may see a value up to one producer period old.
//!
//! Lock order: no task holds the actuator lock and the broker lock at the
//! same time.  Readers copy the actuator state out and release it before
//! touching the broker.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{error, info, warn};

use super::commands::Command;
use super::ports::RelayPort;
use crate::config::SystemConfig;

// ───────────────────────────────────────────────────────────────
// Control limits
// ───────────────────────────────────────────────────────────────

/// The thresholds the actuator operations need, lifted out of [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLimits {
    pub low_threshold_percent: u8,
    pub high_threshold_percent: u8,
    pub max_on_ms: u64,
}

impl From<&SystemConfig> for ControlLimits {
    fn from(c: &SystemConfig) -> Self {
        Self {
            low_threshold_percent: c.soil_low_threshold_percent,
            high_threshold_percent: c.soil_high_threshold_percent,
            max_on_ms: u64::from(c.max_relay_on_ms),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Actuator state
// ───────────────────────────────────────────────────────────────

/// Relay and mode state.  `on_since_ms` is `Some` exactly while the relay
/// is on, so "on without a timestamp" cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorState {
    on_since_ms: Option<u64>,
    auto_mode: bool,
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorState {
    /// Relay off, automatic mode enabled.
    pub const fn new() -> Self {
        Self {
            on_since_ms: None,
            auto_mode: true,
        }
    }

    pub fn relay_on(&self) -> bool {
        self.on_since_ms.is_some()
    }

    pub fn auto_mode(&self) -> bool {
        self.auto_mode
    }

    /// When the relay last switched on; `None` while off.
    pub fn on_since_ms(&self) -> Option<u64> {
        self.on_since_ms
    }

    /// Apply a manual or mode command.
    ///
    /// `SetOn`/`SetOff` force the relay and leave automatic mode;
    /// `SetAuto` re-enables automatic mode without touching the relay.
    pub fn apply_command(&mut self, cmd: Command, relay: &mut impl RelayPort, now_ms: u64) {
        match cmd {
            Command::SetOn => {
                self.auto_mode = false;
                self.set_relay(true, relay, now_ms);
                info!("Relay: manual ON");
            }
            Command::SetOff => {
                self.auto_mode = false;
                self.set_relay(false, relay, now_ms);
                info!("Relay: manual OFF");
            }
            Command::SetAuto => {
                self.auto_mode = true;
                info!("Relay: automatic mode enabled");
            }
        }
    }

    /// Hysteresis control on the latest soil moisture.  No-op in manual
    /// mode.  Both thresholds are strict: a reading equal to either one
    /// changes nothing.
    pub fn evaluate_auto_control(
        &mut self,
        soil_moisture_percent: u8,
        limits: &ControlLimits,
        relay: &mut impl RelayPort,
        now_ms: u64,
    ) {
        if !self.auto_mode {
            return;
        }
        if soil_moisture_percent < limits.low_threshold_percent && !self.relay_on() {
            info!("Relay: soil dry ({}%), irrigating", soil_moisture_percent);
            self.set_relay(true, relay, now_ms);
        } else if soil_moisture_percent > limits.high_threshold_percent && self.relay_on() {
            info!("Relay: soil wet ({}%), stopping", soil_moisture_percent);
            self.set_relay(false, relay, now_ms);
        }
    }

    /// Force the relay off once it has been on for `max_on_ms`, in any mode.
    /// Returns `true` if the timeout fired.
    pub fn enforce_safety_timeout(
        &mut self,
        limits: &ControlLimits,
        relay: &mut impl RelayPort,
        now_ms: u64,
    ) -> bool {
        let Some(since) = self.on_since_ms else {
            return false;
        };
        let on_for = now_ms.saturating_sub(since);
        if on_for < limits.max_on_ms {
            return false;
        }
        warn!(
            "Relay: safety timeout after {} ms (limit {} ms), forcing OFF",
            on_for, limits.max_on_ms
        );
        self.set_relay(false, relay, now_ms);
        !self.relay_on()
    }

    /// The only place the relay output and `on_since_ms` change.  Writing
    /// the state the relay is already in does nothing, so repeated commands
    /// neither pulse the output nor restart the on-time.
    fn set_relay(&mut self, on: bool, relay: &mut impl RelayPort, now_ms: u64) {
        if on == self.relay_on() {
            return;
        }
        match relay.set_relay(on) {
            Ok(()) => self.on_since_ms = on.then_some(now_ms),
            Err(e) => error!("Relay: output write failed ({}), state unchanged", e),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Connectivity flags
// ───────────────────────────────────────────────────────────────

/// Network link and broker session flags.
#[derive(Debug, Default)]
pub struct ConnectivityFlags {
    link_up: AtomicBool,
    session_up: AtomicBool,
}

impl ConnectivityFlags {
    pub const fn new() -> Self {
        Self {
            link_up: AtomicBool::new(false),
            session_up: AtomicBool::new(false),
        }
    }

    pub fn link_up(&self) -> bool {
        self.link_up.load(Ordering::Acquire)
    }

    /// Connectivity supervisor only.
    pub fn set_link_up(&self, up: bool) {
        self.link_up.store(up, Ordering::Release);
    }

    pub fn session_up(&self) -> bool {
        self.session_up.load(Ordering::Acquire)
    }

    /// Broker link manager only.
    pub fn set_session_up(&self, up: bool) {
        self.session_up.store(up, Ordering::Release);
    }
}

// ───────────────────────────────────────────────────────────────
// Latest soil moisture
// ───────────────────────────────────────────────────────────────

const NO_SAMPLE: u8 = u8::MAX;

/// Most-recent-wins soil moisture percentage.
#[derive(Debug)]
pub struct SoilMoistureCell(AtomicU8);

impl Default for SoilMoistureCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SoilMoistureCell {
    /// Empty until the first sample, so automatic control stays idle at boot
    /// instead of acting on a zero reading.
    pub const fn new() -> Self {
        Self(AtomicU8::new(NO_SAMPLE))
    }

    pub fn store(&self, percent: u8) {
        self.0.store(percent.min(100), Ordering::Release);
    }

    pub fn latest(&self) -> Option<u8> {
        match self.0.load(Ordering::Acquire) {
            NO_SAMPLE => None,
            v => Some(v),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Shared state bundle
// ───────────────────────────────────────────────────────────────

/// Everything the tasks share, constructible in a `static`.
#[derive(Debug, Default)]
pub struct SharedState {
    pub connectivity: ConnectivityFlags,
    pub soil: SoilMoistureCell,
    pub actuator: Mutex<ActuatorState>,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            connectivity: ConnectivityFlags::new(),
            soil: SoilMoistureCell::new(),
            actuator: Mutex::new(ActuatorState::new()),
        }
    }
}

/// Acquire a task-shared lock.  A panic in another task must not take the
/// relay safety timeout down with it, so poisoning is ignored.
pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Copy the actuator state out under its lock.
pub fn actuator_snapshot(m: &Mutex<ActuatorState>) -> ActuatorState {
    *lock(m)
}
