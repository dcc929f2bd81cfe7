//! Actuator controller.
//!
//! The only writer of [`ActuatorState`] and the only task that drives the
//! relay.  One control period, under the actuator lock throughout:
//!
//! 1. apply at most one queued [`Command`]
//! 2. automatic hysteresis on the latest soil moisture
//! 3. maximum on-time enforcement (last, so it can override 1 and 2)
//!
//! [`Command`]: crate::app::commands::Command

use super::PeriodicTask;
use crate::app::channels::CommandQueue;
use crate::app::ports::{RelayPort, TimePort};
use crate::app::state::{lock, ActuatorState, ControlLimits, SharedState};
use crate::config::SystemConfig;
use crate::drivers::watchdog::Watchdog;

pub struct ActuatorController<'a, R: RelayPort, C: TimePort> {
    relay: R,
    clock: &'a C,
    shared: &'a SharedState,
    commands: &'a CommandQueue,
    limits: ControlLimits,
    period_ms: u64,
    watchdog: Option<Watchdog>,
}

impl<'a, R: RelayPort, C: TimePort> ActuatorController<'a, R, C> {
    pub fn new(
        relay: R,
        clock: &'a C,
        shared: &'a SharedState,
        commands: &'a CommandQueue,
        config: &SystemConfig,
    ) -> Self {
        Self {
            relay,
            clock,
            shared,
            commands,
            limits: ControlLimits::from(config),
            period_ms: u64::from(config.control_interval_ms),
            watchdog: None,
        }
    }

    /// Feed `watchdog` once per control period.  The watchdog must have been
    /// created on the thread that runs this controller.
    pub fn with_watchdog(mut self, watchdog: Watchdog) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Run one control period and return the resulting state.
    pub fn control_period(&mut self) -> ActuatorState {
        let now = self.clock.now_ms();
        let mut state = lock(&self.shared.actuator);

        if let Ok(cmd) = self.commands.try_receive() {
            state.apply_command(cmd, &mut self.relay, now);
        }

        if let Some(moisture) = self.shared.soil.latest() {
            state.evaluate_auto_control(moisture, &self.limits, &mut self.relay, now);
        }

        state.enforce_safety_timeout(&self.limits, &mut self.relay, now);

        let snapshot = *state;
        drop(state);

        if let Some(wdt) = &self.watchdog {
            wdt.feed();
        }
        snapshot
    }
}

impl<R: RelayPort, C: TimePort> PeriodicTask for ActuatorController<'_, R, C> {
    fn name(&self) -> &'static str {
        "actuator"
    }

    fn period_ms(&self) -> u64 {
        self.period_ms
    }

    fn run_once(&mut self) {
        self.control_period();
    }
}
