//! Irrigation relay driver.
//!
//! A dumb actuator: it drives one digital output (active HIGH) and counts
//! transitions.  When and for how long the relay may stay on is decided by
//! [`ActuatorState`](crate::app::state::ActuatorState); this driver never
//! refuses a write.

use embedded_hal::digital::OutputPin;
use log::error;

use crate::app::ports::RelayPort;
use crate::error::ActuatorError;

pub struct RelayDriver<P: OutputPin> {
    pin: P,
    on: bool,
    switch_count: u32,
}

impl<P: OutputPin> RelayDriver<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            on: false,
            switch_count: 0,
        }
    }

    /// Drive the output low regardless of the remembered state.  Used at
    /// boot, before any task may switch the relay.
    pub fn force_off(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_low().map_err(|e| {
            error!("Relay: failed to force output low: {:?}", e);
            ActuatorError::GpioWriteFailed
        })?;
        self.on = false;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Number of off→on or on→off writes since construction.
    pub fn switch_count(&self) -> u32 {
        self.switch_count
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<P: OutputPin> RelayPort for RelayDriver<P> {
    fn set_relay(&mut self, on: bool) -> Result<(), ActuatorError> {
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        result.map_err(|e| {
            error!("Relay: GPIO write failed: {:?}", e);
            ActuatorError::GpioWriteFailed
        })?;
        if self.on != on {
            self.switch_count += 1;
        }
        self.on = on;
        Ok(())
    }
}
