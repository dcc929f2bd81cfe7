//! Broker link manager.
//!
//! Owns `session_up` and is the only consumer of the sensor queue and the
//! only producer of the command queue.
//!
//! ```text
//!   NoSession ──link up, ≥5 s since last try, connect+subscribe──▶ Established
//!       ▲                                                            │
//!       └──────────── client reports disconnected (next tick) ───────┘
//! ```
//!
//! While established, each tick: run the client event loop (dispatching
//! control-topic payloads as commands), publish every queued reading, and
//! republish relay status if it changed since the last publish.

use std::sync::Mutex;

use log::{debug, info, warn};

use super::PeriodicTask;
use crate::app::channels::{CommandQueue, SensorQueue};
use crate::app::commands::Command;
use crate::app::ports::{BrokerPort, TimePort};
use crate::app::readings::SensorReading;
use crate::app::state::{actuator_snapshot, lock, SharedState};
use crate::app::topics::{
    format_decimal, format_percent, relay_payload, PAYLOAD_ONLINE, TOPIC_HUMIDITY,
    TOPIC_RELAY_CONTROL, TOPIC_RELAY_STATUS, TOPIC_SOIL_MOISTURE, TOPIC_STATUS,
    TOPIC_TEMPERATURE,
};
use crate::config::SystemConfig;
use crate::error::CommsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Established,
}

pub struct BrokerLinkManager<'a, B: BrokerPort, C: TimePort> {
    broker: &'a Mutex<B>,
    clock: &'a C,
    shared: &'a SharedState,
    readings: &'a SensorQueue,
    commands: &'a CommandQueue,
    period_ms: u64,
    reconnect_interval_ms: u64,
    session: SessionState,
    last_attempt_ms: Option<u64>,
    published_relay: Option<bool>,
}

impl<'a, B: BrokerPort, C: TimePort> BrokerLinkManager<'a, B, C> {
    pub fn new(
        broker: &'a Mutex<B>,
        clock: &'a C,
        shared: &'a SharedState,
        readings: &'a SensorQueue,
        commands: &'a CommandQueue,
        config: &SystemConfig,
    ) -> Self {
        Self {
            broker,
            clock,
            shared,
            readings,
            commands,
            period_ms: u64::from(config.broker_service_interval_ms),
            reconnect_interval_ms: u64::from(config.broker_reconnect_interval_ms),
            session: SessionState::NoSession,
            last_attempt_ms: None,
            published_relay: None,
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn service_tick(&mut self) -> SessionState {
        let now = self.clock.now_ms();
        // Snapshot before taking the broker lock; never hold both.
        let relay_on = actuator_snapshot(&self.shared.actuator).relay_on();
        let session_lock = self.broker;
        let mut broker = lock(session_lock);

        if self.session == SessionState::Established && !broker.is_connected() {
            warn!("MQTT: session lost");
            self.drop_session();
        }

        if self.session == SessionState::NoSession {
            if !self.shared.connectivity.link_up() || !self.attempt_due(now) {
                return self.session;
            }
            self.last_attempt_ms = Some(now);
            match Self::establish(&mut *broker, relay_on) {
                Ok(()) => {
                    info!("MQTT: session established");
                    self.session = SessionState::Established;
                    self.published_relay = Some(relay_on);
                    self.shared.connectivity.set_session_up(true);
                }
                Err(e) => {
                    warn!(
                        "MQTT: session attempt failed ({}), retrying in {} ms",
                        e, self.reconnect_interval_ms
                    );
                    return self.session;
                }
            }
        }

        let commands = self.commands;
        broker.service(&mut |topic: &str, payload: &[u8]| dispatch(commands, topic, payload));

        // Leave readings queued while the client reports no session.  A
        // publish failing midway loses the rest of that one reading.
        while broker.is_connected() {
            let Ok(reading) = self.readings.try_receive() else {
                break;
            };
            if let Err(e) = publish_reading(&mut *broker, &reading) {
                warn!("MQTT: reading publish failed: {}", e);
                break;
            }
        }

        if self.published_relay != Some(relay_on) {
            match broker.publish(TOPIC_RELAY_STATUS, relay_payload(relay_on), true) {
                Ok(()) => self.published_relay = Some(relay_on),
                Err(e) => warn!("MQTT: relay status publish failed: {}", e),
            }
        }

        self.session
    }

    fn attempt_due(&self, now_ms: u64) -> bool {
        self.last_attempt_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= self.reconnect_interval_ms)
    }

    fn drop_session(&mut self) {
        self.session = SessionState::NoSession;
        self.published_relay = None;
        self.shared.connectivity.set_session_up(false);
    }

    fn establish(broker: &mut B, relay_on: bool) -> Result<(), CommsError> {
        broker.connect()?;
        broker.subscribe(TOPIC_RELAY_CONTROL)?;
        broker.publish(TOPIC_STATUS, PAYLOAD_ONLINE, true)?;
        broker.publish(TOPIC_RELAY_STATUS, relay_payload(relay_on), true)?;
        Ok(())
    }
}

/// Route one inbound message.  Only the control topic is acted on.
fn dispatch(commands: &CommandQueue, topic: &str, payload: &[u8]) {
    if topic != TOPIC_RELAY_CONTROL {
        debug!("MQTT: ignoring message on '{}'", topic);
        return;
    }
    let Some(cmd) = Command::parse(payload) else {
        debug!("MQTT: unrecognised control payload ({} bytes)", payload.len());
        return;
    };
    info!("MQTT: command {:?}", cmd);
    if commands.try_send(cmd).is_err() {
        warn!("MQTT: command queue full, {:?} dropped", cmd);
    }
}

fn publish_reading<B: BrokerPort>(broker: &mut B, r: &SensorReading) -> Result<(), CommsError> {
    if let Some(t) = r.temperature_c {
        broker.publish(TOPIC_TEMPERATURE, &format_decimal(t), false)?;
    }
    if let Some(h) = r.air_humidity_percent {
        broker.publish(TOPIC_HUMIDITY, &format_decimal(h), false)?;
    }
    broker.publish(
        TOPIC_SOIL_MOISTURE,
        &format_percent(r.soil_moisture_percent),
        false,
    )
}

impl<B: BrokerPort, C: TimePort> PeriodicTask for BrokerLinkManager<'_, B, C> {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    fn period_ms(&self) -> u64 {
        self.period_ms
    }

    fn run_once(&mut self) {
        self.service_tick();
    }
}
