//! MQTT session adapter.
//!
//! Implements [`BrokerPort`].  One instance lives behind a `Mutex` shared
//! by the broker link manager and the status reporter.
//!
//! Every session carries a retained last-will of `offline` on the status
//! topic, and every publish and subscription uses QoS 1.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` with an event callback.
//!   The callback only records connection state and copies inbound
//!   messages into a bounded channel; [`BrokerPort::service`] drains it on
//!   the caller's thread.
//! - **all other targets**: in-memory broker for host-side tests.

#[cfg(not(target_os = "espidf"))]
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use std::sync::Arc;

#[cfg(target_os = "espidf")]
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};
use log::{info, warn};

use crate::app::ports::BrokerPort;
#[cfg(target_os = "espidf")]
use crate::app::topics::PAYLOAD_OFFLINE;
#[cfg(target_os = "espidf")]
use crate::app::topics::TOPIC_STATUS;
use crate::error::CommsError;

/// Broker endpoint and client identity.
#[derive(Debug, Clone, Copy)]
pub struct BrokerSettings {
    pub url: &'static str,
    pub client_id: &'static str,
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

/// Longest an inbound topic or payload may be; longer messages are dropped.
#[cfg(target_os = "espidf")]
const MAX_TOPIC_LEN: usize = 64;
#[cfg(target_os = "espidf")]
const MAX_PAYLOAD_LEN: usize = 64;
#[cfg(target_os = "espidf")]
const INBOX_DEPTH: usize = 8;

/// How long `connect` waits for the broker's CONNACK.
#[cfg(target_os = "espidf")]
const CONNECT_TIMEOUT_MS: u32 = 3_000;
#[cfg(target_os = "espidf")]
const CONNECT_POLL_MS: u32 = 50;

#[cfg(target_os = "espidf")]
struct Inbound {
    topic: heapless::String<MAX_TOPIC_LEN>,
    payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

/// State written by the client's event callback.
#[cfg(target_os = "espidf")]
struct Shared {
    connected: AtomicBool,
    inbox: Channel<CriticalSectionRawMutex, Inbound, INBOX_DEPTH>,
}

#[cfg(target_os = "espidf")]
pub struct MqttAdapter {
    settings: BrokerSettings,
    client: Option<EspMqttClient<'static>>,
    shared: Arc<Shared>,
}

#[cfg(target_os = "espidf")]
impl MqttAdapter {
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            client: None,
            shared: Arc::new(Shared {
                connected: AtomicBool::new(false),
                inbox: Channel::new(),
            }),
        }
    }

    fn client(&mut self) -> Result<&mut EspMqttClient<'static>, CommsError> {
        self.client.as_mut().ok_or(CommsError::MqttNotConnected)
    }
}

#[cfg(target_os = "espidf")]
impl BrokerPort for MqttAdapter {
    fn connect(&mut self) -> Result<(), CommsError> {
        // Tear down any previous client so its internal retry loop stops.
        self.client = None;
        self.shared.connected.store(false, Ordering::Release);

        let config = MqttClientConfiguration {
            client_id: Some(self.settings.client_id),
            lwt: Some(LwtConfiguration {
                topic: TOPIC_STATUS,
                payload: PAYLOAD_OFFLINE.as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            disable_clean_session: false,
            keep_alive_interval: Some(core::time::Duration::from_secs(30)),
            ..Default::default()
        };

        let shared = Arc::clone(&self.shared);
        let client = EspMqttClient::new_cb(self.settings.url, &config, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => shared.connected.store(true, Ordering::Release),
                EventPayload::Disconnected => shared.connected.store(false, Ordering::Release),
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => {
                    let (Ok(topic), Ok(payload)) = (
                        heapless::String::try_from(topic),
                        heapless::Vec::from_slice(data),
                    ) else {
                        warn!("MQTT: oversized inbound message dropped");
                        return;
                    };
                    if shared.inbox.try_send(Inbound { topic, payload }).is_err() {
                        warn!("MQTT: inbox full, message dropped");
                    }
                }
                EventPayload::Error(e) => warn!("MQTT: client error: {:?}", e),
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {}", e);
            CommsError::MqttConnectFailed
        })?;
        self.client = Some(client);

        let mut waited = 0;
        while !self.shared.connected.load(Ordering::Acquire) {
            if waited >= CONNECT_TIMEOUT_MS {
                self.client = None;
                return Err(CommsError::MqttConnectFailed);
            }
            esp_idf_svc::hal::delay::FreeRtos::delay_ms(CONNECT_POLL_MS);
            waited += CONNECT_POLL_MS;
        }
        info!("MQTT: connected to {} as '{}'", self.settings.url, self.settings.client_id);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.shared.connected.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.client()?
            .subscribe(topic, QoS::AtLeastOnce)
            .map(|_| info!("MQTT: subscribed to '{}'", topic))
            .map_err(|_| CommsError::MqttSubscribeFailed)
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        self.client()?
            .publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes())
            .map(|_| ())
            .map_err(|_| CommsError::MqttPublishFailed)
    }

    fn service(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
        while let Ok(msg) = self.shared.inbox.try_receive() {
            on_message(msg.topic.as_str(), &msg.payload);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated broker
// ───────────────────────────────────────────────────────────────

/// One message as the simulated broker saw it.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

/// Broker-side state of the simulation, shared with tests through
/// [`MqttAdapter::sim_handle`].
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimBroker {
    pub reachable: AtomicBool,
    session: AtomicBool,
    log: Mutex<Vec<Published>>,
    subscriptions: Mutex<Vec<String>>,
    pending: Mutex<Vec<(String, Vec<u8>)>>,
}

#[cfg(not(target_os = "espidf"))]
impl SimBroker {
    /// Deliver `payload` on `topic` if the device is subscribed to it.
    pub fn inject(&self, topic: &str, payload: &[u8]) {
        let subscribed = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|t| t == topic);
        if subscribed && self.session.load(Ordering::Acquire) {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((topic.into(), payload.to_vec()));
        }
    }

    /// Drop the session as a broker restart would, without a clean disconnect.
    pub fn kill_session(&self) {
        self.session.store(false, Ordering::Release);
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn published(&self) -> Vec<Published> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Most recent payload on `topic`.
    pub fn last_on(&self, topic: &str) -> Option<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|p| p.topic == topic)
            .map(|p| p.payload.clone())
    }
}

#[cfg(not(target_os = "espidf"))]
pub struct MqttAdapter {
    settings: BrokerSettings,
    sim: Arc<SimBroker>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    pub fn new(settings: BrokerSettings) -> Self {
        let sim = SimBroker::default();
        sim.reachable.store(true, Ordering::Release);
        Self {
            settings,
            sim: Arc::new(sim),
        }
    }

    pub fn sim_handle(&self) -> Arc<SimBroker> {
        Arc::clone(&self.sim)
    }
}

#[cfg(not(target_os = "espidf"))]
impl BrokerPort for MqttAdapter {
    fn connect(&mut self) -> Result<(), CommsError> {
        if !self.sim.reachable.load(Ordering::Acquire) {
            warn!("MQTT(sim): broker {} unreachable", self.settings.url);
            return Err(CommsError::MqttConnectFailed);
        }
        self.sim.kill_session();
        self.sim.session.store(true, Ordering::Release);
        info!("MQTT(sim): connected as '{}'", self.settings.client_id);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.sim.session.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(CommsError::MqttNotConnected);
        }
        self.sim
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(topic.into());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(CommsError::MqttNotConnected);
        }
        self.sim
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Published {
                topic: topic.into(),
                payload: payload.into(),
                retain,
            });
        Ok(())
    }

    fn service(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
        let pending = core::mem::take(
            &mut *self
                .sim
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for (topic, payload) in pending {
            on_message(&topic, &payload);
        }
    }
}
