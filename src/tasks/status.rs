//! Status reporter.
//!
//! Every status period, while a broker session is up, republish liveness
//! and relay state as retained messages.  Skipped silently otherwise.

use std::sync::Mutex;

use log::{debug, warn};

use super::PeriodicTask;
use crate::app::ports::BrokerPort;
use crate::app::state::{actuator_snapshot, lock, SharedState};
use crate::app::topics::{relay_payload, PAYLOAD_ONLINE, TOPIC_RELAY_STATUS, TOPIC_STATUS};
use crate::config::SystemConfig;

pub struct StatusReporter<'a, B: BrokerPort> {
    broker: &'a Mutex<B>,
    shared: &'a SharedState,
    period_ms: u64,
}

impl<'a, B: BrokerPort> StatusReporter<'a, B> {
    pub fn new(broker: &'a Mutex<B>, shared: &'a SharedState, config: &SystemConfig) -> Self {
        Self {
            broker,
            shared,
            period_ms: u64::from(config.status_interval_ms),
        }
    }

    /// Returns `true` if both messages went out.
    pub fn report(&mut self) -> bool {
        if !self.shared.connectivity.session_up() {
            debug!("Status: no session, skipping");
            return false;
        }
        let relay_on = actuator_snapshot(&self.shared.actuator).relay_on();

        let mut broker = lock(self.broker);
        let result = broker
            .publish(TOPIC_STATUS, PAYLOAD_ONLINE, true)
            .and_then(|()| broker.publish(TOPIC_RELAY_STATUS, relay_payload(relay_on), true));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Status: publish failed: {}", e);
                false
            }
        }
    }
}

impl<B: BrokerPort> PeriodicTask for StatusReporter<'_, B> {
    fn name(&self) -> &'static str {
        "status"
    }

    fn period_ms(&self) -> u64 {
        self.period_ms
    }

    fn run_once(&mut self) {
        self.report();
    }
}
