//! Connectivity supervisor.
//!
//! Owns `link_up`.  Every supervisory period it checks the station link and,
//! when down, makes one bounded reconnection attempt:
//!
//! ```text
//!  Disconnected ──begin_connect──▶ Connecting{1..=N} ──up──▶ Connected
//!       ▲                                │                      │
//!       └──────── N polls, still down ───┘◀──── drop detected ──┘
//! ```
//!
//! Failure is never fatal; the next period starts over.

use log::{info, warn};

use super::PeriodicTask;
use crate::app::ports::{LinkPort, TimePort};
use crate::app::state::ConnectivityFlags;
use crate::config::SystemConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Status poll `attempt` of the current bring-up.
    Connecting { attempt: u8 },
    Connected,
}

pub struct ConnectivitySupervisor<'a, L: LinkPort, C: TimePort> {
    link: L,
    clock: &'a C,
    flags: &'a ConnectivityFlags,
    period_ms: u64,
    max_attempts: u8,
    backoff_ms: u64,
    state: LinkState,
}

impl<'a, L: LinkPort, C: TimePort> ConnectivitySupervisor<'a, L, C> {
    pub fn new(link: L, clock: &'a C, flags: &'a ConnectivityFlags, config: &SystemConfig) -> Self {
        Self {
            link,
            clock,
            flags,
            period_ms: u64::from(config.link_check_interval_ms),
            max_attempts: config.link_connect_attempts,
            backoff_ms: u64::from(config.link_connect_backoff_ms),
            state: LinkState::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// One supervisory step.  Blocks for at most
    /// `max_attempts × backoff_ms` while bringing the link up.
    pub fn supervise(&mut self) -> LinkState {
        if self.link.is_connected() {
            self.mark_connected();
            return self.state;
        }

        if self.state == LinkState::Connected || self.flags.link_up() {
            warn!("WiFi: link lost");
        }
        self.flags.set_link_up(false);
        self.state = LinkState::Disconnected;

        info!("WiFi: connecting...");
        if let Err(e) = self.link.begin_connect() {
            warn!("WiFi: connect request rejected: {}", e);
            return self.state;
        }

        for attempt in 1..=self.max_attempts {
            self.state = LinkState::Connecting { attempt };
            self.clock.sleep_ms(self.backoff_ms);
            if self.link.is_connected() {
                self.mark_connected();
                return self.state;
            }
        }

        warn!(
            "WiFi: still down after {} polls, retrying in {} ms",
            self.max_attempts, self.period_ms
        );
        self.state = LinkState::Disconnected;
        self.state
    }

    fn mark_connected(&mut self) {
        if self.state != LinkState::Connected || !self.flags.link_up() {
            match self.link.ip_address() {
                Some(ip) => info!("WiFi: connected, IP {}", ip),
                None => info!("WiFi: connected"),
            }
        }
        self.state = LinkState::Connected;
        self.flags.set_link_up(true);
    }
}

impl<L: LinkPort, C: TimePort> PeriodicTask for ConnectivitySupervisor<'_, L, C> {
    fn name(&self) -> &'static str {
        "wifi"
    }

    fn period_ms(&self) -> u64 {
        self.period_ms
    }

    fn run_once(&mut self) {
        self.supervise();
    }
}
