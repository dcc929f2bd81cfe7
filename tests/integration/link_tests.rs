//! WiFi supervision, broker session lifecycle, and status reporting.

use std::sync::Mutex;
use std::sync::atomic::Ordering;

use irrigation::adapters::mqtt::{BrokerSettings, MqttAdapter};
use irrigation::adapters::wifi::WifiAdapter;
use irrigation::app::channels::{CommandQueue, SensorQueue};
use irrigation::app::ports::{LinkPort, TimePort};
use irrigation::app::state::SharedState;
use irrigation::app::topics::{TOPIC_RELAY_CONTROL, TOPIC_RELAY_STATUS, TOPIC_STATUS};
use irrigation::config::SystemConfig;
use irrigation::tasks::broker::{BrokerLinkManager, SessionState};
use irrigation::tasks::connectivity::{ConnectivitySupervisor, LinkState};
use irrigation::tasks::status::StatusReporter;

use crate::mock_hw::{ManualClock, MockRelay};

fn broker() -> Mutex<MqttAdapter> {
    Mutex::new(MqttAdapter::new(BrokerSettings {
        url: "mqtt://sim:1883",
        client_id: "irrigation-test",
    }))
}

fn wifi() -> WifiAdapter {
    let mut wifi = WifiAdapter::new();
    wifi.set_credentials("GardenNet", "password1").unwrap();
    wifi
}

#[test]
fn boot_with_access_point_down_then_recovers() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();
    let broker = broker();
    let sim = broker.lock().unwrap().sim_handle();

    let wifi = wifi();
    let ap = wifi.reachability_handle();
    ap.store(false, Ordering::Release);

    let mut supervisor = ConnectivitySupervisor::new(wifi, &clock, &shared.connectivity, &config);
    let mut link = BrokerLinkManager::new(&broker, &clock, &shared, &readings, &commands, &config);
    let mut status = StatusReporter::new(&broker, &shared, &config);

    // 20 polls × 500 ms, then give up until the next period.
    assert_eq!(supervisor.supervise(), LinkState::Disconnected);
    assert_eq!(clock.now_ms(), 10_000);
    assert!(!shared.connectivity.link_up());

    assert_eq!(link.service_tick(), SessionState::NoSession);
    assert!(!status.report());
    assert!(sim.published().is_empty());

    assert_eq!(supervisor.state(), LinkState::Disconnected);
    assert_eq!(supervisor.link().ip_address(), None);
    assert_eq!(link.session(), SessionState::NoSession);

    ap.store(true, Ordering::Release);
    assert_eq!(supervisor.supervise(), LinkState::Connected);
    assert!(shared.connectivity.link_up());
    assert_eq!(supervisor.state(), LinkState::Connected);
    assert_eq!(
        supervisor.link().ip_address(),
        Some(std::net::Ipv4Addr::new(192, 168, 4, 20))
    );

    assert_eq!(link.service_tick(), SessionState::Established);
    assert_eq!(link.session(), SessionState::Established);
    assert!(shared.connectivity.session_up());
    assert_eq!(sim.last_on(TOPIC_STATUS).as_deref(), Some("online"));

    assert!(status.report());
    let tail: Vec<(String, String)> = sim
        .published()
        .into_iter()
        .rev()
        .take(2)
        .map(|p| (p.topic, p.payload))
        .collect();
    assert_eq!(
        tail,
        vec![
            (TOPIC_RELAY_STATUS.to_string(), "OFF".to_string()),
            (TOPIC_STATUS.to_string(), "online".to_string()),
        ]
    );
}

#[test]
fn access_point_loss_clears_link_flag() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();

    let wifi = wifi();
    let ap = wifi.reachability_handle();
    let mut supervisor = ConnectivitySupervisor::new(wifi, &clock, &shared.connectivity, &config);
    assert_eq!(supervisor.supervise(), LinkState::Connected);

    ap.store(false, Ordering::Release);
    assert_eq!(supervisor.supervise(), LinkState::Disconnected);
    assert!(!shared.connectivity.link_up());
}

#[test]
fn session_is_rebuilt_after_broker_restart() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();
    let broker = broker();
    let sim = broker.lock().unwrap().sim_handle();

    let mut link = BrokerLinkManager::new(&broker, &clock, &shared, &readings, &commands, &config);
    shared.connectivity.set_link_up(true);
    assert_eq!(link.service_tick(), SessionState::Established);

    sim.kill_session();
    clock.advance(100);
    assert_eq!(link.service_tick(), SessionState::NoSession);
    assert!(!shared.connectivity.session_up());

    // Still inside the 5 s retry window.
    clock.advance(1_000);
    assert_eq!(link.service_tick(), SessionState::NoSession);

    clock.advance(4_000);
    assert_eq!(link.service_tick(), SessionState::Established);
    assert!(shared.connectivity.session_up());

    // Resubscribed: commands flow again.
    sim.inject(TOPIC_RELAY_CONTROL, b"ON");
    link.service_tick();
    assert!(commands.try_receive().is_ok());

    let onlines = sim
        .published()
        .iter()
        .filter(|p| p.topic == TOPIC_STATUS && p.payload == "online" && p.retain)
        .count();
    assert_eq!(onlines, 2);
}

#[test]
fn unreachable_broker_is_retried_at_the_reconnect_interval() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();
    let broker = broker();
    let sim = broker.lock().unwrap().sim_handle();
    sim.reachable.store(false, Ordering::Release);

    let mut link = BrokerLinkManager::new(&broker, &clock, &shared, &readings, &commands, &config);
    shared.connectivity.set_link_up(true);
    assert_eq!(link.service_tick(), SessionState::NoSession);

    sim.reachable.store(true, Ordering::Release);
    clock.advance(4_900);
    assert_eq!(link.service_tick(), SessionState::NoSession);
    clock.advance(100);
    assert_eq!(link.service_tick(), SessionState::Established);
}

#[test]
fn status_report_reflects_relay_state() {
    use irrigation::app::commands::Command;
    use irrigation::tasks::actuator::ActuatorController;

    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();
    let broker = broker();
    let sim = broker.lock().unwrap().sim_handle();

    let mut link = BrokerLinkManager::new(&broker, &clock, &shared, &readings, &commands, &config);
    let mut actuator = ActuatorController::new(MockRelay::new(), &clock, &shared, &commands, &config);
    let mut status = StatusReporter::new(&broker, &shared, &config);

    shared.connectivity.set_link_up(true);
    link.service_tick();

    commands.try_send(Command::SetOn).unwrap();
    actuator.control_period();
    assert!(status.report());
    assert_eq!(sim.last_on(TOPIC_RELAY_STATUS).as_deref(), Some("ON"));
}
