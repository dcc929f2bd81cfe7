//! Sensor → control → relay, and remote commands through the broker.

use std::sync::Mutex;

use irrigation::adapters::mqtt::{BrokerSettings, MqttAdapter};
use irrigation::app::channels::{CommandQueue, SensorQueue};
use irrigation::app::commands::Command;
use irrigation::app::state::SharedState;
use irrigation::app::topics::{
    TOPIC_HUMIDITY, TOPIC_RELAY_CONTROL, TOPIC_RELAY_STATUS, TOPIC_SOIL_MOISTURE,
    TOPIC_TEMPERATURE,
};
use irrigation::config::{QUEUE_DEPTH, SystemConfig};
use irrigation::tasks::actuator::ActuatorController;
use irrigation::tasks::broker::{BrokerLinkManager, SessionState};
use irrigation::tasks::sampler::{SampleOutcome, SensorSampler};

use crate::mock_hw::{ManualClock, MockRelay, MockSensors};

fn settings() -> BrokerSettings {
    BrokerSettings {
        url: "mqtt://sim:1883",
        client_id: "irrigation-test",
    }
}

// ── Local sensor-driven control ───────────────────────────────

#[test]
fn dry_soil_starts_and_wet_soil_stops_irrigation() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();

    let mut sensors = MockSensors::new();
    sensors.set_soil_percent(20);
    let mut sampler = SensorSampler::new(sensors, &shared.soil, &readings, &config);
    let mut actuator = ActuatorController::new(MockRelay::new(), &clock, &shared, &commands, &config);

    assert_eq!(sampler.sample(), SampleOutcome::Queued);
    let state = actuator.control_period();
    assert!(state.relay_on());
    assert_eq!(state.on_since_ms(), Some(0));

    // Inside the dead zone nothing changes.
    clock.advance(2_000);
    sampler.sensors_mut().set_soil_percent(45);
    sampler.sample();
    assert!(actuator.control_period().relay_on());

    clock.advance(2_000);
    sampler.sensors_mut().set_soil_percent(65);
    sampler.sample();
    assert!(!actuator.control_period().relay_on());
    assert_eq!(actuator.relay().writes, vec![true, false]);
}

#[test]
fn safety_timeout_cuts_a_stuck_dry_sensor() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let commands = CommandQueue::new();
    shared.soil.store(5);

    let mut actuator = ActuatorController::new(MockRelay::new(), &clock, &shared, &commands, &config);
    assert!(actuator.control_period().relay_on());

    for _ in 0..4 {
        clock.advance(2_000);
        assert!(actuator.control_period().relay_on());
    }

    // 10 s on.
    clock.advance(2_000);
    let state = actuator.control_period();
    assert!(!state.relay_on());
    assert!(state.auto_mode());
    assert_eq!(actuator.relay().writes, vec![true, false]);

    // Still dry on the next period: automatic control starts a fresh cycle.
    clock.advance(2_000);
    let state = actuator.control_period();
    assert!(state.relay_on());
    assert_eq!(state.on_since_ms(), Some(12_000));
}

#[test]
fn failed_relay_write_leaves_state_unchanged() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let commands = CommandQueue::new();
    shared.soil.store(5);

    let relay = MockRelay {
        fail: true,
        ..MockRelay::new()
    };
    let mut actuator = ActuatorController::new(relay, &clock, &shared, &commands, &config);
    let state = actuator.control_period();
    assert!(!state.relay_on());
    assert_eq!(state.on_since_ms(), None);
}

// ── Remote commands through the simulated broker ──────────────

#[test]
fn remote_on_then_off_round_trip() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();
    let broker = Mutex::new(MqttAdapter::new(settings()));
    let sim = broker.lock().unwrap().sim_handle();

    let mut link = BrokerLinkManager::new(&broker, &clock, &shared, &readings, &commands, &config);
    let mut actuator = ActuatorController::new(MockRelay::new(), &clock, &shared, &commands, &config);

    shared.connectivity.set_link_up(true);
    assert_eq!(link.service_tick(), SessionState::Established);
    assert_eq!(sim.last_on(TOPIC_RELAY_STATUS).as_deref(), Some("OFF"));

    sim.inject(TOPIC_RELAY_CONTROL, b"ON");
    link.service_tick();
    let state = actuator.control_period();
    assert!(state.relay_on());
    assert!(!state.auto_mode());

    clock.advance(100);
    link.service_tick();
    let last = sim.published().pop().unwrap();
    assert_eq!(last.topic, TOPIC_RELAY_STATUS);
    assert_eq!(last.payload, "ON");
    assert!(last.retain);

    sim.inject(TOPIC_RELAY_CONTROL, b" off ");
    link.service_tick();
    let state = actuator.control_period();
    assert!(!state.relay_on());
    assert!(!state.auto_mode());

    clock.advance(100);
    link.service_tick();
    assert_eq!(sim.last_on(TOPIC_RELAY_STATUS).as_deref(), Some("OFF"));
    assert_eq!(actuator.relay().writes, vec![true, false]);
}

#[test]
fn manual_mode_ignores_soil_until_auto_restored() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();
    let broker = Mutex::new(MqttAdapter::new(settings()));
    let sim = broker.lock().unwrap().sim_handle();

    let mut link = BrokerLinkManager::new(&broker, &clock, &shared, &readings, &commands, &config);
    let mut actuator = ActuatorController::new(MockRelay::new(), &clock, &shared, &commands, &config);
    shared.connectivity.set_link_up(true);
    link.service_tick();

    sim.inject(TOPIC_RELAY_CONTROL, b"OFF");
    link.service_tick();
    shared.soil.store(10);
    assert!(!actuator.control_period().relay_on());

    sim.inject(TOPIC_RELAY_CONTROL, b"auto");
    link.service_tick();
    let state = actuator.control_period();
    assert!(state.auto_mode());
    assert!(state.relay_on());
}

#[test]
fn unknown_payloads_and_topics_are_ignored() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();
    let broker = Mutex::new(MqttAdapter::new(settings()));
    let sim = broker.lock().unwrap().sim_handle();

    let mut link = BrokerLinkManager::new(&broker, &clock, &shared, &readings, &commands, &config);
    shared.connectivity.set_link_up(true);
    link.service_tick();

    sim.inject(TOPIC_RELAY_CONTROL, b"toggle");
    sim.inject(TOPIC_RELAY_CONTROL, b"");
    // Not subscribed: the simulated broker never delivers it.
    sim.inject("actuator/other", b"ON");
    link.service_tick();
    assert!(commands.try_receive().is_err());
}

#[test]
fn commands_are_applied_one_per_period_in_order() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let commands = CommandQueue::new();
    commands.try_send(Command::SetOn).unwrap();
    commands.try_send(Command::SetOff).unwrap();
    commands.try_send(Command::SetAuto).unwrap();

    let mut actuator = ActuatorController::new(MockRelay::new(), &clock, &shared, &commands, &config);
    assert!(actuator.control_period().relay_on());
    assert!(!actuator.control_period().relay_on());
    assert!(actuator.control_period().auto_mode());
    assert_eq!(actuator.relay().writes, vec![true, false]);
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn queued_readings_are_published_in_order() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();
    let broker = Mutex::new(MqttAdapter::new(settings()));
    let sim = broker.lock().unwrap().sim_handle();

    let mut sensors = MockSensors::new();
    sensors.set_soil_percent(42);
    let mut sampler = SensorSampler::new(sensors, &shared.soil, &readings, &config);
    let mut link = BrokerLinkManager::new(&broker, &clock, &shared, &readings, &commands, &config);
    shared.connectivity.set_link_up(true);
    link.service_tick();

    sampler.sample();
    link.service_tick();

    let telemetry: Vec<(String, String, bool)> = sim
        .published()
        .into_iter()
        .filter(|p| p.topic.starts_with("sensor/") && p.topic != "sensor/status")
        .map(|p| (p.topic, p.payload, p.retain))
        .collect();
    assert_eq!(
        telemetry,
        vec![
            (TOPIC_TEMPERATURE.to_string(), "22.50".to_string(), false),
            (TOPIC_HUMIDITY.to_string(), "55.00".to_string(), false),
            (TOPIC_SOIL_MOISTURE.to_string(), "42".to_string(), false),
        ]
    );
}

#[test]
fn offline_backlog_is_bounded_and_flushed_on_session() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();
    let broker = Mutex::new(MqttAdapter::new(settings()));
    let sim = broker.lock().unwrap().sim_handle();

    let mut sampler = SensorSampler::new(MockSensors::new(), &shared.soil, &readings, &config);
    let mut link = BrokerLinkManager::new(&broker, &clock, &shared, &readings, &commands, &config);

    let outcomes: Vec<SampleOutcome> = (0..QUEUE_DEPTH + 2).map(|_| sampler.sample()).collect();
    assert!(outcomes[..QUEUE_DEPTH].iter().all(|o| *o == SampleOutcome::Queued));
    assert_eq!(outcomes[QUEUE_DEPTH..], [SampleOutcome::Dropped, SampleOutcome::Dropped]);

    // Link down: nothing is drained.
    link.service_tick();
    assert!(readings.is_full());

    shared.connectivity.set_link_up(true);
    link.service_tick();
    assert!(readings.is_empty());
    let soil_msgs = sim
        .published()
        .iter()
        .filter(|p| p.topic == TOPIC_SOIL_MOISTURE)
        .count();
    assert_eq!(soil_msgs, QUEUE_DEPTH);
}

#[test]
fn climate_failure_still_feeds_control() {
    let config = SystemConfig::default();
    let clock = ManualClock::new();
    let shared = SharedState::new();
    let readings = SensorQueue::new();
    let commands = CommandQueue::new();

    let mut sensors = MockSensors::new();
    sensors.climate = Err(irrigation::error::SensorError::ReadFailed);
    sensors.set_soil_percent(10);
    let mut sampler = SensorSampler::new(sensors, &shared.soil, &readings, &config);
    let mut actuator = ActuatorController::new(MockRelay::new(), &clock, &shared, &commands, &config);

    assert_eq!(sampler.sample(), SampleOutcome::Invalid);
    assert!(readings.is_empty());
    assert!(actuator.control_period().relay_on());
}
