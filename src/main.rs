//! Irrigation Controller Firmware — Main Entry Point
//!
//! Five periodic tasks around one shared state and two bounded queues.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiAdapter     MqttAdapter     SensorHub      RelayDriver    │
//! │  (LinkPort)      (BrokerPort)    (SensorPort)   (RelayPort)    │
//! │                        Esp32TimeAdapter (TimePort)             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Connectivity · Sampler · Actuator · Broker · Status   │    │
//! │  │        SharedState · SENSOR_QUEUE · COMMAND_QUEUE      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Mutex;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::reset;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use irrigation::adapters::mqtt::{BrokerSettings, MqttAdapter};
use irrigation::adapters::time::Esp32TimeAdapter;
use irrigation::adapters::wifi::WifiAdapter;
use irrigation::app::channels::{COMMAND_QUEUE, SENSOR_QUEUE};
use irrigation::app::state::SharedState;
use irrigation::config::{self, SystemConfig};
use irrigation::drivers::hw_init::{self, GpioOutput};
use irrigation::drivers::relay::RelayDriver;
use irrigation::drivers::task_pin::{spawn_on_core, wait_for_exit};
use irrigation::drivers::watchdog::Watchdog;
use irrigation::error::Error;
use irrigation::pins;
use irrigation::sensors::climate::ClimateSensor;
use irrigation::sensors::soil::SoilMoistureSensor;
use irrigation::sensors::SensorHub;
use irrigation::tasks::actuator::ActuatorController;
use irrigation::tasks::broker::BrokerLinkManager;
use irrigation::tasks::connectivity::ConnectivitySupervisor;
use irrigation::tasks::sampler::SensorSampler;
use irrigation::tasks::status::StatusReporter;
use irrigation::tasks::{
    run_forever, ACTUATOR_TASK, BROKER_TASK, CONNECTIVITY_TASK, SAMPLER_TASK, STATUS_TASK,
};

static SHARED: SharedState = SharedState::new();

/// How often the main thread checks the task threads.
const SUPERVISE_POLL_MS: u64 = 1_000;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Irrigation controller v{}        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();
    config.validate().map_err(Error::from)?;
    info!("Config: {}", serde_json::to_string(&config)?);

    // ── 3. Relay off before anything else can run ─────────────
    hw_init::init_peripherals()?;
    let mut relay = RelayDriver::new(GpioOutput::relay());
    relay.force_off().map_err(Error::from)?;
    info!("Relay: forced OFF at boot");

    // ── 4. Platform services ──────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, Some(nvs))?;
    if let Err(e) = wifi.set_credentials(config::WIFI_SSID, config::WIFI_PASSWORD) {
        // Keep running offline; the relay logic does not depend on the link.
        warn!("WiFi: {} (SSID='{}'), link will stay down", e, config::WIFI_SSID);
    }

    // GPIO4 is pins::DHT_GPIO.
    let dht_pin = PinDriver::input_output_od(AnyIOPin::from(peripherals.pins.gpio4))?;
    info!("DHT11 on GPIO{}", pins::DHT_GPIO);
    let sensors = SensorHub::new(
        ClimateSensor::new(dht_pin),
        SoilMoistureSensor::new(pins::SOIL_ADC_CHANNEL),
    );

    let clock: &'static Esp32TimeAdapter = Box::leak(Box::new(Esp32TimeAdapter::new()));
    let broker: &'static Mutex<MqttAdapter> = Box::leak(Box::new(Mutex::new(MqttAdapter::new(
        BrokerSettings {
            url: config::MQTT_BROKER_URL,
            client_id: config::MQTT_CLIENT_ID,
        },
    ))));

    // ── 5. Tasks ──────────────────────────────────────────────
    let supervisor = ConnectivitySupervisor::new(wifi, clock, &SHARED.connectivity, &config);
    let sampler = SensorSampler::new(sensors, &SHARED.soil, &SENSOR_QUEUE, &config);
    let actuator = ActuatorController::new(relay, clock, &SHARED, &COMMAND_QUEUE, &config);
    let link = BrokerLinkManager::new(broker, clock, &SHARED, &SENSOR_QUEUE, &COMMAND_QUEUE, &config);
    let status = StatusReporter::new(broker, &SHARED, &config);
    let watchdog_ms = config.watchdog_timeout_ms;

    let handles = [
        (CONNECTIVITY_TASK, spawn_on_core(CONNECTIVITY_TASK, move || run_forever(supervisor, clock))?),
        (
            ACTUATOR_TASK,
            spawn_on_core(ACTUATOR_TASK, move || {
                let watchdog = Watchdog::subscribe_current(watchdog_ms);
                run_forever(actuator.with_watchdog(watchdog), clock)
            })?,
        ),
        (SAMPLER_TASK, spawn_on_core(SAMPLER_TASK, move || run_forever(sampler, clock))?),
        (BROKER_TASK, spawn_on_core(BROKER_TASK, move || run_forever(link, clock))?),
        (STATUS_TASK, spawn_on_core(STATUS_TASK, move || run_forever(status, clock))?),
    ];

    info!("System ready.");

    // ── 6. Supervise ──────────────────────────────────────────
    // Tasks never return; a finished thread means one panicked.
    let dead = wait_for_exit(&handles, clock, SUPERVISE_POLL_MS);
    error!(
        "Task '{}' exited unexpectedly, restarting device",
        dead.name.trim_end_matches('\0')
    );
    reset::restart()
}
