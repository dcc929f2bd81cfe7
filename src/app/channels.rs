//! Inter-task queues.
//!
//! Bounded `embassy-sync` channels, statically allocated.  Every producer
//! uses `try_send` and every consumer `try_receive`, so no task ever blocks
//! on a queue: a full queue drops the new item, an empty one returns at once.
//!
//! ```text
//! ┌──────────────┐ SensorReading ┌──────────────┐
//! │   Sampler    │──────────────▶│  Broker link │
//! └──────────────┘               │   manager    │
//! ┌──────────────┐    Command    │              │
//! │   Actuator   │◀──────────────│              │
//! └──────────────┘               └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use super::commands::Command;
use super::readings::SensorReading;
use crate::config::QUEUE_DEPTH;

/// Sampler → broker link manager.
pub type SensorQueue = Channel<CriticalSectionRawMutex, SensorReading, QUEUE_DEPTH>;

/// Broker link manager → actuator controller.
pub type CommandQueue = Channel<CriticalSectionRawMutex, Command, QUEUE_DEPTH>;

pub static SENSOR_QUEUE: SensorQueue = Channel::new();

pub static COMMAND_QUEUE: CommandQueue = Channel::new();
