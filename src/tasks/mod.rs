//! The five periodic tasks of the control core.
//!
//! ```text
//! ┌──────────────┐  link_up   ┌──────────────┐ session_up ┌──────────────┐
//! │ Connectivity │───────────▶│  Broker link │───────────▶│    Status    │
//! │  supervisor  │            │   manager    │            │   reporter   │
//! └──────────────┘            └──────┬───────┘            └──────────────┘
//!                               ▲    │ Command
//!                 SensorReading │    ▼
//! ┌──────────────┐  soil %   ┌──┴───────────┐
//! │    Sensor    │──────────▶│   Actuator   │
//! │   sampler    │           │  controller  │
//! └──────────────┘           └──────────────┘
//! ```
//!
//! Each task is a [`PeriodicTask`]: one bounded step per period, driven by
//! [`run_forever`] on its own thread.  Nothing in a step blocks on a lock
//! held across another task's sleep, and every queue operation is
//! non-blocking, so each task's only real wait is the sleep to its next
//! deadline.

pub mod actuator;
pub mod broker;
pub mod connectivity;
pub mod sampler;
pub mod status;

use log::warn;

use crate::app::ports::TimePort;
use crate::drivers::task_pin::Core;

/// One periodic responsibility.
pub trait PeriodicTask {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Fixed period between step starts (milliseconds).
    fn period_ms(&self) -> u64;

    /// One period's worth of work.  Must not block beyond its own bounded
    /// waits and must never fail the task.
    fn run_once(&mut self);
}

/// Fixed-rate deadline tracker.
///
/// Deadlines advance by exactly one period, so step duration does not
/// accumulate drift.  A step that overruns its deadline is followed
/// immediately by the next one and the schedule re-anchors on "now".
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    period_ms: u64,
    next_deadline_ms: u64,
}

impl Ticker {
    pub fn new(period_ms: u64, now_ms: u64) -> Self {
        Self {
            period_ms,
            next_deadline_ms: now_ms.saturating_add(period_ms),
        }
    }

    pub fn next_deadline_ms(&self) -> u64 {
        self.next_deadline_ms
    }

    /// Sleep until the next deadline, then advance it.  Returns the number
    /// of milliseconds the preceding step overran by (0 when on time).
    pub fn wait(&mut self, clock: &impl TimePort) -> u64 {
        let now = clock.now_ms();
        if now < self.next_deadline_ms {
            clock.sleep_ms(self.next_deadline_ms - now);
            self.next_deadline_ms += self.period_ms;
            0
        } else {
            let late = now - self.next_deadline_ms;
            self.next_deadline_ms = now.saturating_add(self.period_ms);
            late
        }
    }
}

/// Run `task` for `periods` steps.
pub fn run_periods<T: PeriodicTask, C: TimePort>(task: &mut T, clock: &C, periods: usize) {
    let mut ticker = Ticker::new(task.period_ms(), clock.now_ms());
    for _ in 0..periods {
        step(task, clock, &mut ticker);
    }
}

/// Task thread body.  Never returns.
pub fn run_forever<T: PeriodicTask, C: TimePort>(mut task: T, clock: &C) -> ! {
    let mut ticker = Ticker::new(task.period_ms(), clock.now_ms());
    loop {
        step(&mut task, clock, &mut ticker);
    }
}

fn step<T: PeriodicTask, C: TimePort>(task: &mut T, clock: &C, ticker: &mut Ticker) {
    task.run_once();
    let late = ticker.wait(clock);
    if late > task.period_ms() {
        warn!("{}: step overran its period by {} ms", task.name(), late);
    }
}

// ───────────────────────────────────────────────────────────────
// Thread placement
// ───────────────────────────────────────────────────────────────

/// Where and how a task thread runs.  `name` is NUL-terminated for the
/// FreeRTOS task name.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

/// Link health gates everything else.
pub const CONNECTIVITY_TASK: TaskSpec = TaskSpec {
    name: "wifi\0",
    core: Core::Pro,
    priority: 10,
    stack_kb: 8,
};

/// Safety-critical; kept off the protocol core.
pub const ACTUATOR_TASK: TaskSpec = TaskSpec {
    name: "actuator\0",
    core: Core::App,
    priority: 10,
    stack_kb: 4,
};

pub const SAMPLER_TASK: TaskSpec = TaskSpec {
    name: "sampler\0",
    core: Core::App,
    priority: 6,
    stack_kb: 4,
};

pub const BROKER_TASK: TaskSpec = TaskSpec {
    name: "mqtt\0",
    core: Core::Pro,
    priority: 6,
    stack_kb: 8,
};

pub const STATUS_TASK: TaskSpec = TaskSpec {
    name: "status\0",
    core: Core::Pro,
    priority: 3,
    stack_kb: 4,
};
