//! Application core — pure domain logic, zero I/O.
//!
//! Shared state, the relay command vocabulary, the bounded queues that
//! connect the periodic tasks, and the wire topics.  All interaction with
//! hardware and the network happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod channels;
pub mod commands;
pub mod ports;
pub mod readings;
pub mod state;
pub mod topics;
