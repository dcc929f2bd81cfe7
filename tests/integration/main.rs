//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives several periodic tasks
//! together against mock hardware and the simulated WiFi/MQTT adapters.
//! All tests run on the host (x86_64) with no real hardware required.

mod control_loop_tests;
mod link_tests;
mod mock_hw;
