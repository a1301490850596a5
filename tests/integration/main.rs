//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below drives one sync path end to end through
//! [`twinsync::DeviceTwin`] with mock transport adapters. Everything runs
//! on the host.

mod command_flow_tests;
mod mock;
mod param_flow_tests;
mod resource_flow_tests;
