//! TwinSync device-twin library.
//!
//! Device-side synchronization with a cloud device-management platform:
//! validated parameter updates, command dispatch with deferred completion,
//! chunked resource transfer with commit/rollback, and status/telemetry
//! publishing. Transport, wire encoding and scheduling stay outside; the
//! crate consumes them through the port traits in [`twin::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod registry;
pub mod twin;

pub use config::SyncConfig;
pub use error::{Error, ErrorCategory, ResponseCode, Result};
pub use twin::service::{DeviceTwin, ResourceEvent, ResourcePhase};
