//! Synchronization layer configuration
//!
//! Tunable limits for the device-twin core. Defaults follow the
//! LiveObjects client configuration; overrides can be loaded from JSON.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Depth of the deferred command response queue.
///
/// Fixed at compile time because the queue is a statically sized channel.
pub const PENDING_RESPONSE_DEPTH: usize = 5;

/// Upper bound on arguments any request block can carry.
pub const MAX_COMMAND_ARGS: usize = 8;

/// Upper bound on updates in one parameter batch.
pub const MAX_BATCH_UPDATES: usize = 8;

/// Core synchronization configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    // --- Resources ---
    /// Maximum bytes pulled from the transport per chunk event
    pub chunk_budget: usize,

    // --- Commands ---
    /// Maximum arguments accepted in one command request
    pub max_command_args: usize,

    // --- Parameters ---
    /// Maximum parameter updates applied from one request
    pub max_params_per_update: usize,

    // --- Publisher ---
    /// Maximum number of status sets
    pub max_status_sets: usize,
    /// Maximum number of collected-data streams
    pub max_data_sets: usize,
    /// Maximum length of a stream id, model, or tags string
    pub stream_meta_len: usize,
    /// Interval between telemetry samples (milliseconds)
    pub publish_interval_ms: u32,
    /// Interval of the deferred-command tick (milliseconds)
    pub tick_interval_ms: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_budget: 1024,

            max_command_args: 5,

            max_params_per_update: 5,

            max_status_sets: 1,
            max_data_sets: 5,
            stream_meta_len: 80,
            publish_interval_ms: 5000,
            tick_interval_ms: 1000,
        }
    }
}

impl SyncConfig {
    /// Parse a JSON override document. Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(text).map_err(|_| ConfigError::Malformed)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field. Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=64 * 1024).contains(&self.chunk_budget) {
            return Err(ConfigError::ValidationFailed(
                "chunk_budget must be 1–65536",
            ));
        }
        if self.max_command_args > MAX_COMMAND_ARGS {
            return Err(ConfigError::ValidationFailed(
                "max_command_args must be 0–8",
            ));
        }
        if !(1..=MAX_BATCH_UPDATES).contains(&self.max_params_per_update) {
            return Err(ConfigError::ValidationFailed(
                "max_params_per_update must be 1–8",
            ));
        }
        if !(1..=4).contains(&self.max_status_sets) {
            return Err(ConfigError::ValidationFailed(
                "max_status_sets must be 1–4",
            ));
        }
        if !(1..=16).contains(&self.max_data_sets) {
            return Err(ConfigError::ValidationFailed(
                "max_data_sets must be 1–16",
            ));
        }
        if !(8..=STREAM_META_CAP).contains(&self.stream_meta_len) {
            return Err(ConfigError::ValidationFailed(
                "stream_meta_len must be 8–80",
            ));
        }
        if !(100..=3_600_000).contains(&self.publish_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "publish_interval_ms must be 100–3600000",
            ));
        }
        if !(10..=60_000).contains(&self.tick_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_ms must be 10–60000",
            ));
        }
        Ok(())
    }
}

/// Storage capacity of stream metadata strings.
pub const STREAM_META_CAP: usize = 80;

/// Errors from loading or validating [`SyncConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The override document is not valid JSON for this schema.
    Malformed,
    /// A field failed range validation.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "config malformed"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl core::error::Error for ConfigError {}
