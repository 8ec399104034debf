//! Linux reporting agent for SensorCast
//!
//! ## Overview
//!
//! Wires the allocation-free engine from `sensorcast-core` to real
//! collaborators on a Linux board:
//!
//! - [`mqtt::MqttTransport`]: `rumqttc` client implementing the core
//!   [`Transport`](sensorcast_core::Transport) trait
//! - [`sensors`]: IIO climate sensor, `/proc/net/wireless` link monitor and a
//!   simulated sensor for running without hardware
//! - [`config::AgentConfig`]: JSON configuration with defaults for every field
//!
//! ## Topic Layout
//!
//! With client name `bed`:
//!
//! | topic                  | payload                         | retained |
//! |------------------------|---------------------------------|----------|
//! | `bed/status/temp`      | smoothed temperature, every 2 min | yes    |
//! | `bed/status/hum`       | smoothed humidity, every 5 min  | yes      |
//! | `bed/status/rssi`      | smoothed RSSI, every 5 min      | yes      |
//! | `bed/connected`        | `0` offline, `1` sensor fault, `2` ok | yes |
//! | `bed/git-version`      | agent version, on every connect | yes      |
//!
//! ## Delivery
//!
//! Publishing never blocks the sampling loop. A message the client cannot
//! queue is counted in [`ConnectionStats`] and dropped; the publisher it came
//! from sends its next estimate N samples later.

pub mod config;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod sensors;

pub use config::AgentConfig;
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttError, MqttTransport};

use sensorcast_core::ConfigError;
use thiserror::Error;

/// Common agent errors
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for AgentError {
    fn from(err: ConfigError) -> Self {
        AgentError::ConfigError(err.to_string())
    }
}

/// Connection statistics for a transport
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Messages handed to the client
    pub messages_sent: u64,
    /// Messages the client refused
    pub messages_failed: u64,
    /// Payload bytes handed to the client
    pub bytes_sent: u64,
    /// Connection acknowledgements after the first
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    pub(crate) fn record_sent(&mut self, payload_len: usize) {
        self.messages_sent += 1;
        self.bytes_sent += payload_len as u64;
    }

    pub(crate) fn record_failure(&mut self, error: impl ToString) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}
