//! Construction-time configuration
//!
//! Publishers are configured once at startup and never reconfigured. Two
//! kinds of settings exist:
//!
//! - [`FilterConstants`]: process-wide values shared by every channel
//!   (initial uncertainty, process noise, how the first estimate is seeded)
//! - [`PublisherConfig`]: one per measured quantity (topic, retained flag,
//!   measurement noise, send cadence, payload precision)
//!
//! Both validate themselves; a publisher refuses to build from values that
//! would break its invariants.
//!
//! ```rust
//! use sensorcast_core::{FilterConstants, PublisherConfig};
//!
//! let constants = FilterConstants::default().with_process_noise(0.02);
//! let temp = PublisherConfig::new("bed/status/temp", 0.2, 24)?
//!     .with_retained(true)
//!     .with_precision(1)?;
//!
//! assert_eq!(temp.send_every_n, 24);
//! assert!(constants.validate().is_ok());
//! # Ok::<(), sensorcast_core::ConfigError>(())
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};

/// Capacity of a topic buffer in bytes
pub const TOPIC_CAPACITY: usize = 96;

/// Fixed-capacity topic string
pub type Topic = heapless::String<TOPIC_CAPACITY>;

/// Uncertainty assigned to a fresh filter; large means "trust nothing yet"
pub const DEFAULT_INITIAL_ERROR: f32 = 1000.0;

/// Expected drift of the true value between two samples
pub const DEFAULT_PROCESS_NOISE: f32 = 0.01;

/// Decimals rendered into a published payload
pub const DEFAULT_PRECISION: u8 = 2;

/// Upper bound for [`PublisherConfig::precision`]
pub const MAX_PRECISION: u8 = 6;

/// Where the estimate starts before the first measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InitialEstimate {
    /// Adopt the first measurement as the estimate
    FirstMeasurement,
    /// Start from a fixed value and let the filter pull away from it
    Seed(f32),
}

impl Default for InitialEstimate {
    fn default() -> Self {
        Self::Seed(0.0)
    }
}

/// Filter constants shared by all channels
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterConstants {
    /// Error estimate at construction and after every restart
    pub initial_error_estimate: f32,
    /// Process noise (Q)
    pub process_noise: f32,
    /// Seeding strategy for the estimate
    pub initial_estimate: InitialEstimate,
}

impl Default for FilterConstants {
    fn default() -> Self {
        Self {
            initial_error_estimate: DEFAULT_INITIAL_ERROR,
            process_noise: DEFAULT_PROCESS_NOISE,
            initial_estimate: InitialEstimate::default(),
        }
    }
}

impl FilterConstants {
    /// Set the initial error estimate
    pub fn with_initial_error(mut self, error: f32) -> Self {
        self.initial_error_estimate = error;
        self
    }

    /// Set the process noise
    pub fn with_process_noise(mut self, noise: f32) -> Self {
        self.process_noise = noise;
        self
    }

    /// Set how the estimate is seeded
    pub fn with_initial_estimate(mut self, initial: InitialEstimate) -> Self {
        self.initial_estimate = initial;
        self
    }

    /// Check every constant
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.initial_error_estimate.is_finite() || self.initial_error_estimate < 0.0 {
            return Err(ConfigError::InvalidInitialError(self.initial_error_estimate));
        }
        check_noise("process noise", self.process_noise)?;
        if let InitialEstimate::Seed(seed) = self.initial_estimate {
            if !seed.is_finite() {
                return Err(ConfigError::InvalidNoise { name: "seed", value: seed });
            }
        }
        Ok(())
    }
}

/// Per-quantity publisher settings
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    /// Destination topic
    pub topic: Topic,
    /// Ask the broker to keep the last value for late subscribers
    pub retained: bool,
    /// Measurement noise (R); smaller trusts raw readings more
    pub measurement_noise: f32,
    /// Transmit once per this many measurements
    pub send_every_n: u32,
    /// Decimals in the textual payload
    pub precision: u8,
}

impl PublisherConfig {
    /// Build and validate a config. Retained defaults to `true`.
    pub fn new(topic: &str, measurement_noise: f32, send_every_n: u32) -> ConfigResult<Self> {
        let config = Self {
            topic: topic_from(topic)?,
            retained: true,
            measurement_noise,
            send_every_n,
            precision: DEFAULT_PRECISION,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the retained flag
    pub fn with_retained(mut self, retained: bool) -> Self {
        self.retained = retained;
        self
    }

    /// Set payload precision (0..=6 decimals)
    pub fn with_precision(mut self, precision: u8) -> ConfigResult<Self> {
        if precision > MAX_PRECISION {
            return Err(ConfigError::InvalidPrecision(precision));
        }
        self.precision = precision;
        Ok(self)
    }

    /// Check every field
    pub fn validate(&self) -> ConfigResult<()> {
        if self.topic.is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if self.send_every_n == 0 {
            return Err(ConfigError::ZeroSendInterval);
        }
        if self.precision > MAX_PRECISION {
            return Err(ConfigError::InvalidPrecision(self.precision));
        }
        check_noise("measurement noise", self.measurement_noise)
    }
}

/// Copy `topic` into a fixed-capacity buffer
pub fn topic_from(topic: &str) -> ConfigResult<Topic> {
    if topic.is_empty() {
        return Err(ConfigError::EmptyTopic);
    }
    let mut out = Topic::new();
    out.push_str(topic).map_err(|_| ConfigError::TopicTooLong {
        len: topic.len(),
        max: TOPIC_CAPACITY,
    })?;
    Ok(out)
}

/// Join `base` and `suffix` into one topic
pub fn join_topic(base: &str, suffix: &str) -> ConfigResult<Topic> {
    let mut out = topic_from(base)?;
    out.push_str(suffix).map_err(|_| ConfigError::TopicTooLong {
        len: base.len() + suffix.len(),
        max: TOPIC_CAPACITY,
    })?;
    Ok(out)
}

fn check_noise(name: &'static str, value: f32) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidNoise { name, value })
    }
}
