//! Error Types for Configuration and Sensor Reads
//!
//! ## Design Philosophy
//!
//! The smoothing and throttling path itself cannot fail: every operation on
//! an [`Estimator`](crate::Estimator) or
//! [`ThrottledPublisher`](crate::ThrottledPublisher) is plain arithmetic plus
//! a fire-and-forget transport call. Errors therefore only exist at the edges:
//!
//! 1. **Construction**: a publisher or filter built with nonsense parameters
//!    (`send_every_n == 0`, negative noise) is rejected before it ever runs.
//!
//! 2. **Sensor reads**: a failed read is reported as a [`SensorError`] and
//!    dropped by the caller. It never reaches the estimator as a 0 or a NaN.
//!
//! Both enums are `Copy` and hold no heap data so they can be returned from
//! the hot path of a microcontroller loop.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use sensorcast_core::{ConfigError, PublisherConfig};
//!
//! match PublisherConfig::new("bed/status/temp", 0.2, 0) {
//!     Ok(_) => unreachable!(),
//!     Err(ConfigError::ZeroSendInterval) => {
//!         // Refuse to start: a publisher must send at least every Nth sample
//!     }
//!     Err(other) => panic!("unexpected: {other}"),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for construction-time validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Rejected configuration values
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// `send_every_n` must be at least 1
    #[error("send interval must be at least one sample")]
    ZeroSendInterval,

    /// A noise constant was zero, negative or not finite
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidNoise {
        /// Which constant was rejected
        name: &'static str,
        /// The offending value
        value: f32,
    },

    /// Initial error estimate below zero or not finite
    #[error("initial error estimate must be finite and >= 0, got {0}")]
    InvalidInitialError(f32),

    /// Topic does not fit the fixed-capacity topic buffer
    #[error("topic is {len} bytes, limit is {max}")]
    TopicTooLong {
        /// Length of the supplied topic
        len: usize,
        /// Buffer capacity
        max: usize,
    },

    /// Topic was empty
    #[error("topic must not be empty")]
    EmptyTopic,

    /// Payload precision outside the supported range
    #[error("payload precision {0} exceeds the maximum of 6 decimals")]
    InvalidPrecision(u8),

    /// Measurement interval of zero milliseconds
    #[error("measurement interval must be non-zero")]
    ZeroInterval,
}

/// Why a sensor read produced no usable value
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Sensor did not answer in time
    #[error("sensor timed out")]
    Timeout,

    /// Data arrived but failed its checksum
    #[error("checksum mismatch")]
    Checksum,

    /// Underlying bus or file could not be read
    #[error("sensor I/O failed: {0}")]
    Io(&'static str),

    /// Value parsed but is not a finite number
    #[error("sensor returned a non-finite value")]
    NotFinite,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ZeroSendInterval => defmt::write!(fmt, "send interval is zero"),
            Self::InvalidNoise { name, value } => defmt::write!(fmt, "{} invalid: {}", name, value),
            Self::InvalidInitialError(value) => {
                defmt::write!(fmt, "initial error invalid: {}", value)
            }
            Self::TopicTooLong { len, max } => defmt::write!(fmt, "topic {} > {}", len, max),
            Self::EmptyTopic => defmt::write!(fmt, "empty topic"),
            Self::InvalidPrecision(p) => defmt::write!(fmt, "precision {} > 6", p),
            Self::ZeroInterval => defmt::write!(fmt, "interval is zero"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SensorError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(fmt, "timeout"),
            Self::Checksum => defmt::write!(fmt, "checksum"),
            Self::Io(reason) => defmt::write!(fmt, "io: {}", reason),
            Self::NotFinite => defmt::write!(fmt, "not finite"),
        }
    }
}
