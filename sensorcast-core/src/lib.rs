//! Core smoothing and throttling engine for SensorCast
//!
//! Turns noisy periodic sensor readings into smoothed values and decides
//! which of them are worth transmitting. Designed for edge devices with
//! limited resources.
//!
//! Key constraints:
//! - No heap allocation (fixed-capacity topics and payloads)
//! - O(1) work per measurement
//! - Transport, sensors and clock are injected traits
//!
//! ```no_run
//! use sensorcast_core::{FilterConstants, PublisherConfig, ThrottledPublisher};
//! use sensorcast_core::testing::RecordingTransport;
//!
//! let transport = RecordingTransport::connected();
//! let config = PublisherConfig::new("bed/status/temp", 0.2, 24)?;
//! let mut temp = ThrottledPublisher::new(&transport, config, FilterConstants::default())?;
//!
//! // Every sample is smoothed, every 24th estimate is sent
//! let smoothed = temp.add_measurement(21.3);
//! # let _ = smoothed;
//! # Ok::<(), sensorcast_core::ConfigError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod agent;
pub mod config;
pub mod errors;
pub mod estimator;
pub mod publisher;
pub mod registry;
pub mod sensor;
pub mod status;
#[cfg(feature = "std")]
pub mod testing;
pub mod time;
pub mod transport;

// Public API
pub use agent::{ReportingAgent, Sample, TickReport};
pub use config::{FilterConstants, InitialEstimate, PublisherConfig, Topic};
pub use errors::{ConfigError, ConfigResult, SensorError};
pub use estimator::Estimator;
pub use publisher::ThrottledPublisher;
pub use registry::{PublisherSet, Quantity};
pub use sensor::{ClimateReading, ClimateSensor, LinkMonitor, NoLink, Validatable};
pub use status::{LinkStatus, StatusReporter};
pub use time::{MeasureSchedule, ScheduleStep, TimeSource, Timestamp};
pub use transport::Transport;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
