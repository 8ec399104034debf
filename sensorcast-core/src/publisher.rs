//! Throttled Publisher
//!
//! Pairs an [`Estimator`] with a send-every-N gate. Every measurement goes
//! through the filter, so smoothing quality does not depend on how often
//! values are transmitted; only every `send_every_n`-th estimate is handed to
//! the transport.
//!
//! ## State Machine
//!
//! ```text
//!            add_measurement              add_measurement (count reaches N)
//!   ┌─────┐ ───────────────→ ┌─────┐ ··· ┌───────┐ ────────────────────┐
//!   │  0  │                  │  1  │     │  N-1  │                     │
//!   └─────┘ ←──────────────────────────────────────── publish, count = 0
//!      ↑
//!      └── restart() from any state (also resets filter confidence)
//! ```
//!
//! A failed publish is not retried: the count resets exactly as if the send
//! had gone through, and the next transmission happens N measurements later.
//!
//! ## Usage Example
//!
//! ```rust
//! use sensorcast_core::{FilterConstants, PublisherConfig, ThrottledPublisher};
//! use sensorcast_core::testing::RecordingTransport;
//!
//! let transport = RecordingTransport::connected();
//! let config = PublisherConfig::new("bed/status/temp", 0.2, 3)?;
//! let mut temp = ThrottledPublisher::new(&transport, config, FilterConstants::default())?;
//!
//! temp.add_measurement(21.0);
//! temp.add_measurement(21.2);
//! assert!(transport.published().is_empty());
//!
//! temp.add_measurement(21.1);
//! assert_eq!(transport.published().len(), 1);
//! # Ok::<(), sensorcast_core::ConfigError>(())
//! ```

use crate::config::{FilterConstants, PublisherConfig};
use crate::errors::ConfigResult;
use crate::estimator::Estimator;
use crate::transport::{format_value, Transport};

/// Estimator plus send-every-N transmission gate
#[derive(Debug)]
pub struct ThrottledPublisher<T> {
    transport: T,
    config: PublisherConfig,
    estimator: Estimator,
    /// Error estimate restored by `restart`
    initial_error: f32,
    /// Measurements since the last transmission
    current_count: u32,
}

impl<T: Transport> ThrottledPublisher<T> {
    /// Build a publisher for one quantity
    pub fn new(
        transport: T,
        config: PublisherConfig,
        constants: FilterConstants,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let estimator = Estimator::new(config.measurement_noise, constants)?;

        Ok(Self {
            transport,
            config,
            estimator,
            initial_error: constants.initial_error_estimate,
            current_count: 0,
        })
    }

    /// Smooth `raw` and transmit the result if this is the Nth call.
    ///
    /// Always returns the fresh estimate, transmitted or not.
    pub fn add_measurement(&mut self, raw: f32) -> f32 {
        let estimate = self.estimator.update(raw);

        self.current_count += 1;
        if self.current_count >= self.config.send_every_n {
            self.current_count = 0;
            self.transmit(estimate);
        }

        estimate
    }

    /// Restart the cadence and make the filter trust new readings again.
    ///
    /// The current estimate is kept.
    pub fn restart(&mut self) {
        self.current_count = 0;
        self.estimator.reset_uncertainty(self.initial_error);
    }

    fn transmit(&self, estimate: f32) {
        let Some(payload) = format_value(estimate, self.config.precision) else {
            log_warn!("{}: estimate {} does not fit a payload", self.config.topic, estimate);
            return;
        };

        match self.transport.publish(&self.config.topic, &payload, self.config.retained) {
            Ok(()) => log_debug!("{} <- {}", self.config.topic, payload),
            Err(_e) => log_debug!("{}: publish dropped: {:?}", self.config.topic, _e),
        }
    }

    /// Latest smoothed value
    pub fn estimate(&self) -> f32 {
        self.estimator.estimate()
    }

    /// Measurements since the last transmission
    pub fn current_count(&self) -> u32 {
        self.current_count
    }

    /// Measurements left until the next transmission
    pub fn remaining(&self) -> u32 {
        self.config.send_every_n - self.current_count
    }

    /// The owned filter
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Construction-time settings
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Injected transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
