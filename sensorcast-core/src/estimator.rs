//! One-Dimensional Kalman Estimator
//!
//! ## Overview
//!
//! Each measured quantity (temperature, humidity, signal strength) gets its
//! own [`Estimator`]: a scalar Kalman filter with an identity state
//! transition and no control input. It turns a noisy stream of readings into
//! a smoothed estimate and tracks how much it trusts that estimate.
//!
//! ## Filter Equations
//!
//! With error estimate `P`, process noise `Q`, measurement noise `R` and
//! measurement `z`:
//!
//! ```text
//! Prediction:   P⁻ = P + Q
//! Gain:         K  = P⁻ / (P⁻ + R)
//! Estimate:     x  = x + K·(z - x)
//! Uncertainty:  P  = (1 - K)·P⁻
//! ```
//!
//! For positive `Q` and `R` the gain stays strictly inside `(0, 1)`, so the
//! new estimate always lies between the old estimate and the measurement.
//!
//! ## Steady State
//!
//! Fed long enough, `P` settles on the fixed point of the update:
//!
//! ```text
//! P = (1 - P⁻/(P⁻ + R))·P⁻   with   P⁻ = P + Q
//! ⇒ P² + Q·P - Q·R = 0
//! ⇒ P = (√(Q² + 4·Q·R) - Q) / 2
//! ```
//!
//! [`Estimator::steady_state_error`] returns this value.
//!
//! ## Usage Example
//!
//! ```rust
//! use sensorcast_core::{Estimator, FilterConstants};
//!
//! let mut filter = Estimator::new(0.2, FilterConstants::default())?;
//!
//! for raw in [21.4, 21.6, 21.5, 21.7] {
//!     let smoothed = filter.update(raw);
//!     assert!(smoothed <= 21.7);
//! }
//! # Ok::<(), sensorcast_core::ConfigError>(())
//! ```

use crate::config::{FilterConstants, InitialEstimate};
use crate::errors::{ConfigError, ConfigResult};

/// Scalar Kalman filter with a static process model
#[derive(Debug, Clone, PartialEq)]
pub struct Estimator {
    /// Last smoothed value
    current_estimate: f32,
    /// Uncertainty of `current_estimate`
    error_estimate: f32,
    /// Q
    process_noise: f32,
    /// R
    measurement_noise: f32,
    /// False until the first measurement when seeding lazily
    initialized: bool,
}

impl Estimator {
    /// Create a filter for one channel.
    ///
    /// `measurement_noise` is the per-channel sensitivity; everything else
    /// comes from the shared constants.
    pub fn new(measurement_noise: f32, constants: FilterConstants) -> ConfigResult<Self> {
        constants.validate()?;
        if !measurement_noise.is_finite() || measurement_noise <= 0.0 {
            return Err(ConfigError::InvalidNoise {
                name: "measurement noise",
                value: measurement_noise,
            });
        }

        let (current_estimate, initialized) = match constants.initial_estimate {
            InitialEstimate::Seed(seed) => (seed, true),
            InitialEstimate::FirstMeasurement => (0.0, false),
        };

        Ok(Self {
            current_estimate,
            error_estimate: constants.initial_error_estimate,
            process_noise: constants.process_noise,
            measurement_noise,
            initialized,
        })
    }

    /// Fold one measurement into the estimate and return the new estimate
    pub fn update(&mut self, measurement: f32) -> f32 {
        debug_assert!(
            measurement.is_finite(),
            "measurements must be validated before filtering, got {}",
            measurement
        );

        if !self.initialized {
            self.current_estimate = measurement;
            self.initialized = true;
        }

        let predicted_error = self.error_estimate + self.process_noise;
        let gain = predicted_error / (predicted_error + self.measurement_noise);

        self.current_estimate += gain * (measurement - self.current_estimate);
        self.error_estimate = (1.0 - gain) * predicted_error;

        self.current_estimate
    }

    /// Overwrite the error estimate, keeping the current estimate.
    ///
    /// A large value makes the next few measurements dominate again.
    pub fn reset_uncertainty(&mut self, initial_error: f32) {
        debug_assert!(initial_error >= 0.0, "error estimate must stay non-negative");
        self.error_estimate = initial_error;
    }

    /// Gain the next update would use
    pub fn next_gain(&self) -> f32 {
        let predicted_error = self.error_estimate + self.process_noise;
        predicted_error / (predicted_error + self.measurement_noise)
    }

    /// Error estimate the filter converges to under constant noise
    pub fn steady_state_error(&self) -> f32 {
        let q = self.process_noise;
        let r = self.measurement_noise;
        (libm::sqrtf(q * q + 4.0 * q * r) - q) / 2.0
    }

    /// Current smoothed value
    pub fn estimate(&self) -> f32 {
        self.current_estimate
    }

    /// Current uncertainty
    pub fn error_estimate(&self) -> f32 {
        self.error_estimate
    }

    /// Process noise (Q)
    pub fn process_noise(&self) -> f32 {
        self.process_noise
    }

    /// Measurement noise (R)
    pub fn measurement_noise(&self) -> f32 {
        self.measurement_noise
    }

    /// Whether the estimate holds a value yet
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(r: f32) -> Estimator {
        Estimator::new(r, FilterConstants::default()).unwrap()
    }

    #[test]
    fn first_update_from_seed() {
        let mut filter = Estimator::new(
            1000.0,
            FilterConstants::default().with_initial_estimate(InitialEstimate::Seed(0.0)),
        )
        .unwrap();

        // P⁻ = 1000.01, K = 1000.01 / 2000.01
        let estimate = filter.update(10.0);
        let gain = 1000.01_f32 / 2000.01;
        assert!((estimate - 10.0 * gain).abs() < 1e-4);
        assert!((filter.error_estimate() - (1.0 - gain) * 1000.01).abs() < 1e-2);
    }

    #[test]
    fn lazy_init_adopts_first_measurement() {
        let mut filter = Estimator::new(
            5.0,
            FilterConstants::default().with_initial_estimate(InitialEstimate::FirstMeasurement),
        )
        .unwrap();

        assert!(!filter.is_initialized());
        assert_eq!(filter.update(42.5), 42.5);
        assert!(filter.is_initialized());
        assert!(filter.error_estimate() < 1000.0);
    }

    #[test]
    fn never_overshoots() {
        let mut filter = seeded(0.5);
        let mut previous = filter.estimate();

        for &z in &[10.0, -3.0, 7.5, 7.5, 100.0, -50.0] {
            let estimate = filter.update(z);
            let (lo, hi) = if previous < z { (previous, z) } else { (z, previous) };
            assert!(estimate >= lo && estimate <= hi, "{estimate} outside [{lo}, {hi}]");
            previous = estimate;
        }
    }

    #[test]
    fn reset_keeps_estimate() {
        let mut filter = seeded(0.2);
        for _ in 0..50 {
            filter.update(20.0);
        }
        let before = filter.estimate();
        filter.reset_uncertainty(1000.0);

        assert_eq!(filter.estimate(), before);
        assert_eq!(filter.error_estimate(), 1000.0);
        assert_eq!(filter.process_noise(), 0.01);
        assert_eq!(filter.measurement_noise(), 0.2);
    }

    #[test]
    fn gain_drops_as_confidence_grows() {
        let mut filter = seeded(2.0);
        let first = filter.next_gain();
        for _ in 0..10 {
            filter.update(55.0);
        }
        assert!(filter.next_gain() < first);
        assert!(filter.next_gain() > 0.0);
    }

    #[test]
    fn steady_state_closed_form() {
        let filter = seeded(0.2);
        let e = filter.steady_state_error();
        let predicted = e + 0.01;
        let next = (1.0 - predicted / (predicted + 0.2)) * predicted;
        assert!((next - e).abs() < 1e-6);
    }

    #[test]
    fn rejects_invalid_measurement_noise() {
        assert!(Estimator::new(0.0, FilterConstants::default()).is_err());
        assert!(Estimator::new(-1.0, FilterConstants::default()).is_err());
        assert!(Estimator::new(f32::INFINITY, FilterConstants::default()).is_err());
    }
}
