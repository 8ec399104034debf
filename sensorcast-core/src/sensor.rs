//! Sensor-side traits
//!
//! The agent samples two kinds of sources on every tick:
//!
//! - a [`ClimateSensor`] yielding temperature and humidity together (one bus
//!   transaction on DHT-style parts), which either succeeds or fails as a
//!   whole
//! - a [`LinkMonitor`] yielding the uplink signal strength, absent while the
//!   radio is not associated
//!
//! Readings that fail, or that succeed with a non-finite value, are dropped
//! before they reach an estimator.

use crate::errors::SensorError;

/// One successful climate sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
}

/// Temperature/humidity source
pub trait ClimateSensor {
    /// Take one sample
    fn read(&mut self) -> Result<ClimateReading, SensorError>;

    /// Human-readable part name for the startup banner
    fn model(&self) -> &str {
        "unknown"
    }
}

/// Uplink signal strength source
pub trait LinkMonitor {
    /// Signal strength in dBm, `None` while not associated
    fn rssi(&mut self) -> Option<f32>;
}

impl<S: ClimateSensor + ?Sized> ClimateSensor for &mut S {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        (**self).read()
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

impl<L: LinkMonitor + ?Sized> LinkMonitor for &mut L {
    fn rssi(&mut self) -> Option<f32> {
        (**self).rssi()
    }
}

/// Link monitor for devices without a radio
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLink;

impl LinkMonitor for NoLink {
    fn rssi(&mut self) -> Option<f32> {
        None
    }
}

/// Trait for values that can be fed to an estimator
pub trait Validatable {
    /// Check the value is a usable number (not NaN, infinite, etc)
    fn is_valid(&self) -> bool;
}

impl Validatable for f32 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

impl Validatable for ClimateReading {
    fn is_valid(&self) -> bool {
        self.temperature.is_valid() && self.humidity.is_valid()
    }
}

/// Read `sensor` and reject non-finite successes
pub fn read_validated<S: ClimateSensor + ?Sized>(
    sensor: &mut S,
) -> Result<ClimateReading, SensorError> {
    let reading = sensor.read()?;
    if reading.is_valid() {
        Ok(reading)
    } else {
        Err(SensorError::NotFinite)
    }
}
