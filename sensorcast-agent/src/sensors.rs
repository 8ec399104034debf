//! Sensor drivers for Linux boards
//!
//! - [`IioClimateSensor`]: DHT11/DHT22 through the kernel IIO driver, which
//!   exposes temperature and humidity in milli-units under sysfs
//! - [`WirelessLink`]: signal level of a wireless interface from
//!   `/proc/net/wireless`
//! - [`SimulatedClimate`]: random walk for running without hardware

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensorcast_core::{ClimateReading, ClimateSensor, LinkMonitor, SensorError};

const TEMPERATURE_FILE: &str = "in_temp_input";
const HUMIDITY_FILE: &str = "in_humidityrelative_input";

/// Climate sensor behind a Linux IIO device directory
#[derive(Debug, Clone)]
pub struct IioClimateSensor {
    device: PathBuf,
}

impl IioClimateSensor {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self { device: device.into() }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    fn read_channel(&self, file: &str) -> Result<f32, SensorError> {
        let text = fs::read_to_string(self.device.join(file)).map_err(|e| {
            debug!("{}: {}", self.device.join(file).display(), e);
            io_to_sensor_error(&e)
        })?;
        parse_milli(&text)
    }
}

impl ClimateSensor for IioClimateSensor {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        Ok(ClimateReading {
            temperature: self.read_channel(TEMPERATURE_FILE)?,
            humidity: self.read_channel(HUMIDITY_FILE)?,
        })
    }

    fn model(&self) -> &str {
        "iio-dht"
    }
}

fn io_to_sensor_error(err: &io::Error) -> SensorError {
    match err.kind() {
        io::ErrorKind::TimedOut => SensorError::Timeout,
        io::ErrorKind::NotFound => SensorError::Io("device not found"),
        _ => SensorError::Io("sysfs read failed"),
    }
}

/// Parse a sysfs milli-unit integer, e.g. `"21300\n"` → `21.3`
pub fn parse_milli(text: &str) -> Result<f32, SensorError> {
    let milli: i64 = text
        .trim()
        .parse()
        .map_err(|_| SensorError::Io("malformed sysfs value"))?;
    Ok(milli as f32 / 1000.0)
}

/// Signal level of one wireless interface
#[derive(Debug, Clone)]
pub struct WirelessLink {
    interface: String,
    source: PathBuf,
}

impl WirelessLink {
    pub fn new(interface: impl Into<String>) -> Self {
        Self::with_source(interface, "/proc/net/wireless")
    }

    /// Read the statistics table from `source` instead of procfs
    pub fn with_source(interface: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            interface: interface.into(),
            source: source.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl LinkMonitor for WirelessLink {
    fn rssi(&mut self) -> Option<f32> {
        let table = fs::read_to_string(&self.source).ok()?;
        parse_wireless_level(&table, &self.interface)
    }
}

/// Signal level in dBm of `interface` from a `/proc/net/wireless` table.
///
/// Missing interfaces (not associated, or no such device) yield `None`.
pub fn parse_wireless_level(table: &str, interface: &str) -> Option<f32> {
    table.lines().skip(2).find_map(|line| {
        let (name, stats) = line.split_once(':')?;
        if name.trim() != interface {
            return None;
        }
        // status, link quality, signal level, noise, ...
        let level = stats.split_whitespace().nth(2)?;
        level.trim_end_matches('.').parse::<f32>().ok()
    })
}

/// Random-walk climate source
#[derive(Debug)]
pub struct SimulatedClimate {
    rng: StdRng,
    temperature: f32,
    humidity: f32,
    failure_rate: f64,
}

impl SimulatedClimate {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible sequence
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            temperature: 21.0,
            humidity: 45.0,
            failure_rate: 0.0,
        }
    }

    /// Fraction of reads that time out, clamped to `0..=1`
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }
}

impl Default for SimulatedClimate {
    fn default() -> Self {
        Self::new()
    }
}

impl ClimateSensor for SimulatedClimate {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        if self.rng.gen_bool(self.failure_rate) {
            return Err(SensorError::Timeout);
        }

        self.temperature = (self.temperature + self.rng.gen_range(-0.3..0.3)).clamp(-20.0, 50.0);
        self.humidity = (self.humidity + self.rng.gen_range(-1.0..1.0)).clamp(0.0, 100.0);

        // Sensor resolution is 0.1
        let noise_t: f32 = self.rng.gen_range(-0.2..0.2);
        let noise_h: f32 = self.rng.gen_range(-1.5..1.5);
        Ok(ClimateReading {
            temperature: ((self.temperature + noise_t) * 10.0).round() / 10.0,
            humidity: ((self.humidity + noise_h).clamp(0.0, 100.0) * 10.0).round() / 10.0,
        })
    }

    fn model(&self) -> &str {
        "simulated"
    }
}
