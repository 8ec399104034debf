//! Agent configuration
//!
//! Loaded from a JSON file. Every field has a default, so an empty object
//! (or no file at all) yields a working agent that publishes as client
//! `sensorcast` to a broker on `localhost:1883`.
//!
//! ```json
//! {
//!   "client_name": "bed",
//!   "broker": { "host": "mqtt.local", "username": "sensor", "password": "secret" },
//!   "temperature": { "send_every_n": 12, "measurement_noise": 0.2 },
//!   "sensor": { "kind": "iio", "device": "/sys/bus/iio/devices/iio:device0" }
//! }
//! ```

use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Deserializer, Serialize};
use sensorcast_core::config::{join_topic, DEFAULT_PRECISION};
use sensorcast_core::{
    ConfigResult, FilterConstants, MeasureSchedule, PublisherConfig, Quantity, Topic,
};

use crate::AgentError;

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    /// Pause after an event-loop error before polling again
    pub reconnect_delay_ms: u64,
    /// Outgoing messages the client may queue
    pub queue_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            username: None,
            password: None,
            keep_alive_secs: 30,
            reconnect_delay_ms: 5_000,
            queue_capacity: 64,
        }
    }
}

/// Settings for one measured quantity
///
/// In a config file each field is optional; the ones given replace the
/// defaults of that quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelConfig {
    /// Samples per transmission
    pub send_every_n: u32,
    /// Measurement noise R of the estimator
    pub measurement_noise: f32,
    /// Decimals in the payload
    pub precision: u8,
}

impl ChannelConfig {
    /// Every 2 minutes at the default cadence
    pub const TEMPERATURE: ChannelConfig = ChannelConfig::new(12 * 2, 0.2);
    /// Every 5 minutes at the default cadence
    pub const HUMIDITY: ChannelConfig = ChannelConfig::new(12 * 5, 2.0);
    /// Every 5 minutes at the default cadence
    pub const RSSI: ChannelConfig = ChannelConfig::new(12 * 5, 10.0);

    /// Channel with the default payload precision
    pub const fn new(send_every_n: u32, measurement_noise: f32) -> Self {
        Self {
            send_every_n,
            measurement_noise,
            precision: DEFAULT_PRECISION,
        }
    }
}

/// Channel fields as written in a config file
#[derive(Debug, Deserialize)]
struct ChannelOverride {
    send_every_n: Option<u32>,
    measurement_noise: Option<f32>,
    precision: Option<u8>,
}

impl ChannelOverride {
    fn apply(self, base: ChannelConfig) -> ChannelConfig {
        ChannelConfig {
            send_every_n: self.send_every_n.unwrap_or(base.send_every_n),
            measurement_noise: self.measurement_noise.unwrap_or(base.measurement_noise),
            precision: self.precision.unwrap_or(base.precision),
        }
    }
}

fn temperature_channel<'de, D: Deserializer<'de>>(d: D) -> Result<ChannelConfig, D::Error> {
    ChannelOverride::deserialize(d).map(|o| o.apply(ChannelConfig::TEMPERATURE))
}

fn humidity_channel<'de, D: Deserializer<'de>>(d: D) -> Result<ChannelConfig, D::Error> {
    ChannelOverride::deserialize(d).map(|o| o.apply(ChannelConfig::HUMIDITY))
}

fn rssi_channel<'de, D: Deserializer<'de>>(d: D) -> Result<ChannelConfig, D::Error> {
    ChannelOverride::deserialize(d).map(|o| o.apply(ChannelConfig::RSSI))
}

/// Where climate readings come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorSource {
    /// Linux IIO device directory of a DHT11/DHT22
    Iio { device: PathBuf },
    /// Random walk, no hardware needed
    Simulated,
}

impl Default for SensorSource {
    fn default() -> Self {
        SensorSource::Iio {
            device: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// MQTT client id and first topic level
    pub client_name: String,
    /// Retained flag for every published message
    pub retained: bool,
    pub broker: BrokerConfig,
    pub measure_interval_ms: u64,
    /// Longest sleep between two services of the network
    pub poll_interval_ms: u64,
    pub filter: FilterConstants,
    #[serde(deserialize_with = "temperature_channel")]
    pub temperature: ChannelConfig,
    #[serde(deserialize_with = "humidity_channel")]
    pub humidity: ChannelConfig,
    #[serde(deserialize_with = "rssi_channel")]
    pub rssi: ChannelConfig,
    pub sensor: SensorSource,
    /// Interface whose signal level is reported; `None` disables RSSI
    pub wireless_interface: Option<String>,
    /// Publish every raw reading and estimate under `status/orig` and `status/avg`
    pub mirror_measurements: bool,
    /// Restart all publishers after a broker outage
    pub restart_on_reconnect: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            client_name: "sensorcast".into(),
            retained: true,
            broker: BrokerConfig::default(),
            // 12 samples a minute
            measure_interval_ms: 5_000,
            poll_interval_ms: 1_000,
            filter: FilterConstants::default(),
            temperature: ChannelConfig::TEMPERATURE,
            humidity: ChannelConfig::HUMIDITY,
            rssi: ChannelConfig::RSSI,
            sensor: SensorSource::default(),
            wireless_interface: Some("wlan0".into()),
            mirror_measurements: false,
            restart_on_reconnect: false,
        }
    }
}

impl AgentConfig {
    /// Parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let text = std::fs::read_to_string(path)?;
        let config: AgentConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AgentError> {
        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load(path)
            }
            None => {
                info!("No configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check everything the publishers and schedule would reject
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.client_name.is_empty() {
            return Err(AgentError::ConfigError("client_name must not be empty".into()));
        }
        if self.broker.host.is_empty() {
            return Err(AgentError::ConfigError("broker host must not be empty".into()));
        }
        self.filter.validate()?;
        self.schedule()?;
        for quantity in Quantity::ALL {
            self.publisher_config(quantity)?;
        }
        self.topic("connected")?;
        self.topic("git-version")?;
        Ok(())
    }

    /// `<client_name>/`
    pub fn base_topic(&self) -> String {
        format!("{}/", self.client_name)
    }

    /// `<client_name>/<suffix>`
    pub fn topic(&self, suffix: &str) -> ConfigResult<Topic> {
        join_topic(&self.base_topic(), suffix)
    }

    /// Prefix of all measurement topics
    pub fn status_base(&self) -> ConfigResult<Topic> {
        self.topic("status/")
    }

    pub fn channel(&self, quantity: Quantity) -> &ChannelConfig {
        match quantity {
            Quantity::Temperature => &self.temperature,
            Quantity::Humidity => &self.humidity,
            Quantity::Rssi => &self.rssi,
        }
    }

    /// Publisher settings for `quantity` on `<client>/status/<suffix>`
    pub fn publisher_config(&self, quantity: Quantity) -> ConfigResult<PublisherConfig> {
        let channel = self.channel(quantity);
        let topic = join_topic(&self.status_base()?, quantity.topic_suffix())?;
        PublisherConfig::new(&topic, channel.measurement_noise, channel.send_every_n)?
            .with_retained(self.retained)
            .with_precision(channel.precision)
    }

    pub fn schedule(&self) -> ConfigResult<MeasureSchedule> {
        MeasureSchedule::new(self.measure_interval_ms, self.poll_interval_ms)
    }
}
