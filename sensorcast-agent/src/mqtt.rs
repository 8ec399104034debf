//! MQTT transport on `rumqttc`
//!
//! The sampling loop is synchronous, so publishing must never wait on the
//! network. [`MqttTransport`] hands messages to the client's request queue
//! with `try_publish`; the [`MqttEventLoop`] task drains that queue, keeps
//! the session alive and reconnects after errors.
//!
//! ```text
//!  sampling loop ── try_publish ──→ request queue ──→ MqttEventLoop ──→ broker
//!        ↑                                                  │
//!        └──────────── connected flag ←── ConnAck / error ──┘
//! ```
//!
//! On every connection acknowledgement the agent version is published to
//! `<client>/git-version`. The broker publishes the last will (`0` on
//! `<client>/connected`) when the session dies without a clean disconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, ConnectionError, Event, EventLoop, LastWill,
    MqttOptions, Packet, QoS,
};
use sensorcast_core::{LinkStatus, Transport};
use thiserror::Error;

use crate::config::AgentConfig;
use crate::ConnectionStats;

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// No session with the broker; the message was dropped
    #[error("Not connected to broker")]
    NotConnected,

    /// Request queue full or client shut down
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// MQTT configuration
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
    pub keep_alive: Duration,
    pub qos: QoS,
    /// Topic, payload and retained flag of the last will
    pub last_will: Option<(String, String, bool)>,
    /// Topic, payload and retained flag published on every connect
    pub announce: Option<(String, String, bool)>,
    pub reconnect_delay: Duration,
    pub queue_capacity: usize,
}

impl MqttConfig {
    /// Create new configuration for a broker
    pub fn new(client_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            client_id: client_id.into(),
            host: host.into(),
            port,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            qos: QoS::AtMostOnce,
            last_will: None,
            announce: None,
            reconnect_delay: Duration::from_secs(5),
            queue_capacity: 64,
        }
    }

    /// Build from the agent configuration, including last will and version topic
    pub fn from_agent(config: &AgentConfig) -> Result<Self, MqttError> {
        let broker = &config.broker;
        let connected = config
            .topic("connected")
            .map_err(|e| MqttError::Config(e.to_string()))?;
        let version = config
            .topic("git-version")
            .map_err(|e| MqttError::Config(e.to_string()))?;

        let mut mqtt = Self::new(config.client_name.clone(), broker.host.clone(), broker.port)
            .keep_alive_secs(broker.keep_alive_secs)
            .reconnect_delay_ms(broker.reconnect_delay_ms)
            .queue_capacity(broker.queue_capacity)
            .last_will(connected.as_str(), LinkStatus::Offline.as_payload(), config.retained)
            .announce(version.as_str(), env!("CARGO_PKG_VERSION"), config.retained);

        match (&broker.username, &broker.password) {
            (Some(user), password) => {
                mqtt = mqtt.credentials(user.clone(), password.clone().unwrap_or_default());
            }
            (None, Some(_)) => {
                return Err(MqttError::Config("broker password given without username".into()));
            }
            (None, None) => {}
        }
        Ok(mqtt)
    }

    /// Set username and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Set keep-alive interval in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    /// Set delivery guarantee for every message
    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Message the broker publishes when the session dies
    pub fn last_will(
        mut self,
        topic: impl Into<String>,
        payload: impl Into<String>,
        retained: bool,
    ) -> Self {
        self.last_will = Some((topic.into(), payload.into(), retained));
        self
    }

    /// Message published after every successful connect
    pub fn announce(
        mut self,
        topic: impl Into<String>,
        payload: impl Into<String>,
        retained: bool,
    ) -> Self {
        self.announce = Some((topic.into(), payload.into(), retained));
        self
    }

    /// Pause between a connection error and the next attempt
    pub fn reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect_delay = Duration::from_millis(ms);
        self
    }

    /// Outgoing requests the client may queue
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    fn options(&self) -> Result<MqttOptions, MqttError> {
        if self.client_id.is_empty() {
            return Err(MqttError::Config("client id must not be empty".into()));
        }
        if self.keep_alive < Duration::from_secs(1) {
            return Err(MqttError::Config("keep-alive must be at least one second".into()));
        }

        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        if let Some((user, password)) = &self.credentials {
            options.set_credentials(user, password);
        }
        if let Some((topic, payload, retained)) = &self.last_will {
            let will = LastWill::new(topic, payload.as_bytes().to_vec(), self.qos, *retained);
            options.set_last_will(will);
        }
        Ok(options)
    }
}

/// State shared between the transport and its event loop
#[derive(Debug, Default)]
struct Shared {
    connected: AtomicBool,
    ever_connected: AtomicBool,
    stats: Mutex<ConnectionStats>,
}

impl Shared {
    fn stats(&self) -> MutexGuard<'_, ConnectionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Non-blocking publisher for the sampling loop
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    qos: QoS,
    shared: Arc<Shared>,
}

impl MqttTransport {
    /// Create the client and the event loop that must be driven for it to
    /// connect. Nothing touches the network until the loop is polled.
    pub fn new(config: MqttConfig) -> Result<(Self, MqttEventLoop), MqttError> {
        let options = config.options()?;
        let (client, eventloop) = AsyncClient::new(options, config.queue_capacity.max(1));
        let shared = Arc::new(Shared::default());

        let transport = Self {
            client: client.clone(),
            qos: config.qos,
            shared: shared.clone(),
        };
        let eventloop = MqttEventLoop {
            eventloop,
            client,
            qos: config.qos,
            announce: config.announce,
            reconnect_delay: config.reconnect_delay,
            shared,
        };
        Ok((transport, eventloop))
    }

    /// Snapshot of the statistics
    pub fn stats(&self) -> ConnectionStats {
        self.shared.stats().clone()
    }

    /// Queue a disconnect; the broker will not publish the last will
    pub fn disconnect(&self) -> Result<(), MqttError> {
        self.shared.connected.store(false, Ordering::Release);
        self.client.try_disconnect()?;
        Ok(())
    }
}

impl Transport for MqttTransport {
    type Error = MqttError;

    fn publish(&self, topic: &str, payload: &str, retained: bool) -> Result<(), Self::Error> {
        if !self.is_connected() {
            self.shared.stats().record_failure(MqttError::NotConnected);
            return Err(MqttError::NotConnected);
        }

        match self.client.try_publish(topic, self.qos, retained, payload.as_bytes().to_vec()) {
            Ok(()) => {
                self.shared.stats().record_sent(payload.len());
                Ok(())
            }
            Err(e) => {
                self.shared.stats().record_failure(&e);
                Err(e.into())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }
}

/// Drives the MQTT session; run it as its own task
pub struct MqttEventLoop {
    eventloop: EventLoop,
    client: AsyncClient,
    qos: QoS,
    announce: Option<(String, String, bool)>,
    reconnect_delay: Duration,
    shared: Arc<Shared>,
}

impl MqttEventLoop {
    /// Poll forever, reconnecting after a fixed delay on errors
    pub async fn run(mut self) {
        loop {
            match self.eventloop.poll().await {
                Ok(event) => self.handle_event(&event),
                Err(e) => {
                    self.handle_error(&e);
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                self.on_connected();
            }
            Event::Incoming(Packet::ConnAck(ack)) => {
                warn!("Broker refused connection: {:?}", ack.code);
                self.shared.connected.store(false, Ordering::Release);
                self.shared.stats().last_error = Some(format!("{:?}", ack.code));
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Broker closed the session");
                self.shared.connected.store(false, Ordering::Release);
            }
            other => debug!("mqtt event: {:?}", other),
        }
    }

    fn handle_error(&mut self, error: &ConnectionError) {
        if self.shared.connected.swap(false, Ordering::AcqRel) {
            warn!("Connection to broker lost: {}", error);
        } else {
            debug!("Connection attempt failed: {}", error);
        }
        self.shared.stats().last_error = Some(error.to_string());
    }

    fn on_connected(&mut self) {
        if self.shared.ever_connected.swap(true, Ordering::AcqRel) {
            self.shared.stats().reconnections += 1;
            info!("Reconnected to broker");
        } else {
            info!("Connected to broker");
        }
        self.shared.connected.store(true, Ordering::Release);

        if let Some((topic, payload, retained)) = &self.announce {
            let sent = self
                .client
                .try_publish(topic.as_str(), self.qos, *retained, payload.as_bytes().to_vec());
            match sent {
                Ok(()) => self.shared.stats().record_sent(payload.len()),
                Err(e) => {
                    warn!("Cannot announce on {}: {}", topic, e);
                    self.shared.stats().record_failure(&e);
                }
            }
        }
    }
}
