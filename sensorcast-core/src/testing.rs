//! Test doubles for the collaborator traits
//!
//! - [`RecordingTransport`]: records every accepted publish instead of
//!   talking to a broker; connectivity and failures are switchable
//! - [`ScriptedSensor`]: replays a fixed list of read results
//! - [`FixedLink`]: signal strength set by the test

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use crate::errors::SensorError;
use crate::sensor::{ClimateReading, ClimateSensor, LinkMonitor};
use crate::transport::Transport;

/// One message accepted by a [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Destination topic
    pub topic: String,
    /// Message body
    pub payload: String,
    /// Retained flag as requested
    pub retained: bool,
}

/// Error returned while a [`RecordingTransport`] is set to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishRejected;

impl fmt::Display for PublishRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("publish rejected")
    }
}

impl std::error::Error for PublishRejected {}

/// In-memory transport that records publishes
#[derive(Debug, Default)]
pub struct RecordingTransport {
    published: RefCell<Vec<Published>>,
    connected: Cell<bool>,
    failing: Cell<bool>,
    attempts: Cell<usize>,
}

impl RecordingTransport {
    /// Transport reporting an active session
    pub fn connected() -> Self {
        let transport = Self::default();
        transport.connected.set(true);
        transport
    }

    /// Transport reporting no session
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Change reported connectivity
    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    /// Make every publish fail (and not be recorded) until switched back
    pub fn fail_publishes(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Accepted messages, oldest first
    pub fn published(&self) -> Vec<Published> {
        self.published.borrow().clone()
    }

    /// Payloads accepted on `topic`, oldest first
    pub fn payloads_for(&self, topic: &str) -> Vec<String> {
        self.published
            .borrow()
            .iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload.clone())
            .collect()
    }

    /// Publish calls made, accepted or not
    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }

    /// Drop everything recorded so far
    pub fn clear(&self) {
        self.published.borrow_mut().clear();
        self.attempts.set(0);
    }
}

impl Transport for RecordingTransport {
    type Error = PublishRejected;

    fn publish(&self, topic: &str, payload: &str, retained: bool) -> Result<(), Self::Error> {
        self.attempts.set(self.attempts.get() + 1);
        if self.failing.get() {
            return Err(PublishRejected);
        }
        self.published.borrow_mut().push(Published {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
            retained,
        });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }
}

/// Sensor replaying scripted results; times out once the script runs dry
#[derive(Debug, Default)]
pub struct ScriptedSensor {
    script: VecDeque<Result<ClimateReading, SensorError>>,
}

impl ScriptedSensor {
    /// Sensor replaying `script` in order
    pub fn new(script: impl IntoIterator<Item = Result<ClimateReading, SensorError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Sensor returning the same reading `count` times
    pub fn steady(temperature: f32, humidity: f32, count: usize) -> Self {
        Self::new((0..count).map(|_| Ok(ClimateReading { temperature, humidity })))
    }

    /// Append one result
    pub fn push(&mut self, result: Result<ClimateReading, SensorError>) {
        self.script.push_back(result);
    }

    /// Results not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl ClimateSensor for ScriptedSensor {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.script.pop_front().unwrap_or(Err(SensorError::Timeout))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Link monitor returning whatever the test set
#[derive(Debug, Default)]
pub struct FixedLink {
    rssi: Cell<Option<f32>>,
}

impl FixedLink {
    /// Link reporting `rssi`
    pub fn new(rssi: Option<f32>) -> Self {
        Self { rssi: Cell::new(rssi) }
    }

    /// Change the reported signal strength
    pub fn set(&self, rssi: Option<f32>) {
        self.rssi.set(rssi);
    }
}

impl LinkMonitor for FixedLink {
    fn rssi(&mut self) -> Option<f32> {
        self.rssi.get()
    }
}

impl LinkMonitor for &FixedLink {
    fn rssi(&mut self) -> Option<f32> {
        self.rssi.get()
    }
}
