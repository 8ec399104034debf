//! One sampling step of a reporting device
//!
//! [`ReportingAgent::tick`] is what the scheduling loop calls whenever the
//! [`MeasureSchedule`](crate::MeasureSchedule) says a sample is due:
//!
//! ```text
//!  transport down? ──→ status := Offline
//!        │
//!  read climate sensor ──→ announce status change (Healthy / SensorFault)
//!        │
//!  ok ──→ temperature publisher, humidity publisher
//!  err ─→ log, drop
//!        │
//!  link has RSSI? ──→ rssi publisher
//! ```
//!
//! Everything runs synchronously on the caller's thread. The transport is
//! borrowed, shared by every publisher and by the status reporter.

use crate::config::{join_topic, Topic};
use crate::errors::{ConfigResult, SensorError};
use crate::registry::{PublisherSet, Quantity};
use crate::sensor::{read_validated, ClimateSensor, LinkMonitor, Validatable};
use crate::status::{LinkStatus, StatusReporter};
use crate::transport::{format_value, Transport};

/// Raw value and the estimate it produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Value as read from the sensor
    pub raw: f32,
    /// Estimate after folding in `raw`
    pub smoothed: f32,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    /// Temperature sample, if the climate read succeeded
    pub temperature: Option<Sample>,
    /// Humidity sample, if the climate read succeeded
    pub humidity: Option<Sample>,
    /// Signal strength sample, if the link reported one
    pub rssi: Option<Sample>,
    /// Why the climate read was dropped
    pub sensor_error: Option<SensorError>,
    /// Status announced this tick
    pub announced: Option<LinkStatus>,
    /// Publishers were restarted after a reconnect
    pub restarted: bool,
}

/// Couples a sensor, a link monitor and per-quantity publishers
pub struct ReportingAgent<'a, T: Transport, S, L> {
    transport: &'a T,
    sensor: S,
    link: L,
    publishers: PublisherSet<&'a T>,
    status: StatusReporter,
    /// Prefix for raw/smoothed mirror topics, when mirroring
    mirror_base: Option<Topic>,
    mirror_retained: bool,
    restart_on_reconnect: bool,
    was_connected: bool,
    /// A session existed at some earlier tick
    ever_connected: bool,
}

impl<'a, T, S, L> ReportingAgent<'a, T, S, L>
where
    T: Transport,
    S: ClimateSensor,
    L: LinkMonitor,
{
    /// Agent without mirroring or restart on reconnect
    ///
    /// Quantities without a publisher are read but left out of the report:
    ///
    /// ```rust
    /// use sensorcast_core::testing::{FixedLink, RecordingTransport, ScriptedSensor};
    /// use sensorcast_core::{
    ///     FilterConstants, PublisherConfig, PublisherSet, Quantity, ReportingAgent,
    ///     StatusReporter, ThrottledPublisher,
    /// };
    ///
    /// let transport = RecordingTransport::connected();
    /// let config = PublisherConfig::new("bed/status/temp", 0.2, 1).unwrap();
    /// let defaults = FilterConstants::default();
    /// let mut publishers = PublisherSet::new();
    /// publishers.insert(
    ///     Quantity::Temperature,
    ///     ThrottledPublisher::new(&transport, config, defaults).unwrap(),
    /// );
    ///
    /// let mut agent = ReportingAgent::new(
    ///     &transport,
    ///     ScriptedSensor::steady(21.0, 40.0, 1),
    ///     FixedLink::new(Some(-55.0)),
    ///     publishers,
    ///     StatusReporter::new("bed/connected", true).unwrap(),
    /// );
    ///
    /// let report = agent.tick();
    /// let temperature = report.temperature.unwrap();
    /// assert_eq!(temperature.raw, 21.0);
    /// assert!(temperature.smoothed < temperature.raw);
    /// assert!(report.humidity.is_none());
    /// assert!(report.rssi.is_none());
    /// assert_eq!(transport.payloads_for("bed/status/temp").len(), 1);
    /// ```
    pub fn new(
        transport: &'a T,
        sensor: S,
        link: L,
        publishers: PublisherSet<&'a T>,
        status: StatusReporter,
    ) -> Self {
        Self {
            transport,
            sensor,
            link,
            publishers,
            status,
            mirror_base: None,
            mirror_retained: false,
            restart_on_reconnect: false,
            was_connected: false,
            ever_connected: false,
        }
    }

    /// Also publish every raw reading to `<base>orig/<q>` and every estimate
    /// to `<base>avg/<q>`
    pub fn with_mirroring(mut self, base: &str, retained: bool) -> ConfigResult<Self> {
        self.mirror_base = Some(join_topic(base, "")?);
        self.mirror_retained = retained;
        Ok(self)
    }

    /// Restart every publisher when the transport comes back after an outage.
    ///
    /// The first session of a transport that starts out offline is not a
    /// reconnect and leaves the publishers alone.
    pub fn with_restart_on_reconnect(mut self, enabled: bool) -> Self {
        self.restart_on_reconnect = enabled;
        self
    }

    /// Take one sample of everything and feed the publishers
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let connected = self.transport.is_connected();
        if connected && !self.was_connected {
            if self.ever_connected && self.restart_on_reconnect {
                log_info!("transport reconnected, restarting publishers");
                self.publishers.restart_all();
                report.restarted = true;
            }
            self.ever_connected = true;
        }
        self.was_connected = connected;
        self.status.observe_connectivity(self.transport);

        let reading = read_validated(&mut self.sensor);
        report.announced = self.status.report(self.transport, reading.is_ok());

        match reading {
            Ok(climate) => {
                report.temperature = self.feed(Quantity::Temperature, climate.temperature);
                if let Some(_s) = report.temperature {
                    log_info!(
                        "Temperature in Celsius: {:5.1} Average: {:6.2}",
                        _s.raw, _s.smoothed
                    );
                }
                report.humidity = self.feed(Quantity::Humidity, climate.humidity);
                if let Some(_s) = report.humidity {
                    log_info!(
                        "Humidity    in Percent: {:5.1} Average: {:6.2}",
                        _s.raw, _s.smoothed
                    );
                }
            }
            Err(e) => {
                log_warn!("Failed to read from sensor! {}", e);
                report.sensor_error = Some(e);
            }
        }

        if let Some(rssi) = self.link.rssi().filter(|r| r.is_valid()) {
            report.rssi = self.feed(Quantity::Rssi, rssi);
            if let Some(_s) = report.rssi {
                log_info!("RSSI        in     dBm: {:5.0} Average: {:6.2}", _s.raw, _s.smoothed);
            }
        }

        report
    }

    fn feed(&mut self, quantity: Quantity, raw: f32) -> Option<Sample> {
        let smoothed = self.publishers.add_measurement(quantity, raw)?;
        self.mirror(quantity, raw, smoothed);
        Some(Sample { raw, smoothed })
    }

    fn mirror(&self, quantity: Quantity, raw: f32, smoothed: f32) {
        let Some(base) = &self.mirror_base else {
            return;
        };

        for (kind, value) in [("orig/", raw), ("avg/", smoothed)] {
            let topic =
                join_topic(base, kind).and_then(|t| join_topic(&t, quantity.topic_suffix()));
            let (Ok(topic), Some(payload)) = (topic, format_value(value, 2)) else {
                log_warn!("cannot build mirror message for {}", quantity);
                continue;
            };
            if let Err(_e) = self.transport.publish(&topic, &payload, self.mirror_retained) {
                log_debug!("{}: mirror publish dropped: {:?}", topic, _e);
            }
        }
    }

    /// Restart every publisher now
    pub fn restart(&mut self) {
        self.publishers.restart_all();
    }

    /// Registered publishers
    pub fn publishers(&self) -> &PublisherSet<&'a T> {
        &self.publishers
    }

    /// Status reporter
    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    /// Climate sensor
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Mutable climate sensor
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Link monitor
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterConstants, PublisherConfig};
    use crate::publisher::ThrottledPublisher;
    use crate::sensor::ClimateReading;
    use crate::testing::{FixedLink, RecordingTransport, ScriptedSensor};

    fn publishers(transport: &RecordingTransport, n: u32) -> PublisherSet<&RecordingTransport> {
        let mut set = PublisherSet::new();
        let noise = [
            (Quantity::Temperature, 0.2),
            (Quantity::Humidity, 2.0),
            (Quantity::Rssi, 10.0),
        ];
        for (q, r) in noise {
            let topic = format!("dev/status/{}", q);
            let config = PublisherConfig::new(&topic, r, n).unwrap();
            let publisher =
                ThrottledPublisher::new(transport, config, FilterConstants::default()).unwrap();
            set.insert(q, publisher);
        }
        set
    }

    fn reporter() -> StatusReporter {
        StatusReporter::new("dev/connected", true).unwrap()
    }

    #[test]
    fn healthy_tick_feeds_everything() {
        let transport = RecordingTransport::connected();
        let link = FixedLink::new(Some(-61.0));
        let mut agent = ReportingAgent::new(
            &transport,
            ScriptedSensor::steady(21.0, 45.0, 1),
            &link,
            publishers(&transport, 1),
            reporter(),
        );

        let report = agent.tick();
        assert_eq!(report.announced, Some(LinkStatus::Healthy));
        assert_eq!(report.temperature.unwrap().raw, 21.0);
        assert_eq!(report.humidity.unwrap().raw, 45.0);
        assert_eq!(report.rssi.unwrap().raw, -61.0);
        assert!(report.sensor_error.is_none());

        let topics: Vec<_> = transport.published().into_iter().map(|p| p.topic).collect();
        assert_eq!(
            topics,
            vec!["dev/connected", "dev/status/temp", "dev/status/hum", "dev/status/rssi"]
        );
    }

    #[test]
    fn failed_read_skips_climate_but_not_rssi() {
        let transport = RecordingTransport::connected();
        let mut agent = ReportingAgent::new(
            &transport,
            ScriptedSensor::new([Err(SensorError::Checksum)]),
            FixedLink::new(Some(-70.0)),
            publishers(&transport, 1),
            reporter(),
        );

        let report = agent.tick();
        assert_eq!(report.sensor_error, Some(SensorError::Checksum));
        assert_eq!(report.announced, Some(LinkStatus::SensorFault));
        assert!(report.temperature.is_none());
        assert!(report.rssi.is_some());
        assert_eq!(agent.publishers().get(Quantity::Temperature).unwrap().estimate(), 0.0);
        assert!(transport.payloads_for("dev/status/temp").is_empty());
    }

    #[test]
    fn nan_reading_is_a_failed_read() {
        let transport = RecordingTransport::connected();
        let mut agent = ReportingAgent::new(
            &transport,
            ScriptedSensor::new([Ok(ClimateReading { temperature: f32::NAN, humidity: 50.0 })]),
            FixedLink::new(None),
            publishers(&transport, 1),
            reporter(),
        );

        let report = agent.tick();
        assert_eq!(report.sensor_error, Some(SensorError::NotFinite));
        assert!(report.humidity.is_none());
    }

    #[test]
    fn mirroring_publishes_raw_and_smoothed() {
        let transport = RecordingTransport::connected();
        let mut agent = ReportingAgent::new(
            &transport,
            ScriptedSensor::steady(20.0, 40.0, 1),
            FixedLink::new(None),
            publishers(&transport, 100),
            reporter(),
        )
        .with_mirroring("dev/status/", true)
        .unwrap();

        let report = agent.tick();
        assert_eq!(transport.payloads_for("dev/status/orig/temp"), vec!["20.00"]);
        assert_eq!(
            transport.payloads_for("dev/status/avg/hum"),
            vec![format!("{:.2}", report.humidity.unwrap().smoothed)]
        );
    }

    #[test]
    fn reconnect_restarts_publishers_when_enabled() {
        let transport = RecordingTransport::connected();
        let mut agent = ReportingAgent::new(
            &transport,
            ScriptedSensor::steady(20.0, 40.0, 3),
            FixedLink::new(None),
            publishers(&transport, 10),
            reporter(),
        )
        .with_restart_on_reconnect(true);

        agent.tick();
        assert_eq!(agent.publishers().get(Quantity::Temperature).unwrap().current_count(), 1);

        transport.set_connected(false);
        let offline = agent.tick();
        assert!(!offline.restarted);
        assert_eq!(agent.status().current(), LinkStatus::Offline);

        transport.set_connected(true);
        let back = agent.tick();
        assert!(back.restarted);
        assert_eq!(back.announced, Some(LinkStatus::Healthy));
        assert_eq!(agent.publishers().get(Quantity::Temperature).unwrap().current_count(), 1);
    }

    #[test]
    fn first_connect_is_not_a_reconnect() {
        let transport = RecordingTransport::disconnected();
        let mut agent = ReportingAgent::new(
            &transport,
            ScriptedSensor::steady(20.0, 40.0, 4),
            FixedLink::new(None),
            publishers(&transport, 10),
            reporter(),
        )
        .with_restart_on_reconnect(true);

        assert!(!agent.tick().restarted);
        transport.set_connected(true);
        let first_session = agent.tick();
        assert!(!first_session.restarted);
        assert_eq!(first_session.announced, Some(LinkStatus::Healthy));
        assert_eq!(agent.publishers().get(Quantity::Temperature).unwrap().current_count(), 2);

        transport.set_connected(false);
        agent.tick();
        transport.set_connected(true);
        assert!(agent.tick().restarted);
    }
}
