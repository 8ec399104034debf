//! End-to-end tests of the sampling loop
//!
//! Drives a `ReportingAgent` from a `MeasureSchedule` on a fixed clock, the
//! same way the device binary does with a monotonic one.

mod common;

use common::publisher;
use sensorcast_core::testing::{FixedLink, RecordingTransport, ScriptedSensor};
use sensorcast_core::time::FixedTime;
use sensorcast_core::{
    ClimateReading, LinkStatus, MeasureSchedule, PublisherSet, Quantity, ReportingAgent,
    ScheduleStep, SensorError, StatusReporter, TimeSource,
};

const INTERVAL_MS: u64 = 5_000;
const POLL_MS: u64 = 1_000;

fn device_publishers(transport: &RecordingTransport) -> PublisherSet<&RecordingTransport> {
    PublisherSet::new()
        .with(Quantity::Temperature, publisher(transport, "bed/status/temp", 0.2, 24))
        .with(Quantity::Humidity, publisher(transport, "bed/status/hum", 2.0, 60))
        .with(Quantity::Rssi, publisher(transport, "bed/status/rssi", 10.0, 60))
}

/// Run the loop until `until`, returning how many samples were taken
fn run_loop<F: FnMut()>(
    clock: &mut FixedTime,
    schedule: &mut MeasureSchedule,
    until: u64,
    mut tick: F,
) -> usize {
    let mut samples = 0;
    while clock.now() < until {
        match schedule.step(clock.now()) {
            ScheduleStep::Measure => {
                tick();
                samples += 1;
                schedule.mark_measured(clock.now());
            }
            ScheduleStep::Wait(ms) => {
                assert!(ms <= POLL_MS);
                clock.advance(ms);
            }
        }
    }
    samples
}

#[test]
fn two_minutes_of_sampling_sends_temperature_once() {
    let transport = RecordingTransport::connected();
    let mut agent = ReportingAgent::new(
        &transport,
        ScriptedSensor::steady(22.5, 48.0, 100),
        FixedLink::new(Some(-58.0)),
        device_publishers(&transport),
        StatusReporter::new("bed/connected", true).unwrap(),
    );

    let mut clock = FixedTime::new(0);
    let mut schedule = MeasureSchedule::new(INTERVAL_MS, POLL_MS).unwrap();
    let samples = run_loop(&mut clock, &mut schedule, 120_000, || {
        agent.tick();
    });

    // t = 0, 5 s, ..., 115 s
    assert_eq!(samples, 24);
    assert_eq!(transport.payloads_for("bed/status/temp").len(), 1);
    assert!(transport.payloads_for("bed/status/hum").is_empty());
    assert!(transport.payloads_for("bed/status/rssi").is_empty());
    assert_eq!(transport.payloads_for("bed/connected"), vec!["2"]);
}

#[test]
fn late_sample_realigns_to_interval_grid() {
    let mut clock = FixedTime::new(0);
    let mut schedule = MeasureSchedule::new(INTERVAL_MS, POLL_MS).unwrap();

    assert_eq!(schedule.step(clock.now()), ScheduleStep::Measure);
    schedule.mark_measured(clock.now());

    // A slow sensor read overran the next deadline
    clock.set(6_300);
    assert_eq!(schedule.step(clock.now()), ScheduleStep::Measure);
    schedule.mark_measured(clock.now());
    assert_eq!(schedule.next_due(), 10_000);
    assert_eq!(schedule.step(clock.now()), ScheduleStep::Wait(POLL_MS));

    clock.set(9_600);
    assert_eq!(schedule.step(clock.now()), ScheduleStep::Wait(400));
}

#[test]
fn sensor_outage_is_announced_and_recovered() {
    let transport = RecordingTransport::connected();
    let reading = ClimateReading {
        temperature: 19.0,
        humidity: 60.0,
    };
    let sensor = ScriptedSensor::new([
        Ok(reading),
        Err(SensorError::Timeout),
        Err(SensorError::Checksum),
        Ok(reading),
    ]);
    let mut agent = ReportingAgent::new(
        &transport,
        sensor,
        FixedLink::new(None),
        device_publishers(&transport),
        StatusReporter::new("bed/connected", true).unwrap(),
    );

    let announced: Vec<_> = (0..4).map(|_| agent.tick().announced).collect();
    assert_eq!(
        announced,
        vec![
            Some(LinkStatus::Healthy),
            Some(LinkStatus::SensorFault),
            None,
            Some(LinkStatus::Healthy)
        ]
    );
    assert_eq!(transport.payloads_for("bed/connected"), vec!["2", "1", "2"]);
    assert_eq!(
        agent.publishers().get(Quantity::Temperature).unwrap().current_count(),
        2
    );
}

#[test]
fn broker_outage_keeps_filtering_and_restarts_on_return() {
    let transport = RecordingTransport::connected();
    let link = FixedLink::new(Some(-60.0));
    let mut agent = ReportingAgent::new(
        &transport,
        ScriptedSensor::steady(21.0, 50.0, 10),
        &link,
        device_publishers(&transport),
        StatusReporter::new("bed/connected", true).unwrap(),
    )
    .with_restart_on_reconnect(true);

    agent.tick();
    transport.set_connected(false);
    for _ in 0..3 {
        link.set(Some(-90.0));
        let report = agent.tick();
        assert!(report.temperature.is_some());
        assert!(report.announced.is_none());
    }
    assert!(agent.status().indicator_on());
    assert_eq!(
        agent.publishers().get(Quantity::Rssi).unwrap().current_count(),
        4
    );

    transport.set_connected(true);
    let report = agent.tick();
    assert!(report.restarted);
    assert_eq!(report.announced, Some(LinkStatus::Healthy));
    assert!(!agent.status().indicator_on());
    assert_eq!(
        agent.publishers().get(Quantity::Rssi).unwrap().current_count(),
        1
    );
}
