use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use sensorcast_core::time::MonotonicClock;
use sensorcast_core::{
    ClimateSensor, LinkMonitor, NoLink, PublisherSet, Quantity, ReportingAgent, ScheduleStep,
    StatusReporter, ThrottledPublisher, TimeSource,
};
use sensorcast_agent::config::SensorSource;
use sensorcast_agent::sensors::{IioClimateSensor, SimulatedClimate, WirelessLink};
use sensorcast_agent::{AgentConfig, AgentError, MqttConfig, MqttTransport};

/// SensorCast agent - smoothed, throttled climate reporting over MQTT
#[derive(Parser, Debug)]
#[command(name = "sensorcast", version, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(env = "SENSORCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Use the simulated sensor regardless of the configuration
    #[arg(long, default_value_t = false)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let config = AgentConfig::load_or_default(args.config.as_deref())
        .context("cannot load configuration")?;

    // One thread: the sampling loop and the MQTT event loop take turns
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start runtime")?;

    runtime.block_on(run(config, args.simulate))
}

async fn run(config: AgentConfig, simulate: bool) -> anyhow::Result<()> {
    info!("MQTT Client Name: {}", config.client_name);
    info!("MQTT retained: {}", config.retained);

    let (transport, eventloop) = MqttTransport::new(MqttConfig::from_agent(&config)?)?;
    tokio::spawn(eventloop.run());

    let mut sensor: Box<dyn ClimateSensor> = match (&config.sensor, simulate) {
        (_, true) | (SensorSource::Simulated, _) => Box::new(SimulatedClimate::new()),
        (SensorSource::Iio { device }, false) => Box::new(IioClimateSensor::new(device)),
    };
    info!("Sensor type: {}", sensor.model());

    let mut link: Box<dyn LinkMonitor> = match &config.wireless_interface {
        Some(interface) => {
            info!("Reporting signal level of {}", interface);
            Box::new(WirelessLink::new(interface.as_str()))
        }
        None => Box::new(NoLink),
    };

    let mut publishers = PublisherSet::new();
    for quantity in Quantity::ALL {
        let publisher_config = config.publisher_config(quantity).map_err(AgentError::from)?;
        info!(
            "{}: send every {} samples to {}",
            quantity, publisher_config.send_every_n, publisher_config.topic
        );
        let publisher = ThrottledPublisher::new(&transport, publisher_config, config.filter)
            .map_err(AgentError::from)?;
        publishers.insert(quantity, publisher);
    }

    let connected = config.topic("connected").map_err(AgentError::from)?;
    let status = StatusReporter::new(&connected, config.retained).map_err(AgentError::from)?;
    let mut agent = ReportingAgent::new(&transport, &mut *sensor, &mut *link, publishers, status)
        .with_restart_on_reconnect(config.restart_on_reconnect);
    if config.mirror_measurements {
        let base = config.status_base().map_err(AgentError::from)?;
        agent = agent
            .with_mirroring(&base, config.retained)
            .map_err(AgentError::from)?;
    }

    let clock = MonotonicClock::new();
    let mut schedule = config.schedule().map_err(AgentError::from)?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        match schedule.step(clock.now()) {
            ScheduleStep::Measure => {
                agent.tick();
                schedule.mark_measured(clock.now());
            }
            ScheduleStep::Wait(ms) => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                    _ = &mut shutdown => break,
                }
            }
        }
    }

    let stats = transport.stats();
    info!(
        "Shutting down: {} messages sent, {} dropped, {} reconnections",
        stats.messages_sent, stats.messages_failed, stats.reconnections
    );
    if let Err(e) = transport.disconnect() {
        warn!("Disconnect failed: {}", e);
    }
    Ok(())
}
