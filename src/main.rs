// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! hydrolog - battery-aware environmental data logger
//!
//! Wires a water quality station together from its config file: attaches
//! the sensors, binds each output to its portal channel UUID, then runs the
//! battery-gated sample/log/publish cycle until interrupted.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hydrolog::config::{self, Config};
use hydrolog::power::BatteryMonitor;
use hydrolog::publish::{HttpPublisher, Publisher};
use hydrolog::sensors::{
    AtlasSensor, BoardSensor, CalculatedChannel, Ds3231Sensor, SensorArray, SensorKind,
    SensorSimulator, BATTERY_OUTPUT,
};
use hydrolog::{DataLogger, SystemClock, VERSION};

const DEFAULT_SUPPLY_PATH: &str = "/sys/class/power_supply/battery/voltage_now";

/// hydrolog - battery-aware environmental data logger
#[derive(Parser, Debug)]
#[command(name = "hydrolog")]
#[command(version = VERSION)]
#[command(about = "Battery-aware environmental data logger for water quality stations")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Demo mode with simulated sensors
    #[arg(long)]
    demo: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Removable-storage directory for log files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Run a single evaluation cycle and exit
    #[arg(long)]
    once: bool,

    /// Override the publish endpoint
    #[arg(long)]
    endpoint: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("hydrolog v{}", VERSION);

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(endpoint) = args.endpoint {
        config.publish.enabled = true;
        config.publish.endpoint = endpoint;
    }
    config.validate()?;

    info!(
        station = %config.station_name,
        logger = %config.logger_id,
        demo = config.demo_mode,
        interval_mins = config.logging.interval_mins,
        "configuration loaded from {config_path:?}"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, args.once))
}

async fn run(config: Config, once: bool) -> Result<()> {
    let array = build_array(&config)?;
    let battery = BatteryMonitor::new(config::BOARD_SENSOR, BATTERY_OUTPUT);
    let clock = SystemClock::new();

    let publisher: Option<Box<dyn Publisher>> = if config.publish.enabled {
        Some(Box::new(HttpPublisher::new(config.publish.clone())?))
    } else {
        info!("publishing disabled, running log-only");
        None
    };

    let mut logger = DataLogger::new(&config, array, battery, Box::new(clock), publisher)?;
    logger.begin().await?;

    if once {
        logger.run_cycle().await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("interrupt received");
        let _ = shutdown_tx.send(());
    });

    logger.run(shutdown_rx).await
}

/// Attach the station's sensors and bind the channel table from config.
fn build_array(config: &Config) -> Result<SensorArray> {
    let mut array = SensorArray::new();
    let bus = config.sensors.i2c_bus;

    if config.demo_mode {
        array.add_sensor(Box::new(BoardSensor::simulated(config::BOARD_SENSOR)))?;
        array.add_sensor(Box::new(SensorSimulator::new(
            config::RTC_SENSOR,
            SensorKind::Rtc,
        )))?;
        array.add_sensor(Box::new(SensorSimulator::new(
            config::RTD_SENSOR,
            SensorKind::AtlasRtd,
        )))?;
        array.add_sensor(Box::new(SensorSimulator::new(
            config::EC_SENSOR,
            SensorKind::AtlasEc,
        )))?;
        array.add_sensor(Box::new(SensorSimulator::new(
            config::PH_SENSOR,
            SensorKind::AtlasPh,
        )))?;
        array.add_sensor(Box::new(SensorSimulator::new(
            config::DO_SENSOR,
            SensorKind::AtlasDo,
        )))?;
    } else {
        let supply = config
            .sensors
            .supply_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SUPPLY_PATH));
        array.add_sensor(Box::new(BoardSensor::from_sysfs(
            config::BOARD_SENSOR,
            supply,
        )))?;
        array.add_sensor(Box::new(Ds3231Sensor::new(config::RTC_SENSOR, bus)))?;
        array.add_sensor(Box::new(AtlasSensor::rtd(config::RTD_SENSOR, bus)))?;
        array.add_sensor(Box::new(AtlasSensor::ec(config::EC_SENSOR, bus)))?;
        array.add_sensor(Box::new(AtlasSensor::ph(config::PH_SENSOR, bus)))?;
        array.add_sensor(Box::new(AtlasSensor::dissolved_oxygen(
            config::DO_SENSOR,
            bus,
        )))?;
    }

    for channel in &config.channels {
        array.bind(channel)?;
    }
    if config.sensors.specific_conductance {
        array.bind_calculated(CalculatedChannel::specific_conductance(
            config::SPECIFIC_CONDUCTANCE_CHANNEL,
            "Atlas_Temp",
            "Atlas_Conductivity",
        ))?;
    }

    Ok(array)
}
