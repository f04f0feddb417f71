// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! The operating cycle driver
//!
//! `DataLogger` owns the whole station: sensor array, battery monitor,
//! power thresholds, log file, clock, and optional publisher. Every wake
//! cycle runs to completion, strictly serial: invalidate the voltage cache,
//! read, classify, dispatch exactly one action, go back to sleep.

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::clock::{record_timezone, Clock};
use crate::config::Config;
use crate::power::{BatteryMonitor, CycleAction, OperatingBand, PowerThresholds};
use crate::publish::Publisher;
use crate::sensors::{Observation, SensorArray};
use crate::storage::LogFile;

/// Counters kept across cycles for the shutdown summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleCounters {
    /// Cycles that produced a log record
    pub logged: u64,
    /// Records accepted by the portal
    pub published: u64,
    /// Cycles skipped on critical battery
    pub slept: u64,
    /// Publish attempts the portal or network refused
    pub publish_failures: u64,
}

/// The station's scheduler/publisher facade.
pub struct DataLogger {
    id: String,
    interval: Duration,
    timezone: FixedOffset,
    thresholds: PowerThresholds,
    array: SensorArray,
    battery: BatteryMonitor,
    clock: Box<dyn Clock>,
    log_file: LogFile,
    publisher: Option<Box<dyn Publisher>>,
    counters: CycleCounters,
}

impl DataLogger {
    /// Assemble a logger from config and pre-built collaborators.
    pub fn new(
        config: &Config,
        array: SensorArray,
        battery: BatteryMonitor,
        clock: Box<dyn Clock>,
        publisher: Option<Box<dyn Publisher>>,
    ) -> Result<Self> {
        let timezone = record_timezone(config.logging.timezone_hours)?;
        Ok(Self {
            id: config.logger_id.clone(),
            interval: Duration::from_secs(config.logging.interval_mins as u64 * 60),
            timezone,
            thresholds: config.power,
            array,
            battery,
            clock,
            log_file: LogFile::new(&config.data_dir, &config.logger_id),
            publisher,
            counters: CycleCounters::default(),
        })
    }

    /// Record timestamp in the station's local standard time.
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock.now_utc().with_timezone(&self.timezone)
    }

    /// Boot sequence: battery-gated sensor setup and log-file creation,
    /// clock sync when there is power to spare or the clock is obviously
    /// wrong, then sleep until the first scheduled cycle.
    pub async fn begin(&mut self) -> Result<()> {
        info!(
            logger = %self.id,
            sensors = self.array.sensor_count(),
            channels = self.array.channel_count(),
            "logger starting"
        );

        self.battery.begin_cycle();
        let volts = self.battery.voltage(&mut self.array).await;
        let setup_allowed = self.thresholds.setup_allowed(volts);

        if setup_allowed {
            info!("setting up sensors");
            self.array.setup_all().await;
        } else {
            warn!(volts, "battery critical at boot, skipping sensor setup");
        }

        if self.thresholds.classify(volts) == OperatingBand::Normal || !self.clock.is_sane() {
            if let Err(e) = self.clock.sync().await {
                warn!("clock sync failed: {e:#}");
            }
        }

        // Card writes are power-hungry too: the log file is created under
        // the same gate as sensor setup, never independently.
        if setup_allowed {
            let date = self.local_now().date_naive();
            let columns = self.array.columns();
            self.log_file.create(&columns, true, date)?;
        }

        self.system_sleep();
        Ok(())
    }

    /// One evaluation: read voltage, classify, dispatch exactly one action.
    pub async fn run_cycle(&mut self) -> CycleAction {
        self.battery.begin_cycle();
        let volts = self.battery.voltage(&mut self.array).await;
        let band = self.thresholds.classify(volts);
        let action = band.action();
        debug!(volts, ?band, ?action, "cycle evaluation");

        match action {
            CycleAction::Sleep => {
                self.counters.slept += 1;
                self.system_sleep();
            }
            CycleAction::SampleAndLog => self.log_data().await,
            CycleAction::SampleLogAndPublish => self.log_data_and_publish().await,
        }
        action
    }

    /// Enter low-power sleep. Platform sleep states are the deployment's
    /// concern; on a hosted build this is bookkeeping only.
    pub fn system_sleep(&self) {
        debug!("entering low-power sleep until next cycle");
    }

    /// Sample every channel and append one record to the log file.
    pub async fn log_data(&mut self) {
        let _ = self.record().await;
    }

    /// Sample, record, and hand the same observations to the publisher.
    /// A failed upload is counted and logged; the record is already on the
    /// card, so the cycle still succeeds.
    pub async fn log_data_and_publish(&mut self) {
        let (stamp, observations) = self.record().await;
        let Some(publisher) = &self.publisher else {
            debug!("no publisher configured");
            return;
        };
        match publisher.publish(stamp, &observations).await {
            Ok(()) => self.counters.published += 1,
            Err(e) => {
                self.counters.publish_failures += 1;
                warn!("publish failed: {e}");
            }
        }
    }

    async fn record(&mut self) -> (DateTime<FixedOffset>, Vec<Observation>) {
        let observations = self.array.sample_all().await;
        let stamp = self.local_now();
        // Only rows that actually reached the card count toward the
        // shutdown summary.
        match self.log_file.append(stamp, &observations) {
            Ok(()) => self.counters.logged += 1,
            Err(e) => warn!("log file write failed: {e:#}"),
        }
        (stamp, observations)
    }

    /// Serial operating loop: one evaluation per interval tick until
    /// shutdown is requested.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately and boot already ran.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.recv() => {
                    info!("logger shutting down");
                    break;
                }
            }
        }

        let c = self.counters;
        info!(
            logged = c.logged,
            published = c.published,
            slept = c.slept,
            publish_failures = c.publish_failures,
            "logger stopped"
        );
        Ok(())
    }

    /// Counters so far.
    pub fn counters(&self) -> CycleCounters {
        self.counters
    }

    /// The sensor array, for status inspection.
    pub fn array(&self) -> &SensorArray {
        &self.array
    }

    /// The log file, for status inspection.
    pub fn log_file(&self) -> &LogFile {
        &self.log_file
    }
}
