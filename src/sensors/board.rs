// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Board housekeeping sensor - sample counter, free memory, supply voltage
//!
//! The battery voltage output doubles as the input to the battery-gated
//! sampling policy, the same way the original Mayfly loggers read the
//! processor's own battery channel.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use rand::prelude::*;
use rand_distr::Normal;
use tracing::debug;

use super::{OutputSpec, Sensor, SensorKind, SensorStatus, BAD_READING};

/// Output code for the supply voltage channel.
pub const BATTERY_OUTPUT: &str = "Board_Batt";

/// Where the board reads its supply voltage from.
pub enum SupplySource {
    /// Fixed voltage, for bench testing
    Fixed(f64),
    /// Simulated discharge curve (demo mode)
    Simulated { volts: f64, rng: StdRng },
    /// Linux power-supply class attribute reporting microvolts
    Sysfs(PathBuf),
}

pub(crate) fn board_outputs() -> Vec<OutputSpec> {
    vec![
        OutputSpec::new("Board_SampleNum", "sequenceNumber", "dimensionless", 0),
        OutputSpec::new("Board_FreeRam", "freeSRAM", "kilobyte", 0),
        OutputSpec::new(BATTERY_OUTPUT, "batteryVoltage", "volt", 3),
    ]
}

/// Processor metadata "sensor" for general station housekeeping.
pub struct BoardSensor {
    id: String,
    status: SensorStatus,
    outputs: Vec<OutputSpec>,
    values: Vec<f64>,
    sample_num: u64,
    supply: SupplySource,
}

impl BoardSensor {
    /// Board sensor reading its supply voltage from the given source.
    pub fn new(id: &str, supply: SupplySource) -> Self {
        let outputs = board_outputs();
        let values = vec![BAD_READING; outputs.len()];
        Self {
            id: id.to_string(),
            status: SensorStatus::Idle,
            outputs,
            values,
            sample_num: 0,
            supply,
        }
    }

    /// Bench variant with a fixed supply voltage.
    pub fn with_fixed(id: &str, volts: f64) -> Self {
        Self::new(id, SupplySource::Fixed(volts))
    }

    /// Demo variant with a simulated discharge curve.
    pub fn simulated(id: &str) -> Self {
        Self::new(
            id,
            SupplySource::Simulated {
                volts: 3.9,
                rng: StdRng::from_entropy(),
            },
        )
    }

    /// Variant backed by a Linux power-supply sysfs attribute.
    pub fn from_sysfs(id: &str, path: PathBuf) -> Self {
        Self::new(id, SupplySource::Sysfs(path))
    }

    fn read_supply(&mut self) -> f64 {
        match &mut self.supply {
            SupplySource::Fixed(v) => *v,
            SupplySource::Simulated { volts, rng } => {
                // Slow discharge with measurement noise, floored where a
                // LiPo protection circuit would cut out.
                *volts = (*volts - 0.0004).max(3.2);
                let noise = rng.sample::<f64, _>(Normal::new(0.0, 0.005).unwrap());
                *volts + noise
            }
            SupplySource::Sysfs(path) => match std::fs::read_to_string(&*path) {
                Ok(text) => match text.trim().parse::<f64>() {
                    Ok(microvolts) => microvolts / 1_000_000.0,
                    Err(_) => {
                        debug!(path = %path.display(), "unparsable supply reading");
                        BAD_READING
                    }
                },
                Err(e) => {
                    debug!(path = %path.display(), "supply read failed: {e}");
                    BAD_READING
                }
            },
        }
    }

    fn read_free_ram(&mut self) -> f64 {
        match &mut self.supply {
            SupplySource::Simulated { rng, .. } => 52_000.0 + rng.gen_range(-500.0..500.0),
            _ => match std::fs::read_to_string("/proc/meminfo") {
                Ok(text) => text
                    .lines()
                    .find(|l| l.starts_with("MemAvailable:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .and_then(|kb| kb.parse::<f64>().ok())
                    .unwrap_or(BAD_READING),
                Err(_) => BAD_READING,
            },
        }
    }
}

#[async_trait]
impl Sensor for BoardSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Board
    }

    fn status(&self) -> SensorStatus {
        self.status
    }

    fn outputs(&self) -> &[OutputSpec] {
        &self.outputs
    }

    async fn initialize(&mut self) -> Result<()> {
        self.status = SensorStatus::Ready;
        Ok(())
    }

    async fn sample(&mut self) -> Result<()> {
        self.sample_num += 1;
        self.values[0] = self.sample_num as f64;
        self.values[1] = self.read_free_ram();
        // A failed supply read surfaces as the sentinel, never as an error:
        // the policy treats it like a flat battery and sleeps the cycle out.
        self.values[2] = self.read_supply();
        Ok(())
    }

    fn value(&self, code: &str) -> f64 {
        self.outputs
            .iter()
            .position(|o| o.code == code)
            .map(|i| self.values[i])
            .unwrap_or(BAD_READING)
    }
}
