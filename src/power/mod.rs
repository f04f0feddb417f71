// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Battery-gated sampling policy
//!
//! The only decision logic the station authors itself: once per wake cycle
//! the supply voltage is classified into one of three operating bands by two
//! fixed thresholds, and the band selects exactly one action. The same
//! thresholds gate boot-time sensor setup and log-file creation.
//!
//! A sentinel (unmeasured/invalid) voltage is a large negative number, so it
//! always classifies Critical. That is deliberate fail-safe bias: a misread
//! cycle sleeps and retries rather than risking a publish on an unknown
//! battery. It also means a transient read failure cannot be told apart
//! from a genuinely flat battery.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sensors::SensorArray;

/// The two fixed supply-voltage thresholds, in volts.
///
/// Fixed at deployment time; the config file may override the defaults but
/// nothing changes them at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerThresholds {
    /// Below this the station only sleeps
    pub low: f64,
    /// At or above this the station may publish
    pub high: f64,
}

impl Default for PowerThresholds {
    fn default() -> Self {
        Self { low: 3.40, high: 3.55 }
    }
}

impl PowerThresholds {
    /// Reject threshold pairs that are out of order.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.low < self.high,
            "power thresholds out of order: low {} must be below high {}",
            self.low,
            self.high
        );
        Ok(())
    }

    /// Classify a supply voltage into an operating band.
    ///
    /// Bands are half-open on the low end: exactly `low` is Moderate and
    /// exactly `high` is Normal.
    pub fn classify(&self, volts: f64) -> OperatingBand {
        if volts < self.low {
            OperatingBand::Critical
        } else if volts < self.high {
            OperatingBand::Moderate
        } else {
            OperatingBand::Normal
        }
    }

    /// Whether boot-time setup may run. Sensor initialization and log-file
    /// creation are gated together on this, never independently.
    pub fn setup_allowed(&self, volts: f64) -> bool {
        volts >= self.low
    }
}

/// Operating band derived from one voltage reading.
///
/// Ephemeral: computed fresh each cycle, never stored across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingBand {
    /// Too little power to do anything but sleep
    Critical,
    /// Enough to sample and record locally, not to run the modem
    Moderate,
    /// Enough to sample, record, and publish
    Normal,
}

impl OperatingBand {
    /// The single action dispatched for a cycle in this band.
    pub fn action(self) -> CycleAction {
        match self {
            OperatingBand::Critical => CycleAction::Sleep,
            OperatingBand::Moderate => CycleAction::SampleAndLog,
            OperatingBand::Normal => CycleAction::SampleLogAndPublish,
        }
    }
}

/// What the station does with one wake cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleAction {
    /// Skip sampling, go straight back to low-power sleep
    Sleep,
    /// Sample every channel and append to the log file
    SampleAndLog,
    /// Sample, append to the log file, and publish over the network
    SampleLogAndPublish,
}

/// Per-cycle cache over the board's battery voltage output.
///
/// The voltage is measured at most once per evaluation cycle: the first
/// query triggers a board measurement if no value is cached yet, later
/// queries in the same cycle reuse it, and the cache is dropped when the
/// next cycle begins.
pub struct BatteryMonitor {
    sensor_id: String,
    output: String,
    cached: Option<f64>,
}

impl BatteryMonitor {
    /// Monitor reading the named output of the named sensor.
    pub fn new(sensor_id: &str, output: &str) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            output: output.to_string(),
            cached: None,
        }
    }

    /// Drop the cached reading at the start of a cycle.
    pub fn begin_cycle(&mut self) {
        self.cached = None;
    }

    /// Current supply voltage, or [`BAD_READING`](crate::sensors::BAD_READING)
    /// when unavailable.
    ///
    /// Triggers a fresh board measurement when nothing is cached for this
    /// cycle; a failed measurement leaves the sentinel in place.
    pub async fn voltage(&mut self, array: &mut SensorArray) -> f64 {
        if let Some(volts) = self.cached {
            return volts;
        }
        if let Err(e) = array.sample_sensor(&self.sensor_id).await {
            debug!("battery measurement failed: {e:#}");
        }
        let volts = array.value(&self.sensor_id, &self.output);
        debug!(volts, "battery voltage");
        self.cached = Some(volts);
        volts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{BoardSensor, Channel, SensorArray, BAD_READING};
    use uuid::Uuid;

    fn thresholds() -> PowerThresholds {
        PowerThresholds::default()
    }

    #[test]
    fn below_low_is_critical() {
        assert_eq!(thresholds().classify(3.39), OperatingBand::Critical);
        assert_eq!(thresholds().classify(0.0), OperatingBand::Critical);
        assert_eq!(OperatingBand::Critical.action(), CycleAction::Sleep);
    }

    #[test]
    fn between_thresholds_is_moderate() {
        let t = thresholds();
        assert_eq!(t.classify(3.41), OperatingBand::Moderate);
        assert_eq!(t.classify(3.549999), OperatingBand::Moderate);
        assert_eq!(
            OperatingBand::Moderate.action(),
            CycleAction::SampleAndLog
        );
    }

    #[test]
    fn at_or_above_high_is_normal() {
        let t = thresholds();
        assert_eq!(t.classify(3.9), OperatingBand::Normal);
        assert_eq!(
            OperatingBand::Normal.action(),
            CycleAction::SampleLogAndPublish
        );
    }

    #[test]
    fn boundaries_are_low_inclusive() {
        let t = thresholds();
        assert_eq!(t.classify(3.40), OperatingBand::Moderate);
        assert_eq!(t.classify(3.55), OperatingBand::Normal);
    }

    #[test]
    fn sentinel_classifies_critical() {
        assert_eq!(thresholds().classify(BAD_READING), OperatingBand::Critical);
    }

    #[test]
    fn setup_gate_matches_low_threshold() {
        let t = thresholds();
        assert!(!t.setup_allowed(3.39));
        assert!(t.setup_allowed(3.40));
        assert!(t.setup_allowed(3.7));
        assert!(!t.setup_allowed(BAD_READING));
    }

    #[test]
    fn validate_rejects_inverted_pair() {
        let t = PowerThresholds { low: 3.6, high: 3.4 };
        assert!(t.validate().is_err());
        assert!(thresholds().validate().is_ok());
    }

    #[tokio::test]
    async fn monitor_measures_once_per_cycle() {
        let mut array = SensorArray::new();
        array
            .add_sensor(Box::new(BoardSensor::with_fixed("board", 3.7)))
            .unwrap();
        array
            .bind(&Channel::new(Uuid::new_v4(), "board", "Board_Batt"))
            .unwrap();

        let mut monitor = BatteryMonitor::new("board", "Board_Batt");
        monitor.begin_cycle();
        assert!((monitor.voltage(&mut array).await - 3.7).abs() < 1e-9);
        // Second query in the same cycle reuses the cache: the board's
        // sample counter must not have advanced.
        monitor.voltage(&mut array).await;
        assert_eq!(array.value("board", "Board_SampleNum"), 1.0);

        // A new cycle measures afresh.
        monitor.begin_cycle();
        monitor.voltage(&mut array).await;
        assert_eq!(array.value("board", "Board_SampleNum"), 2.0);
    }

    #[tokio::test]
    async fn monitor_reports_sentinel_for_missing_sensor() {
        let mut array = SensorArray::new();
        let mut monitor = BatteryMonitor::new("board", "Board_Batt");
        assert_eq!(monitor.voltage(&mut array).await, BAD_READING);
    }
}
