// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Sensor trait and common types

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kinds of sensors this station knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Processor housekeeping: sample counter, free memory, supply voltage
    Board,
    /// Maxim DS3231 real-time clock (die temperature)
    Rtc,
    /// Atlas Scientific EZO-RTD water temperature circuit
    AtlasRtd,
    /// Atlas Scientific EZO-EC conductivity circuit
    AtlasEc,
    /// Atlas Scientific EZO-pH circuit
    AtlasPh,
    /// Atlas Scientific EZO-DO dissolved oxygen circuit
    AtlasDo,
}

/// Sensor lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStatus {
    /// Attached but not yet powered up
    Idle,
    /// Initialized and ready to measure
    Ready,
    /// Last operation failed
    Fault,
}

/// Descriptor for one named sensor output.
///
/// Name and unit follow the ODM2 controlled vocabularies so records line up
/// with what the data portal expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Short code unique within the sensor, e.g. `Atlas_Temp`
    pub code: String,
    /// ODM2 variable name, e.g. `temperature`
    pub name: String,
    /// ODM2 unit, e.g. `degreeCelsius`
    pub unit: String,
    /// Digits after the decimal point when recorded
    pub resolution: u8,
}

impl OutputSpec {
    /// Create an output descriptor.
    pub fn new(code: &str, name: &str, unit: &str, resolution: u8) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            resolution,
        }
    }
}

/// Capability set every attached sensor implements.
///
/// The logger and the sampling policy depend only on this trait, never on a
/// concrete sensor type.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Station-unique sensor identifier
    fn id(&self) -> &str;

    /// What kind of hardware this is
    fn kind(&self) -> SensorKind;

    /// Current lifecycle status
    fn status(&self) -> SensorStatus;

    /// Outputs this sensor produces, in a fixed order
    fn outputs(&self) -> &[OutputSpec];

    /// Power up and prepare the hardware.
    ///
    /// Called once at boot, and only when the battery allows it. Power-hungry
    /// work (warm-up, probe detection) belongs here, not in [`Sensor::sample`].
    async fn initialize(&mut self) -> Result<()>;

    /// Take one measurement, refreshing every cached output value.
    ///
    /// On failure the outputs are left at [`BAD_READING`](crate::BAD_READING)
    /// so a misread shows up downstream as the sentinel, never as a stale or
    /// fabricated value.
    async fn sample(&mut self) -> Result<()>;

    /// Last sampled value for a named output.
    ///
    /// Returns [`BAD_READING`](crate::BAD_READING) for unknown codes and for
    /// outputs that have not been measured yet.
    fn value(&self, code: &str) -> f64;
}
