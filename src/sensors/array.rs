// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! The station's channel table
//!
//! Every published value is an explicit tagged pair: a channel UUID bound to
//! a named output of a named sensor. Bindings are validated when the table
//! is built, so a typo fails at startup instead of silently shifting every
//! column one position over.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::derived::CalculatedChannel;
use super::{OutputSpec, Sensor, SensorStatus, BAD_READING};

/// One logged channel: a publish identifier tied to a named sensor output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Publish identifier, assigned by the data portal at registration
    pub uuid: Uuid,
    /// Which sensor the output belongs to
    pub sensor_id: String,
    /// Output code on that sensor, e.g. `Atlas_Temp`
    pub output: String,
}

impl Channel {
    /// Convenience constructor for channel tables built in code.
    pub fn new(uuid: Uuid, sensor_id: &str, output: &str) -> Self {
        Self {
            uuid,
            sensor_id: sensor_id.to_string(),
            output: output.to_string(),
        }
    }
}

/// Descriptor for one column of the record: channel identity plus the
/// output metadata needed for headers and formatting.
#[derive(Debug, Clone)]
pub struct Column {
    /// Publish identifier
    pub uuid: Uuid,
    /// Output code
    pub code: String,
    /// ODM2 unit
    pub unit: String,
    /// Digits after the decimal point
    pub resolution: u8,
}

/// A value observed on one channel during one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    /// Channel the value belongs to
    pub channel: Uuid,
    /// Output code, for the log file header and debugging
    pub code: String,
    /// Sampled value, or the sentinel
    pub value: f64,
    /// ODM2 unit
    pub unit: String,
    /// Digits after the decimal point when recorded
    pub resolution: u8,
}

struct BoundChannel {
    uuid: Uuid,
    sensor_id: String,
    spec: OutputSpec,
}

/// Ordered set of sensors plus the channel bindings over their outputs.
///
/// Built once at startup and handed to the logger by reference; nothing
/// here is shared across cycles except the sensors' own cached values.
#[derive(Default)]
pub struct SensorArray {
    sensors: Vec<Box<dyn Sensor>>,
    channels: Vec<BoundChannel>,
    calculated: Vec<CalculatedChannel>,
}

impl SensorArray {
    /// Empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sensor. Identifiers must be unique within the station.
    pub fn add_sensor(&mut self, sensor: Box<dyn Sensor>) -> Result<()> {
        if self.sensors.iter().any(|s| s.id() == sensor.id()) {
            bail!("duplicate sensor id {:?}", sensor.id());
        }
        info!(id = sensor.id(), kind = ?sensor.kind(), "attached sensor");
        self.sensors.push(sensor);
        Ok(())
    }

    fn uuid_bound(&self, uuid: Uuid) -> bool {
        self.channels.iter().any(|c| c.uuid == uuid)
            || self.calculated.iter().any(|c| c.uuid == uuid)
    }

    /// Bind a channel UUID to a sensor output. Fails if the sensor or the
    /// output does not exist, or the UUID is already bound, measured or
    /// derived.
    pub fn bind(&mut self, channel: &Channel) -> Result<()> {
        if self.uuid_bound(channel.uuid) {
            bail!("channel {} bound twice", channel.uuid);
        }
        let Some(sensor) = self.sensors.iter().find(|s| s.id() == channel.sensor_id) else {
            bail!(
                "channel {} references unknown sensor {:?}",
                channel.uuid,
                channel.sensor_id
            );
        };
        let Some(spec) = sensor
            .outputs()
            .iter()
            .find(|o| o.code == channel.output)
            .cloned()
        else {
            bail!(
                "sensor {:?} has no output {:?}",
                channel.sensor_id,
                channel.output
            );
        };
        self.channels.push(BoundChannel {
            uuid: channel.uuid,
            sensor_id: channel.sensor_id.clone(),
            spec,
        });
        Ok(())
    }

    /// Append a derived channel. Evaluated after every measured channel,
    /// against the same cycle's values. The UUID must not collide with any
    /// binding, measured or derived.
    pub fn bind_calculated(&mut self, channel: CalculatedChannel) -> Result<()> {
        if self.uuid_bound(channel.uuid) {
            bail!("channel {} bound twice", channel.uuid);
        }
        self.calculated.push(channel);
        Ok(())
    }

    /// Initialize every sensor. Individual failures are logged and the
    /// sensor left in fault; the rest of the array still comes up.
    pub async fn setup_all(&mut self) {
        for sensor in &mut self.sensors {
            let id = sensor.id().to_string();
            match sensor.initialize().await {
                Ok(()) => info!(%id, "sensor initialized"),
                Err(e) => warn!(%id, "sensor setup failed: {e:#}"),
            }
        }
    }

    /// Take one measurement on every sensor, then collect one observation
    /// per bound channel, measured channels first, derived channels after.
    pub async fn sample_all(&mut self) -> Vec<Observation> {
        for sensor in &mut self.sensors {
            let id = sensor.id().to_string();
            if let Err(e) = sensor.sample().await {
                warn!(%id, "measurement failed: {e:#}");
            }
        }

        let mut observations = Vec::with_capacity(self.channels.len() + self.calculated.len());
        for bound in &self.channels {
            observations.push(Observation {
                channel: bound.uuid,
                code: bound.spec.code.clone(),
                value: self.value(&bound.sensor_id, &bound.spec.code),
                unit: bound.spec.unit.clone(),
                resolution: bound.spec.resolution,
            });
        }
        let lookup = |code: &str| self.value_by_code(code);
        for calc in &self.calculated {
            observations.push(Observation {
                channel: calc.uuid,
                code: calc.spec.code.clone(),
                value: calc.evaluate(&lookup),
                unit: calc.spec.unit.clone(),
                resolution: calc.spec.resolution,
            });
        }
        observations
    }

    /// Measure a single sensor, leaving the rest untouched.
    pub async fn sample_sensor(&mut self, id: &str) -> Result<()> {
        let Some(sensor) = self.sensors.iter_mut().find(|s| s.id() == id) else {
            bail!("unknown sensor {id:?}");
        };
        sensor.sample().await
    }

    /// Last sampled value of one sensor output, or the sentinel.
    pub fn value(&self, sensor_id: &str, code: &str) -> f64 {
        self.sensors
            .iter()
            .find(|s| s.id() == sensor_id)
            .map(|s| s.value(code))
            .unwrap_or(BAD_READING)
    }

    /// Last sampled value for an output code, searching every sensor.
    pub fn value_by_code(&self, code: &str) -> f64 {
        self.sensors
            .iter()
            .find(|s| s.outputs().iter().any(|o| o.code == code))
            .map(|s| s.value(code))
            .unwrap_or(BAD_READING)
    }

    /// Column descriptors in record order: measured channels then derived.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns: Vec<Column> = self
            .channels
            .iter()
            .map(|c| Column {
                uuid: c.uuid,
                code: c.spec.code.clone(),
                unit: c.spec.unit.clone(),
                resolution: c.spec.resolution,
            })
            .collect();
        columns.extend(self.calculated.iter().map(|c| Column {
            uuid: c.uuid,
            code: c.spec.code.clone(),
            unit: c.spec.unit.clone(),
            resolution: c.spec.resolution,
        }));
        columns
    }

    /// Lifecycle status of one sensor.
    pub fn status_of(&self, id: &str) -> Option<SensorStatus> {
        self.sensors
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.status())
    }

    /// Number of attached sensors.
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Number of bound channels, derived included.
    pub fn channel_count(&self) -> usize {
        self.channels.len() + self.calculated.len()
    }

    /// Whether any channel is bound.
    pub fn is_empty(&self) -> bool {
        self.channel_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{BoardSensor, CalculatedChannel, SensorSimulator};
    use crate::SensorKind;

    fn demo_array() -> SensorArray {
        let mut array = SensorArray::new();
        array
            .add_sensor(Box::new(BoardSensor::with_fixed("board", 3.7)))
            .unwrap();
        array
            .add_sensor(Box::new(SensorSimulator::new("rtd-1", SensorKind::AtlasRtd)))
            .unwrap();
        array
            .add_sensor(Box::new(SensorSimulator::new("ec-1", SensorKind::AtlasEc)))
            .unwrap();
        array
            .bind(&Channel::new(Uuid::new_v4(), "board", "Board_Batt"))
            .unwrap();
        array
            .bind(&Channel::new(Uuid::new_v4(), "rtd-1", "Atlas_Temp"))
            .unwrap();
        array
            .bind(&Channel::new(Uuid::new_v4(), "ec-1", "Atlas_Conductivity"))
            .unwrap();
        array
    }

    #[test]
    fn bind_rejects_unknown_sensor() {
        let mut array = demo_array();
        let bad = Channel::new(Uuid::new_v4(), "ph-9", "Atlas_pH");
        assert!(array.bind(&bad).is_err());
    }

    #[test]
    fn bind_rejects_unknown_output() {
        let mut array = demo_array();
        let bad = Channel::new(Uuid::new_v4(), "rtd-1", "Atlas_pH");
        assert!(array.bind(&bad).is_err());
    }

    #[test]
    fn bind_rejects_duplicate_uuid() {
        let mut array = demo_array();
        let uuid = Uuid::new_v4();
        array
            .bind(&Channel::new(uuid, "ec-1", "Atlas_TDS"))
            .unwrap();
        assert!(array
            .bind(&Channel::new(uuid, "ec-1", "Atlas_Salinity"))
            .is_err());
    }

    #[test]
    fn duplicate_sensor_id_rejected() {
        let mut array = demo_array();
        let dup = BoardSensor::with_fixed("board", 3.7);
        assert!(array.add_sensor(Box::new(dup)).is_err());
    }

    #[test]
    fn bind_rejects_uuid_held_by_calculated_channel() {
        let mut array = demo_array();
        let uuid = Uuid::new_v4();
        array
            .bind_calculated(CalculatedChannel::specific_conductance(
                uuid,
                "Atlas_Temp",
                "Atlas_Conductivity",
            ))
            .unwrap();
        // A later measured binding must not reuse the derived channel's
        // UUID; the publish payload is keyed by UUID and would drop one.
        assert!(array.bind(&Channel::new(uuid, "ec-1", "Atlas_TDS")).is_err());
    }

    #[test]
    fn bind_calculated_rejects_uuid_held_by_measured_channel() {
        let mut array = demo_array();
        let uuid = Uuid::new_v4();
        array
            .bind(&Channel::new(uuid, "ec-1", "Atlas_TDS"))
            .unwrap();
        assert!(array
            .bind_calculated(CalculatedChannel::specific_conductance(
                uuid,
                "Atlas_Temp",
                "Atlas_Conductivity",
            ))
            .is_err());
    }

    #[test]
    fn two_calculated_channels_cannot_share_a_uuid() {
        let mut array = demo_array();
        let uuid = Uuid::new_v4();
        array
            .bind_calculated(CalculatedChannel::specific_conductance(
                uuid,
                "Atlas_Temp",
                "Atlas_Conductivity",
            ))
            .unwrap();
        assert!(array
            .bind_calculated(CalculatedChannel::specific_conductance(
                uuid,
                "Atlas_Temp",
                "Atlas_Conductivity",
            ))
            .is_err());
    }

    #[tokio::test]
    async fn sample_all_yields_one_observation_per_channel() {
        let mut array = demo_array();
        array.setup_all().await;
        let observations = array.sample_all().await;
        assert_eq!(observations.len(), 3);
        let columns = array.columns();
        for (obs, col) in observations.iter().zip(&columns) {
            assert_eq!(obs.channel, col.uuid);
            assert_eq!(obs.code, col.code);
            assert_ne!(obs.value, BAD_READING, "{} unset", obs.code);
        }
    }

    #[tokio::test]
    async fn calculated_channel_appends_after_measured() {
        let mut array = demo_array();
        array
            .bind_calculated(CalculatedChannel::specific_conductance(
                Uuid::new_v4(),
                "Atlas_Temp",
                "Atlas_Conductivity",
            ))
            .unwrap();
        let observations = array.sample_all().await;
        assert_eq!(observations.len(), 4);
        let sp_cond = &observations[3];
        assert_eq!(sp_cond.code, "Atlas_SpCond");
        assert_ne!(sp_cond.value, BAD_READING);
    }
}
