// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Atlas Scientific EZO circuits over I2C
//!
//! All four circuits speak the same ASCII command protocol: write `R`, wait
//! for the conversion, read back a response code byte followed by a
//! comma-separated list of values. The EC circuit reports four parameters
//! from a single measurement when all output parameters are enabled.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{OutputSpec, Sensor, SensorKind, SensorStatus, BAD_READING};

/// Factory I2C address of the EZO-RTD temperature circuit.
pub const RTD_ADDR: u16 = 0x66;
/// Factory I2C address of the EZO-EC conductivity circuit.
pub const EC_ADDR: u16 = 0x64;
/// Factory I2C address of the EZO-pH circuit.
pub const PH_ADDR: u16 = 0x63;
/// Factory I2C address of the EZO-DO dissolved oxygen circuit.
pub const DO_ADDR: u16 = 0x61;

// Conversion time for a single reading; the datasheet says 600 ms covers
// every EZO circuit.
const READ_DELAY: Duration = Duration::from_millis(600);
const INFO_DELAY: Duration = Duration::from_millis(300);

pub(crate) fn rtd_outputs() -> Vec<OutputSpec> {
    vec![OutputSpec::new(
        "Atlas_Temp",
        "temperature",
        "degreeCelsius",
        3,
    )]
}

pub(crate) fn ec_outputs() -> Vec<OutputSpec> {
    vec![
        OutputSpec::new(
            "Atlas_Conductivity",
            "electricalConductivity",
            "microsiemenPerCentimeter",
            1,
        ),
        OutputSpec::new("Atlas_TDS", "solidsTotalDissolved", "milligramPerLiter", 0),
        OutputSpec::new("Atlas_Salinity", "salinity", "practicalSalinityUnit", 2),
        OutputSpec::new("Atlas_SpecificGravity", "specificGravity", "dimensionless", 3),
    ]
}

pub(crate) fn ph_outputs() -> Vec<OutputSpec> {
    vec![OutputSpec::new("Atlas_pH", "pH", "pH", 3)]
}

pub(crate) fn do_outputs() -> Vec<OutputSpec> {
    vec![
        OutputSpec::new("Atlas_DOconc", "oxygenDissolved", "milligramPerLiter", 2),
        OutputSpec::new(
            "Atlas_DOpct",
            "oxygenDissolvedPercentOfSaturation",
            "percent",
            1,
        ),
    ]
}

/// One EZO circuit on the I2C bus.
struct EzoCircuit {
    bus: u8,
    addr: u16,
    #[cfg(feature = "hardware")]
    dev: Option<i2cdev::linux::LinuxI2CDevice>,
}

impl EzoCircuit {
    fn new(bus: u8, addr: u16) -> Self {
        Self {
            bus,
            addr,
            #[cfg(feature = "hardware")]
            dev: None,
        }
    }

    #[cfg(feature = "hardware")]
    fn device(&mut self) -> Result<&mut i2cdev::linux::LinuxI2CDevice> {
        use i2cdev::linux::LinuxI2CDevice;

        match self.dev {
            Some(ref mut dev) => Ok(dev),
            None => {
                let path = format!("/dev/i2c-{}", self.bus);
                let dev = LinuxI2CDevice::new(&path, self.addr)?;
                Ok(self.dev.insert(dev))
            }
        }
    }

    #[cfg(feature = "hardware")]
    fn command(&mut self, cmd: &[u8]) -> Result<()> {
        use i2cdev::core::I2CDevice;

        self.device()?.write(cmd)?;
        Ok(())
    }

    #[cfg(feature = "hardware")]
    fn read_raw(&mut self) -> Result<Vec<u8>> {
        use i2cdev::core::I2CDevice;

        let mut buf = [0u8; 40];
        self.device()?.read(&mut buf)?;
        anyhow::ensure!(buf[0] == 1, "EZO circuit 0x{:02x} response code {}", self.addr, buf[0]);
        let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
        Ok(buf[1..end].to_vec())
    }

    #[cfg(feature = "hardware")]
    fn ack(&mut self) -> Result<()> {
        self.read_raw().map(|_| ())
    }

    #[cfg(feature = "hardware")]
    fn response(&mut self) -> Result<Vec<f64>> {
        let raw = self.read_raw()?;
        let text = std::str::from_utf8(&raw)?;
        text.split(',')
            .map(|field| {
                field
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("bad EZO field {field:?}: {e}"))
            })
            .collect()
    }

    #[cfg(not(feature = "hardware"))]
    fn command(&mut self, _cmd: &[u8]) -> Result<()> {
        anyhow::bail!("built without the `hardware` feature")
    }

    #[cfg(not(feature = "hardware"))]
    fn ack(&mut self) -> Result<()> {
        anyhow::bail!("built without the `hardware` feature")
    }

    #[cfg(not(feature = "hardware"))]
    fn response(&mut self) -> Result<Vec<f64>> {
        anyhow::bail!("built without the `hardware` feature")
    }

    async fn measure(&mut self) -> Result<Vec<f64>> {
        self.command(b"R")?;
        tokio::time::sleep(READ_DELAY).await;
        self.response()
    }
}

/// An Atlas Scientific EZO circuit attached to the station.
pub struct AtlasSensor {
    id: String,
    kind: SensorKind,
    status: SensorStatus,
    circuit: EzoCircuit,
    outputs: Vec<OutputSpec>,
    values: Vec<f64>,
}

impl AtlasSensor {
    fn new(id: &str, kind: SensorKind, bus: u8, addr: u16, outputs: Vec<OutputSpec>) -> Self {
        let values = vec![BAD_READING; outputs.len()];
        Self {
            id: id.to_string(),
            kind,
            status: SensorStatus::Idle,
            circuit: EzoCircuit::new(bus, addr),
            outputs,
            values,
        }
    }

    /// EZO-RTD water temperature circuit at its factory address.
    pub fn rtd(id: &str, bus: u8) -> Self {
        Self::new(id, SensorKind::AtlasRtd, bus, RTD_ADDR, rtd_outputs())
    }

    /// EZO-EC conductivity circuit; expects all four output parameters
    /// (EC, TDS, salinity, specific gravity) enabled on the circuit.
    pub fn ec(id: &str, bus: u8) -> Self {
        Self::new(id, SensorKind::AtlasEc, bus, EC_ADDR, ec_outputs())
    }

    /// EZO-pH circuit at its factory address.
    pub fn ph(id: &str, bus: u8) -> Self {
        Self::new(id, SensorKind::AtlasPh, bus, PH_ADDR, ph_outputs())
    }

    /// EZO-DO dissolved oxygen circuit; expects both mg/L and % saturation
    /// outputs enabled.
    pub fn dissolved_oxygen(id: &str, bus: u8) -> Self {
        Self::new(id, SensorKind::AtlasDo, bus, DO_ADDR, do_outputs())
    }

    async fn probe(&mut self) -> Result<()> {
        // "i" asks for the device info string; a well-formed response proves
        // the circuit is on the bus.
        self.circuit.command(b"i")?;
        tokio::time::sleep(INFO_DELAY).await;
        self.circuit.ack()
    }
}

#[async_trait]
impl Sensor for AtlasSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn status(&self) -> SensorStatus {
        self.status
    }

    fn outputs(&self) -> &[OutputSpec] {
        &self.outputs
    }

    async fn initialize(&mut self) -> Result<()> {
        match self.probe().await {
            Ok(()) => {
                self.status = SensorStatus::Ready;
                Ok(())
            }
            Err(e) => {
                self.status = SensorStatus::Fault;
                Err(e)
            }
        }
    }

    async fn sample(&mut self) -> Result<()> {
        for v in &mut self.values {
            *v = BAD_READING;
        }
        let values = self.circuit.measure().await;
        match values {
            Ok(v) if v.len() == self.outputs.len() => {
                self.values = v;
                self.status = SensorStatus::Ready;
                Ok(())
            }
            Ok(v) => {
                self.status = SensorStatus::Fault;
                anyhow::bail!(
                    "{}: expected {} fields, circuit returned {}",
                    self.id,
                    self.outputs.len(),
                    v.len()
                )
            }
            Err(e) => {
                self.status = SensorStatus::Fault;
                Err(e)
            }
        }
    }

    fn value(&self, code: &str) -> f64 {
        self.outputs
            .iter()
            .position(|o| o.code == code)
            .map(|i| self.values[i])
            .unwrap_or(BAD_READING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[cfg(not(feature = "hardware"))]
    async fn sample_without_hardware_leaves_sentinels() {
        let mut rtd = AtlasSensor::rtd("rtd-1", 1);
        assert!(rtd.sample().await.is_err());
        assert_eq!(rtd.value("Atlas_Temp"), BAD_READING);
        assert_eq!(rtd.status(), SensorStatus::Fault);
    }

    #[test]
    fn ec_exposes_four_outputs() {
        let ec = AtlasSensor::ec("ec-1", 1);
        let codes: Vec<_> = ec.outputs().iter().map(|o| o.code.as_str()).collect();
        assert_eq!(
            codes,
            [
                "Atlas_Conductivity",
                "Atlas_TDS",
                "Atlas_Salinity",
                "Atlas_SpecificGravity"
            ]
        );
    }
}
