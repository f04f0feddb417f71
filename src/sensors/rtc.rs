// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Maxim DS3231 real-time clock as a temperature sensor
//!
//! The station's RTC exposes its die temperature, which tracks enclosure
//! temperature closely enough to be worth logging.

use anyhow::Result;
use async_trait::async_trait;

use super::{OutputSpec, Sensor, SensorKind, SensorStatus, BAD_READING};

/// Factory I2C address of the DS3231.
pub const DS3231_ADDR: u16 = 0x68;

// Temperature registers: MSB is a signed whole degree count, the top two
// bits of the LSB add 0.25 degree steps.
const REG_TEMP_MSB: u8 = 0x11;
const REG_TEMP_LSB: u8 = 0x12;

pub(crate) fn rtc_outputs() -> Vec<OutputSpec> {
    vec![OutputSpec::new(
        "DS3231_Temp",
        "temperatureDatalogger",
        "degreeCelsius",
        2,
    )]
}

/// DS3231 die temperature sensor.
pub struct Ds3231Sensor {
    id: String,
    bus: u8,
    status: SensorStatus,
    outputs: Vec<OutputSpec>,
    temperature: f64,
}

impl Ds3231Sensor {
    /// DS3231 on the given I2C bus.
    pub fn new(id: &str, bus: u8) -> Self {
        Self {
            id: id.to_string(),
            bus,
            status: SensorStatus::Idle,
            outputs: rtc_outputs(),
            temperature: BAD_READING,
        }
    }

    #[cfg(feature = "hardware")]
    fn read_temperature(&mut self) -> Result<f64> {
        use i2cdev::core::I2CDevice;
        use i2cdev::linux::LinuxI2CDevice;

        let path = format!("/dev/i2c-{}", self.bus);
        let mut dev = LinuxI2CDevice::new(&path, DS3231_ADDR)?;
        let msb = dev.smbus_read_byte_data(REG_TEMP_MSB)? as i8;
        let lsb = dev.smbus_read_byte_data(REG_TEMP_LSB)? >> 6;
        Ok(msb as f64 + 0.25 * lsb as f64)
    }

    #[cfg(not(feature = "hardware"))]
    fn read_temperature(&mut self) -> Result<f64> {
        anyhow::bail!("built without the `hardware` feature")
    }
}

#[async_trait]
impl Sensor for Ds3231Sensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Rtc
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
        self.temperature = BAD_READING;
        match self.read_temperature() {
            Ok(t) => {
                self.temperature = t;
                self.status = SensorStatus::Ready;
                Ok(())
            }
            Err(e) => {
                self.status = SensorStatus::Fault;
                Err(e)
            }
        }
    }

    fn value(&self, code: &str) -> f64 {
        if code == "DS3231_Temp" {
            self.temperature
        } else {
            BAD_READING
        }
    }
}
