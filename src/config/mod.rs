// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Configuration module
//!
//! The whole station is wired from one TOML file: identity, logging
//! interval, power thresholds, sensor bus, publisher credentials, and the
//! channel table binding portal UUIDs to sensor outputs.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::uuid;

use crate::clock::record_timezone;
use crate::power::PowerThresholds;
use crate::publish::PublishConfig;
use crate::sensors::Channel;

/// Default station sensor identifiers, matching the default channel table.
pub const BOARD_SENSOR: &str = "board";
/// DS3231 RTC sensor id.
pub const RTC_SENSOR: &str = "rtc-1";
/// EZO-RTD sensor id.
pub const RTD_SENSOR: &str = "rtd-1";
/// EZO-EC sensor id.
pub const EC_SENSOR: &str = "ec-1";
/// EZO-pH sensor id.
pub const PH_SENSOR: &str = "ph-1";
/// EZO-DO sensor id.
pub const DO_SENSOR: &str = "do-1";

/// Main station configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Human-readable station name
    pub station_name: String,

    /// Logger ID; becomes the log file name prefix
    pub logger_id: String,

    /// Removable-storage mount point for log files
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Simulated sensors instead of hardware
    pub demo_mode: bool,

    /// Sampling schedule
    pub logging: LoggingConfig,

    /// Battery thresholds gating each cycle
    pub power: PowerThresholds,

    /// Sensor bus wiring
    pub sensors: SensorsConfig,

    /// Portal publishing
    pub publish: PublishConfig,

    /// Channel table: one portal UUID per logged sensor output
    pub channels: Vec<Channel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            station_name: "hydrolog station".to_string(),
            logger_id: "0001".to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            demo_mode: true,
            logging: LoggingConfig::default(),
            power: PowerThresholds::default(),
            sensors: SensorsConfig::default(),
            publish: PublishConfig::default(),
            channels: default_channels(),
        }
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load, or write the defaults out and return them.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject configurations the station cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.power.validate()?;
        record_timezone(self.logging.timezone_hours)?;
        ensure!(
            self.logging.interval_mins >= 1,
            "logging interval must be at least one minute"
        );
        ensure!(!self.channels.is_empty(), "channel table is empty");
        if self.publish.enabled {
            ensure!(
                !self.publish.registration_token.is_empty(),
                "publishing enabled without a registration token"
            );
            ensure!(
                !self.publish.sampling_feature.is_nil(),
                "publishing enabled without a sampling feature UUID"
            );
        }
        Ok(())
    }

    /// Get configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("hydrolog"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Sampling schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minutes between wake cycles
    pub interval_mins: u32,

    /// Whole-hour offset for record timestamps (standard time, never DST)
    pub timezone_hours: i8,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            interval_mins: 5,
            timezone_hours: -6,
        }
    }
}

/// Sensor bus wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorsConfig {
    /// I2C bus number the EZO circuits and RTC sit on
    pub i2c_bus: u8,

    /// Power-supply sysfs attribute for the battery voltage, microvolts
    pub supply_path: Option<PathBuf>,

    /// Derive temperature-compensated specific conductance
    pub specific_conductance: bool,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            supply_path: None,
            specific_conductance: true,
        }
    }
}

/// The default station channel table: board housekeeping, RTC temperature,
/// and the four-probe Atlas water chemistry suite.
pub fn default_channels() -> Vec<Channel> {
    vec![
        Channel::new(uuid!("7a1d4b9e-30c2-4f11-9d8a-5f6e21c0b3a7"), BOARD_SENSOR, "Board_SampleNum"),
        Channel::new(uuid!("1c9e8f02-64d5-4a3b-b7c1-08f3a92d6e54"), BOARD_SENSOR, "Board_FreeRam"),
        Channel::new(uuid!("e3b87c11-2a6f-45d0-8e92-c41b7d90f5a8"), BOARD_SENSOR, "Board_Batt"),
        Channel::new(uuid!("52f0d6a9-b8e3-47c4-a1d7-3e92c85f60b1"), RTC_SENSOR, "DS3231_Temp"),
        Channel::new(uuid!("9d47e2c8-10b5-4f6a-bc39-7a58d1e4f203"), RTD_SENSOR, "Atlas_Temp"),
        Channel::new(uuid!("c85a13f7-49d0-4b2e-9f61-d2073c8ae9b5"), EC_SENSOR, "Atlas_Conductivity"),
        Channel::new(uuid!("3f92b0d4-7c18-4e65-a8f3-51c9e26d70ab"), EC_SENSOR, "Atlas_TDS"),
        Channel::new(uuid!("b60e75a2-d391-4c08-bd54-9f12a8c3e7d6"), EC_SENSOR, "Atlas_Salinity"),
        Channel::new(uuid!("04c8f1b6-5e27-4d93-8a70-e65b3d91c2f4"), EC_SENSOR, "Atlas_SpecificGravity"),
        Channel::new(uuid!("d1395e80-a7c4-42f6-9b28-06e7f4a1d5c9"), PH_SENSOR, "Atlas_pH"),
        Channel::new(uuid!("68b2d9f3-0c51-4a87-be04-27d9c6e1f0a3"), DO_SENSOR, "Atlas_DOconc"),
        Channel::new(uuid!("f7043a6d-81b9-4ce2-95d8-b3a1f82c60e7"), DO_SENSOR, "Atlas_DOpct"),
    ]
}

/// Default channel UUID for derived specific conductance.
pub const SPECIFIC_CONDUCTANCE_CHANNEL: uuid::Uuid = uuid!("a92c67e1-4f05-4b38-8dc2-71e0b5f9d348");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn toml_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.logger_id, config.logger_id);
        assert_eq!(back.channels.len(), config.channels.len());
        assert_eq!(back.power.low, config.power.low);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let mut config = Config::default();
        config.power = PowerThresholds { low: 3.6, high: 3.4 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn publishing_requires_credentials() {
        let mut config = Config::default();
        config.publish.enabled = true;
        assert!(config.validate().is_err());

        config.publish.registration_token = "token".into();
        config.publish.sampling_feature = uuid::Uuid::new_v4();
        config.validate().unwrap();
    }

    #[test]
    fn load_or_create_writes_defaults() {
        let dir = std::env::temp_dir().join(format!(
            "hydrolog-config-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        let path = dir.join("config.toml");
        let config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        let again = Config::load_or_create(&path).unwrap();
        assert_eq!(again.logger_id, config.logger_id);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
