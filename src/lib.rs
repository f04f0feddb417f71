// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! hydrolog - battery-aware environmental data logger
//!
//! Drives a cellular-connected water quality station: a set of Atlas
//! Scientific EZO circuits plus board housekeeping sensors, each output
//! bound to a unique channel UUID, sampled on a fixed interval and recorded
//! to removable storage and an EnviroDIY-style data portal.
//!
//! The station runs on battery, so every wake cycle is gated on supply
//! voltage: below the low threshold the station only sleeps, between the
//! thresholds it samples and logs locally, and at or above the high
//! threshold it samples, logs, and publishes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     DataLogger                       │
//! ├──────────────────────────────────────────────────────┤
//! │  ┌─────────┐   ┌──────────┐   ┌─────────┐  ┌──────┐  │
//! │  │ Battery │ → │ Sampling │ → │ Sensor  │→ │ Log  │  │
//! │  │ Monitor │   │  Policy  │   │  Array  │  │ File │  │
//! │  └─────────┘   └──────────┘   └─────────┘  └──────┘  │
//! │                      ↓                        ↓      │
//! │                ┌───────────┐           ┌───────────┐ │
//! │                │   Clock   │           │ Publisher │ │
//! │                └───────────┘           └───────────┘ │
//! └──────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod clock;
pub mod config;
pub mod logger;
pub mod power;
pub mod publish;
pub mod sensors;
pub mod storage;

// Re-exports for convenience
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use logger::DataLogger;
pub use power::{BatteryMonitor, CycleAction, OperatingBand, PowerThresholds};
pub use publish::{HttpPublisher, Publisher};
pub use sensors::{Sensor, SensorArray, SensorKind, BAD_READING};
pub use storage::LogFile;

/// hydrolog version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// hydrolog name
pub const NAME: &str = "hydrolog";
