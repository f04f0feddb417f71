// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Sensor capability set and the station's channel table

mod array;
mod atlas;
mod board;
mod derived;
mod rtc;
mod simulator;
mod traits;

pub use array::{Channel, Column, Observation, SensorArray};
pub use atlas::AtlasSensor;
pub use board::{BoardSensor, SupplySource, BATTERY_OUTPUT};
pub use derived::CalculatedChannel;
pub use rtc::Ds3231Sensor;
pub use simulator::SensorSimulator;
pub use traits::{OutputSpec, Sensor, SensorKind, SensorStatus};

/// Reserved "measurement not available" value.
///
/// Every output reports this before its first measurement and after a failed
/// one. It is a large-magnitude negative number so it can never collide with
/// a real reading, but downstream consumers cannot tell a misread apart from
/// an instrument genuinely reporting off-scale low.
pub const BAD_READING: f64 = -9999.0;
