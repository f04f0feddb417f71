// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Sensor simulator for demo/testing

use std::f64::consts::PI;

use anyhow::Result;
use async_trait::async_trait;
use rand::prelude::*;
use rand_distr::Normal;

use super::{atlas, rtc, OutputSpec, Sensor, SensorKind, SensorStatus, BAD_READING};

/// Simulates plausible water-chemistry readings for a station with no
/// hardware attached. Exposes the same output codes as the real sensor of
/// the mimicked kind, so channel bindings are identical in demo mode.
pub struct SensorSimulator {
    id: String,
    kind: SensorKind,
    status: SensorStatus,
    outputs: Vec<OutputSpec>,
    values: Vec<f64>,
    rng: StdRng,

    // Simulation state
    cycle: u64,
    drift: f64,
}

impl SensorSimulator {
    /// Simulator mimicking the given sensor kind.
    pub fn new(id: &str, kind: SensorKind) -> Self {
        let outputs = match kind {
            SensorKind::Rtc => rtc::rtc_outputs(),
            SensorKind::AtlasRtd => atlas::rtd_outputs(),
            SensorKind::AtlasEc => atlas::ec_outputs(),
            SensorKind::AtlasPh => atlas::ph_outputs(),
            SensorKind::AtlasDo => atlas::do_outputs(),
            SensorKind::Board => super::board::board_outputs(),
        };
        let values = vec![BAD_READING; outputs.len()];
        Self {
            id: id.to_string(),
            kind,
            status: SensorStatus::Idle,
            outputs,
            values,
            rng: StdRng::from_entropy(),
            cycle: 0,
            drift: 0.0,
        }
    }

    fn noise(&mut self, sigma: f64) -> f64 {
        self.rng.sample::<f64, _>(Normal::new(0.0, sigma).unwrap())
    }

    fn generate(&mut self) -> Vec<f64> {
        self.cycle += 1;
        self.drift += self.rng.gen_range(-0.002..0.002);
        // One simulated day every 288 five-minute cycles.
        let diurnal = (2.0 * PI * self.cycle as f64 / 288.0).sin();

        match self.kind {
            SensorKind::Rtc => vec![21.0 + 2.0 * diurnal + self.drift + self.noise(0.15)],
            SensorKind::AtlasRtd => vec![14.0 + 1.5 * diurnal + self.drift + self.noise(0.05)],
            SensorKind::AtlasEc => {
                let cond = 1200.0 + 60.0 * self.drift + 15.0 * diurnal + self.noise(8.0);
                let sal = cond * 0.00055;
                vec![cond, cond * 0.55, sal, 1.0 + sal * 0.0008]
            }
            SensorKind::AtlasPh => vec![7.8 + 0.2 * diurnal + self.noise(0.03)],
            SensorKind::AtlasDo => {
                let conc = 9.1 - 0.6 * diurnal + self.noise(0.15);
                vec![conc, conc / 9.6 * 100.0]
            }
            SensorKind::Board => vec![self.cycle as f64, 52_000.0, 3.9],
        }
    }
}

#[async_trait]
impl Sensor for SensorSimulator {
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
        self.status = SensorStatus::Ready;
        Ok(())
    }

    async fn sample(&mut self) -> Result<()> {
        self.values = self.generate();
        self.status = SensorStatus::Ready;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_ec_fills_all_outputs() {
        let mut ec = SensorSimulator::new("ec-1", SensorKind::AtlasEc);
        ec.sample().await.unwrap();
        for spec in ec.outputs().to_vec() {
            assert_ne!(ec.value(&spec.code), BAD_READING, "{} unset", spec.code);
        }
    }

    #[tokio::test]
    async fn simulated_ph_stays_in_range() {
        let mut ph = SensorSimulator::new("ph-1", SensorKind::AtlasPh);
        for _ in 0..50 {
            ph.sample().await.unwrap();
            let v = ph.value("Atlas_pH");
            assert!((6.0..10.0).contains(&v), "implausible pH {v}");
        }
    }
}
