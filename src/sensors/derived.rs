// Copyright (c) 2026 hydrolog contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/hydrolog/hydrolog-rs

//! Channels computed from other channels' sampled values

use uuid::Uuid;

use super::{OutputSpec, BAD_READING};

type ComputeFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// A published channel whose value is derived from other sensor outputs
/// within the same cycle, rather than measured directly.
pub struct CalculatedChannel {
    /// Publish identifier for the derived value
    pub uuid: Uuid,
    /// Descriptor for the derived output
    pub spec: OutputSpec,
    inputs: Vec<String>,
    compute: ComputeFn,
}

impl CalculatedChannel {
    /// Derived channel over the named input output codes.
    pub fn new(uuid: Uuid, spec: OutputSpec, inputs: &[&str], compute: ComputeFn) -> Self {
        Self {
            uuid,
            spec,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            compute,
        }
    }

    /// Evaluate against this cycle's sampled values. A sentinel in any input
    /// propagates straight through.
    pub(crate) fn evaluate(&self, lookup: &dyn Fn(&str) -> f64) -> f64 {
        let inputs: Vec<f64> = self.inputs.iter().map(|code| lookup(code)).collect();
        if inputs.iter().any(|v| *v == BAD_READING) {
            return BAD_READING;
        }
        (self.compute)(&inputs)
    }

    /// Temperature-compensated specific conductance at 25 degrees Celsius.
    ///
    /// Linearized correction coefficient of 0.019 per degree, after
    /// Hayashi (2004), Environ Monit Assess 96:119-128.
    pub fn specific_conductance(uuid: Uuid, temp_code: &str, cond_code: &str) -> Self {
        Self::new(
            uuid,
            OutputSpec::new(
                "Atlas_SpCond",
                "specificConductance",
                "microsiemenPerCentimeter",
                0,
            ),
            &[temp_code, cond_code],
            Box::new(|v| v[1] / (1.0 + 0.019 * (v[0] - 25.0))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp_cond() -> CalculatedChannel {
        CalculatedChannel::specific_conductance(Uuid::new_v4(), "Atlas_Temp", "Atlas_Conductivity")
    }

    #[test]
    fn compensates_to_reference_temperature() {
        let ch = sp_cond();
        let lookup = |code: &str| match code {
            "Atlas_Temp" => 25.0,
            "Atlas_Conductivity" => 1400.0,
            _ => BAD_READING,
        };
        // At the reference temperature the correction is the identity.
        assert!((ch.evaluate(&lookup) - 1400.0).abs() < 1e-9);
    }

    #[test]
    fn cold_water_reads_higher_after_compensation() {
        let ch = sp_cond();
        let lookup = |code: &str| match code {
            "Atlas_Temp" => 10.0,
            "Atlas_Conductivity" => 1000.0,
            _ => BAD_READING,
        };
        let v = ch.evaluate(&lookup);
        assert!(v > 1000.0, "expected upward correction, got {v}");
    }

    #[test]
    fn sentinel_input_propagates() {
        let ch = sp_cond();
        let lookup = |code: &str| match code {
            "Atlas_Conductivity" => 1000.0,
            _ => BAD_READING,
        };
        assert_eq!(ch.evaluate(&lookup), BAD_READING);
    }
}
