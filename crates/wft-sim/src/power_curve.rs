//! ---
//! wft_section: "11-simulation"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Simulation runtime helpers and scenario engines."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use wft_common::config::PowerCurveConfig;
use wft_schema::TurbineStatus;

use crate::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerOutput {
    pub power_kw: f64,
    pub status: TurbineStatus,
}

/// Piecewise cubic power curve between cut-in and rated speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerCurve {
    cut_in_mps: f64,
    rated_mps: f64,
    cut_out_mps: f64,
}

impl PowerCurve {
    pub fn new(config: PowerCurveConfig) -> Result<Self> {
        if !(config.cut_in_mps >= 0.0
            && config.cut_in_mps < config.rated_mps
            && config.rated_mps < config.cut_out_mps)
        {
            return Err(SimError::invalid(
                "power curve",
                format!(
                    "expected 0 <= cut_in < rated < cut_out, got {} / {} / {}",
                    config.cut_in_mps, config.rated_mps, config.cut_out_mps
                ),
            ));
        }
        Ok(Self {
            cut_in_mps: config.cut_in_mps,
            rated_mps: config.rated_mps,
            cut_out_mps: config.cut_out_mps,
        })
    }

    /// Output at `speed_mps` for a turbine rated at `rated_power_kw`.
    pub fn output(&self, speed_mps: f64, rated_power_kw: f64) -> PowerOutput {
        if speed_mps >= self.cut_out_mps {
            return PowerOutput {
                power_kw: 0.0,
                status: TurbineStatus::CutOut,
            };
        }
        if speed_mps < self.cut_in_mps {
            return PowerOutput {
                power_kw: 0.0,
                status: TurbineStatus::Stopped,
            };
        }
        let power_kw = if speed_mps < self.rated_mps {
            let x = (speed_mps - self.cut_in_mps) / (self.rated_mps - self.cut_in_mps);
            rated_power_kw * x.powi(3)
        } else {
            rated_power_kw
        };
        PowerOutput {
            power_kw,
            status: TurbineStatus::Running,
        }
    }
}

impl Default for PowerCurve {
    fn default() -> Self {
        let config = PowerCurveConfig::default();
        Self {
            cut_in_mps: config.cut_in_mps,
            rated_mps: config.rated_mps,
            cut_out_mps: config.cut_out_mps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATED: f64 = 2000.0;

    #[test]
    fn thresholds_select_status() {
        let curve = PowerCurve::default();
        assert_eq!(curve.output(2.99, RATED).status, TurbineStatus::Stopped);
        assert_eq!(curve.output(2.99, RATED).power_kw, 0.0);

        let at_cut_in = curve.output(3.0, RATED);
        assert_eq!(at_cut_in.status, TurbineStatus::Running);
        assert_eq!(at_cut_in.power_kw, 0.0);

        assert_eq!(curve.output(12.0, RATED).power_kw, RATED);
        assert_eq!(curve.output(24.99, RATED).power_kw, RATED);

        let at_cut_out = curve.output(25.0, RATED);
        assert_eq!(at_cut_out.status, TurbineStatus::CutOut);
        assert_eq!(at_cut_out.power_kw, 0.0);
    }

    #[test]
    fn partial_load_is_cubic() {
        let curve = PowerCurve::default();
        let mid = curve.output(7.5, RATED);
        assert!((mid.power_kw - RATED * 0.125).abs() < 1e-9);

        let mut last = 0.0;
        for tenth in 30..120 {
            let p = curve.output(tenth as f64 / 10.0, RATED).power_kw;
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let config = PowerCurveConfig {
            cut_in_mps: 12.0,
            rated_mps: 3.0,
            cut_out_mps: 25.0,
        };
        assert!(PowerCurve::new(config).is_err());
    }
}
