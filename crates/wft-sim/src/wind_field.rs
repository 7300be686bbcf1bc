//! ---
//! wft_section: "11-simulation"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Simulation runtime helpers and scenario engines."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::f64::consts::PI;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use wft_common::config::WindFieldConfig;

use crate::{Result, SimError};

const HOURS_PER_DAY: f64 = 24.0;

/// Free-stream wind at one point and instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    pub speed_mps: f64,
    /// Direction of flow in `[0, 360)`.
    pub direction_deg: f64,
}

/// Diurnal cycle plus a linear spatial bias plus Gaussian noise.
#[derive(Debug, Clone)]
pub struct WindField {
    params: WindFieldConfig,
    speed_noise: Normal<f64>,
    dir_noise: Normal<f64>,
}

impl WindField {
    /// Noise standard deviations must be finite and non-negative.
    pub fn new(params: WindFieldConfig) -> Result<Self> {
        for (name, std_dev) in [
            ("noise_std_mps", params.noise_std_mps),
            ("dir_noise_std_deg", params.dir_noise_std_deg),
        ] {
            if !std_dev.is_finite() || std_dev < 0.0 {
                return Err(SimError::invalid(
                    name,
                    format!("must be finite and non-negative (got {std_dev})"),
                ));
            }
        }
        Ok(Self {
            speed_noise: Normal::new(0.0, params.noise_std_mps)?,
            dir_noise: Normal::new(0.0, params.dir_noise_std_deg)?,
            params,
        })
    }

    /// Draws speed noise first, then direction noise.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, t_seconds: f64, x_m: f64, y_m: f64) -> WindSample {
        let p = &self.params;
        let daily = (2.0 * PI * (t_seconds / 3600.0) / HOURS_PER_DAY).sin();
        let spatial = p.spatial_variation_mps * (0.0005 * x_m - 0.0003 * y_m);
        let speed = p.base_speed_mps
            + p.daily_variation_mps * daily
            + spatial
            + self.speed_noise.sample(rng);
        let direction = p.base_dir_deg + self.dir_noise.sample(rng);
        WindSample {
            speed_mps: speed.max(0.0),
            direction_deg: normalize_direction(direction),
        }
    }
}

fn normalize_direction(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
