//! ---
//! wft_section: "11-simulation"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Simulation runtime helpers and scenario engines."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use wft_common::config::WakeConfig;

use crate::layout::Turbine;

/// Gaussian-crosswind, exponentially decaying wake deficit.
///
/// Each upstream turbine removes `strength * exp(-cw^2 / 2 sigma^2) *
/// exp(-dw / decay)` of the incoming speed and the retained fractions
/// multiply. Evaluating one turbine scans the whole farm, so a full farm step
/// costs O(n^2) in the turbine count.
#[derive(Debug, Clone)]
pub struct WakeModel {
    params: WakeConfig,
}

impl WakeModel {
    pub fn new(params: WakeConfig) -> Self {
        Self { params }
    }

    /// Product of `(1 - loss)` over every turbine strictly upwind of `target`.
    pub fn retained_fraction(&self, target: &Turbine, direction_deg: f64, turbines: &[Turbine]) -> f64 {
        let theta = direction_deg.to_radians();
        let (ux, uy) = (theta.cos(), theta.sin());
        let two_sigma_sq = 2.0 * self.params.crosswind_sigma_m.powi(2);

        turbines
            .iter()
            .filter(|source| source.turbine_id != target.turbine_id)
            .filter_map(|source| {
                let dx = target.x_m - source.x_m;
                let dy = target.y_m - source.y_m;
                let downwind = dx * ux + dy * uy;
                if downwind <= 0.0 {
                    return None;
                }
                let crosswind = (-dx * uy + dy * ux).abs();
                let loss = self.params.wake_strength
                    * (-(crosswind * crosswind) / two_sigma_sq).exp()
                    * (-downwind / self.params.decay_length_m).exp();
                Some(1.0 - loss)
            })
            .product()
    }

    /// Effective speed at `target`, never negative.
    pub fn effective_speed(
        &self,
        free_speed_mps: f64,
        direction_deg: f64,
        target: &Turbine,
        turbines: &[Turbine],
    ) -> f64 {
        (free_speed_mps * self.retained_fraction(target, direction_deg, turbines)).max(0.0)
    }
}
