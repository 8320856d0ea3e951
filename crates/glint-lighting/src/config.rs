use glint_geom::Rgb;
use serde::Deserialize;

use crate::gamma::DEFAULT_GAMMA;

pub const MAX_THREAD_COUNT: usize = 32;
const DEFAULT_MAX_THREADS: usize = 16;

/// Smallest decay baseline accepted; keeps `ln` finite in the range math.
pub const MIN_DECAY: f32 = 0.001;
/// Largest decay baseline; guarantees light dies out within `MAX_LIGHT_RANGE`.
pub const MAX_DECAY_MULT: f32 = 0.95;

/// Raw per-medium decay factors supplied by the host each frame.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MediumDecays {
    pub air: f32,
    pub solid: f32,
    #[serde(with = "rgb_triple")]
    pub water: Rgb,
    #[serde(with = "rgb_triple")]
    pub honey: Rgb,
}

impl Default for MediumDecays {
    fn default() -> Self {
        Self {
            air: 0.91,
            solid: 0.56,
            water: Rgb::new(0.88, 0.96, 1.015),
            honey: Rgb::new(0.75, 0.7, 0.6),
        }
    }
}

impl MediumDecays {
    /// Same factor for every medium and channel.
    pub fn uniform(v: f32) -> Self {
        Self {
            air: v,
            solid: v,
            water: Rgb::splat(v),
            honey: Rgb::splat(v),
        }
    }
}

/// Tunable inputs of one propagation call.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PropagateParams {
    /// Worker count; 0 picks `clamp(logical cores, 1, 16)`.
    pub thread_count: usize,
    pub absorption_exponent: f32,
    pub exit_loss_fraction: f32,
    pub use_temporal_budgeting: bool,
    pub simulate_global_illumination: bool,
    pub gi_multiplier: f32,
    pub non_solid_treated_opaque: bool,
    pub gamma_correct: bool,
    pub gamma: f32,
    /// Screenshot quality: fixed low brightness cutoff.
    pub camera_mode: bool,
    pub decays: MediumDecays,
}

impl Default for PropagateParams {
    fn default() -> Self {
        Self {
            thread_count: default_thread_count(),
            absorption_exponent: 1.0,
            exit_loss_fraction: 0.5,
            use_temporal_budgeting: true,
            simulate_global_illumination: false,
            gi_multiplier: 0.5,
            non_solid_treated_opaque: false,
            gamma_correct: false,
            gamma: DEFAULT_GAMMA,
            camera_mode: false,
            decays: MediumDecays::default(),
        }
    }
}

impl PropagateParams {
    /// Clamps every field into its supported range.
    pub fn sanitized(&self) -> Self {
        let mut p = self.clone();
        p.thread_count = match p.thread_count {
            0 => default_thread_count(),
            n => n.min(MAX_THREAD_COUNT),
        };
        p.absorption_exponent = clamp_or(p.absorption_exponent, 0.5, 2.0, 1.0);
        p.exit_loss_fraction = clamp_or(p.exit_loss_fraction, 0.0, 1.0, 0.5);
        p.gi_multiplier = clamp_or(p.gi_multiplier, 0.0, 1.0, 0.5);
        p.gamma = clamp_or(p.gamma, 1.6, 2.8, DEFAULT_GAMMA);
        p.decays.air = clamp_or(p.decays.air, 0.0, 1.0, 0.91);
        p.decays.solid = clamp_or(p.decays.solid, 0.0, 1.0, 0.56);
        p.decays.water = p.decays.water.map(|v| clamp_or(v, 0.0, 2.0, 1.0));
        p.decays.honey = p.decays.honey.map(|v| clamp_or(v, 0.0, 2.0, 1.0));
        p
    }

    /// Multiplier applied once when light leaves an opaque tile.
    pub fn exit_multiplier(&self) -> f32 {
        1.0 - self.exit_loss_fraction
    }
}

/// `clamp(logical cores, 1, 16)`.
pub fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, DEFAULT_MAX_THREADS)
}

fn clamp_or(v: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if v.is_nan() { fallback } else { v.clamp(lo, hi) }
}

mod rgb_triple {
    use glint_geom::Rgb;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Rgb, D::Error> {
        let [r, g, b] = <[f32; 3]>::deserialize(d)?;
        Ok(Rgb::new(r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_out_of_range() {
        let p = PropagateParams {
            thread_count: 500,
            absorption_exponent: 9.0,
            exit_loss_fraction: -1.0,
            gi_multiplier: f32::NAN,
            gamma: 0.1,
            ..PropagateParams::default()
        }
        .sanitized();
        assert_eq!(p.thread_count, MAX_THREAD_COUNT);
        assert_eq!(p.absorption_exponent, 2.0);
        assert_eq!(p.exit_loss_fraction, 0.0);
        assert_eq!(p.gi_multiplier, 0.5);
        assert_eq!(p.gamma, 1.6);

        let auto = PropagateParams { thread_count: 0, ..PropagateParams::default() }.sanitized();
        assert!((1..=16).contains(&auto.thread_count));
    }

    #[test]
    fn exit_multiplier_ignores_gi() {
        let mut p = PropagateParams { exit_loss_fraction: 0.25, ..PropagateParams::default() };
        assert_eq!(p.exit_multiplier(), 0.75);
        p.simulate_global_illumination = true;
        assert_eq!(p.exit_multiplier(), 0.75);
    }
}
