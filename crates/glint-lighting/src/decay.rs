use glint_grid::Medium;

use crate::config::{MAX_DECAY_MULT, MIN_DECAY, PropagateParams};
use crate::gamma::GammaConverter;
use crate::{DIAGONAL_TICK, DISTANCE_TICKS};

/// Attenuation by sub-tile distance tick, plus the diagonal step at `DIAGONAL_TICK`.
pub type DecayCurve = [f32; DISTANCE_TICKS + 2];

/// √2 − 1; a neighbour must be darker than `color * slowest^THRESHOLD_EXPONENT`.
const THRESHOLD_EXPONENT: f32 = 0.414_213_54;
/// Exponent of the diagonal entry, in tiles.
const DIAGONAL_EXPONENT: f32 = 1.5;

/// Scalar per-medium decay per tile, after clamping and optional linearisation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Baselines {
    pub air: f32,
    pub solid: f32,
    pub water: f32,
    pub honey: f32,
}

impl Baselines {
    pub fn from_params(params: &PropagateParams, gamma: &GammaConverter) -> Self {
        let d = &params.decays;
        let liquid = |c: glint_geom::Rgb| {
            0.625 * c.length() / 3f32.sqrt() + 0.375 * c.max_channel()
        };
        let mut b = Self {
            air: d.air,
            solid: d.solid.powf(params.absorption_exponent),
            water: liquid(d.water),
            honey: liquid(d.honey),
        };
        for v in [&mut b.air, &mut b.solid, &mut b.water, &mut b.honey] {
            *v = v.clamp(MIN_DECAY, MAX_DECAY_MULT);
            if params.gamma_correct {
                *v = gamma.to_linear(*v);
            }
        }
        b
    }

    pub fn slowest(&self) -> f32 {
        self.air.max(self.solid).max(self.water.max(self.honey))
    }

    fn for_medium(&self, m: Medium) -> f32 {
        match m {
            Medium::Air => self.air,
            Medium::Solid | Medium::NonSolid => self.solid,
            Medium::Water => self.water,
            Medium::Honey => self.honey,
        }
    }
}

/// Decay curves for every medium and the scalars derived from them.
pub struct DecayTables {
    curves: Box<[DecayCurve; Medium::COUNT]>,
    built_for: [f32; Medium::COUNT],
    exit_multiplier: f32,
    threshold_mult: f32,
    recip_log_slowest: f32,
}

impl Default for DecayTables {
    fn default() -> Self {
        Self::new()
    }
}

impl DecayTables {
    pub fn new() -> Self {
        Self {
            curves: Box::new([[1.0; DISTANCE_TICKS + 2]; Medium::COUNT]),
            built_for: [f32::NAN; Medium::COUNT],
            exit_multiplier: 1.0,
            threshold_mult: 1.0,
            recip_log_slowest: -1.0,
        }
    }

    /// Recomputes the derived scalars and rebuilds any curve whose baseline moved.
    /// Returns the number of curves rebuilt.
    pub fn update(&mut self, params: &PropagateParams, gamma: &GammaConverter) -> usize {
        let baselines = Baselines::from_params(params, gamma);

        self.exit_multiplier = params.exit_multiplier();
        if params.gamma_correct {
            self.exit_multiplier = gamma.to_linear(self.exit_multiplier);
        }

        let log_slowest = baselines.slowest().ln();
        self.threshold_mult = (THRESHOLD_EXPONENT * log_slowest).exp();
        self.recip_log_slowest = 1.0 / log_slowest;

        let mut rebuilt = 0;
        for m in [Medium::Air, Medium::Solid, Medium::Water, Medium::Honey] {
            let baseline = baselines.for_medium(m);
            if self.built_for[m.index()] == baseline {
                continue;
            }
            fill_curve(&mut self.curves[m.index()], baseline);
            self.built_for[m.index()] = baseline;
            rebuilt += 1;
        }
        if self.built_for[Medium::NonSolid.index()] != self.built_for[Medium::Solid.index()] {
            self.curves[Medium::NonSolid.index()] = self.curves[Medium::Solid.index()];
            self.built_for[Medium::NonSolid.index()] = self.built_for[Medium::Solid.index()];
        }
        if rebuilt > 0 {
            log::debug!(
                target: "lighting",
                "decay curves rebuilt ({rebuilt}): {baselines:?} slowest={:.4}",
                baselines.slowest()
            );
        }
        rebuilt
    }

    #[inline]
    pub fn curve(&self, m: Medium) -> &DecayCurve {
        &self.curves[m.index()]
    }

    /// Decay across one full tile of medium `m`.
    #[inline]
    pub fn step(&self, m: Medium) -> f32 {
        self.curves[m.index()][DISTANCE_TICKS]
    }

    #[inline]
    pub fn diagonal_step(&self, m: Medium) -> f32 {
        self.curves[m.index()][DIAGONAL_TICK]
    }

    #[inline]
    pub fn exit_multiplier(&self) -> f32 {
        self.exit_multiplier
    }

    #[inline]
    pub fn threshold_mult(&self) -> f32 {
        self.threshold_mult
    }

    #[inline]
    pub fn recip_log_slowest(&self) -> f32 {
        self.recip_log_slowest
    }
}

fn fill_curve(curve: &mut DecayCurve, baseline: f32) {
    let log_baseline = baseline.ln();
    let tick = 1.0 / DISTANCE_TICKS as f32;
    for (i, v) in curve.iter_mut().enumerate().take(DISTANCE_TICKS + 1) {
        *v = (tick * i as f32 * log_baseline).exp();
    }
    curve[DIAGONAL_TICK] = (DIAGONAL_EXPONENT * log_baseline).exp();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediumDecays;

    fn params(decays: MediumDecays) -> PropagateParams {
        PropagateParams { decays, ..PropagateParams::default() }
    }

    #[test]
    fn curves_are_monotonic_and_end_at_baseline() {
        let mut t = DecayTables::new();
        t.update(&params(MediumDecays::default()), &GammaConverter::default());
        for m in Medium::ALL {
            let c = t.curve(m);
            assert_eq!(c[0], 1.0);
            for w in c[..=DISTANCE_TICKS].windows(2) {
                assert!(w[0] >= w[1], "{m:?} not monotonic");
            }
            assert!(c[DIAGONAL_TICK] <= c[DISTANCE_TICKS]);
        }
        assert!((t.step(Medium::Air) - 0.91).abs() < 1e-5);
        assert!((t.step(Medium::Solid) - 0.56).abs() < 1e-5);
        assert_eq!(t.curve(Medium::NonSolid), t.curve(Medium::Solid));
    }

    #[test]
    fn baselines_clamp_below_max_decay() {
        let p = params(MediumDecays::default());
        let b = Baselines::from_params(&p, &GammaConverter::default());
        assert_eq!(b.water, MAX_DECAY_MULT);
        assert!(b.honey < MAX_DECAY_MULT);
        let lossless = params(MediumDecays::uniform(1.0));
        let b = Baselines::from_params(&lossless, &GammaConverter::default());
        assert_eq!(b.slowest(), MAX_DECAY_MULT);
        let dark = params(MediumDecays::uniform(0.0));
        let b = Baselines::from_params(&dark, &GammaConverter::default());
        assert_eq!(b.air, MIN_DECAY);
    }

    #[test]
    fn rebuild_only_on_change() {
        let g = GammaConverter::default();
        let mut t = DecayTables::new();
        let mut p = params(MediumDecays::default());
        assert_eq!(t.update(&p, &g), 4);
        assert_eq!(t.update(&p, &g), 0);
        p.decays.air = 0.8;
        assert_eq!(t.update(&p, &g), 1);
    }

    #[test]
    fn threshold_uses_slowest_decay() {
        let g = GammaConverter::default();
        let mut t = DecayTables::new();
        t.update(&params(MediumDecays::uniform(0.9)), &g);
        assert!((t.threshold_mult() - 0.9f32.powf(2f32.sqrt() - 1.0)).abs() < 1e-5);
        assert!((t.recip_log_slowest() - 1.0 / 0.9f32.ln()).abs() < 1e-4);
    }
}
