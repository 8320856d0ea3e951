use crate::MAX_LIGHT_RANGE;
use crate::config::PropagateParams;
use crate::gamma::GammaConverter;

/// Sources at or below this level in every channel are never propagated.
pub const LOW_LIGHT_LEVEL: f32 = 0.03;
pub const BASE_CUTOFF: f32 = 0.04;
pub const CAMERA_MODE_CUTOFF: f32 = 0.02;

const TEMPORAL_DATA_DIVISOR: f64 = 55_555.5;
const BASE_TEMPORAL_MULT: f64 = 0.02;
const TEMPORAL_MIN: f64 = 0.02;
const TEMPORAL_MAX: f64 = 0.125;

/// Brightness cutoffs for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cutoffs {
    pub initial: f32,
    pub cutoff: f32,
    pub log_cutoff: f32,
    pub log_basic_work: f32,
}

/// Carries last frame's approximate work and turns it into this frame's cutoff.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrightnessBudget {
    temporal_data: u64,
}

impl BrightnessBudget {
    pub fn temporal_data(&self) -> u64 {
        self.temporal_data
    }

    pub fn record(&mut self, work: u64) {
        self.temporal_data = work;
    }

    pub fn cutoffs(&self, params: &PropagateParams, gamma: &GammaConverter) -> Cutoffs {
        let mut initial = LOW_LIGHT_LEVEL;
        let mut cutoff = if params.camera_mode {
            CAMERA_MODE_CUTOFF
        } else if params.use_temporal_budgeting {
            ((self.temporal_data as f64 / TEMPORAL_DATA_DIVISOR).sqrt() * BASE_TEMPORAL_MULT)
                .clamp(TEMPORAL_MIN, TEMPORAL_MAX) as f32
        } else {
            BASE_CUTOFF
        };
        let mut basic_work = BASE_CUTOFF;

        if params.gamma_correct {
            initial = gamma.to_linear(initial);
            cutoff = gamma.to_linear(cutoff);
            basic_work = gamma.to_linear(basic_work);
        }

        Cutoffs {
            initial,
            cutoff,
            log_cutoff: cutoff.ln(),
            log_basic_work: basic_work.ln(),
        }
    }
}

/// Number of tiles light of brightness `max_channel` travels before it falls
/// below the cutoff in the slowest-decaying medium.
#[inline]
pub fn light_range(log_cutoff: f32, max_channel: f32, recip_log_slowest: f32) -> usize {
    let steps = ((log_cutoff - max_channel.ln()) * recip_log_slowest).ceil() + 1.0;
    if steps.is_nan() {
        return 1;
    }
    steps.clamp(1.0, MAX_LIGHT_RANGE as f32) as usize
}

/// Approximate operation count for one processed source.
#[inline]
pub fn estimate_work(base_work: usize, axes: usize, quadrants: usize) -> u64 {
    let base = base_work as u64;
    1 + axes as u64 * base + quadrants as u64 * base * base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_selection() {
        let g = GammaConverter::default();
        let mut budget = BrightnessBudget::default();
        let mut p = PropagateParams { use_temporal_budgeting: false, ..PropagateParams::default() };
        assert_eq!(budget.cutoffs(&p, &g).cutoff, BASE_CUTOFF);

        p.use_temporal_budgeting = true;
        assert_eq!(budget.cutoffs(&p, &g).cutoff, 0.02);
        budget.record(55_555_500);
        assert!((budget.cutoffs(&p, &g).cutoff - 0.125).abs() < 1e-6);
        budget.record(555_555);
        // sqrt(10) * 0.02
        assert!((budget.cutoffs(&p, &g).cutoff - 0.063_245_55).abs() < 1e-5);

        p.camera_mode = true;
        assert_eq!(budget.cutoffs(&p, &g).cutoff, CAMERA_MODE_CUTOFF);

        p.gamma_correct = true;
        let c = budget.cutoffs(&p, &g);
        assert!((c.cutoff - CAMERA_MODE_CUTOFF.powf(2.2)).abs() < 1e-7);
        assert!(c.initial < LOW_LIGHT_LEVEL);
    }

    #[test]
    fn range_is_clamped() {
        let recip = 1.0 / 0.9f32.ln();
        let log_cutoff = BASE_CUTOFF.ln();
        assert_eq!(light_range(log_cutoff, 0.9, recip), 31);
        assert_eq!(light_range(log_cutoff, 1e-6, recip), 1);
        assert_eq!(light_range(log_cutoff, 1e9, recip), MAX_LIGHT_RANGE);
        assert_eq!(light_range(log_cutoff, 1.0, 1.0 / 0.999f32.ln()), MAX_LIGHT_RANGE);
    }

    #[test]
    fn range_of_non_finite_light() {
        let recip = 1.0 / 0.9f32.ln();
        let log_cutoff = BASE_CUTOFF.ln();
        assert_eq!(light_range(log_cutoff, f32::INFINITY, recip), MAX_LIGHT_RANGE);
        assert_eq!(light_range(log_cutoff, f32::NAN, recip), 1);
        assert_eq!(light_range(log_cutoff, 0.0, recip), 1);
    }

    #[test]
    fn work_estimate() {
        assert_eq!(estimate_work(10, 0, 0), 1);
        assert_eq!(estimate_work(10, 4, 4), 1 + 40 + 400);
    }
}
