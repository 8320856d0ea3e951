//! Quadrant flood propagation, generic over the number of sub-rays per
//! quadrant edge (1, 2 or 4).

use glint_geom::{Lanes, Rgb};
use glint_grid::Medium;

use crate::budget::{BrightnessBudget, Cutoffs, estimate_work, light_range};
use crate::config::PropagateParams;
use crate::decay::DecayTables;
use crate::gamma::GammaConverter;
use crate::gi::GlobalIllumination;
use crate::media::{linearize, resolve_media};
use crate::scheduler::WorkerPool;
use crate::spread::SpreadTable;
use crate::{DISTANCE_TICKS, EngineMode, LightFrame, LightingEngine, MAX_LIGHT_RANGE};

pub type FloodEngine1x = FloodEngine<1>;
pub type FloodEngine2x = FloodEngine<2>;
pub type FloodEngine4x = FloodEngine<4>;

/// Flood engine with `N` sub-rays per quadrant edge.
pub struct FloodEngine<const N: usize> {
    spread: SpreadTable<N>,
    decays: DecayTables,
    gamma: GammaConverter,
    params: PropagateParams,
    budget: BrightnessBudget,
    workers: WorkerPool<Vec<Lanes<N>>>,
    media: Vec<Medium>,
    gi: GlobalIllumination,
}

impl<const N: usize> Default for FloodEngine<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FloodEngine<N> {
    pub fn new() -> Self {
        const { assert!(N == 1 || N == 2 || N == 4, "flood engines exist for 1, 2 and 4 sub-rays only") };
        let params = PropagateParams::default().sanitized();
        let gamma = GammaConverter::new(params.gamma);
        let mut decays = DecayTables::new();
        decays.update(&params, &gamma);
        Self {
            spread: SpreadTable::new(),
            decays,
            gamma,
            workers: WorkerPool::new(params.thread_count),
            params,
            budget: BrightnessBudget::default(),
            media: Vec::new(),
            gi: GlobalIllumination::default(),
        }
    }

    /// Cutoffs the next frame will use.
    pub fn cutoffs(&self) -> Cutoffs {
        self.budget.cutoffs(&self.params, &self.gamma)
    }
}

impl<const N: usize> LightingEngine for FloodEngine<N> {
    fn mode(&self) -> EngineMode {
        match N {
            1 => EngineMode::Flood1x,
            2 => EngineMode::Flood2x,
            4 => EngineMode::Flood4x,
            _ => unreachable!("flood engines exist for 1, 2 and 4 sub-rays only"),
        }
    }

    fn reconfigure(&mut self, params: &PropagateParams) {
        let params = params.sanitized();
        self.gamma = GammaConverter::new(params.gamma);
        self.decays.update(&params, &self.gamma);
        self.workers.resize(params.thread_count);
        self.params = params;
    }

    fn spread_light(&mut self, frame: &LightFrame<'_>, lights: &mut [Rgb]) {
        if !frame.validate(lights) {
            return;
        }
        let area = frame.area;
        let lights = &mut lights[..area.len()];
        let cutoffs = self.budget.cutoffs(&self.params, &self.gamma);

        if self.params.gamma_correct {
            linearize(&self.workers, lights, area.height, &self.gamma);
        }
        resolve_media(
            &self.workers,
            frame,
            self.params.non_solid_treated_opaque,
            &mut self.media,
        );

        let kernel = FloodKernel {
            spread: &self.spread,
            decays: &self.decays,
            media: &self.media[..area.len()],
            width: area.width,
            height: area.height,
            cutoffs,
            count_work: self.params.use_temporal_budgeting,
        };
        let work = self.workers.run(lights, |source, map, scratch, range| {
            if scratch.len() < MAX_LIGHT_RANGE + 1 {
                scratch.resize(MAX_LIGHT_RANGE + 1, Lanes::ZERO);
            }
            range.map(|i| kernel.process(source, map, scratch, i)).sum()
        });
        if self.params.use_temporal_budgeting {
            self.budget.record(work);
        }
        log::trace!(
            target: "lighting",
            "flood{N}x {}x{} cutoff={:.4} work={work}",
            area.width,
            area.height,
            cutoffs.cutoff
        );

        if self.params.simulate_global_illumination {
            let mut gi_mult = self.params.gi_multiplier;
            if self.params.gamma_correct {
                gi_mult = self.gamma.to_linear(gi_mult);
            }
            self.gi.apply(
                &self.workers,
                &self.decays,
                &self.media[..area.len()],
                area,
                gi_mult,
                lights,
            );
        }
    }

    fn temporal_work(&self) -> Option<u64> {
        self.params
            .use_temporal_budgeting
            .then(|| self.budget.temporal_data())
    }
}

#[inline]
fn blend(dst: &mut Rgb, v: Rgb) {
    *dst = dst.max(v);
}

#[inline]
fn offset(i: usize, d: isize) -> usize {
    i.wrapping_add_signed(d)
}

/// Read-only state shared by all workers during one flood pass.
struct FloodKernel<'a, const N: usize> {
    spread: &'a SpreadTable<N>,
    decays: &'a DecayTables,
    media: &'a [Medium],
    width: usize,
    height: usize,
    cutoffs: Cutoffs,
    count_work: bool,
}

impl<const N: usize> FloodKernel<'_, N> {
    /// Floods the light of tile `index` into `map`; returns its work estimate.
    fn process(
        &self,
        source: &[Rgb],
        map: &mut [Rgb],
        work: &mut [Lanes<N>],
        index: usize,
    ) -> u64 {
        let raw = source[index];
        if raw.all_le(self.cutoffs.initial) {
            return 0;
        }
        let color = raw * self.decays.step(self.media[index]);

        let h = self.height;
        let (x, y) = (index / h, index % h);
        let threshold = color * self.decays.threshold_mult();
        let darker =
            |other: usize| (source[other] * self.decays.step(self.media[other])).any_lt(threshold);

        let do_up = y > 0 && darker(index - 1);
        let do_down = y + 1 < h && darker(index + 1);
        let do_left = x > 0 && darker(index - h);
        let do_right = x + 1 < self.width && darker(index + h);
        // Max blending makes a source no brighter than its neighbours a no-op.
        if !(do_up || do_down || do_left || do_right) {
            return 0;
        }

        let recip = self.decays.recip_log_slowest();
        let range = light_range(self.cutoffs.log_cutoff, color.max_channel(), recip);
        let up = y.min(range);
        let down = (h - 1 - y).min(range);
        let left = x.min(range);
        let right = (self.width - 1 - x).min(range);

        let hs = h as isize;
        if do_up {
            self.spread_line(map, color, index, up, -1);
        }
        if do_down {
            self.spread_line(map, color, index, down, 1);
        }
        if do_left {
            self.spread_line(map, color, index, left, -hs);
        }
        if do_right {
            self.spread_line(map, color, index, right, hs);
        }

        // Gating quadrants on both bounding axes is sometimes inaccurate but much faster.
        let quadrants = [
            (do_up && do_left, up, left, -1, -hs),
            (do_up && do_right, up, right, -1, hs),
            (do_down && do_left, down, left, 1, -hs),
            (do_down && do_right, down, right, 1, hs),
        ];
        let active = quadrants.iter().filter(|q| q.0).count();
        if active > 0 {
            let circle = self.spread.circle(range);
            let work = &mut work[..=range];
            for &(on, vdist, hdist, vchange, hchange) in &quadrants {
                if on {
                    self.spread_quadrant(map, work, circle, color, index, vdist, hdist, vchange, hchange);
                }
            }
        }

        if !self.count_work {
            return 0;
        }
        let base_work = light_range(self.cutoffs.log_basic_work, color.max_channel(), recip);
        let axes = [do_up, do_down, do_left, do_right]
            .iter()
            .filter(|&&d| d)
            .count();
        estimate_work(base_work, axes, active)
    }

    fn spread_line(&self, map: &mut [Rgb], mut color: Rgb, index: usize, distance: usize, change: isize) {
        let loss = self.decays.exit_multiplier();
        let mut i = offset(index, change);
        blend(&mut map[i], color);
        let mut prev = self.media[i];
        for _ in 1..distance {
            i = offset(i, change);
            let m = self.media[i];
            let decay = self.decays.step(prev);
            if prev.is_opaque() && !m.is_opaque() {
                color *= loss * decay;
            } else {
                color *= decay;
            }
            prev = m;
            blend(&mut map[i], color);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn spread_quadrant(
        &self,
        map: &mut [Rgb],
        work: &mut [Lanes<N>],
        circle: &[usize],
        color: Rgb,
        index: usize,
        vdist: usize,
        hdist: usize,
        vchange: isize,
        hchange: isize,
    ) {
        let media = self.media;
        let decays = self.decays;
        let spread = self.spread;
        let loss = decays.exit_multiplier();

        // Seed the horizontal lanes leaving the vertical axis line.
        {
            work[0] = Lanes::splat(1.0);
            let mut i = offset(index, vchange);
            let mut value = 1.0f32;
            let mut prev = media[i];
            work[1] = Lanes::splat(decays.curve(prev)[spread.cell(1, 0).dist_right]);
            for y in 2..=vdist {
                i = offset(i, vchange);
                let m = media[i];
                if prev.is_opaque() && !m.is_opaque() {
                    value *= loss * decays.step(prev);
                } else {
                    value *= decays.step(prev);
                }
                prev = m;
                work[y] = Lanes::splat(value * decays.curve(m)[spread.cell(y, 0).dist_right]);
            }
        }

        for x in 1..=hdist {
            let mut i = offset(index, hchange * x as isize);
            let mut m = media[i];

            // Row 0 carries the horizontal axis light and feeds the first vertical step.
            let mut vertical = {
                let axis = &mut work[0];
                if x > 1 && !m.is_opaque() && media[offset(i, -hchange)].is_opaque() {
                    *axis *= loss;
                }
                let v = *axis * decays.curve(m)[spread.cell(0, x).dist_top];
                *axis *= decays.curve(m)[DISTANCE_TICKS];
                v
            };

            let edge = vdist.min(circle[x]);
            let mut prev = m;
            for y in 1..=edge {
                i = offset(i, vchange);
                m = media[i];
                let mut horizontal = work[y];
                if !m.is_opaque() {
                    if prev.is_opaque() {
                        vertical *= loss;
                    }
                    if media[offset(i, -hchange)].is_opaque() {
                        horizontal *= loss;
                    }
                }
                prev = m;

                let cell = spread.cell(y, x);
                blend(&mut map[i], color * cell.deposit(horizontal, vertical));

                let curve = decays.curve(m);
                let (right, top) = cell.transfer(horizontal, vertical);
                work[y] = right * curve[cell.dist_right];
                vertical = top * curve[cell.dist_top];
            }
        }
    }
}
