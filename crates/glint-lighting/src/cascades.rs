//! Radiance cascades: probes at four resolutions cast progressively longer,
//! denser rays, then merge far-field light down into the finest level.
//!
//! Level `k` places one probe per `2^k × 2^k` block and casts `4^(k+1)` rays
//! covering the interval `[3·4^(k-1), 3·4^k)` tiles. Lower rays end at each of
//! the four surrounding higher probes (bilinear fix) so the merge does not
//! leave gaps between levels. Ray paths are precomputed as tile steps.

use std::f32::consts::TAU;

use glint_geom::{Rgb, hypot_f32, lerp};
use glint_grid::Medium;

use crate::config::PropagateParams;
use crate::gamma::GammaConverter;
use crate::media::{linearize, resolve_media};
use crate::scheduler::WorkerPool;
use crate::{EngineMode, LightFrame, LightingEngine};

pub const CASCADE_COUNT: usize = 4;
pub const BRANCHING: usize = 4;
const CASCADE0_RAY_LENGTH: f32 = 3.0;

pub const LENGTH_STEP_COUNT: usize = 127;
/// Length index of a one-tile segment.
pub const UNIT_LENGTH_INDEX: usize = 89;

/// Air at or above this decay is treated as fully transparent.
const CLEAR_AIR_DECAY: f32 = 0.91;

/// End-point offsets (in higher-level probe spacings) toward the four
/// surrounding higher probes, indexed by grid offset.
const BILINEAR_FIX_OFFSETS: [[(f32, f32); 4]; 4] = [
    [(-1.5, -1.5), (-1.5, 0.5), (0.5, -1.5), (0.5, 0.5)],
    [(-1.5, -0.5), (-1.5, 1.5), (0.5, -0.5), (0.5, 1.5)],
    [(-0.5, -1.5), (-0.5, 0.5), (1.5, -1.5), (1.5, 0.5)],
    [(-0.5, -0.5), (-0.5, 1.5), (1.5, -0.5), (1.5, 1.5)],
];

const PROBE_MERGE_WEIGHTS: [[f32; 4]; 4] = [
    [0.25 * 0.25, 0.25 * 0.75, 0.75 * 0.25, 0.75 * 0.75],
    [0.25 * 0.75, 0.25 * 0.25, 0.75 * 0.75, 0.75 * 0.25],
    [0.75 * 0.25, 0.75 * 0.75, 0.25 * 0.25, 0.25 * 0.75],
    [0.75 * 0.75, 0.75 * 0.25, 0.25 * 0.75, 0.25 * 0.25],
];

/// One tile visited by a precomputed ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayStep {
    /// Tile delta from the previous step (the first step is relative to the probe).
    pub dx: i8,
    pub dy: i8,
    /// Segment length in units of `1 / UNIT_LENGTH_INDEX` tiles.
    pub length_index: u8,
    /// Weight of the tile's emitted light along this segment.
    pub light_mult: f32,
}

/// Light gathered along a ray and the fraction of light behind it that gets through.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RayLight {
    pub radiance: Rgb,
    pub transparency: Rgb,
}

/// Walks the segment `begin..end` tile boundary by tile boundary.
///
/// `offset` is the probe origin; light multipliers are the growth of the
/// distance from it across each segment. Segment lengths are quantised with
/// error diffusion so they sum to the true length.
pub fn ray_steps(offset: (f32, f32), begin: (f32, f32), end: (f32, f32)) -> Vec<RayStep> {
    let (dx, dy) = (end.0 - begin.0, end.1 - begin.1);
    let mut steps = Vec::new();
    if dx == 0.0 && dy == 0.0 {
        return steps;
    }

    let next_boundary = |v: f32, d: f32| {
        if d > 0.0 {
            (v + 1.0).floor()
        } else if d < 0.0 {
            (v - 1.0).ceil()
        } else {
            v
        }
    };
    let passes = |next: f32, d: f32, end: f32| (d > 0.0 && next >= end) || (d < 0.0 && next <= end);

    let (mut x, mut y) = begin;
    let mut length_error = 0.0f32;
    let mut prev_distance = hypot_f32(begin.0 - offset.0, begin.1 - offset.1);
    let (mut prev_tile_x, mut prev_tile_y) = (0i32, 0i32);
    loop {
        let mut next_x = next_boundary(x, dx);
        let mut next_y = next_boundary(y, dy);

        let done = passes(next_x, dx, end.0) || passes(next_y, dy, end.1);
        if done {
            (next_x, next_y) = end;
        } else {
            let x_t = (next_x - begin.0) / dx;
            let y_t = (next_y - begin.1) / dy;
            if dy == 0.0 || (dx != 0.0 && x_t <= y_t) {
                next_y = lerp(begin.1, end.1, x_t);
            } else {
                next_x = lerp(begin.0, end.0, y_t);
            }
        }

        let tile_x = (0.5 * (x + next_x)).floor() as i32;
        let tile_y = (0.5 * (y + next_y)).floor() as i32;
        let scaled = UNIT_LENGTH_INDEX as f32 * hypot_f32(next_x - x, next_y - y) + length_error;
        let length_index = scaled.round_ties_even().clamp(0.0, LENGTH_STEP_COUNT as f32);
        length_error = scaled - length_index;
        let distance = hypot_f32(next_x - offset.0, next_y - offset.1);

        steps.push(RayStep {
            dx: (tile_x - prev_tile_x) as i8,
            dy: (tile_y - prev_tile_y) as i8,
            length_index: length_index as u8,
            light_mult: distance - prev_distance,
        });

        (x, y) = (next_x, next_y);
        (prev_tile_x, prev_tile_y) = (tile_x, tile_y);
        prev_distance = distance;
        if done {
            return steps;
        }
    }
}

/// Ray paths indexed by `[level][grid offset][ray]`. Below the top level
/// each ray appears four times, once per surrounding higher probe.
type Instructions = Vec<Vec<Vec<Vec<RayStep>>>>;

fn generate_instructions() -> Instructions {
    let mut levels = Vec::with_capacity(CASCADE_COUNT);
    let mut ray_count = 4usize;
    let mut scale = 1.0f32;
    let mut begin = 0.0f32;
    let mut end = CASCADE0_RAY_LENGTH;

    for level in 0..CASCADE_COUNT {
        let directions = (0..ray_count).map(move |r| {
            let angle = (r as f32 + 0.5) / ray_count as f32 * TAU;
            (angle.cos(), angle.sin())
        });

        if level == CASCADE_COUNT - 1 {
            let rays: Vec<Vec<RayStep>> = directions
                .map(|(dx, dy)| ray_steps((0.0, 0.0), (dx * begin, dy * begin), (dx * end, dy * end)))
                .collect();
            levels.push(vec![rays]);
            break;
        }

        // Level 0 probes sit at tile centres.
        let origin = if level == 0 { 0.5 } else { 0.0 };
        let grids: Vec<Vec<Vec<RayStep>>> = BILINEAR_FIX_OFFSETS
            .iter()
            .map(|offsets| {
                let mut rays = Vec::with_capacity(offsets.len() * ray_count);
                for (dx, dy) in directions.clone() {
                    let from = (dx * begin + origin, dy * begin + origin);
                    for &(ox, oy) in offsets {
                        let to = (
                            dx * end + origin + scale * ox,
                            dy * end + origin + scale * oy,
                        );
                        rays.push(ray_steps((origin, origin), from, to));
                    }
                }
                rays
            })
            .collect();
        levels.push(grids);

        ray_count *= BRANCHING;
        scale *= 2.0;
        begin = end;
        end *= BRANCHING as f32;
    }
    levels
}

/// Per-medium transparency by quantised segment length.
struct TransparencyTables {
    rows: Box<[[Rgb; LENGTH_STEP_COUNT + 1]; Medium::COUNT]>,
    built_for: [Option<Rgb>; Medium::COUNT],
}

impl TransparencyTables {
    fn new() -> Self {
        Self {
            rows: Box::new([[Rgb::ONE; LENGTH_STEP_COUNT + 1]; Medium::COUNT]),
            built_for: [None; Medium::COUNT],
        }
    }

    /// Rebuilds rows whose per-tile transparency changed; returns how many.
    fn update(&mut self, params: &PropagateParams, gamma: &GammaConverter) -> usize {
        let d = &params.decays;
        let air = if d.air >= CLEAR_AIR_DECAY {
            1.0
        } else {
            d.air / CLEAR_AIR_DECAY
        };
        let solid = Rgb::splat(d.solid.powf(params.absorption_exponent));

        let mut rebuilt = 0;
        for (m, t) in [
            (Medium::Air, Rgb::splat(air)),
            (Medium::Solid, solid),
            (Medium::Water, d.water),
            (Medium::Honey, d.honey),
            (Medium::NonSolid, solid),
        ] {
            let t = gamma.rgb_to_linear(t);
            if self.built_for[m.index()] == Some(t) {
                continue;
            }
            let row = &mut self.rows[m.index()];
            row[0] = t.map(|v| if v == 0.0 { 0.0 } else { 1.0 });
            for (k, entry) in row.iter_mut().enumerate().skip(1) {
                let length = k as f32 / UNIT_LENGTH_INDEX as f32;
                *entry = t.map(|v| v.powf(length));
            }
            self.built_for[m.index()] = Some(t);
            rebuilt += 1;
        }
        rebuilt
    }

    #[inline]
    fn get(&self, m: Medium, length_index: u8) -> Rgb {
        self.rows[m.index()][length_index as usize]
    }
}

/// Probe storage for one level. Probe 0 is an all-zero sentinel standing in
/// for probes outside the level.
struct Cascade {
    width: usize,
    height: usize,
    rays: usize,
    probes: Vec<RayLight>,
}

impl Cascade {
    fn new(level: usize, width: usize, height: usize) -> Self {
        let width = (width + (1 << level) - 1) >> level;
        let height = (height + (1 << level) - 1) >> level;
        let rays = 4 * BRANCHING.pow(level as u32);
        Self {
            width,
            height,
            rays,
            probes: vec![RayLight::default(); rays * (width * height + 1)],
        }
    }

    fn probe(&self, x: isize, y: isize) -> &[RayLight] {
        let index = if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            0
        } else {
            self.height * x as usize + y as usize + 1
        };
        &self.probes[self.rays * index..self.rays * (index + 1)]
    }
}

/// Read-only state for casting rays over one frame.
struct RayCaster<'a> {
    lights: &'a [Rgb],
    media: &'a [Medium],
    width: i32,
    height: i32,
    transparency: &'a TransparencyTables,
    exit: f32,
}

impl RayCaster<'_> {
    fn cast(&self, mut x: i32, mut y: i32, steps: &[RayStep]) -> RayLight {
        let mut radiance = Rgb::ZERO;
        let mut transparency = Rgb::ONE;
        let mut prev_solid = true;
        for step in steps {
            x += step.dx as i32;
            y += step.dy as i32;
            if x < 0 || y < 0 || x >= self.width || y >= self.height {
                transparency = Rgb::ZERO;
                break;
            }
            let i = self.height as usize * x as usize + y as usize;
            let m = self.media[i];
            radiance += transparency * step.light_mult * self.lights[i];
            transparency *= self.transparency.get(m, step.length_index);

            let solid = m == Medium::Solid;
            if solid && !prev_solid {
                transparency *= self.exit;
            }
            prev_solid = solid;
        }
        RayLight {
            radiance,
            transparency,
        }
    }
}

#[inline]
fn grid_offset(px: usize, py: usize) -> usize {
    ((px & 1) << 1) | (py & 1)
}

fn average(rays: &[RayLight]) -> RayLight {
    let k = 1.0 / rays.len() as f32;
    let mut sum = RayLight::default();
    for r in rays {
        sum.radiance += r.radiance;
        sum.transparency += r.transparency;
    }
    RayLight {
        radiance: sum.radiance * k,
        transparency: sum.transparency * k,
    }
}

/// Casts every ray of a lower probe toward each surrounding higher probe and
/// folds in that probe's matching rays.
fn merge_probe(
    probe: &mut [RayLight],
    instructions: &[Vec<RayStep>],
    weights: &[f32; 4],
    higher: &[&[RayLight]; 4],
    cast: impl Fn(&[RayStep]) -> RayLight,
) {
    for (r, out) in probe.iter_mut().enumerate() {
        let mut merged = RayLight::default();
        for (j, (far, &w)) in higher.iter().zip(weights).enumerate() {
            let far = average(&far[r * BRANCHING..(r + 1) * BRANCHING]);
            let near = cast(&instructions[r * 4 + j]);
            merged.radiance += w * (near.radiance + near.transparency * far.radiance);
            merged.transparency += w * (near.transparency * far.transparency);
        }
        *out = merged;
    }
}

pub struct RadianceCascadesEngine {
    instructions: Instructions,
    transparency: TransparencyTables,
    exit: f32,
    gamma: GammaConverter,
    params: PropagateParams,
    workers: WorkerPool<()>,
    media: Vec<Medium>,
    cascades: Vec<Cascade>,
    size: (usize, usize),
}

impl Default for RadianceCascadesEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RadianceCascadesEngine {
    pub fn new() -> Self {
        let params = PropagateParams::default().sanitized();
        let mut engine = Self {
            instructions: generate_instructions(),
            transparency: TransparencyTables::new(),
            exit: 1.0,
            gamma: GammaConverter::new(params.gamma),
            workers: WorkerPool::new(1),
            params: params.clone(),
            media: Vec::new(),
            cascades: Vec::new(),
            size: (0, 0),
        };
        engine.reconfigure(&params);
        engine
    }

    fn resize_cascades(&mut self, width: usize, height: usize) {
        if self.size == (width, height) && self.cascades.len() == CASCADE_COUNT {
            return;
        }
        self.size = (width, height);
        self.cascades = (0..CASCADE_COUNT)
            .map(|level| Cascade::new(level, width, height))
            .collect();
        log::debug!(target: "lighting", "radiance cascades resized for {width}x{height}");
    }
}

impl LightingEngine for RadianceCascadesEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::RadianceCascades
    }

    fn reconfigure(&mut self, params: &PropagateParams) {
        let params = params.sanitized();
        self.gamma = GammaConverter::new(params.gamma);
        let rebuilt = self.transparency.update(&params, &self.gamma);
        if rebuilt > 0 {
            log::debug!(target: "lighting", "cascade transparency rows rebuilt: {rebuilt}");
        }
        self.exit = self.gamma.to_linear(params.exit_multiplier());
        self.workers.resize(params.thread_count);
        self.params = params;
    }

    fn spread_light(&mut self, frame: &LightFrame<'_>, lights: &mut [Rgb]) {
        if !frame.validate(lights) {
            return;
        }
        let area = frame.area;
        let (w, h) = (area.width, area.height);
        let lights = &mut lights[..area.len()];

        linearize(&self.workers, lights, h, &self.gamma);
        resolve_media(
            &self.workers,
            frame,
            self.params.non_solid_treated_opaque,
            &mut self.media,
        );
        self.resize_cascades(w, h);

        {
            let caster = RayCaster {
                lights,
                media: &self.media[..area.len()],
                width: w as i32,
                height: h as i32,
                transparency: &self.transparency,
                exit: self.exit,
            };
            let workers = &self.workers;

            for level in (0..CASCADE_COUNT).rev() {
                let (lower, higher) = self.cascades.split_at_mut(level + 1);
                let cascade = &mut lower[level];
                let instructions = &self.instructions[level];
                let shift = if level == 0 { 0 } else { 1 << (level - 1) };
                let (ch, rays) = (cascade.height, cascade.rays);
                let probes = &mut cascade.probes[rays..];
                let higher = higher.first();

                workers.for_each_chunk(probes, rays * ch, |px, column| {
                    for (py, probe) in column.chunks_mut(rays).enumerate() {
                        let x = ((px << level) + shift) as i32;
                        let y = ((py << level) + shift) as i32;
                        let Some(higher) = higher else {
                            for (out, steps) in probe.iter_mut().zip(&instructions[0]) {
                                *out = caster.cast(x, y, steps);
                            }
                            continue;
                        };
                        let grid = grid_offset(px, py);
                        let hx = (px as isize + 1) / 2 - 1;
                        let hy = (py as isize + 1) / 2 - 1;
                        let surrounding = [
                            higher.probe(hx, hy),
                            higher.probe(hx, hy + 1),
                            higher.probe(hx + 1, hy),
                            higher.probe(hx + 1, hy + 1),
                        ];
                        merge_probe(
                            probe,
                            &instructions[grid],
                            &PROBE_MERGE_WEIGHTS[grid],
                            &surrounding,
                            |steps| caster.cast(x, y, steps),
                        );
                    }
                });
            }
        }

        let finest = &self.cascades[0];
        let encode = !self.params.gamma_correct;
        let gamma = &self.gamma;
        self.workers.for_each_chunk(lights, h, |x, column| {
            for (y, c) in column.iter_mut().enumerate() {
                let probe = finest.probe(x as isize, y as isize);
                let mut sum = Rgb::ZERO;
                for ray in probe {
                    sum += ray.radiance;
                }
                *c = if encode { gamma.rgb_to_gamma(sum) } else { sum };
            }
        });
        log::trace!(target: "lighting", "radiance cascades {w}x{h}");
    }
}
