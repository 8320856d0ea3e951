//! Approximate single-bounce indirect light, applied after a flood pass.

use glint_geom::Rgb;
use glint_grid::{Medium, TileArea};

use crate::decay::DecayTables;
use crate::scheduler::WorkerPool;

const GI_ITERATIONS: usize = 6;

/// Sweep direction as (dx, dy); light travels from (x - dx, y - dy) to (x, y).
const SWEEPS: [(isize, isize); 8] = [
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
];

#[derive(Default)]
pub(crate) struct GlobalIllumination {
    indirect: Vec<Rgb>,
}

impl GlobalIllumination {
    /// Spreads a fraction `gi_mult` of the flooded light through non-solid
    /// tiles with directional sweeps and max-blends the result into `lights`.
    pub fn apply<S: Default + Send>(
        &mut self,
        pool: &WorkerPool<S>,
        decays: &DecayTables,
        media: &[Medium],
        area: TileArea,
        gi_mult: f32,
        lights: &mut [Rgb],
    ) {
        let len = area.len();
        let h = area.height;
        if self.indirect.len() < len {
            self.indirect.resize(len, Rgb::ZERO);
        }
        let indirect = &mut self.indirect[..len];

        {
            let source: &[Rgb] = lights;
            pool.for_each_chunk(indirect, h, |x, column| {
                let base = h * x;
                for (y, v) in column.iter_mut().enumerate() {
                    *v = if media[base + y] == Medium::Solid {
                        Rgb::ZERO
                    } else {
                        source[base + y] * gi_mult
                    };
                }
            });
        }

        for _ in 0..GI_ITERATIONS {
            for &(dx, dy) in &SWEEPS {
                if dx == 0 {
                    sweep_vertical(pool, decays, media, h, dy, indirect);
                } else {
                    sweep_columns(decays, media, area, dx, dy, indirect);
                }
            }
        }

        let indirect: &[Rgb] = indirect;
        pool.for_each_chunk(lights, h, |x, column| {
            let base = h * x;
            for (y, c) in column.iter_mut().enumerate() {
                *c = c.max(indirect[base + y]);
            }
        });
        log::trace!(target: "lighting", "gi pass over {}x{} (mult {gi_mult:.3})", area.width, h);
    }
}

/// Light may not enter a clear tile from an opaque one.
#[inline]
fn blocked(to: Medium, from: Medium) -> bool {
    !to.is_opaque() && from.is_opaque()
}

/// Runs a sweep along every column independently.
fn sweep_vertical<S: Default + Send>(
    pool: &WorkerPool<S>,
    decays: &DecayTables,
    media: &[Medium],
    height: usize,
    dy: isize,
    indirect: &mut [Rgb],
) {
    pool.for_each_chunk(indirect, height, |x, column| {
        let media = &media[height * x..height * (x + 1)];
        let mut step = |y: usize, from: usize| {
            if !blocked(media[y], media[from]) {
                column[y] = column[y].max(column[from] * decays.step(media[from]));
            }
        };
        if dy > 0 {
            (1..height).for_each(|y| step(y, y - 1));
        } else {
            (0..height - 1).rev().for_each(|y| step(y, y + 1));
        }
    });
}

/// Runs a horizontal or diagonal sweep, column after column in travel order.
fn sweep_columns(
    decays: &DecayTables,
    media: &[Medium],
    area: TileArea,
    dx: isize,
    dy: isize,
    indirect: &mut [Rgb],
) {
    let (w, h) = (area.width, area.height);
    if w < 2 {
        return;
    }
    let columns: Vec<usize> = if dx > 0 {
        (1..w).collect()
    } else {
        (0..w - 1).rev().collect()
    };
    let rows = match dy {
        1 => 1..h,
        -1 => 0..h.saturating_sub(1),
        _ => 0..h,
    };

    for x in columns {
        let sx = x.wrapping_add_signed(-dx);
        // Split so the source column is readable while the target column is written.
        let (src, dst) = if sx < x {
            let (a, b) = indirect.split_at_mut(h * x);
            (&a[h * sx..h * (sx + 1)], &mut b[..h])
        } else {
            let (a, b) = indirect.split_at_mut(h * sx);
            (&b[..h], &mut a[h * x..h * (x + 1)])
        };
        let to_media = &media[h * x..h * (x + 1)];
        let from_media = &media[h * sx..h * (sx + 1)];

        for y in rows.clone() {
            let sy = y.wrapping_add_signed(-dy);
            let to = to_media[y];
            let from = from_media[sy];
            if dy == 0 {
                if !blocked(to, from) {
                    dst[y] = dst[y].max(src[sy] * decays.step(from));
                }
                continue;
            }
            let corner_opaque = to_media[sy].is_opaque() || from_media[y].is_opaque();
            if to.is_opaque() || !(from.is_opaque() || corner_opaque) {
                dst[y] = dst[y].max(src[sy] * decays.diagonal_step(from));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MediumDecays, PropagateParams};
    use crate::gamma::GammaConverter;

    fn tables() -> DecayTables {
        let params = PropagateParams {
            decays: MediumDecays::uniform(0.9),
            exit_loss_fraction: 0.0,
            ..PropagateParams::default()
        };
        let mut t = DecayTables::new();
        t.update(&params, &GammaConverter::default());
        t
    }

    #[test]
    fn indirect_light_fills_around_corner() {
        let decays = tables();
        let area = TileArea::new(6, 6);
        let mut media = vec![Medium::Air; area.len()];
        // Wall between (2, 0..4); the far side is reachable only around its end.
        for y in 0..4 {
            media[area.idx(2, y)] = Medium::Solid;
        }
        let mut lights = vec![Rgb::ZERO; area.len()];
        lights[area.idx(0, 0)] = Rgb::ONE;

        let pool = WorkerPool::<()>::new(1);
        let mut gi = GlobalIllumination::default();
        gi.apply(&pool, &decays, &media, area, 0.5, &mut lights);

        assert!(lights[area.idx(4, 0)].r > 0.0);
        assert_eq!(lights[area.idx(0, 0)], Rgb::ONE);
    }

    #[test]
    fn threads_do_not_change_result() {
        let decays = tables();
        let area = TileArea::new(9, 7);
        let mut media = vec![Medium::Air; area.len()];
        media[area.idx(4, 3)] = Medium::Solid;
        media[area.idx(5, 2)] = Medium::Water;
        let mut a = vec![Rgb::ZERO; area.len()];
        a[area.idx(1, 1)] = Rgb::new(1.0, 0.5, 0.2);
        a[area.idx(7, 5)] = Rgb::splat(0.6);
        let mut b = a.clone();

        GlobalIllumination::default().apply(&WorkerPool::<()>::new(1), &decays, &media, area, 0.5, &mut a);
        GlobalIllumination::default().apply(&WorkerPool::<()>::new(3), &decays, &media, area, 0.5, &mut b);
        assert_eq!(a, b);
    }
}
