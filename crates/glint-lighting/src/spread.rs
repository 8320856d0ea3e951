//! Geometric light-spread tables for the quadrant flood.
//!
//! A quadrant is swept tile by tile starting from the source. Light enters a
//! tile through its left edge (travelling horizontally) and its bottom edge
//! (travelling vertically), each edge split into `N` sub-rays. For every
//! tile offset the table stores how much of each incoming sub-ray is
//! deposited in the tile and how it splits between the top and right edges,
//! plus the sub-tile distance (in decay ticks) to the next tile in each
//! direction. Everything here depends only on the offset from the source.

use glint_geom::{Lanes, hypot};

use crate::{DISTANCE_TICKS, MAX_LIGHT_RANGE};

/// Spread data for one tile offset.
#[derive(Clone, Copy, Debug)]
pub struct SpreadCell<const N: usize> {
    pub dist_top: usize,
    pub dist_right: usize,
    /// Deposit weight of each horizontal (left edge) lane.
    pub from_left: Lanes<N>,
    /// Deposit weight of each vertical (bottom edge) lane.
    pub from_bottom: Lanes<N>,
    /// `left_to_top[l]` is the vertical-out lane split of horizontal lane `l`.
    pub left_to_top: [Lanes<N>; N],
    pub left_to_right: [Lanes<N>; N],
    pub bottom_to_top: [Lanes<N>; N],
    pub bottom_to_right: [Lanes<N>; N],
}

impl<const N: usize> SpreadCell<N> {
    fn distances_only(dist_top: usize, dist_right: usize) -> Self {
        Self {
            dist_top,
            dist_right,
            from_left: Lanes::ZERO,
            from_bottom: Lanes::ZERO,
            left_to_top: [Lanes::ZERO; N],
            left_to_right: [Lanes::ZERO; N],
            bottom_to_top: [Lanes::ZERO; N],
            bottom_to_right: [Lanes::ZERO; N],
        }
    }

    /// Light deposited in this tile per unit source color.
    #[inline]
    pub fn deposit(&self, horizontal: Lanes<N>, vertical: Lanes<N>) -> f32 {
        horizontal.dot(self.from_left) + vertical.dot(self.from_bottom)
    }

    /// Splits incoming lanes into (horizontal-out, vertical-out) before decay.
    #[inline]
    pub fn transfer(&self, horizontal: Lanes<N>, vertical: Lanes<N>) -> (Lanes<N>, Lanes<N>) {
        let mut right = Lanes::ZERO;
        let mut top = Lanes::ZERO;
        for l in 0..N {
            right = right.mul_add(self.left_to_right[l], horizontal[l]);
            top = top.mul_add(self.left_to_top[l], horizontal[l]);
        }
        for l in 0..N {
            right = right.mul_add(self.bottom_to_right[l], vertical[l]);
            top = top.mul_add(self.bottom_to_top[l], vertical[l]);
        }
        (right, top)
    }

    /// Summed transfer blocks, each averaged over the `N` input lanes:
    /// (left→top, bottom→top, left→right, bottom→right).
    fn block_sums(&self) -> [f64; 4] {
        let sum = |m: &[Lanes<N>; N]| m.iter().map(|l| l.sum() as f64).sum::<f64>() / N as f64;
        [
            sum(&self.left_to_top),
            sum(&self.bottom_to_top),
            sum(&self.left_to_right),
            sum(&self.bottom_to_right),
        ]
    }
}

/// Quarter-circle rasterisation: `circles[r][x]` is the largest vertical offset
/// inside the radius-`r` disc at horizontal offset `x`.
pub fn compute_circles() -> Vec<Vec<usize>> {
    let mut circles = Vec::with_capacity(MAX_LIGHT_RANGE + 1);
    circles.push(vec![0]);
    for r in 1..=MAX_LIGHT_RANGE {
        let mut row = vec![0; r + 1];
        row[0] = r;
        let diagonal = r as f64 / 2f64.sqrt();
        let rr = (r * r) as f64;
        for (x, v) in row.iter_mut().enumerate().skip(1) {
            *v = if x as f64 <= diagonal {
                (rr - (x * x) as f64).sqrt().ceil() as usize
            } else {
                (rr - ((x - 1) * (x - 1)) as f64).sqrt().floor() as usize
            };
        }
        circles.push(row);
    }
    circles
}

/// Spread cells for every offset up to `MAX_LIGHT_RANGE`, plus the circle table.
pub struct SpreadTable<const N: usize> {
    cells: Vec<SpreadCell<N>>,
    circles: Vec<Vec<usize>>,
}

impl<const N: usize> Default for SpreadTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SpreadTable<N> {
    pub fn new() -> Self {
        Self {
            cells: compute_cells::<N>(),
            circles: compute_circles(),
        }
    }

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> &SpreadCell<N> {
        &self.cells[(MAX_LIGHT_RANGE + 1) * col + row]
    }

    #[inline]
    pub fn circle(&self, range: usize) -> &[usize] {
        &self.circles[range]
    }
}

#[derive(Clone, Copy, Default)]
struct DistanceCache {
    top: f64,
    right: f64,
}

#[inline]
fn to_ticks(x: f64) -> usize {
    (DISTANCE_TICKS as f64 * x).round().clamp(0.0, DISTANCE_TICKS as f64) as usize
}

/// Builds the table column by column, carrying the accumulated path length of
/// the previous cells so the per-cell tick distances correct the drift between
/// the swept path and the true euclidean distance.
fn compute_cells<const N: usize>() -> Vec<SpreadCell<N>> {
    let side = MAX_LIGHT_RANGE + 1;
    let mut cells = vec![SpreadCell::<N>::distances_only(0, 0); side * side];
    let mut cache = vec![DistanceCache::default(); side];

    for row in 0..side {
        let cell = tile_spread::<N>(row, 0, 0.0, 0.0);
        cache[row] = DistanceCache {
            top: row as f64 + 1.0,
            right: row as f64 + cell.dist_right as f64 / DISTANCE_TICKS as f64,
        };
        cells[row] = cell;
    }

    for col in 1..side {
        let base = side * col;
        let cell = tile_spread::<N>(0, col, 0.0, 0.0);
        cache[0] = DistanceCache {
            top: col as f64 + cell.dist_top as f64 / DISTANCE_TICKS as f64,
            right: col as f64 + 1.0,
        };
        cells[base] = cell;

        for row in 1..side {
            let distance = hypot(col as f64, row as f64);
            let cell = tile_spread::<N>(
                row,
                col,
                cache[row].right - distance,
                cache[row - 1].top - distance,
            );
            let [lt, bt, lr, br] = cell.block_sums();
            let left = cache[row].right;
            let bottom = cache[row - 1].top;
            cache[row] = DistanceCache {
                top: cell.dist_top as f64 / DISTANCE_TICKS as f64 + lt * left + bt * bottom,
                right: cell.dist_right as f64 / DISTANCE_TICKS as f64 + lr * left + br * bottom,
            };
            cells[base + row] = cell;
        }
    }
    cells
}

fn tile_spread<const N: usize>(
    row: usize,
    col: usize,
    left_error: f64,
    bottom_error: f64,
) -> SpreadCell<N> {
    let (r, c) = (row as f64, col as f64);
    let distance = hypot(c, r);
    let mut to_top = hypot(c, r + 1.0) - distance;
    let mut to_right = hypot(c + 1.0, r) - distance;

    if row == 0 || col == 0 {
        return SpreadCell::distances_only(to_ticks(to_top), to_ticks(to_right));
    }

    let sections = 2 * N;
    // Boundary points of the incoming sections, relative to the tile's
    // bottom-left corner: down the left edge, then along the bottom edge.
    let mut points = Vec::with_capacity(sections);
    for k in 0..N {
        points.push((0.0, (N - 1 - k) as f64 / N as f64));
    }
    for k in 0..N {
        points.push(((k + 1) as f64 / N as f64, 0.0));
    }

    let mut light_from = vec![0.0; sections * sections];
    let mut area = vec![0.0; sections];
    sub_tile_spread(&points, row, col, &mut light_from, &mut area);

    let nf = N as f64;
    let block = |inputs: std::ops::Range<usize>, outputs: std::ops::Range<usize>| {
        let mut acc = 0.0;
        for i in inputs {
            for j in outputs.clone() {
                acc += light_from[i * sections + j];
            }
        }
        acc / nf
    };
    to_top -= block(0..N, 0..N) * left_error + block(N..sections, 0..N) * bottom_error;
    to_right -=
        block(0..N, N..sections) * left_error + block(N..sections, N..sections) * bottom_error;

    let mut cell = SpreadCell::distances_only(to_ticks(to_top), to_ticks(to_right));
    let mut prev_area = 0.0;
    for i in 0..sections {
        let weight = (area[i] - prev_area) as f32;
        prev_area = area[i];
        // Incoming sections: left edge top-down maps to horizontal lanes
        // high-to-low, bottom edge left-right maps to vertical lanes.
        let (is_left, lane) = if i < N { (true, N - 1 - i) } else { (false, i - N) };
        if is_left {
            cell.from_left[lane] = weight;
        } else {
            cell.from_bottom[lane] = weight;
        }
        for j in 0..sections {
            let v = light_from[i * sections + j] as f32;
            // Outgoing sections: top edge left-right is vertical lanes,
            // right edge top-down is horizontal lanes high-to-low.
            let (to_top_edge, out) = if j < N { (true, j) } else { (false, sections - 1 - j) };
            let target = match (is_left, to_top_edge) {
                (true, true) => &mut cell.left_to_top[lane],
                (true, false) => &mut cell.left_to_right[lane],
                (false, true) => &mut cell.bottom_to_top[lane],
                (false, false) => &mut cell.bottom_to_right[lane],
            };
            target[out] = v;
        }
    }
    cell
}

/// Traces a ray from the source centre through each section boundary point and
/// records, per section, the swept area of the tile and how much of each
/// outgoing section (in units of `1/N` edge) it covers.
fn sub_tile_spread(
    points: &[(f64, f64)],
    row: usize,
    col: usize,
    light_from: &mut [f64],
    area: &mut [f64],
) {
    let sections = points.len();
    let t_mult = 0.5 * sections as f64;
    let left_x = col as f64 - 0.5;
    let right_x = col as f64 + 0.5;
    let bottom_y = row as f64 - 0.5;
    let top_y = row as f64 + 0.5;

    let mut prev_t = 0.0;
    let mut index = 0;
    for (i, &(px, py)) in points.iter().enumerate() {
        let x1 = left_x + px;
        let y1 = bottom_y + py;
        let slope = y1 / x1;

        let mut x2 = right_x;
        let mut y2 = y1 + (x2 - x1) * slope;
        let t = if y2 > top_y {
            y2 = top_y;
            x2 = x1 + (y2 - y1) / slope;
            t_mult * (x2 - left_x)
        } else {
            t_mult * ((top_y - y2) + 1.0)
        };

        area[i] = (top_y - y1) * (x2 - left_x) - 0.5 * (y2 - y1) * (x2 - x1);

        for j in 0..sections {
            let jf = j as f64;
            light_from[index] = if jf + 1.0 <= prev_t || jf >= t {
                0.0
            } else {
                let mut v = if jf < prev_t { jf + 1.0 - prev_t } else { 1.0 };
                if jf + 1.0 > t {
                    v -= jf + 1.0 - t;
                }
                v
            };
            index += 1;
        }
        prev_t = t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_conservation<const N: usize>() {
        let table = SpreadTable::<N>::new();
        for col in 1..=12 {
            for row in 1..=12 {
                let cell = table.cell(row, col);
                let deposit = cell.from_left.sum() + cell.from_bottom.sum();
                assert!((deposit - 1.0).abs() < 1e-4, "deposit {deposit} at {row},{col}");
                let mut routed = 0.0;
                for l in 0..N {
                    for m in [&cell.left_to_top, &cell.left_to_right, &cell.bottom_to_top, &cell.bottom_to_right] {
                        for v in m[l].0 {
                            assert!((-1e-6..=1.0 + 1e-6).contains(&v));
                            routed += v;
                        }
                    }
                }
                assert!((routed - 2.0 * N as f32).abs() < 1e-3, "routed {routed} at {row},{col}");
                assert!(cell.from_left.0.iter().chain(cell.from_bottom.0.iter()).all(|&w| w >= -1e-6));
            }
        }
    }

    #[test]
    fn spread_conserves_light() {
        check_conservation::<1>();
        check_conservation::<2>();
        check_conservation::<4>();
    }

    #[test]
    fn axis_cells_hold_unit_distances() {
        let table = SpreadTable::<1>::new();
        // Straight up and straight right advance one full tile.
        assert_eq!(table.cell(3, 0).dist_top, DISTANCE_TICKS);
        assert_eq!(table.cell(0, 3).dist_right, DISTANCE_TICKS);
        // One tile up from (1, 0) along the diagonal is sqrt(2) - 1.
        let expect = ((2f64.sqrt() - 1.0) * DISTANCE_TICKS as f64).round() as usize;
        assert_eq!(table.cell(1, 0).dist_right, expect);
    }

    #[test]
    fn diagonal_cell_is_symmetric() {
        let table = SpreadTable::<1>::new();
        let c = table.cell(5, 5);
        assert!((c.from_left[0] - c.from_bottom[0]).abs() < 1e-5);
        assert!((c.left_to_right[0][0] - c.bottom_to_top[0][0]).abs() < 1e-5);
    }

    #[test]
    fn circles_stay_within_radius() {
        let circles = compute_circles();
        assert_eq!(circles.len(), MAX_LIGHT_RANGE + 1);
        for (r, row) in circles.iter().enumerate() {
            assert_eq!(row.len(), r + 1);
            assert_eq!(row[0], r);
            for w in row.windows(2) {
                assert!(w[0] >= w[1]);
            }
            assert!(row.iter().all(|&v| v <= r));
        }
        assert_eq!(circles[5], vec![5, 5, 5, 4, 4, 3]);
    }
}
