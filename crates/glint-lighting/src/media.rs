use glint_geom::Rgb;
use glint_grid::Medium;

use crate::LightFrame;
use crate::gamma::GammaConverter;
use crate::scheduler::WorkerPool;

/// Effective medium of one tile after applying the non-solid rules.
#[inline]
pub fn effective_medium(
    m: Medium,
    non_solid_opaque: bool,
    is_non_solid: impl FnOnce() -> bool,
) -> Medium {
    match m {
        Medium::Solid if !non_solid_opaque && is_non_solid() => Medium::NonSolid,
        Medium::NonSolid if non_solid_opaque => Medium::Solid,
        m => m,
    }
}

/// Resolves the frame's media into `out` (grown as needed), one column per task.
pub fn resolve_media<S: Default + Send>(
    pool: &WorkerPool<S>,
    frame: &LightFrame<'_>,
    non_solid_opaque: bool,
    out: &mut Vec<Medium>,
) {
    let area = frame.area;
    let len = area.len();
    if out.len() < len {
        out.resize(len, Medium::Air);
    }
    let media = frame.media;
    let probe = frame.non_solid;
    pool.for_each_chunk(&mut out[..len], area.height, |x, column| {
        let base = area.height * x;
        for (y, m) in column.iter_mut().enumerate() {
            *m = effective_medium(media[base + y], non_solid_opaque, || {
                let (wx, wy) = area.world(x, y);
                probe.is_non_solid(wx, wy)
            });
        }
    });
}

/// Converts a gamma-encoded buffer to linear in place, one column per task.
pub fn linearize<S: Default + Send>(
    pool: &WorkerPool<S>,
    lights: &mut [Rgb],
    height: usize,
    gamma: &GammaConverter,
) {
    pool.for_each_chunk(lights, height, |_, column| {
        for c in column.iter_mut() {
            *c = gamma.rgb_to_linear(*c);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_solid_rules() {
        assert_eq!(effective_medium(Medium::Solid, false, || true), Medium::NonSolid);
        assert_eq!(effective_medium(Medium::Solid, false, || false), Medium::Solid);
        assert_eq!(effective_medium(Medium::Solid, true, || true), Medium::Solid);
        assert_eq!(effective_medium(Medium::NonSolid, true, || false), Medium::Solid);
        assert_eq!(effective_medium(Medium::NonSolid, false, || false), Medium::NonSolid);
        assert_eq!(effective_medium(Medium::Water, false, || true), Medium::Water);
    }
}
