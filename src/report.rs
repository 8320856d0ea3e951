use glint_geom::Rgb;
use glint_grid::TileArea;

const RAMP: &[u8] = b" .:-=+*#%@";

/// Summary of one lightmap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightStats {
    pub brightest: Rgb,
    pub brightest_at: (usize, usize),
    pub mean_luminance: f32,
    pub lit_tiles: usize,
}

pub fn light_stats(lights: &[Rgb], area: TileArea) -> LightStats {
    let mut stats = LightStats {
        brightest: Rgb::ZERO,
        brightest_at: (0, 0),
        mean_luminance: 0.0,
        lit_tiles: 0,
    };
    let mut best = f32::NEG_INFINITY;
    let mut total = 0.0f64;
    for (i, c) in lights.iter().take(area.len()).enumerate() {
        let l = c.luminance();
        total += l as f64;
        if l > 0.0 {
            stats.lit_tiles += 1;
        }
        if l > best {
            best = l;
            stats.brightest = *c;
            stats.brightest_at = area.coords(i);
        }
    }
    if !area.is_empty() {
        stats.mean_luminance = (total / area.len() as f64) as f32;
    }
    stats
}

/// Renders luminance row by row with a ten-step character ramp.
pub fn ascii_lightmap(lights: &[Rgb], area: TileArea) -> String {
    let mut out = String::with_capacity((area.width + 1) * area.height);
    for y in 0..area.height {
        for x in 0..area.width {
            let l = lights.get(area.idx(x, y)).map_or(0.0, |c| c.luminance());
            let step = (l.clamp(0.0, 1.0) * (RAMP.len() - 1) as f32).round() as usize;
            out.push(RAMP[step] as char);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_find_brightest() {
        let area = TileArea::new(3, 2);
        let mut lights = vec![Rgb::ZERO; area.len()];
        lights[area.idx(2, 1)] = Rgb::ONE;
        lights[area.idx(0, 1)] = Rgb::splat(0.5);
        let s = light_stats(&lights, area);
        assert_eq!(s.brightest_at, (2, 1));
        assert_eq!(s.lit_tiles, 2);
        assert!(s.mean_luminance > 0.0);
    }

    #[test]
    fn ascii_ramp_ends() {
        let area = TileArea::new(2, 2);
        let lights = vec![Rgb::ZERO, Rgb::ONE, Rgb::splat(4.0), Rgb::ZERO];
        assert_eq!(ascii_lightmap(&lights, area), " @\n@ \n");
    }
}
