use fastnoise_lite::{FastNoiseLite, NoiseType};
use glint_geom::Rgb;
use glint_grid::{Medium, TileArea, TileBuf};

use crate::config::SceneSettings;

/// Builds a cave scene: rock carved by noise, liquid pools in the lower part
/// and scattered emitters in open air, plus any explicit lights.
pub fn generate_scene(s: &SceneSettings) -> TileBuf {
    let area = TileArea::new(s.width, s.height).with_origin(s.origin[0], s.origin[1]);
    let mut buf = TileBuf::new(area);

    let mut caves = FastNoiseLite::with_seed(s.seed);
    caves.set_noise_type(Some(NoiseType::OpenSimplex2));
    caves.set_frequency(Some(s.cave_frequency));

    let mut liquid = FastNoiseLite::with_seed(s.seed.wrapping_add(1));
    liquid.set_noise_type(Some(NoiseType::OpenSimplex2));
    liquid.set_frequency(Some(s.cave_frequency * 0.5));

    // High-frequency value noise acts as a per-tile coin flip.
    let mut scatter = FastNoiseLite::with_seed(s.seed.wrapping_add(2));
    scatter.set_noise_type(Some(NoiseType::Value));
    scatter.set_frequency(Some(0.9));

    let liquid_row = (s.liquid_level.clamp(0.0, 1.0) * s.height as f32) as usize;
    let emit_above = 1.0 - 2.0 * s.emitter_density.clamp(0.0, 1.0);
    let emitter = Rgb::new(s.emitter_color[0], s.emitter_color[1], s.emitter_color[2]);

    for x in 0..s.width {
        for y in 0..s.height {
            let (wx, wy) = area.world(x, y);
            let (nx, ny) = (wx as f32, wy as f32);
            if caves.get_noise_2d(nx, ny) > s.cave_threshold {
                buf.set_medium(x, y, Medium::Solid);
                continue;
            }
            if y >= liquid_row {
                let honey = (liquid.get_noise_2d(nx, ny) + 1.0) * 0.5 < s.honey_share;
                buf.set_medium(x, y, if honey { Medium::Honey } else { Medium::Water });
                continue;
            }
            if scatter.get_noise_2d(nx, ny) > emit_above {
                buf.set_light(x, y, emitter);
            }
        }
    }

    for l in &s.lights {
        if l.x < s.width && l.y < s.height {
            buf.set_light(l.x, l.y, Rgb::new(l.color[0], l.color[1], l.color[2]));
        } else {
            log::warn!("scene light ({}, {}) lies outside {}x{}; ignored", l.x, l.y, s.width, s.height);
        }
    }

    log::debug!(
        "scene {}x{}: solid={} water={} honey={} emitters={}",
        s.width,
        s.height,
        buf.count(Medium::Solid),
        buf.count(Medium::Water),
        buf.count(Medium::Honey),
        buf.lights.iter().filter(|c| c.max_channel() > 0.0).count()
    );
    buf
}
