use std::path::Path;

use glint_lighting::{EngineMode, PropagateParams};
use serde::Deserialize;

/// Driver settings file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub scene: SceneSettings,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub mode: EngineMode,
    #[serde(flatten)]
    pub params: PropagateParams,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub width: usize,
    pub height: usize,
    pub origin: [i32; 2],
    pub seed: i32,
    pub cave_frequency: f32,
    /// Noise above this value becomes solid rock.
    pub cave_threshold: f32,
    /// Fraction of the height below which open tiles flood with liquid.
    pub liquid_level: f32,
    /// Share of liquid that is honey instead of water.
    pub honey_share: f32,
    /// Approximate fraction of open tiles that emit light.
    pub emitter_density: f32,
    pub emitter_color: [f32; 3],
    pub lights: Vec<SceneLight>,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            width: 160,
            height: 90,
            origin: [0, 0],
            seed: 1337,
            cave_frequency: 0.045,
            cave_threshold: 0.1,
            liquid_level: 0.75,
            honey_share: 0.2,
            emitter_density: 0.004,
            emitter_color: [1.0, 0.82, 0.55],
            lights: Vec::new(),
        }
    }
}

/// An explicit light placed on top of the generated scene.
#[derive(Clone, Debug, Deserialize)]
pub struct SceneLight {
    pub x: usize,
    pub y: usize,
    pub color: [f32; 3],
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings, String> {
    let s = std::fs::read_to_string(path).map_err(|e| format!("read error: {}", e))?;
    toml::from_str(&s).map_err(|e| format!("parse error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_defaults() {
        let s: Settings = toml::from_str(
            r#"
            [engine]
            mode = "radiance_cascades"
            thread_count = 3
            exit_loss_fraction = 0.25

            [engine.decays]
            solid = 0.4
            honey = [0.7, 0.6, 0.5]

            [scene]
            width = 40

            [[scene.lights]]
            x = 3
            y = 4
            color = [1.0, 0.5, 0.0]
            "#,
        )
        .unwrap();
        assert_eq!(s.engine.mode, EngineMode::RadianceCascades);
        assert_eq!(s.engine.params.thread_count, 3);
        assert_eq!(s.engine.params.exit_loss_fraction, 0.25);
        assert_eq!(s.engine.params.decays.solid, 0.4);
        assert_eq!(s.engine.params.decays.air, 0.91);
        assert_eq!(s.scene.width, 40);
        assert_eq!(s.scene.height, SceneSettings::default().height);
        assert_eq!(s.scene.lights.len(), 1);
        assert_eq!(s.scene.lights[0].color, [1.0, 0.5, 0.0]);
    }

    #[test]
    fn empty_file_is_default() {
        let s: Settings = toml::from_str("").unwrap();
        assert_eq!(s.engine.mode, EngineMode::Flood2x);
        assert!(s.engine.params.use_temporal_budgeting);
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = load_settings_from_path(Path::new("/nonexistent/glint.toml")).unwrap_err();
        assert!(err.starts_with("read error"));
    }
}
