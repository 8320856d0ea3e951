//! Tile-grid lightmap propagation: quadrant flood engines and radiance cascades.
#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use glint_geom::Rgb;
use glint_grid::{Medium, NonSolidProbe, TileArea};
use serde::Deserialize;

pub mod budget;
pub mod cascades;
pub mod config;
pub mod decay;
pub mod flood;
pub mod gamma;
mod gi;
pub mod media;
pub mod scheduler;
pub mod spread;

pub use cascades::RadianceCascadesEngine;
pub use config::{MediumDecays, PropagateParams};
pub use flood::{FloodEngine, FloodEngine1x, FloodEngine2x, FloodEngine4x};
pub use gamma::GammaConverter;

/// Longest distance, in tiles, any flood travels from its source.
pub const MAX_LIGHT_RANGE: usize = 64;
/// Sub-tile resolution of the decay curves.
pub const DISTANCE_TICKS: usize = 256;
/// Index of the diagonal-step entry in every decay curve.
pub const DIAGONAL_TICK: usize = DISTANCE_TICKS + 1;

/// Read-only scene inputs of one frame.
#[derive(Clone, Copy)]
pub struct LightFrame<'a> {
    pub area: TileArea,
    pub media: &'a [Medium],
    pub non_solid: &'a dyn NonSolidProbe,
}

impl<'a> LightFrame<'a> {
    pub fn new(area: TileArea, media: &'a [Medium], non_solid: &'a dyn NonSolidProbe) -> Self {
        Self {
            area,
            media,
            non_solid,
        }
    }

    /// Checks the buffers against the area. Logs and returns false on mismatch.
    pub fn validate(&self, lights: &[Rgb]) -> bool {
        if self.area.is_empty() {
            log::trace!(target: "lighting", "empty light area; nothing to do");
            return false;
        }
        let len = self.area.len();
        if self.media.len() < len || lights.len() < len {
            log::warn!(
                target: "lighting",
                "light area {}x{} needs {len} tiles but got {} media / {} lights; skipping frame",
                self.area.width,
                self.area.height,
                self.media.len(),
                lights.len()
            );
            return false;
        }
        true
    }
}

impl fmt::Debug for LightFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LightFrame")
            .field("area", &self.area)
            .field("media", &self.media.len())
            .finish_non_exhaustive()
    }
}

/// A light propagation algorithm. Implementations are interchangeable.
pub trait LightingEngine: Send {
    fn mode(&self) -> EngineMode;

    /// Applies new parameters, rebuilding only the tables and workers that changed.
    fn reconfigure(&mut self, params: &PropagateParams);

    /// Replaces the primary light in `lights` with the propagated lightmap.
    fn spread_light(&mut self, frame: &LightFrame<'_>, lights: &mut [Rgb]);

    /// Last frame's approximate work estimate, if the engine budgets by it.
    fn temporal_work(&self) -> Option<u64> {
        None
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    Flood1x,
    #[default]
    Flood2x,
    Flood4x,
    RadianceCascades,
}

impl EngineMode {
    pub const ALL: [EngineMode; 4] = [
        EngineMode::Flood1x,
        EngineMode::Flood2x,
        EngineMode::Flood4x,
        EngineMode::RadianceCascades,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EngineMode::Flood1x => "flood1x",
            EngineMode::Flood2x => "flood2x",
            EngineMode::Flood4x => "flood4x",
            EngineMode::RadianceCascades => "radiance_cascades",
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        EngineMode::ALL
            .into_iter()
            .find(|m| m.name() == s || (s == "rc" && *m == EngineMode::RadianceCascades))
            .ok_or_else(|| {
                format!("unknown engine mode '{s}' (expected flood1x, flood2x, flood4x or radiance_cascades)")
            })
    }
}

pub fn create_engine(mode: EngineMode) -> Box<dyn LightingEngine> {
    match mode {
        EngineMode::Flood1x => Box::new(FloodEngine1x::new()),
        EngineMode::Flood2x => Box::new(FloodEngine2x::new()),
        EngineMode::Flood4x => Box::new(FloodEngine4x::new()),
        EngineMode::RadianceCascades => Box::new(RadianceCascadesEngine::new()),
    }
}

/// Reconfigures `engine` and returns the propagated lightmap for `light_in`.
///
/// An empty or inconsistent frame yields `light_in` unchanged.
pub fn propagate(
    engine: &mut dyn LightingEngine,
    frame: &LightFrame<'_>,
    light_in: &[Rgb],
    params: &PropagateParams,
) -> Vec<Rgb> {
    let mut lights = light_in.to_vec();
    if !frame.validate(&lights) {
        return lights;
    }
    engine.reconfigure(params);
    let len = frame.area.len();
    engine.spread_light(frame, &mut lights[..len]);
    lights
}
