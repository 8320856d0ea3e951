use glint_geom::Rgb;

pub const DEFAULT_GAMMA: f32 = 2.2;

/// Power-law conversion between gamma-encoded and linear light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GammaConverter {
    gamma: f32,
    reciprocal: f32,
}

impl Default for GammaConverter {
    fn default() -> Self {
        Self::new(DEFAULT_GAMMA)
    }
}

impl GammaConverter {
    pub fn new(gamma: f32) -> Self {
        Self {
            gamma,
            reciprocal: 1.0 / gamma,
        }
    }

    #[inline]
    pub fn to_linear(&self, x: f32) -> f32 {
        if x < 0.0 { 0.0 } else { x.powf(self.gamma) }
    }

    #[inline]
    pub fn to_gamma(&self, x: f32) -> f32 {
        if x < 0.0 { 0.0 } else { x.powf(self.reciprocal) }
    }

    #[inline]
    pub fn rgb_to_linear(&self, c: Rgb) -> Rgb {
        c.map(|v| self.to_linear(v))
    }

    #[inline]
    pub fn rgb_to_gamma(&self, c: Rgb) -> Rgb {
        c.map(|v| self.to_gamma(v))
    }
}
