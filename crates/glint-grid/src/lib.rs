//! Tile grid data model: medium classification, processed area and tile buffers.
#![forbid(unsafe_code)]

use glint_geom::Rgb;

/// Per-tile medium classification consumed by the lighting engines.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Medium {
    #[default]
    Air = 0,
    Solid = 1,
    Water = 2,
    Honey = 3,
    /// Nominally solid but lets light pass without exit loss.
    NonSolid = 4,
}

impl Medium {
    pub const COUNT: usize = 5;
    pub const ALL: [Medium; Medium::COUNT] = [
        Medium::Air,
        Medium::Solid,
        Medium::Water,
        Medium::Honey,
        Medium::NonSolid,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Only fully solid tiles count as opaque for exit loss and GI seeding.
    #[inline]
    pub const fn is_opaque(self) -> bool {
        matches!(self, Medium::Solid)
    }
}

/// Host accessor answering "is this nominally-solid tile actually non-solid".
///
/// Coordinates are world tile coordinates (area origin plus local offset).
pub trait NonSolidProbe: Sync {
    fn is_non_solid(&self, wx: i32, wy: i32) -> bool;
}

impl<F> NonSolidProbe for F
where
    F: Fn(i32, i32) -> bool + Sync,
{
    #[inline]
    fn is_non_solid(&self, wx: i32, wy: i32) -> bool {
        self(wx, wy)
    }
}

/// Probe for hosts without non-solid tiles.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoNonSolid;

impl NonSolidProbe for NoNonSolid {
    #[inline]
    fn is_non_solid(&self, _wx: i32, _wy: i32) -> bool {
        false
    }
}

/// The rectangle of world tiles processed in one frame.
///
/// Storage is column-major: `idx = height * x + y`, so a unit stride moves
/// vertically and a `height` stride moves horizontally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileArea {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: usize,
    pub height: usize,
}

impl TileArea {
    #[inline]
    pub const fn new(width: usize, height: usize) -> Self {
        Self {
            origin_x: 0,
            origin_y: 0,
            width,
            height,
        }
    }

    #[inline]
    pub const fn with_origin(mut self, origin_x: i32, origin_y: i32) -> Self {
        self.origin_x = origin_x;
        self.origin_y = origin_y;
        self
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub const fn idx(&self, x: usize, y: usize) -> usize {
        self.height * x + y
    }

    #[inline]
    pub const fn coords(&self, idx: usize) -> (usize, usize) {
        (idx / self.height, idx % self.height)
    }

    #[inline]
    pub const fn world(&self, x: usize, y: usize) -> (i32, i32) {
        (self.origin_x + x as i32, self.origin_y + y as i32)
    }
}

/// Media and primary light for one processed area.
#[derive(Clone, Debug, Default)]
pub struct TileBuf {
    pub area: TileArea,
    pub media: Vec<Medium>,
    pub lights: Vec<Rgb>,
}

impl TileBuf {
    pub fn new(area: TileArea) -> Self {
        Self {
            area,
            media: vec![Medium::Air; area.len()],
            lights: vec![Rgb::ZERO; area.len()],
        }
    }

    /// Wraps existing media, padding with air or truncating to the area size.
    pub fn from_media(area: TileArea, media: Vec<Medium>) -> Self {
        let mut m = media;
        let expect = area.len();
        if m.len() != expect {
            m.resize(expect, Medium::Air);
        }
        Self {
            area,
            media: m,
            lights: vec![Rgb::ZERO; expect],
        }
    }

    #[inline]
    pub fn medium(&self, x: usize, y: usize) -> Medium {
        self.media[self.area.idx(x, y)]
    }

    #[inline]
    pub fn set_medium(&mut self, x: usize, y: usize, m: Medium) {
        let i = self.area.idx(x, y);
        self.media[i] = m;
    }

    #[inline]
    pub fn light(&self, x: usize, y: usize) -> Rgb {
        self.lights[self.area.idx(x, y)]
    }

    #[inline]
    pub fn set_light(&mut self, x: usize, y: usize, c: Rgb) {
        let i = self.area.idx(x, y);
        self.lights[i] = c;
    }

    /// Fills an axis-aligned rectangle (inclusive bounds, clipped to the area).
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, m: Medium) {
        if self.area.is_empty() {
            return;
        }
        let x1 = x1.min(self.area.width.saturating_sub(1));
        let y1 = y1.min(self.area.height.saturating_sub(1));
        for x in x0..=x1 {
            for y in y0..=y1 {
                self.set_medium(x, y, m);
            }
        }
    }

    pub fn count(&self, m: Medium) -> usize {
        self.media.iter().filter(|&&v| v == m).count()
    }
}
