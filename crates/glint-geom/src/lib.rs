//! Light sample and small fixed-width vector math shared by the lighting crates.
#![forbid(unsafe_code)]

use core::ops::{Add, AddAssign, Index, IndexMut, Mul, MulAssign};

/// Three-channel light sample. Channels are non-negative in every buffer the engines produce.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const ZERO: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const ONE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { r: v, g: v, b: v }
    }

    /// Component-wise maximum; the blend rule for every lightmap write.
    #[inline]
    pub fn max(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r.max(rhs.r), self.g.max(rhs.g), self.b.max(rhs.b))
    }

    #[inline]
    pub fn max_channel(self) -> f32 {
        self.r.max(self.g.max(self.b))
    }

    #[inline]
    pub fn length(self) -> f32 {
        (self.r * self.r + self.g * self.g + self.b * self.b).sqrt()
    }

    /// True when every channel is at or below `v`.
    #[inline]
    pub fn all_le(self, v: f32) -> bool {
        self.r <= v && self.g <= v && self.b <= v
    }

    /// True when any channel is strictly below the matching channel of `rhs`.
    #[inline]
    pub fn any_lt(self, rhs: Rgb) -> bool {
        self.r < rhs.r || self.g < rhs.g || self.b < rhs.b
    }

    #[inline]
    pub fn map(self, f: impl Fn(f32) -> f32) -> Rgb {
        Rgb::new(f(self.r), f(self.g), f(self.b))
    }

    /// Rec. 709 weighted brightness, used for reporting only.
    #[inline]
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }
}

impl Add for Rgb {
    type Output = Rgb;
    #[inline]
    fn add(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for Rgb {
    #[inline]
    fn add_assign(&mut self, rhs: Rgb) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl Mul<f32> for Rgb {
    type Output = Rgb;
    #[inline]
    fn mul(self, rhs: f32) -> Rgb {
        Rgb::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

impl Mul<Rgb> for f32 {
    type Output = Rgb;
    #[inline]
    fn mul(self, rhs: Rgb) -> Rgb {
        rhs * self
    }
}

impl Mul for Rgb {
    type Output = Rgb;
    #[inline]
    fn mul(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

impl MulAssign<f32> for Rgb {
    #[inline]
    fn mul_assign(&mut self, rhs: f32) {
        self.r *= rhs;
        self.g *= rhs;
        self.b *= rhs;
    }
}

impl MulAssign for Rgb {
    #[inline]
    fn mul_assign(&mut self, rhs: Rgb) {
        self.r *= rhs.r;
        self.g *= rhs.g;
        self.b *= rhs.b;
    }
}

/// Fixed-width scalar vector carrying the sub-rays of one quadrant edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lanes<const N: usize>(pub [f32; N]);

impl<const N: usize> Lanes<N> {
    pub const ZERO: Self = Self([0.0; N]);

    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self([v; N])
    }

    #[inline]
    pub fn dot(self, rhs: Self) -> f32 {
        let mut acc = 0.0;
        for i in 0..N {
            acc += self.0[i] * rhs.0[i];
        }
        acc
    }

    #[inline]
    pub fn sum(self) -> f32 {
        self.0.iter().sum()
    }

    /// `self + rhs * k`, the accumulate step of a lane transfer.
    #[inline]
    pub fn mul_add(self, rhs: Self, k: f32) -> Self {
        let mut out = self;
        for i in 0..N {
            out.0[i] += rhs.0[i] * k;
        }
        out
    }
}

impl<const N: usize> Default for Lanes<N> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const N: usize> Add for Lanes<N> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        let mut out = self;
        for i in 0..N {
            out.0[i] += rhs.0[i];
        }
        out
    }
}

impl<const N: usize> Mul<f32> for Lanes<N> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        let mut out = self;
        for v in out.0.iter_mut() {
            *v *= rhs;
        }
        out
    }
}

impl<const N: usize> MulAssign<f32> for Lanes<N> {
    #[inline]
    fn mul_assign(&mut self, rhs: f32) {
        for v in self.0.iter_mut() {
            *v *= rhs;
        }
    }
}

impl<const N: usize> Index<usize> for Lanes<N> {
    type Output = f32;
    #[inline]
    fn index(&self, i: usize) -> &f32 {
        &self.0[i]
    }
}

impl<const N: usize> IndexMut<usize> for Lanes<N> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.0[i]
    }
}

#[inline]
pub fn hypot(x: f64, y: f64) -> f64 {
    (x * x + y * y).sqrt()
}

#[inline]
pub fn hypot_f32(x: f32, y: f32) -> f32 {
    (x * x + y * y).sqrt()
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn finite(v: Rgb) -> bool {
        v.r.is_finite() && v.g.is_finite() && v.b.is_finite()
    }

    proptest! {
        #[test]
        fn max_is_commutative_and_idempotent(a in any::<Rgb>(), b in any::<Rgb>()) {
            prop_assume!(finite(a) && finite(b));
            prop_assert_eq!(a.max(b), b.max(a));
            prop_assert_eq!(a.max(a), a);
            prop_assert_eq!(a.max(b).max(b), a.max(b));
        }
    }

    #[test]
    fn lanes_dot_and_mul_add() {
        let a = Lanes([1.0, 2.0]);
        let b = Lanes([0.5, 0.25]);
        assert_eq!(a.dot(b), 1.0);
        assert_eq!(Lanes::<2>::ZERO.mul_add(a, 2.0), Lanes([2.0, 4.0]));
        assert_eq!((a * 0.5).sum(), 1.5);
    }
}
