use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A point on the complex plane, stored as two `f64` components.
///
/// `Copy` and operator-only: the escape loop works on the raw components,
/// everything else (viewport math, tile origins) uses the operators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

    #[inline]
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Squared magnitude `re² + im²`. The escape test compares against this
    /// directly so the hot loop never takes a square root.
    #[inline]
    pub fn norm_sq(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// `z² + c`, the Mandelbrot step.
    #[inline]
    pub fn square_add(self, c: Self) -> Self {
        Self {
            re: self.re * self.re - self.im * self.im + c.re,
            im: 2.0 * self.re * self.im + c.im,
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

impl Add for Complex {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// Scales both components, used to turn pixel offsets into plane offsets.
impl Mul<f64> for Complex {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.re * rhs, self.im * rhs)
    }
}

impl std::fmt::Display for Complex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.im.is_sign_negative() {
            write!(f, "{} - {}i", self.re, -self.im)
        } else {
            write!(f, "{} + {}i", self.re, self.im)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn add_and_sub() {
        let a = Complex::new(1.5, -2.0);
        let b = Complex::new(0.5, 4.0);
        let sum = a + b;
        let diff = a - b;
        assert!(approx_eq(sum.re, 2.0) && approx_eq(sum.im, 2.0));
        assert!(approx_eq(diff.re, 1.0) && approx_eq(diff.im, -6.0));
    }

    #[test]
    fn product() {
        // (1 + 2i)(3 + 4i) = -5 + 10i
        let c = Complex::new(1.0, 2.0) * Complex::new(3.0, 4.0);
        assert!(approx_eq(c.re, -5.0));
        assert!(approx_eq(c.im, 10.0));
    }

    #[test]
    fn scalar_product_scales_both_parts() {
        let c = Complex::new(2.0, -3.0) * 0.5;
        assert!(approx_eq(c.re, 1.0));
        assert!(approx_eq(c.im, -1.5));
    }

    #[test]
    fn square_add_matches_operators() {
        let z = Complex::new(0.3, -0.7);
        let c = Complex::new(-0.1, 0.2);
        let expected = z * z + c;
        let got = z.square_add(c);
        assert!(approx_eq(got.re, expected.re));
        assert!(approx_eq(got.im, expected.im));
    }

    #[test]
    fn norm_sq_skips_the_root() {
        assert!(approx_eq(Complex::new(3.0, 4.0).norm_sq(), 25.0));
        assert!(approx_eq(Complex::new(-2.0, -2.0).norm_sq(), 8.0));
    }

    #[test]
    fn display_handles_sign() {
        assert_eq!(Complex::new(1.0, -2.0).to_string(), "1 - 2i");
        assert_eq!(Complex::new(-0.5, 0.25).to_string(), "-0.5 + 0.25i");
    }
}
