use std::{
    hash::{Hash, Hasher},
    ops,
};

use ordered_float::OrderedFloat;

/// `0J0`.
pub const ZERO: Complex = Complex::new(0.0, 0.0);
/// `1J0`.
pub const ONE: Complex = Complex::new(1.0, 0.0);

/// A complex number, the top class of the default numeric tower.
///
/// Equality and hashing go through [`OrderedFloat`], so `NaN` parts compare
/// equal to themselves and complex numbers can key dictionaries.
#[derive(Debug, Clone, Copy)]
pub struct Complex {
    /// The real part.
    pub re: f64,
    /// The imaginary part.
    pub im: f64,
}

impl Complex {
    /// Constructs a complex number from its parts.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::complex::Complex;
    /// let c = Complex::new(5.0, -1.0);
    /// assert_eq!(c.re, 5.0);
    /// assert_eq!(c.im, -1.0);
    /// ```
    #[must_use]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Constructs a complex number from a magnitude and an angle in degrees,
    /// the meaning of the `a` marker in literals such as `1a90`.
    #[must_use]
    pub fn from_polar_degrees(magnitude: f64, degrees: f64) -> Self {
        let radians = degrees.to_radians();
        Self { re: magnitude * radians.cos(),
               im: magnitude * radians.sin(), }
    }

    /// Returns the magnitude.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::complex::Complex;
    /// assert_eq!(Complex::new(3.0, 4.0).abs(), 5.0);
    /// ```
    #[must_use]
    pub fn abs(&self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Returns the phase angle in radians.
    #[must_use]
    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Returns the complex conjugate.
    #[must_use]
    pub const fn conj(&self) -> Self {
        Self { re: self.re,
               im: -self.im, }
    }

    /// Returns `1/z`. Division by zero yields non-finite parts.
    #[must_use]
    pub fn recip(&self) -> Self {
        ONE / *self
    }

    /// Returns `e^z`.
    #[must_use]
    pub fn exp(&self) -> Self {
        let scale = self.re.exp();
        Self { re: scale * self.im.cos(),
               im: scale * self.im.sin(), }
    }

    /// Returns the principal natural logarithm.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::complex::Complex;
    /// let ln = Complex::new(-1.0, 0.0).ln();
    /// assert!(ln.re.abs() < 1e-12);
    /// assert!((ln.im - std::f64::consts::PI).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn ln(&self) -> Self {
        Self { re: self.abs().ln(),
               im: self.arg(), }
    }

    /// Raises `self` to a complex power through `exp(w·ln z)`.
    ///
    /// `0^w` is `0` for any `w` with a positive real part and `1` for `w = 0`.
    #[must_use]
    pub fn pow(&self, exponent: Self) -> Self {
        if self.is_zero() {
            if exponent.is_zero() {
                return ONE;
            }
            return ZERO;
        }
        (exponent * self.ln()).exp()
    }

    /// Returns the principal square root.
    #[must_use]
    pub fn sqrt(&self) -> Self {
        let r = self.abs();
        Self { re: f64::midpoint(r, self.re).sqrt(),
               im: ((r - self.re) / 2.0).sqrt().copysign(self.im), }
    }

    /// Returns `true` if both parts are exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }

    /// Returns `true` if both parts are finite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

impl ops::Neg for Complex {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self { re: -self.re,
               im: -self.im, }
    }
}

impl ops::Add for Complex {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self { re: self.re + rhs.re,
               im: self.im + rhs.im, }
    }
}

impl ops::Sub for Complex {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self { re: self.re - rhs.re,
               im: self.im - rhs.im, }
    }
}

impl ops::Mul for Complex {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self { re: self.re.mul_add(rhs.re, -(self.im * rhs.im)),
               im: self.re.mul_add(rhs.im, self.im * rhs.re), }
    }
}

impl ops::Div for Complex {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        let denom = rhs.re.mul_add(rhs.re, rhs.im * rhs.im);
        Self { re: self.re.mul_add(rhs.re, self.im * rhs.im) / denom,
               im: self.im.mul_add(rhs.re, -(self.re * rhs.im)) / denom, }
    }
}

impl From<f64> for Complex {
    fn from(re: f64) -> Self {
        Self { re, im: 0.0 }
    }
}

impl PartialEq for Complex {
    fn eq(&self, other: &Self) -> bool {
        OrderedFloat(self.re) == OrderedFloat(other.re)
        && OrderedFloat(self.im) == OrderedFloat(other.im)
    }
}

impl Eq for Complex {}

impl Hash for Complex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        OrderedFloat(self.re).hash(state);
        OrderedFloat(self.im).hash(state);
    }
}
