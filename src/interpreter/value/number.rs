use std::fmt;

use crate::{interpreter::value::complex::Complex, util::num::f64_to_i64_exact};

/// Number of significant digits used when no interpreter configuration is at
/// hand.
pub const DEFAULT_PRECISION: usize = 10;

/// Identifies a numeric class independently of any value.
///
/// Towers are built from these tags, so a tower can be described and
/// validated without reflecting on concrete number types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberTag {
    /// Machine integers.
    Integer,
    /// Double precision floats.
    Float,
    /// Complex numbers with float parts.
    Complex,
}

impl fmt::Display for NumberTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

/// A number managed by the numeric tower.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// A 64 bit integer.
    Integer(i64),
    /// A double precision float. `NaN` and the infinities are kept in-band.
    Float(f64),
    /// A complex number.
    Complex(Complex),
}

impl Number {
    /// Returns the class tag of this number.
    #[must_use]
    pub const fn tag(&self) -> NumberTag {
        match self {
            Self::Integer(_) => NumberTag::Integer,
            Self::Float(_) => NumberTag::Float,
            Self::Complex(_) => NumberTag::Complex,
        }
    }

    /// Returns the number as an `f64` if it has no imaginary part.
    ///
    /// Integers above `2^53` lose precision.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(x) => Some(*x),
            Self::Complex(c) if c.im == 0.0 => Some(c.re),
            Self::Complex(_) => None,
        }
    }

    /// Returns the number as a complex number.
    #[must_use]
    pub fn as_complex(&self) -> Complex {
        match self {
            Self::Complex(c) => *c,
            _ => Complex::from(self.as_f64().unwrap_or(f64::NAN)),
        }
    }

    /// Returns the number as an `i64` if it is integral.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::number::Number;
    ///
    /// assert_eq!(Number::Float(3.0).as_i64(), Some(3));
    /// assert_eq!(Number::Float(3.5).as_i64(), None);
    /// assert_eq!(Number::Integer(-7).as_i64(), Some(-7));
    /// ```
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(x) => f64_to_i64_exact(*x),
            Self::Complex(c) if c.im == 0.0 => f64_to_i64_exact(c.re),
            Self::Complex(_) => None,
        }
    }

    /// Returns `true` if the number is zero in any class.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Integer(n) => *n == 0,
            Self::Float(x) => *x == 0.0,
            Self::Complex(c) => c.is_zero(),
        }
    }

    /// Promotes the number one step along the built-in class order
    /// (integer, float, complex), independent of any tower.
    #[must_use]
    pub fn widen(self) -> Option<Self> {
        match self {
            Self::Integer(n) => Some(Self::Float(crate::util::num::i64_to_f64_lossy(n))),
            Self::Float(x) => Some(Self::Complex(Complex::from(x))),
            Self::Complex(_) => None,
        }
    }

    /// Compares two numbers by value, across classes.
    #[must_use]
    pub fn numeric_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Complex(_), _) | (_, Self::Complex(_)) => {
                self.as_complex() == other.as_complex()
            },
            _ => self.as_f64() == other.as_f64(),
        }
    }

    /// Renders the number with `precision` significant digits.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::{complex::Complex, number::Number};
    ///
    /// assert_eq!(Number::Integer(-3).format(10), "¯3");
    /// assert_eq!(Number::Float(0.25).format(10), "0.25");
    /// assert_eq!(Number::Float(1.0 / 3.0).format(4), "0.3333");
    /// assert_eq!(Number::Float(f64::INFINITY).format(10), "∞");
    /// assert_eq!(Number::Complex(Complex::new(1.0, -2.0)).format(10), "1J¯2");
    /// ```
    #[must_use]
    pub fn format(&self, precision: usize) -> String {
        match self {
            Self::Integer(n) => format_integer(*n),
            Self::Float(x) => format_float(*x, precision),
            Self::Complex(c) => {
                format!("{}J{}", format_float(c.re, precision), format_float(c.im, precision))
            },
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.numeric_eq(other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(DEFAULT_PRECISION))
    }
}

/// Renders an integer with a high minus.
#[must_use]
pub fn format_integer(n: i64) -> String {
    if n < 0 {
        format!("¯{}", n.unsigned_abs())
    } else {
        n.to_string()
    }
}

/// Renders a float with `precision` significant digits.
///
/// Exponents from `-5` up to the precision print in positional notation,
/// anything else as `mantissaEexponent`. Trailing zeros are trimmed and
/// negative signs become high minus.
#[must_use]
pub fn format_float(x: f64, precision: usize) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "∞".to_string() } else { "¯∞".to_string() };
    }
    if x == 0.0 {
        return "0".to_string();
    }

    let digits = precision.max(1);
    let scientific = format!("{:.*e}", digits - 1, x);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific.replace('-', "¯");
    };
    let exponent: i64 = exponent.parse().unwrap_or(0);

    let rendered = if exponent < -5 || exponent >= i64::try_from(digits).unwrap_or(i64::MAX) {
        format!("{}E{}", trim_zeros(mantissa), exponent)
    } else {
        let decimals = usize::try_from(i64::try_from(digits).unwrap_or(0) - 1 - exponent).unwrap_or(0);
        trim_zeros(&format!("{x:.decimals$}")).to_string()
    };
    rendered.replace('-', "¯")
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Parses an integer lexeme such as `42` or `¯7`.
#[must_use]
pub fn parse_integer(lexeme: &str) -> Option<Number> {
    let (negative, digits) = split_sign(lexeme);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let text = if negative { format!("-{digits}") } else { digits.to_string() };
    text.parse().ok().map(Number::Integer)
}

/// Parses a float lexeme such as `3.14`, `.5`, `¯2.5E¯3` or `1e10`.
///
/// # Example
/// ```
/// use aplomb::interpreter::value::number::{Number, parse_float};
///
/// assert_eq!(parse_float("¯2.5E¯1"), Some(Number::Float(-0.25)));
/// assert_eq!(parse_float("inf"), None);
/// ```
#[must_use]
pub fn parse_float(lexeme: &str) -> Option<Number> {
    parse_real(lexeme).map(Number::Float)
}

/// Parses a complex lexeme: `1J2` (cartesian), `2a90` (magnitude and angle
/// in degrees) or a plain real.
#[must_use]
pub fn parse_complex(lexeme: &str) -> Option<Number> {
    if let Some((re, im)) = lexeme.split_once(['J', 'j']) {
        return Some(Number::Complex(Complex::new(parse_real(re)?, parse_real(im)?)));
    }
    if let Some((magnitude, degrees)) = lexeme.split_once('a') {
        return Some(Number::Complex(Complex::from_polar_degrees(parse_real(magnitude)?,
                                                                parse_real(degrees)?)));
    }
    parse_real(lexeme).map(|re| Number::Complex(Complex::from(re)))
}

fn split_sign(lexeme: &str) -> (bool, &str) {
    lexeme.strip_prefix('¯').map_or((false, lexeme), |rest| (true, rest))
}

fn parse_real(lexeme: &str) -> Option<f64> {
    let (negative, body) = split_sign(lexeme);
    let (mantissa, exponent) = match body.split_once(['E', 'e']) {
        Some((m, e)) => (m, Some(e)),
        None => (body, None),
    };
    if mantissa.is_empty()
       || !mantissa.bytes().all(|b| b.is_ascii_digit() || b == b'.')
       || mantissa.bytes().filter(|&b| b == b'.').count() > 1
       || !mantissa.bytes().any(|b| b.is_ascii_digit())
    {
        return None;
    }
    let mut text = String::new();
    if negative {
        text.push('-');
    }
    text.push_str(mantissa);
    if let Some(exponent) = exponent {
        let (negative, digits) = split_sign(exponent);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.push('e');
        if negative {
            text.push('-');
        }
        text.push_str(digits);
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_switch_to_exponent_notation() {
        assert_eq!(format_float(1e12, 10), "1E12");
        assert_eq!(format_float(123_456.0, 10), "123456");
        assert_eq!(format_float(-0.000_001_5, 10), "¯1.5E¯6");
        assert_eq!(format_float(2.0, 10), "2");
    }

    #[test]
    fn complex_literals() {
        assert_eq!(parse_complex("1J¯2"), Some(Number::Complex(Complex::new(1.0, -2.0))));
        let polar = parse_complex("2a90").and_then(|n| match n {
                                             Number::Complex(c) => Some(c),
                                             _ => None,
                                         });
        let polar = polar.unwrap();
        assert!(polar.re.abs() < 1e-12);
        assert!((polar.im - 2.0).abs() < 1e-12);
    }

    #[test]
    fn integers_reject_fractions() {
        assert_eq!(parse_integer("12"), Some(Number::Integer(12)));
        assert_eq!(parse_integer("¯12"), Some(Number::Integer(-12)));
        assert_eq!(parse_integer("1.5"), None);
        assert_eq!(parse_integer("1E3"), None);
    }

    #[test]
    fn cross_class_equality() {
        assert_eq!(Number::Integer(2), Number::Float(2.0));
        assert_eq!(Number::Float(2.0), Number::Complex(Complex::new(2.0, 0.0)));
        assert_ne!(Number::Integer(2), Number::Complex(Complex::new(2.0, 1.0)));
    }
}
