/// Largest integer value exactly representable as an `f64` (`2^53 - 1`).
pub const MAX_SAFE_U64_INT: u64 = 9_007_199_254_740_991;

/// Converts an `i64` to `f64` if and only if it is exactly representable.
///
/// ## Errors
/// Returns `Err(error)` if the magnitude exceeds [`MAX_SAFE_U64_INT`].
///
/// ## Example
/// ```
/// use aplomb::util::num::{MAX_SAFE_U64_INT, i64_to_f64_checked};
///
/// assert_eq!(i64_to_f64_checked(42, "too big"), Ok(42.0));
///
/// let big = MAX_SAFE_U64_INT as i64 + 1;
/// assert!(i64_to_f64_checked(big, "too big").is_err());
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn i64_to_f64_checked<E>(value: i64, error: E) -> Result<f64, E> {
    if value.unsigned_abs() > MAX_SAFE_U64_INT {
        return Err(error);
    }
    Ok(value as f64)
}

/// Converts an `i64` to `f64`, accepting precision loss above `2^53`.
///
/// Used by the tower when promoting an overflowing integer operand to the
/// float class, where an approximate result is the expected outcome.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub const fn i64_to_f64_lossy(value: i64) -> f64 {
    value as f64
}

/// Converts an `f64` to `i64` if the value is finite, integral and in range.
///
/// ## Example
/// ```
/// use aplomb::util::num::f64_to_i64_exact;
///
/// assert_eq!(f64_to_i64_exact(1000.0), Some(1000));
/// assert_eq!(f64_to_i64_exact(1.5), None);
/// assert_eq!(f64_to_i64_exact(1e20), None);
/// assert_eq!(f64_to_i64_exact(f64::NAN), None);
/// ```
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn f64_to_i64_exact(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value.abs() > MAX_SAFE_U64_INT as f64 {
        return None;
    }
    Some(value as i64)
}

/// Converts an `i64` to a `usize`, rejecting negative values.
#[must_use]
pub fn i64_to_usize(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

/// Converts a `usize` to an `i64`, rejecting values above `i64::MAX`.
#[must_use]
pub fn usize_to_i64(value: usize) -> Option<i64> {
    i64::try_from(value).ok()
}

/// Converts a `usize` count to `f64` if it is exactly representable.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn usize_to_f64(value: usize) -> Option<f64> {
    if value as u64 > MAX_SAFE_U64_INT {
        return None;
    }
    Some(value as f64)
}
