/// Numeric conversion helpers.
///
/// Lossless conversions between the machine integer, index and float types
/// used by the numeric tower, array indexing and display. Every helper
/// reports a failed conversion instead of silently truncating.
pub mod num;
