/// Arrays and their storage.
///
/// Defines `Array`, its uniform and general backings, reshape, unify, cell
/// splitting and the conform rule used when per-cell results are put back
/// together.
pub mod array;
/// Complex number support.
///
/// Defines the `Complex` type used by the top class of the default tower,
/// with the elementary functions the scalar primitives need.
pub mod complex;
/// Bounded value streams between threads.
pub mod channel;
/// The runtime value type and its capability traits.
pub mod core;
/// Insertion-ordered dictionaries keyed by scalars.
pub mod dict;
/// Numbers, numeric class tags, literal parsing and display.
pub mod number;
/// The pluggable numeric tower.
///
/// A tower is an ordered list of numeric classes, each able to parse a
/// lexeme and promote a value into the class above it. Scalar primitives are
/// written once per class and retried one class higher on failure.
pub mod tower;
