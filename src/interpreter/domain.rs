/// Arrays, vectors and matrices, with element domains nested inside.
pub mod array;
/// The domain traits and the combinators that compose them.
///
/// A domain is a pure predicate plus converter. On rejection it must hand
/// its inputs back unchanged, which is what makes probing a list of
/// overloads safe.
pub mod core;
/// Scalar kinds: numbers, booleans, indices, strings, functions and the
/// container kinds that never nest.
pub mod scalar;
