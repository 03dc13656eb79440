/// Assignment targets and their evaluation.
///
/// Normalizes the unevaluated left side of `←` into a plain, vector,
/// indexed, selective or output target and stores into it.
pub mod assignment;

/// Interpreter state and expression evaluation.
///
/// Contains the `Interpreter`, its settings and output sink, and the walk
/// over the expression tree.
pub mod core;

/// The `Function` trait and the functions every interpreter provides:
/// primitive dispatch, lambdas and trains.
pub mod function;

/// Bracket index resolution shared by indexing and indexed assignment.
pub mod indexing;

/// Per-interpreter tables of primitive overloads and operators.
pub mod registry;

/// Elementwise application with scalar extension.
///
/// Shared by the scalar primitives and the each operator.
pub mod broadcast;
