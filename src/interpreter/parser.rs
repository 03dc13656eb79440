/// Expression-level parsing and the program entry point.
///
/// Resolves the two ambiguous productions of the grammar (function or
/// operand first, array or derived function) by backtracking on a copy of
/// the token iterator.
pub mod core;
/// Functions, operators and trains.
pub mod function;
/// Lambda literals and their guard lists.
pub mod lambda;
/// Array operands: literals, names, strands, parentheses, lists and bracket
/// indexing.
pub mod operand;
/// Token helpers and name conventions shared by the parser.
pub mod utils;
