/// Overload domains: predicates and converters for primitive arguments and
/// operator operands.
///
/// A domain either accepts a call, possibly converting its arguments, or
/// hands the arguments back untouched so the next overload can try them.
/// Domains compose, so an overload states what it accepts declaratively.
///
/// # Responsibilities
/// - Defines the `SingleDomain` and `Domain` traits.
/// - Provides the scalar, array and combinator domains used at registration.
pub mod domain;
/// The evaluator walks the expression tree and holds interpreter state.
///
/// # Responsibilities
/// - Owns variable scopes, the registry, the numeric tower and settings.
/// - Dispatches primitive calls over their overloads and derives operator
///   functions.
/// - Resolves indexing and every assignment form.
pub mod evaluator;
/// The lexer turns one logical line into tokens.
///
/// Symbols are accepted only if the registry knows them, and a line buffer
/// joins physical lines until every lambda brace is closed.
pub mod lexer;
/// Default operators: reduce, scan, replicate, each, compose, commute,
/// power, rank, axis, at, stencil and the inner and outer products.
pub mod operator;
/// The parser builds the expression tree from tokens.
///
/// Binding depends on the registry: whether a symbol is a primitive or an
/// operator, and an operator's arity, change how a line groups.
///
/// # Responsibilities
/// - Parses strands, trains, lambdas, operator chains and assignments.
/// - Reports grammar violations with the offending token's position.
pub mod parser;
/// Reference primitive functions, each a list of overloads registered with
/// the evaluator.
pub mod primitive;
/// Runtime values: numbers, arrays, lists, dictionaries, channels and
/// functions, with the numeric tower they are promoted through.
pub mod value;
