use std::sync::Arc;

use crate::interpreter::evaluator::registry::PrimitiveHandler;

/// Dictionaries and channels: `#`, monadic `<` and draining `,`.
pub mod container;
/// Matrix inverse and least-squares division, `⌹`.
pub mod matrix;
/// Scalar arithmetic, comparison and logic.
///
/// Every function here pervades nested arrays and is written once per
/// numeric class; on overflow or an out-of-class result it is retried one
/// class higher in the tower.
pub mod scalar;
/// Shape-oriented functions: index generation, reshape, catenation,
/// rotation, take and drop, and the identity functions.
pub mod structural;
/// Monadic and general dyadic transpose, `⍉`.
pub mod transpose;

/// Returns every reference primitive overload in registration order.
///
/// Later entries are probed first, so specific overloads of a symbol follow
/// its general ones.
#[must_use]
pub fn handlers() -> Vec<Arc<dyn PrimitiveHandler>> {
    let mut handlers = scalar::handlers();
    handlers.extend(structural::handlers());
    handlers.extend(transpose::handlers());
    handlers.extend(matrix::handlers());
    handlers.extend(container::handlers());
    handlers
}
