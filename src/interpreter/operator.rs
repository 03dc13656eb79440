use std::sync::Arc;

use crate::{
    error::RuntimeError,
    interpreter::{
        domain::{
            array::{to_index_array, to_index_vector},
            core::{any, monadic, not, predicate, split},
            scalar::{is_function, to_index},
        },
        evaluator::{
            core::EvalResult,
            function::Function,
            registry::{Operator, OperatorDef},
        },
        value::core::{Callable, Value},
    },
};

/// Selective replacement, `@`.
pub mod at;
/// Axis tagging, `⍂`.
pub mod axis;
/// Composition and currying with `∘`, and commute `⍨`.
pub mod compose;
/// Each, `¨`, over arrays and channels.
///
/// On a channel the derived function runs as a pipeline stage on its own
/// thread and returns the downstream channel at once.
pub mod each;
/// Repetition, `⍣`.
pub mod power;
/// Inner product `f.g` and outer product `∘.f`.
pub mod product;
/// Cell-wise application, `⍤`.
pub mod rank;
/// Reduce, scan and replicate: `/ ⌿ \ ⍀`.
pub mod reduce;
/// Windowed application, `⌺`.
pub mod stencil;

/// Unwraps a function operand, or reports it as a domain mismatch of the
/// operator `symbol`.
pub(crate) fn function_operand(symbol: &str, operand: &Value) -> EvalResult<Arc<dyn Function>> {
    operand.as_function()
           .ok_or_else(|| RuntimeError::domain(symbol, None, operand))
}

/// Unwraps the right operand of a dyadic operator.
pub(crate) fn right_operand(symbol: &str, operand: Option<Value>) -> EvalResult<Value> {
    operand.ok_or_else(|| RuntimeError::InvalidArgument { details: format!("{symbol} needs a right operand") })
}

/// Separates an argument tagged by `⍂` into the value and its axis.
pub(crate) fn split_axis(value: Value) -> (Value, Option<usize>) {
    match value {
        Value::Axis(tagged) => (tagged.value.clone(), Some(tagged.axis)),
        other => (other, None),
    }
}

/// Returns the default operators in registration order.
///
/// Registrations sharing a symbol are probed newest first, so the more
/// specific operand shapes come last.
#[must_use]
pub fn operators() -> Vec<Arc<dyn Operator>> {
    let is_jot = || predicate("∘", |v| matches!(v, Value::Function(f) if f.symbol() == Some("∘")));

    vec![Arc::new(OperatorDef::monadic("/", "reduce", monadic(is_function()), reduce::Reduce::derive_last)),
         Arc::new(OperatorDef::monadic("/", "replicate", monadic(to_index_array()), reduce::Replicate::derive_last)),
         Arc::new(OperatorDef::monadic("⌿", "reduce first", monadic(is_function()), reduce::Reduce::derive_first)),
         Arc::new(OperatorDef::monadic("⌿",
                                       "replicate first",
                                       monadic(to_index_array()),
                                       reduce::Replicate::derive_first)),
         Arc::new(OperatorDef::monadic("\\", "scan", monadic(is_function()), reduce::Scan::derive_last)),
         Arc::new(OperatorDef::monadic("⍀", "scan first", monadic(is_function()), reduce::Scan::derive_first)),
         Arc::new(OperatorDef::monadic("¨", "each", monadic(is_function()), each::Each::derive)),
         Arc::new(OperatorDef::monadic("⍨", "commute", monadic(is_function()), compose::Commute::derive)),
         Arc::new(OperatorDef::dyadic("∘",
                                      "compose",
                                      split(is_function(), is_function()),
                                      compose::Compose::derive_functions)),
         Arc::new(OperatorDef::dyadic("∘",
                                      "bind left",
                                      split(not(is_function()), is_function()),
                                      compose::Compose::derive_bind_left)),
         Arc::new(OperatorDef::dyadic("∘",
                                      "bind right",
                                      split(is_function(), not(is_function())),
                                      compose::Compose::derive_bind_right)),
         Arc::new(OperatorDef::dyadic("⍣", "power", split(is_function(), to_index()), power::Power::derive_count)),
         Arc::new(OperatorDef::dyadic("⍣", "power until", split(is_function(), is_function()), power::Power::derive_until)),
         Arc::new(OperatorDef::dyadic("⍤", "rank", split(is_function(), to_index_vector()), rank::Rank::derive)),
         Arc::new(OperatorDef::dyadic("⍂", "axis", split(is_function(), to_index()), axis::Axis::derive)),
         Arc::new(OperatorDef::dyadic("@", "at", split(any(), any()), at::At::derive)),
         Arc::new(OperatorDef::dyadic("⌺", "stencil", split(is_function(), to_index_array()), stencil::Stencil::derive)),
         Arc::new(OperatorDef::dyadic(".", "inner product", split(is_function(), is_function()), product::Inner::derive)),
         Arc::new(OperatorDef::dyadic(".", "outer product", split(is_jot(), is_function()), product::Outer::derive)),]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::evaluator::core::Interpreter;

    #[test]
    fn every_symbol_keeps_one_arity() {
        let mut ip = Interpreter::new();
        for op in operators() {
            assert!(ip.register_operator(op).is_ok());
        }
    }

    #[test]
    fn array_operands_pick_the_array_overload() {
        let mut ip = Interpreter::new();
        let program = ip.parse("1 0 1/4 5 6 ⋄ +/4 5 6").unwrap();
        let values = ip.eval_program(&program).unwrap();
        assert_eq!(values[0].to_string(), "4 6");
        assert_eq!(values[1].to_string(), "15");
    }

    #[test]
    fn unmatched_operands_are_domain_errors() {
        let mut ip = Interpreter::new();
        let program = ip.parse("1 2 ⍣ 3").unwrap();
        assert!(matches!(ip.eval_program(&program), Err(RuntimeError::DomainMismatch { .. })));
    }
}
