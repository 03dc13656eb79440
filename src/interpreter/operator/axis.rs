use std::{fmt, sync::Arc};

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::{
            core::{EvalResult, Interpreter},
            function::Function,
        },
        operator::{function_operand, right_operand},
        value::core::{AxisArgument, Value},
    },
    util::num::i64_to_usize,
};

/// `f⍂k`: calls `f` with its right argument tagged with axis `k`.
///
/// Primitives that work along an axis accept the tagged argument through a
/// dedicated overload; everything else rejects it as a domain mismatch.
pub struct Axis {
    function: Arc<dyn Function>,
    axis:     usize,
}

impl Axis {
    /// Derives `f⍂k`, converting `k` from the current origin.
    pub fn derive(ip: &Interpreter, left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        let right = right_operand("⍂", right)?;
        let k = right.as_integer()
                     .ok_or_else(|| RuntimeError::domain("⍂", Some(&left), &right))?;
        let axis = i64_to_usize(k - ip.config().origin).ok_or(RuntimeError::IndexOutOfBounds { index:  k,
                                                                                                length: 0, })?;
        Ok(Arc::new(Self { function: function_operand("⍂", &left)?,
                           axis }))
    }

    fn tag(&self, right: Value) -> Value {
        Value::Axis(Arc::new(AxisArgument { value: right,
                                            axis:  self.axis, }))
    }
}

impl Function for Axis {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        self.function.call(ip, left, self.tag(right))
    }

    fn select(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        self.function.select(ip, left, self.tag(right))
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}⍂{}", self.function, self.axis)
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::RuntimeError, interpreter::evaluator::core::Interpreter};

    fn run(ip: &mut Interpreter, line: &str) -> Result<String, RuntimeError> {
        let program = ip.parse(line).expect("parses");
        Ok(ip.eval_program(&program)?.pop().map(|v| v.to_string()).unwrap_or_default())
    }

    #[test]
    fn tags_the_argument_for_axis_aware_primitives() {
        let mut ip = Interpreter::new();
        assert_eq!(run(&mut ip, "⌽⍂1 (2 2⍴⍳4)").unwrap(), "3 4\n1 2");
        assert_eq!(run(&mut ip, "1⌽⍂2 (2 3⍴⍳6)").unwrap(), "2 3 1\n5 6 4");
    }

    #[test]
    fn axes_follow_the_origin() {
        let mut ip = Interpreter::new();
        ip.config_mut().origin = 0;
        assert_eq!(run(&mut ip, "⌽⍂0 (2 2⍴⍳4)").unwrap(), "2 3\n0 1");
        assert!(matches!(run(&mut ip, "⌽⍂¯1 (1 2)"), Err(RuntimeError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn other_functions_reject_tagged_arguments() {
        let mut ip = Interpreter::new();
        assert!(matches!(run(&mut ip, "-⍂1 (1 2)"), Err(RuntimeError::DomainMismatch { .. })));
    }
}
