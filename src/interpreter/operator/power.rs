use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::{
            core::{EvalResult, Interpreter},
            function::Function,
        },
        operator::{function_operand, right_operand},
        value::core::Value,
    },
};

enum Until {
    /// Apply exactly this many times.
    Count(i64),
    /// Apply until `g(new, previous)` is 1.
    Test(Arc<dyn Function>),
}

/// `f⍣n` and `f⍣g`: repeated application.
///
/// A dyadic call curries its left argument into every application.
pub struct Power {
    function: Arc<dyn Function>,
    until:    Until,
}

impl Power {
    /// Derives `f⍣n` from an integer right operand.
    pub fn derive_count(_ip: &Interpreter, left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        let right = right_operand("⍣", right)?;
        let n = right.as_integer()
                     .ok_or_else(|| RuntimeError::domain("⍣", Some(&left), &right))?;
        Ok(Arc::new(Self { function: function_operand("⍣", &left)?,
                           until:    Until::Count(n), }))
    }

    /// Derives `f⍣g` from a function right operand.
    pub fn derive_until(_ip: &Interpreter, left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        let right = right_operand("⍣", right)?;
        Ok(Arc::new(Self { function: function_operand("⍣", &left)?,
                           until:    Until::Test(function_operand("⍣", &right)?), }))
    }
}

impl Function for Power {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        match &self.until {
            Until::Count(n) if *n < 0 => {
                Err(RuntimeError::Unsupported { details: format!("{self} with a negative count needs an inverse") })
            },
            Until::Count(n) => {
                let mut value = right;
                for _ in 0..*n {
                    value = self.function.call(ip, left.clone(), value)?;
                }
                Ok(value)
            },
            Until::Test(test) => {
                let limit = ip.config().power_limit;
                let mut previous = right;
                for iteration in 0..limit {
                    let next = self.function.call(ip, left.clone(), previous.clone())?;
                    let done = test.call(ip, Some(next.clone()), previous)?;
                    let done = done.as_bool()
                                   .ok_or_else(|| RuntimeError::InvalidArgument { details: format!("⍣ test gave {done}, not a boolean") })?;
                    if done {
                        trace!(iterations = iteration + 1, "power converged");
                        return Ok(next);
                    }
                    previous = next;
                }
                Err(RuntimeError::PowerLimit { limit })
            },
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.until {
            Until::Count(n) => write!(f, "{}⍣{n}", self.function),
            Until::Test(test) => write!(f, "{}⍣{test}", self.function),
        }
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
    fn repeats_a_fixed_number_of_times() {
        let mut ip = Interpreter::new();
        assert_eq!(run(&mut ip, "{2×⍵}⍣3 1").unwrap(), "8");
        assert_eq!(run(&mut ip, "{2×⍵}⍣0 5").unwrap(), "5");
        assert_eq!(run(&mut ip, "10 +⍣2 1").unwrap(), "21");
    }

    #[test]
    fn negative_counts_are_unsupported() {
        let mut ip = Interpreter::new();
        assert!(matches!(run(&mut ip, "-⍣¯1 1"), Err(RuntimeError::Unsupported { .. })));
    }

    #[test]
    fn iterates_to_a_fixed_point() {
        let mut ip = Interpreter::new();
        assert_eq!(run(&mut ip, "{⌊⍵÷2}⍣= 100").unwrap(), "0");
    }

    #[test]
    fn stops_at_the_iteration_limit() {
        let mut ip = Interpreter::new();
        ip.config_mut().power_limit = 10;
        assert_eq!(run(&mut ip, "{⍵+1}⍣= 0").unwrap_err(), RuntimeError::PowerLimit { limit: 10 });
    }
}
