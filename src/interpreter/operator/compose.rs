use std::{fmt, sync::Arc};

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

/// The three shapes of `∘`, by which operands are functions.
enum Shape {
    /// `f∘g`: `f g R`, or `L f g R`.
    Functions(Arc<dyn Function>, Arc<dyn Function>),
    /// `A∘g`: `A g R`.
    BindLeft(Value, Arc<dyn Function>),
    /// `f∘B`: `R f B`.
    BindRight(Arc<dyn Function>, Value),
}

/// `∘`: composition, or currying an array into one side of a function.
pub struct Compose {
    shape: Shape,
}

impl Compose {
    /// Derives `f∘g`.
    pub fn derive_functions(_ip: &Interpreter, left: Value, right: Option<Value>)
                            -> EvalResult<Arc<dyn Function>> {
        let right = right_operand("∘", right)?;
        Ok(Arc::new(Self { shape: Shape::Functions(function_operand("∘", &left)?, function_operand("∘", &right)?) }))
    }

    /// Derives `A∘g`.
    pub fn derive_bind_left(_ip: &Interpreter, left: Value, right: Option<Value>)
                            -> EvalResult<Arc<dyn Function>> {
        let right = right_operand("∘", right)?;
        Ok(Arc::new(Self { shape: Shape::BindLeft(left, function_operand("∘", &right)?) }))
    }

    /// Derives `f∘B`.
    pub fn derive_bind_right(_ip: &Interpreter, left: Value, right: Option<Value>)
                             -> EvalResult<Arc<dyn Function>> {
        let right = right_operand("∘", right)?;
        Ok(Arc::new(Self { shape: Shape::BindRight(function_operand("∘", &left)?, right) }))
    }
}

impl Function for Compose {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        match (&self.shape, left) {
            (Shape::Functions(f, g), left) => {
                let inner = g.call(ip, None, right)?;
                f.call(ip, left, inner)
            },
            (Shape::BindLeft(a, g), None) => g.call(ip, Some(a.clone()), right),
            (Shape::BindRight(f, b), None) => f.call(ip, Some(right), b.clone()),
            (_, Some(left)) => Err(RuntimeError::domain(&self.to_string(), Some(&left), &right)),
        }
    }
}

impl fmt::Display for Compose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            Shape::Functions(l, r) => write!(f, "{l}∘{r}"),
            Shape::BindLeft(a, r) => write!(f, "{a}∘{r}"),
            Shape::BindRight(l, b) => write!(f, "{l}∘{b}"),
        }
    }
}

/// `f⍨`: `R f R` monadically, `R f L` dyadically.
pub struct Commute {
    function: Arc<dyn Function>,
}

impl Commute {
    /// Derives `f⍨`.
    pub fn derive(_ip: &Interpreter, left: Value, _right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        Ok(Arc::new(Self { function: function_operand("⍨", &left)? }))
    }
}

impl Function for Commute {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        match left {
            Some(left) => self.function.call(ip, Some(right), left),
            None => self.function.call(ip, Some(right.clone()), right),
        }
    }
}

impl fmt::Display for Commute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}⍨", self.function)
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::RuntimeError, interpreter::evaluator::core::Interpreter};

    fn run(line: &str) -> Result<String, RuntimeError> {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).expect("parses");
        Ok(ip.eval_program(&program)?.pop().map(|v| v.to_string()).unwrap_or_default())
    }

    #[test]
    fn composes_two_functions() {
        assert_eq!(run("-∘⌽ 1 2 3").unwrap(), "¯3 ¯2 ¯1");
        assert_eq!(run("1 2 3 +∘⌽ 10 20 30").unwrap(), "31 22 13");
    }

    #[test]
    fn curries_arrays() {
        assert_eq!(run("2∘× 1 2 3").unwrap(), "2 4 6");
        assert_eq!(run("-∘1 5").unwrap(), "4");
        assert_eq!(run("1 2∘× 3").unwrap(), "3 6");
        assert!(matches!(run("4 (2∘×) 3"), Err(RuntimeError::DomainMismatch { .. })));
    }

    #[test]
    fn commute_swaps_or_duplicates() {
        assert_eq!(run("×⍨3").unwrap(), "9");
        assert_eq!(run("2 -⍨ 10").unwrap(), "8");
    }
}
