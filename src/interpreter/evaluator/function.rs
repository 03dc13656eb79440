use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    ast::{Guard, Lambda},
    error::RuntimeError,
    interpreter::{
        evaluator::core::{EvalResult, Interpreter},
        value::{array::Array, core::Value, number::Number},
    },
};

/// Anything that can be applied to one or two arguments.
///
/// Primitives, lambdas, trains and operator-derived functions all implement
/// this trait and travel as [`Value::Function`].
pub trait Function: Send + Sync + fmt::Display {
    /// Applies the function. `left` is `None` for a monadic call.
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value>;

    /// Applies the function to an array of raw-integer indices instead of
    /// values, for selective assignment.
    fn select(&self, _ip: &mut Interpreter, _left: Option<Value>, _right: Value) -> EvalResult<Value> {
        Err(RuntimeError::NotSelectable { function: self.to_string() })
    }

    /// The value a reduction over an empty axis yields, if the function has
    /// one.
    fn identity(&self) -> Option<Value> {
        None
    }

    /// The primitive symbol, for functions that are one.
    fn symbol(&self) -> Option<&str> {
        None
    }
}

/// A primitive symbol, dispatched over its registered overloads at call time.
pub struct PrimitiveFunction {
    symbol: String,
}

impl PrimitiveFunction {
    /// Creates a reference to the primitive `symbol`.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self { symbol: symbol.to_string() }
    }

    /// Probes the overloads newest first and runs the first whose domain
    /// accepts the arguments.
    fn dispatch(&self, ip: &mut Interpreter, left: Option<Value>, right: Value, selecting: bool)
                -> EvalResult<Value> {
        let registry = ip.registry_handle();
        let handlers = registry.primitives(&self.symbol);
        if handlers.is_empty() {
            return Err(RuntimeError::UnknownPrimitive { symbol: self.symbol.clone() });
        }

        let (mut left, mut right) = (left, right);
        for handler in handlers.iter().filter(|h| !selecting || h.selectable()) {
            match handler.domain().to(ip, left, right) {
                Ok((l, r)) => {
                    trace!(symbol = %self.symbol, domain = %handler.domain().describe(), "overload matched");
                    return handler.call(ip, l, r);
                },
                Err((l, r)) => {
                    left = l;
                    right = r;
                },
            }
        }

        if selecting {
            return Err(RuntimeError::NotSelectable { function: self.symbol.clone() });
        }
        Err(RuntimeError::domain(&self.symbol, left.as_ref(), &right))
    }
}

impl Function for PrimitiveFunction {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        self.dispatch(ip, left, right, false)
    }

    fn select(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        self.dispatch(ip, left, right, true)
    }

    fn identity(&self) -> Option<Value> {
        let n = match self.symbol.as_str() {
            "+" | "-" | "∨" | "≠" | "<" | ">" => Number::Integer(0),
            "×" | "÷" | "∧" | "=" | "≤" | "≥" => Number::Integer(1),
            "⌈" => Number::Float(f64::NEG_INFINITY),
            "⌊" => Number::Float(f64::INFINITY),
            _ => return None,
        };
        Some(Value::Number(n))
    }

    fn symbol(&self) -> Option<&str> {
        Some(&self.symbol)
    }
}

impl fmt::Display for PrimitiveFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A lambda literal.
///
/// Calls push a local scope binding `⍵` and, for dyadic calls, `⍺`. The
/// guards are tried in order; the first whose condition is `1` gives the
/// result.
pub struct LambdaFunction {
    lambda: Arc<Lambda>,
}

impl LambdaFunction {
    /// Wraps a parsed lambda.
    #[must_use]
    pub const fn new(lambda: Arc<Lambda>) -> Self {
        Self { lambda }
    }

    fn eval_guards(&self, ip: &mut Interpreter) -> EvalResult<Value> {
        for guard in &self.lambda.guards {
            match guard {
                Guard::Conditional { condition, body } => {
                    let value = ip.eval_expr(condition)?;
                    let holds = value.as_bool()
                                     .ok_or_else(|| RuntimeError::GuardNotBoolean { found: value.to_string() })?;
                    if holds {
                        return ip.eval_expr(body);
                    }
                },
                Guard::Unconditional(body) => return ip.eval_expr(body),
            }
        }
        Ok(Value::from(Array::empty()))
    }
}

impl Function for LambdaFunction {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        ip.push_scope();
        ip.define_local("⍵", right);
        if let Some(left) = left {
            ip.define_local("⍺", left);
        }
        let result = self.eval_guards(ip);
        ip.pop_scope();
        result
    }
}

impl fmt::Display for LambdaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lambda)
    }
}

/// Two-function train: `outer(inner(L, R))`.
pub struct Atop {
    outer: Arc<dyn Function>,
    inner: Arc<dyn Function>,
}

impl Atop {
    /// Composes `outer` atop `inner`.
    #[must_use]
    pub fn new(outer: Arc<dyn Function>, inner: Arc<dyn Function>) -> Self {
        Self { outer, inner }
    }
}

impl Function for Atop {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        let inner = self.inner.call(ip, left, right)?;
        self.outer.call(ip, None, inner)
    }
}

impl fmt::Display for Atop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.outer, self.inner)
    }
}

/// Three-function train: `middle(left(L, R), right(L, R))`.
pub struct Fork {
    left:   Arc<dyn Function>,
    middle: Arc<dyn Function>,
    right:  Arc<dyn Function>,
}

impl Fork {
    /// Creates a fork.
    #[must_use]
    pub fn new(left: Arc<dyn Function>, middle: Arc<dyn Function>, right: Arc<dyn Function>) -> Self {
        Self { left, middle, right }
    }
}

impl Function for Fork {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        let r = self.right.call(ip, left.clone(), right.clone())?;
        let l = self.left.call(ip, left, right)?;
        self.middle.call(ip, Some(l), r)
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.middle, self.right)
    }
}

/// The `∘` placeholder in `∘.f`. Only meaningful as an operand.
pub struct Jot;

impl Function for Jot {
    fn call(&self, _ip: &mut Interpreter, _left: Option<Value>, _right: Value) -> EvalResult<Value> {
        Err(RuntimeError::Unsupported { details: "∘ can only be the left operand of an outer product".to_string() })
    }

    fn symbol(&self) -> Option<&str> {
        Some("∘")
    }
}

impl fmt::Display for Jot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "∘")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &str) -> EvalResult<String> {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).expect("parses");
        let values = ip.eval_program(&program)?;
        Ok(values.last().map(ToString::to_string).unwrap_or_default())
    }

    #[test]
    fn lambdas_bind_alpha_and_omega() {
        assert_eq!(run("{⍺-⍵}/5 3").unwrap(), "2");
        assert_eq!(run("3 {⍺×⍵} 4").unwrap(), "12");
    }

    #[test]
    fn guards_pick_the_first_true_branch() {
        assert_eq!(run("{⍵>0:1⋄⍵<0:¯1⋄0} ¯4").unwrap(), "¯1");
        assert_eq!(run("{⍵=0:\"zero\":\"other\"} 0").unwrap(), "zero");
        assert!(matches!(run("{2:1⋄0} 1"), Err(RuntimeError::GuardNotBoolean { .. })));
    }

    #[test]
    fn lambda_scope_is_discarded() {
        let mut ip = Interpreter::new();
        let program = ip.parse("{⍵} 1").unwrap();
        ip.eval_program(&program).unwrap();
        assert_eq!(ip.lookup("⍵"), None);
    }

    #[test]
    fn trains_fork_and_atop() {
        assert_eq!(run("(+/÷≢) 1 2 3 4").unwrap(), "2.5");
        assert_eq!(run("(-+) 2").unwrap(), "¯2");
        assert_eq!(run("3 (+,-) 1").unwrap(), "4 2");
    }

    #[test]
    fn identities_follow_the_symbol() {
        assert_eq!(PrimitiveFunction::new("+").identity(), Some(Value::Number(Number::Integer(0))));
        assert_eq!(PrimitiveFunction::new("∧").identity(), Some(Value::Number(Number::Integer(1))));
        assert_eq!(PrimitiveFunction::new("⍴").identity(), None);
    }

    #[test]
    fn unmatched_overloads_name_both_types() {
        let error = run("1 + \"a\"").unwrap_err();
        assert_eq!(error,
                   RuntimeError::DomainMismatch { function: "+".into(),
                                                  left:     Some("integer".into()),
                                                  right:    "string".into(), });
    }
}
