use std::sync::Arc;

use tracing::trace;

use crate::interpreter::{evaluator::core::Interpreter, value::core::Value};

/// Outcome of a domain conversion.
///
/// `Ok` carries the converted value; `Err` hands back the input unchanged so
/// the caller can offer it to the next handler.
pub type Converted<T> = Result<T, T>;

/// A predicate and converter for one argument.
pub trait SingleDomain: Send + Sync {
    /// Accepts and possibly converts `value`, or returns it untouched.
    fn to(&self, ip: &Interpreter, value: Value) -> Converted<Value>;
    /// Describes the accepted values, for docs and diagnostics.
    fn describe(&self) -> String;
}

/// A predicate and converter for a whole call: an optional left argument and
/// a right argument.
pub trait Domain: Send + Sync {
    /// Accepts and possibly converts both arguments, or returns both
    /// untouched.
    fn to(&self, ip: &Interpreter, left: Option<Value>, right: Value)
          -> Converted<(Option<Value>, Value)>;
    /// Describes the accepted calls.
    fn describe(&self) -> String;
}

/// A shared single-argument domain.
pub type Single = Arc<dyn SingleDomain>;
/// A shared call domain.
pub type Shared = Arc<dyn Domain>;

struct Check<F> {
    description: String,
    convert:     F,
}

impl<F> SingleDomain for Check<F> where F: Fn(&Interpreter, Value) -> Converted<Value> + Send + Sync
{
    fn to(&self, ip: &Interpreter, value: Value) -> Converted<Value> {
        (self.convert)(ip, value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Builds a single domain from a description and a conversion.
///
/// The conversion must return its input unchanged on failure.
pub fn check<F>(description: impl Into<String>, convert: F) -> Single
    where F: Fn(&Interpreter, Value) -> Converted<Value> + Send + Sync + 'static
{
    Arc::new(Check { description: description.into(),
                     convert })
}

/// Builds a single domain from a plain predicate; accepted values pass
/// through unconverted.
pub fn predicate<P>(description: impl Into<String>, accept: P) -> Single
    where P: Fn(&Value) -> bool + Send + Sync + 'static
{
    check(description, move |_, value| if accept(&value) { Ok(value) } else { Err(value) })
}

/// Accepts anything.
#[must_use]
pub fn any() -> Single {
    predicate("any value", |_| true)
}

/// Accepts what `inner` rejects, unconverted.
#[must_use]
pub fn not(inner: Single) -> Single {
    check(format!("not {}", inner.describe()), move |ip, value| {
        match inner.to(ip, value.clone()) {
            Ok(_) => Err(value),
            Err(_) => Ok(value),
        }
    })
}

/// Tries `first`, then `second`.
#[must_use]
pub fn or(first: Single, second: Single) -> Single {
    check(format!("{} or {}", first.describe(), second.describe()),
          move |ip, value| first.to(ip, value).or_else(|value| second.to(ip, value)))
}

struct Monadic(Single);
struct Dyadic(Single);
struct Split(Single, Single);

impl Domain for Monadic {
    fn to(&self, ip: &Interpreter, left: Option<Value>, right: Value)
          -> Converted<(Option<Value>, Value)> {
        if left.is_some() {
            return Err((left, right));
        }
        self.0.to(ip, right).map(|r| (None, r)).map_err(|r| (None, r))
    }

    fn describe(&self) -> String {
        format!("monadic {}", self.0.describe())
    }
}

impl Domain for Dyadic {
    fn to(&self, ip: &Interpreter, left: Option<Value>, right: Value)
          -> Converted<(Option<Value>, Value)> {
        both(ip, &self.0, &self.0, left, right)
    }

    fn describe(&self) -> String {
        format!("dyadic {}", self.0.describe())
    }
}

impl Domain for Split {
    fn to(&self, ip: &Interpreter, left: Option<Value>, right: Value)
          -> Converted<(Option<Value>, Value)> {
        both(ip, &self.0, &self.1, left, right)
    }

    fn describe(&self) -> String {
        format!("{} and {}", self.0.describe(), self.1.describe())
    }
}

fn both(ip: &Interpreter, l: &Single, r: &Single, left: Option<Value>, right: Value)
        -> Converted<(Option<Value>, Value)> {
    let Some(left) = left else {
        return Err((None, right));
    };
    let original = left.clone();
    let converted = match l.to(ip, left) {
        Ok(converted) => converted,
        Err(left) => return Err((Some(left), right)),
    };
    match r.to(ip, right) {
        Ok(right) => Ok((Some(converted), right)),
        Err(right) => {
            trace!(left = %l.describe(), right = %r.describe(), "right argument rejected");
            Err((Some(original), right))
        },
    }
}

/// A monadic call whose right argument satisfies `inner`.
#[must_use]
pub fn monadic(inner: Single) -> Shared {
    Arc::new(Monadic(inner))
}

/// A dyadic call whose arguments both satisfy `inner`.
#[must_use]
pub fn dyadic(inner: Single) -> Shared {
    Arc::new(Dyadic(inner))
}

/// A dyadic call with separate domains for each side.
#[must_use]
pub fn split(left: Single, right: Single) -> Shared {
    Arc::new(Split(left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{
        domain::{
            array::to_index_vector,
            scalar::{is_string, to_bool, to_index},
        },
        value::{array::Array, number::Number},
    };

    #[test]
    fn rejected_values_come_back_unchanged() {
        let ip = Interpreter::new();
        let rejected = to_index().to(&ip, Value::Number(Number::Float(2.5)));
        assert!(matches!(rejected, Err(Value::Number(Number::Float(x))) if x == 2.5));

        let rejected = to_bool().to(&ip, Value::Number(Number::Integer(2)));
        assert!(matches!(rejected, Err(Value::Number(Number::Integer(2)))));

        let rejected = not(any()).to(&ip, Value::Str("x".to_string()));
        assert!(matches!(rejected, Err(Value::Str(s)) if s == "x"));
    }

    #[test]
    fn accepted_values_are_converted() {
        let ip = Interpreter::new();
        assert!(matches!(to_index().to(&ip, Value::Number(Number::Float(3.0))), Ok(Value::Int(3))));
        assert!(matches!(or(is_string(), to_bool()).to(&ip, Value::Int(1)), Ok(Value::Bool(true))));
    }

    #[test]
    fn a_rejected_call_hands_back_the_original_arguments() {
        let ip = Interpreter::new();
        let domain = split(to_index(), is_string());
        let rejected = domain.to(&ip, Some(Value::Number(Number::Integer(2))), Value::Int(7));
        assert!(matches!(rejected, Err((Some(Value::Number(Number::Integer(2))), Value::Int(7)))));

        let rejected = monadic(any()).to(&ip, Some(Value::Int(1)), Value::Int(2));
        assert!(matches!(rejected, Err((Some(Value::Int(1)), Value::Int(2)))));

        let rejected = dyadic(any()).to(&ip, None, Value::Int(2));
        assert!(matches!(rejected, Err((None, Value::Int(2)))));
    }

    #[test]
    fn vector_domains_keep_rejected_arrays_intact() {
        let ip = Interpreter::new();
        let value = Value::from(Array::vector(vec![Value::Int(1), Value::Number(Number::Float(2.5))]));
        assert_eq!(to_index_vector().to(&ip, value.clone()), Err(value));

        let matrix = Value::from(Array::new(vec![2, 1], vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(to_index_vector().to(&ip, matrix.clone()), Err(matrix));
    }
}
