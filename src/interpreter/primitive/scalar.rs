use std::sync::Arc;

use crate::{
    error::RuntimeError,
    interpreter::{
        domain::core::{Single, any, dyadic, monadic, predicate},
        evaluator::{
            broadcast::{compact, map_pairs, map_values},
            core::{Config, EvalResult, Interpreter},
            registry::{Handler, PrimitiveHandler},
        },
        value::{complex::Complex, core::Value, number::Number},
    },
    util::num::f64_to_i64_exact,
};

/// A monadic scalar function at one numeric class. `None` asks the tower to
/// retry one class higher.
type MonadicOp = fn(Number, &Config) -> Option<Value>;
/// A dyadic scalar function at one numeric class.
type DyadicOp = fn(Number, Number, &Config) -> Option<Value>;

/// Specifies the pervasive scalar functions by generating a lookup table.
///
/// Each entry provides:
/// - the primitive symbol,
/// - the monadic implementation, if any,
/// - the dyadic implementation, if any,
/// - a short description.
macro_rules! scalar_functions {
    (
        $(
            $symbol:literal => {
                monadic: $monadic:expr,
                dyadic: $dyadic:expr,
                doc: $doc:literal $(,)?
            }
        ),* $(,)?
    ) => {
        struct ScalarDef {
            symbol:  &'static str,
            monadic: Option<MonadicOp>,
            dyadic:  Option<DyadicOp>,
            doc:     &'static str,
        }
        static SCALAR_TABLE: &[ScalarDef] = &[
            $(
                ScalarDef { symbol: $symbol, monadic: $monadic, dyadic: $dyadic, doc: $doc },
            )*
        ];
    };
}

scalar_functions! {
    "+" => { monadic: Some(conjugate), dyadic: Some(add),      doc: "conjugate / add" },
    "-" => { monadic: Some(negate),    dyadic: Some(subtract), doc: "negate / subtract" },
    "×" => { monadic: Some(signum),    dyadic: Some(multiply), doc: "direction / multiply" },
    "÷" => { monadic: Some(reciprocal), dyadic: Some(divide),  doc: "reciprocal / divide" },
    "*" => { monadic: Some(exp),       dyadic: Some(power),    doc: "exponential / power" },
    "⍟" => { monadic: Some(ln),        dyadic: Some(log),      doc: "natural log / logarithm" },
    "|" => { monadic: Some(magnitude), dyadic: Some(residue),  doc: "magnitude / residue" },
    "⌈" => { monadic: Some(ceiling),   dyadic: Some(max),      doc: "ceiling / maximum" },
    "⌊" => { monadic: Some(floor),     dyadic: Some(min),      doc: "floor / minimum" },
    "=" => { monadic: None, dyadic: Some(equal),         doc: "equal" },
    "≠" => { monadic: None, dyadic: Some(not_equal),     doc: "not equal" },
    "<" => { monadic: None, dyadic: Some(less),          doc: "less than" },
    "≤" => { monadic: None, dyadic: Some(less_equal),    doc: "less than or equal" },
    ">" => { monadic: None, dyadic: Some(greater),       doc: "greater than" },
    "≥" => { monadic: None, dyadic: Some(greater_equal), doc: "greater than or equal" },
}

/// Returns `true` if every scalar inside the value is numeric.
fn numeric_leaves(value: &Value) -> bool {
    match value {
        Value::Array(a) => a.values().iter().all(numeric_leaves),
        other => other.is_numeric(),
    }
}

/// Returns `true` if every scalar inside the value is `0` or `1`.
fn boolean_leaves(value: &Value) -> bool {
    match value {
        Value::Array(a) => a.values().iter().all(boolean_leaves),
        other => other.is_numeric() && other.as_bool().is_some(),
    }
}

fn numeric() -> Single {
    predicate("numeric array", numeric_leaves)
}

fn boolean() -> Single {
    predicate("boolean array", boolean_leaves)
}

/// Applies a dyadic scalar function elementwise, with tower retry.
fn pervade_dyadic(ip: &Interpreter, symbol: &str, op: DyadicOp, left: &Value, right: &Value)
                  -> EvalResult<Value> {
    let tower = ip.tower().clone();
    let config = *ip.config();
    let result = map_pairs(left, right, &mut |l, r| {
                     let (Some(a), Some(b)) = (tower.import(&l), tower.import(&r)) else {
                         return Err(RuntimeError::domain(symbol, Some(&l), &r));
                     };
                     tower.retry(a, b, |a, b| op(a, b, &config))
                          .ok_or_else(|| RuntimeError::domain(symbol, Some(&l), &r))
                 })?;
    Ok(compact(&tower, result))
}

/// Applies a monadic scalar function elementwise, with tower retry.
fn pervade_monadic(ip: &Interpreter, symbol: &str, op: MonadicOp, right: &Value) -> EvalResult<Value> {
    let tower = ip.tower().clone();
    let config = *ip.config();
    let result = map_values(right, &mut |v| {
                     let Some(a) = tower.import(&v) else {
                         return Err(RuntimeError::domain(symbol, None, &v));
                     };
                     tower.retry_monadic(a, |a| op(a, &config))
                          .ok_or_else(|| RuntimeError::domain(symbol, None, &v))
                 })?;
    Ok(compact(&tower, result))
}

fn missing_left(symbol: &str, right: &Value) -> RuntimeError {
    RuntimeError::domain(symbol, None, right)
}

/// Returns the handlers for the scalar functions.
///
/// `=` and `≠` also get a general handler, registered first so that it is
/// probed after the numeric one, comparing any two values.
pub fn handlers() -> Vec<Arc<dyn PrimitiveHandler>> {
    let mut handlers: Vec<Arc<dyn PrimitiveHandler>> = Vec::new();

    for (symbol, negate) in [("=", false), ("≠", true)] {
        handlers.push(Arc::new(Handler::new(symbol, "compare any values", dyadic(any()), move |_, left, right| {
                                                let left = left.ok_or_else(|| missing_left(symbol, &right))?;
                                                map_pairs(&left, &right, &mut |l, r| Ok(Value::Bool((l == r) != negate)))
                                            })));
    }

    for def in SCALAR_TABLE {
        let symbol = def.symbol;
        if let Some(op) = def.monadic {
            handlers.push(Arc::new(Handler::new(symbol, def.doc, monadic(numeric()), move |ip, _, right| {
                                                    pervade_monadic(ip, symbol, op, &right)
                                                })));
        }
        if let Some(op) = def.dyadic {
            handlers.push(Arc::new(Handler::new(symbol, def.doc, dyadic(numeric()), move |ip, left, right| {
                                                    let left = left.ok_or_else(|| missing_left(symbol, &right))?;
                                                    pervade_dyadic(ip, symbol, op, &left, &right)
                                                })));
        }
    }

    handlers.extend(logic_handlers());
    handlers
}

fn logic_handlers() -> Vec<Arc<dyn PrimitiveHandler>> {
    let logic = |symbol: &'static str, doc: &str, f: fn(bool, bool) -> bool| -> Arc<dyn PrimitiveHandler> {
        Arc::new(Handler::new(symbol, doc, dyadic(boolean()), move |_, left, right| {
                     let left = left.ok_or_else(|| missing_left(symbol, &right))?;
                     map_pairs(&left, &right, &mut |l, r| match (l.as_bool(), r.as_bool()) {
                         (Some(a), Some(b)) => Ok(Value::Bool(f(a, b))),
                         _ => Err(RuntimeError::domain(symbol, Some(&l), &r)),
                     })
                 }))
    };
    vec![logic("∧", "and", |a, b| a && b),
         logic("∨", "or", |a, b| a || b),
         logic("⍲", "nand", |a, b| !(a && b)),
         logic("⍱", "nor", |a, b| !(a || b)),
         Arc::new(Handler::new("~", "not", monadic(boolean()), |_, _, right| {
                      map_values(&right, &mut |v| match v.as_bool() {
                          Some(b) => Ok(Value::Bool(!b)),
                          None => Err(RuntimeError::domain("~", None, &v)),
                      })
                  }))]
}

fn int(n: i64) -> Option<Value> {
    Some(Value::Number(Number::Integer(n)))
}

fn float(x: f64) -> Option<Value> {
    Some(Value::Number(Number::Float(x)))
}

fn complex(c: Complex) -> Option<Value> {
    Some(Value::Number(Number::Complex(c)))
}

/// Floats that hold an integer become integers again.
fn integral(x: f64) -> Option<Value> {
    f64_to_i64_exact(x).map_or_else(|| float(x), int)
}

fn conjugate(n: Number, _: &Config) -> Option<Value> {
    match n {
        Number::Complex(c) => complex(c.conj()),
        other => Some(Value::Number(other)),
    }
}

fn negate(n: Number, _: &Config) -> Option<Value> {
    match n {
        Number::Integer(a) => int(a.checked_neg()?),
        Number::Float(a) => float(-a),
        Number::Complex(a) => complex(-a),
    }
}

fn signum(n: Number, _: &Config) -> Option<Value> {
    match n {
        Number::Integer(a) => int(a.signum()),
        Number::Float(a) if a == 0.0 => int(0),
        Number::Float(a) => int(if a > 0.0 { 1 } else { -1 }),
        Number::Complex(a) if a.is_zero() => int(0),
        Number::Complex(a) => complex(a / Complex::from(a.abs())),
    }
}

fn reciprocal(n: Number, _: &Config) -> Option<Value> {
    match n {
        Number::Integer(a @ (1 | -1)) => int(a),
        Number::Integer(_) => None,
        Number::Float(a) => float(1.0 / a),
        Number::Complex(a) => complex(a.recip()),
    }
}

fn exp(n: Number, _: &Config) -> Option<Value> {
    match n {
        Number::Integer(_) => None,
        Number::Float(a) => float(a.exp()),
        Number::Complex(a) => complex(a.exp()),
    }
}

fn ln(n: Number, _: &Config) -> Option<Value> {
    match n {
        Number::Float(a) if a > 0.0 => float(a.ln()),
        Number::Float(a) if a == 0.0 => float(f64::NEG_INFINITY),
        Number::Integer(_) | Number::Float(_) => None,
        Number::Complex(a) => complex(a.ln()),
    }
}

fn magnitude(n: Number, _: &Config) -> Option<Value> {
    match n {
        Number::Integer(a) => int(a.checked_abs()?),
        Number::Float(a) => float(a.abs()),
        Number::Complex(a) => float(a.abs()),
    }
}

fn ceiling(n: Number, _: &Config) -> Option<Value> {
    match n {
        Number::Integer(a) => int(a),
        Number::Float(a) => integral(a.ceil()),
        Number::Complex(_) => None,
    }
}

fn floor(n: Number, _: &Config) -> Option<Value> {
    match n {
        Number::Integer(a) => int(a),
        Number::Float(a) => integral(a.floor()),
        Number::Complex(_) => None,
    }
}

fn add(a: Number, b: Number, _: &Config) -> Option<Value> {
    match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => int(a.checked_add(b)?),
        (Number::Float(a), Number::Float(b)) => float(a + b),
        (Number::Complex(a), Number::Complex(b)) => complex(a + b),
        _ => None,
    }
}

fn subtract(a: Number, b: Number, _: &Config) -> Option<Value> {
    match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => int(a.checked_sub(b)?),
        (Number::Float(a), Number::Float(b)) => float(a - b),
        (Number::Complex(a), Number::Complex(b)) => complex(a - b),
        _ => None,
    }
}

fn multiply(a: Number, b: Number, _: &Config) -> Option<Value> {
    match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => int(a.checked_mul(b)?),
        (Number::Float(a), Number::Float(b)) => float(a * b),
        (Number::Complex(a), Number::Complex(b)) => complex(a * b),
        _ => None,
    }
}

/// Integer division stays exact or moves up a class; division by zero
/// gives an in-band infinity or NaN at the float class.
fn divide(a: Number, b: Number, _: &Config) -> Option<Value> {
    match (a, b) {
        (Number::Integer(_), Number::Integer(0)) => None,
        (Number::Integer(a), Number::Integer(b)) if a.checked_rem(b)? == 0 => int(a.checked_div(b)?),
        (Number::Integer(_), Number::Integer(_)) => None,
        (Number::Float(a), Number::Float(b)) => float(a / b),
        (Number::Complex(a), Number::Complex(b)) => complex(a / b),
        _ => None,
    }
}

fn power(a: Number, b: Number, _: &Config) -> Option<Value> {
    match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => int(a.checked_pow(u32::try_from(b).ok()?)?),
        (Number::Float(a), Number::Float(b)) if a < 0.0 && b.fract() != 0.0 => None,
        (Number::Float(a), Number::Float(b)) => float(a.powf(b)),
        (Number::Complex(a), Number::Complex(b)) => complex(a.pow(b)),
        _ => None,
    }
}

fn log(a: Number, b: Number, _: &Config) -> Option<Value> {
    match (a, b) {
        (Number::Float(a), Number::Float(b)) if a > 0.0 && b > 0.0 => float(b.ln() / a.ln()),
        (Number::Complex(a), Number::Complex(b)) => complex(b.ln() / a.ln()),
        _ => None,
    }
}

/// `L|R`: the remainder of `R÷L` with the sign of `L`; `0|R` is `R`.
fn residue(a: Number, b: Number, config: &Config) -> Option<Value> {
    match (a, b) {
        (Number::Integer(0), Number::Integer(b)) => int(b),
        (Number::Integer(a), Number::Integer(b)) => {
            let m = b.checked_rem(a)?;
            int(if m != 0 && (m < 0) != (a < 0) { m + a } else { m })
        },
        (Number::Float(a), Number::Float(b)) if a == 0.0 => float(b),
        (Number::Float(a), Number::Float(b)) => {
            let q = b / a;
            if (q - q.round()).abs() <= config.tolerance * q.abs().max(1.0) {
                return float(0.0);
            }
            float(a.mul_add(-q.floor(), b))
        },
        _ => None,
    }
}

fn max(a: Number, b: Number, _: &Config) -> Option<Value> {
    match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => int(a.max(b)),
        (Number::Float(a), Number::Float(b)) => float(a.max(b)),
        _ => None,
    }
}

fn min(a: Number, b: Number, _: &Config) -> Option<Value> {
    match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => int(a.min(b)),
        (Number::Float(a), Number::Float(b)) => float(a.min(b)),
        _ => None,
    }
}

/// Tolerant float equality, relative to the larger magnitude.
fn close(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || (a - b).abs() <= tolerance * a.abs().max(b.abs())
}

fn equal(a: Number, b: Number, config: &Config) -> Option<Value> {
    let eq = match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => a == b,
        (Number::Float(a), Number::Float(b)) => close(a, b, config.tolerance),
        (Number::Complex(a), Number::Complex(b)) => {
            close(a.re, b.re, config.tolerance) && close(a.im, b.im, config.tolerance)
        },
        _ => return None,
    };
    Some(Value::Bool(eq))
}

fn not_equal(a: Number, b: Number, config: &Config) -> Option<Value> {
    match equal(a, b, config)? {
        Value::Bool(eq) => Some(Value::Bool(!eq)),
        _ => None,
    }
}

/// Orders two real numbers of the same class; complex numbers are not
/// ordered.
fn compare(a: Number, b: Number) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Number::Integer(a), Number::Integer(b)) => Some(a.cmp(&b)),
        (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b),
        _ => None,
    }
}

fn less(a: Number, b: Number, _: &Config) -> Option<Value> {
    compare(a, b).map(|o| Value::Bool(o.is_lt()))
}

fn less_equal(a: Number, b: Number, _: &Config) -> Option<Value> {
    compare(a, b).map(|o| Value::Bool(o.is_le()))
}

fn greater(a: Number, b: Number, _: &Config) -> Option<Value> {
    compare(a, b).map(|o| Value::Bool(o.is_gt()))
}

fn greater_equal(a: Number, b: Number, _: &Config) -> Option<Value> {
    compare(a, b).map(|o| Value::Bool(o.is_ge()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &str) -> String {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).expect("parses");
        ip.eval_program(&program).expect("evaluates")[0].to_string()
    }

    fn fails(line: &str) -> RuntimeError {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).expect("parses");
        ip.eval_program(&program).expect_err("fails")
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(run("1+1"), "2");
        assert_eq!(run("2×3 4"), "6 8");
        assert_eq!(run("6÷3"), "2");
        assert_eq!(run("2*10"), "1024");
    }

    #[test]
    fn failures_retry_one_class_up() {
        assert_eq!(run("1÷4"), "0.25");
        assert_eq!(run("2*¯1"), "0.5");
        assert_eq!(run("9223372036854775807+1"), "9.223372037E18");
    }

    #[test]
    fn division_by_zero_is_in_band() {
        assert_eq!(run("1÷0"), "∞");
        assert_eq!(run("¯1÷0"), "¯∞");
        assert_eq!(run("0÷0"), "NaN");
    }

    #[test]
    fn residue_takes_the_sign_of_the_left() {
        assert_eq!(run("3|7 ¯7"), "1 2");
        assert_eq!(run("¯3|7"), "¯2");
        assert_eq!(run("0|5"), "5");
    }

    #[test]
    fn comparisons_yield_booleans() {
        assert_eq!(run("1 2 3<2"), "1 0 0");
        assert_eq!(run("1=1.0"), "1");
        assert_eq!(run("\"a\"=\"a\""), "1");
        assert_eq!(run("1 0 1∧1 1 0"), "1 0 0");
        assert_eq!(run("~1 0"), "0 1");
    }

    #[test]
    fn monadic_forms() {
        assert_eq!(run("-3"), "¯3");
        assert_eq!(run("×¯2 0 5"), "¯1 0 1");
        assert_eq!(run("|¯2.5"), "2.5");
        assert_eq!(run("⌊2.7 ¯2.2"), "2 ¯3");
        assert_eq!(run("+3J4"), "3J¯4");
    }

    #[test]
    fn shape_mismatches_and_domains_are_reported() {
        assert!(matches!(fails("1 2+1 2 3"), RuntimeError::ShapeMismatch { .. }));
        assert!(matches!(fails("1J1<2"), RuntimeError::DomainMismatch { .. }));
        assert!(matches!(fails("2∧1"), RuntimeError::DomainMismatch { .. }));
    }
}
