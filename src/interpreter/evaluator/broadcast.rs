use std::sync::Arc;

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::core::EvalResult,
        value::{array::Array, core::Value, tower::Tower},
    },
};

/// Applies an elementwise operation to two values.
///
/// This function unifies every dyadic elementwise evaluation path:
/// - Array with array
/// - Array with scalar
/// - Scalar with array
/// - Scalar with scalar
///
/// Nested arrays are handled recursively. A scalar extends to the shape of
/// the other side; two arrays must agree in shape exactly, even when one of
/// them holds a single element.
///
/// # Parameters
/// - `left`: Left operand.
/// - `right`: Right operand.
/// - `f`: Operation applied once both sides are scalars.
///
/// # Returns
/// A scalar, or an array with the shape of the array operand.
///
/// # Example
/// ```
/// use aplomb::interpreter::{
///     evaluator::broadcast::map_pairs,
///     value::{array::Array, core::Value},
/// };
///
/// let left = Value::from(Array::vector(vec![Value::Int(1), Value::Int(2)]));
/// let r = map_pairs(&left, &Value::Int(10), &mut |l, r| {
///             Ok(Value::Int(l.as_integer().unwrap() + r.as_integer().unwrap()))
///         }).unwrap();
///
/// assert_eq!(r, Value::from(Array::vector(vec![Value::Int(11), Value::Int(12)])));
/// ```
pub fn map_pairs<F>(left: &Value, right: &Value, f: &mut F) -> EvalResult<Value>
    where F: FnMut(Value, Value) -> EvalResult<Value>
{
    match (left, right) {
        // Array with array
        (Value::Array(l), Value::Array(r)) if l.shape() == r.shape() => {
            let mut out = Vec::with_capacity(l.size());
            for (a, b) in l.values().iter().zip(r.values().iter()) {
                out.push(map_pairs(a, b, f)?);
            }
            Ok(Value::from(Array::new(l.shape().to_vec(), out)))
        },
        (Value::Array(l), Value::Array(r)) => Err(RuntimeError::ShapeMismatch { left:  l.shape().to_vec(),
                                                                                right: r.shape().to_vec(), }),

        // Array with scalar
        (Value::Array(arr), scalar) => {
            let mut out = Vec::with_capacity(arr.size());
            for a in arr.values() {
                out.push(map_pairs(&a, scalar, f)?);
            }
            Ok(Value::from(Array::new(arr.shape().to_vec(), out)))
        },

        // Scalar with array
        (scalar, Value::Array(arr)) => {
            let mut out = Vec::with_capacity(arr.size());
            for b in arr.values() {
                out.push(map_pairs(scalar, &b, f)?);
            }
            Ok(Value::from(Array::new(arr.shape().to_vec(), out)))
        },

        // Scalar with scalar
        (l, r) => f(l.clone(), r.clone()),
    }
}

/// Applies an operation to every scalar inside a value, recursing into
/// nested arrays.
pub fn map_values<F>(value: &Value, f: &mut F) -> EvalResult<Value>
    where F: FnMut(Value) -> EvalResult<Value>
{
    match value {
        Value::Array(arr) => {
            let mut out = Vec::with_capacity(arr.size());
            for v in arr.values() {
                out.push(map_values(&v, f)?);
            }
            Ok(Value::from(Array::new(arr.shape().to_vec(), out)))
        },
        other => f(other.clone()),
    }
}

/// Stores an array result in the most specific uniform backing.
#[must_use]
pub fn compact(tower: &Tower, value: Value) -> Value {
    match value {
        Value::Array(array) if !array.is_uniform() => Value::Array(Arc::new(array.unify(tower, false))),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[i64]) -> Value {
        Value::from(Array::vector(values.iter().copied().map(Value::Int).collect()))
    }

    fn add(l: Value, r: Value) -> EvalResult<Value> {
        Ok(Value::Int(l.as_integer().unwrap_or(0) + r.as_integer().unwrap_or(0)))
    }

    #[test]
    fn equal_shapes_zip() {
        let r = map_pairs(&vector(&[1, 2]), &vector(&[10, 20]), &mut add).unwrap();
        assert_eq!(r, vector(&[11, 22]));
    }

    #[test]
    fn scalars_extend() {
        let r = map_pairs(&Value::Int(5), &vector(&[1, 2, 3]), &mut add).unwrap();
        assert_eq!(r, vector(&[6, 7, 8]));
    }

    #[test]
    fn singleton_arrays_do_not_extend() {
        let r = map_pairs(&vector(&[5]), &vector(&[1, 2, 3]), &mut add);
        assert_eq!(r,
                   Err(RuntimeError::ShapeMismatch { left:  vec![1],
                                                     right: vec![3], }));
    }

    #[test]
    fn mismatched_shapes_fail() {
        let r = map_pairs(&vector(&[1, 2]), &vector(&[1, 2, 3]), &mut add);
        assert_eq!(r,
                   Err(RuntimeError::ShapeMismatch { left:  vec![2],
                                                     right: vec![3], }));
    }

    #[test]
    fn nested_arrays_recurse() {
        let nested = Value::from(Array::vector(vec![vector(&[1, 2]), Value::Int(3)]));
        let r = map_values(&nested, &mut |v| add(v, Value::Int(1))).unwrap();
        let expected = Value::from(Array::vector(vec![vector(&[2, 3]), Value::Int(4)]));
        assert_eq!(r, expected);
    }
}
