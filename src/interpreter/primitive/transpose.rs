use std::sync::Arc;

use crate::{
    error::RuntimeError,
    interpreter::{
        domain::{
            array::to_index_vector,
            core::{any, monadic, split},
        },
        evaluator::{
            core::{EvalResult, Interpreter},
            registry::{Handler, PrimitiveHandler},
        },
        value::{
            array::{Array, index_vector},
            core::Value,
        },
    },
    util::num::i64_to_usize,
};

/// Reverses the order of the axes.
///
/// Scalars and vectors are returned unchanged.
///
/// # Example
/// ```
/// use aplomb::interpreter::{
///     primitive::transpose::transpose,
///     value::{array::Array, core::Value},
/// };
///
/// let m = Value::from(Array::new(vec![2, 3], (1..=6).map(Value::Int).collect()));
/// let t = transpose(&m);
///
/// assert_eq!(t.shape(), vec![3, 2]);
/// assert_eq!(t.elements(), [1, 4, 2, 5, 3, 6].map(Value::Int).to_vec());
/// ```
#[must_use]
pub fn transpose(value: &Value) -> Value {
    let array = value.as_array_view();
    if array.rank() < 2 {
        return value.clone();
    }
    let axes: Vec<usize> = (0..array.rank()).rev().collect();
    Value::from(permute(&array, &axes))
}

/// `L⍉R`: moves axis `i` of `R` to position `L[i]` of the result.
///
/// Repeated entries in `L` take a diagonal: the result axis runs along every
/// source axis mapped onto it, with the shortest length.
///
/// # Parameters
/// - `axes`: Zero-based target axis for each axis of `array`.
/// - `array`: The source.
///
/// # Returns
/// The rearranged array, or an error when `axes` has the wrong length or
/// skips a result axis.
pub fn transpose_dyadic(axes: &[usize], array: &Array) -> EvalResult<Array> {
    if axes.len() != array.rank() {
        return Err(RuntimeError::LengthError { details: format!("{} axes given for rank {}",
                                                                axes.len(),
                                                                array.rank()) });
    }
    let rank = axes.iter().max().map_or(0, |&m| m + 1);
    let mut shape = vec![usize::MAX; rank];
    for (source, &target) in axes.iter().enumerate() {
        shape[target] = shape[target].min(array.shape()[source]);
    }
    if let Some(missing) = shape.iter().position(|&n| n == usize::MAX) {
        return Err(RuntimeError::InvalidArgument { details: format!("result axis {} is not mapped",
                                                                    missing + 1) });
    }
    Ok(permute_into(array, axes, shape))
}

fn permute(array: &Array, axes: &[usize]) -> Array {
    let mut shape = vec![0; axes.len()];
    for (source, &target) in axes.iter().enumerate() {
        shape[target] = array.shape()[source];
    }
    permute_into(array, axes, shape)
}

fn permute_into(array: &Array, axes: &[usize], shape: Vec<usize>) -> Array {
    let size: usize = shape.iter().product();
    let values = (0..size).filter_map(|flat| {
                              let target = index_vector(&shape, flat);
                              let source: Vec<usize> = axes.iter().map(|&a| target[a]).collect();
                              array.flat_index(&source).map(|p| array.at(p))
                          })
                          .collect();
    Array::new(shape, values)
}

/// Returns the transpose handlers.
pub fn handlers() -> Vec<Arc<dyn PrimitiveHandler>> {
    let monadic_transpose = Handler::new("⍉", "transpose", monadic(any()), |_, _, right| Ok(transpose(&right)));
    let dyadic_transpose =
        Handler::new("⍉", "dyadic transpose", split(to_index_vector(), any()), |ip: &mut Interpreter, left, right| {
            let left = left.ok_or_else(|| RuntimeError::domain("⍉", None, &right))?;
            let origin = ip.config().origin;
            let axes = left.elements()
                           .iter()
                           .map(|v| {
                               v.as_integer()
                                .and_then(|a| i64_to_usize(a - origin))
                                .ok_or_else(|| RuntimeError::IndexOutOfBounds { index:  v.as_integer().unwrap_or(0),
                                                                                length: right.shape().len(), })
                           })
                           .collect::<EvalResult<Vec<_>>>()?;
            Ok(Value::from(transpose_dyadic(&axes, &right.as_array_view())?))
        });
    vec![Arc::new(monadic_transpose.selectable()), Arc::new(dyadic_transpose.selectable())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: usize, columns: usize) -> Array {
        let values = (1..=rows * columns).map(|n| Value::Int(i64::try_from(n).unwrap())).collect();
        Array::new(vec![rows, columns], values)
    }

    #[test]
    fn vectors_are_unchanged() {
        let v = Value::from(Array::vector(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(transpose(&v), v);
    }

    #[test]
    fn three_axes_reverse() {
        let cube = Array::new(vec![2, 3, 4], (0..24).map(Value::Int).collect());
        let t = transpose(&Value::from(cube));
        assert_eq!(t.shape(), vec![4, 3, 2]);
        assert_eq!(t.elements()[1], Value::Int(12));
    }

    #[test]
    fn repeated_axes_take_the_diagonal() {
        let diagonal = transpose_dyadic(&[0, 0], &matrix(3, 3)).unwrap();
        assert_eq!(diagonal.shape(), &[3]);
        assert_eq!(diagonal.values(), [1, 5, 9].map(Value::Int).to_vec());

        let short = transpose_dyadic(&[0, 0], &matrix(2, 3)).unwrap();
        assert_eq!(short.values(), [1, 5].map(Value::Int).to_vec());
    }

    #[test]
    fn skipped_axes_are_rejected() {
        assert!(matches!(transpose_dyadic(&[0, 2], &matrix(2, 2)),
                         Err(RuntimeError::InvalidArgument { .. })));
        assert!(matches!(transpose_dyadic(&[0], &matrix(2, 2)), Err(RuntimeError::LengthError { .. })));
    }

    #[test]
    fn dyadic_form_uses_the_origin() {
        let mut ip = Interpreter::new();
        let program = ip.parse("2 1⍉2 3⍴⍳6").unwrap();
        assert_eq!(ip.eval_program(&program).unwrap()[0].to_string(), "1 4\n2 5\n3 6");
    }
}
