use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::core::{EvalResult, Interpreter},
        value::{
            array::{Array, index_vector},
            core::Value,
        },
    },
    util::num::i64_to_usize,
};

/// Converts an origin-based index to a zero-based position along an axis of
/// `length`.
///
/// # Example
/// ```
/// use aplomb::interpreter::{evaluator::indexing::position, value::core::Value};
///
/// assert_eq!(position(&Value::Int(1), 1, 3).unwrap(), 0);
/// assert!(position(&Value::Int(0), 1, 3).is_err());
/// assert!(position(&Value::Int(3), 0, 3).is_err());
/// ```
pub fn position(index: &Value, origin: i64, length: usize) -> EvalResult<usize> {
    let n = match index.as_integer() {
        Some(n) if index.is_numeric() => n,
        _ => {
            return Err(RuntimeError::InvalidArgument { details: format!("index {index} is not an integer") });
        },
    };
    n.checked_sub(origin)
     .and_then(i64_to_usize)
     .filter(|&p| p < length)
     .ok_or(RuntimeError::IndexOutOfBounds { index: n, length })
}

/// Resolves a bracket index into a result shape and the flat positions it
/// selects, in row-major order of the result.
///
/// There must be one slot per axis. An empty slot selects the whole axis;
/// a filled slot contributes its own shape to the result.
pub fn select_positions(ip: &Interpreter, array: &Array, slots: &[Option<Value>])
                        -> EvalResult<(Vec<usize>, Vec<usize>)> {
    if slots.len() != array.rank() {
        return Err(RuntimeError::RankError { details: format!("{} indices given for rank {}",
                                                              slots.len(),
                                                              array.rank()) });
    }

    let origin = ip.config().origin;
    let mut shape = Vec::new();
    let mut axes = Vec::with_capacity(slots.len());
    for (slot, &length) in slots.iter().zip(array.shape()) {
        match slot {
            None => {
                shape.push(length);
                axes.push((0..length).collect::<Vec<_>>());
            },
            Some(index) => {
                shape.extend(index.shape());
                let positions = index.elements()
                                     .iter()
                                     .map(|i| position(i, origin, length))
                                     .collect::<EvalResult<Vec<_>>>()?;
                axes.push(positions);
            },
        }
    }

    let counts: Vec<usize> = axes.iter().map(Vec::len).collect();
    let total: usize = counts.iter().product();
    let mut flat = Vec::with_capacity(total);
    for k in 0..total {
        let index: Vec<usize> = index_vector(&counts, k).iter()
                                                        .zip(&axes)
                                                        .map(|(&i, axis)| axis[i])
                                                        .collect();
        let p = array.flat_index(&index)
                     .ok_or_else(|| RuntimeError::RankError { details: "index does not fit the array".to_string() })?;
        flat.push(p);
    }
    Ok((shape, flat))
}
