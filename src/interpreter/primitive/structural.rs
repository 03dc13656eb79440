use std::sync::Arc;

use crate::{
    error::RuntimeError,
    interpreter::{
        domain::{
            array::{to_index_array, to_index_vector, to_vector},
            core::{any, dyadic, monadic, split},
            scalar::{is_axis, to_index},
        },
        evaluator::{
            core::{EvalResult, Interpreter},
            registry::{Handler, PrimitiveHandler},
        },
        value::{
            array::{Array, element_count, index_vector},
            core::Value,
            number::Number,
        },
    },
    util::num::{i64_to_usize, usize_to_i64},
};

fn integer(n: usize) -> EvalResult<Value> {
    usize_to_i64(n).map(|n| Value::Number(Number::Integer(n)))
                   .ok_or_else(|| RuntimeError::LengthError { details: format!("{n} does not fit an integer") })
}

fn count(n: i64) -> EvalResult<usize> {
    i64_to_usize(n).ok_or_else(|| RuntimeError::InvalidArgument { details: format!("{n} is not a valid length") })
}

/// `|n|` as a length, saturating where `usize` is narrower than `i64`.
fn magnitude(n: i64) -> usize {
    usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX)
}

/// Reads the raw integers of an index vector produced by `to_index_vector`.
fn integers(value: &Value) -> Vec<i64> {
    value.elements().iter().filter_map(Value::as_integer).collect()
}

fn left_of(symbol: &str, left: Option<Value>, right: &Value) -> EvalResult<Value> {
    left.ok_or_else(|| RuntimeError::domain(symbol, None, right))
}

/// Splits an axis-tagged argument into the value and its axis.
fn unpack_axis(symbol: &str, value: &Value) -> EvalResult<(Value, usize)> {
    match value {
        Value::Axis(tagged) => Ok((tagged.value.clone(), tagged.axis)),
        other => Err(RuntimeError::domain(symbol, None, other)),
    }
}

fn check_axis(axis: usize, rank: usize) -> EvalResult<()> {
    if axis >= rank.max(1) {
        return Err(RuntimeError::RankError { details: format!("axis {axis} is outside rank {rank}") });
    }
    Ok(())
}

/// `⍳N`: the first `N` indices, starting at the origin.
fn iota(ip: &Interpreter, n: &Value) -> EvalResult<Value> {
    let n = count(n.as_integer().unwrap_or(-1))?;
    if element_count(&[n]).is_none() {
        return Err(RuntimeError::too_large(&[n]));
    }
    let origin = ip.config().origin;
    let values = (0..n).map(|i| usize_to_i64(i).map(|i| Value::Number(ip.tower().from_index(origin + i))))
                       .collect::<Option<Vec<_>>>()
                       .ok_or_else(|| RuntimeError::LengthError { details: "index range too large".to_string() })?;
    Ok(Value::from(Array::vector(values).unify(ip.tower(), false)))
}

/// `L⍳R`: the position of each element of `R` in the vector `L`, or one past
/// the end when absent.
fn index_of(ip: &Interpreter, left: &Value, right: &Value) -> EvalResult<Value> {
    let haystack = left.elements();
    let origin = ip.config().origin;
    let find = |needle: &Value| -> EvalResult<Value> {
        let p = haystack.iter().position(|v| v == needle).unwrap_or(haystack.len());
        let p = usize_to_i64(p).ok_or_else(|| RuntimeError::LengthError { details: "vector too long".to_string() })?;
        Ok(Value::Number(ip.tower().from_index(origin + p)))
    };
    match right {
        Value::Array(array) => {
            let values = array.values().iter().map(find).collect::<EvalResult<Vec<_>>>()?;
            Ok(Value::from(Array::new(array.shape().to_vec(), values).unify(ip.tower(), false)))
        },
        scalar => find(scalar),
    }
}

fn shape(ip: &Interpreter, value: &Value) -> EvalResult<Value> {
    let dims = value.shape().into_iter().map(integer).collect::<EvalResult<Vec<_>>>()?;
    Ok(Value::from(Array::vector(dims).unify(ip.tower(), false)))
}

fn reshape(left: &Value, right: &Value) -> EvalResult<Value> {
    let dims = integers(left).into_iter().map(count).collect::<EvalResult<Vec<_>>>()?;
    if element_count(&dims).is_none() {
        return Err(RuntimeError::too_large(&dims));
    }
    let source = match right {
        Value::List(items) => Array::vector(items.as_ref().clone()),
        other => other.as_array_view(),
    };
    Ok(Value::from(source.reshape(dims)))
}

fn ravel(value: &Value) -> Value {
    Value::from(Array::vector(value.elements()))
}

/// Joins two arrays along `axis`; the last axis when `None`.
///
/// A scalar extends to the other side's shape with unit length along the
/// axis, and an array one rank short gains a unit axis there.
fn catenate(left: &Value, right: &Value, axis: Option<usize>) -> EvalResult<Value> {
    let (l, r) = (left.as_array_view(), right.as_array_view());
    if l.rank() == 0 && r.rank() == 0 {
        return Ok(Value::from(Array::vector(vec![l.at(0), r.at(0)])));
    }
    if l.is_empty() && r.rank() <= 1 {
        return Ok(ravel(right));
    }
    if r.is_empty() && l.rank() <= 1 {
        return Ok(ravel(left));
    }

    let rank = l.rank().max(r.rank());
    let axis = axis.unwrap_or(rank - 1);
    check_axis(axis, rank)?;
    let template = if l.rank() == rank { l.shape().to_vec() } else { r.shape().to_vec() };
    let l = extend(&l, &template, axis)?;
    let r = extend(&r, &template, axis)?;

    if l.shape_without(axis) != r.shape_without(axis) {
        return Err(RuntimeError::LengthError { details: format!("cannot join shapes {:?} and {:?} along axis {}",
                                                                l.shape(),
                                                                r.shape(),
                                                                axis + 1) });
    }

    let mut shape = l.shape().to_vec();
    shape[axis] += r.shape()[axis];
    let lanes: Vec<Vec<Value>> = l.lanes(axis)
                                  .into_iter()
                                  .zip(r.lanes(axis))
                                  .map(|(mut a, b)| {
                                      a.extend(b);
                                      a
                                  })
                                  .collect();
    Ok(Value::from(Array::from_lanes(shape, axis, &lanes)))
}

fn extend(array: &Array, template: &[usize], axis: usize) -> EvalResult<Array> {
    if array.rank() == template.len() {
        return Ok(array.clone());
    }
    if array.rank() == 0 {
        let mut shape = template.to_vec();
        shape[axis] = 1;
        return Ok(array.reshape(shape));
    }
    if array.rank() + 1 == template.len() {
        let mut shape = array.shape().to_vec();
        shape.insert(axis, 1);
        return Ok(Array::new(shape, array.values()));
    }
    Err(RuntimeError::RankError { details: format!("cannot join rank {} to rank {}", array.rank(), template.len()) })
}

/// Rotates every lane along `axis` left by the matching amount. One amount
/// applies to every lane.
fn rotate(value: &Value, axis: usize, amounts: &[i64]) -> EvalResult<Value> {
    let array = value.as_array_view();
    if array.rank() == 0 || array.is_empty() {
        return Ok(value.clone());
    }
    check_axis(axis, array.rank())?;
    let mut lanes = array.lanes(axis);
    if amounts.len() != 1 && amounts.len() != lanes.len() {
        return Err(RuntimeError::LengthError { details: format!("{} rotation amounts for {} lanes",
                                                                amounts.len(),
                                                                lanes.len()) });
    }
    let length = usize_to_i64(array.shape()[axis]).unwrap_or(i64::MAX);
    for (i, lane) in lanes.iter_mut().enumerate() {
        let n = if amounts.len() == 1 { amounts[0] } else { amounts[i] };
        lane.rotate_left(count(n.rem_euclid(length))?);
    }
    Ok(Value::from(Array::from_lanes(array.shape().to_vec(), axis, &lanes)))
}

fn reverse(value: &Value, axis: usize) -> EvalResult<Value> {
    let array = value.as_array_view();
    if array.rank() == 0 || array.is_empty() {
        return Ok(value.clone());
    }
    check_axis(axis, array.rank())?;
    let mut lanes = array.lanes(axis);
    lanes.iter_mut().for_each(|lane| lane.reverse());
    Ok(Value::from(Array::from_lanes(array.shape().to_vec(), axis, &lanes)))
}

fn last_axis(value: &Value) -> usize {
    value.shape().len().saturating_sub(1)
}

fn first(value: &Value) -> Value {
    match value {
        Value::Array(array) if array.is_empty() => array.fill_value(),
        Value::Array(array) => array.at(0),
        Value::List(items) => items.first().cloned().unwrap_or_else(|| Value::from(Array::empty())),
        other => other.clone(),
    }
}

/// Brings a scalar up to `rank` unit axes; arrays must not have fewer axes
/// than the counts address.
fn lift(value: &Value, rank: usize) -> EvalResult<Array> {
    let array = value.as_array_view();
    if array.rank() == 0 {
        return Ok(array.reshape(vec![1; rank.max(1)]));
    }
    if rank > array.rank() {
        return Err(RuntimeError::RankError { details: format!("{rank} counts for rank {}", array.rank()) });
    }
    Ok(array)
}

/// `L↑R`: takes `|L[i]|` items along each leading axis, from the end when
/// negative, padding with the fill element.
fn take(counts: &[i64], value: &Value) -> EvalResult<Value> {
    let array = lift(value, counts.len())?;
    let mut shape = array.shape().to_vec();
    let mut offsets = vec![0_i64; shape.len()];
    for (axis, &n) in counts.iter().enumerate() {
        let have = usize_to_i64(shape[axis]).unwrap_or(i64::MAX);
        shape[axis] = magnitude(n);
        if n < 0 {
            offsets[axis] = have.saturating_add(n);
        }
    }

    let fill = array.fill_value();
    let size = element_count(&shape).ok_or_else(|| RuntimeError::too_large(&shape))?;
    let mut values = Vec::with_capacity(size);
    for flat in 0..size {
        let source: Option<Vec<usize>> =
            index_vector(&shape, flat).iter()
                                      .zip(&offsets)
                                      .map(|(&i, &offset)| usize_to_i64(i).and_then(|i| i64_to_usize(i + offset)))
                                      .collect();
        let value = source.and_then(|index| array.flat_index(&index))
                          .map_or_else(|| fill.clone(), |p| array.at(p));
        values.push(value);
    }
    Ok(Value::from(Array::new(shape, values)))
}

/// `L↓R`: drops `|L[i]|` items along each leading axis, from the end when
/// negative.
fn drop(counts: &[i64], value: &Value) -> EvalResult<Value> {
    let array = lift(value, counts.len())?;
    let mut shape = array.shape().to_vec();
    let mut offsets = vec![0; shape.len()];
    for (axis, &n) in counts.iter().enumerate() {
        let skip = magnitude(n).min(shape[axis]);
        shape[axis] -= skip;
        if n > 0 {
            offsets[axis] = skip;
        }
    }

    let size: usize = shape.iter().product();
    let values = (0..size).filter_map(|flat| {
                              let index: Vec<usize> = index_vector(&shape, flat).iter()
                                                                                .zip(&offsets)
                                                                                .map(|(i, o)| i + o)
                                                                                .collect();
                              array.flat_index(&index).map(|p| array.at(p))
                          })
                          .collect();
    Ok(Value::from(Array::new(shape, values)))
}

fn tally(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Array(array) => integer(array.shape()[0]),
        Value::List(items) => integer(items.len()),
        _ => integer(1),
    }
}

fn depth(value: &Value) -> usize {
    match value {
        Value::Array(array) => 1 + array.values().iter().map(depth).max().unwrap_or(0),
        Value::List(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// `L~R`: the elements of `L` that do not occur in `R`.
fn without(ip: &Interpreter, left: &Value, right: &Value) -> Value {
    let excluded = right.elements();
    let kept = left.elements().into_iter().filter(|v| !excluded.contains(v)).collect();
    Value::from(Array::vector(kept).unify(ip.tower(), false))
}

/// Returns the handlers for the structural primitives.
pub fn handlers() -> Vec<Arc<dyn PrimitiveHandler>> {
    let handlers: Vec<Handler> =
        vec![Handler::new("⍳", "index generator", monadic(to_index()), |ip, _, right| iota(ip, &right)),
             Handler::new("⍳", "index of", split(to_vector(None), any()), |ip, left, right| {
                 let left = left_of("⍳", left, &right)?;
                 index_of(ip, &left, &right)
             }),
             Handler::new("⍴", "shape", monadic(any()), |ip, _, right| shape(ip, &right)),
             Handler::new("⍴", "reshape", split(to_index_vector(), any()), |_, left, right| {
                 reshape(&left_of("⍴", left, &right)?, &right)
             }).selectable(),
             Handler::new(",", "ravel", monadic(any()), |_, _, right| Ok(ravel(&right))).selectable(),
             Handler::new(",", "catenate", dyadic(any()), |_, left, right| {
                 catenate(&left_of(",", left, &right)?, &right, None)
             }).selectable(),
             Handler::new(",", "catenate along an axis", split(any(), is_axis()), |_, left, right| {
                 let (right, axis) = unpack_axis(",", &right)?;
                 catenate(&left_of(",", left, &right)?, &right, Some(axis))
             }),
             Handler::new("⌽", "reverse", monadic(any()), |_, _, right| reverse(&right, last_axis(&right))).selectable(),
             Handler::new("⌽", "rotate", split(to_index_array(), any()), |_, left, right| {
                 let amounts = integers(&left_of("⌽", left, &right)?);
                 rotate(&right, last_axis(&right), &amounts)
             }).selectable(),
             Handler::new("⌽", "reverse along an axis", monadic(is_axis()), |_, _, right| {
                 let (right, axis) = unpack_axis("⌽", &right)?;
                 reverse(&right, axis)
             }),
             Handler::new("⌽", "rotate along an axis", split(to_index_array(), is_axis()), |_, left, right| {
                 let amounts = integers(&left_of("⌽", left, &right)?);
                 let (right, axis) = unpack_axis("⌽", &right)?;
                 rotate(&right, axis, &amounts)
             }),
             Handler::new("⊖", "reverse first", monadic(any()), |_, _, right| reverse(&right, 0)).selectable(),
             Handler::new("⊖", "rotate first", split(to_index_array(), any()), |_, left, right| {
                 let amounts = integers(&left_of("⊖", left, &right)?);
                 rotate(&right, 0, &amounts)
             }).selectable(),
             Handler::new("↑", "first", monadic(any()), |_, _, right| Ok(first(&right))),
             Handler::new("↑", "take", split(to_index_vector(), any()), |_, left, right| {
                 take(&integers(&left_of("↑", left, &right)?), &right)
             }).selectable(),
             Handler::new("↓", "drop", split(to_index_vector(), any()), |_, left, right| {
                 drop(&integers(&left_of("↓", left, &right)?), &right)
             }).selectable(),
             Handler::new("≢", "tally", monadic(any()), |_, _, right| tally(&right)),
             Handler::new("≢", "not match", dyadic(any()), |_, left, right| {
                 Ok(Value::Bool(left_of("≢", left, &right)? != right))
             }),
             Handler::new("≡", "depth", monadic(any()), |_, _, right| integer(depth(&right))),
             Handler::new("≡", "match", dyadic(any()), |_, left, right| {
                 Ok(Value::Bool(left_of("≡", left, &right)? == right))
             }),
             Handler::new("⊢", "same", monadic(any()), |_, _, right| Ok(right)).selectable(),
             Handler::new("⊢", "right", dyadic(any()), |_, _, right| Ok(right)).selectable(),
             Handler::new("⊣", "same", monadic(any()), |_, _, right| Ok(right)).selectable(),
             Handler::new("⊣", "left", dyadic(any()), |_, left, right| left_of("⊣", left, &right)),
             Handler::new("~", "without", dyadic(any()), |ip, left, right| {
                 Ok(without(ip, &left_of("~", left, &right)?, &right))
             }),];

    handlers.into_iter()
            .map(|h| Arc::new(h) as Arc<dyn PrimitiveHandler>)
            .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &str) -> String {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).expect("parses");
        ip.eval_program(&program).expect("evaluates").pop().expect("a value").to_string()
    }

    fn fail(line: &str) -> RuntimeError {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).expect("parses");
        ip.eval_program(&program).expect_err("fails")
    }

    #[test]
    fn iota_and_index_of() {
        assert_eq!(run("⍳5"), "1 2 3 4 5");
        assert_eq!(run("⍴⍳0"), "0");
        assert_eq!(run("10 20 30⍳20 40"), "2 4");
    }

    #[test]
    fn origin_zero_shifts_indices() {
        let mut ip = Interpreter::new();
        ip.config_mut().origin = 0;
        let program = ip.parse("⍳3").unwrap();
        assert_eq!(ip.eval_program(&program).unwrap()[0].to_string(), "0 1 2");
    }

    #[test]
    fn shape_and_reshape() {
        assert_eq!(run("2 3⍴⍳6"), "1 2 3\n4 5 6");
        assert_eq!(run("⍴2 3⍴⍳6"), "2 3");
        assert_eq!(run("5⍴1 2"), "1 2 1 2 1");
        assert_eq!(run("⍴5"), "");
    }

    #[test]
    fn ravel_and_catenate() {
        assert_eq!(run(",2 2⍴⍳4"), "1 2 3 4");
        assert_eq!(run("1 2,3"), "1 2 3");
        assert_eq!(run("(2 2⍴⍳4),0"), "1 2 0\n3 4 0");
        assert_eq!(run("(2 2⍴⍳4),⍂1 (5 6)"), "1 2\n3 4\n5 6");
    }

    #[test]
    fn reverse_and_rotate() {
        assert_eq!(run("⌽⍳4"), "4 3 2 1");
        assert_eq!(run("1⌽⍳4"), "2 3 4 1");
        assert_eq!(run("¯1⌽⍳4"), "4 1 2 3");
        assert_eq!(run("⊖2 2⍴⍳4"), "3 4\n1 2");
    }

    #[test]
    fn take_and_drop() {
        assert_eq!(run("2↑⍳5"), "1 2");
        assert_eq!(run("¯2↑⍳5"), "4 5");
        assert_eq!(run("7↑⍳3"), "1 2 3 0 0 0 0");
        assert_eq!(run("2↓⍳5"), "3 4 5");
        assert_eq!(run("¯2↓⍳5"), "1 2 3");
        assert_eq!(run("1 1↓2 3⍴⍳6"), "5 6");
        assert_eq!(run("↑⍳3"), "1");
    }

    #[test]
    fn tally_depth_and_match() {
        assert_eq!(run("≢2 3⍴⍳6"), "2");
        assert_eq!(run("≡5"), "0");
        assert_eq!(run("≡(1 2)(3 4)"), "2");
        assert_eq!(run("(⍳3)≡1 2 3"), "1");
        assert_eq!(run("(⍳3)≢1 2"), "1");
    }

    #[test]
    fn identities_and_without() {
        assert_eq!(run("1⊣2"), "1");
        assert_eq!(run("1⊢2"), "2");
        assert_eq!(run("1 2 3 4~2 4"), "1 3");
    }

    #[test]
    fn oversized_shapes_are_length_errors() {
        assert!(matches!(fail("4294967296 4294967296⍴1"), RuntimeError::LengthError { .. }));
        assert!(matches!(fail("1000000 1000000⍴1"), RuntimeError::LengthError { .. }));
        assert!(matches!(fail("⍳4294967296"), RuntimeError::LengthError { .. }));
    }

    #[test]
    fn extreme_counts_do_not_overflow() {
        assert!(matches!(fail("¯9223372036854775808↑1 2 3"), RuntimeError::LengthError { .. }));
        assert!(matches!(fail("9223372036854775807↑1 2 3"), RuntimeError::LengthError { .. }));
        assert_eq!(run("⍴¯9223372036854775808↓1 2 3"), "0");
        assert_eq!(run("⍴0⍴5"), "0");
    }
}
