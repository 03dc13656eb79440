use std::{fmt, sync::Arc};

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::{
            core::{EvalResult, Interpreter},
            function::Function,
        },
        operator::{function_operand, split_axis},
        value::{
            array::{Array, element_count},
            core::Value,
        },
    },
};

/// Folds `lane` right to left: `a f (b f (c f d))`.
pub(crate) fn fold(ip: &mut Interpreter, function: &Arc<dyn Function>, lane: &[Value]) -> EvalResult<Value> {
    let Some((last, rest)) = lane.split_last() else {
        return function.identity().ok_or_else(|| RuntimeError::DomainMismatch { function: format!("{function}/"),
                                                                                left:     None,
                                                                                right:    "empty array".to_string(), });
    };
    let mut acc = last.clone();
    for value in rest.iter().rev() {
        acc = function.call(ip, Some(value.clone()), acc)?;
    }
    Ok(acc)
}

/// Resolves the axis a reduction or scan runs along. Scalars are lifted to
/// one-item vectors by the callers, so a rank-0 view here is a value with no
/// axes at all.
fn lane_axis(array: &Array, axis: Option<usize>, first: bool) -> EvalResult<usize> {
    let rank = array.rank();
    if rank == 0 {
        let details = format!("{} has no axis to run along", array.at(0).type_name());
        return Err(RuntimeError::RankError { details });
    }
    let axis = axis.unwrap_or(if first { 0 } else { rank - 1 });
    if axis >= rank {
        return Err(RuntimeError::RankError { details: format!("axis {} is outside rank {rank}", axis + 1) });
    }
    Ok(axis)
}

/// `f/` and `f⌿`: reduction along the last or the first axis.
///
/// An empty axis yields the function's identity element and the reduced
/// axis is dropped from the result. With a left argument `N`, the
/// reduction runs over every window of `|N|` consecutive items, each window
/// reversed when `N` is negative.
pub struct Reduce {
    function: Arc<dyn Function>,
    first:    bool,
}

impl Reduce {
    /// Derives `f/`.
    pub fn derive_last(_ip: &Interpreter, left: Value, _right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        Ok(Arc::new(Self { function: function_operand("/", &left)?,
                           first:    false, }))
    }

    /// Derives `f⌿`.
    pub fn derive_first(_ip: &Interpreter, left: Value, _right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        Ok(Arc::new(Self { function: function_operand("⌿", &left)?,
                           first:    true, }))
    }

    fn windowed(&self, ip: &mut Interpreter, n: i64, lane: &[Value]) -> EvalResult<Vec<Value>> {
        let width = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX);
        if width > lane.len() + 1 {
            return Err(RuntimeError::LengthError { details: format!("window of {width} over {} items", lane.len()) });
        }
        if width == 0 {
            let identity = fold(ip, &self.function, &[])?;
            return Ok(vec![identity; lane.len() + 1]);
        }
        let mut out = Vec::with_capacity(lane.len() + 1 - width);
        for window in lane.windows(width) {
            let mut window = window.to_vec();
            if n < 0 {
                window.reverse();
            }
            out.push(fold(ip, &self.function, &window)?);
        }
        Ok(out)
    }
}

impl Function for Reduce {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        let (right, axis) = split_axis(right);
        let array = match &right {
            Value::List(items) => Array::vector(items.as_ref().clone()),
            other if other.is_scalar() => Array::vector(vec![other.clone()]),
            other => other.as_array_view(),
        };
        let axis = lane_axis(&array, axis, self.first)?;
        let lanes = array.lanes(axis);

        let Some(left) = left else {
            let mut out = Vec::with_capacity(lanes.len());
            for lane in &lanes {
                out.push(fold(ip, &self.function, lane)?);
            }
            let reduced = Array::new(array.shape_without(axis), out);
            return Ok(Value::from(reduced.unify(ip.tower(), true)));
        };

        let n = left.as_integer()
                    .ok_or_else(|| RuntimeError::domain(&self.to_string(), Some(&left), &right))?;
        let mut out = Vec::with_capacity(lanes.len());
        for lane in &lanes {
            out.push(self.windowed(ip, n, lane)?);
        }
        let mut shape = array.shape().to_vec();
        shape[axis] = out.first().map_or(0, Vec::len);
        Ok(Value::from(Array::from_lanes(shape, axis, &out).unify(ip.tower(), true)))
    }
}

impl fmt::Display for Reduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.function, if self.first { "⌿" } else { "/" })
    }
}

/// `f\` and `f⍀`: every prefix reduced, along the last or the first axis.
pub struct Scan {
    function: Arc<dyn Function>,
    first:    bool,
}

impl Scan {
    /// Derives `f\`.
    pub fn derive_last(_ip: &Interpreter, left: Value, _right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        Ok(Arc::new(Self { function: function_operand("\\", &left)?,
                           first:    false, }))
    }

    /// Derives `f⍀`.
    pub fn derive_first(_ip: &Interpreter, left: Value, _right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        Ok(Arc::new(Self { function: function_operand("⍀", &left)?,
                           first:    true, }))
    }
}

impl Function for Scan {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        if let Some(left) = left {
            return Err(RuntimeError::domain(&self.to_string(), Some(&left), &right));
        }
        let (right, axis) = split_axis(right);
        if right.is_scalar() {
            return Ok(right);
        }
        let array = right.as_array_view();
        if array.is_empty() {
            return Ok(right);
        }
        let axis = lane_axis(&array, axis, self.first)?;
        let mut lanes = array.lanes(axis);
        for lane in &mut lanes {
            let mut scanned = Vec::with_capacity(lane.len());
            for end in 1..=lane.len() {
                scanned.push(fold(ip, &self.function, &lane[..end])?);
            }
            *lane = scanned;
        }
        Ok(Value::from(Array::from_lanes(array.shape().to_vec(), axis, &lanes).unify(ip.tower(), true)))
    }
}

impl fmt::Display for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.function, if self.first { "⍀" } else { "\\" })
    }
}

/// `A/` and `A⌿`: replicate. Item `i` along the axis is repeated `A[i]`
/// times; a negative count inserts that many fill elements instead.
pub struct Replicate {
    counts: Vec<i64>,
    first:  bool,
}

impl Replicate {
    /// Derives `A/` from an integer array operand.
    pub fn derive_last(_ip: &Interpreter, left: Value, _right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        Ok(Arc::new(Self { counts: counts(&left)?,
                           first:  false, }))
    }

    /// Derives `A⌿`.
    pub fn derive_first(_ip: &Interpreter, left: Value, _right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        Ok(Arc::new(Self { counts: counts(&left)?,
                           first:  true, }))
    }

    fn replicate(&self, right: Value) -> EvalResult<Value> {
        let (right, axis) = split_axis(right);
        let array = match right.as_array_view() {
            a if a.rank() == 0 => Array::vector(vec![a.at(0)]),
            a => a,
        };
        let axis = lane_axis(&array, axis, self.first)?;
        let length = array.shape()[axis];
        let counts = match self.counts.len() {
            1 => vec![self.counts[0]; length],
            n if n == length => self.counts.clone(),
            n => {
                return Err(RuntimeError::LengthError { details: format!("{n} counts for {length} items") });
            },
        };

        let total = counts.iter()
                          .try_fold(0usize, |acc, &n| acc.checked_add(usize::try_from(n.unsigned_abs()).ok()?));
        let mut shape = array.shape().to_vec();
        shape[axis] = total.unwrap_or(usize::MAX);
        if element_count(&shape).is_none() {
            return Err(RuntimeError::too_large(&shape));
        }

        let fill = array.fill_value();
        let lanes: Vec<Vec<Value>> =
            array.lanes(axis)
                 .into_iter()
                 .map(|lane| {
                     lane.into_iter()
                         .zip(&counts)
                         .flat_map(|(value, &n)| {
                             let item = if n < 0 { fill.clone() } else { value };
                             std::iter::repeat_n(item, usize::try_from(n.unsigned_abs()).unwrap_or(0))
                         })
                         .collect()
                 })
                 .collect();
        Ok(Value::from(Array::from_lanes(shape, axis, &lanes)))
    }
}

fn counts(operand: &Value) -> EvalResult<Vec<i64>> {
    operand.elements()
           .iter()
           .map(|v| v.as_integer().ok_or_else(|| RuntimeError::domain("/", None, v)))
           .collect()
}

impl Function for Replicate {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        if let Some(left) = left {
            return Err(RuntimeError::domain(&self.to_string(), Some(&left), &right));
        }
        let replicated = self.replicate(right)?;
        Ok(match replicated {
            Value::Array(array) => Value::from(array.unify(ip.tower(), true)),
            other => other,
        })
    }

    fn select(&self, _ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        if left.is_some() || self.counts.iter().any(|&n| n < 0) {
            return Err(RuntimeError::NotSelectable { function: self.to_string() });
        }
        self.replicate(right)
    }
}

impl fmt::Display for Replicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<String> = self.counts.iter().map(ToString::to_string).collect();
        write!(f, "{}{}", counts.join(" "), if self.first { "⌿" } else { "/" })
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
    fn folds_right_to_left() {
        assert_eq!(run("+/1 2 3").unwrap(), "6");
        assert_eq!(run("-/1 2 3").unwrap(), "2");
        assert_eq!(run("+/2 3⍴⍳6").unwrap(), "6 15");
        assert_eq!(run("+⌿2 3⍴⍳6").unwrap(), "5 7 9");
    }

    #[test]
    fn empty_and_single_axes() {
        assert_eq!(run("+/⍳0").unwrap(), "0");
        assert_eq!(run("×/⍳0").unwrap(), "1");
        assert_eq!(run("+/,5").unwrap(), "5");
        assert!(matches!(run("{⍺+⍵}/⍳0"), Err(RuntimeError::DomainMismatch { .. })));
    }

    #[test]
    fn n_wise_windows() {
        assert_eq!(run("2+/1 2 3 4").unwrap(), "3 5 7");
        assert_eq!(run("¯2-/1 4 9").unwrap(), "3 5");
        assert_eq!(run("0+/1 2").unwrap(), "0 0 0");
        assert!(matches!(run("5+/1 2"), Err(RuntimeError::LengthError { .. })));
    }

    #[test]
    fn values_without_axes_are_rank_errors() {
        assert!(matches!(run("+/Y"), Err(RuntimeError::RankError { .. })));
        assert!(matches!(run("+\\Y"), Err(RuntimeError::RankError { .. })));
        assert!(matches!(run("+/(\"a\" \"b\"#1 2)"), Err(RuntimeError::RankError { .. })));
        assert_eq!(run("+/5").unwrap(), "5");
        assert_eq!(run("+\\5").unwrap(), "5");
    }

    #[test]
    fn extreme_counts_do_not_overflow() {
        assert!(matches!(run("¯9223372036854775808+/1 2 3"), Err(RuntimeError::LengthError { .. })));
        assert!(matches!(run("¯9223372036854775808/1 2"), Err(RuntimeError::LengthError { .. })));
        assert!(matches!(run("9223372036854775807 9223372036854775807/1 2"),
                         Err(RuntimeError::LengthError { .. })));
    }

    #[test]
    fn reduce_along_an_axis() {
        assert_eq!(run("+/⍂1 (2 3⍴⍳6)").unwrap(), "5 7 9");
    }

    #[test]
    fn scans_every_prefix() {
        assert_eq!(run("+\\1 2 3 4").unwrap(), "1 3 6 10");
        assert_eq!(run("-\\1 2 3").unwrap(), "1 ¯1 2");
        assert_eq!(run("+⍀2 2⍴1 2 3 4").unwrap(), "1 2\n4 6");
    }

    #[test]
    fn replicate_and_compress() {
        assert_eq!(run("1 0 1/7 8 9").unwrap(), "7 9");
        assert_eq!(run("2/1 2").unwrap(), "1 1 2 2");
        assert_eq!(run("1 ¯2 1/4 5 6").unwrap(), "4 0 0 6");
        assert_eq!(run("1 0⌿2 2⍴⍳4").unwrap(), "1 2");
    }

    #[test]
    fn compress_selects_for_assignment() {
        let mut ip = Interpreter::new();
        let program = ip.parse("X←⍳4 ⋄ (0 1 0 1/X)←0 ⋄ X").unwrap();
        assert_eq!(ip.eval_program(&program).unwrap()[2].to_string(), "1 0 3 0");
    }
}
