use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::{
            core::{EvalResult, Interpreter},
            function::Function,
        },
        operator::{function_operand, reduce::fold, right_operand},
        value::{
            array::{Array, ArrayData},
            core::Value,
            number::Number,
        },
    },
};

/// `f.g`: the inner product.
///
/// Each row along the last axis of the left argument is paired with each
/// column along the first axis of the right one; `g` combines the pairs
/// and `f` reduces them right to left. The result has shape
/// `(¯1↓⍴L),1↓⍴R`. A scalar or length-one side extends to the other's
/// length.
pub struct Inner {
    reduce:  Arc<dyn Function>,
    combine: Arc<dyn Function>,
}

impl Inner {
    /// Derives `f.g`.
    pub fn derive(_ip: &Interpreter, left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        let right = right_operand(".", right)?;
        Ok(Arc::new(Self { reduce:  function_operand(".", &left)?,
                           combine: function_operand(".", &right)?, }))
    }

    /// Whether this is `+.×`, which has an integer fast path.
    fn is_matrix_product(&self) -> bool {
        self.reduce.symbol() == Some("+") && self.combine.symbol() == Some("×")
    }
}

/// Reads every element of `array` as an integer, if they all are.
fn integers(array: &Array) -> Option<Vec<i64>> {
    match array.data() {
        ArrayData::Int(v) => Some(v.clone()),
        ArrayData::General(v) => v.iter()
                                  .map(|x| match x {
                                      Value::Int(n) | Value::Number(Number::Integer(n)) => Some(*n),
                                      _ => None,
                                  })
                                  .collect(),
        _ => None,
    }
}

/// Splits an argument of an inner product into its shape without the
/// paired axis and the length of that axis.
fn outer_shape(shape: &[usize], last: bool) -> (Vec<usize>, usize) {
    match (shape, last) {
        ([], _) => (Vec::new(), 1),
        ([rest @ .., n], true) => (rest.to_vec(), *n),
        ([n, rest @ ..], false) => (rest.to_vec(), *n),
    }
}

/// `+.×` over integers with checked arithmetic. Returns `None` on overflow
/// so the caller can retry through the tower.
fn integer_product(rows: &[i64], columns: &[i64], count: (usize, usize), length: usize) -> Option<Vec<Value>> {
    let (row_count, column_count) = count;
    let mut out = Vec::with_capacity(row_count * column_count);
    for r in 0..row_count {
        for c in 0..column_count {
            let mut sum: i64 = 0;
            for k in 0..length {
                let a = rows[r * length + k];
                let b = columns[k * column_count + c];
                sum = sum.checked_add(a.checked_mul(b)?)?;
            }
            out.push(Value::Number(Number::Integer(sum)));
        }
    }
    Some(out)
}

impl Function for Inner {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        let Some(left) = left else {
            return Err(RuntimeError::domain(&self.to_string(), None, &right));
        };
        let l = left.as_array_view();
        let r = right.as_array_view();
        let (left_frame, left_length) = outer_shape(l.shape(), true);
        let (right_frame, right_length) = outer_shape(r.shape(), false);
        let length = match (left_length, right_length) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(RuntimeError::ShapeMismatch { left:  l.shape().to_vec(),
                                                         right: r.shape().to_vec(), });
            },
        };

        let mut shape = left_frame.clone();
        shape.extend_from_slice(&right_frame);
        let row_count: usize = left_frame.iter().product();
        let column_count: usize = right_frame.iter().product();

        if self.is_matrix_product()
           && left_length == right_length
           && let (Some(rows), Some(columns)) = (integers(&l), integers(&r))
        {
            if let Some(values) = integer_product(&rows, &columns, (row_count, column_count), length) {
                return Ok(Value::from(Array::new(shape, values)));
            }
            trace!("integer inner product overflowed, retrying through the tower");
        }

        let rows = l.values();
        let columns = r.values();
        let row_at = |i: usize, k: usize| rows[i * left_length + k.min(left_length - 1)].clone();
        let column_at = |j: usize, k: usize| columns[k.min(right_length - 1) * column_count + j].clone();

        let mut values = Vec::with_capacity(row_count * column_count);
        for i in 0..row_count {
            for j in 0..column_count {
                let mut pairs = Vec::with_capacity(length);
                for k in 0..length {
                    pairs.push(self.combine.call(ip, Some(row_at(i, k)), column_at(j, k))?);
                }
                values.push(fold(ip, &self.reduce, &pairs)?);
            }
        }
        Ok(Array::from_cells(&shape, values))
    }
}

impl fmt::Display for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.reduce, self.combine)
    }
}

/// `∘.f`: the outer product, applying `f` to every pair of items.
///
/// The result has shape `(⍴L),⍴R`.
pub struct Outer {
    function: Arc<dyn Function>,
}

impl Outer {
    /// Derives `∘.f`.
    pub fn derive(_ip: &Interpreter, _left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        let right = right_operand(".", right)?;
        Ok(Arc::new(Self { function: function_operand(".", &right)? }))
    }
}

impl Function for Outer {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        let Some(left) = left else {
            return Err(RuntimeError::domain(&self.to_string(), None, &right));
        };
        let l = left.as_array_view();
        let r = right.as_array_view();
        let mut shape = l.shape().to_vec();
        shape.extend_from_slice(r.shape());

        let columns = r.values();
        let mut values = Vec::with_capacity(l.size() * columns.len());
        for a in l.values() {
            for b in &columns {
                values.push(self.function.call(ip, Some(a.clone()), b.clone())?);
            }
        }
        Ok(Array::from_cells(&shape, values))
    }
}

impl fmt::Display for Outer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "∘.{}", self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::integer_product;
    use crate::{error::RuntimeError, interpreter::evaluator::core::Interpreter};

    fn run(line: &str) -> Result<String, RuntimeError> {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).expect("parses");
        Ok(ip.eval_program(&program)?.pop().map(|v| v.to_string()).unwrap_or_default())
    }

    #[test]
    fn dot_product_of_vectors() {
        assert_eq!(run("1 2 3 +.× 4 5 6").unwrap(), "32");
    }

    #[test]
    fn matrix_product() {
        assert_eq!(run("(2 2⍴1 2 3 4) +.× 2 2⍴5 6 7 8").unwrap(), "19 22\n43 50");
        assert_eq!(run("(2 3⍴⍳6) +.× 1 1 1").unwrap(), "6 15");
    }

    #[test]
    fn other_function_pairs() {
        assert_eq!(run("1 2 3 ⌈.+ 3 2 1").unwrap(), "4");
        assert_eq!(run("1 2 3 ∧.= 1 2 3").unwrap(), "1");
        assert_eq!(run("2 +.× 1 2 3").unwrap(), "12");
    }

    #[test]
    fn mismatched_lengths_fail() {
        assert!(matches!(run("1 2 +.× 1 2 3"), Err(RuntimeError::ShapeMismatch { .. })));
    }

    #[test]
    fn overflow_leaves_the_fast_path() {
        assert_eq!(integer_product(&[i64::MAX, 1], &[2, 1], (1, 1), 2), None);
        assert!(run("9223372036854775807 1 +.× 2 1").is_ok());
    }

    #[test]
    fn outer_product_tables() {
        assert_eq!(run("1 2 ∘.× 1 2 3").unwrap(), "1 2 3\n2 4 6");
        assert_eq!(run("(⍴1 2 ∘.+ 2 3⍴⍳6)").unwrap(), "2 2 3");
    }
}
