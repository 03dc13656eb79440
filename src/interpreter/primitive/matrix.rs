use std::sync::Arc;

use crate::{
    error::RuntimeError,
    interpreter::{
        domain::{
            array::to_array,
            core::{dyadic, monadic},
            scalar::to_number,
        },
        evaluator::{
            core::EvalResult,
            registry::{Handler, PrimitiveHandler},
        },
        value::{
            array::Array,
            core::{Numberable, Value},
            number::Number,
        },
    },
};

/// Pivots smaller than this, relative to the largest entry, count as zero.
const SINGULAR_EPSILON: f64 = 1e-12;

/// A dense row-major real matrix.
#[derive(Debug, Clone, PartialEq)]
struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    fn identity(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self { rows: n,
               cols: n,
               data }
    }

    /// Reads a numeric array of rank 2 or less. A vector is read as a single
    /// column.
    fn from_value(value: &Value) -> EvalResult<Self> {
        let array = value.as_array_view();
        let (rows, cols) = match *array.shape() {
            [] => (1, 1),
            [n] => (n, 1),
            [r, c] => (r, c),
            _ => {
                return Err(RuntimeError::RankError { details: format!("⌹ needs rank 2 or less, got rank {}",
                                                                      array.rank()) });
            },
        };
        let data = array.values()
                        .iter()
                        .map(|v| {
                            v.as_number()
                             .and_then(|n| n.as_f64())
                             .ok_or_else(|| RuntimeError::domain("⌹", None, v))
                        })
                        .collect::<EvalResult<Vec<_>>>()?;
        Ok(Self { rows, cols, data })
    }

    fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                data.push(self.get(r, c));
            }
        }
        Self { rows: self.cols,
               cols: self.rows,
               data }
    }

    fn mul(&self, other: &Self) -> Self {
        let mut data = vec![0.0; self.rows * other.cols];
        for r in 0..self.rows {
            for c in 0..other.cols {
                data[r * other.cols + c] = (0..self.cols).map(|k| self.get(r, k) * other.get(k, c)).sum();
            }
        }
        Self { rows: self.rows,
               cols: other.cols,
               data }
    }

    /// Gauss-Jordan elimination with partial pivoting.
    fn invert(&self) -> EvalResult<Self> {
        let n = self.rows;
        let mut a = self.clone();
        let mut inverse = Self::identity(n);
        let scale = a.data.iter().fold(0.0_f64, |m, x| m.max(x.abs())).max(1.0);

        for col in 0..n {
            let pivot = (col..n).max_by(|&i, &j| a.get(i, col).abs().total_cmp(&a.get(j, col).abs()))
                                .unwrap_or(col);
            if a.get(pivot, col).abs() <= SINGULAR_EPSILON * scale {
                return Err(RuntimeError::InvalidArgument { details: "singular matrix".to_string() });
            }
            a.swap_rows(col, pivot);
            inverse.swap_rows(col, pivot);

            let p = a.get(col, col);
            a.scale_row(col, 1.0 / p);
            inverse.scale_row(col, 1.0 / p);

            for row in (0..n).filter(|&r| r != col) {
                let factor = a.get(row, col);
                if factor != 0.0 {
                    a.subtract_row(row, col, factor);
                    inverse.subtract_row(row, col, factor);
                }
            }
        }
        Ok(inverse)
    }

    /// The inverse of a square matrix, or the least-squares pseudo-inverse
    /// `(AᵀA)⁻¹Aᵀ` of a tall one.
    fn pseudo_inverse(&self) -> EvalResult<Self> {
        if self.rows == self.cols {
            return self.invert();
        }
        if self.rows < self.cols {
            return Err(RuntimeError::LengthError { details: format!("{}×{} matrix has more columns than rows",
                                                                    self.rows,
                                                                    self.cols) });
        }
        let t = self.transpose();
        Ok(t.mul(self).invert()?.mul(&t))
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a != b {
            for c in 0..self.cols {
                self.data.swap(a * self.cols + c, b * self.cols + c);
            }
        }
    }

    fn scale_row(&mut self, row: usize, factor: f64) {
        for c in 0..self.cols {
            self.data[row * self.cols + c] *= factor;
        }
    }

    /// `row -= factor × source`.
    fn subtract_row(&mut self, row: usize, source: usize, factor: f64) {
        for c in 0..self.cols {
            let delta = factor * self.get(source, c);
            self.data[row * self.cols + c] -= delta;
        }
    }

    fn into_value(self, shape: Vec<usize>) -> Value {
        let values = self.data.into_iter().map(|x| Value::Number(Number::Float(x))).collect();
        Value::from(Array::new(shape, values))
    }
}

/// `⌹R`: matrix inverse. A vector is treated as a one-column matrix and a
/// scalar as its reciprocal.
fn domino(right: &Value) -> EvalResult<Value> {
    let m = Matrix::from_value(right)?;
    let inverse = m.pseudo_inverse()?;
    let shape = match right.shape().len() {
        0 => Vec::new(),
        1 => vec![inverse.cols],
        _ => vec![inverse.rows, inverse.cols],
    };
    Ok(inverse.into_value(shape))
}

/// `B⌹A`: the least-squares solution `X` of `A X = B`.
fn solve(b: &Value, a: &Value) -> EvalResult<Value> {
    let am = Matrix::from_value(a)?;
    let bm = Matrix::from_value(b)?;
    if am.rows != bm.rows {
        return Err(RuntimeError::LengthError { details: format!("{} equations but {} right-hand rows",
                                                                am.rows,
                                                                bm.rows) });
    }
    let x = am.pseudo_inverse()?.mul(&bm);
    let mut shape = Vec::new();
    if a.shape().len() == 2 {
        shape.push(x.rows);
    }
    if b.shape().len() == 2 {
        shape.push(x.cols);
    }
    Ok(x.into_value(shape))
}

/// Returns the `⌹` handlers.
pub fn handlers() -> Vec<Arc<dyn PrimitiveHandler>> {
    let numeric = || to_array(Some(to_number()));
    vec![Arc::new(Handler::new("⌹", "matrix inverse", monadic(numeric()), |_, _, right| domino(&right))),
         Arc::new(Handler::new("⌹", "matrix divide", dyadic(numeric()), |_, left, right| {
             let left = left.ok_or_else(|| RuntimeError::domain("⌹", None, &right))?;
             solve(&left, &right)
         })),]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::evaluator::core::Interpreter;

    fn floats(value: &Value) -> Vec<f64> {
        value.elements()
             .iter()
             .map(|v| v.as_number().and_then(|n| n.as_f64()).unwrap())
             .collect()
    }

    fn eval(line: &str) -> Value {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).unwrap();
        ip.eval_program(&program).unwrap().pop().unwrap()
    }

    fn close(actual: &[f64], expected: &[f64]) -> bool {
        actual.len() == expected.len() && actual.iter().zip(expected).all(|(a, e)| (a - e).abs() < 1e-9)
    }

    #[test]
    fn inverts_a_square_matrix() {
        let inverse = eval("⌹2 2⍴4 7 2 6");
        assert_eq!(inverse.shape(), vec![2, 2]);
        assert!(close(&floats(&inverse), &[0.6, -0.7, -0.2, 0.4]));
    }

    #[test]
    fn pivoting_handles_a_leading_zero() {
        let inverse = eval("⌹2 2⍴0 1 1 0");
        assert!(close(&floats(&inverse), &[0.0, 1.0, 1.0, 0.0]));
    }

    #[test]
    fn solves_linear_systems() {
        let x = eval("5 6⌹2 2⍴2 0 0 3");
        assert_eq!(x.shape(), vec![2]);
        assert!(close(&floats(&x), &[2.5, 2.0]));
    }

    #[test]
    fn least_squares_fits_a_line() {
        // y = 1 + 2x through three exact points
        let x = eval("3 5 7⌹3 2⍴1 1 1 2 1 3");
        assert!(close(&floats(&x), &[1.0, 2.0]));
    }

    #[test]
    fn singular_matrices_fail() {
        let mut ip = Interpreter::new();
        let program = ip.parse("⌹2 2⍴1 2 2 4").unwrap();
        assert!(matches!(ip.eval_program(&program), Err(RuntimeError::InvalidArgument { .. })));
    }

    #[test]
    fn scalar_inverse_is_the_reciprocal() {
        assert!(close(&floats(&eval("⌹4")), &[0.25]));
    }
}
