use std::{fmt, sync::Arc};

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::{
            core::{EvalResult, Interpreter},
            function::Function,
        },
        operator::{function_operand, right_operand},
        value::{array::Array, core::Value},
    },
    util::num::{i64_to_usize, usize_to_i64},
};

/// `f⍤k`: applies `f` to the cells of rank `k`.
///
/// `k` holds one, two or three ranks: `k`, `l r` or `m l r`, for the
/// monadic call and the left and right arguments of a dyadic one. A
/// negative rank counts down from the argument's rank instead.
pub struct Rank {
    function: Arc<dyn Function>,
    monadic:  i64,
    left:     i64,
    right:    i64,
}

impl Rank {
    /// Derives `f⍤k` from an integer vector right operand.
    pub fn derive(_ip: &Interpreter, left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        let right = right_operand("⍤", right)?;
        let ranks = right.elements()
                         .iter()
                         .map(|v| v.as_integer().ok_or_else(|| RuntimeError::domain("⍤", None, v)))
                         .collect::<EvalResult<Vec<_>>>()?;
        let (monadic, l, r) = match ranks[..] {
            [k] => (k, k, k),
            [l, r] => (r, l, r),
            [m, l, r] => (m, l, r),
            _ => {
                return Err(RuntimeError::LengthError { details: format!("⍤ takes 1 to 3 ranks, got {}", ranks.len()) });
            },
        };
        Ok(Arc::new(Self { function: function_operand("⍤", &left)?,
                           monadic,
                           left: l,
                           right: r }))
    }
}

/// Resolves a requested cell rank against an argument of rank `actual`.
fn effective(requested: i64, actual: usize) -> usize {
    let actual_i = usize_to_i64(actual).unwrap_or(i64::MAX);
    let rank = if requested < 0 { (actual_i + requested).max(0) } else { requested.min(actual_i) };
    i64_to_usize(rank).unwrap_or(0)
}

impl Function for Rank {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        let r = right.as_array_view();
        let Some(left) = left else {
            let (frame, cells) = r.cells(effective(self.monadic, r.rank()));
            let mut results = Vec::with_capacity(cells.len());
            for cell in cells {
                results.push(self.function.call(ip, None, cell)?);
            }
            return Ok(Array::from_cells(&frame, results));
        };

        let l = left.as_array_view();
        let (left_frame, left_cells) = l.cells(effective(self.left, l.rank()));
        let (right_frame, right_cells) = r.cells(effective(self.right, r.rank()));
        let frame = match (left_frame.is_empty(), right_frame.is_empty()) {
            _ if left_frame == right_frame => left_frame,
            (true, _) => right_frame,
            (_, true) => left_frame,
            _ => {
                return Err(RuntimeError::ShapeMismatch { left:  left_frame,
                                                         right: right_frame, });
            },
        };

        let count: usize = frame.iter().product();
        let pick = |cells: &[Value], i: usize| if cells.len() == 1 { cells[0].clone() } else { cells[i].clone() };
        let mut results = Vec::with_capacity(count);
        for i in 0..count {
            results.push(self.function.call(ip, Some(pick(&left_cells, i)), pick(&right_cells, i))?);
        }
        Ok(Array::from_cells(&frame, results))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}⍤({} {} {})", self.function, self.monadic, self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::effective;
    use crate::{error::RuntimeError, interpreter::evaluator::core::Interpreter};

    fn run(line: &str) -> Result<String, RuntimeError> {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).expect("parses");
        Ok(ip.eval_program(&program)?.pop().map(|v| v.to_string()).unwrap_or_default())
    }

    #[test]
    fn negative_ranks_count_down() {
        assert_eq!(effective(1, 3), 1);
        assert_eq!(effective(5, 2), 2);
        assert_eq!(effective(-1, 3), 2);
        assert_eq!(effective(-4, 3), 0);
    }

    #[test]
    fn applies_to_rows() {
        assert_eq!(run("+/⍤1 (2 3⍴⍳6)").unwrap(), "6 15");
        assert_eq!(run("⌽⍤1 (2 3⍴⍳6)").unwrap(), "3 2 1\n6 5 4");
    }

    #[test]
    fn pairs_cells_dyadically() {
        assert_eq!(run("10 20 +⍤(0 1) (2 3⍴⍳6)").unwrap(), "11 12 13\n24 25 26");
        assert!(matches!(run("1 2 3 +⍤0 (2 2⍴⍳4)"), Err(RuntimeError::ShapeMismatch { .. })));
    }

    #[test]
    fn ragged_results_are_padded() {
        assert_eq!(run("{⍳⍵}⍤0 (1 2)").unwrap(), "1 0\n1 2");
    }
}
