use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::{
            core::{EvalResult, Interpreter},
            function::Function,
        },
        operator::{function_operand, right_operand},
        value::{
            array::{Array, index_vector},
            core::Value,
            number::Number,
        },
    },
    util::num::{i64_to_usize, usize_to_i64},
};

/// `f⌺k`: applies `f` to a window centred on every position of the
/// argument.
///
/// `k` is a vector of window sizes for the leading axes, or a two-row
/// matrix of sizes and steps. Windows hanging over an edge are filled with
/// the argument's fill value, and `f` receives as its left argument the
/// number of filled cells per axis: positive for cells before the start,
/// negative for cells past the end.
pub struct Stencil {
    function: Arc<dyn Function>,
    sizes:    Vec<usize>,
    steps:    Vec<usize>,
}

impl Stencil {
    /// Derives `f⌺k`.
    pub fn derive(_ip: &Interpreter, left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        let right = right_operand("⌺", right)?;
        let numbers = right.elements()
                           .iter()
                           .map(|v| v.as_integer().and_then(i64_to_usize).filter(|&n| n > 0))
                           .collect::<Option<Vec<_>>>()
                           .ok_or_else(|| RuntimeError::InvalidArgument { details: format!("⌺ needs positive sizes, got {right}") })?;

        let (sizes, steps) = match right.shape()[..] {
            [] | [_] => (numbers.clone(), vec![1; numbers.len()]),
            [2, k] => (numbers[..k].to_vec(), numbers[k..].to_vec()),
            _ => {
                return Err(RuntimeError::RankError { details: format!("⌺ takes a vector or two rows, got shape {:?}",
                                                                      right.shape()) });
            },
        };
        Ok(Arc::new(Self { function: function_operand("⌺", &left)?,
                           sizes,
                           steps }))
    }

    /// Positions along each windowed axis.
    fn frame(&self, shape: &[usize]) -> Vec<usize> {
        self.sizes
            .iter()
            .zip(&self.steps)
            .zip(shape)
            .map(|((_, &step), &length)| length.div_ceil(step))
            .collect()
    }
}

/// Where a window starts along one axis, and how many of its cells fall
/// outside it.
struct Span {
    start: i64,
    fill:  i64,
}

fn span(position: usize, size: usize, step: usize, length: usize) -> EvalResult<Span> {
    let signed = |n: usize| {
        usize_to_i64(n).ok_or_else(|| RuntimeError::LengthError { details: format!("⌺ extent {n} is too large") })
    };
    let (size, length) = (signed(size)?, signed(length)?);
    let start = signed(position * step)? - (size - 1) / 2;
    let before = (-start).max(0);
    let after = (start + size - length).max(0);
    let fill = if before > 0 { before } else { -after };
    Ok(Span { start, fill })
}

impl Function for Stencil {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        if let Some(left) = left {
            return Err(RuntimeError::domain(&self.to_string(), Some(&left), &right));
        }
        let array = right.as_array_view();
        if self.sizes.len() > array.rank() {
            return Err(RuntimeError::LengthError { details: format!("⌺ has {} sizes for rank {}",
                                                                    self.sizes.len(),
                                                                    array.rank()) });
        }

        let windowed = self.sizes.len();
        let frame = self.frame(array.shape());
        let mut window_shape = self.sizes.clone();
        window_shape.extend_from_slice(&array.shape()[windowed..]);
        let window_size: usize = window_shape.iter().product();
        let fill = array.fill_value();
        trace!(frame = ?frame, window = ?window_shape, "stencil");

        let mut results = Vec::new();
        for n in 0..frame.iter().product() {
            let positions = index_vector(&frame, n);
            let spans = positions.iter()
                                 .enumerate()
                                 .map(|(axis, &p)| span(p, self.sizes[axis], self.steps[axis], array.shape()[axis]))
                                 .collect::<EvalResult<Vec<_>>>()?;

            let mut window = Vec::with_capacity(window_size);
            for m in 0..window_size {
                let offsets = index_vector(&window_shape, m);
                let mut source = Vec::with_capacity(offsets.len());
                for (axis, &offset) in offsets.iter().enumerate() {
                    let index = match spans.get(axis) {
                        Some(span) => usize_to_i64(offset).and_then(|o| i64_to_usize(span.start + o)),
                        None => Some(offset),
                    };
                    match index {
                        Some(i) if i < array.shape()[axis] => source.push(i),
                        _ => break,
                    }
                }
                window.push(match array.flat_index(&source) {
                                Some(p) if source.len() == offsets.len() => array.at(p),
                                _ => fill.clone(),
                            });
            }

            let fills = spans.iter()
                             .map(|s| Value::Number(Number::Integer(s.fill)))
                             .collect();
            let result = self.function.call(ip,
                                            Some(Value::from(Array::vector(fills))),
                                            Value::from(Array::new(window_shape.clone(), window)))?;
            results.push(result);
        }
        Ok(Array::from_cells(&frame, results))
    }
}

impl fmt::Display for Stencil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: Vec<String> = self.sizes.iter().map(ToString::to_string).collect();
        write!(f, "{}⌺({})", self.function, sizes.join(" "))
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
    fn slides_a_zero_filled_window() {
        assert_eq!(run("{+/⍵}⌺3 ⍳4").unwrap(), "3 6 9 7");
    }

    #[test]
    fn reports_fill_counts() {
        assert_eq!(run("{+/⍺}⌺3 ⍳4").unwrap(), "1 0 0 ¯1");
    }

    #[test]
    fn steps_skip_positions() {
        assert_eq!(run("{+/⍵}⌺(2 1⍴3 2) ⍳5").unwrap(), "3 9 9");
    }

    #[test]
    fn windows_span_several_axes() {
        assert_eq!(run("{+/,⍵}⌺(3 3) 3 3⍴⍳9").unwrap(), "12 21 16\n27 45 33\n24 39 28");
    }

    #[test]
    fn rejects_bad_sizes() {
        assert!(matches!(run("{⍵}⌺0 ⍳3"), Err(RuntimeError::InvalidArgument { .. })));
        assert!(matches!(run("{⍵}⌺(3 3) ⍳3"), Err(RuntimeError::LengthError { .. })));
    }
}
