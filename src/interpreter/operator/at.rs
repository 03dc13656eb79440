use std::{fmt, sync::Arc};

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::{
            core::{EvalResult, Interpreter},
            function::Function,
            indexing::position,
        },
        operator::right_operand,
        value::{
            array::Array,
            core::{Callable, Value},
        },
    },
};

/// What replaces the selected items.
enum Replacement {
    Values(Value),
    Function(Arc<dyn Function>),
}

/// Which items are selected.
enum Selection {
    /// Origin-based indices of major cells.
    Cells(Value),
    /// A function returning a boolean mask of the argument's shape.
    Mask(Arc<dyn Function>),
}

/// `X@S`: replaces the items of the argument selected by `S`, leaving the
/// rest untouched.
///
/// `S` is either an index array picking major cells or a function giving a
/// boolean mask. `X` is either the replacement (a scalar extends to every
/// selected item) or a function applied to the selected items.
pub struct At {
    replacement: Replacement,
    selection:   Selection,
}

impl At {
    /// Derives `X@S`.
    pub fn derive(_ip: &Interpreter, left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        let right = right_operand("@", right)?;
        let replacement = match left.as_function() {
            Some(f) => Replacement::Function(f),
            None => Replacement::Values(left),
        };
        let selection = match right.as_function() {
            Some(f) => Selection::Mask(f),
            None => Selection::Cells(right),
        };
        Ok(Arc::new(Self { replacement,
                           selection }))
    }

    /// Returns the flat positions selected in `array` and the shape of the
    /// selection.
    fn select(&self, ip: &mut Interpreter, array: &Array, right: &Value) -> EvalResult<(Vec<usize>, Vec<usize>)> {
        match &self.selection {
            Selection::Cells(indices) => {
                if array.rank() == 0 {
                    return Err(RuntimeError::RankError { details: "@ cannot index a scalar".to_string() });
                }
                let length = array.shape()[0];
                let cell_size: usize = array.shape()[1..].iter().product();
                let origin = ip.config().origin;
                let mut positions = Vec::new();
                let elements = indices.elements();
                for index in &elements {
                    let cell = position(index, origin, length)?;
                    positions.extend(cell * cell_size..(cell + 1) * cell_size);
                }
                let mut shape = if indices.is_scalar() { Vec::new() } else { vec![elements.len()] };
                shape.extend_from_slice(&array.shape()[1..]);
                Ok((positions, shape))
            },
            Selection::Mask(f) => {
                let mask = f.call(ip, None, right.clone())?;
                if mask.shape() != array.shape() {
                    return Err(RuntimeError::ShapeMismatch { left:  mask.shape(),
                                                             right: array.shape().to_vec(), });
                }
                let mut positions = Vec::new();
                for (i, m) in mask.elements().iter().enumerate() {
                    match m.as_bool() {
                        Some(true) => positions.push(i),
                        Some(false) => {},
                        None => {
                            return Err(RuntimeError::InvalidArgument { details: format!("@ mask holds {m}") });
                        },
                    }
                }
                let count = positions.len();
                Ok((positions, vec![count]))
            },
        }
    }
}

impl Function for At {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        let mut array = right.as_array_view();
        let (positions, shape) = self.select(ip, &array, &right)?;

        let replacement = match &self.replacement {
            Replacement::Values(values) => {
                if left.is_some() {
                    return Err(RuntimeError::domain(&self.to_string(), left.as_ref(), &right));
                }
                values.clone()
            },
            Replacement::Function(f) => {
                let selected = positions.iter().map(|&p| array.at(p)).collect();
                f.call(ip, left, Value::from(Array::new(shape.clone(), selected)))?
            },
        };

        let values = if replacement.is_scalar() {
            vec![replacement; positions.len()]
        } else if replacement.elements().len() == positions.len() {
            replacement.elements()
        } else {
            return Err(RuntimeError::ShapeMismatch { left:  shape,
                                                     right: replacement.shape(), });
        };
        for (p, value) in positions.into_iter().zip(values) {
            array.set(p, value);
        }
        Ok(Value::from(array.unify(ip.tower(), true)))
    }
}

impl fmt::Display for At {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.replacement {
            Replacement::Values(v) => write!(f, "{v}")?,
            Replacement::Function(g) => write!(f, "{g}")?,
        }
        match &self.selection {
            Selection::Cells(v) => write!(f, "@{v}"),
            Selection::Mask(g) => write!(f, "@{g}"),
        }
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
    fn replaces_indexed_items() {
        assert_eq!(run("0@(2 4) ⍳5").unwrap(), "1 0 3 0 5");
        assert_eq!(run("(10 20)@(1 3) ⍳4").unwrap(), "10 2 20 4");
    }

    #[test]
    fn replaces_major_cells() {
        assert_eq!(run("0@2 (2 2⍴⍳4)").unwrap(), "1 2\n0 0");
    }

    #[test]
    fn applies_functions_to_the_selection() {
        assert_eq!(run("-@(1 2) ⍳3").unwrap(), "¯1 ¯2 3");
        assert_eq!(run("0@{⍵>2} ⍳4").unwrap(), "1 2 0 0");
        assert_eq!(run("{⍵×10}@{⍵>2} ⍳4").unwrap(), "1 2 30 40");
    }

    #[test]
    fn rejects_mismatched_replacements() {
        assert!(matches!(run("(1 2 3)@(1 2) ⍳4"), Err(RuntimeError::ShapeMismatch { .. })));
        assert!(matches!(run("0@9 ⍳4"), Err(RuntimeError::IndexOutOfBounds { .. })));
    }
}
