use std::sync::Arc;

use tracing::trace;

use crate::{
    ast::Expr,
    error::RuntimeError,
    interpreter::{
        evaluator::{
            core::{EvalResult, Interpreter, check_convention},
            function::Function,
            indexing::select_positions,
        },
        value::{array::Array, core::Value},
    },
    util::num::{i64_to_usize, usize_to_i64},
};

/// One selection function passed through on the way to a selective
/// assignment's name, such as `2↑` in `(2↑X)←0`.
#[derive(Debug)]
struct Step<'e> {
    function: &'e Expr,
    left:     Option<&'e Expr>,
}

/// The normalized left-hand side of `←`.
#[derive(Debug)]
enum Target<'e> {
    /// `X←V` or `f←g`.
    Plain(String),
    /// `A B C←V`.
    Vector(Vec<String>),
    /// `X[I;J]←V`.
    Indexed { name: String, slots: &'e [Option<Expr>] },
    /// `(f X)←V`, steps outermost first.
    Selective { name: String, steps: Vec<Step<'e>> },
    /// `⎕←V`.
    Output,
}

impl<'e> Target<'e> {
    fn resolve(expr: &'e Expr) -> EvalResult<Self> {
        match expr {
            Expr::Identifier(name) if name == "⎕" => Ok(Self::Output),
            Expr::Identifier(name) | Expr::FunctionVariable(name) => Ok(Self::Plain(name.clone())),
            Expr::Strand(items) => {
                let names = items.iter()
                                 .map(|item| match item {
                                     Expr::Identifier(name) => Ok(name.clone()),
                                     other => Err(not_assignable(other)),
                                 })
                                 .collect::<EvalResult<Vec<_>>>()?;
                Ok(Self::Vector(names))
            },
            Expr::Index { target, indices } => match target.as_ref() {
                Expr::Identifier(name) => Ok(Self::Indexed { name:  name.clone(),
                                                             slots: indices, }),
                other => Err(not_assignable(other)),
            },
            Expr::Call { .. } => {
                let mut steps = Vec::new();
                let mut current = expr;
                while let Expr::Call { function,
                                       left,
                                       right, } = current
                {
                    steps.push(Step { function,
                                      left: left.as_deref() });
                    current = right;
                }
                match current {
                    Expr::Identifier(name) => Ok(Self::Selective { name: name.clone(),
                                                                   steps }),
                    other => Err(not_assignable(other)),
                }
            },
            other => Err(not_assignable(other)),
        }
    }
}

fn not_assignable(expr: &Expr) -> RuntimeError {
    RuntimeError::InvalidArgument { details: format!("cannot assign to {expr}") }
}

impl Interpreter {
    /// Evaluates `target modifier← value`.
    ///
    /// The right-hand side is evaluated first; the target is never
    /// evaluated as an expression. The assignment yields the assigned value.
    pub(crate) fn eval_assignment(&mut self, target: &Expr, modifier: Option<&Expr>, value: &Expr)
                                  -> EvalResult<Value> {
        let value = self.eval_expr(value)?;
        let modifier = modifier.map(|m| self.eval_function(m)).transpose()?;
        let target = Target::resolve(target)?;
        trace!(?target, modified = modifier.is_some(), "assigning");

        match target {
            Target::Output => {
                self.write_output(&value);
                Ok(value)
            },
            Target::Plain(name) => self.assign_name(&name, value, modifier.as_ref()),
            Target::Vector(names) => {
                let parts = distribute(&value, names.len())?;
                for (name, part) in names.iter().zip(parts) {
                    self.assign_name(name, part, modifier.as_ref())?;
                }
                Ok(value)
            },
            Target::Indexed { name, slots } => {
                let mut evaluated = Vec::with_capacity(slots.len());
                for slot in slots.iter().rev() {
                    evaluated.push(slot.as_ref().map(|e| self.eval_expr(e)).transpose()?);
                }
                evaluated.reverse();
                let array = self.existing_array(&name)?;
                let (shape, positions) = select_positions(self, &array, &evaluated)?;
                self.store(&name, array, &positions, &shape, &value, modifier.as_ref())?;
                Ok(value)
            },
            Target::Selective { name, steps } => {
                let array = self.existing_array(&name)?;
                let mut selected = Value::Array(Arc::new(index_array(&array)?));
                for step in steps.iter().rev() {
                    let function = self.eval_function(step.function)?;
                    let left = step.left.map(|l| self.eval_expr(l)).transpose()?;
                    selected = function.select(self, left, selected)?;
                }
                let positions = selected.elements()
                                        .iter()
                                        .map(|v| {
                                            v.as_integer()
                                             .and_then(i64_to_usize)
                                             .filter(|&p| p < array.size())
                                             .ok_or_else(|| RuntimeError::InvalidArgument { details: format!("{v} is not a selected position") })
                                        })
                                        .collect::<EvalResult<Vec<_>>>()?;
                self.store(&name, array, &positions, &selected.shape(), &value, modifier.as_ref())?;
                Ok(value)
            },
        }
    }

    fn assign_name(&mut self, name: &str, value: Value, modifier: Option<&Arc<dyn Function>>)
                   -> EvalResult<Value> {
        let Some(modifier) = modifier else {
            self.assign(name, value.clone())?;
            return Ok(value);
        };
        let old = self.existing(name)?;
        let new = modifier.call(self, Some(old), value)?;
        check_convention(name, &new)?;
        self.assign_nearest(name, new.clone());
        Ok(new)
    }

    fn existing(&self, name: &str) -> EvalResult<Value> {
        self.get_variable(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownIdentifier { name: name.to_string() })
    }

    fn existing_array(&self, name: &str) -> EvalResult<Array> {
        match self.existing(name)? {
            Value::Array(array) => Ok(array.as_ref().clone()),
            other => Err(RuntimeError::domain("[]←", None, &other)),
        }
    }

    /// Writes `value` into the selected positions of `array` and rebinds
    /// `name`. A scalar value fills every position; an array must match the
    /// selection's shape.
    fn store(&mut self, name: &str, mut array: Array, positions: &[usize], shape: &[usize], value: &Value,
             modifier: Option<&Arc<dyn Function>>)
             -> EvalResult<()> {
        let replacements = if value.is_scalar() {
            vec![value.clone(); positions.len()]
        } else if value.shape() == shape || (shape.len() <= 1 && value.elements().len() == positions.len()) {
            value.elements()
        } else {
            return Err(RuntimeError::ShapeMismatch { left:  shape.to_vec(),
                                                     right: value.shape(), });
        };

        for (&p, replacement) in positions.iter().zip(replacements) {
            let new = match modifier {
                Some(f) => f.call(self, Some(array.at(p)), replacement)?,
                None => replacement,
            };
            array.set(p, new);
        }
        self.assign_nearest(name, Value::from(array.unify(self.tower(), true)));
        Ok(())
    }
}

/// Builds an array of the same shape holding each element's own flat index.
fn index_array(array: &Array) -> EvalResult<Array> {
    let too_large = || RuntimeError::LengthError { details: "array too large to select from".to_string() };
    let indices = (0..array.size()).map(|i| usize_to_i64(i).map(Value::Int).ok_or_else(too_large))
                                   .collect::<EvalResult<Vec<_>>>()?;
    Ok(Array::new(array.shape().to_vec(), indices))
}

/// Splits a value over `count` names: a scalar goes to every name, a vector
/// of matching length is spread element by element.
fn distribute(value: &Value, count: usize) -> EvalResult<Vec<Value>> {
    if value.is_scalar() {
        return Ok(vec![value.clone(); count]);
    }
    let parts = value.elements();
    if parts.len() != count {
        return Err(RuntimeError::LengthError { details: format!("{} names but {} values", count, parts.len()) });
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ip: &mut Interpreter, line: &str) -> String {
        let program = ip.parse(line).expect("parses");
        let values = ip.eval_program(&program).expect("evaluates");
        values.last().map(ToString::to_string).unwrap_or_default()
    }

    #[test]
    fn plain_and_vector_assignment() {
        let mut ip = Interpreter::new();
        run(&mut ip, "A B←1 2");
        assert_eq!(run(&mut ip, "A,B"), "1 2");
        run(&mut ip, "A B←7");
        assert_eq!(run(&mut ip, "A+B"), "14");
    }

    #[test]
    fn indexed_assignment_replaces_positions() {
        let mut ip = Interpreter::new();
        run(&mut ip, "X←2 3⍴⍳6");
        run(&mut ip, "X[1;2 3]←0");
        assert_eq!(run(&mut ip, "X"), "1 0 0\n4 5 6");
        run(&mut ip, "X[2;]←10 20 30");
        assert_eq!(run(&mut ip, "X"), " 1  0  0\n10 20 30");
    }

    #[test]
    fn modified_assignment_applies_the_function() {
        let mut ip = Interpreter::new();
        run(&mut ip, "X←1 2 3");
        run(&mut ip, "X+←10");
        assert_eq!(run(&mut ip, "X"), "11 12 13");
        run(&mut ip, "X[2]×←2");
        assert_eq!(run(&mut ip, "X"), "11 24 13");
    }

    #[test]
    fn selective_assignment_goes_through_select() {
        let mut ip = Interpreter::new();
        run(&mut ip, "X←⍳5");
        run(&mut ip, "(2↑X)←0");
        assert_eq!(run(&mut ip, "X"), "0 0 3 4 5");
        run(&mut ip, "(⌽X)←⍳5");
        assert_eq!(run(&mut ip, "X"), "5 4 3 2 1");
    }

    #[test]
    fn selective_assignment_rejects_arithmetic() {
        let mut ip = Interpreter::new();
        run(&mut ip, "X←⍳3");
        let program = ip.parse("(1+X)←0").unwrap();
        assert!(matches!(ip.eval_program(&program), Err(RuntimeError::NotSelectable { .. })));
    }

    #[test]
    fn dictionary_values_are_indexable_after_assignment() {
        let mut ip = Interpreter::new();
        run(&mut ip, "D←\"k\"#5");
        assert_eq!(run(&mut ip, "D[\"k\"]"), "5");
    }

    #[test]
    fn quad_assignment_writes_output() {
        let (output, lines) = crate::interpreter::evaluator::core::Output::buffer();
        let mut ip = Interpreter::new().with_output(output);
        ip.run("1+⎕←2").unwrap();
        assert_eq!(*lines.lock().unwrap(), vec!["2".to_string(), "3".to_string()]);
    }
}
