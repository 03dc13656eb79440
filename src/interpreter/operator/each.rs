use std::{fmt, sync::Arc, thread};

use tracing::debug;

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::{
            core::{EvalResult, Interpreter},
            function::Function,
        },
        operator::function_operand,
        value::{array::Array, channel::Channel, core::Value},
    },
};

/// `f¨`: applies `f` to each element.
///
/// Over a channel the derived function starts a concurrent stage instead:
/// it reads upstream, applies `f`, and forwards every result that is not
/// the empty array. A failure is forwarded as an error value and ends the
/// stage.
pub struct Each {
    function: Arc<dyn Function>,
}

impl Each {
    /// Derives `f¨`.
    pub fn derive(_ip: &Interpreter, left: Value, _right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        Ok(Arc::new(Self { function: function_operand("¨", &left)? }))
    }

    fn apply(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        let result = self.function.call(ip, left, right)?;
        match result {
            Value::Array(array) if array.size() == 1 => Ok(array.at(0)),
            Value::Array(array) => {
                Err(RuntimeError::RankError { details: format!("{}¨ produced shape {:?}; each needs scalar results",
                                                               self.function,
                                                               array.shape()) })
            },
            scalar => Ok(scalar),
        }
    }

    fn stream(&self, ip: &Interpreter, left: Option<Value>, upstream: Channel) -> Value {
        let (producer, downstream) = Channel::pair();
        let function = Arc::clone(&self.function);
        let mut stage = ip.fork();
        thread::spawn(move || {
            debug!(function = %function, "each stage started");
            while let Some(value) = upstream.recv() {
                if producer.is_cancelled() {
                    break;
                }
                let sent = match value {
                    Value::Error(_) => {
                        producer.send(value);
                        false
                    },
                    value => match function.call(&mut stage, left.clone(), value) {
                        Ok(result) if result.is_empty_array() => true,
                        Ok(result) => producer.send(result),
                        Err(error) => {
                            producer.send(Value::Error(Arc::new(error)));
                            false
                        },
                    },
                };
                if !sent {
                    break;
                }
            }
            upstream.close();
            debug!(function = %function, "each stage finished");
        });
        Value::Channel(downstream)
    }
}

impl Function for Each {
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        if let Value::Channel(upstream) = right {
            return Ok(self.stream(ip, left, upstream));
        }

        let Some(left) = left else {
            return match &right {
                Value::Array(array) => {
                    let mut out = Vec::with_capacity(array.size());
                    for value in array.values() {
                        out.push(self.apply(ip, None, value)?);
                    }
                    Ok(Value::from(Array::new(array.shape().to_vec(), out).unify(ip.tower(), false)))
                },
                Value::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items.iter() {
                        out.push(self.apply(ip, None, item.clone())?);
                    }
                    Ok(Value::List(Arc::new(out)))
                },
                _ => self.apply(ip, None, right),
            };
        };

        let (l, r) = (left.as_array_view(), right.as_array_view());
        let shape = match (l.rank(), r.rank()) {
            _ if l.shape() == r.shape() => l.shape().to_vec(),
            (0, _) => r.shape().to_vec(),
            (_, 0) => l.shape().to_vec(),
            _ => {
                return Err(RuntimeError::ShapeMismatch { left:  l.shape().to_vec(),
                                                         right: r.shape().to_vec(), });
            },
        };
        let size: usize = shape.iter().product();
        let pick = |array: &Array, i: usize| if array.rank() == 0 { array.at(0) } else { array.at(i) };
        let mut out = Vec::with_capacity(size);
        for i in 0..size {
            out.push(self.apply(ip, Some(pick(&l, i)), pick(&r, i))?);
        }
        Ok(Value::from(Array::new(shape, out).unify(ip.tower(), false)))
    }
}

impl fmt::Display for Each {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}¨", self.function)
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
    fn maps_each_element() {
        assert_eq!(run("{⍵×⍵}¨1 2 3").unwrap(), "1 4 9");
        assert_eq!(run("-¨5").unwrap(), "¯5");
    }

    #[test]
    fn dyadic_each_pairs_or_extends_scalars() {
        assert_eq!(run("1 2 3 {⍺+⍵}¨ 10 20 30").unwrap(), "11 22 33");
        assert_eq!(run("10 {⍺+⍵}¨ 1 2").unwrap(), "11 12");
        assert!(matches!(run("1 2 +¨ 1 2 3"), Err(RuntimeError::ShapeMismatch { .. })));
        assert!(matches!(run("(,10) +¨ 1 2"), Err(RuntimeError::ShapeMismatch { .. })));
    }

    #[test]
    fn results_must_be_scalars() {
        assert!(matches!(run("{⍳⍵}¨2 3"), Err(RuntimeError::RankError { .. })));
        assert_eq!(run("{,⍵}¨1 2").unwrap(), "1 2");
    }

    #[test]
    fn channels_are_mapped_and_filtered() {
        assert_eq!(run(",{⍵>2:⍵×10⋄⍳0}¨<⍳5").unwrap(), "30 40 50");
    }

    #[test]
    fn stage_failures_arrive_as_errors() {
        let result = run(",{⍵=2:⍵+\"x\"⋄⍵}¨<1 2 3");
        assert!(matches!(result, Err(RuntimeError::DomainMismatch { .. })));
    }
}
