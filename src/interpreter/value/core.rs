use std::{fmt, sync::Arc};

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::function::Function,
        value::{
            array::Array,
            channel::Channel,
            dict::Dict,
            number::{DEFAULT_PRECISION, Number, format_integer},
        },
    },
};

/// Represents a runtime value in the interpreter.
///
/// Scalars (`Bool`, `Int`, `Number`, `Str`) and containers share one type so
/// that overloads can be chosen on the dynamic shape and type of their
/// arguments.
#[derive(Clone)]
pub enum Value {
    /// A boolean, produced by comparisons. Displays as `1` or `0`.
    Bool(bool),
    /// A raw machine integer that has not been imported into the tower yet.
    /// Index arrays used by selective assignment hold these.
    Int(i64),
    /// A number managed by the numeric tower.
    Number(Number),
    /// A string scalar.
    Str(String),
    /// An array of rank one or more.
    Array(Arc<Array>),
    /// A heterogeneous list, written `(A;B;C)`.
    List(Arc<Vec<Self>>),
    /// A dictionary.
    Dict(Arc<Dict>),
    /// A stream of values produced concurrently.
    Channel(Channel),
    /// A function value.
    Function(Arc<dyn Function>),
    /// An unbound data name, passed through instead of failing.
    Identifier(String),
    /// A value tagged with an axis for axis-aware primitives.
    Axis(Arc<AxisArgument>),
    /// A failure carried as a value across a channel.
    Error(Arc<RuntimeError>),
}

/// A right argument tagged with the axis a primitive should work along.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisArgument {
    /// The argument itself.
    pub value: Value,
    /// The axis, already converted to zero-based.
    pub axis:  usize,
}

/// Values that can be viewed as an array.
pub trait Arrayable {
    /// Returns an array view; scalars become rank-0 arrays.
    fn as_array(&self) -> Option<Array>;
}

/// Values that can be read as a single number.
pub trait Numberable {
    /// Returns the number, if this is a numeric scalar.
    fn as_number(&self) -> Option<Number>;
}

/// Values that can be called.
pub trait Callable {
    /// Returns the function, if this is one.
    fn as_function(&self) -> Option<Arc<dyn Function>>;
}

impl Arrayable for Value {
    fn as_array(&self) -> Option<Array> {
        match self {
            Self::Array(a) => Some(a.as_ref().clone()),
            Self::Bool(_) | Self::Int(_) | Self::Number(_) | Self::Str(_) => {
                Some(Array::scalar(self.clone()))
            },
            _ => None,
        }
    }
}

impl Numberable for Value {
    fn as_number(&self) -> Option<Number> {
        match self {
            Self::Bool(b) => Some(Number::Integer(i64::from(*b))),
            Self::Int(n) => Some(Number::Integer(*n)),
            Self::Number(n) => Some(*n),
            Self::Array(a) if a.size() == 1 => a.at(0).as_number(),
            _ => None,
        }
    }
}

impl Callable for Value {
    fn as_function(&self) -> Option<Arc<dyn Function>> {
        match self {
            Self::Function(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Self::Dict(Arc::new(d))
    }
}

impl Value {
    /// Returns the name of the dynamic type, used in domain errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Number(Number::Integer(_)) => "integer",
            Self::Number(Number::Float(_)) => "float",
            Self::Number(Number::Complex(_)) => "complex",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Channel(_) => "channel",
            Self::Function(_) => "function",
            Self::Identifier(_) => "identifier",
            Self::Axis(_) => "axis",
            Self::Error(_) => "error",
        }
    }

    /// Returns `true` for scalars: booleans, numbers and strings.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Int(_) | Self::Number(_) | Self::Str(_))
    }

    /// Returns `true` for numeric scalars, including booleans and raw
    /// integers.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Int(_) | Self::Number(_))
    }

    /// Returns `true` for the canonical empty array.
    #[must_use]
    pub fn is_empty_array(&self) -> bool {
        matches!(self, Self::Array(a) if a.is_empty())
    }

    /// Returns the shape; scalars have an empty shape.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Array(a) => a.shape().to_vec(),
            Self::List(items) => vec![items.len()],
            _ => Vec::new(),
        }
    }

    /// Returns an array view of any value. Non-array values become rank-0
    /// arrays holding themselves.
    #[must_use]
    pub fn as_array_view(&self) -> Array {
        match self {
            Self::Array(a) => a.as_ref().clone(),
            other => Array::scalar(other.clone()),
        }
    }

    /// Returns the elements in row-major order; a scalar is its own only
    /// element.
    #[must_use]
    pub fn elements(&self) -> Vec<Self> {
        match self {
            Self::Array(a) => a.values(),
            Self::List(items) => items.as_ref().clone(),
            other => vec![other.clone()],
        }
    }

    /// Reads an integral scalar, accepting booleans and integral floats.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::{core::Value, number::Number};
    ///
    /// assert_eq!(Value::Number(Number::Float(3.0)).as_integer(), Some(3));
    /// assert_eq!(Value::Bool(true).as_integer(), Some(1));
    /// assert_eq!(Value::Str("3".into()).as_integer(), None);
    /// ```
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(n) => Some(*n),
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Reads a `0`/`1` scalar as a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Array(a) if a.size() == 1 => a.at(0).as_bool(),
            other => match other.as_integer()? {
                0 => Some(false),
                1 => Some(true),
                _ => None,
            },
        }
    }

    /// Renders the value with `precision` significant digits for floats.
    #[must_use]
    pub fn render(&self, precision: usize) -> String {
        match self {
            Self::Bool(b) => u8::from(*b).to_string(),
            Self::Int(n) => format_integer(*n),
            Self::Number(n) => n.format(precision),
            Self::Str(s) => s.clone(),
            Self::Array(a) => render_array(a, precision),
            Self::List(items) => {
                let parts: Vec<_> = items.iter().map(|v| v.render(precision)).collect();
                format!("({})", parts.join(";"))
            },
            Self::Dict(d) => d.keys()
                              .iter()
                              .zip(d.values())
                              .map(|(k, v)| format!("{}: {}", k.render(precision), v.render(precision)))
                              .collect::<Vec<_>>()
                              .join("\n"),
            Self::Channel(_) => "<channel>".to_string(),
            Self::Function(f) => f.to_string(),
            Self::Identifier(name) => name.clone(),
            Self::Axis(a) => format!("{}[{}]", a.value.render(precision), a.axis),
            Self::Error(e) => e.to_string(),
        }
    }
}

fn render_element(value: &Value, precision: usize) -> String {
    match value {
        Value::Array(a) if a.rank() == 1 => format!("({})", render_array(a, precision)),
        other => other.render(precision),
    }
}

fn render_array(array: &Array, precision: usize) -> String {
    let values = array.values();
    if array.rank() == 1 {
        if !values.is_empty()
           && values.iter().all(|v| matches!(v, Value::Str(s) if s.chars().count() == 1))
        {
            return values.iter().map(|v| v.render(precision)).collect();
        }
        return values.iter()
                     .map(|v| render_element(v, precision))
                     .collect::<Vec<_>>()
                     .join(" ");
    }

    let columns = array.shape()[array.rank() - 1];
    let rows = array.shape()[array.rank() - 2];
    let cells: Vec<String> = values.iter().map(|v| render_element(v, precision)).collect();
    let mut widths = vec![0; columns];
    for (i, cell) in cells.iter().enumerate() {
        widths[i % columns] = widths[i % columns].max(cell.chars().count());
    }

    let plane = rows * columns;
    let planes: Vec<String> = cells.chunks(plane)
                                   .map(|chunk| {
                                       chunk.chunks(columns)
                                            .map(|row| {
                                                row.iter()
                                                   .zip(&widths)
                                                   .map(|(cell, &w)| format!("{cell:>w$}"))
                                                   .collect::<Vec<_>>()
                                                   .join(" ")
                                            })
                                            .collect::<Vec<_>>()
                                            .join("\n")
                                   })
                                   .collect();
    planes.join("\n\n")
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) | (Self::Identifier(a), Self::Identifier(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Channel(a), Self::Channel(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            (Self::Axis(a), Self::Axis(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.numeric_eq(&y),
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(n) => write!(f, "Int({n})"),
            Self::Number(n) => write!(f, "Number({n:?})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Array(a) => write!(f, "Array({:?}: {})", a.shape(), render_array(a, DEFAULT_PRECISION)),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Dict(d) => f.debug_tuple("Dict").field(d).finish(),
            Self::Channel(c) => write!(f, "{c:?}"),
            Self::Function(func) => write!(f, "Function({func})"),
            Self::Identifier(name) => write!(f, "Identifier({name})"),
            Self::Axis(a) => f.debug_tuple("Axis").field(a).finish(),
            Self::Error(e) => write!(f, "Error({e})"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(DEFAULT_PRECISION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Number(Number::Integer(n))
    }

    #[test]
    fn matrices_right_align_columns() {
        let m = Value::from(Array::new(vec![2, 2], vec![int(1), int(100), int(-20), int(3)]));
        assert_eq!(m.to_string(), " 1 100\n¯20   3");
    }

    #[test]
    fn character_vectors_render_contiguously() {
        let chars = Value::from(Array::vector("abc".chars().map(|c| Value::Str(c.to_string())).collect()));
        assert_eq!(chars.to_string(), "abc");
    }

    #[test]
    fn nested_vectors_are_parenthesized() {
        let inner = Value::from(Array::vector(vec![int(1), int(2)]));
        let outer = Value::from(Array::vector(vec![inner, int(3)]));
        assert_eq!(outer.to_string(), "(1 2) 3");
    }

    #[test]
    fn raw_and_tower_integers_compare_equal() {
        assert_eq!(Value::Int(4), int(4));
        assert_eq!(Value::Bool(true), int(1));
        assert_ne!(Value::Str("1".into()), int(1));
    }
}
