use std::sync::Arc;

use crate::interpreter::{
    domain::{
        core::{Single, check},
        scalar::to_index,
    },
    evaluator::core::Interpreter,
    value::{array::Array, core::Value},
};

fn describe(kind: &str, inner: Option<&Single>) -> String {
    inner.map_or_else(|| kind.to_string(), |inner| format!("{kind} of {}", inner.describe()))
}

fn elements_pass(ip: &Interpreter, array: &Array, inner: Option<&Single>) -> bool {
    inner.is_none_or(|inner| array.values().into_iter().all(|v| inner.to(ip, v).is_ok()))
}

/// Converts every element with `inner`, or fails as a whole.
fn convert_elements(ip: &Interpreter, array: &Array, inner: Option<&Single>) -> Option<Array> {
    let Some(inner) = inner else {
        return Some(array.clone());
    };
    let values = array.values()
                      .into_iter()
                      .map(|v| inner.to(ip, v).ok())
                      .collect::<Option<Vec<_>>>()?;
    Some(Array::new(array.shape().to_vec(), values).unify(ip.tower(), false))
}

/// Accepts arrays whose elements all satisfy `inner`, unconverted.
#[must_use]
pub fn is_array(inner: Option<Single>) -> Single {
    check(describe("array", inner.as_ref()), move |ip, value| match &value {
        Value::Array(a) if elements_pass(ip, a, inner.as_ref()) => Ok(value),
        _ => Err(value),
    })
}

/// Accepts arrays and scalars, converting every element with `inner`.
///
/// Scalars become one-element vectors.
#[must_use]
pub fn to_array(inner: Option<Single>) -> Single {
    check(describe("array", inner.as_ref()), move |ip, value| {
        let array = match &value {
            Value::Array(a) => a.as_ref().clone(),
            v if v.is_scalar() => Array::vector(vec![v.clone()]),
            _ => return Err(value),
        };
        match convert_elements(ip, &array, inner.as_ref()) {
            Some(converted) => Ok(Value::Array(Arc::new(converted))),
            None => Err(value),
        }
    })
}

/// Accepts rank-1 arrays whose elements satisfy `inner`.
#[must_use]
pub fn is_vector(inner: Option<Single>) -> Single {
    check(describe("vector", inner.as_ref()), move |ip, value| match &value {
        Value::Array(a) if a.rank() == 1 && elements_pass(ip, a, inner.as_ref()) => Ok(value),
        _ => Err(value),
    })
}

/// Accepts vectors and scalars, converting every element with `inner`.
#[must_use]
pub fn to_vector(inner: Option<Single>) -> Single {
    check(describe("vector", inner.as_ref()), move |ip, value| {
        let array = match &value {
            Value::Array(a) if a.rank() == 1 => a.as_ref().clone(),
            v if v.is_scalar() => Array::vector(vec![v.clone()]),
            _ => return Err(value),
        };
        match convert_elements(ip, &array, inner.as_ref()) {
            Some(converted) => Ok(Value::Array(Arc::new(converted))),
            None => Err(value),
        }
    })
}

/// Accepts rank-2 arrays.
#[must_use]
pub fn is_matrix() -> Single {
    check("matrix", |_, value| match &value {
        Value::Array(a) if a.rank() == 2 => Ok(value),
        _ => Err(value),
    })
}

/// Accepts the empty array.
#[must_use]
pub fn is_empty() -> Single {
    check("empty array", |_, value| if value.is_empty_array() { Ok(value) } else { Err(value) })
}

/// Converts arrays and scalars of integral numbers to raw-integer arrays.
#[must_use]
pub fn to_index_array() -> Single {
    to_array(Some(to_index()))
}

/// Converts vectors and scalars of integral numbers to raw-integer vectors.
#[must_use]
pub fn to_index_vector() -> Single {
    to_vector(Some(to_index()))
}
