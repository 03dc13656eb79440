use crate::interpreter::{
    domain::core::{Single, check, predicate},
    value::core::Value,
};

/// Accepts numeric scalars, including booleans and raw integers.
#[must_use]
pub fn is_number() -> Single {
    predicate("number", Value::is_numeric)
}

/// Imports numeric scalars into the active tower.
#[must_use]
pub fn to_number() -> Single {
    check("number", |ip, value| match ip.tower().import(&value) {
        Some(n) => Ok(Value::Number(n)),
        None => Err(value),
    })
}

/// Accepts booleans.
#[must_use]
pub fn is_bool() -> Single {
    predicate("boolean", |v| matches!(v, Value::Bool(_)))
}

/// Converts `0` and `1` scalars to booleans.
#[must_use]
pub fn to_bool() -> Single {
    check("boolean", |_, value| {
        if !value.is_numeric() {
            return Err(value);
        }
        match value.as_integer() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(value),
        }
    })
}

/// Converts integral numeric scalars to raw integers.
#[must_use]
pub fn to_index() -> Single {
    check("integer", |_, value| match (value.is_numeric(), value.as_integer()) {
        (true, Some(n)) => Ok(Value::Int(n)),
        _ => Err(value),
    })
}

/// Accepts strings.
#[must_use]
pub fn is_string() -> Single {
    predicate("string", |v| matches!(v, Value::Str(_)))
}

/// Accepts functions.
#[must_use]
pub fn is_function() -> Single {
    predicate("function", |v| matches!(v, Value::Function(_)))
}

/// Accepts scalars: numbers, booleans and strings.
#[must_use]
pub fn is_scalar() -> Single {
    predicate("scalar", Value::is_scalar)
}

/// Accepts scalars and discloses arrays holding exactly one element.
#[must_use]
pub fn to_scalar() -> Single {
    check("scalar", |_, value| {
        if value.is_scalar() {
            return Ok(value);
        }
        match &value {
            Value::Array(a) if a.size() == 1 => Ok(a.at(0)),
            _ => Err(value),
        }
    })
}

/// Accepts lists.
#[must_use]
pub fn is_list() -> Single {
    predicate("list", |v| matches!(v, Value::List(_)))
}

/// Accepts dictionaries.
#[must_use]
pub fn is_dict() -> Single {
    predicate("dictionary", |v| matches!(v, Value::Dict(_)))
}

/// Accepts channels.
#[must_use]
pub fn is_channel() -> Single {
    predicate("channel", |v| matches!(v, Value::Channel(_)))
}

/// Accepts axis-tagged arguments.
#[must_use]
pub fn is_axis() -> Single {
    predicate("axis argument", |v| matches!(v, Value::Axis(_)))
}
