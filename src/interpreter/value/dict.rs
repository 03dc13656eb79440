use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::interpreter::value::{complex::Complex, core::Value, number::Number};

/// Hashable form of a scalar dictionary key.
///
/// Numbers that are equal by value map to the same key, so `1`, `1.0` and
/// `1J0` all address one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    /// A boolean.
    Bool(bool),
    /// An integral number.
    Integer(i64),
    /// A non-integral real number.
    Float(OrderedFloat<f64>),
    /// A number with an imaginary part.
    Complex(Complex),
    /// A string.
    Str(String),
}

impl DictKey {
    /// Builds a key from a scalar, or returns `None` for values that cannot
    /// key a dictionary.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Int(n) => Some(Self::Integer(*n)),
            Value::Number(n) => Some(Self::from_number(*n)),
            Value::Str(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    fn from_number(n: Number) -> Self {
        if let Some(i) = n.as_i64() {
            return Self::Integer(i);
        }
        match n {
            Number::Complex(c) if c.im != 0.0 => Self::Complex(c),
            other => Self::Float(OrderedFloat(other.as_f64().unwrap_or(f64::NAN))),
        }
    }
}

/// An insertion-ordered dictionary from scalars to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    keys:   Vec<Value>,
    values: Vec<Value>,
    index:  HashMap<DictKey, usize>,
}

impl Dict {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry. Replacing keeps the original position.
    ///
    /// Returns `false` if the key is not a scalar.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::{core::Value, dict::Dict};
    ///
    /// let mut d = Dict::new();
    /// assert!(d.insert(Value::Str("a".into()), Value::Int(1)));
    /// assert!(d.insert(Value::Str("a".into()), Value::Int(2)));
    /// assert_eq!(d.len(), 1);
    /// assert_eq!(d.get(&Value::Str("a".into())), Some(&Value::Int(2)));
    /// ```
    pub fn insert(&mut self, key: Value, value: Value) -> bool {
        let Some(hashed) = DictKey::from_value(&key) else {
            return false;
        };
        if let Some(&slot) = self.index.get(&hashed) {
            self.values[slot] = value;
        } else {
            self.index.insert(hashed, self.keys.len());
            self.keys.push(key);
            self.values.push(value);
        }
        true
    }

    /// Looks a key up.
    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        let slot = self.index.get(&DictKey::from_value(key)?)?;
        self.values.get(*slot)
    }

    /// Returns the keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> &[Value] {
        &self.keys
    }

    /// Returns the values in insertion order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the dictionary has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerically_equal_keys_collide() {
        let mut d = Dict::new();
        d.insert(Value::Number(Number::Integer(1)), Value::Str("int".into()));
        d.insert(Value::Number(Number::Float(1.0)), Value::Str("float".into()));
        assert_eq!(d.len(), 1);
        assert_eq!(d.get(&Value::Int(1)), Some(&Value::Str("float".into())));
    }

    #[test]
    fn keeps_insertion_order() {
        let mut d = Dict::new();
        for key in ["b", "a", "c"] {
            d.insert(Value::Str(key.into()), Value::Bool(true));
        }
        let keys: Vec<_> = d.keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn rejects_non_scalar_keys() {
        let mut d = Dict::new();
        assert!(!d.insert(Value::List(std::sync::Arc::new(vec![])), Value::Int(0)));
        assert!(d.is_empty());
    }
}
