use std::fmt;

use tracing::trace;

use crate::{
    error::TowerError,
    interpreter::value::{
        complex::Complex,
        core::Value,
        number::{Number, NumberTag, parse_complex, parse_float, parse_integer},
    },
};

/// Parses a number lexeme into a class, or rejects it.
pub type ParseFn = fn(&str) -> Option<Number>;
/// Moves a number into the next class up, or fails at the top.
pub type UptypeFn = fn(Number) -> Option<Number>;

/// One rung of a numeric tower.
#[derive(Clone, Copy)]
pub struct NumberClass {
    /// The class this rung holds.
    pub tag:    NumberTag,
    /// Position in the tower, starting at 0.
    pub index:  usize,
    /// Parses a lexeme into this class.
    pub parse:  ParseFn,
    /// Moves a value of this class into the next one.
    pub uptype: UptypeFn,
}

impl fmt::Debug for NumberClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumberClass")
         .field("tag", &self.tag)
         .field("index", &self.index)
         .finish_non_exhaustive()
    }
}

impl NumberClass {
    /// The integer class: parses plain integers and uptypes to float.
    #[must_use]
    pub const fn integer(index: usize) -> Self {
        Self { tag: NumberTag::Integer,
               index,
               parse: parse_integer,
               uptype: integer_to_float }
    }

    /// The float class: parses decimal and exponent notation and uptypes to
    /// complex.
    #[must_use]
    pub const fn float(index: usize) -> Self {
        Self { tag: NumberTag::Float,
               index,
               parse: parse_float,
               uptype: float_to_complex }
    }

    /// The complex class. It never uptypes, so it has to be the top class.
    #[must_use]
    pub const fn complex(index: usize) -> Self {
        Self { tag: NumberTag::Complex,
               index,
               parse: parse_complex,
               uptype: top }
    }
}

fn integer_to_float(n: Number) -> Option<Number> {
    match n {
        Number::Integer(i) => Some(Number::Float(crate::util::num::i64_to_f64_lossy(i))),
        _ => None,
    }
}

fn float_to_complex(n: Number) -> Option<Number> {
    match n {
        Number::Float(x) => Some(Number::Complex(Complex::from(x))),
        _ => None,
    }
}

const fn top(_: Number) -> Option<Number> {
    None
}

/// An ordered hierarchy of numeric classes with promotion between neighbours.
///
/// Class `0` is the lowest. Booleans and raw machine integers live below the
/// tower and are brought into class `0` by [`Tower::import`] before any
/// arithmetic happens.
#[derive(Debug, Clone)]
pub struct Tower {
    classes: Vec<NumberClass>,
}

impl Default for Tower {
    /// Integer, then float, then complex.
    fn default() -> Self {
        Self { classes: vec![NumberClass::integer(0), NumberClass::float(1), NumberClass::complex(2)], }
    }
}

impl Tower {
    /// Builds a tower, rejecting class sequences that cannot promote cleanly.
    ///
    /// Classes may be given in any order; they are sorted by index. The
    /// indices must run `0..N` without gaps, no tag may repeat, and every
    /// class must uptype into exactly the class above it while the top class
    /// refuses to uptype.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::tower::{NumberClass, Tower};
    ///
    /// assert!(Tower::new(vec![NumberClass::float(0), NumberClass::complex(1)]).is_ok());
    /// assert!(Tower::new(vec![NumberClass::integer(0), NumberClass::complex(2)]).is_err());
    /// assert!(Tower::new(vec![]).is_err());
    /// ```
    pub fn new(mut classes: Vec<NumberClass>) -> Result<Self, TowerError> {
        if classes.is_empty() {
            return Err(TowerError::Empty);
        }
        classes.sort_by_key(|class| class.index);

        for (expected, class) in classes.iter().enumerate() {
            if class.index != expected {
                return Err(TowerError::IndexGap { expected,
                                                  found: class.index });
            }
            if classes[..expected].iter().any(|earlier| earlier.tag == class.tag) {
                return Err(TowerError::DuplicateClass { tag: class.tag });
            }
        }

        for (i, class) in classes.iter().enumerate() {
            let next = classes.get(i + 1).map(|c| c.tag);
            let promoted = (class.uptype)(sample(class.tag)).map(|n| n.tag());
            if promoted != next {
                return Err(TowerError::BrokenChain { from:     class.tag,
                                                     expected: next, });
            }
        }

        Ok(Self { classes })
    }

    /// Float, then complex. Integer literals parse straight into floats.
    #[must_use]
    pub fn floating() -> Self {
        Self { classes: vec![NumberClass::float(0), NumberClass::complex(1)], }
    }

    /// Returns the classes, lowest first.
    #[must_use]
    pub fn classes(&self) -> &[NumberClass] {
        &self.classes
    }

    /// Parses a lexeme, trying each class from the bottom up.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::{number::Number, tower::Tower};
    ///
    /// let tower = Tower::default();
    /// assert_eq!(tower.parse("42"), Some(Number::Integer(42)));
    /// assert!(matches!(tower.parse("4.5"), Some(Number::Float(_))));
    /// assert!(matches!(tower.parse("1J1"), Some(Number::Complex(_))));
    /// assert_eq!(tower.parse("1Q"), None);
    /// ```
    #[must_use]
    pub fn parse(&self, lexeme: &str) -> Option<Number> {
        self.classes.iter().find_map(|class| (class.parse)(lexeme))
    }

    /// Returns the tower index of the number's class.
    #[must_use]
    pub fn class_of(&self, number: &Number) -> Option<usize> {
        let tag = number.tag();
        self.classes.iter().position(|class| class.tag == tag)
    }

    /// Moves a number one class up, or returns `None` at the top.
    #[must_use]
    pub fn uptype(&self, number: Number) -> Option<Number> {
        let index = self.class_of(&number)?;
        if index + 1 >= self.classes.len() {
            return None;
        }
        (self.classes[index].uptype)(number)
    }

    /// Brings a number whose class is missing from this tower into the
    /// lowest class able to hold it.
    #[must_use]
    pub fn lift(&self, mut number: Number) -> Option<Number> {
        while self.class_of(&number).is_none() {
            number = number.widen()?;
        }
        Some(number)
    }

    /// Imports a scalar value into the tower.
    ///
    /// Booleans and raw integers become class-0 numbers. Returns `None` for
    /// anything that is not numeric.
    #[must_use]
    pub fn import(&self, value: &Value) -> Option<Number> {
        match value {
            Value::Bool(b) => self.lift(Number::Integer(i64::from(*b))),
            Value::Int(n) => self.lift(Number::Integer(*n)),
            Value::Number(n) => self.lift(*n),
            _ => None,
        }
    }

    /// Uptypes the lower-class operand until both share a class.
    ///
    /// Never lowers either operand.
    #[must_use]
    pub fn same_type(&self, a: Number, b: Number) -> Option<(Number, Number)> {
        let (mut a, mut b) = (self.lift(a)?, self.lift(b)?);
        loop {
            let (ia, ib) = (self.class_of(&a)?, self.class_of(&b)?);
            match ia.cmp(&ib) {
                std::cmp::Ordering::Equal => return Some((a, b)),
                std::cmp::Ordering::Less => a = self.uptype(a)?,
                std::cmp::Ordering::Greater => b = self.uptype(b)?,
            }
        }
    }

    /// Returns `n` as a number in the lowest class.
    #[must_use]
    pub fn from_index(&self, n: i64) -> Number {
        self.lift(Number::Integer(n)).unwrap_or(Number::Integer(n))
    }

    /// Retries `op` on `a` and `b`, uptyping both one class at a time until
    /// it succeeds or the top class also fails.
    pub fn retry<T>(&self, a: Number, b: Number, mut op: impl FnMut(Number, Number) -> Option<T>)
                    -> Option<T> {
        let (mut a, mut b) = self.same_type(a, b)?;
        loop {
            if let Some(result) = op(a, b) {
                return Some(result);
            }
            trace!(class = %a.tag(), "uptyping after failed scalar application");
            a = self.uptype(a)?;
            b = self.uptype(b)?;
        }
    }

    /// Monadic form of [`Tower::retry`].
    pub fn retry_monadic<T>(&self, a: Number, mut op: impl FnMut(Number) -> Option<T>) -> Option<T> {
        let mut a = self.lift(a)?;
        loop {
            if let Some(result) = op(a) {
                return Some(result);
            }
            a = self.uptype(a)?;
        }
    }
}

const fn sample(tag: NumberTag) -> Number {
    match tag {
        NumberTag::Integer => Number::Integer(1),
        NumberTag::Float => Number::Float(1.0),
        NumberTag::Complex => Number::Complex(Complex::new(1.0, 0.0)),
    }
}

#[cfg(test)]
mod tests {
    use proptest::{prelude::*, test_runner::Config as ProptestConfig};

    use super::*;

    #[test]
    fn rejects_broken_chains() {
        let err = Tower::new(vec![NumberClass::integer(0), NumberClass::complex(1)]).unwrap_err();
        assert_eq!(err,
                   TowerError::BrokenChain { from:     NumberTag::Integer,
                                             expected: Some(NumberTag::Complex), });

        let err = Tower::new(vec![NumberClass::integer(0), NumberClass::float(1)]).unwrap_err();
        assert_eq!(err,
                   TowerError::BrokenChain { from:     NumberTag::Float,
                                             expected: None, });
    }

    #[test]
    fn rejects_duplicates_and_gaps() {
        let err = Tower::new(vec![NumberClass::float(0), NumberClass::float(1)]).unwrap_err();
        assert_eq!(err, TowerError::DuplicateClass { tag: NumberTag::Float });

        let err = Tower::new(vec![NumberClass::float(1), NumberClass::complex(2)]).unwrap_err();
        assert_eq!(err, TowerError::IndexGap { expected: 0, found: 1 });
    }

    #[test]
    fn same_type_uptypes_the_lower_operand() {
        let tower = Tower::default();
        let (a, b) = tower.same_type(Number::Integer(2), Number::Float(0.5)).unwrap();
        assert!(matches!(a, Number::Float(x) if x == 2.0));
        assert!(matches!(b, Number::Float(x) if x == 0.5));
    }

    #[test]
    fn floating_tower_lifts_integers() {
        let tower = Tower::floating();
        assert!(matches!(tower.from_index(3), Number::Float(x) if x == 3.0));
        assert!(matches!(tower.parse("3"), Some(Number::Float(x)) if x == 3.0));
        assert!(matches!(tower.import(&Value::Bool(true)), Some(Number::Float(x)) if x == 1.0));
    }

    #[test]
    fn retry_climbs_until_the_operation_succeeds() {
        let tower = Tower::default();
        let result = tower.retry(Number::Integer(1), Number::Integer(2), |a, b| match (a, b) {
                              (Number::Float(x), Number::Float(y)) => Some(x / y),
                              _ => None,
                          });
        assert_eq!(result, Some(0.5));
    }

    #[test]
    fn same_type_keeps_operands_of_one_class() {
        let tower = Tower::default();
        let (a, b) = tower.same_type(Number::Integer(2), Number::Integer(-7)).unwrap();
        assert!(matches!((a, b), (Number::Integer(2), Number::Integer(-7))));

        let (a, b) = tower.same_type(Number::Float(0.5), Number::Float(1.5)).unwrap();
        assert!(matches!((a, b), (Number::Float(x), Number::Float(y)) if x == 0.5 && y == 1.5));

        let z = Complex::new(1.0, -2.0);
        let (a, b) = tower.same_type(Number::Complex(z), Number::Complex(z)).unwrap();
        assert!(matches!((a, b), (Number::Complex(x), Number::Complex(y)) if x == z && y == z));
    }

    fn number() -> impl Strategy<Value = Number> {
        prop_oneof![any::<i64>().prop_map(Number::Integer),
                    (-4_000_000i32..4_000_000).prop_map(|q| Number::Float(f64::from(q) / 4.0)),
                    ((-4_000i32..4_000), (-4_000i32..4_000))
                        .prop_map(|(re, im)| Number::Complex(Complex::new(f64::from(re) / 4.0, f64::from(im) / 4.0)))]
    }

    proptest! {
        #![proptest_config(ProptestConfig { failure_persistence: None, .. ProptestConfig::default() })]

        #[test]
        fn displayed_numbers_parse_back(n in number()) {
            let tower = Tower::default();
            let parsed = tower.parse(&n.to_string()).expect("displayed numbers parse");
            let (back, original) = tower.same_type(parsed, n).expect("one tower");
            prop_assert!(back.numeric_eq(&original), "{} came back as {}", original, back);
        }
    }
}
