use crate::interpreter::value::number::NumberTag;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Represents all reasons a numeric tower can be rejected.
pub enum TowerError {
    /// The tower has no classes at all.
    Empty,
    /// Class indices do not form the sequence `0..N-1`.
    IndexGap {
        /// The index that should have been present.
        expected: usize,
        /// The index found instead.
        found:    usize,
    },
    /// The same numeric class appears twice.
    DuplicateClass {
        /// The repeated class.
        tag: NumberTag,
    },
    /// A class does not promote into the class directly above it.
    BrokenChain {
        /// The class whose uptype misbehaved.
        from:     NumberTag,
        /// The class that was expected as the uptype result, if any.
        expected: Option<NumberTag>,
    },
}

impl std::fmt::Display for TowerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Tower error: A tower needs at least one numeric class."),
            Self::IndexGap { expected, found } => {
                write!(f, "Tower error: Expected class index {expected}, found {found}.")
            },
            Self::DuplicateClass { tag } => {
                write!(f, "Tower error: Class {tag} appears more than once.")
            },
            Self::BrokenChain { from,
                                expected: Some(to), } => {
                write!(f, "Tower error: Class {from} does not uptype to {to}.")
            },
            Self::BrokenChain { from, expected: None } => {
                write!(f, "Tower error: Top class {from} must not uptype.")
            },
        }
    }
}

impl std::error::Error for TowerError {}
