#[derive(Debug, Clone, PartialEq, Eq)]
/// Represents all errors that can occur during parsing.
pub enum ParseError {
    /// Found a token that does not fit the grammar at this point.
    UnexpectedToken {
        /// Rendering of the offending token.
        token:    String,
        /// Byte offset of the token.
        position: usize,
    },
    /// Reached the end of the line while an expression was still expected.
    UnexpectedEndOfInput {
        /// Byte offset of the end of the line.
        position: usize,
    },
    /// An opening bracket was never closed.
    UnclosedBracket {
        /// The opening bracket character.
        bracket:  char,
        /// Byte offset of the opening bracket.
        position: usize,
    },
    /// A dyadic operator had nothing usable as its right operand.
    MissingRightOperand {
        /// The operator symbol.
        operator: String,
        /// Byte offset of the operator.
        position: usize,
    },
    /// A number lexeme was not accepted by any class of the tower.
    InvalidNumber {
        /// The raw lexeme.
        lexeme:   String,
        /// Byte offset of the lexeme.
        position: usize,
    },
    /// A lambda guard list broke its ordering rules.
    InvalidGuardList {
        /// What went wrong.
        details:  String,
        /// Byte offset where the problem was detected.
        position: usize,
    },
    /// Lambda braces did not balance across buffered lines.
    UnbalancedBraces {
        /// Brace depth when the imbalance was detected.
        depth: i64,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedToken { token, position } => {
                write!(f, "Parse error at {position}: Unexpected token: {token}.")
            },
            Self::UnexpectedEndOfInput { position } => {
                write!(f, "Parse error at {position}: Unexpected end of input.")
            },
            Self::UnclosedBracket { bracket, position } => {
                write!(f, "Parse error at {position}: '{bracket}' is never closed.")
            },
            Self::MissingRightOperand { operator, position } => write!(f,
                                                                       "Parse error at {position}: Operator {operator} expects a right operand."),
            Self::InvalidNumber { lexeme, position } => {
                write!(f, "Parse error at {position}: Invalid number literal {lexeme}.")
            },
            Self::InvalidGuardList { details, position } => {
                write!(f, "Parse error at {position}: Invalid lambda: {details}.")
            },
            Self::UnbalancedBraces { depth } => {
                write!(f, "Parse error: Unbalanced braces (depth {depth}).")
            },
        }
    }
}

impl std::error::Error for ParseError {}
