/// Scanning errors.
///
/// Raised while turning a line of source text into tokens: unterminated
/// quotes and code points missing from the symbol table.
pub mod scan_error;
/// Parsing errors.
///
/// Defines all error types that can occur while building an expression tree
/// from tokens. Every variant carries the byte position of the offending
/// token so callers can point at it.
pub mod parse_error;
/// Runtime errors.
///
/// Contains all error types that can be raised during evaluation: failed
/// overload resolution, shape and length mismatches, unknown identifiers,
/// registration conflicts and the bounded-repetition limit.
pub mod runtime_error;
/// Numeric tower errors.
///
/// Raised only when a tower is installed, never during evaluation.
pub mod tower_error;

pub use parse_error::ParseError;
pub use runtime_error::RuntimeError;
pub use scan_error::ScanError;
pub use tower_error::TowerError;

/// Any failure produced by the engine.
///
/// Each phase returns its own error type; this enum lets callers that drive
/// several phases at once (scan, parse, evaluate) propagate with `?`.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The scanner rejected the input.
    Scan(ScanError),
    /// The parser rejected the token stream.
    Parse(ParseError),
    /// Evaluation failed.
    Runtime(RuntimeError),
    /// A tower could not be installed.
    Tower(TowerError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
            Self::Tower(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ScanError> for Error {
    fn from(e: ScanError) -> Self {
        Self::Scan(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

impl From<TowerError> for Error {
    fn from(e: TowerError) -> Self {
        Self::Tower(e)
    }
}
