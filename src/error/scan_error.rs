#[derive(Debug, Clone, PartialEq, Eq)]
/// Represents all errors that can occur while scanning a line.
pub enum ScanError {
    /// A string or character literal was opened but never closed.
    UnterminatedQuote {
        /// The quote character that opened the literal.
        quote:    char,
        /// Byte offset of the opening quote.
        position: usize,
    },
    /// A code point that is neither syntax nor a registered symbol.
    UnrecognizedRune {
        /// The offending code point.
        rune:     char,
        /// Byte offset of the code point.
        position: usize,
    },
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnterminatedQuote { quote, position } => {
                write!(f, "Scan error at {position}: Unterminated quote {quote}.")
            },
            Self::UnrecognizedRune { rune, position } => {
                write!(f, "Scan error at {position}: Unrecognized symbol '{rune}' (U+{:04X}).",
                       u32::from(*rune))
            },
        }
    }
}

impl std::error::Error for ScanError {}
