use std::{collections::HashMap, fmt};

use logos::Logos;
use tracing::trace;

use crate::error::ScanError;

/// Result type used by the scanner.
pub type ScanResult<T> = Result<T, ScanError>;

/// Represents a lexical token in one line of source input.
///
/// Number lexemes are recognized loosely and left unparsed; the numeric
/// tower decides what they mean. Symbols are single code points that the
/// [`SymbolTable`] maps to their canonical spelling after lexing.
#[derive(Logos, Debug, PartialEq, Eq, Clone)]
pub enum Token {
    /// Raw number lexemes such as `42`, `¯3.5E¯2` or `1J2`.
    #[regex(r"(¯?[0-9]|¯?\.[0-9])[0-9A-Za-z¯.]*", |lex| lex.slice().to_string(), allow_greedy = true)]
    Number(String),
    /// `"..."` strings; a doubled quote stands for one quote.
    #[regex(r#""([^"]|"")*""#, |lex| unquote(lex.slice(), '"'), allow_greedy = true)]
    Str(String),
    /// `'...'` character lists, expanded to one string per rune.
    #[regex(r"'([^']|'')*'", |lex| unquote(lex.slice(), '\''), allow_greedy = true)]
    Chars(String),
    /// Names such as `X`, `sum` or `pkg→Member`, and the single-character
    /// names `⍺`, `⍵`, `⎕` and `_`.
    #[regex(r"[A-Za-z][A-Za-z0-9]*(→[A-Za-z][A-Za-z0-9]*)?", |lex| lex.slice().to_string(), allow_greedy = true)]
    #[regex(r"[⍺⍵⎕_]", |lex| lex.slice().to_string())]
    Identifier(String),
    /// Any other single code point: primitives, operators and `←`.
    #[regex(r#"[^\sA-Za-z0-9¯.'"()\[\]{}:;⋄⍝⍺⍵⎕_]"#, |lex| lex.slice().to_string())]
    #[token(".", |lex| lex.slice().to_string())]
    Symbol(String),
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `:`
    #[token(":")]
    Colon,
    /// `;`
    #[token(";")]
    Semicolon,
    /// `⋄`
    #[token("⋄")]
    Diamond,
    /// `⍝ Comments.`
    #[regex(r"⍝[^\n]*", logos::skip, allow_greedy = true)]
    Comment,
    /// Whitespace.
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Ignored,
    /// End of input. Never produced by the lexer itself; [`scan`] appends it.
    End,
}

impl Token {
    /// One-letter rendering of the token kind, for debug traces only.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::lexer::Token;
    ///
    /// assert_eq!(Token::Number("1".into()).kind_letter(), 'N');
    /// assert_eq!(Token::LBrace.kind_letter(), '{');
    /// assert_eq!(Token::End.kind_letter(), 'E');
    /// ```
    #[must_use]
    pub const fn kind_letter(&self) -> char {
        match self {
            Self::Number(_) => 'N',
            Self::Str(_) => 'Q',
            Self::Chars(_) => 'C',
            Self::Identifier(_) => 'I',
            Self::Symbol(_) => 'S',
            Self::LParen => '(',
            Self::RParen => ')',
            Self::LBracket => '[',
            Self::RBracket => ']',
            Self::LBrace => '{',
            Self::RBrace => '}',
            Self::Colon => ':',
            Self::Semicolon => ';',
            Self::Diamond => '⋄',
            Self::Comment | Self::Ignored | Self::End => 'E',
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(s) | Self::Identifier(s) | Self::Symbol(s) => write!(f, "{s}"),
            Self::Str(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Self::Chars(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::End => write!(f, "end of input"),
            other => write!(f, "{}", other.kind_letter()),
        }
    }
}

/// Maps scanned code points to canonical symbol spellings.
///
/// Only code points present in the table are accepted as symbols. Aliases
/// let ASCII stand-ins spell an APL glyph, such as `^` for `∧`.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    spellings: HashMap<char, String>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a code point that spells itself.
    pub fn insert(&mut self, symbol: char) {
        self.spellings.insert(symbol, symbol.to_string());
    }

    /// Registers `alias` as another spelling of `target`.
    pub fn alias(&mut self, alias: char, target: &str) {
        self.spellings.insert(alias, target.to_string());
    }

    /// Returns the canonical spelling of a code point.
    #[must_use]
    pub fn spelling(&self, symbol: char) -> Option<&str> {
        self.spellings.get(&symbol).map(String::as_str)
    }

    /// Returns `true` if the code point is known.
    #[must_use]
    pub fn contains(&self, symbol: char) -> bool {
        self.spellings.contains_key(&symbol)
    }
}

/// Scans one line into tokens paired with their byte positions.
///
/// The sequence always ends with [`Token::End`].
///
/// # Errors
/// - [`ScanError::UnterminatedQuote`] if a string or character list is not
///   closed on the line.
/// - [`ScanError::UnrecognizedRune`] for code points that are neither part of
///   a token nor in the symbol table.
///
/// # Example
/// ```
/// use aplomb::interpreter::lexer::{SymbolTable, Token, scan};
///
/// let mut table = SymbolTable::new();
/// table.insert('+');
/// let tokens = scan("1+X", &table).unwrap();
/// let kinds: String = tokens.iter().map(|(t, _)| t.kind_letter()).collect();
/// assert_eq!(kinds, "NSIE");
/// assert!(scan("1-X", &table).is_err());
/// ```
pub fn scan(line: &str, symbols: &SymbolTable) -> ScanResult<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(line);

    while let Some(token) = lexer.next() {
        let position = lexer.span().start;
        let rune = lexer.slice().chars().next().unwrap_or(' ');
        match token {
            Ok(Token::Symbol(raw)) => {
                let spelling = raw.chars()
                                  .next()
                                  .and_then(|c| symbols.spelling(c))
                                  .ok_or(ScanError::UnrecognizedRune { rune, position })?;
                tokens.push((Token::Symbol(spelling.to_string()), position));
            },
            Ok(token) => tokens.push((token, position)),
            Err(()) if rune == '"' || rune == '\'' => {
                return Err(ScanError::UnterminatedQuote { quote: rune,
                                                          position });
            },
            Err(()) => return Err(ScanError::UnrecognizedRune { rune, position }),
        }
    }
    tokens.push((Token::End, line.len()));

    trace!(kinds = %tokens.iter().map(|(t, _)| t.kind_letter()).collect::<String>(), "scanned");
    Ok(tokens)
}

fn unquote(slice: &str, quote: char) -> String {
    let inner = &slice[quote.len_utf8()..slice.len() - quote.len_utf8()];
    let doubled: String = [quote, quote].iter().collect();
    inner.replace(&doubled, &quote.to_string())
}

/// Joins physical lines into logical lines for the scanner.
///
/// Lambdas may span several lines; the buffer counts braces outside quotes
/// and only releases the accumulated text once every brace is closed. The
/// physical lines are joined with `⋄`.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<String>,
    depth:   i64,
}

impl LineBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a physical line, returning the logical line once it is complete.
    ///
    /// # Errors
    /// Returns [`crate::error::ParseError::UnbalancedBraces`] if a `}` closes
    /// more braces than were opened. The buffer is reset in that case.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::lexer::LineBuffer;
    ///
    /// let mut buffer = LineBuffer::new();
    /// assert_eq!(buffer.push("f←{").unwrap(), None);
    /// assert_eq!(buffer.push("  ⍵+1").unwrap(), None);
    /// assert_eq!(buffer.push("}").unwrap(), Some("f←{⋄  ⍵+1⋄}".to_string()));
    /// assert!(buffer.push("}").is_err());
    /// ```
    pub fn push(&mut self, line: &str) -> Result<Option<String>, crate::error::ParseError> {
        let mut quote = None;
        for c in line.chars() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {},
                (None, '"' | '\'') => quote = Some(c),
                (None, '⍝') => break,
                (None, '{') => self.depth += 1,
                (None, '}') => self.depth -= 1,
                _ => {},
            }
        }
        self.pending.push(line.to_string());

        if self.depth < 0 {
            let depth = self.depth;
            self.reset();
            return Err(crate::error::ParseError::UnbalancedBraces { depth });
        }
        if self.depth > 0 {
            return Ok(None);
        }
        let logical = self.pending.join("⋄");
        self.reset();
        Ok(Some(logical))
    }

    /// Returns `true` while an unclosed brace is pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.depth > 0
    }

    /// Drops any pending lines.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        for c in "+-×÷⍴⍳←/.∘∧".chars() {
            table.insert(c);
        }
        table.alias('^', "∧");
        table
    }

    fn kinds(line: &str) -> String {
        scan(line, &table()).unwrap().iter().map(|(t, _)| t.kind_letter()).collect()
    }

    #[test]
    fn numbers_keep_their_raw_lexeme() {
        let tokens = scan("¯2.5E¯3 1J2 .5", &table()).unwrap();
        assert_eq!(tokens[0].0, Token::Number("¯2.5E¯3".into()));
        assert_eq!(tokens[1].0, Token::Number("1J2".into()));
        assert_eq!(tokens[2].0, Token::Number(".5".into()));
    }

    #[test]
    fn quotes_and_comments() {
        let tokens = scan(r#""say ""hi""" 'it''s' ⍝ ignored"#, &table()).unwrap();
        assert_eq!(tokens[0].0, Token::Str("say \"hi\"".into()));
        assert_eq!(tokens[1].0, Token::Chars("it's".into()));
        assert_eq!(tokens[2].0, Token::End);
    }

    #[test]
    fn operators_between_functions_are_symbols() {
        assert_eq!(kinds("+.×/⍳5"), "SSSSSNE");
        assert_eq!(kinds("∘.×"), "SSSE");
    }

    #[test]
    fn identifiers_and_packages() {
        let tokens = scan("stats→Mean ⍵⍺ X1", &table()).unwrap();
        assert_eq!(tokens[0].0, Token::Identifier("stats→Mean".into()));
        assert_eq!(tokens[1].0, Token::Identifier("⍵".into()));
        assert_eq!(tokens[2].0, Token::Identifier("⍺".into()));
        assert_eq!(tokens[3].0, Token::Identifier("X1".into()));
    }

    #[test]
    fn aliases_map_to_canonical_spelling() {
        let tokens = scan("1^0", &table()).unwrap();
        assert_eq!(tokens[1].0, Token::Symbol("∧".into()));
    }

    #[test]
    fn scan_failures() {
        assert_eq!(scan("X←\"abc", &table()),
                   Err(ScanError::UnterminatedQuote { quote:    '"',
                                                      position: 4, }));
        assert_eq!(scan("1!2", &table()),
                   Err(ScanError::UnrecognizedRune { rune:     '!',
                                                     position: 1, }));
    }
}
