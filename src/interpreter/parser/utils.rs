use std::iter::Peekable;

use crate::{
    error::ParseError,
    interpreter::{lexer::Token, parser::core::ParseResult},
};

/// Returns the next token without consuming it.
pub(in crate::interpreter::parser) fn peek<'a, I>(tokens: &mut Peekable<I>) -> Option<&'a (Token, usize)>
    where I: Iterator<Item = &'a (Token, usize)>
{
    tokens.peek().copied()
}

/// Returns the token after the next one without consuming anything.
pub(in crate::interpreter::parser) fn peek_second<'a, I>(tokens: &Peekable<I>) -> Option<&'a (Token, usize)>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    let mut ahead = tokens.clone();
    ahead.next();
    ahead.next()
}

/// Returns `true` if the token ends an expression.
pub(in crate::interpreter::parser) const fn is_terminator(token: &Token) -> bool {
    matches!(token,
             Token::End
             | Token::RParen
             | Token::RBracket
             | Token::RBrace
             | Token::Semicolon
             | Token::Colon
             | Token::Diamond)
}

/// Returns `true` if the next token ends an expression, or input is over.
pub(in crate::interpreter::parser) fn at_terminator<'a, I>(tokens: &mut Peekable<I>) -> bool
    where I: Iterator<Item = &'a (Token, usize)>
{
    peek(tokens).is_none_or(|(token, _)| is_terminator(token))
}

/// Returns `true` for the assignment arrow.
pub(in crate::interpreter::parser) fn is_arrow(token: &Token) -> bool {
    matches!(token, Token::Symbol(s) if s == "←")
}

/// Builds the error for a token that does not fit the grammar.
pub(in crate::interpreter::parser) fn unexpected(entry: Option<&(Token, usize)>) -> ParseError {
    match entry {
        Some((Token::End, position)) => ParseError::UnexpectedEndOfInput { position: *position },
        Some((token, position)) => ParseError::UnexpectedToken { token:    token.to_string(),
                                                                 position: *position, },
        None => ParseError::UnexpectedEndOfInput { position: 0 },
    }
}

/// Consumes a closing bracket, or reports the opening one as unclosed.
pub(in crate::interpreter::parser) fn expect_closing<'a, I>(tokens: &mut Peekable<I>,
                                                             closing: &Token,
                                                             bracket: char,
                                                             position: usize)
                                                             -> ParseResult<()>
    where I: Iterator<Item = &'a (Token, usize)>
{
    match tokens.next() {
        Some((token, _)) if token == closing => Ok(()),
        _ => Err(ParseError::UnclosedBracket { bracket, position }),
    }
}

/// Returns the part of a name that decides its kind: the member of a
/// `pkg→member` reference, or the whole name.
fn member(name: &str) -> &str {
    name.rsplit_once('→').map_or(name, |(_, member)| member)
}

/// Returns `true` for names that hold data: uppercase-leading names and the
/// special names `⍺`, `⍵`, `⎕` and `_`.
///
/// # Example
/// ```
/// use aplomb::interpreter::parser::utils::is_data_name;
///
/// assert!(is_data_name("X"));
/// assert!(is_data_name("⍵"));
/// assert!(is_data_name("stats→Mean"));
/// assert!(!is_data_name("sum"));
/// ```
#[must_use]
pub fn is_data_name(name: &str) -> bool {
    member(name).chars()
                .next()
                .is_some_and(|c| c.is_ascii_uppercase() || matches!(c, '⍺' | '⍵' | '⎕' | '_'))
}

/// Returns `true` for names that hold functions: lowercase-leading names.
#[must_use]
pub fn is_function_name(name: &str) -> bool {
    member(name).chars().next().is_some_and(|c| c.is_ascii_lowercase())
}
