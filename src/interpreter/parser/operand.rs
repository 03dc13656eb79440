use std::iter::Peekable;

use crate::{
    ast::Expr,
    error::ParseError,
    interpreter::{
        lexer::Token,
        parser::{
            core::{Grammar, ParseResult, parse_expr},
            function::parse_train,
            utils::{expect_closing, is_data_name, peek, unexpected},
        },
    },
};

/// Parses juxtaposed array items into a strand.
///
/// A single item is returned as is. Bracket indexing binds to the item
/// directly before it, so `1 X[2]` indexes only `X`.
///
/// # Errors
/// Returns `UnexpectedToken` if not even one item is present.
pub(in crate::interpreter::parser) fn parse_strand<'a, I>(tokens: &mut Peekable<I>,
                                                           grammar: &Grammar)
                                                           -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    let mut items = Vec::new();
    loop {
        let item = match peek(tokens) {
            Some((Token::Number(_) | Token::Str(_) | Token::Chars(_), _)) => parse_item(tokens, grammar)?,
            Some((Token::Identifier(name), _)) if is_data_name(name) => parse_item(tokens, grammar)?,
            Some((Token::LParen, _)) => {
                let snapshot = tokens.clone();
                let expr = parse_paren(tokens, grammar)?;
                if expr.is_function() {
                    *tokens = snapshot;
                    break;
                }
                parse_indexing(tokens, grammar, expr)?
            },
            _ => break,
        };
        items.push(item);
    }

    match items.len() {
        0 => Err(unexpected(peek(tokens))),
        1 => Ok(items.remove(0)),
        _ => Ok(Expr::Strand(items)),
    }
}

/// Parses one literal or data name, with any bracket indexing after it.
///
/// # Errors
/// Returns `InvalidNumber` if no tower class accepts a number lexeme.
pub(in crate::interpreter::parser) fn parse_item<'a, I>(tokens: &mut Peekable<I>,
                                                         grammar: &Grammar)
                                                         -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    let item = match tokens.next() {
        Some((Token::Number(lexeme), position)) => {
            let number = grammar.tower
                                .parse(lexeme)
                                .ok_or_else(|| ParseError::InvalidNumber { lexeme:   lexeme.clone(),
                                                                           position: *position, })?;
            Expr::Number(number)
        },
        Some((Token::Str(s), _)) => Expr::Str(s.clone()),
        Some((Token::Chars(s), _)) => Expr::Chars(s.clone()),
        Some((Token::Identifier(name), _)) if is_data_name(name) => Expr::Identifier(name.clone()),
        Some((Token::LParen, position)) => parse_paren_after_open(tokens, grammar, *position)?,
        other => return Err(unexpected(other)),
    };
    parse_indexing(tokens, grammar, item)
}

/// Parses a parenthesized group starting at `(`: a train, a list
/// `(A;B;C)`, or a plain expression.
///
/// # Errors
/// Returns `UnclosedBracket` if the closing `)` is missing.
pub(in crate::interpreter::parser) fn parse_paren<'a, I>(tokens: &mut Peekable<I>,
                                                          grammar: &Grammar)
                                                          -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    match tokens.next() {
        Some((Token::LParen, position)) => parse_paren_after_open(tokens, grammar, *position),
        other => Err(unexpected(other)),
    }
}

fn parse_paren_after_open<'a, I>(tokens: &mut Peekable<I>,
                                 grammar: &Grammar,
                                 position: usize)
                                 -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    let snapshot = tokens.clone();
    if let Ok(train) = parse_train(tokens, grammar) {
        return Ok(train);
    }
    *tokens = snapshot;

    let first = parse_expr(tokens, grammar)?;
    if let Some((Token::Semicolon, _)) = peek(tokens) {
        let mut items = vec![first];
        while let Some((Token::Semicolon, _)) = peek(tokens) {
            tokens.next();
            items.push(parse_expr(tokens, grammar)?);
        }
        expect_closing(tokens, &Token::RParen, '(', position)?;
        return Ok(Expr::List(items));
    }
    expect_closing(tokens, &Token::RParen, '(', position)?;
    Ok(first)
}

/// Wraps `item` in one `Index` node per bracket group that follows it.
///
/// Grammar: `index := "[" [expr] (";" [expr])* "]"`
fn parse_indexing<'a, I>(tokens: &mut Peekable<I>, grammar: &Grammar, mut item: Expr) -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    while let Some((Token::LBracket, position)) = peek(tokens) {
        tokens.next();
        let mut indices = Vec::new();
        loop {
            let slot = match peek(tokens) {
                Some((Token::Semicolon | Token::RBracket, _)) => None,
                _ => Some(parse_expr(tokens, grammar)?),
            };
            indices.push(slot);
            match tokens.next() {
                Some((Token::Semicolon, _)) => {},
                Some((Token::RBracket, _)) => break,
                _ => {
                    return Err(ParseError::UnclosedBracket { bracket:  '[',
                                                             position: *position, });
                },
            }
        }
        item = Expr::Index { target: Box::new(item),
                             indices };
    }
    Ok(item)
}
