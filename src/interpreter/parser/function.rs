use std::iter::Peekable;

use crate::{
    ast::Expr,
    error::ParseError,
    interpreter::{
        lexer::Token,
        parser::{
            core::{Grammar, ParseResult},
            lambda::parse_lambda,
            operand::{parse_item, parse_paren},
            utils::{is_function_name, peek, peek_second, unexpected},
        },
    },
};

/// Returns `true` if the next token can begin a function.
///
/// Parentheses count, since they may hold a train; callers must be ready to
/// backtrack when they turn out to hold an array.
pub(in crate::interpreter::parser) fn starts_function<'a, I>(tokens: &mut Peekable<I>,
                                                              grammar: &Grammar)
                                                              -> bool
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    match peek(tokens) {
        Some((Token::Symbol(s), _)) if grammar.is_primitive(s) => true,
        Some((Token::Symbol(s), _)) if s == "∘" => is_jot(tokens),
        Some((Token::Identifier(name), _)) => is_function_name(name),
        Some((Token::LBrace | Token::LParen, _)) => true,
        _ => false,
    }
}

/// Returns `true` if the next two tokens are `∘.`, the start of an outer
/// product.
pub(in crate::interpreter::parser) fn is_jot<'a, I>(tokens: &mut Peekable<I>) -> bool
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    matches!(peek(tokens), Some((Token::Symbol(s), _)) if s == "∘")
    && matches!(peek_second(tokens), Some((Token::Symbol(s), _)) if s == ".")
}

/// Parses a function: a function term followed by any number of operators.
///
/// Grammar: `function := term (monadic-op | dyadic-op right-operand)*`
///
/// Operators bind left to right, so `+.×/` is `(+.×)/`.
///
/// # Errors
/// Returns a `ParseError` if no function term is found or an operator is
/// missing its right operand.
pub fn parse_function<'a, I>(tokens: &mut Peekable<I>, grammar: &Grammar) -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    let term = parse_function_term(tokens, grammar)?;
    apply_operators(tokens, grammar, term)
}

/// Applies every operator that follows to `left`, which may be a function
/// or an array operand.
pub(in crate::interpreter::parser) fn apply_operators<'a, I>(tokens: &mut Peekable<I>,
                                                              grammar: &Grammar,
                                                              mut left: Expr)
                                                              -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    while let Some((Token::Symbol(symbol), position)) = peek(tokens)
          && let Some(dyadic) = grammar.operator_arity(symbol)
    {
        tokens.next();
        let right = if dyadic {
            Some(Box::new(parse_right_operand(tokens, grammar, symbol, *position)?))
        } else {
            None
        };
        left = Expr::Derived { operator: symbol.clone(),
                               left: Box::new(left),
                               right };
    }
    Ok(left)
}

/// Parses a single function term: a primitive, `∘` before `.`, a function
/// name, a lambda or a parenthesized function.
///
/// # Errors
/// Returns `UnexpectedToken` for anything else.
pub(in crate::interpreter::parser) fn parse_function_term<'a, I>(tokens: &mut Peekable<I>,
                                                                  grammar: &Grammar)
                                                                  -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    if is_jot(tokens) {
        tokens.next();
        return Ok(Expr::Jot);
    }
    match peek(tokens) {
        Some((Token::Symbol(s), _)) if grammar.is_primitive(s) => {
            tokens.next();
            Ok(Expr::Primitive(s.clone()))
        },
        Some((Token::Identifier(name), _)) if is_function_name(name) => {
            tokens.next();
            Ok(Expr::FunctionVariable(name.clone()))
        },
        Some((Token::LBrace, position)) => {
            tokens.next();
            parse_lambda(tokens, grammar, *position)
        },
        Some((Token::LParen, position)) => {
            let expr = parse_paren(tokens, grammar)?;
            if expr.is_function() {
                Ok(expr)
            } else {
                Err(ParseError::UnexpectedToken { token:    "(".to_string(),
                                                  position: *position, })
            }
        },
        other => Err(unexpected(other)),
    }
}

/// Parses the right operand of a dyadic operator: exactly one function term
/// or one array item.
fn parse_right_operand<'a, I>(tokens: &mut Peekable<I>,
                              grammar: &Grammar,
                              operator: &str,
                              position: usize)
                              -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    let missing = || ParseError::MissingRightOperand { operator: operator.to_string(),
                                                       position };
    match peek(tokens) {
        Some((Token::LParen, _)) => parse_paren(tokens, grammar),
        Some((Token::Number(_) | Token::Str(_) | Token::Chars(_), _)) => parse_item(tokens, grammar),
        Some((Token::Identifier(name), _)) if !is_function_name(name) => parse_item(tokens, grammar),
        _ if starts_function(tokens, grammar) => parse_function_term(tokens, grammar).map_err(|_| missing()),
        _ => Err(missing()),
    }
}

/// Parses the functions of a parenthesized train up to and including `)`.
///
/// # Errors
/// Fails as soon as an item is not a function, so callers can fall back to
/// reading the parentheses as an array expression.
pub(in crate::interpreter::parser) fn parse_train<'a, I>(tokens: &mut Peekable<I>,
                                                          grammar: &Grammar)
                                                          -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    let mut functions = Vec::new();
    loop {
        functions.push(parse_function(tokens, grammar)?);
        match peek(tokens) {
            Some((Token::RParen, _)) => {
                tokens.next();
                break;
            },
            _ if starts_function(tokens, grammar) => {},
            other => return Err(unexpected(other)),
        }
    }
    Ok(fold_train(functions))
}

/// Folds juxtaposed functions right to left: two make an atop, three make a
/// fork, longer trains recurse on their tail.
fn fold_train(mut functions: Vec<Expr>) -> Expr {
    match functions.len() {
        0 | 1 => functions.pop().unwrap_or(Expr::Jot),
        2 => {
            let inner = functions.pop().unwrap_or(Expr::Jot);
            let outer = functions.pop().unwrap_or(Expr::Jot);
            Expr::Atop { outer: Box::new(outer),
                         inner: Box::new(inner), }
        },
        n if n % 2 == 1 => {
            let rest = functions.split_off(2);
            let middle = functions.pop().unwrap_or(Expr::Jot);
            let left = functions.pop().unwrap_or(Expr::Jot);
            Expr::Fork { left:   Box::new(left),
                         middle: Box::new(middle),
                         right:  Box::new(fold_train(rest)), }
        },
        _ => {
            let rest = functions.split_off(1);
            let outer = functions.pop().unwrap_or(Expr::Jot);
            Expr::Atop { outer: Box::new(outer),
                         inner: Box::new(fold_train(rest)), }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<Expr> {
        names.iter().map(|n| Expr::FunctionVariable((*n).to_string())).collect()
    }

    #[test]
    fn trains_fold_right_to_left() {
        assert_eq!(fold_train(names(&["f", "g", "h"])).to_string(), "(f g h)");
        assert_eq!(fold_train(names(&["e", "f", "g", "h"])).to_string(), "(e (f g h))");
        assert_eq!(fold_train(names(&["d", "e", "f", "g", "h"])).to_string(), "(d e (f g h))");
        assert_eq!(fold_train(names(&["g", "h"])).to_string(), "(g h)");
    }
}
