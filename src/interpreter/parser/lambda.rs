use std::{iter::Peekable, sync::Arc};

use crate::{
    ast::{Expr, Guard, Lambda},
    error::ParseError,
    interpreter::{
        lexer::Token,
        parser::{
            core::{Grammar, ParseResult, parse_expr},
            utils::{peek, unexpected},
        },
    },
};

/// Parses a lambda body after its opening `{`.
///
/// Grammar:
/// ```text
/// lambda := "{" item ("⋄" item)* "}"
/// item   := expr | expr ":" expr | expr ":" expr ":" expr
/// ```
///
/// `c:a:b` is shorthand for `c:a⋄b` and must be the last item. Exactly one
/// item is unconditional, and it comes last. Empty items left by line
/// joining are skipped.
///
/// # Errors
/// - `UnclosedBracket` if the closing `}` is missing.
/// - `InvalidGuardList` if the ordering rules are broken or the body is
///   empty.
pub(in crate::interpreter::parser) fn parse_lambda<'a, I>(tokens: &mut Peekable<I>,
                                                           grammar: &Grammar,
                                                           position: usize)
                                                           -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    let invalid = |details: &str| ParseError::InvalidGuardList { details: details.to_string(),
                                                                 position };
    let mut guards = Vec::new();

    loop {
        while let Some((Token::Diamond, _)) = peek(tokens) {
            tokens.next();
        }
        match peek(tokens) {
            Some((Token::RBrace, _)) => {
                tokens.next();
                break;
            },
            None | Some((Token::End, _)) => {
                return Err(ParseError::UnclosedBracket { bracket: '{', position });
            },
            Some(_) => {},
        }

        let first = parse_expr(tokens, grammar)?;
        if let Some((Token::Colon, _)) = peek(tokens) {
            tokens.next();
            let body = parse_expr(tokens, grammar)?;
            guards.push(Guard::Conditional { condition: first,
                                             body });
            if let Some((Token::Colon, _)) = peek(tokens) {
                tokens.next();
                guards.push(Guard::Unconditional(parse_expr(tokens, grammar)?));
                while let Some((Token::Diamond, _)) = peek(tokens) {
                    tokens.next();
                }
                match tokens.next() {
                    Some((Token::RBrace, _)) => break,
                    None | Some((Token::End, _)) => {
                        return Err(ParseError::UnclosedBracket { bracket: '{', position });
                    },
                    Some(_) => return Err(invalid("a two-way guard must end the lambda")),
                }
            }
        } else {
            guards.push(Guard::Unconditional(first));
        }

        match peek(tokens) {
            Some((Token::Diamond | Token::RBrace, _)) => {},
            None | Some((Token::End, _)) => {
                return Err(ParseError::UnclosedBracket { bracket: '{', position });
            },
            other => return Err(unexpected(other)),
        }
    }

    if guards.is_empty() {
        return Err(invalid("empty body"));
    }
    let unconditional = guards.iter()
                              .filter(|g| matches!(g, Guard::Unconditional(_)))
                              .count();
    let last_is_unconditional = matches!(guards.last(), Some(Guard::Unconditional(_)));
    if unconditional == 0 {
        return Err(invalid("the last item must be unconditional"));
    }
    if unconditional > 1 || !last_is_unconditional {
        return Err(invalid("only the last item may be unconditional"));
    }

    Ok(Expr::Lambda(Arc::new(Lambda { guards })))
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{Error, ParseError},
        interpreter::evaluator::core::Interpreter,
    };

    fn parse(line: &str) -> Result<(), Error> {
        Interpreter::new().parse(line).map(|_| ())
    }

    fn invalid_guards(line: &str) -> bool {
        matches!(parse(line), Err(Error::Parse(ParseError::InvalidGuardList { .. })))
    }

    #[test]
    fn guard_lists_end_in_one_unconditional_item() {
        assert!(parse("{⍵>0:1⋄0}").is_ok());
        assert!(parse("{⍵=0:1:2}").is_ok());
        assert!(parse("{⋄⍵⋄}").is_ok());
    }

    #[test]
    fn malformed_guard_lists_are_rejected() {
        assert!(invalid_guards("{⍵>0:1}"));
        assert!(invalid_guards("{⍵>0:1⋄⍵<0:2}"));
        assert!(invalid_guards("{1⋄⍵>0:2}"));
        assert!(invalid_guards("{1⋄2}"));
        assert!(invalid_guards("{⍵=0:1:2⋄3}"));
        assert!(invalid_guards("{}"));
    }
}
