use std::iter::Peekable;

use crate::{
    ast::{Expr, Program},
    error::ParseError,
    interpreter::{
        evaluator::registry::Registry,
        lexer::Token,
        parser::{
            function::{apply_operators, is_jot, parse_function, starts_function},
            operand::parse_strand,
            utils::{at_terminator, is_arrow, is_function_name, peek, peek_second, unexpected},
        },
        value::tower::Tower,
    },
};

/// Result type used by the parser.
pub type ParseResult<T> = Result<T, ParseError>;

/// What the parser needs to know about the interpreter.
///
/// Whether a symbol is a primitive or an operator, and an operator's arity,
/// decide how a line binds; number lexemes are parsed by the tower.
#[derive(Clone, Copy)]
pub struct Grammar<'r> {
    /// Registered primitives and operators.
    pub registry: &'r Registry,
    /// The active numeric tower.
    pub tower:    &'r Tower,
}

impl Grammar<'_> {
    /// Returns `true` if the symbol names a primitive function.
    #[must_use]
    pub fn is_primitive(&self, symbol: &str) -> bool {
        self.registry.has_primitive(symbol)
    }

    /// Returns `Some(true)` for dyadic operators, `Some(false)` for monadic
    /// ones and `None` if the symbol is not an operator.
    #[must_use]
    pub fn operator_arity(&self, symbol: &str) -> Option<bool> {
        self.registry.operator_arity(symbol)
    }
}

/// Parses a scanned line into a program.
///
/// Statements are separated by `⋄`; empty statements are skipped.
///
/// Grammar: `program := [expr] ("⋄" [expr])*`
///
/// # Errors
/// Returns the first grammar violation found.
pub fn parse_program(tokens: &[(Token, usize)], grammar: &Grammar) -> ParseResult<Program> {
    let mut tokens = tokens.iter().peekable();
    let mut statements = Vec::new();

    loop {
        while let Some((Token::Diamond, _)) = peek(&mut tokens) {
            tokens.next();
        }
        match peek(&mut tokens) {
            None | Some((Token::End, _)) => break,
            Some(_) => {},
        }
        statements.push(parse_expr(&mut tokens, grammar)?);
        match tokens.next() {
            Some((Token::Diamond, _)) => {},
            None | Some((Token::End, _)) => break,
            other => return Err(unexpected(other)),
        }
    }

    Ok(Program { statements })
}

/// Parses one expression, binding right to left.
///
/// Grammar (informal):
/// ```text
/// expr := name "←" expr
///       | function [expr]
///       | operand "←" expr
///       | operand function "←" expr
///       | operand [function expr]
/// ```
///
/// Two productions are ambiguous with one token of lookahead: whether a line
/// starts with a function or with an operand, and whether an array followed
/// by an operator is a derived function. Both are resolved by trying the
/// function reading on a copy of the token iterator and falling back.
///
/// # Errors
/// Returns a `ParseError` if the tokens do not form an expression.
pub fn parse_expr<'a, I>(tokens: &mut Peekable<I>, grammar: &Grammar) -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    if let Some((Token::Identifier(name), _)) = peek(tokens)
       && peek_second(tokens).is_some_and(|(token, _)| is_arrow(token))
    {
        tokens.next();
        tokens.next();
        return parse_named_assignment(tokens, grammar, name);
    }

    let mut function_error = None;
    if starts_function(tokens, grammar) {
        let snapshot = tokens.clone();
        match parse_function(tokens, grammar) {
            Ok(function) => {
                if at_terminator(tokens) {
                    return Ok(function);
                }
                let right = parse_expr(tokens, grammar)?;
                return Ok(Expr::Call { function: Box::new(function),
                                       left:     None,
                                       right:    Box::new(right), });
            },
            Err(e) => {
                function_error = Some(e);
                *tokens = snapshot;
            },
        }
    }

    let operand = match parse_strand(tokens, grammar) {
        Ok(operand) => operand,
        Err(e) => return Err(function_error.unwrap_or(e)),
    };

    if peek(tokens).is_some_and(|(token, _)| is_arrow(token)) {
        tokens.next();
        let value = parse_expr(tokens, grammar)?;
        return Ok(Expr::Assign { target:   Box::new(operand),
                                 modifier: None,
                                 value:    Box::new(value), });
    }
    if at_terminator(tokens) {
        return Ok(operand);
    }

    if starts_function(tokens, grammar) {
        let snapshot = tokens.clone();
        if let Ok(modifier) = parse_function(tokens, grammar)
           && peek(tokens).is_some_and(|(token, _)| is_arrow(token))
        {
            tokens.next();
            let value = parse_expr(tokens, grammar)?;
            return Ok(Expr::Assign { target:   Box::new(operand),
                                     modifier: Some(Box::new(modifier)),
                                     value:    Box::new(value), });
        }
        *tokens = snapshot;
    }

    if let Some((Token::Symbol(symbol), _)) = peek(tokens)
       && grammar.operator_arity(symbol).is_some()
       && !is_jot(tokens)
    {
        let derived = apply_operators(tokens, grammar, operand)?;
        if at_terminator(tokens) {
            return Ok(derived);
        }
        let right = parse_expr(tokens, grammar)?;
        return Ok(Expr::Call { function: Box::new(derived),
                               left:     None,
                               right:    Box::new(right), });
    }

    let function = parse_function(tokens, grammar)?;
    let right = parse_expr(tokens, grammar)?;
    Ok(Expr::Call { function: Box::new(function),
                    left:     Some(Box::new(operand)),
                    right:    Box::new(right), })
}

/// Parses the right-hand side of `name←`.
///
/// A function name first tries to take a whole function expression, so that
/// `sum←+/` binds the derived function instead of applying it.
fn parse_named_assignment<'a, I>(tokens: &mut Peekable<I>, grammar: &Grammar, name: &str)
                                 -> ParseResult<Expr>
    where I: Iterator<Item = &'a (Token, usize)> + Clone
{
    let target = if is_function_name(name) {
        Expr::FunctionVariable(name.to_string())
    } else {
        Expr::Identifier(name.to_string())
    };

    if is_function_name(name) && starts_function(tokens, grammar) {
        let snapshot = tokens.clone();
        if let Ok(function) = parse_function(tokens, grammar)
           && at_terminator(tokens)
        {
            return Ok(Expr::Assign { target:   Box::new(target),
                                     modifier: None,
                                     value:    Box::new(function), });
        }
        *tokens = snapshot;
    }

    let value = parse_expr(tokens, grammar)?;
    Ok(Expr::Assign { target:   Box::new(target),
                      modifier: None,
                      value:    Box::new(value), })
}
