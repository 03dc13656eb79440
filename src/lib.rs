//! # aplomb
//!
//! aplomb is the evaluation engine of an APL dialect written in Rust.
//! It scans and parses array expressions with right-to-left binding,
//! dispatches primitives over extensible overloads, promotes numbers through
//! a pluggable tower and derives functions from operators.

#![warn(
    clippy::redundant_clone,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::large_enum_variant,
    clippy::string_lit_as_bytes,
    clippy::match_same_arms,
    clippy::cargo,
    clippy::nursery,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    clippy::correctness,
    clippy::complexity,
    clippy::pedantic,
    //missing_docs,
)]
#![allow(clippy::missing_errors_doc)]

use std::sync::PoisonError;

use crate::{
    error::Error,
    interpreter::evaluator::core::{Interpreter, Output},
};

/// Defines the structure of parsed code.
///
/// This module declares the `Expr` enum and the assignment and lambda types
/// that represent one parsed line. The tree is built by the parser and
/// walked by the evaluator.
pub mod ast;
/// Provides unified error types for scanning, parsing and evaluation.
///
/// # Responsibilities
/// - Defines one error enum per phase, with positions where they exist.
/// - Wraps them in a single `Error` so callers can propagate with `?`.
pub mod error;
/// Ties the scanner, parser, evaluator, values, primitives and operators
/// together.
pub mod interpreter;
/// General utilities for safe numeric conversion.
pub mod util;

/// Runs every line of `source` in a fresh interpreter and returns what was
/// displayed.
///
/// Lines are joined while a lambda brace is open. The first failing line
/// stops the run.
///
/// # Examples
/// ```
/// use aplomb::run_source;
///
/// assert_eq!(run_source("X←2 3⍴⍳6\n+/X").unwrap(), vec!["6 15".to_string()]);
/// assert!(run_source("1 2 + 1 2 3").is_err());
/// ```
pub fn run_source(source: &str) -> Result<Vec<String>, Error> {
    let (output, lines) = Output::buffer();
    let mut ip = Interpreter::new().with_output(output);
    let mut buffer = interpreter::lexer::LineBuffer::new();

    for line in source.lines() {
        if let Some(logical) = buffer.push(line)? {
            ip.run(&logical)?;
        }
    }

    let displayed = lines.lock().unwrap_or_else(PoisonError::into_inner).clone();
    Ok(displayed)
}
