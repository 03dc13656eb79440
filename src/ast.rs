use std::{fmt, sync::Arc};

use crate::interpreter::value::number::Number;

/// An expression tree node.
///
/// Every node evaluates to a value given interpreter state. Function
/// positions (`Primitive`, `FunctionVariable`, `Lambda`, `Derived`, trains)
/// evaluate to function values; the parser decides which position a node is
/// in, so the tree carries no separate notion of statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A number literal, already parsed by the tower.
    Number(Number),
    /// A `"..."` string literal.
    Str(String),
    /// A `'...'` character list.
    Chars(String),
    /// A data name: uppercase-leading, `⍺`, `⍵`, `⎕` or a package member.
    Identifier(String),
    /// Juxtaposed items forming a vector, such as `1 2 X`.
    Strand(Vec<Self>),
    /// A list literal, `(A;B;C)`.
    List(Vec<Self>),
    /// Bracket indexing; `None` slots select a whole axis.
    Index {
        /// The indexed item.
        target:  Box<Self>,
        /// One entry per `;`-separated slot.
        indices: Vec<Option<Self>>,
    },
    /// A function application.
    Call {
        /// The function being applied.
        function: Box<Self>,
        /// The left argument of a dyadic call.
        left:     Option<Box<Self>>,
        /// The right argument.
        right:    Box<Self>,
    },
    /// An assignment, possibly modified (`X+←1`).
    Assign {
        /// The unevaluated target.
        target:   Box<Self>,
        /// A dyadic function combining the old value with the new one.
        modifier: Option<Box<Self>>,
        /// The assigned expression.
        value:    Box<Self>,
    },
    /// A primitive function symbol.
    Primitive(String),
    /// A function name: lowercase-leading.
    FunctionVariable(String),
    /// The `∘` placeholder left operand of an outer product.
    Jot,
    /// A lambda literal.
    Lambda(Arc<Lambda>),
    /// An operator applied to its operands.
    Derived {
        /// The operator symbol.
        operator: String,
        /// The left operand, a function or an array.
        left:     Box<Self>,
        /// The right operand of a dyadic operator.
        right:    Option<Box<Self>>,
    },
    /// A two-function train: `outer(inner(R))`.
    Atop {
        /// Applied last.
        outer: Box<Self>,
        /// Applied first, with the call's arguments.
        inner: Box<Self>,
    },
    /// A three-function train: `middle(left(L,R), right(L,R))`.
    Fork {
        /// Left tine.
        left:   Box<Self>,
        /// Combining function.
        middle: Box<Self>,
        /// Right tine.
        right:  Box<Self>,
    },
}

impl Expr {
    /// Returns `true` for nodes in function position.
    #[must_use]
    pub const fn is_function(&self) -> bool {
        matches!(self,
                 Self::Primitive(_)
                 | Self::FunctionVariable(_)
                 | Self::Jot
                 | Self::Lambda(_)
                 | Self::Derived { .. }
                 | Self::Atop { .. }
                 | Self::Fork { .. })
    }
}

/// A lambda body: a list of guarded expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    /// Guards in source order. At most one is unconditional, and only last.
    pub guards: Vec<Guard>,
}

/// One item of a lambda's guard list.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    /// `condition:body`; the body runs if the condition is 1.
    Conditional {
        /// Must evaluate to a boolean scalar.
        condition: Expr,
        /// The result when the condition holds.
        body:      Expr,
    },
    /// A plain expression.
    Unconditional(Expr),
}

/// A parsed line: `⋄`-separated top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// Statements in execution order.
    pub statements: Vec<Expr>,
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Chars(s) => write!(f, "'{s}'"),
            Self::Identifier(name) | Self::Primitive(name) | Self::FunctionVariable(name) => {
                write!(f, "{name}")
            },
            Self::Strand(items) => {
                let parts: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "strand({})", parts.join(" "))
            },
            Self::List(items) => {
                let parts: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(";"))
            },
            Self::Index { target, indices } => {
                let parts: Vec<_> = indices.iter()
                                           .map(|i| i.as_ref().map_or_else(String::new, ToString::to_string))
                                           .collect();
                write!(f, "{target}[{}]", parts.join(";"))
            },
            Self::Call { function,
                         left: Some(left),
                         right, } => write!(f, "({left} {function} {right})"),
            Self::Call { function,
                         left: None,
                         right, } => write!(f, "({function} {right})"),
            Self::Assign { target,
                           modifier,
                           value, } => match modifier {
                Some(m) => write!(f, "({target} {m}← {value})"),
                None => write!(f, "({target} ← {value})"),
            },
            Self::Jot => write!(f, "∘"),
            Self::Lambda(lambda) => write!(f, "{lambda}"),
            Self::Derived { operator,
                            left,
                            right, } => match right {
                Some(right) => write!(f, "({left}{operator}{right})"),
                None => write!(f, "({left}{operator})"),
            },
            Self::Atop { outer, inner } => write!(f, "({outer} {inner})"),
            Self::Fork { left,
                         middle,
                         right, } => write!(f, "({left} {middle} {right})"),
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.guards
                                .iter()
                                .map(|g| match g {
                                    Guard::Conditional { condition, body } => format!("{condition}:{body}"),
                                    Guard::Unconditional(e) => e.to_string(),
                                })
                                .collect();
        write!(f, "{{{}}}", parts.join("⋄"))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.statements.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("⋄"))
    }
}
