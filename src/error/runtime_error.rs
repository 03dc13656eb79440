#[derive(Debug, Clone, PartialEq)]
/// Represents all errors that can occur during evaluation.
pub enum RuntimeError {
    /// No overload of a function accepted the operand types.
    DomainMismatch {
        /// The function or operator that was probed.
        function: String,
        /// Dynamic type of the left argument, if there was one.
        left:     Option<String>,
        /// Dynamic type of the right argument.
        right:    String,
    },
    /// Two arrays that must agree in shape did not.
    ShapeMismatch {
        /// Shape of the left operand.
        left:  Vec<usize>,
        /// Shape of the right operand.
        right: Vec<usize>,
    },
    /// An argument had the wrong number of axes.
    RankError {
        /// Details about the expected rank.
        details: String,
    },
    /// Argument lengths did not agree.
    LengthError {
        /// Details about the mismatch.
        details: String,
    },
    /// An index fell outside an axis.
    IndexOutOfBounds {
        /// The requested index, origin applied.
        index:  i64,
        /// Length of the indexed axis.
        length: usize,
    },
    /// A dictionary lookup missed.
    KeyNotFound {
        /// Rendering of the missing key.
        key: String,
    },
    /// A function name was used before it was bound.
    UnknownIdentifier {
        /// The name.
        name: String,
    },
    /// A `package→member` reference named an unregistered package.
    UnknownPackage {
        /// The package name.
        name: String,
    },
    /// A primitive symbol has no handlers.
    UnknownPrimitive {
        /// The symbol.
        symbol: String,
    },
    /// An operator symbol has no registrations.
    UnknownOperator {
        /// The symbol.
        symbol: String,
    },
    /// An operator was registered with an arity that conflicts with the
    /// first registration of its symbol.
    OperatorArity {
        /// The operator symbol.
        symbol:     String,
        /// Whether the first registration was dyadic.
        registered: bool,
    },
    /// A name bound to data was used where a function was expected.
    NotAFunction {
        /// The name or rendering of the value.
        name: String,
    },
    /// Uppercase names hold data, lowercase names hold functions.
    NamingConvention {
        /// The name being assigned.
        name:  String,
        /// Dynamic type of the rejected value.
        found: String,
    },
    /// An argument was invalid or out of range.
    InvalidArgument {
        /// Details about why the argument is invalid.
        details: String,
    },
    /// A lambda guard did not evaluate to a boolean.
    GuardNotBoolean {
        /// Rendering of the guard value.
        found: String,
    },
    /// The power operator hit its iteration ceiling.
    PowerLimit {
        /// The ceiling that was reached.
        limit: usize,
    },
    /// The requested form is not available.
    Unsupported {
        /// What was attempted.
        details: String,
    },
    /// A function that cannot select was used in selective assignment.
    NotSelectable {
        /// Rendering of the function.
        function: String,
    },
    /// A channel was read after it was closed.
    ChannelClosed,
}

impl RuntimeError {
    /// Builds a [`RuntimeError::DomainMismatch`] from the operand values.
    #[must_use]
    pub fn domain(function: impl Into<String>,
                  left: Option<&crate::interpreter::value::core::Value>,
                  right: &crate::interpreter::value::core::Value)
                  -> Self {
        Self::DomainMismatch { function: function.into(),
                               left:     left.map(|l| l.type_name().to_string()),
                               right:    right.type_name().to_string(), }
    }

    /// Builds a [`RuntimeError::LengthError`] for a shape with too many
    /// elements to allocate.
    #[must_use]
    pub fn too_large(shape: &[usize]) -> Self {
        Self::LengthError { details: format!("an array of shape {shape:?} is too large") }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainMismatch { function,
                                   left: Some(left),
                                   right, } => {
                write!(f, "Domain error: {function} is not defined for {left} and {right}.")
            },
            Self::DomainMismatch { function,
                                   left: None,
                                   right, } => {
                write!(f, "Domain error: {function} is not defined for {right}.")
            },
            Self::ShapeMismatch { left, right } => {
                write!(f, "Shape error: {left:?} does not conform to {right:?}.")
            },
            Self::RankError { details } => write!(f, "Rank error: {details}."),
            Self::LengthError { details } => write!(f, "Length error: {details}."),
            Self::IndexOutOfBounds { index, length } => write!(f,
                                                               "Index error: {index} is outside an axis of length {length}."),
            Self::KeyNotFound { key } => write!(f, "Index error: Key {key} not found."),
            Self::UnknownIdentifier { name } => write!(f, "Value error: Unknown function '{name}'."),
            Self::UnknownPackage { name } => write!(f, "Value error: Unknown package '{name}'."),
            Self::UnknownPrimitive { symbol } => {
                write!(f, "Value error: No primitive registered for {symbol}.")
            },
            Self::UnknownOperator { symbol } => {
                write!(f, "Value error: No operator registered for {symbol}.")
            },
            Self::OperatorArity { symbol, registered } => {
                let arity = if *registered { "dyadic" } else { "monadic" };
                write!(f, "Registration error: Operator {symbol} is already {arity}.")
            },
            Self::NotAFunction { name } => write!(f, "Syntax error: {name} is not a function."),
            Self::NamingConvention { name, found } => write!(f,
                                                             "Syntax error: Cannot assign {found} to '{name}'; uppercase names hold data, lowercase names hold functions."),
            Self::InvalidArgument { details } => write!(f, "Domain error: {details}."),
            Self::GuardNotBoolean { found } => {
                write!(f, "Domain error: Lambda guard must be 0 or 1, found {found}.")
            },
            Self::PowerLimit { limit } => {
                write!(f, "Limit error: Power operator did not converge within {limit} iterations.")
            },
            Self::Unsupported { details } => write!(f, "Nonce error: {details}."),
            Self::NotSelectable { function } => {
                write!(f, "Syntax error: {function} cannot be used in selective assignment.")
            },
            Self::ChannelClosed => write!(f, "Channel error: The channel is closed."),
        }
    }
}

impl std::error::Error for RuntimeError {}
