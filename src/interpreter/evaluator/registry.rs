use std::{collections::HashMap, sync::Arc};

use tracing::{debug, trace};

use crate::{
    error::RuntimeError,
    interpreter::{
        domain::core::{Domain, Shared},
        evaluator::{
            core::{EvalResult, Interpreter},
            function::Function,
        },
        lexer::SymbolTable,
        value::core::Value,
    },
};

/// Signature of a primitive implementation.
pub type HandlerFn = Arc<dyn Fn(&mut Interpreter, Option<Value>, Value) -> EvalResult<Value> + Send + Sync>;

/// Signature of an operator's derivation step.
pub type DeriveFn = fn(&Interpreter, Value, Option<Value>) -> EvalResult<Arc<dyn Function>>;

/// One overload of a primitive function.
pub trait PrimitiveHandler: Send + Sync {
    /// The primitive's symbol.
    fn symbol(&self) -> &str;
    /// A one-line description.
    fn doc(&self) -> &str;
    /// The calls this overload accepts.
    fn domain(&self) -> &dyn Domain;
    /// Runs the overload on already converted arguments.
    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value>;
    /// Whether the overload only rearranges its argument, so that applying
    /// it to an index array selects positions for selective assignment.
    fn selectable(&self) -> bool {
        false
    }
}

/// A primitive overload built from a domain and a closure.
pub struct Handler {
    symbol:     String,
    doc:        String,
    domain:     Shared,
    call:       HandlerFn,
    selectable: bool,
}

impl Handler {
    /// Creates a handler.
    pub fn new<F>(symbol: &str, doc: &str, domain: Shared, call: F) -> Self
        where F: Fn(&mut Interpreter, Option<Value>, Value) -> EvalResult<Value> + Send + Sync + 'static
    {
        Self { symbol: symbol.to_string(),
               doc: doc.to_string(),
               domain,
               call: Arc::new(call),
               selectable: false }
    }

    /// Marks the handler as usable in selective assignment.
    #[must_use]
    pub const fn selectable(mut self) -> Self {
        self.selectable = true;
        self
    }
}

impl PrimitiveHandler for Handler {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn doc(&self) -> &str {
        &self.doc
    }

    fn domain(&self) -> &dyn Domain {
        self.domain.as_ref()
    }

    fn call(&self, ip: &mut Interpreter, left: Option<Value>, right: Value) -> EvalResult<Value> {
        (self.call)(ip, left, right)
    }

    fn selectable(&self) -> bool {
        self.selectable
    }
}

/// An operator: synthesizes a derived function from its operands.
pub trait Operator: Send + Sync {
    /// The operator's symbol.
    fn symbol(&self) -> &str;
    /// A one-line description.
    fn doc(&self) -> &str;
    /// Whether the operator takes a right operand.
    fn is_dyadic(&self) -> bool;
    /// The operands this registration accepts. Dyadic operators see
    /// `(Some(left), right)`, monadic ones `(None, left)`.
    fn domain(&self) -> &dyn Domain;
    /// Builds the derived function.
    fn derive(&self, ip: &Interpreter, left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>>;
}

/// An operator built from a domain and a derivation function.
pub struct OperatorDef {
    symbol: String,
    doc:    String,
    dyadic: bool,
    domain: Shared,
    derive: DeriveFn,
}

impl OperatorDef {
    /// Creates a monadic operator.
    #[must_use]
    pub fn monadic(symbol: &str, doc: &str, domain: Shared, derive: DeriveFn) -> Self {
        Self { symbol: symbol.to_string(),
               doc: doc.to_string(),
               dyadic: false,
               domain,
               derive }
    }

    /// Creates a dyadic operator.
    #[must_use]
    pub fn dyadic(symbol: &str, doc: &str, domain: Shared, derive: DeriveFn) -> Self {
        Self { symbol: symbol.to_string(),
               doc: doc.to_string(),
               dyadic: true,
               domain,
               derive }
    }
}

impl Operator for OperatorDef {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn doc(&self) -> &str {
        &self.doc
    }

    fn is_dyadic(&self) -> bool {
        self.dyadic
    }

    fn domain(&self) -> &dyn Domain {
        self.domain.as_ref()
    }

    fn derive(&self, ip: &Interpreter, left: Value, right: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        (self.derive)(ip, left, right)
    }
}

/// Per-interpreter tables of primitives and operators.
///
/// Each symbol maps to a list of registrations probed newest first. The
/// symbol table used by the scanner is kept in step with the registrations.
#[derive(Clone, Default)]
pub struct Registry {
    primitives: HashMap<String, Vec<Arc<dyn PrimitiveHandler>>>,
    operators:  HashMap<String, Vec<Arc<dyn Operator>>>,
    symbols:    SymbolTable,
}

impl Registry {
    /// Creates an empty registry that only knows the assignment arrow.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.symbols.insert('←');
        registry
    }

    /// Adds a primitive overload in front of the existing ones.
    pub fn register_primitive(&mut self, handler: Arc<dyn PrimitiveHandler>) {
        let symbol = handler.symbol().to_string();
        self.learn_symbol(&symbol);
        debug!(%symbol, doc = handler.doc(), "registered primitive");
        self.primitives.entry(symbol).or_default().insert(0, handler);
    }

    /// Adds an operator registration in front of the existing ones.
    ///
    /// # Errors
    /// Returns `OperatorArity` if the symbol was first registered with the
    /// other arity.
    pub fn register_operator(&mut self, operator: Arc<dyn Operator>) -> EvalResult<()> {
        let symbol = operator.symbol().to_string();
        if let Some(first) = self.operators.get(&symbol).and_then(|list| list.last())
           && first.is_dyadic() != operator.is_dyadic()
        {
            return Err(RuntimeError::OperatorArity { symbol,
                                                     registered: first.is_dyadic() });
        }
        self.learn_symbol(&symbol);
        debug!(%symbol, doc = operator.doc(), dyadic = operator.is_dyadic(), "registered operator");
        self.operators.entry(symbol).or_default().insert(0, operator);
        Ok(())
    }

    /// Registers `alias` as another spelling of an existing symbol.
    pub fn alias(&mut self, alias: char, symbol: &str) {
        self.symbols.alias(alias, symbol);
    }

    fn learn_symbol(&mut self, symbol: &str) {
        let mut chars = symbol.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            self.symbols.insert(c);
        }
    }

    /// Returns the overloads of a primitive, newest first.
    #[must_use]
    pub fn primitives(&self, symbol: &str) -> &[Arc<dyn PrimitiveHandler>] {
        self.primitives.get(symbol).map_or(&[], Vec::as_slice)
    }

    /// Returns the registrations of an operator, newest first.
    #[must_use]
    pub fn operators(&self, symbol: &str) -> &[Arc<dyn Operator>] {
        self.operators.get(symbol).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if the symbol has at least one primitive overload.
    #[must_use]
    pub fn has_primitive(&self, symbol: &str) -> bool {
        !self.primitives(symbol).is_empty()
    }

    /// Returns the arity fixed by the first registration of an operator.
    #[must_use]
    pub fn operator_arity(&self, symbol: &str) -> Option<bool> {
        self.operators(symbol).last().map(|op| op.is_dyadic())
    }

    /// Derives a function from an operator and its operands.
    ///
    /// Registrations are probed newest first. A dyadic operator's domain
    /// sees `(Some(left), right)`, a monadic one's `(None, left)`.
    ///
    /// # Errors
    /// Returns `UnknownOperator` for an unregistered symbol and
    /// `DomainMismatch` when no registration accepts the operands.
    pub fn derive(&self, ip: &Interpreter, symbol: &str, left: Value, right: Option<Value>)
                  -> EvalResult<Arc<dyn Function>> {
        let operators = self.operators(symbol);
        if operators.is_empty() {
            return Err(RuntimeError::UnknownOperator { symbol: symbol.to_string() });
        }

        match right {
            Some(right) => {
                let mut operands = (Some(left), right);
                for operator in operators {
                    match operator.domain().to(ip, operands.0, operands.1) {
                        Ok((Some(l), r)) => {
                            trace!(%symbol, domain = %operator.domain().describe(), "operator matched");
                            return operator.derive(ip, l, Some(r));
                        },
                        Ok((None, r)) => return Err(RuntimeError::domain(symbol, None, &r)),
                        Err(rejected) => operands = rejected,
                    }
                }
                Err(RuntimeError::domain(symbol, operands.0.as_ref(), &operands.1))
            },
            None => {
                let mut operand = left;
                for operator in operators {
                    match operator.domain().to(ip, None, operand) {
                        Ok((_, l)) => {
                            trace!(%symbol, domain = %operator.domain().describe(), "operator matched");
                            return operator.derive(ip, l, None);
                        },
                        Err((_, l)) => operand = l,
                    }
                }
                Err(RuntimeError::domain(symbol, None, &operand))
            },
        }
    }

    /// Returns the scanner's symbol table.
    #[must_use]
    pub const fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Returns the documentation of every registration, sorted by symbol.
    #[must_use]
    pub fn docs(&self) -> Vec<(String, String)> {
        let mut docs: Vec<_> =
            self.primitives
                .values()
                .flatten()
                .map(|h| (h.symbol().to_string(), format!("{}  [{}]", h.doc(), h.domain().describe())))
                .chain(self.operators.values().flatten().map(|o| {
                                                            (o.symbol().to_string(),
                                                             format!("{}  [{}]", o.doc(), o.domain().describe()))
                                                        }))
                .collect();
        docs.sort();
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{
        domain::{
            core::{dyadic, monadic},
            scalar::{is_function, is_string},
        },
        value::number::Number,
    };

    fn never(_: &Interpreter, _: Value, _: Option<Value>) -> EvalResult<Arc<dyn Function>> {
        Err(RuntimeError::Unsupported { details: "test operator".to_string() })
    }

    #[test]
    fn operator_arity_is_fixed_by_the_first_registration() {
        let mut registry = Registry::new();
        let first = OperatorDef::monadic("¨", "each", monadic(is_function()), never);
        let second = OperatorDef::dyadic("¨", "clash", dyadic(is_function()), never);
        assert!(registry.register_operator(Arc::new(first)).is_ok());
        assert_eq!(registry.register_operator(Arc::new(second)).unwrap_err(),
                   RuntimeError::OperatorArity { symbol:     "¨".into(),
                                                 registered: false, });
        assert_eq!(registry.operator_arity("¨"), Some(false));
    }

    #[test]
    fn newest_primitive_is_probed_first() {
        let mut ip = Interpreter::new();
        let shout = Handler::new("⍴", "shout", monadic(is_string()), |_, _, right| {
            Ok(Value::Str(format!("{right}!")))
        });
        ip.register_primitive(Arc::new(shout));
        assert_eq!(ip.registry().primitives("⍴")[0].doc(), "shout");

        let program = ip.parse("⍴\"hey\" ⋄ ⍴1 2 3").unwrap();
        let values = ip.eval_program(&program).unwrap();
        assert_eq!(values[0], Value::Str("hey!".into()));
        assert_eq!(values[1].to_string(), "3");
    }

    #[test]
    fn registering_a_primitive_teaches_the_scanner() {
        let mut ip = Interpreter::new();
        assert!(ip.parse("⍭ 3").is_err());
        let double = Handler::new("⍭", "double", monadic(crate::interpreter::domain::scalar::to_number()), |_, _, right| {
            let n = right.as_integer().unwrap_or(0);
            Ok(Value::Number(Number::Integer(2 * n)))
        });
        ip.register_primitive(Arc::new(double));
        let program = ip.parse("⍭ 3").unwrap();
        assert_eq!(ip.eval_program(&program).unwrap()[0].to_string(), "6");
    }
}
