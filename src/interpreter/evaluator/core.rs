use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::{debug, trace, warn};

use crate::{
    ast::{Expr, Program},
    error::{Error, RuntimeError, TowerError},
    interpreter::{
        evaluator::{
            function::{Atop, Fork, Function, Jot, LambdaFunction, PrimitiveFunction},
            indexing::select_positions,
            registry::{Operator, PrimitiveHandler, Registry},
        },
        lexer::scan,
        operator, primitive,
        parser::{
            core::{Grammar, parse_program},
            utils::is_function_name,
        },
        value::{
            array::Array,
            core::{Callable, Value},
            number::DEFAULT_PRECISION,
            tower::{NumberClass, Tower},
        },
    },
};

/// Result type used by the evaluator.
///
/// All evaluation functions return either a value of type `T` or a
/// `RuntimeError` describing the failure.
pub type EvalResult<T> = Result<T, RuntimeError>;

/// Default index origin.
pub const DEFAULT_ORIGIN: i64 = 1;
/// Default ceiling on power operator iterations.
pub const DEFAULT_POWER_LIMIT: usize = 1000;
/// Default tolerance for comparisons between floats.
pub const DEFAULT_TOLERANCE: f64 = 1e-14;

/// Interpreter settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// First valid index, usually 0 or 1.
    pub origin:      i64,
    /// Significant digits shown for floats.
    pub precision:   usize,
    /// Iteration ceiling for `⍣` with a function right operand.
    pub power_limit: usize,
    /// Relative tolerance used by float comparisons.
    pub tolerance:   f64,
}

impl Default for Config {
    fn default() -> Self {
        Self { origin:      DEFAULT_ORIGIN,
               precision:   DEFAULT_PRECISION,
               power_limit: DEFAULT_POWER_LIMIT,
               tolerance:   DEFAULT_TOLERANCE, }
    }
}

/// Where displayed values go.
#[derive(Debug, Clone, Default)]
pub enum Output {
    /// Print to standard output.
    #[default]
    Stdout,
    /// Collect lines in a shared buffer.
    Buffer(Arc<Mutex<Vec<String>>>),
    /// Drop everything.
    Discard,
}

impl Output {
    /// Creates a buffered sink and returns a handle to its lines.
    #[must_use]
    pub fn buffer() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (Self::Buffer(Arc::clone(&lines)), lines)
    }

    fn write(&self, text: String) {
        match self {
            Self::Stdout => println!("{text}"),
            Self::Buffer(lines) => lines.lock().unwrap_or_else(PoisonError::into_inner).push(text),
            Self::Discard => {},
        }
    }
}

/// Stores the interpreter state.
///
/// This struct owns everything a line is evaluated against: variable
/// bindings, the primitive and operator registry, the numeric tower,
/// settings and registered packages. Every instance builds its own registry,
/// so several interpreters can coexist with different extensions.
///
/// ## Usage
///
/// An `Interpreter` is created once and reused for every line:
///
/// ```
/// use aplomb::interpreter::{evaluator::core::Interpreter, value::core::Value};
///
/// let mut ip = Interpreter::new();
/// let program = ip.parse("X←2 3⍴⍳6 ⋄ +/X").unwrap();
/// let results = ip.eval_program(&program).unwrap();
/// assert_eq!(results[1].to_string(), "6 15");
/// ```
#[derive(Clone)]
pub struct Interpreter {
    scope_stack: Vec<HashMap<String, Value>>,
    registry:    Arc<Registry>,
    tower:       Arc<Tower>,
    config:      Config,
    packages:    HashMap<String, Arc<HashMap<String, Value>>>,
    output:      Output,
}

#[allow(clippy::new_without_default)]
impl Interpreter {
    /// Creates an interpreter with the default tower, the reference
    /// primitives and the default operators.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Registry::new();
        for handler in primitive::handlers() {
            registry.register_primitive(handler);
        }
        for op in operator::operators() {
            if let Err(error) = registry.register_operator(op) {
                warn!(%error, "skipped default operator");
            }
        }
        registry.alias('^', "∧");

        Self { scope_stack: vec![HashMap::new()],
               registry:    Arc::new(registry),
               tower:       Arc::new(Tower::default()),
               config:      Config::default(),
               packages:    HashMap::new(),
               output:      Output::default(), }
    }

    /// Replaces the output sink.
    #[must_use]
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Scans and parses one logical line.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::evaluator::core::Interpreter;
    ///
    /// let ip = Interpreter::new();
    /// assert!(ip.parse("1 2 3 +.× 4 5 6").is_ok());
    /// assert!(ip.parse("(1 2").is_err());
    /// ```
    pub fn parse(&self, line: &str) -> Result<Program, Error> {
        let tokens = scan(line, self.registry.symbols())?;
        let grammar = Grammar { registry: &self.registry,
                                tower:    &self.tower, };
        Ok(parse_program(&tokens, &grammar)?)
    }

    /// Evaluates a program, displaying the first statement's value unless it
    /// is an assignment.
    ///
    /// A failing statement aborts the rest of the program.
    pub fn eval(&mut self, program: &Program) -> EvalResult<()> {
        for (i, statement) in program.statements.iter().enumerate() {
            let value = self.eval_expr(statement)?;
            if i == 0 && !matches!(statement, Expr::Assign { .. }) {
                self.write_output(&value);
            }
        }
        Ok(())
    }

    /// Evaluates a program and returns every statement's value.
    pub fn eval_program(&mut self, program: &Program) -> EvalResult<Vec<Value>> {
        program.statements.iter().map(|statement| self.eval_expr(statement)).collect()
    }

    /// Parses and evaluates a line, displaying its result.
    pub fn run(&mut self, line: &str) -> Result<(), Error> {
        let program = self.parse(line)?;
        Ok(self.eval(&program)?)
    }

    /// Adds a primitive overload; it is probed before the existing ones.
    pub fn register_primitive(&mut self, handler: Arc<dyn PrimitiveHandler>) {
        Arc::make_mut(&mut self.registry).register_primitive(handler);
    }

    /// Adds an operator registration.
    ///
    /// # Errors
    /// Fails if the symbol was first registered with the other arity.
    pub fn register_operator(&mut self, operator: Arc<dyn Operator>) -> EvalResult<()> {
        Arc::make_mut(&mut self.registry).register_operator(operator)
    }

    /// Swaps in a new numeric tower built from `classes`.
    ///
    /// The current tower stays active if the classes are rejected.
    pub fn set_tower(&mut self, classes: Vec<NumberClass>) -> Result<(), TowerError> {
        let tower = Tower::new(classes)?;
        debug!(classes = tower.classes().len(), "numeric tower replaced");
        self.tower = Arc::new(tower);
        Ok(())
    }

    /// Binds a name, enforcing the naming convention: lowercase names hold
    /// functions and every other name holds data.
    ///
    /// # Errors
    /// Returns `NamingConvention` when the value does not fit the name.
    pub fn assign(&mut self, name: &str, value: Value) -> EvalResult<()> {
        check_convention(name, &value)?;
        self.define_local(name, value);
        Ok(())
    }

    /// Looks a name up, including `package→member` references.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.resolve(name).ok().flatten()
    }

    /// Registers a namespace whose members are reached as `name→member`.
    pub fn register_package(&mut self, name: &str, members: HashMap<String, Value>) {
        debug!(package = name, members = members.len(), "registered package");
        self.packages.insert(name.to_string(), Arc::new(members));
    }

    /// Returns the active numeric tower.
    #[must_use]
    pub fn tower(&self) -> &Tower {
        &self.tower
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn registry_handle(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Returns the settings.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the settings for modification.
    pub const fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Returns an independent copy of the interpreter for a concurrent
    /// stage. Bindings are snapshotted and output is shared.
    #[must_use]
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Displays a value on the output sink.
    pub fn write_output(&self, value: &Value) {
        self.output.write(value.render(self.config.precision));
    }

    /// Pushes a local scope for a lambda body.
    pub fn push_scope(&mut self) {
        self.scope_stack.push(HashMap::new());
    }

    /// Removes the innermost local scope.
    pub fn pop_scope(&mut self) {
        if self.scope_stack.len() > 1 {
            self.scope_stack.pop();
        }
    }

    /// Retrieves a variable, searching from the innermost scope outward.
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.scope_stack.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Defines a variable in the innermost scope.
    pub fn define_local(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scope_stack.last_mut() {
            scope.insert(name.to_string(), value);
        } else {
            self.scope_stack.push(HashMap::from([(name.to_string(), value)]));
        }
    }

    /// Updates the nearest existing binding of `name`, or defines it locally.
    pub fn assign_nearest(&mut self, name: &str, value: Value) {
        for scope in self.scope_stack.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(name) {
                *slot = value;
                return;
            }
        }
        self.define_local(name, value);
    }

    fn resolve(&self, name: &str) -> EvalResult<Option<Value>> {
        if let Some((package, member)) = name.split_once('→') {
            let members =
                self.packages
                    .get(package)
                    .ok_or_else(|| RuntimeError::UnknownPackage { name: package.to_string() })?;
            return Ok(members.get(member).cloned());
        }
        Ok(self.get_variable(name).cloned())
    }

    /// Evaluates an expression and returns the resulting value.
    ///
    /// Right arguments are evaluated before left arguments, and a dyadic
    /// operator's right operand before its left operand.
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Chars(s) => Ok(chars(s)),
            Expr::Identifier(name) => {
                Ok(self.resolve(name)?.unwrap_or_else(|| Value::Identifier(name.clone())))
            },
            Expr::FunctionVariable(name) => match self.resolve(name)? {
                Some(value) => Ok(value),
                None => Err(RuntimeError::UnknownIdentifier { name: name.clone() }),
            },
            Expr::Strand(items) => {
                let values = self.eval_right_to_left(items)?;
                Ok(Value::from(Array::vector(values).unify(&self.tower, true)))
            },
            Expr::List(items) => Ok(Value::List(Arc::new(self.eval_right_to_left(items)?))),
            Expr::Index { target, indices } => {
                let mut slots = Vec::with_capacity(indices.len());
                for index in indices.iter().rev() {
                    slots.push(index.as_ref().map(|e| self.eval_expr(e)).transpose()?);
                }
                slots.reverse();
                let target = self.eval_expr(target)?;
                self.index(&target, &slots)
            },
            Expr::Call { function,
                         left,
                         right, } => {
                let right = self.eval_expr(right)?;
                let function = self.eval_function(function)?;
                let left = left.as_ref().map(|l| self.eval_expr(l)).transpose()?;
                function.call(self, left, right)
            },
            Expr::Assign { target,
                           modifier,
                           value, } => self.eval_assignment(target, modifier.as_deref(), value),
            Expr::Primitive(symbol) => {
                if !self.registry.has_primitive(symbol) {
                    return Err(RuntimeError::UnknownPrimitive { symbol: symbol.clone() });
                }
                Ok(Value::Function(Arc::new(PrimitiveFunction::new(symbol))))
            },
            Expr::Jot => Ok(Value::Function(Arc::new(Jot))),
            Expr::Lambda(lambda) => Ok(Value::Function(Arc::new(LambdaFunction::new(Arc::clone(lambda))))),
            Expr::Derived { operator,
                            left,
                            right, } => {
                let right = right.as_ref().map(|r| self.eval_expr(r)).transpose()?;
                let left = self.eval_expr(left)?;
                let registry = self.registry_handle();
                Ok(Value::Function(registry.derive(self, operator, left, right)?))
            },
            Expr::Atop { outer, inner } => {
                let inner = self.eval_function(inner)?;
                let outer = self.eval_function(outer)?;
                Ok(Value::Function(Arc::new(Atop::new(outer, inner))))
            },
            Expr::Fork { left,
                         middle,
                         right, } => {
                let right = self.eval_function(right)?;
                let middle = self.eval_function(middle)?;
                let left = self.eval_function(left)?;
                Ok(Value::Function(Arc::new(Fork::new(left, middle, right))))
            },
        }
    }

    /// Evaluates an expression in function position.
    pub fn eval_function(&mut self, expr: &Expr) -> EvalResult<Arc<dyn Function>> {
        let value = self.eval_expr(expr)?;
        value.as_function()
             .ok_or_else(|| RuntimeError::NotAFunction { name: expr.to_string() })
    }

    fn eval_right_to_left(&mut self, items: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(items.len());
        for item in items.iter().rev() {
            values.push(self.eval_expr(item)?);
        }
        values.reverse();
        Ok(values)
    }

    /// Applies bracket indexing to an evaluated value.
    fn index(&self, target: &Value, slots: &[Option<Value>]) -> EvalResult<Value> {
        trace!(target = target.type_name(), slots = slots.len(), "indexing");
        match target {
            Value::Dict(dict) => {
                let [Some(key)] = slots else {
                    return Err(RuntimeError::RankError { details: "a dictionary takes one key".to_string() });
                };
                let lookup = |key: &Value| {
                    dict.get(key)
                        .cloned()
                        .ok_or_else(|| RuntimeError::KeyNotFound { key: key.to_string() })
                };
                match key {
                    Value::Array(keys) => {
                        let values = keys.values().iter().map(lookup).collect::<EvalResult<Vec<_>>>()?;
                        Ok(Value::from(Array::new(keys.shape().to_vec(), values)))
                    },
                    key => lookup(key),
                }
            },
            Value::List(items) => {
                let [Some(index)] = slots else {
                    return Err(RuntimeError::RankError { details: "a list takes one index".to_string() });
                };
                let view = Array::vector(items.as_ref().clone());
                let (shape, positions) = select_positions(self, &view, std::slice::from_ref(&Some(index.clone())))?;
                let picked: Vec<Value> = positions.into_iter().map(|p| view.at(p)).collect();
                if shape.is_empty() {
                    return Ok(picked.into_iter().next().unwrap_or_else(|| Value::from(Array::empty())));
                }
                Ok(Value::List(Arc::new(picked)))
            },
            Value::Array(array) => {
                let (shape, positions) = select_positions(self, array, slots)?;
                let values = positions.into_iter().map(|p| array.at(p)).collect();
                Ok(Value::from(Array::new(shape, values).unify(&self.tower, false)))
            },
            other => Err(RuntimeError::domain("[]", None, other)),
        }
    }
}

/// Enforces that lowercase names hold functions and other names hold data.
pub(crate) fn check_convention(name: &str, value: &Value) -> EvalResult<()> {
    let member = name.rsplit('→').next().unwrap_or(name);
    let wants_function = is_function_name(member);
    if wants_function != matches!(value, Value::Function(_)) {
        return Err(RuntimeError::NamingConvention { name:  name.to_string(),
                                                    found: value.type_name().to_string(), });
    }
    Ok(())
}

/// Expands a `'...'` literal: one character is a scalar string, anything
/// else a vector of one-character strings.
fn chars(s: &str) -> Value {
    let mut runes: Vec<Value> = s.chars().map(|c| Value::Str(c.to_string())).collect();
    if runes.len() == 1 {
        return runes.remove(0);
    }
    Value::from(Array::vector(runes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::value::number::Number;

    fn eval(ip: &mut Interpreter, line: &str) -> EvalResult<Value> {
        let program = ip.parse(line).expect("parses");
        let mut values = ip.eval_program(&program)?;
        Ok(values.pop().expect("one statement"))
    }

    #[test]
    fn unbound_data_names_pass_through() {
        let mut ip = Interpreter::new();
        assert_eq!(eval(&mut ip, "UNKNOWN").unwrap(), Value::Identifier("UNKNOWN".into()));
    }

    #[test]
    fn unbound_function_names_fail() {
        let mut ip = Interpreter::new();
        assert!(matches!(eval(&mut ip, "frob 3"),
                         Err(RuntimeError::UnknownIdentifier { name }) if name == "frob"));
    }

    #[test]
    fn naming_convention_is_enforced() {
        let mut ip = Interpreter::new();
        assert!(ip.assign("X", Value::Number(Number::Integer(1))).is_ok());
        assert!(matches!(ip.assign("f", Value::Number(Number::Integer(1))),
                         Err(RuntimeError::NamingConvention { .. })));
        assert!(matches!(eval(&mut ip, "X←+"), Err(RuntimeError::NamingConvention { .. })));
    }

    #[test]
    fn packages_resolve_members() {
        let mut ip = Interpreter::new();
        ip.register_package("math", HashMap::from([("PI".to_string(), Value::Number(Number::Float(3.5)))]));
        assert_eq!(eval(&mut ip, "math→PI").unwrap().to_string(), "3.5");
        assert!(matches!(eval(&mut ip, "nope→PI"), Err(RuntimeError::UnknownPackage { .. })));
    }

    #[test]
    fn only_the_first_statement_is_displayed() {
        let (output, lines) = Output::buffer();
        let mut ip = Interpreter::new().with_output(output);
        ip.run("1+1 ⋄ 2+2").unwrap();
        ip.run("X←5 ⋄ X").unwrap();
        assert_eq!(*lines.lock().unwrap(), vec!["2".to_string()]);
    }

    #[test]
    fn a_failing_statement_stops_the_line() {
        let mut ip = Interpreter::new();
        assert!(ip.run("X←1 ⋄ 1 2+1 2 3 ⋄ X←2").is_err());
        assert_eq!(ip.lookup("X"), Some(Value::Number(Number::Integer(1))));
    }

    #[test]
    fn indexing_arrays_dicts_and_lists() {
        let mut ip = Interpreter::new();
        assert_eq!(eval(&mut ip, "(2 3⍴⍳6)[2;]").unwrap().to_string(), "4 5 6");
        assert_eq!(eval(&mut ip, "(2 3⍴⍳6)[;1 3]").unwrap().to_string(), "1 3\n4 6");
        assert_eq!(eval(&mut ip, "D←\"a\" \"b\"#10 20 ⋄ D[\"b\"]").unwrap().to_string(), "20");
        assert_eq!(eval(&mut ip, "(1;\"x\";3)[2]").unwrap().to_string(), "x");
        assert!(matches!(eval(&mut ip, "(⍳3)[4]"), Err(RuntimeError::IndexOutOfBounds { index: 4, .. })));
    }

    #[test]
    fn a_new_tower_changes_parsing() {
        let mut ip = Interpreter::new();
        ip.set_tower(vec![NumberClass::float(0), NumberClass::complex(1)]).unwrap();
        assert_eq!(eval(&mut ip, "3").unwrap().type_name(), "float");
        assert!(ip.set_tower(vec![NumberClass::integer(0), NumberClass::complex(2)]).is_err());
        assert_eq!(ip.tower().classes().len(), 2);
    }
}
