use tracing::debug;

use crate::ast::Program;
use crate::parser;
use crate::types::{JsObject, JsValue, WellKnownSymbols};

mod builtins;
mod eval;
mod exec;
mod function;
mod gc;
mod helpers;
mod object;
mod operations;
mod realm;
mod types;

pub use object::{ObjectData, ObjectKind, PropertyDescriptor, PropertyKey};
pub use operations::PreferredType;
pub use realm::{ErrorKind, Intrinsics, Realm};
pub use types::{Completion, EnvRef, Environment, JsResult};

/// One entry of the execution context stack.
#[derive(Debug)]
pub(crate) struct ExecutionContext {
    pub(crate) lexical_env: EnvRef,
    pub(crate) variable_env: EnvRef,
    pub(crate) strict: bool,
    /// The function being evaluated; `None` for script code.
    pub(crate) function: Option<JsObject>,
}

/// A tree-walking evaluator bound to one realm.
#[derive(Debug)]
pub struct Interpreter {
    pub(crate) realm: Realm,
    pub(crate) contexts: Vec<ExecutionContext>,
    pub(crate) symbols: WellKnownSymbols,
    pub(crate) call_depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        let mut interp = Self {
            realm: Realm::new(),
            contexts: Vec::new(),
            symbols: WellKnownSymbols::new(),
            call_depth: 0,
        };
        interp.setup_globals();
        interp
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub(crate) fn push_context(&mut self, lexical_env: EnvRef, strict: bool, function: Option<JsObject>) {
        self.contexts.push(ExecutionContext {
            variable_env: lexical_env.clone(),
            lexical_env,
            strict,
            function,
        });
    }

    pub(crate) fn pop_context(&mut self) {
        self.contexts.pop();
    }

    /// The lexical environment of the running execution context, or the
    /// global environment when nothing is running.
    pub fn running_environment(&self) -> EnvRef {
        match self.contexts.last() {
            Some(ctx) => ctx.lexical_env.clone(),
            None => self.realm.global_env.clone(),
        }
    }

    pub fn variable_environment(&self) -> EnvRef {
        match self.contexts.last() {
            Some(ctx) => ctx.variable_env.clone(),
            None => self.realm.global_env.clone(),
        }
    }

    /// The function whose code is running, if any.
    pub fn active_function(&self) -> Option<&JsObject> {
        self.contexts.last().and_then(|ctx| ctx.function.as_ref())
    }

    /// Whether the running execution context is strict mode code.
    pub(crate) fn strict(&self) -> bool {
        self.contexts.last().is_some_and(|ctx| ctx.strict)
    }

    /// Parses and evaluates a script. A syntax error is reported as a
    /// thrown SyntaxError object.
    pub fn eval_source(&mut self, source: &str) -> Completion {
        match parser::parse(source) {
            Ok(program) => program.evaluate(self),
            Err(err) => {
                debug!(%err, "script rejected");
                Completion::Throw(self.syntax_error(&err.message()))
            }
        }
    }

    /// Renders a completion value for the REPL and the command line.
    /// Error objects print as `Name: message`.
    pub fn format_value(&mut self, value: &JsValue) -> String {
        match value {
            JsValue::Object(obj) => {
                let is_error = matches!(obj.borrow().kind, ObjectKind::Error);
                if is_error && let Ok(text) = self.to_string(value) {
                    return text.to_rust_string();
                }
                if obj.is_callable() {
                    return self.function_source_text(obj).unwrap_or_else(|| "function () { [native code] }".to_string());
                }
                "[object Object]".to_string()
            }
            JsValue::String(s) => format!("\"{s}\""),
            JsValue::Symbol(sym) => sym.descriptive_string(),
            JsValue::BigInt(b) => format!("{}n", b.value),
            other => other.to_string(),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// ScriptEvaluation: instantiates the script's declarations in the
    /// global environment, then runs its statements.
    pub fn evaluate(&self, interp: &mut Interpreter) -> Completion {
        let global_env = interp.realm.global_env.clone();
        interp.push_context(global_env.clone(), self.strict, None);
        let result = match interp.global_declaration_instantiation(self) {
            Ok(()) => interp.exec_statements(&self.body, &global_env),
            Err(thrown) => Completion::Throw(thrown),
        };
        interp.pop_context();
        if let Completion::Throw(thrown) = &result {
            debug!(value = %thrown, "uncaught exception");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn parse_errors_become_syntax_errors() {
        let mut interp = Interpreter::new();
        let Completion::Throw(JsValue::Object(err)) = interp.eval_source("var = 1;") else {
            panic!("expected a thrown SyntaxError");
        };
        assert_eq!(err.prototype(), Some(interp.intrinsics().syntax_error_prototype.clone()));
        assert!(matches!(interp.eval_source("-2 ** 2"), Completion::Throw(_)));
    }

    #[test]
    fn state_persists_between_scripts() {
        let mut interp = Interpreter::new();
        assert!(matches!(interp.eval_source("var counter = 1; function bump() { counter++; }"), Completion::Normal(_)));
        interp.eval_source("bump(); bump();");
        assert!(matches!(interp.eval_source("counter"), Completion::Normal(JsValue::Number(n)) if n == 3.0));
        assert!(interp.contexts.is_empty());
        assert!(interp.active_function().is_none());
        assert!(Rc::ptr_eq(&interp.running_environment(), &interp.realm().global_env));
    }

    #[test]
    fn interpreters_are_isolated() {
        let mut a = Interpreter::new();
        let mut b = Interpreter::new();
        a.eval_source("Object.prototype.shared = 1;");
        assert!(matches!(b.eval_source("({}).shared"), Completion::Normal(JsValue::Undefined)));
    }

    #[test]
    fn uncaught_errors_format_with_name() {
        let mut interp = Interpreter::new();
        let Completion::Throw(err) = interp.eval_source("null.x") else {
            panic!("expected a TypeError");
        };
        assert_eq!(interp.format_value(&err), "TypeError: Cannot read properties of null (reading 'x')");
        assert_eq!(interp.format_value(&JsValue::from_str("s")), "\"s\"");
    }

    #[test]
    fn deep_recursion_is_a_range_error() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let mut interp = Interpreter::new();
                match interp.eval_source("function f() { return f(); } try { f(); } catch (e) { e.name }") {
                    Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
                    other => format!("{other:?}"),
                }
            })
            .unwrap();
        assert_eq!(handle.join().unwrap(), "RangeError");
    }
}
