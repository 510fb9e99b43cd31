//! Statement execution and declaration instantiation.

use std::rc::Rc;

use tracing::info;

use super::Interpreter;
use super::eval::value_of;
use super::function::FunctionName;
use super::helpers::{strict_equality, to_boolean};
use super::object::{PropertyDescriptor, PropertyKey};
use super::types::{BindingKind, Completion, EnvRef, Environment, JsResult};
use crate::ast::*;
use crate::types::{JsObject, JsValue};

/// Result of executing a statement. `Ok(None)` is a normal completion with
/// an empty value; every abrupt completion travels on the `Err` side.
type StmtResult = Result<Option<JsValue>, Completion>;

fn binding_kind(kind: VarKind) -> BindingKind {
    match kind {
        VarKind::Var => BindingKind::Var,
        VarKind::Let => BindingKind::Let,
        VarKind::Const => BindingKind::Const,
    }
}

fn strip_labels(stmt: &Statement) -> &Statement {
    match stmt {
        Statement::Labeled(_, body) => strip_labels(body),
        other => other,
    }
}

/// Function declarations directly in a function or script body, which are
/// var-scoped and hoisted with their values.
pub(crate) fn top_level_functions(body: &[Statement]) -> Vec<&Rc<FunctionDef>> {
    body.iter()
        .filter_map(|stmt| match strip_labels(stmt) {
            Statement::Declaration(Declaration::Function(def)) => Some(def),
            _ => None,
        })
        .collect()
}

/// `let`, `const` and `class` bindings directly in a function or script body.
pub(crate) fn top_level_lexical_bindings(body: &[Statement]) -> Vec<(&str, BindingKind)> {
    let mut bindings = Vec::new();
    for stmt in body {
        match stmt {
            Statement::Declaration(Declaration::Lexical(decl)) => {
                let kind = binding_kind(decl.kind);
                bindings.extend(decl.declarations.iter().map(|d| (d.name.as_str(), kind)));
            }
            Statement::Declaration(Declaration::Class(class)) => {
                if let Some(name) = class.name.as_deref() {
                    bindings.push((name, BindingKind::Let));
                }
            }
            _ => {}
        }
    }
    bindings
}

/// LoopContinues.
fn loop_continues(completion: &Completion, labels: &[String]) -> bool {
    match completion {
        Completion::Normal(_) | Completion::Continue(None, _) => true,
        Completion::Continue(Some(label), _) => labels.contains(label),
        _ => false,
    }
}

impl Interpreter {
    /// Runs a statement list whose declarations are already instantiated in
    /// `env`. The value is that of the last statement producing one.
    pub(crate) fn exec_statements(&mut self, body: &[Statement], env: &EnvRef) -> Completion {
        match self.exec_list(body, env) {
            Ok(value) => Completion::Normal(value.unwrap_or(JsValue::Undefined)),
            Err(abrupt) => abrupt,
        }
    }

    fn exec_list(&mut self, body: &[Statement], env: &EnvRef) -> StmtResult {
        let mut last = None;
        for stmt in body {
            match self.exec_statement(stmt, env, &[]) {
                Ok(Some(value)) => last = Some(value),
                Ok(None) => {}
                Err(abrupt) => {
                    return Err(match &last {
                        Some(value) => abrupt.update_empty(value),
                        None => abrupt,
                    });
                }
            }
        }
        Ok(last)
    }

    /// Evaluates one statement. `labels` is the label set of the enclosing
    /// labelled statements, consulted by loops for `continue label`.
    fn exec_statement(&mut self, stmt: &Statement, env: &EnvRef, labels: &[String]) -> StmtResult {
        match stmt {
            Statement::Empty => Ok(None),
            Statement::Expression(expr) => Ok(Some(value_of(self.eval_expr(expr, env))?)),
            Statement::Block(body) => self.exec_block(body, env),
            Statement::Variable(decl) => {
                self.exec_var_declaration(decl, env)?;
                Ok(None)
            }
            Statement::Declaration(decl) => {
                self.exec_declaration(decl, env)?;
                Ok(None)
            }
            Statement::If(stmt) => {
                let test = value_of(self.eval_expr(&stmt.test, env))?;
                let result = if to_boolean(&test) {
                    self.exec_statement(&stmt.consequent, env, &[])
                } else if let Some(alternate) = &stmt.alternate {
                    self.exec_statement(alternate, env, &[])
                } else {
                    Ok(None)
                };
                result
                    .map(|value| Some(value.unwrap_or(JsValue::Undefined)))
                    .map_err(|abrupt| abrupt.update_empty(&JsValue::Undefined))
            }
            Statement::While(stmt) => self.exec_while(stmt, env, labels),
            Statement::DoWhile(stmt) => self.exec_do_while(stmt, env, labels),
            Statement::For(stmt) => self.exec_for(stmt, env, labels),
            Statement::Return(argument) => {
                let value = match argument {
                    Some(expr) => value_of(self.eval_expr(expr, env))?,
                    None => JsValue::Undefined,
                };
                Err(Completion::Return(value))
            }
            Statement::Break(label) => Err(Completion::Break(label.clone(), None)),
            Statement::Continue(label) => Err(Completion::Continue(label.clone(), None)),
            Statement::Throw(expr) => {
                let value = value_of(self.eval_expr(expr, env))?;
                Err(Completion::Throw(value))
            }
            Statement::Try(stmt) => self.exec_try(stmt, env),
            Statement::Switch(stmt) => self.exec_switch(stmt, env),
            Statement::Labeled(label, body) => {
                let mut label_set = labels.to_vec();
                label_set.push(label.clone());
                let inner_labels: &[String] = match body.as_ref() {
                    Statement::While(_) | Statement::DoWhile(_) | Statement::For(_) | Statement::Labeled(..) => {
                        &label_set
                    }
                    _ => &[],
                };
                match self.exec_statement(body, env, inner_labels) {
                    Err(Completion::Break(Some(target), value)) if target == *label => Ok(value),
                    other => other,
                }
            }
            Statement::Debugger => {
                info!("debugger statement");
                Ok(None)
            }
        }
    }

    fn exec_block(&mut self, body: &[Statement], env: &EnvRef) -> StmtResult {
        let block_env = self.block_environment(body, env);
        self.exec_list(body, &block_env)
    }

    /// BlockDeclarationInstantiation. Returns `env` itself when the block
    /// declares nothing.
    fn block_environment(&mut self, body: &[Statement], env: &EnvRef) -> EnvRef {
        if !body.iter().any(|stmt| matches!(strip_labels(stmt), Statement::Declaration(_))) {
            return env.clone();
        }
        let block_env = Environment::new(Some(env.clone()));
        self.declare_block_bindings(body, &block_env);
        block_env
    }

    fn declare_block_bindings(&mut self, body: &[Statement], block_env: &EnvRef) {
        for (name, kind) in top_level_lexical_bindings(body) {
            block_env.borrow_mut().declare(name, kind);
        }
        for def in top_level_functions(body) {
            let name = def.name.as_deref().unwrap_or("");
            let func = self.instantiate_function(def, block_env, name);
            let mut scope = block_env.borrow_mut();
            if !scope.has_binding(name) {
                scope.declare(name, BindingKind::Let);
            }
            scope.initialize(name, JsValue::Object(func));
        }
    }

    fn exec_var_declaration(&mut self, decl: &VariableDeclaration, env: &EnvRef) -> Result<(), Completion> {
        for declarator in &decl.declarations {
            let Some(init) = &declarator.init else {
                continue;
            };
            let reference = self.resolve_binding(&declarator.name, env);
            let value = value_of(self.eval_named(init, env, FunctionName::Str(&declarator.name)))?;
            self.put_value(&reference, value).map_err(Completion::Throw)?;
        }
        Ok(())
    }

    /// Initializes `let`/`const` bindings created when the enclosing scope
    /// was instantiated.
    fn exec_lexical_declaration(&mut self, decl: &VariableDeclaration, env: &EnvRef) -> Result<(), Completion> {
        for declarator in &decl.declarations {
            let value = match &declarator.init {
                Some(init) => value_of(self.eval_named(init, env, FunctionName::Str(&declarator.name)))?,
                None => JsValue::Undefined,
            };
            env.borrow_mut().initialize(&declarator.name, value);
        }
        Ok(())
    }

    fn exec_declaration(&mut self, decl: &Declaration, env: &EnvRef) -> Result<(), Completion> {
        match decl {
            Declaration::Lexical(decl) => self.exec_lexical_declaration(decl, env)?,
            Declaration::Class(class) => {
                let name = class.name.as_deref().unwrap_or("");
                let constructor = self.evaluate_class(class, env, name).map_err(Completion::Throw)?;
                env.borrow_mut().initialize(name, JsValue::Object(constructor));
            }
            Declaration::Function(_) => {}
        }
        Ok(())
    }

    /// Finishes one loop iteration: `Some` ends the loop with that result.
    fn loop_body_result(result: StmtResult, labels: &[String], value: &mut JsValue) -> Option<StmtResult> {
        match result {
            Ok(Some(v)) => {
                *value = v;
                None
            }
            Ok(None) => None,
            Err(abrupt) if loop_continues(&abrupt, labels) => {
                if let Completion::Continue(_, Some(v)) = abrupt {
                    *value = v;
                }
                None
            }
            Err(Completion::Break(None, v)) => Some(Ok(Some(v.unwrap_or_else(|| value.clone())))),
            Err(abrupt) => Some(Err(abrupt.update_empty(value))),
        }
    }

    fn exec_while(&mut self, stmt: &WhileStatement, env: &EnvRef, labels: &[String]) -> StmtResult {
        let mut value = JsValue::Undefined;
        loop {
            let test = value_of(self.eval_expr(&stmt.test, env))?;
            if !to_boolean(&test) {
                return Ok(Some(value));
            }
            let result = self.exec_statement(&stmt.body, env, &[]);
            if let Some(done) = Self::loop_body_result(result, labels, &mut value) {
                return done;
            }
        }
    }

    fn exec_do_while(&mut self, stmt: &DoWhileStatement, env: &EnvRef, labels: &[String]) -> StmtResult {
        let mut value = JsValue::Undefined;
        loop {
            let result = self.exec_statement(&stmt.body, env, &[]);
            if let Some(done) = Self::loop_body_result(result, labels, &mut value) {
                return done;
            }
            let test = value_of(self.eval_expr(&stmt.test, env))?;
            if !to_boolean(&test) {
                return Ok(Some(value));
            }
        }
    }

    /// ForLoopEvaluation. A `let` head gets a fresh copy of its bindings
    /// for every iteration, so closures capture the value of their own
    /// iteration.
    fn exec_for(&mut self, stmt: &ForStatement, env: &EnvRef, labels: &[String]) -> StmtResult {
        let mut loop_env = env.clone();
        let mut per_iteration = false;
        match &stmt.init {
            Some(ForInit::Variable(decl)) if decl.kind != VarKind::Var => {
                loop_env = Environment::new(Some(env.clone()));
                for declarator in &decl.declarations {
                    loop_env.borrow_mut().declare(&declarator.name, binding_kind(decl.kind));
                }
                self.exec_lexical_declaration(decl, &loop_env)?;
                per_iteration = decl.kind == VarKind::Let;
            }
            Some(ForInit::Variable(decl)) => self.exec_var_declaration(decl, env)?,
            Some(ForInit::Expression(expr)) => {
                value_of(self.eval_expr(expr, env))?;
            }
            None => {}
        }

        if per_iteration {
            let next = loop_env.borrow().copy();
            loop_env = next;
        }
        let mut value = JsValue::Undefined;
        loop {
            if let Some(test) = &stmt.test {
                let test = value_of(self.eval_expr(test, &loop_env))?;
                if !to_boolean(&test) {
                    return Ok(Some(value));
                }
            }
            let result = self.exec_statement(&stmt.body, &loop_env, &[]);
            if let Some(done) = Self::loop_body_result(result, labels, &mut value) {
                return done;
            }
            if per_iteration {
                let next = loop_env.borrow().copy();
                loop_env = next;
            }
            if let Some(update) = &stmt.update {
                value_of(self.eval_expr(update, &loop_env))?;
            }
        }
    }

    /// An abrupt `finally` replaces the completion of the protected block
    /// and handler.
    fn exec_try(&mut self, stmt: &TryStatement, env: &EnvRef) -> StmtResult {
        let result = match (self.exec_block(&stmt.block, env), &stmt.handler) {
            (Err(Completion::Throw(thrown)), Some(handler)) => {
                let catch_env = Environment::new(Some(env.clone()));
                if let Some(param) = &handler.param {
                    let mut scope = catch_env.borrow_mut();
                    scope.declare(param, BindingKind::Let);
                    scope.initialize(param, thrown);
                }
                self.exec_block(&handler.body, &catch_env)
            }
            (result, _) => result,
        };
        if let Some(finalizer) = &stmt.finalizer
            && let Err(abrupt) = self.exec_block(finalizer, env)
        {
            return Err(abrupt.update_empty(&JsValue::Undefined));
        }
        result
            .map(|value| Some(value.unwrap_or(JsValue::Undefined)))
            .map_err(|abrupt| abrupt.update_empty(&JsValue::Undefined))
    }

    /// CaseBlockEvaluation. Clause tests run in source order; without a
    /// match, execution starts at `default` and falls through.
    fn exec_switch(&mut self, stmt: &SwitchStatement, env: &EnvRef) -> StmtResult {
        let discriminant = value_of(self.eval_expr(&stmt.discriminant, env))?;
        let block_env = Environment::new(Some(env.clone()));
        for case in &stmt.cases {
            self.declare_block_bindings(&case.consequent, &block_env);
        }

        let mut start = None;
        for (index, case) in stmt.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let candidate = value_of(self.eval_expr(test, &block_env))?;
                if strict_equality(&discriminant, &candidate) {
                    start = Some(index);
                    break;
                }
            }
        }
        let start = start.or_else(|| stmt.cases.iter().position(|case| case.test.is_none()));

        let mut value = JsValue::Undefined;
        let Some(start) = start else {
            return Ok(Some(value));
        };
        for case in &stmt.cases[start..] {
            match self.exec_list(&case.consequent, &block_env) {
                Ok(Some(v)) => value = v,
                Ok(None) => {}
                Err(abrupt) => {
                    return match abrupt.update_empty(&value) {
                        Completion::Break(None, v) => Ok(Some(v.unwrap_or(value))),
                        other => Err(other),
                    };
                }
            }
        }
        Ok(Some(value))
    }

    /// GlobalDeclarationInstantiation. Lexical bindings go in the global
    /// environment's declarative part; `var` and function names become
    /// non-configurable properties of the global object.
    pub(crate) fn global_declaration_instantiation(&mut self, program: &Program) -> JsResult<()> {
        let env = self.realm.global_env.clone();
        let global = self.global_object();
        let lexical = top_level_lexical_bindings(&program.body);
        let functions = top_level_functions(&program.body);

        for (name, _) in &lexical {
            let key = PropertyKey::from(*name);
            let restricted = global.get_own_property(&key).is_some_and(|desc| !desc.is_configurable());
            if env.borrow().has_binding(name) || restricted {
                return Err(self.syntax_error(&format!("Identifier '{name}' has already been declared")));
            }
        }
        let var_scoped = program
            .var_names
            .iter()
            .map(String::as_str)
            .chain(functions.iter().filter_map(|def| def.name.as_deref()));
        for name in var_scoped {
            if env.borrow().has_binding(name) {
                return Err(self.syntax_error(&format!("Identifier '{name}' has already been declared")));
            }
        }

        // The last declaration of a name wins.
        let mut declared: Vec<&Rc<FunctionDef>> = Vec::new();
        for def in functions.iter().rev() {
            let name = def.name.as_deref().unwrap_or("");
            if declared.iter().any(|d| d.name.as_deref() == Some(name)) {
                continue;
            }
            if !self.can_declare_global_function(&global, name) {
                return Err(self.type_error(&format!("Cannot redefine global function '{name}'")));
            }
            declared.push(def);
        }
        for name in &program.var_names {
            let key = PropertyKey::from(name.as_str());
            if !global.borrow().has_own_property(&key) && !global.borrow().extensible {
                return Err(self.type_error(&format!("Cannot define global variable '{name}'")));
            }
        }

        for (name, kind) in &lexical {
            env.borrow_mut().declare(name, *kind);
        }
        for def in declared.into_iter().rev() {
            let name = def.name.as_deref().unwrap_or("");
            let func = self.instantiate_function(def, &env, name);
            self.create_global_function_binding(&global, name, JsValue::Object(func))?;
        }
        for name in &program.var_names {
            let key = PropertyKey::from(name.as_str());
            if !global.borrow().has_own_property(&key) && global.borrow().extensible {
                self.define_property_or_throw(&global, key, PropertyDescriptor::data(JsValue::Undefined, true, true, false))?;
            }
        }
        Ok(())
    }

    fn can_declare_global_function(&self, global: &JsObject, name: &str) -> bool {
        match global.get_own_property(&PropertyKey::from(name)) {
            None => global.borrow().extensible,
            Some(desc) if desc.is_configurable() => true,
            Some(desc) => desc.is_data_descriptor() && desc.is_writable() && desc.is_enumerable(),
        }
    }

    fn create_global_function_binding(&mut self, global: &JsObject, name: &str, value: JsValue) -> JsResult<()> {
        let key = PropertyKey::from(name);
        let replaceable = global.get_own_property(&key).is_none_or(|desc| desc.is_configurable());
        let desc = if replaceable {
            PropertyDescriptor::data(value.clone(), true, true, false)
        } else {
            PropertyDescriptor {
                value: Some(value.clone()),
                ..Default::default()
            }
        };
        self.define_property_or_throw(global, key.clone(), desc)?;
        self.set(global, key, value, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;

    fn eval(source: &str) -> Completion {
        Interpreter::new().eval_source(source)
    }

    fn number(source: &str) -> f64 {
        match eval(source) {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("{source}: expected a number, got {other:?}"),
        }
    }

    fn string(source: &str) -> String {
        match eval(source) {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            other => panic!("{source}: expected a string, got {other:?}"),
        }
    }

    fn thrown_name(source: &str) -> String {
        let mut interp = Interpreter::new();
        match interp.eval_source(source) {
            Completion::Throw(JsValue::Object(obj)) => interp.get(&obj, &"name".into()).unwrap().to_string(),
            other => panic!("{source}: expected a thrown error, got {other:?}"),
        }
    }

    #[test]
    fn throw_stops_a_block() {
        assert!(matches!(eval("{ throw 1; 2; }"), Completion::Throw(JsValue::Number(n)) if n == 1.0));
    }

    #[test]
    fn completion_value_skips_empty_statements() {
        assert_eq!(number("1; var x = 2;"), 1.0);
        assert_eq!(number("3; {}"), 3.0);
        assert_eq!(number("4; ;"), 4.0);
        assert!(matches!(eval("5; if (false) 6;"), Completion::Normal(JsValue::Undefined)));
        assert!(matches!(eval(""), Completion::Normal(JsValue::Undefined)));
    }

    #[test]
    fn loops() {
        assert_eq!(number("var s = 0; for (var i = 0; i < 5; i++) s += i; s"), 10.0);
        assert_eq!(number("var n = 0; while (n < 3) n++; n"), 3.0);
        assert_eq!(number("var n = 10; do n++; while (false); n"), 11.0);
        assert_eq!(number("var s = 0; for (var i = 0; i < 10; i++) { if (i % 2) continue; if (i > 6) break; s += i; } s"), 12.0);
        assert_eq!(number("var i = 0; for (;;) { if (++i == 4) break; } i"), 4.0);
    }

    #[test]
    fn labelled_break_and_continue() {
        let source = "
            var hits = 0;
            outer: for (var i = 0; i < 3; i++) {
                for (var j = 0; j < 3; j++) {
                    if (j == 1) continue outer;
                    if (i == 2) break outer;
                    hits++;
                }
            }
            hits";
        assert_eq!(number(source), 2.0);
        assert_eq!(number("var r = 1; block: { r = 2; break block; r = 3; } r"), 2.0);
    }

    #[test]
    fn jumps_carry_the_value_completed_before_them() {
        assert_eq!(number("do { 1; break; } while (0)"), 1.0);
        assert_eq!(number("L: { 3; break L; }"), 3.0);
        assert_eq!(string("switch (1) { case 1: 'x'; break; }"), "x");
        assert_eq!(number("for (var i = 0; i < 2; i++) { i; continue; }"), 1.0);
        assert_eq!(number("7; L: break L;"), 7.0);
        assert!(matches!(eval("2; while (true) { if (true) break; }"), Completion::Normal(JsValue::Undefined)));
    }

    #[test]
    fn let_bindings_are_per_iteration() {
        let source = "
            var fs0, fs1;
            for (let i = 0; i < 2; i++) { if (i == 0) fs0 = function() { return i; }; else fs1 = function() { return i; }; }
            fs0() * 10 + fs1()";
        assert_eq!(number(source), 1.0);
        assert_eq!(thrown_name("for (const i = 0; i < 2; i++) {}"), "TypeError");
    }

    #[test]
    fn block_scoping_and_tdz() {
        assert_eq!(number("let x = 1; { let x = 2; } x"), 1.0);
        assert_eq!(thrown_name("{ x; let x = 1; }"), "ReferenceError");
        assert_eq!(thrown_name("{ new C(); class C {} }"), "ReferenceError");
        assert_eq!(number("{ function f() { return 7; } } 0 + (typeof f == 'undefined' ? 1 : 2)"), 1.0);
        assert_eq!(number("{ g(); function g() { } } 5"), 5.0);
    }

    #[test]
    fn hoisting() {
        assert_eq!(number("f(); function f() { return 1; } f()"), 1.0);
        assert!(matches!(eval("v; var v = 1;"), Completion::Normal(JsValue::Undefined)));
        assert_eq!(number("function f() { return 1; } function f() { return 2; } f()"), 2.0);
    }

    #[test]
    fn global_redeclaration_is_rejected() {
        let mut interp = Interpreter::new();
        assert!(matches!(interp.eval_source("let a = 1;"), Completion::Normal(_)));
        let Completion::Throw(JsValue::Object(err)) = interp.eval_source("var a;") else {
            panic!("expected a SyntaxError");
        };
        assert_eq!(interp.get(&err, &"name".into()).unwrap().to_string(), "SyntaxError");
        assert!(matches!(interp.eval_source("a"), Completion::Normal(JsValue::Number(n)) if n == 1.0));
        assert_eq!(thrown_name("let undefined;"), "SyntaxError");
    }

    #[test]
    fn global_var_properties_are_not_configurable() {
        assert_eq!(string("var gv = 1; var desc = Object.getOwnPropertyDescriptor(globalThis, 'gv'); '' + desc.configurable"), "false");
        assert_eq!(string("function gf() {} '' + Object.getOwnPropertyDescriptor(globalThis, 'gf').enumerable"), "true");
    }

    #[test]
    fn switch_statement() {
        let source = "
            function pick(x) {
                var out = '';
                switch (x) {
                    case 1: out += 'one';
                    case 2: out += 'two'; break;
                    default: out += 'default';
                    case 3: out += 'three';
                }
                return out;
            }
            pick(1) + ',' + pick(2) + ',' + pick(3) + ',' + pick(9)";
        assert_eq!(string(source), "onetwo,two,three,defaultthree");
        assert!(matches!(eval("switch (1) { case '1': 2; }"), Completion::Normal(JsValue::Undefined)));
    }

    #[test]
    fn try_catch_finally() {
        assert_eq!(number("var r; try { throw 5; } catch (e) { r = e; } r"), 5.0);
        assert_eq!(number("try { throw 1; } catch { 2; }"), 2.0);
        assert_eq!(number("function f() { try { return 1; } finally { return 2; } } f()"), 2.0);
        assert_eq!(number("function f() { try { return 1; } finally { 3; } } f()"), 1.0);
        assert_eq!(number("var log = 0; try { try { throw 1; } finally { log = 1; } } catch (e) { log += e; } log"), 2.0);
        assert_eq!(string("try { null.x; } catch (e) { e.name }"), "TypeError");
        assert!(matches!(eval("try { throw 1; } catch (e) { throw e + 1; }"), Completion::Throw(JsValue::Number(n)) if n == 2.0));
    }

    #[test]
    fn return_outside_loops_propagates() {
        assert_eq!(number("function f() { for (;;) { while (true) { return 9; } } } f()"), 9.0);
    }
}
