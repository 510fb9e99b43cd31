//! Function objects: creation, [[Call]], [[Construct]], declaration
//! instantiation and class definition evaluation.

use std::rc::Rc;

use tracing::trace;

use super::Interpreter;
use super::exec::{top_level_functions, top_level_lexical_bindings};
use super::object::{
    ConstructorKind, FunctionCode, FunctionData, ObjectData, ObjectKind, OrdinaryFunction, PrivateElement,
    PrivateName, PropertyDescriptor, PropertyKey,
};
use super::types::{
    BindingKind, Completion, EnvRef, Environment, FunctionScope, JsResult, ThisState, function_environment,
};
use crate::ast::{ClassDef, ClassKey, ClassMethodKind, FunctionDef};
use crate::types::{JsObject, JsString, JsValue};

const MAX_CALL_DEPTH: usize = 400;

/// The `name` a function gets from the key it is defined under.
pub(crate) enum FunctionName<'a> {
    Key(&'a PropertyKey),
    Private(&'a PrivateName),
    Str(&'a str),
}

impl FunctionName<'_> {
    pub(crate) fn to_js_string(&self) -> JsString {
        match self {
            FunctionName::Key(PropertyKey::String(s)) => s.clone(),
            FunctionName::Key(PropertyKey::Symbol(sym)) => match sym.description() {
                Some(desc) => JsString::from_str(&format!("[{desc}]")),
                None => JsString::default(),
            },
            FunctionName::Private(name) => JsString::from_str(&format!("#{}", name.description())),
            FunctionName::Str(s) => JsString::from_str(s),
        }
    }
}

/// Adds one private method or accessor half to a list, merging a getter
/// and setter declared under the same name.
fn add_private_element(list: &mut Vec<(PrivateName, PrivateElement)>, name: PrivateName, element: PrivateElement) {
    if let Some((_, existing)) = list.iter_mut().find(|(n, _)| *n == name)
        && let (
            PrivateElement::Accessor { get, set },
            PrivateElement::Accessor {
                get: new_get,
                set: new_set,
            },
        ) = (&mut *existing, &element)
    {
        if new_get.is_some() {
            get.clone_from(new_get);
        }
        if new_set.is_some() {
            set.clone_from(new_set);
        }
        return;
    }
    list.push((name, element));
}

impl Interpreter {
    /// OrdinaryFunctionCreate: a script function closing over `env`, with
    /// its `length` defined. The name is set separately.
    pub(crate) fn create_function_object(
        &mut self,
        def: &Rc<FunctionDef>,
        env: &EnvRef,
        home_object: Option<JsObject>,
        constructor: Option<ConstructorKind>,
    ) -> JsObject {
        let proto = self.intrinsics().function_prototype.clone();
        let func = OrdinaryFunction {
            code: FunctionCode::Script(def.clone()),
            environment: env.clone(),
            strict: def.strict,
            home_object,
            constructor,
            class: None,
            private_methods: Vec::new(),
        };
        let obj = self.alloc(ObjectData::new(
            Some(proto),
            ObjectKind::Function(FunctionData::Ordinary(Box::new(func))),
        ));
        obj.define_own_property(
            "length".into(),
            PropertyDescriptor::data(JsValue::Number(def.params.len() as f64), false, false, true),
        );
        obj
    }

    /// SetFunctionName, with an optional `get`/`set` prefix.
    pub(crate) fn set_function_name(&mut self, func: &JsObject, name: FunctionName<'_>, prefix: Option<&str>) {
        let mut name = name.to_js_string();
        if let Some(prefix) = prefix {
            name = JsString::from_str(&format!("{prefix} ")).concat(&name);
        }
        func.define_own_property(
            "name".into(),
            PropertyDescriptor::data(JsValue::String(name), false, false, true),
        );
    }

    /// MakeConstructor: gives `func` a fresh `prototype` object whose
    /// `constructor` points back at it.
    pub(crate) fn make_constructor(&mut self, func: &JsObject) {
        let proto = self.new_object();
        proto.define_builtin("constructor", JsValue::Object(func.clone()));
        func.define_own_property(
            "prototype".into(),
            PropertyDescriptor::data(JsValue::Object(proto), true, false, false),
        );
    }

    /// InstantiateOrdinaryFunctionObject for a `function` declaration or
    /// anonymous expression.
    pub(crate) fn instantiate_function(&mut self, def: &Rc<FunctionDef>, env: &EnvRef, name: &str) -> JsObject {
        let func = self.create_function_object(def, env, None, Some(ConstructorKind::Base));
        self.set_function_name(&func, FunctionName::Str(name), None);
        self.make_constructor(&func);
        func
    }

    /// A named function expression sees its own name through a binding
    /// that sloppy code cannot overwrite.
    pub(crate) fn instantiate_function_expression(&mut self, def: &Rc<FunctionDef>, env: &EnvRef, name: &str) -> JsObject {
        let Some(own_name) = def.name.as_deref() else {
            return self.instantiate_function(def, env, name);
        };
        let func_env = Environment::new(Some(env.clone()));
        func_env.borrow_mut().declare(own_name, BindingKind::FunctionName);
        let func = self.instantiate_function(def, &func_env, own_name);
        func_env.borrow_mut().initialize(own_name, JsValue::Object(func.clone()));
        func
    }

    /// A method of an object literal or class body.
    pub(crate) fn define_method(&mut self, def: &Rc<FunctionDef>, env: &EnvRef, home_object: &JsObject) -> JsObject {
        self.create_function_object(def, env, Some(home_object.clone()), None)
    }

    fn enter_call(&mut self) -> JsResult<()> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(self.range_error("Maximum call stack size exceeded"));
        }
        self.call_depth += 1;
        Ok(())
    }

    fn exit_call(&mut self) {
        self.call_depth -= 1;
    }

    /// Call(F, V, args): TypeError unless `f` is callable.
    pub fn call(&mut self, f: &JsValue, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        match f {
            JsValue::Object(obj) if obj.is_callable() => self.call_object(obj, this, args),
            other => Err(self.type_error(&format!("{} is not a function", describe_value(other)))),
        }
    }

    /// [[Call]] of a function object.
    pub(crate) fn call_object(&mut self, f: &JsObject, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let native = match f.borrow().function() {
            Some(FunctionData::Native(native)) => Some(native.function),
            Some(FunctionData::Ordinary(_)) => None,
            None => return Err(self.type_error("object is not a function")),
        };
        self.enter_call()?;
        let result = match native {
            Some(function) => function(self, this, args, None),
            None => self.call_ordinary(f, this, args),
        };
        self.exit_call();
        result
    }

    fn call_ordinary(&mut self, f: &JsObject, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let (code, environment, strict, is_class) = {
            let data = f.borrow();
            let Some(func) = data.ordinary_function() else {
                return Ok(JsValue::Undefined);
            };
            (func.code.clone(), func.environment.clone(), func.strict, func.class.is_some())
        };
        if is_class {
            let name = self.get(f, &"name".into())?;
            return Err(self.type_error(&format!("Class constructor {name} cannot be invoked without 'new'")));
        }
        let FunctionCode::Script(def) = code else {
            return Ok(JsValue::Undefined);
        };
        trace!(function = def.name.as_deref().unwrap_or(""), args = args.len(), "call");

        // OrdinaryCallBindThis
        let this_value = if strict {
            this.clone()
        } else if this.is_nullish() {
            JsValue::Object(self.global_object())
        } else {
            JsValue::Object(self.to_object(this)?)
        };
        let func_env = Environment::new_function(
            environment,
            FunctionScope {
                this: ThisState::Initialized(this_value),
                function: f.clone(),
                new_target: None,
            },
        );
        match self.evaluate_function_body(f, &def, &func_env, args) {
            Completion::Return(value) => Ok(value),
            Completion::Throw(thrown) => Err(thrown),
            _ => Ok(JsValue::Undefined),
        }
    }

    /// Runs a script function body in a fresh execution context.
    fn evaluate_function_body(&mut self, f: &JsObject, def: &Rc<FunctionDef>, func_env: &EnvRef, args: &[JsValue]) -> Completion {
        self.push_context(func_env.clone(), def.strict, Some(f.clone()));
        let result = match self.function_declaration_instantiation(f, def, func_env, args) {
            Ok(lex_env) => self.exec_statements(&def.body, &lex_env),
            Err(thrown) => Completion::Throw(thrown),
        };
        self.pop_context();
        result
    }

    /// FunctionDeclarationInstantiation. Parameters, `var`s and hoisted
    /// functions share `func_env`; the returned child environment holds the
    /// body's lexical declarations.
    fn function_declaration_instantiation(
        &mut self,
        f: &JsObject,
        def: &Rc<FunctionDef>,
        func_env: &EnvRef,
        args: &[JsValue],
    ) -> JsResult<EnvRef> {
        let functions = top_level_functions(&def.body);
        let lexical = top_level_lexical_bindings(&def.body);
        {
            let mut env = func_env.borrow_mut();
            for (i, param) in def.params.iter().enumerate() {
                if !env.has_binding(param) {
                    env.declare(param, BindingKind::Var);
                }
                env.initialize(param, args.get(i).cloned().unwrap_or(JsValue::Undefined));
            }
        }

        let arguments_needed = !def.params.iter().any(|p| p == "arguments")
            && !functions.iter().any(|d| d.name.as_deref() == Some("arguments"))
            && !lexical.iter().any(|(name, _)| *name == "arguments");
        if arguments_needed {
            let arguments = self.create_arguments_object(f, args, def.strict);
            let kind = if def.strict { BindingKind::Const } else { BindingKind::Var };
            let mut env = func_env.borrow_mut();
            env.declare("arguments", kind);
            env.initialize("arguments", JsValue::Object(arguments));
        }

        {
            let mut env = func_env.borrow_mut();
            for name in &def.var_names {
                if !env.has_binding(name) {
                    env.declare(name, BindingKind::Var);
                }
            }
        }

        let lex_env = Environment::new(Some(func_env.clone()));
        {
            let mut env = lex_env.borrow_mut();
            for (name, kind) in &lexical {
                env.declare(name, *kind);
            }
        }

        for decl in functions {
            let name = decl.name.as_deref().unwrap_or("default");
            let func = self.instantiate_function(decl, &lex_env, name);
            let mut env = func_env.borrow_mut();
            if !env.has_binding(name) {
                env.declare(name, BindingKind::Var);
            }
            env.initialize(name, JsValue::Object(func));
        }
        Ok(lex_env)
    }

    /// CreateUnmappedArgumentsObject. Sloppy functions also get a
    /// writable `callee`.
    fn create_arguments_object(&mut self, f: &JsObject, args: &[JsValue], strict: bool) -> JsObject {
        let proto = self.intrinsics().object_prototype.clone();
        let obj = self.alloc(ObjectData::new(Some(proto), ObjectKind::Arguments));
        obj.define_builtin("length", JsValue::Number(args.len() as f64));
        for (i, arg) in args.iter().enumerate() {
            self.create_data_property(&obj, PropertyKey::from(i.to_string().as_str()), arg.clone());
        }
        if strict {
            let thrower = JsValue::Object(self.intrinsics().throw_type_error.clone());
            obj.define_own_property(
                "callee".into(),
                PropertyDescriptor::accessor(thrower.clone(), thrower, false, false),
            );
        } else {
            obj.define_builtin("callee", JsValue::Object(f.clone()));
        }
        obj
    }

    /// Construct(F, args, newTarget).
    pub fn construct(&mut self, f: &JsObject, args: &[JsValue], new_target: Option<&JsObject>) -> JsResult<JsObject> {
        let new_target = new_target.unwrap_or(f).clone();
        let native = match f.borrow().function() {
            Some(FunctionData::Native(native)) if native.constructor => Some(native.function),
            Some(FunctionData::Ordinary(func)) if func.constructor.is_some() => None,
            _ => return Err(self.type_error("object is not a constructor")),
        };
        self.enter_call()?;
        let result = match native {
            Some(function) => match function(self, &JsValue::Undefined, args, Some(&new_target)) {
                Ok(JsValue::Object(obj)) => Ok(obj),
                Ok(_) => Err(self.type_error("constructor did not return an object")),
                Err(thrown) => Err(thrown),
            },
            None => self.construct_ordinary(f, args, &new_target),
        };
        self.exit_call();
        result
    }

    fn construct_ordinary(&mut self, f: &JsObject, args: &[JsValue], new_target: &JsObject) -> JsResult<JsObject> {
        let (code, environment, kind) = {
            let data = f.borrow();
            let Some(func) = data.ordinary_function() else {
                return Err(self.type_error("object is not a constructor"));
            };
            (func.code.clone(), func.environment.clone(), func.constructor)
        };
        let kind = kind.unwrap_or(ConstructorKind::Base);

        let this_object = if kind == ConstructorKind::Base {
            let proto = self.get_prototype_from_constructor(new_target, |i| &i.object_prototype)?;
            let obj = self.ordinary_object(Some(proto));
            self.initialize_instance_elements(&obj, f)?;
            Some(obj)
        } else {
            None
        };
        let func_env = Environment::new_function(
            environment,
            FunctionScope {
                this: match &this_object {
                    Some(obj) => ThisState::Initialized(JsValue::Object(obj.clone())),
                    None => ThisState::Uninitialized,
                },
                function: f.clone(),
                new_target: Some(new_target.clone()),
            },
        );

        let result = match &code {
            FunctionCode::Script(def) => {
                trace!(function = def.name.as_deref().unwrap_or(""), args = args.len(), "construct");
                self.evaluate_function_body(f, def, &func_env, args)
            }
            FunctionCode::DefaultConstructor if kind == ConstructorKind::Derived => {
                self.push_context(func_env.clone(), true, Some(f.clone()));
                let result = self.super_call(&func_env, args.to_vec());
                self.pop_context();
                Completion::from(result)
            }
            FunctionCode::DefaultConstructor => Completion::Normal(JsValue::Undefined),
        };

        match result {
            Completion::Throw(thrown) => return Err(thrown),
            Completion::Return(JsValue::Object(obj)) => return Ok(obj),
            Completion::Return(value) if kind == ConstructorKind::Derived && !value.is_undefined() => {
                return Err(self.type_error("Derived constructors may only return object or undefined"));
            }
            _ => {}
        }
        if let Some(obj) = this_object {
            return Ok(obj);
        }
        let this = func_env.borrow().function.as_ref().map(|scope| scope.this.clone());
        match this {
            Some(ThisState::Initialized(JsValue::Object(obj))) => Ok(obj),
            _ => Err(self.reference_error(
                "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
            )),
        }
    }

    /// `super(...args)`: constructs the parent class with the current
    /// new.target and binds the result as `this`.
    pub(crate) fn super_call(&mut self, env: &EnvRef, args: Vec<JsValue>) -> JsResult<JsValue> {
        let Some(func_env) = function_environment(env) else {
            return Err(self.syntax_error("'super' keyword unexpected here"));
        };
        let (active, new_target) = {
            let env = func_env.borrow();
            let Some(scope) = env.function.as_ref() else {
                return Err(self.syntax_error("'super' keyword unexpected here"));
            };
            (scope.function.clone(), scope.new_target.clone())
        };
        let super_constructor = active.prototype();
        let Some(super_constructor) = super_constructor.filter(JsObject::is_constructor) else {
            return Err(self.type_error("Super constructor is not a constructor"));
        };
        let Some(new_target) = new_target else {
            return Err(self.syntax_error("'super' keyword unexpected here"));
        };
        let result = self.construct(&super_constructor, &args, Some(&new_target))?;

        {
            let mut env = func_env.borrow_mut();
            let Some(scope) = env.function.as_mut() else {
                return Err(self.syntax_error("'super' keyword unexpected here"));
            };
            if matches!(scope.this, ThisState::Initialized(_)) {
                return Err(self.reference_error("Super constructor may only be called once"));
            }
            scope.this = ThisState::Initialized(JsValue::Object(result.clone()));
        }
        self.initialize_instance_elements(&result, &active)?;
        Ok(JsValue::Object(result))
    }

    /// InitializeInstanceElements: installs the private methods of the class
    /// whose constructor is `constructor`.
    fn initialize_instance_elements(&mut self, obj: &JsObject, constructor: &JsObject) -> JsResult<()> {
        let methods = match constructor.borrow().ordinary_function() {
            Some(func) if !func.private_methods.is_empty() => func.private_methods.clone(),
            _ => return Ok(()),
        };
        for (name, element) in methods {
            if obj.borrow().find_private_element(&name).is_some() {
                return Err(self.type_error("Cannot initialize private methods twice on the same object"));
            }
            obj.borrow_mut().private_elements.push((name, element));
        }
        Ok(())
    }

    /// ClassDefinitionEvaluation. `name` is the binding name, or the name
    /// inferred from the surrounding assignment for anonymous classes.
    pub(crate) fn evaluate_class(&mut self, class: &Rc<ClassDef>, env: &EnvRef, name: &str) -> JsResult<JsObject> {
        let class_env = Environment::new(Some(env.clone()));
        {
            let mut scope = class_env.borrow_mut();
            if let Some(binding) = &class.name {
                scope.declare(binding, BindingKind::Const);
            }
            for method in &class.body {
                if let ClassKey::Private(private) = &method.key
                    && !scope.private_names.contains_key(private)
                {
                    scope.private_names.insert(private.clone(), PrivateName::new(private));
                }
            }
        }

        let object_prototype = self.intrinsics().object_prototype.clone();
        let function_prototype = self.intrinsics().function_prototype.clone();
        let (proto_parent, constructor_parent) = match &class.super_class {
            None => (Some(object_prototype), function_prototype),
            Some(heritage) => match self.eval_expr(heritage, &class_env) {
                Completion::Normal(JsValue::Null) => (None, function_prototype),
                Completion::Normal(JsValue::Object(superclass)) if superclass.is_constructor() => {
                    match self.get(&superclass, &"prototype".into())? {
                        JsValue::Object(proto) => (Some(proto), superclass),
                        JsValue::Null => (None, superclass),
                        other => {
                            return Err(self.type_error(&format!(
                                "Class extends value does not have valid prototype property {}",
                                describe_value(&other)
                            )));
                        }
                    }
                }
                Completion::Normal(other) => {
                    return Err(self.type_error(&format!(
                        "Class extends value {} is not a constructor or null",
                        describe_value(&other)
                    )));
                }
                Completion::Throw(thrown) => return Err(thrown),
                _ => return Err(self.syntax_error("Invalid class heritage")),
            },
        };

        let proto = self.ordinary_object(proto_parent);
        let kind = if class.super_class.is_some() {
            ConstructorKind::Derived
        } else {
            ConstructorKind::Base
        };
        let (code, length) = match &class.constructor {
            Some(def) => (FunctionCode::Script(def.clone()), def.params.len()),
            None => (FunctionCode::DefaultConstructor, 0),
        };
        let constructor = self.alloc(ObjectData::new(
            Some(constructor_parent),
            ObjectKind::Function(FunctionData::Ordinary(Box::new(OrdinaryFunction {
                code,
                environment: class_env.clone(),
                strict: true,
                home_object: Some(proto.clone()),
                constructor: Some(kind),
                class: Some(class.clone()),
                private_methods: Vec::new(),
            }))),
        ));
        constructor.define_own_property(
            "length".into(),
            PropertyDescriptor::data(JsValue::Number(length as f64), false, false, true),
        );
        self.set_function_name(&constructor, FunctionName::Str(name), None);
        constructor.define_own_property(
            "prototype".into(),
            PropertyDescriptor::data(JsValue::Object(proto.clone()), false, false, false),
        );
        proto.define_builtin("constructor", JsValue::Object(constructor.clone()));

        let mut instance_private = Vec::new();
        let mut static_private = Vec::new();
        for method in &class.body {
            let target = if method.is_static { &constructor } else { &proto };
            let func = self.define_method(&method.value, &class_env, target);
            let prefix = match method.kind {
                ClassMethodKind::Method => None,
                ClassMethodKind::Get => Some("get"),
                ClassMethodKind::Set => Some("set"),
            };
            match &method.key {
                ClassKey::Public(property_name) => {
                    let key = match self.eval_property_name(property_name, &class_env) {
                        Ok(key) => key,
                        Err(Completion::Throw(thrown)) => return Err(thrown),
                        Err(_) => return Err(self.syntax_error("Invalid property name")),
                    };
                    self.set_function_name(&func, FunctionName::Key(&key), prefix);
                    let desc = match method.kind {
                        ClassMethodKind::Method => PropertyDescriptor::data(JsValue::Object(func), true, false, true),
                        ClassMethodKind::Get => PropertyDescriptor {
                            get: Some(JsValue::Object(func)),
                            enumerable: Some(false),
                            configurable: Some(true),
                            ..Default::default()
                        },
                        ClassMethodKind::Set => PropertyDescriptor {
                            set: Some(JsValue::Object(func)),
                            enumerable: Some(false),
                            configurable: Some(true),
                            ..Default::default()
                        },
                    };
                    self.define_property_or_throw(target, key, desc)?;
                }
                ClassKey::Private(private) => {
                    let Some(private_name) = class_env.borrow().private_names.get(private).cloned() else {
                        return Err(self.syntax_error(&format!("Private field '#{private}' must be declared in an enclosing class")));
                    };
                    self.set_function_name(&func, FunctionName::Private(&private_name), prefix);
                    let element = match method.kind {
                        ClassMethodKind::Method => PrivateElement::Method(func),
                        ClassMethodKind::Get => PrivateElement::Accessor { get: Some(func), set: None },
                        ClassMethodKind::Set => PrivateElement::Accessor { get: None, set: Some(func) },
                    };
                    let list = if method.is_static { &mut static_private } else { &mut instance_private };
                    add_private_element(list, private_name, element);
                }
            }
        }

        if let Some(func) = constructor.borrow_mut().ordinary_function_mut() {
            func.private_methods = instance_private;
        }
        for (private_name, element) in static_private {
            constructor.borrow_mut().private_elements.push((private_name, element));
        }
        if let Some(binding) = &class.name {
            class_env.borrow_mut().initialize(binding, JsValue::Object(constructor.clone()));
        }
        Ok(constructor)
    }

    /// Function.prototype.toString: the source text of script functions.
    pub(crate) fn function_source_text(&self, f: &JsObject) -> Option<String> {
        let data = f.borrow();
        match data.function()? {
            FunctionData::Ordinary(func) => Some(func.source_text().to_string()),
            FunctionData::Native(_) => None,
        }
    }
}

/// Short rendering of a value for error messages.
pub(crate) fn describe_value(value: &JsValue) -> String {
    match value {
        JsValue::String(s) => format!("\"{s}\""),
        JsValue::Object(obj) if obj.is_callable() => "function".to_string(),
        JsValue::Object(_) => "object".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessor_halves_merge() {
        let name = PrivateName::new("x");
        let mut list = Vec::new();
        let realm = crate::interpreter::realm::Realm::new();
        let getter = realm.intrinsics.function_prototype.clone();
        let setter = realm.intrinsics.throw_type_error.clone();
        add_private_element(&mut list, name.clone(), PrivateElement::Accessor { get: Some(getter), set: None });
        add_private_element(&mut list, name.clone(), PrivateElement::Accessor { get: None, set: Some(setter) });
        assert_eq!(list.len(), 1);
        assert!(matches!(&list[0].1, PrivateElement::Accessor { get: Some(_), set: Some(_) }));

        // a same-spelled name from another class is distinct
        add_private_element(&mut list, PrivateName::new("x"), PrivateElement::Accessor { get: None, set: None });
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn symbol_keys_name_functions_with_brackets() {
        let sym = crate::types::JsSymbol::new(Some(JsString::from_str("iter")));
        let key = PropertyKey::Symbol(sym);
        assert_eq!(FunctionName::Key(&key).to_js_string().to_rust_string(), "[iter]");
        let anonymous = PropertyKey::Symbol(crate::types::JsSymbol::new(None));
        assert_eq!(FunctionName::Key(&anonymous).to_js_string().to_rust_string(), "");
        let private = PrivateName::new("m");
        assert_eq!(FunctionName::Private(&private).to_js_string().to_rust_string(), "#m");
    }
}
