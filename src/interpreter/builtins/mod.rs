mod error;
mod number;
mod string;
mod symbol;

use super::Interpreter;
use super::helpers::to_boolean;
use super::object::{FunctionData, NativeFn, NativeFunction, ObjectData, ObjectKind, PropertyDescriptor, PropertyKey};
use super::realm::Intrinsics;
use super::types::JsResult;
use crate::ast::{Declaration, Statement};
use crate::parser::parse;
use crate::types::{JsObject, JsString, JsValue};

/// The `index`th argument, or undefined when absent.
pub(crate) fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

/// CreateDynamicFunction for `Function(p1, ..., pn, body)`. The pieces are
/// parsed as a single function declaration in the global scope; text that
/// closes the function early and adds statements of its own is rejected.
fn create_dynamic_function(interp: &mut Interpreter, args: &[JsValue]) -> JsResult<JsValue> {
    let (body, params) = match args.split_last() {
        Some((body, params)) => (interp.to_string(body)?.to_rust_string(), params),
        None => (String::new(), args),
    };
    let mut names = Vec::with_capacity(params.len());
    for param in params {
        names.push(interp.to_string(param)?.to_rust_string());
    }
    let source = format!("function anonymous({}\n) {{\n{body}\n}}", names.join(","));
    let program = match parse(&source) {
        Ok(program) => program,
        Err(err) => return Err(interp.syntax_error(&err.message())),
    };
    let def = match program.body.as_slice() {
        [Statement::Declaration(Declaration::Function(def))] if def.source_text.len() == source.len() => def.clone(),
        _ => return Err(interp.syntax_error("Invalid function body")),
    };
    let global_env = interp.realm.global_env.clone();
    Ok(JsValue::Object(interp.instantiate_function(&def, &global_env, "anonymous")))
}

impl Interpreter {
    /// CreateBuiltinFunction with `length` and `name` defined.
    pub(crate) fn create_native_function(
        &mut self,
        name: &str,
        length: usize,
        function: NativeFn,
        constructor: bool,
    ) -> JsObject {
        let proto = self.intrinsics().function_prototype.clone();
        let func = self.alloc(ObjectData::new(
            Some(proto),
            ObjectKind::Function(FunctionData::Native(NativeFunction { function, constructor })),
        ));
        func.define_own_property(
            "length".into(),
            PropertyDescriptor::data(JsValue::Number(length as f64), false, false, true),
        );
        func.define_own_property("name".into(), PropertyDescriptor::data(JsValue::from_str(name), false, false, true));
        func
    }

    /// Installs a native method as a writable, non-enumerable property.
    pub(crate) fn define_native_method(&mut self, target: &JsObject, name: &str, length: usize, function: NativeFn) {
        let method = self.create_native_function(name, length, function, false);
        target.define_builtin(name, JsValue::Object(method));
    }

    /// Links a constructor and its prototype object in both directions.
    pub(crate) fn link_constructor(&mut self, constructor: &JsObject, prototype: &JsObject) {
        constructor.define_own_property(
            "prototype".into(),
            PropertyDescriptor::data(JsValue::Object(prototype.clone()), false, false, false),
        );
        prototype.define_builtin("constructor", JsValue::Object(constructor.clone()));
    }

    pub(crate) fn define_global(&mut self, name: &str, value: JsValue) {
        self.global_object().define_builtin(name, value);
    }

    /// The prototype for an object created by a native constructor: taken
    /// from `new_target` when constructing, the intrinsic otherwise.
    pub(crate) fn native_prototype(
        &mut self,
        new_target: Option<&JsObject>,
        fallback: fn(&Intrinsics) -> &JsObject,
    ) -> JsResult<JsObject> {
        match new_target {
            Some(target) => self.get_prototype_from_constructor(target, fallback),
            None => Ok(fallback(self.intrinsics()).clone()),
        }
    }

    pub(crate) fn setup_globals(&mut self) {
        let global = self.global_object();
        global.define_own_property(
            "globalThis".into(),
            PropertyDescriptor::data(JsValue::Object(global.clone()), true, false, true),
        );
        for (name, value) in [
            ("undefined", JsValue::Undefined),
            ("NaN", JsValue::Number(f64::NAN)),
            ("Infinity", JsValue::Number(f64::INFINITY)),
        ] {
            global.define_own_property(name.into(), PropertyDescriptor::data(value, false, false, false));
        }

        self.setup_object();
        self.setup_function();
        self.setup_boolean();
        self.setup_errors();
        self.setup_number();
        self.setup_bigint();
        self.setup_string();
        self.setup_symbol();
        self.setup_console();
    }

    fn setup_object(&mut self) {
        let object_ctor = self.create_native_function(
            "Object",
            1,
            |interp, _this, args, new_target| {
                let value = arg(args, 0);
                if value.is_nullish() {
                    let proto = interp.native_prototype(new_target, |i| &i.object_prototype)?;
                    return Ok(JsValue::Object(interp.ordinary_object(Some(proto))));
                }
                interp.to_object(&value).map(JsValue::Object)
            },
            true,
        );
        let proto = self.intrinsics().object_prototype.clone();
        self.link_constructor(&object_ctor, &proto);

        self.define_native_method(&object_ctor, "getPrototypeOf", 1, |interp, _this, args, _| {
            let obj = interp.to_object(&arg(args, 0))?;
            Ok(obj.prototype().map_or(JsValue::Null, JsValue::Object))
        });
        self.define_native_method(&object_ctor, "setPrototypeOf", 2, |interp, _this, args, _| {
            let target = arg(args, 0);
            if target.is_nullish() {
                return Err(interp.type_error("Object.setPrototypeOf called on null or undefined"));
            }
            let proto = match arg(args, 1) {
                JsValue::Object(p) => Some(p),
                JsValue::Null => None,
                other => {
                    return Err(interp.type_error(&format!("Object prototype may only be an Object or null: {other}")));
                }
            };
            let JsValue::Object(obj) = &target else {
                return Ok(target);
            };
            if !obj.set_prototype_of(proto) {
                return Err(interp.type_error("Cyclic __proto__ value or non-extensible object"));
            }
            Ok(target)
        });
        self.define_native_method(&object_ctor, "create", 2, |interp, _this, args, _| {
            let proto = match arg(args, 0) {
                JsValue::Object(p) => Some(p),
                JsValue::Null => None,
                other => {
                    return Err(interp.type_error(&format!("Object prototype may only be an Object or null: {other}")));
                }
            };
            let obj = interp.ordinary_object(proto);
            let properties = arg(args, 1);
            if !properties.is_undefined() {
                interp.define_properties(&obj, &properties)?;
            }
            Ok(JsValue::Object(obj))
        });
        self.define_native_method(&object_ctor, "defineProperty", 3, |interp, _this, args, _| {
            let target = arg(args, 0);
            let JsValue::Object(obj) = &target else {
                return Err(interp.type_error("Object.defineProperty called on non-object"));
            };
            let key = interp.to_property_key(&arg(args, 1))?;
            let desc = interp.to_property_descriptor(&arg(args, 2))?;
            interp.define_property_or_throw(obj, key, desc)?;
            Ok(target)
        });
        self.define_native_method(&object_ctor, "getOwnPropertyDescriptor", 2, |interp, _this, args, _| {
            let obj = interp.to_object(&arg(args, 0))?;
            let key = interp.to_property_key(&arg(args, 1))?;
            let desc = obj.get_own_property(&key);
            Ok(interp.from_property_descriptor(desc))
        });

        self.define_native_method(&proto, "hasOwnProperty", 1, |interp, this, args, _| {
            let key = interp.to_property_key(&arg(args, 0))?;
            let obj = interp.to_object(this)?;
            Ok(JsValue::Boolean(obj.get_own_property(&key).is_some()))
        });
        self.define_native_method(&proto, "isPrototypeOf", 1, |interp, this, args, _| {
            let JsValue::Object(value) = arg(args, 0) else {
                return Ok(JsValue::Boolean(false));
            };
            let obj = interp.to_object(this)?;
            let mut current = value.prototype();
            while let Some(p) = current {
                if p == obj {
                    return Ok(JsValue::Boolean(true));
                }
                current = p.prototype();
            }
            Ok(JsValue::Boolean(false))
        });
        self.define_native_method(&proto, "propertyIsEnumerable", 1, |interp, this, args, _| {
            let key = interp.to_property_key(&arg(args, 0))?;
            let obj = interp.to_object(this)?;
            let enumerable = obj.get_own_property(&key).is_some_and(|desc| desc.is_enumerable());
            Ok(JsValue::Boolean(enumerable))
        });
        self.define_native_method(&proto, "toString", 0, |interp, this, _args, _| {
            match this {
                JsValue::Undefined => return Ok(JsValue::from_str("[object Undefined]")),
                JsValue::Null => return Ok(JsValue::from_str("[object Null]")),
                _ => {}
            }
            let obj = interp.to_object(this)?;
            let builtin_tag = match &obj.borrow().kind {
                ObjectKind::Arguments => "Arguments",
                ObjectKind::Function(_) => "Function",
                ObjectKind::Error => "Error",
                ObjectKind::Boolean(_) => "Boolean",
                ObjectKind::Number(_) => "Number",
                ObjectKind::String(_) => "String",
                _ => "Object",
            };
            let tag_key = PropertyKey::Symbol(interp.symbols.to_string_tag.clone());
            let tag = match interp.get(&obj, &tag_key)? {
                JsValue::String(tag) => tag.to_rust_string(),
                _ => builtin_tag.to_string(),
            };
            Ok(JsValue::from_str(&format!("[object {tag}]")))
        });
        self.define_native_method(&proto, "valueOf", 0, |interp, this, _args, _| {
            interp.to_object(this).map(JsValue::Object)
        });

        self.define_global("Object", JsValue::Object(object_ctor));
    }

    /// ObjectDefineProperties.
    fn define_properties(&mut self, obj: &JsObject, properties: &JsValue) -> JsResult<()> {
        let props = self.to_object(properties)?;
        let mut descriptors = Vec::new();
        for key in props.own_property_keys() {
            if props.get_own_property(&key).is_some_and(|desc| desc.is_enumerable()) {
                let desc_obj = self.get(&props, &key)?;
                descriptors.push((key, self.to_property_descriptor(&desc_obj)?));
            }
        }
        for (key, desc) in descriptors {
            self.define_property_or_throw(obj, key, desc)?;
        }
        Ok(())
    }

    fn setup_function(&mut self) {
        let function_ctor = self.create_native_function(
            "Function",
            1,
            |interp, _this, args, _new_target| create_dynamic_function(interp, args),
            true,
        );
        let proto = self.intrinsics().function_prototype.clone();
        self.link_constructor(&function_ctor, &proto);
        self.define_global("Function", JsValue::Object(function_ctor));

        proto.define_own_property("length".into(), PropertyDescriptor::data(JsValue::Number(0.0), false, false, true));
        proto.define_own_property("name".into(), PropertyDescriptor::data(JsValue::from_str(""), false, false, true));

        self.define_native_method(&proto, "call", 1, |interp, this, args, _| {
            let this_arg = arg(args, 0);
            let rest = args.get(1..).unwrap_or_default();
            match this {
                JsValue::Object(f) if f.is_callable() => interp.call_object(f, &this_arg, rest),
                _ => Err(interp.type_error("Function.prototype.call called on a value that is not a function")),
            }
        });
        self.define_native_method(&proto, "toString", 0, |interp, this, _args, _| {
            let JsValue::Object(f) = this else {
                return Err(interp.type_error("Function.prototype.toString requires that 'this' be a Function"));
            };
            if !f.is_callable() {
                return Err(interp.type_error("Function.prototype.toString requires that 'this' be a Function"));
            }
            if let Some(source) = interp.function_source_text(f) {
                return Ok(JsValue::from_str(&source));
            }
            let name = match f.get_own_property(&"name".into()).and_then(|desc| desc.value) {
                Some(JsValue::String(name)) => name.to_rust_string(),
                _ => String::new(),
            };
            Ok(JsValue::from_str(&format!("function {name}() {{ [native code] }}")))
        });

        let has_instance = self.create_native_function(
            "[Symbol.hasInstance]",
            1,
            |interp, this, args, _| interp.ordinary_has_instance(this, &arg(args, 0)).map(JsValue::Boolean),
            false,
        );
        let key = PropertyKey::Symbol(self.symbols.has_instance.clone());
        proto.define_own_property(key, PropertyDescriptor::data(JsValue::Object(has_instance), false, false, false));
    }

    fn setup_boolean(&mut self) {
        let boolean_ctor = self.create_native_function(
            "Boolean",
            1,
            |interp, _this, args, new_target| {
                let value = to_boolean(&arg(args, 0));
                if new_target.is_none() {
                    return Ok(JsValue::Boolean(value));
                }
                let proto = interp.native_prototype(new_target, |i| &i.boolean_prototype)?;
                Ok(JsValue::Object(interp.alloc(ObjectData::new(Some(proto), ObjectKind::Boolean(value)))))
            },
            true,
        );
        let proto = self.intrinsics().boolean_prototype.clone();
        self.link_constructor(&boolean_ctor, &proto);

        self.define_native_method(&proto, "toString", 0, |interp, this, _args, _| {
            let value = this_boolean_value(interp, this, "Boolean.prototype.toString")?;
            Ok(JsValue::from_str(if value { "true" } else { "false" }))
        });
        self.define_native_method(&proto, "valueOf", 0, |interp, this, _args, _| {
            this_boolean_value(interp, this, "Boolean.prototype.valueOf").map(JsValue::Boolean)
        });
        self.define_global("Boolean", JsValue::Object(boolean_ctor));
    }

    /// `console.log` and `print`, writing their arguments to stdout.
    fn setup_console(&mut self) {
        fn log(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue], _: Option<&JsObject>) -> JsResult<JsValue> {
            let mut parts = Vec::with_capacity(args.len());
            for value in args {
                parts.push(match value {
                    JsValue::Symbol(sym) => sym.descriptive_string(),
                    other => interp.to_string(other)?.to_rust_string(),
                });
            }
            println!("{}", parts.join(" "));
            Ok(JsValue::Undefined)
        }

        let console = self.new_object();
        self.define_native_method(&console, "log", 0, log);
        self.define_global("console", JsValue::Object(console));
        let print = self.create_native_function("print", 1, log, false);
        self.define_global("print", JsValue::Object(print));
    }
}

/// thisBooleanValue.
fn this_boolean_value(interp: &mut Interpreter, this: &JsValue, method: &str) -> JsResult<bool> {
    let value = match this {
        JsValue::Boolean(b) => Some(*b),
        JsValue::Object(obj) => match obj.borrow().kind {
            ObjectKind::Boolean(b) => Some(b),
            _ => None,
        },
        _ => None,
    };
    value.ok_or_else(|| interp.type_error(&format!("{method} requires that 'this' be a Boolean")))
}

/// The string contents of a `this` that must be a String or wrapper.
pub(crate) fn this_string_value(interp: &mut Interpreter, this: &JsValue, method: &str) -> JsResult<JsString> {
    let value = match this {
        JsValue::String(s) => Some(s.clone()),
        JsValue::Object(obj) => match &obj.borrow().kind {
            ObjectKind::String(s) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    };
    value.ok_or_else(|| interp.type_error(&format!("{method} requires that 'this' be a String")))
}
