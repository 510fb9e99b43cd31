use super::Interpreter;
use super::function::{FunctionName, describe_value};
use super::helpers::{strict_equality, to_boolean, typeof_val};
use super::object::{PrivateElement, PrivateName, PropertyDescriptor, PropertyKey};
use super::operations::{Numeric, PreferredType};
use super::types::{
    BindingError, Completion, EnvRef, JsResult, ThisState, function_environment, normal, resolve_private_name,
    throw_on_err,
};
use crate::ast::*;
use crate::types::{JsBigInt, JsString, JsValue, number_ops};

/// The result of evaluating an expression that denotes a storage
/// location rather than a value.
#[derive(Clone, Debug)]
pub(crate) enum Reference {
    /// A binding in a declarative environment.
    Binding { env: EnvRef, name: String },
    /// A property of the global object reached through the global
    /// environment.
    Global(String),
    Unresolvable(String),
    Property {
        base: JsValue,
        key: PropertyKey,
        this: JsValue,
    },
    Private { base: JsValue, name: PrivateName },
}

impl Reference {
    /// The `this` value a call through this reference receives.
    fn this_value(&self) -> JsValue {
        match self {
            Reference::Property { this, .. } => this.clone(),
            Reference::Private { base, .. } => base.clone(),
            _ => JsValue::Undefined,
        }
    }
}

/// Turns an expression completion into a `Result` so that `?` can be used;
/// the `Err` side carries the abrupt completion unchanged.
pub(crate) fn value_of(completion: Completion) -> Result<JsValue, Completion> {
    match completion {
        Completion::Normal(value) => Ok(value),
        other => Err(other),
    }
}

/// Renders a callee for "is not a function" style messages.
fn describe_expression(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(name) => name.clone(),
        Expression::This => "this".to_string(),
        Expression::Member(object, MemberProperty::Dot(name)) => format!("{}.{name}", describe_expression(object)),
        Expression::Member(object, MemberProperty::Private(name)) => format!("{}.#{name}", describe_expression(object)),
        Expression::Member(object, MemberProperty::Computed(_)) => format!("{}[...]", describe_expression(object)),
        Expression::SuperMember(MemberProperty::Dot(name)) => format!("super.{name}"),
        Expression::SuperMember(_) => "super[...]".to_string(),
        Expression::Call(callee, _) => format!("{}(...)", describe_expression(callee)),
        Expression::Literal(Literal::String(s)) => format!("\"{s}\""),
        Expression::Literal(Literal::Number(n)) => number_ops::to_string(*n),
        Expression::Literal(Literal::Null) => "null".to_string(),
        Expression::Literal(Literal::Boolean(b)) => b.to_string(),
        _ => "expression".to_string(),
    }
}

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expression, env: &EnvRef) -> Completion {
        match expr {
            Expression::Literal(lit) => Completion::Normal(match lit {
                Literal::Null => JsValue::Null,
                Literal::Boolean(b) => JsValue::Boolean(*b),
                Literal::Number(n) => JsValue::Number(*n),
                Literal::String(s) => JsValue::String(s.clone()),
                Literal::BigInt(n) => JsValue::BigInt(JsBigInt { value: n.clone() }),
            }),
            Expression::Identifier(name) => {
                let reference = self.resolve_binding(name, env);
                Completion::from(self.get_value(&reference))
            }
            Expression::This => Completion::from(self.resolve_this(env)),
            Expression::Object(properties) => self.eval_object_literal(properties, env),
            Expression::Function(def) => {
                let func = self.instantiate_function_expression(def, env, "");
                Completion::Normal(JsValue::Object(func))
            }
            Expression::Class(class) => {
                let name = class.name.as_deref().unwrap_or("");
                Completion::from(self.evaluate_class(class, env, name).map(JsValue::Object))
            }
            Expression::Unary(op, operand) => {
                let value = normal!(self.eval_expr(operand, env));
                Completion::from(self.apply_unary(*op, &value))
            }
            Expression::Binary(op, left, right) => {
                let lval = normal!(self.eval_expr(left, env));
                let rval = normal!(self.eval_expr(right, env));
                Completion::from(self.apply_binary(*op, &lval, &rval))
            }
            Expression::Logical(op, left, right) => {
                let lval = normal!(self.eval_expr(left, env));
                let short_circuit = match op {
                    LogicalOp::And => !to_boolean(&lval),
                    LogicalOp::Or => to_boolean(&lval),
                };
                if short_circuit {
                    Completion::Normal(lval)
                } else {
                    self.eval_expr(right, env)
                }
            }
            Expression::Conditional(test, consequent, alternate) => {
                let test = normal!(self.eval_expr(test, env));
                if to_boolean(&test) {
                    self.eval_expr(consequent, env)
                } else {
                    self.eval_expr(alternate, env)
                }
            }
            Expression::Update(op, prefix, target) => self.eval_update(*op, *prefix, target, env),
            Expression::Assign(op, target, value) => self.eval_assignment(*op, target, value, env),
            Expression::Call(callee, args) => self.eval_call(callee, args, env),
            Expression::SuperCall(args) => {
                let args = match self.eval_arguments(args, env) {
                    Ok(args) => args,
                    Err(completion) => return completion,
                };
                Completion::from(self.super_call(env, args))
            }
            Expression::New(callee, args) => {
                let constructor = normal!(self.eval_expr(callee, env));
                let args = match self.eval_arguments(args, env) {
                    Ok(args) => args,
                    Err(completion) => return completion,
                };
                match &constructor {
                    JsValue::Object(obj) if obj.is_constructor() => {
                        Completion::from(self.construct(obj, &args, None).map(JsValue::Object))
                    }
                    _ => {
                        let message = format!("{} is not a constructor", describe_expression(callee));
                        Completion::Throw(self.type_error(&message))
                    }
                }
            }
            Expression::Member(..) | Expression::SuperMember(_) => {
                let reference = match self.eval_reference(expr, env) {
                    Ok(reference) => reference,
                    Err(completion) => return completion,
                };
                Completion::from(self.get_value(&reference))
            }
            Expression::Typeof(operand) => {
                if let Expression::Identifier(name) = operand.as_ref()
                    && let Reference::Unresolvable(_) = self.resolve_binding(name, env)
                {
                    return Completion::Normal(JsValue::from_str("undefined"));
                }
                let value = normal!(self.eval_expr(operand, env));
                Completion::Normal(JsValue::from_str(typeof_val(&value)))
            }
            Expression::Void(operand) => {
                normal!(self.eval_expr(operand, env));
                Completion::Normal(JsValue::Undefined)
            }
            Expression::Delete(operand) => self.eval_delete(operand, env),
        }
    }

    /// Evaluates `expr` as a value, applying NamedEvaluation to anonymous
    /// function and class definitions.
    pub(crate) fn eval_named(&mut self, expr: &Expression, env: &EnvRef, name: FunctionName<'_>) -> Completion {
        if !expr.is_anonymous_function_definition() {
            return self.eval_expr(expr, env);
        }
        match expr {
            Expression::Function(def) => {
                let func = self.create_function_object(def, env, None, Some(super::object::ConstructorKind::Base));
                self.set_function_name(&func, name, None);
                self.make_constructor(&func);
                Completion::Normal(JsValue::Object(func))
            }
            Expression::Class(class) => {
                let name = name.to_js_string().to_rust_string();
                Completion::from(self.evaluate_class(class, env, &name).map(JsValue::Object))
            }
            _ => self.eval_expr(expr, env),
        }
    }

    pub(crate) fn eval_arguments(&mut self, args: &[Expression], env: &EnvRef) -> Result<Vec<JsValue>, Completion> {
        args.iter().map(|arg| value_of(self.eval_expr(arg, env))).collect()
    }

    // ----- references -----

    /// ResolveBinding: walks the environment chain. The global environment
    /// answers from its declarative part first, then its object.
    pub(crate) fn resolve_binding(&self, name: &str, env: &EnvRef) -> Reference {
        let mut current = env.clone();
        loop {
            let parent = {
                let scope = current.borrow();
                if scope.has_binding(name) {
                    drop(scope);
                    return Reference::Binding {
                        env: current,
                        name: name.to_string(),
                    };
                }
                if let Some(global) = &scope.object
                    && global.has_property(&PropertyKey::from(name))
                {
                    return Reference::Global(name.to_string());
                }
                scope.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Reference::Unresolvable(name.to_string()),
            }
        }
    }

    /// ResolveThisBinding.
    pub(crate) fn resolve_this(&mut self, env: &EnvRef) -> JsResult<JsValue> {
        let Some(func_env) = function_environment(env) else {
            return Ok(JsValue::Object(self.global_object()));
        };
        let this = func_env.borrow().function.as_ref().map(|scope| scope.this.clone());
        match this {
            Some(ThisState::Initialized(value)) => Ok(value),
            _ => Err(self.reference_error(
                "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
            )),
        }
    }

    pub(crate) fn eval_property_name(&mut self, name: &PropertyName, env: &EnvRef) -> Result<PropertyKey, Completion> {
        Ok(match name {
            PropertyName::Identifier(s) => PropertyKey::from(s.as_str()),
            PropertyName::String(s) => PropertyKey::String(s.clone()),
            PropertyName::Number(n) => PropertyKey::from(number_ops::to_string(*n).as_str()),
            PropertyName::Computed(expr) => {
                let value = value_of(self.eval_expr(expr, env))?;
                self.to_property_key(&value).map_err(Completion::Throw)?
            }
        })
    }

    fn eval_member_key(&mut self, property: &MemberProperty, env: &EnvRef) -> Result<PropertyKey, Completion> {
        match property {
            MemberProperty::Dot(name) => Ok(PropertyKey::from(name.as_str())),
            MemberProperty::Computed(expr) => {
                let value = value_of(self.eval_expr(expr, env))?;
                self.to_property_key(&value).map_err(Completion::Throw)
            }
            MemberProperty::Private(_) => Err(Completion::Throw(self.syntax_error("Unexpected private name"))),
        }
    }

    pub(crate) fn eval_reference(&mut self, expr: &Expression, env: &EnvRef) -> Result<Reference, Completion> {
        match expr {
            Expression::Identifier(name) => Ok(self.resolve_binding(name, env)),
            Expression::Member(object, MemberProperty::Private(name)) => {
                let base = value_of(self.eval_expr(object, env))?;
                let Some(private) = resolve_private_name(env, name) else {
                    let message = format!("Private field '#{name}' must be declared in an enclosing class");
                    return Err(Completion::Throw(self.syntax_error(&message)));
                };
                Ok(Reference::Private { base, name: private })
            }
            Expression::Member(object, property) => {
                let base = value_of(self.eval_expr(object, env))?;
                if base.is_nullish()
                    && let MemberProperty::Dot(name) = property
                {
                    let message = format!("Cannot read properties of {base} (reading '{name}')");
                    return Err(Completion::Throw(self.type_error(&message)));
                }
                let key = self.eval_member_key(property, env)?;
                Ok(Reference::Property {
                    this: base.clone(),
                    base,
                    key,
                })
            }
            Expression::SuperMember(property) => {
                let this = self.resolve_this(env).map_err(Completion::Throw)?;
                let key = self.eval_member_key(property, env)?;
                let home = function_environment(env).and_then(|func_env| {
                    let scope = func_env.borrow();
                    let function = &scope.function.as_ref()?.function;
                    let data = function.borrow();
                    data.ordinary_function()?.home_object.clone()
                });
                let Some(home) = home else {
                    return Err(Completion::Throw(self.syntax_error("'super' keyword unexpected here")));
                };
                let base = home.prototype().map_or(JsValue::Null, JsValue::Object);
                Ok(Reference::Property { base, key, this })
            }
            _ => Err(Completion::Throw(self.syntax_error("Invalid left-hand side in assignment"))),
        }
    }

    /// GetValue.
    pub(crate) fn get_value(&mut self, reference: &Reference) -> JsResult<JsValue> {
        match reference {
            Reference::Binding { env, name } => {
                let result = env.borrow().get(name);
                result.map_err(|err| self.binding_error(err, name))
            }
            Reference::Global(name) => {
                let global = self.global_object();
                self.get(&global, &PropertyKey::from(name.as_str()))
            }
            Reference::Unresolvable(name) => Err(self.reference_error(&format!("{name} is not defined"))),
            Reference::Property { base, key, this } => match base {
                JsValue::Object(obj) => self.get_with_receiver(obj, key, this),
                _ => self.get_v(base, key),
            },
            Reference::Private { base, name } => self.private_get(base, name),
        }
    }

    /// PutValue.
    pub(crate) fn put_value(&mut self, reference: &Reference, value: JsValue) -> JsResult<()> {
        let strict = self.strict();
        match reference {
            Reference::Binding { env, name } => {
                let result = env.borrow_mut().set(name, value, strict);
                result.map_err(|err| self.binding_error(err, name))
            }
            Reference::Global(name) => {
                let global = self.global_object();
                self.set(&global, PropertyKey::from(name.as_str()), value, strict)
            }
            Reference::Unresolvable(name) if strict => Err(self.reference_error(&format!("{name} is not defined"))),
            Reference::Unresolvable(name) => {
                let global = self.global_object();
                self.set(&global, PropertyKey::from(name.as_str()), value, false)
            }
            Reference::Property { base, key, this } => {
                if base.is_nullish() {
                    return Err(self.type_error(&format!("Cannot set properties of {base} (setting '{key}')")));
                }
                let JsValue::Object(obj) = base else {
                    return self.set_v(base, key.clone(), value, strict);
                };
                let ok = self.set_with_receiver(obj, key.clone(), value, this)?;
                if !ok && strict {
                    return Err(self.type_error(&format!("Cannot assign to read only property '{key}' of object")));
                }
                Ok(())
            }
            Reference::Private { base, name } => self.private_set(base, name, value),
        }
    }

    fn binding_error(&mut self, err: BindingError, name: &str) -> JsValue {
        match err {
            BindingError::Uninitialized => self.reference_error(&format!("Cannot access '{name}' before initialization")),
            BindingError::ConstAssignment => self.type_error("Assignment to constant variable."),
            BindingError::Missing => self.reference_error(&format!("{name} is not defined")),
        }
    }

    fn private_element(&mut self, base: &JsValue, name: &PrivateName, action: &str) -> JsResult<PrivateElement> {
        let found = base
            .as_object()
            .and_then(|obj| obj.borrow().find_private_element(name).cloned());
        match found {
            Some(element) => Ok(element),
            None => Err(self.type_error(&format!(
                "Cannot {action} private member #{} from an object whose class did not declare it",
                name.description()
            ))),
        }
    }

    /// PrivateGet.
    fn private_get(&mut self, base: &JsValue, name: &PrivateName) -> JsResult<JsValue> {
        match self.private_element(base, name, "read")? {
            PrivateElement::Method(method) => Ok(JsValue::Object(method)),
            PrivateElement::Accessor { get: Some(getter), .. } => self.call_object(&getter, base, &[]),
            PrivateElement::Accessor { get: None, .. } => {
                Err(self.type_error(&format!("'#{}' was defined without a getter", name.description())))
            }
        }
    }

    /// PrivateSet.
    fn private_set(&mut self, base: &JsValue, name: &PrivateName, value: JsValue) -> JsResult<()> {
        match self.private_element(base, name, "write")? {
            PrivateElement::Method(_) => {
                Err(self.type_error(&format!("Private method '#{}' is not writable", name.description())))
            }
            PrivateElement::Accessor { set: Some(setter), .. } => {
                self.call_object(&setter, base, &[value])?;
                Ok(())
            }
            PrivateElement::Accessor { set: None, .. } => {
                Err(self.type_error(&format!("'#{}' was defined without a setter", name.description())))
            }
        }
    }

    // ----- operators -----

    fn eval_call(&mut self, callee: &Expression, args: &[Expression], env: &EnvRef) -> Completion {
        let (func, this) = match callee {
            Expression::Identifier(_) | Expression::Member(..) | Expression::SuperMember(_) => {
                let reference = match self.eval_reference(callee, env) {
                    Ok(reference) => reference,
                    Err(completion) => return completion,
                };
                let func = throw_on_err!(self.get_value(&reference));
                (func, reference.this_value())
            }
            _ => (normal!(self.eval_expr(callee, env)), JsValue::Undefined),
        };
        let args = match self.eval_arguments(args, env) {
            Ok(args) => args,
            Err(completion) => return completion,
        };
        match &func {
            JsValue::Object(obj) if obj.is_callable() => Completion::from(self.call_object(obj, &this, &args)),
            _ => {
                let message = format!("{} is not a function", describe_expression(callee));
                Completion::Throw(self.type_error(&message))
            }
        }
    }

    fn eval_update(&mut self, op: UpdateOp, prefix: bool, target: &Expression, env: &EnvRef) -> Completion {
        let reference = match self.eval_reference(target, env) {
            Ok(reference) => reference,
            Err(completion) => return completion,
        };
        let old = throw_on_err!(self.get_value(&reference));
        let old = match throw_on_err!(self.to_numeric(&old)) {
            Numeric::Number(n) => n,
            Numeric::BigInt(_) => return Completion::Throw(self.type_error("BigInt arithmetic is not supported")),
        };
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        throw_on_err!(self.put_value(&reference, JsValue::Number(new)));
        Completion::Normal(JsValue::Number(if prefix { new } else { old }))
    }

    fn eval_assignment(&mut self, op: AssignOp, target: &Expression, value: &Expression, env: &EnvRef) -> Completion {
        let reference = match self.eval_reference(target, env) {
            Ok(reference) => reference,
            Err(completion) => return completion,
        };
        let name = match target {
            Expression::Identifier(name) => name.as_str(),
            _ => "",
        };

        let result = match op {
            AssignOp::Assign => normal!(self.eval_named(value, env, FunctionName::Str(name))),
            AssignOp::LogicalAndAssign | AssignOp::LogicalOrAssign => {
                let current = throw_on_err!(self.get_value(&reference));
                let short_circuit = if op == AssignOp::LogicalAndAssign {
                    !to_boolean(&current)
                } else {
                    to_boolean(&current)
                };
                if short_circuit {
                    return Completion::Normal(current);
                }
                normal!(self.eval_named(value, env, FunctionName::Str(name)))
            }
            compound => {
                let current = throw_on_err!(self.get_value(&reference));
                let rval = normal!(self.eval_expr(value, env));
                let Some(binary) = compound.binary_op() else {
                    return Completion::Throw(self.syntax_error("Invalid assignment operator"));
                };
                throw_on_err!(self.apply_binary(binary, &current, &rval))
            }
        };
        throw_on_err!(self.put_value(&reference, result.clone()));
        Completion::Normal(result)
    }

    fn eval_delete(&mut self, operand: &Expression, env: &EnvRef) -> Completion {
        match operand {
            Expression::Identifier(name) => match self.resolve_binding(name, env) {
                Reference::Global(name) => {
                    let global = self.global_object();
                    Completion::Normal(JsValue::Boolean(global.delete(&PropertyKey::from(name.as_str()))))
                }
                Reference::Unresolvable(_) => Completion::Normal(JsValue::Boolean(true)),
                _ => Completion::Normal(JsValue::Boolean(false)),
            },
            Expression::SuperMember(_) => {
                Completion::Throw(self.reference_error("Unsupported reference to 'super'"))
            }
            Expression::Member(..) => {
                let reference = match self.eval_reference(operand, env) {
                    Ok(reference) => reference,
                    Err(completion) => return completion,
                };
                let Reference::Property { base, key, .. } = reference else {
                    return Completion::Throw(self.syntax_error("Private fields can not be deleted"));
                };
                let obj = throw_on_err!(self.to_object(&base));
                let deleted = obj.delete(&key);
                if !deleted && self.strict() {
                    let message = format!("Cannot delete property '{key}' of {}", describe_value(&base));
                    return Completion::Throw(self.type_error(&message));
                }
                Completion::Normal(JsValue::Boolean(deleted))
            }
            other => {
                normal!(self.eval_expr(other, env));
                Completion::Normal(JsValue::Boolean(true))
            }
        }
    }

    fn apply_unary(&mut self, op: UnaryOp, value: &JsValue) -> JsResult<JsValue> {
        match op {
            UnaryOp::Not => Ok(JsValue::Boolean(!to_boolean(value))),
            UnaryOp::Plus => Ok(JsValue::Number(self.to_number(value)?)),
            UnaryOp::Minus => match self.to_numeric(value)? {
                Numeric::Number(n) => Ok(JsValue::Number(-n)),
                Numeric::BigInt(n) => Ok(JsValue::BigInt(JsBigInt { value: -n })),
            },
            UnaryOp::BitNot => match self.to_numeric(value)? {
                Numeric::Number(n) => Ok(JsValue::Number(number_ops::bitwise_not(n))),
                Numeric::BigInt(_) => Err(self.type_error("BigInt arithmetic is not supported")),
            },
        }
    }

    /// ApplyStringOrNumericBinaryOperator plus the relational, equality,
    /// `in` and `instanceof` operators.
    pub(crate) fn apply_binary(&mut self, op: BinaryOp, lval: &JsValue, rval: &JsValue) -> JsResult<JsValue> {
        let boolean = |b: bool| Ok(JsValue::Boolean(b));
        match op {
            BinaryOp::StrictEq => boolean(strict_equality(lval, rval)),
            BinaryOp::StrictNotEq => boolean(!strict_equality(lval, rval)),
            BinaryOp::Eq => boolean(self.loosely_equal(lval, rval)?),
            BinaryOp::NotEq => boolean(!self.loosely_equal(lval, rval)?),
            BinaryOp::Lt => boolean(self.is_less_than(lval, rval, true)? == Some(true)),
            BinaryOp::Gt => boolean(self.is_less_than(rval, lval, false)? == Some(true)),
            BinaryOp::LtEq => boolean(self.is_less_than(rval, lval, false)? == Some(false)),
            BinaryOp::GtEq => boolean(self.is_less_than(lval, rval, true)? == Some(false)),
            BinaryOp::Instanceof => boolean(self.instance_of(lval, rval)?),
            BinaryOp::In => {
                let JsValue::Object(obj) = rval else {
                    let message = format!("Cannot use 'in' operator to search for '{lval}' in {}", describe_value(rval));
                    return Err(self.type_error(&message));
                };
                let key = self.to_property_key(lval)?;
                boolean(obj.has_property(&key))
            }
            BinaryOp::Add => {
                let lprim = self.to_primitive(lval, PreferredType::Default)?;
                let rprim = self.to_primitive(rval, PreferredType::Default)?;
                if matches!(lprim, JsValue::String(_)) || matches!(rprim, JsValue::String(_)) {
                    let ls = self.to_string(&lprim)?;
                    let rs = self.to_string(&rprim)?;
                    return Ok(JsValue::String(ls.concat(&rs)));
                }
                self.apply_numeric(op, &lprim, &rprim)
            }
            _ => self.apply_numeric(op, lval, rval),
        }
    }

    fn apply_numeric(&mut self, op: BinaryOp, lval: &JsValue, rval: &JsValue) -> JsResult<JsValue> {
        let lnum = self.to_numeric(lval)?;
        let rnum = self.to_numeric(rval)?;
        let (a, b) = match (lnum, rnum) {
            (Numeric::Number(a), Numeric::Number(b)) => (a, b),
            (Numeric::BigInt(_), Numeric::BigInt(_)) => {
                return Err(self.type_error("BigInt arithmetic is not supported"));
            }
            _ => return Err(self.type_error("Cannot mix BigInt and other types, use explicit conversions")),
        };
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Mod => number_ops::remainder(a, b),
            BinaryOp::Exp => number_ops::exponentiate(a, b),
            BinaryOp::LShift => number_ops::left_shift(a, b),
            BinaryOp::RShift => number_ops::signed_right_shift(a, b),
            BinaryOp::URShift => number_ops::unsigned_right_shift(a, b),
            BinaryOp::BitAnd => number_ops::bitwise_and(a, b),
            BinaryOp::BitOr => number_ops::bitwise_or(a, b),
            BinaryOp::BitXor => number_ops::bitwise_xor(a, b),
            _ => return Err(self.syntax_error("Unexpected operator")),
        };
        Ok(JsValue::Number(result))
    }

    // ----- object literals -----

    fn eval_object_literal(&mut self, properties: &[Property], env: &EnvRef) -> Completion {
        let obj = self.new_object();
        for property in properties {
            let is_proto_setter = matches!(
                &property.key,
                PropertyName::Identifier(name) if name == "__proto__"
            ) || matches!(
                &property.key,
                PropertyName::String(s) if *s == JsString::from_str("__proto__")
            );
            if is_proto_setter && let PropertyValue::Init(expr) = &property.value {
                let value = normal!(self.eval_expr(expr, env));
                match value {
                    JsValue::Object(proto) => {
                        obj.set_prototype_of(Some(proto));
                    }
                    JsValue::Null => {
                        obj.set_prototype_of(None);
                    }
                    _ => {}
                }
                continue;
            }

            let key = match self.eval_property_name(&property.key, env) {
                Ok(key) => key,
                Err(completion) => return completion,
            };
            match &property.value {
                PropertyValue::Init(expr) => {
                    let value = normal!(self.eval_named(expr, env, FunctionName::Key(&key)));
                    self.create_data_property(&obj, key, value);
                }
                PropertyValue::Method(def) => {
                    let method = self.define_method(def, env, &obj);
                    self.set_function_name(&method, FunctionName::Key(&key), None);
                    self.create_data_property(&obj, key, JsValue::Object(method));
                }
                PropertyValue::Get(def) | PropertyValue::Set(def) => {
                    let is_getter = matches!(property.value, PropertyValue::Get(_));
                    let accessor = self.define_method(def, env, &obj);
                    let prefix = if is_getter { "get" } else { "set" };
                    self.set_function_name(&accessor, FunctionName::Key(&key), Some(prefix));
                    let mut desc = PropertyDescriptor {
                        enumerable: Some(true),
                        configurable: Some(true),
                        ..Default::default()
                    };
                    if is_getter {
                        desc.get = Some(JsValue::Object(accessor));
                    } else {
                        desc.set = Some(JsValue::Object(accessor));
                    }
                    throw_on_err!(self.define_property_or_throw(&obj, key, desc));
                }
            }
        }
        Completion::Normal(JsValue::Object(obj))
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

    fn boolean(source: &str) -> bool {
        match eval(source) {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("{source}: expected a boolean, got {other:?}"),
        }
    }

    /// The `name` of the error a script throws.
    fn thrown(source: &str) -> String {
        let mut interp = Interpreter::new();
        match interp.eval_source(source) {
            Completion::Throw(JsValue::Object(obj)) => {
                let name = interp.get(&obj, &"name".into()).unwrap();
                name.to_string()
            }
            other => panic!("{source}: expected a thrown error, got {other:?}"),
        }
    }

    #[test]
    fn exponentiation_is_right_associative() {
        assert_eq!(number("2 ** 3 ** 2"), 512.0);
        assert_eq!(number("(2 ** 3) ** 2"), 64.0);
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(number("var called = false; function f() { called = true; return 3; } 1 || 2 && f()"), 1.0);
        assert!(!boolean("var called = false; function f() { called = true; return 3; } 1 || 2 && f(); called"));
        assert_eq!(number("0 && x"), 0.0);
        assert_eq!(number("null || 4"), 4.0);
    }

    #[test]
    fn arithmetic_and_coercion() {
        assert_eq!(number("1 + 2 * 3"), 7.0);
        assert_eq!(string("'a' + 1"), "a1");
        assert_eq!(string("1 + 2 + 'x'"), "3x");
        assert_eq!(number("'6' / '2'"), 3.0);
        assert_eq!(number("-7 % 3"), -1.0);
        assert_eq!(number("1 << 31 >>> 0"), 2147483648.0);
        assert_eq!(number("~5"), -6.0);
        assert!(number("undefined + 1").is_nan());
        assert_eq!(number("({ valueOf() { return 41; } }) + 1"), 42.0);
        assert_eq!(string("'' + { toString() { return 'obj'; } }"), "obj");
    }

    #[test]
    fn equality_and_relations() {
        assert!(boolean("null == undefined"));
        assert!(!boolean("null === undefined"));
        assert!(boolean("'1' == 1"));
        assert!(boolean("NaN != NaN"));
        assert!(boolean("'b' > 'a'"));
        assert!(!boolean("NaN <= 1"));
        assert!(boolean("2 >= 2"));
        assert!(boolean("1n < 2"));
        assert!(boolean("1n == 1"));
    }

    #[test]
    fn bigint_arithmetic_is_rejected() {
        assert_eq!(thrown("1n + 1n"), "TypeError");
        assert_eq!(thrown("1n + 1"), "TypeError");
        assert!(boolean("-1n < 0"));
    }

    #[test]
    fn typeof_and_void() {
        assert_eq!(string("typeof undeclared"), "undefined");
        assert_eq!(string("typeof null"), "object");
        assert_eq!(string("typeof function() {}"), "function");
        assert_eq!(string("typeof 1n"), "bigint");
        assert_eq!(string("typeof Symbol()"), "symbol");
        assert!(matches!(eval("void 1"), Completion::Normal(JsValue::Undefined)));
    }

    #[test]
    fn assignment_forms() {
        assert_eq!(number("var a = 1; a += 2; a"), 3.0);
        assert_eq!(number("var a = 2; a **= 3; a"), 8.0);
        assert_eq!(number("var a = 0; a ||= 5; a"), 5.0);
        assert_eq!(number("var a = 1; a &&= 7; a"), 7.0);
        assert_eq!(number("var o = {}; o.x = 1; o['y'] = 2; o.x + o.y"), 3.0);
        assert_eq!(number("var i = 1; var j = i++; i * 10 + j"), 21.0);
        assert_eq!(number("var i = 1; --i"), 0.0);
    }

    #[test]
    fn unresolvable_references() {
        assert_eq!(thrown("missing"), "ReferenceError");
        assert_eq!(thrown("'use strict'; undeclared = 1"), "ReferenceError");
        assert_eq!(thrown("'use strict'\nundeclared = 1; 'assigned'"), "ReferenceError");
        assert_eq!(string("function f() { 'use strict'\n return this; } typeof f()"), "undefined");
        assert_eq!(number("sloppyGlobal = 4; sloppyGlobal"), 4.0);
        assert_eq!(thrown("let t = t;"), "ReferenceError");
        assert_eq!(thrown("const c = 1; c = 2;"), "TypeError");
    }

    #[test]
    fn member_access_on_nullish_throws() {
        assert_eq!(thrown("var u; u.x"), "TypeError");
        assert_eq!(thrown("null.x = 1"), "TypeError");
        assert_eq!(thrown("var o = {}; o.f()"), "TypeError");
        assert_eq!(thrown("new 1"), "TypeError");
    }

    #[test]
    fn primitive_property_access() {
        assert_eq!(number("'abc'.length"), 3.0);
        assert_eq!(string("'abc'[1]"), "b");
        assert_eq!(string("(5).toString()"), "5");
        assert_eq!(thrown("'use strict'; 'abc'.length = 1"), "TypeError");
    }

    #[test]
    fn object_literals() {
        assert_eq!(number("var o = { a: 1, 'b': 2, 3: 3, ['c' + 'd']: 4 }; o.a + o.b + o[3] + o.cd"), 10.0);
        assert_eq!(number("var a = 5; ({ a }).a"), 5.0);
        assert_eq!(number("({ get x() { return 9; } }).x"), 9.0);
        assert_eq!(number("var o = { set x(v) { this.y = v * 2; } }; o.x = 4; o.y"), 8.0);
        assert_eq!(number("({ m() { return this.v; }, v: 6 }).m()"), 6.0);
        assert_eq!(string("({ m() {} }).m.name"), "m");
        assert_eq!(string("Object.getPrototypeOf({ get x() {} }) === Object.prototype ? 'ok' : 'no'"), "ok");
        assert!(boolean("var p = {}; Object.getPrototypeOf({ __proto__: p }) === p"));
    }

    #[test]
    fn function_names_are_inferred() {
        assert_eq!(string("var f = function() {}; f.name"), "f");
        assert_eq!(string("var o = { g: function() {} }; o.g.name"), "g");
        assert_eq!(string("var C = class {}; C.name"), "C");
        assert_eq!(string("var f = function named() {}; f.name"), "named");
    }

    #[test]
    fn delete_operator() {
        assert!(boolean("var o = { x: 1 }; delete o.x && !('x' in o)"));
        assert!(boolean("delete 1"));
        assert!(!boolean("var v = 1; delete v"));
        assert!(boolean("g = 1; delete g"));
        assert_eq!(thrown("'use strict'; delete Object.prototype"), "TypeError");
    }

    #[test]
    fn in_and_instanceof() {
        assert!(boolean("'toString' in {}"));
        assert_eq!(thrown("'x' in 1"), "TypeError");
        assert!(boolean("function F() {} new F() instanceof F"));
        assert!(boolean("({}) instanceof Object"));
        assert!(!boolean("1 instanceof Object"));
        assert_eq!(thrown("({}) instanceof {}"), "TypeError");
        assert!(boolean("var C = { [Symbol.hasInstance](v) { return v === 1; } }; 1 instanceof C"));
    }

    #[test]
    fn this_binding() {
        assert!(boolean("this === globalThis"));
        assert!(boolean("function f() { return this; } f() === globalThis"));
        assert!(boolean("function f() { 'use strict'; return this; } f() === undefined"));
        assert_eq!(string("function f() { return typeof this; } f.call(1)"), "object");
    }
}
