use super::arg;
use crate::interpreter::Interpreter;
use crate::interpreter::object::{NativeFn, ObjectData, ObjectKind, PropertyKey};
use crate::interpreter::realm::ErrorKind;
use crate::interpreter::types::JsResult;
use crate::types::{JsObject, JsValue};

/// The shared body of the Error constructors.
fn construct_error(
    interp: &mut Interpreter,
    kind: ErrorKind,
    args: &[JsValue],
    new_target: Option<&JsObject>,
) -> JsResult<JsValue> {
    let intrinsic = interp.intrinsics().error_prototype(kind).clone();
    let proto = match new_target {
        Some(target) => match interp.get(target, &"prototype".into())? {
            JsValue::Object(proto) => proto,
            _ => intrinsic,
        },
        None => intrinsic,
    };
    let obj = interp.alloc(ObjectData::new(Some(proto), ObjectKind::Error));

    let message = arg(args, 0);
    if !message.is_undefined() {
        let message = interp.to_string(&message)?;
        obj.define_builtin("message", JsValue::String(message));
    }
    // InstallErrorCause
    if let JsValue::Object(options) = arg(args, 1) {
        let cause: PropertyKey = "cause".into();
        if options.has_property(&cause) {
            let value = interp.get(&options, &cause)?;
            obj.define_builtin(cause, value);
        }
    }
    Ok(JsValue::Object(obj))
}

impl Interpreter {
    pub(super) fn setup_errors(&mut self) {
        let constructors: [(ErrorKind, NativeFn); 5] = [
            (ErrorKind::Error, |interp, _, args, nt| construct_error(interp, ErrorKind::Error, args, nt)),
            (ErrorKind::Type, |interp, _, args, nt| construct_error(interp, ErrorKind::Type, args, nt)),
            (ErrorKind::Range, |interp, _, args, nt| construct_error(interp, ErrorKind::Range, args, nt)),
            (ErrorKind::Reference, |interp, _, args, nt| {
                construct_error(interp, ErrorKind::Reference, args, nt)
            }),
            (ErrorKind::Syntax, |interp, _, args, nt| construct_error(interp, ErrorKind::Syntax, args, nt)),
        ];

        let mut base_ctor = None;
        for (kind, function) in constructors {
            let ctor = self.create_native_function(kind.name(), 1, function, true);
            let proto = self.intrinsics().error_prototype(kind).clone();
            self.link_constructor(&ctor, &proto);
            proto.define_builtin("name", JsValue::from_str(kind.name()));
            proto.define_builtin("message", JsValue::from_str(""));
            match &base_ctor {
                // NativeError constructors inherit from %Error%.
                Some(base) => {
                    ctor.borrow_mut().prototype = Some(JsObject::clone(base));
                }
                None => base_ctor = Some(ctor.clone()),
            }
            self.define_global(kind.name(), JsValue::Object(ctor));
        }

        let error_proto = self.intrinsics().error_prototype.clone();
        self.define_native_method(&error_proto, "toString", 0, |interp, this, _args, _| {
            let JsValue::Object(obj) = this else {
                return Err(interp.type_error("Error.prototype.toString requires that 'this' be an Object"));
            };
            let name = match interp.get(obj, &"name".into())? {
                JsValue::Undefined => "Error".to_string(),
                other => interp.to_string(&other)?.to_rust_string(),
            };
            let message = match interp.get(obj, &"message".into())? {
                JsValue::Undefined => String::new(),
                other => interp.to_string(&other)?.to_rust_string(),
            };
            let text = match (name.is_empty(), message.is_empty()) {
                (true, _) => message,
                (false, true) => name,
                (false, false) => format!("{name}: {message}"),
            };
            Ok(JsValue::from_str(&text))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{boolean, string};

    #[test]
    fn error_objects() {
        assert_eq!(string("new Error('boom').message"), "boom");
        assert_eq!(string("'' + new TypeError('bad')"), "TypeError: bad");
        assert_eq!(string("'' + RangeError()"), "RangeError");
        assert_eq!(string("var e = new Error('m'); e.name = ''; e.toString()"), "m");
        assert!(!boolean("new Error('m').propertyIsEnumerable('message')"));
        assert!(!boolean("new Error().hasOwnProperty('message')"));
        assert!(boolean("new Error('x', { cause: 1 }).cause === 1"));
    }

    #[test]
    fn error_hierarchy() {
        assert!(boolean("new SyntaxError() instanceof Error"));
        assert!(boolean("Object.getPrototypeOf(ReferenceError) === Error"));
        assert!(boolean("Object.getPrototypeOf(TypeError.prototype) === Error.prototype"));
        assert!(boolean("TypeError.prototype.constructor === TypeError"));
        assert_eq!(string("try { null.f(); } catch (e) { e.constructor.name }"), "TypeError");
    }

    #[test]
    fn errors_can_be_subclassed() {
        let source = "
            class AppError extends Error {
                constructor(msg) { super(msg); }
                describe() { return 'app: ' + this.message; }
            }
            var e = new AppError('oops');
            e.describe() + ',' + (e instanceof Error) + ',' + (e instanceof AppError)";
        assert_eq!(string(source), "app: oops,true,true");
    }
}
