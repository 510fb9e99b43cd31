use tracing::debug;

use super::Interpreter;
use super::gc::Heap;
use super::object::{FunctionData, NativeFunction, ObjectData, ObjectKind, PropertyDescriptor};
use super::types::{EnvRef, Environment, JsResult};
use crate::types::{JsBigInt, JsObject, JsString, JsSymbol, JsValue};

/// The native error constructors and their prototypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    Type,
    Range,
    Reference,
    Syntax,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::Type,
        ErrorKind::Range,
        ErrorKind::Reference,
        ErrorKind::Syntax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::Type => "TypeError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Syntax => "SyntaxError",
        }
    }
}

/// Well-known intrinsic objects of one realm.
#[derive(Debug)]
pub struct Intrinsics {
    pub object_prototype: JsObject,
    pub function_prototype: JsObject,
    pub error_prototype: JsObject,
    pub type_error_prototype: JsObject,
    pub range_error_prototype: JsObject,
    pub reference_error_prototype: JsObject,
    pub syntax_error_prototype: JsObject,
    pub boolean_prototype: JsObject,
    pub number_prototype: JsObject,
    pub string_prototype: JsObject,
    pub symbol_prototype: JsObject,
    pub bigint_prototype: JsObject,
    /// %ThrowTypeError%, the accessor guarding `arguments.callee` in
    /// strict functions.
    pub throw_type_error: JsObject,
}

impl Intrinsics {
    pub fn error_prototype(&self, kind: ErrorKind) -> &JsObject {
        match kind {
            ErrorKind::Error => &self.error_prototype,
            ErrorKind::Type => &self.type_error_prototype,
            ErrorKind::Range => &self.range_error_prototype,
            ErrorKind::Reference => &self.reference_error_prototype,
            ErrorKind::Syntax => &self.syntax_error_prototype,
        }
    }
}

/// A realm: intrinsics, the global object and the global environment.
/// Every object is allocated on the realm's heap.
#[derive(Debug)]
pub struct Realm {
    pub intrinsics: Intrinsics,
    pub global_object: JsObject,
    pub global_env: EnvRef,
    pub(crate) heap: Heap,
}

fn function_prototype_call(_: &mut Interpreter, _: &JsValue, _: &[JsValue], _: Option<&JsObject>) -> JsResult<JsValue> {
    Ok(JsValue::Undefined)
}

fn throw_type_error(interp: &mut Interpreter, _: &JsValue, _: &[JsValue], _: Option<&JsObject>) -> JsResult<JsValue> {
    Err(interp.type_error(
        "'caller', 'callee', and 'arguments' properties may not be accessed on strict mode functions",
    ))
}

impl Realm {
    /// Allocates the intrinsic prototypes and an empty global object. The
    /// constructors and methods are installed by `builtins::install`.
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let object_prototype = heap.allocate(ObjectData::new(None, ObjectKind::Ordinary));
        let proto = |heap: &mut Heap, kind: ObjectKind| heap.allocate(ObjectData::new(Some(object_prototype.clone()), kind));

        let function_prototype = proto(
            &mut heap,
            ObjectKind::Function(FunctionData::Native(NativeFunction {
                function: function_prototype_call,
                constructor: false,
            })),
        );
        let error_prototype = proto(&mut heap, ObjectKind::Ordinary);
        let derived_error = |heap: &mut Heap| heap.allocate(ObjectData::new(Some(error_prototype.clone()), ObjectKind::Ordinary));
        let type_error_prototype = derived_error(&mut heap);
        let range_error_prototype = derived_error(&mut heap);
        let reference_error_prototype = derived_error(&mut heap);
        let syntax_error_prototype = derived_error(&mut heap);

        let boolean_prototype = proto(&mut heap, ObjectKind::Boolean(false));
        let number_prototype = proto(&mut heap, ObjectKind::Number(0.0));
        let string_prototype = proto(&mut heap, ObjectKind::String(JsString::default()));
        let symbol_prototype = proto(&mut heap, ObjectKind::Ordinary);
        let bigint_prototype = proto(&mut heap, ObjectKind::Ordinary);

        let throw_type_error = heap.allocate(ObjectData::new(
            Some(function_prototype.clone()),
            ObjectKind::Function(FunctionData::Native(NativeFunction {
                function: throw_type_error,
                constructor: false,
            })),
        ));
        throw_type_error.define_own_property("length".into(), PropertyDescriptor::data(JsValue::Number(0.0), false, false, false));
        throw_type_error.define_own_property("name".into(), PropertyDescriptor::data(JsValue::from_str(""), false, false, false));
        throw_type_error.borrow_mut().extensible = false;

        let global_object = proto(&mut heap, ObjectKind::Ordinary);
        let global_env = Environment::new_global(global_object.clone());
        debug!("realm created");

        Realm {
            intrinsics: Intrinsics {
                object_prototype,
                function_prototype,
                error_prototype,
                type_error_prototype,
                range_error_prototype,
                reference_error_prototype,
                syntax_error_prototype,
                boolean_prototype,
                number_prototype,
                string_prototype,
                symbol_prototype,
                bigint_prototype,
                throw_type_error,
            },
            global_object,
            global_env,
            heap,
        }
    }

    pub fn allocate(&mut self, data: ObjectData) -> JsObject {
        self.heap.allocate(data)
    }

    /// The prototype a wrapper object for `value` gets from ToObject.
    pub(crate) fn wrapper_prototype(&self, value: &JsValue) -> JsObject {
        let i = &self.intrinsics;
        match value {
            JsValue::Boolean(_) => i.boolean_prototype.clone(),
            JsValue::Number(_) => i.number_prototype.clone(),
            JsValue::String(_) => i.string_prototype.clone(),
            JsValue::Symbol(_) => i.symbol_prototype.clone(),
            JsValue::BigInt(_) => i.bigint_prototype.clone(),
            _ => i.object_prototype.clone(),
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrapper kind for a primitive, as created by ToObject.
pub(crate) fn wrapper_kind(value: &JsValue) -> ObjectKind {
    match value {
        JsValue::Boolean(b) => ObjectKind::Boolean(*b),
        JsValue::Number(n) => ObjectKind::Number(*n),
        JsValue::String(s) => ObjectKind::String(s.clone()),
        JsValue::Symbol(s) => ObjectKind::Symbol(JsSymbol::clone(s)),
        JsValue::BigInt(b) => ObjectKind::BigInt(JsBigInt::clone(b)),
        _ => ObjectKind::Ordinary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prototypes_are_linked() {
        let realm = Realm::new();
        let i = &realm.intrinsics;
        assert_eq!(i.function_prototype.prototype(), Some(i.object_prototype.clone()));
        assert_eq!(i.type_error_prototype.prototype(), Some(i.error_prototype.clone()));
        assert_eq!(i.object_prototype.prototype(), None);
        assert!(i.function_prototype.is_callable());
        assert!(!i.function_prototype.is_constructor());
        assert_eq!(realm.global_object.prototype(), Some(i.object_prototype.clone()));
    }

    #[test]
    fn realms_are_isolated() {
        let a = Realm::new();
        let b = Realm::new();
        assert_ne!(a.intrinsics.object_prototype, b.intrinsics.object_prototype);
        assert_ne!(a.global_object, b.global_object);
    }
}
