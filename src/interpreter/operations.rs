//! Abstract operations of the object and value model: property access,
//! type conversion, comparison and error creation.

use std::cmp::Ordering;

use num_bigint::BigInt;

use super::Interpreter;
use super::helpers::{compare_bigint_number, strict_equality, string_to_bigint, string_to_number, to_boolean};
use super::object::{ObjectData, ObjectKind, PropertyDescriptor, PropertyKey};
use super::realm::{ErrorKind, Intrinsics, wrapper_kind};
use super::types::JsResult;
use crate::types::{JsObject, JsString, JsValue, number_ops};

/// Hint passed to ToPrimitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    String,
    Number,
}

impl PreferredType {
    fn as_str(self) -> &'static str {
        match self {
            PreferredType::Default => "default",
            PreferredType::String => "string",
            PreferredType::Number => "number",
        }
    }
}

/// Result of ToNumeric.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Numeric {
    Number(f64),
    BigInt(BigInt),
}

impl Interpreter {
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.realm.intrinsics
    }

    pub fn global_object(&self) -> JsObject {
        self.realm.global_object.clone()
    }

    pub(crate) fn alloc(&mut self, data: ObjectData) -> JsObject {
        self.realm.allocate(data)
    }

    /// OrdinaryObjectCreate.
    pub fn ordinary_object(&mut self, prototype: Option<JsObject>) -> JsObject {
        self.alloc(ObjectData::new(prototype, ObjectKind::Ordinary))
    }

    /// A plain object inheriting from Object.prototype.
    pub fn new_object(&mut self) -> JsObject {
        let proto = self.intrinsics().object_prototype.clone();
        self.ordinary_object(Some(proto))
    }

    // ----- errors -----

    pub fn create_error(&mut self, kind: ErrorKind, message: &str) -> JsValue {
        let proto = self.intrinsics().error_prototype(kind).clone();
        let obj = self.alloc(ObjectData::new(Some(proto), ObjectKind::Error));
        obj.define_builtin("message", JsValue::from_str(message));
        JsValue::Object(obj)
    }

    pub fn type_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::Type, message)
    }

    pub fn range_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::Range, message)
    }

    pub fn reference_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::Reference, message)
    }

    pub fn syntax_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::Syntax, message)
    }

    // ----- property access -----

    /// [[Get]] with the object itself as receiver.
    pub fn get(&mut self, obj: &JsObject, key: &PropertyKey) -> JsResult<JsValue> {
        self.get_with_receiver(obj, key, &JsValue::Object(obj.clone()))
    }

    pub(crate) fn get_with_receiver(&mut self, obj: &JsObject, key: &PropertyKey, receiver: &JsValue) -> JsResult<JsValue> {
        let Some(desc) = obj.find_property(key) else {
            return Ok(JsValue::Undefined);
        };
        if desc.is_accessor_descriptor() {
            return match desc.get {
                Some(JsValue::Object(getter)) => self.call_object(&getter, receiver, &[]),
                _ => Ok(JsValue::Undefined),
            };
        }
        Ok(desc.value.unwrap_or(JsValue::Undefined))
    }

    /// GetV: property lookup on any value, with primitives looked up on
    /// their wrapper prototype but kept as the receiver.
    pub(crate) fn get_v(&mut self, base: &JsValue, key: &PropertyKey) -> JsResult<JsValue> {
        match base {
            JsValue::Object(obj) => self.get_with_receiver(obj, key, base),
            JsValue::Undefined | JsValue::Null => Err(self.type_error(&format!(
                "Cannot read properties of {base} (reading '{key}')"
            ))),
            _ => {
                if let JsValue::String(s) = base
                    && let Some(value) = string_own_value(s, key)
                {
                    return Ok(value);
                }
                let proto = self.realm.wrapper_prototype(base);
                self.get_with_receiver(&proto, key, base)
            }
        }
    }

    /// OrdinarySet. Returns false where the assignment is refused.
    pub(crate) fn set_with_receiver(
        &mut self,
        obj: &JsObject,
        key: PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> JsResult<bool> {
        let own_desc = obj
            .find_property(&key)
            .unwrap_or_else(|| PropertyDescriptor::data(JsValue::Undefined, true, true, true));

        if own_desc.is_accessor_descriptor() {
            return match own_desc.set {
                Some(JsValue::Object(setter)) => {
                    self.call_object(&setter, receiver, &[value])?;
                    Ok(true)
                }
                _ => Ok(false),
            };
        }
        if !own_desc.is_writable() {
            return Ok(false);
        }
        let JsValue::Object(receiver) = receiver else {
            return Ok(false);
        };
        match receiver.get_own_property(&key) {
            Some(existing) if existing.is_accessor_descriptor() || !existing.is_writable() => Ok(false),
            Some(_) => Ok(receiver.define_own_property(
                key,
                PropertyDescriptor {
                    value: Some(value),
                    ..Default::default()
                },
            )),
            None => Ok(receiver.define_own_property(key, PropertyDescriptor::data(value, true, true, true))),
        }
    }

    /// Set(O, P, V, Throw).
    pub fn set(&mut self, obj: &JsObject, key: PropertyKey, value: JsValue, should_throw: bool) -> JsResult<()> {
        let receiver = JsValue::Object(obj.clone());
        self.set_v(&receiver, key, value, should_throw)
    }

    /// PutValue on a property reference: primitives forward to their
    /// wrapper prototype and can never gain own properties.
    pub(crate) fn set_v(&mut self, base: &JsValue, key: PropertyKey, value: JsValue, should_throw: bool) -> JsResult<()> {
        let obj = match base {
            JsValue::Object(obj) => obj.clone(),
            JsValue::String(s) if string_own_value(s, &key).is_some() => {
                return self.refuse_set(should_throw, &key, base);
            }
            _ => self.to_object(base)?,
        };
        let ok = self.set_with_receiver(&obj, key.clone(), value, base)?;
        if ok { Ok(()) } else { self.refuse_set(should_throw, &key, base) }
    }

    fn refuse_set(&mut self, should_throw: bool, key: &PropertyKey, base: &JsValue) -> JsResult<()> {
        if !should_throw {
            return Ok(());
        }
        let target = match base {
            JsValue::Object(_) => "object".to_string(),
            other => format!("'{other}'"),
        };
        Err(self.type_error(&format!("Cannot assign to read only property '{key}' of {target}")))
    }

    pub fn define_property_or_throw(&mut self, obj: &JsObject, key: PropertyKey, desc: PropertyDescriptor) -> JsResult<()> {
        if obj.define_own_property(key.clone(), desc) {
            Ok(())
        } else {
            Err(self.type_error(&format!("Cannot redefine property: {key}")))
        }
    }

    /// CreateDataProperty: an enumerable, writable, configurable own
    /// property.
    pub fn create_data_property(&mut self, obj: &JsObject, key: PropertyKey, value: JsValue) -> bool {
        obj.define_own_property(key, PropertyDescriptor::data(value, true, true, true))
    }

    /// GetPrototypeFromConstructor.
    pub(crate) fn get_prototype_from_constructor(
        &mut self,
        constructor: &JsObject,
        fallback: fn(&Intrinsics) -> &JsObject,
    ) -> JsResult<JsObject> {
        match self.get(constructor, &"prototype".into())? {
            JsValue::Object(proto) => Ok(proto),
            _ => Ok(fallback(self.intrinsics()).clone()),
        }
    }

    // ----- conversions -----

    /// ToPrimitive: `@@toPrimitive` first, then OrdinaryToPrimitive.
    pub fn to_primitive(&mut self, value: &JsValue, hint: PreferredType) -> JsResult<JsValue> {
        let JsValue::Object(obj) = value else {
            return Ok(value.clone());
        };
        let key = PropertyKey::Symbol(self.symbols.to_primitive.clone());
        let exotic = self.get(obj, &key)?;
        if !exotic.is_nullish() {
            let result = self.call(&exotic, value, &[JsValue::from_str(hint.as_str())])?;
            if result.is_object() {
                return Err(self.type_error("Cannot convert object to primitive value"));
            }
            return Ok(result);
        }
        let order = if hint == PreferredType::String {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        for name in order {
            let method = self.get(obj, &name.into())?;
            if let JsValue::Object(method) = &method
                && method.is_callable()
            {
                let result = self.call_object(method, value, &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(self.type_error("Cannot convert object to primitive value"))
    }

    pub fn to_number(&mut self, value: &JsValue) -> JsResult<f64> {
        match value {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            JsValue::Number(n) => Ok(*n),
            JsValue::String(s) => Ok(string_to_number(s)),
            JsValue::Symbol(_) => Err(self.type_error("Cannot convert a Symbol value to a number")),
            JsValue::BigInt(_) => Err(self.type_error("Cannot convert a BigInt value to a number")),
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::Number)?;
                self.to_number(&prim)
            }
        }
    }

    pub(crate) fn to_numeric(&mut self, value: &JsValue) -> JsResult<Numeric> {
        let prim = self.to_primitive(value, PreferredType::Number)?;
        if let JsValue::BigInt(b) = prim {
            return Ok(Numeric::BigInt(b.value));
        }
        Ok(Numeric::Number(self.to_number(&prim)?))
    }

    pub fn to_string(&mut self, value: &JsValue) -> JsResult<JsString> {
        match value {
            JsValue::String(s) => Ok(s.clone()),
            JsValue::Symbol(_) => Err(self.type_error("Cannot convert a Symbol value to a string")),
            JsValue::BigInt(b) => Ok(JsString::from_str(&b.value.to_string())),
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::String)?;
                self.to_string(&prim)
            }
            other => Ok(JsString::from_str(&other.to_string())),
        }
    }

    pub fn to_object(&mut self, value: &JsValue) -> JsResult<JsObject> {
        match value {
            JsValue::Object(obj) => Ok(obj.clone()),
            JsValue::Undefined | JsValue::Null => Err(self.type_error("Cannot convert undefined or null to object")),
            primitive => {
                let proto = self.realm.wrapper_prototype(primitive);
                Ok(self.alloc(ObjectData::new(Some(proto), wrapper_kind(primitive))))
            }
        }
    }

    pub fn to_property_key(&mut self, value: &JsValue) -> JsResult<PropertyKey> {
        match self.to_primitive(value, PreferredType::String)? {
            JsValue::Symbol(sym) => Ok(PropertyKey::Symbol(sym)),
            prim => Ok(PropertyKey::String(self.to_string(&prim)?)),
        }
    }

    // ----- comparison -----

    /// IsLooselyEqual (`==`).
    pub(crate) fn loosely_equal(&mut self, x: &JsValue, y: &JsValue) -> JsResult<bool> {
        if std::mem::discriminant(x) == std::mem::discriminant(y) {
            return Ok(strict_equality(x, y));
        }
        match (x, y) {
            (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => Ok(true),
            (JsValue::Number(n), JsValue::String(s)) | (JsValue::String(s), JsValue::Number(n)) => {
                Ok(*n == string_to_number(s))
            }
            (JsValue::BigInt(b), JsValue::String(s)) | (JsValue::String(s), JsValue::BigInt(b)) => {
                Ok(string_to_bigint(s).is_some_and(|parsed| parsed == b.value))
            }
            (JsValue::Boolean(_), _) => {
                let n = JsValue::Number(self.to_number(x)?);
                self.loosely_equal(&n, y)
            }
            (_, JsValue::Boolean(_)) => {
                let n = JsValue::Number(self.to_number(y)?);
                self.loosely_equal(x, &n)
            }
            (JsValue::Object(_), JsValue::String(_) | JsValue::Number(_) | JsValue::BigInt(_) | JsValue::Symbol(_)) => {
                let prim = self.to_primitive(x, PreferredType::Default)?;
                self.loosely_equal(&prim, y)
            }
            (JsValue::String(_) | JsValue::Number(_) | JsValue::BigInt(_) | JsValue::Symbol(_), JsValue::Object(_)) => {
                let prim = self.to_primitive(y, PreferredType::Default)?;
                self.loosely_equal(x, &prim)
            }
            (JsValue::BigInt(b), JsValue::Number(n)) | (JsValue::Number(n), JsValue::BigInt(b)) => {
                Ok(compare_bigint_number(&b.value, *n) == Some(Ordering::Equal))
            }
            _ => Ok(false),
        }
    }

    /// IsLessThan. `None` stands for undefined (a NaN was involved).
    pub(crate) fn is_less_than(&mut self, x: &JsValue, y: &JsValue, left_first: bool) -> JsResult<Option<bool>> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, PreferredType::Number)?;
            (px, self.to_primitive(y, PreferredType::Number)?)
        } else {
            let py = self.to_primitive(y, PreferredType::Number)?;
            (self.to_primitive(x, PreferredType::Number)?, py)
        };

        match (&px, &py) {
            (JsValue::String(a), JsValue::String(b)) => return Ok(Some(a.code_units < b.code_units)),
            (JsValue::BigInt(a), JsValue::String(b)) => {
                return Ok(string_to_bigint(b).map(|b| a.value < b));
            }
            (JsValue::String(a), JsValue::BigInt(b)) => {
                return Ok(string_to_bigint(a).map(|a| a < b.value));
            }
            _ => {}
        }

        let nx = self.to_numeric(&px)?;
        let ny = self.to_numeric(&py)?;
        Ok(match (nx, ny) {
            (Numeric::Number(a), Numeric::Number(b)) => number_ops::less_than(a, b),
            (Numeric::BigInt(a), Numeric::BigInt(b)) => Some(a < b),
            (Numeric::BigInt(a), Numeric::Number(b)) => compare_bigint_number(&a, b).map(|o| o == Ordering::Less),
            (Numeric::Number(a), Numeric::BigInt(b)) => compare_bigint_number(&b, a).map(|o| o == Ordering::Greater),
        })
    }

    /// InstanceofOperator.
    pub(crate) fn instance_of(&mut self, value: &JsValue, target: &JsValue) -> JsResult<bool> {
        let JsValue::Object(target_obj) = target else {
            return Err(self.type_error("Right-hand side of 'instanceof' is not an object"));
        };
        let key = PropertyKey::Symbol(self.symbols.has_instance.clone());
        let handler = self.get(target_obj, &key)?;
        if !handler.is_nullish() {
            let result = self.call(&handler, target, std::slice::from_ref(value))?;
            return Ok(to_boolean(&result));
        }
        if !target_obj.is_callable() {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        }
        self.ordinary_has_instance(target, value)
    }

    pub(crate) fn ordinary_has_instance(&mut self, constructor: &JsValue, value: &JsValue) -> JsResult<bool> {
        let JsValue::Object(c) = constructor else {
            return Ok(false);
        };
        if !c.is_callable() {
            return Ok(false);
        }
        let JsValue::Object(obj) = value else {
            return Ok(false);
        };
        let JsValue::Object(proto) = self.get(c, &"prototype".into())? else {
            return Err(self.type_error("Function has non-object prototype in instanceof check"));
        };
        let mut current = obj.prototype();
        while let Some(p) = current {
            if p == proto {
                return Ok(true);
            }
            current = p.prototype();
        }
        Ok(false)
    }

    // ----- property descriptors -----

    /// ToPropertyDescriptor.
    pub(crate) fn to_property_descriptor(&mut self, value: &JsValue) -> JsResult<PropertyDescriptor> {
        let JsValue::Object(obj) = value else {
            return Err(self.type_error("Property description must be an object"));
        };
        let mut desc = PropertyDescriptor::default();
        let field = |interp: &mut Self, name: &str| -> JsResult<Option<JsValue>> {
            let key = PropertyKey::from(name);
            if obj.has_property(&key) { interp.get(obj, &key).map(Some) } else { Ok(None) }
        };
        desc.enumerable = field(self, "enumerable")?.map(|v| to_boolean(&v));
        desc.configurable = field(self, "configurable")?.map(|v| to_boolean(&v));
        desc.value = field(self, "value")?;
        desc.writable = field(self, "writable")?.map(|v| to_boolean(&v));
        for (name, slot) in [("get", &mut desc.get), ("set", &mut desc.set)] {
            if let Some(accessor) = field(self, name)? {
                let callable = accessor.as_object().is_some_and(JsObject::is_callable);
                if !callable && !accessor.is_undefined() {
                    let kind = if name == "get" { "Getter" } else { "Setter" };
                    return Err(self.type_error(&format!("{kind} must be a function: {accessor}")));
                }
                *slot = Some(accessor);
            }
        }
        if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
            return Err(self.type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(desc)
    }

    /// FromPropertyDescriptor.
    pub(crate) fn from_property_descriptor(&mut self, desc: Option<PropertyDescriptor>) -> JsValue {
        let Some(desc) = desc else {
            return JsValue::Undefined;
        };
        let obj = self.new_object();
        let fields = [
            ("value", desc.value),
            ("writable", desc.writable.map(JsValue::Boolean)),
            ("get", desc.get),
            ("set", desc.set),
            ("enumerable", desc.enumerable.map(JsValue::Boolean)),
            ("configurable", desc.configurable.map(JsValue::Boolean)),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                self.create_data_property(&obj, name.into(), value);
            }
        }
        JsValue::Object(obj)
    }
}

/// Index and length properties of a string primitive.
fn string_own_value(s: &JsString, key: &PropertyKey) -> Option<JsValue> {
    if *key == PropertyKey::from("length") {
        return Some(JsValue::Number(s.len() as f64));
    }
    let index = key.as_array_index()?;
    s.at(index as usize).map(JsValue::String)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::object::PropertyDescriptor;

    fn interp() -> Interpreter {
        Interpreter::new()
    }

    fn number(value: JsResult<JsValue>) -> f64 {
        match value {
            Ok(JsValue::Number(n)) => n,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    fn is_type_error(interp: &mut Interpreter, thrown: &JsValue) -> bool {
        let JsValue::Object(obj) = thrown else { return false };
        obj.prototype() == Some(interp.intrinsics().type_error_prototype.clone())
    }

    #[test]
    fn get_and_set_through_the_prototype_chain() {
        let mut interp = interp();
        let p = interp.new_object();
        let o = interp.ordinary_object(Some(p.clone()));
        p.define_own_property("x".into(), PropertyDescriptor::data(JsValue::Number(5.0), true, true, true));

        assert_eq!(number(interp.get(&o, &"x".into())), 5.0);
        interp.set(&o, "x".into(), JsValue::Number(7.0), true).unwrap();
        assert!(o.get_own_property(&"x".into()).is_some());
        assert_eq!(number(interp.get(&o, &"x".into())), 7.0);
        assert_eq!(number(interp.get(&p, &"x".into())), 5.0);
    }

    #[test]
    fn non_writable_set_throws_and_keeps_value() {
        let mut interp = interp();
        let o = interp.new_object();
        o.define_own_property("x".into(), PropertyDescriptor::data(JsValue::Number(1.0), false, true, true));

        let err = interp.set(&o, "x".into(), JsValue::Number(2.0), true).unwrap_err();
        assert!(is_type_error(&mut interp, &err));
        assert_eq!(number(interp.get(&o, &"x".into())), 1.0);

        // without shouldThrow the failure is silent
        assert!(interp.set(&o, "x".into(), JsValue::Number(3.0), false).is_ok());
        assert_eq!(number(interp.get(&o, &"x".into())), 1.0);
    }

    #[test]
    fn inherited_non_writable_blocks_shadowing() {
        let mut interp = interp();
        let p = interp.new_object();
        p.define_own_property("x".into(), PropertyDescriptor::data(JsValue::Number(1.0), false, true, true));
        let o = interp.ordinary_object(Some(p));
        assert!(interp.set(&o, "x".into(), JsValue::Number(2.0), true).is_err());
        assert!(o.get_own_property(&"x".into()).is_none());
    }

    #[test]
    fn primitive_conversions() {
        let mut interp = interp();
        assert!(interp.to_number(&JsValue::Undefined).unwrap().is_nan());
        assert_eq!(interp.to_number(&JsValue::from_str(" 12 ")).unwrap(), 12.0);
        assert_eq!(interp.to_string(&JsValue::Number(-0.0)).unwrap().to_rust_string(), "0");
        assert_eq!(interp.to_string(&JsValue::Null).unwrap().to_rust_string(), "null");
        let sym = JsValue::Symbol(crate::types::JsSymbol::new(None));
        let err = interp.to_number(&sym).unwrap_err();
        assert!(is_type_error(&mut interp, &err));
        assert!(interp.to_string(&sym).is_err());
        assert!(interp.to_object(&JsValue::Null).is_err());
        let wrapper = interp.to_object(&JsValue::from_str("ab")).unwrap();
        assert_eq!(number(interp.get(&wrapper, &"length".into())), 2.0);
    }

    #[test]
    fn loose_equality_table() {
        let mut interp = interp();
        let eq = |interp: &mut Interpreter, a: JsValue, b: JsValue| interp.loosely_equal(&a, &b).unwrap();
        assert!(eq(&mut interp, JsValue::Null, JsValue::Undefined));
        assert!(eq(&mut interp, JsValue::Number(1.0), JsValue::from_str("1")));
        assert!(eq(&mut interp, JsValue::Boolean(true), JsValue::from_str("1")));
        assert!(!eq(&mut interp, JsValue::Null, JsValue::Number(0.0)));
        assert!(!eq(&mut interp, JsValue::Number(f64::NAN), JsValue::Number(f64::NAN)));
        let big = JsValue::BigInt(crate::types::JsBigInt { value: BigInt::from(3) });
        assert!(eq(&mut interp, big.clone(), JsValue::Number(3.0)));
        assert!(eq(&mut interp, big, JsValue::from_str("3")));
    }

    #[test]
    fn relational_comparison() {
        let mut interp = interp();
        assert_eq!(interp.is_less_than(&JsValue::from_str("a"), &JsValue::from_str("b"), true).unwrap(), Some(true));
        assert_eq!(interp.is_less_than(&JsValue::from_str("10"), &JsValue::Number(9.0), true).unwrap(), Some(false));
        assert_eq!(interp.is_less_than(&JsValue::Number(f64::NAN), &JsValue::Number(1.0), true).unwrap(), None);
    }

    #[test]
    fn descriptor_objects_round_trip_fields() {
        let mut interp = interp();
        let desc_obj = interp.new_object();
        interp.create_data_property(&desc_obj, "value".into(), JsValue::Number(1.0));
        interp.create_data_property(&desc_obj, "enumerable".into(), JsValue::Boolean(true));
        let desc = interp.to_property_descriptor(&JsValue::Object(desc_obj)).unwrap();
        assert!(desc.is_data_descriptor());
        assert_eq!(desc.enumerable, Some(true));
        assert_eq!(desc.writable, None);

        let bad = interp.new_object();
        interp.create_data_property(&bad, "get".into(), JsValue::Number(1.0));
        assert!(interp.to_property_descriptor(&JsValue::Object(bad)).is_err());
    }
}
