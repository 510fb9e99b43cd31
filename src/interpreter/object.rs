use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::Interpreter;
use super::types::{EnvRef, JsResult};
use crate::ast::{ClassDef, FunctionDef};
use crate::types::{JsBigInt, JsObject, JsString, JsSymbol, JsValue};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Symbol(JsSymbol),
}

impl PropertyKey {
    /// The array index this key denotes, if it is a canonical one.
    pub fn as_array_index(&self) -> Option<u32> {
        match self {
            PropertyKey::String(s) => s.as_array_index(),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn to_value(&self) -> JsValue {
        match self {
            PropertyKey::String(s) => JsValue::String(s.clone()),
            PropertyKey::Symbol(s) => JsValue::Symbol(s.clone()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(JsString::from_str(s))
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        PropertyKey::String(s)
    }
}

impl From<JsSymbol> for PropertyKey {
    fn from(s: JsSymbol) -> Self {
        PropertyKey::Symbol(s)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => write!(f, "{}", s.descriptive_string()),
        }
    }
}

/// A property as stored, or a partial descriptor as passed to
/// DefineOwnProperty. Stored properties always have every field of their
/// kind present.
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    pub fn accessor(get: JsValue, set: JsValue, enumerable: bool, configurable: bool) -> Self {
        Self {
            get: Some(get),
            set: Some(set),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    pub fn is_enumerable(&self) -> bool {
        self.enumerable == Some(true)
    }

    pub fn is_configurable(&self) -> bool {
        self.configurable == Some(true)
    }

    pub fn is_writable(&self) -> bool {
        self.writable == Some(true)
    }

    /// Fills absent fields with their defaults, as when a new property is
    /// created from a partial descriptor.
    fn completed(self) -> Self {
        let enumerable = Some(self.enumerable.unwrap_or(false));
        let configurable = Some(self.configurable.unwrap_or(false));
        if self.is_accessor_descriptor() {
            PropertyDescriptor {
                get: Some(self.get.unwrap_or(JsValue::Undefined)),
                set: Some(self.set.unwrap_or(JsValue::Undefined)),
                enumerable,
                configurable,
                ..Default::default()
            }
        } else {
            PropertyDescriptor {
                value: Some(self.value.unwrap_or(JsValue::Undefined)),
                writable: Some(self.writable.unwrap_or(false)),
                enumerable,
                configurable,
                ..Default::default()
            }
        }
    }
}

/// A private name; two class evaluations never share one even when the
/// spelling matches.
#[derive(Clone)]
pub struct PrivateName(Rc<str>);

impl PrivateName {
    pub fn new(description: &str) -> Self {
        PrivateName(Rc::from(description))
    }

    pub fn description(&self) -> &str {
        &self.0
    }
}

impl PartialEq for PrivateName {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for PrivateName {}

impl fmt::Debug for PrivateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub enum PrivateElement {
    Method(JsObject),
    Accessor {
        get: Option<JsObject>,
        set: Option<JsObject>,
    },
}

pub type NativeFn = fn(&mut Interpreter, &JsValue, &[JsValue], Option<&JsObject>) -> JsResult<JsValue>;

/// A built-in function. `new_target` is `None` for a plain call.
#[derive(Clone)]
pub struct NativeFunction {
    pub(crate) function: NativeFn,
    pub(crate) constructor: bool,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("constructor", &self.constructor)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub enum FunctionCode {
    Script(Rc<FunctionDef>),
    /// The implicit constructor of a class without one.
    DefaultConstructor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstructorKind {
    Base,
    Derived,
}

/// A function whose body is script code.
#[derive(Debug)]
pub struct OrdinaryFunction {
    pub(crate) code: FunctionCode,
    pub(crate) environment: EnvRef,
    pub(crate) strict: bool,
    pub(crate) home_object: Option<JsObject>,
    pub(crate) constructor: Option<ConstructorKind>,
    /// Set for class constructors, which cannot be called without `new`.
    pub(crate) class: Option<Rc<ClassDef>>,
    /// Private methods and accessors installed on every instance.
    pub(crate) private_methods: Vec<(PrivateName, PrivateElement)>,
}

impl OrdinaryFunction {
    pub(crate) fn source_text(&self) -> &str {
        match (&self.class, &self.code) {
            (Some(class), _) => &class.source_text,
            (None, FunctionCode::Script(def)) => &def.source_text,
            (None, FunctionCode::DefaultConstructor) => "constructor() {}",
        }
    }
}

#[derive(Debug)]
pub enum FunctionData {
    Ordinary(Box<OrdinaryFunction>),
    Native(NativeFunction),
}

/// Which internal methods beyond the ordinary ones an object has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub call: bool,
    pub construct: bool,
}

#[derive(Debug)]
pub enum ObjectKind {
    Ordinary,
    Function(FunctionData),
    Arguments,
    Error,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    BigInt(JsBigInt),
}

impl ObjectKind {
    /// Tag used by `Object.prototype.toString` and debug output.
    pub fn class_name(&self) -> &'static str {
        match self {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Arguments => "Arguments",
            ObjectKind::Error => "Error",
            ObjectKind::Boolean(_) => "Boolean",
            ObjectKind::Number(_) => "Number",
            ObjectKind::String(_) => "String",
            ObjectKind::Symbol(_) => "Symbol",
            ObjectKind::BigInt(_) => "BigInt",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            ObjectKind::Function(FunctionData::Ordinary(f)) => Capabilities {
                call: true,
                construct: f.constructor.is_some(),
            },
            ObjectKind::Function(FunctionData::Native(f)) => Capabilities {
                call: true,
                construct: f.constructor,
            },
            _ => Capabilities { call: false, construct: false },
        }
    }
}

#[derive(Debug)]
pub struct ObjectData {
    pub prototype: Option<JsObject>,
    pub extensible: bool,
    properties: FxHashMap<PropertyKey, PropertyDescriptor>,
    order: Vec<PropertyKey>,
    pub kind: ObjectKind,
    pub(crate) private_elements: Vec<(PrivateName, PrivateElement)>,
}

impl ObjectData {
    pub fn new(prototype: Option<JsObject>, kind: ObjectKind) -> Self {
        Self {
            prototype,
            extensible: true,
            properties: FxHashMap::default(),
            order: Vec::new(),
            kind,
            private_elements: Vec::new(),
        }
    }

    /// Own property as seen by [[GetOwnProperty]]; String wrappers expose
    /// their code units and length.
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        if let ObjectKind::String(s) = &self.kind {
            if let Some(index) = key.as_array_index()
                && let Some(unit) = s.at(index as usize)
            {
                return Some(PropertyDescriptor::data(JsValue::String(unit), false, true, false));
            }
            if *key == PropertyKey::from("length") {
                return Some(PropertyDescriptor::data(
                    JsValue::Number(s.len() as f64),
                    false,
                    false,
                    false,
                ));
            }
        }
        self.properties.get(key).cloned()
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.get_own_property(key).is_some()
    }

    /// ValidateAndApplyPropertyDescriptor against the current own property.
    pub fn define_own_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        let Some(current) = self.get_own_property(&key) else {
            if !self.extensible {
                return false;
            }
            self.order.push(key.clone());
            self.properties.insert(key, desc.completed());
            return true;
        };

        if !current.is_configurable() {
            if desc.is_configurable() {
                return false;
            }
            if desc.enumerable.is_some_and(|e| Some(e) != current.enumerable) {
                return false;
            }
            if !desc.is_generic_descriptor() && desc.is_accessor_descriptor() != current.is_accessor_descriptor() {
                return false;
            }
            if current.is_accessor_descriptor() {
                if desc.get.as_ref().is_some_and(|g| !same_object_or_undefined(g, current.get.as_ref())) {
                    return false;
                }
                if desc.set.as_ref().is_some_and(|s| !same_object_or_undefined(s, current.set.as_ref())) {
                    return false;
                }
            } else if !current.is_writable() {
                if desc.is_writable() {
                    return false;
                }
                if let Some(value) = &desc.value
                    && !current.value.as_ref().is_some_and(|v| super::helpers::same_value(v, value))
                {
                    return false;
                }
            }
        }

        // String wrapper indices and length are immutable and not stored.
        if !self.properties.contains_key(&key) {
            return true;
        }

        let updated = if desc.is_accessor_descriptor() && current.is_data_descriptor() {
            PropertyDescriptor {
                get: Some(desc.get.unwrap_or(JsValue::Undefined)),
                set: Some(desc.set.unwrap_or(JsValue::Undefined)),
                enumerable: desc.enumerable.or(current.enumerable),
                configurable: desc.configurable.or(current.configurable),
                ..Default::default()
            }
        } else if desc.is_data_descriptor() && current.is_accessor_descriptor() {
            PropertyDescriptor {
                value: Some(desc.value.unwrap_or(JsValue::Undefined)),
                writable: Some(desc.writable.unwrap_or(false)),
                enumerable: desc.enumerable.or(current.enumerable),
                configurable: desc.configurable.or(current.configurable),
                ..Default::default()
            }
        } else {
            PropertyDescriptor {
                value: desc.value.or(current.value),
                writable: desc.writable.or(current.writable),
                get: desc.get.or(current.get),
                set: desc.set.or(current.set),
                enumerable: desc.enumerable.or(current.enumerable),
                configurable: desc.configurable.or(current.configurable),
            }
        };
        self.properties.insert(key, updated);
        true
    }

    /// [[Delete]]: false only for a non-configurable own property.
    pub fn delete(&mut self, key: &PropertyKey) -> bool {
        match self.get_own_property(key) {
            None => true,
            Some(desc) if desc.is_configurable() => {
                self.properties.remove(key);
                self.order.retain(|k| k != key);
                true
            }
            Some(_) => false,
        }
    }

    /// [[OwnPropertyKeys]]: array indices ascending, then other strings and
    /// then symbols, each in creation order.
    pub fn own_property_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<u32> = self.order.iter().filter_map(PropertyKey::as_array_index).collect();
        if let ObjectKind::String(s) = &self.kind {
            indices.extend(0..s.len() as u32);
        }
        indices.sort_unstable();
        indices.dedup();

        let mut keys: Vec<PropertyKey> = indices
            .into_iter()
            .map(|i| PropertyKey::from(i.to_string().as_str()))
            .collect();
        if matches!(self.kind, ObjectKind::String(_)) {
            keys.push(PropertyKey::from("length"));
        }
        keys.extend(
            self.order
                .iter()
                .filter(|k| matches!(k, PropertyKey::String(_)) && k.as_array_index().is_none())
                .cloned(),
        );
        keys.extend(self.order.iter().filter(|k| matches!(k, PropertyKey::Symbol(_))).cloned());
        keys
    }

    pub fn function(&self) -> Option<&FunctionData> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn ordinary_function(&self) -> Option<&OrdinaryFunction> {
        match &self.kind {
            ObjectKind::Function(FunctionData::Ordinary(f)) => Some(f),
            _ => None,
        }
    }

    pub(crate) fn ordinary_function_mut(&mut self) -> Option<&mut OrdinaryFunction> {
        match &mut self.kind {
            ObjectKind::Function(FunctionData::Ordinary(f)) => Some(f),
            _ => None,
        }
    }

    pub(crate) fn find_private_element(&self, name: &PrivateName) -> Option<&PrivateElement> {
        self.private_elements.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Drops every outgoing reference so that reference cycles through
    /// this object are broken.
    pub(crate) fn clear(&mut self) {
        self.prototype = None;
        self.properties.clear();
        self.order.clear();
        self.private_elements.clear();
        self.kind = ObjectKind::Ordinary;
    }
}

fn same_object_or_undefined(new: &JsValue, current: Option<&JsValue>) -> bool {
    match (new, current) {
        (JsValue::Undefined, None | Some(JsValue::Undefined)) => true,
        (JsValue::Object(a), Some(JsValue::Object(b))) => a == b,
        _ => false,
    }
}

impl JsObject {
    pub fn prototype(&self) -> Option<JsObject> {
        self.borrow().prototype.clone()
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.borrow().get_own_property(key)
    }

    pub fn define_own_property(&self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        self.borrow_mut().define_own_property(key, desc)
    }

    /// Defines a data property with the attributes used for built-in
    /// methods: writable and configurable but not enumerable.
    pub fn define_builtin(&self, key: impl Into<PropertyKey>, value: JsValue) {
        self.define_own_property(key.into(), PropertyDescriptor::data(value, true, false, true));
    }

    /// Looks `key` up along the prototype chain.
    pub fn find_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let mut current = self.clone();
        loop {
            if let Some(desc) = current.get_own_property(key) {
                return Some(desc);
            }
            current = current.prototype()?;
        }
    }

    pub fn has_property(&self, key: &PropertyKey) -> bool {
        self.find_property(key).is_some()
    }

    pub fn delete(&self, key: &PropertyKey) -> bool {
        self.borrow_mut().delete(key)
    }

    pub fn own_property_keys(&self) -> Vec<PropertyKey> {
        self.borrow().own_property_keys()
    }

    /// OrdinarySetPrototypeOf: refuses cycles and changes to
    /// non-extensible objects.
    pub fn set_prototype_of(&self, prototype: Option<JsObject>) -> bool {
        if self.prototype() == prototype {
            return true;
        }
        if !self.borrow().extensible {
            return false;
        }
        let mut p = prototype.clone();
        while let Some(candidate) = p {
            if candidate == *self {
                return false;
            }
            p = candidate.prototype();
        }
        self.borrow_mut().prototype = prototype;
        true
    }

    pub fn capabilities(&self) -> Capabilities {
        self.borrow().kind.capabilities()
    }

    pub fn is_callable(&self) -> bool {
        self.capabilities().call
    }

    pub fn is_constructor(&self) -> bool {
        self.capabilities().construct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object() -> JsObject {
        JsObject::from_data(ObjectData::new(None, ObjectKind::Ordinary))
    }

    fn number(desc: &PropertyDescriptor) -> f64 {
        match desc.value {
            Some(JsValue::Number(n)) => n,
            ref other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn partial_descriptors_default_to_false() {
        let o = object();
        assert!(o.define_own_property(
            "x".into(),
            PropertyDescriptor { value: Some(JsValue::Number(1.0)), ..Default::default() }
        ));
        let desc = o.get_own_property(&"x".into()).unwrap();
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.enumerable, Some(false));
        assert_eq!(desc.configurable, Some(false));
        assert!(desc.get.is_none());
    }

    #[test]
    fn non_configurable_rejects_incompatible_redefinition() {
        let o = object();
        o.define_own_property("x".into(), PropertyDescriptor::data(JsValue::Number(1.0), false, false, false));
        assert!(!o.define_own_property("x".into(), PropertyDescriptor::data(JsValue::Number(2.0), false, false, false)));
        assert!(!o.define_own_property(
            "x".into(),
            PropertyDescriptor { configurable: Some(true), ..Default::default() }
        ));
        assert!(!o.define_own_property(
            "x".into(),
            PropertyDescriptor { get: Some(JsValue::Undefined), ..Default::default() }
        ));
        // same value is accepted
        assert!(o.define_own_property(
            "x".into(),
            PropertyDescriptor { value: Some(JsValue::Number(1.0)), ..Default::default() }
        ));
        assert_eq!(number(&o.get_own_property(&"x".into()).unwrap()), 1.0);
        assert!(!o.delete(&"x".into()));
    }

    #[test]
    fn configurable_property_converts_between_kinds() {
        let o = object();
        o.define_own_property("p".into(), PropertyDescriptor::data(JsValue::Number(1.0), true, true, true));
        assert!(o.define_own_property(
            "p".into(),
            PropertyDescriptor { get: Some(JsValue::Undefined), ..Default::default() }
        ));
        let desc = o.get_own_property(&"p".into()).unwrap();
        assert!(desc.is_accessor_descriptor() && !desc.is_data_descriptor());
        assert!(matches!(desc.set, Some(JsValue::Undefined)));
        assert_eq!(desc.enumerable, Some(true));
        assert!(o.delete(&"p".into()));
        assert!(o.get_own_property(&"p".into()).is_none());
    }

    #[test]
    fn non_extensible_objects_reject_new_properties() {
        let o = object();
        o.borrow_mut().extensible = false;
        assert!(!o.define_own_property("x".into(), PropertyDescriptor::data(JsValue::Null, true, true, true)));
        assert!(!o.set_prototype_of(Some(object())));
    }

    #[test]
    fn key_order() {
        let o = object();
        let sym = JsSymbol::new(None);
        for key in [PropertyKey::from("b"), PropertyKey::Symbol(sym.clone()), "2".into(), "a".into(), "0".into()] {
            o.define_own_property(key, PropertyDescriptor::data(JsValue::Null, true, true, true));
        }
        let keys: Vec<String> = o.own_property_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "2", "b", "a", "Symbol()"]);
    }

    #[test]
    fn prototype_chain_lookup_and_cycles() {
        let proto = object();
        let o = object();
        proto.define_own_property("x".into(), PropertyDescriptor::data(JsValue::Number(5.0), true, true, true));
        assert!(o.set_prototype_of(Some(proto.clone())));
        assert!(o.has_property(&"x".into()));
        assert!(o.get_own_property(&"x".into()).is_none());
        assert_eq!(number(&o.find_property(&"x".into()).unwrap()), 5.0);
        assert!(!proto.set_prototype_of(Some(o.clone())));
    }

    #[test]
    fn string_wrappers_expose_indices_and_length() {
        let s = JsObject::from_data(ObjectData::new(None, ObjectKind::String(JsString::from_str("hi"))));
        let first = s.get_own_property(&"0".into()).unwrap();
        assert!(matches!(first.value, Some(JsValue::String(ref c)) if c.to_rust_string() == "h"));
        assert_eq!(number(&s.get_own_property(&"length".into()).unwrap()), 2.0);
        assert!(s.get_own_property(&"2".into()).is_none());
        assert!(!s.delete(&"length".into()));
        assert!(!s.define_own_property("0".into(), PropertyDescriptor::data(JsValue::Null, true, true, true)));
        let keys: Vec<String> = s.own_property_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "1", "length"]);
    }

    #[test]
    fn capabilities_follow_kind() {
        assert_eq!(ObjectKind::Ordinary.capabilities(), Capabilities { call: false, construct: false });
        fn noop(_: &mut Interpreter, _: &JsValue, _: &[JsValue], _: Option<&JsObject>) -> JsResult<JsValue> {
            Ok(JsValue::Undefined)
        }
        let native = ObjectKind::Function(FunctionData::Native(NativeFunction { function: noop, constructor: false }));
        assert_eq!(native.capabilities(), Capabilities { call: true, construct: false });
        assert_eq!(native.class_name(), "Function");
    }
}
