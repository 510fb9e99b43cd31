use super::arg;
use crate::interpreter::Interpreter;
use crate::interpreter::object::{ObjectKind, PropertyDescriptor, PropertyKey};
use crate::interpreter::types::JsResult;
use crate::types::{JsSymbol, JsValue};

fn this_symbol_value(interp: &mut Interpreter, this: &JsValue, method: &str) -> JsResult<JsSymbol> {
    let value = match this {
        JsValue::Symbol(sym) => Some(sym.clone()),
        JsValue::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Symbol(sym) => Some(sym.clone()),
            _ => None,
        },
        _ => None,
    };
    value.ok_or_else(|| interp.type_error(&format!("{method} requires that 'this' be a Symbol")))
}

impl Interpreter {
    pub(super) fn setup_symbol(&mut self) {
        let symbol_ctor = self.create_native_function(
            "Symbol",
            0,
            |interp, _this, args, new_target| {
                if new_target.is_some() {
                    return Err(interp.type_error("Symbol is not a constructor"));
                }
                let description = match arg(args, 0) {
                    JsValue::Undefined => None,
                    value => Some(interp.to_string(&value)?),
                };
                Ok(JsValue::Symbol(JsSymbol::new(description)))
            },
            true,
        );
        let proto = self.intrinsics().symbol_prototype.clone();
        self.link_constructor(&symbol_ctor, &proto);

        for (name, symbol) in [
            ("hasInstance", self.symbols.has_instance.clone()),
            ("toPrimitive", self.symbols.to_primitive.clone()),
            ("toStringTag", self.symbols.to_string_tag.clone()),
        ] {
            symbol_ctor.define_own_property(
                name.into(),
                PropertyDescriptor::data(JsValue::Symbol(symbol), false, false, false),
            );
        }

        self.define_native_method(&proto, "toString", 0, |interp, this, _args, _| {
            let sym = this_symbol_value(interp, this, "Symbol.prototype.toString")?;
            Ok(JsValue::from_str(&sym.descriptive_string()))
        });
        self.define_native_method(&proto, "valueOf", 0, |interp, this, _args, _| {
            this_symbol_value(interp, this, "Symbol.prototype.valueOf").map(JsValue::Symbol)
        });

        let description = self.create_native_function(
            "get description",
            0,
            |interp, this, _args, _| {
                let sym = this_symbol_value(interp, this, "Symbol.prototype.description")?;
                Ok(sym.description().cloned().map_or(JsValue::Undefined, JsValue::String))
            },
            false,
        );
        proto.define_own_property(
            "description".into(),
            PropertyDescriptor::accessor(JsValue::Object(description), JsValue::Undefined, false, true),
        );

        let to_primitive = self.create_native_function(
            "[Symbol.toPrimitive]",
            1,
            |interp, this, _args, _| {
                this_symbol_value(interp, this, "Symbol.prototype [ @@toPrimitive ]").map(JsValue::Symbol)
            },
            false,
        );
        let key = PropertyKey::Symbol(self.symbols.to_primitive.clone());
        proto.define_own_property(key, PropertyDescriptor::data(JsValue::Object(to_primitive), false, false, true));
        let tag = PropertyKey::Symbol(self.symbols.to_string_tag.clone());
        proto.define_own_property(tag, PropertyDescriptor::data(JsValue::from_str("Symbol"), false, false, true));

        self.define_global("Symbol", JsValue::Object(symbol_ctor));
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{boolean, string};

    #[test]
    fn symbol_identity_and_description() {
        assert!(boolean("Symbol('a') !== Symbol('a')"));
        assert!(boolean("var s = Symbol('a'); s === s"));
        assert_eq!(string("Symbol('desc').description"), "desc");
        assert!(boolean("Symbol().description === undefined"));
        assert_eq!(string("Symbol('x').toString()"), "Symbol(x)");
        assert_eq!(string("typeof Object(Symbol()).valueOf()"), "symbol");
        assert_eq!(string("try { new Symbol(); } catch (e) { e.name }"), "TypeError");
    }

    #[test]
    fn symbols_as_property_keys() {
        assert!(boolean("var k = Symbol('k'); var o = {}; o[k] = 1; o[k] === 1 && o['Symbol(k)'] === undefined"));
        assert_eq!(string("var k = Symbol('m'); var o = { [k]() {} }; o[k].name"), "[m]");
    }

    #[test]
    fn well_known_symbols() {
        assert_eq!(string("typeof Symbol.toPrimitive"), "symbol");
        assert!(!boolean("Object.getOwnPropertyDescriptor(Symbol, 'hasInstance').writable"));
        let source = "
            var money = { [Symbol.toPrimitive](hint) { return hint === 'number' ? 42 : 'forty-two'; } };
            (+money) + ' ' + ('' + money) + ' ' + String(money)";
        assert_eq!(string(source), "42 forty-two forty-two");
        assert_eq!(string("try { ({ [Symbol.toPrimitive]() { return {}; } }) + 1; } catch (e) { e.name }"), "TypeError");
    }
}
