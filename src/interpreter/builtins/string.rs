use super::{arg, this_string_value};
use crate::interpreter::Interpreter;
use crate::interpreter::helpers::to_integer_or_infinity;
use crate::interpreter::object::{ObjectData, ObjectKind};
use crate::types::{JsString, JsValue};

impl Interpreter {
    pub(super) fn setup_string(&mut self) {
        let string_ctor = self.create_native_function(
            "String",
            1,
            |interp, _this, args, new_target| {
                let value = match args.first() {
                    None => JsString::default(),
                    Some(JsValue::Symbol(sym)) if new_target.is_none() => JsString::from_str(&sym.descriptive_string()),
                    Some(value) => interp.to_string(value)?,
                };
                if new_target.is_none() {
                    return Ok(JsValue::String(value));
                }
                let proto = interp.native_prototype(new_target, |i| &i.string_prototype)?;
                Ok(JsValue::Object(interp.alloc(ObjectData::new(Some(proto), ObjectKind::String(value)))))
            },
            true,
        );
        let proto = self.intrinsics().string_prototype.clone();
        self.link_constructor(&string_ctor, &proto);

        self.define_native_method(&proto, "toString", 0, |interp, this, _args, _| {
            this_string_value(interp, this, "String.prototype.toString").map(JsValue::String)
        });
        self.define_native_method(&proto, "valueOf", 0, |interp, this, _args, _| {
            this_string_value(interp, this, "String.prototype.valueOf").map(JsValue::String)
        });
        self.define_native_method(&proto, "charAt", 1, |interp, this, args, _| {
            let s = coerced_this(interp, this, "String.prototype.charAt")?;
            let position = to_integer_or_infinity(interp.to_number(&arg(args, 0))?);
            let ch = if position < 0.0 { None } else { s.at(position as usize) };
            Ok(JsValue::String(ch.unwrap_or_default()))
        });
        self.define_native_method(&proto, "charCodeAt", 1, |interp, this, args, _| {
            let s = coerced_this(interp, this, "String.prototype.charCodeAt")?;
            let position = to_integer_or_infinity(interp.to_number(&arg(args, 0))?);
            let unit = if position < 0.0 { None } else { s.code_units.get(position as usize) };
            Ok(JsValue::Number(unit.map_or(f64::NAN, |u| f64::from(*u))))
        });
        self.define_native_method(&proto, "indexOf", 1, |interp, this, args, _| {
            let s = coerced_this(interp, this, "String.prototype.indexOf")?;
            let search = interp.to_string(&arg(args, 0))?;
            let start = to_integer_or_infinity(interp.to_number(&arg(args, 1))?).clamp(0.0, s.len() as f64) as usize;
            let found = (start..=s.len())
                .find(|&i| s.code_units[i..].starts_with(&search.code_units))
                .map_or(-1.0, |i| i as f64);
            Ok(JsValue::Number(found))
        });
        self.define_global("String", JsValue::Object(string_ctor));
    }
}

/// RequireObjectCoercible(this) followed by ToString.
fn coerced_this(interp: &mut Interpreter, this: &JsValue, method: &str) -> crate::interpreter::JsResult<JsString> {
    if this.is_nullish() {
        return Err(interp.type_error(&format!("{method} called on null or undefined")));
    }
    interp.to_string(this)
}
