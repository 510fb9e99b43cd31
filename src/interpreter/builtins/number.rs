use std::str::FromStr;

use num_bigint::BigInt;

use super::arg;
use crate::interpreter::Interpreter;
use crate::interpreter::helpers::{format_number_radix, string_to_bigint, to_integer_or_infinity};
use crate::interpreter::object::{ObjectData, ObjectKind, PropertyDescriptor, PropertyKey};
use crate::interpreter::operations::{Numeric, PreferredType};
use crate::interpreter::types::JsResult;
use crate::types::{JsBigInt, JsValue, number_ops};

fn this_number_value(interp: &mut Interpreter, this: &JsValue, method: &str) -> JsResult<f64> {
    let value = match this {
        JsValue::Number(n) => Some(*n),
        JsValue::Object(obj) => match obj.borrow().kind {
            ObjectKind::Number(n) => Some(n),
            _ => None,
        },
        _ => None,
    };
    value.ok_or_else(|| interp.type_error(&format!("{method} requires that 'this' be a Number")))
}

fn this_bigint_value(interp: &mut Interpreter, this: &JsValue, method: &str) -> JsResult<BigInt> {
    let value = match this {
        JsValue::BigInt(b) => Some(b.value.clone()),
        JsValue::Object(obj) => match &obj.borrow().kind {
            ObjectKind::BigInt(b) => Some(b.value.clone()),
            _ => None,
        },
        _ => None,
    };
    value.ok_or_else(|| interp.type_error(&format!("{method} requires that 'this' be a BigInt")))
}

/// Reads an optional radix argument, defaulting to 10.
fn radix_argument(interp: &mut Interpreter, value: &JsValue) -> JsResult<u32> {
    if value.is_undefined() {
        return Ok(10);
    }
    let radix = to_integer_or_infinity(interp.to_number(value)?);
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.range_error("toString() radix must be between 2 and 36"));
    }
    Ok(radix as u32)
}

/// The Number value of a BigInt, rounded to nearest.
fn bigint_to_number(value: &BigInt) -> f64 {
    f64::from_str(&value.to_string()).unwrap_or(f64::NAN)
}

/// NumberToBigInt.
fn number_to_bigint(interp: &mut Interpreter, n: f64) -> JsResult<BigInt> {
    if !n.is_finite() || n.trunc() != n {
        let shown = number_ops::to_string(n);
        return Err(interp.range_error(&format!(
            "The number {shown} cannot be converted to a BigInt because it is not an integer"
        )));
    }
    BigInt::from_str(&format!("{n:.0}")).map_err(|_| interp.range_error("Invalid BigInt"))
}

impl Interpreter {
    pub(super) fn setup_number(&mut self) {
        let number_ctor = self.create_native_function(
            "Number",
            1,
            |interp, _this, args, new_target| {
                let value = match args.first() {
                    None => 0.0,
                    Some(value) => match interp.to_numeric(value)? {
                        Numeric::Number(n) => n,
                        Numeric::BigInt(b) => bigint_to_number(&b),
                    },
                };
                if new_target.is_none() {
                    return Ok(JsValue::Number(value));
                }
                let proto = interp.native_prototype(new_target, |i| &i.number_prototype)?;
                Ok(JsValue::Object(interp.alloc(ObjectData::new(Some(proto), ObjectKind::Number(value)))))
            },
            true,
        );
        let proto = self.intrinsics().number_prototype.clone();
        self.link_constructor(&number_ctor, &proto);

        for (name, value) in [
            ("MAX_SAFE_INTEGER", 9007199254740991.0),
            ("MIN_SAFE_INTEGER", -9007199254740991.0),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("EPSILON", f64::EPSILON),
            ("NaN", f64::NAN),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ] {
            number_ctor.define_own_property(
                name.into(),
                PropertyDescriptor::data(JsValue::Number(value), false, false, false),
            );
        }

        self.define_native_method(&proto, "toString", 1, |interp, this, args, _| {
            let x = this_number_value(interp, this, "Number.prototype.toString")?;
            let radix = radix_argument(interp, &arg(args, 0))?;
            let text = if radix == 10 {
                number_ops::to_string(x)
            } else {
                format_number_radix(x, radix)
            };
            Ok(JsValue::from_str(&text))
        });
        self.define_native_method(&proto, "valueOf", 0, |interp, this, _args, _| {
            this_number_value(interp, this, "Number.prototype.valueOf").map(JsValue::Number)
        });
        self.define_global("Number", JsValue::Object(number_ctor));
    }

    pub(super) fn setup_bigint(&mut self) {
        // BigInt is callable but has no [[Construct]].
        let bigint_fn = self.create_native_function(
            "BigInt",
            1,
            |interp, _this, args, _| {
                let prim = interp.to_primitive(&arg(args, 0), PreferredType::Number)?;
                let value = match &prim {
                    JsValue::Number(n) => number_to_bigint(interp, *n)?,
                    JsValue::BigInt(b) => b.value.clone(),
                    JsValue::Boolean(b) => BigInt::from(u8::from(*b)),
                    JsValue::String(s) => match string_to_bigint(s) {
                        Some(value) => value,
                        None => return Err(interp.syntax_error(&format!("Cannot convert {s} to a BigInt"))),
                    },
                    other => return Err(interp.type_error(&format!("Cannot convert {other} to a BigInt"))),
                };
                Ok(JsValue::BigInt(JsBigInt { value }))
            },
            false,
        );
        let proto = self.intrinsics().bigint_prototype.clone();
        self.link_constructor(&bigint_fn, &proto);

        self.define_native_method(&proto, "toString", 0, |interp, this, args, _| {
            let value = this_bigint_value(interp, this, "BigInt.prototype.toString")?;
            let radix = radix_argument(interp, &arg(args, 0))?;
            Ok(JsValue::from_str(&value.to_str_radix(radix)))
        });
        self.define_native_method(&proto, "valueOf", 0, |interp, this, _args, _| {
            let value = this_bigint_value(interp, this, "BigInt.prototype.valueOf")?;
            Ok(JsValue::BigInt(JsBigInt { value }))
        });
        let tag = PropertyKey::Symbol(self.symbols.to_string_tag.clone());
        proto.define_own_property(tag, PropertyDescriptor::data(JsValue::from_str("BigInt"), false, false, true));
        self.define_global("BigInt", JsValue::Object(bigint_fn));
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{boolean, eval, string};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn number(source: &str) -> f64 {
        match eval(source) {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("{source}: expected a number, got {other:?}"),
        }
    }

    #[test]
    fn number_conversion() {
        assert_eq!(number("Number('  12  ')"), 12.0);
        assert_eq!(number("Number()"), 0.0);
        assert_eq!(number("Number(true)"), 1.0);
        assert_eq!(number("Number(10n)"), 10.0);
        assert!(number("Number('1x')").is_nan());
        assert!(boolean("new Number(3) instanceof Number && typeof new Number(3) === 'object'"));
        assert_eq!(number("new Number(3) + 1"), 4.0);
    }

    #[test]
    fn number_constants() {
        assert_eq!(number("Number.MAX_SAFE_INTEGER"), 9007199254740991.0);
        assert_eq!(number("Number.EPSILON"), f64::EPSILON);
        assert!(boolean("Number.MIN_VALUE > 0 && Number.MIN_VALUE / 2 === 0"));
        assert!(!boolean("Object.getOwnPropertyDescriptor(Number, 'NaN').writable"));
    }

    #[test]
    fn number_to_string() {
        assert_eq!(string("(255).toString(16)"), "ff");
        assert_eq!(string("(-255).toString(2)"), "-11111111");
        assert_eq!(string("(0.1 + 0.2).toString()"), "0.30000000000000004");
        assert_eq!(string("(1e21).toString()"), "1e+21");
        assert_eq!(string("(123.456).toString(10)"), "123.456");
        assert_eq!(string("try { (1).toString(1); } catch (e) { e.name }"), "RangeError");
        assert_eq!(string("try { Number.prototype.toString.call('1'); } catch (e) { e.name }"), "TypeError");
        assert_eq!(string("'' + -0"), "0");
    }

    #[test]
    fn bigint_function() {
        assert_eq!(string("typeof BigInt(5)"), "bigint");
        assert!(boolean("BigInt('0x10') === 16n"));
        assert!(boolean("BigInt(true) === 1n"));
        assert_eq!(string("(255n).toString(16)"), "ff");
        assert_eq!(string("try { BigInt(1.5); } catch (e) { e.name }"), "RangeError");
        assert_eq!(string("try { BigInt('1.5'); } catch (e) { e.name }"), "SyntaxError");
        assert_eq!(string("try { new BigInt(1); } catch (e) { e.name }"), "TypeError");
        assert_eq!(string("Object.prototype.toString.call(1n)"), "[object BigInt]");
    }
}
