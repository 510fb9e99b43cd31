use std::cmp::Ordering;
use std::str::FromStr;

use num_bigint::BigInt;

use crate::types::{JsString, JsValue};

pub(crate) fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc()
    }
}

pub(crate) fn format_radix(mut n: i64, radix: u32) -> String {
    if !(2..=36).contains(&radix) {
        return n.to_string();
    }
    if n == 0 {
        return "0".to_string();
    }
    let negative = n < 0;
    if negative {
        n = -n;
    }
    let mut digits = Vec::new();
    while n > 0 {
        let d = (n % radix as i64) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('?'));
        n /= radix as i64;
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Number::toString with a radix other than 10. The fraction is cut off
/// after enough digits to distinguish it at f64 precision.
pub(crate) fn format_number_radix(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let negative = n < 0.0;
    let n = n.abs();
    let int_part = n.trunc();
    let mut result = if int_part < 9.0e15 {
        format_radix(int_part as i64, radix)
    } else {
        large_integer_radix(int_part, radix)
    };
    let mut frac = n - int_part;
    if frac > 0.0 {
        result.push('.');
        let mut emitted = 0;
        while frac > 0.0 && emitted < 52 {
            frac *= radix as f64;
            let digit = frac.trunc() as u32;
            result.push(char::from_digit(digit, radix).unwrap_or('0'));
            frac -= digit as f64;
            emitted += 1;
        }
    }
    if negative {
        result.insert(0, '-');
    }
    result
}

fn large_integer_radix(n: f64, radix: u32) -> String {
    match BigInt::from_str(&format!("{n:.0}")) {
        Ok(big) => big.to_str_radix(radix),
        Err(_) => "NaN".to_string(),
    }
}

// §7.1.2 ToBoolean
pub(crate) fn to_boolean(val: &JsValue) -> bool {
    match val {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::BigInt(b) => b.value != BigInt::from(0),
        JsValue::Symbol(_) | JsValue::Object(_) => true,
    }
}

/// WhiteSpace and LineTerminator code points, as trimmed by StringToNumber.
pub(crate) fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}' | '\u{000B}' | '\u{000C}' | '\u{0020}' | '\u{00A0}' | '\u{FEFF}' | '\n' | '\r' | '\u{2028}' | '\u{2029}'
    ) || (c != '\u{0085}' && c.is_whitespace() && !c.is_ascii())
}

fn trim_js(s: &str) -> &str {
    s.trim_matches(is_js_whitespace)
}

// §7.1.4.1.1 StringToNumber
pub(crate) fn string_to_number(s: &JsString) -> f64 {
    let rust_str = s.to_rust_string();
    let trimmed = trim_js(&rust_str);
    if trimmed.is_empty() {
        return 0.0;
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return parse_integer_digits(digits, radix);
        }
    }
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if unsigned == "Infinity" {
        return if trimmed.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }
    // f64::from_str also takes "inf" and "nan", which are not numeric literals
    if !unsigned.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        || !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.')
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_integer_digits(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut value = 0.0;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => value = value * radix as f64 + d as f64,
            None => return f64::NAN,
        }
    }
    value
}

// §7.1.14 StringToBigInt; `None` where the string is not an integer.
pub(crate) fn string_to_bigint(s: &JsString) -> Option<BigInt> {
    let rust_str = s.to_rust_string();
    let trimmed = trim_js(&rust_str);
    if trimmed.is_empty() {
        return Some(BigInt::from(0));
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return None;
            }
            return BigInt::parse_bytes(digits.as_bytes(), radix);
        }
    }
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if unsigned.is_empty() || !unsigned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    BigInt::from_str(trimmed).ok()
}

/// Orders a BigInt against a Number; `None` when the Number is NaN.
pub(crate) fn compare_bigint_number(big: &BigInt, n: f64) -> Option<Ordering> {
    if n.is_nan() {
        return None;
    }
    if n.is_infinite() {
        return Some(if n > 0.0 { Ordering::Less } else { Ordering::Greater });
    }
    let floor = n.floor();
    let floor_big = BigInt::from_str(&format!("{floor:.0}")).ok()?;
    Some(match big.cmp(&floor_big) {
        Ordering::Equal if n > floor => Ordering::Less,
        other => other,
    })
}

pub(crate) fn same_value(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Number(a), JsValue::Number(b)) => {
            if a.is_nan() && b.is_nan() {
                return true;
            }
            if *a == 0.0 && *b == 0.0 {
                return a.is_sign_positive() == b.is_sign_positive();
            }
            a == b
        }
        _ => strict_equality(left, right),
    }
}

pub(crate) fn strict_equality(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::Number(a), JsValue::Number(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
        (JsValue::BigInt(a), JsValue::BigInt(b)) => a.value == b.value,
        (JsValue::Object(a), JsValue::Object(b)) => a == b,
        _ => false,
    }
}

pub(crate) fn typeof_val(val: &JsValue) -> &'static str {
    match val {
        JsValue::Undefined => "undefined",
        JsValue::Null => "object",
        JsValue::Boolean(_) => "boolean",
        JsValue::Number(_) => "number",
        JsValue::String(_) => "string",
        JsValue::Symbol(_) => "symbol",
        JsValue::BigInt(_) => "bigint",
        JsValue::Object(o) if o.is_callable() => "function",
        JsValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> f64 {
        string_to_number(&JsString::from_str(s))
    }

    #[test]
    fn string_to_number_cases() {
        assert_eq!(num(""), 0.0);
        assert_eq!(num("  \n42\t"), 42.0);
        assert_eq!(num("\u{FEFF}7"), 7.0);
        assert_eq!(num("0x1F"), 31.0);
        assert_eq!(num("0b101"), 5.0);
        assert_eq!(num("0o17"), 15.0);
        assert_eq!(num("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(num(".5"), 0.5);
        assert_eq!(num("1e3"), 1000.0);
        assert!(num("inf").is_nan());
        assert!(num("NaN").is_nan());
        assert!(num("0x").is_nan());
        assert!(num("-0x10").is_nan());
        assert!(num("12px").is_nan());
        assert!(num("\u{0085}1").is_nan());
    }

    #[test]
    fn string_to_bigint_cases() {
        let big = |s: &str| string_to_bigint(&JsString::from_str(s));
        assert_eq!(big(" 12 "), Some(BigInt::from(12)));
        assert_eq!(big("-3"), Some(BigInt::from(-3)));
        assert_eq!(big("0xff"), Some(BigInt::from(255)));
        assert_eq!(big(""), Some(BigInt::from(0)));
        assert_eq!(big("1.5"), None);
        assert_eq!(big("1_000"), None);
    }

    #[test]
    fn bigint_number_ordering() {
        let two = BigInt::from(2);
        assert_eq!(compare_bigint_number(&two, 2.0), Some(Ordering::Equal));
        assert_eq!(compare_bigint_number(&two, 2.5), Some(Ordering::Less));
        assert_eq!(compare_bigint_number(&two, 1.5), Some(Ordering::Greater));
        assert_eq!(compare_bigint_number(&two, -0.5), Some(Ordering::Greater));
        assert_eq!(compare_bigint_number(&two, f64::INFINITY), Some(Ordering::Less));
        assert_eq!(compare_bigint_number(&two, f64::NAN), None);
    }

    #[test]
    fn radix_formatting() {
        assert_eq!(format_number_radix(255.0, 16), "ff");
        assert_eq!(format_number_radix(-8.0, 2), "-1000");
        assert_eq!(format_number_radix(0.5, 2), "0.1");
        assert_eq!(format_number_radix(2f64.powi(60), 16), "1000000000000000");
    }

    #[test]
    fn equality_and_typeof() {
        assert!(same_value(&JsValue::Number(f64::NAN), &JsValue::Number(f64::NAN)));
        assert!(!same_value(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
        assert!(strict_equality(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
        assert!(!strict_equality(&JsValue::Number(1.0), &JsValue::from_str("1")));
        assert_eq!(typeof_val(&JsValue::Null), "object");
        assert_eq!(typeof_val(&JsValue::Undefined), "undefined");
        assert!(!to_boolean(&JsValue::Number(f64::NAN)));
        assert!(to_boolean(&JsValue::from_str("0")));
    }
}
