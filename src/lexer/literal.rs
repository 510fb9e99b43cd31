//! Decoding of literal token text into values.
//!
//! The lexer only validates the shape of a literal; escapes and numeric
//! values are computed here, once, when the parser builds the AST.

use num_bigint::BigInt;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LiteralError {
    #[error("Invalid hexadecimal escape sequence")]
    InvalidHexEscape,
    #[error("Invalid Unicode escape sequence")]
    InvalidUnicodeEscape,
    #[error("Undefined Unicode code-point")]
    CodePointOutOfRange,
    #[error("Octal escape sequences are not allowed in strict mode.")]
    OctalEscapeInStrict,
}

/// Cooks a quoted string literal (quotes included) into UTF-16 code units.
pub fn string_value(text: &str, strict: bool) -> Result<Vec<u16>, LiteralError> {
    let inner = &text[1..text.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            push_char(&mut out, ch);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        match escaped {
            'n' => out.push(0x0A),
            'r' => out.push(0x0D),
            't' => out.push(0x09),
            'b' => out.push(0x08),
            'f' => out.push(0x0C),
            'v' => out.push(0x0B),
            '0' if !chars.peek().is_some_and(|c| c.is_ascii_digit()) => out.push(0),
            '0'..='7' => {
                if strict {
                    return Err(LiteralError::OctalEscapeInStrict);
                }
                let mut value = escaped as u32 - '0' as u32;
                let max_digits = if escaped <= '3' { 3 } else { 2 };
                for _ in 1..max_digits {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(value as u16);
            }
            '8' | '9' if strict => return Err(LiteralError::OctalEscapeInStrict),
            'x' => {
                let value = read_hex_digits(&mut chars, 2).ok_or(LiteralError::InvalidHexEscape)?;
                out.push(value as u16);
            }
            'u' => read_unicode_escape(&mut chars, &mut out)?,
            // line continuation
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => push_char(&mut out, other),
        }
    }
    Ok(out)
}

fn push_char(out: &mut Vec<u16>, ch: char) {
    let mut buf = [0u16; 2];
    out.extend_from_slice(ch.encode_utf16(&mut buf));
}

fn read_hex_digits(chars: &mut impl Iterator<Item = char>, count: usize) -> Option<u32> {
    let mut value = 0;
    for _ in 0..count {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    Some(value)
}

fn read_unicode_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    out: &mut Vec<u16>,
) -> Result<(), LiteralError> {
    if chars.peek() != Some(&'{') {
        let unit = read_hex_digits(chars, 4).ok_or(LiteralError::InvalidUnicodeEscape)?;
        out.push(unit as u16);
        return Ok(());
    }
    chars.next();
    let mut value: u32 = 0;
    let mut digits = 0;
    loop {
        match chars.next() {
            Some('}') if digits > 0 => break,
            Some(c) => {
                let d = c.to_digit(16).ok_or(LiteralError::InvalidUnicodeEscape)?;
                value = value * 16 + d;
                if value > 0x10FFFF {
                    return Err(LiteralError::CodePointOutOfRange);
                }
                digits += 1;
            }
            None => return Err(LiteralError::InvalidUnicodeEscape),
        }
    }
    match char::from_u32(value) {
        Some(ch) => push_char(out, ch),
        // a lone surrogate written as \u{D800}
        None => out.push(value as u16),
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub enum NumericValue {
    Number(f64),
    BigInt(BigInt),
}

/// Computes the value of a numeric or BigInt literal the lexer accepted.
pub fn numeric_value(text: &str) -> NumericValue {
    let (digits, is_bigint) = match text.strip_suffix('n') {
        Some(digits) => (digits, true),
        None => (text, false),
    };
    let clean: String = digits.chars().filter(|&c| c != '_').collect();

    let (radix, body) = match clean.get(..2) {
        Some("0x" | "0X") => (16, &clean[2..]),
        Some("0o" | "0O") => (8, &clean[2..]),
        Some("0b" | "0B") => (2, &clean[2..]),
        _ if is_legacy_octal(&clean) => (8, &clean[1..]),
        _ => (10, clean.as_str()),
    };

    if is_bigint || radix != 10 {
        let value = BigInt::parse_bytes(body.as_bytes(), radix).unwrap_or_default();
        if is_bigint {
            return NumericValue::BigInt(value);
        }
        // decimal text of an integer rounds exactly once
        return NumericValue::Number(value.to_string().parse().unwrap_or(f64::NAN));
    }
    NumericValue::Number(body.parse().unwrap_or(f64::NAN))
}

/// `0`-prefixed literals like `017` or `089`, which strict mode rejects.
pub fn is_legacy_octal_like(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() > 1 && bytes[0] == b'0' && bytes[1].is_ascii_digit()
}

fn is_legacy_octal(text: &str) -> bool {
    is_legacy_octal_like(text) && text.bytes().all(|b| (b'0'..=b'7').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cooked(text: &str) -> String {
        String::from_utf16(&string_value(text, false).unwrap()).unwrap()
    }

    #[test]
    fn simple_escapes() {
        assert_eq!(cooked(r"'he\nllo'"), "he\nllo");
        assert_eq!(cooked(r#""\t\b\f\v\0""#), "\t\u{8}\u{c}\u{b}\0");
        assert_eq!(cooked(r"'\q\'\\'"), "q'\\");
        assert_eq!(cooked("'a\\\r\nb'"), "ab");
    }

    #[test]
    fn hex_and_unicode_escapes() {
        assert_eq!(cooked(r"'\x41B\u{43}'"), "ABC");
        assert_eq!(cooked(r"'\u{1F600}'"), "😀");
        assert_eq!(cooked(r"'😀'"), "😀");
        assert_eq!(string_value(r"'\uD800'", false).unwrap(), vec![0xD800]);
        assert_eq!(string_value(r"'\x4'", false), Err(LiteralError::InvalidHexEscape));
        assert_eq!(string_value(r"'\u{}'", false), Err(LiteralError::InvalidUnicodeEscape));
        assert_eq!(string_value(r"'\u{110000}'", false), Err(LiteralError::CodePointOutOfRange));
    }

    #[test]
    fn legacy_octal_escapes() {
        assert_eq!(cooked(r"'\101'"), "A");
        assert_eq!(cooked(r"'\08'"), "\u{0}8");
        assert_eq!(cooked(r"'\477'"), "'7");
        assert_eq!(string_value(r"'\1'", true), Err(LiteralError::OctalEscapeInStrict));
        assert_eq!(string_value(r"'\0'", true).unwrap(), vec![0]);
    }

    #[test]
    fn numbers() {
        assert_eq!(numeric_value("42"), NumericValue::Number(42.0));
        assert_eq!(numeric_value("1_000.5"), NumericValue::Number(1000.5));
        assert_eq!(numeric_value(".5e1"), NumericValue::Number(5.0));
        assert_eq!(numeric_value("0xff"), NumericValue::Number(255.0));
        assert_eq!(numeric_value("0B101"), NumericValue::Number(5.0));
        assert_eq!(numeric_value("0o17"), NumericValue::Number(15.0));
        assert_eq!(numeric_value("017"), NumericValue::Number(15.0));
        assert_eq!(numeric_value("019"), NumericValue::Number(19.0));
        assert_eq!(
            numeric_value("0x20000000000001"),
            NumericValue::Number(9007199254740992.0)
        );
    }

    #[test]
    fn bigints() {
        assert_eq!(numeric_value("42n"), NumericValue::BigInt(BigInt::from(42)));
        assert_eq!(numeric_value("0xFFn"), NumericValue::BigInt(BigInt::from(255)));
    }

    #[test]
    fn legacy_octal_detection() {
        assert!(is_legacy_octal_like("07"));
        assert!(is_legacy_octal_like("09"));
        assert!(!is_legacy_octal_like("0"));
        assert!(!is_legacy_octal_like("0.5"));
    }
}
