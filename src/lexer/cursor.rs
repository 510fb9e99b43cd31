use super::token::SourceLocation;

/// Positional scan over source text.
///
/// Tracks the byte offset plus a 1-based line and 0-based column. Line
/// counting follows ECMAScript line terminators; a CR immediately followed
/// by LF counts as a single line break.
#[derive(Clone, Debug)]
pub struct CharCursor<'src> {
    source: &'src str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'src> CharCursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 0,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.source.len()
    }

    /// The unscanned remainder of the input.
    pub fn rest(&self) -> &'src str {
        &self.source[self.offset..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Looks `n` characters past the current one (`peek_nth(0) == peek()`).
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        if is_line_terminator(ch) {
            if ch == '\r' && self.peek() == Some('\n') {
                self.column += 1;
            } else {
                self.line += 1;
                self.column = 0;
            }
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes `prefix` if the input starts with it.
    pub fn eat_str(&mut self, prefix: &str) -> bool {
        if !self.starts_with(prefix) {
            return false;
        }
        for _ in prefix.chars() {
            self.advance();
        }
        true
    }

    pub fn advance_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'src str {
        let start = self.offset;
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            self.advance();
        }
        &self.source[start..self.offset]
    }

    pub fn slice_from(&self, start: usize) -> &'src str {
        &self.source[start..self.offset]
    }
}

// ECMAScript LineTerminator
pub fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

// ECMAScript WhiteSpace: TAB, VT, FF, ZWNBSP and the Unicode Zs category.
pub fn is_whitespace(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\u{000B}'
            | '\u{000C}'
            | '\u{FEFF}'
            | ' '
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// ID_Start code points that XID_Start drops because their NFKC forms are
/// not identifiers. ID_Continue differs from XID_Continue only by members
/// of this set.
fn is_id_but_not_xid(ch: char) -> bool {
    matches!(
        ch,
        '\u{037A}'
            | '\u{0E33}'
            | '\u{0EB3}'
            | '\u{309B}'..='\u{309C}'
            | '\u{FC5E}'..='\u{FC63}'
            | '\u{FDFA}'..='\u{FDFB}'
            | '\u{FE70}'
            | '\u{FE72}'
            | '\u{FE74}'
            | '\u{FE76}'
            | '\u{FE78}'
            | '\u{FE7A}'
            | '\u{FE7C}'
            | '\u{FE7E}'
            | '\u{FF9E}'..='\u{FF9F}'
    )
}

pub fn is_identifier_start(ch: char) -> bool {
    ch == '_'
        || ch == '$'
        || ch.is_ascii_alphabetic()
        || (!ch.is_ascii() && (unicode_ident::is_xid_start(ch) || is_id_but_not_xid(ch)))
}

pub fn is_identifier_continue(ch: char) -> bool {
    ch == '_'
        || ch == '$'
        || ch.is_ascii_alphanumeric()
        || ch == '\u{200C}'
        || ch == '\u{200D}'
        || (!ch.is_ascii() && (unicode_ident::is_xid_continue(ch) || is_id_but_not_xid(ch)))
}
