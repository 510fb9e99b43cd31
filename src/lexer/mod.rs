mod cursor;
pub mod literal;
mod token;

pub use cursor::{CharCursor, is_identifier_continue, is_identifier_start, is_line_terminator, is_whitespace};
pub use token::{Keyword, Punctuator, SourceLocation, Token, TokenKind, is_strict_reserved_word};

use token::PUNCTUATORS;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    #[error("Invalid or unexpected token '{0}'")]
    UnexpectedCharacter(char),
    #[error("Invalid or unexpected token")]
    UnterminatedString,
    #[error("Unterminated comment")]
    UnterminatedComment,
    #[error("Invalid or unexpected token")]
    InvalidNumber,
    #[error("Numeric separators are not allowed here")]
    InvalidSeparator,
    #[error("Template literals are not supported")]
    TemplateLiteral,
    #[error("Unicode escapes in identifiers are not supported")]
    IdentifierEscape,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} ({location})")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub location: SourceLocation,
}

/// Lazy token stream over a source text.
///
/// Whitespace and comments are dropped; line terminators are kept as
/// [`TokenKind::LineTerminator`] tokens. After the first error the stream
/// is exhausted.
pub struct Lexer<'src> {
    cursor: CharCursor<'src>,
    failed: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: CharCursor::new(source),
            failed: false,
        }
    }

    /// Where scanning has reached; the end of the input once the stream is
    /// exhausted.
    pub fn location(&self) -> SourceLocation {
        self.cursor.location()
    }

    fn error(&self, kind: LexErrorKind) -> LexError {
        LexError {
            kind,
            location: self.cursor.location(),
        }
    }

    fn token(&self, kind: TokenKind, start: SourceLocation) -> Token<'src> {
        Token {
            kind,
            text: self.cursor.slice_from(start.offset),
            location: start,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'src>>, LexError> {
        loop {
            let Some(ch) = self.cursor.peek() else {
                return Ok(None);
            };

            if is_whitespace(ch) {
                self.cursor.advance_while(is_whitespace);
                continue;
            }

            if is_line_terminator(ch) {
                let start = self.cursor.location();
                if !self.cursor.eat_str("\r\n") {
                    self.cursor.advance();
                }
                return Ok(Some(self.token(TokenKind::LineTerminator, start)));
            }

            if self.cursor.starts_with("//") {
                self.skip_line_comment();
                continue;
            }

            if self.cursor.starts_with("/*") {
                if let Some(terminator) = self.skip_block_comment()? {
                    return Ok(Some(terminator));
                }
                continue;
            }

            if self.cursor.offset() == 0 && self.cursor.starts_with("#!") {
                self.skip_line_comment();
                continue;
            }

            let start = self.cursor.location();
            let kind = match ch {
                '\'' | '"' => self.read_string(ch)?,
                '0'..='9' => self.read_numeric_literal()?,
                '.' if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_numeric_literal()?
                }
                '#' if self.cursor.peek_nth(1).is_some_and(is_identifier_start) => {
                    self.cursor.advance();
                    self.cursor.advance_while(is_identifier_continue);
                    TokenKind::PrivateName
                }
                '`' => return Err(self.error(LexErrorKind::TemplateLiteral)),
                _ if is_identifier_start(ch) => self.read_identifier()?,
                _ => self.read_punctuator(ch)?,
            };
            let token = self.token(kind, start);
            tracing::trace!(kind = ?token.kind, text = token.text, "token");
            return Ok(Some(token));
        }
    }

    fn skip_line_comment(&mut self) {
        self.cursor.advance_while(|c| !is_line_terminator(c));
    }

    /// Skips a `/* */` comment. A comment spanning lines yields the first
    /// line terminator it contains so the line break stays visible.
    fn skip_block_comment(&mut self) -> Result<Option<Token<'src>>, LexError> {
        let opened_at = self.cursor.location();
        self.cursor.eat_str("/*");
        let mut terminator = None;
        loop {
            if self.cursor.eat_str("*/") {
                return Ok(terminator);
            }
            let location = self.cursor.location();
            match self.cursor.advance() {
                Some(ch) if is_line_terminator(ch) && terminator.is_none() => {
                    if ch == '\r' {
                        self.cursor.eat('\n');
                    }
                    terminator = Some(self.token(TokenKind::LineTerminator, location));
                }
                Some(_) => {}
                None => {
                    return Err(LexError {
                        kind: LexErrorKind::UnterminatedComment,
                        location: opened_at,
                    });
                }
            }
        }
    }

    fn read_string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        self.cursor.advance();
        loop {
            match self.cursor.peek() {
                None => return Err(self.error(LexErrorKind::UnterminatedString)),
                Some('\n' | '\r') => return Err(self.error(LexErrorKind::UnterminatedString)),
                Some('\\') => {
                    self.cursor.advance();
                    if self.cursor.eat_str("\r\n") {
                        continue;
                    }
                    if self.cursor.advance().is_none() {
                        return Err(self.error(LexErrorKind::UnterminatedString));
                    }
                }
                Some(ch) => {
                    self.cursor.advance();
                    if ch == quote {
                        return Ok(TokenKind::StringLiteral);
                    }
                }
            }
        }
    }

    fn read_numeric_literal(&mut self) -> Result<TokenKind, LexError> {
        let radix_prefix = match (self.cursor.peek(), self.cursor.peek_nth(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        let mut kind = TokenKind::NumericLiteral;
        if let Some(radix) = radix_prefix {
            self.cursor.advance();
            self.cursor.advance();
            let digits = self.cursor.advance_while(|c| c.is_digit(radix) || c == '_');
            check_separators(digits).map_err(|kind| self.error(kind))?;
            if self.cursor.eat('n') {
                kind = TokenKind::BigIntLiteral;
            }
        } else {
            let legacy = self.cursor.peek() == Some('0')
                && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit());
            let integer = self.cursor.advance_while(|c| c.is_ascii_digit() || c == '_');
            if legacy && integer.contains('_') {
                return Err(self.error(LexErrorKind::InvalidSeparator));
            }
            if !integer.is_empty() {
                check_separators(integer).map_err(|kind| self.error(kind))?;
            }
            let legacy_octal = legacy && integer.bytes().all(|b| b < b'8');

            let mut is_integer = true;
            if !legacy_octal && self.cursor.peek() == Some('.') {
                is_integer = false;
                self.cursor.advance();
                let fraction = self.cursor.advance_while(|c| c.is_ascii_digit() || c == '_');
                if !fraction.is_empty() {
                    check_separators(fraction).map_err(|kind| self.error(kind))?;
                }
            }
            if !legacy_octal && matches!(self.cursor.peek(), Some('e' | 'E')) {
                is_integer = false;
                self.cursor.advance();
                if matches!(self.cursor.peek(), Some('+' | '-')) {
                    self.cursor.advance();
                }
                let exponent = self.cursor.advance_while(|c| c.is_ascii_digit() || c == '_');
                check_separators(exponent).map_err(|kind| self.error(kind))?;
            }
            if is_integer && !legacy && self.cursor.eat('n') {
                kind = TokenKind::BigIntLiteral;
            }
        }

        // 3in, 0x, 1_ and friends
        if self.cursor.peek().is_some_and(|c| is_identifier_start(c) || c.is_ascii_digit()) {
            return Err(self.error(LexErrorKind::InvalidNumber));
        }
        Ok(kind)
    }

    fn read_identifier(&mut self) -> Result<TokenKind, LexError> {
        let start = self.cursor.offset();
        self.cursor.advance();
        self.cursor.advance_while(is_identifier_continue);
        if self.cursor.peek() == Some('\\') {
            return Err(self.error(LexErrorKind::IdentifierEscape));
        }
        let kind = match self.cursor.slice_from(start) {
            "true" | "false" => TokenKind::BooleanLiteral,
            "null" => TokenKind::NullLiteral,
            word => Keyword::from_str(word).map_or(TokenKind::Identifier, TokenKind::Keyword),
        };
        Ok(kind)
    }

    fn read_punctuator(&mut self, ch: char) -> Result<TokenKind, LexError> {
        // `a?.5:b` is a conditional, not an optional chain.
        if self.cursor.starts_with("?.") && self.cursor.peek_nth(2).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.advance();
            return Ok(TokenKind::Punctuator(Punctuator::Question));
        }
        for &(text, punctuator) in PUNCTUATORS {
            if self.cursor.eat_str(text) {
                return Ok(TokenKind::Punctuator(punctuator));
            }
        }
        Err(self.error(LexErrorKind::UnexpectedCharacter(ch)))
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Result<Token<'src>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

// `_` may only sit between two digits.
fn check_separators(digits: &str) -> Result<(), LexErrorKind> {
    if digits.is_empty() {
        return Err(LexErrorKind::InvalidNumber);
    }
    if digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(LexErrorKind::InvalidSeparator);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<(TokenKind, &str)> {
        Lexer::new(src)
            .map(|t| t.unwrap())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn lex_no_lt(src: &str) -> Vec<(TokenKind, &str)> {
        lex(src)
            .into_iter()
            .filter(|(kind, _)| *kind != TokenKind::LineTerminator)
            .collect()
    }

    fn lex_err(src: &str) -> LexErrorKind {
        Lexer::new(src)
            .find_map(|t| t.err())
            .expect("expected a lexical error")
            .kind
    }

    fn punct(p: Punctuator) -> TokenKind {
        TokenKind::Punctuator(p)
    }

    #[test]
    fn empty_source() {
        assert!(lex("").is_empty());
        assert!(lex(" \t\u{00A0}\u{FEFF}").is_empty());
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            lex_no_lt("var x = 42;"),
            vec![
                (TokenKind::Keyword(Keyword::Var), "var"),
                (TokenKind::Identifier, "x"),
                (punct(Punctuator::Assign), "="),
                (TokenKind::NumericLiteral, "42"),
                (punct(Punctuator::Semicolon), ";"),
            ]
        );
        assert_eq!(lex("$_ café"), vec![(TokenKind::Identifier, "$_"), (TokenKind::Identifier, "café")]);
    }

    #[test]
    fn boolean_null() {
        assert_eq!(
            lex("true false null"),
            vec![
                (TokenKind::BooleanLiteral, "true"),
                (TokenKind::BooleanLiteral, "false"),
                (TokenKind::NullLiteral, "null"),
            ]
        );
    }

    #[test]
    fn string_literals_keep_source_text() {
        assert_eq!(lex(r#""hello""#), vec![(TokenKind::StringLiteral, r#""hello""#)]);
        assert_eq!(lex(r"'it\'s'"), vec![(TokenKind::StringLiteral, r"'it\'s'")]);
        assert_eq!(lex("'a\\\r\nb'"), vec![(TokenKind::StringLiteral, "'a\\\r\nb'")]);
        assert_eq!(lex_err("'abc"), LexErrorKind::UnterminatedString);
        assert_eq!(lex_err("'ab\ncd'"), LexErrorKind::UnterminatedString);
    }

    #[test]
    fn numeric_literals() {
        for src in ["0xff", "0b1010", "0o77", "1_000", "1e3", ".5", "3.", "017", "09.5"] {
            assert_eq!(lex(src), vec![(TokenKind::NumericLiteral, src)], "{src}");
        }
        assert_eq!(lex("42n"), vec![(TokenKind::BigIntLiteral, "42n")]);
        assert_eq!(lex("0xFFn"), vec![(TokenKind::BigIntLiteral, "0xFFn")]);
        assert_eq!(lex_err("3in x"), LexErrorKind::InvalidNumber);
        assert_eq!(lex_err("1__0"), LexErrorKind::InvalidSeparator);
        assert_eq!(lex_err("0x"), LexErrorKind::InvalidNumber);
        assert_eq!(lex_err("1.5n"), LexErrorKind::InvalidNumber);
    }

    #[test]
    fn punctuators_take_longest_match() {
        assert_eq!(lex(">>>="), vec![(punct(Punctuator::UnsignedRightShiftAssign), ">>>=")]);
        assert_eq!(lex("!=="), vec![(punct(Punctuator::StrictNotEqual), "!==")]);
        assert_eq!(lex("..."), vec![(punct(Punctuator::Ellipsis), "...")]);
        assert_eq!(
            lex("a**=b"),
            vec![
                (TokenKind::Identifier, "a"),
                (punct(Punctuator::ExponentAssign), "**="),
                (TokenKind::Identifier, "b"),
            ]
        );
        assert_eq!(
            lex("x?.5:1")[1],
            (punct(Punctuator::Question), "?")
        );
    }

    #[test]
    fn comments_are_discarded() {
        assert_eq!(lex("// comment\n42")[1..], [(TokenKind::NumericLiteral, "42")]);
        assert_eq!(lex("/* block */ 42"), vec![(TokenKind::NumericLiteral, "42")]);
        assert_eq!(lex_err("/* never closed"), LexErrorKind::UnterminatedComment);
    }

    #[test]
    fn multi_line_comment_yields_line_terminator() {
        assert_eq!(
            lex("a /* x\r\n y */ b"),
            vec![
                (TokenKind::Identifier, "a"),
                (TokenKind::LineTerminator, "\r\n"),
                (TokenKind::Identifier, "b"),
            ]
        );
    }

    #[test]
    fn line_terminators() {
        assert_eq!(
            lex("a\r\nb\u{2028}c"),
            vec![
                (TokenKind::Identifier, "a"),
                (TokenKind::LineTerminator, "\r\n"),
                (TokenKind::Identifier, "b"),
                (TokenKind::LineTerminator, "\u{2028}"),
                (TokenKind::Identifier, "c"),
            ]
        );
    }

    #[test]
    fn hashbang_only_at_start() {
        assert_eq!(lex("#!/usr/bin/env node\nx")[1..], [(TokenKind::Identifier, "x")]);
        assert_eq!(lex_err(" #!/bin"), LexErrorKind::UnexpectedCharacter('#'));
    }

    #[test]
    fn private_names() {
        assert_eq!(
            lex("this.#secret"),
            vec![
                (TokenKind::Keyword(Keyword::This), "this"),
                (punct(Punctuator::Dot), "."),
                (TokenKind::PrivateName, "#secret"),
            ]
        );
    }

    #[test]
    fn unrecognized_input_is_an_error() {
        assert_eq!(lex_err("a @ b"), LexErrorKind::UnexpectedCharacter('@'));
        assert_eq!(lex_err("`tpl`"), LexErrorKind::TemplateLiteral);
        let mut lexer = Lexer::new("@ a");
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn locations() {
        let tokens: Vec<_> = Lexer::new("a\n  bc").map(|t| t.unwrap()).collect();
        assert_eq!(tokens[2].location, SourceLocation { line: 2, column: 2, offset: 4 });
        assert_eq!(tokens[2].end_offset(), 6);
    }

    #[test]
    fn lexing_is_deterministic() {
        let src = "function f(a, b) { return a ** b; } /* c */ f(2, 10);";
        assert_eq!(lex(src), lex(src));
    }
}
