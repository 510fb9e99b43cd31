use crate::lexer::{LexError, Lexer, SourceLocation, Token, TokenKind};

/// Random-access lookahead over the fully realized token sequence.
///
/// Line terminator tokens stay in the buffer but are skipped by every
/// peek and consume; [`TokenCursor::line_terminator_before`] reports
/// whether one sits before the next significant token.
pub struct TokenCursor<'src> {
    tokens: Vec<Token<'src>>,
    position: usize,
    end: SourceLocation,
    previous_end: usize,
}

impl<'src> TokenCursor<'src> {
    pub fn new(source: &'src str) -> Result<Self, LexError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.by_ref().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tokens,
            position: 0,
            end: lexer.location(),
            previous_end: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    fn significant_index(&self, n: usize) -> Option<usize> {
        self.tokens[self.position..]
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind != TokenKind::LineTerminator)
            .nth(n)
            .map(|(i, _)| self.position + i)
    }

    pub fn peek(&self) -> Option<&Token<'src>> {
        self.peek_nth(0)
    }

    /// The `n`th significant token ahead, `peek_nth(0)` being the next one.
    pub fn peek_nth(&self, n: usize) -> Option<&Token<'src>> {
        self.significant_index(n).map(|i| &self.tokens[i])
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    pub fn next(&mut self) -> Option<Token<'src>> {
        let index = self.significant_index(0)?;
        self.position = index + 1;
        let token = self.tokens[index];
        self.previous_end = token.end_offset();
        Some(token)
    }

    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    pub fn line_terminator_before(&self) -> bool {
        self.tokens
            .get(self.position)
            .is_some_and(|t| t.kind == TokenKind::LineTerminator)
    }

    pub fn is_at_end(&self) -> bool {
        self.peek().is_none()
    }

    /// Location of the next significant token, or of the end of input.
    pub fn location(&self) -> SourceLocation {
        self.peek().map_or(self.end, |t| t.location)
    }

    /// Byte offset just past the last consumed token.
    pub fn previous_end(&self) -> usize {
        self.previous_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Punctuator, TokenKind};

    #[test]
    fn skips_line_terminators() {
        let mut cursor = TokenCursor::new("a\n\n+ b").unwrap();
        assert_eq!(cursor.len(), 5);
        assert_eq!(cursor.next().map(|t| t.text), Some("a"));
        assert!(cursor.line_terminator_before());
        assert_eq!(cursor.peek().map(|t| t.text), Some("+"));
        assert_eq!(cursor.peek_nth(1).map(|t| t.text), Some("b"));
        assert!(cursor.eat(TokenKind::Punctuator(Punctuator::Plus)));
        assert!(!cursor.line_terminator_before());
        assert_eq!(cursor.next().map(|t| t.text), Some("b"));
        assert!(cursor.is_at_end());
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn end_location() {
        let cursor = TokenCursor::new("x;\nfoo").unwrap();
        assert_eq!(cursor.end.line, 2);
        assert_eq!(cursor.end.column, 3);

        let cursor = TokenCursor::new("x;\nfoo\n").unwrap();
        assert_eq!((cursor.end.line, cursor.end.column), (3, 0));
        let cursor = TokenCursor::new("a\r\nb\u{2028}c\rd").unwrap();
        assert_eq!((cursor.end.line, cursor.end.column), (4, 1));
        assert_eq!(TokenCursor::new("").unwrap().end.line, 1);
    }

    #[test]
    fn lexical_error_surfaces_up_front() {
        assert!(TokenCursor::new("a; b; @").is_err());
    }
}
