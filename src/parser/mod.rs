use crate::ast::*;
use crate::lexer::literal::{self, NumericValue};
use crate::lexer::{Keyword, Punctuator, SourceLocation, Token, TokenKind, is_strict_reserved_word};
use crate::types::JsString;

mod declarations;
mod error;
mod expressions;
mod statements;
mod token_cursor;

pub use error::{ParseError, SyntaxErrorKind};
pub use token_cursor::TokenCursor;

/// Parses a script. Fails on the first syntax error without producing a
/// partial tree.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    tracing::debug!(bytes = source.len(), "parse start");
    let program = Parser::new(source)?.parse_program()?;
    tracing::debug!(statements = program.body.len(), strict = program.strict, "parse finished");
    Ok(program)
}

#[derive(Default)]
struct PrivateScope {
    declared: Vec<(String, ClassMethodKind, bool)>,
    referenced: Vec<(String, SourceLocation)>,
}

/// Parser state that does not cross a function boundary.
struct FunctionContext {
    strict: bool,
    in_function: bool,
    in_iteration: u32,
    in_switch: u32,
    labels: Vec<(String, bool)>,
    allow_super_property: bool,
    allow_super_call: bool,
    var_names: Vec<String>,
    var_declarations: Vec<String>,
}

pub struct Parser<'src> {
    source: &'src str,
    tokens: TokenCursor<'src>,
    strict: bool,
    in_function: bool,
    in_iteration: u32,
    in_switch: u32,
    labels: Vec<(String, bool)>, // (name, is_iteration)
    allow_super_property: bool,
    allow_super_call: bool,
    no_in: bool,
    var_names: Vec<String>,
    /// Every `var` binding in source order, repeats included; blocks
    /// check the ones they contain against their lexical names.
    var_declarations: Vec<String>,
    private_scopes: Vec<PrivateScope>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Result<Self, ParseError> {
        let tokens = TokenCursor::new(source)?;
        tracing::debug!(tokens = tokens.len(), "lexed");
        Ok(Self {
            source,
            tokens,
            strict: false,
            in_function: false,
            in_iteration: 0,
            in_switch: 0,
            labels: Vec::new(),
            allow_super_property: false,
            allow_super_call: false,
            no_in: false,
            var_names: Vec::new(),
            var_declarations: Vec::new(),
            private_scopes: Vec::new(),
        })
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let body = self.parse_body(true)?;
        if !self.tokens.is_at_end() {
            return Err(self.unexpected());
        }
        self.check_declarations(&body, &[], true)?;
        Ok(Program {
            body,
            strict: self.strict,
            var_names: std::mem::take(&mut self.var_names),
        })
    }

    // ----- token helpers -----

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.peek_kind()
    }

    fn at_punct(&self, p: Punctuator) -> bool {
        self.tokens.check(TokenKind::Punctuator(p))
    }

    fn at_keyword(&self, k: Keyword) -> bool {
        self.tokens.check(TokenKind::Keyword(k))
    }

    /// Identifier token spelled `word`, e.g. the contextual `static`.
    fn at_contextual(&self, word: &str) -> bool {
        self.tokens
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Identifier && t.text == word)
    }

    fn nth_is_punct(&self, n: usize, p: Punctuator) -> bool {
        self.tokens.peek_nth(n).is_some_and(|t| t.kind == TokenKind::Punctuator(p))
    }

    fn eat_punct(&mut self, p: Punctuator) -> bool {
        self.tokens.eat(TokenKind::Punctuator(p))
    }

    fn eat_keyword(&mut self, k: Keyword) -> bool {
        self.tokens.eat(TokenKind::Keyword(k))
    }

    fn advance(&mut self) -> Result<Token<'src>, ParseError> {
        self.tokens
            .next()
            .ok_or_else(|| self.error(SyntaxErrorKind::UnexpectedEnd))
    }

    fn expect_punct(&mut self, p: Punctuator) -> Result<(), ParseError> {
        if self.eat_punct(p) { Ok(()) } else { Err(self.unexpected()) }
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(k) { Ok(()) } else { Err(self.unexpected()) }
    }

    fn error(&self, kind: SyntaxErrorKind) -> ParseError {
        ParseError::new(kind, self.tokens.location())
    }

    fn unexpected(&self) -> ParseError {
        match self.tokens.peek() {
            Some(token) => unexpected_token(token),
            None => self.error(SyntaxErrorKind::UnexpectedEnd),
        }
    }

    /// `;`, or an inserted one before `}`, end of input, or a line break.
    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat_punct(Punctuator::Semicolon) {
            return Ok(());
        }
        if self.tokens.is_at_end()
            || self.at_punct(Punctuator::RightBrace)
            || self.tokens.line_terminator_before()
        {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn source_since(&self, start: usize) -> String {
        self.source[start..self.tokens.previous_end()].to_string()
    }

    // ----- identifiers -----

    fn check_identifier_reference(&self, token: &Token<'src>) -> Result<(), ParseError> {
        if self.strict && is_strict_reserved_word(token.text) {
            return Err(ParseError::new(SyntaxErrorKind::StrictReservedWord, token.location));
        }
        Ok(())
    }

    fn check_binding_name(&self, name: &str, location: SourceLocation) -> Result<(), ParseError> {
        if self.strict && is_strict_reserved_word(name) {
            return Err(ParseError::new(SyntaxErrorKind::StrictReservedWord, location));
        }
        if self.strict && (name == "eval" || name == "arguments") {
            return Err(ParseError::new(SyntaxErrorKind::StrictEvalOrArguments, location));
        }
        Ok(())
    }

    fn parse_binding_identifier(&mut self) -> Result<String, ParseError> {
        let Some(token) = self.tokens.peek().copied() else {
            return Err(self.error(SyntaxErrorKind::UnexpectedEnd));
        };
        match token.kind {
            TokenKind::Identifier => {
                self.check_binding_name(token.text, token.location)?;
                self.tokens.next();
                Ok(token.text.to_string())
            }
            TokenKind::Keyword(Keyword::Let) if !self.strict => {
                self.tokens.next();
                Ok("let".to_string())
            }
            TokenKind::Punctuator(Punctuator::LeftBracket | Punctuator::LeftBrace) => {
                Err(self.error(SyntaxErrorKind::Unsupported("Destructuring patterns")))
            }
            _ => Err(unexpected_token(&token)),
        }
    }

    // ----- literals -----

    fn string_literal(&self, token: &Token<'src>) -> Result<JsString, ParseError> {
        literal::string_value(token.text, self.strict)
            .map(JsString::from_code_units)
            .map_err(|e| ParseError::new(e.into(), token.location))
    }

    fn numeric_literal(&self, token: &Token<'src>) -> Result<Literal, ParseError> {
        if self.strict && literal::is_legacy_octal_like(token.text) {
            return Err(ParseError::new(SyntaxErrorKind::StrictOctalLiteral, token.location));
        }
        Ok(match literal::numeric_value(token.text) {
            NumericValue::Number(n) => Literal::Number(n),
            NumericValue::BigInt(b) => Literal::BigInt(b),
        })
    }

    // ----- scopes -----

    fn declare_var(&mut self, name: &str) {
        self.var_declarations.push(name.to_string());
        if !self.var_names.iter().any(|n| n == name) {
            self.var_names.push(name.to_string());
        }
    }

    fn enter_function(&mut self, allow_super_property: bool, allow_super_call: bool) -> FunctionContext {
        let saved = FunctionContext {
            strict: self.strict,
            in_function: self.in_function,
            in_iteration: self.in_iteration,
            in_switch: self.in_switch,
            labels: std::mem::take(&mut self.labels),
            allow_super_property: self.allow_super_property,
            allow_super_call: self.allow_super_call,
            var_names: std::mem::take(&mut self.var_names),
            var_declarations: std::mem::take(&mut self.var_declarations),
        };
        self.in_function = true;
        self.in_iteration = 0;
        self.in_switch = 0;
        self.allow_super_property = allow_super_property;
        self.allow_super_call = allow_super_call;
        saved
    }

    /// Restores the enclosing context; returns the function's own
    /// strictness and var names.
    fn exit_function(&mut self, saved: FunctionContext) -> (bool, Vec<String>) {
        let strict = std::mem::replace(&mut self.strict, saved.strict);
        let var_names = std::mem::replace(&mut self.var_names, saved.var_names);
        self.var_declarations = saved.var_declarations;
        self.in_function = saved.in_function;
        self.in_iteration = saved.in_iteration;
        self.in_switch = saved.in_switch;
        self.labels = saved.labels;
        self.allow_super_property = saved.allow_super_property;
        self.allow_super_call = saved.allow_super_call;
        (strict, var_names)
    }

    /// Whether the next token is a `use strict` literal spelled without
    /// escapes. It is a directive only if the statement it starts turns out
    /// to be that literal alone.
    fn at_use_strict_literal(&self) -> bool {
        self.tokens.peek().is_some_and(|token| {
            token.kind == TokenKind::StringLiteral && matches!(token.text, "'use strict'" | "\"use strict\"")
        })
    }

    /// A statement list up to `}` or end of input, honoring a directive
    /// prologue when `directives` is set.
    fn parse_body(&mut self, directives: bool) -> Result<Vec<Statement>, ParseError> {
        let mut body = Vec::new();
        let mut in_prologue = directives;
        while !self.tokens.is_at_end() && !self.at_punct(Punctuator::RightBrace) {
            let use_strict = in_prologue && self.at_use_strict_literal();
            let stmt = self.parse_statement_list_item()?;
            if in_prologue {
                if matches!(stmt, Statement::Expression(Expression::Literal(Literal::String(_)))) {
                    if use_strict {
                        self.strict = true;
                    }
                } else {
                    in_prologue = false;
                }
            }
            body.push(stmt);
        }
        Ok(body)
    }

    /// Rejects a statement list that declares a lexical name twice, or a
    /// lexical name that clashes with a var-scoped one. At function and
    /// script top level function declarations are var-scoped.
    fn check_declarations(
        &self,
        body: &[Statement],
        var_scoped: &[String],
        top_level: bool,
    ) -> Result<(), ParseError> {
        let mut seen: Vec<&str> = Vec::new();
        let mut top_level_functions: Vec<&str> = Vec::new();
        for stmt in body {
            let Statement::Declaration(decl) = stmt else {
                continue;
            };
            if top_level && let Declaration::Function(f) = decl {
                top_level_functions.extend(f.name.as_deref());
                continue;
            }
            for name in decl.bound_names() {
                let clashes = seen.contains(&name)
                    || var_scoped.iter().any(|v| v == name)
                    || (top_level && self.var_names.iter().any(|v| v == name));
                if clashes {
                    return Err(self.error(SyntaxErrorKind::DuplicateDeclaration(name.to_string())));
                }
                seen.push(name);
            }
        }
        if let Some(name) = top_level_functions.iter().find(|f| seen.contains(f)) {
            return Err(self.error(SyntaxErrorKind::DuplicateDeclaration(name.to_string())));
        }
        Ok(())
    }

    // ----- private names -----

    fn declare_private_name(
        &mut self,
        name: &str,
        kind: ClassMethodKind,
        is_static: bool,
        location: SourceLocation,
    ) -> Result<(), ParseError> {
        let Some(scope) = self.private_scopes.last_mut() else {
            return Err(ParseError::new(SyntaxErrorKind::UndeclaredPrivateName(name.to_string()), location));
        };
        let accessor_pair = |a: ClassMethodKind, b: ClassMethodKind| {
            matches!(
                (a, b),
                (ClassMethodKind::Get, ClassMethodKind::Set) | (ClassMethodKind::Set, ClassMethodKind::Get)
            )
        };
        let mut existing = scope.declared.iter().filter(|(n, _, _)| n == name);
        let duplicate = match (existing.next(), existing.next()) {
            (None, _) => false,
            (Some(&(_, other, other_static)), None) => !(accessor_pair(kind, other) && other_static == is_static),
            (Some(_), Some(_)) => true,
        };
        if duplicate {
            return Err(ParseError::new(SyntaxErrorKind::DuplicatePrivateName(name.to_string()), location));
        }
        scope.declared.push((name.to_string(), kind, is_static));
        Ok(())
    }

    fn reference_private_name(&mut self, name: &str, location: SourceLocation) -> Result<(), ParseError> {
        match self.private_scopes.last_mut() {
            Some(scope) => {
                scope.referenced.push((name.to_string(), location));
                Ok(())
            }
            None => Err(ParseError::new(SyntaxErrorKind::UndeclaredPrivateName(name.to_string()), location)),
        }
    }

    /// Closes a class body; names it did not declare must resolve in an
    /// enclosing class.
    fn exit_private_scope(&mut self) -> Result<(), ParseError> {
        let Some(scope) = self.private_scopes.pop() else {
            return Ok(());
        };
        for (name, location) in scope.referenced {
            if scope.declared.iter().any(|(declared, _, _)| *declared == name) {
                continue;
            }
            self.reference_private_name(&name, location)?;
        }
        Ok(())
    }
}

fn unexpected_token(token: &Token<'_>) -> ParseError {
    ParseError::new(SyntaxErrorKind::UnexpectedToken(token.to_string()), token.location)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        parse(src).unwrap()
    }

    fn parse_err(src: &str) -> SyntaxErrorKind {
        parse(src).unwrap_err().kind
    }

    #[test]
    fn parse_empty() {
        assert!(parse_ok("").body.is_empty());
        assert!(parse_ok("  // nothing\n").body.is_empty());
    }

    #[test]
    fn use_strict_directive() {
        assert!(parse_ok("'use strict'; x = 1;").strict);
        assert!(parse_ok("\"use strict\"\nx;").strict);
        assert!(!parse_ok("x; 'use strict';").strict);
        assert!(!parse_ok("'use strict' + 1;").strict);
        assert!(!parse_ok("'use strict'\n+ 1;").strict);
        assert!(!parse_ok("'use\\x20strict';").strict);
        assert!(parse_ok("'a'\n'use strict'\nx;").strict);
        let program = parse_ok("function f() { 'use strict'\n return this; }");
        assert!(matches!(&program.body[0], Statement::Declaration(Declaration::Function(f)) if f.strict));
        assert_eq!(parse_err("'use strict'; var eval;"), SyntaxErrorKind::StrictEvalOrArguments);
        assert_eq!(parse_err("'use strict'; 017;"), SyntaxErrorKind::StrictOctalLiteral);
    }

    #[test]
    fn unexpected_end_is_reported_at_the_end_of_input() {
        let err = parse("f(\n").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnexpectedEnd);
        assert_eq!((err.location.line, err.location.column), (2, 0));
        let err = parse("{\r\u{2029}").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnexpectedEnd);
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn automatic_semicolons() {
        assert_eq!(parse_ok("a\nb").body.len(), 2);
        assert_eq!(parse_ok("{ a }").body.len(), 1);
        assert!(matches!(parse_err("a b"), SyntaxErrorKind::UnexpectedToken(t) if t == "b"));
    }

    #[test]
    fn var_names_are_collected() {
        let program = parse_ok("var a; { var b; } if (x) var a; function f() { var c; }");
        assert_eq!(program.var_names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn duplicate_lexical_declarations() {
        assert_eq!(
            parse_err("let a; const a = 1;"),
            SyntaxErrorKind::DuplicateDeclaration("a".into())
        );
        assert_eq!(parse_err("var a; let a;"), SyntaxErrorKind::DuplicateDeclaration("a".into()));
        assert_eq!(
            parse_err("{ function f() {} let f; }"),
            SyntaxErrorKind::DuplicateDeclaration("f".into())
        );
        parse_ok("function f() {} var f;");
        parse_ok("let a; { let a; }");
    }

    #[test]
    fn errors_carry_locations() {
        let err = parse("let x = 1;\nx = ;").unwrap_err();
        assert_eq!(err.location.line, 2);
        assert_eq!(err.location.column, 4);
        assert_eq!(err.to_string(), "SyntaxError: Unexpected token ';' (2:4)");
    }

    #[test]
    fn lexical_errors_abort_parsing() {
        assert!(matches!(parse_err("let a = 1 @ 2;"), SyntaxErrorKind::Lex(_)));
        assert!(matches!(parse_err("/* open"), SyntaxErrorKind::Lex(_)));
    }

    #[test]
    fn parsing_is_deterministic() {
        let src = "function f(a) { return a ** 2 ** 3; } new f(1).x;";
        assert_eq!(format!("{:?}", parse_ok(src)), format!("{:?}", parse_ok(src)));
    }
}
