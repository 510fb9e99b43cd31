use super::*;

impl<'src> Parser<'src> {
    pub(super) fn parse_statement_list_item(&mut self) -> Result<Statement, ParseError> {
        if let Some(stmt) = self.try_parse_statement()? {
            return Ok(stmt);
        }
        match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Function)) => self.parse_function_declaration(),
            Some(TokenKind::Keyword(Keyword::Class)) => {
                let class = self.parse_class(true)?;
                Ok(Statement::Declaration(Declaration::Class(class)))
            }
            Some(TokenKind::Keyword(Keyword::Let | Keyword::Const)) => self.parse_lexical_declaration(),
            _ => Err(self.unexpected()),
        }
    }

    /// A statement in single-statement position, such as a loop body.
    fn parse_sub_statement(&mut self) -> Result<Statement, ParseError> {
        match self.try_parse_statement()? {
            Some(stmt) => Ok(stmt),
            None if self.tokens.is_at_end() => Err(self.error(SyntaxErrorKind::UnexpectedEnd)),
            None => Err(self.error(SyntaxErrorKind::LexicalInSingleStatement)),
        }
    }

    /// `let` starting a declaration rather than naming a variable.
    fn at_let_declaration(&self) -> bool {
        self.at_keyword(Keyword::Let)
            && self.tokens.peek_nth(1).is_some_and(|next| {
                matches!(
                    next.kind,
                    TokenKind::Identifier
                        | TokenKind::Keyword(Keyword::Let)
                        | TokenKind::Punctuator(Punctuator::LeftBracket | Punctuator::LeftBrace)
                )
            })
    }

    fn at_declaration(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(TokenKind::Keyword(Keyword::Function | Keyword::Class | Keyword::Const))
        ) || self.at_let_declaration()
    }

    /// Returns `None` without consuming anything at a declaration.
    fn try_parse_statement(&mut self) -> Result<Option<Statement>, ParseError> {
        let Some(kind) = self.peek_kind() else {
            return Ok(None);
        };
        if self.at_declaration() || (self.strict && self.at_keyword(Keyword::Let)) {
            return Ok(None);
        }
        let stmt = match kind {
            TokenKind::Punctuator(Punctuator::LeftBrace) => self.parse_block_statement()?,
            TokenKind::Punctuator(Punctuator::Semicolon) => {
                self.tokens.next();
                Statement::Empty
            }
            TokenKind::Keyword(Keyword::Var) => self.parse_variable_statement()?,
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement()?,
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while_statement()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for_statement()?,
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement()?,
            TokenKind::Keyword(Keyword::Break) => self.parse_break_statement()?,
            TokenKind::Keyword(Keyword::Continue) => self.parse_continue_statement()?,
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw_statement()?,
            TokenKind::Keyword(Keyword::Try) => self.parse_try_statement()?,
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch_statement()?,
            TokenKind::Keyword(Keyword::With) => {
                return Err(self.error(SyntaxErrorKind::Unsupported("with statements")));
            }
            TokenKind::Keyword(Keyword::Import | Keyword::Export) => {
                return Err(self.error(SyntaxErrorKind::Unsupported("Modules")));
            }
            TokenKind::Keyword(Keyword::Debugger) => {
                self.tokens.next();
                self.consume_semicolon()?;
                Statement::Debugger
            }
            TokenKind::Identifier if self.nth_is_punct(1, Punctuator::Colon) => self.parse_labeled_statement()?,
            _ => self.parse_expression_statement()?,
        };
        Ok(Some(stmt))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Expression(expr))
    }

    fn parse_labeled_statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.advance()?;
        self.check_identifier_reference(&token)?;
        self.expect_punct(Punctuator::Colon)?;
        let name = token.text.to_string();
        if self.labels.iter().any(|(label, _)| *label == name) {
            return Err(ParseError::new(SyntaxErrorKind::DuplicateLabel(name), token.location));
        }

        // `a: b: while (...)` makes both labels valid `continue` targets.
        let mut n = 0;
        while self.tokens.peek_nth(n).is_some_and(|t| t.kind == TokenKind::Identifier)
            && self.nth_is_punct(n + 1, Punctuator::Colon)
        {
            n += 2;
        }
        let is_iteration = self.tokens.peek_nth(n).is_some_and(|t| {
            matches!(t.kind, TokenKind::Keyword(Keyword::For | Keyword::While | Keyword::Do))
        });

        self.labels.push((name.clone(), is_iteration));
        let body = self.parse_sub_statement();
        self.labels.pop();
        Ok(Statement::Labeled(name, Box::new(body?)))
    }

    /// `{ ... }` as a statement list with its own lexical scope.
    pub(super) fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect_punct(Punctuator::LeftBrace)?;
        let first_var = self.var_declarations.len();
        let mut body = Vec::new();
        while !self.eat_punct(Punctuator::RightBrace) {
            if self.tokens.is_at_end() {
                return Err(self.error(SyntaxErrorKind::UnexpectedEnd));
            }
            body.push(self.parse_statement_list_item()?);
        }
        self.check_declarations(&body, &self.var_declarations[first_var..], false)?;
        Ok(body)
    }

    fn parse_block_statement(&mut self) -> Result<Statement, ParseError> {
        Ok(Statement::Block(self.parse_block()?))
    }

    fn parse_parenthesized(&mut self) -> Result<Expression, ParseError> {
        self.expect_punct(Punctuator::LeftParen)?;
        let expr = self.parse_expression()?;
        self.expect_punct(Punctuator::RightParen)?;
        Ok(expr)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::If)?;
        let test = self.parse_parenthesized()?;
        let consequent = Box::new(self.parse_sub_statement()?);
        let alternate = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.parse_sub_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement { test, consequent, alternate }))
    }

    fn parse_iteration_body(&mut self) -> Result<Box<Statement>, ParseError> {
        self.in_iteration += 1;
        let body = self.parse_sub_statement();
        self.in_iteration -= 1;
        Ok(Box::new(body?))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::While)?;
        let test = self.parse_parenthesized()?;
        let body = self.parse_iteration_body()?;
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Do)?;
        let body = self.parse_iteration_body()?;
        self.expect_keyword(Keyword::While)?;
        let test = self.parse_parenthesized()?;
        // the semicolon after `do ... while (x)` is always optional
        self.eat_punct(Punctuator::Semicolon);
        Ok(Statement::DoWhile(DoWhileStatement { test, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::For)?;
        if self.at_contextual("await") {
            return Err(self.error(SyntaxErrorKind::Unsupported("for-await loops")));
        }
        self.expect_punct(Punctuator::LeftParen)?;

        self.no_in = true;
        let init = self.parse_for_init();
        self.no_in = false;
        let init = init?;
        if self.at_keyword(Keyword::In) || self.at_contextual("of") {
            return Err(self.error(SyntaxErrorKind::Unsupported("for-in/for-of loops")));
        }
        if let Some(ForInit::Variable(decl)) = &init {
            if decl.kind == VarKind::Const && decl.declarations.iter().any(|d| d.init.is_none()) {
                return Err(self.error(SyntaxErrorKind::ConstWithoutInitializer));
            }
            if decl.kind != VarKind::Var {
                let names: Vec<&str> = decl.declarations.iter().map(|d| d.name.as_str()).collect();
                for (i, name) in names.iter().enumerate() {
                    if names[..i].contains(name) {
                        return Err(self.error(SyntaxErrorKind::DuplicateDeclaration(name.to_string())));
                    }
                }
            }
        }
        self.expect_punct(Punctuator::Semicolon)?;

        let test = if self.at_punct(Punctuator::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punctuator::Semicolon)?;
        let update = if self.at_punct(Punctuator::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punctuator::RightParen)?;

        let body = self.parse_iteration_body()?;
        Ok(Statement::For(ForStatement { init, test, update, body }))
    }

    fn parse_for_init(&mut self) -> Result<Option<ForInit>, ParseError> {
        if self.at_punct(Punctuator::Semicolon) {
            return Ok(None);
        }
        let kind = if self.at_keyword(Keyword::Var) {
            Some(VarKind::Var)
        } else if self.at_let_declaration() || (self.strict && self.at_keyword(Keyword::Let)) {
            Some(VarKind::Let)
        } else if self.at_keyword(Keyword::Const) {
            Some(VarKind::Const)
        } else {
            None
        };
        match kind {
            Some(kind) => {
                self.tokens.next();
                // const without initializer is checked by the caller, once
                // it is known this is not a for-in/of head
                let decl = self.parse_variable_declaration_list(kind, false)?;
                Ok(Some(ForInit::Variable(decl)))
            }
            None => Ok(Some(ForInit::Expression(self.parse_expression()?))),
        }
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.tokens.location();
        self.expect_keyword(Keyword::Return)?;
        if !self.in_function {
            return Err(ParseError::new(SyntaxErrorKind::IllegalReturn, location));
        }
        let value = if self.at_punct(Punctuator::Semicolon)
            || self.at_punct(Punctuator::RightBrace)
            || self.tokens.is_at_end()
            || self.tokens.line_terminator_before()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Statement::Return(value))
    }

    /// A label on the same line as `break`/`continue`.
    fn parse_optional_label(&mut self) -> Result<Option<(String, SourceLocation)>, ParseError> {
        if self.tokens.line_terminator_before() || !self.tokens.check(TokenKind::Identifier) {
            return Ok(None);
        }
        let token = self.advance()?;
        Ok(Some((token.text.to_string(), token.location)))
    }

    fn parse_break_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.tokens.location();
        self.expect_keyword(Keyword::Break)?;
        let label = match self.parse_optional_label()? {
            Some((label, label_location)) => {
                if !self.labels.iter().any(|(name, _)| *name == label) {
                    return Err(ParseError::new(SyntaxErrorKind::UndefinedLabel(label), label_location));
                }
                Some(label)
            }
            None if self.in_iteration == 0 && self.in_switch == 0 => {
                return Err(ParseError::new(SyntaxErrorKind::IllegalBreak, location));
            }
            None => None,
        };
        self.consume_semicolon()?;
        Ok(Statement::Break(label))
    }

    fn parse_continue_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.tokens.location();
        self.expect_keyword(Keyword::Continue)?;
        if self.in_iteration == 0 {
            return Err(ParseError::new(SyntaxErrorKind::IllegalContinue, location));
        }
        let label = match self.parse_optional_label()? {
            Some((label, label_location)) => match self.labels.iter().find(|(name, _)| *name == label) {
                None => return Err(ParseError::new(SyntaxErrorKind::UndefinedLabel(label), label_location)),
                Some((_, false)) => return Err(ParseError::new(SyntaxErrorKind::IllegalContinue, location)),
                Some(_) => Some(label),
            },
            None => None,
        };
        self.consume_semicolon()?;
        Ok(Statement::Continue(label))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Throw)?;
        if self.tokens.line_terminator_before() {
            return Err(self.error(SyntaxErrorKind::NewlineAfterThrow));
        }
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Throw(expr))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, ParseError> {
        let location = self.tokens.location();
        self.expect_keyword(Keyword::Try)?;
        let block = self.parse_block()?;

        let handler = if self.eat_keyword(Keyword::Catch) {
            let param = if self.eat_punct(Punctuator::LeftParen) {
                let name = self.parse_binding_identifier()?;
                self.expect_punct(Punctuator::RightParen)?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block()?;
            if let Some(param) = &param {
                self.check_declarations(&body, std::slice::from_ref(param), false)?;
            }
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(ParseError::new(SyntaxErrorKind::TryWithoutCatchOrFinally, location));
        }
        Ok(Statement::Try(TryStatement { block, handler, finalizer }))
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Switch)?;
        let discriminant = self.parse_parenthesized()?;
        self.expect_punct(Punctuator::LeftBrace)?;

        let first_var = self.var_declarations.len();
        self.in_switch += 1;
        let cases = self.parse_switch_cases();
        self.in_switch -= 1;
        let cases = cases?;

        // all clauses share one scope
        let declarations: Vec<Statement> = cases
            .iter()
            .flat_map(|case| case.consequent.iter())
            .filter(|stmt| matches!(stmt, Statement::Declaration(_)))
            .cloned()
            .collect();
        self.check_declarations(&declarations, &self.var_declarations[first_var..], false)?;
        Ok(Statement::Switch(SwitchStatement { discriminant, cases }))
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, ParseError> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.eat_punct(Punctuator::RightBrace) {
            let location = self.tokens.location();
            let test = if self.eat_keyword(Keyword::Case) {
                Some(self.parse_expression()?)
            } else if self.eat_keyword(Keyword::Default) {
                if seen_default {
                    return Err(ParseError::new(SyntaxErrorKind::MultipleDefaults, location));
                }
                seen_default = true;
                None
            } else {
                return Err(self.unexpected());
            };
            self.expect_punct(Punctuator::Colon)?;

            let mut consequent = Vec::new();
            while !self.tokens.is_at_end()
                && !self.at_punct(Punctuator::RightBrace)
                && !self.at_keyword(Keyword::Case)
                && !self.at_keyword(Keyword::Default)
            {
                consequent.push(self.parse_statement_list_item()?);
            }
            cases.push(SwitchCase { test, consequent });
        }
        Ok(cases)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::{SyntaxErrorKind, parse};

    fn parse_ok(src: &str) -> Vec<Statement> {
        parse(src).unwrap().body
    }

    fn parse_err(src: &str) -> SyntaxErrorKind {
        parse(src).unwrap_err().kind
    }

    #[test]
    fn block_and_empty() {
        let body = parse_ok("{ 1; ; }");
        let [Statement::Block(inner)] = body.as_slice() else {
            panic!("expected one block");
        };
        assert!(matches!(inner.as_slice(), [Statement::Expression(_), Statement::Empty]));
    }

    #[test]
    fn block_lexical_names_clash_with_inner_vars() {
        assert_eq!(parse_err("{ let a; var a; }"), SyntaxErrorKind::DuplicateDeclaration("a".into()));
        assert_eq!(parse_err("{ var b; const b = 1; }"), SyntaxErrorKind::DuplicateDeclaration("b".into()));
        assert_eq!(parse_err("{ let c; { var c; } }"), SyntaxErrorKind::DuplicateDeclaration("c".into()));
        assert_eq!(parse_err("{ function d() {} for (var d; ;) break; }"), SyntaxErrorKind::DuplicateDeclaration("d".into()));
        parse_ok("var e; { let e; }");
        parse_ok("{ let f; (function () { var f; }); }");
        parse_ok("{ var g; } { let g; }");
    }

    #[test]
    fn if_else_binds_to_nearest() {
        let body = parse_ok("if (a) if (b) x; else y;");
        let [Statement::If(outer)] = body.as_slice() else {
            panic!("expected if");
        };
        assert!(outer.alternate.is_none());
        assert!(matches!(&*outer.consequent, Statement::If(inner) if inner.alternate.is_some()));
    }

    #[test]
    fn loops() {
        assert!(matches!(parse_ok("while (x) x--;")[0], Statement::While(_)));
        assert!(matches!(parse_ok("do x++; while (x < 3)")[0], Statement::DoWhile(_)));
        assert_eq!(parse_ok("do ; while (0) x").len(), 2);

        let body = parse_ok("for (let i = 0, j; i < 3; i++) {}");
        let Statement::For(stmt) = &body[0] else {
            panic!("expected for");
        };
        assert!(matches!(&stmt.init, Some(ForInit::Variable(d)) if d.kind == VarKind::Let && d.declarations.len() == 2));
        assert!(stmt.test.is_some() && stmt.update.is_some());

        let body = parse_ok("for (;;) break;");
        let Statement::For(stmt) = &body[0] else {
            panic!("expected for");
        };
        assert!(stmt.init.is_none() && stmt.test.is_none() && stmt.update.is_none());
    }

    #[test]
    fn for_head_restrictions() {
        assert_eq!(parse_err("for (const i; ;) {}"), SyntaxErrorKind::ConstWithoutInitializer);
        assert!(matches!(parse_err("for (var k in o) {}"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("for (const v of o) {}"), SyntaxErrorKind::Unsupported(_)));
        // `in` inside parentheses is a relational operator again
        parse_ok("for (var a = ('x' in o); a; ) break;");
    }

    #[test]
    fn labels_and_jumps() {
        parse_ok("outer: for (;;) { inner: while (1) { continue outer; } }");
        parse_ok("a: b: while (1) continue a;");
        parse_ok("block: { break block; }");
        assert_eq!(parse_err("break;"), SyntaxErrorKind::IllegalBreak);
        assert_eq!(parse_err("while (1) { continue x; }"), SyntaxErrorKind::UndefinedLabel("x".into()));
        assert_eq!(parse_err("block: { continue block; }"), SyntaxErrorKind::IllegalContinue);
        assert_eq!(parse_err("l: while (1) { l: ; }"), SyntaxErrorKind::DuplicateLabel("l".into()));
        assert_eq!(parse_err("l: while (1) function f() { break l; }"), SyntaxErrorKind::LexicalInSingleStatement);
        assert_eq!(
            parse_err("l: while (1) { (function () { break l; }); }"),
            SyntaxErrorKind::UndefinedLabel("l".into())
        );
    }

    #[test]
    fn errors_in_nested_functions_are_syntax_errors() {
        assert_eq!(parse_err("while (1) { (function () { break; }); }"), SyntaxErrorKind::IllegalBreak);
        assert_eq!(parse_err("for (;;) { (function () { continue; }); }"), SyntaxErrorKind::IllegalContinue);
        assert_eq!(parse_err("do { class A { m() { break; } } } while (0)"), SyntaxErrorKind::IllegalBreak);
        assert_eq!(
            parse_err("while (1) { class C { m() { return this.#x; } } }"),
            SyntaxErrorKind::UndeclaredPrivateName("x".into())
        );
        assert_eq!(
            parse_err("switch (0) { case 0: (function () { let a, a; }); }"),
            SyntaxErrorKind::DuplicateDeclaration("a".into())
        );
    }

    #[test]
    fn return_placement() {
        assert_eq!(parse_err("return 1;"), SyntaxErrorKind::IllegalReturn);
        let body = parse_ok("function f() { return\n1; }");
        let Statement::Declaration(Declaration::Function(f)) = &body[0] else {
            panic!("expected function");
        };
        assert!(matches!(f.body.as_slice(), [Statement::Return(None), Statement::Expression(_)]));
    }

    #[test]
    fn throw_and_try() {
        assert_eq!(parse_err("throw\n1;"), SyntaxErrorKind::NewlineAfterThrow);
        assert_eq!(parse_err("try {}"), SyntaxErrorKind::TryWithoutCatchOrFinally);
        let body = parse_ok("try { a(); } catch (e) { b(e); } finally { c(); }");
        let Statement::Try(stmt) = &body[0] else {
            panic!("expected try");
        };
        assert_eq!(stmt.handler.as_ref().and_then(|h| h.param.as_deref()), Some("e"));
        assert!(stmt.finalizer.is_some());
        parse_ok("try {} catch { }");
        assert_eq!(
            parse_err("try {} catch (e) { let e; }"),
            SyntaxErrorKind::DuplicateDeclaration("e".into())
        );
    }

    #[test]
    fn switch_cases() {
        let body = parse_ok("switch (x) { case 1: a; case 2: default: b; break; }");
        let Statement::Switch(stmt) = &body[0] else {
            panic!("expected switch");
        };
        assert_eq!(stmt.cases.len(), 3);
        assert!(stmt.cases[1].consequent.is_empty());
        assert!(stmt.cases[2].test.is_none());
        assert_eq!(parse_err("switch (x) { default: default: }"), SyntaxErrorKind::MultipleDefaults);
        assert_eq!(
            parse_err("switch (x) { case 1: let a; case 2: let a; }"),
            SyntaxErrorKind::DuplicateDeclaration("a".into())
        );
        assert_eq!(
            parse_err("switch (x) { case 1: let a; break; default: var a; }"),
            SyntaxErrorKind::DuplicateDeclaration("a".into())
        );
    }

    #[test]
    fn lexical_declarations_need_a_statement_list() {
        assert_eq!(parse_err("if (x) let y = 1;"), SyntaxErrorKind::LexicalInSingleStatement);
        assert_eq!(parse_err("while (x) const y = 1;"), SyntaxErrorKind::LexicalInSingleStatement);
        // sloppy `let` is still an identifier where no declaration can follow
        assert!(matches!(parse_ok("let = 1;")[0], Statement::Expression(_)));
    }

    #[test]
    fn debugger_and_unsupported() {
        assert!(matches!(parse_ok("debugger;")[0], Statement::Debugger));
        assert!(matches!(parse_err("with (o) {}"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("import x from 'y';"), SyntaxErrorKind::Unsupported(_)));
    }
}
