use std::rc::Rc;

use super::*;

impl<'src> Parser<'src> {
    pub(super) fn parse_variable_statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Var)?;
        let decl = self.parse_variable_declaration_list(VarKind::Var, true)?;
        self.consume_semicolon()?;
        Ok(Statement::Variable(decl))
    }

    pub(super) fn parse_lexical_declaration(&mut self) -> Result<Statement, ParseError> {
        let kind = if self.eat_keyword(Keyword::Let) {
            VarKind::Let
        } else {
            self.expect_keyword(Keyword::Const)?;
            VarKind::Const
        };
        let decl = self.parse_variable_declaration_list(kind, true)?;
        self.consume_semicolon()?;
        Ok(Statement::Declaration(Declaration::Lexical(decl)))
    }

    /// Comma-separated bindings after `var`/`let`/`const`. A `for` head
    /// defers the const initializer check until it knows the loop form.
    pub(super) fn parse_variable_declaration_list(
        &mut self,
        kind: VarKind,
        require_const_init: bool,
    ) -> Result<VariableDeclaration, ParseError> {
        let mut declarations = Vec::new();
        loop {
            let location = self.tokens.location();
            let name = self.parse_binding_identifier()?;
            if kind == VarKind::Var {
                self.declare_var(&name);
            } else if name == "let" {
                return Err(ParseError::new(SyntaxErrorKind::LetInLexicalBinding, location));
            }
            let init = if self.eat_punct(Punctuator::Assign) {
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            if kind == VarKind::Const && require_const_init && init.is_none() {
                return Err(self.error(SyntaxErrorKind::ConstWithoutInitializer));
            }
            declarations.push(VariableDeclarator { name, init });
            if !self.eat_punct(Punctuator::Comma) {
                break;
            }
        }
        Ok(VariableDeclaration { kind, declarations })
    }

    pub(super) fn parse_function_declaration(&mut self) -> Result<Statement, ParseError> {
        let start = self.tokens.location();
        self.expect_keyword(Keyword::Function)?;
        if self.at_punct(Punctuator::Star) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Generator functions")));
        }
        let name = self.parse_binding_identifier()?;
        let function = self.parse_function_rest(Some(name), FunctionKind::Normal, start.offset, false, false)?;
        Ok(Statement::Declaration(Declaration::Function(function)))
    }

    /// Parameters and body of any function form, from `(` onwards.
    pub(super) fn parse_function_rest(
        &mut self,
        name: Option<String>,
        kind: FunctionKind,
        start_offset: usize,
        allow_super_property: bool,
        allow_super_call: bool,
    ) -> Result<Rc<FunctionDef>, ParseError> {
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let saved = self.enter_function(allow_super_property, allow_super_call);
        let parts = self.parse_function_parts(name.as_deref(), kind);
        let (strict, var_names) = self.exit_function(saved);
        self.no_in = saved_no_in;
        let (params, body) = parts?;

        tracing::trace!(name = name.as_deref().unwrap_or(""), params = params.len(), strict, "parsed function");
        Ok(Rc::new(FunctionDef {
            name,
            kind,
            params,
            body,
            strict,
            var_names,
            source_text: self.source_since(start_offset),
        }))
    }

    /// Runs inside the function's own context, which the caller restores
    /// whether or not this succeeds.
    fn parse_function_parts(
        &mut self,
        name: Option<&str>,
        kind: FunctionKind,
    ) -> Result<(Vec<String>, Vec<Statement>), ParseError> {
        let params_location = self.tokens.location();
        let params = self.parse_formal_parameters()?;
        self.expect_punct(Punctuator::LeftBrace)?;
        let body = self.parse_body(true)?;
        self.expect_punct(Punctuator::RightBrace)?;

        // a "use strict" directive in the body applies to the name and
        // parameters too
        if self.strict {
            if let Some(name) = name {
                self.check_binding_name(name, params_location)?;
            }
            for param in &params {
                self.check_binding_name(param, params_location)?;
            }
        }
        let unique_params = self.strict || kind != FunctionKind::Normal;
        if unique_params && params.iter().enumerate().any(|(i, p)| params[..i].contains(p)) {
            return Err(ParseError::new(SyntaxErrorKind::DuplicateParameter, params_location));
        }
        self.check_declarations(&body, &params, true)?;
        Ok((params, body))
    }

    fn parse_formal_parameters(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect_punct(Punctuator::LeftParen)?;
        let mut params = Vec::new();
        while !self.eat_punct(Punctuator::RightParen) {
            if self.at_punct(Punctuator::Ellipsis) {
                return Err(self.error(SyntaxErrorKind::Unsupported("Rest parameters")));
            }
            params.push(self.parse_binding_identifier()?);
            if self.at_punct(Punctuator::Assign) {
                return Err(self.error(SyntaxErrorKind::Unsupported("Default parameters")));
            }
            if !self.at_punct(Punctuator::RightParen) {
                self.expect_punct(Punctuator::Comma)?;
            }
        }
        Ok(params)
    }

    pub(super) fn check_accessor_arity(
        &self,
        function: &FunctionDef,
        kind: ClassMethodKind,
        location: SourceLocation,
    ) -> Result<(), ParseError> {
        match (kind, function.params.len()) {
            (ClassMethodKind::Get, n) if n != 0 => Err(ParseError::new(SyntaxErrorKind::GetterArity, location)),
            (ClassMethodKind::Set, n) if n != 1 => Err(ParseError::new(SyntaxErrorKind::SetterArity, location)),
            _ => Ok(()),
        }
    }

    /// A class declaration or expression. Class bodies are always strict.
    pub(super) fn parse_class(&mut self, is_declaration: bool) -> Result<Rc<ClassDef>, ParseError> {
        let start = self.tokens.location();
        self.expect_keyword(Keyword::Class)?;
        let saved_strict = std::mem::replace(&mut self.strict, true);
        let class = self.parse_class_rest(is_declaration, start.offset);
        self.strict = saved_strict;
        class
    }

    fn parse_class_rest(&mut self, is_declaration: bool, start_offset: usize) -> Result<Rc<ClassDef>, ParseError> {
        let name = if self.at_keyword(Keyword::Extends) || self.at_punct(Punctuator::LeftBrace) {
            if is_declaration {
                return Err(self.unexpected());
            }
            None
        } else {
            Some(self.parse_binding_identifier()?)
        };

        // the heritage sees only the enclosing private names
        let super_class = if self.eat_keyword(Keyword::Extends) {
            Some(Box::new(self.parse_left_hand_side_expression()?))
        } else {
            None
        };

        self.expect_punct(Punctuator::LeftBrace)?;
        self.private_scopes.push(PrivateScope::default());
        let elements = self.parse_class_elements(super_class.is_some());
        let closed = self.exit_private_scope();
        let (constructor, body) = elements?;
        closed?;

        Ok(Rc::new(ClassDef {
            name,
            super_class,
            constructor,
            body,
            source_text: self.source_since(start_offset),
        }))
    }

    fn parse_class_elements(
        &mut self,
        derived: bool,
    ) -> Result<(Option<Rc<FunctionDef>>, Vec<ClassMethod>), ParseError> {
        let mut constructor = None;
        let mut body = Vec::new();
        while !self.eat_punct(Punctuator::RightBrace) {
            if self.eat_punct(Punctuator::Semicolon) {
                continue;
            }
            self.parse_class_element(derived, &mut constructor, &mut body)?;
        }
        Ok((constructor, body))
    }

    fn parse_class_element(
        &mut self,
        derived: bool,
        constructor: &mut Option<Rc<FunctionDef>>,
        body: &mut Vec<ClassMethod>,
    ) -> Result<(), ParseError> {
        let start = self.tokens.location();
        if self.at_contextual("static") && self.nth_is_punct(1, Punctuator::LeftBrace) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Static initialization blocks")));
        }
        let is_static = self.at_contextual("static") && self.prefix_modifies_next();
        if is_static {
            self.tokens.next();
        }
        if self.at_punct(Punctuator::Star) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Generator methods")));
        }
        if self.at_contextual("async") && self.prefix_modifies_next() {
            return Err(self.error(SyntaxErrorKind::Unsupported("Async methods")));
        }
        let kind = if self.at_contextual("get") && self.prefix_modifies_next() {
            self.tokens.next();
            ClassMethodKind::Get
        } else if self.at_contextual("set") && self.prefix_modifies_next() {
            self.tokens.next();
            ClassMethodKind::Set
        } else {
            ClassMethodKind::Method
        };

        let key_location = self.tokens.location();
        let key = if self.tokens.check(TokenKind::PrivateName) {
            let token = self.advance()?;
            let name = &token.text[1..];
            if name == "constructor" {
                return Err(ParseError::new(SyntaxErrorKind::PrivateConstructor, token.location));
            }
            self.declare_private_name(name, kind, is_static, token.location)?;
            ClassKey::Private(name.to_string())
        } else {
            ClassKey::Public(self.parse_property_name()?)
        };
        if !self.at_punct(Punctuator::LeftParen) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Class fields")));
        }

        let is_constructor = !is_static && matches!(&key, ClassKey::Public(k) if property_name_is(k, "constructor"));
        if is_constructor {
            if kind != ClassMethodKind::Method {
                return Err(ParseError::new(SyntaxErrorKind::ConstructorAccessor, key_location));
            }
            if constructor.is_some() {
                return Err(ParseError::new(SyntaxErrorKind::DuplicateConstructor, key_location));
            }
            let function =
                self.parse_function_rest(None, FunctionKind::ClassConstructor, start.offset, true, derived)?;
            *constructor = Some(function);
            return Ok(());
        }
        if is_static && matches!(&key, ClassKey::Public(k) if property_name_is(k, "prototype")) {
            return Err(ParseError::new(SyntaxErrorKind::StaticPrototype, key_location));
        }

        let value = self.parse_function_rest(None, FunctionKind::Method, start.offset, true, false)?;
        self.check_accessor_arity(&value, kind, key_location)?;
        body.push(ClassMethod { key, kind, value, is_static });
        Ok(())
    }
}

/// Whether a literal key spells `name`, as `constructor` and `'constructor'`
/// both do; computed keys never match.
fn property_name_is(key: &PropertyName, name: &str) -> bool {
    match key {
        PropertyName::Identifier(id) => id == name,
        PropertyName::String(s) => *s == JsString::from_str(name),
        PropertyName::Number(_) | PropertyName::Computed(_) => false,
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

    fn only_class(src: &str) -> std::rc::Rc<ClassDef> {
        match parse_ok(src).into_iter().next() {
            Some(Statement::Declaration(Declaration::Class(class))) => class,
            other => panic!("expected a class declaration, got {other:?}"),
        }
    }

    #[test]
    fn variable_declarations() {
        let body = parse_ok("var a = 1, b; let c; const d = 2;");
        assert!(matches!(&body[0], Statement::Variable(d) if d.declarations.len() == 2));
        assert!(matches!(&body[1], Statement::Declaration(Declaration::Lexical(d)) if d.kind == VarKind::Let));
        assert!(matches!(&body[2], Statement::Declaration(Declaration::Lexical(d)) if d.kind == VarKind::Const));
        assert_eq!(parse_err("const x;"), SyntaxErrorKind::ConstWithoutInitializer);
        assert_eq!(parse_err("let let = 1;"), SyntaxErrorKind::LetInLexicalBinding);
        assert_eq!(parse_err("let a, a;"), SyntaxErrorKind::DuplicateDeclaration("a".into()));
        parse_ok("var a; var a;");
    }

    #[test]
    fn function_declarations() {
        let body = parse_ok("function add(a, b) { var t = a + b; return t; }");
        let Statement::Declaration(Declaration::Function(f)) = &body[0] else {
            panic!("expected function");
        };
        assert_eq!(f.name.as_deref(), Some("add"));
        assert_eq!(f.kind, FunctionKind::Normal);
        assert_eq!(f.var_names, vec!["t".to_string()]);
        assert!(!f.strict);
        assert_eq!(f.source_text, "function add(a, b) { var t = a + b; return t; }");
    }

    #[test]
    fn function_strictness() {
        let body = parse_ok("'use strict'; function f() {} function g() { 'use strict'; }");
        assert!(body.iter().skip(1).all(|s| matches!(s, Statement::Declaration(Declaration::Function(f)) if f.strict)));

        let body = parse_ok("function g() { 'use strict'; } function h() {}");
        let strictness: Vec<bool> = body
            .iter()
            .map(|s| match s {
                Statement::Declaration(Declaration::Function(f)) => f.strict,
                _ => panic!("expected functions"),
            })
            .collect();
        assert_eq!(strictness, vec![true, false]);

        assert_eq!(parse_err("function eval() { 'use strict'; }"), SyntaxErrorKind::StrictEvalOrArguments);
        assert_eq!(parse_err("function f(a, a) { 'use strict'; }"), SyntaxErrorKind::DuplicateParameter);
        parse_ok("function f(a, a) {}");
        assert_eq!(parse_err("({ m(a, a) {} })"), SyntaxErrorKind::DuplicateParameter);
    }

    #[test]
    fn parameters_and_body_names() {
        assert_eq!(parse_err("function f(a) { let a; }"), SyntaxErrorKind::DuplicateDeclaration("a".into()));
        assert!(matches!(parse_err("function f(...a) {}"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("function f(a = 1) {}"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("function* g() {}"), SyntaxErrorKind::Unsupported(_)));
        parse_ok("function f(a) { var a; }");
    }

    #[test]
    fn in_is_allowed_inside_function_bodies_in_for_heads() {
        parse_ok("for (var f = function () { return 'a' in o; }; ;) break;");
    }

    #[test]
    fn class_members() {
        let class = only_class(
            "class A extends B { constructor(x) { super(x); } m() { return super.m(); } static s() {} get g() {} set g(v) {} 'quoted'() {} [k]() {} static() {} }",
        );
        assert_eq!(class.name.as_deref(), Some("A"));
        assert!(class.super_class.is_some());
        let ctor = class.constructor.as_ref().unwrap();
        assert_eq!(ctor.kind, FunctionKind::ClassConstructor);
        assert!(ctor.strict);
        assert_eq!(class.body.len(), 7);
        assert!(class.body[1].is_static);
        assert_eq!(class.body[2].kind, ClassMethodKind::Get);
        assert_eq!(class.body[3].kind, ClassMethodKind::Set);
        assert!(matches!(&class.body[6].key, ClassKey::Public(PropertyName::Identifier(n)) if n == "static"));
        assert!(!class.body[6].is_static);
        assert!(class.source_text.starts_with("class A extends B {"));
        assert!(class.source_text.ends_with("static() {} }"));
    }

    #[test]
    fn class_restrictions() {
        assert_eq!(parse_err("class A { constructor() {} constructor() {} }"), SyntaxErrorKind::DuplicateConstructor);
        assert_eq!(parse_err("class A { get constructor() {} }"), SyntaxErrorKind::ConstructorAccessor);
        assert_eq!(parse_err("class A { static prototype() {} }"), SyntaxErrorKind::StaticPrototype);
        assert_eq!(parse_err("class A { constructor() { super(); } }"), SyntaxErrorKind::UnexpectedSuper);
        assert_eq!(parse_err("class A extends B { m() { super(); } }"), SyntaxErrorKind::UnexpectedSuper);
        assert_eq!(parse_err("class A { get g(x) {} }"), SyntaxErrorKind::GetterArity);
        assert_eq!(parse_err("class A { set s() {} }"), SyntaxErrorKind::SetterArity);
        assert_eq!(parse_err("class { }"), SyntaxErrorKind::UnexpectedToken("{".into()));
        assert!(matches!(parse_err("class A { x = 1; }"), SyntaxErrorKind::Unsupported(_)));
        // class bodies are strict
        assert_eq!(parse_err("class A { m() { var eval; } }"), SyntaxErrorKind::StrictEvalOrArguments);
        parse_ok("class A { static constructor() {} }");
    }

    #[test]
    fn private_names() {
        let class = only_class("class C { #m() {} get #a() {} set #a(v) {} static #s() {} test(o) { return o.#m; } }");
        assert!(matches!(&class.body[0].key, ClassKey::Private(n) if n == "m"));
        assert!(class.body[3].is_static);

        assert_eq!(parse_err("class C { #m() {} #m() {} }"), SyntaxErrorKind::DuplicatePrivateName("m".into()));
        assert_eq!(parse_err("class C { get #a() {} static set #a(v) {} }"), SyntaxErrorKind::DuplicatePrivateName("a".into()));
        assert_eq!(parse_err("class C { m() { this.#x; } }"), SyntaxErrorKind::UndeclaredPrivateName("x".into()));
        assert_eq!(parse_err("this.#x;"), SyntaxErrorKind::UndeclaredPrivateName("x".into()));
        assert_eq!(parse_err("class C { #constructor() {} }"), SyntaxErrorKind::PrivateConstructor);
        assert_eq!(parse_err("class C { #m() {} d() { delete this.#m; } }"), SyntaxErrorKind::PrivateDelete);
        // inner classes may use names declared by enclosing ones, and
        // references may precede declarations
        parse_ok("class O { #p() {} m() { class I { n(o) { return o.#p; } } } }");
        parse_ok("class C { a() { return this.#b; } #b() {} }");
    }

    #[test]
    fn class_expressions() {
        let body = parse_ok("var K = class extends Base {};");
        let Statement::Variable(decl) = &body[0] else {
            panic!("expected var");
        };
        let Some(Expression::Class(class)) = &decl.declarations[0].init else {
            panic!("expected class expression");
        };
        assert!(class.name.is_none());
        assert!(class.constructor.is_none());
    }

    #[test]
    fn object_methods_take_any_parameters() {
        parse_ok("({ m(a, b, c) {} })");
    }
}
