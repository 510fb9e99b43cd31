use super::*;

type OperandParser<'src> = fn(&mut Parser<'src>) -> Result<Expression, ParseError>;

impl<'src> Parser<'src> {
    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_assignment_expression()?;
        if self.at_punct(Punctuator::Comma) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Comma expressions")));
        }
        Ok(expr)
    }

    /// Parses with `in` allowed again, as inside brackets and parentheses.
    fn parse_expression_allow_in(&mut self) -> Result<Expression, ParseError> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let expr = self.parse_expression();
        self.no_in = saved;
        expr
    }

    fn validate_assignment_target(&self, expr: &Expression, location: SourceLocation) -> Result<(), ParseError> {
        match expr {
            Expression::Identifier(name) => {
                if self.strict && (name == "eval" || name == "arguments") {
                    return Err(ParseError::new(SyntaxErrorKind::StrictEvalOrArguments, location));
                }
                Ok(())
            }
            Expression::Member(..) | Expression::SuperMember(_) => Ok(()),
            Expression::Object(_) => Err(ParseError::new(
                SyntaxErrorKind::Unsupported("Destructuring assignments"),
                location,
            )),
            _ => Err(ParseError::new(SyntaxErrorKind::InvalidAssignmentTarget, location)),
        }
    }

    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        let location = self.tokens.location();
        let left = self.parse_conditional_expression()?;
        if self.at_punct(Punctuator::Arrow) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Arrow functions")));
        }
        let Some(kind) = self.peek_kind() else {
            return Ok(left);
        };
        if kind == TokenKind::Punctuator(Punctuator::NullishAssign) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Logical nullish assignments")));
        }
        let Some(op) = assignment_operator(kind) else {
            return Ok(left);
        };
        self.validate_assignment_target(&left, location)?;
        self.tokens.next();
        let right = self.parse_assignment_expression()?; // right-associative
        Ok(Expression::Assign(op, Box::new(left), Box::new(right)))
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, ParseError> {
        let test = self.parse_logical_or()?;
        if !self.eat_punct(Punctuator::Question) {
            return Ok(test);
        }
        let saved = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assignment_expression();
        self.no_in = saved;
        let consequent = consequent?;
        self.expect_punct(Punctuator::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.eat_punct(Punctuator::LogicalOr) {
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        if self.at_punct(Punctuator::NullishCoalescing) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Nullish coalescing expressions")));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_or()?;
        while self.eat_punct(Punctuator::LogicalAnd) {
            let right = self.parse_bitwise_or()?;
            left = Expression::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// One left-associative binary level: operands come from the next
    /// tighter level, `operator` maps this level's tokens to nodes.
    fn parse_binary_level(
        &mut self,
        operand: OperandParser<'src>,
        operator: fn(TokenKind) -> Option<BinaryOp>,
    ) -> Result<Expression, ParseError> {
        let mut left = operand(self)?;
        while let Some(op) = self.peek_kind().and_then(operator) {
            self.tokens.next();
            let right = operand(self)?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_bitwise_xor, |kind| match kind {
            TokenKind::Punctuator(Punctuator::Pipe) => Some(BinaryOp::BitOr),
            _ => None,
        })
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_bitwise_and, |kind| match kind {
            TokenKind::Punctuator(Punctuator::Caret) => Some(BinaryOp::BitXor),
            _ => None,
        })
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_equality, |kind| match kind {
            TokenKind::Punctuator(Punctuator::Ampersand) => Some(BinaryOp::BitAnd),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_relational, |kind| match kind {
            TokenKind::Punctuator(Punctuator::Equal) => Some(BinaryOp::Eq),
            TokenKind::Punctuator(Punctuator::NotEqual) => Some(BinaryOp::NotEq),
            TokenKind::Punctuator(Punctuator::StrictEqual) => Some(BinaryOp::StrictEq),
            TokenKind::Punctuator(Punctuator::StrictNotEqual) => Some(BinaryOp::StrictNotEq),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let operator: fn(TokenKind) -> Option<BinaryOp> =
            if self.no_in { relational_operator_no_in } else { relational_operator };
        self.parse_binary_level(Self::parse_shift, operator)
    }

    fn parse_shift(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_additive, |kind| match kind {
            TokenKind::Punctuator(Punctuator::LeftShift) => Some(BinaryOp::LShift),
            TokenKind::Punctuator(Punctuator::RightShift) => Some(BinaryOp::RShift),
            TokenKind::Punctuator(Punctuator::UnsignedRightShift) => Some(BinaryOp::URShift),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Punctuator(Punctuator::Plus) => Some(BinaryOp::Add),
            TokenKind::Punctuator(Punctuator::Minus) => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_level(Self::parse_exponentiation, |kind| match kind {
            TokenKind::Punctuator(Punctuator::Star) => Some(BinaryOp::Mul),
            TokenKind::Punctuator(Punctuator::Slash) => Some(BinaryOp::Div),
            TokenKind::Punctuator(Punctuator::Percent) => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    fn at_unary_operator(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::Keyword(Keyword::Delete | Keyword::Void | Keyword::Typeof)
                    | TokenKind::Punctuator(
                        Punctuator::Plus | Punctuator::Minus | Punctuator::Tilde | Punctuator::Bang
                    )
            )
        )
    }

    fn parse_exponentiation(&mut self) -> Result<Expression, ParseError> {
        if self.at_unary_operator() {
            let expr = self.parse_unary()?;
            if self.at_punct(Punctuator::Exponent) {
                return Err(self.error(SyntaxErrorKind::UnaryBeforeExponentiation));
            }
            return Ok(expr);
        }
        let base = self.parse_update()?;
        if self.eat_punct(Punctuator::Exponent) {
            let exponent = self.parse_exponentiation()?; // right-associative
            return Ok(Expression::Binary(BinaryOp::Exp, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let Some(token) = self.tokens.peek().copied() else {
            return Err(self.error(SyntaxErrorKind::UnexpectedEnd));
        };
        let wrap: fn(Box<Expression>) -> Expression = match token.kind {
            TokenKind::Keyword(Keyword::Delete) => Expression::Delete,
            TokenKind::Keyword(Keyword::Void) => Expression::Void,
            TokenKind::Keyword(Keyword::Typeof) => Expression::Typeof,
            TokenKind::Punctuator(Punctuator::Plus) => |e| Expression::Unary(UnaryOp::Plus, e),
            TokenKind::Punctuator(Punctuator::Minus) => |e| Expression::Unary(UnaryOp::Minus, e),
            TokenKind::Punctuator(Punctuator::Tilde) => |e| Expression::Unary(UnaryOp::BitNot, e),
            TokenKind::Punctuator(Punctuator::Bang) => |e| Expression::Unary(UnaryOp::Not, e),
            _ => return self.parse_update(),
        };
        self.tokens.next();
        let operand = self.parse_unary()?;
        if token.kind == TokenKind::Keyword(Keyword::Delete) {
            match &operand {
                Expression::Identifier(_) if self.strict => {
                    return Err(ParseError::new(SyntaxErrorKind::StrictDelete, token.location));
                }
                Expression::Member(_, MemberProperty::Private(_)) => {
                    return Err(ParseError::new(SyntaxErrorKind::PrivateDelete, token.location));
                }
                _ => {}
            }
        }
        Ok(wrap(Box::new(operand)))
    }

    fn parse_update(&mut self) -> Result<Expression, ParseError> {
        let location = self.tokens.location();
        let prefix = if self.eat_punct(Punctuator::Increment) {
            Some(UpdateOp::Increment)
        } else if self.eat_punct(Punctuator::Decrement) {
            Some(UpdateOp::Decrement)
        } else {
            None
        };
        if let Some(op) = prefix {
            let operand = self.parse_unary()?;
            self.validate_update_target(&operand, location, "prefix")?;
            return Ok(Expression::Update(op, true, Box::new(operand)));
        }

        let expr = self.parse_left_hand_side_expression()?;
        if self.tokens.line_terminator_before() {
            return Ok(expr);
        }
        let op = if self.at_punct(Punctuator::Increment) {
            UpdateOp::Increment
        } else if self.at_punct(Punctuator::Decrement) {
            UpdateOp::Decrement
        } else {
            return Ok(expr);
        };
        self.validate_update_target(&expr, location, "postfix")?;
        self.tokens.next();
        Ok(Expression::Update(op, false, Box::new(expr)))
    }

    fn validate_update_target(
        &self,
        expr: &Expression,
        location: SourceLocation,
        position: &'static str,
    ) -> Result<(), ParseError> {
        match expr {
            Expression::Identifier(_) | Expression::Member(..) | Expression::SuperMember(_) => {
                self.validate_assignment_target(expr, location)
            }
            _ => Err(ParseError::new(SyntaxErrorKind::InvalidUpdateTarget(position), location)),
        }
    }

    pub(super) fn parse_left_hand_side_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = if self.at_keyword(Keyword::Super) && self.nth_is_punct(1, Punctuator::LeftParen) {
            let location = self.tokens.location();
            self.tokens.next();
            if !self.allow_super_call {
                return Err(ParseError::new(SyntaxErrorKind::UnexpectedSuper, location));
            }
            Expression::SuperCall(self.parse_arguments()?)
        } else {
            self.parse_member_expression()?
        };
        loop {
            if self.at_punct(Punctuator::LeftParen) {
                let arguments = self.parse_arguments()?;
                expr = Expression::Call(Box::new(expr), arguments);
            } else if let Some(property) = self.parse_member_property()? {
                expr = Expression::Member(Box::new(expr), property);
            } else {
                return Ok(expr);
            }
        }
    }

    /// `new` chains and property accesses, without calls. Arguments of a
    /// `new` are parsed once its whole callee chain is resolved.
    fn parse_member_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = if self.eat_keyword(Keyword::New) {
            if self.at_punct(Punctuator::Dot) {
                return Err(self.error(SyntaxErrorKind::Unsupported("new.target expressions")));
            }
            let callee = self.parse_member_expression()?;
            let arguments = if self.at_punct(Punctuator::LeftParen) {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            Expression::New(Box::new(callee), arguments)
        } else if self.at_keyword(Keyword::Super) {
            self.parse_super_property()?
        } else {
            self.parse_primary_expression()?
        };
        while let Some(property) = self.parse_member_property()? {
            expr = Expression::Member(Box::new(expr), property);
        }
        Ok(expr)
    }

    fn parse_super_property(&mut self) -> Result<Expression, ParseError> {
        let location = self.tokens.location();
        self.tokens.next();
        if !self.allow_super_property {
            return Err(ParseError::new(SyntaxErrorKind::UnexpectedSuper, location));
        }
        match self.parse_member_property()? {
            Some(MemberProperty::Private(_)) | None => Err(ParseError::new(SyntaxErrorKind::UnexpectedSuper, location)),
            Some(property) => Ok(Expression::SuperMember(property)),
        }
    }

    /// `.name`, `.#name` or `[expr]`, if one follows.
    fn parse_member_property(&mut self) -> Result<Option<MemberProperty>, ParseError> {
        if self.at_punct(Punctuator::OptionalChain) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Optional chains")));
        }
        if self.eat_punct(Punctuator::LeftBracket) {
            let property = self.parse_expression_allow_in()?;
            self.expect_punct(Punctuator::RightBracket)?;
            return Ok(Some(MemberProperty::Computed(Box::new(property))));
        }
        if !self.eat_punct(Punctuator::Dot) {
            return Ok(None);
        }
        let token = self.advance()?;
        match token.kind {
            TokenKind::Identifier
            | TokenKind::Keyword(_)
            | TokenKind::BooleanLiteral
            | TokenKind::NullLiteral => Ok(Some(MemberProperty::Dot(token.text.to_string()))),
            TokenKind::PrivateName => {
                let name = &token.text[1..];
                self.reference_private_name(name, token.location)?;
                Ok(Some(MemberProperty::Private(name.to_string())))
            }
            _ => Err(unexpected_token(&token)),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect_punct(Punctuator::LeftParen)?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let mut arguments = Vec::new();
        while !self.eat_punct(Punctuator::RightParen) {
            if self.at_punct(Punctuator::Ellipsis) {
                return Err(self.error(SyntaxErrorKind::Unsupported("Spread arguments")));
            }
            arguments.push(self.parse_assignment_expression()?);
            if !self.at_punct(Punctuator::RightParen) {
                self.expect_punct(Punctuator::Comma)?;
            }
        }
        self.no_in = saved;
        Ok(arguments)
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        let Some(token) = self.tokens.peek().copied() else {
            return Err(self.error(SyntaxErrorKind::UnexpectedEnd));
        };
        let expr = match token.kind {
            TokenKind::Keyword(Keyword::This) => {
                self.tokens.next();
                Expression::This
            }
            TokenKind::Identifier => {
                self.check_identifier_reference(&token)?;
                self.tokens.next();
                Expression::Identifier(token.text.to_string())
            }
            TokenKind::Keyword(Keyword::Let) if !self.strict => {
                self.tokens.next();
                Expression::Identifier("let".to_string())
            }
            TokenKind::NullLiteral => {
                self.tokens.next();
                Expression::Literal(Literal::Null)
            }
            TokenKind::BooleanLiteral => {
                self.tokens.next();
                Expression::Literal(Literal::Boolean(token.text == "true"))
            }
            TokenKind::NumericLiteral | TokenKind::BigIntLiteral => {
                self.tokens.next();
                Expression::Literal(self.numeric_literal(&token)?)
            }
            TokenKind::StringLiteral => {
                self.tokens.next();
                Expression::Literal(Literal::String(self.string_literal(&token)?))
            }
            TokenKind::Punctuator(Punctuator::LeftParen) => {
                self.tokens.next();
                if self.at_punct(Punctuator::RightParen) && self.nth_is_punct(1, Punctuator::Arrow) {
                    return Err(self.error(SyntaxErrorKind::Unsupported("Arrow functions")));
                }
                let expr = self.parse_expression_allow_in()?;
                self.expect_punct(Punctuator::RightParen)?;
                expr
            }
            TokenKind::Punctuator(Punctuator::LeftBrace) => self.parse_object_literal()?,
            TokenKind::Punctuator(Punctuator::LeftBracket) => {
                return Err(self.error(SyntaxErrorKind::Unsupported("Array literals")));
            }
            TokenKind::Punctuator(Punctuator::Slash | Punctuator::SlashAssign) => {
                return Err(self.error(SyntaxErrorKind::Unsupported("Regular expression literals")));
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function_expression()?,
            TokenKind::Keyword(Keyword::Class) => Expression::Class(self.parse_class(false)?),
            _ => return Err(unexpected_token(&token)),
        };
        Ok(expr)
    }

    pub(super) fn parse_property_name(&mut self) -> Result<PropertyName, ParseError> {
        let token = self.advance()?;
        let name = match token.kind {
            TokenKind::Identifier
            | TokenKind::Keyword(_)
            | TokenKind::BooleanLiteral
            | TokenKind::NullLiteral => PropertyName::Identifier(token.text.to_string()),
            TokenKind::StringLiteral => PropertyName::String(self.string_literal(&token)?),
            TokenKind::NumericLiteral | TokenKind::BigIntLiteral => match self.numeric_literal(&token)? {
                Literal::BigInt(b) => PropertyName::String(JsString::from_str(&b.to_string())),
                Literal::Number(n) => PropertyName::Number(n),
                _ => return Err(unexpected_token(&token)),
            },
            TokenKind::Punctuator(Punctuator::LeftBracket) => {
                let key = self.parse_assignment_expression_allow_in()?;
                self.expect_punct(Punctuator::RightBracket)?;
                PropertyName::Computed(Box::new(key))
            }
            _ => return Err(unexpected_token(&token)),
        };
        Ok(name)
    }

    fn parse_assignment_expression_allow_in(&mut self) -> Result<Expression, ParseError> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let expr = self.parse_assignment_expression();
        self.no_in = saved;
        expr
    }

    /// Whether the token after a `get`/`set`/`static` prefix starts a
    /// property name, making the prefix a modifier rather than the name.
    pub(super) fn prefix_modifies_next(&self) -> bool {
        self.tokens.peek_nth(1).is_some_and(|t| match t.kind {
            TokenKind::Punctuator(Punctuator::LeftBracket) => true,
            TokenKind::Punctuator(_) => false,
            _ => true,
        })
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.expect_punct(Punctuator::LeftBrace)?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let mut properties = Vec::new();
        while !self.eat_punct(Punctuator::RightBrace) {
            properties.push(self.parse_object_property()?);
            if !self.at_punct(Punctuator::RightBrace) {
                self.expect_punct(Punctuator::Comma)?;
            }
        }
        self.no_in = saved;
        Ok(Expression::Object(properties))
    }

    fn parse_object_property(&mut self) -> Result<Property, ParseError> {
        let start = self.tokens.location();
        if self.at_punct(Punctuator::Ellipsis) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Object spread properties")));
        }
        if self.at_punct(Punctuator::Star) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Generator methods")));
        }
        let accessor = if (self.at_contextual("get") || self.at_contextual("set")) && self.prefix_modifies_next() {
            self.tokens.next().map(|t| t.text == "get")
        } else {
            None
        };

        let Some(key_token) = self.tokens.peek().copied() else {
            return Err(self.error(SyntaxErrorKind::UnexpectedEnd));
        };
        let key = self.parse_property_name()?;

        if let Some(is_getter) = accessor {
            let function = self.parse_function_rest(None, FunctionKind::Method, start.offset, true, false)?;
            let kind = if is_getter { ClassMethodKind::Get } else { ClassMethodKind::Set };
            self.check_accessor_arity(&function, kind, key_token.location)?;
            let value = if is_getter { PropertyValue::Get(function) } else { PropertyValue::Set(function) };
            return Ok(Property { key, value });
        }
        if self.at_punct(Punctuator::LeftParen) {
            let function = self.parse_function_rest(None, FunctionKind::Method, start.offset, true, false)?;
            return Ok(Property { key, value: PropertyValue::Method(function) });
        }
        if self.eat_punct(Punctuator::Colon) {
            let value = self.parse_assignment_expression()?;
            return Ok(Property { key, value: PropertyValue::Init(value) });
        }

        // shorthand `{ a }`
        let PropertyName::Identifier(name) = &key else {
            return Err(self.unexpected());
        };
        if self.at_punct(Punctuator::Assign) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Destructuring assignments")));
        }
        match key_token.kind {
            TokenKind::Identifier => self.check_identifier_reference(&key_token)?,
            TokenKind::Keyword(Keyword::Let) if !self.strict => {}
            _ => return Err(unexpected_token(&key_token)),
        }
        let value = PropertyValue::Init(Expression::Identifier(name.clone()));
        Ok(Property { key, value })
    }

    fn parse_function_expression(&mut self) -> Result<Expression, ParseError> {
        let start = self.tokens.location();
        self.expect_keyword(Keyword::Function)?;
        if self.at_punct(Punctuator::Star) {
            return Err(self.error(SyntaxErrorKind::Unsupported("Generator functions")));
        }
        let name = if self.at_punct(Punctuator::LeftParen) {
            None
        } else {
            Some(self.parse_binding_identifier()?)
        };
        let function = self.parse_function_rest(name, FunctionKind::Normal, start.offset, false, false)?;
        Ok(Expression::Function(function))
    }
}

fn assignment_operator(kind: TokenKind) -> Option<AssignOp> {
    let TokenKind::Punctuator(p) = kind else {
        return None;
    };
    let op = match p {
        Punctuator::Assign => AssignOp::Assign,
        Punctuator::PlusAssign => AssignOp::AddAssign,
        Punctuator::MinusAssign => AssignOp::SubAssign,
        Punctuator::StarAssign => AssignOp::MulAssign,
        Punctuator::SlashAssign => AssignOp::DivAssign,
        Punctuator::PercentAssign => AssignOp::ModAssign,
        Punctuator::ExponentAssign => AssignOp::ExpAssign,
        Punctuator::LeftShiftAssign => AssignOp::LShiftAssign,
        Punctuator::RightShiftAssign => AssignOp::RShiftAssign,
        Punctuator::UnsignedRightShiftAssign => AssignOp::URShiftAssign,
        Punctuator::AmpersandAssign => AssignOp::BitAndAssign,
        Punctuator::PipeAssign => AssignOp::BitOrAssign,
        Punctuator::CaretAssign => AssignOp::BitXorAssign,
        Punctuator::LogicalAndAssign => AssignOp::LogicalAndAssign,
        Punctuator::LogicalOrAssign => AssignOp::LogicalOrAssign,
        _ => return None,
    };
    Some(op)
}

fn relational_operator(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Keyword(Keyword::In) => Some(BinaryOp::In),
        _ => relational_operator_no_in(kind),
    }
}

fn relational_operator_no_in(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Punctuator(Punctuator::LessThan) => Some(BinaryOp::Lt),
        TokenKind::Punctuator(Punctuator::GreaterThan) => Some(BinaryOp::Gt),
        TokenKind::Punctuator(Punctuator::LessThanEqual) => Some(BinaryOp::LtEq),
        TokenKind::Punctuator(Punctuator::GreaterThanEqual) => Some(BinaryOp::GtEq),
        TokenKind::Keyword(Keyword::Instanceof) => Some(BinaryOp::Instanceof),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::{SyntaxErrorKind, parse};

    fn parse_expr(src: &str) -> Expression {
        let program = parse(src).unwrap();
        match program.body.into_iter().next() {
            Some(Statement::Expression(expr)) => expr,
            other => panic!("expected an expression statement, got {other:?}"),
        }
    }

    fn parse_err(src: &str) -> SyntaxErrorKind {
        parse(src).unwrap_err().kind
    }

    fn number(expr: &Expression) -> f64 {
        match expr {
            Expression::Literal(Literal::Number(n)) => *n,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn exponentiation_is_right_associative() {
        let Expression::Binary(BinaryOp::Exp, base, exponent) = parse_expr("2 ** 3 ** 2") else {
            panic!("expected **");
        };
        assert_eq!(number(&base), 2.0);
        assert!(matches!(*exponent, Expression::Binary(BinaryOp::Exp, _, _)));
    }

    #[test]
    fn binary_levels_are_left_associative() {
        let Expression::Binary(BinaryOp::Sub, left, right) = parse_expr("10 - 4 - 3") else {
            panic!("expected -");
        };
        assert!(matches!(*left, Expression::Binary(BinaryOp::Sub, _, _)));
        assert_eq!(number(&right), 3.0);
    }

    #[test]
    fn precedence_ladder() {
        let Expression::Logical(LogicalOp::Or, left, right) = parse_expr("1 || 2 && 3") else {
            panic!("expected ||");
        };
        assert_eq!(number(&left), 1.0);
        assert!(matches!(*right, Expression::Logical(LogicalOp::And, _, _)));

        let Expression::Binary(BinaryOp::Add, _, right) = parse_expr("1 + 2 * 3") else {
            panic!("expected +");
        };
        assert!(matches!(*right, Expression::Binary(BinaryOp::Mul, _, _)));

        assert!(matches!(
            parse_expr("a < b == c < d"),
            Expression::Binary(BinaryOp::Eq, _, _)
        ));
        assert!(matches!(
            parse_expr("a | b ^ c & d"),
            Expression::Binary(BinaryOp::BitOr, _, _)
        ));
    }

    #[test]
    fn unary_before_exponent_is_rejected() {
        assert_eq!(parse_err("-2 ** 2"), SyntaxErrorKind::UnaryBeforeExponentiation);
        assert_eq!(parse_err("typeof x ** 2"), SyntaxErrorKind::UnaryBeforeExponentiation);
        assert!(matches!(
            parse_expr("(-2) ** 2"),
            Expression::Binary(BinaryOp::Exp, _, _)
        ));
        assert!(matches!(
            parse_expr("2 ** -2"),
            Expression::Binary(BinaryOp::Exp, _, _)
        ));
        assert!(matches!(parse_expr("++x ** 2"), Expression::Binary(BinaryOp::Exp, _, _)));
    }

    #[test]
    fn new_with_and_without_arguments() {
        for src in ["new Foo()", "new Foo"] {
            let Expression::New(callee, arguments) = parse_expr(src) else {
                panic!("expected new in {src}");
            };
            assert!(matches!(*callee, Expression::Identifier(ref n) if n == "Foo"));
            assert!(arguments.is_empty());
        }
    }

    #[test]
    fn new_chains() {
        let Expression::New(outer, outer_args) = parse_expr("new new X()()") else {
            panic!("expected new");
        };
        assert!(outer_args.is_empty());
        assert!(matches!(*outer, Expression::New(_, _)));

        let Expression::New(callee, arguments) = parse_expr("new a.b.C(1)") else {
            panic!("expected new");
        };
        assert!(matches!(*callee, Expression::Member(_, MemberProperty::Dot(ref n)) if n == "C"));
        assert_eq!(arguments.len(), 1);

        let Expression::Call(callee, _) = parse_expr("new X()()") else {
            panic!("expected call");
        };
        assert!(matches!(*callee, Expression::New(_, _)));

        assert!(matches!(
            parse_expr("new X().y"),
            Expression::Member(_, MemberProperty::Dot(_))
        ));
    }

    #[test]
    fn calls_and_members() {
        let Expression::Call(callee, arguments) = parse_expr("a.b[c](1, 2,)") else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 2);
        assert!(matches!(*callee, Expression::Member(_, MemberProperty::Computed(_))));
        assert!(matches!(
            parse_expr("a.if.null"),
            Expression::Member(_, MemberProperty::Dot(ref n)) if n == "null"
        ));
    }

    #[test]
    fn assignments() {
        assert!(matches!(
            parse_expr("a = b = 1"),
            Expression::Assign(AssignOp::Assign, _, ref right) if matches!(**right, Expression::Assign(..))
        ));
        assert!(matches!(parse_expr("a.b **= 2"), Expression::Assign(AssignOp::ExpAssign, _, _)));
        assert!(matches!(parse_expr("x ||= y"), Expression::Assign(AssignOp::LogicalOrAssign, _, _)));
        assert_eq!(parse_err("1 = 2"), SyntaxErrorKind::InvalidAssignmentTarget);
        assert_eq!(parse_err("a + b = c"), SyntaxErrorKind::InvalidAssignmentTarget);
        assert_eq!(parse_err("'use strict'; arguments = 1"), SyntaxErrorKind::StrictEvalOrArguments);
    }

    #[test]
    fn conditional() {
        let Expression::Conditional(_, consequent, alternate) = parse_expr("a ? b = 1 : c ? 2 : 3") else {
            panic!("expected ?:");
        };
        assert!(matches!(*consequent, Expression::Assign(..)));
        assert!(matches!(*alternate, Expression::Conditional(..)));
    }

    #[test]
    fn updates() {
        assert!(matches!(parse_expr("x++"), Expression::Update(UpdateOp::Increment, false, _)));
        assert!(matches!(parse_expr("--a.b"), Expression::Update(UpdateOp::Decrement, true, _)));
        assert_eq!(parse_err("1++"), SyntaxErrorKind::InvalidUpdateTarget("postfix"));
        assert_eq!(parse_err("++f()"), SyntaxErrorKind::InvalidUpdateTarget("prefix"));
        // no line break allowed before a postfix operator
        let program = parse("a\n++b").unwrap();
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn unary_operators() {
        assert!(matches!(parse_expr("typeof x"), Expression::Typeof(_)));
        assert!(matches!(parse_expr("void 0"), Expression::Void(_)));
        assert!(matches!(parse_expr("delete a.b"), Expression::Delete(_)));
        assert!(matches!(parse_expr("!-~+x"), Expression::Unary(UnaryOp::Not, _)));
        assert_eq!(parse_err("'use strict'; delete x"), SyntaxErrorKind::StrictDelete);
    }

    #[test]
    fn object_literals() {
        let Expression::Object(properties) =
            parse_expr("({a: 1, 'b': 2, 3: 4, [k]: 5, m() {}, get g() {}, set s(v) {}, c, get: 6})")
        else {
            panic!("expected object");
        };
        assert_eq!(properties.len(), 9);
        assert!(matches!(properties[1].key, PropertyName::String(_)));
        assert!(matches!(properties[2].key, PropertyName::Number(n) if n == 3.0));
        assert!(matches!(properties[3].key, PropertyName::Computed(_)));
        assert!(matches!(properties[4].value, PropertyValue::Method(_)));
        assert!(matches!(properties[5].value, PropertyValue::Get(_)));
        assert!(matches!(properties[6].value, PropertyValue::Set(_)));
        assert!(matches!(properties[7].value, PropertyValue::Init(Expression::Identifier(ref n)) if n == "c"));
        assert!(matches!(properties[8].key, PropertyName::Identifier(ref n) if n == "get"));
        assert_eq!(parse_err("({ get g(a) {} })"), SyntaxErrorKind::GetterArity);
        assert_eq!(parse_err("({ set s(a, b) {} })"), SyntaxErrorKind::SetterArity);
    }

    #[test]
    fn function_expressions() {
        let Expression::Function(f) = parse_expr("(function named(a, b,) { return a; })") else {
            panic!("expected function");
        };
        assert_eq!(f.name.as_deref(), Some("named"));
        assert_eq!(f.params, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(f.source_text, "function named(a, b,) { return a; }");
    }

    #[test]
    fn unsupported_productions_are_syntax_errors() {
        assert!(matches!(parse_err("a, b"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("a?.b"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("a ?? b"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("x => x"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("[1, 2]"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("f(...a)"), SyntaxErrorKind::Unsupported(_)));
        assert!(matches!(parse_err("/re/"), SyntaxErrorKind::Unsupported(_)));
    }

    #[test]
    fn super_outside_methods() {
        assert_eq!(parse_err("super.x"), SyntaxErrorKind::UnexpectedSuper);
        assert_eq!(parse_err("function f() { super(); }"), SyntaxErrorKind::UnexpectedSuper);
    }
}
