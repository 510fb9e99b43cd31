use crate::lexer::literal::LiteralError;
use crate::lexer::{LexError, LexErrorKind, SourceLocation};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("Missing initializer in const declaration")]
    ConstWithoutInitializer,
    #[error("Missing catch or finally after try")]
    TryWithoutCatchOrFinally,
    #[error("Unary operator used immediately before exponentiation expression. Parenthesis must be used to disambiguate operator precedence")]
    UnaryBeforeExponentiation,
    #[error("Invalid left-hand side in assignment")]
    InvalidAssignmentTarget,
    #[error("Invalid left-hand side expression in {0} operation")]
    InvalidUpdateTarget(&'static str),
    #[error("Illegal break statement")]
    IllegalBreak,
    #[error("Illegal continue statement: no surrounding iteration statement")]
    IllegalContinue,
    #[error("Undefined label '{0}'")]
    UndefinedLabel(String),
    #[error("Label '{0}' has already been declared")]
    DuplicateLabel(String),
    #[error("Illegal return statement")]
    IllegalReturn,
    #[error("Illegal newline after throw")]
    NewlineAfterThrow,
    #[error("Identifier '{0}' has already been declared")]
    DuplicateDeclaration(String),
    #[error("Lexical declaration cannot appear in a single-statement context")]
    LexicalInSingleStatement,
    #[error("More than one default clause in switch statement")]
    MultipleDefaults,
    #[error("'super' keyword unexpected here")]
    UnexpectedSuper,
    #[error("A class may only have one constructor")]
    DuplicateConstructor,
    #[error("Class constructor may not be an accessor")]
    ConstructorAccessor,
    #[error("Classes may not have a static property named 'prototype'")]
    StaticPrototype,
    #[error("Classes may not have a private field named '#constructor'")]
    PrivateConstructor,
    #[error("Getter must not have any formal parameters.")]
    GetterArity,
    #[error("Setter must have exactly one formal parameter.")]
    SetterArity,
    #[error("let is disallowed as a lexically bound name")]
    LetInLexicalBinding,
    #[error("Private field '#{0}' must be declared in an enclosing class")]
    UndeclaredPrivateName(String),
    #[error("Identifier '#{0}' has already been declared")]
    DuplicatePrivateName(String),
    #[error("Unexpected eval or arguments in strict mode")]
    StrictEvalOrArguments,
    #[error("Unexpected strict mode reserved word")]
    StrictReservedWord,
    #[error("Delete of an unqualified identifier in strict mode.")]
    StrictDelete,
    #[error("Private fields can not be deleted")]
    PrivateDelete,
    #[error("Octal literals are not allowed in strict mode.")]
    StrictOctalLiteral,
    #[error("Duplicate parameter name not allowed in this context")]
    DuplicateParameter,
    #[error("{0}")]
    Literal(#[from] LiteralError),
    #[error("{0}")]
    Lex(#[from] LexErrorKind),
    #[error("{0} are not supported")]
    Unsupported(&'static str),
}

/// A syntax error with the position it was detected at. No partial tree is
/// ever returned alongside one.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("SyntaxError: {kind} ({location})")]
pub struct ParseError {
    pub kind: SyntaxErrorKind,
    pub location: SourceLocation,
}

impl ParseError {
    pub fn new(kind: SyntaxErrorKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    /// The message without the `SyntaxError:` prefix or location, as
    /// stored on a thrown SyntaxError object.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            kind: SyntaxErrorKind::Lex(e.kind),
            location: e.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_with_prefix_and_location() {
        let err = ParseError::new(
            SyntaxErrorKind::UnexpectedToken(")".into()),
            SourceLocation { line: 3, column: 7, offset: 40 },
        );
        assert_eq!(err.to_string(), "SyntaxError: Unexpected token ')' (3:7)");
        assert_eq!(err.message(), "Unexpected token ')'");
    }

    #[test]
    fn lexical_errors_become_syntax_errors() {
        let lex = LexError {
            kind: LexErrorKind::UnexpectedCharacter('@'),
            location: SourceLocation { line: 1, column: 0, offset: 0 },
        };
        let err = ParseError::from(lex);
        assert_eq!(err.kind, SyntaxErrorKind::Lex(LexErrorKind::UnexpectedCharacter('@')));
        assert!(err.to_string().starts_with("SyntaxError: Invalid or unexpected token"));
    }
}
