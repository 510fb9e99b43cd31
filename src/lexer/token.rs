use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A lexical token: its category plus the exact slice of source it covers.
///
/// Literal values are not decoded here; see [`super::literal`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub location: SourceLocation,
}

impl Token<'_> {
    pub fn end_offset(&self) -> usize {
        self.location.offset + self.text.len()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::LineTerminator => write!(f, "line terminator"),
            _ => write!(f, "{}", self.text),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword(Keyword),
    PrivateName,
    Punctuator(Punctuator),
    NumericLiteral,
    BigIntLiteral,
    StringLiteral,
    BooleanLiteral,
    NullLiteral,
    LineTerminator,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Punctuator {
    LeftBrace,                // {
    RightBrace,               // }
    LeftParen,                // (
    RightParen,               // )
    LeftBracket,              // [
    RightBracket,             // ]
    Dot,                      // .
    Ellipsis,                 // ...
    Semicolon,                // ;
    Comma,                    // ,
    LessThan,                 // <
    GreaterThan,              // >
    LessThanEqual,            // <=
    GreaterThanEqual,         // >=
    Equal,                    // ==
    NotEqual,                 // !=
    StrictEqual,              // ===
    StrictNotEqual,           // !==
    Plus,                     // +
    Minus,                    // -
    Star,                     // *
    Percent,                  // %
    Exponent,                 // **
    Increment,                // ++
    Decrement,                // --
    LeftShift,                // <<
    RightShift,               // >>
    UnsignedRightShift,       // >>>
    Ampersand,                // &
    Pipe,                     // |
    Caret,                    // ^
    Bang,                     // !
    Tilde,                    // ~
    LogicalAnd,               // &&
    LogicalOr,                // ||
    NullishCoalescing,        // ??
    Question,                 // ?
    OptionalChain,            // ?.
    Colon,                    // :
    Assign,                   // =
    PlusAssign,               // +=
    MinusAssign,              // -=
    StarAssign,               // *=
    PercentAssign,            // %=
    ExponentAssign,           // **=
    LeftShiftAssign,          // <<=
    RightShiftAssign,         // >>=
    UnsignedRightShiftAssign, // >>>=
    AmpersandAssign,          // &=
    PipeAssign,               // |=
    CaretAssign,              // ^=
    LogicalAndAssign,         // &&=
    LogicalOrAssign,          // ||=
    NullishAssign,            // ??=
    Arrow,                    // =>
    Slash,                    // /
    SlashAssign,              // /=
}

/// Punctuators ordered so that the first prefix match is the longest one.
pub(super) const PUNCTUATORS: &[(&str, Punctuator)] = &[
    (">>>=", Punctuator::UnsignedRightShiftAssign),
    ("...", Punctuator::Ellipsis),
    ("===", Punctuator::StrictEqual),
    ("!==", Punctuator::StrictNotEqual),
    ("**=", Punctuator::ExponentAssign),
    ("<<=", Punctuator::LeftShiftAssign),
    (">>=", Punctuator::RightShiftAssign),
    (">>>", Punctuator::UnsignedRightShift),
    ("&&=", Punctuator::LogicalAndAssign),
    ("||=", Punctuator::LogicalOrAssign),
    ("??=", Punctuator::NullishAssign),
    ("=>", Punctuator::Arrow),
    ("==", Punctuator::Equal),
    ("!=", Punctuator::NotEqual),
    ("<=", Punctuator::LessThanEqual),
    (">=", Punctuator::GreaterThanEqual),
    ("**", Punctuator::Exponent),
    ("++", Punctuator::Increment),
    ("--", Punctuator::Decrement),
    ("<<", Punctuator::LeftShift),
    (">>", Punctuator::RightShift),
    ("&&", Punctuator::LogicalAnd),
    ("||", Punctuator::LogicalOr),
    ("??", Punctuator::NullishCoalescing),
    ("?.", Punctuator::OptionalChain),
    ("+=", Punctuator::PlusAssign),
    ("-=", Punctuator::MinusAssign),
    ("*=", Punctuator::StarAssign),
    ("%=", Punctuator::PercentAssign),
    ("&=", Punctuator::AmpersandAssign),
    ("|=", Punctuator::PipeAssign),
    ("^=", Punctuator::CaretAssign),
    ("/=", Punctuator::SlashAssign),
    ("{", Punctuator::LeftBrace),
    ("}", Punctuator::RightBrace),
    ("(", Punctuator::LeftParen),
    (")", Punctuator::RightParen),
    ("[", Punctuator::LeftBracket),
    ("]", Punctuator::RightBracket),
    (".", Punctuator::Dot),
    (";", Punctuator::Semicolon),
    (",", Punctuator::Comma),
    ("<", Punctuator::LessThan),
    (">", Punctuator::GreaterThan),
    ("+", Punctuator::Plus),
    ("-", Punctuator::Minus),
    ("*", Punctuator::Star),
    ("%", Punctuator::Percent),
    ("&", Punctuator::Ampersand),
    ("|", Punctuator::Pipe),
    ("^", Punctuator::Caret),
    ("!", Punctuator::Bang),
    ("~", Punctuator::Tilde),
    ("?", Punctuator::Question),
    (":", Punctuator::Colon),
    ("=", Punctuator::Assign),
    ("/", Punctuator::Slash),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    Let,
    New,
    Return,
    Super,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Keyword> {
        let keyword = match s {
            "break" => Keyword::Break,
            "case" => Keyword::Case,
            "catch" => Keyword::Catch,
            "class" => Keyword::Class,
            "const" => Keyword::Const,
            "continue" => Keyword::Continue,
            "debugger" => Keyword::Debugger,
            "default" => Keyword::Default,
            "delete" => Keyword::Delete,
            "do" => Keyword::Do,
            "else" => Keyword::Else,
            "enum" => Keyword::Enum,
            "export" => Keyword::Export,
            "extends" => Keyword::Extends,
            "finally" => Keyword::Finally,
            "for" => Keyword::For,
            "function" => Keyword::Function,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "instanceof" => Keyword::Instanceof,
            "let" => Keyword::Let,
            "new" => Keyword::New,
            "return" => Keyword::Return,
            "super" => Keyword::Super,
            "switch" => Keyword::Switch,
            "this" => Keyword::This,
            "throw" => Keyword::Throw,
            "try" => Keyword::Try,
            "typeof" => Keyword::Typeof,
            "var" => Keyword::Var,
            "void" => Keyword::Void,
            "while" => Keyword::While,
            "with" => Keyword::With,
            _ => return None,
        };
        Some(keyword)
    }
}

/// Words that are only reserved in strict mode code.
pub fn is_strict_reserved_word(s: &str) -> bool {
    matches!(
        s,
        "implements" | "interface" | "package" | "private" | "protected" | "public" | "static" | "yield"
    )
}
