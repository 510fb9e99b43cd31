/// AST node types for ECMAScript scripts.
/// One variant per supported grammar production; nodes are immutable once
/// parsed and may be evaluated any number of times.
use std::rc::Rc;

use num_bigint::BigInt;

use crate::types::JsString;

#[derive(Clone, Debug)]
pub struct Program {
    pub body: Vec<Statement>,
    pub strict: bool,
    /// Names declared with `var` anywhere in the script, outside functions.
    pub var_names: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Empty,
    Expression(Expression),
    Block(Vec<Statement>),
    Variable(VariableDeclaration),
    If(IfStatement),
    While(WhileStatement),
    DoWhile(DoWhileStatement),
    For(ForStatement),
    Return(Option<Expression>),
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Expression),
    Try(TryStatement),
    Switch(SwitchStatement),
    Labeled(String, Box<Statement>),
    Debugger,
    Declaration(Declaration),
}

/// Declarations only allowed in statement-list position.
#[derive(Clone, Debug)]
pub enum Declaration {
    Lexical(VariableDeclaration),
    Function(Rc<FunctionDef>),
    Class(Rc<ClassDef>),
}

impl Declaration {
    pub fn bound_names(&self) -> Vec<&str> {
        match self {
            Declaration::Lexical(decl) => decl.declarations.iter().map(|d| d.name.as_str()).collect(),
            Declaration::Function(f) => f.name.as_deref().into_iter().collect(),
            Declaration::Class(c) => c.name.as_deref().into_iter().collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct VariableDeclaration {
    pub kind: VarKind,
    pub declarations: Vec<VariableDeclarator>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Clone, Debug)]
pub struct VariableDeclarator {
    pub name: String,
    pub init: Option<Expression>,
}

#[derive(Clone, Debug)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    This,
    Object(Vec<Property>),
    Function(Rc<FunctionDef>),
    Class(Rc<ClassDef>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    Update(UpdateOp, bool, Box<Expression>), // op, prefix, argument
    Assign(AssignOp, Box<Expression>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    Call(Box<Expression>, Vec<Expression>),
    SuperCall(Vec<Expression>),
    New(Box<Expression>, Vec<Expression>),
    Member(Box<Expression>, MemberProperty),
    SuperMember(MemberProperty),
    Typeof(Box<Expression>),
    Void(Box<Expression>),
    Delete(Box<Expression>),
}

#[derive(Clone, Debug)]
pub enum MemberProperty {
    Dot(String),
    Computed(Box<Expression>),
    Private(String),
}

#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    BigInt(BigInt),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LShift,
    RShift,
    URShift,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ExpAssign,
    LShiftAssign,
    RShiftAssign,
    URShiftAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    LogicalAndAssign,
    LogicalOrAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, if any.
    pub fn binary_op(self) -> Option<BinaryOp> {
        let op = match self {
            AssignOp::AddAssign => BinaryOp::Add,
            AssignOp::SubAssign => BinaryOp::Sub,
            AssignOp::MulAssign => BinaryOp::Mul,
            AssignOp::DivAssign => BinaryOp::Div,
            AssignOp::ModAssign => BinaryOp::Mod,
            AssignOp::ExpAssign => BinaryOp::Exp,
            AssignOp::LShiftAssign => BinaryOp::LShift,
            AssignOp::RShiftAssign => BinaryOp::RShift,
            AssignOp::URShiftAssign => BinaryOp::URShift,
            AssignOp::BitAndAssign => BinaryOp::BitAnd,
            AssignOp::BitOrAssign => BinaryOp::BitOr,
            AssignOp::BitXorAssign => BinaryOp::BitXor,
            AssignOp::Assign | AssignOp::LogicalAndAssign | AssignOp::LogicalOrAssign => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Debug)]
pub struct Property {
    pub key: PropertyName,
    pub value: PropertyValue,
}

#[derive(Clone, Debug)]
pub enum PropertyName {
    Identifier(String),
    String(JsString),
    Number(f64),
    Computed(Box<Expression>),
}

#[derive(Clone, Debug)]
pub enum PropertyValue {
    Init(Expression),
    Method(Rc<FunctionDef>),
    Get(Rc<FunctionDef>),
    Set(Rc<FunctionDef>),
}

#[derive(Clone, Debug)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

#[derive(Clone, Debug)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct DoWhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub enum ForInit {
    Variable(VariableDeclaration),
    Expression(Expression),
}

#[derive(Clone, Debug)]
pub struct TryStatement {
    pub block: Vec<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Statement>>,
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub param: Option<String>,
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub test: Option<Expression>,
    pub consequent: Vec<Statement>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    /// `function` declarations and expressions.
    Normal,
    /// Object literal and class methods, including accessors.
    Method,
    ClassConstructor,
}

#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub kind: FunctionKind,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub strict: bool,
    /// `var` names declared anywhere in the body, excluding nested functions.
    pub var_names: Vec<String>,
    pub source_text: String,
}

#[derive(Clone, Debug)]
pub struct ClassDef {
    pub name: Option<String>,
    pub super_class: Option<Box<Expression>>,
    pub constructor: Option<Rc<FunctionDef>>,
    pub body: Vec<ClassMethod>,
    pub source_text: String,
}

#[derive(Clone, Debug)]
pub struct ClassMethod {
    pub key: ClassKey,
    pub kind: ClassMethodKind,
    pub value: Rc<FunctionDef>,
    pub is_static: bool,
}

#[derive(Clone, Debug)]
pub enum ClassKey {
    Public(PropertyName),
    Private(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassMethodKind {
    Method,
    Get,
    Set,
}

impl Expression {
    /// Function and class expressions that have no binding name of their
    /// own; they take their name from the assignment target.
    pub fn is_anonymous_function_definition(&self) -> bool {
        match self {
            Expression::Function(f) => f.name.is_none(),
            Expression::Class(c) => c.name.is_none(),
            _ => false,
        }
    }
}

/// Names declared by `let`, `const`, `class` and (in blocks) function
/// declarations directly in a statement list.
pub fn lexically_declared_names(body: &[Statement]) -> Vec<&str> {
    body.iter()
        .filter_map(|stmt| match stmt {
            Statement::Declaration(decl) => Some(decl.bound_names()),
            _ => None,
        })
        .flatten()
        .collect()
}
