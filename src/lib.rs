//! An ECMAScript front end and evaluator: a lexer, a recursive-descent
//! parser producing an AST, and a tree-walking interpreter built on
//! completion records.

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod types;

pub use interpreter::{Completion, Interpreter};
pub use parser::parse;
