//! Lexing and parsing of FHIRPath expression text into an [`ExpressionNode`](crate::ast::ExpressionNode).

mod grammar;
mod lexer;

pub use grammar::parse;
pub use lexer::{tokenize, Spanned, Token};
