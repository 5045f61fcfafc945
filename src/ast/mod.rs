//! Abstract syntax tree for parsed FHIRPath expressions.
//!
//! Kept deliberately small and dependency-free. The
//! evaluator owns all semantics; this module only owns shape.

mod expression;
mod operator;

pub use expression::{ExpressionNode, LiteralValue};
pub use operator::{BinaryOperator, UnaryOperator};
