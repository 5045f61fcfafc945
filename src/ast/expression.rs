//! AST node definitions for parsed FHIRPath expressions.

use super::operator::{BinaryOperator, UnaryOperator};
use smallvec::SmallVec;

/// A parsed FHIRPath expression.
///
/// There is no dedicated `Lambda` node: a lambda body is just
/// an ordinary [`ExpressionNode`] passed as an argument to a function whose
/// registry entry marks it as lambda-shaped (`where`, `select`, `repeat`,
/// `all`, `exists`, `aggregate`, `sort`). The evaluator re-evaluates that
/// argument once per element instead of evaluating it once up front.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    /// A literal value.
    Literal(LiteralValue),
    /// A bare identifier: a root type name (`Patient`) or an implicit `$this.name`.
    Identifier(String),
    /// A backtick-delimited identifier (`` `div` ``), used to escape keywords.
    DelimitedIdentifier(String),
    /// `receiver.name` with no invocation arguments.
    PathStep {
        /// Expression producing the receiver collection.
        receiver: Box<ExpressionNode>,
        /// Child name to navigate to.
        name: String,
    },
    /// `receiver.name(args)`.
    InvocationStep {
        /// Expression producing the receiver/invocant collection.
        receiver: Box<ExpressionNode>,
        /// Function name.
        name: String,
        /// Argument expressions (unevaluated; may be lambda bodies).
        args: SmallVec<[ExpressionNode; 4]>,
    },
    /// A bare function call with no explicit receiver (implicit `$this`), e.g. `today()`.
    FunctionCall {
        /// Function name.
        name: String,
        /// Argument expressions.
        args: SmallVec<[ExpressionNode; 4]>,
    },
    /// `receiver[index]`.
    Indexer {
        /// Expression producing the receiver collection.
        receiver: Box<ExpressionNode>,
        /// Index expression, evaluated to a singleton Integer.
        index: Box<ExpressionNode>,
    },
    /// A binary operation.
    BinaryOp {
        /// The operator.
        op: BinaryOperator,
        /// Left operand.
        left: Box<ExpressionNode>,
        /// Right operand.
        right: Box<ExpressionNode>,
    },
    /// A unary operation.
    UnaryOp {
        /// The operator.
        op: UnaryOperator,
        /// The operand.
        operand: Box<ExpressionNode>,
    },
    /// `%name`, `` %`name` ``, or `%'name'` — a user or built-in variable reference.
    VariableRef(String),
    /// `is Type` / `as Type`, kept distinct from BinaryOp so the right-hand
    /// side is a type name, not a sub-expression.
    TypeExpr {
        /// Operator: `Is` or `As`.
        op: BinaryOperator,
        /// Expression being tested or cast.
        expression: Box<ExpressionNode>,
        /// Target type name, e.g. `FHIR.Quantity` or `System.String`.
        type_name: String,
    },
}

/// Literal values recognised by the lexer/parser.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// `{}` — the empty collection literal.
    Null,
    /// `true` / `false`.
    Boolean(bool),
    /// An integer literal, e.g. `42`.
    Integer(i64),
    /// A `123L`-suffixed long literal.
    Long(i64),
    /// A decimal literal, stored as the source text to preserve precision
    /// until parsed into a `Decimal`.
    Decimal(String),
    /// A single-quoted string literal, with escapes already resolved.
    String(String),
    /// `@YYYY[-MM[-DD]]`.
    Date(String),
    /// `@YYYY[-MM[-DD][THH[:MM[:SS[.sss]]][zzzz]]]`.
    DateTime(String),
    /// `@Thh[:mm[:ss[.sss]]]`.
    Time(String),
    /// A quantity literal, e.g. `4 'mg'` or `3 years`.
    Quantity {
        /// Numeric value text.
        value: String,
        /// Unit text — either a UCUM-quoted unit or a calendar duration keyword.
        unit: String,
    },
}

impl ExpressionNode {
    /// Convenience constructor for a function call with no receiver.
    pub fn call(name: impl Into<String>, args: Vec<ExpressionNode>) -> Self {
        ExpressionNode::FunctionCall {
            name: name.into(),
            args: args.into(),
        }
    }

    /// Convenience constructor for `receiver.name`.
    pub fn path_step(receiver: ExpressionNode, name: impl Into<String>) -> Self {
        ExpressionNode::PathStep {
            receiver: Box::new(receiver),
            name: name.into(),
        }
    }

    /// Convenience constructor for `receiver.name(args)`.
    pub fn invocation_step(receiver: ExpressionNode, name: impl Into<String>, args: Vec<ExpressionNode>) -> Self {
        ExpressionNode::InvocationStep {
            receiver: Box::new(receiver),
            name: name.into(),
            args: args.into(),
        }
    }

    /// Convenience constructor for `receiver[index]`.
    pub fn indexer(receiver: ExpressionNode, index: ExpressionNode) -> Self {
        ExpressionNode::Indexer {
            receiver: Box::new(receiver),
            index: Box::new(index),
        }
    }

    /// Convenience constructor for a binary operation.
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        ExpressionNode::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Convenience constructor for a unary operation.
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        ExpressionNode::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Convenience constructor for `is`/`as` type expressions.
    pub fn type_expr(op: BinaryOperator, expression: ExpressionNode, type_name: impl Into<String>) -> Self {
        ExpressionNode::TypeExpr {
            op,
            expression: Box::new(expression),
            type_name: type_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_step_boxes_receiver() {
        let node = ExpressionNode::PathStep {
            receiver: Box::new(ExpressionNode::Identifier("Patient".into())),
            name: "name".into(),
        };
        match node {
            ExpressionNode::PathStep { name, .. } => assert_eq!(name, "name"),
            _ => panic!("wrong variant"),
        }
    }
}
