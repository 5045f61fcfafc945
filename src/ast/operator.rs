//! Operator definitions for FHIRPath expressions.

use std::fmt;

/// Binary operators in FHIRPath expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BinaryOperator {
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`), always yields Decimal
    Divide,
    /// Integer division (`div`)
    IntegerDivide,
    /// Remainder with sign of dividend (`mod`)
    Modulo,
    /// String/collection concatenation (`&`)
    Concatenate,

    /// Strict equality (`=`)
    Equal,
    /// Strict inequality (`!=`)
    NotEqual,
    /// Equivalence (`~`)
    Equivalent,
    /// Non-equivalence (`!~`)
    NotEquivalent,
    /// Less than (`<`)
    LessThan,
    /// Less than or equal (`<=`)
    LessThanOrEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal (`>=`)
    GreaterThanOrEqual,

    /// Kleene AND (`and`)
    And,
    /// Kleene OR (`or`)
    Or,
    /// Kleene XOR (`xor`)
    Xor,
    /// Implication (`implies`)
    Implies,

    /// Collection union with dedup (`|`)
    Union,
    /// Membership test (`in`)
    In,
    /// Reverse membership test (`contains`)
    Contains,

    /// Type check (`is`)
    Is,
    /// Type cast (`as`)
    As,
}

/// Unary operators in FHIRPath expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum UnaryOperator {
    /// Arithmetic negation (`-`)
    Negate,
    /// Unary plus (`+`)
    Positive,
    /// Kleene negation (`not` keyword form; `not()` method form dispatches here too)
    Not,
}

impl BinaryOperator {
    /// Precedence, higher binds tighter. Mirrors the FHIRPath grammar
    /// (http://hl7.org/fhirpath/#grammar), lowest-to-highest.
    pub fn precedence(self) -> u8 {
        use BinaryOperator::*;
        match self {
            Multiply | Divide | IntegerDivide | Modulo => 10,
            Add | Subtract | Concatenate => 9,
            Union => 8,
            Is | As => 7,
            LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => 6,
            Equal | NotEqual | Equivalent | NotEquivalent => 5,
            In | Contains => 4,
            And => 3,
            Xor | Or => 2,
            Implies => 1,
        }
    }

    /// All FHIRPath binary operators are left-associative except `implies`.
    pub fn is_left_associative(self) -> bool {
        !matches!(self, BinaryOperator::Implies)
    }

    /// True for `+ - * / div mod &`.
    pub fn is_arithmetic(self) -> bool {
        use BinaryOperator::*;
        matches!(
            self,
            Add | Subtract | Multiply | Divide | IntegerDivide | Modulo | Concatenate
        )
    }

    /// True for `= != ~ !~`.
    pub fn is_equality(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Equal | NotEqual | Equivalent | NotEquivalent)
    }

    /// True for `< <= > >=`.
    pub fn is_inequality(self) -> bool {
        use BinaryOperator::*;
        matches!(
            self,
            LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual
        )
    }

    /// True for `and or xor implies`.
    pub fn is_logical(self) -> bool {
        use BinaryOperator::*;
        matches!(self, And | Or | Xor | Implies)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOperator::*;
        let s = match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            IntegerDivide => "div",
            Modulo => "mod",
            Concatenate => "&",
            Equal => "=",
            NotEqual => "!=",
            Equivalent => "~",
            NotEquivalent => "!~",
            LessThan => "<",
            LessThanOrEqual => "<=",
            GreaterThan => ">",
            GreaterThanOrEqual => ">=",
            And => "and",
            Or => "or",
            Xor => "xor",
            Implies => "implies",
            Union => "|",
            In => "in",
            Contains => "contains",
            Is => "is",
            As => "as",
        };
        f.write_str(s)
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Positive => "+",
            UnaryOperator::Not => "not",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_orders_multiplicative_above_additive() {
        assert!(BinaryOperator::Multiply.precedence() > BinaryOperator::Add.precedence());
        assert!(BinaryOperator::Add.precedence() > BinaryOperator::Union.precedence());
        assert!(BinaryOperator::Union.precedence() > BinaryOperator::Equal.precedence());
        assert!(BinaryOperator::Equal.precedence() > BinaryOperator::And.precedence());
        assert!(BinaryOperator::And.precedence() > BinaryOperator::Implies.precedence());
    }

    #[test]
    fn implies_is_right_associative() {
        assert!(!BinaryOperator::Implies.is_left_associative());
        assert!(BinaryOperator::And.is_left_associative());
    }
}
