//! Recursive-descent, precedence-climbing parser: tokens to [`ExpressionNode`].

use super::lexer::{tokenize, Spanned, Token};
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
use crate::error::{FhirPathError, Result};
use smallvec::SmallVec;

/// Parse a complete FHIRPath expression.
pub fn parse(input: &str) -> Result<ExpressionNode> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        input,
    };
    let expr = parser.parse_binary(1)?;
    if let Some(extra) = parser.peek() {
        return Err(FhirPathError::parse(
            parser.current_pos(),
            format!("unexpected trailing token {extra:?}"),
            &["end of expression"],
        ));
    }
    Ok(expr)
}

struct Parser<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
    input: &'input str,
}

impl<'input> Parser<'input> {
    fn peek(&self) -> Option<Token<'input>> {
        self.tokens.get(self.pos).map(|t| t.value)
    }

    fn current_pos(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.start)
            .unwrap_or(self.input.len())
    }

    fn bump(&mut self) -> Option<Spanned<Token<'input>>> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn bump_required(&mut self, expected: &str) -> Result<Spanned<Token<'input>>> {
        self.bump()
            .ok_or_else(|| FhirPathError::parse(self.input.len(), format!("unexpected end of input, expected {expected}"), &[expected]))
    }

    fn expect(&mut self, pred: impl Fn(&Token<'input>) -> bool, expected: &[&str]) -> Result<Spanned<Token<'input>>> {
        match self.bump() {
            Some(s) if pred(&s.value) => Ok(s),
            Some(s) => Err(FhirPathError::parse(s.start, format!("unexpected token {:?}", s.value), expected)),
            None => Err(FhirPathError::parse(self.input.len(), "unexpected end of input", expected)),
        }
    }

    /// Binary operator this position's token denotes, ignoring precedence.
    fn peek_binary_op(&self) -> Option<BinaryOperator> {
        use BinaryOperator::*;
        Some(match self.peek()? {
            Token::Plus => Add,
            Token::Minus => Subtract,
            Token::Star => Multiply,
            Token::Slash => Divide,
            Token::Div => IntegerDivide,
            Token::Mod => Modulo,
            Token::Ampersand => Concatenate,
            Token::Equal => Equal,
            Token::NotEqual => NotEqual,
            Token::Equivalent => Equivalent,
            Token::NotEquivalent => NotEquivalent,
            Token::LessThan => LessThan,
            Token::LessThanOrEqual => LessThanOrEqual,
            Token::GreaterThan => GreaterThan,
            Token::GreaterThanOrEqual => GreaterThanOrEqual,
            Token::Pipe => Union,
            Token::In => In,
            Token::Contains => Contains,
            Token::And => And,
            Token::Or => Or,
            Token::Xor => Xor,
            Token::Implies => Implies,
            Token::Is => Is,
            Token::As => As,
            _ => return None,
        })
    }

    /// Precedence-climbing binary parse. `min_prec` is the lowest
    /// precedence this call is allowed to consume — callers that need a
    /// full sub-expression (function args, indexer, parenthesised group)
    /// pass `1`, the precedence of `implies`, the loosest-binding operator.
    fn parse_binary(&mut self, min_prec: u8) -> Result<ExpressionNode> {
        let mut left = self.parse_unary()?;
        loop {
            let Some(op) = self.peek_binary_op() else { break };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();

            if matches!(op, BinaryOperator::Is | BinaryOperator::As) {
                let type_name = self.parse_type_name()?;
                left = ExpressionNode::type_expr(op, left, type_name);
                continue;
            }

            let next_min = if op.is_left_associative() { prec + 1 } else { prec };
            let right = self.parse_binary(next_min)?;
            left = ExpressionNode::binary_op(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExpressionNode> {
        match self.peek() {
            Some(Token::Plus) => {
                self.bump();
                Ok(ExpressionNode::unary_op(UnaryOperator::Positive, self.parse_unary()?))
            }
            Some(Token::Minus) => {
                self.bump();
                Ok(ExpressionNode::unary_op(UnaryOperator::Negate, self.parse_unary()?))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<ExpressionNode> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.bump();
                    let name = self.parse_member_name()?;
                    if self.peek() == Some(Token::LeftParen) {
                        self.bump();
                        let args = self.parse_arg_list()?;
                        expr = ExpressionNode::invocation_step(expr, name, args.into_vec());
                    } else {
                        expr = ExpressionNode::path_step(expr, name);
                    }
                }
                Some(Token::LeftBracket) => {
                    self.bump();
                    let index = self.parse_binary(1)?;
                    self.expect(|t| matches!(t, Token::RightBracket), &["]"])?;
                    expr = ExpressionNode::indexer(expr, index);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_member_name(&mut self) -> Result<String> {
        let spanned = self.bump_required("member name")?;
        Ok(match spanned.value {
            Token::Identifier(s) => s.to_string(),
            Token::Backtick(s) => s.to_string(),
            Token::And => "and".to_string(),
            Token::Or => "or".to_string(),
            Token::Xor => "xor".to_string(),
            Token::Implies => "implies".to_string(),
            Token::Div => "div".to_string(),
            Token::Mod => "mod".to_string(),
            Token::In => "in".to_string(),
            Token::Contains => "contains".to_string(),
            Token::Is => "is".to_string(),
            Token::As => "as".to_string(),
            Token::True => "true".to_string(),
            Token::False => "false".to_string(),
            other => {
                return Err(FhirPathError::parse(
                    spanned.start,
                    format!("expected a member name, found {other:?}"),
                    &["identifier"],
                ));
            }
        })
    }

    fn parse_arg_list(&mut self) -> Result<SmallVec<[ExpressionNode; 4]>> {
        let mut args = SmallVec::new();
        if self.peek() == Some(Token::RightParen) {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.parse_binary(1)?);
            match self.bump() {
                Some(s) if matches!(s.value, Token::Comma) => continue,
                Some(s) if matches!(s.value, Token::RightParen) => break,
                Some(s) => {
                    return Err(FhirPathError::parse(
                        s.start,
                        format!("expected ',' or ')', found {:?}", s.value),
                        &[",", ")"],
                    ));
                }
                None => {
                    return Err(FhirPathError::parse(self.input.len(), "unterminated argument list", &[",", ")"]));
                }
            }
        }
        Ok(args)
    }

    /// A dotted type name, e.g. `FHIR.Patient` or `System.String`, as used
    /// after `is`/`as`.
    fn parse_type_name(&mut self) -> Result<String> {
        let mut name = self.expect_type_component()?;
        while self.peek() == Some(Token::Dot) {
            self.bump();
            name.push('.');
            name.push_str(&self.expect_type_component()?);
        }
        Ok(name)
    }

    fn expect_type_component(&mut self) -> Result<String> {
        let spanned = self.bump_required("type name")?;
        match spanned.value {
            Token::Identifier(s) => Ok(s.to_string()),
            Token::Backtick(s) => Ok(s.to_string()),
            other => Err(FhirPathError::parse(
                spanned.start,
                format!("expected a type name, found {other:?}"),
                &["type name"],
            )),
        }
    }

    fn parse_primary(&mut self) -> Result<ExpressionNode> {
        let spanned = self.bump_required("expression")?;
        match spanned.value {
            Token::Integer(v) => self.maybe_quantity(LiteralValue::Integer(v)),
            Token::Long(v) => self.maybe_quantity(LiteralValue::Long(v)),
            Token::Decimal(text) => self.maybe_quantity(LiteralValue::Decimal(text.to_string())),
            Token::String(body) => Ok(ExpressionNode::Literal(LiteralValue::String(unescape(body)))),
            Token::Date(text) => Ok(ExpressionNode::Literal(LiteralValue::Date(text[1..].to_string()))),
            Token::DateTime(text) => Ok(ExpressionNode::Literal(LiteralValue::DateTime(text[1..].to_string()))),
            Token::Time(text) => Ok(ExpressionNode::Literal(LiteralValue::Time(text[2..].to_string()))),
            Token::True => Ok(ExpressionNode::Literal(LiteralValue::Boolean(true))),
            Token::False => Ok(ExpressionNode::Literal(LiteralValue::Boolean(false))),
            Token::LeftBrace => {
                self.expect(|t| matches!(t, Token::RightBrace), &["}"])?;
                Ok(ExpressionNode::Literal(LiteralValue::Null))
            }
            Token::LeftParen => {
                let inner = self.parse_binary(1)?;
                self.expect(|t| matches!(t, Token::RightParen), &[")"])?;
                Ok(inner)
            }
            Token::ExternalConstant(name) => Ok(ExpressionNode::VariableRef(name.to_string())),
            Token::DollarThis => Ok(ExpressionNode::VariableRef("$this".to_string())),
            Token::DollarIndex => Ok(ExpressionNode::VariableRef("$index".to_string())),
            Token::DollarTotal => Ok(ExpressionNode::VariableRef("$total".to_string())),
            Token::Identifier(name) => {
                if self.peek() == Some(Token::LeftParen) {
                    self.bump();
                    let args = self.parse_arg_list()?;
                    Ok(ExpressionNode::call(name, args.into_vec()))
                } else {
                    Ok(ExpressionNode::Identifier(name.to_string()))
                }
            }
            Token::Backtick(name) => {
                if self.peek() == Some(Token::LeftParen) {
                    self.bump();
                    let args = self.parse_arg_list()?;
                    Ok(ExpressionNode::call(name, args.into_vec()))
                } else {
                    Ok(ExpressionNode::DelimitedIdentifier(name.to_string()))
                }
            }
            other => Err(FhirPathError::parse(
                spanned.start,
                format!("unexpected token {other:?}"),
                &["literal", "identifier", "(", "{}"],
            )),
        }
    }

    /// After a numeric literal, absorb a trailing UCUM-quoted unit or
    /// calendar-duration keyword into a `Quantity` literal.
    fn maybe_quantity(&mut self, number: LiteralValue) -> Result<ExpressionNode> {
        match self.peek() {
            Some(Token::String(unit)) => {
                self.bump();
                Ok(ExpressionNode::Literal(LiteralValue::Quantity {
                    value: numeric_text(&number),
                    unit: unit.to_string(),
                }))
            }
            Some(Token::Identifier(word)) if is_calendar_duration_word(word) => {
                self.bump();
                Ok(ExpressionNode::Literal(LiteralValue::Quantity {
                    value: numeric_text(&number),
                    unit: word.to_string(),
                }))
            }
            _ => Ok(ExpressionNode::Literal(number)),
        }
    }
}

fn numeric_text(v: &LiteralValue) -> String {
    match v {
        LiteralValue::Integer(i) => i.to_string(),
        LiteralValue::Long(i) => i.to_string(),
        LiteralValue::Decimal(s) => s.clone(),
        _ => unreachable!("maybe_quantity only called with numeric literals"),
    }
}

fn is_calendar_duration_word(word: &str) -> bool {
    matches!(
        word,
        "year" | "years"
            | "month" | "months"
            | "week" | "weeks"
            | "day" | "days"
            | "hour" | "hours"
            | "minute" | "minutes"
            | "second" | "seconds"
            | "millisecond" | "milliseconds"
    )
}

/// Resolve FHIRPath string-literal escapes (`\'`, `\"`, `` \` ``, `\\`, `\/`,
/// `\f`, `\n`, `\r`, `\t`, `\uXXXX`). Unrecognised escapes keep the escaped
/// character verbatim.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('`') => out.push('`'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_path() {
        let ast = parse("Patient.name.given").unwrap();
        match ast {
            ExpressionNode::PathStep { name, .. } => assert_eq!(name, "given"),
            _ => panic!("expected a path step, got {ast:?}"),
        }
    }

    #[test]
    fn parses_function_call_with_args() {
        let ast = parse("name.where(use = 'official')").unwrap();
        match ast {
            ExpressionNode::InvocationStep { name, args, .. } => {
                assert_eq!(name, "where");
                assert_eq!(args.len(), 1);
            }
            _ => panic!("expected invocation step, got {ast:?}"),
        }
    }

    #[test]
    fn additive_binds_looser_than_multiplicative() {
        let ast = parse("1 + 2 * 3").unwrap();
        match ast {
            ExpressionNode::BinaryOp { op: BinaryOperator::Add, right, .. } => {
                assert!(matches!(*right, ExpressionNode::BinaryOp { op: BinaryOperator::Multiply, .. }));
            }
            _ => panic!("expected addition at the top, got {ast:?}"),
        }
    }

    #[test]
    fn implies_is_right_associative_in_practice() {
        // `a implies b implies c` parses as `a implies (b implies c)`.
        let ast = parse("a implies b implies c").unwrap();
        match ast {
            ExpressionNode::BinaryOp { op: BinaryOperator::Implies, right, .. } => {
                assert!(matches!(*right, ExpressionNode::BinaryOp { op: BinaryOperator::Implies, .. }));
            }
            _ => panic!("expected implies at the top, got {ast:?}"),
        }
    }

    #[test]
    fn parses_is_and_as_type_expressions() {
        let ast = parse("value is FHIR.Quantity").unwrap();
        match ast {
            ExpressionNode::TypeExpr { op: BinaryOperator::Is, type_name, .. } => {
                assert_eq!(type_name, "FHIR.Quantity");
            }
            _ => panic!("expected a type expression, got {ast:?}"),
        }
    }

    #[test]
    fn parses_quantity_literal_with_quoted_unit() {
        let ast = parse("4 'mg'").unwrap();
        match ast {
            ExpressionNode::Literal(LiteralValue::Quantity { value, unit }) => {
                assert_eq!(value, "4");
                assert_eq!(unit, "mg");
            }
            _ => panic!("expected a quantity literal, got {ast:?}"),
        }
    }

    #[test]
    fn parses_quantity_literal_with_calendar_unit() {
        let ast = parse("3 years").unwrap();
        assert!(matches!(
            ast,
            ExpressionNode::Literal(LiteralValue::Quantity { unit, .. }) if unit == "years"
        ));
    }

    #[test]
    fn parses_indexer() {
        let ast = parse("name[0]").unwrap();
        assert!(matches!(ast, ExpressionNode::Indexer { .. }));
    }

    #[test]
    fn parses_external_constant_forms() {
        assert!(matches!(parse("%myVar").unwrap(), ExpressionNode::VariableRef(n) if n == "myVar"));
        assert!(matches!(parse("%'my-var'").unwrap(), ExpressionNode::VariableRef(n) if n == "my-var"));
        assert!(matches!(parse("%`my-var`").unwrap(), ExpressionNode::VariableRef(n) if n == "my-var"));
    }

    #[test]
    fn unquoted_hyphenated_variable_is_not_a_single_variable_ref() {
        // `%my-var` lexes as `%my - var`: a subtraction, not a VariableRef.
        let ast = parse("%my-var").unwrap();
        assert!(matches!(ast, ExpressionNode::BinaryOp { op: BinaryOperator::Subtract, .. }));
    }

    #[test]
    fn empty_collection_literal() {
        assert!(matches!(parse("{}").unwrap(), ExpressionNode::Literal(LiteralValue::Null)));
    }

    #[test]
    fn unterminated_paren_is_a_parse_error() {
        assert!(parse("(1 + 2").is_err());
    }

    #[test]
    fn empty_is_a_plain_function_name() {
        let ast = parse("name.empty()").unwrap();
        match ast {
            ExpressionNode::InvocationStep { name, .. } => assert_eq!(name, "empty"),
            _ => panic!("expected invocation step, got {ast:?}"),
        }
    }

    #[test]
    fn string_escapes_are_resolved() {
        assert!(matches!(
            parse(r"'a\tb'").unwrap(),
            ExpressionNode::Literal(LiteralValue::String(s)) if s == "a\tb"
        ));
    }
}
