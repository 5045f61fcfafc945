//! Hand-rolled tokenizer producing zero-copy `&'input str` token slices.
//!
//! No parser-combinator library is used — FHIRPath's lexical grammar is
//! small enough that direct byte scanning is both simpler and faster than a
//! combinator stack, and it keeps every span calculation in one place.

use crate::error::{FhirPathError, Result};
use unicode_xid::UnicodeXID;

/// A lexical token together with the byte range it was scanned from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// The token or node.
    pub value: T,
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl<T> Spanned<T> {
    /// Wrap a value with its source span.
    pub fn new(value: T, start: usize, end: usize) -> Self {
        Self { value, start, end }
    }
}

/// A single lexical token. Identifiers and literal text are `&'input str`
/// slices into the original expression — nothing is copied during lexing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'input> {
    /// An integer literal, already parsed.
    Integer(i64),
    /// A `123L`-suffixed long literal, already parsed.
    Long(i64),
    /// Decimal literal text, parsed lazily by the caller.
    Decimal(&'input str),
    /// The body of a single-quoted string literal, with escapes unprocessed.
    String(&'input str),
    /// `@...` date literal text, including the leading `@`.
    Date(&'input str),
    /// `@...T...` datetime literal text, including the leading `@`.
    DateTime(&'input str),
    /// `@T...` time literal text, including the leading `@T`.
    Time(&'input str),
    /// A bare word: identifier, function name, or path segment.
    Identifier(&'input str),
    /// A `%name` environment/external constant reference.
    ExternalConstant(&'input str),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Ampersand,
    Pipe,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Dot,
    Comma,
    Dollar,
    DollarThis,
    DollarIndex,
    DollarTotal,
    Backtick(&'input str),

    // Keywords that double as identifiers depending on position are still
    // emitted as `Identifier` — these are the keywords that are never valid
    // identifiers.
    And,
    Or,
    Xor,
    Implies,
    Div,
    Mod,
    In,
    Contains,
    Is,
    As,
    True,
    False,
}

fn is_id_start(c: char) -> bool {
    UnicodeXID::is_xid_start(c) || c == '_'
}

fn is_id_continue(c: char) -> bool {
    UnicodeXID::is_xid_continue(c)
}

fn keyword(word: &str) -> Option<Token<'static>> {
    Some(match word {
        "and" => Token::And,
        "or" => Token::Or,
        "xor" => Token::Xor,
        "implies" => Token::Implies,
        "div" => Token::Div,
        "mod" => Token::Mod,
        "in" => Token::In,
        "contains" => Token::Contains,
        "is" => Token::Is,
        "as" => Token::As,
        "true" => Token::True,
        "false" => Token::False,
        _ => return None,
    })
}

struct Tokenizer<'input> {
    input: &'input str,
    pos: usize,
}

impl<'input> Tokenizer<'input> {
    fn new(input: &'input str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'input str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.pos += c.len_utf8();
                }
                Some('/') if self.starts_with("//") => {
                    while !matches!(self.peek_char(), None | Some('\n')) {
                        self.pos += self.peek_char().unwrap().len_utf8();
                    }
                }
                Some('/') if self.starts_with("/*") => {
                    self.pos += 2;
                    while !self.starts_with("*/") && self.peek_char().is_some() {
                        self.pos += self.peek_char().unwrap().len_utf8();
                    }
                    if self.starts_with("*/") {
                        self.pos += 2;
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_identifier(&mut self) -> &'input str {
        let start = self.pos;
        self.bump();
        while let Some(c) = self.peek_char() {
            if is_id_continue(c) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn parse_delimited_identifier(&mut self) -> Result<&'input str> {
        self.pos += 1; // opening backtick
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c == '`' {
                let body = &self.input[start..self.pos];
                self.pos += 1;
                return Ok(body);
            }
            self.pos += c.len_utf8();
        }
        Err(FhirPathError::parse(start, "unterminated delimited identifier", &["`"]))
    }

    fn parse_string(&mut self) -> Result<&'input str> {
        self.pos += 1; // opening quote
        let start = self.pos;
        loop {
            match self.peek_char() {
                Some('\'') => {
                    let body = &self.input[start..self.pos];
                    self.pos += 1;
                    return Ok(body);
                }
                Some('\\') => {
                    self.pos += 1;
                    if let Some(c) = self.peek_char() {
                        self.pos += c.len_utf8();
                    }
                }
                Some(c) => self.pos += c.len_utf8(),
                None => {
                    return Err(FhirPathError::parse(start, "unterminated string literal", &["'"]));
                }
            }
        }
    }

    fn parse_number(&mut self) -> Token<'input> {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_decimal = false;
        if self.peek_char() == Some('.') {
            let mut lookahead = self.rest().chars();
            lookahead.next();
            if matches!(lookahead.next(), Some(c) if c.is_ascii_digit()) {
                is_decimal = true;
                self.pos += 1;
                while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        if is_decimal {
            Token::Decimal(&self.input[start..self.pos])
        } else if self.peek_char() == Some('L')
            && !matches!(self.rest()[1..].chars().next(), Some(c) if is_id_continue(c))
        {
            let text = &self.input[start..self.pos];
            self.pos += 1;
            Token::Long(text.parse().unwrap_or(0))
        } else {
            let text = &self.input[start..self.pos];
            Token::Integer(text.parse().unwrap_or(0))
        }
    }

    fn parse_date_digits(&mut self, max: usize) -> usize {
        let mut count = 0;
        while count < max && matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
            count += 1;
        }
        count
    }

    fn parse_time_tail(&mut self) {
        if self.parse_date_digits(2) == 0 {
            return;
        }
        if self.peek_char() == Some(':') {
            self.pos += 1;
            self.parse_date_digits(2);
            if self.peek_char() == Some(':') {
                self.pos += 1;
                self.parse_date_digits(2);
                if self.peek_char() == Some('.') {
                    self.pos += 1;
                    self.parse_date_digits(9);
                }
            }
        }
        match self.peek_char() {
            Some('Z') => {
                self.pos += 1;
            }
            Some('+') | Some('-') => {
                self.pos += 1;
                self.parse_date_digits(2);
                if self.peek_char() == Some(':') {
                    self.pos += 1;
                    self.parse_date_digits(2);
                }
            }
            _ => {}
        }
    }

    fn parse_at_literal(&mut self) -> Result<Token<'input>> {
        let start = self.pos;
        self.pos += 1; // '@'
        if self.peek_char() == Some('T') {
            self.pos += 1;
            self.parse_time_tail();
            return Ok(Token::Time(&self.input[start..self.pos]));
        }
        if self.parse_date_digits(4) == 0 {
            return Err(FhirPathError::parse(start, "invalid date/time literal", &["@YYYY", "@T..."]));
        }
        if self.peek_char() == Some('-') {
            self.pos += 1;
            self.parse_date_digits(2);
            if self.peek_char() == Some('-') {
                self.pos += 1;
                self.parse_date_digits(2);
            }
        }
        if self.peek_char() == Some('T') {
            self.pos += 1;
            self.parse_time_tail();
            return Ok(Token::DateTime(&self.input[start..self.pos]));
        }
        Ok(Token::Date(&self.input[start..self.pos]))
    }

    fn next_token(&mut self) -> Result<Option<Spanned<Token<'input>>>> {
        self.skip_trivia();
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let token = match c {
            '.' => {
                self.pos += 1;
                Token::Dot
            }
            '(' => {
                self.pos += 1;
                Token::LeftParen
            }
            ')' => {
                self.pos += 1;
                Token::RightParen
            }
            '[' => {
                self.pos += 1;
                Token::LeftBracket
            }
            ']' => {
                self.pos += 1;
                Token::RightBracket
            }
            '{' => {
                self.pos += 1;
                Token::LeftBrace
            }
            '}' => {
                self.pos += 1;
                Token::RightBrace
            }
            ',' => {
                self.pos += 1;
                Token::Comma
            }
            '+' => {
                self.pos += 1;
                Token::Plus
            }
            '-' => {
                self.pos += 1;
                Token::Minus
            }
            '*' => {
                self.pos += 1;
                Token::Star
            }
            '&' => {
                self.pos += 1;
                Token::Ampersand
            }
            '|' => {
                self.pos += 1;
                Token::Pipe
            }
            '/' => {
                self.pos += 1;
                Token::Slash
            }
            '=' => {
                if self.starts_with("==") {
                    self.pos += 2;
                    Token::Equivalent
                } else {
                    self.pos += 1;
                    Token::Equal
                }
            }
            '!' => {
                if self.starts_with("!=") {
                    self.pos += 2;
                    Token::NotEqual
                } else if self.starts_with("!~") {
                    self.pos += 2;
                    Token::NotEquivalent
                } else {
                    return Err(FhirPathError::parse(start, "unexpected character '!'", &["!=", "!~"]));
                }
            }
            '~' => {
                self.pos += 1;
                Token::Equivalent
            }
            '<' => {
                if self.starts_with("<=") {
                    self.pos += 2;
                    Token::LessThanOrEqual
                } else {
                    self.pos += 1;
                    Token::LessThan
                }
            }
            '>' => {
                if self.starts_with(">=") {
                    self.pos += 2;
                    Token::GreaterThanOrEqual
                } else {
                    self.pos += 1;
                    Token::GreaterThan
                }
            }
            '\'' => Token::String(self.parse_string()?),
            '`' => Token::Backtick(self.parse_delimited_identifier()?),
            '@' => self.parse_at_literal()?,
            '$' => {
                if self.starts_with("$this") {
                    self.pos += 5;
                    Token::DollarThis
                } else if self.starts_with("$index") {
                    self.pos += 6;
                    Token::DollarIndex
                } else if self.starts_with("$total") {
                    self.pos += 6;
                    Token::DollarTotal
                } else {
                    self.pos += 1;
                    Token::Dollar
                }
            }
            '%' => {
                self.pos += 1;
                let ident_start = self.pos;
                if self.peek_char() == Some('\'') {
                    Token::ExternalConstant(self.parse_string()?)
                } else if self.peek_char() == Some('`') {
                    Token::ExternalConstant(self.parse_delimited_identifier()?)
                } else {
                    // Only identifier-continue characters are consumed here: a
                    // hyphenated name like `%my-var` intentionally lexes as
                    // `%my` followed by `-var`, which the parser accepts as a
                    // subtraction expression — it's the evaluator's unknown-
                    // variable resolution error that ultimately rejects it,
                    // matching the grammar's "reject unquoted hyphenated
                    // variable" rule without a dedicated lexer special case.
                    while matches!(self.peek_char(), Some(c) if is_id_continue(c)) {
                        self.pos += self.peek_char().unwrap().len_utf8();
                    }
                    Token::ExternalConstant(&self.input[ident_start..self.pos])
                }
            }
            c if c.is_ascii_digit() => self.parse_number(),
            c if is_id_start(c) => {
                let ident = self.parse_identifier();
                keyword(ident).unwrap_or(Token::Identifier(ident))
            }
            other => {
                return Err(FhirPathError::parse(
                    start,
                    &format!("unexpected character '{other}'"),
                    &[],
                ));
            }
        };

        Ok(Some(Spanned::new(token, start, self.pos)))
    }
}

/// Tokenize a full expression into a vector of spanned tokens.
pub fn tokenize(input: &str) -> Result<Vec<Spanned<Token<'_>>>> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    while let Some(tok) = tokenizer.next_token()? {
        tokens.push(tok);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input).unwrap().into_iter().map(|t| t.value).collect()
    }

    #[test]
    fn tokenizes_path_expression() {
        assert_eq!(
            kinds("Patient.name.given"),
            vec![
                Token::Identifier("Patient"),
                Token::Dot,
                Token::Identifier("name"),
                Token::Dot,
                Token::Identifier("given"),
            ]
        );
    }

    #[test]
    fn tokenizes_long_suffix() {
        assert_eq!(kinds("123L"), vec![Token::Long(123)]);
    }

    #[test]
    fn tokenizes_quoted_unit_after_number() {
        assert_eq!(
            kinds("5 'mg'"),
            vec![Token::Integer(5), Token::String("mg")]
        );
    }

    #[test]
    fn tokenizes_special_variables() {
        assert_eq!(
            kinds("$this.$index + $total"),
            vec![Token::DollarThis, Token::Dot, Token::DollarIndex, Token::Plus, Token::DollarTotal]
        );
    }

    #[test]
    fn distinguishes_equal_from_equivalent() {
        assert_eq!(kinds("a = b"), vec![Token::Identifier("a"), Token::Equal, Token::Identifier("b")]);
        assert_eq!(kinds("a ~ b"), vec![Token::Identifier("a"), Token::Equivalent, Token::Identifier("b")]);
        assert_eq!(kinds("a == b"), vec![Token::Identifier("a"), Token::Equivalent, Token::Identifier("b")]);
    }

    #[test]
    fn tokenizes_all_external_constant_forms() {
        assert_eq!(kinds("%foo"), vec![Token::ExternalConstant("foo")]);
        assert_eq!(kinds("%`foo`"), vec![Token::ExternalConstant("foo")]);
        assert_eq!(kinds("%'foo'"), vec![Token::ExternalConstant("foo")]);
    }

    #[test]
    fn unquoted_hyphenated_variable_splits_into_subtraction() {
        assert_eq!(
            kinds("%my-var"),
            vec![
                Token::ExternalConstant("my"),
                Token::Minus,
                Token::Identifier("var"),
            ]
        );
    }
}
