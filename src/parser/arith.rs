//! Arithmetic expression parser.
//!
//! Parses the C-like integer grammar used by `$((...))`, `((...))`,
//! `for ((;;))`, array subscripts, and `declare -i` assignments.
//! Precedence, highest to lowest: grouping; postfix `++ --`; prefix
//! `++ -- + - ! ~`; `**`; `* / %`; `+ -`; `<< >>`; relational;
//! equality; `&`; `^`; `|`; `&&`; `||`; ternary; assignment; comma.

use crate::ast::*;

use super::types::ParseError;
use super::word::parse_dollar;

#[derive(Debug, Clone, PartialEq)]
enum ArithToken {
    Number(i64),
    Name(String),
    Expansion(WordPart),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Question,
    Colon,
    Comma,
    Op(&'static str),
}

/// Parse arithmetic text into an expression node. Empty text is the
/// constant 0 (as in `for ((;;))`).
pub fn parse_arithmetic(text: &str, span: Span) -> Result<ArithmeticExpressionNode, ParseError> {
    let tokens = tokenize(text, span)?;
    if tokens.is_empty() {
        return Ok(ArithmeticExpressionNode {
            expr: ArithExpr::Number(0),
            text: text.to_string(),
        });
    }
    let mut parser = ArithParser {
        tokens,
        pos: 0,
        text,
        span,
    };
    let expr = parser.parse_comma()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected token in arithmetic expression"));
    }
    Ok(ArithmeticExpressionNode {
        expr,
        text: text.to_string(),
    })
}

fn tokenize(text: &str, span: Span) -> Result<Vec<ArithToken>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let err = |message: &str| ParseError::new(message, span.start.line, span.start.column);

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            ' ' | '\t' | '\n' => pos += 1,
            '\\' if chars.get(pos + 1) == Some(&'\n') => pos += 2,
            '0'..='9' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '#')
                {
                    pos += 1;
                }
                let literal: String = chars[start..pos].iter().collect();
                tokens.push(ArithToken::Number(parse_number(&literal).ok_or_else(|| {
                    err(&format!("invalid arithmetic constant: {literal}"))
                })?));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_')
                {
                    pos += 1;
                }
                tokens.push(ArithToken::Name(chars[start..pos].iter().collect()));
            }
            '$' => {
                let (part, consumed) = parse_dollar(&chars[pos..], span)?;
                match part {
                    Some(part) => {
                        tokens.push(ArithToken::Expansion(part));
                        pos += consumed;
                    }
                    None => return Err(err("stray `$' in arithmetic expression")),
                }
            }
            '(' => {
                tokens.push(ArithToken::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(ArithToken::RParen);
                pos += 1;
            }
            '[' => {
                tokens.push(ArithToken::LBracket);
                pos += 1;
            }
            ']' => {
                tokens.push(ArithToken::RBracket);
                pos += 1;
            }
            '?' => {
                tokens.push(ArithToken::Question);
                pos += 1;
            }
            ':' => {
                tokens.push(ArithToken::Colon);
                pos += 1;
            }
            ',' => {
                tokens.push(ArithToken::Comma);
                pos += 1;
            }
            _ => {
                // Longest-match operator scan.
                let rest: String = chars[pos..].iter().collect();
                const OPS: &[&str] = &[
                    "<<=", ">>=", "**", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&",
                    "||", "+=", "-=", "*=", "/=", "%=", "&=", "^=", "|=", "+", "-", "*", "/",
                    "%", "<", ">", "=", "!", "~", "&", "^", "|",
                ];
                let matched = OPS.iter().find(|op| rest.starts_with(**op));
                match matched {
                    Some(op) => {
                        tokens.push(ArithToken::Op(op));
                        pos += op.chars().count();
                    }
                    None => return Err(err(&format!("unexpected character `{c}' in arithmetic expression"))),
                }
            }
        }
    }
    Ok(tokens)
}

/// Integer literal: decimal, `0x` hex, leading-zero octal, or
/// `base#digits` with base 2..=64.
fn parse_number(literal: &str) -> Option<i64> {
    if let Some((base, digits)) = literal.split_once('#') {
        let base: u32 = base.parse().ok()?;
        if !(2..=64).contains(&base) || digits.is_empty() {
            return None;
        }
        let mut value: i64 = 0;
        for c in digits.chars() {
            let digit = match c {
                '0'..='9' => c as u32 - '0' as u32,
                'a'..='z' => c as u32 - 'a' as u32 + 10,
                'A'..='Z' => {
                    // Above base 36, uppercase continues at 36.
                    if base <= 36 {
                        c as u32 - 'A' as u32 + 10
                    } else {
                        c as u32 - 'A' as u32 + 36
                    }
                }
                '@' => 62,
                '_' => 63,
                _ => return None,
            };
            if digit >= base {
                return None;
            }
            value = value.wrapping_mul(base as i64).wrapping_add(digit as i64);
        }
        return Some(value);
    }
    if let Some(hex) = literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if literal.len() > 1 && literal.starts_with('0') {
        return i64::from_str_radix(&literal[1..], 8).ok();
    }
    literal.parse().ok()
}

struct ArithParser<'a> {
    tokens: Vec<ArithToken>,
    pos: usize,
    text: &'a str,
    span: Span,
}

impl ArithParser<'_> {
    fn error(&self, message: &str) -> ParseError {
        ParseError::new(
            format!("{message} (in `{}')", self.text),
            self.span.start.line,
            self.span.start.column,
        )
    }

    fn peek(&self) -> Option<&ArithToken> {
        self.tokens.get(self.pos)
    }

    fn peek_op(&self) -> Option<&'static str> {
        match self.peek() {
            Some(ArithToken::Op(op)) => Some(op),
            _ => None,
        }
    }

    fn bump(&mut self) -> Option<ArithToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek_op() == Some(op) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn parse_comma(&mut self) -> Result<ArithExpr, ParseError> {
        let mut left = self.parse_assign()?;
        while matches!(self.peek(), Some(ArithToken::Comma)) {
            self.pos += 1;
            let right = self.parse_assign()?;
            left = ArithExpr::Comma(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_assign(&mut self) -> Result<ArithExpr, ParseError> {
        let left = self.parse_ternary()?;
        let op = match self.peek_op() {
            Some("=") => ArithAssignOp::Assign,
            Some("+=") => ArithAssignOp::Add,
            Some("-=") => ArithAssignOp::Subtract,
            Some("*=") => ArithAssignOp::Multiply,
            Some("/=") => ArithAssignOp::Divide,
            Some("%=") => ArithAssignOp::Modulo,
            Some("<<=") => ArithAssignOp::ShiftLeft,
            Some(">>=") => ArithAssignOp::ShiftRight,
            Some("&=") => ArithAssignOp::BitAnd,
            Some("^=") => ArithAssignOp::BitXor,
            Some("|=") => ArithAssignOp::BitOr,
            _ => return Ok(left),
        };
        let target = lvalue_of(&left).ok_or_else(|| self.error("assignment to non-variable"))?;
        self.pos += 1;
        let value = self.parse_assign()?;
        Ok(ArithExpr::Assignment {
            target,
            op,
            value: Box::new(value),
        })
    }

    fn parse_ternary(&mut self) -> Result<ArithExpr, ParseError> {
        let condition = self.parse_binary(0)?;
        if matches!(self.peek(), Some(ArithToken::Question)) {
            self.pos += 1;
            let consequent = self.parse_assign()?;
            if !matches!(self.bump(), Some(ArithToken::Colon)) {
                return Err(self.error("expected `:' in conditional expression"));
            }
            let alternate = self.parse_assign()?;
            return Ok(ArithExpr::Ternary {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            });
        }
        Ok(condition)
    }

    /// Binary operator levels, lowest (`||`) to highest (`* / %`).
    fn parse_binary(&mut self, level: usize) -> Result<ArithExpr, ParseError> {
        const LEVELS: &[&[(&str, ArithBinaryOp)]] = &[
            &[("||", ArithBinaryOp::LogicalOr)],
            &[("&&", ArithBinaryOp::LogicalAnd)],
            &[("|", ArithBinaryOp::BitOr)],
            &[("^", ArithBinaryOp::BitXor)],
            &[("&", ArithBinaryOp::BitAnd)],
            &[("==", ArithBinaryOp::Equal), ("!=", ArithBinaryOp::NotEqual)],
            &[
                ("<=", ArithBinaryOp::LessEqual),
                (">=", ArithBinaryOp::GreaterEqual),
                ("<", ArithBinaryOp::Less),
                (">", ArithBinaryOp::Greater),
            ],
            &[("<<", ArithBinaryOp::ShiftLeft), (">>", ArithBinaryOp::ShiftRight)],
            &[("+", ArithBinaryOp::Add), ("-", ArithBinaryOp::Subtract)],
            &[
                ("*", ArithBinaryOp::Multiply),
                ("/", ArithBinaryOp::Divide),
                ("%", ArithBinaryOp::Modulo),
            ],
        ];

        if level >= LEVELS.len() {
            return self.parse_power();
        }
        let mut left = self.parse_binary(level + 1)?;
        'outer: loop {
            for (text, op) in LEVELS[level] {
                if self.peek_op() == Some(text) {
                    self.pos += 1;
                    let right = self.parse_binary(level + 1)?;
                    left = ArithExpr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    /// `**` binds tighter than `* / %` and is right-associative.
    fn parse_power(&mut self) -> Result<ArithExpr, ParseError> {
        let base = self.parse_unary()?;
        if self.eat_op("**") {
            let exponent = self.parse_power()?;
            return Ok(ArithExpr::Binary {
                op: ArithBinaryOp::Power,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<ArithExpr, ParseError> {
        if self.eat_op("++") {
            let operand = self.parse_unary()?;
            let target = lvalue_of(&operand).ok_or_else(|| self.error("++ requires a variable"))?;
            return Ok(ArithExpr::IncDec {
                target,
                increment: true,
                prefix: true,
            });
        }
        if self.eat_op("--") {
            let operand = self.parse_unary()?;
            let target = lvalue_of(&operand).ok_or_else(|| self.error("-- requires a variable"))?;
            return Ok(ArithExpr::IncDec {
                target,
                increment: false,
                prefix: true,
            });
        }
        for (text, op) in [
            ("+", ArithUnaryOp::Plus),
            ("-", ArithUnaryOp::Minus),
            ("!", ArithUnaryOp::LogicalNot),
            ("~", ArithUnaryOp::BitNot),
        ] {
            if self.eat_op(text) {
                let operand = self.parse_unary()?;
                return Ok(ArithExpr::Unary {
                    op,
                    operand: Box::new(operand),
                });
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<ArithExpr, ParseError> {
        let primary = self.parse_primary()?;
        if let Some(target) = lvalue_of(&primary) {
            if self.eat_op("++") {
                return Ok(ArithExpr::IncDec {
                    target,
                    increment: true,
                    prefix: false,
                });
            }
            if self.eat_op("--") {
                return Ok(ArithExpr::IncDec {
                    target,
                    increment: false,
                    prefix: false,
                });
            }
        }
        Ok(primary)
    }

    fn parse_primary(&mut self) -> Result<ArithExpr, ParseError> {
        match self.bump() {
            Some(ArithToken::Number(n)) => Ok(ArithExpr::Number(n)),
            Some(ArithToken::Name(name)) => {
                if matches!(self.peek(), Some(ArithToken::LBracket)) {
                    self.pos += 1;
                    let index = self.parse_comma()?;
                    if !matches!(self.bump(), Some(ArithToken::RBracket)) {
                        return Err(self.error("expected `]' after array subscript"));
                    }
                    return Ok(ArithExpr::Element {
                        name,
                        index: Box::new(index),
                    });
                }
                Ok(ArithExpr::Variable(name))
            }
            Some(ArithToken::Expansion(part)) => Ok(ArithExpr::Expansion(Box::new(part))),
            Some(ArithToken::LParen) => {
                let inner = self.parse_comma()?;
                if !matches!(self.bump(), Some(ArithToken::RParen)) {
                    return Err(self.error("expected `)'"));
                }
                Ok(ArithExpr::Group(Box::new(inner)))
            }
            _ => Err(self.error("expected an operand")),
        }
    }
}

fn lvalue_of(expr: &ArithExpr) -> Option<ArithTarget> {
    match expr {
        ArithExpr::Variable(name) => Some(ArithTarget {
            name: name.clone(),
            index: None,
        }),
        ArithExpr::Element { name, index } => Some(ArithTarget {
            name: name.clone(),
            index: Some(index.clone()),
        }),
        ArithExpr::Group(inner) => lvalue_of(inner),
        _ => None,
    }
}
