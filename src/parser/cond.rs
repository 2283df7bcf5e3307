//! `[[ ... ]]` conditional expression parsing.
//!
//! The region is lexed with word splitting and globbing disabled;
//! `<` and `>` arrive as ordinary words, `&&` / `||` / `!` / parens
//! keep their operator meaning, and an `=~` right-hand side is one
//! raw word.

use crate::ast::*;

use super::lexer::TokenType;
use super::parser::Parser;
use super::types::ParseError;
use super::word::parse_word;

fn unary_op_for(flag: char) -> Option<CondUnaryOp> {
    Some(match flag {
        'b' => CondUnaryOp::BlockSpecial,
        'c' => CondUnaryOp::CharSpecial,
        'd' => CondUnaryOp::Directory,
        'e' => CondUnaryOp::Exists,
        'f' => CondUnaryOp::RegularFile,
        'g' => CondUnaryOp::SetGid,
        'h' | 'L' => CondUnaryOp::Symlink,
        'k' => CondUnaryOp::Sticky,
        'p' => CondUnaryOp::NamedPipe,
        'r' => CondUnaryOp::Readable,
        's' => CondUnaryOp::NonEmptyFile,
        't' => CondUnaryOp::Terminal,
        'u' => CondUnaryOp::SetUid,
        'w' => CondUnaryOp::Writable,
        'x' => CondUnaryOp::Executable,
        'G' => CondUnaryOp::OwnedByEgid,
        'N' => CondUnaryOp::ModifiedSinceRead,
        'O' => CondUnaryOp::OwnedByEuid,
        'S' => CondUnaryOp::Socket,
        'z' => CondUnaryOp::ZeroLength,
        'n' => CondUnaryOp::NonZeroLength,
        'o' => CondUnaryOp::OptionSet,
        'v' => CondUnaryOp::VarSet,
        _ => return None,
    })
}

fn binary_op_for(text: &str) -> Option<CondBinaryOp> {
    Some(match text {
        "=" | "==" => CondBinaryOp::PatternEqual,
        "!=" => CondBinaryOp::PatternNotEqual,
        "=~" => CondBinaryOp::RegexMatch,
        "<" => CondBinaryOp::StringLess,
        ">" => CondBinaryOp::StringGreater,
        "-eq" => CondBinaryOp::NumEqual,
        "-ne" => CondBinaryOp::NumNotEqual,
        "-lt" => CondBinaryOp::NumLess,
        "-le" => CondBinaryOp::NumLessEq,
        "-gt" => CondBinaryOp::NumGreater,
        "-ge" => CondBinaryOp::NumGreaterEq,
        "-nt" => CondBinaryOp::NewerThan,
        "-ot" => CondBinaryOp::OlderThan,
        "-ef" => CondBinaryOp::SameFile,
        _ => return None,
    })
}

impl Parser {
    pub(super) fn parse_cond_expr(&mut self) -> Result<CondExpr, ParseError> {
        self.enter()?;
        let result = self.parse_cond_or();
        self.leave();
        result
    }

    fn parse_cond_or(&mut self) -> Result<CondExpr, ParseError> {
        let mut left = self.parse_cond_and()?;
        while self.current_type() == TokenType::OrOr {
            self.bump();
            self.skip_newlines();
            let right = self.parse_cond_and()?;
            left = CondExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_cond_and(&mut self) -> Result<CondExpr, ParseError> {
        let mut left = self.parse_cond_unary()?;
        while self.current_type() == TokenType::AndAnd {
            self.bump();
            self.skip_newlines();
            let right = self.parse_cond_unary()?;
            left = CondExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_cond_unary(&mut self) -> Result<CondExpr, ParseError> {
        match self.current_type() {
            TokenType::Bang => {
                self.bump();
                let operand = self.parse_cond_unary()?;
                Ok(CondExpr::Not(Box::new(operand)))
            }
            TokenType::LParen => {
                self.bump();
                self.skip_newlines();
                let inner = self.parse_cond_or()?;
                self.skip_newlines();
                self.expect(TokenType::RParen)?;
                Ok(CondExpr::Group(Box::new(inner)))
            }
            _ => self.parse_cond_primary(),
        }
    }

    fn parse_cond_primary(&mut self) -> Result<CondExpr, ParseError> {
        if self.current_type() != TokenType::Word {
            return Err(self.error("expected an operand in conditional expression"));
        }
        let first = self.bump();

        // Unary file/string/variable test: `-X operand`.
        let first_chars: Vec<char> = first.value.chars().collect();
        if first_chars.len() == 2 && first_chars[0] == '-' {
            if let Some(op) = unary_op_for(first_chars[1]) {
                // With no operand the flag is just a non-empty word,
                // as in `[[ -f ]]`.
                if self.current_type() == TokenType::Word {
                    let operand_token = self.bump();
                    let operand =
                        parse_word(&operand_token.value, Self::token_span(&operand_token))?;
                    return Ok(CondExpr::Unary { op, operand });
                }
            }
        }

        let left = parse_word(&first.value, Self::token_span(&first))?;

        // Binary operator?
        if self.current_type() == TokenType::Word {
            if let Some(op) = binary_op_for(self.current_text()) {
                self.bump();
                if self.current_type() != TokenType::Word {
                    return Err(self.error("expected right-hand operand"));
                }
                let right_token = self.bump();
                let right = parse_word(&right_token.value, Self::token_span(&right_token))?;
                return Ok(CondExpr::Binary { op, left, right });
            }
        }

        Ok(CondExpr::Word(left))
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::*;

    fn cond(input: &str) -> CondExpr {
        let script = parse(input).expect("parse failure");
        match &script.items[0].and_or.first.commands[0] {
            CommandNode::Compound(CompoundCommandNode::Conditional(node)) => {
                node.expression.clone()
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn unary_file_test() {
        assert!(matches!(
            cond("[[ -f /etc/passwd ]]"),
            CondExpr::Unary { op: CondUnaryOp::RegularFile, .. }
        ));
    }

    #[test]
    fn string_tests() {
        assert!(matches!(
            cond("[[ -z $x ]]"),
            CondExpr::Unary { op: CondUnaryOp::ZeroLength, .. }
        ));
        assert!(matches!(
            cond("[[ -n $x ]]"),
            CondExpr::Unary { op: CondUnaryOp::NonZeroLength, .. }
        ));
    }

    #[test]
    fn pattern_equality() {
        assert!(matches!(
            cond("[[ $x == a* ]]"),
            CondExpr::Binary { op: CondBinaryOp::PatternEqual, .. }
        ));
        assert!(matches!(
            cond("[[ $x != y ]]"),
            CondExpr::Binary { op: CondBinaryOp::PatternNotEqual, .. }
        ));
    }

    #[test]
    fn regex_match() {
        assert!(matches!(
            cond("[[ $x =~ ^[0-9]+$ ]]"),
            CondExpr::Binary { op: CondBinaryOp::RegexMatch, .. }
        ));
    }

    #[test]
    fn numeric_comparisons() {
        assert!(matches!(
            cond("[[ 3 -lt 5 ]]"),
            CondExpr::Binary { op: CondBinaryOp::NumLess, .. }
        ));
        assert!(matches!(
            cond("[[ $a -ge $b ]]"),
            CondExpr::Binary { op: CondBinaryOp::NumGreaterEq, .. }
        ));
    }

    #[test]
    fn string_ordering() {
        assert!(matches!(
            cond("[[ a < b ]]"),
            CondExpr::Binary { op: CondBinaryOp::StringLess, .. }
        ));
    }

    #[test]
    fn logical_combinations() {
        assert!(matches!(cond("[[ -f a && -f b ]]"), CondExpr::And(..)));
        assert!(matches!(cond("[[ -f a || -f b ]]"), CondExpr::Or(..)));
        assert!(matches!(cond("[[ ! -f a ]]"), CondExpr::Not(_)));
    }

    #[test]
    fn grouping_precedence() {
        // && binds tighter than ||.
        match cond("[[ -f a || -f b && -f c ]]") {
            CondExpr::Or(_, right) => assert!(matches!(*right, CondExpr::And(..))),
            other => panic!("expected or, got {other:?}"),
        }
        assert!(matches!(
            cond("[[ ( -f a || -f b ) && -f c ]]"),
            CondExpr::And(..)
        ));
    }

    #[test]
    fn bare_word() {
        assert!(matches!(cond("[[ $x ]]"), CondExpr::Word(_)));
    }

    #[test]
    fn file_comparisons() {
        assert!(matches!(
            cond("[[ a -nt b ]]"),
            CondExpr::Binary { op: CondBinaryOp::NewerThan, .. }
        ));
    }
}
