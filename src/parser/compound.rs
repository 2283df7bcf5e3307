//! Compound-command parsing: control structures, groups, subshells,
//! arithmetic and conditional commands, `select`.

use crate::ast::*;

use super::arith::parse_arithmetic;
use super::lexer::TokenType;
use super::parser::{word_like, Parser};
use super::types::ParseError;
use super::word::parse_word;

impl Parser {
    pub(super) fn parse_compound_command(&mut self) -> Result<CompoundCommandNode, ParseError> {
        self.enter()?;
        let result = match self.current_type() {
            TokenType::LParen => self.parse_subshell(),
            TokenType::LBrace => self.parse_group(),
            TokenType::DParen => self.parse_arithmetic_command(),
            TokenType::DBrackStart => self.parse_conditional_command(),
            TokenType::If => self.parse_if(),
            TokenType::While => self.parse_while(),
            TokenType::Until => self.parse_until(),
            TokenType::For => self.parse_for(),
            TokenType::Case => self.parse_case(),
            TokenType::Select => self.parse_select(),
            _ => Err(self.error("expected a compound command")),
        };
        self.leave();
        result
    }

    fn parse_subshell(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let span = self.current_span();
        self.bump(); // (
        let body = self.parse_script_until(&[TokenType::RParen])?;
        self.expect(TokenType::RParen)?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Subshell(SubshellNode {
            body,
            redirections,
            span,
        }))
    }

    fn parse_group(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let span = self.current_span();
        self.bump(); // {
        let body = self.parse_script_until(&[TokenType::RBrace])?;
        self.expect(TokenType::RBrace)?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Group(GroupNode {
            body,
            redirections,
            span,
        }))
    }

    fn parse_arithmetic_command(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let token = self.bump();
        let span = Self::token_span(&token);
        let expression = parse_arithmetic(&token.value, span)?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Arithmetic(ArithmeticCommandNode {
            expression,
            redirections,
            span,
        }))
    }

    fn parse_conditional_command(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let span = self.current_span();
        self.bump(); // [[
        let expression = self.parse_cond_expr()?;
        self.expect(TokenType::DBrackEnd)?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Conditional(ConditionalCommandNode {
            expression,
            redirections,
            span,
        }))
    }

    fn parse_if(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let span = self.current_span();
        self.bump(); // if
        let condition = self.parse_script_until(&[TokenType::Then])?;
        self.expect(TokenType::Then)?;
        let body = self.parse_script_until(&[TokenType::Elif, TokenType::Else, TokenType::Fi])?;
        let mut clauses = vec![IfClause { condition, body }];
        while self.current_type() == TokenType::Elif {
            self.bump();
            let condition = self.parse_script_until(&[TokenType::Then])?;
            self.expect(TokenType::Then)?;
            let body =
                self.parse_script_until(&[TokenType::Elif, TokenType::Else, TokenType::Fi])?;
            clauses.push(IfClause { condition, body });
        }
        let else_body = if self.current_type() == TokenType::Else {
            self.bump();
            Some(self.parse_script_until(&[TokenType::Fi])?)
        } else {
            None
        };
        self.expect(TokenType::Fi)?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::If(IfNode {
            clauses,
            else_body,
            redirections,
            span,
        }))
    }

    fn parse_while(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let span = self.current_span();
        self.bump(); // while
        let condition = self.parse_script_until(&[TokenType::Do])?;
        let (body, redirections) = self.parse_do_group()?;
        Ok(CompoundCommandNode::While(WhileNode {
            condition,
            body,
            redirections,
            span,
        }))
    }

    fn parse_until(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let span = self.current_span();
        self.bump(); // until
        let condition = self.parse_script_until(&[TokenType::Do])?;
        let (body, redirections) = self.parse_do_group()?;
        Ok(CompoundCommandNode::Until(UntilNode {
            condition,
            body,
            redirections,
            span,
        }))
    }

    fn parse_do_group(&mut self) -> Result<(ScriptNode, Vec<RedirectionNode>), ParseError> {
        self.expect(TokenType::Do)?;
        let body = self.parse_script_until(&[TokenType::Done])?;
        self.expect(TokenType::Done)?;
        let redirections = self.parse_trailing_redirections()?;
        Ok((body, redirections))
    }

    fn parse_for(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let span = self.current_span();
        self.bump(); // for

        if self.current_type() == TokenType::DParen {
            let token = self.bump();
            let parts = split_arith_sections(&token.value);
            if parts.len() != 3 {
                return Err(ParseError::new(
                    "expected `((init; condition; update))'",
                    span.start.line,
                    span.start.column,
                ));
            }
            let section = |text: &str| -> Result<Option<ArithmeticExpressionNode>, ParseError> {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(parse_arithmetic(trimmed, span)?))
                }
            };
            let init = section(&parts[0])?;
            let condition = section(&parts[1])?;
            let update = section(&parts[2])?;
            if self.current_type() == TokenType::Semicolon {
                self.bump();
            }
            self.skip_newlines();
            let (body, redirections) = self.parse_do_group()?;
            return Ok(CompoundCommandNode::CStyleFor(CStyleForNode {
                init,
                condition,
                update,
                body,
                redirections,
                span,
            }));
        }

        let (variable, words) = self.parse_loop_header()?;
        let (body, redirections) = self.parse_do_group()?;
        Ok(CompoundCommandNode::For(ForNode {
            variable,
            words,
            body,
            redirections,
            span,
        }))
    }

    fn parse_select(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let span = self.current_span();
        self.bump(); // select
        let (variable, words) = self.parse_loop_header()?;
        let (body, redirections) = self.parse_do_group()?;
        Ok(CompoundCommandNode::Select(SelectNode {
            variable,
            words,
            body,
            redirections,
            span,
        }))
    }

    /// `NAME [in words] <sep>` shared by `for` and `select`.
    /// `None` words means the positional parameters.
    fn parse_loop_header(&mut self) -> Result<(String, Option<Vec<WordNode>>), ParseError> {
        let name_token = self.bump();
        if name_token.token_type != TokenType::Word
            || !super::lexer::is_valid_name(&name_token.value)
        {
            return Err(ParseError::new(
                format!("`{}': not a valid identifier", name_token.value),
                name_token.line,
                name_token.column,
            ));
        }
        let variable = name_token.value;

        self.skip_newlines();
        let words = if self.current_type() == TokenType::In {
            self.bump();
            let mut words = Vec::new();
            while word_like(self.current_type()) {
                let token = self.bump();
                words.push(parse_word(&token.value, Self::token_span(&token))?);
            }
            Some(words)
        } else {
            None
        };
        if self.current_type() == TokenType::Semicolon {
            self.bump();
        }
        self.skip_newlines();
        Ok((variable, words))
    }

    fn parse_case(&mut self) -> Result<CompoundCommandNode, ParseError> {
        let span = self.current_span();
        self.bump(); // case
        if !word_like(self.current_type()) {
            return Err(self.error("expected a word after `case'"));
        }
        let word_token = self.bump();
        let word = parse_word(&word_token.value, Self::token_span(&word_token))?;
        self.skip_newlines();
        self.expect(TokenType::In)?;
        self.skip_newlines();

        let mut items = Vec::new();
        loop {
            if self.current_type() == TokenType::Esac {
                break;
            }
            if self.current_type() == TokenType::Eof {
                return Err(self.error("expected `esac'"));
            }
            if self.current_type() == TokenType::LParen {
                self.bump();
            }
            let mut patterns = Vec::new();
            loop {
                if !word_like(self.current_type()) {
                    return Err(self.error("expected a case pattern"));
                }
                let token = self.bump();
                patterns.push(parse_word(&token.value, Self::token_span(&token))?);
                if self.current_type() == TokenType::Pipe {
                    self.bump();
                } else {
                    break;
                }
            }
            self.expect(TokenType::RParen)?;
            let body = self.parse_script_until(&[
                TokenType::DSemi,
                TokenType::SemiAnd,
                TokenType::SemiSemiAnd,
                TokenType::Esac,
            ])?;
            let terminator = match self.current_type() {
                TokenType::DSemi => {
                    self.bump();
                    CaseTerminator::Break
                }
                TokenType::SemiAnd => {
                    self.bump();
                    CaseTerminator::FallThrough
                }
                TokenType::SemiSemiAnd => {
                    self.bump();
                    CaseTerminator::Continue
                }
                // `esac` directly after the last body.
                _ => CaseTerminator::Break,
            };
            items.push(CaseItemNode {
                patterns,
                body,
                terminator,
            });
            self.skip_newlines();
        }
        self.expect(TokenType::Esac)?;
        let redirections = self.parse_trailing_redirections()?;
        Ok(CompoundCommandNode::Case(CaseNode {
            word,
            items,
            redirections,
            span,
        }))
    }
}

/// Split `init; cond; update` on top-level semicolons.
fn split_arith_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ';' if depth == 0 => sections.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    sections.push(current);
    sections
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::*;

    fn first_compound(input: &str) -> CompoundCommandNode {
        let script = parse(input).expect("parse failure");
        match &script.items[0].and_or.first.commands[0] {
            CommandNode::Compound(compound) => compound.clone(),
            other => panic!("expected compound command, got {other:?}"),
        }
    }

    #[test]
    fn if_elif_else() {
        let node = first_compound("if a; then b; elif c; then d; else e; fi");
        match node {
            CompoundCommandNode::If(n) => {
                assert_eq!(n.clauses.len(), 2);
                assert!(n.else_body.is_some());
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn while_loop() {
        let node = first_compound("while read x; do echo $x; done");
        assert!(matches!(node, CompoundCommandNode::While(_)));
    }

    #[test]
    fn until_loop() {
        let node = first_compound("until test -f x; do sleep 1; done");
        assert!(matches!(node, CompoundCommandNode::Until(_)));
    }

    #[test]
    fn for_with_words() {
        let node = first_compound("for i in a b c; do echo $i; done");
        match node {
            CompoundCommandNode::For(n) => {
                assert_eq!(n.variable, "i");
                assert_eq!(n.words.as_ref().map(|w| w.len()), Some(3));
            }
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn for_without_words_uses_positionals() {
        let node = first_compound("for i; do echo $i; done");
        match node {
            CompoundCommandNode::For(n) => assert!(n.words.is_none()),
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn for_in_empty_list() {
        let node = first_compound("for i in; do echo $i; done");
        match node {
            CompoundCommandNode::For(n) => assert_eq!(n.words, Some(vec![])),
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn c_style_for() {
        let node = first_compound("for ((i=0; i<3; i++)); do echo $i; done");
        match node {
            CompoundCommandNode::CStyleFor(n) => {
                assert!(n.init.is_some());
                assert!(n.condition.is_some());
                assert!(n.update.is_some());
            }
            other => panic!("expected c-style for, got {other:?}"),
        }
    }

    #[test]
    fn c_style_for_empty_sections() {
        let node = first_compound("for ((;;)); do break; done");
        match node {
            CompoundCommandNode::CStyleFor(n) => {
                assert!(n.init.is_none());
                assert!(n.condition.is_none());
                assert!(n.update.is_none());
            }
            other => panic!("expected c-style for, got {other:?}"),
        }
    }

    #[test]
    fn case_with_terminators() {
        let node = first_compound("case $x in a) echo a;; b|c) echo bc;& d) echo d;;& e) echo e;; esac");
        match node {
            CompoundCommandNode::Case(n) => {
                assert_eq!(n.items.len(), 4);
                assert_eq!(n.items[0].terminator, CaseTerminator::Break);
                assert_eq!(n.items[1].patterns.len(), 2);
                assert_eq!(n.items[1].terminator, CaseTerminator::FallThrough);
                assert_eq!(n.items[2].terminator, CaseTerminator::Continue);
            }
            other => panic!("expected case, got {other:?}"),
        }
    }

    #[test]
    fn case_optional_open_paren() {
        let node = first_compound("case x in (a) echo a;; esac");
        assert!(matches!(node, CompoundCommandNode::Case(_)));
    }

    #[test]
    fn select_loop() {
        let node = first_compound("select opt in one two; do echo $opt; done");
        match node {
            CompoundCommandNode::Select(n) => {
                assert_eq!(n.variable, "opt");
                assert_eq!(n.words.as_ref().map(|w| w.len()), Some(2));
            }
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn subshell_and_group() {
        assert!(matches!(
            first_compound("(cd /; ls)"),
            CompoundCommandNode::Subshell(_)
        ));
        assert!(matches!(
            first_compound("{ cd /; ls; }"),
            CompoundCommandNode::Group(_)
        ));
    }

    #[test]
    fn arithmetic_command() {
        let node = first_compound("((x = 1 + 2))");
        assert!(matches!(node, CompoundCommandNode::Arithmetic(_)));
    }

    #[test]
    fn compound_redirections() {
        let node = first_compound("while true; do echo; done > out.txt");
        match node {
            CompoundCommandNode::While(n) => assert_eq!(n.redirections.len(), 1),
            other => panic!("expected while, got {other:?}"),
        }
    }

    #[test]
    fn compound_in_pipeline() {
        let script = parse("while read x; do echo $x; done | (sort)").unwrap();
        let pipeline = &script.items[0].and_or.first;
        assert_eq!(pipeline.commands.len(), 2);
        assert!(matches!(
            pipeline.commands[0],
            CommandNode::Compound(CompoundCommandNode::While(_))
        ));
        assert!(matches!(
            pipeline.commands[1],
            CommandNode::Compound(CompoundCommandNode::Subshell(_))
        ));
    }

    #[test]
    fn nested_loops() {
        let script = parse("for i in 1 2; do for j in a b; do echo $i$j; done; done").unwrap();
        assert_eq!(script.items.len(), 1);
    }
}
