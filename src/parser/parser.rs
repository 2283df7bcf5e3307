//! Recursive-descent parser.
//!
//! Grammar entry is a complete command list:
//!
//! ```text
//! list     := and_or ( (';' | '&') and_or )* (';' | '&')?
//! and_or   := pipeline ( ('&&' | '||') linebreak pipeline )*
//! pipeline := ['!'] command ( ('|' | '|&') linebreak command )*
//! command  := simple_command | compound_command redirection* | function_def
//! ```
//!
//! Single-token lookahead; on failure the error carries the expected
//! construct and the offending token's position. Compound commands
//! live in `compound.rs`, `[[ ]]` parsing in `cond.rs`.

use std::collections::{HashMap, VecDeque};

use crate::ast::*;

use super::lexer::{HereDocBody, Lexer, Token, TokenType};
use super::types::{ParseError, MAX_INPUT_SIZE, MAX_PARSER_DEPTH};
use super::word::{parse_heredoc_content, parse_word, parse_word_in, WordContext};

/// Parse a complete script with no alias table.
pub fn parse(input: &str) -> Result<ScriptNode, ParseError> {
    parse_with_aliases(input, &HashMap::new())
}

/// Parse a complete script, expanding aliases at command-word
/// position from the given table.
pub fn parse_with_aliases(
    input: &str,
    aliases: &HashMap<String, String>,
) -> Result<ScriptNode, ParseError> {
    if input.len() > MAX_INPUT_SIZE {
        return Err(ParseError::new("input too large", 1, 1));
    }
    let output = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(output.tokens, output.heredocs, aliases.clone());
    parser.parse_program()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    heredocs: VecDeque<HereDocBody>,
    aliases: HashMap<String, String>,
    /// (end position, name) for in-progress alias expansions; an
    /// alias inside its own expansion is not re-expanded.
    active_aliases: Vec<(usize, String)>,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, heredocs: Vec<HereDocBody>, aliases: HashMap<String, String>) -> Self {
        Self {
            tokens,
            pos: 0,
            heredocs: heredocs.into(),
            aliases,
            active_aliases: Vec::new(),
            depth: 0,
        }
    }

    // ---- token access ------------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(super) fn current_type(&self) -> TokenType {
        self.current().token_type
    }

    fn peek_type(&self, offset: usize) -> TokenType {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.token_type)
            .unwrap_or(TokenType::Eof)
    }

    pub(super) fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        self.retire_aliases();
        token
    }

    fn retire_aliases(&mut self) {
        let pos = self.pos;
        self.active_aliases.retain(|(end, _)| *end > pos);
    }

    pub(super) fn token_span(token: &Token) -> Span {
        let start = Position {
            line: token.line,
            column: token.column,
            offset: token.start,
        };
        let end = Position {
            line: token.line,
            column: token.column + (token.end - token.start),
            offset: token.end,
        };
        Span::new(start, end)
    }

    pub(super) fn current_span(&self) -> Span {
        Self::token_span(self.current())
    }

    pub(super) fn current_text(&self) -> &str {
        &self.current().value
    }

    pub(super) fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.current();
        if token.token_type == TokenType::Eof {
            ParseError::incomplete(
                format!("{} (unexpected end of input)", message.into()),
                token.line,
                token.column,
            )
        } else {
            ParseError::new(
                format!("{} near `{}'", message.into(), token.value),
                token.line,
                token.column,
            )
        }
    }

    pub(super) fn expect(&mut self, token_type: TokenType) -> Result<Token, ParseError> {
        if self.current_type() == token_type {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected `{}'", token_type.as_str())))
        }
    }

    pub(super) fn skip_newlines(&mut self) {
        while self.current_type() == TokenType::Newline {
            self.bump();
        }
    }

    pub(super) fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            return Err(self.error("expression nesting too deep"));
        }
        Ok(())
    }

    pub(super) fn leave(&mut self) {
        self.depth -= 1;
    }

    // ---- entry -------------------------------------------------------------

    fn parse_program(&mut self) -> Result<ScriptNode, ParseError> {
        let script = self.parse_script_until(&[])?;
        if self.current_type() != TokenType::Eof {
            return Err(self.error("unexpected token"));
        }
        Ok(script)
    }

    /// Parse list items until EOF or one of `stops` (not consumed).
    pub(super) fn parse_script_until(
        &mut self,
        stops: &[TokenType],
    ) -> Result<ScriptNode, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            let t = self.current_type();
            if t == TokenType::Eof || stops.contains(&t) {
                break;
            }
            let span = Self::token_span(self.current());
            let and_or = self.parse_and_or()?;
            let mut background = false;
            match self.current_type() {
                TokenType::Semicolon => {
                    self.bump();
                }
                TokenType::Amp => {
                    background = true;
                    self.bump();
                }
                TokenType::Newline | TokenType::Eof => {}
                t if stops.contains(&t) => {}
                _ => return Err(self.error("unexpected token")),
            }
            items.push(ListItemNode {
                and_or,
                background,
                span,
            });
        }
        Ok(ScriptNode { items })
    }

    fn parse_and_or(&mut self) -> Result<AndOrNode, ParseError> {
        let first = self.parse_pipeline()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.current_type() {
                TokenType::AndAnd => AndOrOperator::And,
                TokenType::OrOr => AndOrOperator::Or,
                _ => break,
            };
            self.bump();
            self.skip_newlines();
            rest.push((op, self.parse_pipeline()?));
        }
        Ok(AndOrNode { first, rest })
    }

    fn parse_pipeline(&mut self) -> Result<PipelineNode, ParseError> {
        let span = Self::token_span(self.current());
        let mut negated = false;
        let mut timed = false;
        loop {
            match self.current_type() {
                TokenType::Bang => {
                    negated = !negated;
                    self.bump();
                }
                TokenType::Time => {
                    timed = true;
                    self.bump();
                }
                _ => break,
            }
        }
        let mut commands = vec![self.parse_command()?];
        let mut pipe_stderr = Vec::new();
        loop {
            match self.current_type() {
                TokenType::Pipe => pipe_stderr.push(false),
                TokenType::PipeAmp => pipe_stderr.push(true),
                _ => break,
            }
            self.bump();
            self.skip_newlines();
            commands.push(self.parse_command()?);
        }
        Ok(PipelineNode {
            commands,
            negated,
            timed,
            pipe_stderr,
            span,
        })
    }

    pub(super) fn parse_command(&mut self) -> Result<CommandNode, ParseError> {
        self.enter()?;
        let result = self.parse_command_inner();
        self.leave();
        result
    }

    fn parse_command_inner(&mut self) -> Result<CommandNode, ParseError> {
        match self.current_type() {
            TokenType::LParen
            | TokenType::LBrace
            | TokenType::DParen
            | TokenType::DBrackStart
            | TokenType::If
            | TokenType::While
            | TokenType::Until
            | TokenType::For
            | TokenType::Case
            | TokenType::Select => {
                let compound = self.parse_compound_command()?;
                Ok(CommandNode::Compound(compound))
            }
            TokenType::Function => self.parse_function_def(true),
            TokenType::Word
                if self.peek_type(1) == TokenType::LParen
                    && self.peek_type(2) == TokenType::RParen
                    && super::lexer::is_valid_name(&self.current().value) =>
            {
                self.parse_function_def(false)
            }
            TokenType::Word
            | TokenType::AssignmentWord
            | TokenType::IoNumber
            | TokenType::Less
            | TokenType::Great
            | TokenType::DGreat
            | TokenType::DLess
            | TokenType::DLessDash
            | TokenType::TLess
            | TokenType::LessAnd
            | TokenType::GreatAnd
            | TokenType::LessGreat
            | TokenType::Clobber
            | TokenType::AndGreat
            | TokenType::AndDGreat => self.parse_simple_command(),
            _ => Err(self.error("expected a command")),
        }
    }

    /// `function NAME [()] body` or `NAME() body`. The body is any
    /// compound command; trailing redirections attach to the
    /// definition and apply at each invocation.
    fn parse_function_def(&mut self, keyword: bool) -> Result<CommandNode, ParseError> {
        let span = Self::token_span(self.current());
        if keyword {
            self.bump(); // `function`
            let name_token = self.current().clone();
            if name_token.token_type != TokenType::Word
                || !super::lexer::is_valid_name(&name_token.value)
            {
                return Err(self.error("expected function name"));
            }
            self.bump();
            if self.current_type() == TokenType::LParen {
                self.bump();
                self.expect(TokenType::RParen)?;
            }
            self.skip_newlines();
            let body = self.parse_compound_command()?;
            let redirections = self.parse_trailing_redirections()?;
            Ok(CommandNode::FunctionDef(FunctionDefNode {
                name: name_token.value,
                body: std::rc::Rc::new(body),
                redirections,
                span,
            }))
        } else {
            let name_token = self.bump();
            self.expect(TokenType::LParen)?;
            self.expect(TokenType::RParen)?;
            self.skip_newlines();
            let body = self.parse_compound_command()?;
            let redirections = self.parse_trailing_redirections()?;
            Ok(CommandNode::FunctionDef(FunctionDefNode {
                name: name_token.value,
                body: std::rc::Rc::new(body),
                redirections,
                span,
            }))
        }
    }

    // ---- simple commands ---------------------------------------------------

    fn parse_simple_command(&mut self) -> Result<CommandNode, ParseError> {
        let span = Self::token_span(self.current());
        let mut assignments = Vec::new();
        let mut name: Option<WordNode> = None;
        let mut args = Vec::new();
        let mut redirections = Vec::new();
        // Set when the previous alias expansion ended with a blank,
        // which makes the following word eligible too.
        let mut alias_after_blank = false;

        loop {
            match self.current_type() {
                TokenType::AssignmentWord if name.is_none() => {
                    let token = self.bump();
                    assignments.push(self.parse_assignment(&token)?);
                }
                TokenType::IoNumber => {
                    redirections.push(self.parse_redirection()?);
                }
                t if is_redirection_token(t) => {
                    redirections.push(self.parse_redirection()?);
                }
                t if word_like(t) => {
                    if name.is_none() || alias_after_blank {
                        if let Some(trailing_blank) = self.try_expand_alias() {
                            alias_after_blank = trailing_blank;
                            continue;
                        }
                    }
                    alias_after_blank = false;
                    let token = self.bump();
                    let word_span = Self::token_span(&token);
                    let word = parse_word(&token.value, word_span)?;
                    if name.is_none() {
                        name = Some(word);
                    } else {
                        args.push(word);
                    }
                }
                _ => break,
            }
        }

        if assignments.is_empty() && name.is_none() && redirections.is_empty() {
            return Err(self.error("expected a command"));
        }
        Ok(CommandNode::Simple(SimpleCommandNode {
            assignments,
            name,
            args,
            redirections,
            span,
        }))
    }

    /// Expand an alias at command-word position. Returns
    /// `Some(ends_with_blank)` when the token stream was rewritten
    /// and parsing should re-examine the current position.
    fn try_expand_alias(&mut self) -> Option<bool> {
        let token = self.current();
        if token.token_type != TokenType::Word {
            return None;
        }
        let name = token.value.clone();
        let replacement = self.aliases.get(&name)?.clone();
        if self.active_aliases.iter().any(|(_, n)| *n == name) {
            return None;
        }
        let ends_with_blank = replacement.ends_with(' ') || replacement.ends_with('\t');
        let lexed = Lexer::new(&replacement).tokenize().ok()?;
        let mut new_tokens: Vec<Token> = lexed
            .tokens
            .into_iter()
            .filter(|t| t.token_type != TokenType::Eof)
            .collect();
        // Spliced tokens keep the call site's position for
        // diagnostics.
        for t in &mut new_tokens {
            t.line = self.current().line;
            t.column = self.current().column;
        }
        let count = new_tokens.len();
        self.tokens.splice(self.pos..self.pos + 1, new_tokens);
        self.active_aliases.push((self.pos + count, name));
        Some(ends_with_blank)
    }

    /// Decompose a raw assignment word: `name[sub]+=value`.
    fn parse_assignment(&mut self, token: &Token) -> Result<AssignmentNode, ParseError> {
        let text = &token.value;
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        let name: String = chars[..i].iter().collect();

        let mut subscript = None;
        if i < chars.len() && chars[i] == '[' {
            let mut depth = 0usize;
            let start = i + 1;
            while i < chars.len() {
                match chars[i] {
                    '[' => depth += 1,
                    ']' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            subscript = Some(chars[start..i].iter().collect());
            i += 1;
        }

        let append = chars.get(i) == Some(&'+');
        if append {
            i += 1;
        }
        // Skip the `=`.
        i += 1;
        let value_text: String = chars[i..].iter().collect();

        // `name=(...)` array literal: the parenthesis is a separate
        // token because `(` ends the word.
        if value_text.is_empty()
            && self.current_type() == TokenType::LParen
            && self.current().start == token.end
        {
            self.bump();
            let elements = self.parse_array_literal()?;
            return Ok(AssignmentNode {
                name,
                subscript,
                value: None,
                append,
                array: Some(elements),
            });
        }

        let span = Self::token_span(token);
        let value = if value_text.is_empty() {
            None
        } else {
            Some(parse_word_in(
                &value_text,
                span,
                WordContext { assignment_value: true },
            )?)
        };
        Ok(AssignmentNode {
            name,
            subscript,
            value,
            append,
            array: None,
        })
    }

    /// Elements of `name=( ... )`, each optionally `[key]=value`.
    fn parse_array_literal(&mut self) -> Result<Vec<ArrayElementNode>, ParseError> {
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            match self.current_type() {
                TokenType::RParen => {
                    self.bump();
                    return Ok(elements);
                }
                TokenType::Eof => return Err(self.error("expected `)'")),
                t if word_like(t) || t == TokenType::AssignmentWord => {
                    let token = self.bump();
                    let span = Self::token_span(&token);
                    let text = token.value;
                    let (key, value_text) = split_array_element(&text);
                    elements.push(ArrayElementNode {
                        key,
                        value: parse_word(&value_text, span)?,
                    });
                }
                _ => return Err(self.error("invalid token in array literal")),
            }
        }
    }

    // ---- redirections ------------------------------------------------------

    pub(super) fn parse_trailing_redirections(&mut self) -> Result<Vec<RedirectionNode>, ParseError> {
        let mut redirections = Vec::new();
        loop {
            match self.current_type() {
                TokenType::IoNumber => redirections.push(self.parse_redirection()?),
                t if is_redirection_token(t) => redirections.push(self.parse_redirection()?),
                _ => break,
            }
        }
        Ok(redirections)
    }

    fn parse_redirection(&mut self) -> Result<RedirectionNode, ParseError> {
        let span = Self::token_span(self.current());
        let fd = if self.current_type() == TokenType::IoNumber {
            let token = self.bump();
            Some(token.value.parse::<i32>().map_err(|_| {
                ParseError::new("file descriptor out of range", token.line, token.column)
            })?)
        } else {
            None
        };

        let operator = match self.current_type() {
            TokenType::Less => RedirectionOperator::Less,
            TokenType::Great => RedirectionOperator::Great,
            TokenType::DGreat => RedirectionOperator::DGreat,
            TokenType::LessAnd => RedirectionOperator::LessAnd,
            TokenType::GreatAnd => RedirectionOperator::GreatAnd,
            TokenType::LessGreat => RedirectionOperator::LessGreat,
            TokenType::Clobber => RedirectionOperator::Clobber,
            TokenType::AndGreat => RedirectionOperator::AndGreat,
            TokenType::AndDGreat => RedirectionOperator::AndDGreat,
            TokenType::TLess => RedirectionOperator::TLess,
            TokenType::DLess => RedirectionOperator::DLess,
            TokenType::DLessDash => RedirectionOperator::DLessDash,
            _ => return Err(self.error("expected a redirection operator")),
        };
        self.bump();

        if matches!(operator, RedirectionOperator::DLess | RedirectionOperator::DLessDash) {
            // The delimiter word was already recorded by the lexer;
            // consume it and attach the queued body.
            if !word_like(self.current_type()) {
                return Err(self.error("expected here-document delimiter"));
            }
            self.bump();
            let body = self.heredocs.pop_front().ok_or_else(|| {
                ParseError::new("here-document has no body", span.start.line, span.start.column)
            })?;
            let content = parse_heredoc_content(&body.body, body.quoted, span)?;
            return Ok(RedirectionNode {
                fd,
                operator,
                target: RedirectionTarget::HereDoc(HereDocNode {
                    delimiter: body.delimiter,
                    content,
                    strip_tabs: body.strip_tabs,
                    quoted: body.quoted,
                }),
                span,
            });
        }

        if !word_like(self.current_type()) {
            return Err(self.error("expected redirection target"));
        }
        let token = self.bump();
        let word = parse_word(&token.value, Self::token_span(&token))?;
        Ok(RedirectionNode {
            fd,
            operator,
            target: RedirectionTarget::Word(word),
            span,
        })
    }
}

/// Tokens acceptable as word text in argument position. Reserved
/// words lose their special meaning outside command start.
pub(super) fn word_like(t: TokenType) -> bool {
    matches!(
        t,
        TokenType::Word
            | TokenType::AssignmentWord
            | TokenType::In
            | TokenType::If
            | TokenType::Then
            | TokenType::Else
            | TokenType::Elif
            | TokenType::Fi
            | TokenType::For
            | TokenType::While
            | TokenType::Until
            | TokenType::Do
            | TokenType::Done
            | TokenType::Case
            | TokenType::Esac
            | TokenType::Function
            | TokenType::Select
            | TokenType::Time
            | TokenType::LBrace
            | TokenType::RBrace
            | TokenType::Bang
    )
}

pub(super) fn is_redirection_token(t: TokenType) -> bool {
    matches!(
        t,
        TokenType::Less
            | TokenType::Great
            | TokenType::DLess
            | TokenType::DGreat
            | TokenType::LessAnd
            | TokenType::GreatAnd
            | TokenType::LessGreat
            | TokenType::DLessDash
            | TokenType::Clobber
            | TokenType::TLess
            | TokenType::AndGreat
            | TokenType::AndDGreat
    )
}

/// Split one array-literal element into optional `[key]` and value
/// text.
fn split_array_element(text: &str) -> (Option<String>, String) {
    if !text.starts_with('[') {
        return (None, text.to_string());
    }
    let chars: Vec<char> = text.chars().collect();
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    if chars.get(i + 1) == Some(&'=') {
                        let key: String = chars[1..i].iter().collect();
                        let value: String = chars[i + 2..].iter().collect();
                        return (Some(key), value);
                    }
                    break;
                }
            }
            _ => {}
        }
    }
    (None, text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(input: &str) -> ScriptNode {
        parse(input).expect("parse failure")
    }

    fn first_simple(script: &ScriptNode) -> &SimpleCommandNode {
        match &script.items[0].and_or.first.commands[0] {
            CommandNode::Simple(simple) => simple,
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    #[test]
    fn simple_command_with_args() {
        let s = script("echo one two");
        let c = first_simple(&s);
        assert!(c.name.is_some());
        assert_eq!(c.args.len(), 2);
    }

    #[test]
    fn list_separators_and_background() {
        let s = script("a; b & c");
        assert_eq!(s.items.len(), 3);
        assert!(!s.items[0].background);
        assert!(s.items[1].background);
        assert!(!s.items[2].background);
    }

    #[test]
    fn and_or_chain() {
        let s = script("a && b || c");
        let and_or = &s.items[0].and_or;
        assert_eq!(and_or.rest.len(), 2);
        assert_eq!(and_or.rest[0].0, AndOrOperator::And);
        assert_eq!(and_or.rest[1].0, AndOrOperator::Or);
    }

    #[test]
    fn pipeline_with_negation() {
        let s = script("! a | b");
        let pipeline = &s.items[0].and_or.first;
        assert!(pipeline.negated);
        assert_eq!(pipeline.commands.len(), 2);
    }

    #[test]
    fn pipe_stderr_flag() {
        let s = script("a |& b");
        assert_eq!(s.items[0].and_or.first.pipe_stderr, vec![true]);
    }

    #[test]
    fn assignments_before_command() {
        let s = script("FOO=bar BAZ=qux env");
        let c = first_simple(&s);
        assert_eq!(c.assignments.len(), 2);
        assert_eq!(c.assignments[0].name, "FOO");
        assert!(c.name.is_some());
    }

    #[test]
    fn assignment_only() {
        let s = script("x=5");
        let c = first_simple(&s);
        assert!(c.name.is_none());
        assert_eq!(c.assignments.len(), 1);
    }

    #[test]
    fn append_assignment() {
        let s = script("x+=more");
        assert!(first_simple(&s).assignments[0].append);
    }

    #[test]
    fn array_assignment() {
        let s = script("arr=(a b c)");
        let c = first_simple(&s);
        let array = c.assignments[0].array.as_ref().expect("array literal");
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn array_assignment_with_keys() {
        let s = script("arr=([2]=x [5]=y)");
        let c = first_simple(&s);
        let array = c.assignments[0].array.as_ref().expect("array literal");
        assert_eq!(array[0].key.as_deref(), Some("2"));
    }

    #[test]
    fn subscript_assignment() {
        let s = script("arr[3]=v");
        let c = first_simple(&s);
        assert_eq!(c.assignments[0].subscript.as_deref(), Some("3"));
    }

    #[test]
    fn assignment_mid_command_is_word() {
        let s = script("echo x=1");
        let c = first_simple(&s);
        assert!(c.assignments.is_empty());
        assert_eq!(c.args.len(), 1);
    }

    #[test]
    fn redirections_in_order() {
        let s = script("cmd > out 2>&1 < in");
        let c = first_simple(&s);
        assert_eq!(c.redirections.len(), 3);
        assert_eq!(c.redirections[0].operator, RedirectionOperator::Great);
        assert_eq!(c.redirections[1].fd, Some(2));
        assert_eq!(c.redirections[1].operator, RedirectionOperator::GreatAnd);
        assert_eq!(c.redirections[2].operator, RedirectionOperator::Less);
    }

    #[test]
    fn heredoc_attached() {
        let s = script("cat <<EOF\nbody line\nEOF\n");
        let c = first_simple(&s);
        match &c.redirections[0].target {
            RedirectionTarget::HereDoc(doc) => {
                assert_eq!(doc.delimiter, "EOF");
                assert!(!doc.quoted);
            }
            other => panic!("expected heredoc, got {other:?}"),
        }
    }

    #[test]
    fn function_definition_posix_form() {
        let s = script("greet() { echo hi; }");
        match &s.items[0].and_or.first.commands[0] {
            CommandNode::FunctionDef(def) => {
                assert_eq!(def.name, "greet");
                assert!(matches!(&*def.body, CompoundCommandNode::Group(_)));
            }
            other => panic!("expected function def, got {other:?}"),
        }
    }

    #[test]
    fn function_definition_keyword_form() {
        let s = script("function greet { echo hi; }");
        assert!(matches!(
            &s.items[0].and_or.first.commands[0],
            CommandNode::FunctionDef(def) if def.name == "greet"
        ));
    }

    #[test]
    fn reserved_word_as_argument() {
        let s = script("echo if then done");
        assert_eq!(first_simple(&s).args.len(), 3);
    }

    #[test]
    fn alias_expansion() {
        let mut aliases = HashMap::new();
        aliases.insert("ll".to_string(), "ls -l".to_string());
        let s = parse_with_aliases("ll /tmp", &aliases).unwrap();
        let c = first_simple(&s);
        assert_eq!(describe(c.name.as_ref().unwrap()), "ls");
        assert_eq!(c.args.len(), 2);
    }

    #[test]
    fn alias_no_self_recursion() {
        let mut aliases = HashMap::new();
        aliases.insert("ls".to_string(), "ls --color".to_string());
        let s = parse_with_aliases("ls", &aliases).unwrap();
        let c = first_simple(&s);
        assert_eq!(describe(c.name.as_ref().unwrap()), "ls");
        assert_eq!(c.args.len(), 1);
    }

    #[test]
    fn incomplete_inputs() {
        assert!(parse("echo |").unwrap_err().incomplete);
        assert!(parse("a &&").unwrap_err().incomplete);
        assert!(parse("if true; then echo").unwrap_err().incomplete);
        assert!(parse("echo 'x").unwrap_err().incomplete);
    }

    #[test]
    fn syntax_error_positions() {
        let err = parse("echo x\n;;").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(!err.incomplete);
    }

    fn describe(word: &WordNode) -> String {
        crate::ast::printer::describe_word(word)
    }
}
