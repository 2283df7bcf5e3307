//! Lexer for shell source.
//!
//! Single pass over the input, producing a finite token stream with
//! full context awareness: quoting, balanced `$(..)` / `${..}` /
//! `$((..))` / backtick regions, here-document body collection, and
//! greedy longest-match operator recognition. Word tokens carry their
//! raw text (quotes included); the word parser turns that text into
//! typed parts.

use std::collections::HashMap;

use thiserror::Error;

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Eof,

    Newline,
    Semicolon,
    Amp, // &

    Pipe,    // |
    PipeAmp, // |&
    AndAnd,  // &&
    OrOr,   // ||
    Bang,   // !

    Less,      // <
    Great,     // >
    DLess,     // <<
    DGreat,    // >>
    LessAnd,   // <&
    GreatAnd,  // >&
    LessGreat, // <>
    DLessDash, // <<-
    Clobber,   // >|
    TLess,     // <<<
    AndGreat,  // &>
    AndDGreat, // &>>

    LParen, // (
    RParen, // )
    LBrace, // {
    RBrace, // }

    DSemi,       // ;;
    SemiAnd,     // ;&
    SemiSemiAnd, // ;;&

    DBrackStart, // [[
    DBrackEnd,   // ]]
    /// `((expr))` — the token value is the raw expression text.
    DParen,

    // Reserved words (position-sensitive; the parser demotes them to
    // ordinary words outside command-start position).
    If,
    Then,
    Else,
    Elif,
    Fi,
    For,
    While,
    Until,
    Do,
    Done,
    Case,
    Esac,
    In,
    Function,
    Select,
    Time,

    Word,
    /// Digits directly before a redirection operator (`2>&1`).
    IoNumber,
    /// `NAME=...`, `NAME+=...`, `NAME[sub]=...` at any position; the
    /// parser only honors it at command start.
    AssignmentWord,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "end of input",
            Self::Newline => "newline",
            Self::Semicolon => ";",
            Self::Amp => "&",
            Self::Pipe => "|",
            Self::PipeAmp => "|&",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
            Self::Less => "<",
            Self::Great => ">",
            Self::DLess => "<<",
            Self::DGreat => ">>",
            Self::LessAnd => "<&",
            Self::GreatAnd => ">&",
            Self::LessGreat => "<>",
            Self::DLessDash => "<<-",
            Self::Clobber => ">|",
            Self::TLess => "<<<",
            Self::AndGreat => "&>",
            Self::AndDGreat => "&>>",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::DSemi => ";;",
            Self::SemiAnd => ";&",
            Self::SemiSemiAnd => ";;&",
            Self::DBrackStart => "[[",
            Self::DBrackEnd => "]]",
            Self::DParen => "((",
            Self::If => "if",
            Self::Then => "then",
            Self::Else => "else",
            Self::Elif => "elif",
            Self::Fi => "fi",
            Self::For => "for",
            Self::While => "while",
            Self::Until => "until",
            Self::Do => "do",
            Self::Done => "done",
            Self::Case => "case",
            Self::Esac => "esac",
            Self::In => "in",
            Self::Function => "function",
            Self::Select => "select",
            Self::Time => "time",
            Self::Word => "word",
            Self::IoNumber => "io-number",
            Self::AssignmentWord => "assignment",
        }
    }
}

/// A token with its raw text and source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: impl Into<String>,
        start: usize,
        end: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            value: value.into(),
            start,
            end,
            line,
            column,
        }
    }
}

/// Lexer failure with position. `incomplete` marks errors that more
/// input could fix (unterminated quote, open substitution, open
/// heredoc) so the interactive reader can continue with PS2.
#[derive(Debug, Clone, Error)]
#[error("line {line}: {message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub incomplete: bool,
}

impl LexError {
    fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            incomplete: false,
        }
    }

    fn incomplete(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            incomplete: true,
        }
    }
}

/// A collected here-document body, queued in declaration order. The
/// parser pairs these with `<<` / `<<-` redirections as it reaches
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct HereDocBody {
    pub delimiter: String,
    pub body: String,
    pub strip_tabs: bool,
    /// Any quoting on the delimiter makes the body literal.
    pub quoted: bool,
    pub line: usize,
}

#[derive(Debug, Clone)]
struct PendingHeredoc {
    delimiter: String,
    strip_tabs: bool,
    quoted: bool,
    line: usize,
}

lazy_static::lazy_static! {
    static ref RESERVED_WORDS: HashMap<&'static str, TokenType> = {
        let mut m = HashMap::new();
        m.insert("if", TokenType::If);
        m.insert("then", TokenType::Then);
        m.insert("else", TokenType::Else);
        m.insert("elif", TokenType::Elif);
        m.insert("fi", TokenType::Fi);
        m.insert("for", TokenType::For);
        m.insert("while", TokenType::While);
        m.insert("until", TokenType::Until);
        m.insert("do", TokenType::Do);
        m.insert("done", TokenType::Done);
        m.insert("case", TokenType::Case);
        m.insert("esac", TokenType::Esac);
        m.insert("in", TokenType::In);
        m.insert("function", TokenType::Function);
        m.insert("select", TokenType::Select);
        m.insert("time", TokenType::Time);
        m
    };
}

/// Three-character operators, tried before two-character ones.
const THREE_CHAR_OPS: &[(&str, TokenType)] = &[
    (";;&", TokenType::SemiSemiAnd),
    ("<<<", TokenType::TLess),
    ("<<-", TokenType::DLessDash),
    ("&>>", TokenType::AndDGreat),
];

const TWO_CHAR_OPS: &[(&str, TokenType)] = &[
    ("&&", TokenType::AndAnd),
    ("||", TokenType::OrOr),
    ("|&", TokenType::PipeAmp),
    (";;", TokenType::DSemi),
    (";&", TokenType::SemiAnd),
    ("<<", TokenType::DLess),
    (">>", TokenType::DGreat),
    ("<&", TokenType::LessAnd),
    (">&", TokenType::GreatAnd),
    ("<>", TokenType::LessGreat),
    (">|", TokenType::Clobber),
    ("&>", TokenType::AndGreat),
];

/// Word-terminating metacharacters outside quotes.
fn is_metachar(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' | '<' | '>')
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Output of a full tokenize pass.
#[derive(Debug)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub heredocs: Vec<HereDocBody>,
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    pending_heredocs: Vec<PendingHeredoc>,
    heredocs: Vec<HereDocBody>,
    /// Inside `[[ ... ]]`: `<`/`>` become words and an `=~` RHS is
    /// consumed in regex mode.
    dbrack_depth: usize,
    /// The previous word was `=~` inside `[[ ]]`.
    regex_next: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            pending_heredocs: Vec::new(),
            heredocs: Vec::new(),
            dbrack_depth: 0,
            regex_next: false,
        }
    }

    pub fn tokenize(mut self) -> Result<LexOutput, LexError> {
        while self.pos < self.input.len() {
            // Heredoc bodies begin right after the newline that ends
            // the line carrying the `<<` operators.
            if !self.pending_heredocs.is_empty()
                && self.tokens.last().map(|t| t.token_type) == Some(TokenType::Newline)
            {
                self.collect_heredoc_bodies()?;
                continue;
            }

            self.skip_blank();
            if self.pos >= self.input.len() {
                break;
            }
            if let Some(token) = self.next_token()? {
                self.regex_next =
                    self.dbrack_depth > 0 && token.token_type == TokenType::Word && token.value == "=~";
                self.tokens.push(token);
            }
        }

        if let Some(pending) = self.pending_heredocs.first() {
            return Err(LexError::incomplete(
                format!("here-document at line {} delimited by end-of-file (wanted `{}')",
                    pending.line, pending.delimiter),
                self.line,
                self.column,
            ));
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            "",
            self.pos,
            self.pos,
            self.line,
            self.column,
        ));
        Ok(LexOutput {
            tokens: self.tokens,
            heredocs: self.heredocs,
        })
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current();
        if let Some(c) = c {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    /// Skip spaces, tabs, comments, and `\<newline>` continuations.
    fn skip_blank(&mut self) {
        loop {
            match self.current() {
                Some(' ') | Some('\t') => {
                    self.bump();
                }
                Some('\\') if self.peek(1) == Some('\n') => {
                    self.advance(2);
                }
                Some('#') => {
                    // Comment runs to end of line; the newline itself
                    // is still tokenized.
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        let (start, line, column) = (self.pos, self.line, self.column);
        let c0 = match self.current() {
            Some(c) => c,
            None => return Ok(None),
        };
        let c1 = self.peek(1);
        let c2 = self.peek(2);

        if c0 == '\n' {
            self.bump();
            return Ok(Some(Token::new(TokenType::Newline, "\n", start, self.pos, line, column)));
        }

        // A regex operand after `=~` is one raw word up to unquoted
        // whitespace, with `]]` (outside a bracket class) ending it.
        if self.regex_next && !is_metachar(c0) {
            return self.read_regex_word(start, line, column).map(Some);
        }

        // `[[` / `]]` only where a word could start/end.
        if c0 == '[' && c1 == Some('[') && self.dbrack_depth == 0 {
            let boundary = self.peek(2).map_or(true, |c| c == ' ' || c == '\t' || c == '\n');
            if boundary && self.at_command_word_position() {
                self.advance(2);
                self.dbrack_depth = 1;
                return Ok(Some(Token::new(TokenType::DBrackStart, "[[", start, self.pos, line, column)));
            }
        }
        if c0 == ']' && c1 == Some(']') && self.dbrack_depth > 0 {
            self.advance(2);
            self.dbrack_depth = 0;
            return Ok(Some(Token::new(TokenType::DBrackEnd, "]]", start, self.pos, line, column)));
        }

        // Inside `[[ ]]`, `<` and `>` are comparison words, and `&&`
        // / `||` / `(` / `)` keep their operator meaning.
        if self.dbrack_depth > 0 && (c0 == '<' || c0 == '>') && c1 != Some('(') {
            self.bump();
            return Ok(Some(Token::new(TokenType::Word, c0.to_string(), start, self.pos, line, column)));
        }

        // `((...))` — balanced capture; falls back to `(` when the
        // region does not close with an adjacent `))`.
        if c0 == '(' && c1 == Some('(') {
            if let Some((text, consumed)) = self.scan_dparen() {
                self.advance(consumed);
                return Ok(Some(Token::new(TokenType::DParen, text, start, self.pos, line, column)));
            }
        }

        // Heredoc operators register a pending body.
        if c0 == '<' && c1 == Some('<') && c2 == Some('-') {
            self.advance(3);
            self.register_heredoc(true, line)?;
            return Ok(Some(Token::new(TokenType::DLessDash, "<<-", start, self.pos, line, column)));
        }
        if c0 == '<' && c1 == Some('<') && c2 != Some('<') {
            self.advance(2);
            self.register_heredoc(false, line)?;
            return Ok(Some(Token::new(TokenType::DLess, "<<", start, self.pos, line, column)));
        }

        for (text, token_type) in THREE_CHAR_OPS {
            let chars: Vec<char> = text.chars().collect();
            if c0 == chars[0] && c1 == Some(chars[1]) && c2 == Some(chars[2]) {
                self.advance(3);
                return Ok(Some(Token::new(*token_type, *text, start, self.pos, line, column)));
            }
        }
        for (text, token_type) in TWO_CHAR_OPS {
            let chars: Vec<char> = text.chars().collect();
            if c0 == chars[0] && c1 == Some(chars[1]) {
                self.advance(2);
                return Ok(Some(Token::new(*token_type, *text, start, self.pos, line, column)));
            }
        }

        let single = match c0 {
            ';' => Some(TokenType::Semicolon),
            '&' => Some(TokenType::Amp),
            '|' => Some(TokenType::Pipe),
            '(' => Some(TokenType::LParen),
            ')' => Some(TokenType::RParen),
            '<' => Some(TokenType::Less),
            '>' => Some(TokenType::Great),
            _ => None,
        };
        if let Some(token_type) = single {
            self.bump();
            return Ok(Some(Token::new(token_type, c0.to_string(), start, self.pos, line, column)));
        }

        // Digits directly before a redirection operator form an
        // io-number (`2>&1`), not a word.
        if c0.is_ascii_digit() {
            let mut i = 0;
            while self.peek(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
            if matches!(self.peek(i), Some('<') | Some('>')) {
                let digits: String = self.input[self.pos..self.pos + i].iter().collect();
                self.advance(i);
                return Ok(Some(Token::new(TokenType::IoNumber, digits, start, self.pos, line, column)));
            }
        }

        self.read_word(start, line, column).map(Some)
    }

    /// True when the last significant token opens a command position
    /// (used only to gate `[[`).
    fn at_command_word_position(&self) -> bool {
        match self.tokens.last().map(|t| t.token_type) {
            None => true,
            Some(
                TokenType::Newline
                | TokenType::Semicolon
                | TokenType::Amp
                | TokenType::Pipe
                | TokenType::PipeAmp
                | TokenType::AndAnd
                | TokenType::OrOr
                | TokenType::DSemi
                | TokenType::SemiAnd
                | TokenType::SemiSemiAnd
                | TokenType::LParen
                | TokenType::LBrace
                | TokenType::Bang
                | TokenType::If
                | TokenType::Then
                | TokenType::Else
                | TokenType::Elif
                | TokenType::While
                | TokenType::Until
                | TokenType::Do
                | TokenType::Time,
            ) => true,
            _ => false,
        }
    }

    /// Try to scan `((...))` starting at the current `((`. Returns
    /// the inner text and total consumed length when the region
    /// closes with adjacent `))`; `None` means nested subshells.
    fn scan_dparen(&self) -> Option<(String, usize)> {
        let mut depth = 2usize;
        let mut i = 2;
        let mut text = String::new();
        let mut in_single = false;
        let mut in_double = false;
        while let Some(c) = self.peek(i) {
            if in_single {
                if c == '\'' {
                    in_single = false;
                }
            } else if in_double {
                if c == '"' {
                    in_double = false;
                } else if c == '\\' {
                    text.push(c);
                    i += 1;
                    if let Some(next) = self.peek(i) {
                        text.push(next);
                        i += 1;
                    }
                    continue;
                }
            } else {
                match c {
                    '\'' => in_single = true,
                    '"' => in_double = true,
                    '\\' => {
                        text.push(c);
                        i += 1;
                        if let Some(next) = self.peek(i) {
                            text.push(next);
                            i += 1;
                        }
                        continue;
                    }
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 1 {
                            // Must close with an adjacent `)`.
                            if self.peek(i + 1) == Some(')') {
                                return Some((text, i + 2));
                            }
                            return None;
                        }
                    }
                    _ => {}
                }
            }
            text.push(c);
            i += 1;
        }
        None
    }

    fn register_heredoc(&mut self, strip_tabs: bool, line: usize) -> Result<(), LexError> {
        // Look ahead for the delimiter word without consuming it; the
        // word itself is tokenized normally and re-read by the parser.
        let mut i = 0;
        while matches!(self.peek(i), Some(' ') | Some('\t')) {
            i += 1;
        }
        let mut delimiter = String::new();
        let mut quoted = false;
        loop {
            let c = match self.peek(i) {
                Some(c) => c,
                None => break,
            };
            if is_metachar(c) {
                break;
            }
            match c {
                '\'' => {
                    quoted = true;
                    i += 1;
                    while let Some(q) = self.peek(i) {
                        if q == '\'' {
                            i += 1;
                            break;
                        }
                        delimiter.push(q);
                        i += 1;
                    }
                }
                '"' => {
                    quoted = true;
                    i += 1;
                    while let Some(q) = self.peek(i) {
                        if q == '"' {
                            i += 1;
                            break;
                        }
                        if q == '\\' {
                            i += 1;
                            if let Some(e) = self.peek(i) {
                                delimiter.push(e);
                                i += 1;
                            }
                            continue;
                        }
                        delimiter.push(q);
                        i += 1;
                    }
                }
                '\\' => {
                    quoted = true;
                    i += 1;
                    if let Some(e) = self.peek(i) {
                        delimiter.push(e);
                        i += 1;
                    }
                }
                _ => {
                    delimiter.push(c);
                    i += 1;
                }
            }
        }
        if delimiter.is_empty() {
            return Err(LexError::new(
                "syntax error near `<<': missing here-document delimiter",
                self.line,
                self.column,
            ));
        }
        self.pending_heredocs.push(PendingHeredoc {
            delimiter,
            strip_tabs,
            quoted,
            line,
        });
        Ok(())
    }

    /// Consume body lines for every pending heredoc, in declaration
    /// order.
    fn collect_heredoc_bodies(&mut self) -> Result<(), LexError> {
        let pending = std::mem::take(&mut self.pending_heredocs);
        for heredoc in pending {
            let mut body = String::new();
            let mut terminated = false;
            while self.pos < self.input.len() {
                let line_start = self.pos;
                while self.current().is_some_and(|c| c != '\n') {
                    self.bump();
                }
                let mut line: String = self.input[line_start..self.pos].iter().collect();
                let had_newline = self.current() == Some('\n');
                if had_newline {
                    self.bump();
                }
                let check = if heredoc.strip_tabs {
                    line.trim_start_matches('\t').to_string()
                } else {
                    line.clone()
                };
                if check == heredoc.delimiter {
                    terminated = true;
                    break;
                }
                if heredoc.strip_tabs {
                    line = line.trim_start_matches('\t').to_string();
                }
                body.push_str(&line);
                if had_newline {
                    body.push('\n');
                }
            }
            if !terminated {
                return Err(LexError::incomplete(
                    format!(
                        "here-document at line {} delimited by end-of-file (wanted `{}')",
                        heredoc.line, heredoc.delimiter
                    ),
                    self.line,
                    self.column,
                ));
            }
            self.heredocs.push(HereDocBody {
                delimiter: heredoc.delimiter,
                body,
                strip_tabs: heredoc.strip_tabs,
                quoted: heredoc.quoted,
                line: heredoc.line,
            });
        }
        Ok(())
    }

    /// Read one word token, honoring quotes and balanced expansions.
    fn read_word(&mut self, start: usize, line: usize, column: usize) -> Result<Token, LexError> {
        let mut value = String::new();

        while let Some(c) = self.current() {
            match c {
                _ if is_metachar(c) => break,
                '\'' => {
                    value.push(c);
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('\'') => {
                                value.push('\'');
                                break;
                            }
                            Some(inner) => value.push(inner),
                            None => {
                                return Err(LexError::incomplete(
                                    "unterminated single quote",
                                    line,
                                    column,
                                ))
                            }
                        }
                    }
                }
                '"' => {
                    value.push(c);
                    self.bump();
                    self.consume_double_quoted(&mut value, line, column)?;
                }
                '\\' => {
                    self.bump();
                    match self.current() {
                        Some('\n') => {
                            // Continuation inside a word: both
                            // characters vanish.
                            self.bump();
                        }
                        Some(escaped) => {
                            value.push('\\');
                            value.push(escaped);
                            self.bump();
                        }
                        None => {
                            value.push('\\');
                        }
                    }
                }
                '`' => {
                    value.push(c);
                    self.bump();
                    self.consume_backquoted(&mut value, line, column)?;
                }
                '$' => {
                    value.push(c);
                    self.bump();
                    self.consume_dollar(&mut value, line, column)?;
                }
                '<' | '>' if self.peek(1) == Some('(') => {
                    // Process substitution is part of the word.
                    value.push(c);
                    self.bump();
                    value.push('(');
                    self.bump();
                    self.consume_balanced_parens(&mut value, line, column)?;
                }
                _ => {
                    value.push(c);
                    self.bump();
                }
            }
        }

        let token_type = self.classify_word(&value);
        Ok(Token::new(token_type, value, start, self.pos, line, column))
    }

    /// Regex operand after `=~`: raw text up to unquoted whitespace;
    /// `]]` ends it unless inside a `[...]` class.
    fn read_regex_word(&mut self, start: usize, line: usize, column: usize) -> Result<Token, LexError> {
        let mut value = String::new();
        let mut class_depth = 0usize;
        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' | '\n' => break,
                ']' if class_depth == 0 && self.peek(1) == Some(']') => break,
                '[' => {
                    class_depth += 1;
                    value.push(c);
                    self.bump();
                }
                ']' => {
                    class_depth = class_depth.saturating_sub(1);
                    value.push(c);
                    self.bump();
                }
                '\'' => {
                    value.push(c);
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('\'') => {
                                value.push('\'');
                                break;
                            }
                            Some(inner) => value.push(inner),
                            None => {
                                return Err(LexError::incomplete("unterminated single quote", line, column))
                            }
                        }
                    }
                }
                '"' => {
                    value.push(c);
                    self.bump();
                    self.consume_double_quoted(&mut value, line, column)?;
                }
                '\\' => {
                    value.push(c);
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        value.push(escaped);
                    }
                }
                '$' => {
                    value.push(c);
                    self.bump();
                    self.consume_dollar(&mut value, line, column)?;
                }
                _ => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        Ok(Token::new(TokenType::Word, value, start, self.pos, line, column))
    }

    /// After an opening `"`: copy through the closing quote,
    /// recursing into `$` forms and backticks.
    fn consume_double_quoted(
        &mut self,
        value: &mut String,
        line: usize,
        column: usize,
    ) -> Result<(), LexError> {
        loop {
            match self.current() {
                Some('"') => {
                    value.push('"');
                    self.bump();
                    return Ok(());
                }
                Some('\\') => {
                    value.push('\\');
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        value.push(escaped);
                    }
                }
                Some('`') => {
                    value.push('`');
                    self.bump();
                    self.consume_backquoted(value, line, column)?;
                }
                Some('$') => {
                    value.push('$');
                    self.bump();
                    self.consume_dollar(value, line, column)?;
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
                None => {
                    return Err(LexError::incomplete("unterminated double quote", line, column));
                }
            }
        }
    }

    /// After `$`: copy a balanced `{...}`, `(...)`, or `((...))`
    /// region byte-accurately so it can be re-lexed later.
    fn consume_dollar(
        &mut self,
        value: &mut String,
        line: usize,
        column: usize,
    ) -> Result<(), LexError> {
        match self.current() {
            Some('{') => {
                value.push('{');
                self.bump();
                self.consume_balanced_braces(value, line, column)
            }
            Some('(') => {
                value.push('(');
                self.bump();
                // $((...)) vs $(...): both are balanced-paren regions;
                // the word parser disambiguates on the trailing `))`.
                self.consume_balanced_parens(value, line, column)
            }
            _ => Ok(()),
        }
    }

    fn consume_backquoted(
        &mut self,
        value: &mut String,
        line: usize,
        column: usize,
    ) -> Result<(), LexError> {
        loop {
            match self.current() {
                Some('`') => {
                    value.push('`');
                    self.bump();
                    return Ok(());
                }
                Some('\\') => {
                    value.push('\\');
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        value.push(escaped);
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
                None => return Err(LexError::incomplete("unterminated backquote", line, column)),
            }
        }
    }

    /// Copy up to and including the `)` matching an already-consumed
    /// `(`, honoring quotes, escapes, nested `$(`/`(`, backticks, and
    /// `#` comments (inside command substitutions).
    fn consume_balanced_parens(
        &mut self,
        value: &mut String,
        line: usize,
        column: usize,
    ) -> Result<(), LexError> {
        let mut depth = 1usize;
        loop {
            match self.current() {
                Some('(') => {
                    depth += 1;
                    value.push('(');
                    self.bump();
                }
                Some(')') => {
                    depth -= 1;
                    value.push(')');
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('\'') => {
                    value.push('\'');
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('\'') => {
                                value.push('\'');
                                break;
                            }
                            Some(inner) => value.push(inner),
                            None => {
                                return Err(LexError::incomplete("unterminated single quote", line, column))
                            }
                        }
                    }
                }
                Some('"') => {
                    value.push('"');
                    self.bump();
                    self.consume_double_quoted(value, line, column)?;
                }
                Some('\\') => {
                    value.push('\\');
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        value.push(escaped);
                    }
                }
                Some('`') => {
                    value.push('`');
                    self.bump();
                    self.consume_backquoted(value, line, column)?;
                }
                Some('#') => {
                    // Comment to end of line inside the substitution.
                    while self.current().is_some_and(|c| c != '\n') {
                        value.push(self.current().unwrap_or_default());
                        self.bump();
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
                None => {
                    return Err(LexError::incomplete("unterminated command substitution", line, column))
                }
            }
        }
    }

    /// Copy up to and including the `}` matching an already-consumed
    /// `{` of a `${...}` expansion.
    fn consume_balanced_braces(
        &mut self,
        value: &mut String,
        line: usize,
        column: usize,
    ) -> Result<(), LexError> {
        let mut depth = 1usize;
        loop {
            match self.current() {
                Some('{') => {
                    depth += 1;
                    value.push('{');
                    self.bump();
                }
                Some('}') => {
                    depth -= 1;
                    value.push('}');
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some('\'') => {
                    value.push('\'');
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('\'') => {
                                value.push('\'');
                                break;
                            }
                            Some(inner) => value.push(inner),
                            None => {
                                return Err(LexError::incomplete("unterminated single quote", line, column))
                            }
                        }
                    }
                }
                Some('"') => {
                    value.push('"');
                    self.bump();
                    self.consume_double_quoted(value, line, column)?;
                }
                Some('\\') => {
                    value.push('\\');
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        value.push(escaped);
                    }
                }
                Some('$') => {
                    value.push('$');
                    self.bump();
                    self.consume_dollar(value, line, column)?;
                }
                Some('`') => {
                    value.push('`');
                    self.bump();
                    self.consume_backquoted(value, line, column)?;
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
                None => {
                    return Err(LexError::incomplete("unterminated parameter expansion", line, column))
                }
            }
        }
    }

    fn classify_word(&self, value: &str) -> TokenType {
        if value == "{" {
            return TokenType::LBrace;
        }
        if value == "}" {
            return TokenType::RBrace;
        }
        if value == "!" {
            return TokenType::Bang;
        }
        if self.dbrack_depth == 0 {
            if let Some(token_type) = RESERVED_WORDS.get(value) {
                return *token_type;
            }
            if is_assignment_word(value) {
                return TokenType::AssignmentWord;
            }
        }
        TokenType::Word
    }
}

/// `NAME=`, `NAME+=`, `NAME[sub]=`, `NAME[sub]+=` prefix check on raw
/// word text (quotes in the value part are fine; the name part must
/// be bare).
pub fn is_assignment_word(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    match chars.first() {
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => i += 1,
        _ => return false,
    }
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    // Optional [subscript] with balanced brackets.
    if i < chars.len() && chars[i] == '[' {
        let mut depth = 0usize;
        while i < chars.len() {
            match chars[i] {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if depth != 0 {
            return false;
        }
    }
    if i < chars.len() && chars[i] == '+' {
        i += 1;
    }
    i < chars.len() && chars[i] == '='
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().expect("lex failure").tokens
    }

    fn kinds(input: &str) -> Vec<TokenType> {
        lex(input).iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn simple_command() {
        assert_eq!(
            kinds("echo hello world"),
            vec![TokenType::Word, TokenType::Word, TokenType::Word, TokenType::Eof]
        );
    }

    #[test]
    fn operators_longest_match() {
        assert_eq!(
            kinds("a >> b 2>&1 <> c"),
            vec![
                TokenType::Word,
                TokenType::DGreat,
                TokenType::Word,
                TokenType::IoNumber,
                TokenType::GreatAnd,
                TokenType::Word,
                TokenType::LessGreat,
                TokenType::Word,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn io_number_only_before_redirect() {
        // `2` here is an argument, not an io-number.
        assert_eq!(
            kinds("echo 2 x"),
            vec![TokenType::Word, TokenType::Word, TokenType::Word, TokenType::Eof]
        );
        assert_eq!(
            kinds("echo 2>x"),
            vec![TokenType::Word, TokenType::IoNumber, TokenType::Great, TokenType::Word, TokenType::Eof]
        );
    }

    #[test]
    fn reserved_words() {
        assert_eq!(
            kinds("if true; then echo; fi"),
            vec![
                TokenType::If,
                TokenType::Word,
                TokenType::Semicolon,
                TokenType::Then,
                TokenType::Word,
                TokenType::Semicolon,
                TokenType::Fi,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn quotes_stay_in_word() {
        let tokens = lex("echo 'a b' \"c d\"");
        assert_eq!(tokens[1].value, "'a b'");
        assert_eq!(tokens[2].value, "\"c d\"");
    }

    #[test]
    fn command_substitution_is_one_word() {
        let tokens = lex("echo $(ls -l | wc) done");
        assert_eq!(tokens[1].value, "$(ls -l | wc)");
        assert_eq!(tokens[2].token_type, TokenType::Done);
    }

    #[test]
    fn nested_substitution_balanced() {
        let tokens = lex("echo $(echo $(echo inner))");
        assert_eq!(tokens[1].value, "$(echo $(echo inner))");
    }

    #[test]
    fn param_expansion_with_braces() {
        let tokens = lex("echo ${x:-{default}}");
        assert_eq!(tokens[1].value, "${x:-{default}}");
    }

    #[test]
    fn assignment_word() {
        assert_eq!(kinds("x=1")[0], TokenType::AssignmentWord);
        assert_eq!(kinds("arr[2]=v")[0], TokenType::AssignmentWord);
        assert_eq!(kinds("x+=1")[0], TokenType::AssignmentWord);
        // `=` inside a later word is not an assignment.
        assert_eq!(kinds("echo x=1")[1], TokenType::AssignmentWord);
        assert_eq!(kinds("1x=1")[0], TokenType::Word);
    }

    #[test]
    fn heredoc_body_collected() {
        let out = Lexer::new("cat <<EOF\nhello\nworld\nEOF\necho done\n")
            .tokenize()
            .unwrap();
        assert_eq!(out.heredocs.len(), 1);
        assert_eq!(out.heredocs[0].body, "hello\nworld\n");
        assert!(!out.heredocs[0].quoted);
        // The tokens after the heredoc continue normally.
        let types: Vec<TokenType> = out.tokens.iter().map(|t| t.token_type).collect();
        assert!(types.contains(&TokenType::Word));
    }

    #[test]
    fn heredoc_quoted_delimiter() {
        let out = Lexer::new("cat <<'EOF'\n$x\nEOF\n").tokenize().unwrap();
        assert!(out.heredocs[0].quoted);
        assert_eq!(out.heredocs[0].body, "$x\n");
    }

    #[test]
    fn heredoc_strip_tabs() {
        let out = Lexer::new("cat <<-EOF\n\t\tindented\n\tEOF\n").tokenize().unwrap();
        assert_eq!(out.heredocs[0].body, "indented\n");
    }

    #[test]
    fn two_heredocs_in_declaration_order() {
        let out = Lexer::new("cat <<A <<B\nbody-a\nA\nbody-b\nB\n").tokenize().unwrap();
        assert_eq!(out.heredocs[0].delimiter, "A");
        assert_eq!(out.heredocs[0].body, "body-a\n");
        assert_eq!(out.heredocs[1].delimiter, "B");
        assert_eq!(out.heredocs[1].body, "body-b\n");
    }

    #[test]
    fn unterminated_heredoc_is_incomplete() {
        let err = Lexer::new("cat <<EOF\nno end\n").tokenize().unwrap_err();
        assert!(err.incomplete);
    }

    #[test]
    fn unterminated_quote_is_incomplete() {
        let err = Lexer::new("echo 'open").tokenize().unwrap_err();
        assert!(err.incomplete);
    }

    #[test]
    fn line_continuation() {
        assert_eq!(
            kinds("echo a \\\n b"),
            vec![TokenType::Word, TokenType::Word, TokenType::Word, TokenType::Eof]
        );
        // Inside a word the pair vanishes entirely.
        let tokens = lex("echo ab\\\ncd");
        assert_eq!(tokens[1].value, "abcd");
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(
            kinds("echo a # the rest\necho b"),
            vec![
                TokenType::Word,
                TokenType::Word,
                TokenType::Newline,
                TokenType::Word,
                TokenType::Word,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn dparen_arithmetic() {
        let tokens = lex("((x = 1 + 2))");
        assert_eq!(tokens[0].token_type, TokenType::DParen);
        assert_eq!(tokens[0].value, "x = 1 + 2");
    }

    #[test]
    fn nested_parens_inside_arith() {
        let tokens = lex("(((a) + (b)))");
        assert_eq!(tokens[0].token_type, TokenType::DParen);
        assert_eq!(tokens[0].value, "(a) + (b)");
    }

    #[test]
    fn subshell_not_arith() {
        // `( (echo a); echo b )` is nested subshells.
        let tokens = lex("( (echo a); echo b )");
        assert_eq!(tokens[0].token_type, TokenType::LParen);
        assert_eq!(tokens[1].token_type, TokenType::LParen);
    }

    #[test]
    fn dbrack_tokens() {
        assert_eq!(
            kinds("[[ -f x ]]"),
            vec![
                TokenType::DBrackStart,
                TokenType::Word,
                TokenType::Word,
                TokenType::DBrackEnd,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn dbrack_comparison_ops_are_words() {
        let tokens = lex("[[ a < b ]]");
        assert_eq!(tokens[2].token_type, TokenType::Word);
        assert_eq!(tokens[2].value, "<");
    }

    #[test]
    fn regex_rhs_kept_raw() {
        let tokens = lex("[[ $x =~ ^a[0-9]+$ ]]");
        assert_eq!(tokens[2].value, "=~");
        assert_eq!(tokens[3].value, "^a[0-9]+$");
        assert_eq!(tokens[4].token_type, TokenType::DBrackEnd);
    }

    #[test]
    fn process_substitution_in_word() {
        let tokens = lex("diff <(sort a) <(sort b)");
        assert_eq!(tokens[1].value, "<(sort a)");
        assert_eq!(tokens[2].value, "<(sort b)");
    }

    #[test]
    fn bang_and_braces() {
        assert_eq!(
            kinds("! { echo; }"),
            vec![
                TokenType::Bang,
                TokenType::LBrace,
                TokenType::Word,
                TokenType::Semicolon,
                TokenType::RBrace,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn positions_tracked() {
        let tokens = lex("echo\nfoo");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].line, 2);
        assert_eq!(tokens[2].column, 1);
    }
}
