//! Parser error type and shared limits.

use std::fmt;

use thiserror::Error;

// Guards against pathological input; generous for real scripts.
pub const MAX_INPUT_SIZE: usize = 4_000_000;
pub const MAX_PARSER_DEPTH: usize = 200;

/// Parse failure with source position. `incomplete` means more input
/// could complete the construct (unclosed compound, dangling
/// operator, open heredoc); the interactive reader prompts with PS2
/// instead of reporting it.
#[derive(Debug, Clone, Error)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub incomplete: bool,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            incomplete: false,
        }
    }

    pub fn incomplete(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            incomplete: true,
        }
    }
}

impl From<super::lexer::LexError> for ParseError {
    fn from(err: super::lexer::LexError) -> Self {
        Self {
            message: err.message,
            line: err.line,
            column: err.column,
            incomplete: err.incomplete,
        }
    }
}
