//! Lexing and parsing: source text to AST.

pub mod arith;
mod compound;
mod cond;
pub mod expansion;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod word;

pub use lexer::{Lexer, Token, TokenType};
pub use parser::{parse, parse_with_aliases, Parser};
pub use types::ParseError;
