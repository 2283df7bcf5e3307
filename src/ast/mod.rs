//! AST node types and the debug pretty-printer.

pub mod printer;
pub mod types;

pub use types::*;
