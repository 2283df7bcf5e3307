//! Runtime-toggleable introspection switches.
//!
//! Each switch gates one trace stream; everything goes to stderr so
//! command stdout is never disturbed. Toggled from the CLI
//! (`--dump-tokens` and friends) and from `set -o trace*` options.

use crate::sys;

#[derive(Debug, Clone, Copy, Default)]
pub struct TraceFlags {
    /// Dump the token stream before parsing.
    pub tokens: bool,
    /// Dump the AST before execution.
    pub ast: bool,
    /// Show each word entering expansion and the resulting fields.
    pub expansion: bool,
    /// Show fork/exec/dup and builtin dispatch activity.
    pub exec: bool,
    /// Show scope pushes/pops and local/global binds.
    pub scopes: bool,
}

impl TraceFlags {
    pub fn by_name(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "tracetokens" => Some(&mut self.tokens),
            "traceast" => Some(&mut self.ast),
            "traceexpand" => Some(&mut self.expansion),
            "traceexec" => Some(&mut self.exec),
            "tracescopes" => Some(&mut self.scopes),
            _ => None,
        }
    }

    pub const NAMES: &'static [&'static str] = &[
        "traceast",
        "traceexec",
        "traceexpand",
        "tracescopes",
        "tracetokens",
    ];
}

/// Emit one trace line to stderr.
pub fn emit(prefix: &str, message: &str) {
    let line = format!("[{prefix}] {message}\n");
    let _ = sys::write_fd(sys::STDERR_FD, line.as_bytes());
}
