//! Source handling: strings, files, stdin, and the interactive
//! reader.

pub mod history;
pub mod repl;

use crate::exec::{interp, Flow};
use crate::parser;
use crate::shell::Shell;
use crate::sys;

/// Execute a complete source text; used for `-c`, script files, and
/// non-interactive stdin. Returns the shell's final exit status.
pub fn run_source(shell: &mut Shell, source: &str) -> i32 {
    let status = execute(shell, source);
    interp::run_exit_trap(shell);
    status & 0xff
}

/// Parse and run; parse errors report position and yield status 2.
pub fn execute(shell: &mut Shell, source: &str) -> i32 {
    if shell.options.verbose {
        let _ = sys::write_fd(sys::STDERR_FD, source.as_bytes());
    }
    if shell.trace.tokens {
        dump_tokens(source);
    }
    let script = match parser::parse_with_aliases(source, shell.aliases.map()) {
        Ok(script) => script,
        Err(e) => {
            shell.report_error(&format!("{}:{}", shell.script_name, e));
            shell.set_status(2);
            return 2;
        }
    };
    if shell.trace.ast {
        let dump = crate::ast::printer::dump_script(&script);
        let _ = sys::write_fd(sys::STDERR_FD, dump.as_bytes());
    }
    match interp::run_script(shell, &script) {
        Flow::Exit(status) | Flow::Normal(status) | Flow::Return(status) => {
            shell.set_status(status);
            shell.last_status
        }
        Flow::Break(_) | Flow::Continue(_) => shell.last_status,
    }
}

fn dump_tokens(source: &str) {
    match parser::Lexer::new(source).tokenize() {
        Ok(output) => {
            let mut text = String::new();
            for token in &output.tokens {
                text.push_str(&format!(
                    "{}:{}\t{:?}\t{}\n",
                    token.line, token.column, token.token_type, token.value
                ));
            }
            let _ = sys::write_fd(sys::STDERR_FD, text.as_bytes());
        }
        Err(e) => {
            let _ = sys::write_fd(sys::STDERR_FD, format!("lex error: {e}\n").as_bytes());
        }
    }
}

/// Run a script file with arguments as `$0`/`$1..`.
pub fn run_file(shell: &mut Shell, path: &str) -> i32 {
    match std::fs::read_to_string(path) {
        Ok(source) => run_source(shell, &source),
        Err(e) => {
            shell.report_error(&format!("{path}: {e}"));
            127
        }
    }
}

/// Source the rc file, if present, the way `.` would.
pub fn load_rc_file(shell: &mut Shell, path: &str) {
    if std::fs::metadata(path).is_err() {
        return;
    }
    let _ = crate::builtins::lookup(".").map(|handler| handler(shell, &[path.to_string()]));
}

/// Default rc path: `~/.marshrc`.
pub fn default_rc_path(shell: &Shell) -> Option<String> {
    shell.get_var("HOME").map(|home| format!("{home}/.marshrc"))
}
