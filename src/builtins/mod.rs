//! Builtin commands.
//!
//! The registry maps names to handlers; handlers receive the shell
//! state and the argument vector (without the command name) and
//! return a `Flow`. Special builtins run in the current shell with
//! persistent prefix assignments, per POSIX.

mod alias_cmd;
mod cd_cmd;
mod declare_cmd;
mod echo_cmd;
mod eval_cmd;
mod exec_cmd;
mod flow_cmd;
mod getopts_cmd;
mod jobs_cmd;
mod printf_cmd;
mod read_cmd;
mod set_cmd;
mod source_cmd;
mod trap_cmd;
mod type_cmd;

use crate::exec::Flow;
use crate::shell::Shell;
use crate::sys;

pub type Builtin = fn(&mut Shell, &[String]) -> Flow;

/// POSIX special builtins: current-shell execution, persistent
/// assignments, and stricter error behavior.
pub fn is_special(name: &str) -> bool {
    matches!(
        name,
        ":" | "." | "source" | "break" | "continue" | "eval" | "exec" | "exit" | "export"
            | "readonly" | "return" | "set" | "shift" | "trap" | "unset"
    )
}

pub fn lookup(name: &str) -> Option<Builtin> {
    Some(match name {
        ":" | "true" => builtin_true,
        "false" => builtin_false,
        "pwd" => builtin_pwd,
        "umask" => builtin_umask,
        "cd" => cd_cmd::run,
        "echo" => echo_cmd::run,
        "printf" => printf_cmd::run,
        "read" => read_cmd::run,
        "eval" => eval_cmd::run,
        "exec" => exec_cmd::run,
        "." | "source" => source_cmd::run,
        "break" => flow_cmd::run_break,
        "continue" => flow_cmd::run_continue,
        "return" => flow_cmd::run_return,
        "exit" => flow_cmd::run_exit,
        "shift" => flow_cmd::run_shift,
        "set" => set_cmd::run_set,
        "shopt" => set_cmd::run_shopt,
        "declare" | "typeset" => declare_cmd::run_declare,
        "local" => declare_cmd::run_local,
        "export" => declare_cmd::run_export,
        "readonly" => declare_cmd::run_readonly,
        "unset" => declare_cmd::run_unset,
        "alias" => alias_cmd::run_alias,
        "unalias" => alias_cmd::run_unalias,
        "trap" => trap_cmd::run,
        "jobs" => jobs_cmd::run_jobs,
        "fg" => jobs_cmd::run_fg,
        "bg" => jobs_cmd::run_bg,
        "disown" => jobs_cmd::run_disown,
        "wait" => jobs_cmd::run_wait,
        "kill" => jobs_cmd::run_kill,
        "type" => type_cmd::run_type,
        "command" => type_cmd::run_command,
        "getopts" => getopts_cmd::run,
        _ => return None,
    })
}

pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

// ---- shared output helpers -------------------------------------------------

pub(crate) fn out(text: &str) -> Flow {
    let _ = sys::write_fd(sys::STDOUT_FD, text.as_bytes());
    Flow::Normal(0)
}

pub(crate) fn fail(shell: &Shell, message: &str, status: i32) -> Flow {
    shell.report_error(message);
    Flow::Normal(status)
}

// ---- trivial builtins ------------------------------------------------------

fn builtin_true(_shell: &mut Shell, _args: &[String]) -> Flow {
    Flow::Normal(0)
}

fn builtin_false(_shell: &mut Shell, _args: &[String]) -> Flow {
    Flow::Normal(1)
}

fn builtin_pwd(shell: &mut Shell, _args: &[String]) -> Flow {
    let pwd = shell
        .get_var("PWD")
        .or_else(|| {
            std::env::current_dir()
                .ok()
                .map(|p| p.to_string_lossy().to_string())
        })
        .unwrap_or_default();
    out(&format!("{pwd}\n"))
}

fn builtin_umask(shell: &mut Shell, args: &[String]) -> Flow {
    use nix::sys::stat::{umask, Mode};
    match args.first() {
        None => {
            // Read without changing: set and set back.
            let current = umask(Mode::empty());
            umask(current);
            out(&format!("{:04o}\n", current.bits()))
        }
        Some(text) => match u32::from_str_radix(text, 8) {
            Ok(bits) => {
                umask(Mode::from_bits_truncate(bits));
                Flow::Normal(0)
            }
            Err(_) => fail(shell, &format!("umask: {text}: invalid octal number"), 1),
        },
    }
}
