//! The Shell object: all interpreter state, threaded through the
//! lexer, parser, expansion engine, executor, and builtins.

pub mod funcs;
pub mod jobs;
pub mod options;
pub mod traps;
pub mod vars;

use std::time::Instant;

use nix::unistd::Pid;

use crate::sys;
use crate::trace::TraceFlags;

pub use funcs::{AliasTable, FunctionTable, ShellFunction};
pub use jobs::{Job, JobTable, ProcessState};
pub use options::{MatchOptions, ShellOptions};
pub use traps::{TrapCondition, TrapState};
pub use vars::{ArrayKey, Attributes, Scope, Value, VarError, VarStore, Variable};

/// Default function-nesting ceiling when FUNCNEST is unset or
/// invalid.
pub const DEFAULT_FUNCNEST: usize = 1000;

pub struct Shell {
    pub vars: VarStore,
    pub options: ShellOptions,
    pub match_opts: MatchOptions,
    pub funcs: FunctionTable,
    pub aliases: AliasTable,
    pub traps: TrapState,
    pub jobs: JobTable,
    pub trace: TraceFlags,

    pub interactive: bool,
    pub script_name: String,
    pub last_status: i32,
    /// pid of the most recent background pipeline (`$!`).
    pub last_async_pid: Option<Pid>,
    /// Line currently executing, for LINENO and diagnostics.
    pub current_line: usize,

    /// Function call depth (FUNCNEST ceiling applies).
    pub func_depth: usize,
    /// Depth of `.`-script nesting.
    pub dot_depth: usize,
    /// Loop nesting, consulted by `break`/`continue`.
    pub loop_depth: usize,
    /// Non-zero inside `if`/`while` conditions, `!`, and the left
    /// side of `&&`/`||`: errexit and the ERR trap are suppressed.
    pub condition_depth: usize,
    /// This process is a forked subshell.
    pub in_subshell: bool,
    /// EXIT processing in progress; suppresses recursive EXIT traps.
    pub exiting: bool,

    pub shell_pgid: Pid,
    /// `$$`: the main shell's pid; a forked subshell inherits the
    /// copy, so it keeps reporting the parent.
    pub shell_pid: Pid,
    /// FUNCNAME call stack, innermost last.
    pub funcname_stack: Vec<String>,
    /// BASH_SOURCE stack, innermost last.
    pub source_stack: Vec<String>,

    /// Status of the most recent command substitution, consumed by
    /// assignment-only commands for `$?`.
    pub last_subst_status: Option<i32>,
    /// Pipe fds backing `/dev/fd/N` process substitutions of the
    /// command being built; closed when the command finishes.
    pub procsub_fds: Vec<std::os::fd::RawFd>,

    started: Instant,
    /// Offset applied to SECONDS (assignments to SECONDS rebase it).
    pub seconds_offset: i64,
}

impl Shell {
    pub fn new(script_name: impl Into<String>, interactive: bool) -> Self {
        let script_name = script_name.into();
        let mut shell = Self {
            vars: VarStore::new(script_name.clone()),
            options: ShellOptions {
                monitor: interactive,
                ..ShellOptions::default()
            },
            match_opts: MatchOptions::default(),
            funcs: FunctionTable::default(),
            aliases: AliasTable::default(),
            traps: TrapState::default(),
            jobs: JobTable::default(),
            trace: TraceFlags::default(),
            interactive,
            script_name: script_name.clone(),
            last_status: 0,
            last_async_pid: None,
            current_line: 0,
            func_depth: 0,
            dot_depth: 0,
            loop_depth: 0,
            condition_depth: 0,
            in_subshell: false,
            exiting: false,
            shell_pgid: sys::own_pid(),
            shell_pid: sys::own_pid(),
            funcname_stack: Vec::new(),
            source_stack: vec![script_name],
            last_subst_status: None,
            procsub_fds: Vec::new(),
            started: Instant::now(),
            seconds_offset: 0,
        };
        shell.import_environment();
        shell.set_defaults();
        shell
    }

    fn import_environment(&mut self) {
        for (name, value) in std::env::vars() {
            if crate::parser::lexer::is_valid_name(&name) {
                let _ = self.vars.set_scalar(&name, value, Scope::Global);
                let _ = self
                    .vars
                    .modify_attrs(&name, |a| {
                        a.exported = true;
                        Ok(())
                    }, Scope::Global);
            }
        }
    }

    fn set_defaults(&mut self) {
        let defaults: &[(&str, String)] = &[
            ("IFS", " \t\n".to_string()),
            ("PS1", "$ ".to_string()),
            ("PS2", "> ".to_string()),
            ("PS3", "#? ".to_string()),
            ("PS4", "+ ".to_string()),
            ("OPTIND", "1".to_string()),
            ("OPTERR", "1".to_string()),
            ("PATH", "/usr/local/bin:/usr/bin:/bin".to_string()),
        ];
        for (name, value) in defaults {
            if !self.vars.is_set(name) {
                let _ = self.vars.set_scalar(name, value.clone(), Scope::Global);
            }
        }
        if let Ok(cwd) = std::env::current_dir() {
            let _ = self
                .vars
                .set_scalar("PWD", cwd.to_string_lossy().to_string(), Scope::Global);
        }
    }

    // ---- variable access with dynamic names --------------------------------

    /// Scalar lookup including the dynamic variables the store cannot
    /// compute itself.
    pub fn get_var(&self, name: &str) -> Option<String> {
        match name {
            "RANDOM" => Some((rand::random::<u16>() % 32768).to_string()),
            "SECONDS" => {
                let elapsed = self.started.elapsed().as_secs() as i64 + self.seconds_offset;
                Some(elapsed.to_string())
            }
            "LINENO" => Some(self.current_line.to_string()),
            "FUNCNAME" => self.funcname_stack.last().cloned(),
            "BASH_SOURCE" => self.source_stack.last().cloned(),
            _ => self.vars.get_scalar(name),
        }
    }

    pub fn set_status(&mut self, status: i32) {
        self.last_status = status & 0xff;
    }

    /// `$0`: the function name inside a function (documented
    /// divergence from bash), else the script name.
    pub fn dollar_zero(&self) -> String {
        self.vars.positional().zero.clone()
    }

    /// FUNCNEST ceiling, configurable through the variable.
    pub fn funcnest_limit(&self) -> usize {
        self.vars
            .get_scalar("FUNCNEST")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_FUNCNEST)
    }

    // ---- diagnostics -------------------------------------------------------

    /// `marsh: message` on stderr.
    pub fn report_error(&self, message: &str) {
        let line = format!("marsh: {message}\n");
        let _ = sys::write_fd(sys::STDERR_FD, line.as_bytes());
    }

    pub fn report_error_at(&self, line_no: usize, message: &str) {
        let line = format!("marsh: {}: line {}: {}\n", self.script_name, line_no, message);
        let _ = sys::write_fd(sys::STDERR_FD, line.as_bytes());
    }

    // ---- errexit / condition context ---------------------------------------

    pub fn in_condition_context(&self) -> bool {
        self.condition_depth > 0
    }

    // ---- subshell entry ----------------------------------------------------

    /// Adjust state after this process forked as a subshell:
    /// non-ignored traps reset, job control detaches, `$$` keeps the
    /// parent's value (we do not reset it), `$!` clears.
    pub fn enter_subshell(&mut self) {
        self.in_subshell = true;
        self.interactive = false;
        self.options.monitor = false;
        self.traps.reset_for_subshell();
        self.jobs = JobTable::default();
    }
}
