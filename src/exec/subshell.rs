//! Subshell execution: `( ... )`, command substitution, process
//! substitution, and background lists.
//!
//! Every subshell is a real fork; the kernel's copy-on-write gives
//! the child its private copy of the entire shell state.

use nix::unistd::Pid;

use crate::ast::*;
use crate::expand::ExpandError;
use crate::shell::Shell;
use crate::sys;

use super::{interp, Flow};

/// Run a closure in a forked child shell and wait for it. The child
/// resets traps and job state before running.
pub fn fork_and_wait(
    shell: &mut Shell,
    f: impl FnOnce(&mut Shell) -> Flow,
) -> Result<i32, nix::errno::Errno> {
    let child = {
        let shell_ref = &mut *shell;
        sys::fork_child(move || {
            sys::reset_child_signals();
            shell_ref.enter_subshell();
            let flow = f(shell_ref);
            interp::finalize_subshell(shell_ref, flow.status())
        })?
    };
    Ok(super::external::wait_foreground(shell, child, "(subshell)"))
}

/// `( list )` in the foreground.
pub fn run_subshell(shell: &mut Shell, node: &SubshellNode) -> Flow {
    let redirections = node.redirections.clone();
    let body = node.body.clone();
    match fork_and_wait(shell, move |child| {
        if let Err(status) = super::redirect::apply_in_child(child, &redirections) {
            return Flow::Normal(status);
        }
        interp::run_script(child, &body)
    }) {
        Ok(status) => Flow::Normal(status),
        Err(e) => {
            shell.report_error(&format!("fork failed: {e}"));
            Flow::Normal(1)
        }
    }
}

/// Background list: fork, register the job, set `$!`, status 0.
pub fn run_background(shell: &mut Shell, item: &AndOrNode, command_text: String) -> Flow {
    let job_control = shell.interactive && shell.options.monitor;
    let body = item.clone();
    let child = {
        let shell_ref = &mut *shell;
        sys::fork_child(move || {
            sys::reset_child_signals();
            if job_control {
                let pid = sys::own_pid();
                sys::set_process_group(pid, pid);
            } else {
                // Background commands without job control read EOF
                // rather than stealing the shell's stdin.
                if let Ok(devnull) =
                    nix::fcntl::open("/dev/null", nix::fcntl::OFlag::O_RDONLY, nix::sys::stat::Mode::empty())
                {
                    let _ = sys::dup_fd(devnull, sys::STDIN_FD);
                    sys::close_fd(devnull);
                }
            }
            shell_ref.enter_subshell();
            let flow = interp::run_and_or(shell_ref, &body);
            interp::finalize_subshell(shell_ref, flow.status())
        })
    };
    match child {
        Ok(pid) => {
            if job_control {
                sys::set_process_group(pid, pid);
            }
            shell.last_async_pid = Some(pid);
            let id = shell.jobs.add(pid, vec![pid], command_text);
            if shell.interactive {
                let line = format!("[{id}] {pid}");
                let _ = sys::write_fd(sys::STDERR_FD, format!("{line}\n").as_bytes());
            }
            Flow::Normal(0)
        }
        Err(e) => {
            shell.report_error(&format!("fork failed: {e}"));
            Flow::Normal(1)
        }
    }
}

/// `$(...)`: run in a subshell, capture stdout, strip handled by the
/// caller. Records the child's status for `$?` of assignment-only
/// commands.
pub fn command_substitution(
    shell: &mut Shell,
    script: &ScriptNode,
) -> Result<String, ExpandError> {
    let (read_end, write_end) = sys::pipe_fds()
        .map_err(|e| ExpandError::BadSubstitution(format!("cannot create pipe: {e}")))?;

    let body = script.clone();
    let child = {
        let shell_ref = &mut *shell;
        sys::fork_child(move || {
            sys::close_fd(read_end);
            sys::reset_child_signals();
            shell_ref.enter_subshell();
            if sys::dup_fd(write_end, sys::STDOUT_FD).is_err() {
                return 1;
            }
            sys::close_fd(write_end);
            let flow = interp::run_script(shell_ref, &body);
            interp::finalize_subshell(shell_ref, flow.status())
        })
    };
    let child = match child {
        Ok(pid) => pid,
        Err(e) => {
            sys::close_fd(read_end);
            sys::close_fd(write_end);
            return Err(ExpandError::BadSubstitution(format!("fork failed: {e}")));
        }
    };
    sys::close_fd(write_end);
    let output = sys::read_all(read_end).unwrap_or_default();
    sys::close_fd(read_end);

    let status = match sys::wait_pid(child) {
        Ok(wait) => sys::status_of(&wait).unwrap_or(0),
        Err(_) => 1,
    };
    shell.last_subst_status = Some(status);
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// `<(cmd)` / `>(cmd)`: start the command against a pipe and
/// substitute the `/dev/fd/N` path of our end. The fd stays open
/// until the surrounding command finishes.
pub fn process_substitution(
    shell: &mut Shell,
    part: &ProcessSubstitutionPart,
) -> Result<String, ExpandError> {
    let (read_end, write_end) = sys::pipe_fds()
        .map_err(|e| ExpandError::BadSubstitution(format!("cannot create pipe: {e}")))?;

    let body = part.body.clone();
    let input = part.direction == ProcessDirection::Input;
    let child = {
        let shell_ref = &mut *shell;
        sys::fork_child(move || {
            sys::reset_child_signals();
            shell_ref.enter_subshell();
            if input {
                // Child writes; our read end becomes the path.
                sys::close_fd(read_end);
                if sys::dup_fd(write_end, sys::STDOUT_FD).is_err() {
                    return 1;
                }
                sys::close_fd(write_end);
            } else {
                sys::close_fd(write_end);
                if sys::dup_fd(read_end, sys::STDIN_FD).is_err() {
                    return 1;
                }
                sys::close_fd(read_end);
            }
            let flow = interp::run_script(shell_ref, &body);
            interp::finalize_subshell(shell_ref, flow.status())
        })
    };
    if let Err(e) = child {
        sys::close_fd(read_end);
        sys::close_fd(write_end);
        return Err(ExpandError::BadSubstitution(format!("fork failed: {e}")));
    }

    let kept = if input {
        sys::close_fd(write_end);
        read_end
    } else {
        sys::close_fd(read_end);
        write_end
    };
    shell.procsub_fds.push(kept);
    Ok(format!("/dev/fd/{kept}"))
}

/// Close the pipe ends backing process substitutions of the command
/// that just finished.
pub fn close_procsub_fds(shell: &mut Shell) {
    for fd in shell.procsub_fds.drain(..) {
        sys::close_fd(fd);
    }
}

/// Helper used by `wait` and prompt boundaries.
pub fn reap_children(shell: &mut Shell) {
    shell.jobs.reap();
}

/// pid of the most recent background job, for tests.
pub fn last_background_pid(shell: &Shell) -> Option<Pid> {
    shell.last_async_pid
}
