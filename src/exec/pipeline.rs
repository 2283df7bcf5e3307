//! Pipeline execution: N−1 pipes, one forked child per stage.
//!
//! Stages start left to right; each runs fully in its child (compound
//! commands included). Under job control the stages share a process
//! group led by the first child, which owns the terminal while the
//! pipeline runs in the foreground.

use std::os::fd::RawFd;

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::ast::*;
use crate::shell::Shell;
use crate::sys;

use super::{interp, Flow};

pub fn run_pipeline(shell: &mut Shell, node: &PipelineNode) -> Flow {
    let n = node.commands.len();
    let mut pipes: Vec<(RawFd, RawFd)> = Vec::with_capacity(n - 1);
    for _ in 0..n - 1 {
        match sys::pipe_fds() {
            Ok(pair) => pipes.push(pair),
            Err(e) => {
                for (r, w) in pipes {
                    sys::close_fd(r);
                    sys::close_fd(w);
                }
                shell.report_error(&format!("cannot create pipe: {e}"));
                return Flow::Normal(1);
            }
        }
    }

    let job_control = shell.interactive && shell.options.monitor;
    let all_fds: Vec<RawFd> = pipes.iter().flat_map(|(r, w)| [*r, *w]).collect();
    let mut pids: Vec<Pid> = Vec::with_capacity(n);
    let mut pgid: Option<Pid> = None;

    for (i, command) in node.commands.iter().enumerate() {
        let stdin_fd = if i > 0 { Some(pipes[i - 1].0) } else { None };
        let stdout_fd = if i < n - 1 { Some(pipes[i].1) } else { None };
        let stderr_too = i < n - 1 && node.pipe_stderr.get(i).copied().unwrap_or(false);
        let close_list = all_fds.clone();
        let group = pgid;
        let stage = command.clone();

        let forked = {
            let shell_ref = &mut *shell;
            sys::fork_child(move || {
                sys::reset_child_signals();
                if job_control {
                    let pid = sys::own_pid();
                    sys::set_process_group(pid, group.unwrap_or(pid));
                }
                if let Some(fd) = stdin_fd {
                    if sys::dup_fd(fd, sys::STDIN_FD).is_err() {
                        return 1;
                    }
                }
                if let Some(fd) = stdout_fd {
                    if sys::dup_fd(fd, sys::STDOUT_FD).is_err() {
                        return 1;
                    }
                    if stderr_too && sys::dup_fd(fd, sys::STDERR_FD).is_err() {
                        return 1;
                    }
                }
                for fd in close_list {
                    sys::close_fd(fd);
                }
                shell_ref.enter_subshell();
                let flow = interp::run_command(shell_ref, &stage);
                interp::finalize_subshell(shell_ref, flow.status())
            })
        };
        match forked {
            Ok(pid) => {
                if job_control {
                    let group = pgid.unwrap_or(pid);
                    sys::set_process_group(pid, group);
                    pgid.get_or_insert(pid);
                }
                pids.push(pid);
            }
            Err(e) => {
                shell.report_error(&format!("fork failed: {e}"));
                break;
            }
        }
    }

    for (r, w) in &pipes {
        sys::close_fd(*r);
        sys::close_fd(*w);
    }

    if job_control {
        if let Some(group) = pgid {
            sys::give_terminal_to(group);
        }
    }

    let (statuses, stopped) = wait_all(&pids);

    if job_control {
        sys::give_terminal_to(shell.shell_pgid);
    }

    if stopped {
        let group = pgid.unwrap_or_else(|| pids.first().copied().unwrap_or(sys::own_pid()));
        let id = shell.jobs.add(group, pids.clone(), "(pipeline)".to_string());
        if let Some(job) = shell.jobs.get_mut(id) {
            for process in &mut job.processes {
                process.state = crate::shell::jobs::ProcessState::Stopped;
            }
        }
        if shell.interactive {
            if let Some(job) = shell.jobs.get(id) {
                let line = shell.jobs.format_job(job);
                shell.report_error(&line);
            }
        }
        return Flow::Normal(148);
    }

    let status = if shell.options.pipefail {
        statuses.iter().rev().find(|s| **s != 0).copied().unwrap_or(0)
    } else {
        statuses.last().copied().unwrap_or(1)
    };
    Flow::Normal(status)
}

/// Wait for every stage in order; completion order is not
/// guaranteed, exit collection order is.
fn wait_all(pids: &[Pid]) -> (Vec<i32>, bool) {
    let mut statuses = Vec::with_capacity(pids.len());
    let mut stopped = false;
    for pid in pids {
        loop {
            match sys::wait_pid(*pid) {
                Ok(WaitStatus::Exited(_, code)) => {
                    statuses.push(code);
                    break;
                }
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    statuses.push(128 + sig as i32);
                    break;
                }
                Ok(WaitStatus::Stopped(_, _)) => {
                    stopped = true;
                    statuses.push(148);
                    break;
                }
                Ok(_) => continue,
                Err(_) => {
                    statuses.push(1);
                    break;
                }
            }
        }
    }
    (statuses, stopped)
}
