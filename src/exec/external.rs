//! External command resolution and launch.

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::ast::RedirectionNode;
use crate::shell::Shell;
use crate::sys;

use super::Flow;

pub enum Resolution {
    Path(String),
    NotFound,
    NotExecutable(String),
}

/// Resolve argv[0] through PATH (or directly when it contains a
/// slash).
pub fn resolve(shell: &Shell, name: &str) -> Resolution {
    if name.contains('/') {
        return classify(name);
    }
    let path = shell.get_var("PATH").unwrap_or_default();
    let mut not_executable = None;
    for dir in path.split(':') {
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = format!("{dir}/{name}");
        match classify(&candidate) {
            Resolution::Path(p) => return Resolution::Path(p),
            Resolution::NotExecutable(p) => {
                not_executable.get_or_insert(p);
            }
            Resolution::NotFound => {}
        }
    }
    match not_executable {
        Some(p) => Resolution::NotExecutable(p),
        None => Resolution::NotFound,
    }
}

fn classify(path: &str) -> Resolution {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            if nix::unistd::access(path, nix::unistd::AccessFlags::X_OK).is_ok() {
                Resolution::Path(path.to_string())
            } else {
                Resolution::NotExecutable(path.to_string())
            }
        }
        Ok(_) => Resolution::NotExecutable(path.to_string()),
        Err(_) => Resolution::NotFound,
    }
}

/// Fork and exec a resolved external command in the foreground.
/// `extra_env` carries the command-prefix assignments.
pub fn run_external(
    shell: &mut Shell,
    argv: &[String],
    extra_env: &[(String, String)],
    redirections: &[RedirectionNode],
) -> Flow {
    let path = match resolve(shell, &argv[0]) {
        Resolution::Path(path) => path,
        Resolution::NotFound => {
            shell.report_error(&format!("{}: command not found", argv[0]));
            return Flow::Normal(127);
        }
        Resolution::NotExecutable(path) => {
            shell.report_error(&format!("{path}: permission denied"));
            return Flow::Normal(126);
        }
    };

    if shell.trace.exec {
        crate::trace::emit("exec", &format!("fork+exec {path} {argv:?}"));
    }

    let mut env = shell.vars.environment();
    for (name, value) in extra_env {
        env.retain(|(n, _)| n != name);
        env.push((name.clone(), value.clone()));
    }

    let job_control = shell.interactive && shell.options.monitor;
    let argv_owned = argv.to_vec();
    let redirs = redirections.to_vec();
    let child = {
        let shell_ref = &mut *shell;
        sys::fork_child(move || {
            sys::reset_child_signals();
            if job_control {
                let pid = sys::own_pid();
                sys::set_process_group(pid, pid);
                sys::give_terminal_to(pid);
            }
            if let Err(status) = super::redirect::apply_in_child(shell_ref, &redirs) {
                return status;
            }
            let errno = sys::exec_program(&path, &argv_owned, &env);
            let message = format!("marsh: {}: {}\n", argv_owned[0], errno.desc());
            let _ = sys::write_fd(sys::STDERR_FD, message.as_bytes());
            if errno == nix::errno::Errno::ENOENT {
                127
            } else {
                126
            }
        })
    };

    let child = match child {
        Ok(pid) => pid,
        Err(e) => {
            shell.report_error(&format!("fork failed: {e}"));
            return Flow::Normal(1);
        }
    };

    if job_control {
        sys::set_process_group(child, child);
        sys::give_terminal_to(child);
    }
    let status = wait_foreground(shell, child, &argv.join(" "));
    if job_control {
        sys::give_terminal_to(shell.shell_pgid);
    }
    Flow::Normal(status)
}

/// Wait for a foreground child, handling stops (job control) and
/// signal-death reporting.
pub fn wait_foreground(shell: &mut Shell, pid: Pid, command: &str) -> i32 {
    loop {
        match sys::wait_pid(pid) {
            Ok(WaitStatus::Exited(_, code)) => return code,
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                if shell.interactive && sig != nix::sys::signal::Signal::SIGINT {
                    shell.report_error(&format!("{} terminated by SIG{}", pid, sig.as_str()));
                }
                return 128 + sig as i32;
            }
            Ok(WaitStatus::Stopped(_, _)) => {
                // Move the stopped command into the job table and
                // return control to the shell.
                let id = shell.jobs.add(pid, vec![pid], command.to_string());
                if let Some(job) = shell.jobs.get_mut(id) {
                    job.processes[0].state = crate::shell::jobs::ProcessState::Stopped;
                }
                if shell.interactive {
                    if let Some(job) = shell.jobs.get(id) {
                        let line = shell.jobs.format_job(job);
                        shell.report_error(&line);
                    }
                }
                return 148; // 128 + SIGTSTP
            }
            Ok(_) => continue,
            Err(_) => return 1,
        }
    }
}
