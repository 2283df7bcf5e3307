//! Job-control builtins: jobs, fg, bg, disown, wait, kill.

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::exec::{external, Flow};
use crate::shell::jobs::ProcessState;
use crate::shell::Shell;
use crate::sys;

use super::{fail, out};

pub fn run_jobs(shell: &mut Shell, args: &[String]) -> Flow {
    shell.jobs.reap();
    let pids_only = args.first().map(String::as_str) == Some("-p");
    let mut output = String::new();
    for job in shell.jobs.jobs() {
        if pids_only {
            output.push_str(&format!("{}\n", job.pgid));
        } else {
            output.push_str(&format!("{}\n", shell.jobs.format_job(job)));
        }
    }
    out(&output)
}

fn resolve_target(shell: &mut Shell, args: &[String]) -> Result<usize, Flow> {
    shell.jobs.reap();
    let id = match args.first() {
        Some(spec) => {
            let spec = if spec.starts_with('%') {
                spec.clone()
            } else {
                format!("%{spec}")
            };
            shell.jobs.resolve(&spec)
        }
        None => shell.jobs.current_id(),
    };
    match id {
        Some(id) => Ok(id),
        None => Err(fail(shell, "no current job", 1)),
    }
}

pub fn run_fg(shell: &mut Shell, args: &[String]) -> Flow {
    let id = match resolve_target(shell, args) {
        Ok(id) => id,
        Err(flow) => return flow,
    };
    let (pgid, pids, command) = match shell.jobs.get(id) {
        Some(job) => (
            job.pgid,
            job.processes.iter().map(|p| p.pid).collect::<Vec<_>>(),
            job.command.clone(),
        ),
        None => return fail(shell, "no such job", 1),
    };
    let _ = out(&format!("{command}\n"));
    shell.jobs.remove(id);

    if shell.interactive {
        sys::give_terminal_to(pgid);
    }
    let _ = sys::kill_group(pgid, Signal::SIGCONT);
    let mut status = 0;
    for pid in pids {
        status = external::wait_foreground(shell, pid, &command);
    }
    if shell.interactive {
        sys::give_terminal_to(shell.shell_pgid);
    }
    Flow::Normal(status)
}

pub fn run_bg(shell: &mut Shell, args: &[String]) -> Flow {
    let id = match resolve_target(shell, args) {
        Ok(id) => id,
        Err(flow) => return flow,
    };
    let Some(job) = shell.jobs.get_mut(id) else {
        return fail(shell, "no such job", 1);
    };
    let pgid = job.pgid;
    for process in &mut job.processes {
        if process.state == ProcessState::Stopped {
            process.state = ProcessState::Running;
        }
    }
    let line = format!("[{id}]+ {} &\n", job.command);
    let _ = sys::kill_group(pgid, Signal::SIGCONT);
    out(&line)
}

pub fn run_disown(shell: &mut Shell, args: &[String]) -> Flow {
    if args.is_empty() {
        match shell.jobs.current_id() {
            Some(id) => {
                shell.jobs.remove(id);
                return Flow::Normal(0);
            }
            None => return fail(shell, "disown: no current job", 1),
        }
    }
    let mut status = 0;
    for spec in args {
        if spec == "-a" {
            let ids: Vec<usize> = shell.jobs.jobs().iter().map(|j| j.id).collect();
            for id in ids {
                shell.jobs.remove(id);
            }
            continue;
        }
        let spec = if spec.starts_with('%') { spec.clone() } else { format!("%{spec}") };
        match shell.jobs.resolve(&spec) {
            Some(id) => shell.jobs.remove(id),
            None => {
                shell.report_error(&format!("disown: {spec}: no such job"));
                status = 1;
            }
        }
    }
    Flow::Normal(status)
}

pub fn run_wait(shell: &mut Shell, args: &[String]) -> Flow {
    if args.is_empty() {
        // Wait for every job in the table.
        loop {
            shell.jobs.reap();
            shell.jobs.sweep();
            if shell.jobs.is_empty() {
                return Flow::Normal(0);
            }
            match sys::wait_any_blocking() {
                Ok(Some(status)) => {
                    shell.jobs.update(&status);
                }
                Ok(None) => {
                    // EINTR or no children left: dispatch traps and
                    // re-check.
                    crate::exec::interp::run_pending_traps(shell);
                    shell.jobs.reap();
                    shell.jobs.sweep();
                    if shell.jobs.is_empty() {
                        return Flow::Normal(0);
                    }
                }
                Err(_) => return Flow::Normal(0),
            }
        }
    }

    let mut status = 0;
    for spec in args {
        if spec.starts_with('%') {
            match shell.jobs.resolve(spec) {
                Some(id) => {
                    status = wait_for_job(shell, id);
                }
                None => status = 127,
            }
        } else {
            match spec.parse::<i32>() {
                Ok(raw) => {
                    let pid = Pid::from_raw(raw);
                    status = match shell.jobs.job_of_pid(pid) {
                        Some(id) => wait_for_job(shell, id),
                        None => match sys::wait_pid(pid) {
                            Ok(wait) => sys::status_of(&wait).unwrap_or(0),
                            Err(_) => 127,
                        },
                    };
                }
                Err(_) => status = 127,
            }
        }
    }
    Flow::Normal(status)
}

fn wait_for_job(shell: &mut Shell, id: usize) -> i32 {
    loop {
        shell.jobs.reap();
        let Some(job) = shell.jobs.get(id) else {
            return 127;
        };
        if job.is_done() {
            let status = job.status();
            shell.jobs.remove(id);
            return status;
        }
        if job.is_stopped() {
            return 148;
        }
        match sys::wait_any_blocking() {
            Ok(Some(status)) => {
                shell.jobs.update(&status);
            }
            Ok(None) => crate::exec::interp::run_pending_traps(shell),
            Err(_) => return 127,
        }
    }
}

pub fn run_kill(shell: &mut Shell, args: &[String]) -> Flow {
    if args.first().map(String::as_str) == Some("-l") {
        let mut output = String::new();
        for sig in Signal::iterator() {
            output.push_str(&format!("{}\n", &sig.as_str()[3..]));
        }
        return out(&output);
    }

    let mut signal = Signal::SIGTERM;
    let mut index = 0usize;
    if let Some(first) = args.first() {
        if first == "-s" {
            match args.get(1).and_then(|n| sys::signal_by_name(n)) {
                Some(sig) => {
                    signal = sig;
                    index = 2;
                }
                None => return fail(shell, "kill: invalid signal specification", 1),
            }
        } else if let Some(name) = first.strip_prefix('-') {
            if let Some(sig) = sys::signal_by_name(name) {
                signal = sig;
                index = 1;
            }
        }
    }

    if args[index..].is_empty() {
        return fail(shell, "kill: usage: kill [-s signal | -signal] pid | %job ...", 2);
    }

    let mut status = 0;
    for target in &args[index..] {
        if target.starts_with('%') {
            shell.jobs.reap();
            match shell.jobs.resolve(target) {
                Some(id) => {
                    let pgid = shell.jobs.get(id).map(|j| j.pgid);
                    if let Some(pgid) = pgid {
                        if sys::kill_group(pgid, signal).is_err() {
                            status = 1;
                        }
                    }
                }
                None => {
                    shell.report_error(&format!("kill: {target}: no such job"));
                    status = 1;
                }
            }
        } else {
            match target.parse::<i32>() {
                Ok(raw) => {
                    if sys::kill_pid(Pid::from_raw(raw), signal).is_err() {
                        shell.report_error(&format!("kill: ({raw}): no such process"));
                        status = 1;
                    }
                }
                Err(_) => {
                    shell.report_error(&format!("kill: {target}: arguments must be process or job IDs"));
                    status = 1;
                }
            }
        }
    }
    Flow::Normal(status)
}
