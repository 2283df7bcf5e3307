//! Thin synchronous wrappers over the host process facilities.
//!
//! Everything the executor needs from the kernel goes through here:
//! fork/exec, pipes, fd duplication, waiting, process groups,
//! terminal ownership, and signal dispositions. Keeping the `nix`
//! calls in one place keeps the executor readable and the unsafe
//! blocks auditable.

use std::ffi::CString;
use std::os::fd::{BorrowedFd, IntoRawFd, RawFd};

use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

pub const STDIN_FD: RawFd = 0;
pub const STDOUT_FD: RawFd = 1;
pub const STDERR_FD: RawFd = 2;

/// Fork; the child runs `run` and exits with its return value. The
/// closure must not return control to the surrounding interpreter.
pub fn fork_child<F: FnOnce() -> i32>(run: F) -> nix::Result<Pid> {
    // Single-threaded process; fork is safe to combine with
    // allocation in the child.
    match unsafe { unistd::fork() }? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => {
            let status = run();
            std::process::exit(status & 0xff);
        }
    }
}

pub fn pipe_fds() -> nix::Result<(RawFd, RawFd)> {
    let (read, write) = unistd::pipe()?;
    Ok((read.into_raw_fd(), write.into_raw_fd()))
}

pub fn dup_fd(from: RawFd, to: RawFd) -> nix::Result<()> {
    unistd::dup2(from, to)?;
    Ok(())
}

/// Duplicate above the user-visible range, for saving fds across
/// redirections.
pub fn dup_above(fd: RawFd) -> nix::Result<RawFd> {
    nix::fcntl::fcntl(fd, nix::fcntl::FcntlArg::F_DUPFD_CLOEXEC(10))
}

pub fn close_fd(fd: RawFd) {
    let _ = unistd::close(fd);
}

/// `dup2` then close the source when it differs from the target.
pub fn move_fd(from: RawFd, to: RawFd) -> nix::Result<()> {
    if from != to {
        unistd::dup2(from, to)?;
        let _ = unistd::close(from);
    }
    Ok(())
}

pub fn write_fd(fd: RawFd, mut bytes: &[u8]) -> nix::Result<()> {
    while !bytes.is_empty() {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        match unistd::write(borrowed, bytes) {
            Ok(0) => break,
            Ok(n) => bytes = &bytes[n..],
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Read to EOF, retrying on EINTR.
pub fn read_all(fd: RawFd) -> nix::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match unistd::read(fd, &mut buf) {
            Ok(0) => return Ok(out),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Read a single byte; `None` at EOF.
pub fn read_byte(fd: RawFd) -> nix::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match unistd::read(fd, &mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(Errno::EINTR) => return Err(Errno::EINTR),
            Err(e) => return Err(e),
        }
    }
}

pub fn is_tty(fd: RawFd) -> bool {
    unistd::isatty(fd).unwrap_or(false)
}

// ---- exec ------------------------------------------------------------------

/// Replace the process image. Only returns on failure.
pub fn exec_program(path: &str, argv: &[String], env: &[(String, String)]) -> Errno {
    let c_path = match CString::new(path) {
        Ok(p) => p,
        Err(_) => return Errno::ENOENT,
    };
    let mut c_args = Vec::with_capacity(argv.len());
    for arg in argv {
        match CString::new(arg.as_str()) {
            Ok(a) => c_args.push(a),
            Err(_) => return Errno::EINVAL,
        }
    }
    let mut c_env = Vec::with_capacity(env.len());
    for (name, value) in env {
        match CString::new(format!("{name}={value}")) {
            Ok(e) => c_env.push(e),
            Err(_) => return Errno::EINVAL,
        }
    }
    match unistd::execve(&c_path, &c_args, &c_env) {
        Ok(infallible) => match infallible {},
        Err(e) => e,
    }
}

// ---- waiting ---------------------------------------------------------------

/// Blocking wait for one child, reporting stops.
pub fn wait_pid(pid: Pid) -> nix::Result<WaitStatus> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Err(Errno::EINTR) => continue,
            other => return other,
        }
    }
}

/// Non-blocking reap of any child; `Ok(None)` when nothing changed.
pub fn wait_any_nonblocking() -> nix::Result<Option<WaitStatus>> {
    match waitpid(
        Pid::from_raw(-1),
        Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED),
    ) {
        Ok(WaitStatus::StillAlive) => Ok(None),
        Ok(status) => Ok(Some(status)),
        Err(Errno::ECHILD) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Blocking wait for any child, reporting stops.
pub fn wait_any_blocking() -> nix::Result<Option<WaitStatus>> {
    match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WUNTRACED)) {
        Ok(status) => Ok(Some(status)),
        Err(Errno::ECHILD) => Ok(None),
        Err(Errno::EINTR) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Exit status a wait result contributes: `128 + N` for signal
/// deaths, the code for normal exits, `None` while stopped or
/// continued.
pub fn status_of(wait: &WaitStatus) -> Option<i32> {
    match wait {
        WaitStatus::Exited(_, code) => Some(*code),
        WaitStatus::Signaled(_, sig, _) => Some(128 + *sig as i32),
        _ => None,
    }
}

// ---- process groups & terminal ---------------------------------------------

pub fn set_process_group(pid: Pid, pgid: Pid) {
    // Racing the child's own setpgid is expected; EACCES after the
    // child already exec'd is also fine.
    let _ = unistd::setpgid(pid, pgid);
}

pub fn own_pid() -> Pid {
    unistd::getpid()
}

pub fn give_terminal_to(pgid: Pid) {
    let tty = unsafe { BorrowedFd::borrow_raw(STDIN_FD) };
    let _ = unistd::tcsetpgrp(tty, pgid);
}

pub fn kill_pid(pid: Pid, sig: Signal) -> nix::Result<()> {
    signal::kill(pid, sig)
}

pub fn kill_group(pgid: Pid, sig: Signal) -> nix::Result<()> {
    signal::killpg(pgid, sig)
}

// ---- signal dispositions ---------------------------------------------------

/// Default dispositions in a freshly forked child so it dies on
/// SIGINT and stops on SIGTSTP like any ordinary command.
pub fn reset_child_signals() {
    for sig in [
        Signal::SIGINT,
        Signal::SIGQUIT,
        Signal::SIGTSTP,
        Signal::SIGTTIN,
        Signal::SIGTTOU,
        Signal::SIGTERM,
        Signal::SIGHUP,
        Signal::SIGCHLD,
        Signal::SIGPIPE,
    ] {
        unsafe {
            let _ = signal::signal(sig, SigHandler::SigDfl);
        }
    }
}

/// The interactive shell must survive job-control stops and keep the
/// terminal.
pub fn ignore_job_control_signals() {
    for sig in [Signal::SIGTSTP, Signal::SIGTTIN, Signal::SIGTTOU, Signal::SIGQUIT] {
        unsafe {
            let _ = signal::signal(sig, SigHandler::SigIgn);
        }
    }
}

pub fn set_ignore(sig: Signal) {
    unsafe {
        let _ = signal::signal(sig, SigHandler::SigIgn);
    }
}

pub fn set_default(sig: Signal) {
    unsafe {
        let _ = signal::signal(sig, SigHandler::SigDfl);
    }
}

/// Put the shell in its own process group and grab the terminal
/// (interactive startup).
pub fn claim_terminal() {
    let pid = unistd::getpid();
    let _ = unistd::setpgid(pid, pid);
    give_terminal_to(pid);
}

/// Elapsed user/system CPU consumed by waited-for children, as
/// (user, system) seconds; used by the `time` prefix.
pub fn children_cpu_times() -> (f64, f64) {
    use nix::sys::resource::{getrusage, UsageWho};
    match getrusage(UsageWho::RUSAGE_CHILDREN) {
        Ok(usage) => {
            let user = usage.user_time();
            let system = usage.system_time();
            (
                user.tv_sec() as f64 + user.tv_usec() as f64 / 1e6,
                system.tv_sec() as f64 + system.tv_usec() as f64 / 1e6,
            )
        }
        Err(_) => (0.0, 0.0),
    }
}

/// Map a signal name or number ("2", "INT", "SIGINT") to a Signal.
pub fn signal_by_name(name: &str) -> Option<Signal> {
    if let Ok(n) = name.parse::<i32>() {
        return Signal::try_from(n).ok();
    }
    let upper = name.to_uppercase();
    let full = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    full.parse::<Signal>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_lookup() {
        assert_eq!(signal_by_name("INT"), Some(Signal::SIGINT));
        assert_eq!(signal_by_name("SIGTERM"), Some(Signal::SIGTERM));
        assert_eq!(signal_by_name("9"), Some(Signal::SIGKILL));
        assert_eq!(signal_by_name("NOPE"), None);
    }

    #[test]
    fn status_conversion() {
        assert_eq!(
            status_of(&WaitStatus::Exited(Pid::from_raw(1), 3)),
            Some(3)
        );
        assert_eq!(
            status_of(&WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGINT, false)),
            Some(130)
        );
        assert_eq!(
            status_of(&WaitStatus::Stopped(Pid::from_raw(1), Signal::SIGTSTP)),
            None
        );
    }

    #[test]
    fn pipe_roundtrip() {
        let (read, write) = pipe_fds().unwrap();
        write_fd(write, b"ping").unwrap();
        close_fd(write);
        let data = read_all(read).unwrap();
        close_fd(read);
        assert_eq!(data, b"ping");
    }
}
