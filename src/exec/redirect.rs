//! Redirection application.
//!
//! Redirections apply left to right by duplicating file descriptors.
//! For commands running in the current shell (builtins, compounds,
//! `exec`) a saved-fd table restores the previous state afterwards;
//! children apply without saving and let `exec`/exit discard the
//! table.

use std::os::fd::RawFd;

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use crate::ast::*;
use crate::expand;
use crate::shell::Shell;
use crate::sys;

/// One saved fd: the target slot and a high-numbered copy of what
/// occupied it (`None` when the slot was closed).
pub struct SavedFds {
    saves: Vec<(RawFd, Option<RawFd>)>,
}

impl SavedFds {
    pub fn restore(self) {
        // Undo in reverse application order.
        for (target, saved) in self.saves.into_iter().rev() {
            match saved {
                Some(copy) => {
                    let _ = sys::dup_fd(copy, target);
                    sys::close_fd(copy);
                }
                None => sys::close_fd(target),
            }
        }
    }

    /// Keep the redirections permanently (`exec 3<file`).
    pub fn commit(self) {
        for (_, saved) in self.saves {
            if let Some(copy) = saved {
                sys::close_fd(copy);
            }
        }
    }
}

/// Apply in the current shell, saving previous state. `Err(status)`
/// means the command must not run.
pub fn apply_saving(shell: &mut Shell, redirections: &[RedirectionNode]) -> Result<SavedFds, i32> {
    let mut saved = SavedFds { saves: Vec::new() };
    for redirection in redirections {
        if let Err(status) = apply_one(shell, redirection, Some(&mut saved)) {
            saved.restore();
            return Err(status);
        }
    }
    Ok(saved)
}

/// Apply in a forked child; failures report and return the status to
/// exit with.
pub fn apply_in_child(shell: &mut Shell, redirections: &[RedirectionNode]) -> Result<(), i32> {
    for redirection in redirections {
        apply_one(shell, redirection, None)?;
    }
    Ok(())
}

fn default_fd(op: RedirectionOperator) -> RawFd {
    match op {
        RedirectionOperator::Less
        | RedirectionOperator::LessAnd
        | RedirectionOperator::LessGreat
        | RedirectionOperator::DLess
        | RedirectionOperator::DLessDash
        | RedirectionOperator::TLess => sys::STDIN_FD,
        _ => sys::STDOUT_FD,
    }
}

fn apply_one(
    shell: &mut Shell,
    redirection: &RedirectionNode,
    mut saved: Option<&mut SavedFds>,
) -> Result<(), i32> {
    let fd = redirection.fd.unwrap_or_else(|| default_fd(redirection.operator));

    let mut save_slot = |slot: RawFd, saved: &mut Option<&mut SavedFds>| {
        if let Some(saved) = saved {
            let copy = sys::dup_above(slot).ok();
            saved.saves.push((slot, copy));
        }
    };

    match &redirection.target {
        RedirectionTarget::HereDoc(doc) => {
            let body = match expand::expand_word_single(shell, &doc.content) {
                Ok(body) => body,
                Err(e) => {
                    shell.report_error(&e.to_string());
                    return Err(1);
                }
            };
            let read_end = feed_through_pipe(shell, body.into_bytes())?;
            save_slot(fd, &mut saved);
            if sys::dup_fd(read_end, fd).is_err() {
                sys::close_fd(read_end);
                return Err(1);
            }
            sys::close_fd(read_end);
            Ok(())
        }
        RedirectionTarget::Word(word) => {
            let target = match expand::expand_word_single(shell, word) {
                Ok(target) => target,
                Err(e) => {
                    shell.report_error(&e.to_string());
                    return Err(1);
                }
            };
            match redirection.operator {
                RedirectionOperator::TLess => {
                    let read_end = feed_through_pipe(shell, format!("{target}\n").into_bytes())?;
                    save_slot(fd, &mut saved);
                    if sys::dup_fd(read_end, fd).is_err() {
                        sys::close_fd(read_end);
                        return Err(1);
                    }
                    sys::close_fd(read_end);
                    Ok(())
                }
                RedirectionOperator::LessAnd | RedirectionOperator::GreatAnd => {
                    apply_dup(shell, fd, &target, redirection, save_slot, &mut saved)
                }
                RedirectionOperator::AndGreat | RedirectionOperator::AndDGreat => {
                    let append = redirection.operator == RedirectionOperator::AndDGreat;
                    let file = open_target(shell, &target, output_flags(shell, append, false))?;
                    save_slot(sys::STDOUT_FD, &mut saved);
                    save_slot(sys::STDERR_FD, &mut saved);
                    let r1 = sys::dup_fd(file, sys::STDOUT_FD);
                    let r2 = sys::dup_fd(file, sys::STDERR_FD);
                    sys::close_fd(file);
                    if r1.is_err() || r2.is_err() {
                        return Err(1);
                    }
                    Ok(())
                }
                _ => {
                    let flags = flags_for(shell, redirection.operator)?;
                    let file = open_target(shell, &target, flags)?;
                    save_slot(fd, &mut saved);
                    let result = sys::dup_fd(file, fd);
                    sys::close_fd(file);
                    if result.is_err() {
                        return Err(1);
                    }
                    Ok(())
                }
            }
        }
    }
}

/// `n>&m`, `n<&m`, `n>&-`, `n>&m-`.
fn apply_dup(
    shell: &mut Shell,
    fd: RawFd,
    target: &str,
    redirection: &RedirectionNode,
    mut save_slot: impl FnMut(RawFd, &mut Option<&mut SavedFds>),
    saved: &mut Option<&mut SavedFds>,
) -> Result<(), i32> {
    if target == "-" {
        save_slot(fd, saved);
        sys::close_fd(fd);
        return Ok(());
    }
    let (digits, move_source) = match target.strip_suffix('-') {
        Some(prefix) => (prefix, true),
        None => (target, false),
    };
    if digits.chars().all(|c| c.is_ascii_digit()) && !digits.is_empty() {
        let source: RawFd = digits.parse().map_err(|_| 1)?;
        save_slot(fd, saved);
        if sys::dup_fd(source, fd).is_err() {
            shell.report_error(&format!("{source}: bad file descriptor"));
            return Err(1);
        }
        if move_source {
            sys::close_fd(source);
        }
        return Ok(());
    }
    // `>&file` with a non-numeric target: stdout and stderr to the
    // file, like `&>`.
    if redirection.operator == RedirectionOperator::GreatAnd && redirection.fd.is_none() {
        let file = open_target(shell, target, output_flags(shell, false, false))?;
        save_slot(sys::STDOUT_FD, saved);
        save_slot(sys::STDERR_FD, saved);
        let r1 = sys::dup_fd(file, sys::STDOUT_FD);
        let r2 = sys::dup_fd(file, sys::STDERR_FD);
        sys::close_fd(file);
        if r1.is_err() || r2.is_err() {
            return Err(1);
        }
        return Ok(());
    }
    shell.report_error(&format!("{target}: ambiguous redirect"));
    Err(1)
}

fn output_flags(shell: &Shell, append: bool, clobber: bool) -> OFlag {
    let mut flags = OFlag::O_WRONLY | OFlag::O_CREAT;
    if append {
        flags |= OFlag::O_APPEND;
    } else if shell.options.noclobber && !clobber {
        flags |= OFlag::O_EXCL;
    } else {
        flags |= OFlag::O_TRUNC;
    }
    flags
}

fn flags_for(shell: &Shell, op: RedirectionOperator) -> Result<OFlag, i32> {
    Ok(match op {
        RedirectionOperator::Less => OFlag::O_RDONLY,
        RedirectionOperator::Great => output_flags(shell, false, false),
        RedirectionOperator::Clobber => output_flags(shell, false, true),
        RedirectionOperator::DGreat => output_flags(shell, true, false),
        RedirectionOperator::LessGreat => OFlag::O_RDWR | OFlag::O_CREAT,
        // Heredoc and dup forms never reach the open path.
        _ => return Err(1),
    })
}

fn open_target(shell: &Shell, target: &str, flags: OFlag) -> Result<RawFd, i32> {
    let mode = Mode::from_bits_truncate(0o666);
    match nix::fcntl::open(target, flags, mode) {
        Ok(fd) => Ok(fd),
        Err(errno) => {
            let noclobber_refusal =
                errno == nix::errno::Errno::EEXIST && flags.contains(OFlag::O_EXCL);
            shell.report_error(&format!("{target}: {}", errno.desc()));
            // noclobber refusals report status 2, plain open failures 1.
            Err(if noclobber_refusal { 2 } else { 1 })
        }
    }
}

/// Deliver bytes on the read end of a pipe, filling it from a forked
/// writer so large here-documents cannot deadlock the shell.
fn feed_through_pipe(shell: &Shell, body: Vec<u8>) -> Result<RawFd, i32> {
    let (read_end, write_end) = match sys::pipe_fds() {
        Ok(pair) => pair,
        Err(e) => {
            shell.report_error(&format!("cannot create pipe: {e}"));
            return Err(1);
        }
    };
    match sys::fork_child(|| {
        sys::close_fd(read_end);
        let _ = sys::write_fd(write_end, &body);
        0
    }) {
        Ok(_) => {
            sys::close_fd(write_end);
            Ok(read_end)
        }
        Err(e) => {
            sys::close_fd(read_end);
            sys::close_fd(write_end);
            shell.report_error(&format!("fork failed: {e}"));
            Err(1)
        }
    }
}
