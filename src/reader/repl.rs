//! Interactive read–eval loop.
//!
//! The line editor supplies lines; this loop owns continuation (PS2
//! whenever the parser reports an incomplete construct), history
//! expansion, job notifications at the prompt boundary, and trap
//! dispatch between commands.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::exec::{interp, Flow};
use crate::expand::prompt::expand_prompt;
use crate::parser;
use crate::shell::Shell;
use crate::sys;

use super::history::expand_history;

pub fn run_interactive(shell: &mut Shell) -> i32 {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            shell.report_error(&format!("cannot initialize line editor: {e}"));
            return 2;
        }
    };

    // The shell leads its own process group, owns the terminal, and
    // survives job-control signals.
    sys::claim_terminal();
    sys::ignore_job_control_signals();
    sys::set_ignore(nix::sys::signal::Signal::SIGINT);

    let histfile = shell.get_var("HISTFILE");
    if let Some(path) = &histfile {
        let _ = editor.load_history(path);
    }
    let histsize = shell
        .get_var("HISTSIZE")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(500);
    // Mirror of the history used for `!` designator expansion;
    // on-disk layout stays the line editor's business.
    let mut entries: Vec<String> = Vec::new();

    loop {
        // Prompt boundary: reap, report finished jobs, dispatch traps.
        shell.jobs.reap();
        let mut notes = Vec::new();
        shell.jobs.notify_and_sweep(|line| notes.push(line.to_string()));
        for note in notes {
            let _ = sys::write_fd(sys::STDERR_FD, format!("{note}\n").as_bytes());
        }
        interp::run_pending_traps(shell);

        let ps1 = shell.get_var("PS1").unwrap_or_else(|| "$ ".to_string());
        let prompt = expand_prompt(shell, &ps1);
        let mut line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                shell.set_status(130);
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                shell.report_error(&format!("read error: {e}"));
                break;
            }
        };

        // History expansion first, before any lexing.
        match expand_history(&line, &entries) {
            Ok((expanded, changed)) => {
                if changed {
                    let _ = sys::write_fd(sys::STDERR_FD, format!("{expanded}\n").as_bytes());
                }
                line = expanded;
            }
            Err(message) => {
                shell.report_error(&message);
                shell.set_status(1);
                continue;
            }
        }

        // Accumulate continuation lines while the construct is open.
        let mut buffer = line;
        let script = loop {
            match parser::parse_with_aliases(&buffer, shell.aliases.map()) {
                Ok(script) => break Some(script),
                Err(e) if e.incomplete => {
                    let ps2 = shell.get_var("PS2").unwrap_or_else(|| "> ".to_string());
                    let continuation = expand_prompt(shell, &ps2);
                    match editor.readline(&continuation) {
                        Ok(more) => {
                            buffer.push('\n');
                            buffer.push_str(&more);
                        }
                        Err(ReadlineError::Interrupted) => {
                            shell.set_status(130);
                            break None;
                        }
                        Err(_) => {
                            shell.report_error(&e.to_string());
                            shell.set_status(2);
                            break None;
                        }
                    }
                }
                Err(e) => {
                    shell.report_error(&e.to_string());
                    shell.set_status(2);
                    break None;
                }
            }
        };

        if !buffer.trim().is_empty() {
            let _ = editor.add_history_entry(buffer.as_str());
            entries.push(buffer.clone());
            if entries.len() > histsize {
                let excess = entries.len() - histsize;
                entries.drain(..excess);
            }
        }

        let Some(script) = script else { continue };
        if shell.trace.ast {
            let dump = crate::ast::printer::dump_script(&script);
            let _ = sys::write_fd(sys::STDERR_FD, dump.as_bytes());
        }
        match interp::run_script(shell, &script) {
            Flow::Exit(status) => {
                shell.set_status(status);
                break;
            }
            flow => shell.set_status(flow.status()),
        }
    }

    if let Some(path) = &histfile {
        let _ = editor.save_history(path);
    }
    interp::run_exit_trap(shell);
    shell.last_status
}
