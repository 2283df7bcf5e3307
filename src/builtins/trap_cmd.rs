//! trap — install, reset, and list signal handlers.

use crate::exec::Flow;
use crate::shell::{Shell, TrapCondition};

use super::{fail, out};

pub fn run(shell: &mut Shell, args: &[String]) -> Flow {
    if args.is_empty() || args[0] == "-p" {
        let mut output = String::new();
        for (name, action) in shell.traps.listing() {
            output.push_str(&format!("trap -- '{}' {}\n", action.replace('\'', "'\\''"), name));
        }
        return out(&output);
    }
    if args[0] == "-l" {
        let mut output = String::new();
        for sig in nix::sys::signal::Signal::iterator() {
            output.push_str(&format!("{}) {}\n", sig as i32, sig.as_str()));
        }
        return out(&output);
    }

    let mut operands = &args[..];
    if operands[0] == "--" {
        operands = &operands[1..];
        if operands.is_empty() {
            return Flow::Normal(0);
        }
    }

    // `trap N...` and `trap - N...` reset to defaults; anything else
    // is an action followed by conditions.
    let (action, conditions) = if operands[0] == "-" {
        (None, &operands[1..])
    } else if operands.len() > 1 || TrapCondition::parse(&operands[0]).is_none() {
        (Some(operands[0].clone()), &operands[1..])
    } else {
        (None, operands)
    };

    if conditions.is_empty() {
        return fail(shell, "trap: usage: trap [-lp] [action condition ...]", 2);
    }

    let mut status = 0;
    for name in conditions {
        match TrapCondition::parse(name) {
            Some(condition) => {
                if let Err(message) = shell.traps.set(condition, action.clone()) {
                    shell.report_error(&format!("trap: {message}"));
                    status = 1;
                }
                // Restoring the default on SIGINT must not make an
                // interactive shell killable at the prompt.
                if action.is_none()
                    && shell.interactive
                    && condition == TrapCondition::Signal(nix::sys::signal::Signal::SIGINT)
                {
                    crate::sys::set_ignore(nix::sys::signal::Signal::SIGINT);
                }
            }
            None => {
                shell.report_error(&format!("trap: {name}: invalid signal specification"));
                status = 1;
            }
        }
    }
    Flow::Normal(status)
}
