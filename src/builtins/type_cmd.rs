//! type — classify a name; command — run bypassing functions.

use crate::exec::{external, Flow};
use crate::shell::Shell;

use super::out;

pub fn run_type(shell: &mut Shell, args: &[String]) -> Flow {
    let mut name_only = false;
    let mut operands = &args[..];
    if args.first().map(String::as_str) == Some("-t") {
        name_only = true;
        operands = &args[1..];
    }

    let mut status = 0;
    let mut output = String::new();
    for name in operands {
        if let Some(value) = shell.aliases.get(name) {
            if name_only {
                output.push_str("alias\n");
            } else {
                output.push_str(&format!("{name} is aliased to `{value}'\n"));
            }
        } else if shell.funcs.contains(name) {
            if name_only {
                output.push_str("function\n");
            } else {
                output.push_str(&format!("{name} is a function\n"));
            }
        } else if crate::builtins::is_builtin(name) {
            if name_only {
                output.push_str("builtin\n");
            } else {
                output.push_str(&format!("{name} is a shell builtin\n"));
            }
        } else {
            match external::resolve(shell, name) {
                external::Resolution::Path(path) => {
                    if name_only {
                        output.push_str("file\n");
                    } else {
                        output.push_str(&format!("{name} is {path}\n"));
                    }
                }
                _ => {
                    if !name_only {
                        shell.report_error(&format!("type: {name}: not found"));
                    }
                    status = 1;
                }
            }
        }
    }
    if !output.is_empty() {
        let _ = out(&output);
    }
    Flow::Normal(status)
}

pub fn run_command(shell: &mut Shell, args: &[String]) -> Flow {
    let mut verify = false;
    let mut operands = &args[..];
    while let Some(first) = operands.first().map(String::as_str) {
        match first {
            "-v" | "-V" => {
                verify = true;
                operands = &operands[1..];
            }
            "-p" | "--" => operands = &operands[1..],
            _ => break,
        }
    }
    let Some(name) = operands.first() else {
        return Flow::Normal(0);
    };

    if verify {
        if crate::builtins::is_builtin(name) || shell.funcs.contains(name) {
            return out(&format!("{name}\n"));
        }
        return match external::resolve(shell, name) {
            external::Resolution::Path(path) => out(&format!("{path}\n")),
            _ => Flow::Normal(1),
        };
    }

    // Execute, skipping function lookup.
    if let Some(handler) = crate::builtins::lookup(name) {
        return handler(shell, &operands[1..]);
    }
    external::run_external(shell, operands, &[], &[])
}
