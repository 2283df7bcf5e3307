//! exec — apply redirections permanently or replace the shell.

use crate::exec::{external, Flow};
use crate::shell::Shell;
use crate::sys;

pub fn run(shell: &mut Shell, args: &[String]) -> Flow {
    // Without a command, the redirections applied around this call
    // are committed by the dispatcher; nothing to do here.
    let Some(name) = args.first() else {
        return Flow::Normal(0);
    };

    let path = match external::resolve(shell, name) {
        external::Resolution::Path(path) => path,
        external::Resolution::NotFound => {
            shell.report_error(&format!("exec: {name}: not found"));
            return if shell.interactive {
                Flow::Normal(127)
            } else {
                Flow::Exit(127)
            };
        }
        external::Resolution::NotExecutable(path) => {
            shell.report_error(&format!("exec: {path}: permission denied"));
            return if shell.interactive {
                Flow::Normal(126)
            } else {
                Flow::Exit(126)
            };
        }
    };

    let env = shell.vars.environment();
    sys::reset_child_signals();
    let errno = sys::exec_program(&path, args, &env);
    // Only reached when execve failed.
    shell.report_error(&format!("exec: {name}: {}", errno.desc()));
    if shell.interactive {
        Flow::Normal(126)
    } else {
        Flow::Exit(126)
    }
}
