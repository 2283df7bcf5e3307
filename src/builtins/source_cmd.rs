//! `.` / source — run a file in the current shell.
//!
//! Extra arguments become the positional parameters for the file's
//! duration; a top-level `return` inside the file returns from the
//! source call.

use crate::exec::{interp, Flow};
use crate::shell::Shell;

use super::fail;

pub fn run(shell: &mut Shell, args: &[String]) -> Flow {
    let Some(path_arg) = args.first() else {
        return fail(shell, ".: filename argument required", 2);
    };

    let path = match locate(shell, path_arg) {
        Some(path) => path,
        None => return fail(shell, &format!(".: {path_arg}: file not found"), 1),
    };
    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) => return fail(shell, &format!(".: {path}: {e}"), 1),
    };
    let script = match crate::parser::parse_with_aliases(&source, shell.aliases.map()) {
        Ok(script) => script,
        Err(e) => return fail(shell, &format!("{path}: {e}"), 2),
    };

    let replaced_params = !args[1..].is_empty();
    if replaced_params {
        let zero = shell.dollar_zero();
        shell.vars.push_positional(zero, args[1..].to_vec());
    }
    shell.source_stack.push(path.clone());
    shell.dot_depth += 1;

    let flow = interp::run_script(shell, &script);

    shell.dot_depth -= 1;
    shell.source_stack.pop();
    if replaced_params {
        shell.vars.pop_positional();
    }

    match flow {
        Flow::Return(status) => Flow::Normal(status),
        other => other,
    }
}

/// A name with no slash is searched on PATH first, then in the
/// current directory.
fn locate(shell: &Shell, name: &str) -> Option<String> {
    if name.contains('/') {
        return std::fs::metadata(name).is_ok().then(|| name.to_string());
    }
    let path = shell.get_var("PATH").unwrap_or_default();
    for dir in path.split(':') {
        let candidate = format!("{}/{name}", if dir.is_empty() { "." } else { dir });
        if std::fs::metadata(&candidate).map(|m| m.is_file()).unwrap_or(false) {
            return Some(candidate);
        }
    }
    std::fs::metadata(name).is_ok().then(|| name.to_string())
}
