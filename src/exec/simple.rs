//! Simple-command execution.
//!
//! The order of operations: expand words into argv, collect
//! assignments and redirections; with an empty argv the assignments
//! land in the current shell; otherwise dispatch to a function, a
//! special builtin (assignments persist), a regular builtin
//! (assignments scoped to the call), or an external command
//! (assignments exported to its environment only).

use crate::ast::*;
use crate::builtins;
use crate::expand;
use crate::shell::{ArrayKey, Scope, Shell, Value, Variable};
use crate::sys;

use super::{external, interp, redirect, subshell, Flow};

pub fn run_simple(shell: &mut Shell, node: &SimpleCommandNode) -> Flow {
    shell.current_line = node.span.start.line;
    interp::fire_debug_trap(shell);
    shell.last_subst_status = None;

    let mut words: Vec<WordNode> = Vec::with_capacity(1 + node.args.len());
    if let Some(name) = &node.name {
        words.push(name.clone());
    }
    words.extend(node.args.iter().cloned());

    let argv = match expand::expand_words(shell, &words) {
        Ok(argv) => argv,
        Err(e) => {
            subshell::close_procsub_fds(shell);
            return expansion_failure(shell, &e);
        }
    };

    let flow = dispatch(shell, node, argv);
    subshell::close_procsub_fds(shell);
    flow
}

fn dispatch(shell: &mut Shell, node: &SimpleCommandNode, argv: Vec<String>) -> Flow {
    if argv.is_empty() {
        return run_assignments_only(shell, node);
    }

    if shell.options.xtrace {
        let ps4 = shell.get_var("PS4").unwrap_or_else(|| "+ ".to_string());
        let prefix = expand::prompt::expand_prompt(shell, &ps4);
        let line = format!("{prefix}{}\n", argv.join(" "));
        let _ = sys::write_fd(sys::STDERR_FD, line.as_bytes());
    }
    if shell.options.noexec {
        return Flow::Normal(0);
    }

    let name = argv[0].clone();

    // Functions shadow external commands, builtins shadow functions
    // only for the special set.
    if let Some(function) = shell.funcs.get(&name).cloned() {
        if !builtins::is_special(&name) {
            let saved = match apply_temp_assignments(shell, &node.assignments) {
                Ok(saved) => saved,
                Err(status) => return Flow::Normal(status),
            };
            if shell.trace.exec {
                crate::trace::emit("exec", &format!("call function {name}"));
            }
            let flow =
                interp::call_function(shell, function, argv[1..].to_vec(), &node.redirections);
            restore_temp_assignments(shell, saved);
            return flow;
        }
    }

    if let Some(handler) = builtins::lookup(&name) {
        let special = builtins::is_special(&name);
        if special {
            // Assignments before a special builtin persist.
            for assignment in &node.assignments {
                if let Err(message) = apply_assignment(shell, assignment, Scope::Nearest) {
                    shell.report_error(&message);
                    return Flow::Normal(1);
                }
            }
            let saved = match redirect::apply_saving(shell, &node.redirections) {
                Ok(saved) => saved,
                Err(status) => return Flow::Normal(status),
            };
            if shell.trace.exec {
                crate::trace::emit("exec", &format!("special builtin {name}"));
            }
            let flow = handler(shell, &argv[1..]);
            // `exec` commits its redirections itself; everything else
            // restores.
            if name == "exec" && flow.is_normal() && flow.status() == 0 {
                saved.commit();
            } else {
                saved.restore();
            }
            return flow;
        }

        let temp = match apply_temp_assignments(shell, &node.assignments) {
            Ok(saved) => saved,
            Err(status) => return Flow::Normal(status),
        };
        let saved = match redirect::apply_saving(shell, &node.redirections) {
            Ok(saved) => saved,
            Err(status) => {
                restore_temp_assignments(shell, temp);
                return Flow::Normal(status);
            }
        };
        if shell.trace.exec {
            crate::trace::emit("exec", &format!("builtin {name}"));
        }
        let flow = handler(shell, &argv[1..]);
        saved.restore();
        restore_temp_assignments(shell, temp);
        return flow;
    }

    // External command: assignments only reach the child environment.
    let mut extra_env = Vec::with_capacity(node.assignments.len());
    for assignment in &node.assignments {
        match expand_env_assignment(shell, assignment) {
            Ok(Some(pair)) => extra_env.push(pair),
            Ok(None) => {}
            Err(message) => {
                shell.report_error(&message);
                return Flow::Normal(1);
            }
        }
    }
    external::run_external(shell, &argv, &extra_env, &node.redirections)
}

fn run_assignments_only(shell: &mut Shell, node: &SimpleCommandNode) -> Flow {
    for assignment in &node.assignments {
        if let Err(message) = apply_assignment(shell, assignment, Scope::Nearest) {
            shell.report_error(&message);
            return Flow::Normal(1);
        }
    }
    // Redirections still open/create their targets, then revert.
    match redirect::apply_saving(shell, &node.redirections) {
        Ok(saved) => saved.restore(),
        Err(status) => return Flow::Normal(status),
    }
    Flow::Normal(shell.last_subst_status.unwrap_or(0))
}

fn expansion_failure(shell: &mut Shell, error: &expand::ExpandError) -> Flow {
    shell.report_error(&error.to_string());
    if error.is_fatal() && !shell.interactive {
        Flow::Exit(1)
    } else {
        Flow::Normal(1)
    }
}

// ---- assignments -----------------------------------------------------------

/// Apply one assignment in the current shell.
pub fn apply_assignment(
    shell: &mut Shell,
    node: &AssignmentNode,
    scope: Scope,
) -> Result<(), String> {
    let name = node.name.as_str();

    if let Some(elements) = &node.array {
        return apply_array_assignment(shell, node, elements, scope);
    }

    let mut value = match &node.value {
        Some(word) => expand::expand_word_single(shell, word).map_err(|e| e.to_string())?,
        None => String::new(),
    };

    // SECONDS assignments rebase the counter.
    if name == "SECONDS" && node.subscript.is_none() {
        let n = value.parse::<i64>().unwrap_or(0);
        let elapsed = shell
            .get_var("SECONDS")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0)
            - shell.seconds_offset;
        shell.seconds_offset = n - elapsed;
        return Ok(());
    }

    let attrs = shell.vars.attrs(name);
    if attrs.integer {
        value = expand::arith::eval_text(shell, &value)
            .map_err(|e| e.to_string())?
            .to_string();
    }

    match &node.subscript {
        Some(raw) => {
            let key = subscript_key(shell, name, raw)?;
            if node.append {
                let existing = element_value(shell, name, &key);
                value = format!("{existing}{value}");
            }
            shell
                .vars
                .set_element(name, key, value, scope)
                .map_err(|e| e.to_string())?;
        }
        None => {
            if node.append {
                if attrs.integer {
                    let current = shell
                        .vars
                        .get_scalar(name)
                        .and_then(|v| v.parse::<i64>().ok())
                        .unwrap_or(0);
                    let addend = value.parse::<i64>().unwrap_or(0);
                    value = current.wrapping_add(addend).to_string();
                    shell
                        .vars
                        .set_scalar(name, value, scope)
                        .map_err(|e| e.to_string())?;
                } else {
                    shell
                        .vars
                        .append_scalar(name, &value, scope)
                        .map_err(|e| e.to_string())?;
                }
            } else {
                shell
                    .vars
                    .set_scalar(name, value, scope)
                    .map_err(|e| e.to_string())?;
            }
        }
    }

    if shell.options.allexport {
        let _ = shell.vars.modify_attrs(
            name,
            |a| {
                a.exported = true;
                Ok(())
            },
            scope,
        );
    }
    Ok(())
}

fn apply_array_assignment(
    shell: &mut Shell,
    node: &AssignmentNode,
    elements: &[ArrayElementNode],
    scope: Scope,
) -> Result<(), String> {
    let name = node.name.as_str();
    let assoc = matches!(
        shell.vars.get(name).and_then(|v| v.value.as_ref()),
        Some(Value::Assoc(_))
    );

    if !node.append {
        // A fresh literal replaces the whole value.
        let empty = if assoc {
            Value::Assoc(Default::default())
        } else {
            Value::Indexed(Default::default())
        };
        shell
            .vars
            .set_value(name, empty, scope)
            .map_err(|e| e.to_string())?;
    }

    let mut next_index = if node.append { shell.vars.next_index(name) } else { 0 };
    for element in elements {
        let value = expand::expand_word_single(shell, &element.value).map_err(|e| e.to_string())?;
        let key = match &element.key {
            Some(raw) => {
                if assoc {
                    ArrayKey::Key(
                        expand::parameter::expand_subscript_key(shell, raw)
                            .map_err(|e| e.to_string())?,
                    )
                } else {
                    let idx = expand::arith::eval_text(shell, raw).map_err(|e| e.to_string())?;
                    next_index = idx + 1;
                    ArrayKey::Index(idx)
                }
            }
            None => {
                let key = ArrayKey::Index(next_index);
                next_index += 1;
                key
            }
        };
        shell
            .vars
            .set_element(name, key, value, scope)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn subscript_key(shell: &mut Shell, name: &str, raw: &str) -> Result<ArrayKey, String> {
    let assoc = matches!(
        shell.vars.get(name).and_then(|v| v.value.as_ref()),
        Some(Value::Assoc(_))
    );
    if assoc {
        Ok(ArrayKey::Key(
            expand::parameter::expand_subscript_key(shell, raw).map_err(|e| e.to_string())?,
        ))
    } else {
        let mut idx = expand::arith::eval_text(shell, raw).map_err(|e| e.to_string())?;
        if idx < 0 {
            // Negative subscripts count back from the end.
            idx += shell.vars.next_index(name);
        }
        Ok(ArrayKey::Index(idx))
    }
}

fn element_value(shell: &Shell, name: &str, key: &ArrayKey) -> String {
    match (shell.vars.get(name).and_then(|v| v.value.as_ref()), key) {
        (Some(Value::Indexed(map)), ArrayKey::Index(i)) => map.get(i).cloned().unwrap_or_default(),
        (Some(Value::Assoc(map)), ArrayKey::Key(k)) => map.get(k).cloned().unwrap_or_default(),
        (Some(Value::Scalar(s)), ArrayKey::Index(0)) => s.clone(),
        _ => String::new(),
    }
}

/// Expand a command-prefix assignment into a child-environment pair;
/// array literals are meaningless in an environment.
fn expand_env_assignment(
    shell: &mut Shell,
    node: &AssignmentNode,
) -> Result<Option<(String, String)>, String> {
    if node.array.is_some() || node.subscript.is_some() {
        return Ok(None);
    }
    let value = match &node.value {
        Some(word) => expand::expand_word_single(shell, word).map_err(|e| e.to_string())?,
        None => String::new(),
    };
    Ok(Some((node.name.clone(), value)))
}

/// Apply prefix assignments for a regular builtin or function call,
/// returning the snapshots to restore afterwards.
fn apply_temp_assignments(
    shell: &mut Shell,
    assignments: &[AssignmentNode],
) -> Result<Vec<(String, Option<Variable>)>, i32> {
    let mut snapshots = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        snapshots.push((assignment.name.clone(), shell.vars.snapshot(&assignment.name)));
        if let Err(message) = apply_assignment(shell, assignment, Scope::Nearest) {
            shell.report_error(&message);
            for (name, snapshot) in snapshots.into_iter().rev() {
                shell.vars.restore_binding(&name, snapshot);
            }
            return Err(1);
        }
    }
    Ok(snapshots)
}

fn restore_temp_assignments(shell: &mut Shell, snapshots: Vec<(String, Option<Variable>)>) {
    for (name, snapshot) in snapshots.into_iter().rev() {
        shell.vars.restore_binding(&name, snapshot);
    }
}
