//! The AST walker.
//!
//! Scripts run item by item; pending traps dispatch between items
//! (signals never interrupt a simple command mid-flight). Loops
//! consume `Break`/`Continue`, `errexit` and the ERR trap fire after
//! non-exempt pipelines, and compound commands apply their
//! redirections through the saved-fd table.

use std::time::Instant;

use crate::ast::*;
use crate::expand;
use crate::shell::{Scope, Shell, ShellFunction, TrapCondition};
use crate::sys;

use super::{cond, pipeline, redirect, simple, subshell, Flow};

pub fn run_script(shell: &mut Shell, script: &ScriptNode) -> Flow {
    let mut last = Flow::Normal(0);
    for item in &script.items {
        run_pending_traps(shell);
        if item.background {
            let text = summarize_and_or(&item.and_or);
            last = subshell::run_background(shell, &item.and_or, text);
            shell.set_status(0);
        } else {
            last = run_and_or(shell, &item.and_or);
            match last {
                Flow::Normal(status) => shell.set_status(status),
                _ => return last,
            }
        }
    }
    last
}

pub fn run_and_or(shell: &mut Shell, node: &AndOrNode) -> Flow {
    let first_is_condition = !node.rest.is_empty();
    let flow = run_pipeline_guard(shell, &node.first, first_is_condition);
    let mut status = match flow {
        Flow::Normal(status) => status,
        other => return other,
    };
    for (index, (op, pipeline_node)) in node.rest.iter().enumerate() {
        let wanted = match op {
            AndOrOperator::And => status == 0,
            AndOrOperator::Or => status != 0,
        };
        if !wanted {
            continue;
        }
        let is_condition = index + 1 < node.rest.len();
        match run_pipeline_guard(shell, pipeline_node, is_condition) {
            Flow::Normal(s) => status = s,
            other => return other,
        }
    }
    Flow::Normal(status)
}

/// Run one pipeline, handling negation, `time`, errexit, and the ERR
/// trap. `as_condition` marks non-final `&&`/`||` operands.
fn run_pipeline_guard(shell: &mut Shell, node: &PipelineNode, as_condition: bool) -> Flow {
    let exempt = as_condition || node.negated;
    if exempt {
        shell.condition_depth += 1;
    }
    let started = Instant::now();
    let cpu_before = sys::children_cpu_times();

    let flow = if node.commands.len() == 1 {
        run_command(shell, &node.commands[0])
    } else {
        pipeline::run_pipeline(shell, node)
    };

    if node.timed {
        let elapsed = started.elapsed().as_secs_f64();
        let cpu_after = sys::children_cpu_times();
        let report = format!(
            "\nreal\t{}\nuser\t{}\nsys\t{}\n",
            format_interval(elapsed),
            format_interval(cpu_after.0 - cpu_before.0),
            format_interval(cpu_after.1 - cpu_before.1),
        );
        let _ = sys::write_fd(sys::STDERR_FD, report.as_bytes());
    }
    if exempt {
        shell.condition_depth -= 1;
    }

    match flow {
        Flow::Normal(mut status) => {
            if node.negated {
                status = if status == 0 { 1 } else { 0 };
            }
            shell.set_status(status);
            if status != 0 && !exempt && !shell.in_condition_context() {
                fire_err_trap(shell);
                if shell.options.errexit {
                    return Flow::Exit(status);
                }
            }
            Flow::Normal(status)
        }
        other => other,
    }
}

fn format_interval(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as u64;
    format!("{}m{:.3}s", minutes, seconds - (minutes as f64) * 60.0)
}

pub fn run_command(shell: &mut Shell, node: &CommandNode) -> Flow {
    match node {
        CommandNode::Simple(simple_node) => simple::run_simple(shell, simple_node),
        CommandNode::Compound(compound) => run_compound(shell, compound),
        CommandNode::FunctionDef(def) => {
            shell.funcs.define(ShellFunction {
                name: def.name.clone(),
                body: def.body.clone(),
                redirections: def.redirections.clone(),
            });
            Flow::Normal(0)
        }
    }
}

pub fn run_compound(shell: &mut Shell, node: &CompoundCommandNode) -> Flow {
    // Subshells apply their redirections in the child.
    if let CompoundCommandNode::Subshell(subshell_node) = node {
        return subshell::run_subshell(shell, subshell_node);
    }

    let saved = match redirect::apply_saving(shell, node.redirections()) {
        Ok(saved) => saved,
        Err(status) => return Flow::Normal(status),
    };
    let flow = run_compound_body(shell, node);
    saved.restore();
    flow
}

fn run_compound_body(shell: &mut Shell, node: &CompoundCommandNode) -> Flow {
    match node {
        CompoundCommandNode::Group(group) => run_script(shell, &group.body),
        CompoundCommandNode::If(if_node) => run_if(shell, if_node),
        CompoundCommandNode::While(while_node) => {
            run_while_until(shell, &while_node.condition, &while_node.body, false)
        }
        CompoundCommandNode::Until(until_node) => {
            run_while_until(shell, &until_node.condition, &until_node.body, true)
        }
        CompoundCommandNode::For(for_node) => run_for(shell, for_node),
        CompoundCommandNode::CStyleFor(cfor) => run_cfor(shell, cfor),
        CompoundCommandNode::Case(case_node) => run_case(shell, case_node),
        CompoundCommandNode::Select(select_node) => run_select(shell, select_node),
        CompoundCommandNode::Arithmetic(arith_node) => {
            shell.current_line = arith_node.span.start.line;
            match expand::arith::eval(shell, &arith_node.expression) {
                Ok(value) => Flow::Normal(if value != 0 { 0 } else { 1 }),
                Err(e) => {
                    shell.report_error(&e.to_string());
                    Flow::Normal(1)
                }
            }
        }
        CompoundCommandNode::Conditional(cond_node) => {
            shell.current_line = cond_node.span.start.line;
            match cond::eval_cond(shell, &cond_node.expression) {
                Ok(true) => Flow::Normal(0),
                Ok(false) => Flow::Normal(1),
                Err(e) => {
                    shell.report_error(&e.to_string());
                    Flow::Normal(2)
                }
            }
        }
        CompoundCommandNode::Subshell(_) => unreachable!("handled in run_compound"),
    }
}

/// Run a condition list: errexit and ERR are suppressed inside.
fn run_condition(shell: &mut Shell, script: &ScriptNode) -> Flow {
    shell.condition_depth += 1;
    let flow = run_script(shell, script);
    shell.condition_depth -= 1;
    flow
}

fn run_if(shell: &mut Shell, node: &IfNode) -> Flow {
    for clause in &node.clauses {
        let status = match run_condition(shell, &clause.condition) {
            Flow::Normal(status) => status,
            other => return other,
        };
        if status == 0 {
            return run_script(shell, &clause.body);
        }
    }
    match &node.else_body {
        Some(body) => run_script(shell, body),
        None => Flow::Normal(0),
    }
}

/// Shared while/until walker; `until` negates the test.
fn run_while_until(
    shell: &mut Shell,
    condition: &ScriptNode,
    body: &ScriptNode,
    until: bool,
) -> Flow {
    let mut last = 0;
    loop {
        run_pending_traps(shell);
        let status = match run_condition(shell, condition) {
            Flow::Normal(status) => status,
            other => return other,
        };
        let run_body = if until { status != 0 } else { status == 0 };
        if !run_body {
            break;
        }
        match run_loop_body(shell, body) {
            LoopStep::Continue(s) => last = s,
            LoopStep::Stop(s) => {
                last = s;
                break;
            }
            LoopStep::Propagate(flow) => return flow,
        }
    }
    Flow::Normal(last)
}

fn run_for(shell: &mut Shell, node: &ForNode) -> Flow {
    let items = match &node.words {
        Some(words) => match expand::expand_words(shell, words) {
            Ok(items) => items,
            Err(e) => return expansion_failure(shell, &e),
        },
        None => shell.vars.positional().params.clone(),
    };
    let mut last = 0;
    for item in items {
        run_pending_traps(shell);
        if let Err(e) = shell.vars.set_scalar(&node.variable, item, Scope::Nearest) {
            shell.report_error(&e.to_string());
            return Flow::Normal(1);
        }
        match run_loop_body(shell, &node.body) {
            LoopStep::Continue(s) => last = s,
            LoopStep::Stop(s) => return Flow::Normal(s),
            LoopStep::Propagate(flow) => return flow,
        }
    }
    Flow::Normal(last)
}

fn run_cfor(shell: &mut Shell, node: &CStyleForNode) -> Flow {
    shell.current_line = node.span.start.line;
    if let Some(init) = &node.init {
        if let Err(e) = expand::arith::eval(shell, init) {
            shell.report_error(&e.to_string());
            return Flow::Normal(1);
        }
    }
    let mut last = 0;
    loop {
        run_pending_traps(shell);
        if let Some(condition) = &node.condition {
            match expand::arith::eval(shell, condition) {
                Ok(value) => {
                    if value == 0 {
                        break;
                    }
                }
                Err(e) => {
                    shell.report_error(&e.to_string());
                    return Flow::Normal(1);
                }
            }
        }
        match run_loop_body(shell, &node.body) {
            LoopStep::Continue(s) => last = s,
            LoopStep::Stop(s) => return Flow::Normal(s),
            LoopStep::Propagate(flow) => return flow,
        }
        if let Some(update) = &node.update {
            if let Err(e) = expand::arith::eval(shell, update) {
                shell.report_error(&e.to_string());
                return Flow::Normal(1);
            }
        }
    }
    Flow::Normal(last)
}

fn run_case(shell: &mut Shell, node: &CaseNode) -> Flow {
    let subject = match expand::expand_word_single(shell, &node.word) {
        Ok(subject) => subject,
        Err(e) => return expansion_failure(shell, &e),
    };
    let mut status = 0;
    let mut index = 0;
    let mut fall_through = false;
    while index < node.items.len() {
        let item = &node.items[index];
        let matched = fall_through
            || item.patterns.iter().any(|pattern| {
                expand::expand_word_pattern(shell, pattern)
                    .map(|p| {
                        expand::glob::matches_full(&p, &subject, shell.match_opts.nocasematch)
                    })
                    .unwrap_or(false)
            });
        fall_through = false;
        if matched {
            match run_script(shell, &item.body) {
                Flow::Normal(s) => status = s,
                other => return other,
            }
            match item.terminator {
                CaseTerminator::Break => return Flow::Normal(status),
                CaseTerminator::FallThrough => fall_through = true,
                CaseTerminator::Continue => {}
            }
        }
        index += 1;
    }
    Flow::Normal(status)
}

fn run_select(shell: &mut Shell, node: &SelectNode) -> Flow {
    let items = match &node.words {
        Some(words) => match expand::expand_words(shell, words) {
            Ok(items) => items,
            Err(e) => return expansion_failure(shell, &e),
        },
        None => shell.vars.positional().params.clone(),
    };
    let mut last = 0;
    let mut show_menu = true;
    loop {
        // Menu and prompt go to stderr; the menu reappears only
        // after blank input.
        if show_menu {
            let mut menu = String::new();
            for (i, item) in items.iter().enumerate() {
                menu.push_str(&format!("{}) {}\n", i + 1, item));
            }
            let _ = sys::write_fd(sys::STDERR_FD, menu.as_bytes());
            show_menu = false;
        }
        let ps3 = shell.get_var("PS3").unwrap_or_else(|| "#? ".to_string());
        let prompt = expand::prompt::expand_prompt(shell, &ps3);
        let _ = sys::write_fd(sys::STDERR_FD, prompt.as_bytes());

        let line = match read_line_stdin(shell) {
            Some(line) => line,
            None => break, // EOF or interrupt
        };
        let _ = shell
            .vars
            .set_scalar("REPLY", line.clone(), Scope::Nearest);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            show_menu = true;
            continue;
        }
        let chosen = trimmed
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1 && *n <= items.len())
            .map(|n| items[n - 1].clone())
            .unwrap_or_default();
        if let Err(e) = shell.vars.set_scalar(&node.variable, chosen, Scope::Nearest) {
            shell.report_error(&e.to_string());
            return Flow::Normal(1);
        }
        match run_loop_body(shell, &node.body) {
            LoopStep::Continue(s) => last = s,
            LoopStep::Stop(s) => return Flow::Normal(s),
            LoopStep::Propagate(flow) => return flow,
        }
    }
    Flow::Normal(last)
}

/// Read one line from fd 0. `None` on EOF at start of line or on a
/// trapped interrupt (pending traps are dispatched first).
pub fn read_line_stdin(shell: &mut Shell) -> Option<String> {
    let mut line = Vec::new();
    loop {
        match sys::read_byte(sys::STDIN_FD) {
            Ok(Some(b'\n')) => return Some(String::from_utf8_lossy(&line).to_string()),
            Ok(Some(byte)) => line.push(byte),
            Ok(None) => {
                if line.is_empty() {
                    return None;
                }
                return Some(String::from_utf8_lossy(&line).to_string());
            }
            Err(nix::errno::Errno::EINTR) => {
                run_pending_traps(shell);
                return None;
            }
            Err(_) => return None,
        }
    }
}

enum LoopStep {
    Continue(i32),
    Stop(i32),
    Propagate(Flow),
}

fn run_loop_body(shell: &mut Shell, body: &ScriptNode) -> LoopStep {
    shell.loop_depth += 1;
    let flow = run_script(shell, body);
    shell.loop_depth -= 1;
    match flow {
        Flow::Normal(status) => LoopStep::Continue(status),
        Flow::Break(n) => {
            if n > 1 {
                LoopStep::Propagate(Flow::Break(n - 1))
            } else {
                LoopStep::Stop(shell.last_status)
            }
        }
        Flow::Continue(n) => {
            if n > 1 {
                LoopStep::Propagate(Flow::Continue(n - 1))
            } else {
                LoopStep::Continue(shell.last_status)
            }
        }
        other => LoopStep::Propagate(other),
    }
}

fn expansion_failure(shell: &mut Shell, error: &expand::ExpandError) -> Flow {
    shell.report_error(&error.to_string());
    if error.is_fatal() && !shell.interactive {
        Flow::Exit(1)
    } else {
        Flow::Normal(1)
    }
}

// ---- functions -------------------------------------------------------------

/// Activate a function: positional frame, scope frame, redirections,
/// body, RETURN trap.
pub fn call_function(
    shell: &mut Shell,
    function: ShellFunction,
    args: Vec<String>,
    call_redirections: &[RedirectionNode],
) -> Flow {
    if shell.func_depth + 1 > shell.funcnest_limit() {
        shell.report_error(&format!(
            "{}: maximum function nesting exceeded ({})",
            function.name,
            shell.funcnest_limit()
        ));
        return Flow::Normal(1);
    }

    let saved = match redirect::apply_saving(shell, call_redirections) {
        Ok(saved) => saved,
        Err(status) => return Flow::Normal(status),
    };
    let func_saved = match redirect::apply_saving(shell, &function.redirections) {
        Ok(saved) => saved,
        Err(status) => {
            saved.restore();
            return Flow::Normal(status);
        }
    };

    if shell.trace.scopes {
        crate::trace::emit("scope", &format!("push frame for {}", function.name));
    }
    shell.vars.push_function_frame();
    shell
        .vars
        .push_positional(function.name.clone(), args);
    shell.funcname_stack.push(function.name.clone());
    shell.func_depth += 1;

    let flow = run_compound(shell, &function.body);

    shell.func_depth -= 1;
    shell.funcname_stack.pop();
    shell.vars.pop_positional();
    shell.vars.pop_function_frame();
    if shell.trace.scopes {
        crate::trace::emit("scope", &format!("pop frame for {}", function.name));
    }
    func_saved.restore();
    saved.restore();

    fire_return_trap(shell);

    match flow {
        Flow::Return(status) => Flow::Normal(status),
        other => other,
    }
}

// ---- traps -----------------------------------------------------------------

/// Dispatch trapped signals recorded since the last safe point.
pub fn run_pending_traps(shell: &mut Shell) {
    if shell.traps.running {
        return;
    }
    let pending = shell.traps.take_pending();
    for (_, action) in pending {
        run_trap_action(shell, &action);
    }
}

/// Run one trap action string: re-lex, re-parse, execute; `$?` is
/// preserved around the handler.
pub fn run_trap_action(shell: &mut Shell, action: &str) {
    let script = match crate::parser::parse_with_aliases(action, shell.aliases.map()) {
        Ok(script) => script,
        Err(e) => {
            shell.report_error(&format!("trap: {e}"));
            return;
        }
    };
    let saved_status = shell.last_status;
    shell.traps.running = true;
    let flow = run_script(shell, &script);
    shell.traps.running = false;
    match flow {
        Flow::Exit(status) => {
            run_exit_trap(shell);
            std::process::exit(status & 0xff);
        }
        _ => shell.set_status(saved_status),
    }
}

fn fire_err_trap(shell: &mut Shell) {
    if shell.traps.running {
        return;
    }
    if let Some(action) = shell.traps.action(TrapCondition::Err).cloned() {
        if !action.is_empty() {
            run_trap_action(shell, &action);
        }
    }
}

pub fn fire_debug_trap(shell: &mut Shell) {
    if shell.traps.running {
        return;
    }
    if let Some(action) = shell.traps.action(TrapCondition::Debug).cloned() {
        if !action.is_empty() {
            run_trap_action(shell, &action);
        }
    }
}

fn fire_return_trap(shell: &mut Shell) {
    if shell.traps.running {
        return;
    }
    if let Some(action) = shell.traps.action(TrapCondition::Return).cloned() {
        if !action.is_empty() {
            run_trap_action(shell, &action);
        }
    }
}

/// EXIT trap, once, at shell termination.
pub fn run_exit_trap(shell: &mut Shell) {
    if shell.exiting {
        return;
    }
    shell.exiting = true;
    if let Some(action) = shell.traps.action(TrapCondition::Exit).cloned() {
        if !action.is_empty() {
            run_trap_action(shell, &action);
        }
    }
}

/// Subshell epilogue: EXIT trap, then the status to `exit(2)` with.
pub fn finalize_subshell(shell: &mut Shell, status: i32) -> i32 {
    shell.set_status(status);
    run_exit_trap(shell);
    shell.last_status
}

/// Short rendering of an and-or chain for the job table.
pub fn summarize_and_or(node: &AndOrNode) -> String {
    let mut parts = Vec::new();
    summarize_pipeline(&node.first, &mut parts);
    for (op, pipeline_node) in &node.rest {
        parts.push(
            match op {
                AndOrOperator::And => "&&",
                AndOrOperator::Or => "||",
            }
            .to_string(),
        );
        summarize_pipeline(pipeline_node, &mut parts);
    }
    parts.join(" ")
}

fn summarize_pipeline(node: &PipelineNode, out: &mut Vec<String>) {
    for (i, command) in node.commands.iter().enumerate() {
        if i > 0 {
            out.push("|".to_string());
        }
        match command {
            CommandNode::Simple(simple_node) => {
                if let Some(name) = &simple_node.name {
                    out.push(crate::ast::printer::describe_word(name));
                    for arg in &simple_node.args {
                        out.push(crate::ast::printer::describe_word(arg));
                    }
                }
            }
            CommandNode::Compound(_) => out.push("(...)".to_string()),
            CommandNode::FunctionDef(def) => out.push(format!("{}()", def.name)),
        }
    }
}
