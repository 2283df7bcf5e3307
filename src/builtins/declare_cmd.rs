//! declare/typeset, local, export, readonly, unset — attribute and
//! scope management over the variable store.

use indexmap::IndexMap;

use crate::ast::{AssignmentNode, WordNode};
use crate::exec::simple::apply_assignment;
use crate::exec::Flow;
use crate::shell::{ArrayKey, Scope, Shell, Value};

use super::{fail, out};

#[derive(Default)]
struct DeclareFlags {
    integer: Option<bool>,
    lowercase: Option<bool>,
    uppercase: Option<bool>,
    readonly: Option<bool>,
    exported: Option<bool>,
    indexed: bool,
    assoc: bool,
    global: bool,
    print: bool,
    functions: bool,
}

fn parse_flags(args: &[String]) -> Result<(DeclareFlags, usize), String> {
    let mut flags = DeclareFlags::default();
    let mut index = 0;
    while index < args.len() {
        let arg = &args[index];
        let (enable, body) = if let Some(rest) = arg.strip_prefix("--") {
            if rest.is_empty() {
                index += 1;
                break;
            }
            return Err(format!("invalid option: {arg}"));
        } else if let Some(rest) = arg.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = arg.strip_prefix('+') {
            (false, rest)
        } else {
            break;
        };
        if body.is_empty() {
            break;
        }
        for c in body.chars() {
            match c {
                'i' => flags.integer = Some(enable),
                'l' => flags.lowercase = Some(enable),
                'u' => flags.uppercase = Some(enable),
                'r' => flags.readonly = Some(enable),
                'x' => flags.exported = Some(enable),
                'a' => flags.indexed = true,
                'A' => flags.assoc = true,
                'g' => flags.global = true,
                'p' => flags.print = true,
                'f' => flags.functions = true,
                other => return Err(format!("invalid option: -{other}")),
            }
        }
        index += 1;
    }
    Ok((flags, index))
}

/// Split `name[sub]=value` / `name+=value` / `name` into an
/// assignment node over already-expanded text.
fn parse_operand(text: &str) -> Option<(AssignmentNode, bool)> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    match chars.first() {
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => i += 1,
        _ => return None,
    }
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    let name: String = chars[..i].iter().collect();

    let mut subscript = None;
    if i < chars.len() && chars[i] == '[' {
        let mut depth = 0usize;
        let start = i + 1;
        while i < chars.len() {
            match chars[i] {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if depth != 0 {
            return None;
        }
        subscript = Some(chars[start..i].iter().collect());
        i += 1;
    }

    let append = chars.get(i) == Some(&'+') && chars.get(i + 1) == Some(&'=');
    if append {
        i += 1;
    }
    let has_value = chars.get(i) == Some(&'=');
    let value = if has_value {
        let text: String = chars[i + 1..].iter().collect();
        Some(WordNode::literal(text))
    } else {
        if i != chars.len() {
            return None;
        }
        None
    };
    Some((
        AssignmentNode {
            name,
            subscript,
            value,
            append,
            array: None,
        },
        has_value,
    ))
}

fn scope_for(shell: &Shell, flags: &DeclareFlags, local_default: bool) -> Scope {
    if flags.global {
        Scope::Global
    } else if local_default && shell.vars.depth() > 1 {
        Scope::Local
    } else {
        Scope::Nearest
    }
}

pub fn run_declare(shell: &mut Shell, args: &[String]) -> Flow {
    // Inside a function, declare without -g binds locally, like
    // `local`.
    declare_impl(shell, args, true, "declare")
}

pub fn run_local(shell: &mut Shell, args: &[String]) -> Flow {
    if shell.func_depth == 0 {
        return fail(shell, "local: can only be used in a function", 1);
    }
    declare_impl(shell, args, true, "local")
}

fn declare_impl(shell: &mut Shell, args: &[String], local_default: bool, who: &str) -> Flow {
    let (flags, operand_start) = match parse_flags(args) {
        Ok(parsed) => parsed,
        Err(message) => return fail(shell, &format!("{who}: {message}"), 2),
    };
    let operands = &args[operand_start..];

    if flags.functions {
        if operands.is_empty() {
            let mut output = String::new();
            for name in shell.funcs.names() {
                output.push_str(&format!("{name} () {{ ... }}\n"));
            }
            return out(&output);
        }
        let mut status = 0;
        for name in operands {
            if !shell.funcs.contains(name) {
                status = 1;
            }
        }
        return Flow::Normal(status);
    }

    if operands.is_empty() || flags.print {
        return print_declarations(shell, operands);
    }

    let scope = scope_for(shell, &flags, local_default || who == "local");
    let mut status = 0;
    for operand in operands {
        let Some((assignment, has_value)) = parse_operand(operand) else {
            shell.report_error(&format!("{who}: `{operand}': not a valid identifier"));
            status = 1;
            continue;
        };
        let name = assignment.name.clone();

        // Array shape first, so assignments land in the right kind.
        if flags.assoc
            && !matches!(
                shell.vars.get(&name).and_then(|v| v.value.as_ref()),
                Some(Value::Assoc(_))
            )
        {
            let _ = shell.vars.declare(&name, Some(Value::Assoc(IndexMap::new())), scope);
        } else if flags.indexed
            && !matches!(
                shell.vars.get(&name).and_then(|v| v.value.as_ref()),
                Some(Value::Indexed(_))
            )
        {
            let _ = shell
                .vars
                .declare(&name, Some(Value::Indexed(Default::default())), scope);
        } else if !has_value && !shell.vars.is_set(&name) {
            let _ = shell.vars.declare(&name, None, scope);
        }

        // Attribute changes before the value, so integer/case
        // transforms apply to it.
        let apply_result = shell.vars.modify_attrs(
            &name,
            |attrs| {
                if let Some(on) = flags.integer {
                    attrs.integer = on;
                }
                if let Some(on) = flags.lowercase {
                    attrs.lowercase = on;
                    if on {
                        attrs.uppercase = false;
                    }
                }
                if let Some(on) = flags.uppercase {
                    attrs.uppercase = on;
                    if on {
                        attrs.lowercase = false;
                    }
                }
                if let Some(on) = flags.exported {
                    attrs.exported = on;
                }
                if let Some(on) = flags.readonly {
                    if !on && attrs.readonly {
                        return Err(crate::shell::VarError::Readonly(name.clone()));
                    }
                    if on {
                        attrs.readonly = true;
                    }
                }
                Ok(())
            },
            scope,
        );
        if let Err(e) = apply_result {
            shell.report_error(&format!("{who}: {e}"));
            status = 1;
            continue;
        }

        if has_value {
            if let Err(message) = apply_assignment(shell, &assignment, scope) {
                shell.report_error(&format!("{who}: {message}"));
                status = 1;
            }
        }
    }
    Flow::Normal(status)
}

fn print_declarations(shell: &mut Shell, operands: &[String]) -> Flow {
    let names: Vec<String> = if operands.is_empty() {
        shell.vars.visible_names()
    } else {
        operands.to_vec()
    };
    let mut output = String::new();
    let mut status = 0;
    for name in names {
        match shell.vars.get(&name) {
            Some(var) => output.push_str(&format_declaration(&name, var)),
            None => status = 1,
        }
    }
    let _ = out(&output);
    Flow::Normal(status)
}

fn format_declaration(name: &str, var: &crate::shell::vars::Variable) -> String {
    let mut letters = String::new();
    if matches!(var.value, Some(Value::Indexed(_))) {
        letters.push('a');
    }
    if matches!(var.value, Some(Value::Assoc(_))) {
        letters.push('A');
    }
    if var.attrs.integer {
        letters.push('i');
    }
    if var.attrs.lowercase {
        letters.push('l');
    }
    if var.attrs.uppercase {
        letters.push('u');
    }
    if var.attrs.readonly {
        letters.push('r');
    }
    if var.attrs.exported {
        letters.push('x');
    }
    if letters.is_empty() {
        letters.push('-');
    }
    match &var.value {
        None => format!("declare -{letters} {name}\n"),
        Some(Value::Scalar(s)) => format!("declare -{letters} {name}=\"{}\"\n", escape_value(s)),
        Some(Value::Indexed(map)) => {
            let body: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("[{k}]=\"{}\"", escape_value(v)))
                .collect();
            format!("declare -{letters} {name}=({})\n", body.join(" "))
        }
        Some(Value::Assoc(map)) => {
            let body: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("[{k}]=\"{}\"", escape_value(v)))
                .collect();
            format!("declare -{letters} {name}=({})\n", body.join(" "))
        }
    }
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('$', "\\$")
}

pub fn run_export(shell: &mut Shell, args: &[String]) -> Flow {
    if args.is_empty() || args[0] == "-p" {
        let mut output = String::new();
        for name in shell.vars.visible_names() {
            if let Some(var) = shell.vars.get(&name) {
                if var.attrs.exported {
                    match var.value.as_ref().and_then(|v| v.as_scalar()) {
                        Some(value) => output
                            .push_str(&format!("export {name}=\"{}\"\n", escape_value(value))),
                        None => output.push_str(&format!("export {name}\n")),
                    }
                }
            }
        }
        return out(&output);
    }
    let mut remove = false;
    let mut operands = &args[..];
    if args[0] == "-n" {
        remove = true;
        operands = &args[1..];
    }
    let mut status = 0;
    for operand in operands {
        let Some((assignment, has_value)) = parse_operand(operand) else {
            shell.report_error(&format!("export: `{operand}': not a valid identifier"));
            status = 1;
            continue;
        };
        if has_value {
            if let Err(message) = apply_assignment(shell, &assignment, Scope::Nearest) {
                shell.report_error(&format!("export: {message}"));
                status = 1;
                continue;
            }
        }
        let result = shell.vars.modify_attrs(
            &assignment.name,
            |attrs| {
                attrs.exported = !remove;
                Ok(())
            },
            Scope::Nearest,
        );
        if let Err(e) = result {
            shell.report_error(&format!("export: {e}"));
            status = 1;
        }
    }
    Flow::Normal(status)
}

pub fn run_readonly(shell: &mut Shell, args: &[String]) -> Flow {
    if args.is_empty() || args[0] == "-p" {
        let mut output = String::new();
        for name in shell.vars.visible_names() {
            if let Some(var) = shell.vars.get(&name) {
                if var.attrs.readonly {
                    output.push_str(&format_declaration(&name, var).replace("declare", "readonly"));
                }
            }
        }
        return out(&output);
    }
    let mut status = 0;
    for operand in args {
        let Some((assignment, has_value)) = parse_operand(operand) else {
            shell.report_error(&format!("readonly: `{operand}': not a valid identifier"));
            status = 1;
            continue;
        };
        if has_value {
            if let Err(message) = apply_assignment(shell, &assignment, Scope::Nearest) {
                shell.report_error(&format!("readonly: {message}"));
                status = 1;
                continue;
            }
        }
        let _ = shell.vars.modify_attrs(
            &assignment.name,
            |attrs| {
                attrs.readonly = true;
                Ok(())
            },
            Scope::Nearest,
        );
    }
    Flow::Normal(status)
}

pub fn run_unset(shell: &mut Shell, args: &[String]) -> Flow {
    let mut functions = false;
    let mut operands = &args[..];
    match args.first().map(String::as_str) {
        Some("-f") => {
            functions = true;
            operands = &args[1..];
        }
        Some("-v") => {
            operands = &args[1..];
        }
        _ => {}
    }
    let mut status = 0;
    for operand in operands {
        if functions {
            shell.funcs.remove(operand);
            continue;
        }
        // `unset arr[3]` removes one element.
        if let Some(open) = operand.find('[') {
            if operand.ends_with(']') {
                let name = operand[..open].to_string();
                let raw = operand[open + 1..operand.len() - 1].to_string();
                let key = match shell.vars.get(&name).and_then(|v| v.value.as_ref()) {
                    Some(Value::Assoc(_)) => {
                        match crate::expand::parameter::expand_subscript_key(shell, &raw) {
                            Ok(key) => ArrayKey::Key(key),
                            Err(e) => {
                                shell.report_error(&format!("unset: {e}"));
                                status = 1;
                                continue;
                            }
                        }
                    }
                    _ => match crate::expand::arith::eval_text(shell, &raw) {
                        Ok(idx) => ArrayKey::Index(idx),
                        Err(e) => {
                            shell.report_error(&format!("unset: {e}"));
                            status = 1;
                            continue;
                        }
                    },
                };
                if let Err(e) = shell.vars.unset_element(&name, &key) {
                    shell.report_error(&format!("unset: {e}"));
                    status = 1;
                }
                continue;
            }
        }
        match shell.vars.unset(operand) {
            Ok(_) => {
                // Without -v, fall back to removing a function of
                // that name, like bash.
                if !shell.vars.is_set(operand) && !functions {
                    shell.funcs.remove(operand);
                }
            }
            Err(e) => {
                shell.report_error(&format!("unset: {e}"));
                status = 1;
            }
        }
    }
    Flow::Normal(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> Shell {
        Shell::new("test", false)
    }

    #[test]
    fn declare_with_assignment() {
        let mut sh = shell();
        run_declare(&mut sh, &["x=5".into()]);
        assert_eq!(sh.vars.get_scalar("x").as_deref(), Some("5"));
    }

    #[test]
    fn declare_integer_evaluates() {
        let mut sh = shell();
        run_declare(&mut sh, &["-i".into(), "n=2+3".into()]);
        assert_eq!(sh.vars.get_scalar("n").as_deref(), Some("5"));
    }

    #[test]
    fn declare_case_attributes() {
        let mut sh = shell();
        run_declare(&mut sh, &["-u".into(), "up=abc".into()]);
        assert_eq!(sh.vars.get_scalar("up").as_deref(), Some("ABC"));
        run_declare(&mut sh, &["-l".into(), "low=DEF".into()]);
        assert_eq!(sh.vars.get_scalar("low").as_deref(), Some("def"));
    }

    #[test]
    fn readonly_then_reassign_fails() {
        let mut sh = shell();
        run_readonly(&mut sh, &["r=1".into()]);
        assert!(sh.vars.is_readonly("r"));
        assert!(sh.vars.set_scalar("r", "2".into(), Scope::Nearest).is_err());
        // Clearing the attribute is refused.
        let flow = run_declare(&mut sh, &["+r".into(), "r".into()]);
        assert_eq!(flow, Flow::Normal(1));
        assert!(sh.vars.is_readonly("r"));
    }

    #[test]
    fn declare_assoc_array() {
        let mut sh = shell();
        run_declare(&mut sh, &["-A".into(), "m".into()]);
        assert!(matches!(
            sh.vars.get("m").and_then(|v| v.value.as_ref()),
            Some(Value::Assoc(_))
        ));
    }

    #[test]
    fn export_marks_attribute() {
        let mut sh = shell();
        run_export(&mut sh, &["e=v".into()]);
        assert!(sh.vars.attrs("e").exported);
        run_export(&mut sh, &["-n".into(), "e".into()]);
        assert!(!sh.vars.attrs("e").exported);
    }

    #[test]
    fn unset_variable_and_element() {
        let mut sh = shell();
        run_declare(&mut sh, &["x=1".into()]);
        run_unset(&mut sh, &["x".into()]);
        assert!(!sh.vars.is_set("x"));

        run_declare(&mut sh, &["-a".into(), "a".into()]);
        let _ = sh.vars.set_element("a", ArrayKey::Index(0), "v".into(), Scope::Nearest);
        run_unset(&mut sh, &["a[0]".into()]);
        assert!(matches!(
            sh.vars.get("a").and_then(|v| v.value.as_ref()),
            Some(Value::Indexed(map)) if map.is_empty()
        ));
    }

    #[test]
    fn invalid_identifier_rejected() {
        let mut sh = shell();
        let flow = run_declare(&mut sh, &["1bad=5".into()]);
        assert_eq!(flow, Flow::Normal(1));
    }
}
