//! read — one line from stdin into variables, IFS-split.

use crate::exec::{interp, Flow};
use crate::expand::split::split_fields;
use crate::shell::{ArrayKey, Scope, Shell, Value};
use crate::sys;

use super::fail;

pub fn run(shell: &mut Shell, args: &[String]) -> Flow {
    let mut raw = false;
    let mut prompt: Option<String> = None;
    let mut array_target: Option<String> = None;
    let mut index = 0usize;

    while index < args.len() {
        match args[index].as_str() {
            "-r" => raw = true,
            "-p" => {
                index += 1;
                prompt = args.get(index).cloned();
            }
            "-a" => {
                index += 1;
                array_target = args.get(index).cloned();
            }
            "-s" => {
                // Silent mode needs terminal modes; accepted and
                // ignored so scripts keep working.
            }
            "--" => {
                index += 1;
                break;
            }
            arg if arg.starts_with('-') => {
                return fail(shell, &format!("read: {arg}: invalid option"), 2)
            }
            _ => break,
        }
        index += 1;
    }
    let names = &args[index..];

    if let Some(prompt) = prompt {
        let _ = sys::write_fd(sys::STDERR_FD, prompt.as_bytes());
    }

    let mut line = match interp::read_line_stdin(shell) {
        Some(line) => line,
        None => return Flow::Normal(1),
    };

    // Without -r a trailing backslash continues onto the next line
    // and backslashes escape the following character.
    if !raw {
        while line.ends_with('\\') && !line.ends_with("\\\\") {
            line.pop();
            match interp::read_line_stdin(shell) {
                Some(more) => line.push_str(&more),
                None => break,
            }
        }
        line = unescape(&line);
    }

    let ifs = shell.get_var("IFS").unwrap_or_else(|| " \t\n".to_string());

    if let Some(array) = array_target {
        let fields = split_fields(&line, &ifs).fields;
        if let Err(e) = shell
            .vars
            .set_value(&array, Value::indexed_from(fields), Scope::Nearest)
        {
            return fail(shell, &format!("read: {e}"), 1);
        }
        return Flow::Normal(0);
    }

    if names.is_empty() {
        if let Err(e) = shell.vars.set_scalar("REPLY", line, Scope::Nearest) {
            return fail(shell, &format!("read: {e}"), 1);
        }
        return Flow::Normal(0);
    }

    // Split into at most names.len() fields; the last name takes the
    // remainder verbatim (modulo surrounding IFS whitespace).
    let mut assigned: Vec<String> = Vec::with_capacity(names.len());
    if names.len() == 1 {
        assigned.push(trim_ifs(&line, &ifs));
    } else {
        let fields = split_fields(&line, &ifs).fields;
        for (i, _) in names.iter().enumerate() {
            if i + 1 < names.len() {
                assigned.push(fields.get(i).cloned().unwrap_or_default());
            } else {
                let rest: Vec<String> = fields.iter().skip(i).cloned().collect();
                assigned.push(rest.join(" "));
            }
        }
    }

    for (name, value) in names.iter().zip(assigned) {
        let result = if let Some((array, key)) = split_subscript(name) {
            match crate::expand::arith::eval_text(shell, &key) {
                Ok(idx) => shell
                    .vars
                    .set_element(&array, ArrayKey::Index(idx), value, Scope::Nearest),
                Err(e) => return fail(shell, &format!("read: {e}"), 1),
            }
        } else {
            shell.vars.set_scalar(name, value, Scope::Nearest)
        };
        if let Err(e) = result {
            return fail(shell, &format!("read: {e}"), 1);
        }
    }
    Flow::Normal(0)
}

fn unescape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn trim_ifs(line: &str, ifs: &str) -> String {
    let ws: Vec<char> = ifs.chars().filter(|c| matches!(c, ' ' | '\t' | '\n')).collect();
    line.trim_matches(|c| ws.contains(&c)).to_string()
}

fn split_subscript(name: &str) -> Option<(String, String)> {
    let open = name.find('[')?;
    if !name.ends_with(']') {
        return None;
    }
    Some((
        name[..open].to_string(),
        name[open + 1..name.len() - 1].to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_strips_backslashes() {
        assert_eq!(unescape("a\\ b\\\\c"), "a b\\c");
    }

    #[test]
    fn trim_uses_only_ifs_whitespace() {
        assert_eq!(trim_ifs("  x  ", " \t\n"), "x");
        assert_eq!(trim_ifs("  x  ", ":"), "  x  ");
    }

    #[test]
    fn subscript_split() {
        assert_eq!(
            split_subscript("arr[3]"),
            Some(("arr".to_string(), "3".to_string()))
        );
        assert_eq!(split_subscript("plain"), None);
    }
}
