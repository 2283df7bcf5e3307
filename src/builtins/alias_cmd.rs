//! alias / unalias — maintain the alias table.

use crate::exec::Flow;
use crate::shell::Shell;

use super::{fail, out};

pub fn run_alias(shell: &mut Shell, args: &[String]) -> Flow {
    if args.is_empty() {
        let mut output = String::new();
        for name in shell.aliases.names() {
            if let Some(value) = shell.aliases.get(&name) {
                output.push_str(&format!("alias {name}='{}'\n", value.replace('\'', "'\\''")));
            }
        }
        return out(&output);
    }
    let mut status = 0;
    let mut output = String::new();
    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) => shell.aliases.define(name, value),
            None => match shell.aliases.get(arg) {
                Some(value) => {
                    output.push_str(&format!("alias {arg}='{}'\n", value.replace('\'', "'\\''")));
                }
                None => {
                    shell.report_error(&format!("alias: {arg}: not found"));
                    status = 1;
                }
            },
        }
    }
    if !output.is_empty() {
        let _ = out(&output);
    }
    Flow::Normal(status)
}

pub fn run_unalias(shell: &mut Shell, args: &[String]) -> Flow {
    if args.first().map(String::as_str) == Some("-a") {
        shell.aliases.clear();
        return Flow::Normal(0);
    }
    if args.is_empty() {
        return fail(shell, "unalias: usage: unalias [-a] name [name ...]", 2);
    }
    let mut status = 0;
    for name in args {
        if !shell.aliases.remove(name) {
            shell.report_error(&format!("unalias: {name}: not found"));
            status = 1;
        }
    }
    Flow::Normal(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_query_remove() {
        let mut shell = Shell::new("test", false);
        run_alias(&mut shell, &["ll=ls -l".into()]);
        assert_eq!(shell.aliases.get("ll").map(String::as_str), Some("ls -l"));
        assert_eq!(run_unalias(&mut shell, &["ll".into()]), Flow::Normal(0));
        assert!(shell.aliases.get("ll").is_none());
        assert_eq!(run_unalias(&mut shell, &["ll".into()]), Flow::Normal(1));
    }

    #[test]
    fn unalias_all() {
        let mut shell = Shell::new("test", false);
        run_alias(&mut shell, &["a=1".into(), "b=2".into()]);
        run_unalias(&mut shell, &["-a".into()]);
        assert!(shell.aliases.names().is_empty());
    }
}
