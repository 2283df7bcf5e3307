//! set — shell options and positional parameters; shopt — matching
//! options.

use crate::exec::Flow;
use crate::shell::{MatchOptions, Shell, ShellOptions};
use crate::trace::TraceFlags;

use super::{fail, out};

pub fn run_set(shell: &mut Shell, args: &[String]) -> Flow {
    if args.is_empty() {
        // Print all visible variables.
        let mut output = String::new();
        for name in shell.vars.visible_names() {
            if let Some(value) = shell.vars.get_scalar(&name) {
                output.push_str(&format!("{name}='{value}'\n"));
            }
        }
        return out(&output);
    }

    let mut index = 0usize;
    while index < args.len() {
        let arg = args[index].as_str();
        match arg {
            "--" => {
                index += 1;
                let rest: Vec<String> = args[index..].to_vec();
                shell.vars.positional_mut().params = rest;
                return Flow::Normal(0);
            }
            "-o" | "+o" => {
                let enable = arg.starts_with('-');
                index += 1;
                match args.get(index) {
                    None => {
                        // `set -o` lists option states.
                        let mut output = String::new();
                        for name in ShellOptions::NAMES {
                            let on = shell.options.get_by_name(name).unwrap_or(false);
                            output.push_str(&format!(
                                "{name}\t{}\n",
                                if on { "on" } else { "off" }
                            ));
                        }
                        for name in TraceFlags::NAMES {
                            if let Some(flag) = shell.trace.by_name(name) {
                                let on = *flag;
                                output.push_str(&format!(
                                    "{name}\t{}\n",
                                    if on { "on" } else { "off" }
                                ));
                            }
                        }
                        let _ = out(&output);
                    }
                    Some(name) => {
                        if let Some(option) = shell.options.by_name(name) {
                            *option = enable;
                        } else if let Some(flag) = shell.trace.by_name(name) {
                            *flag = enable;
                        } else {
                            return fail(shell, &format!("set: {name}: invalid option name"), 2);
                        }
                        index += 1;
                        continue;
                    }
                }
                index += 1;
            }
            _ if arg.starts_with('-') || arg.starts_with('+') => {
                let enable = arg.starts_with('-');
                if arg.len() == 1 {
                    // Bare `-` ends option processing; bare `+` is odd
                    // but harmless.
                    index += 1;
                    continue;
                }
                for flag in arg[1..].chars() {
                    match shell.options.by_flag(flag) {
                        Some(option) => *option = enable,
                        None => {
                            return fail(shell, &format!("set: -{flag}: invalid option"), 2)
                        }
                    }
                }
                index += 1;
            }
            _ => {
                // Remaining words replace the positional parameters.
                shell.vars.positional_mut().params = args[index..].to_vec();
                return Flow::Normal(0);
            }
        }
    }
    Flow::Normal(0)
}

pub fn run_shopt(shell: &mut Shell, args: &[String]) -> Flow {
    let mut mode: Option<bool> = None;
    let mut quiet = false;
    let mut operands = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-s" => mode = Some(true),
            "-u" => mode = Some(false),
            "-q" => quiet = true,
            "-p" => {}
            _ => operands.push(arg.clone()),
        }
    }

    if operands.is_empty() {
        let mut output = String::new();
        for name in MatchOptions::NAMES {
            let on = *match shell.match_opts.by_name(name) {
                Some(flag) => flag,
                None => continue,
            };
            match mode {
                Some(wanted) if on != wanted => continue,
                _ => {}
            }
            output.push_str(&format!("{name}\t{}\n", if on { "on" } else { "off" }));
        }
        return out(&output);
    }

    let mut status = 0;
    let mut output = String::new();
    for name in &operands {
        match shell.match_opts.by_name(name) {
            Some(flag) => match mode {
                Some(enable) => *flag = enable,
                None => {
                    let on = *flag;
                    if !quiet {
                        output.push_str(&format!("{name}\t{}\n", if on { "on" } else { "off" }));
                    }
                    if !on {
                        status = 1;
                    }
                }
            },
            None => {
                shell.report_error(&format!("shopt: {name}: invalid shell option name"));
                status = 1;
            }
        }
    }
    if !output.is_empty() {
        let _ = out(&output);
    }
    Flow::Normal(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_short_flags() {
        let mut shell = Shell::new("test", false);
        run_set(&mut shell, &["-eu".into()]);
        assert!(shell.options.errexit);
        assert!(shell.options.nounset);
        run_set(&mut shell, &["+e".into()]);
        assert!(!shell.options.errexit);
    }

    #[test]
    fn set_long_option() {
        let mut shell = Shell::new("test", false);
        run_set(&mut shell, &["-o".into(), "pipefail".into()]);
        assert!(shell.options.pipefail);
        run_set(&mut shell, &["+o".into(), "pipefail".into()]);
        assert!(!shell.options.pipefail);
    }

    #[test]
    fn set_positional_params() {
        let mut shell = Shell::new("test", false);
        run_set(&mut shell, &["--".into(), "a".into(), "b".into()]);
        assert_eq!(
            shell.vars.positional().params,
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn set_invalid_option_status_2() {
        let mut shell = Shell::new("test", false);
        assert_eq!(run_set(&mut shell, &["-Z".into()]), Flow::Normal(2));
    }

    #[test]
    fn shopt_toggles() {
        let mut shell = Shell::new("test", false);
        run_shopt(&mut shell, &["-s".into(), "dotglob".into()]);
        assert!(shell.match_opts.dotglob);
        run_shopt(&mut shell, &["-u".into(), "dotglob".into()]);
        assert!(!shell.match_opts.dotglob);
    }

    #[test]
    fn shopt_query_status() {
        let mut shell = Shell::new("test", false);
        shell.match_opts.globstar = true;
        assert_eq!(
            run_shopt(&mut shell, &["-q".into(), "globstar".into()]),
            Flow::Normal(0)
        );
        assert_eq!(
            run_shopt(&mut shell, &["-q".into(), "nullglob".into()]),
            Flow::Normal(1)
        );
    }
}
