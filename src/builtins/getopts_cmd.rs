//! getopts — POSIX option parsing over the positional parameters,
//! driving OPTIND/OPTARG/OPTERR.

use crate::exec::Flow;
use crate::shell::{Scope, Shell};

use super::fail;

pub fn run(shell: &mut Shell, args: &[String]) -> Flow {
    let (Some(optstring), Some(var_name)) = (args.first(), args.get(1)) else {
        return fail(shell, "getopts: usage: getopts optstring name [args]", 2);
    };
    let silent = optstring.starts_with(':');
    let spec: Vec<char> = optstring.trim_start_matches(':').chars().collect();
    let opterr = shell
        .get_var("OPTERR")
        .map(|v| v != "0")
        .unwrap_or(true)
        && !silent;

    // Operands default to the positional parameters.
    let words: Vec<String> = if args.len() > 2 {
        args[2..].to_vec()
    } else {
        shell.vars.positional().params.clone()
    };

    let mut optind = shell
        .get_var("OPTIND")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1);
    // Sub-position within a bundled option word, carried in the
    // upper digits the way the option index is conventionally packed.
    let mut subindex = shell
        .get_var("MARSH_OPTPOS")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1);

    let finish = |shell: &mut Shell, optind: usize, subindex: usize, name_value: (char, String), status: i32| {
        let _ = shell
            .vars
            .set_scalar("OPTIND", optind.to_string(), Scope::Global);
        let _ = shell
            .vars
            .set_scalar("MARSH_OPTPOS", subindex.to_string(), Scope::Global);
        let (opt, optarg) = name_value;
        let _ = shell
            .vars
            .set_scalar(var_name, opt.to_string(), Scope::Nearest);
        if optarg.is_empty() {
            let _ = shell.vars.unset("OPTARG");
        } else {
            let _ = shell.vars.set_scalar("OPTARG", optarg, Scope::Global);
        }
        Flow::Normal(status)
    };

    let current = match words.get(optind.wrapping_sub(1)) {
        Some(word) => word.clone(),
        None => return finish(shell, optind, 1, ('?', String::new()), 1),
    };
    if current == "--" {
        return finish(shell, optind + 1, 1, ('?', String::new()), 1);
    }
    if !current.starts_with('-') || current == "-" {
        return finish(shell, optind, 1, ('?', String::new()), 1);
    }

    let opt_chars: Vec<char> = current[1..].chars().collect();
    let opt = match opt_chars.get(subindex - 1) {
        Some(c) => *c,
        None => return finish(shell, optind + 1, 1, ('?', String::new()), 1),
    };

    let spec_index = spec.iter().position(|c| *c == opt);
    let takes_arg = spec_index
        .map(|i| spec.get(i + 1) == Some(&':'))
        .unwrap_or(false);

    if spec_index.is_none() || opt == ':' {
        if opterr {
            shell.report_error(&format!("getopts: illegal option -- {opt}"));
        }
        let (next_ind, next_sub) = advance(&opt_chars, optind, subindex);
        let optarg = if silent { opt.to_string() } else { String::new() };
        return finish(shell, next_ind, next_sub, ('?', optarg), 0);
    }

    if takes_arg {
        // Argument is the rest of this word or the next word.
        let rest: String = opt_chars[subindex..].iter().collect();
        if !rest.is_empty() {
            return finish(shell, optind + 1, 1, (opt, rest), 0);
        }
        match words.get(optind) {
            Some(arg) => finish(shell, optind + 2, 1, (opt, arg.clone()), 0),
            None => {
                if silent {
                    finish(shell, optind + 1, 1, (':', opt.to_string()), 0)
                } else {
                    if opterr {
                        shell.report_error(&format!(
                            "getopts: option requires an argument -- {opt}"
                        ));
                    }
                    finish(shell, optind + 1, 1, ('?', String::new()), 0)
                }
            }
        }
    } else {
        let (next_ind, next_sub) = advance(&opt_chars, optind, subindex);
        finish(shell, next_ind, next_sub, (opt, String::new()), 0)
    }
}

fn advance(opt_chars: &[char], optind: usize, subindex: usize) -> (usize, usize) {
    if subindex < opt_chars.len() {
        (optind, subindex + 1)
    } else {
        (optind + 1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn getopts(shell: &mut Shell, optstring: &str, args: &[&str]) -> (i32, String, String) {
        let mut argv = vec![optstring.to_string(), "opt".to_string()];
        argv.extend(args.iter().map(|s| s.to_string()));
        let flow = run(shell, &argv);
        let status = match flow {
            Flow::Normal(s) => s,
            other => panic!("unexpected flow {other:?}"),
        };
        (
            status,
            shell.get_var("opt").unwrap_or_default(),
            shell.get_var("OPTARG").unwrap_or_default(),
        )
    }

    #[test]
    fn parses_simple_options() {
        let mut shell = Shell::new("test", false);
        let (status, opt, _) = getopts(&mut shell, "ab", &["-a", "-b"]);
        assert_eq!((status, opt.as_str()), (0, "a"));
        let (status, opt, _) = getopts(&mut shell, "ab", &["-a", "-b"]);
        assert_eq!((status, opt.as_str()), (0, "b"));
        let (status, _, _) = getopts(&mut shell, "ab", &["-a", "-b"]);
        assert_eq!(status, 1);
    }

    #[test]
    fn option_with_argument() {
        let mut shell = Shell::new("test", false);
        let (status, opt, arg) = getopts(&mut shell, "f:", &["-f", "file.txt"]);
        assert_eq!((status, opt.as_str(), arg.as_str()), (0, "f", "file.txt"));
    }

    #[test]
    fn attached_argument() {
        let mut shell = Shell::new("test", false);
        let (status, opt, arg) = getopts(&mut shell, "f:", &["-fvalue"]);
        assert_eq!((status, opt.as_str(), arg.as_str()), (0, "f", "value"));
    }

    #[test]
    fn bundled_options() {
        let mut shell = Shell::new("test", false);
        let (_, opt, _) = getopts(&mut shell, "ab", &["-ab"]);
        assert_eq!(opt, "a");
        let (_, opt, _) = getopts(&mut shell, "ab", &["-ab"]);
        assert_eq!(opt, "b");
    }

    #[test]
    fn unknown_option_sets_question_mark() {
        let mut shell = Shell::new("test", false);
        let (status, opt, _) = getopts(&mut shell, "a", &["-z"]);
        assert_eq!((status, opt.as_str()), (0, "?"));
    }

    #[test]
    fn stops_at_double_dash() {
        let mut shell = Shell::new("test", false);
        let (status, _, _) = getopts(&mut shell, "a", &["--", "-a"]);
        assert_eq!(status, 1);
    }
}
