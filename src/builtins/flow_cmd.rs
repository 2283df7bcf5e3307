//! Control-flow builtins: break, continue, return, exit, shift.

use crate::exec::Flow;
use crate::shell::Shell;

use super::fail;

fn count_arg(args: &[String]) -> Result<u32, String> {
    match args.first() {
        None => Ok(1),
        Some(text) => match text.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(n as u32),
            Ok(_) => Err(format!("{text}: loop count out of range")),
            Err(_) => Err(format!("{text}: numeric argument required")),
        },
    }
}

pub fn run_break(shell: &mut Shell, args: &[String]) -> Flow {
    if shell.loop_depth == 0 {
        return fail(shell, "break: only meaningful in a loop", 0);
    }
    match count_arg(args) {
        Ok(n) => Flow::Break(n.min(shell.loop_depth as u32)),
        Err(message) => fail(shell, &format!("break: {message}"), 1),
    }
}

pub fn run_continue(shell: &mut Shell, args: &[String]) -> Flow {
    if shell.loop_depth == 0 {
        return fail(shell, "continue: only meaningful in a loop", 0);
    }
    match count_arg(args) {
        Ok(n) => Flow::Continue(n.min(shell.loop_depth as u32)),
        Err(message) => fail(shell, &format!("continue: {message}"), 1),
    }
}

pub fn run_return(shell: &mut Shell, args: &[String]) -> Flow {
    if shell.func_depth == 0 && shell.dot_depth == 0 {
        return fail(
            shell,
            "return: can only `return' from a function or sourced script",
            1,
        );
    }
    let status = match args.first() {
        None => shell.last_status,
        Some(text) => match text.parse::<i32>() {
            Ok(n) => n & 0xff,
            Err(_) => return fail(shell, &format!("return: {text}: numeric argument required"), 2),
        },
    };
    Flow::Return(status)
}

pub fn run_exit(shell: &mut Shell, args: &[String]) -> Flow {
    let status = match args.first() {
        None => shell.last_status,
        Some(text) => match text.parse::<i32>() {
            Ok(n) => n & 0xff,
            Err(_) => {
                shell.report_error(&format!("exit: {text}: numeric argument required"));
                2
            }
        },
    };
    Flow::Exit(status)
}

pub fn run_shift(shell: &mut Shell, args: &[String]) -> Flow {
    let n = match args.first() {
        None => 1usize,
        Some(text) => match text.parse::<usize>() {
            Ok(n) => n,
            Err(_) => return fail(shell, &format!("shift: {text}: numeric argument required"), 1),
        },
    };
    let params = &mut shell.vars.positional_mut().params;
    if n > params.len() {
        return Flow::Normal(1);
    }
    params.drain(..n);
    Flow::Normal(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_drops_leading_params() {
        let mut shell = Shell::new("test", false);
        shell.vars.positional_mut().params =
            vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(run_shift(&mut shell, &[]), Flow::Normal(0));
        assert_eq!(shell.vars.positional().params, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(run_shift(&mut shell, &["2".into()]), Flow::Normal(0));
        assert!(shell.vars.positional().params.is_empty());
    }

    #[test]
    fn shift_too_far_fails() {
        let mut shell = Shell::new("test", false);
        shell.vars.positional_mut().params = vec!["a".into()];
        assert_eq!(run_shift(&mut shell, &["5".into()]), Flow::Normal(1));
        assert_eq!(shell.vars.positional().params.len(), 1);
    }

    #[test]
    fn break_outside_loop_is_harmless() {
        let mut shell = Shell::new("test", false);
        assert_eq!(run_break(&mut shell, &[]), Flow::Normal(0));
    }

    #[test]
    fn break_clamps_to_loop_depth() {
        let mut shell = Shell::new("test", false);
        shell.loop_depth = 2;
        assert_eq!(run_break(&mut shell, &["7".into()]), Flow::Break(2));
    }

    #[test]
    fn exit_uses_last_status() {
        let mut shell = Shell::new("test", false);
        shell.last_status = 3;
        assert_eq!(run_exit(&mut shell, &[]), Flow::Exit(3));
        assert_eq!(run_exit(&mut shell, &["42".into()]), Flow::Exit(42));
    }

    #[test]
    fn return_outside_function_fails() {
        let mut shell = Shell::new("test", false);
        assert_eq!(run_return(&mut shell, &[]), Flow::Normal(1));
        shell.func_depth = 1;
        assert_eq!(run_return(&mut shell, &["5".into()]), Flow::Return(5));
    }
}
