//! cd — change the working directory, maintaining PWD and OLDPWD.

use crate::exec::Flow;
use crate::shell::{Scope, Shell};

use super::{fail, out};

pub fn run(shell: &mut Shell, args: &[String]) -> Flow {
    let mut print_target = false;
    let target = match args.first().map(String::as_str) {
        None | Some("--") => match shell.get_var("HOME") {
            Some(home) if !home.is_empty() => home,
            _ => return fail(shell, "cd: HOME not set", 1),
        },
        Some("-") => match shell.get_var("OLDPWD") {
            Some(oldpwd) => {
                print_target = true;
                oldpwd
            }
            None => return fail(shell, "cd: OLDPWD not set", 1),
        },
        Some(dir) => dir.to_string(),
    };

    let previous = shell
        .get_var("PWD")
        .or_else(|| {
            std::env::current_dir()
                .ok()
                .map(|p| p.to_string_lossy().to_string())
        })
        .unwrap_or_default();

    if let Err(e) = std::env::set_current_dir(&target) {
        return fail(shell, &format!("cd: {target}: {}", io_reason(&e)), 1);
    }
    let resolved = std::env::current_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or(target);

    let _ = shell.vars.set_scalar("OLDPWD", previous, Scope::Global);
    let _ = shell.vars.set_scalar("PWD", resolved.clone(), Scope::Global);
    if print_target {
        return out(&format!("{resolved}\n"));
    }
    Flow::Normal(0)
}

fn io_reason(e: &std::io::Error) -> String {
    match e.raw_os_error() {
        Some(code) => nix::errno::Errno::from_i32(code).desc().to_string(),
        None => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cd_updates_pwd_and_oldpwd() {
        let tmp = tempfile::tempdir().unwrap();
        let mut shell = Shell::new("test", false);
        let before = shell.get_var("PWD").unwrap_or_default();
        let flow = run(&mut shell, &[tmp.path().to_string_lossy().to_string()]);
        assert_eq!(flow, Flow::Normal(0));
        assert_eq!(shell.get_var("OLDPWD").unwrap_or_default(), before);
        assert!(shell.get_var("PWD").unwrap_or_default().contains(
            tmp.path().file_name().unwrap().to_str().unwrap()
        ));
    }

    #[test]
    fn cd_missing_dir_fails() {
        let mut shell = Shell::new("test", false);
        let flow = run(&mut shell, &["/no/such/dir/anywhere".to_string()]);
        assert_eq!(flow, Flow::Normal(1));
    }
}
