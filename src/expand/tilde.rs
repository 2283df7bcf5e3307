//! Tilde expansion.

use crate::shell::Shell;

/// Resolve a tilde prefix. `None` user is plain `~`; `+` and `-` map
/// to PWD/OLDPWD; anything else is a login name looked up through the
/// OS. Unresolvable forms fall back to their literal spelling.
pub fn expand_tilde(shell: &Shell, user: Option<&str>) -> String {
    match user {
        None => shell
            .get_var("HOME")
            .or_else(home_of_current_user)
            .unwrap_or_else(|| "~".to_string()),
        Some("+") => shell.get_var("PWD").unwrap_or_else(|| "~+".to_string()),
        Some("-") => shell.get_var("OLDPWD").unwrap_or_else(|| "~-".to_string()),
        Some(name) => match nix::unistd::User::from_name(name) {
            Ok(Some(user)) => user.dir.to_string_lossy().to_string(),
            _ => format!("~{name}"),
        },
    }
}

fn home_of_current_user() -> Option<String> {
    nix::unistd::User::from_uid(nix::unistd::getuid())
        .ok()
        .flatten()
        .map(|u| u.dir.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tilde_uses_home() {
        let mut shell = Shell::new("test", false);
        let _ = shell
            .vars
            .set_scalar("HOME", "/home/me".into(), crate::shell::Scope::Global);
        assert_eq!(expand_tilde(&shell, None), "/home/me");
    }

    #[test]
    fn pwd_and_oldpwd() {
        let mut shell = Shell::new("test", false);
        let _ = shell
            .vars
            .set_scalar("PWD", "/work".into(), crate::shell::Scope::Global);
        let _ = shell
            .vars
            .set_scalar("OLDPWD", "/prev".into(), crate::shell::Scope::Global);
        assert_eq!(expand_tilde(&shell, Some("+")), "/work");
        assert_eq!(expand_tilde(&shell, Some("-")), "/prev");
    }

    #[test]
    fn unknown_user_stays_literal() {
        let shell = Shell::new("test", false);
        assert_eq!(
            expand_tilde(&shell, Some("no-such-user-here")),
            "~no-such-user-here"
        );
    }
}
