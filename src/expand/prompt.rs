//! Prompt string expansion (PS1, PS2, PS3, PS4).
//!
//! Backslash escapes first (`\u`, `\h`, `\w`, `\d`, `\t`, `\$`,
//! `\!`, ...), then ordinary parameter/command/arithmetic expansion
//! of the result.

use chrono::Local;

use crate::ast::Span;
use crate::shell::Shell;

pub fn expand_prompt(shell: &mut Shell, template: &str) -> String {
    let escaped = apply_escapes(shell, template);
    // The escaped text then undergoes normal expansion.
    match crate::parser::word::parse_word(&escaped, Span::default()) {
        Ok(word) => super::expand_word_single(shell, &word).unwrap_or(escaped),
        Err(_) => escaped,
    }
}

fn apply_escapes(shell: &Shell, template: &str) -> String {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let c = chars[i + 1];
        i += 2;
        match c {
            'u' => out.push_str(&username()),
            'h' => {
                let host = hostname();
                out.push_str(host.split('.').next().unwrap_or(&host));
            }
            'H' => out.push_str(&hostname()),
            'w' => {
                let pwd = shell.get_var("PWD").unwrap_or_default();
                let home = shell.get_var("HOME").unwrap_or_default();
                if !home.is_empty() && pwd.starts_with(&home) {
                    out.push('~');
                    out.push_str(&pwd[home.len()..]);
                } else {
                    out.push_str(&pwd);
                }
            }
            'W' => {
                let pwd = shell.get_var("PWD").unwrap_or_default();
                out.push_str(pwd.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("/"));
            }
            'd' => out.push_str(&Local::now().format("%a %b %d").to_string()),
            't' => out.push_str(&Local::now().format("%H:%M:%S").to_string()),
            'T' => out.push_str(&Local::now().format("%I:%M:%S").to_string()),
            '@' => out.push_str(&Local::now().format("%I:%M %p").to_string()),
            'A' => out.push_str(&Local::now().format("%H:%M").to_string()),
            's' => out.push_str("marsh"),
            'v' | 'V' => out.push_str(env!("CARGO_PKG_VERSION")),
            '$' => out.push(if nix::unistd::geteuid().is_root() { '#' } else { '$' }),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'e' => out.push('\x1b'),
            '\\' => out.push('\\'),
            // Non-printing delimiters for line editors; dropped here.
            '[' | ']' => {}
            '0'..='7' => {
                // Octal escape, up to three digits.
                let mut value = c as u32 - '0' as u32;
                let mut taken = 1;
                while taken < 3 && i < chars.len() && ('0'..='7').contains(&chars[i]) {
                    value = value * 8 + (chars[i] as u32 - '0' as u32);
                    i += 1;
                    taken += 1;
                }
                if let Some(c) = char::from_u32(value) {
                    out.push(c);
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

fn username() -> String {
    nix::unistd::User::from_uid(nix::unistd::getuid())
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_default()
}

fn hostname() -> String {
    nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Scope;

    #[test]
    fn literal_passthrough() {
        let mut shell = Shell::new("test", false);
        assert_eq!(expand_prompt(&mut shell, "$ "), "$ ");
    }

    #[test]
    fn newline_and_backslash() {
        let mut shell = Shell::new("test", false);
        assert_eq!(expand_prompt(&mut shell, "a\\nb\\\\"), "a\nb\\");
    }

    #[test]
    fn working_directory_escape() {
        let mut shell = Shell::new("test", false);
        shell.vars.set_scalar("HOME", "/home/me".into(), Scope::Global).unwrap();
        shell.vars.set_scalar("PWD", "/home/me/src".into(), Scope::Global).unwrap();
        assert_eq!(expand_prompt(&mut shell, "\\w"), "~/src");
        assert_eq!(expand_prompt(&mut shell, "\\W"), "src");
    }

    #[test]
    fn variables_expand_in_prompt() {
        let mut shell = Shell::new("test", false);
        shell.vars.set_scalar("who", "me".into(), Scope::Global).unwrap();
        assert_eq!(expand_prompt(&mut shell, "$who> "), "me> ");
    }
}
