//! History expansion: event designators, applied to interactive
//! input before lexing.
//!
//! Supported designators: `!!`, `!N`, `!-N`, `!prefix`, `!?substr?`.
//! No expansion inside single quotes; inside double quotes a `!`
//! expands unless the next character cannot start a designator.

/// Expand designators against the history list (oldest first).
/// Returns the expanded line and whether anything changed; an
/// unresolvable event is an error, like `bash: !x: event not found`.
pub fn expand_history(line: &str, history: &[String]) -> Result<(String, bool), String> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut changed = false;
    let mut i = 0usize;
    let mut in_single = false;
    let mut in_double = false;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                out.push(c);
                i += 1;
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(c);
                i += 1;
            }
            '\\' if !in_single && i + 1 < chars.len() => {
                out.push(c);
                out.push(chars[i + 1]);
                i += 2;
            }
            '!' if !in_single => {
                let next = chars.get(i + 1).copied();
                if !can_start_designator(next) {
                    out.push(c);
                    i += 1;
                    continue;
                }
                let (replacement, consumed) = resolve_designator(&chars[i..], history)?;
                out.push_str(&replacement);
                changed = true;
                i += consumed;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok((out, changed))
}

fn can_start_designator(next: Option<char>) -> bool {
    match next {
        Some('!') | Some('?') | Some('-') => true,
        Some(c) if c.is_ascii_digit() || c.is_ascii_alphabetic() => true,
        _ => false,
    }
}

/// Resolve one designator starting at the `!`; returns the
/// replacement text and chars consumed.
fn resolve_designator(chars: &[char], history: &[String]) -> Result<(String, usize), String> {
    match chars.get(1) {
        Some('!') => {
            let last = history
                .last()
                .ok_or_else(|| "!!: event not found".to_string())?;
            Ok((last.clone(), 2))
        }
        Some('?') => {
            // !?substr? — closing ? optional at end of line.
            let mut end = 2;
            while end < chars.len() && chars[end] != '?' {
                end += 1;
            }
            let needle: String = chars[2..end].iter().collect();
            let consumed = if end < chars.len() { end + 1 } else { end };
            let found = history
                .iter()
                .rev()
                .find(|entry| entry.contains(&needle))
                .ok_or_else(|| format!("!?{needle}?: event not found"))?;
            Ok((found.clone(), consumed))
        }
        Some('-') => {
            let mut end = 2;
            while end < chars.len() && chars[end].is_ascii_digit() {
                end += 1;
            }
            let digits: String = chars[2..end].iter().collect();
            let back: usize = digits
                .parse()
                .map_err(|_| format!("!-{digits}: event not found"))?;
            let entry = (back >= 1)
                .then(|| history.len().checked_sub(back))
                .flatten()
                .and_then(|i| history.get(i))
                .ok_or_else(|| format!("!-{digits}: event not found"))?;
            Ok((entry.clone(), end))
        }
        Some(c) if c.is_ascii_digit() => {
            let mut end = 1;
            while end < chars.len() && chars[end].is_ascii_digit() {
                end += 1;
            }
            let digits: String = chars[1..end].iter().collect();
            let n: usize = digits
                .parse()
                .map_err(|_| format!("!{digits}: event not found"))?;
            let entry = n
                .checked_sub(1)
                .and_then(|i| history.get(i))
                .ok_or_else(|| format!("!{digits}: event not found"))?;
            Ok((entry.clone(), end))
        }
        Some(c) if c.is_ascii_alphabetic() => {
            let mut end = 1;
            while end < chars.len()
                && (chars[end].is_ascii_alphanumeric() || chars[end] == '_' || chars[end] == '-')
            {
                end += 1;
            }
            let prefix: String = chars[1..end].iter().collect();
            let found = history
                .iter()
                .rev()
                .find(|entry| entry.starts_with(&prefix))
                .ok_or_else(|| format!("!{prefix}: event not found"))?;
            Ok((found.clone(), end))
        }
        _ => Ok(("!".to_string(), 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<String> {
        vec![
            "echo first".to_string(),
            "ls -l /tmp".to_string(),
            "make test".to_string(),
        ]
    }

    #[test]
    fn bang_bang() {
        let (line, changed) = expand_history("!!", &history()).unwrap();
        assert_eq!(line, "make test");
        assert!(changed);
    }

    #[test]
    fn numbered_event() {
        let (line, _) = expand_history("!1", &history()).unwrap();
        assert_eq!(line, "echo first");
        let (line, _) = expand_history("!-2", &history()).unwrap();
        assert_eq!(line, "ls -l /tmp");
    }

    #[test]
    fn prefix_and_substring() {
        let (line, _) = expand_history("!ls", &history()).unwrap();
        assert_eq!(line, "ls -l /tmp");
        let (line, _) = expand_history("!?test?", &history()).unwrap();
        assert_eq!(line, "make test");
    }

    #[test]
    fn embedded_in_command() {
        let (line, _) = expand_history("sudo !!", &history()).unwrap();
        assert_eq!(line, "sudo make test");
    }

    #[test]
    fn single_quotes_suppress() {
        let (line, changed) = expand_history("echo '!!'", &history()).unwrap();
        assert_eq!(line, "echo '!!'");
        assert!(!changed);
    }

    #[test]
    fn double_quotes_expand() {
        let (line, changed) = expand_history("echo \"!!\"", &history()).unwrap();
        assert_eq!(line, "echo \"make test\"");
        assert!(changed);
    }

    #[test]
    fn bare_bang_passes_through() {
        let (line, changed) = expand_history("echo a ! b", &history()).unwrap();
        assert_eq!(line, "echo a ! b");
        assert!(!changed);
        let (line, _) = expand_history("[[ ! -f x ]]", &history()).unwrap();
        assert_eq!(line, "[[ ! -f x ]]");
    }

    #[test]
    fn unknown_event_is_error() {
        assert!(expand_history("!zzz", &history()).is_err());
        assert!(expand_history("!!", &[]).is_err());
    }
}
