//! Shell pattern matching.
//!
//! Translates glob patterns (`*`, `?`, `[...]` with `[!...]` and
//! `[[:class:]]`) into anchored regexes and provides the matching
//! primitives used by `case`, `[[ == ]]`, pattern removal and
//! replacement, and pathname expansion. Patterns arrive
//! pattern-encoded: backslash-escaped characters are literal.

use regex_lite::Regex;

/// Translate one glob pattern into regex source (unanchored).
/// Invalid bracket expressions fall back to literal characters, the
/// way shells treat them.
pub fn to_regex_source(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                i += 1;
                if i < chars.len() {
                    push_literal(&mut out, chars[i]);
                    i += 1;
                } else {
                    push_literal(&mut out, '\\');
                }
            }
            '*' => {
                out.push_str(".*");
                i += 1;
            }
            '?' => {
                out.push('.');
                i += 1;
            }
            '[' => match translate_bracket(&chars, i) {
                Some((regex, next)) => {
                    out.push_str(&regex);
                    i = next;
                }
                None => {
                    push_literal(&mut out, '[');
                    i += 1;
                }
            },
            _ => {
                push_literal(&mut out, c);
                i += 1;
            }
        }
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if matches!(
        c,
        '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    ) {
        out.push('\\');
    }
    out.push(c);
}

/// Translate `[...]` starting at `open`; returns the regex fragment
/// and the index after the closing `]`.
fn translate_bracket(chars: &[char], open: usize) -> Option<(String, usize)> {
    let mut i = open + 1;
    let mut body = String::from("[");
    if matches!(chars.get(i), Some('!') | Some('^')) {
        body.push('^');
        i += 1;
    }
    // A `]` first in the set is literal.
    if chars.get(i) == Some(&']') {
        body.push_str("\\]");
        i += 1;
    }
    let mut closed = false;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ']' => {
                closed = true;
                i += 1;
                break;
            }
            '[' if chars.get(i + 1) == Some(&':') => {
                // `[:alpha:]` inside the set; the regex engine
                // understands the same syntax verbatim.
                let rest: String = chars[i..].iter().collect();
                match rest.find(":]") {
                    Some(end) => {
                        body.push_str(&rest[..end + 2]);
                        i += rest[..end + 2].chars().count();
                    }
                    None => return None,
                }
            }
            '\\' => {
                body.push('\\');
                body.push('\\');
                i += 1;
            }
            _ => {
                if matches!(c, '&' | '~') {
                    // Not special for regex-lite sets, but escaping
                    // costs nothing and avoids surprises.
                    body.push('\\');
                }
                body.push(c);
                i += 1;
            }
        }
    }
    if !closed {
        return None;
    }
    body.push(']');
    Some((body, i))
}

fn compile(source: &str, nocase: bool) -> Option<Regex> {
    let prefixed = if nocase {
        format!("(?i)^(?:{source})$")
    } else {
        format!("^(?:{source})$")
    };
    Regex::new(&prefixed).ok()
}

/// Whole-string match (for `case`, `[[ == ]]`, nullglob checks).
pub fn matches_full(pattern: &str, text: &str, nocase: bool) -> bool {
    match compile(&to_regex_source(pattern), nocase) {
        Some(regex) => regex.is_match(text),
        None => pattern == text,
    }
}

/// Remove the shortest or longest matching prefix.
pub fn strip_prefix(pattern: &str, text: &str, greedy: bool) -> String {
    let regex = match compile(&to_regex_source(pattern), false) {
        Some(regex) => regex,
        None => return text.to_string(),
    };
    let boundaries: Vec<usize> = char_boundaries(text);
    let candidates: Box<dyn Iterator<Item = &usize>> = if greedy {
        Box::new(boundaries.iter().rev())
    } else {
        Box::new(boundaries.iter())
    };
    for &end in candidates {
        if regex.is_match(&text[..end]) {
            return text[end..].to_string();
        }
    }
    text.to_string()
}

/// Remove the shortest or longest matching suffix.
pub fn strip_suffix(pattern: &str, text: &str, greedy: bool) -> String {
    let regex = match compile(&to_regex_source(pattern), false) {
        Some(regex) => regex,
        None => return text.to_string(),
    };
    let boundaries: Vec<usize> = char_boundaries(text);
    let candidates: Box<dyn Iterator<Item = &usize>> = if greedy {
        Box::new(boundaries.iter())
    } else {
        Box::new(boundaries.iter().rev())
    };
    for &start in candidates {
        if regex.is_match(&text[start..]) {
            return text[..start].to_string();
        }
    }
    text.to_string()
}

fn char_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    boundaries
}

/// `${name/pat/repl}` engine. `anchor_start`/`anchor_end` implement
/// the `/#` and `/%` forms.
pub fn replace(
    pattern: &str,
    replacement: &str,
    text: &str,
    all: bool,
    anchor_start: bool,
    anchor_end: bool,
    nocase: bool,
) -> String {
    let source = to_regex_source(pattern);
    if anchor_start {
        let regex = match compile(&source, nocase) {
            Some(_) => Regex::new(&format!(
                "{}^(?:{source})",
                if nocase { "(?i)" } else { "" }
            ))
            .ok(),
            None => None,
        };
        if let Some(regex) = regex {
            if let Some(found) = regex.find(text) {
                return format!("{replacement}{}", &text[found.end()..]);
            }
        }
        return text.to_string();
    }
    if anchor_end {
        // Longest suffix match.
        for start in char_boundaries(text) {
            if matches_full(pattern, &text[start..], nocase) {
                return format!("{}{replacement}", &text[..start]);
            }
        }
        return text.to_string();
    }

    let regex = match Regex::new(&format!("{}(?:{source})", if nocase { "(?i)" } else { "" })) {
        Ok(regex) => regex,
        Err(_) => return text.to_string(),
    };
    let mut out = String::new();
    let mut last = 0usize;
    let mut replaced = false;
    for found in regex.find_iter(text) {
        if found.start() < last {
            continue;
        }
        if replaced && !all {
            break;
        }
        // Skip empty matches to guarantee progress.
        if found.start() == found.end() {
            continue;
        }
        out.push_str(&text[last..found.start()]);
        out.push_str(replacement);
        last = found.end();
        replaced = true;
        if !all {
            break;
        }
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_and_question() {
        assert!(matches_full("a*c", "abc", false));
        assert!(matches_full("a*c", "ac", false));
        assert!(matches_full("a?c", "abc", false));
        assert!(!matches_full("a?c", "ac", false));
    }

    #[test]
    fn bracket_sets() {
        assert!(matches_full("[abc]x", "bx", false));
        assert!(!matches_full("[!abc]x", "bx", false));
        assert!(matches_full("[a-f]1", "d1", false));
        assert!(matches_full("x[[:digit:]]", "x7", false));
        assert!(!matches_full("x[[:digit:]]", "xa", false));
    }

    #[test]
    fn literal_bracket_when_unclosed() {
        assert!(matches_full("a[b", "a[b", false));
    }

    #[test]
    fn escaped_meta_literal() {
        assert!(matches_full("a\\*b", "a*b", false));
        assert!(!matches_full("a\\*b", "aXb", false));
    }

    #[test]
    fn case_insensitive() {
        assert!(matches_full("A*", "abc", true));
        assert!(!matches_full("A*", "abc", false));
    }

    #[test]
    fn prefix_strip() {
        assert_eq!(strip_prefix("*/", "a/b/c", false), "b/c");
        assert_eq!(strip_prefix("*/", "a/b/c", true), "c");
        assert_eq!(strip_prefix("x", "abc", false), "abc");
    }

    #[test]
    fn suffix_strip() {
        assert_eq!(strip_suffix(".*", "file.tar.gz", false), "file.tar");
        assert_eq!(strip_suffix(".*", "file.tar.gz", true), "file");
        assert_eq!(strip_suffix("x", "abc", true), "abc");
    }

    #[test]
    fn replacement() {
        assert_eq!(replace("o", "0", "foo", false, false, false, false), "f0o");
        assert_eq!(replace("o", "0", "foo", true, false, false, false), "f00");
        assert_eq!(
            replace("f*o", "X", "foo bar foo", false, false, false, false),
            // `*` is greedy across the whole string.
            "X"
        );
        assert_eq!(replace("ab", "X", "cab", false, true, false, false), "cab");
        assert_eq!(replace("ca", "X", "cab", false, true, false, false), "Xb");
        assert_eq!(replace("ab", "X", "cab", false, false, true, false), "cX");
    }

    #[test]
    fn deletion_with_empty_replacement() {
        assert_eq!(replace("o", "", "foo", true, false, false, false), "f");
    }
}
