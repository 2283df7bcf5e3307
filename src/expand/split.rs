//! IFS-based field splitting.

/// Result of splitting one expansion's text: the fields plus whether
/// the text began/ended with a delimiter (the joins with adjacent
/// word material depend on it).
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub fields: Vec<String>,
    pub leading_delim: bool,
    pub trailing_delim: bool,
}

fn is_ifs_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

/// Split per POSIX: runs of IFS whitespace are one delimiter and
/// never create empty fields; each non-whitespace IFS character
/// delimits, with adjacent occurrences producing empty fields. A
/// single terminating delimiter is ignored.
pub fn split_fields(text: &str, ifs: &str) -> SplitResult {
    if ifs.is_empty() || text.is_empty() {
        return SplitResult {
            fields: if text.is_empty() { vec![] } else { vec![text.to_string()] },
            leading_delim: false,
            trailing_delim: false,
        };
    }

    let ws: Vec<char> = ifs.chars().filter(|c| is_ifs_whitespace(*c)).collect();
    let hard: Vec<char> = ifs.chars().filter(|c| !is_ifs_whitespace(*c)).collect();
    let chars: Vec<char> = text.chars().collect();

    let leading_delim = ifs.contains(chars[0]);
    let trailing_delim = ifs.contains(chars[chars.len() - 1]);

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_field = false;
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if ws.contains(&c) {
            // Consume the whitespace run plus at most one hard
            // delimiter nested in it.
            let mut saw_hard = false;
            while i < chars.len() {
                if ws.contains(&chars[i]) {
                    i += 1;
                } else if !saw_hard && hard.contains(&chars[i]) {
                    saw_hard = true;
                    i += 1;
                } else {
                    break;
                }
            }
            if in_field {
                fields.push(std::mem::take(&mut current));
                in_field = false;
            } else if saw_hard {
                // Leading whitespace then a hard delimiter: an empty
                // field terminates here only if the hard delimiter
                // opened one, which it does when nothing preceded.
                fields.push(String::new());
            }
        } else if hard.contains(&c) {
            // A hard delimiter always terminates a field, empty or
            // not.
            fields.push(std::mem::take(&mut current));
            in_field = false;
            i += 1;
            // Swallow surrounding whitespace.
            while i < chars.len() && ws.contains(&chars[i]) {
                i += 1;
            }
        } else {
            current.push(c);
            in_field = true;
            i += 1;
        }
    }
    if in_field {
        fields.push(current);
    }

    SplitResult {
        fields,
        leading_delim,
        trailing_delim,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str, ifs: &str) -> Vec<String> {
        split_fields(text, ifs).fields
    }

    #[test]
    fn default_ifs_whitespace() {
        assert_eq!(fields("a b  c", " \t\n"), vec!["a", "b", "c"]);
        assert_eq!(fields("  a  ", " \t\n"), vec!["a"]);
        assert_eq!(fields("   ", " \t\n"), Vec::<String>::new());
    }

    #[test]
    fn hard_delimiters_make_empty_fields() {
        assert_eq!(fields("a::b:c", ":"), vec!["a", "", "b", "c"]);
        assert_eq!(fields(":a", ":"), vec!["", "a"]);
    }

    #[test]
    fn trailing_hard_delimiter_ignored() {
        assert_eq!(fields("a:", ":"), vec!["a"]);
        assert_eq!(fields("a::", ":"), vec!["a", ""]);
    }

    #[test]
    fn mixed_whitespace_and_hard() {
        assert_eq!(fields("a : b", ": "), vec!["a", "b"]);
        assert_eq!(fields("a :: b", ": "), vec!["a", "", "b"]);
        assert_eq!(fields(" : a", ": "), vec!["", "a"]);
    }

    #[test]
    fn delimiter_flags() {
        let r = split_fields(":x:", ":");
        assert!(r.leading_delim);
        assert!(r.trailing_delim);
        let r = split_fields("x", ":");
        assert!(!r.leading_delim);
        assert!(!r.trailing_delim);
    }

    #[test]
    fn empty_ifs_no_split() {
        assert_eq!(fields("a b c", ""), vec!["a b c"]);
    }
}
