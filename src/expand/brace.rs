//! Brace expansion: the first stage, purely textual.
//!
//! `{a,b,c}` lists (nesting, empty elements) and `{x..y[..incr]}`
//! sequences, with zero-padding when an endpoint carries a leading
//! zero and descending iteration for reversed ranges. One word in,
//! many words out; every later stage runs per generated word.

use crate::ast::*;

/// Expand every brace part in the word, producing the cartesian
/// product of alternatives in order.
pub fn expand_braces(word: &WordNode) -> Vec<WordNode> {
    // Alternatives per part position.
    let mut alternatives: Vec<Vec<Vec<WordPart>>> = Vec::with_capacity(word.parts.len());
    for part in &word.parts {
        match part {
            WordPart::Brace(BracePart::List(elements)) => {
                let mut options: Vec<Vec<WordPart>> = Vec::new();
                for element in elements {
                    // Nested braces inside an element multiply too.
                    for expanded in expand_braces(element) {
                        options.push(expanded.parts);
                    }
                }
                alternatives.push(options);
            }
            WordPart::Brace(BracePart::Range {
                start,
                end,
                increment,
                pad_width,
            }) => {
                let items = expand_range(*start, *end, *increment, *pad_width);
                alternatives.push(items.into_iter().map(|s| vec![WordPart::Literal(s)]).collect());
            }
            other => alternatives.push(vec![vec![other.clone()]]),
        }
    }

    let mut results: Vec<Vec<WordPart>> = vec![Vec::new()];
    for options in alternatives {
        let mut next = Vec::with_capacity(results.len() * options.len());
        for prefix in &results {
            for option in &options {
                let mut combined = prefix.clone();
                combined.extend(option.iter().cloned());
                next.push(combined);
            }
        }
        results = next;
    }

    results
        .into_iter()
        .map(|parts| WordNode::new(parts, word.span))
        .collect()
}

fn expand_range(
    start: BraceEndpoint,
    end: BraceEndpoint,
    increment: Option<i64>,
    pad_width: Option<usize>,
) -> Vec<String> {
    match (start, end) {
        (BraceEndpoint::Number(a), BraceEndpoint::Number(b)) => {
            let step = increment.map(i64::abs).filter(|s| *s != 0).unwrap_or(1);
            let mut out = Vec::new();
            let mut current = a;
            if a <= b {
                while current <= b {
                    out.push(format_number(current, pad_width));
                    current += step;
                }
            } else {
                while current >= b {
                    out.push(format_number(current, pad_width));
                    current -= step;
                }
            }
            out
        }
        (BraceEndpoint::Char(a), BraceEndpoint::Char(b)) => {
            let step = increment.map(i64::abs).filter(|s| *s != 0).unwrap_or(1) as u32;
            let (a, b) = (a as u32, b as u32);
            let mut out = Vec::new();
            if a <= b {
                let mut current = a;
                while current <= b {
                    if let Some(c) = char::from_u32(current) {
                        out.push(c.to_string());
                    }
                    current += step;
                }
            } else {
                let mut current = a;
                loop {
                    if let Some(c) = char::from_u32(current) {
                        out.push(c.to_string());
                    }
                    if current < b + step {
                        break;
                    }
                    current -= step;
                }
            }
            out
        }
        // The parser rejects mixed endpoints.
        _ => Vec::new(),
    }
}

fn format_number(n: i64, pad_width: Option<usize>) -> String {
    match pad_width {
        Some(width) => {
            if n < 0 {
                format!("-{:0width$}", -n, width = width.saturating_sub(1))
            } else {
                format!("{n:0width$}")
            }
        }
        None => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::printer::describe_word;
    use crate::parser::word::parse_word;

    fn expand(text: &str) -> Vec<String> {
        let word = parse_word(text, Span::default()).expect("parse failure");
        expand_braces(&word).iter().map(describe_word).collect()
    }

    #[test]
    fn simple_list() {
        assert_eq!(expand("{a,b,c}"), vec!["a", "b", "c"]);
    }

    #[test]
    fn preamble_and_postscript() {
        assert_eq!(expand("x{a,b}y"), vec!["xay", "xby"]);
    }

    #[test]
    fn product_of_two_groups() {
        assert_eq!(expand("{a,b}{1,2}"), vec!["a1", "a2", "b1", "b2"]);
    }

    #[test]
    fn empty_elements() {
        assert_eq!(expand("a{,b}"), vec!["a", "ab"]);
    }

    #[test]
    fn nested() {
        assert_eq!(expand("{a,{b,c}}"), vec!["a", "b", "c"]);
    }

    #[test]
    fn numeric_range() {
        assert_eq!(expand("{1..4}"), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn reverse_range() {
        assert_eq!(expand("{3..1}"), vec!["3", "2", "1"]);
    }

    #[test]
    fn range_with_increment() {
        assert_eq!(expand("{1..10..3}"), vec!["1", "4", "7", "10"]);
    }

    #[test]
    fn zero_padded_range() {
        assert_eq!(expand("{08..10}"), vec!["08", "09", "10"]);
    }

    #[test]
    fn char_range() {
        assert_eq!(expand("{a..e}"), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(expand("{c..a}"), vec!["c", "b", "a"]);
    }

    #[test]
    fn variable_preserved_inside_elements() {
        // Brace expansion precedes parameter expansion: {a,b}$v keeps
        // the parameter part in every generated word.
        assert_eq!(expand("{a,b}$v"), vec!["a${v}", "b${v}"]);
    }

    #[test]
    fn plain_word_unchanged() {
        assert_eq!(expand("plain"), vec!["plain"]);
    }
}
