//! Parsing of `${...}` parameter-expansion bodies.
//!
//! The lexer captures the braced region byte-accurately; this module
//! recognizes the operator forms: defaults, assignment, error,
//! alternative, length, pattern strip, replacement, substring, case
//! modification, indirection, key/name listing, and array subscripts.

use crate::ast::*;

use super::arith::parse_arithmetic;
use super::types::ParseError;
use super::word::parse_word;

fn bad_substitution(inner: &str, span: Span) -> ParseError {
    ParseError::new(
        format!("${{{inner}}}: bad substitution"),
        span.start.line,
        span.start.column,
    )
}

/// Parse the text between the braces of `${...}`.
pub fn parse_braced_expansion(inner: &str, span: Span) -> Result<WordPart, ParseError> {
    let chars: Vec<char> = inner.chars().collect();
    if chars.is_empty() {
        return Err(bad_substitution(inner, span));
    }

    // ${#...}: length, unless the whole body is a special parameter
    // like ${#} or an operator form like ${#-default}.
    if chars[0] == '#' && chars.len() > 1 {
        let rest: String = chars[1..].iter().collect();
        if let Some((name, subscript, remainder)) = read_parameter_name(&rest) {
            if remainder.is_empty() {
                return Ok(WordPart::Parameter(ParameterPart {
                    name,
                    subscript,
                    operation: Some(ParameterOperation::Length),
                }));
            }
        }
        // Fall through: `#` itself is the parameter (e.g. ${#:-x}).
    }

    // ${!...}: indirection, array keys, or name listing.
    if chars[0] == '!' && chars.len() > 1 {
        let rest: String = chars[1..].iter().collect();
        if let Some(prefix) = rest.strip_suffix('*') {
            if crate::parser::lexer::is_valid_name(prefix) {
                return Ok(WordPart::Parameter(ParameterPart {
                    name: prefix.to_string(),
                    subscript: None,
                    operation: Some(ParameterOperation::NamesWithPrefix { star: true }),
                }));
            }
        }
        if let Some(prefix) = rest.strip_suffix('@') {
            if crate::parser::lexer::is_valid_name(prefix) {
                return Ok(WordPart::Parameter(ParameterPart {
                    name: prefix.to_string(),
                    subscript: None,
                    operation: Some(ParameterOperation::NamesWithPrefix { star: false }),
                }));
            }
        }
        if let Some((name, subscript, remainder)) = read_parameter_name(&rest) {
            if remainder.is_empty() {
                let operation = match subscript {
                    Some(Subscript::At) => ParameterOperation::Keys { star: false },
                    Some(Subscript::Star) => ParameterOperation::Keys { star: true },
                    _ => ParameterOperation::Indirect,
                };
                let subscript = match operation {
                    ParameterOperation::Keys { .. } => None,
                    _ => subscript,
                };
                return Ok(WordPart::Parameter(ParameterPart {
                    name,
                    subscript,
                    operation: Some(operation),
                }));
            }
        }
        return Err(bad_substitution(inner, span));
    }

    let (name, subscript, remainder) =
        read_parameter_name(inner).ok_or_else(|| bad_substitution(inner, span))?;
    if remainder.is_empty() {
        return Ok(WordPart::Parameter(ParameterPart {
            name,
            subscript,
            operation: None,
        }));
    }

    let operation = parse_operation(&remainder, inner, span)?;
    Ok(WordPart::Parameter(ParameterPart {
        name,
        subscript,
        operation: Some(operation),
    }))
}

/// Read a parameter name (NAME, special char, or digits), plus an
/// optional `[subscript]`. Returns the remaining operator text.
fn read_parameter_name(text: &str) -> Option<(String, Option<Subscript>, String)> {
    let chars: Vec<char> = text.chars().collect();
    let first = *chars.first()?;
    let mut pos;
    let name: String;

    if first.is_ascii_alphabetic() || first == '_' {
        pos = 1;
        while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
            pos += 1;
        }
        name = chars[..pos].iter().collect();
    } else if first.is_ascii_digit() {
        pos = 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
        name = chars[..pos].iter().collect();
    } else if matches!(first, '@' | '*' | '#' | '?' | '-' | '$' | '!') {
        pos = 1;
        name = first.to_string();
    } else {
        return None;
    }

    let mut subscript = None;
    if pos < chars.len() && chars[pos] == '[' {
        let close = find_matching_bracket(&chars, pos)?;
        let content: String = chars[pos + 1..close].iter().collect();
        subscript = Some(match content.as_str() {
            "@" => Subscript::At,
            "*" => Subscript::Star,
            _ => Subscript::Index(content),
        });
        pos = close + 1;
    }

    let remainder: String = chars[pos..].iter().collect();
    Some((name, subscript, remainder))
}

fn find_matching_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_operation(op_text: &str, inner: &str, span: Span) -> Result<ParameterOperation, ParseError> {
    let chars: Vec<char> = op_text.chars().collect();
    let word_of = |text: &str| parse_word(text, span);

    match chars[0] {
        ':' => {
            match chars.get(1) {
                Some('-') => Ok(ParameterOperation::Default {
                    word: word_of(&op_text[2..])?,
                    check_empty: true,
                }),
                Some('=') => Ok(ParameterOperation::Assign {
                    word: word_of(&op_text[2..])?,
                    check_empty: true,
                }),
                Some('?') => Ok(ParameterOperation::Error {
                    word: if op_text.len() > 2 {
                        Some(word_of(&op_text[2..])?)
                    } else {
                        None
                    },
                    check_empty: true,
                }),
                Some('+') => Ok(ParameterOperation::Alternative {
                    word: word_of(&op_text[2..])?,
                    check_empty: true,
                }),
                _ => {
                    // ${name:offset} / ${name:offset:length}
                    let (offset_text, length_text) = split_substring(&op_text[1..]);
                    let offset = parse_arithmetic(offset_text.trim(), span)?;
                    let length = match length_text {
                        Some(text) => Some(parse_arithmetic(text.trim(), span)?),
                        None => None,
                    };
                    Ok(ParameterOperation::Substring { offset, length })
                }
            }
        }
        '-' => Ok(ParameterOperation::Default {
            word: word_of(&op_text[1..])?,
            check_empty: false,
        }),
        '=' => Ok(ParameterOperation::Assign {
            word: word_of(&op_text[1..])?,
            check_empty: false,
        }),
        '?' => Ok(ParameterOperation::Error {
            word: if op_text.len() > 1 {
                Some(word_of(&op_text[1..])?)
            } else {
                None
            },
            check_empty: false,
        }),
        '+' => Ok(ParameterOperation::Alternative {
            word: word_of(&op_text[1..])?,
            check_empty: false,
        }),
        '#' => {
            let (greedy, rest) = if chars.get(1) == Some(&'#') {
                (true, &op_text[2..])
            } else {
                (false, &op_text[1..])
            };
            Ok(ParameterOperation::RemovePattern {
                pattern: word_of(rest)?,
                suffix: false,
                greedy,
            })
        }
        '%' => {
            let (greedy, rest) = if chars.get(1) == Some(&'%') {
                (true, &op_text[2..])
            } else {
                (false, &op_text[1..])
            };
            Ok(ParameterOperation::RemovePattern {
                pattern: word_of(rest)?,
                suffix: true,
                greedy,
            })
        }
        '/' => {
            let mut rest = &op_text[1..];
            let mut all = false;
            let mut anchor = None;
            if rest.starts_with('/') {
                all = true;
                rest = &rest[1..];
            } else if rest.starts_with('#') {
                anchor = Some(ReplaceAnchor::Start);
                rest = &rest[1..];
            } else if rest.starts_with('%') {
                anchor = Some(ReplaceAnchor::End);
                rest = &rest[1..];
            }
            let (pattern_text, replacement_text) = split_replacement(rest);
            if pattern_text.is_empty() && replacement_text.is_none() {
                return Err(bad_substitution(inner, span));
            }
            Ok(ParameterOperation::Replace {
                pattern: word_of(&pattern_text)?,
                replacement: match replacement_text {
                    Some(text) => Some(word_of(&text)?),
                    None => None,
                },
                all,
                anchor,
            })
        }
        '^' => {
            let (all, rest) = if chars.get(1) == Some(&'^') {
                (true, &op_text[2..])
            } else {
                (false, &op_text[1..])
            };
            Ok(ParameterOperation::CaseModify {
                upper: true,
                all,
                pattern: if rest.is_empty() { None } else { Some(word_of(rest)?) },
            })
        }
        ',' => {
            let (all, rest) = if chars.get(1) == Some(&',') {
                (true, &op_text[2..])
            } else {
                (false, &op_text[1..])
            };
            Ok(ParameterOperation::CaseModify {
                upper: false,
                all,
                pattern: if rest.is_empty() { None } else { Some(word_of(rest)?) },
            })
        }
        _ => Err(bad_substitution(inner, span)),
    }
}

/// Split substring text on the first top-level `:` into offset and
/// optional length. Parentheses protect negative offsets.
fn split_substring(text: &str) -> (String, Option<String>) {
    let chars: Vec<char> = text.chars().collect();
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '?' if depth == 0 => {
                // A ternary inside the offset expression; `:` after
                // it belongs to the ternary, so stop splitting.
                return (text.to_string(), None);
            }
            ':' if depth == 0 => {
                return (
                    chars[..i].iter().collect(),
                    Some(chars[i + 1..].iter().collect()),
                );
            }
            _ => {}
        }
    }
    (text.to_string(), None)
}

/// Split `pat/replacement` on the first unescaped top-level `/`.
fn split_replacement(text: &str) -> (String, Option<String>) {
    let chars: Vec<char> = text.chars().collect();
    let mut depth = 0usize;
    let mut i = 0usize;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    i += 1;
                }
            }
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                return (
                    chars[..i].iter().collect(),
                    Some(chars[i + 1..].iter().collect()),
                );
            }
            _ => {}
        }
        i += 1;
    }
    (text.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(inner: &str) -> ParameterPart {
        match parse_braced_expansion(inner, Span::default()).expect("parse failure") {
            WordPart::Parameter(p) => p,
            other => panic!("expected parameter, got {other:?}"),
        }
    }

    #[test]
    fn plain_name() {
        let p = parse("HOME");
        assert_eq!(p.name, "HOME");
        assert!(p.operation.is_none());
    }

    #[test]
    fn default_value_forms() {
        let p = parse("x:-fallback");
        assert!(matches!(
            p.operation,
            Some(ParameterOperation::Default { check_empty: true, .. })
        ));
        let p = parse("x-fallback");
        assert!(matches!(
            p.operation,
            Some(ParameterOperation::Default { check_empty: false, .. })
        ));
    }

    #[test]
    fn assign_error_alternative() {
        assert!(matches!(
            parse("x:=v").operation,
            Some(ParameterOperation::Assign { .. })
        ));
        assert!(matches!(
            parse("x:?msg").operation,
            Some(ParameterOperation::Error { .. })
        ));
        assert!(matches!(
            parse("x:+alt").operation,
            Some(ParameterOperation::Alternative { .. })
        ));
    }

    #[test]
    fn length() {
        let p = parse("#var");
        assert_eq!(p.name, "var");
        assert!(matches!(p.operation, Some(ParameterOperation::Length)));
        // Array count.
        let p = parse("#arr[@]");
        assert_eq!(p.name, "arr");
        assert!(matches!(p.subscript, Some(Subscript::At)));
        assert!(matches!(p.operation, Some(ParameterOperation::Length)));
    }

    #[test]
    fn pattern_removal() {
        assert!(matches!(
            parse("x#*/").operation,
            Some(ParameterOperation::RemovePattern { suffix: false, greedy: false, .. })
        ));
        assert!(matches!(
            parse("x##*/").operation,
            Some(ParameterOperation::RemovePattern { suffix: false, greedy: true, .. })
        ));
        assert!(matches!(
            parse("x%%.c").operation,
            Some(ParameterOperation::RemovePattern { suffix: true, greedy: true, .. })
        ));
    }

    #[test]
    fn replacement() {
        match parse("x/a/b").operation {
            Some(ParameterOperation::Replace { all, anchor, replacement, .. }) => {
                assert!(!all);
                assert!(anchor.is_none());
                assert!(replacement.is_some());
            }
            other => panic!("expected replace, got {other:?}"),
        }
        assert!(matches!(
            parse("x//a/b").operation,
            Some(ParameterOperation::Replace { all: true, .. })
        ));
        assert!(matches!(
            parse("x/#a/b").operation,
            Some(ParameterOperation::Replace { anchor: Some(ReplaceAnchor::Start), .. })
        ));
        // No replacement: deletion.
        assert!(matches!(
            parse("x/a").operation,
            Some(ParameterOperation::Replace { replacement: None, .. })
        ));
    }

    #[test]
    fn substring() {
        assert!(matches!(
            parse("x:2").operation,
            Some(ParameterOperation::Substring { length: None, .. })
        ));
        assert!(matches!(
            parse("x:2:3").operation,
            Some(ParameterOperation::Substring { length: Some(_), .. })
        ));
        assert!(matches!(
            parse("x:(-3)").operation,
            Some(ParameterOperation::Substring { .. })
        ));
    }

    #[test]
    fn case_modification() {
        assert!(matches!(
            parse("x^").operation,
            Some(ParameterOperation::CaseModify { upper: true, all: false, .. })
        ));
        assert!(matches!(
            parse("x^^").operation,
            Some(ParameterOperation::CaseModify { upper: true, all: true, .. })
        ));
        assert!(matches!(
            parse("x,,").operation,
            Some(ParameterOperation::CaseModify { upper: false, all: true, .. })
        ));
    }

    #[test]
    fn indirection_and_listing() {
        assert!(matches!(parse("!ref").operation, Some(ParameterOperation::Indirect)));
        assert!(matches!(
            parse("!arr[@]").operation,
            Some(ParameterOperation::Keys { star: false })
        ));
        assert!(matches!(
            parse("!pre*").operation,
            Some(ParameterOperation::NamesWithPrefix { star: true })
        ));
        assert!(matches!(
            parse("!pre@").operation,
            Some(ParameterOperation::NamesWithPrefix { star: false })
        ));
    }

    #[test]
    fn array_subscripts() {
        let p = parse("arr[3]");
        assert!(matches!(p.subscript, Some(Subscript::Index(ref s)) if s == "3"));
        let p = parse("arr[@]");
        assert!(matches!(p.subscript, Some(Subscript::At)));
        let p = parse("arr[@]:1:2");
        assert!(matches!(p.operation, Some(ParameterOperation::Substring { .. })));
    }

    #[test]
    fn special_params() {
        assert_eq!(parse("@").name, "@");
        assert_eq!(parse("12").name, "12");
        assert_eq!(parse("#").name, "#");
    }

    #[test]
    fn bad_substitution_rejected() {
        assert!(parse_braced_expansion("x~y", Span::default()).is_err());
        assert!(parse_braced_expansion("", Span::default()).is_err());
    }
}
