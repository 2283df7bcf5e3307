//! Word parsing: raw word text into typed parts.
//!
//! The lexer hands over a word's raw text with quotes intact; this
//! module turns it into the part sequence the expansion engine
//! consumes. Nested `$(..)` bodies are re-parsed as complete scripts,
//! `$((..))` through the arithmetic parser, and `${..}` through the
//! parameter-operation parser.

use crate::ast::*;

use super::arith::parse_arithmetic;
use super::expansion::parse_braced_expansion;
use super::types::ParseError;

/// Special single-character parameters recognized after `$`.
fn is_special_param(c: char) -> bool {
    matches!(c, '@' | '*' | '#' | '?' | '-' | '$' | '!' | '0'..='9')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Context for word parsing. Assignment values honor tilde after
/// unquoted `:`; normal words only at the start.
#[derive(Clone, Copy, Default)]
pub struct WordContext {
    pub assignment_value: bool,
}

pub fn parse_word(text: &str, span: Span) -> Result<WordNode, ParseError> {
    parse_word_in(text, span, WordContext::default())
}

pub fn parse_word_in(text: &str, span: Span, ctx: WordContext) -> Result<WordNode, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut pos = 0usize;
    let mut literal = String::new();
    // Tilde candidates appear at the very start and, in assignment
    // values, right after an unquoted colon.
    let mut tilde_ok = true;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            '\'' => {
                flush_literal(&mut parts, &mut literal);
                pos += 1;
                let start = pos;
                while pos < chars.len() && chars[pos] != '\'' {
                    pos += 1;
                }
                if pos >= chars.len() {
                    return Err(ParseError::new("unterminated single quote", span.start.line, span.start.column));
                }
                parts.push(WordPart::SingleQuoted(chars[start..pos].iter().collect()));
                pos += 1;
                tilde_ok = false;
            }
            '"' => {
                flush_literal(&mut parts, &mut literal);
                let (inner, consumed) = parse_double_quoted(&chars[pos + 1..], span)?;
                parts.push(WordPart::DoubleQuoted(inner));
                pos += 1 + consumed;
                tilde_ok = false;
            }
            '\\' => {
                flush_literal(&mut parts, &mut literal);
                pos += 1;
                if pos < chars.len() {
                    parts.push(WordPart::Escaped(chars[pos].to_string()));
                    pos += 1;
                } else {
                    literal.push('\\');
                }
                tilde_ok = false;
            }
            '$' => {
                flush_literal(&mut parts, &mut literal);
                let (part, consumed) = parse_dollar(&chars[pos..], span)?;
                match part {
                    Some(part) => {
                        parts.push(part);
                        pos += consumed;
                    }
                    None => {
                        // A lone `$` stays literal.
                        literal.push('$');
                        pos += 1;
                    }
                }
                tilde_ok = false;
            }
            '`' => {
                flush_literal(&mut parts, &mut literal);
                let (part, consumed) = parse_backquoted(&chars[pos..], span)?;
                parts.push(part);
                pos += consumed;
                tilde_ok = false;
            }
            '<' | '>' if pos + 1 < chars.len() && chars[pos + 1] == '(' => {
                flush_literal(&mut parts, &mut literal);
                let close = find_balanced_paren(&chars, pos + 1).ok_or_else(|| {
                    ParseError::new("unterminated process substitution", span.start.line, span.start.column)
                })?;
                let body_text: String = chars[pos + 2..close].iter().collect();
                let body = super::parse(&body_text)?;
                parts.push(WordPart::ProcessSubstitution(ProcessSubstitutionPart {
                    body,
                    direction: if c == '<' {
                        ProcessDirection::Input
                    } else {
                        ProcessDirection::Output
                    },
                }));
                pos = close + 1;
                tilde_ok = false;
            }
            '{' => {
                if let Some((part, consumed)) = try_parse_brace(&chars[pos..], span)? {
                    flush_literal(&mut parts, &mut literal);
                    parts.push(part);
                    pos += consumed;
                } else {
                    literal.push('{');
                    pos += 1;
                }
                tilde_ok = false;
            }
            '~' if tilde_ok => {
                flush_literal(&mut parts, &mut literal);
                pos += 1;
                let start = pos;
                while pos < chars.len()
                    && chars[pos] != '/'
                    && !(ctx.assignment_value && chars[pos] == ':')
                    && (is_name_char(chars[pos]) || chars[pos] == '-' || chars[pos] == '+')
                {
                    pos += 1;
                }
                let user: String = chars[start..pos].iter().collect();
                parts.push(WordPart::Tilde(if user.is_empty() { None } else { Some(user) }));
                tilde_ok = false;
            }
            '*' | '?' | '[' => {
                // Unquoted glob metacharacters: the surrounding
                // unquoted run becomes one glob fragment.
                let mut pattern = std::mem::take(&mut literal);
                while pos < chars.len()
                    && !matches!(chars[pos], '\'' | '"' | '\\' | '$' | '`' | '{')
                    && !(ctx.assignment_value && chars[pos] == ':')
                {
                    pattern.push(chars[pos]);
                    pos += 1;
                }
                parts.push(WordPart::Glob(pattern));
                tilde_ok = false;
            }
            ':' if ctx.assignment_value => {
                literal.push(':');
                pos += 1;
                tilde_ok = true;
            }
            _ => {
                literal.push(c);
                pos += 1;
                tilde_ok = false;
            }
        }
    }
    flush_literal(&mut parts, &mut literal);
    Ok(WordNode::new(parts, span))
}

fn flush_literal(parts: &mut Vec<WordPart>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(WordPart::Literal(std::mem::take(literal)));
    }
}

/// Parse the inside of a double-quoted region; returns the inner
/// parts and the number of chars consumed including the closing `"`.
fn parse_double_quoted(chars: &[char], span: Span) -> Result<(Vec<WordPart>, usize), ParseError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut pos = 0usize;
    while pos < chars.len() {
        match chars[pos] {
            '"' => {
                flush_literal(&mut parts, &mut literal);
                return Ok((parts, pos + 1));
            }
            '\\' if pos + 1 < chars.len() => {
                let next = chars[pos + 1];
                // Inside double quotes `\` only quotes $ ` " \ and
                // newline; otherwise it stands for itself.
                if matches!(next, '$' | '`' | '"' | '\\') {
                    flush_literal(&mut parts, &mut literal);
                    parts.push(WordPart::Escaped(next.to_string()));
                    pos += 2;
                } else if next == '\n' {
                    pos += 2;
                } else {
                    literal.push('\\');
                    pos += 1;
                }
            }
            '$' => {
                flush_literal(&mut parts, &mut literal);
                let (part, consumed) = parse_dollar(&chars[pos..], span)?;
                match part {
                    Some(part) => {
                        parts.push(part);
                        pos += consumed;
                    }
                    None => {
                        literal.push('$');
                        pos += 1;
                    }
                }
            }
            '`' => {
                flush_literal(&mut parts, &mut literal);
                let (part, consumed) = parse_backquoted(&chars[pos..], span)?;
                parts.push(part);
                pos += consumed;
            }
            c => {
                literal.push(c);
                pos += 1;
            }
        }
    }
    Err(ParseError::new("unterminated double quote", span.start.line, span.start.column))
}

/// Parse a `$...` form starting at the `$`. Returns the part and the
/// chars consumed, or `None` when the `$` is literal.
pub(crate) fn parse_dollar(chars: &[char], span: Span) -> Result<(Option<WordPart>, usize), ParseError> {
    match chars.get(1) {
        Some('{') => {
            let close = find_balanced(chars, 1, '{', '}').ok_or_else(|| {
                ParseError::new("unterminated parameter expansion", span.start.line, span.start.column)
            })?;
            let inner: String = chars[2..close].iter().collect();
            let part = parse_braced_expansion(&inner, span)?;
            Ok((Some(part), close + 1))
        }
        Some('(') => {
            if chars.get(2) == Some(&'(') {
                // Candidate arithmetic `$(( ... ))`: must close with
                // adjacent `))`; otherwise it is `$( (subshell) )`.
                if let Some(close) = find_balanced_paren(chars, 1) {
                    if close >= 1 && chars.get(close - 1) == Some(&')') {
                        if let Some(inner_close) = find_balanced_paren(chars, 2) {
                            if inner_close == close - 1 {
                                let text: String = chars[3..inner_close].iter().collect();
                                let expr = parse_arithmetic(&text, span)?;
                                return Ok((Some(WordPart::Arithmetic(expr)), close + 1));
                            }
                        }
                    }
                }
            }
            let close = find_balanced_paren(chars, 1).ok_or_else(|| {
                ParseError::new("unterminated command substitution", span.start.line, span.start.column)
            })?;
            let body_text: String = chars[2..close].iter().collect();
            let body = super::parse(&body_text)?;
            Ok((
                Some(WordPart::CommandSubstitution(CommandSubstitutionPart {
                    body,
                    legacy: false,
                })),
                close + 1,
            ))
        }
        Some(&c) if is_special_param(c) => {
            let part = WordPart::Parameter(ParameterPart {
                name: c.to_string(),
                subscript: None,
                operation: None,
            });
            Ok((Some(part), 2))
        }
        Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
            let mut end = 2;
            while end < chars.len() && is_name_char(chars[end]) {
                end += 1;
            }
            let name: String = chars[1..end].iter().collect();
            Ok((
                Some(WordPart::Parameter(ParameterPart {
                    name,
                    subscript: None,
                    operation: None,
                })),
                end,
            ))
        }
        _ => Ok((None, 1)),
    }
}

/// Backtick command substitution; `\$`, `` \` ``, `\\` lose the
/// backslash before the body is re-parsed.
fn parse_backquoted(chars: &[char], span: Span) -> Result<(WordPart, usize), ParseError> {
    let mut body = String::new();
    let mut pos = 1usize;
    loop {
        match chars.get(pos) {
            Some('`') => break,
            Some('\\') => {
                match chars.get(pos + 1) {
                    Some(&c) if matches!(c, '$' | '`' | '\\') => {
                        body.push(c);
                        pos += 2;
                    }
                    Some(&c) => {
                        body.push('\\');
                        body.push(c);
                        pos += 2;
                    }
                    None => {
                        return Err(ParseError::new(
                            "unterminated backquote",
                            span.start.line,
                            span.start.column,
                        ))
                    }
                }
            }
            Some(&c) => {
                body.push(c);
                pos += 1;
            }
            None => {
                return Err(ParseError::new("unterminated backquote", span.start.line, span.start.column))
            }
        }
    }
    let script = super::parse(&body)?;
    Ok((
        WordPart::CommandSubstitution(CommandSubstitutionPart {
            body: script,
            legacy: true,
        }),
        pos + 1,
    ))
}

/// Index of the `)` matching the `(` at `open`, quote- and
/// escape-aware.
fn find_balanced_paren(chars: &[char], open: usize) -> Option<usize> {
    find_balanced(chars, open, '(', ')')
}

fn find_balanced(chars: &[char], open: usize, open_c: char, close_c: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = open;
    while pos < chars.len() {
        let c = chars[pos];
        match c {
            '\\' => {
                pos += 1;
            }
            '\'' => {
                pos += 1;
                while pos < chars.len() && chars[pos] != '\'' {
                    pos += 1;
                }
            }
            '"' => {
                pos += 1;
                while pos < chars.len() && chars[pos] != '"' {
                    if chars[pos] == '\\' {
                        pos += 1;
                    }
                    pos += 1;
                }
            }
            _ if c == open_c => depth += 1,
            _ if c == close_c => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

// =============================================================================
// BRACE EXPANSION PARSING
// =============================================================================

/// Try to parse `{...}` starting at the opening brace. Returns `None`
/// when the text is not a valid brace expansion (it then passes
/// through unchanged, per the expansion rules).
fn try_parse_brace(chars: &[char], span: Span) -> Result<Option<(WordPart, usize)>, ParseError> {
    let close = match find_matching_brace(chars) {
        Some(i) => i,
        None => return Ok(None),
    };
    let inner: Vec<char> = chars[1..close].to_vec();

    // Sequence form first: {start..end} / {start..end..incr}.
    if let Some(range) = parse_brace_range(&inner) {
        return Ok(Some((WordPart::Brace(range), close + 1)));
    }

    // List form needs at least one top-level comma.
    let elements = split_brace_list(&inner);
    match elements {
        Some(elements) => {
            let mut words = Vec::with_capacity(elements.len());
            for element in elements {
                words.push(parse_word(&element, span)?);
            }
            Ok(Some((WordPart::Brace(BracePart::List(words)), close + 1)))
        }
        None => Ok(None),
    }
}

/// Index of the `}` matching the `{` at index 0, or `None`.
fn find_matching_brace(chars: &[char]) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = 0usize;
    while pos < chars.len() {
        match chars[pos] {
            '\\' => pos += 1,
            '\'' => {
                pos += 1;
                while pos < chars.len() && chars[pos] != '\'' {
                    pos += 1;
                }
            }
            '"' => {
                pos += 1;
                while pos < chars.len() && chars[pos] != '"' {
                    if chars[pos] == '\\' {
                        pos += 1;
                    }
                    pos += 1;
                }
            }
            '$' if chars.get(pos + 1) == Some(&'{') => {
                // `${...}` braces do not participate.
                if let Some(end) = find_balanced(chars, pos + 1, '{', '}') {
                    pos = end;
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Split list-form contents on top-level commas. `None` when there is
/// no top-level comma (not a list).
fn split_brace_list(inner: &[char]) -> Option<Vec<String>> {
    let mut elements = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut pos = 0usize;
    let mut saw_comma = false;
    while pos < inner.len() {
        let c = inner[pos];
        match c {
            '\\' if pos + 1 < inner.len() => {
                current.push('\\');
                current.push(inner[pos + 1]);
                pos += 2;
                continue;
            }
            '\'' => {
                current.push(c);
                pos += 1;
                while pos < inner.len() && inner[pos] != '\'' {
                    current.push(inner[pos]);
                    pos += 1;
                }
                if pos < inner.len() {
                    current.push('\'');
                    pos += 1;
                }
                continue;
            }
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                saw_comma = true;
                elements.push(std::mem::take(&mut current));
                pos += 1;
                continue;
            }
            _ => {}
        }
        current.push(c);
        pos += 1;
    }
    if !saw_comma {
        return None;
    }
    elements.push(current);
    Some(elements)
}

/// `{start..end}` or `{start..end..incr}` with integer or single-char
/// endpoints. Zero-padding width is recorded when either endpoint has
/// a leading zero.
fn parse_brace_range(inner: &[char]) -> Option<BracePart> {
    let text: String = inner.iter().collect();
    let mut pieces = Vec::new();
    let mut rest = text.as_str();
    while let Some(idx) = rest.find("..") {
        pieces.push(&rest[..idx]);
        rest = &rest[idx + 2..];
    }
    pieces.push(rest);
    if pieces.len() != 2 && pieces.len() != 3 {
        return None;
    }

    let increment = if pieces.len() == 3 {
        match pieces[2].parse::<i64>() {
            Ok(n) => Some(n),
            Err(_) => return None,
        }
    } else {
        None
    };

    let parse_endpoint = |s: &str| -> Option<(BraceEndpoint, usize)> {
        if let Ok(n) = s.parse::<i64>() {
            let digits = s.trim_start_matches(['-', '+']);
            let padded = digits.len() > 1 && digits.starts_with('0');
            let width = if padded { digits.len() } else { 0 };
            return Some((BraceEndpoint::Number(n), width));
        }
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Some((BraceEndpoint::Char(c), 0)),
            _ => None,
        }
    };

    let (start, w1) = parse_endpoint(pieces[0])?;
    let (end, w2) = parse_endpoint(pieces[1])?;
    match (start, end) {
        (BraceEndpoint::Number(_), BraceEndpoint::Number(_)) => {}
        (BraceEndpoint::Char(_), BraceEndpoint::Char(_)) => {}
        _ => return None,
    }
    let pad_width = w1.max(w2);
    Some(BracePart::Range {
        start,
        end,
        increment,
        pad_width: if pad_width > 0 { Some(pad_width) } else { None },
    })
}

/// Parse a heredoc body into its content word. Quoted delimiters make
/// the body literal; otherwise `$`, backticks, and `\` before
/// `$ \ ` `` ` `` / newline are live, like a double-quoted context.
pub fn parse_heredoc_content(body: &str, quoted: bool, span: Span) -> Result<WordNode, ParseError> {
    if quoted {
        return Ok(WordNode::new(
            vec![WordPart::SingleQuoted(body.to_string())],
            span,
        ));
    }
    let chars: Vec<char> = body.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut pos = 0usize;
    while pos < chars.len() {
        match chars[pos] {
            '\\' if pos + 1 < chars.len() => {
                let next = chars[pos + 1];
                if matches!(next, '$' | '`' | '\\') {
                    flush_literal(&mut parts, &mut literal);
                    parts.push(WordPart::Escaped(next.to_string()));
                    pos += 2;
                } else if next == '\n' {
                    pos += 2;
                } else {
                    literal.push('\\');
                    pos += 1;
                }
            }
            '$' => {
                flush_literal(&mut parts, &mut literal);
                let (part, consumed) = parse_dollar(&chars[pos..], span)?;
                match part {
                    Some(part) => {
                        parts.push(part);
                        pos += consumed;
                    }
                    None => {
                        literal.push('$');
                        pos += 1;
                    }
                }
            }
            '`' => {
                flush_literal(&mut parts, &mut literal);
                let (part, consumed) = parse_backquoted(&chars[pos..], span)?;
                parts.push(part);
                pos += consumed;
            }
            c => {
                literal.push(c);
                pos += 1;
            }
        }
    }
    flush_literal(&mut parts, &mut literal);
    // The whole body behaves as quoted for splitting purposes.
    Ok(WordNode::new(vec![WordPart::DoubleQuoted(parts)], span))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str) -> WordNode {
        parse_word(text, Span::default()).expect("parse failure")
    }

    #[test]
    fn plain_literal() {
        let w = word("hello");
        assert_eq!(w.parts, vec![WordPart::Literal("hello".into())]);
    }

    #[test]
    fn quotes() {
        let w = word("a'b c'\"d $x\"");
        assert_eq!(w.parts.len(), 3);
        assert_eq!(w.parts[0], WordPart::Literal("a".into()));
        assert_eq!(w.parts[1], WordPart::SingleQuoted("b c".into()));
        match &w.parts[2] {
            WordPart::DoubleQuoted(inner) => {
                assert_eq!(inner[0], WordPart::Literal("d ".into()));
                assert!(matches!(&inner[1], WordPart::Parameter(p) if p.name == "x"));
            }
            other => panic!("expected double-quoted part, got {other:?}"),
        }
    }

    #[test]
    fn simple_parameter() {
        let w = word("$foo/bar");
        assert!(matches!(&w.parts[0], WordPart::Parameter(p) if p.name == "foo"));
        assert_eq!(w.parts[1], WordPart::Literal("/bar".into()));
    }

    #[test]
    fn special_parameters() {
        for (text, name) in [("$?", "?"), ("$#", "#"), ("$@", "@"), ("$1", "1")] {
            let w = word(text);
            assert!(matches!(&w.parts[0], WordPart::Parameter(p) if p.name == name));
        }
    }

    #[test]
    fn command_substitution() {
        let w = word("$(echo hi)");
        assert!(matches!(&w.parts[0], WordPart::CommandSubstitution(c) if !c.legacy));
    }

    #[test]
    fn backtick_substitution_unescapes() {
        let w = word("`echo \\$x`");
        match &w.parts[0] {
            WordPart::CommandSubstitution(c) => assert!(c.legacy),
            other => panic!("expected substitution, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_expansion() {
        let w = word("$((1 + 2))");
        assert!(matches!(&w.parts[0], WordPart::Arithmetic(_)));
    }

    #[test]
    fn subshell_in_dollar_paren_is_not_arith() {
        let w = word("$( (echo a) )");
        assert!(matches!(&w.parts[0], WordPart::CommandSubstitution(_)));
    }

    #[test]
    fn tilde_forms() {
        assert!(matches!(&word("~").parts[0], WordPart::Tilde(None)));
        assert!(matches!(&word("~/x").parts[0], WordPart::Tilde(None)));
        assert!(
            matches!(&word("~alice/x").parts[0], WordPart::Tilde(Some(u)) if u == "alice")
        );
        assert!(matches!(&word("~+").parts[0], WordPart::Tilde(Some(u)) if u == "+"));
        // Not at word start: literal.
        let w = word("a~b");
        assert_eq!(w.parts[0], WordPart::Literal("a~b".into()));
    }

    #[test]
    fn tilde_in_assignment_value_after_colon() {
        let ctx = WordContext { assignment_value: true };
        let w = parse_word_in("/bin:~/sbin", Span::default(), ctx).unwrap();
        assert!(w.parts.iter().any(|p| matches!(p, WordPart::Tilde(None))));
    }

    #[test]
    fn glob_fragment() {
        let w = word("src/*.rs");
        assert!(matches!(&w.parts[0], WordPart::Glob(p) if p == "src/*.rs"));
    }

    #[test]
    fn quoted_glob_is_not_glob() {
        let w = word("'*.rs'");
        assert_eq!(w.parts[0], WordPart::SingleQuoted("*.rs".into()));
    }

    #[test]
    fn brace_list() {
        let w = word("{a,b,c}");
        match &w.parts[0] {
            WordPart::Brace(BracePart::List(items)) => assert_eq!(items.len(), 3),
            other => panic!("expected brace list, got {other:?}"),
        }
    }

    #[test]
    fn brace_list_with_empty_elements() {
        let w = word("{,b}");
        match &w.parts[0] {
            WordPart::Brace(BracePart::List(items)) => {
                assert_eq!(items.len(), 2);
                assert!(items[0].parts.is_empty());
            }
            other => panic!("expected brace list, got {other:?}"),
        }
    }

    #[test]
    fn brace_range_padded() {
        let w = word("{01..10}");
        match &w.parts[0] {
            WordPart::Brace(BracePart::Range { pad_width, .. }) => {
                assert_eq!(*pad_width, Some(2));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn brace_without_comma_is_literal() {
        let w = word("{abc}");
        assert_eq!(w.parts, vec![WordPart::Literal("{abc}".into())]);
    }

    #[test]
    fn nested_braces() {
        let w = word("{a,{b,c}}");
        match &w.parts[0] {
            WordPart::Brace(BracePart::List(items)) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(&items[1].parts[0], WordPart::Brace(_)));
            }
            other => panic!("expected brace list, got {other:?}"),
        }
    }

    #[test]
    fn heredoc_content_expandable() {
        let w = parse_heredoc_content("line $x\n", false, Span::default()).unwrap();
        match &w.parts[0] {
            WordPart::DoubleQuoted(inner) => {
                assert!(inner.iter().any(|p| matches!(p, WordPart::Parameter(_))));
            }
            other => panic!("expected quoted body, got {other:?}"),
        }
    }

    #[test]
    fn heredoc_content_quoted_is_literal() {
        let w = parse_heredoc_content("line $x\n", true, Span::default()).unwrap();
        assert_eq!(w.parts, vec![WordPart::SingleQuoted("line $x\n".into())]);
    }

    #[test]
    fn process_substitution() {
        let w = word("<(sort file)");
        assert!(matches!(
            &w.parts[0],
            WordPart::ProcessSubstitution(p) if p.direction == ProcessDirection::Input
        ));
    }
}
