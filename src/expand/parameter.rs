//! Parameter expansion: `$name`, `${name}`, and every operator form,
//! including special parameters and arrays.

use crate::ast::*;
use crate::shell::{Scope, Shell, Value};

use super::glob;
use super::{ExpandError, Piece};

/// The resolved value of a parameter before operators apply.
enum ParamValue {
    /// Scalar-like; `None` is unset.
    Single(Option<String>),
    /// `$@` / `$*` / `${arr[@]}` / `${arr[*]}`; `star` selects the
    /// IFS-joined form.
    Multi { values: Vec<String>, star: bool },
}

impl ParamValue {
    fn is_unset(&self) -> bool {
        match self {
            Self::Single(v) => v.is_none(),
            Self::Multi { values, .. } => values.is_empty(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Single(v) => v.as_deref().map_or(true, str::is_empty),
            Self::Multi { values, .. } => values.is_empty() || values.iter().all(String::is_empty),
        }
    }
}

pub fn expand_parameter(
    shell: &mut Shell,
    part: &ParameterPart,
    quoted: bool,
) -> Result<Vec<Piece>, ExpandError> {
    let value = resolve(shell, part)?;

    // Operator forms that decide between the value and an alternate
    // word come first; they also own the unset handling.
    if let Some(op) = &part.operation {
        match op {
            ParameterOperation::Default { word, check_empty } => {
                let take_default = if *check_empty { value.is_empty() } else { value.is_unset() };
                if take_default {
                    let pieces = super::expand_word_pieces(shell, word, quoted)?;
                    return Ok(splittable_result(pieces, quoted));
                }
                return Ok(pieces_of(shell, value, quoted));
            }
            ParameterOperation::Assign { word, check_empty } => {
                let take_default = if *check_empty { value.is_empty() } else { value.is_unset() };
                if take_default {
                    let text = super::expand_word_single(shell, word)?;
                    shell
                        .vars
                        .set_scalar(&part.name, text.clone(), Scope::Nearest)
                        .map_err(|e| ExpandError::Arith(e.to_string()))?;
                    return Ok(vec![Piece::text(text, quoted)]);
                }
                return Ok(pieces_of(shell, value, quoted));
            }
            ParameterOperation::Error { word, check_empty } => {
                let fail = if *check_empty { value.is_empty() } else { value.is_unset() };
                if fail {
                    let message = match word {
                        Some(word) => super::expand_word_single(shell, word)?,
                        None => "parameter null or not set".to_string(),
                    };
                    return Err(ExpandError::Required {
                        name: part.name.clone(),
                        message,
                    });
                }
                return Ok(pieces_of(shell, value, quoted));
            }
            ParameterOperation::Alternative { word, check_empty } => {
                let use_word = if *check_empty { !value.is_empty() } else { !value.is_unset() };
                if use_word {
                    let pieces = super::expand_word_pieces(shell, word, quoted)?;
                    return Ok(splittable_result(pieces, quoted));
                }
                return Ok(vec![]);
            }
            _ => {}
        }
    }

    // Everything else references the value itself; nounset applies,
    // except to the zero-element list forms and the name listings.
    if value.is_unset() && shell.options.nounset {
        let exempt = matches!(value, ParamValue::Multi { .. })
            || matches!(
                part.operation,
                Some(ParameterOperation::Keys { .. })
                    | Some(ParameterOperation::NamesWithPrefix { .. })
            );
        if !exempt {
            return Err(ExpandError::Unset(display_name(part)));
        }
    }

    let Some(op) = &part.operation else {
        return Ok(pieces_of(shell, value, quoted));
    };

    match op {
        ParameterOperation::Length => {
            let length = match &value {
                ParamValue::Single(v) => v.as_deref().unwrap_or("").chars().count(),
                ParamValue::Multi { values, .. } => values.len(),
            };
            Ok(vec![Piece::text(length.to_string(), quoted)])
        }
        ParameterOperation::RemovePattern {
            pattern,
            suffix,
            greedy,
        } => {
            let pattern = super::expand_word_pattern(shell, pattern)?;
            let strip = |s: &str| {
                if *suffix {
                    glob::strip_suffix(&pattern, s, *greedy)
                } else {
                    glob::strip_prefix(&pattern, s, *greedy)
                }
            };
            Ok(map_value(shell, value, quoted, strip))
        }
        ParameterOperation::Replace {
            pattern,
            replacement,
            all,
            anchor,
        } => {
            let pattern = super::expand_word_pattern(shell, pattern)?;
            let replacement = match replacement {
                Some(word) => super::expand_word_single(shell, word)?,
                None => String::new(),
            };
            let nocase = shell.match_opts.nocasematch;
            let apply = |s: &str| {
                glob::replace(
                    &pattern,
                    &replacement,
                    s,
                    *all,
                    *anchor == Some(ReplaceAnchor::Start),
                    *anchor == Some(ReplaceAnchor::End),
                    nocase,
                )
            };
            Ok(map_value(shell, value, quoted, apply))
        }
        ParameterOperation::Substring { offset, length } => {
            let offset = super::arith::eval(shell, offset)?;
            let length = match length {
                Some(node) => Some(super::arith::eval(shell, node)?),
                None => None,
            };
            match value {
                ParamValue::Single(v) => {
                    let s = v.unwrap_or_default();
                    Ok(vec![Piece::text(substring(&s, offset, length), quoted)])
                }
                ParamValue::Multi { values, star } => {
                    let sliced = slice_list(shell, &part.name, values, offset, length);
                    Ok(multi_pieces(shell, sliced, star, quoted))
                }
            }
        }
        ParameterOperation::CaseModify { upper, all, pattern } => {
            let pattern = match pattern {
                Some(word) => Some(super::expand_word_pattern(shell, word)?),
                None => None,
            };
            let apply = |s: &str| case_modify(s, *upper, *all, pattern.as_deref());
            Ok(map_value(shell, value, quoted, apply))
        }
        ParameterOperation::Indirect => {
            let target = match &value {
                ParamValue::Single(v) => v.clone().unwrap_or_default(),
                ParamValue::Multi { .. } => String::new(),
            };
            if target.is_empty() {
                return Ok(vec![Piece::text(String::new(), quoted)]);
            }
            let resolved = indirect_lookup(shell, &target)?;
            if resolved.is_none() && shell.options.nounset {
                return Err(ExpandError::Unset(target));
            }
            Ok(vec![Piece::text(resolved.unwrap_or_default(), quoted)])
        }
        ParameterOperation::Keys { star } => {
            let keys = match shell.vars.get(&part.name).and_then(|v| v.value.as_ref()) {
                Some(Value::Indexed(map)) => map.keys().map(|k| k.to_string()).collect(),
                Some(Value::Assoc(map)) => map.keys().cloned().collect(),
                Some(Value::Scalar(_)) => vec!["0".to_string()],
                None => vec![],
            };
            Ok(multi_pieces(shell, keys, *star, quoted))
        }
        ParameterOperation::NamesWithPrefix { star } => {
            let names: Vec<String> = shell
                .vars
                .visible_names()
                .into_iter()
                .filter(|n| n.starts_with(&part.name))
                .collect();
            Ok(multi_pieces(shell, names, *star, quoted))
        }
        // The value-or-word forms were handled above.
        _ => Ok(pieces_of(shell, value, quoted)),
    }
}

/// The whole `${x:-word}` result is one expansion, so its unquoted
/// runs are subject to field splitting even where they came from
/// literal operand text.
fn splittable_result(pieces: Vec<Piece>, outer_quoted: bool) -> Vec<Piece> {
    if outer_quoted {
        return pieces;
    }
    pieces
        .into_iter()
        .map(|piece| match piece {
            Piece::Text {
                text,
                quoted: false,
                ..
            } => Piece::Text {
                text,
                quoted: false,
                splittable: true,
            },
            other => other,
        })
        .collect()
}

fn display_name(part: &ParameterPart) -> String {
    let mut name = part.name.clone();
    match &part.subscript {
        Some(Subscript::Index(i)) => name.push_str(&format!("[{i}]")),
        Some(Subscript::At) => name.push_str("[@]"),
        Some(Subscript::Star) => name.push_str("[*]"),
        None => {}
    }
    name
}

/// Resolve the parameter to its pre-operator value.
fn resolve(shell: &mut Shell, part: &ParameterPart) -> Result<ParamValue, ExpandError> {
    let name = part.name.as_str();

    // Positional and special parameters.
    match name {
        "@" => {
            return Ok(ParamValue::Multi {
                values: shell.vars.positional().params.clone(),
                star: false,
            })
        }
        "*" => {
            return Ok(ParamValue::Multi {
                values: shell.vars.positional().params.clone(),
                star: true,
            })
        }
        "#" => {
            return Ok(ParamValue::Single(Some(
                shell.vars.positional().params.len().to_string(),
            )))
        }
        "?" => return Ok(ParamValue::Single(Some(shell.last_status.to_string()))),
        "$" => return Ok(ParamValue::Single(Some(shell.shell_pid.to_string()))),
        "!" => {
            return Ok(ParamValue::Single(
                shell.last_async_pid.map(|pid| pid.to_string()),
            ))
        }
        "-" => {
            return Ok(ParamValue::Single(Some(
                shell.options.flag_string(shell.interactive),
            )))
        }
        "0" => return Ok(ParamValue::Single(Some(shell.dollar_zero()))),
        _ => {}
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        let n: usize = name.parse().unwrap_or(0);
        let params = &shell.vars.positional().params;
        return Ok(ParamValue::Single(params.get(n.wrapping_sub(1)).cloned()));
    }

    // Arrays.
    match &part.subscript {
        Some(Subscript::At) | Some(Subscript::Star) => {
            let star = matches!(part.subscript, Some(Subscript::Star));
            let values = match shell.vars.get(name).and_then(|v| v.value.as_ref()) {
                Some(Value::Indexed(map)) => map.values().cloned().collect(),
                Some(Value::Assoc(map)) => map.values().cloned().collect(),
                Some(Value::Scalar(s)) => vec![s.clone()],
                None => vec![],
            };
            Ok(ParamValue::Multi { values, star })
        }
        Some(Subscript::Index(raw)) => {
            let element = lookup_element(shell, name, raw)?;
            Ok(ParamValue::Single(element))
        }
        None => {
            // FUNCNAME and friends resolve dynamically.
            if shell.vars.get(name).is_some() {
                let var = shell.vars.get(name).and_then(|v| v.value.as_ref());
                Ok(ParamValue::Single(
                    var.and_then(|v| v.as_scalar()).map(str::to_string),
                ))
            } else {
                Ok(ParamValue::Single(shell.get_var(name)))
            }
        }
    }
}

/// `${name[raw]}`: arithmetic index for indexed arrays (negative
/// counts from the end), expanded string key for associative ones.
fn lookup_element(shell: &mut Shell, name: &str, raw: &str) -> Result<Option<String>, ExpandError> {
    let value = shell.vars.get(name).and_then(|v| v.value.as_ref()).cloned();
    match value {
        Some(Value::Assoc(map)) => {
            let key = expand_subscript_key(shell, raw)?;
            Ok(map.get(&key).cloned())
        }
        Some(Value::Indexed(map)) => {
            let idx = super::arith::eval_text(shell, raw)?;
            let key = if idx < 0 {
                map.keys().next_back().map_or(idx, |last| last + 1 + idx)
            } else {
                idx
            };
            Ok(map.get(&key).cloned())
        }
        Some(Value::Scalar(s)) => {
            let idx = super::arith::eval_text(shell, raw)?;
            Ok(if idx == 0 { Some(s) } else { None })
        }
        None => Ok(None),
    }
}

/// Expand an associative subscript as a mini-word.
pub fn expand_subscript_key(shell: &mut Shell, raw: &str) -> Result<String, ExpandError> {
    let word = crate::parser::word::parse_word(raw, Span::default())
        .map_err(|e| ExpandError::BadSubstitution(e.message))?;
    super::expand_word_single(shell, &word)
}

fn pieces_of(shell: &Shell, value: ParamValue, quoted: bool) -> Vec<Piece> {
    match value {
        ParamValue::Single(Some(v)) => vec![Piece::text(v, quoted)],
        ParamValue::Single(None) => vec![Piece::text(String::new(), quoted)],
        ParamValue::Multi { values, star } => multi_pieces(shell, values, star, quoted),
    }
}

/// `$@`-style list to pieces. Star joins on the first IFS character;
/// `@` yields one piece per element with hard breaks between.
fn multi_pieces(shell: &Shell, values: Vec<String>, star: bool, quoted: bool) -> Vec<Piece> {
    if star {
        let ifs = shell.get_var("IFS").unwrap_or_else(|| " \t\n".to_string());
        let sep = ifs.chars().next().map(|c| c.to_string()).unwrap_or_default();
        let joined = values.join(&sep);
        return vec![Piece::Text {
            text: joined,
            quoted,
            splittable: !quoted,
        }];
    }
    let mut pieces = Vec::new();
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            pieces.push(Piece::FieldBreak);
        }
        pieces.push(Piece::Text {
            text: value,
            quoted,
            splittable: !quoted,
        });
    }
    pieces
}

/// Apply a per-element transformation.
fn map_value(
    shell: &Shell,
    value: ParamValue,
    quoted: bool,
    f: impl Fn(&str) -> String,
) -> Vec<Piece> {
    match value {
        ParamValue::Single(v) => vec![Piece::text(f(v.as_deref().unwrap_or("")), quoted)],
        ParamValue::Multi { values, star } => {
            let mapped = values.iter().map(|v| f(v)).collect();
            multi_pieces(shell, mapped, star, quoted)
        }
    }
}

fn substring(s: &str, offset: i64, length: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = if offset < 0 { (len + offset).max(0) } else { offset.min(len) };
    let end = match length {
        None => len,
        Some(l) if l < 0 => (len + l).max(start),
        Some(l) => (start + l).min(len),
    };
    chars[start as usize..end.max(start) as usize].iter().collect()
}

/// `${@:off:len}` / `${arr[@]:off:len}`. For positional parameters,
/// offset 0 is `$0`.
fn slice_list(
    shell: &Shell,
    name: &str,
    values: Vec<String>,
    offset: i64,
    length: Option<i64>,
) -> Vec<String> {
    let positional = matches!(name, "@" | "*");
    let mut full: Vec<String> = if positional {
        let mut v = vec![shell.dollar_zero()];
        v.extend(values);
        v
    } else {
        values
    };
    let len = full.len() as i64;
    let start = if offset < 0 { (len + offset).max(0) } else { offset.min(len) };
    let end = match length {
        None => len,
        Some(l) if l < 0 => (len + l).max(start),
        Some(l) => (start + l).min(len),
    };
    full.drain(..start as usize);
    full.truncate((end - start).max(0) as usize);
    full
}

fn case_modify(s: &str, upper: bool, all: bool, pattern: Option<&str>) -> String {
    let matches_char = |c: char| match pattern {
        None => true,
        Some(p) => glob::matches_full(p, &c.to_string(), false),
    };
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        let eligible = (all || i == 0) && matches_char(c);
        if eligible && upper {
            out.extend(c.to_uppercase());
        } else if eligible && !upper {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `${!name}`: the named variable's value; supports `name[sub]` and
/// positional/special targets.
fn indirect_lookup(shell: &mut Shell, target: &str) -> Result<Option<String>, ExpandError> {
    if let Some(open) = target.find('[') {
        if target.ends_with(']') {
            let name = &target[..open];
            let raw = &target[open + 1..target.len() - 1];
            return lookup_element(shell, name, raw);
        }
    }
    if target.chars().all(|c| c.is_ascii_digit()) {
        let n: usize = target.parse().unwrap_or(0);
        if n == 0 {
            return Ok(Some(shell.dollar_zero()));
        }
        return Ok(shell.vars.positional().params.get(n - 1).cloned());
    }
    match target {
        "#" => Ok(Some(shell.vars.positional().params.len().to_string())),
        "?" => Ok(Some(shell.last_status.to_string())),
        _ => Ok(shell.get_var(target)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::{expand_word_single, expand_words};
    use crate::parser::word::parse_word;

    fn shell() -> Shell {
        Shell::new("test", false)
    }

    fn one(shell: &mut Shell, text: &str) -> String {
        let word = parse_word(text, Span::default()).expect("parse");
        expand_word_single(shell, &word).expect("expand")
    }

    fn fields(shell: &mut Shell, text: &str) -> Vec<String> {
        let word = parse_word(text, Span::default()).expect("parse");
        expand_words(shell, std::slice::from_ref(&word)).expect("expand")
    }

    #[test]
    fn simple_and_braced() {
        let mut sh = shell();
        sh.vars.set_scalar("x", "val".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "$x"), "val");
        assert_eq!(one(&mut sh, "${x}"), "val");
        assert_eq!(one(&mut sh, "a${x}b"), "avalb");
    }

    #[test]
    fn default_forms() {
        let mut sh = shell();
        assert_eq!(one(&mut sh, "${unset:-fallback}"), "fallback");
        sh.vars.set_scalar("empty", "".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${empty:-fb}"), "fb");
        assert_eq!(one(&mut sh, "${empty-fb}"), "");
        sh.vars.set_scalar("full", "v".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${full:-fb}"), "v");
    }

    #[test]
    fn assign_default_persists() {
        let mut sh = shell();
        assert_eq!(one(&mut sh, "${newvar:=init}"), "init");
        assert_eq!(sh.vars.get_scalar("newvar").as_deref(), Some("init"));
    }

    #[test]
    fn alternative_form() {
        let mut sh = shell();
        sh.vars.set_scalar("set", "x".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${set:+alt}"), "alt");
        assert_eq!(one(&mut sh, "${unset:+alt}"), "");
    }

    #[test]
    fn error_form() {
        let mut sh = shell();
        let word = parse_word("${nope:?custom message}", Span::default()).unwrap();
        match expand_word_single(&mut sh, &word) {
            Err(ExpandError::Required { name, message }) => {
                assert_eq!(name, "nope");
                assert_eq!(message, "custom message");
            }
            other => panic!("expected required error, got {other:?}"),
        }
    }

    #[test]
    fn length_forms() {
        let mut sh = shell();
        sh.vars.set_scalar("s", "hello".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${#s}"), "5");
        sh.vars.positional_mut().params = vec!["a".into(), "b".into()];
        assert_eq!(one(&mut sh, "${#@}"), "2");
    }

    #[test]
    fn pattern_removal() {
        let mut sh = shell();
        sh.vars
            .set_scalar("path", "/usr/local/bin".into(), Scope::Global)
            .unwrap();
        assert_eq!(one(&mut sh, "${path#*/}"), "usr/local/bin");
        assert_eq!(one(&mut sh, "${path##*/}"), "bin");
        sh.vars.set_scalar("f", "file.tar.gz".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${f%.*}"), "file.tar");
        assert_eq!(one(&mut sh, "${f%%.*}"), "file");
    }

    #[test]
    fn replacement_forms() {
        let mut sh = shell();
        sh.vars.set_scalar("s", "ababab".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${s/ab/X}"), "Xabab");
        assert_eq!(one(&mut sh, "${s//ab/X}"), "XXX");
        assert_eq!(one(&mut sh, "${s/%ab/X}"), "ababX");
        assert_eq!(one(&mut sh, "${s/#ab/X}"), "Xabab");
        assert_eq!(one(&mut sh, "${s//ab}"), "");
    }

    #[test]
    fn substring_forms() {
        let mut sh = shell();
        sh.vars.set_scalar("s", "abcdef".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${s:2}"), "cdef");
        assert_eq!(one(&mut sh, "${s:2:2}"), "cd");
        assert_eq!(one(&mut sh, "${s:(-2)}"), "ef");
        assert_eq!(one(&mut sh, "${s:1:-1}"), "bcde");
        assert_eq!(one(&mut sh, "${s:9}"), "");
    }

    #[test]
    fn case_modification() {
        let mut sh = shell();
        sh.vars.set_scalar("w", "hello world".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${w^}"), "Hello world");
        assert_eq!(one(&mut sh, "${w^^}"), "HELLO WORLD");
        sh.vars.set_scalar("u", "HELLO".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${u,}"), "hELLO");
        assert_eq!(one(&mut sh, "${u,,}"), "hello");
        // Pattern-limited.
        assert_eq!(one(&mut sh, "${w^^[lo]}"), "heLLO wOrLd");
    }

    #[test]
    fn indirection() {
        let mut sh = shell();
        sh.vars.set_scalar("ref", "target".into(), Scope::Global).unwrap();
        sh.vars.set_scalar("target", "deep".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${!ref}"), "deep");
    }

    #[test]
    fn name_prefix_listing() {
        let mut sh = shell();
        sh.vars.set_scalar("pre_one", "1".into(), Scope::Global).unwrap();
        sh.vars.set_scalar("pre_two", "2".into(), Scope::Global).unwrap();
        let out = fields(&mut sh, "${!pre_@}");
        assert_eq!(out, vec!["pre_one", "pre_two"]);
    }

    #[test]
    fn array_forms() {
        let mut sh = shell();
        sh.vars
            .set_value(
                "arr",
                Value::indexed_from(vec!["10".into(), "20".into(), "30".into()]),
                Scope::Global,
            )
            .unwrap();
        assert_eq!(fields(&mut sh, "${arr[@]}"), vec!["10", "20", "30"]);
        assert_eq!(one(&mut sh, "${arr[1]}"), "20");
        assert_eq!(one(&mut sh, "${arr[-1]}"), "30");
        assert_eq!(one(&mut sh, "${#arr[@]}"), "3");
        assert_eq!(fields(&mut sh, "${!arr[@]}"), vec!["0", "1", "2"]);
        assert_eq!(fields(&mut sh, "${arr[@]:1}"), vec!["20", "30"]);
        assert_eq!(fields(&mut sh, "${arr[@]:1:1}"), vec!["20"]);
        // Arithmetic subscripts.
        sh.vars.set_scalar("i", "2".into(), Scope::Global).unwrap();
        assert_eq!(one(&mut sh, "${arr[i]}"), "30");
        assert_eq!(one(&mut sh, "${arr[1+1]}"), "30");
    }

    #[test]
    fn special_parameters() {
        let mut sh = shell();
        sh.vars.positional_mut().params = vec!["p1".into(), "p2".into()];
        sh.last_status = 42;
        assert_eq!(one(&mut sh, "$#"), "2");
        assert_eq!(one(&mut sh, "$?"), "42");
        assert_eq!(one(&mut sh, "$1"), "p1");
        assert_eq!(one(&mut sh, "$0"), "test");
    }

    #[test]
    fn nounset_enforced() {
        let mut sh = shell();
        sh.options.nounset = true;
        let word = parse_word("$missing", Span::default()).unwrap();
        assert!(matches!(
            expand_word_single(&mut sh, &word),
            Err(ExpandError::Unset(_))
        ));
        // Default forms are exempt.
        assert_eq!(one(&mut sh, "${missing:-ok}"), "ok");
        // $@ with no positionals is exempt.
        let word = parse_word("$@", Span::default()).unwrap();
        assert!(expand_word_single(&mut sh, &word).is_ok());
    }
}
