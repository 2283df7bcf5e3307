//! The expansion engine.
//!
//! Words go through the POSIX stages in order: brace expansion,
//! tilde expansion, parameter/command/arithmetic expansion, field
//! splitting, pathname expansion, quote removal. Fields are built
//! pattern-encoded (quoted metacharacters escaped) so the glob stage
//! can tell quoted from live metacharacters; quote removal is the
//! final unescape.

pub mod arith;
pub mod brace;
pub mod glob;
pub mod parameter;
pub mod pathname;
pub mod prompt;
pub mod quote;
pub mod split;
pub mod tilde;

use thiserror::Error;

use crate::ast::*;
use crate::shell::Shell;

#[derive(Debug, Clone, Error)]
pub enum ExpandError {
    /// nounset violation.
    #[error("{0}: unbound variable")]
    Unset(String),
    #[error("{0}: bad substitution")]
    BadSubstitution(String),
    #[error("{0}")]
    Arith(String),
    /// `${name:?message}`: fatal in non-interactive shells.
    #[error("{name}: {message}")]
    Required { name: String, message: String },
    /// failglob violation.
    #[error("no match: {0}")]
    NoMatch(String),
}

impl ExpandError {
    /// Errors that terminate a non-interactive shell (nounset,
    /// `${x:?}`).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unset(_) | Self::Required { .. })
    }
}

/// Intermediate expansion output: text runs tagged with their
/// quoting, plus hard field breaks from `"$@"`-style expansions.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text {
        text: String,
        quoted: bool,
        splittable: bool,
    },
    FieldBreak,
}

impl Piece {
    pub fn text(text: String, quoted: bool) -> Self {
        Piece::Text {
            splittable: !quoted,
            text,
            quoted,
        }
    }
}

// ---- public entry points ---------------------------------------------------

/// Full expansion of a command's words into fields: every stage, in
/// order.
pub fn expand_words(shell: &mut Shell, words: &[WordNode]) -> Result<Vec<String>, ExpandError> {
    let mut fields = Vec::new();
    for word in words {
        let generated = brace::expand_braces(word);
        for word in &generated {
            let pieces = expand_word_pieces(shell, word, false)?;
            let encoded = assemble_fields(shell, pieces);
            glob_stage(shell, encoded, &mut fields)?;
        }
        if shell.trace.expansion {
            crate::trace::emit(
                "expand",
                &format!(
                    "{} -> {:?}",
                    crate::ast::printer::describe_word(word),
                    fields
                ),
            );
        }
    }
    Ok(fields)
}

/// Expansion to a single field: no brace expansion, splitting, or
/// globbing. Used for assignment values, redirection targets,
/// heredoc bodies, and `case` subjects.
pub fn expand_word_single(shell: &mut Shell, word: &WordNode) -> Result<String, ExpandError> {
    let pieces = expand_word_pieces(shell, word, false)?;
    let mut out = String::new();
    let mut first = true;
    for piece in pieces {
        match piece {
            Piece::Text { text, .. } => out.push_str(&text),
            Piece::FieldBreak => {
                // `$@` joins with spaces in a single-field context.
                if !first {
                    out.push(' ');
                }
            }
        }
        first = false;
    }
    Ok(out)
}

/// Expansion preserving pattern encoding: quoted characters come out
/// escaped, expansion results stay live. Used for `case` patterns,
/// `[[ == ]]` right-hand sides, and `${x#pat}`-style operands.
pub fn expand_word_pattern(shell: &mut Shell, word: &WordNode) -> Result<String, ExpandError> {
    let pieces = expand_word_pieces(shell, word, false)?;
    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Text { text, quoted, .. } => {
                if quoted {
                    quote::push_quoted(&mut out, &text);
                } else {
                    out.push_str(&text);
                }
            }
            Piece::FieldBreak => out.push(' '),
        }
    }
    Ok(out)
}

/// Expand one word part to plain text (arithmetic's embedded
/// `${...}` / `$(...)` operands).
pub fn expand_part_to_string(shell: &mut Shell, part: &WordPart) -> Result<String, ExpandError> {
    let word = WordNode::new(vec![part.clone()], Span::default());
    expand_word_single(shell, &word)
}

// ---- per-part expansion ----------------------------------------------------

pub(crate) fn expand_word_pieces(
    shell: &mut Shell,
    word: &WordNode,
    quoted: bool,
) -> Result<Vec<Piece>, ExpandError> {
    let mut pieces = Vec::new();
    for part in &word.parts {
        expand_part(shell, part, quoted, &mut pieces)?;
    }
    Ok(pieces)
}

fn expand_part(
    shell: &mut Shell,
    part: &WordPart,
    quoted: bool,
    out: &mut Vec<Piece>,
) -> Result<(), ExpandError> {
    match part {
        WordPart::Literal(text) => out.push(Piece::Text {
            text: text.clone(),
            quoted,
            splittable: false,
        }),
        WordPart::Glob(pattern) => out.push(Piece::Text {
            text: pattern.clone(),
            quoted,
            splittable: false,
        }),
        WordPart::SingleQuoted(text) => out.push(Piece::Text {
            text: text.clone(),
            quoted: true,
            splittable: false,
        }),
        WordPart::Escaped(text) => out.push(Piece::Text {
            text: text.clone(),
            quoted: true,
            splittable: false,
        }),
        WordPart::DoubleQuoted(parts) => {
            if parts.is_empty() {
                // `""` anchors an empty field.
                out.push(Piece::Text {
                    text: String::new(),
                    quoted: true,
                    splittable: false,
                });
                return Ok(());
            }
            for part in parts {
                expand_part(shell, part, true, out)?;
            }
        }
        WordPart::Parameter(param) => {
            out.extend(parameter::expand_parameter(shell, param, quoted)?);
        }
        WordPart::CommandSubstitution(subst) => {
            let output = crate::exec::subshell::command_substitution(shell, &subst.body)?;
            let trimmed = output.trim_end_matches('\n').to_string();
            out.push(Piece::Text {
                text: trimmed,
                quoted,
                splittable: !quoted,
            });
        }
        WordPart::Arithmetic(expr) => {
            let value = arith::eval(shell, expr)?;
            out.push(Piece::Text {
                text: value.to_string(),
                quoted,
                splittable: !quoted,
            });
        }
        WordPart::ProcessSubstitution(subst) => {
            let path = crate::exec::subshell::process_substitution(shell, subst)?;
            out.push(Piece::Text {
                text: path,
                quoted: true,
                splittable: false,
            });
        }
        WordPart::Tilde(user) => {
            let home = tilde::expand_tilde(shell, user.as_deref());
            out.push(Piece::Text {
                text: home,
                quoted: true,
                splittable: false,
            });
        }
        WordPart::Brace(brace) => {
            // Reached only outside the field pipeline (assignment
            // values and the like), where braces are literal.
            out.push(Piece::Text {
                text: render_brace_literal(shell, brace)?,
                quoted,
                splittable: false,
            });
        }
    }
    Ok(())
}

/// Render an unexpanded brace part back to text (brace expansion
/// does not apply in assignment/scalar contexts).
fn render_brace_literal(shell: &mut Shell, brace: &BracePart) -> Result<String, ExpandError> {
    match brace {
        BracePart::List(elements) => {
            let mut rendered = Vec::with_capacity(elements.len());
            for element in elements {
                rendered.push(expand_word_single(shell, element)?);
            }
            Ok(format!("{{{}}}", rendered.join(",")))
        }
        BracePart::Range {
            start,
            end,
            increment,
            ..
        } => {
            let endpoint = |e: &BraceEndpoint| match e {
                BraceEndpoint::Number(n) => n.to_string(),
                BraceEndpoint::Char(c) => c.to_string(),
            };
            Ok(match increment {
                Some(i) => format!("{{{}..{}..{}}}", endpoint(start), endpoint(end), i),
                None => format!("{{{}..{}}}", endpoint(start), endpoint(end)),
            })
        }
    }
}

// ---- field assembly --------------------------------------------------------

/// Turn a word's pieces into pattern-encoded fields, applying IFS
/// splitting to splittable runs while quoted/literal runs join their
/// neighbors.
fn assemble_fields(shell: &Shell, pieces: Vec<Piece>) -> Vec<String> {
    let ifs = shell.get_var("IFS").unwrap_or_else(|| " \t\n".to_string());
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut started = false;

    for piece in pieces {
        match piece {
            Piece::FieldBreak => {
                fields.push(std::mem::take(&mut current));
                started = false;
            }
            Piece::Text {
                text,
                quoted,
                splittable,
            } => {
                if !splittable || ifs.is_empty() {
                    if quoted {
                        quote::push_quoted(&mut current, &text);
                        started = true;
                    } else if splittable {
                        // Expansion data with splitting disabled by
                        // an empty IFS.
                        quote::push_unquoted_data(&mut current, &text);
                        if !text.is_empty() {
                            started = true;
                        }
                    } else {
                        // Source text: pattern characters are
                        // already encoded correctly.
                        current.push_str(&text);
                        if !text.is_empty() {
                            started = true;
                        }
                    }
                    continue;
                }
                let result = split::split_fields(&text, &ifs);
                if result.fields.is_empty() {
                    // Empty expansion or pure delimiters.
                    if result.leading_delim && started {
                        fields.push(std::mem::take(&mut current));
                        started = false;
                    }
                    continue;
                }
                if result.leading_delim && started {
                    fields.push(std::mem::take(&mut current));
                    started = false;
                }
                let last_index = result.fields.len() - 1;
                for (i, part) in result.fields.into_iter().enumerate() {
                    if i == 0 {
                        quote::push_unquoted_data(&mut current, &part);
                        if !part.is_empty() || last_index > 0 {
                            started = true;
                        }
                    } else {
                        fields.push(std::mem::take(&mut current));
                        quote::push_unquoted_data(&mut current, &part);
                        started = true;
                    }
                }
                if result.trailing_delim && started {
                    fields.push(std::mem::take(&mut current));
                    started = false;
                }
            }
        }
    }
    if started {
        fields.push(current);
    }
    fields
}

/// Pathname expansion and quote removal over encoded fields.
fn glob_stage(
    shell: &mut Shell,
    encoded: Vec<String>,
    out: &mut Vec<String>,
) -> Result<(), ExpandError> {
    for field in encoded {
        if shell.options.noglob || !quote::has_unquoted_meta(&field) {
            out.push(quote::unescape(&field));
            continue;
        }
        match pathname::expand_pathnames(&field, &shell.match_opts) {
            Some(matches) => out.extend(matches),
            None => {
                if shell.match_opts.failglob {
                    return Err(ExpandError::NoMatch(quote::unescape(&field)));
                }
                if !shell.match_opts.nullglob {
                    out.push(quote::unescape(&field));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::word::parse_word;
    use crate::shell::Scope;

    fn shell() -> Shell {
        Shell::new("test", false)
    }

    fn fields(shell: &mut Shell, text: &str) -> Vec<String> {
        let word = parse_word(text, Span::default()).expect("parse");
        expand_words(shell, std::slice::from_ref(&word)).expect("expand")
    }

    #[test]
    fn brace_then_parameter_order() {
        let mut sh = shell();
        sh.vars.set_scalar("var", "X".into(), Scope::Global).unwrap();
        assert_eq!(fields(&mut sh, "{a,b}$var"), vec!["aX", "bX"]);
    }

    #[test]
    fn unquoted_expansion_splits() {
        let mut sh = shell();
        sh.vars.set_scalar("v", "one two".into(), Scope::Global).unwrap();
        assert_eq!(fields(&mut sh, "$v"), vec!["one", "two"]);
        assert_eq!(fields(&mut sh, "\"$v\""), vec!["one two"]);
    }

    #[test]
    fn custom_ifs_empty_fields() {
        let mut sh = shell();
        sh.vars.set_scalar("IFS", ":".into(), Scope::Global).unwrap();
        sh.vars.set_scalar("s", "a::b:c".into(), Scope::Global).unwrap();
        assert_eq!(fields(&mut sh, "$s"), vec!["a", "", "b", "c"]);
    }

    #[test]
    fn quoted_joins_with_split_neighbor() {
        let mut sh = shell();
        sh.vars.set_scalar("a", "1 2".into(), Scope::Global).unwrap();
        sh.vars.set_scalar("b", "3 4".into(), Scope::Global).unwrap();
        assert_eq!(fields(&mut sh, "$a\"$b\""), vec!["1", "23 4"]);
    }

    #[test]
    fn empty_unquoted_vanishes_quoted_stays() {
        let mut sh = shell();
        sh.vars.set_scalar("e", "".into(), Scope::Global).unwrap();
        assert_eq!(fields(&mut sh, "$e"), Vec::<String>::new());
        assert_eq!(fields(&mut sh, "\"$e\""), vec![""]);
        assert_eq!(fields(&mut sh, "x$e"), vec!["x"]);
    }

    #[test]
    fn quoted_at_preserves_params() {
        let mut sh = shell();
        sh.vars.positional_mut().params = vec!["a b".into(), "".into(), "c".into()];
        let word = parse_word("\"$@\"", Span::default()).unwrap();
        let out = expand_words(&mut sh, std::slice::from_ref(&word)).unwrap();
        assert_eq!(out, vec!["a b", "", "c"]);
    }

    #[test]
    fn quoted_at_with_no_params_is_no_fields() {
        let mut sh = shell();
        assert_eq!(fields(&mut sh, "\"$@\""), Vec::<String>::new());
    }

    #[test]
    fn star_joins_with_first_ifs_char() {
        let mut sh = shell();
        sh.vars.positional_mut().params = vec!["a".into(), "b".into()];
        sh.vars.set_scalar("IFS", ":-".into(), Scope::Global).unwrap();
        assert_eq!(fields(&mut sh, "\"$*\""), vec!["a:b"]);
    }

    #[test]
    fn arithmetic_expansion_in_word() {
        let mut sh = shell();
        assert_eq!(fields(&mut sh, "n=$((2+3))"), vec!["n=5"]);
    }

    #[test]
    fn quoted_metachars_do_not_glob() {
        let mut sh = shell();
        assert_eq!(fields(&mut sh, "'*.none'"), vec!["*.none"]);
    }

    #[test]
    fn unmatched_glob_stays_literal_by_default() {
        let mut sh = shell();
        assert_eq!(
            fields(&mut sh, "/definitely/not/here/*.xyz"),
            vec!["/definitely/not/here/*.xyz"]
        );
    }

    #[test]
    fn nullglob_drops_unmatched() {
        let mut sh = shell();
        sh.match_opts.nullglob = true;
        assert_eq!(
            fields(&mut sh, "/definitely/not/here/*.xyz"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn single_expansion_joins_at() {
        let mut sh = shell();
        sh.vars.positional_mut().params = vec!["x".into(), "y".into()];
        let word = parse_word("$@", Span::default()).unwrap();
        assert_eq!(expand_word_single(&mut sh, &word).unwrap(), "x y");
    }

    #[test]
    fn pattern_context_keeps_expansion_metachars_live() {
        let mut sh = shell();
        sh.vars.set_scalar("p", "*".into(), Scope::Global).unwrap();
        let word = parse_word("$p", Span::default()).unwrap();
        assert_eq!(expand_word_pattern(&mut sh, &word).unwrap(), "*");
        let word = parse_word("\"$p\"", Span::default()).unwrap();
        assert_eq!(expand_word_pattern(&mut sh, &word).unwrap(), "\\*");
    }
}
