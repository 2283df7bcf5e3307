//! `[[ ... ]]` evaluation.
//!
//! Operands expand without word splitting or pathname expansion. The
//! `==`/`!=` right-hand side is a shell pattern; `=~` is an extended
//! regex whose captures land in `BASH_REMATCH`.

use std::os::unix::fs::MetadataExt;
use std::os::unix::fs::PermissionsExt;

use crate::ast::*;
use crate::expand::{self, glob, ExpandError};
use crate::shell::{Scope, Shell, Value};

pub fn eval_cond(shell: &mut Shell, expr: &CondExpr) -> Result<bool, ExpandError> {
    match expr {
        CondExpr::Not(inner) => Ok(!eval_cond(shell, inner)?),
        CondExpr::And(left, right) => {
            if !eval_cond(shell, left)? {
                return Ok(false);
            }
            eval_cond(shell, right)
        }
        CondExpr::Or(left, right) => {
            if eval_cond(shell, left)? {
                return Ok(true);
            }
            eval_cond(shell, right)
        }
        CondExpr::Group(inner) => eval_cond(shell, inner),
        CondExpr::Word(word) => {
            let text = expand::expand_word_single(shell, word)?;
            Ok(!text.is_empty())
        }
        CondExpr::Unary { op, operand } => {
            let text = expand::expand_word_single(shell, operand)?;
            Ok(eval_unary(shell, *op, &text))
        }
        CondExpr::Binary { op, left, right } => eval_binary(shell, *op, left, right),
    }
}

fn eval_unary(shell: &Shell, op: CondUnaryOp, operand: &str) -> bool {
    use CondUnaryOp::*;
    match op {
        ZeroLength => return operand.is_empty(),
        NonZeroLength => return !operand.is_empty(),
        OptionSet => {
            return shell
                .options
                .get_by_name(operand)
                .unwrap_or(false)
        }
        VarSet => return shell.vars.is_set(operand) || shell.get_var(operand).is_some(),
        Terminal => {
            return operand
                .parse::<i32>()
                .map(crate::sys::is_tty)
                .unwrap_or(false)
        }
        _ => {}
    }

    // File tests use lstat only for the symlink test.
    if op == Symlink {
        return std::fs::symlink_metadata(operand)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
    }
    let meta = match std::fs::metadata(operand) {
        Ok(meta) => meta,
        Err(_) => return false,
    };
    let mode = meta.permissions().mode();
    match op {
        Exists => true,
        RegularFile => meta.is_file(),
        Directory => meta.is_dir(),
        NonEmptyFile => meta.len() > 0,
        Readable => nix::unistd::access(operand, nix::unistd::AccessFlags::R_OK).is_ok(),
        Writable => nix::unistd::access(operand, nix::unistd::AccessFlags::W_OK).is_ok(),
        Executable => nix::unistd::access(operand, nix::unistd::AccessFlags::X_OK).is_ok(),
        NamedPipe => mode & libc::S_IFMT == libc::S_IFIFO,
        Socket => mode & libc::S_IFMT == libc::S_IFSOCK,
        BlockSpecial => mode & libc::S_IFMT == libc::S_IFBLK,
        CharSpecial => mode & libc::S_IFMT == libc::S_IFCHR,
        SetUid => mode & 0o4000 != 0,
        SetGid => mode & 0o2000 != 0,
        Sticky => mode & 0o1000 != 0,
        OwnedByEuid => meta.uid() == nix::unistd::geteuid().as_raw(),
        OwnedByEgid => meta.gid() == nix::unistd::getegid().as_raw(),
        ModifiedSinceRead => meta.mtime() >= meta.atime(),
        Symlink | ZeroLength | NonZeroLength | OptionSet | VarSet | Terminal => false,
    }
}

fn eval_binary(
    shell: &mut Shell,
    op: CondBinaryOp,
    left: &WordNode,
    right: &WordNode,
) -> Result<bool, ExpandError> {
    use CondBinaryOp::*;
    match op {
        PatternEqual | PatternNotEqual => {
            let subject = expand::expand_word_single(shell, left)?;
            let pattern = expand::expand_word_pattern(shell, right)?;
            let matched = glob::matches_full(&pattern, &subject, shell.match_opts.nocasematch);
            Ok(if op == PatternEqual { matched } else { !matched })
        }
        RegexMatch => {
            let subject = expand::expand_word_single(shell, left)?;
            let pattern = regex_text(shell, right)?;
            let regex = regex_lite::Regex::new(&pattern)
                .map_err(|e| ExpandError::BadSubstitution(format!("invalid regex: {e}")))?;
            match regex.captures(&subject) {
                Some(captures) => {
                    let groups: Vec<String> = (0..captures.len())
                        .map(|i| {
                            captures
                                .get(i)
                                .map(|m| m.as_str().to_string())
                                .unwrap_or_default()
                        })
                        .collect();
                    let _ = shell.vars.set_value(
                        "BASH_REMATCH",
                        Value::indexed_from(groups),
                        Scope::Global,
                    );
                    Ok(true)
                }
                None => {
                    let _ = shell.vars.set_value(
                        "BASH_REMATCH",
                        Value::Indexed(Default::default()),
                        Scope::Global,
                    );
                    Ok(false)
                }
            }
        }
        StringLess => {
            let l = expand::expand_word_single(shell, left)?;
            let r = expand::expand_word_single(shell, right)?;
            Ok(l < r)
        }
        StringGreater => {
            let l = expand::expand_word_single(shell, left)?;
            let r = expand::expand_word_single(shell, right)?;
            Ok(l > r)
        }
        NumEqual | NumNotEqual | NumLess | NumLessEq | NumGreater | NumGreaterEq => {
            let l_text = expand::expand_word_single(shell, left)?;
            let r_text = expand::expand_word_single(shell, right)?;
            let l = expand::arith::eval_text(shell, &l_text)?;
            let r = expand::arith::eval_text(shell, &r_text)?;
            Ok(match op {
                NumEqual => l == r,
                NumNotEqual => l != r,
                NumLess => l < r,
                NumLessEq => l <= r,
                NumGreater => l > r,
                NumGreaterEq => l >= r,
                _ => unreachable!(),
            })
        }
        NewerThan | OlderThan => {
            let l = expand::expand_word_single(shell, left)?;
            let r = expand::expand_word_single(shell, right)?;
            let lm = std::fs::metadata(&l).map(|m| m.mtime()).ok();
            let rm = std::fs::metadata(&r).map(|m| m.mtime()).ok();
            Ok(match (lm, rm, op) {
                (Some(a), Some(b), NewerThan) => a > b,
                (Some(a), Some(b), OlderThan) => a < b,
                (Some(_), None, NewerThan) => true,
                (None, Some(_), OlderThan) => true,
                _ => false,
            })
        }
        SameFile => {
            let l = expand::expand_word_single(shell, left)?;
            let r = expand::expand_word_single(shell, right)?;
            match (std::fs::metadata(&l), std::fs::metadata(&r)) {
                (Ok(a), Ok(b)) => Ok(a.dev() == b.dev() && a.ino() == b.ino()),
                _ => Ok(false),
            }
        }
    }
}

/// Build the regex source for `=~`: quoted spans become literal,
/// unquoted spans stay live regex syntax.
fn regex_text(shell: &mut Shell, word: &WordNode) -> Result<String, ExpandError> {
    let pieces = expand::expand_word_pieces(shell, word, false)?;
    let mut out = String::new();
    for piece in pieces {
        match piece {
            expand::Piece::Text { text, quoted, .. } => {
                if quoted {
                    for c in text.chars() {
                        if matches!(
                            c,
                            '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$'
                                | '|' | '\\'
                        ) {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                } else {
                    out.push_str(&text);
                }
            }
            expand::Piece::FieldBreak => out.push(' '),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn shell() -> Shell {
        Shell::new("test", false)
    }

    fn eval(shell: &mut Shell, input: &str) -> bool {
        let script = parse(input).expect("parse");
        match &script.items[0].and_or.first.commands[0] {
            CommandNode::Compound(CompoundCommandNode::Conditional(node)) => {
                eval_cond(shell, &node.expression).expect("eval")
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn string_tests() {
        let mut sh = shell();
        sh.vars.set_scalar("x", "abc".into(), Scope::Global).unwrap();
        assert!(eval(&mut sh, "[[ -n $x ]]"));
        assert!(!eval(&mut sh, "[[ -z $x ]]"));
        assert!(eval(&mut sh, "[[ -z $unset_thing ]]"));
    }

    #[test]
    fn pattern_matching() {
        let mut sh = shell();
        sh.vars.set_scalar("f", "photo.jpeg".into(), Scope::Global).unwrap();
        assert!(eval(&mut sh, "[[ $f == *.jpeg ]]"));
        assert!(eval(&mut sh, "[[ $f != *.png ]]"));
        // Quoted pattern characters are literal.
        assert!(!eval(&mut sh, "[[ $f == '*.jpeg' ]]"));
    }

    #[test]
    fn regex_with_captures() {
        let mut sh = shell();
        sh.vars.set_scalar("v", "marsh-0.1.0".into(), Scope::Global).unwrap();
        assert!(eval(&mut sh, "[[ $v =~ ^marsh-([0-9]+)\\.([0-9]+) ]]"));
        match sh.vars.get("BASH_REMATCH").and_then(|v| v.value.clone()) {
            Some(Value::Indexed(map)) => {
                assert_eq!(map.get(&1).map(String::as_str), Some("0"));
                assert_eq!(map.get(&2).map(String::as_str), Some("1"));
            }
            other => panic!("expected BASH_REMATCH array, got {other:?}"),
        }
    }

    #[test]
    fn numeric_comparisons() {
        let mut sh = shell();
        assert!(eval(&mut sh, "[[ 3 -lt 5 ]]"));
        assert!(eval(&mut sh, "[[ 10 -ge 10 ]]"));
        assert!(!eval(&mut sh, "[[ 1 -eq 2 ]]"));
        // Operands are arithmetic expressions.
        sh.vars.set_scalar("n", "4".into(), Scope::Global).unwrap();
        assert!(eval(&mut sh, "[[ n+1 -eq 5 ]]"));
    }

    #[test]
    fn string_ordering() {
        let mut sh = shell();
        assert!(eval(&mut sh, "[[ apple < banana ]]"));
        assert!(eval(&mut sh, "[[ zebra > apple ]]"));
    }

    #[test]
    fn logic_and_grouping() {
        let mut sh = shell();
        assert!(eval(&mut sh, "[[ -n x && -n y ]]"));
        assert!(eval(&mut sh, "[[ -z x || -n y ]]"));
        assert!(eval(&mut sh, "[[ ! -z x ]]"));
        assert!(eval(&mut sh, "[[ ( -z q || -n x ) && -n y ]]"));
    }

    #[test]
    fn file_tests() {
        let mut sh = shell();
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f");
        std::fs::write(&file, b"data").unwrap();
        sh.vars
            .set_scalar("f", file.to_string_lossy().to_string(), Scope::Global)
            .unwrap();
        sh.vars
            .set_scalar("d", tmp.path().to_string_lossy().to_string(), Scope::Global)
            .unwrap();
        assert!(eval(&mut sh, "[[ -e $f ]]"));
        assert!(eval(&mut sh, "[[ -f $f ]]"));
        assert!(eval(&mut sh, "[[ -s $f ]]"));
        assert!(eval(&mut sh, "[[ -d $d ]]"));
        assert!(!eval(&mut sh, "[[ -d $f ]]"));
        assert!(!eval(&mut sh, "[[ -e $f.missing ]]"));
    }

    #[test]
    fn var_set_test() {
        let mut sh = shell();
        sh.vars.set_scalar("present", "1".into(), Scope::Global).unwrap();
        assert!(eval(&mut sh, "[[ -v present ]]"));
        assert!(!eval(&mut sh, "[[ -v absent_one ]]"));
    }
}
