//! Arithmetic evaluation.
//!
//! Signed 64-bit wrapping arithmetic over the parsed expression
//! tree. Variable references are recursively re-evaluated as
//! expressions, so `x="y+1" y=2; echo $((x*2))` prints 6. Assignments
//! and `++`/`--` write back through the variable store.

use crate::ast::*;
use crate::shell::{ArrayKey, Scope, Shell, Value};

use super::ExpandError;

const MAX_RECURSION: usize = 128;

pub fn eval(shell: &mut Shell, node: &ArithmeticExpressionNode) -> Result<i64, ExpandError> {
    eval_expr(shell, &node.expr, 0)
}

/// Parse and evaluate arithmetic text (integer-attributed
/// assignments, array subscripts, recursive variable values).
pub fn eval_text(shell: &mut Shell, text: &str) -> Result<i64, ExpandError> {
    eval_text_at(shell, text, 0)
}

fn eval_text_at(shell: &mut Shell, text: &str, depth: usize) -> Result<i64, ExpandError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let node = crate::parser::arith::parse_arithmetic(trimmed, Span::default())
        .map_err(|e| ExpandError::Arith(e.message))?;
    eval_expr(shell, &node.expr, depth)
}

fn eval_expr(shell: &mut Shell, expr: &ArithExpr, depth: usize) -> Result<i64, ExpandError> {
    if depth > MAX_RECURSION {
        return Err(ExpandError::Arith(
            "expression recursion level exceeded".to_string(),
        ));
    }
    match expr {
        ArithExpr::Number(n) => Ok(*n),
        ArithExpr::Variable(name) => {
            let value = shell.get_var(name).unwrap_or_default();
            eval_text_at(shell, &value, depth + 1)
        }
        ArithExpr::Element { name, index } => {
            let idx = eval_expr(shell, index, depth + 1)?;
            let value = read_element(shell, name, idx);
            eval_text_at(shell, &value, depth + 1)
        }
        ArithExpr::Expansion(part) => {
            let text = super::expand_part_to_string(shell, part)?;
            eval_text_at(shell, &text, depth + 1)
        }
        ArithExpr::Unary { op, operand } => {
            let value = eval_expr(shell, operand, depth + 1)?;
            Ok(match op {
                ArithUnaryOp::Plus => value,
                ArithUnaryOp::Minus => value.wrapping_neg(),
                ArithUnaryOp::LogicalNot => i64::from(value == 0),
                ArithUnaryOp::BitNot => !value,
            })
        }
        ArithExpr::IncDec {
            target,
            increment,
            prefix,
        } => {
            let old = read_target(shell, target, depth)?;
            let new = if *increment {
                old.wrapping_add(1)
            } else {
                old.wrapping_sub(1)
            };
            write_target(shell, target, new, depth)?;
            Ok(if *prefix { new } else { old })
        }
        ArithExpr::Binary { op, left, right } => match op {
            ArithBinaryOp::LogicalAnd => {
                let l = eval_expr(shell, left, depth + 1)?;
                if l == 0 {
                    return Ok(0);
                }
                let r = eval_expr(shell, right, depth + 1)?;
                Ok(i64::from(r != 0))
            }
            ArithBinaryOp::LogicalOr => {
                let l = eval_expr(shell, left, depth + 1)?;
                if l != 0 {
                    return Ok(1);
                }
                let r = eval_expr(shell, right, depth + 1)?;
                Ok(i64::from(r != 0))
            }
            _ => {
                let l = eval_expr(shell, left, depth + 1)?;
                let r = eval_expr(shell, right, depth + 1)?;
                apply_binary(*op, l, r)
            }
        },
        ArithExpr::Ternary {
            condition,
            consequent,
            alternate,
        } => {
            if eval_expr(shell, condition, depth + 1)? != 0 {
                eval_expr(shell, consequent, depth + 1)
            } else {
                eval_expr(shell, alternate, depth + 1)
            }
        }
        ArithExpr::Assignment { target, op, value } => {
            let rhs = eval_expr(shell, value, depth + 1)?;
            let result = match op {
                ArithAssignOp::Assign => rhs,
                _ => {
                    let current = read_target(shell, target, depth)?;
                    apply_binary(binary_of_assign(*op), current, rhs)?
                }
            };
            write_target(shell, target, result, depth)?;
            Ok(result)
        }
        ArithExpr::Group(inner) => eval_expr(shell, inner, depth + 1),
        ArithExpr::Comma(left, right) => {
            eval_expr(shell, left, depth + 1)?;
            eval_expr(shell, right, depth + 1)
        }
    }
}

fn binary_of_assign(op: ArithAssignOp) -> ArithBinaryOp {
    match op {
        ArithAssignOp::Assign => ArithBinaryOp::Add, // unreachable by construction
        ArithAssignOp::Add => ArithBinaryOp::Add,
        ArithAssignOp::Subtract => ArithBinaryOp::Subtract,
        ArithAssignOp::Multiply => ArithBinaryOp::Multiply,
        ArithAssignOp::Divide => ArithBinaryOp::Divide,
        ArithAssignOp::Modulo => ArithBinaryOp::Modulo,
        ArithAssignOp::ShiftLeft => ArithBinaryOp::ShiftLeft,
        ArithAssignOp::ShiftRight => ArithBinaryOp::ShiftRight,
        ArithAssignOp::BitAnd => ArithBinaryOp::BitAnd,
        ArithAssignOp::BitXor => ArithBinaryOp::BitXor,
        ArithAssignOp::BitOr => ArithBinaryOp::BitOr,
    }
}

fn apply_binary(op: ArithBinaryOp, l: i64, r: i64) -> Result<i64, ExpandError> {
    Ok(match op {
        ArithBinaryOp::Add => l.wrapping_add(r),
        ArithBinaryOp::Subtract => l.wrapping_sub(r),
        ArithBinaryOp::Multiply => l.wrapping_mul(r),
        ArithBinaryOp::Divide => {
            if r == 0 {
                return Err(ExpandError::Arith("division by 0".to_string()));
            }
            if l == i64::MIN && r == -1 {
                return Err(ExpandError::Arith("integer overflow".to_string()));
            }
            l / r
        }
        ArithBinaryOp::Modulo => {
            if r == 0 {
                return Err(ExpandError::Arith("division by 0".to_string()));
            }
            if l == i64::MIN && r == -1 {
                return Err(ExpandError::Arith("integer overflow".to_string()));
            }
            l % r
        }
        ArithBinaryOp::Power => {
            if r < 0 {
                return Err(ExpandError::Arith("exponent less than 0".to_string()));
            }
            let mut base = l;
            let mut exp = r as u64;
            let mut acc: i64 = 1;
            while exp > 0 {
                if exp & 1 == 1 {
                    acc = acc.wrapping_mul(base);
                }
                base = base.wrapping_mul(base);
                exp >>= 1;
            }
            acc
        }
        ArithBinaryOp::ShiftLeft => l.wrapping_shl((r & 63) as u32),
        ArithBinaryOp::ShiftRight => l.wrapping_shr((r & 63) as u32),
        ArithBinaryOp::Less => i64::from(l < r),
        ArithBinaryOp::LessEqual => i64::from(l <= r),
        ArithBinaryOp::Greater => i64::from(l > r),
        ArithBinaryOp::GreaterEqual => i64::from(l >= r),
        ArithBinaryOp::Equal => i64::from(l == r),
        ArithBinaryOp::NotEqual => i64::from(l != r),
        ArithBinaryOp::BitAnd => l & r,
        ArithBinaryOp::BitXor => l ^ r,
        ArithBinaryOp::BitOr => l | r,
        ArithBinaryOp::LogicalAnd | ArithBinaryOp::LogicalOr => unreachable!("handled lazily"),
    })
}

fn read_element(shell: &Shell, name: &str, index: i64) -> String {
    match shell.vars.get(name).and_then(|v| v.value.as_ref()) {
        Some(Value::Indexed(map)) => {
            let key = if index < 0 {
                map.keys().next_back().map_or(index, |last| last + 1 + index)
            } else {
                index
            };
            map.get(&key).cloned().unwrap_or_default()
        }
        Some(Value::Assoc(map)) => map.get(&index.to_string()).cloned().unwrap_or_default(),
        Some(Value::Scalar(s)) if index == 0 => s.clone(),
        _ => String::new(),
    }
}

fn read_target(shell: &mut Shell, target: &ArithTarget, depth: usize) -> Result<i64, ExpandError> {
    match &target.index {
        None => {
            let value = shell.get_var(&target.name).unwrap_or_default();
            eval_text_at(shell, &value, depth + 1)
        }
        Some(index) => {
            let idx = eval_expr(shell, index, depth + 1)?;
            let value = read_element(shell, &target.name, idx);
            eval_text_at(shell, &value, depth + 1)
        }
    }
}

fn write_target(
    shell: &mut Shell,
    target: &ArithTarget,
    value: i64,
    depth: usize,
) -> Result<(), ExpandError> {
    match &target.index {
        None => shell
            .vars
            .set_scalar(&target.name, value.to_string(), Scope::Nearest)
            .map_err(|e| ExpandError::Arith(e.to_string())),
        Some(index) => {
            let idx = eval_expr(shell, index, depth + 1)?;
            shell
                .vars
                .set_element(&target.name, ArrayKey::Index(idx), value.to_string(), Scope::Nearest)
                .map_err(|e| ExpandError::Arith(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> Shell {
        Shell::new("test", false)
    }

    fn eval_in(shell: &mut Shell, text: &str) -> i64 {
        eval_text(shell, text).expect("eval failure")
    }

    #[test]
    fn basic_arithmetic() {
        let mut sh = shell();
        assert_eq!(eval_in(&mut sh, "1 + 2 * 3"), 7);
        assert_eq!(eval_in(&mut sh, "(1 + 2) * 3"), 9);
        assert_eq!(eval_in(&mut sh, "7 / 2"), 3);
        assert_eq!(eval_in(&mut sh, "7 % 3"), 1);
        assert_eq!(eval_in(&mut sh, "2 ** 10"), 1024);
    }

    #[test]
    fn comparisons_and_logic() {
        let mut sh = shell();
        assert_eq!(eval_in(&mut sh, "3 < 5"), 1);
        assert_eq!(eval_in(&mut sh, "3 >= 5"), 0);
        assert_eq!(eval_in(&mut sh, "1 && 2"), 1);
        assert_eq!(eval_in(&mut sh, "0 || 0"), 0);
        assert_eq!(eval_in(&mut sh, "!0"), 1);
        assert_eq!(eval_in(&mut sh, "~0"), -1);
    }

    #[test]
    fn division_by_zero_is_error() {
        let mut sh = shell();
        assert!(eval_text(&mut sh, "1 / 0").is_err());
        assert!(eval_text(&mut sh, "1 % 0").is_err());
    }

    #[test]
    fn assignment_writes_variable() {
        let mut sh = shell();
        assert_eq!(eval_in(&mut sh, "x = 5"), 5);
        assert_eq!(sh.vars.get_scalar("x").as_deref(), Some("5"));
        assert_eq!(eval_in(&mut sh, "x += 3"), 8);
        assert_eq!(eval_in(&mut sh, "x <<= 2"), 32);
    }

    #[test]
    fn inc_dec_semantics() {
        let mut sh = shell();
        let _ = sh.vars.set_scalar("n", "5".into(), Scope::Global);
        assert_eq!(eval_in(&mut sh, "n++"), 5);
        assert_eq!(sh.vars.get_scalar("n").as_deref(), Some("6"));
        assert_eq!(eval_in(&mut sh, "++n"), 7);
        assert_eq!(eval_in(&mut sh, "n--"), 7);
        assert_eq!(eval_in(&mut sh, "--n"), 5);
    }

    #[test]
    fn variables_recursively_evaluated() {
        let mut sh = shell();
        let _ = sh.vars.set_scalar("y", "2".into(), Scope::Global);
        let _ = sh.vars.set_scalar("x", "y + 1".into(), Scope::Global);
        assert_eq!(eval_in(&mut sh, "x * 2"), 6);
    }

    #[test]
    fn unset_variable_is_zero() {
        let mut sh = shell();
        assert_eq!(eval_in(&mut sh, "nothing + 1"), 1);
    }

    #[test]
    fn ternary_lazy() {
        let mut sh = shell();
        assert_eq!(eval_in(&mut sh, "1 ? 10 : (1/0)"), 10);
        assert_eq!(eval_in(&mut sh, "0 ? 10 : 20"), 20);
    }

    #[test]
    fn logical_short_circuit_skips_side_effects() {
        let mut sh = shell();
        let _ = sh.vars.set_scalar("n", "0".into(), Scope::Global);
        assert_eq!(eval_in(&mut sh, "0 && (n = 9)"), 0);
        assert_eq!(sh.vars.get_scalar("n").as_deref(), Some("0"));
        assert_eq!(eval_in(&mut sh, "1 || (n = 9)"), 1);
        assert_eq!(sh.vars.get_scalar("n").as_deref(), Some("0"));
    }

    #[test]
    fn array_elements() {
        let mut sh = shell();
        let _ = sh
            .vars
            .set_value("a", Value::indexed_from(vec!["10".into(), "20".into()]), Scope::Global);
        assert_eq!(eval_in(&mut sh, "a[0] + a[1]"), 30);
        assert_eq!(eval_in(&mut sh, "a[1] = 99"), 99);
        assert_eq!(eval_in(&mut sh, "a[1]"), 99);
    }

    #[test]
    fn comma_returns_last() {
        let mut sh = shell();
        assert_eq!(eval_in(&mut sh, "x = 1, x + 10"), 11);
    }

    #[test]
    fn wrapping_at_i64() {
        let mut sh = shell();
        assert_eq!(eval_in(&mut sh, "9223372036854775807 + 1"), i64::MIN);
    }

    #[test]
    fn self_reference_detected() {
        let mut sh = shell();
        let _ = sh.vars.set_scalar("loop", "loop + 1".into(), Scope::Global);
        assert!(eval_text(&mut sh, "loop").is_err());
    }
}
