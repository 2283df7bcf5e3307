//! printf — formatted output, integer and string subset.
//!
//! The format string is reused until the arguments run out, as POSIX
//! requires. Supported conversions: `%s %c %d %i %u %x %X %o %%` with
//! `-`, `0`, width, and precision.

use crate::exec::Flow;
use crate::shell::Shell;

use super::{fail, out};

pub fn run(shell: &mut Shell, args: &[String]) -> Flow {
    let Some(format) = args.first() else {
        return fail(shell, "printf: usage: printf format [arguments]", 2);
    };
    let operands = &args[1..];
    let mut output = String::new();
    let mut next = 0usize;

    loop {
        let consumed = render(format, operands, &mut next, &mut output);
        // Repeat the format while operands remain, but only if it
        // consumed at least one.
        if next >= operands.len() || consumed == 0 {
            break;
        }
    }
    out(&output)
}

/// One pass over the format; returns how many operands it consumed.
fn render(format: &str, operands: &[String], next: &mut usize, out: &mut String) -> usize {
    let chars: Vec<char> = format.chars().collect();
    let mut consumed = 0usize;
    let mut i = 0usize;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                i += 1;
                match chars[i] {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'a' => out.push('\x07'),
                    'f' => out.push('\x0c'),
                    'v' => out.push('\x0b'),
                    '\\' => out.push('\\'),
                    '"' => out.push('"'),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
                i += 1;
            }
            '%' => {
                i += 1;
                if chars.get(i) == Some(&'%') {
                    out.push('%');
                    i += 1;
                    continue;
                }
                // Flags.
                let mut left = false;
                let mut zero = false;
                while let Some(&c) = chars.get(i) {
                    match c {
                        '-' => left = true,
                        '0' => zero = true,
                        '+' | ' ' | '#' => {}
                        _ => break,
                    }
                    i += 1;
                }
                let mut width = 0usize;
                while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                    width = width * 10 + (chars[i] as usize - '0' as usize);
                    i += 1;
                }
                let mut precision: Option<usize> = None;
                if chars.get(i) == Some(&'.') {
                    i += 1;
                    let mut p = 0usize;
                    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                        p = p * 10 + (chars[i] as usize - '0' as usize);
                        i += 1;
                    }
                    precision = Some(p);
                }
                let conversion = chars.get(i).copied().unwrap_or('s');
                i += 1;

                let operand = operands.get(*next).cloned().unwrap_or_default();
                if operands.get(*next).is_some() {
                    *next += 1;
                    consumed += 1;
                }
                let rendered = match conversion {
                    's' => {
                        let mut s = operand;
                        if let Some(p) = precision {
                            s = s.chars().take(p).collect();
                        }
                        s
                    }
                    'c' => operand.chars().next().map(|c| c.to_string()).unwrap_or_default(),
                    'd' | 'i' => parse_int(&operand).to_string(),
                    'u' => (parse_int(&operand) as u64).to_string(),
                    'x' => format!("{:x}", parse_int(&operand)),
                    'X' => format!("{:X}", parse_int(&operand)),
                    'o' => format!("{:o}", parse_int(&operand)),
                    other => format!("%{other}"),
                };
                out.push_str(&pad(&rendered, width, left, zero));
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    consumed
}

fn parse_int(text: &str) -> i64 {
    let trimmed = text.trim();
    // A leading quote yields the character code, as POSIX printf
    // specifies.
    if let Some(rest) = trimmed.strip_prefix('\'').or_else(|| trimmed.strip_prefix('"')) {
        return rest.chars().next().map(|c| c as i64).unwrap_or(0);
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).unwrap_or(0);
    }
    trimmed.parse().unwrap_or(0)
}

fn pad(text: &str, width: usize, left: bool, zero: bool) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let padding = width - len;
    if left {
        format!("{text}{}", " ".repeat(padding))
    } else if zero && text.chars().next().map_or(false, |c| c.is_ascii_digit() || c == '-') {
        if let Some(rest) = text.strip_prefix('-') {
            format!("-{}{rest}", "0".repeat(padding))
        } else {
            format!("{}{text}", "0".repeat(padding))
        }
    } else {
        format!("{}{text}", " ".repeat(padding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(format: &str, operands: &[&str]) -> String {
        let operands: Vec<String> = operands.iter().map(|s| s.to_string()).collect();
        let mut output = String::new();
        let mut next = 0;
        loop {
            let consumed = render(format, &operands, &mut next, &mut output);
            if next >= operands.len() || consumed == 0 {
                break;
            }
        }
        output
    }

    #[test]
    fn basic_conversions() {
        assert_eq!(fmt("%s-%d\\n", &["a", "7"]), "a-7\n");
        assert_eq!(fmt("%x", &["255"]), "ff");
        assert_eq!(fmt("%o", &["8"]), "10");
        assert_eq!(fmt("%c", &["hello"]), "h");
        assert_eq!(fmt("100%%", &[]), "100%");
    }

    #[test]
    fn width_and_precision() {
        assert_eq!(fmt("%5d", &["42"]), "   42");
        assert_eq!(fmt("%-5d|", &["42"]), "42   |");
        assert_eq!(fmt("%05d", &["42"]), "00042");
        assert_eq!(fmt("%.3s", &["abcdef"]), "abc");
    }

    #[test]
    fn format_reuse() {
        assert_eq!(fmt("[%s]", &["a", "b", "c"]), "[a][b][c]");
    }

    #[test]
    fn missing_operands_are_empty() {
        assert_eq!(fmt("%s:%d", &["x"]), "x:0");
    }

    #[test]
    fn char_code_operand() {
        assert_eq!(fmt("%d", &["'A"]), "65");
    }
}
