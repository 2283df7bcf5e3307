//! eval — re-lex, re-parse, and run arguments in the current shell.

use crate::exec::{interp, Flow};
use crate::shell::Shell;

pub fn run(shell: &mut Shell, args: &[String]) -> Flow {
    let source = args.join(" ");
    if source.trim().is_empty() {
        return Flow::Normal(0);
    }
    let script = match crate::parser::parse_with_aliases(&source, shell.aliases.map()) {
        Ok(script) => script,
        Err(e) => {
            shell.report_error(&format!("eval: {e}"));
            return Flow::Normal(2);
        }
    };
    interp::run_script(shell, &script)
}
