//! AST pretty-printer for the introspection surface.
//!
//! Renders a parsed script as an indented tree. The executor dumps
//! this to stderr when AST tracing is enabled; command stdout is
//! never touched.

use std::fmt::Write;

use super::types::*;

/// Render a script as an indented tree.
pub fn dump_script(script: &ScriptNode) -> String {
    let mut out = String::new();
    let mut p = Printer { out: &mut out, depth: 0 };
    p.script(script);
    out
}

struct Printer<'a> {
    out: &'a mut String,
    depth: usize,
}

impl Printer<'_> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn nested(&mut self, header: &str, f: impl FnOnce(&mut Self)) {
        self.line(header);
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn script(&mut self, script: &ScriptNode) {
        for item in &script.items {
            let tag = if item.background { "list-item &" } else { "list-item" };
            let header = format!("{} @{}:{}", tag, item.span.start.line, item.span.start.column);
            self.nested(&header, |p| p.and_or(&item.and_or));
        }
    }

    fn and_or(&mut self, node: &AndOrNode) {
        self.pipeline(&node.first);
        for (op, pipeline) in &node.rest {
            let text = match op {
                AndOrOperator::And => "&&",
                AndOrOperator::Or => "||",
            };
            self.line(text);
            self.pipeline(pipeline);
        }
    }

    fn pipeline(&mut self, node: &PipelineNode) {
        let mut header = String::from("pipeline");
        if node.negated {
            header.push_str(" !");
        }
        if node.timed {
            header.push_str(" time");
        }
        self.nested(&header, |p| {
            for command in &node.commands {
                p.command(command);
            }
        });
    }

    fn command(&mut self, node: &CommandNode) {
        match node {
            CommandNode::Simple(simple) => self.simple(simple),
            CommandNode::Compound(compound) => self.compound(compound),
            CommandNode::FunctionDef(def) => {
                let header = format!("function {}", def.name);
                self.nested(&header, |p| p.compound(&def.body));
            }
        }
    }

    fn simple(&mut self, node: &SimpleCommandNode) {
        self.nested("simple-command", |p| {
            for assignment in &node.assignments {
                let mut text = format!("assign {}", assignment.name);
                if let Some(sub) = &assignment.subscript {
                    let _ = write!(text, "[{sub}]");
                }
                if assignment.append {
                    text.push_str(" +=");
                }
                if assignment.array.is_some() {
                    text.push_str(" (array)");
                }
                p.line(&text);
            }
            if let Some(name) = &node.name {
                p.line(&format!("argv0 {}", describe_word(name)));
            }
            for arg in &node.args {
                p.line(&format!("arg   {}", describe_word(arg)));
            }
            for redirection in &node.redirections {
                p.redirection(redirection);
            }
        });
    }

    fn redirection(&mut self, node: &RedirectionNode) {
        let fd = node
            .fd
            .map(|fd| fd.to_string())
            .unwrap_or_default();
        let target = match &node.target {
            RedirectionTarget::Word(word) => describe_word(word),
            RedirectionTarget::HereDoc(doc) => format!("heredoc <<{}", doc.delimiter),
        };
        self.line(&format!("redirect {}{} {}", fd, node.operator, target));
    }

    fn compound(&mut self, node: &CompoundCommandNode) {
        match node {
            CompoundCommandNode::If(n) => self.nested("if", |p| {
                for clause in &n.clauses {
                    p.nested("condition", |p| p.script(&clause.condition));
                    p.nested("then", |p| p.script(&clause.body));
                }
                if let Some(else_body) = &n.else_body {
                    p.nested("else", |p| p.script(else_body));
                }
            }),
            CompoundCommandNode::For(n) => {
                let header = format!("for {}", n.variable);
                self.nested(&header, |p| {
                    if let Some(words) = &n.words {
                        for word in words {
                            p.line(&format!("word {}", describe_word(word)));
                        }
                    } else {
                        p.line("in \"$@\"");
                    }
                    p.nested("body", |p| p.script(&n.body));
                });
            }
            CompoundCommandNode::CStyleFor(n) => self.nested("for ((;;))", |p| {
                if let Some(init) = &n.init {
                    p.line(&format!("init {}", init.text));
                }
                if let Some(cond) = &n.condition {
                    p.line(&format!("cond {}", cond.text));
                }
                if let Some(update) = &n.update {
                    p.line(&format!("update {}", update.text));
                }
                p.nested("body", |p| p.script(&n.body));
            }),
            CompoundCommandNode::While(n) => self.nested("while", |p| {
                p.nested("condition", |p| p.script(&n.condition));
                p.nested("body", |p| p.script(&n.body));
            }),
            CompoundCommandNode::Until(n) => self.nested("until", |p| {
                p.nested("condition", |p| p.script(&n.condition));
                p.nested("body", |p| p.script(&n.body));
            }),
            CompoundCommandNode::Case(n) => {
                let header = format!("case {}", describe_word(&n.word));
                self.nested(&header, |p| {
                    for item in &n.items {
                        let patterns: Vec<String> =
                            item.patterns.iter().map(describe_word).collect();
                        let terminator = match item.terminator {
                            CaseTerminator::Break => ";;",
                            CaseTerminator::FallThrough => ";&",
                            CaseTerminator::Continue => ";;&",
                        };
                        let header = format!("clause {} {}", patterns.join(" | "), terminator);
                        p.nested(&header, |p| p.script(&item.body));
                    }
                });
            }
            CompoundCommandNode::Select(n) => {
                let header = format!("select {}", n.variable);
                self.nested(&header, |p| {
                    if let Some(words) = &n.words {
                        for word in words {
                            p.line(&format!("word {}", describe_word(word)));
                        }
                    }
                    p.nested("body", |p| p.script(&n.body));
                });
            }
            CompoundCommandNode::Subshell(n) => self.nested("subshell", |p| p.script(&n.body)),
            CompoundCommandNode::Group(n) => self.nested("group", |p| p.script(&n.body)),
            CompoundCommandNode::Arithmetic(n) => {
                self.line(&format!("arith (( {} ))", n.expression.text));
            }
            CompoundCommandNode::Conditional(n) => {
                self.nested("conditional [[ ]]", |p| p.cond(&n.expression));
            }
        }
        for redirection in node.redirections() {
            self.redirection(redirection);
        }
    }

    fn cond(&mut self, expr: &CondExpr) {
        match expr {
            CondExpr::Not(inner) => self.nested("!", |p| p.cond(inner)),
            CondExpr::And(left, right) => self.nested("&&", |p| {
                p.cond(left);
                p.cond(right);
            }),
            CondExpr::Or(left, right) => self.nested("||", |p| {
                p.cond(left);
                p.cond(right);
            }),
            CondExpr::Group(inner) => self.nested("( )", |p| p.cond(inner)),
            CondExpr::Unary { op, operand } => {
                self.line(&format!("unary {:?} {}", op, describe_word(operand)));
            }
            CondExpr::Binary { op, left, right } => {
                self.line(&format!(
                    "binary {:?} {} {}",
                    op,
                    describe_word(left),
                    describe_word(right)
                ));
            }
            CondExpr::Word(word) => self.line(&format!("word {}", describe_word(word))),
        }
    }
}

/// One-line description of a word for tree output.
pub fn describe_word(word: &WordNode) -> String {
    let mut out = String::new();
    for part in &word.parts {
        describe_part(part, &mut out);
    }
    out
}

fn describe_part(part: &WordPart, out: &mut String) {
    match part {
        WordPart::Literal(text) => out.push_str(text),
        WordPart::SingleQuoted(text) => {
            let _ = write!(out, "'{text}'");
        }
        WordPart::DoubleQuoted(parts) => {
            out.push('"');
            for part in parts {
                describe_part(part, out);
            }
            out.push('"');
        }
        WordPart::Escaped(text) => {
            let _ = write!(out, "\\{text}");
        }
        WordPart::Parameter(param) => {
            let _ = write!(out, "${{{}", param.name);
            match &param.subscript {
                Some(Subscript::Index(index)) => {
                    let _ = write!(out, "[{index}]");
                }
                Some(Subscript::At) => out.push_str("[@]"),
                Some(Subscript::Star) => out.push_str("[*]"),
                None => {}
            }
            if param.operation.is_some() {
                out.push_str("...");
            }
            out.push('}');
        }
        WordPart::CommandSubstitution(_) => out.push_str("$(...)"),
        WordPart::Arithmetic(expr) => {
            let _ = write!(out, "$(({}))", expr.text);
        }
        WordPart::ProcessSubstitution(sub) => match sub.direction {
            ProcessDirection::Input => out.push_str("<(...)"),
            ProcessDirection::Output => out.push_str(">(...)"),
        },
        WordPart::Brace(_) => out.push_str("{...}"),
        WordPart::Tilde(user) => {
            out.push('~');
            if let Some(user) = user {
                out.push_str(user);
            }
        }
        WordPart::Glob(pattern) => out.push_str(pattern),
    }
}
