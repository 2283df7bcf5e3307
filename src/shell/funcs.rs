//! Function and alias tables.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{CompoundCommandNode, RedirectionNode};

/// A registered function. The body is shared by reference count with
/// the AST that defined it; redefinition drops the old handle.
#[derive(Debug, Clone)]
pub struct ShellFunction {
    pub name: String,
    pub body: Rc<CompoundCommandNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, ShellFunction>,
}

impl FunctionTable {
    pub fn define(&mut self, function: ShellFunction) {
        self.functions.insert(function.name.clone(), function);
    }

    pub fn get(&self, name: &str) -> Option<&ShellFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.functions.remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Alias table. Expansion happens in the parser at command-word
/// position; the once-per-expansion guard lives there.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.aliases.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.aliases.get(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.aliases.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    pub fn map(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.aliases.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{GroupNode, ScriptNode, Span};

    #[test]
    fn define_and_remove_function() {
        let mut table = FunctionTable::default();
        table.define(ShellFunction {
            name: "f".into(),
            body: Rc::new(CompoundCommandNode::Group(GroupNode {
                body: ScriptNode { items: vec![] },
                redirections: vec![],
                span: Span::default(),
            })),
            redirections: vec![],
        });
        assert!(table.contains("f"));
        assert!(table.remove("f"));
        assert!(!table.contains("f"));
    }

    #[test]
    fn alias_roundtrip() {
        let mut table = AliasTable::default();
        table.define("ll", "ls -l");
        assert_eq!(table.get("ll").map(String::as_str), Some("ls -l"));
        assert!(table.remove("ll"));
        assert!(table.get("ll").is_none());
    }
}
