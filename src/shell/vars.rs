//! Variable store and scope stack.
//!
//! Process-wide shell variables: scalars, sparse indexed arrays, and
//! associative arrays (insertion-ordered), with attributes and
//! dynamic scoping. The bottom frame is the global scope; function
//! invocation pushes a frame; `local` binds in the top frame; lookup
//! and assignment walk top to bottom, so inner functions see (and
//! mutate) the caller's locals unless they shadow them.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VarError {
    #[error("{0}: readonly variable")]
    Readonly(String),
    #[error("{0}: not a valid identifier")]
    BadName(String),
}

/// Variable value. Indexed arrays are sparse with ordered integer
/// keys; associative arrays preserve insertion order for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    Indexed(BTreeMap<i64, String>),
    Assoc(IndexMap<String, String>),
}

impl Value {
    pub fn indexed_from(items: Vec<String>) -> Self {
        Value::Indexed(items.into_iter().enumerate().map(|(i, v)| (i as i64, v)).collect())
    }

    /// The scalar view: arrays read as their first element.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::Indexed(map) => map.get(&0).map(|s| s.as_str()),
            Value::Assoc(map) => map.get("0").map(|s| s.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attributes {
    pub readonly: bool,
    pub exported: bool,
    /// Assignment evaluates the value as an arithmetic expression.
    pub integer: bool,
    pub lowercase: bool,
    pub uppercase: bool,
}

#[derive(Debug, Clone)]
pub struct Variable {
    /// `None` means declared but unset (`declare -a arr`).
    pub value: Option<Value>,
    pub attrs: Attributes,
}

impl Variable {
    fn scalar(value: String) -> Self {
        Self {
            value: Some(Value::Scalar(value)),
            attrs: Attributes::default(),
        }
    }
}

/// Positional parameters plus `$0`, stacked per function / dot-script
/// activation.
#[derive(Debug, Clone)]
pub struct PositionalFrame {
    pub zero: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct Frame {
    vars: IndexMap<String, Variable>,
}

/// Scope selector for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Update the nearest existing binding, else create globally.
    Nearest,
    /// Bind in the current (top) frame, shadowing outer scopes.
    Local,
    /// Bind in the global frame regardless of shadows.
    Global,
}

#[derive(Debug, Clone)]
pub struct VarStore {
    frames: Vec<Frame>,
    positional: Vec<PositionalFrame>,
}

impl VarStore {
    pub fn new(script_name: impl Into<String>) -> Self {
        Self {
            frames: vec![Frame::default()],
            positional: vec![PositionalFrame {
                zero: script_name.into(),
                params: Vec::new(),
            }],
        }
    }

    // ---- scope stack -------------------------------------------------------

    pub fn push_function_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop_function_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    // ---- lookup ------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.frames.iter().rev().find_map(|f| f.vars.get(name))
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.frames.iter_mut().rev().find_map(|f| f.vars.get_mut(name))
    }

    pub fn get_scalar(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|v| v.value.as_ref())
            .and_then(|v| v.as_scalar())
            .map(str::to_string)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).map_or(false, |v| v.value.is_some())
    }

    pub fn is_readonly(&self, name: &str) -> bool {
        self.get(name).map_or(false, |v| v.attrs.readonly)
    }

    pub fn attrs(&self, name: &str) -> Attributes {
        self.get(name).map(|v| v.attrs).unwrap_or_default()
    }

    /// All visible bindings, nearest wins; for `declare -p` and
    /// `${!prefix*}`.
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for frame in self.frames.iter().rev() {
            for name in frame.vars.keys() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.clone());
                }
            }
        }
        names.sort();
        names
    }

    /// Exported name=value pairs for a child environment.
    pub fn environment(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        for name in self.visible_names() {
            if let Some(var) = self.get(&name) {
                if var.attrs.exported {
                    if let Some(value) = var.value.as_ref().and_then(|v| v.as_scalar()) {
                        env.push((name.clone(), value.to_string()));
                    }
                }
            }
        }
        env
    }

    // ---- writes ------------------------------------------------------------

    /// Case-transform on assignment per attributes.
    fn transform(attrs: Attributes, value: String) -> String {
        if attrs.uppercase {
            value.to_uppercase()
        } else if attrs.lowercase {
            value.to_lowercase()
        } else {
            value
        }
    }

    fn frame_index_for(&self, name: &str, scope: Scope) -> usize {
        match scope {
            Scope::Global => 0,
            Scope::Local => self.frames.len() - 1,
            Scope::Nearest => {
                for (i, frame) in self.frames.iter().enumerate().rev() {
                    if frame.vars.contains_key(name) {
                        return i;
                    }
                }
                0
            }
        }
    }

    pub fn set_scalar(&mut self, name: &str, value: String, scope: Scope) -> Result<(), VarError> {
        if !crate::parser::lexer::is_valid_name(name) {
            return Err(VarError::BadName(name.to_string()));
        }
        let index = self.frame_index_for(name, scope);
        let frame = &mut self.frames[index];
        match frame.vars.get_mut(name) {
            Some(var) => {
                if var.attrs.readonly {
                    return Err(VarError::Readonly(name.to_string()));
                }
                let value = Self::transform(var.attrs, value);
                // Assigning a scalar to an array variable writes
                // element zero.
                match &mut var.value {
                    Some(Value::Indexed(map)) => {
                        map.insert(0, value);
                    }
                    Some(Value::Assoc(map)) => {
                        map.insert("0".to_string(), value);
                    }
                    _ => var.value = Some(Value::Scalar(value)),
                }
            }
            None => {
                // Readonly may shadow in an outer frame when scope is
                // Local; that is a fresh binding and is allowed.
                frame.vars.insert(name.to_string(), Variable::scalar(value));
            }
        }
        Ok(())
    }

    /// Append (`+=`) preserving the scalar/array shape.
    pub fn append_scalar(&mut self, name: &str, value: &str, scope: Scope) -> Result<(), VarError> {
        let current = self.get_scalar(name).unwrap_or_default();
        self.set_scalar(name, format!("{current}{value}"), scope)
    }

    pub fn set_value(&mut self, name: &str, value: Value, scope: Scope) -> Result<(), VarError> {
        if !crate::parser::lexer::is_valid_name(name) {
            return Err(VarError::BadName(name.to_string()));
        }
        let index = self.frame_index_for(name, scope);
        let frame = &mut self.frames[index];
        match frame.vars.get_mut(name) {
            Some(var) => {
                if var.attrs.readonly {
                    return Err(VarError::Readonly(name.to_string()));
                }
                var.value = Some(value);
            }
            None => {
                frame.vars.insert(
                    name.to_string(),
                    Variable {
                        value: Some(value),
                        attrs: Attributes::default(),
                    },
                );
            }
        }
        Ok(())
    }

    /// Declare without assigning (e.g. `local x`, `declare -a a`).
    pub fn declare(&mut self, name: &str, value: Option<Value>, scope: Scope) -> Result<(), VarError> {
        if !crate::parser::lexer::is_valid_name(name) {
            return Err(VarError::BadName(name.to_string()));
        }
        let index = self.frame_index_for(name, scope);
        let frame = &mut self.frames[index];
        match frame.vars.get_mut(name) {
            Some(var) => {
                if var.attrs.readonly && value.is_some() {
                    return Err(VarError::Readonly(name.to_string()));
                }
                if value.is_some() {
                    var.value = value;
                }
            }
            None => {
                frame.vars.insert(
                    name.to_string(),
                    Variable {
                        value,
                        attrs: Attributes::default(),
                    },
                );
            }
        }
        Ok(())
    }

    pub fn set_element(
        &mut self,
        name: &str,
        key: ArrayKey,
        value: String,
        scope: Scope,
    ) -> Result<(), VarError> {
        if !crate::parser::lexer::is_valid_name(name) {
            return Err(VarError::BadName(name.to_string()));
        }
        let index = self.frame_index_for(name, scope);
        let frame = &mut self.frames[index];
        let var = frame
            .vars
            .entry(name.to_string())
            .or_insert_with(|| Variable {
                value: None,
                attrs: Attributes::default(),
            });
        if var.attrs.readonly {
            return Err(VarError::Readonly(name.to_string()));
        }
        let value = Self::transform(var.attrs, value);
        match (&mut var.value, key) {
            (Some(Value::Assoc(map)), ArrayKey::Key(k)) => {
                map.insert(k, value);
            }
            (Some(Value::Assoc(map)), ArrayKey::Index(i)) => {
                map.insert(i.to_string(), value);
            }
            (Some(Value::Indexed(map)), ArrayKey::Index(i)) => {
                map.insert(i, value);
            }
            (Some(Value::Indexed(map)), ArrayKey::Key(k)) => {
                // String key on an indexed array: bash evaluates it
                // arithmetically; a plain word lands at 0. Callers
                // evaluate first, so this is the fallback.
                let i = k.parse::<i64>().unwrap_or(0);
                map.insert(i, value);
            }
            (slot, key) => {
                // Subscript assignment converts a scalar (or unset
                // variable) to an indexed array, keeping the old
                // value at 0.
                let mut map = BTreeMap::new();
                if let Some(Value::Scalar(old)) = slot.take() {
                    map.insert(0, old);
                }
                match key {
                    ArrayKey::Index(i) => {
                        map.insert(i, value);
                    }
                    ArrayKey::Key(k) => {
                        map.insert(k.parse::<i64>().unwrap_or(0), value);
                    }
                }
                *slot = Some(Value::Indexed(map));
            }
        }
        Ok(())
    }

    /// Next free index for `arr+=(value)`.
    pub fn next_index(&self, name: &str) -> i64 {
        match self.get(name).and_then(|v| v.value.as_ref()) {
            Some(Value::Indexed(map)) => map.keys().next_back().map_or(0, |k| k + 1),
            Some(Value::Scalar(_)) => 1,
            _ => 0,
        }
    }

    pub fn unset(&mut self, name: &str) -> Result<bool, VarError> {
        if self.is_readonly(name) {
            return Err(VarError::Readonly(name.to_string()));
        }
        for frame in self.frames.iter_mut().rev() {
            if frame.vars.shift_remove(name).is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn unset_element(&mut self, name: &str, key: &ArrayKey) -> Result<bool, VarError> {
        if self.is_readonly(name) {
            return Err(VarError::Readonly(name.to_string()));
        }
        if let Some(var) = self.get_mut(name) {
            match (&mut var.value, key) {
                (Some(Value::Indexed(map)), ArrayKey::Index(i)) => {
                    return Ok(map.remove(i).is_some())
                }
                (Some(Value::Assoc(map)), ArrayKey::Key(k)) => {
                    return Ok(map.shift_remove(k).is_some())
                }
                (Some(Value::Assoc(map)), ArrayKey::Index(i)) => {
                    return Ok(map.shift_remove(&i.to_string()).is_some())
                }
                _ => return Ok(false),
            }
        }
        Ok(false)
    }

    /// Adjust attributes on the nearest binding, creating an unset
    /// one when absent. Clearing readonly is refused.
    pub fn modify_attrs(
        &mut self,
        name: &str,
        apply: impl FnOnce(&mut Attributes) -> Result<(), VarError>,
        scope: Scope,
    ) -> Result<(), VarError> {
        if !crate::parser::lexer::is_valid_name(name) {
            return Err(VarError::BadName(name.to_string()));
        }
        let index = self.frame_index_for(name, scope);
        let frame = &mut self.frames[index];
        let var = frame
            .vars
            .entry(name.to_string())
            .or_insert_with(|| Variable {
                value: None,
                attrs: Attributes::default(),
            });
        apply(&mut var.attrs)
    }

    /// Snapshot a binding for command-prefix assignments on regular
    /// builtins and functions.
    pub fn snapshot(&self, name: &str) -> Option<Variable> {
        self.get(name).cloned()
    }

    /// Put a snapshot back (or remove the binding it replaced).
    pub fn restore_binding(&mut self, name: &str, snapshot: Option<Variable>) {
        match snapshot {
            Some(var) => {
                let index = self.frame_index_for(name, Scope::Nearest);
                self.frames[index].vars.insert(name.to_string(), var);
            }
            None => {
                for frame in self.frames.iter_mut().rev() {
                    if frame.vars.shift_remove(name).is_some() {
                        break;
                    }
                }
            }
        }
    }

    // ---- positional parameters --------------------------------------------

    pub fn positional(&self) -> &PositionalFrame {
        self.positional.last().expect("positional stack never empty")
    }

    pub fn positional_mut(&mut self) -> &mut PositionalFrame {
        self.positional.last_mut().expect("positional stack never empty")
    }

    pub fn push_positional(&mut self, zero: String, params: Vec<String>) {
        self.positional.push(PositionalFrame { zero, params });
    }

    pub fn pop_positional(&mut self) {
        if self.positional.len() > 1 {
            self.positional.pop();
        }
    }
}

/// Array subscript after evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayKey {
    Index(i64),
    Key(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VarStore {
        VarStore::new("test")
    }

    #[test]
    fn scalar_set_get() {
        let mut s = store();
        s.set_scalar("x", "1".into(), Scope::Nearest).unwrap();
        assert_eq!(s.get_scalar("x").as_deref(), Some("1"));
    }

    #[test]
    fn dynamic_scoping() {
        // f(){ local x=1; g; echo $x; }; g(){ x=2; }
        let mut s = store();
        s.set_scalar("x", "0".into(), Scope::Nearest).unwrap();
        s.push_function_frame(); // f
        s.set_scalar("x", "1".into(), Scope::Local).unwrap();
        s.push_function_frame(); // g
        // g's plain assignment finds f's local.
        s.set_scalar("x", "2".into(), Scope::Nearest).unwrap();
        s.pop_function_frame();
        assert_eq!(s.get_scalar("x").as_deref(), Some("2"));
        s.pop_function_frame();
        // The global is untouched.
        assert_eq!(s.get_scalar("x").as_deref(), Some("0"));
    }

    #[test]
    fn local_shadowing_with_same_name() {
        let mut s = store();
        s.push_function_frame();
        s.set_scalar("v", "outer-local".into(), Scope::Local).unwrap();
        s.push_function_frame();
        s.set_scalar("v", "inner-local".into(), Scope::Local).unwrap();
        assert_eq!(s.get_scalar("v").as_deref(), Some("inner-local"));
        s.pop_function_frame();
        assert_eq!(s.get_scalar("v").as_deref(), Some("outer-local"));
    }

    #[test]
    fn global_write_bypasses_shadow() {
        let mut s = store();
        s.push_function_frame();
        s.set_scalar("g", "local".into(), Scope::Local).unwrap();
        s.set_scalar("g", "global".into(), Scope::Global).unwrap();
        s.pop_function_frame();
        assert_eq!(s.get_scalar("g").as_deref(), Some("global"));
    }

    #[test]
    fn readonly_blocks_mutation() {
        let mut s = store();
        s.set_scalar("r", "1".into(), Scope::Nearest).unwrap();
        s.modify_attrs("r", |a| { a.readonly = true; Ok(()) }, Scope::Nearest).unwrap();
        assert!(matches!(
            s.set_scalar("r", "2".into(), Scope::Nearest),
            Err(VarError::Readonly(_))
        ));
        assert!(matches!(s.unset("r"), Err(VarError::Readonly(_))));
        assert_eq!(s.get_scalar("r").as_deref(), Some("1"));
    }

    #[test]
    fn indexed_arrays_sparse() {
        let mut s = store();
        s.set_element("a", ArrayKey::Index(0), "x".into(), Scope::Nearest).unwrap();
        s.set_element("a", ArrayKey::Index(5), "y".into(), Scope::Nearest).unwrap();
        assert_eq!(s.next_index("a"), 6);
        // Scalar view is element 0.
        assert_eq!(s.get_scalar("a").as_deref(), Some("x"));
    }

    #[test]
    fn scalar_converts_to_array_on_subscript() {
        let mut s = store();
        s.set_scalar("a", "zero".into(), Scope::Nearest).unwrap();
        s.set_element("a", ArrayKey::Index(1), "one".into(), Scope::Nearest).unwrap();
        match s.get("a").unwrap().value.as_ref().unwrap() {
            Value::Indexed(map) => {
                assert_eq!(map.get(&0).map(String::as_str), Some("zero"));
                assert_eq!(map.get(&1).map(String::as_str), Some("one"));
            }
            other => panic!("expected indexed array, got {other:?}"),
        }
    }

    #[test]
    fn assoc_insertion_order() {
        let mut s = store();
        s.declare("m", Some(Value::Assoc(IndexMap::new())), Scope::Nearest).unwrap();
        s.set_element("m", ArrayKey::Key("zz".into()), "1".into(), Scope::Nearest).unwrap();
        s.set_element("m", ArrayKey::Key("aa".into()), "2".into(), Scope::Nearest).unwrap();
        match s.get("m").unwrap().value.as_ref().unwrap() {
            Value::Assoc(map) => {
                let keys: Vec<&String> = map.keys().collect();
                assert_eq!(keys, vec!["zz", "aa"]);
            }
            other => panic!("expected assoc array, got {other:?}"),
        }
    }

    #[test]
    fn case_attribute_transforms_on_assignment() {
        let mut s = store();
        s.modify_attrs("u", |a| { a.uppercase = true; Ok(()) }, Scope::Nearest).unwrap();
        s.set_scalar("u", "hello".into(), Scope::Nearest).unwrap();
        assert_eq!(s.get_scalar("u").as_deref(), Some("HELLO"));
    }

    #[test]
    fn environment_only_exports() {
        let mut s = store();
        s.set_scalar("a", "1".into(), Scope::Nearest).unwrap();
        s.set_scalar("b", "2".into(), Scope::Nearest).unwrap();
        s.modify_attrs("b", |at| { at.exported = true; Ok(()) }, Scope::Nearest).unwrap();
        let env = s.environment();
        assert!(env.iter().any(|(n, v)| n == "b" && v == "2"));
        assert!(!env.iter().any(|(n, _)| n == "a"));
    }

    #[test]
    fn unset_reveals_outer_binding() {
        let mut s = store();
        s.set_scalar("x", "global".into(), Scope::Nearest).unwrap();
        s.push_function_frame();
        s.set_scalar("x", "local".into(), Scope::Local).unwrap();
        s.unset("x").unwrap();
        assert_eq!(s.get_scalar("x").as_deref(), Some("global"));
    }

    #[test]
    fn positional_frames() {
        let mut s = store();
        s.positional_mut().params = vec!["a".into(), "b".into()];
        s.push_positional("fn".into(), vec!["c".into()]);
        assert_eq!(s.positional().zero, "fn");
        assert_eq!(s.positional().params, vec!["c".to_string()]);
        s.pop_positional();
        assert_eq!(s.positional().params.len(), 2);
    }
}
