//! Template variable store.
//!
//! Holds the values a template sees for names that are not loop variables:
//! `/let` lines from the config file and `-D` definitions on the command line.

use std::collections::HashMap;

use crate::script::context::VarContext;
use crate::script::value::Value;

/// Named template values.
#[derive(Debug, Clone, Default)]
pub struct VarStore {
    vars: HashMap<String, Value>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Copy every variable of `other` into `self`, overwriting duplicates.
    pub fn extend(&mut self, other: VarStore) {
        self.vars.extend(other.vars);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl VarContext for VarStore {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut vars = VarStore::new();
        vars.set("n", 3_i64);
        assert_eq!(vars.get("n"), Some(&Value::Int(3)));
    }

    #[test]
    fn overwrite() {
        let mut vars = VarStore::new();
        vars.set("x", "old");
        vars.set("x", 1.5_f64);
        assert_eq!(vars.get("x"), Some(&Value::Float(1.5)));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn extend_overwrites() {
        let mut base = VarStore::new();
        base.set("a", 1_i64);
        base.set("b", 2_i64);
        let mut over = VarStore::new();
        over.set("b", "two");
        base.extend(over);
        assert_eq!(base.get("a"), Some(&Value::Int(1)));
        assert_eq!(base.get("b"), Some(&Value::Str("two".into())));
    }

    #[test]
    fn resolves_as_context() {
        let mut vars = VarStore::new();
        vars.set("present", "yes");
        assert_eq!(vars.resolve("present"), Some(Value::Str("yes".into())));
        assert_eq!(vars.resolve("absent"), None);
    }
}
