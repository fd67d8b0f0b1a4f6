//! Per-name value stacks for loop variables.
//!
//! Pushing a name that already has a value shadows it; popping reveals the
//! previous binding again.

use std::collections::HashMap;

use thiserror::Error;

use super::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no value bound to `{key}`")]
pub struct EmptyStackError {
    pub key: String,
}

#[derive(Debug, Default)]
pub struct MultiStack {
    stacks: HashMap<String, Vec<Value>>,
}

impl MultiStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: Value) {
        self.stacks.entry(key.into()).or_default().push(value);
    }

    /// Remove and return the most recent binding of `key`.
    ///
    /// A key whose stack becomes empty is dropped entirely.
    pub fn pop(&mut self, key: &str) -> Result<Value, EmptyStackError> {
        let stack = self.stacks.get_mut(key).ok_or_else(|| empty(key))?;
        let value = stack.pop().ok_or_else(|| empty(key))?;
        if stack.is_empty() {
            self.stacks.remove(key);
        }
        Ok(value)
    }

    pub fn peek(&self, key: &str) -> Result<&Value, EmptyStackError> {
        self.stacks
            .get(key)
            .and_then(|s| s.last())
            .ok_or_else(|| empty(key))
    }

    pub fn peek_mut(&mut self, key: &str) -> Result<&mut Value, EmptyStackError> {
        self.stacks
            .get_mut(key)
            .and_then(|s| s.last_mut())
            .ok_or_else(|| empty(key))
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.depth(key) == 0
    }

    /// Number of bindings currently stacked for `key`.
    pub fn depth(&self, key: &str) -> usize {
        self.stacks.get(key).map_or(0, Vec::len)
    }
}

fn empty(key: &str) -> EmptyStackError {
    EmptyStackError { key: key.to_owned() }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_peek() {
        let mut ms = MultiStack::new();
        ms.push("i", Value::Int(1));
        assert_eq!(ms.peek("i"), Ok(&Value::Int(1)));
        assert_eq!(ms.depth("i"), 1);
    }

    #[test]
    fn push_shadows_instead_of_overwriting() {
        let mut ms = MultiStack::new();
        ms.push("i", Value::Int(1));
        ms.push("i", Value::Str("inner".into()));
        assert_eq!(ms.pop("i"), Ok(Value::Str("inner".into())));
        assert_eq!(ms.pop("i"), Ok(Value::Int(1)));
        assert!(ms.is_empty("i"));
    }

    #[test]
    fn empty_or_absent_key_fails() {
        let mut ms = MultiStack::new();
        assert_eq!(ms.pop("nope"), Err(EmptyStackError { key: "nope".into() }));
        assert!(ms.peek("nope").is_err());
        ms.push("x", Value::Null);
        ms.pop("x").unwrap();
        assert!(ms.pop("x").is_err());
        assert!(ms.peek_mut("x").is_err());
    }

    #[test]
    fn peek_mut_updates_top_only() {
        let mut ms = MultiStack::new();
        ms.push("i", Value::Int(1));
        ms.push("i", Value::Int(10));
        *ms.peek_mut("i").unwrap() = Value::Int(11);
        assert_eq!(ms.pop("i"), Ok(Value::Int(11)));
        assert_eq!(ms.peek("i"), Ok(&Value::Int(1)));
    }

    #[test]
    fn keys_are_independent() {
        let mut ms = MultiStack::new();
        ms.push("a", Value::Int(1));
        ms.push("b", Value::Int(2));
        assert_eq!(ms.pop("a"), Ok(Value::Int(1)));
        assert_eq!(ms.peek("b"), Ok(&Value::Int(2)));
    }
}
