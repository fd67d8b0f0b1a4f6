//! Seams to the embedding program: where output goes and where variables
//! that are not loop variables come from.

use std::collections::HashMap;
use std::io;

use super::value::Value;

/// Append-only destination for rendered text.
pub trait OutputSink {
    fn write(&mut self, text: &str) -> io::Result<()>;
}

impl OutputSink for String {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.push_str(text);
        Ok(())
    }
}

/// Keeps every write as its own entry.
impl OutputSink for Vec<String> {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.push(text.to_owned());
        Ok(())
    }
}

/// Adapter from any [`io::Write`] to an [`OutputSink`].
pub struct IoSink<W: io::Write>(pub W);

impl<W: io::Write> OutputSink for IoSink<W> {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.0.write_all(text.as_bytes())
    }
}

/// Variable lookup consulted after the loop-variable stack.
pub trait VarContext {
    /// `None` when the name is unknown.
    fn resolve(&self, name: &str) -> Option<Value>;
}

impl VarContext for HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<C: VarContext + ?Sized> VarContext for &C {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }
}

/// A context that knows no variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl VarContext for EmptyContext {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}
