//! Leaf values inside a tag body.

use super::value::{BinOp, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    ConstantInt(i64),
    ConstantFloat(f64),
    StringLiteral(String),
    Variable(String),
    Function(String),
    Operator(BinOp),
}

impl Element {
    /// Source-level rendering: strings are re-quoted, functions keep `@`.
    pub fn as_text(&self) -> String {
        match self {
            Element::ConstantInt(n) => n.to_string(),
            Element::ConstantFloat(x) => format_float_literal(*x),
            Element::StringLiteral(s) => quote(s),
            Element::Variable(name) => name.clone(),
            Element::Function(name) => format!("@{name}"),
            Element::Operator(op) => op.symbol().to_string(),
        }
    }

    /// The runtime value of a constant element, `None` for everything else.
    pub fn constant_value(&self) -> Option<Value> {
        match self {
            Element::ConstantInt(n) => Some(Value::Int(*n)),
            Element::ConstantFloat(x) => Some(Value::Float(*x)),
            Element::StringLiteral(s) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }
}

/// Floats always carry a decimal point so they lex back as floats.
fn format_float_literal(x: f64) -> String {
    let s = x.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
