//! Runtime value type and numeric coercion.
//!
//! Template values are dynamically typed.  Every arithmetic operator and the
//! loop comparison run their operands through the same three-step coercion:
//!
//! 1. [`Value::Null`] becomes integer zero.
//! 2. A [`Value::Str`] is parsed: integer grammar first, then float grammar;
//!    anything else is a [`ValueError::Format`].
//! 3. If either side is now a float the other is promoted and the result is
//!    a float; otherwise the operation is carried out on `i64` (wrapping).

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// A template runtime value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

/// Failure while coercing or combining two values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("cannot interpret {0:?} as a number")]
    Format(String),

    #[error("{0}")]
    Arithmetic(&'static str),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                // Whole floats keep one decimal so they read as floats.
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A value after coercion: always one of the two numeric kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }
}

impl From<Num> for Value {
    fn from(n: Num) -> Self {
        match n {
            Num::Int(n) => Value::Int(n),
            Num::Float(x) => Value::Float(x),
        }
    }
}

// ── Literal grammars ─────────────────────────────────────────────────────────

fn int_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?[0-9]+$").expect("integer grammar is a valid regex"))
}

fn float_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$")
            .expect("float grammar is a valid regex")
    })
}

/// Parse a string as a number using the coercion grammars.
///
/// Integer text that overflows `i64` still matches the float grammar and is
/// returned as a float.
pub fn parse_number(s: &str) -> Result<Value, ValueError> {
    if int_grammar().is_match(s) {
        if let Ok(n) = s.parse::<i64>() {
            return Ok(Value::Int(n));
        }
    }
    if float_grammar().is_match(s) {
        if let Ok(x) = s.parse::<f64>() {
            return Ok(Value::Float(x));
        }
    }
    Err(ValueError::Format(s.to_owned()))
}

/// Binary operators understood by [`Value::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    pub fn from_symbol(c: char) -> Option<Self> {
        Some(match c {
            '+' => BinOp::Add,
            '-' => BinOp::Sub,
            '*' => BinOp::Mul,
            '/' => BinOp::Div,
            '^' => BinOp::Pow,
            _ => return None,
        })
    }

    pub fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
            BinOp::Pow => '^',
        }
    }
}

impl Value {
    /// Coerce to a number without changing its text (steps 1 and 2).
    pub fn to_number(&self) -> Result<Value, ValueError> {
        self.coerce().map(Value::from)
    }

    fn coerce(&self) -> Result<Num, ValueError> {
        match self {
            Value::Null => Ok(Num::Int(0)),
            Value::Int(n) => Ok(Num::Int(*n)),
            Value::Float(x) => Ok(Num::Float(*x)),
            Value::Str(s) => match parse_number(s)? {
                Value::Int(n) => Ok(Num::Int(n)),
                Value::Float(x) => Ok(Num::Float(x)),
                _ => Err(ValueError::Format(s.clone())),
            },
        }
    }

    /// Coerce both operands and promote to a common kind (step 3).
    fn promote(&self, rhs: &Value) -> Result<(Num, Num), ValueError> {
        let (a, b) = (self.coerce()?, rhs.coerce()?);
        Ok(match (a, b) {
            (Num::Int(_), Num::Int(_)) => (a, b),
            _ => (Num::Float(a.as_f64()), Num::Float(b.as_f64())),
        })
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    pub fn apply(&self, op: BinOp, rhs: &Value) -> Result<Value, ValueError> {
        match op {
            BinOp::Add => self.arith_add(rhs),
            BinOp::Sub => self.arith_sub(rhs),
            BinOp::Mul => self.arith_mul(rhs),
            BinOp::Div => self.arith_div(rhs),
            BinOp::Pow => self.arith_pow(rhs),
        }
    }

    pub fn arith_add(&self, rhs: &Value) -> Result<Value, ValueError> {
        Ok(match self.promote(rhs)? {
            (Num::Int(a), Num::Int(b)) => Value::Int(a.wrapping_add(b)),
            (a, b) => Value::Float(a.as_f64() + b.as_f64()),
        })
    }

    pub fn arith_sub(&self, rhs: &Value) -> Result<Value, ValueError> {
        Ok(match self.promote(rhs)? {
            (Num::Int(a), Num::Int(b)) => Value::Int(a.wrapping_sub(b)),
            (a, b) => Value::Float(a.as_f64() - b.as_f64()),
        })
    }

    pub fn arith_mul(&self, rhs: &Value) -> Result<Value, ValueError> {
        Ok(match self.promote(rhs)? {
            (Num::Int(a), Num::Int(b)) => Value::Int(a.wrapping_mul(b)),
            (a, b) => Value::Float(a.as_f64() * b.as_f64()),
        })
    }

    /// Integer division by zero is an error; float division follows IEEE 754.
    pub fn arith_div(&self, rhs: &Value) -> Result<Value, ValueError> {
        match self.promote(rhs)? {
            (Num::Int(_), Num::Int(0)) => Err(ValueError::Arithmetic("integer division by zero")),
            (Num::Int(a), Num::Int(b)) => Ok(Value::Int(a.wrapping_div(b))),
            (a, b) => Ok(Value::Float(a.as_f64() / b.as_f64())),
        }
    }

    pub fn arith_pow(&self, rhs: &Value) -> Result<Value, ValueError> {
        Ok(match self.promote(rhs)? {
            (Num::Int(a), Num::Int(b)) => match u32::try_from(b) {
                Ok(exp) => Value::Int(a.wrapping_pow(exp)),
                Err(_) => Value::Float((a as f64).powf(b as f64)),
            },
            (a, b) => Value::Float(a.as_f64().powf(b.as_f64())),
        })
    }

    /// Numeric ordering after coercion.  A NaN on either side orders as
    /// `Greater`, so loops comparing against it stop.
    pub fn num_compare(&self, rhs: &Value) -> Result<Ordering, ValueError> {
        Ok(match self.promote(rhs)? {
            (Num::Int(a), Num::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Greater),
        })
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
