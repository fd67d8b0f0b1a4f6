//! Built-in `@functions` for echo tags.
//!
//! Functions work directly on the echo value stack: each pops its arguments
//! (last argument on top) and pushes its result.  The dispatcher is called
//! from the executor for every [`Element::Function`](super::element::Element).

use thiserror::Error;

use super::context::VarContext;
use super::value::{Value, ValueError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuiltinError {
    #[error("@{name} needs {needed} value(s) on the stack, found {found}")]
    Underflow {
        name: &'static str,
        needed: usize,
        found: usize,
    },

    #[error("@decfmt: invalid pattern {0:?}")]
    Pattern(String),

    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Dispatch a built-in function call against `stack`.
///
/// Returns `None` if `name` is not a built-in; the stack is then untouched.
pub fn call_builtin(
    name: &str,
    stack: &mut Vec<Value>,
    ctx: &dyn VarContext,
) -> Option<Result<(), BuiltinError>> {
    let result = match name {
        // ── Math functions ───────────────────────────────────────────────────
        "sin" => pop_args::<1>(stack, "sin").and_then(|[x]| {
            let deg = number(&x)?;
            stack.push(Value::Float(deg.to_radians().sin()));
            Ok(())
        }),
        "cos" => pop_args::<1>(stack, "cos").and_then(|[x]| {
            let deg = number(&x)?;
            stack.push(Value::Float(deg.to_radians().cos()));
            Ok(())
        }),

        // ── Formatting ───────────────────────────────────────────────────────
        "decfmt" => pop_args::<2>(stack, "decfmt").and_then(|[x, pattern]| {
            let formatted = decimal_format(number(&x)?, &pattern.to_string())?;
            stack.push(Value::Str(formatted));
            Ok(())
        }),

        // ── Stack shuffling ──────────────────────────────────────────────────
        "dup" => pop_args::<1>(stack, "dup").map(|[x]| {
            stack.push(x.clone());
            stack.push(x);
        }),
        "swap" => pop_args::<2>(stack, "swap").map(|[a, b]| {
            stack.push(b);
            stack.push(a);
        }),

        // ── Variable lookup ──────────────────────────────────────────────────
        "paramGet" => pop_args::<2>(stack, "paramGet").map(|[name, default]| {
            stack.push(ctx.resolve(&name.to_string()).unwrap_or(default));
        }),

        _ => return None,
    };
    Some(result)
}

/// Pop `N` values, returned in push order.
fn pop_args<const N: usize>(stack: &mut Vec<Value>, name: &'static str) -> Result<[Value; N], BuiltinError> {
    if stack.len() < N {
        return Err(BuiltinError::Underflow { name, needed: N, found: stack.len() });
    }
    let args = stack.split_off(stack.len() - N);
    args.try_into()
        .map_err(|_| BuiltinError::Underflow { name, needed: N, found: 0 })
}

fn number(v: &Value) -> Result<f64, ValueError> {
    Ok(match v.to_number()? {
        Value::Int(n) => n as f64,
        Value::Float(x) => x,
        other => return Err(ValueError::Format(other.to_string())),
    })
}

/// Format `x` with a decimal pattern: `0` is a mandatory digit, `#` an
/// optional one, and a single `.` separates the fraction digits.
pub fn decimal_format(x: f64, pattern: &str) -> Result<String, BuiltinError> {
    let (int_pat, frac_pat) = pattern.split_once('.').unwrap_or((pattern, ""));
    let valid = |p: &str| p.chars().all(|c| c == '0' || c == '#');
    if pattern.is_empty() || !valid(int_pat) || !valid(frac_pat) {
        return Err(BuiltinError::Pattern(pattern.to_owned()));
    }
    if !x.is_finite() {
        return Ok(x.to_string());
    }

    let min_int = int_pat.chars().filter(|&c| c == '0').count();
    let min_frac = frac_pat.chars().filter(|&c| c == '0').count();
    let max_frac = frac_pat.len();

    let rendered = format!("{:.*}", max_frac, x.abs());
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
    let frac_part = {
        let mut f = frac_part.to_owned();
        while f.len() > min_frac && f.ends_with('0') {
            f.pop();
        }
        f
    };
    let int_part = if int_part == "0" && min_int == 0 { "" } else { int_part };

    let mut out = String::new();
    let negative = x < 0.0 && (int_part.bytes().chain(frac_part.bytes())).any(|b| b != b'0');
    if negative {
        out.push('-');
    }
    for _ in int_part.len()..min_int {
        out.push('0');
    }
    out.push_str(int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(&frac_part);
    } else if out.is_empty() || out == "-" {
        out.push('0');
    }
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
