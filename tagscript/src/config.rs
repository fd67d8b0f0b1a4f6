//! Configuration file parser.
//!
//! A config file is a line-oriented script:
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `/set <name>=<value>` or `/set <name> <value>` | set an engine setting |
//! | `/let <name>=<value>` or `/let <name> <value>` | predefine a template variable |
//! | Lines starting with `;` or `#` | comment, ignored |
//! | Any other `/command` | silently skipped |
//!
//! Engine settings are `max_iterations` (a positive integer) and
//! `strict_variables` (`on`/`off`, `1`/`0`, `true`/`false`).

use std::path::Path;

use thiserror::Error;

use crate::script::value::{parse_number, Value};
use crate::var::VarStore;

// ── Public API ────────────────────────────────────────────────────────────────

/// Default ceiling on iterations of a single loop node.
pub const DEFAULT_MAX_ITERATIONS: u64 = 1_000_000;

/// Settings that change how the executor renders a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Iterations one loop node may run before rendering is aborted.
    pub max_iterations: u64,
    /// Fail on variables that are neither loop variables nor in the context.
    pub strict_variables: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            strict_variables: false,
        }
    }
}

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Parsed configuration: engine settings and predefined variables.
#[derive(Debug, Default)]
pub struct Config {
    pub engine: EngineConfig,
    pub vars: VarStore,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Unknown directives are skipped.  Returns the config and a list of any
    /// errors on recognised lines; a bad line leaves earlier settings intact.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let Some(rest) = line.strip_prefix('/') else { continue };

            let (cmd, args_str) = rest
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((rest, ""));
            let args_str = args_str.trim();

            let result = match cmd {
                "set" => parse_set(args_str, &mut config.engine),
                "let" => parse_let(args_str, &mut config.vars),
                _ => Ok(()),
            };
            if let Err(message) = result {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }
}

/// Interpret the right-hand side of an assignment.
///
/// Double-quoted text is always a string; otherwise numeric text becomes a
/// number and anything else is kept as a string.
pub fn literal_value(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.starts_with('"') {
        return Value::Str(split_args(raw).join(" "));
    }
    parse_number(raw).unwrap_or_else(|_| Value::Str(raw.to_owned()))
}

/// Split `name=value` (or `name value`) into its parts.
pub fn split_assignment(s: &str) -> Option<(&str, &str)> {
    let s = s.trim();
    let at = s.find(|c: char| c == '=' || c.is_ascii_whitespace())?;
    let (name, rest) = (&s[..at], s[at + 1..].trim_start());
    let value = rest.strip_prefix('=').unwrap_or(rest).trim();
    (!name.is_empty()).then_some((name, value))
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring double-quoted strings
/// and `\"` escapes within them.
fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if !cur.is_empty() {
                    args.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        args.push(cur);
    }
    args
}

// ── /set and /let ─────────────────────────────────────────────────────────────

fn parse_set(args: &str, engine: &mut EngineConfig) -> Result<(), String> {
    let (name, value) = split_assignment(args).ok_or("/set: requires <name>=<value>")?;
    match name {
        "max_iterations" => {
            engine.max_iterations = match value.parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => return Err(format!("/set: max_iterations must be a positive integer, got '{value}'")),
            };
        }
        "strict_variables" => {
            engine.strict_variables = parse_flag(value)
                .ok_or_else(|| format!("/set: strict_variables expects on/off, got '{value}'"))?;
        }
        other => return Err(format!("/set: unknown setting '{other}'")),
    }
    Ok(())
}

fn parse_let(args: &str, vars: &mut VarStore) -> Result<(), String> {
    let (name, value) = split_assignment(args).ok_or("/let: requires <name>=<value>")?;
    if !is_identifier(name) {
        return Err(format!("/let: '{name}' is not a valid variable name"));
    }
    vars.set(name, literal_value(value));
    Ok(())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" | "yes" => Some(true),
        "off" | "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ── Tests ─────────────────────────────────────────────────────────────────────
