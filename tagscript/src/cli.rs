//! Command-line argument parsing.
//!
//! Usage:
//!   tagscript [-f[<file>]] [-D<name>=<value>]... [-m<max>] [-s] [-d] <template>|-

use std::path::PathBuf;

use crate::config::{literal_value, split_assignment};
use crate::var::VarStore;

pub const USAGE: &str =
    "Usage: tagscript [-f[<file>]] [-D<name>=<value>]... [-m<max>] [-s] [-d] <template>|-";

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.tsrc";

/// Fallback config in the working directory.
pub const LOCAL_CONFIG: &str = ".tagscriptrc";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Which config file to load.
    pub config: ConfigFile,
    /// Variables defined with `-D<name>=<value>`; a later `-D` wins.
    pub defines: VarStore,
    /// Iteration ceiling override (`-m<max>`).
    pub max_iterations: Option<u64>,
    /// Strict variable lookup (`-s`).
    pub strict: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Where the template comes from.
    pub template: TemplateSource,
}

/// How to choose the user config file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search the platform config directory, then `./.tagscriptrc` (default).
    #[default]
    Search,
    /// `-f` with no file argument: skip user config.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// `-`: read standard input.
    #[default]
    Stdin,
    File(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                's' => args.strict = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -D<name>=<value>
                'D' => {
                    let def = take_value(&chars, &mut j, argv, &mut i)
                        .ok_or("-D requires <name>=<value>")?;
                    let (name, value) = split_assignment(&def)
                        .ok_or_else(|| format!("-D: expected <name>=<value>, got '{def}'"))?;
                    args.defines.set(name, literal_value(value));
                }

                // -m<max>
                'm' => {
                    let max = take_value(&chars, &mut j, argv, &mut i)
                        .ok_or("-m requires an iteration count")?;
                    match max.parse::<u64>() {
                        Ok(n) if n > 0 => args.max_iterations = Some(n),
                        _ => return Err(format!("invalid iteration count: {max}")),
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    args.template = match positional.as_slice() {
        [] => return Err("missing template argument".to_owned()),
        [p] if p == "-" => TemplateSource::Stdin,
        [p] => TemplateSource::File(PathBuf::from(p)),
        more => return Err(format!("too many arguments ({})", more.len())),
    };

    Ok(args)
}

/// Value of a flag: the rest of this argument, or the next argument.
fn take_value(chars: &[char], j: &mut usize, argv: &[String], i: &mut usize) -> Option<String> {
    if *j + 1 < chars.len() {
        let s: String = chars[*j + 1..].iter().collect();
        *j = chars.len();
        Some(s)
    } else if *i + 1 < argv.len() {
        *i += 1;
        Some(argv[*i].clone())
    } else {
        None
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the user config file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    let platform = directories::ProjectDirs::from("", "", "tagscript")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME));
    platform
        .into_iter()
        .chain(std::iter::once(PathBuf::from(LOCAL_CONFIG)))
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
