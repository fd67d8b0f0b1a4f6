use std::io::{self, Read, Write};
use std::process::ExitCode;

use tagscript::cli::{self, CliArgs, ConfigFile, TemplateSource};
use tagscript::{Config, Executor, IoSink};

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("tagscript: {e}");
            eprintln!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.debug { "debug" } else { "warn" }),
    )
    .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tagscript: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    // ── Load user config ──────────────────────────────────────────────────────
    let path = match args.config {
        ConfigFile::Skip => None,
        ConfigFile::Explicit(path) => Some(path),
        ConfigFile::Search => cli::find_user_config(),
    };
    let mut config = match path {
        Some(path) => {
            log::debug!("loading config {}", path.display());
            let (config, errors) = Config::load_file(&path)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            for err in errors {
                log::warn!("{}: {err}", path.display());
            }
            config
        }
        None => Config::new(),
    };

    // ── Command-line overrides ────────────────────────────────────────────────
    config.vars.extend(args.defines);
    if let Some(max) = args.max_iterations {
        config.engine.max_iterations = max;
    }
    if args.strict {
        config.engine.strict_variables = true;
    }

    // ── Read, parse, render ───────────────────────────────────────────────────
    let src = match &args.template {
        TemplateSource::Stdin => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            s
        }
        TemplateSource::File(path) => {
            std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?
        }
    };

    let tree = tagscript::parse(&src)?;
    let mut sink = IoSink(io::stdout().lock());
    Executor::new(config.engine).render(&tree, &mut sink, &config.vars)?;
    sink.0.flush()?;
    Ok(())
}
