//! `tagscript`: a small template engine.
//!
//! Templates mix literal text with `{$ FOR $}` loops and postfix
//! `{$= … $}` echo tags.  See [`script`] for the language itself.
//!
//! ```rust
//! use std::collections::HashMap;
//! use tagscript::Value;
//!
//! let mut vars = HashMap::new();
//! vars.insert("n".to_owned(), Value::Int(3));
//! let out = tagscript::render_str("{$ FOR i 1 n $}{$= i $},{$ END $}", &vars).unwrap();
//! assert_eq!(out, "1,2,3,");
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod script;
pub mod var;

pub use config::{Config, EngineConfig};
pub use error::Error;
pub use script::{
    parse, EmptyContext, Executor, IoSink, Node, OutputSink, ParseError, RenderError, Value,
    VarContext,
};
pub use var::VarStore;

/// Render `tree` with the default [`EngineConfig`].
pub fn render(
    tree: &Node,
    sink: &mut dyn OutputSink,
    ctx: &dyn VarContext,
) -> Result<(), RenderError> {
    Executor::default().render(tree, sink, ctx)
}

/// Parse `src` and render it into a new string.
pub fn render_str(src: &str, ctx: &dyn VarContext) -> Result<String, Error> {
    let tree = parse(src)?;
    let mut out = String::new();
    render(&tree, &mut out, ctx)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_str_joins_both_stages() {
        assert_eq!(render_str("a{$= 1 2 + $}b", &EmptyContext).unwrap(), "a3b");
        assert!(matches!(render_str("{$ END $}", &EmptyContext), Err(Error::Parse(_))));
        assert!(matches!(
            render_str("{$= 1 0 / $}", &EmptyContext),
            Err(Error::Render(RenderError::Value { .. }))
        ));
    }

    #[test]
    fn var_store_is_a_context() {
        let mut vars = VarStore::new();
        vars.set("who", "world");
        assert_eq!(render_str("hello {$= who $}", &vars).unwrap(), "hello world");
    }
}
