//! The template language.
//!
//! A template is plain text with embedded tags between `{$` and `$}`:
//!
//! - `{$ FOR i 1 10 2 $}` … `{$ END $}` repeats its body for a loop variable
//!   (step optional, default 1)
//! - `{$= a b + $}` evaluates a postfix expression and writes its value
//!
//! Text is lexed into [`lexer::Token`]s, parsed into a [`Node`] tree, and
//! rendered by an [`Executor`] into an [`OutputSink`].
//!
//! # Quick start
//!
//! ```rust
//! use tagscript::script::{parse, EmptyContext, Executor};
//!
//! let tree = parse("{$ FOR i 1 3 $}{$= i i * $} {$ END $}").unwrap();
//! let mut out = String::new();
//! Executor::default().render(&tree, &mut out, &EmptyContext).unwrap();
//! assert_eq!(out, "1 4 9 ");
//! ```

pub mod builtins;
pub mod context;
pub mod element;
pub mod exec;
pub mod lexer;
pub mod multistack;
pub mod node;
pub mod parser;
pub mod value;

// Re-exports for convenience.
pub use context::{EmptyContext, IoSink, OutputSink, VarContext};
pub use element::Element;
pub use exec::{Executor, RenderError};
pub use lexer::{LexError, Lexer, Position, Token, TokenKind};
pub use node::{ForLoop, Node, NodeStats, Visitor};
pub use parser::{parse, ParseError};
pub use value::{Value, ValueError};
