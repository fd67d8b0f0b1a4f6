//! Crate-level error joining the parse and render stages.

use thiserror::Error;

use crate::script::{ParseError, RenderError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}
