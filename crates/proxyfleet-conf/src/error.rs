//! Error types for configuration parsing.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfResult<T> = Result<T, ConfError>;

/// Errors that can occur while parsing configuration text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfError {
    #[error("unterminated quoted string starting at line {0}")]
    UnterminatedString(usize),

    #[error("unexpected '{{' with no block name at line {0}")]
    UnnamedBlock(usize),

    #[error("unexpected ';' with no directive at line {0}")]
    EmptyDirective(usize),

    #[error("unexpected '}}' at line {0}")]
    UnbalancedClose(usize),

    #[error("unexpected end of input: {0}")]
    UnexpectedEof(&'static str),
}
