use thiserror::Error;

use crate::ast::Line;

/// Every diagnostic carries the full source line that produced it, so the
/// front-end can print `file:line: message` along with the offending text.
#[derive(Error, Debug, PartialEq)]
pub enum AssemblyError {
    #[error("lexical error: {reason}\n  {line}")]
    Lexical { line: Line, reason: String },

    #[error("syntax error: {reason}\n  {line}")]
    Syntax { line: Line, reason: String },

    #[error("semantic error: {reason}\n  {line}")]
    Semantic { line: Line, reason: String },

    #[error("range error: {reason}\n  {line}")]
    Range { line: Line, reason: String },

    #[error("include error: {reason}\n  {line}")]
    Include { line: Line, reason: String },

    // raised by the user via the `error` directive
    #[error("{reason}\n  {line}")]
    Directive { line: Line, reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

/// Failures from the pure encoding functions. These carry no line info;
/// the resolver attaches the originating line when it surfaces them.
#[derive(Error, Debug, PartialEq)]
pub enum EncodeError {
    #[error("{0}")]
    InvalidRegister(String),

    #[error("{0}")]
    OutOfRange(String),

    #[error("{0}")]
    NotAligned(String),

    #[error("{0}")]
    Constraint(String),

    #[error("{0}")]
    Internal(String),
}

impl EncodeError {
    pub fn attach(self, line: &Line) -> AssemblyError {
        match self {
            EncodeError::Internal(reason) => AssemblyError::Internal { reason },
            other => AssemblyError::Range {
                line: line.clone(),
                reason: other.to_string(),
            },
        }
    }
}
