//! Error taxonomy for the core pipeline (spec §7).
//!
//! `IRBuildError` and `CodeGenError` are ordinary `Result` errors that halt
//! the current compilation with a diagnostic. Peephole invariant violations
//! are not modeled as `Result` at all — per spec §7 they indicate a bug in
//! the optimizer itself, so they panic (see [`peephole_bug`]).

use crate::ast::SourceLoc;
use std::fmt;

/// Malformed-AST error raised while lowering to IR (spec §4.1, §7).
#[derive(Debug, Clone, PartialEq)]
pub struct IRBuildError {
    pub message: String,
    pub loc: Option<SourceLoc>,
}

impl IRBuildError {
    pub fn new(message: impl Into<String>, loc: SourceLoc) -> Self {
        IRBuildError {
            message: message.into(),
            loc: Some(loc),
        }
    }

    pub fn without_loc(message: impl Into<String>) -> Self {
        IRBuildError {
            message: message.into(),
            loc: None,
        }
    }
}

impl fmt::Display for IRBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.loc {
            Some(loc) => write!(f, "{}:{}: {}", loc.line, loc.column, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for IRBuildError {}

/// Code-generation error (spec §4.3, §7): the IR could not be mapped to C.
#[derive(Debug)]
pub enum CodeGenError {
    /// A logical error — unknown opcode, missing data type on an operand,
    /// reference to an undeclared function, etc.
    Logic(String),
    /// A formatting error from the underlying `Write` sink.
    Format(fmt::Error),
}

impl CodeGenError {
    pub fn logic(message: impl Into<String>) -> Self {
        CodeGenError::Logic(message.into())
    }
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::Logic(s) => write!(f, "{s}"),
            CodeGenError::Format(e) => write!(f, "code generation write error: {e}"),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<fmt::Error> for CodeGenError {
    fn from(e: fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}

impl From<String> for CodeGenError {
    fn from(s: String) -> Self {
        CodeGenError::Logic(s)
    }
}

/// Panics with a formatted diagnostic identifying a peephole invariant
/// violation (spec §7: `PeepholeIntegrity` is a bug in the optimizer, not a
/// recoverable condition, so it is never returned as a `Result`).
macro_rules! peephole_bug {
    ($($arg:tt)*) => {
        unreachable!("peephole integrity violation: {}", format!($($arg)*))
    };
}

pub(crate) use peephole_bug;
