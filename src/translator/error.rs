/// Errors and warnings produced while translating one file

use std::fmt;

use thiserror::Error;

use crate::translator::ast::StatementKind;

/// Unterminated literal or comment. Fatal for the file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[Line {line}] {message}")]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

impl LexError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        LexError {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockStructureError {
    #[error("[Line {line}] block closed with no open block")]
    CloseAtZero { line: usize },
    #[error("[Line {line}] mixed tabs and spaces in indentation")]
    MixedIndentation { line: usize },
    #[error("[Line {line}] indentation of {width} is not a multiple of the indent unit {unit}")]
    InconsistentIndent { line: usize, width: usize, unit: usize },
    #[error("{depth} block(s) still open at end of file")]
    UnclosedAtEof { depth: usize },
}

impl BlockStructureError {
    /// Only an imbalance discovered at end of input can be reported as a warning
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BlockStructureError::UnclosedAtEof { .. })
    }
}

/// A fatal error for one file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    BlockStructure(#[from] BlockStructureError),
    /// A warning promoted to an error by the strict leniency policy
    #[error("strict mode: {0}")]
    Strict(Warning),
}

/// Non-fatal findings attached to a successful translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    UnsupportedConstruct { kind: StatementKind, line: usize },
    BlockStructure(BlockStructureError),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnsupportedConstruct { kind, line } => {
                write!(f, "[Line {}] unsupported construct: {}", line, kind)
            }
            Warning::BlockStructure(err) => write!(f, "{}", err),
        }
    }
}
