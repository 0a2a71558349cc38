//! Core error types.

use crate::state::{StateId, TransitionId};
use thiserror::Error;

/// Errors raised by the automaton graph mutators.
///
/// Validation always runs before any mutation, so an operation that returns
/// one of these leaves the automaton untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("invalid state name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("duplicate state name '{name}'")]
    DuplicateName { name: String },

    #[error("unknown state: {state}")]
    UnknownState { state: StateId },

    #[error("unknown transition: {transition}")]
    UnknownTransition { transition: TransitionId },

    #[error("invalid event label '{label}': {reason}")]
    InvalidLabel { label: String, reason: &'static str },

    #[error("duplicate transition: {from} -{label}-> {to}")]
    DuplicateTransition {
        from: String,
        label: String,
        to: String,
    },
}

impl GraphError {
    /// Returns a stable error code for display and scripting.
    pub fn error_code(&self) -> &'static str {
        match self {
            GraphError::InvalidName { .. } => "INVALID_NAME",
            GraphError::DuplicateName { .. } => "DUPLICATE_NAME",
            GraphError::UnknownState { .. } => "UNKNOWN_STATE",
            GraphError::UnknownTransition { .. } => "UNKNOWN_TRANSITION",
            GraphError::InvalidLabel { .. } => "INVALID_LABEL",
            GraphError::DuplicateTransition { .. } => "DUPLICATE_TRANSITION",
        }
    }
}

/// Errors from reading the line-oriented text format.
///
/// Every variant except `Io` carries the 1-based line that triggered it.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("line {line}: unknown record '{keyword}'")]
    UnknownRecord { line: usize, keyword: String },

    #[error("line {line}: {record} record expects {expected} tokens, found {found}")]
    TokenCount {
        line: usize,
        record: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid coordinate '{value}'")]
    InvalidCoordinate { line: usize, value: String },

    #[error("line {line}: state '{name}' has not been declared")]
    UnknownState { line: usize, name: String },

    #[error("line {line}: not valid UTF-8")]
    InvalidEncoding { line: usize },

    #[error("line {line}: {source}")]
    Rejected {
        line: usize,
        #[source]
        source: GraphError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormatError {
    /// Returns the line that triggered the error, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            FormatError::UnknownRecord { line, .. }
            | FormatError::TokenCount { line, .. }
            | FormatError::InvalidCoordinate { line, .. }
            | FormatError::UnknownState { line, .. }
            | FormatError::InvalidEncoding { line }
            | FormatError::Rejected { line, .. } => Some(*line),
            FormatError::Io(_) => None,
        }
    }

    /// Returns a stable error code for display and scripting.
    pub fn error_code(&self) -> &'static str {
        match self {
            FormatError::UnknownRecord { .. } => "UNKNOWN_RECORD",
            FormatError::TokenCount { .. } => "TOKEN_COUNT",
            FormatError::InvalidCoordinate { .. } => "INVALID_COORDINATE",
            FormatError::UnknownState { .. } => "UNKNOWN_STATE",
            FormatError::InvalidEncoding { .. } => "INVALID_ENCODING",
            FormatError::Rejected { source, .. } => source.error_code(),
            FormatError::Io(_) => "IO_ERROR",
        }
    }
}

/// Errors from restoring an automaton out of a JSON snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot references undeclared state '{name}'")]
    UnknownState { name: String },

    #[error("snapshot rejected: {0}")]
    Graph(#[from] GraphError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
