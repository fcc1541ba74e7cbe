//! Parse failures
//!
//! Every failure carries the path of the offending value, anchored at
//! `$root` (e.g. `$root.show.seasons[2]`).

use std::fmt;

use thiserror::Error;

use crate::value::ValueError;

/// Result type for decoding and encoding
pub type ParseResult<T> = Result<T, ParseError>;

/// What went wrong at a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Value has the wrong kind or literal
    Type { expected: String, actual: String },
    /// Required property or tuple element is absent
    Missing,
    /// Tuple has more items than it declares
    UnexpectedItem,
    /// Refinement predicate rejected the value
    Refinement(String),
    /// Declaration decoder rejected the value
    Declaration { identifier: String, reason: String },
    /// No union member accepted the value
    NoMatchingMember { members: usize },
    /// Raw input is not valid wire JSON
    Wire(String),
    /// Value does not fit the Rust type it is bound to
    Binding(String),
    /// Template literal's matcher could not be built
    Pattern(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Type { expected, actual } => {
                write!(f, "expected {}, got {}", expected, actual)
            }
            ParseErrorKind::Missing => write!(f, "is missing"),
            ParseErrorKind::UnexpectedItem => write!(f, "is unexpected"),
            ParseErrorKind::Refinement(description) => write!(f, "expected {}", description),
            ParseErrorKind::Declaration { identifier, reason } => {
                write!(f, "expected {}: {}", identifier, reason)
            }
            ParseErrorKind::NoMatchingMember { members } => {
                write!(f, "matches none of {} union members", members)
            }
            ParseErrorKind::Wire(reason) => write!(f, "invalid wire value: {}", reason),
            ParseErrorKind::Binding(reason) => write!(f, "cannot bind value: {}", reason),
            ParseErrorKind::Pattern(reason) => write!(f, "invalid template pattern: {}", reason),
        }
    }
}

/// A decode or encode failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {kind}")]
pub struct ParseError {
    pub path: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(path: impl Into<String>, kind: ParseErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn type_mismatch(
        path: &str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(
            path,
            ParseErrorKind::Type {
                expected: expected.into(),
                actual: actual.into(),
            },
        )
    }

    pub fn binding(reason: impl fmt::Display) -> Self {
        Self::new("$root", ParseErrorKind::Binding(reason.to_string()))
    }
}

impl From<ValueError> for ParseError {
    fn from(e: ValueError) -> Self {
        Self::new("$root", ParseErrorKind::Wire(e.to_string()))
    }
}
