//! Parsed source documents and the call-site resolution built on them.
//!
//! A [`document::SourceDocument`] owns one parsed file: its text, its syntax
//! tree, and a flattened node table indexed by line. Resolution walks that
//! table to answer "which call expression invoked me" and "which names does
//! the surrounding statement bind".

pub mod callsite;
pub mod document;
pub mod map;

use thiserror::Error;

/// Failures while mapping a live call back to its source expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Found {candidates} matching calls to '{name}' on line {line}")]
    AmbiguousCall {
        candidates: usize,
        name: String,
        line: usize,
    },
    #[error("No call matching '{name}' found on line {line}")]
    UnresolvedCall { name: String, line: usize },
    #[error("Name '{name}' is not defined in the calling frame")]
    UnresolvedName { name: String },
    #[error("No assignment found at the call site")]
    NoAssignment,
    #[error("Cannot derive names from this assignment target")]
    UnsupportedTarget,
    #[error("Source map invariant violated: {message}")]
    Structure { message: &'static str },
}
