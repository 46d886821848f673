//! Error types for the translator.

use crate::ast::SourceLocation;
use miette::Diagnostic;
use thiserror::Error;

/// Result type for translation operations.
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Errors that abort the translation of a single function.
#[derive(Error, Debug, Diagnostic)]
pub enum TranslateError {
    /// A child the rule for `parent` requires is absent.
    #[error("{parent} at {location} has no child at index {index}")]
    #[diagnostic(
        code(csgen::missing_child),
        help("the node shape is outside the supported C subset; a translation rule is missing")
    )]
    MissingChild {
        index: usize,
        parent: String,
        location: SourceLocation,
    },
}
