//! Error types for data parsing in knowair-types.

use thiserror::Error;

/// Errors that can occur when parsing persisted or wire-format labels.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The status label is not one of `OK`, `NORMAL`, `WARN`, `HIGH`.
    #[error("Unknown status label: {0}")]
    UnknownStatus(String),

    /// The violation tag is not recognized.
    #[error("Unknown violation tag: {0}")]
    UnknownViolation(String),

    /// The channel name is not recognized.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

/// Result type alias using knowair-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
