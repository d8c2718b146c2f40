//! Error types for knowair-core.
//!
//! Classification itself never fails: missing channels, absent baselines and
//! first-ever readings all resolve to neutral outcomes, and a non-positive
//! high cutoff yields a score of zero. The only runtime error is a failure of
//! one of the two history queries the classifier depends on.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::History`] | Retry the whole ingest | Upstream storage failure; nothing was written |
//! | [`Error::InvalidConfig`] | Do not retry | Fix configuration and reload |
//!
//! A caller that cannot retry should skip classification for the reading
//! rather than block ingestion.

use std::fmt;

use thiserror::Error;

/// Errors that can occur in knowair-core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A history query failed.
    #[error("History query '{operation}' failed: {source}")]
    History {
        /// The query that failed (`fetch_window` or `fetch_previous`).
        operation: &'static str,
        /// The underlying storage error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Alert thresholds failed validation.
    #[error("Invalid alert configuration: {}", format_issues(.0))]
    InvalidConfig(Vec<ConfigIssue>),
}

impl Error {
    /// Wrap a history backend error.
    pub fn history<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::History {
            operation,
            source: Box::new(source),
        }
    }

    /// Returns `true` if retrying the same ingest may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::History { .. })
    }
}

/// A single threshold validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Field path relative to the alert config (e.g. `eco2.hysteresis`).
    pub field: String,
    /// Description of the problem.
    pub message: String,
}

impl ConfigIssue {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using knowair-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
