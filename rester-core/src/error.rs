//! Error types for Rester.
//!
//! This module provides the failure taxonomy used across the dispatch pipeline:
//!
//! - [`Failure`] - Any failure raised while serving a request
//! - [`FailureKind`] - The field-less tag of a [`Failure`]
//! - [`ResourceError`] - Errors acquiring or releasing shared resources
//!
//! Failures travel up unchanged until the dispatcher boundary, where they are
//! classified into an HTTP status and body exactly once.

use std::backtrace::{Backtrace, BacktraceStatus};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure raised anywhere between resource acquisition and the handler.
#[derive(Error, Debug)]
pub enum Failure {
    /// Business logic detected a data-integrity conflict.
    #[error("An action causing data duplication was found: {0}")]
    DuplicationConflict(String),

    /// The client sent malformed or invalid input.
    #[error("{0}")]
    InvalidArgument(String),

    /// Anything else, including resource acquisition failures.
    #[error("{message}")]
    Unhandled {
        /// Human-readable description.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<BoxError>,
        /// Rendered backtrace, present only when capture was enabled.
        trace: Option<String>,
    },
}

/// The tag of a [`Failure`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// See [`Failure::DuplicationConflict`].
    DuplicationConflict,
    /// See [`Failure::InvalidArgument`].
    InvalidArgument,
    /// See [`Failure::Unhandled`].
    Unhandled,
}

impl FailureKind {
    /// Stable lowercase name, used as a log field.
    pub const fn as_str(self) -> &'static str {
        match self {
            FailureKind::DuplicationConflict => "duplication_conflict",
            FailureKind::InvalidArgument => "invalid_argument",
            FailureKind::Unhandled => "unhandled",
        }
    }
}

impl Failure {
    /// Create a duplication conflict failure.
    pub fn duplication(message: impl Into<String>) -> Self {
        Failure::DuplicationConflict(message.into())
    }

    /// Create an invalid argument failure.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Failure::InvalidArgument(message.into())
    }

    /// Create an unhandled failure wrapping an underlying error.
    pub fn unhandled(error: impl Into<BoxError>) -> Self {
        let source = error.into();
        Failure::Unhandled {
            message: source.to_string(),
            source: Some(source),
            trace: capture_trace(),
        }
    }

    /// Create an unhandled failure from a bare message.
    pub fn message(message: impl Into<String>) -> Self {
        Failure::Unhandled {
            message: message.into(),
            source: None,
            trace: capture_trace(),
        }
    }

    /// Create an unhandled failure from a caught panic payload.
    pub fn panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Failure::message(format!("handler panicked: {detail}"))
    }

    /// The tag of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::DuplicationConflict(_) => FailureKind::DuplicationConflict,
            Failure::InvalidArgument(_) => FailureKind::InvalidArgument,
            Failure::Unhandled { .. } => FailureKind::Unhandled,
        }
    }

    /// The captured backtrace of an unhandled failure, if any.
    pub fn trace(&self) -> Option<&str> {
        match self {
            Failure::Unhandled { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }

    /// Messages of this failure and every error in its source chain, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(error) = current {
            let text = error.to_string();
            // `unhandled` reuses the source's message as its own.
            if messages.last() != Some(&text) {
                messages.push(text);
            }
            current = error.source();
        }
        messages
    }
}

fn capture_trace() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

impl From<BoxError> for Failure {
    fn from(err: BoxError) -> Self {
        Failure::unhandled(err)
    }
}

/// Extension for turning arbitrary errors into [`Failure::Unhandled`].
///
/// ```rust,ignore
/// let user: User = serde_json::from_value(body).or_unhandled()?;
/// ```
pub trait FailureExt<T> {
    /// Map the error side into an unhandled failure.
    fn or_unhandled(self) -> Result<T, Failure>;
}

impl<T, E> FailureExt<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn or_unhandled(self) -> Result<T, Failure> {
        self.map_err(Failure::unhandled)
    }
}

/// Errors that can occur while acquiring or releasing shared resources.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The database handle could not be acquired.
    #[error("database unavailable: {0}")]
    Database(#[source] BoxError),

    /// The cache handle could not be acquired.
    #[error("cache unavailable: {0}")]
    Cache(#[source] BoxError),

    /// Closing the database handle failed.
    #[error("failed to close database: {0}")]
    Close(#[source] BoxError),
}

impl From<ResourceError> for Failure {
    fn from(err: ResourceError) -> Self {
        Failure::unhandled(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplication_message_is_prefixed() {
        let failure = Failure::duplication("dup key");
        assert_eq!(
            failure.to_string(),
            "An action causing data duplication was found: dup key"
        );
        assert_eq!(failure.kind(), FailureKind::DuplicationConflict);
    }

    #[test]
    fn invalid_argument_message_is_verbatim() {
        let failure = Failure::invalid_argument("bad id");
        assert_eq!(failure.to_string(), "bad id");
        assert_eq!(failure.kind(), FailureKind::InvalidArgument);
        assert!(failure.trace().is_none());
    }

    #[test]
    fn resource_error_becomes_unhandled_with_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let failure: Failure = ResourceError::Database(Box::new(io)).into();

        assert_eq!(failure.kind(), FailureKind::Unhandled);
        assert_eq!(
            failure.chain(),
            vec!["database unavailable: refused".to_string(), "refused".to_string()]
        );
    }

    #[test]
    fn or_unhandled_wraps_foreign_errors() {
        let parsed: Result<u32, Failure> = "nope".parse::<u32>().or_unhandled();
        let failure = parsed.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Unhandled);
        assert!(failure.to_string().contains("invalid digit"));
    }

    #[test]
    fn panic_payloads_are_described() {
        let failure = Failure::panic(&"boom");
        assert_eq!(failure.to_string(), "handler panicked: boom");

        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(
            Failure::panic(owned.as_ref()).to_string(),
            "handler panicked: owned boom"
        );
    }
}
