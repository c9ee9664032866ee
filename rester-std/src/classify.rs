//! Failure classification.
//!
//! | Failure | Status | Body |
//! |---|---|---|
//! | `DuplicationConflict` | 409 | `{"error": message}` |
//! | `InvalidArgument` | 400 | `{"error": message}` |
//! | `Unhandled` | 500 | `{"message": message}` plus `"trace"` in development |
//!
//! Unhandled failures are always reported before the body is built; 4xx
//! classifications are expected client conditions and are never reported.

use crate::settings::{RuntimeMode, Settings};
use http::StatusCode;
use rester_core::{Failure, OperationResponse};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Receives every unhandled failure.
pub trait ErrorReporter: Send + Sync + 'static {
    /// Record an unhandled failure.
    fn report(&self, failure: &Failure);
}

/// Reports failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, failure: &Failure) {
        let chain = failure.chain();
        tracing::error!(
            kind = failure.kind().as_str(),
            error = %failure,
            causes = ?&chain[1..],
            "unhandled failure during dispatch"
        );
    }
}

/// Maps a [`Failure`] to an [`OperationResponse`]. Never fails.
#[derive(Clone)]
pub struct ErrorClassifier {
    mode: RuntimeMode,
    reporter: Arc<dyn ErrorReporter>,
}

impl ErrorClassifier {
    /// Create a classifier reporting through `tracing`.
    pub fn new(mode: RuntimeMode) -> Self {
        Self::with_reporter(mode, Arc::new(TracingReporter))
    }

    /// Create a classifier with a custom reporter.
    pub fn with_reporter(mode: RuntimeMode, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { mode, reporter }
    }

    /// Create a classifier for the configured `mode`.
    pub fn from_settings(settings: &Settings, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self::with_reporter(settings.mode(), reporter)
    }

    /// Classify `failure`.
    pub fn classify(&self, failure: Failure) -> OperationResponse {
        match &failure {
            Failure::DuplicationConflict(_) => OperationResponse::new(
                StatusCode::CONFLICT,
                json!({ "error": failure.to_string() }),
            ),
            Failure::InvalidArgument(message) => {
                OperationResponse::new(StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            Failure::Unhandled { message, .. } => {
                self.reporter.report(&failure);

                let mut body = Map::new();
                body.insert("message".into(), Value::String(message.clone()));
                if self.mode.is_development() {
                    body.insert("trace".into(), trace_of(&failure));
                }
                OperationResponse::new(StatusCode::INTERNAL_SERVER_ERROR, Value::Object(body))
            }
        }
    }
}

/// Cause chain followed by captured backtrace frames, one entry per line.
fn trace_of(failure: &Failure) -> Value {
    let mut lines = failure.chain();
    if let Some(backtrace) = failure.trace() {
        lines.extend(
            backtrace
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        );
    }
    Value::Array(lines.into_iter().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CapturingReporter;

    fn classifier(mode: RuntimeMode) -> (ErrorClassifier, CapturingReporter) {
        let reporter = CapturingReporter::new();
        let classifier = ErrorClassifier::with_reporter(mode, Arc::new(reporter.clone()));
        (classifier, reporter)
    }

    #[test]
    fn duplication_is_conflict() {
        let (classifier, reporter) = classifier(RuntimeMode::Production);
        let response = classifier.classify(Failure::duplication("dup key"));

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.body(),
            &json!({"error": "An action causing data duplication was found: dup key"})
        );
        assert_eq!(reporter.count(), 0);
    }

    #[test]
    fn invalid_argument_is_bad_request() {
        let (classifier, reporter) = classifier(RuntimeMode::Development);
        let response = classifier.classify(Failure::invalid_argument("bad id"));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.body(), &json!({"error": "bad id"}));
        assert_eq!(reporter.count(), 0);
    }

    #[test]
    fn unhandled_in_production_hides_trace() {
        let (classifier, reporter) = classifier(RuntimeMode::Production);
        let response = classifier.classify(Failure::message("db exploded"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), &json!({"message": "db exploded"}));
        assert_eq!(reporter.messages(), vec!["db exploded".to_string()]);
    }

    #[test]
    fn unhandled_in_development_adds_trace() {
        let (classifier, reporter) = classifier(RuntimeMode::Development);
        let io = std::io::Error::other("socket closed");
        let response = classifier.classify(Failure::unhandled(io));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body()["message"], "socket closed");
        let trace = response.body()["trace"].as_array().unwrap();
        assert!(!trace.is_empty());
        assert_eq!(trace[0], "socket closed");
        assert_eq!(reporter.count(), 1);
    }
}
