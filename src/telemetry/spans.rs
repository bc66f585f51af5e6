//! Span utilities and extension traits for Lingua CORE tracing.
//!
//! Provides standardized span creation and result recording.

use std::time::Duration;

use tracing::{info_span, Span};

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;

    /// Record wall-clock latency into the span.
    fn record_latency(&self, elapsed: Duration);
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }

    fn record_latency(&self, elapsed: Duration) {
        self.record("latency_ms", elapsed.as_millis() as u64);
    }
}

/// Factory for creating standardized translation spans.
pub struct TranslationSpan;

impl TranslationSpan {
    /// Create a new translation span with standard fields.
    ///
    /// Fields included:
    /// - `request_id`: Unique identifier for the request
    /// - `source_language` / `target_language`: Requested direction
    /// - `model_type`: To be filled in once a model is selected
    /// - `status`: To be filled in by `SpanExt::record_result`
    /// - `error.message`: To be filled in on error
    /// - `latency_ms`: To be filled in after completion
    pub fn new(request_id: &str, source_language: &str, target_language: &str) -> Span {
        info_span!(
            "translation_request",
            request_id = %request_id,
            source_language = %source_language,
            target_language = %target_language,
            model_type = tracing::field::Empty,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}
