//! Translation error types for Lingua CORE.
//!
//! All errors are classified before they cross the public boundary. Invalid
//! inputs are rejected before any runtime call, not truncated.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::{LoadError, RegistryError};

use super::runtime::RuntimeError;

/// Errors surfaced by translation and model lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum TranslationError {
    #[error("Input validation failed: {0}")]
    Validation(String),

    #[error("Translation timeout after {0}ms")]
    Timeout(u64),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Corrupted model output: {reason}")]
    CorruptedOutput { reason: String },

    #[error("Unsupported model family: {0}")]
    UnsupportedFamily(String),

    #[error("Unknown model type: {0}")]
    ModelNotFound(String),

    #[error("Model load failed for {model_type}: {reason}")]
    LoadFailed { model_type: String, reason: String },

    #[error("No model could be selected: {0}")]
    SelectionFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Coarse error kind for caller-side branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Timeout,
    Tokenization,
    ResourceExhausted,
    CorruptedOutput,
    UnsupportedFamily,
    ModelNotFound,
    LoadFailed,
    SelectionFailed,
    Runtime,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::Tokenization => "tokenization",
            Self::ResourceExhausted => "resource_exhausted",
            Self::CorruptedOutput => "corrupted_output",
            Self::UnsupportedFamily => "unsupported_family",
            Self::ModelNotFound => "model_not_found",
            Self::LoadFailed => "load_failed",
            Self::SelectionFailed => "selection_failed",
            Self::Runtime => "runtime",
        }
    }
}

impl TranslationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Tokenization(_) => ErrorKind::Tokenization,
            Self::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Self::CorruptedOutput { .. } => ErrorKind::CorruptedOutput,
            Self::UnsupportedFamily(_) => ErrorKind::UnsupportedFamily,
            Self::ModelNotFound(_) => ErrorKind::ModelNotFound,
            Self::LoadFailed { .. } => ErrorKind::LoadFailed,
            Self::SelectionFailed(_) => ErrorKind::SelectionFailed,
            Self::Runtime(_) => ErrorKind::Runtime,
        }
    }

    /// Returns true if the same request may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ResourceExhausted(_))
    }

    /// Returns true if this error should be logged as a warning.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Timeout(_) | Self::CorruptedOutput { .. }
        )
    }

    pub(crate) fn corrupted(reason: impl Into<String>) -> Self {
        Self::CorruptedOutput { reason: reason.into() }
    }
}

impl From<RegistryError> for TranslationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(model_type) => Self::ModelNotFound(model_type),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<LoadError> for TranslationError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::UnknownModel(model_type) => Self::ModelNotFound(model_type),
            LoadError::ResourceExhausted { reason, .. } => Self::ResourceExhausted(reason),
            LoadError::Runtime { model_type, reason } | LoadError::Aborted { model_type, reason } => {
                Self::LoadFailed { model_type, reason }
            }
        }
    }
}

impl From<RuntimeError> for TranslationError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Encoding(msg) => Self::Tokenization(msg),
            RuntimeError::OutOfMemory(msg) => Self::ResourceExhausted(msg),
            RuntimeError::Unavailable(msg) => Self::Runtime(msg),
            RuntimeError::Failed(msg) => classify_message(msg),
        }
    }
}

/// "OOM" as a word of its own, not inside "room" or "bloom".
fn oom_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\boom\b").expect("valid oom pattern"))
}

/// Runtimes often report every failure as one opaque string; recover the
/// classes callers branch on from the wording.
fn classify_message(msg: String) -> TranslationError {
    let lower = msg.to_lowercase();
    if lower.contains("out of memory")
        || oom_pattern().is_match(&lower)
        || lower.contains("failed to allocate")
        || lower.contains("allocation failed")
    {
        TranslationError::ResourceExhausted(msg)
    } else if lower.contains("tokeniz")
        || lower.contains("invalid utf-8")
        || lower.contains("encoding")
    {
        TranslationError::Tokenization(msg)
    } else {
        TranslationError::Runtime(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_classification() {
        let err: TranslationError = RuntimeError::Encoding("bad byte".into()).into();
        assert_eq!(err.kind(), ErrorKind::Tokenization);

        let err: TranslationError = RuntimeError::OutOfMemory("4GB".into()).into();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

        let err: TranslationError =
            RuntimeError::Failed("CUDA error: out of memory".into()).into();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

        let err: TranslationError =
            RuntimeError::Failed("Tokenizer could not encode input".into()).into();
        assert_eq!(err.kind(), ErrorKind::Tokenization);

        let err: TranslationError = RuntimeError::Failed("segfault".into()).into();
        assert_eq!(err.kind(), ErrorKind::Runtime);

        let err: TranslationError = RuntimeError::Failed("killed: OOM (rss 7.9GB)".into()).into();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }

    #[test]
    fn test_oom_substring_inside_words_is_not_resource_exhausted() {
        for msg in [
            "bloom decoder step failed",
            "invalid token in room description",
            "zoom factor unsupported",
        ] {
            let err: TranslationError = RuntimeError::Failed(msg.into()).into();
            assert_eq!(err.kind(), ErrorKind::Runtime, "{msg}");
            assert!(!err.is_retryable(), "{msg}");
        }
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(TranslationError::Timeout(100).is_retryable());
        assert!(TranslationError::ResourceExhausted("oom".into()).is_retryable());
        assert!(!TranslationError::corrupted("empty").is_retryable());
        assert!(!TranslationError::Validation("too long".into()).is_retryable());
    }

    #[test]
    fn test_load_error_conversion_keeps_model_type() {
        let err: TranslationError = LoadError::Runtime {
            model_type: "basic".into(),
            reason: "download failed".into(),
        }
        .into();
        match err {
            TranslationError::LoadFailed { model_type, .. } => assert_eq!(model_type, "basic"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
