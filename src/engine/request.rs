//! Translation request/result types and validation.
//!
//! Requests are validated before reaching the runtime. Oversized input is
//! rejected, not truncated.

use serde::{Deserialize, Serialize};

use super::error::TranslationError;
use super::languages::normalize_code;
use crate::models::ModelDescriptor;

/// A translation request with its model type already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
    pub model_type: String,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        model_type: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            model_type: model_type.into(),
        }
    }

    /// Input length in characters, the unit `max_input_chars` is expressed in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Validate against the resolved model's limits.
    pub fn validate(&self, descriptor: &ModelDescriptor) -> Result<(), TranslationError> {
        validate_input(&self.text, &self.source_language, &self.target_language)?;
        let len = self.char_len();
        if len > descriptor.max_input_chars {
            return Err(TranslationError::Validation(format!(
                "text exceeds maximum length for {}: {} > {} characters",
                descriptor.model_type, len, descriptor.max_input_chars
            )));
        }
        Ok(())
    }
}

/// Model-independent checks, run before any model is selected or loaded.
pub fn validate_input(text: &str, source: &str, target: &str) -> Result<(), TranslationError> {
    if text.trim().is_empty() {
        return Err(TranslationError::Validation("text cannot be empty".into()));
    }
    if source.trim().is_empty() || target.trim().is_empty() {
        return Err(TranslationError::Validation(
            "source and target language are required".into(),
        ));
    }
    if normalize_code(source) == normalize_code(target) {
        return Err(TranslationError::Validation(format!(
            "source and target language are identical: {source}"
        )));
    }
    Ok(())
}

/// Caller-facing translation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub translated_text: String,
    pub model_used: String,
    pub source_language: String,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}
