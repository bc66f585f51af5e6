//! Per-family request shaping and response extraction.
//!
//! One function per family variant; the executor picks between them with a
//! single match on `ModelFamily`.

use serde_json::Value;

use super::error::TranslationError;
use super::languages;
use super::request::TranslationRequest;
use super::runtime::{FormattedRequest, GenerationOptions, RawOutput};
use crate::models::{ModelDescriptor, ModelFamily};

/// Bounds for generated output length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationLimits {
    /// Cap = multiplier × input characters, clamped to `[min, max]`.
    pub multiplier: usize,
    pub min_new_tokens: usize,
    pub max_new_tokens: usize,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            multiplier: 2,
            min_new_tokens: 16,
            max_new_tokens: 512,
        }
    }
}

impl GenerationLimits {
    pub fn cap_for(&self, input_chars: usize) -> usize {
        let min = self.min_new_tokens.min(self.max_new_tokens);
        input_chars
            .saturating_mul(self.multiplier)
            .clamp(min, self.max_new_tokens)
    }
}

/// Text extracted from a runtime response, before sanitization.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedOutput {
    pub text: String,
    pub confidence: Option<f32>,
}

/// Shape `request` for the descriptor's family.
pub fn format_request(
    descriptor: &ModelDescriptor,
    request: &TranslationRequest,
    limits: &GenerationLimits,
) -> Result<FormattedRequest, TranslationError> {
    let options = GenerationOptions::deterministic(limits.cap_for(request.char_len()));
    match &descriptor.family {
        ModelFamily::Seq2Seq => Ok(format_prompt(request, options)),
        ModelFamily::LanguagePair => format_language_pair(request, options),
        ModelFamily::Other(tag) => Err(TranslationError::UnsupportedFamily(tag.clone())),
    }
}

fn format_prompt(request: &TranslationRequest, options: GenerationOptions) -> FormattedRequest {
    // Prompt models cope with a bare code when the name is unknown.
    let source = languages::language_name(&request.source_language)
        .unwrap_or(request.source_language.as_str());
    let target = languages::language_name(&request.target_language)
        .unwrap_or(request.target_language.as_str());
    FormattedRequest::Prompt {
        prompt: format!("translate {source} to {target}: {}", request.text),
        options,
    }
}

fn format_language_pair(
    request: &TranslationRequest,
    options: GenerationOptions,
) -> Result<FormattedRequest, TranslationError> {
    let tag = |code: &str| {
        languages::flores_tag(code).ok_or_else(|| {
            TranslationError::Validation(format!("unsupported language code: {code}"))
        })
    };
    Ok(FormattedRequest::LanguagePair {
        text: request.text.clone(),
        src_lang: tag(&request.source_language)?.to_string(),
        tgt_lang: tag(&request.target_language)?.to_string(),
        options,
    })
}

/// Pull the translated text out of a raw runtime response.
pub fn extract_output(
    family: &ModelFamily,
    raw: &RawOutput,
) -> Result<ExtractedOutput, TranslationError> {
    let fields: &[&str] = match family {
        ModelFamily::Seq2Seq => &["generated_text", "translation_text", "text"],
        ModelFamily::LanguagePair => &["translation_text", "generated_text", "text"],
        ModelFamily::Other(tag) => return Err(TranslationError::UnsupportedFamily(tag.clone())),
    };
    extract_from(raw, fields)
}

fn extract_from(raw: &Value, fields: &[&str]) -> Result<ExtractedOutput, TranslationError> {
    match raw {
        Value::String(text) => Ok(ExtractedOutput {
            text: text.clone(),
            confidence: None,
        }),
        Value::Array(items) => match items.first() {
            Some(first) => extract_from(first, fields),
            None => Err(TranslationError::corrupted("runtime returned no sequences")),
        },
        Value::Object(map) => {
            let text = fields
                .iter()
                .find_map(|f| map.get(*f).and_then(Value::as_str))
                .ok_or_else(|| TranslationError::corrupted("runtime output has no text field"))?;
            let confidence = map
                .get("score")
                .and_then(Value::as_f64)
                .map(|s| s as f32)
                .filter(|s| s.is_finite());
            Ok(ExtractedOutput {
                text: text.to_string(),
                confidence,
            })
        }
        _ => Err(TranslationError::corrupted("runtime output has unexpected shape")),
    }
}
