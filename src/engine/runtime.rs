//! Narrow interface to the inference runtime.
//!
//! The runtime owns tensor computation and artifact downloads. Lingua CORE
//! only decides when to call it and how to shape the request.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ProgressSink;

/// Failures reported by the inference runtime.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// Input could not be encoded by the model's tokenizer.
    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Artifacts could not be fetched or initialised.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Failed(String),
}

/// Decoding options passed with every request. Always deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub max_new_tokens: usize,
    pub do_sample: bool,
    pub num_beams: usize,
    pub num_return_sequences: usize,
}

impl GenerationOptions {
    /// Greedy, single-sequence decoding capped at `max_new_tokens`.
    pub fn deterministic(max_new_tokens: usize) -> Self {
        Self {
            max_new_tokens,
            do_sample: false,
            num_beams: 1,
            num_return_sequences: 1,
        }
    }
}

/// A request shaped for one model family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedRequest {
    /// Instruction-style prompt for generative seq2seq models.
    Prompt {
        prompt: String,
        options: GenerationOptions,
    },
    /// Raw text plus runtime language tags for language-pair models.
    LanguagePair {
        text: String,
        src_lang: String,
        tgt_lang: String,
        options: GenerationOptions,
    },
}

impl FormattedRequest {
    pub fn options(&self) -> &GenerationOptions {
        match self {
            Self::Prompt { options, .. } | Self::LanguagePair { options, .. } => options,
        }
    }
}

/// Raw runtime output. Shapes vary by family and runtime version, e.g.
/// `[{"generated_text": "..."}]` or `[{"translation_text": "...", "score": 0.9}]`.
pub type RawOutput = serde_json::Value;

/// An executable, loaded model. Must tolerate concurrent `invoke` calls.
#[async_trait]
pub trait PipelineHandle: Send + Sync {
    async fn invoke(&self, request: &FormattedRequest) -> Result<RawOutput, RuntimeError>;
}

/// Loads models by external identifier. May download artifacts.
#[async_trait]
pub trait InferenceRuntime: Send + Sync {
    async fn load(
        &self,
        model_id: &str,
        progress: &ProgressSink,
    ) -> Result<Arc<dyn PipelineHandle>, RuntimeError>;
}
