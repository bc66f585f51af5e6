//! Deadline-bounded translation execution.
//!
//! Formats the request for the model family, invokes the runtime under a
//! timer, extracts and sanitizes the response, and classifies failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::error::TranslationError;
use super::format::{extract_output, format_request, GenerationLimits};
use super::request::{TranslationRequest, TranslationResult};
use super::runtime::PipelineHandle;
use super::sanitize::OutputSanitizer;
use crate::models::ModelRegistry;

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub default_deadline: Duration,
    pub limits: GenerationLimits,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_deadline: Duration::from_secs(30),
            limits: GenerationLimits::default(),
        }
    }
}

/// Runs one translation against a ready pipeline handle.
pub struct TranslationExecutor {
    registry: Arc<ModelRegistry>,
    sanitizer: OutputSanitizer,
    config: ExecutorConfig,
}

impl TranslationExecutor {
    pub fn new(registry: Arc<ModelRegistry>, config: ExecutorConfig) -> Self {
        Self {
            registry,
            sanitizer: OutputSanitizer::new(),
            config,
        }
    }

    pub fn default_deadline(&self) -> Duration {
        self.config.default_deadline
    }

    /// Execute `request` on `handle`, failing with `Timeout` once `deadline`
    /// elapses.
    ///
    /// The runtime call runs as its own task. On timeout the task is aborted;
    /// a runtime that cannot observe cancellation (blocking inside its own
    /// thread) is left to finish in the background and its result is dropped.
    pub async fn execute(
        &self,
        handle: Arc<dyn PipelineHandle>,
        request: &TranslationRequest,
        deadline: Duration,
    ) -> Result<TranslationResult, TranslationError> {
        let descriptor = self.registry.describe(&request.model_type)?;
        request.validate(descriptor)?;
        let formatted = format_request(descriptor, request, &self.config.limits)?;

        debug!(
            model_type = %request.model_type,
            max_new_tokens = formatted.options().max_new_tokens,
            "invoking runtime"
        );

        let started = Instant::now();
        let invocation = tokio::spawn(async move { handle.invoke(&formatted).await });
        let abort = invocation.abort_handle();

        let raw = match tokio::time::timeout(deadline, invocation).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(TranslationError::Runtime(format!(
                    "runtime invocation aborted: {join_err}"
                )))
            }
            Err(_) => {
                abort.abort();
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(
                    model_type = %request.model_type,
                    elapsed_ms,
                    "translation deadline elapsed, abandoning runtime call"
                );
                return Err(TranslationError::Timeout(deadline.as_millis() as u64));
            }
        };

        let extracted = extract_output(&descriptor.family, &raw)?;
        let translated_text = self.sanitizer.sanitize(&extracted.text)?;

        Ok(TranslationResult {
            translated_text,
            model_used: request.model_type.clone(),
            source_language: request.source_language.clone(),
            target_language: request.target_language.clone(),
            confidence: extracted.confidence,
        })
    }
}
