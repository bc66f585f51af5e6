//! Translation engine module for Lingua CORE.
//!
//! Shapes requests per model family, drives the inference runtime under a
//! deadline, and turns raw output into sanitized, classified results.

pub mod error;
pub mod executor;
pub mod format;
pub mod languages;
pub mod request;
pub mod runtime;
pub mod sanitize;

pub use error::{ErrorKind, TranslationError};
pub use executor::{ExecutorConfig, TranslationExecutor};
pub use format::{ExtractedOutput, GenerationLimits};
pub use request::{validate_input, TranslationRequest, TranslationResult};
pub use runtime::{
    FormattedRequest, GenerationOptions, InferenceRuntime, PipelineHandle, RawOutput,
    RuntimeError,
};
pub use sanitize::{detect_corruption, Corruption, OutputSanitizer};
