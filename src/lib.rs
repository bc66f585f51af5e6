//! Lingua CORE
//!
//! Lifecycle manager for local machine-translation models. Loads, caches,
//! selects, executes and evicts models on behalf of an embedding
//! application, through a narrow inference-runtime interface.
//!
//! # Components
//!
//! - **Registry**: static catalog of model descriptors
//! - **Loader**: ready-set and in-flight loads, one runtime load per model
//! - **Executor**: per-family formatting, deadline, sanitizing
//! - **Selector**: ready → persisted → default policy
//! - **Service**: the public facade over all of the above
//!
//! # Boundaries
//!
//! - No tensor math, tokenization or network code. The runtime does that.
//! - No HTTP or chat surface. Callers embed `TranslationService`.

pub mod config;
pub mod engine;
pub mod models;
pub mod service;
pub mod telemetry;

pub use engine::{
    ErrorKind, FormattedRequest, GenerationOptions, InferenceRuntime, PipelineHandle, RawOutput,
    RuntimeError, TranslationError, TranslationResult,
};
pub use models::{
    CapacityTier, LoadProgress, ModelDescriptor, ModelFamily, ModelRegistry, ProgressCallback,
    ProgressSink,
};
pub use service::{PreloadReport, ServiceStats, TranslationService};
