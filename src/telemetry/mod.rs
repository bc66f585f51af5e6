//! Telemetry module for Lingua CORE.
//!
//! Provides structured logging, per-translation spans, and metrics through
//! the `metrics` facade. No exporter is installed here; the embedding
//! application chooses one.

mod logging;
mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    record_dedup_join, record_load, record_record_pruned, record_translation,
};
pub use spans::{SpanExt, TranslationSpan};
