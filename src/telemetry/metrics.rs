//! Metric names and recording helpers.

use std::time::Duration;

pub const MODEL_LOADS: &str = "lingua_model_loads_total";
pub const MODEL_LOAD_LATENCY: &str = "lingua_model_load_latency_ms";
pub const DEDUP_JOINS: &str = "lingua_load_dedup_joins_total";
pub const TRANSLATIONS: &str = "lingua_translations_total";
pub const TRANSLATION_LATENCY: &str = "lingua_translation_latency_ms";
pub const RECORDS_PRUNED: &str = "lingua_persisted_records_pruned_total";

/// Record a finished runtime load. `outcome` is `success` or `failure`.
pub fn record_load(outcome: &'static str, elapsed: Duration) {
    metrics::counter!(MODEL_LOADS, "outcome" => outcome).increment(1);
    metrics::histogram!(MODEL_LOAD_LATENCY).record(elapsed.as_secs_f64() * 1000.0);
}

/// Record a caller joining a load already in flight.
pub fn record_dedup_join() {
    metrics::counter!(DEDUP_JOINS).increment(1);
}

/// Record a finished translation. `outcome` is `ok` or an error kind.
pub fn record_translation(model_type: &str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        TRANSLATIONS,
        "model_type" => model_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(TRANSLATION_LATENCY, "model_type" => model_type.to_string())
        .record(elapsed.as_secs_f64() * 1000.0);
}

/// Record a stale persisted record being removed.
pub fn record_record_pruned() {
    metrics::counter!(RECORDS_PRUNED).increment(1);
}
