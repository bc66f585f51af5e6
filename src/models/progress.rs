//! Load progress reporting.
//!
//! Events for one load run `Downloading → Loading → Ready`, or end in
//! `Error`. Stages never go backwards.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// A load progress event.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadProgress {
    Downloading { model_id: String, fraction: f32 },
    Loading { model_id: String },
    Ready { model_id: String },
    Error { model_id: String, message: String },
}

/// Callback invoked for each progress event of a load the caller started.
pub type ProgressCallback = Arc<dyn Fn(&LoadProgress) + Send + Sync>;

const STAGE_DOWNLOADING: u8 = 0;
const STAGE_LOADING: u8 = 1;
const STAGE_DONE: u8 = 2;

/// Progress reporter handed to the runtime for one load.
pub struct ProgressSink {
    model_id: String,
    callback: Option<ProgressCallback>,
    stage: AtomicU8,
}

impl ProgressSink {
    pub fn new(model_id: impl Into<String>, callback: Option<ProgressCallback>) -> Self {
        Self {
            model_id: model_id.into(),
            callback,
            stage: AtomicU8::new(STAGE_DOWNLOADING),
        }
    }

    /// A sink that reports nowhere.
    pub fn silent(model_id: impl Into<String>) -> Self {
        Self::new(model_id, None)
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Report artifact download progress, `fraction` in `[0, 1]`.
    /// Ignored once loading has begun.
    pub fn downloading(&self, fraction: f32) {
        if self.stage.load(Ordering::SeqCst) != STAGE_DOWNLOADING {
            return;
        }
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.emit(LoadProgress::Downloading {
            model_id: self.model_id.clone(),
            fraction,
        });
    }

    /// Report that artifacts are present and the model is initialising.
    pub fn loading(&self) {
        if self
            .stage
            .compare_exchange(STAGE_DOWNLOADING, STAGE_LOADING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.emit(LoadProgress::Loading {
                model_id: self.model_id.clone(),
            });
        }
    }

    pub(crate) fn ready(&self) {
        self.loading();
        if self.stage.swap(STAGE_DONE, Ordering::SeqCst) != STAGE_DONE {
            self.emit(LoadProgress::Ready {
                model_id: self.model_id.clone(),
            });
        }
    }

    pub(crate) fn error(&self, message: &str) {
        if self.stage.swap(STAGE_DONE, Ordering::SeqCst) != STAGE_DONE {
            self.emit(LoadProgress::Error {
                model_id: self.model_id.clone(),
                message: message.to_string(),
            });
        }
    }

    fn emit(&self, event: LoadProgress) {
        if let Some(callback) = &self.callback {
            callback(&event);
        }
    }
}
