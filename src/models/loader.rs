//! Model loading with in-flight deduplication.
//!
//! Owns the ready-set and the in-flight set. Both live behind one mutex so
//! every transition (start load, move to ready, drop on failure, unload) is
//! atomic with respect to the others. Concurrent `ensure_loaded` calls for
//! the same model identifier share a single runtime `load`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::persistence::{ModelStore, PersistedModelRecord, StoreError};
use super::progress::{ProgressCallback, ProgressSink};
use super::registry::{ModelDescriptor, ModelRegistry, RegistryError};
use crate::engine::{InferenceRuntime, PipelineHandle, RuntimeError};
use crate::telemetry;

/// Load failures. Cloneable so one failure reaches every joined caller.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error("Unknown model type: {0}")]
    UnknownModel(String),

    #[error("Out of memory loading {model_type}: {reason}")]
    ResourceExhausted { model_type: String, reason: String },

    #[error("Runtime failed to load {model_type}: {reason}")]
    Runtime { model_type: String, reason: String },

    #[error("Load of {model_type} aborted: {reason}")]
    Aborted { model_type: String, reason: String },
}

impl LoadError {
    fn from_runtime(model_type: &str, err: RuntimeError) -> Self {
        let model_type = model_type.to_string();
        match err {
            RuntimeError::OutOfMemory(reason) => Self::ResourceExhausted { model_type, reason },
            other => Self::Runtime {
                model_type,
                reason: other.to_string(),
            },
        }
    }
}

impl From<RegistryError> for LoadError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(model_type) => Self::UnknownModel(model_type),
            other => Self::UnknownModel(other.to_string()),
        }
    }
}

type LoadOutcome = Result<Arc<dyn PipelineHandle>, LoadError>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

struct ReadyModel {
    model_type: String,
    handle: Arc<dyn PipelineHandle>,
    loaded_at: DateTime<Utc>,
}

struct InFlightLoad {
    generation: u64,
    future: SharedLoad,
}

/// Keyed by external model identifier.
#[derive(Default)]
struct LoaderState {
    ready: HashMap<String, ReadyModel>,
    in_flight: HashMap<String, InFlightLoad>,
}

struct LoaderInner {
    registry: Arc<ModelRegistry>,
    runtime: Arc<dyn InferenceRuntime>,
    store: Arc<dyn ModelStore>,
    state: Mutex<LoaderState>,
    next_generation: AtomicU64,
}

/// Summary of a loaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyModelInfo {
    pub model_type: String,
    pub model_id: String,
    pub loaded_at: DateTime<Utc>,
}

/// Outcome of the startup reload pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub restored: Vec<String>,
    pub pruned: Vec<String>,
}

/// Loads models through the runtime and tracks which ones are ready.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ModelLoader {
    inner: Arc<LoaderInner>,
}

impl ModelLoader {
    pub fn new(
        registry: Arc<ModelRegistry>,
        runtime: Arc<dyn InferenceRuntime>,
        store: Arc<dyn ModelStore>,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                registry,
                runtime,
                store,
                state: Mutex::new(LoaderState::default()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.inner.registry
    }

    pub fn store(&self) -> &Arc<dyn ModelStore> {
        &self.inner.store
    }

    /// Return a ready handle for `model_type`, loading it if needed.
    ///
    /// Ready models return immediately without progress events. If a load is
    /// already running, the caller joins it and receives its outcome;
    /// `on_progress` is only used when this call starts the load.
    pub async fn ensure_loaded(
        &self,
        model_type: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Arc<dyn PipelineHandle>, LoadError> {
        let descriptor = self.inner.registry.describe(model_type)?.clone();

        let pending = {
            let mut state = self.inner.state.lock();
            if let Some(ready) = state.ready.get(&descriptor.model_id) {
                return Ok(ready.handle.clone());
            }
            match state.in_flight.get(&descriptor.model_id) {
                Some(load) => {
                    debug!(model_type, model_id = %descriptor.model_id, "joining in-flight load");
                    telemetry::record_dedup_join();
                    load.future.clone()
                }
                None => {
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
                    let future = self.start_load(descriptor.clone(), generation, on_progress);
                    state.in_flight.insert(
                        descriptor.model_id.clone(),
                        InFlightLoad {
                            generation,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };

        pending.await
    }

    /// Spawn the runtime load. Runs to completion even if every caller
    /// awaiting it is dropped. Must be called with the state lock held.
    fn start_load(
        &self,
        descriptor: ModelDescriptor,
        generation: u64,
        on_progress: Option<ProgressCallback>,
    ) -> SharedLoad {
        let inner = self.inner.clone();
        let model_type = descriptor.model_type.clone();
        let task = tokio::spawn(run_load(inner, descriptor, generation, on_progress));

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(LoadError::Aborted {
                    model_type,
                    reason: join_err.to_string(),
                }),
            }
        }
        .boxed()
        .shared()
    }

    /// Drop the ready handle and persisted record for `model_type`.
    /// Returns whether anything was removed. In-flight loads are untouched.
    pub fn unload(&self, model_type: &str) -> bool {
        let model_id = match self.inner.registry.describe(model_type) {
            Ok(descriptor) => descriptor.model_id.clone(),
            Err(_) => {
                debug!(model_type, "unload of unknown model type");
                return false;
            }
        };

        let removed_handle = self.inner.state.lock().ready.remove(&model_id).is_some();
        let removed_record = match self.inner.store.remove_record(&model_id) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(model_type, error = %e, "failed to remove persisted model record");
                false
            }
        };

        if removed_handle {
            info!(model_type, model_id = %model_id, "model unloaded");
        }
        removed_handle || removed_record
    }

    /// Unload every ready model. Returns the unloaded model types.
    pub fn unload_all(&self) -> Vec<String> {
        let drained: Vec<(String, ReadyModel)> = self.inner.state.lock().ready.drain().collect();
        let mut unloaded = Vec::with_capacity(drained.len());
        for (model_id, ready) in drained {
            if let Err(e) = self.inner.store.remove_record(&model_id) {
                warn!(model_id = %model_id, error = %e, "failed to remove persisted model record");
            }
            unloaded.push(ready.model_type);
        }
        unloaded.sort();
        unloaded
    }

    pub fn is_ready(&self, model_type: &str) -> bool {
        match self.inner.registry.describe(model_type) {
            Ok(descriptor) => self.inner.state.lock().ready.contains_key(&descriptor.model_id),
            Err(_) => false,
        }
    }

    /// The ready handle for `model_type`, without loading.
    pub fn ready_handle(&self, model_type: &str) -> Option<Arc<dyn PipelineHandle>> {
        let descriptor = self.inner.registry.describe(model_type).ok()?;
        let state = self.inner.state.lock();
        state.ready.get(&descriptor.model_id).map(|r| r.handle.clone())
    }

    pub fn is_loading(&self, model_type: &str) -> bool {
        match self.inner.registry.describe(model_type) {
            Ok(descriptor) => self
                .inner
                .state
                .lock()
                .in_flight
                .contains_key(&descriptor.model_id),
            Err(_) => false,
        }
    }

    /// Ready model types, oldest load first.
    pub fn list_ready(&self) -> Vec<String> {
        self.ready_models().into_iter().map(|m| m.model_type).collect()
    }

    /// Ready models with metadata, oldest load first.
    pub fn ready_models(&self) -> Vec<ReadyModelInfo> {
        let state = self.inner.state.lock();
        let mut models: Vec<ReadyModelInfo> = state
            .ready
            .iter()
            .map(|(model_id, ready)| ReadyModelInfo {
                model_type: ready.model_type.clone(),
                model_id: model_id.clone(),
                loaded_at: ready.loaded_at,
            })
            .collect();
        models.sort_by(|a, b| {
            a.loaded_at
                .cmp(&b.loaded_at)
                .then_with(|| a.model_type.cmp(&b.model_type))
        });
        models
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    /// Reload every persisted model once. Records that no longer resolve or
    /// fail to load are removed so they are never retried.
    pub async fn reload_persisted(&self) -> ReloadSummary {
        let records = match self.inner.store.list_records() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "cannot read persisted model records, skipping reload");
                return ReloadSummary::default();
            }
        };

        let mut summary = ReloadSummary::default();
        for record in records {
            let result = match self.inner.registry.describe(&record.model_type) {
                Ok(d) if d.model_id == record.model_id => {
                    self.ensure_loaded(&record.model_type, None).await.map(|_| ())
                }
                Ok(_) | Err(_) => Err(LoadError::UnknownModel(record.model_type.clone())),
            };

            match result {
                Ok(()) => {
                    info!(model_type = %record.model_type, "restored persisted model");
                    summary.restored.push(record.model_type);
                }
                Err(e) => {
                    warn!(
                        model_type = %record.model_type,
                        model_id = %record.model_id,
                        error = %e,
                        "persisted model failed to reload, pruning record"
                    );
                    self.prune_record(&record).await;
                    summary.pruned.push(record.model_type);
                }
            }
        }
        summary
    }

    /// Run `reload_persisted` as a background task. Never blocks the caller;
    /// errors are logged inside the task.
    pub fn spawn_reload(&self) -> JoinHandle<ReloadSummary> {
        let loader = self.clone();
        tokio::spawn(async move {
            let summary = loader.reload_persisted().await;
            info!(
                restored = summary.restored.len(),
                pruned = summary.pruned.len(),
                "persisted model reload complete"
            );
            summary
        })
    }

    pub(crate) async fn prune_record(&self, record: &PersistedModelRecord) {
        let model_id = record.model_id.clone();
        match with_store(&self.inner.store, move |store| store.remove_record(&model_id)).await {
            Ok(true) => telemetry::record_record_pruned(),
            Ok(false) => {}
            Err(e) => warn!(model_id = %record.model_id, error = %e, "failed to prune record"),
        }
    }
}

/// Removes this load's in-flight entry when the load task ends, including
/// by panic. The generation check keeps a finished load from evicting a
/// newer load of the same model.
struct InFlightGuard {
    inner: Arc<LoaderInner>,
    model_id: String,
    generation: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if state
            .in_flight
            .get(&self.model_id)
            .is_some_and(|load| load.generation == self.generation)
        {
            state.in_flight.remove(&self.model_id);
        }
    }
}

/// Run a store call on the blocking pool. File-backed stores sync to disk,
/// which must not stall the async workers.
async fn with_store<T, F>(store: &Arc<dyn ModelStore>, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ModelStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))?
}

async fn run_load(
    inner: Arc<LoaderInner>,
    descriptor: ModelDescriptor,
    generation: u64,
    on_progress: Option<ProgressCallback>,
) -> LoadOutcome {
    let guard = InFlightGuard {
        inner: inner.clone(),
        model_id: descriptor.model_id.clone(),
        generation,
    };
    let progress = ProgressSink::new(descriptor.model_id.clone(), on_progress);
    let started = Instant::now();

    info!(model_type = %descriptor.model_type, model_id = %descriptor.model_id, "loading model");
    progress.downloading(0.0);

    let outcome = inner.runtime.load(&descriptor.model_id, &progress).await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(handle) => {
            {
                let mut state = inner.state.lock();
                state.ready.insert(
                    descriptor.model_id.clone(),
                    ReadyModel {
                        model_type: descriptor.model_type.clone(),
                        handle: handle.clone(),
                        loaded_at: Utc::now(),
                    },
                );
                if state
                    .in_flight
                    .get(&descriptor.model_id)
                    .is_some_and(|load| load.generation == generation)
                {
                    state.in_flight.remove(&descriptor.model_id);
                }
            }
            drop(guard);

            let record = PersistedModelRecord::now(&descriptor.model_id, &descriptor.model_type);
            if let Err(e) = with_store(&inner.store, move |store| store.add_record(record)).await {
                warn!(model_type = %descriptor.model_type, error = %e, "failed to persist model record");
            }

            progress.ready();
            telemetry::record_load("success", elapsed);
            info!(
                model_type = %descriptor.model_type,
                elapsed_ms = elapsed.as_millis() as u64,
                "model ready"
            );
            Ok(handle)
        }
        Err(e) => {
            drop(guard);
            let err = LoadError::from_runtime(&descriptor.model_type, e);
            progress.error(&err.to_string());
            telemetry::record_load("failure", elapsed);
            warn!(
                model_type = %descriptor.model_type,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "model load failed"
            );
            Err(err)
        }
    }
}
