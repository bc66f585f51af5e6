//! Public lifecycle surface.
//!
//! `TranslationService` composes the registry, loader, selector and executor.
//! It holds no state of its own beyond those components.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument, Span};
use uuid::Uuid;

use crate::config::EnvConfig;
use crate::engine::{
    validate_input, ExecutorConfig, InferenceRuntime, TranslationError, TranslationExecutor,
    TranslationRequest, TranslationResult,
};
use crate::models::{
    JsonFileStore, MemoryStore, ModelLoader, ModelRegistry, ModelSelector, ModelStore,
    ProgressCallback, RegistryError, ReloadSummary, SelectorConfig, StoreError,
};
use crate::telemetry::{self, SpanExt, TranslationSpan};

/// Loaded vs. available model counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub loaded: usize,
    pub available: usize,
    pub loading: usize,
    pub persisted: usize,
    pub loaded_types: Vec<String>,
}

/// Outcome of `preload_recommended`.
#[derive(Debug, Default)]
pub struct PreloadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, TranslationError)>,
}

pub struct TranslationService {
    registry: Arc<ModelRegistry>,
    loader: ModelLoader,
    selector: ModelSelector,
    executor: TranslationExecutor,
    preload: Vec<String>,
}

impl TranslationService {
    pub fn new(
        registry: Arc<ModelRegistry>,
        runtime: Arc<dyn InferenceRuntime>,
        store: Arc<dyn ModelStore>,
        executor_config: ExecutorConfig,
        selector_config: SelectorConfig,
    ) -> Self {
        let loader = ModelLoader::new(registry.clone(), runtime, store);
        let selector = ModelSelector::new(loader.clone(), selector_config);
        let executor = TranslationExecutor::new(registry.clone(), executor_config);
        Self {
            registry,
            loader,
            selector,
            executor,
            preload: Vec::new(),
        }
    }

    /// Build from environment configuration: catalog file or built-in
    /// catalog, JSON state file or in-memory store.
    pub fn from_env(
        config: &EnvConfig,
        runtime: Arc<dyn InferenceRuntime>,
    ) -> Result<Self, RegistryError> {
        let registry = match &config.catalog_path {
            Some(path) => ModelRegistry::from_file(path)?,
            None => ModelRegistry::builtin(),
        };
        let store: Arc<dyn ModelStore> = match &config.state_path {
            Some(path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };
        info!(
            models = registry.len(),
            persistent_state = config.state_path.is_some(),
            default_model = %config.default_model,
            "translation service configured"
        );
        Ok(Self::new(
            Arc::new(registry),
            runtime,
            store,
            config.executor_config(),
            config.selector_config(),
        )
        .with_preload(config.preload.clone()))
    }

    /// Extra model types for `preload_recommended`, after the default.
    pub fn with_preload(mut self, model_types: Vec<String>) -> Self {
        self.preload = model_types;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &ModelLoader {
        &self.loader
    }

    /// Translate `text`, using `model_type` if given, else the best
    /// available model. Bounded by the configured deadline.
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        model_type: Option<&str>,
    ) -> Result<TranslationResult, TranslationError> {
        self.translate_with_deadline(
            text,
            source_language,
            target_language,
            model_type,
            self.executor.default_deadline(),
        )
        .await
    }

    pub async fn translate_with_deadline(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        model_type: Option<&str>,
        deadline: Duration,
    ) -> Result<TranslationResult, TranslationError> {
        let request_id = Uuid::new_v4().to_string();
        let span = TranslationSpan::new(&request_id, source_language, target_language);
        let started = Instant::now();

        let mut selected = model_type.map(str::to_string);
        let result = self
            .run_translation(
                text,
                source_language,
                target_language,
                model_type,
                deadline,
                &mut selected,
            )
            .instrument(span.clone())
            .await;

        let elapsed = started.elapsed();
        span.record_latency(elapsed);
        span.record_result(&result);

        match &result {
            Ok(translated) => {
                telemetry::record_translation(&translated.model_used, "ok", elapsed);
            }
            Err(e) => {
                let label = selected.as_deref().unwrap_or("unselected");
                telemetry::record_translation(label, e.kind().as_str(), elapsed);
                if e.is_warning() {
                    warn!(request_id = %request_id, kind = e.kind().as_str(), error = %e, "translation failed");
                } else {
                    error!(request_id = %request_id, kind = e.kind().as_str(), error = %e, "translation failed");
                }
            }
        }
        result
    }

    /// `selected` is set once a model is chosen, so failures after
    /// selection are attributed to that model.
    async fn run_translation(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        model_type: Option<&str>,
        deadline: Duration,
        selected: &mut Option<String>,
    ) -> Result<TranslationResult, TranslationError> {
        validate_input(text, source_language, target_language)?;

        // Oversized input for a pinned model is rejected before any load.
        if let Some(model_type) = model_type {
            let descriptor = self.registry.describe(model_type)?;
            TranslationRequest::new(text, source_language, target_language, model_type)
                .validate(descriptor)?;
        }

        let selection = self.selector.select(model_type).await?;
        Span::current().record("model_type", selection.model_type.as_str());
        *selected = Some(selection.model_type.clone());

        let request = TranslationRequest::new(
            text,
            source_language,
            target_language,
            selection.model_type.as_str(),
        );
        self.executor
            .execute(selection.handle, &request, deadline)
            .await
    }

    /// Load `model_type`, reporting progress to `on_progress` if this call
    /// starts the load.
    pub async fn load(
        &self,
        model_type: &str,
        on_progress: Option<ProgressCallback>,
    ) -> Result<(), TranslationError> {
        self.loader.ensure_loaded(model_type, on_progress).await?;
        Ok(())
    }

    pub fn unload(&self, model_type: &str) -> bool {
        self.loader.unload(model_type)
    }

    pub fn is_ready(&self, model_type: &str) -> bool {
        self.loader.is_ready(model_type)
    }

    /// Load the default model and any configured preload types concurrently.
    /// Individual failures are reported, not propagated.
    pub async fn preload_recommended(&self) -> PreloadReport {
        let mut targets = vec![self.selector.config().default_model.clone()];
        for model_type in &self.preload {
            if !targets.contains(model_type) {
                targets.push(model_type.clone());
            }
        }

        let outcomes = join_all(targets.iter().map(|t| self.loader.ensure_loaded(t, None))).await;

        let mut report = PreloadReport::default();
        for (model_type, outcome) in targets.into_iter().zip(outcomes) {
            match outcome {
                Ok(_) => report.loaded.push(model_type),
                Err(e) => {
                    warn!(model_type = %model_type, error = %e, "preload failed");
                    report.failed.push((model_type, e.into()));
                }
            }
        }
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "preload complete"
        );
        report
    }

    /// Unload every ready model. Returns the unloaded model types.
    pub fn unload_all(&self) -> Vec<String> {
        let unloaded = self.loader.unload_all();
        info!(count = unloaded.len(), "all models unloaded");
        unloaded
    }

    pub fn stats(&self) -> ServiceStats {
        let loaded_types = self.loader.list_ready();
        let persisted = match self.loader.store().list_records() {
            Ok(records) => records.len(),
            Err(e) => {
                warn!(error = %e, "cannot read persisted model records");
                0
            }
        };
        ServiceStats {
            loaded: loaded_types.len(),
            available: self.registry.len(),
            loading: self.loader.in_flight_count(),
            persisted,
            loaded_types,
        }
    }

    /// Unload everything and erase the persistence store.
    pub fn clear_all(&self) -> Result<Vec<String>, StoreError> {
        let unloaded = self.loader.unload_all();
        self.loader.store().clear()?;
        info!(count = unloaded.len(), "model cache cleared");
        Ok(unloaded)
    }

    /// Model type suited to `text` by length, regardless of what is loaded.
    pub fn recommend_model(&self, text: &str) -> String {
        self.selector.recommend(text)
    }

    /// Reload persisted models in the background. The returned handle may
    /// be awaited or dropped.
    pub fn start_background_reload(&self) -> JoinHandle<ReloadSummary> {
        self.loader.spawn_reload()
    }
}
