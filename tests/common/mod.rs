//! Scriptable inference runtime shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use lingua_core::engine::{ExecutorConfig, FormattedRequest, RawOutput, RuntimeError};
use lingua_core::models::{MemoryStore, ModelDescriptor, ModelStore, SelectorConfig};
use lingua_core::{
    CapacityTier, InferenceRuntime, ModelFamily, ModelRegistry, PipelineHandle, ProgressSink,
    TranslationService,
};

/// How a loaded handle answers `invoke`.
#[derive(Clone, Debug)]
pub enum Invoke {
    Reply(Value),
    DelayedReply(Duration, Value),
    Hang,
    Fail(RuntimeError),
}

/// Per-model load behaviour.
#[derive(Clone, Debug)]
pub struct Behavior {
    pub load_delay: Duration,
    pub load_error: Option<RuntimeError>,
    pub panic_on_load: bool,
    pub invoke: Invoke,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            load_delay: Duration::ZERO,
            load_error: None,
            panic_on_load: false,
            invoke: Invoke::Reply(json!([{ "generated_text": "Hello" }])),
        }
    }
}

#[derive(Default)]
pub struct StubRuntime {
    behaviors: Mutex<HashMap<String, Behavior>>,
    load_calls: Mutex<HashMap<String, usize>>,
    handles_created: AtomicUsize,
    requests: Arc<Mutex<Vec<FormattedRequest>>>,
}

impl StubRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, model_id: &str, behavior: Behavior) {
        self.behaviors.lock().insert(model_id.to_string(), behavior);
    }

    pub fn behavior(&self, model_id: &str) -> Behavior {
        self.behaviors.lock().get(model_id).cloned().unwrap_or_default()
    }

    pub fn load_calls(&self, model_id: &str) -> usize {
        self.load_calls.lock().get(model_id).copied().unwrap_or(0)
    }

    pub fn total_load_calls(&self) -> usize {
        self.load_calls.lock().values().sum()
    }

    pub fn handles_created(&self) -> usize {
        self.handles_created.load(Ordering::SeqCst)
    }

    /// Every request any handle has received, in order.
    pub fn requests(&self) -> Vec<FormattedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl InferenceRuntime for StubRuntime {
    async fn load(
        &self,
        model_id: &str,
        progress: &ProgressSink,
    ) -> Result<Arc<dyn PipelineHandle>, RuntimeError> {
        *self.load_calls.lock().entry(model_id.to_string()).or_default() += 1;
        let behavior = self.behavior(model_id);

        progress.downloading(0.5);
        if !behavior.load_delay.is_zero() {
            tokio::time::sleep(behavior.load_delay).await;
        }
        if behavior.panic_on_load {
            panic!("runtime crashed loading {model_id}");
        }
        if let Some(err) = behavior.load_error {
            return Err(err);
        }
        progress.loading();

        let serial = self.handles_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(StubHandle {
            serial,
            invoke: behavior.invoke,
            requests: self.requests.clone(),
        }))
    }
}

pub struct StubHandle {
    pub serial: usize,
    invoke: Invoke,
    requests: Arc<Mutex<Vec<FormattedRequest>>>,
}

#[async_trait]
impl PipelineHandle for StubHandle {
    async fn invoke(&self, request: &FormattedRequest) -> Result<RawOutput, RuntimeError> {
        self.requests.lock().push(request.clone());
        match &self.invoke {
            Invoke::Reply(value) => Ok(value.clone()),
            Invoke::DelayedReply(delay, value) => {
                tokio::time::sleep(*delay).await;
                Ok(value.clone())
            }
            Invoke::Hang => std::future::pending().await,
            Invoke::Fail(err) => Err(err.clone()),
        }
    }
}

pub fn descriptor(
    model_type: &str,
    model_id: &str,
    family: ModelFamily,
    tier: CapacityTier,
) -> ModelDescriptor {
    ModelDescriptor {
        model_type: model_type.into(),
        model_id: model_id.into(),
        family,
        tier,
        max_input_chars: 512,
    }
}

/// Built-in catalog plus `basic-fr-en`, a seq2seq basic-tier model.
pub fn test_registry() -> Arc<ModelRegistry> {
    let mut descriptors: Vec<ModelDescriptor> = ModelRegistry::builtin().iter().cloned().collect();
    descriptors.push(descriptor(
        "basic-fr-en",
        "test/opus-fr-en",
        ModelFamily::Seq2Seq,
        CapacityTier::Basic,
    ));
    Arc::new(ModelRegistry::from_descriptors(descriptors).unwrap())
}

pub fn service_with(
    runtime: Arc<StubRuntime>,
    store: Arc<dyn ModelStore>,
    default_model: &str,
) -> TranslationService {
    TranslationService::new(
        test_registry(),
        runtime,
        store,
        ExecutorConfig::default(),
        SelectorConfig {
            default_model: default_model.into(),
            ..SelectorConfig::default()
        },
    )
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}
