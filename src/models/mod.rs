//! Model management module for Lingua CORE.
//!
//! Handles the model catalog, loading with deduplication, persisted-state
//! recovery, and model selection.

mod loader;
mod persistence;
mod progress;
mod registry;
mod selector;

pub use loader::{LoadError, ModelLoader, ReadyModelInfo, ReloadSummary};
pub use persistence::{
    JsonFileStore, MemoryStore, ModelStore, PersistedModelRecord, StoreError,
};
pub use progress::{LoadProgress, ProgressCallback, ProgressSink};
pub use registry::{CapacityTier, ModelDescriptor, ModelFamily, ModelRegistry, RegistryError};
pub use selector::{tier_for_length, ModelSelector, Selection, SelectorConfig};
