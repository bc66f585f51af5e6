//! Static catalog of translation models.
//!
//! Maps a logical model type (`basic`, `premium`, ...) to its descriptor.
//! Built once at startup and never mutated, so lookups need no locking.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    #[error("Unknown model type: {0}")]
    NotFound(String),

    #[error("Duplicate model type in catalog: {0}")]
    Duplicate(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),
}

/// Request/response shaping strategy a model requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModelFamily {
    /// Generative seq2seq: instruction prompt in, generated text out.
    Seq2Seq,
    /// Explicit language pair: raw text plus source/target language tags.
    LanguagePair,
    /// A family this build has no executor branch for.
    Other(String),
}

impl ModelFamily {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Seq2Seq => "seq2seq",
            Self::LanguagePair => "language_pair",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for ModelFamily {
    fn from(tag: String) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "seq2seq" | "text2text" | "text2text-generation" => Self::Seq2Seq,
            "language_pair" | "language-pair" | "translation" => Self::LanguagePair,
            _ => Self::Other(tag),
        }
    }
}

impl From<ModelFamily> for String {
    fn from(family: ModelFamily) -> Self {
        family.as_str().to_string()
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse cost/quality bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityTier {
    Basic,
    Medium,
    Premium,
}

/// Immutable description of one model variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Logical type name callers use.
    pub model_type: String,
    /// External identifier passed to the runtime.
    pub model_id: String,
    pub family: ModelFamily,
    pub tier: CapacityTier,
    /// Longest accepted input, in characters.
    pub max_input_chars: usize,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

/// Read-only model catalog.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    descriptors: HashMap<String, ModelDescriptor>,
    /// Catalog order, used for tier defaults and listings.
    order: Vec<String>,
}

impl ModelRegistry {
    /// Build from descriptors, rejecting duplicate or empty entries.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ModelDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        for descriptor in descriptors {
            if descriptor.model_type.is_empty() || descriptor.model_id.is_empty() {
                return Err(RegistryError::InvalidCatalog(
                    "model_type and model_id cannot be empty".into(),
                ));
            }
            if descriptor.max_input_chars == 0 {
                return Err(RegistryError::InvalidCatalog(format!(
                    "max_input_chars must be > 0 for {}",
                    descriptor.model_type
                )));
            }
            if map.contains_key(&descriptor.model_type) {
                return Err(RegistryError::Duplicate(descriptor.model_type));
            }
            order.push(descriptor.model_type.clone());
            map.insert(descriptor.model_type.clone(), descriptor);
        }
        Ok(Self { descriptors: map, order })
    }

    /// Built-in catalog.
    pub fn builtin() -> Self {
        let descriptors = vec![
            ModelDescriptor {
                model_type: "basic".into(),
                model_id: "Xenova/flan-t5-small".into(),
                family: ModelFamily::Seq2Seq,
                tier: CapacityTier::Basic,
                max_input_chars: 512,
            },
            ModelDescriptor {
                model_type: "medium".into(),
                model_id: "Xenova/flan-t5-base".into(),
                family: ModelFamily::Seq2Seq,
                tier: CapacityTier::Medium,
                max_input_chars: 1024,
            },
            ModelDescriptor {
                model_type: "premium".into(),
                model_id: "Xenova/nllb-200-distilled-600M".into(),
                family: ModelFamily::LanguagePair,
                tier: CapacityTier::Premium,
                max_input_chars: 2048,
            },
        ];
        let order = descriptors.iter().map(|d| d.model_type.clone()).collect();
        let descriptors = descriptors
            .into_iter()
            .map(|d| (d.model_type.clone(), d))
            .collect();
        Self { descriptors, order }
    }

    /// Parse a TOML catalog of `[[models]]` tables.
    pub fn from_toml(content: &str) -> Result<Self, RegistryError> {
        let catalog: CatalogFile =
            toml::from_str(content).map_err(|e| RegistryError::InvalidCatalog(e.to_string()))?;
        if catalog.models.is_empty() {
            return Err(RegistryError::InvalidCatalog("catalog has no models".into()));
        }
        Self::from_descriptors(catalog.models)
    }

    /// Load a TOML catalog from disk.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::InvalidCatalog(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn describe(&self, model_type: &str) -> Result<&ModelDescriptor, RegistryError> {
        self.descriptors
            .get(model_type)
            .ok_or_else(|| RegistryError::NotFound(model_type.to_string()))
    }

    pub fn contains(&self, model_type: &str) -> bool {
        self.descriptors.contains_key(model_type)
    }

    /// First catalog entry in `tier`.
    pub fn default_for_tier(&self, tier: CapacityTier) -> Option<&ModelDescriptor> {
        self.iter().find(|d| d.tier == tier)
    }

    /// Descriptors in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.order.iter().filter_map(|t| self.descriptors.get(t))
    }

    pub fn model_types(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
