//! Model selection policy.
//!
//! Picks which model serves a request that does not pin one:
//! 1. any model already ready (zero load cost),
//! 2. any persisted model (reloaded; failures fall through and are pruned),
//! 3. the configured default, whose failure fails selection.
//!
//! A separate length-tier policy recommends a capacity tier from input
//! length alone, independent of what is loaded.

use std::sync::Arc;

use tracing::{debug, warn};

use super::loader::ModelLoader;
use super::registry::CapacityTier;
use crate::engine::{PipelineHandle, TranslationError};

/// Selector configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    /// Model type tried last.
    pub default_model: String,
    /// Inputs shorter than this (in characters) map to the basic tier.
    pub short_text_chars: usize,
    /// Inputs shorter than this map to the medium tier; longer to premium.
    pub medium_text_chars: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            default_model: "basic".to_string(),
            short_text_chars: 100,
            medium_text_chars: 500,
        }
    }
}

/// A selected model with its ready handle.
#[derive(Clone)]
pub struct Selection {
    pub model_type: String,
    pub handle: Arc<dyn PipelineHandle>,
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("model_type", &self.model_type)
            .finish_non_exhaustive()
    }
}

pub struct ModelSelector {
    loader: ModelLoader,
    config: SelectorConfig,
}

impl ModelSelector {
    pub fn new(loader: ModelLoader, config: SelectorConfig) -> Self {
        Self { loader, config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Resolve `explicit` if given, otherwise apply the priority policy.
    pub async fn select(&self, explicit: Option<&str>) -> Result<Selection, TranslationError> {
        if let Some(model_type) = explicit {
            let handle = self.loader.ensure_loaded(model_type, None).await?;
            return Ok(Selection {
                model_type: model_type.to_string(),
                handle,
            });
        }
        self.select_best_available().await
    }

    /// Best available model, by the ready → persisted → default policy.
    pub async fn select_best_available(&self) -> Result<Selection, TranslationError> {
        for model_type in self.loader.list_ready() {
            // None if a concurrent unload won the race.
            if let Some(handle) = self.loader.ready_handle(&model_type) {
                debug!(model_type = %model_type, "selected ready model");
                return Ok(Selection { model_type, handle });
            }
        }

        let records = self.loader.store().list_records().unwrap_or_else(|e| {
            warn!(error = %e, "cannot read persisted model records");
            Vec::new()
        });
        for record in records {
            if !self.loader.registry().contains(&record.model_type) {
                self.loader.prune_record(&record).await;
                continue;
            }
            match self.loader.ensure_loaded(&record.model_type, None).await {
                Ok(handle) => {
                    debug!(model_type = %record.model_type, "selected persisted model");
                    return Ok(Selection {
                        model_type: record.model_type,
                        handle,
                    });
                }
                Err(e) => {
                    warn!(model_type = %record.model_type, error = %e, "persisted model failed to load");
                    self.loader.prune_record(&record).await;
                }
            }
        }

        let default = &self.config.default_model;
        match self.loader.ensure_loaded(default, None).await {
            Ok(handle) => {
                debug!(model_type = %default, "selected default model");
                Ok(Selection {
                    model_type: default.clone(),
                    handle,
                })
            }
            Err(e) => Err(TranslationError::SelectionFailed(format!(
                "default model {default} unavailable: {e}"
            ))),
        }
    }

    /// Capacity tier for an input, by character length.
    pub fn tier_for_text(&self, text: &str) -> CapacityTier {
        tier_for_length(text.chars().count(), &self.config)
    }

    /// Model type recommended for `text`: the first catalog entry of its
    /// length tier, else the default model.
    pub fn recommend(&self, text: &str) -> String {
        let tier = self.tier_for_text(text);
        self.loader
            .registry()
            .default_for_tier(tier)
            .map(|d| d.model_type.clone())
            .unwrap_or_else(|| self.config.default_model.clone())
    }
}

/// Pure length-bucket policy.
pub fn tier_for_length(chars: usize, config: &SelectorConfig) -> CapacityTier {
    if chars < config.short_text_chars {
        CapacityTier::Basic
    } else if chars < config.medium_text_chars {
        CapacityTier::Medium
    } else {
        CapacityTier::Premium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_tiers() {
        let config = SelectorConfig::default();
        assert_eq!(tier_for_length(0, &config), CapacityTier::Basic);
        assert_eq!(tier_for_length(99, &config), CapacityTier::Basic);
        assert_eq!(tier_for_length(100, &config), CapacityTier::Medium);
        assert_eq!(tier_for_length(499, &config), CapacityTier::Medium);
        assert_eq!(tier_for_length(500, &config), CapacityTier::Premium);
    }
}
