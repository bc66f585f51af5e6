//! Runtime configuration loading from environment variables.
//!
//! All configuration values are loaded from `LINGUA_*` environment variables
//! with sensible defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `LINGUA_DEFAULT_MODEL` | basic | Model type the selector tries last |
//! | `LINGUA_TRANSLATE_TIMEOUT_MS` | 30000 | Translation deadline (ms) |
//! | `LINGUA_GENERATION_MULTIPLIER` | 2 | Generation cap per input character |
//! | `LINGUA_MIN_NEW_TOKENS` | 16 | Lower bound on generation cap |
//! | `LINGUA_MAX_NEW_TOKENS` | 512 | Upper bound on generation cap |
//! | `LINGUA_SHORT_TEXT_CHARS` | 100 | Inputs below this use the basic tier |
//! | `LINGUA_MEDIUM_TEXT_CHARS` | 500 | Inputs below this use the medium tier |
//! | `LINGUA_STATE_PATH` | unset | JSON state file (unset: in-memory) |
//! | `LINGUA_CATALOG_PATH` | unset | TOML catalog (unset: built-in) |
//! | `LINGUA_PRELOAD` | unset | Comma-separated model types to preload |
//! | `LINGUA_LOG_LEVEL` | info | Log filter directive |
//! | `LINGUA_LOG_FORMAT` | json | `json` or `pretty` |

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::{ExecutorConfig, GenerationLimits};
use crate::models::SelectorConfig;
use crate::telemetry::{LogConfig, LogFormat};

/// Effective runtime configuration summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub default_model: String,
    pub translate_timeout_ms: u64,
    pub generation_multiplier: usize,
    pub min_new_tokens: usize,
    pub max_new_tokens: usize,
    pub short_text_chars: usize,
    pub medium_text_chars: usize,
    pub persistent_state: bool,
    pub custom_catalog: bool,
    pub preload: Vec<String>,
}

/// All runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub default_model: String,
    pub translate_timeout: Duration,
    pub limits: GenerationLimits,
    pub short_text_chars: usize,
    pub medium_text_chars: usize,
    pub state_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub preload: Vec<String>,
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Non-empty trimmed string env var.
fn parse_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Load generation limits from environment.
fn load_generation_limits() -> GenerationLimits {
    let multiplier = parse_usize("LINGUA_GENERATION_MULTIPLIER", 2).clamp(1, 8);
    let max_new_tokens = parse_usize("LINGUA_MAX_NEW_TOKENS", 512).max(1);
    let min_new_tokens = parse_usize("LINGUA_MIN_NEW_TOKENS", 16).clamp(1, max_new_tokens);
    GenerationLimits {
        multiplier,
        min_new_tokens,
        max_new_tokens,
    }
}

/// Load length-tier thresholds from environment.
fn load_tier_thresholds() -> (usize, usize) {
    let short = parse_usize("LINGUA_SHORT_TEXT_CHARS", 100).max(1);
    let medium = parse_usize("LINGUA_MEDIUM_TEXT_CHARS", 500).max(short); // medium >= short
    (short, medium)
}

fn load_preload_list() -> Vec<String> {
    let mut preload: Vec<String> = Vec::new();
    for entry in parse_string("LINGUA_PRELOAD").unwrap_or_default().split(',') {
        let entry = entry.trim();
        if !entry.is_empty() && !preload.iter().any(|p| p == entry) {
            preload.push(entry.to_string());
        }
    }
    preload
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let default_model = parse_string("LINGUA_DEFAULT_MODEL").unwrap_or_else(|| "basic".into());
    let timeout_ms = parse_u64("LINGUA_TRANSLATE_TIMEOUT_MS", 30_000).max(10); // floor: 10ms
    let (short_text_chars, medium_text_chars) = load_tier_thresholds();
    let log_format = parse_string("LINGUA_LOG_FORMAT")
        .and_then(|v| LogFormat::parse(&v))
        .unwrap_or_default();

    EnvConfig {
        default_model,
        translate_timeout: Duration::from_millis(timeout_ms),
        limits: load_generation_limits(),
        short_text_chars,
        medium_text_chars,
        state_path: parse_string("LINGUA_STATE_PATH").map(PathBuf::from),
        catalog_path: parse_string("LINGUA_CATALOG_PATH").map(PathBuf::from),
        preload: load_preload_list(),
        log_level: parse_string("LINGUA_LOG_LEVEL").unwrap_or_else(|| "info".into()),
        log_format,
    }
}

impl EnvConfig {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            default_deadline: self.translate_timeout,
            limits: self.limits,
        }
    }

    pub fn selector_config(&self) -> SelectorConfig {
        SelectorConfig {
            default_model: self.default_model.clone(),
            short_text_chars: self.short_text_chars,
            medium_text_chars: self.medium_text_chars,
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            output_path: None,
        }
    }

    /// Return a summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            default_model: self.default_model.clone(),
            translate_timeout_ms: self.translate_timeout.as_millis() as u64,
            generation_multiplier: self.limits.multiplier,
            min_new_tokens: self.limits.min_new_tokens,
            max_new_tokens: self.limits.max_new_tokens,
            short_text_chars: self.short_text_chars,
            medium_text_chars: self.medium_text_chars,
            persistent_state: self.state_path.is_some(),
            custom_catalog: self.catalog_path.is_some(),
            preload: self.preload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid cross-test pollution.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "LINGUA_DEFAULT_MODEL",
        "LINGUA_TRANSLATE_TIMEOUT_MS",
        "LINGUA_GENERATION_MULTIPLIER",
        "LINGUA_MIN_NEW_TOKENS",
        "LINGUA_MAX_NEW_TOKENS",
        "LINGUA_SHORT_TEXT_CHARS",
        "LINGUA_MEDIUM_TEXT_CHARS",
        "LINGUA_STATE_PATH",
        "LINGUA_CATALOG_PATH",
        "LINGUA_PRELOAD",
        "LINGUA_LOG_LEVEL",
        "LINGUA_LOG_FORMAT",
    ];

    fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        assert_eq!(cfg.default_model, "basic");
        assert_eq!(cfg.translate_timeout.as_millis(), 30_000);
        assert_eq!(cfg.limits, GenerationLimits::default());
        assert_eq!(cfg.short_text_chars, 100);
        assert_eq!(cfg.medium_text_chars, 500);
        assert!(cfg.state_path.is_none());
        assert!(cfg.catalog_path.is_none());
        assert!(cfg.preload.is_empty());
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.selector_config(), SelectorConfig::default());
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("LINGUA_DEFAULT_MODEL", "basic-fr-en");
        std::env::set_var("LINGUA_TRANSLATE_TIMEOUT_MS", "250");
        std::env::set_var("LINGUA_GENERATION_MULTIPLIER", "3");
        std::env::set_var("LINGUA_STATE_PATH", "/var/lib/lingua/models.json");
        std::env::set_var("LINGUA_LOG_FORMAT", "pretty");
        let cfg = load();
        assert_eq!(cfg.default_model, "basic-fr-en");
        assert_eq!(cfg.executor_config().default_deadline, Duration::from_millis(250));
        assert_eq!(cfg.limits.multiplier, 3);
        assert_eq!(
            cfg.state_path.as_deref(),
            Some(std::path::Path::new("/var/lib/lingua/models.json"))
        );
        assert_eq!(cfg.log_config().format, LogFormat::Pretty);
        clear_env_vars();
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("LINGUA_TRANSLATE_TIMEOUT_MS", "soon");
        std::env::set_var("LINGUA_MAX_NEW_TOKENS", "lots");
        std::env::set_var("LINGUA_LOG_FORMAT", "xml");
        let cfg = load();
        assert_eq!(cfg.translate_timeout.as_millis(), 30_000);
        assert_eq!(cfg.limits.max_new_tokens, 512);
        assert_eq!(cfg.log_format, LogFormat::Json);
        clear_env_vars();
    }

    #[test]
    fn test_values_are_clamped() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("LINGUA_TRANSLATE_TIMEOUT_MS", "0");
        std::env::set_var("LINGUA_GENERATION_MULTIPLIER", "100");
        std::env::set_var("LINGUA_MIN_NEW_TOKENS", "900");
        std::env::set_var("LINGUA_MAX_NEW_TOKENS", "64");
        std::env::set_var("LINGUA_SHORT_TEXT_CHARS", "300");
        std::env::set_var("LINGUA_MEDIUM_TEXT_CHARS", "50");
        let cfg = load();
        assert!(cfg.translate_timeout.as_millis() >= 10, "timeout must have floor");
        assert_eq!(cfg.limits.multiplier, 8);
        assert!(cfg.limits.min_new_tokens <= cfg.limits.max_new_tokens);
        assert!(cfg.medium_text_chars >= cfg.short_text_chars);
        clear_env_vars();
    }

    #[test]
    fn test_preload_list_is_trimmed_and_deduplicated() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("LINGUA_PRELOAD", " medium, premium ,,medium");
        let cfg = load();
        assert_eq!(cfg.preload, vec!["medium", "premium"]);
        assert_eq!(cfg.effective_config().preload.len(), 2);
        clear_env_vars();
    }
}
