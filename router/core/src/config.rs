//! TOML Configuration File Support
//!
//! Loads [`RouterConfig`] from `~/.config/model-router/router.toml` with
//! environment overrides.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller)
//! 2. Environment variables (`MODEL_ROUTER_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/model-router/router.toml` (typically `~/.config/model-router/router.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [circuit_breaker]
//! enabled = true
//! failure_threshold = 5
//! recovery_timeout_ms = 60000
//!
//! [adaptive]
//! enabled = true
//! decay = 0.95
//!
//! [health_check]
//! interval_ms = 60000
//! timeout_ms = 10000
//!
//! [rate_limit]
//! enabled = true
//! requests_per_window = 100
//! window_ms = 60000
//!
//! [fallback]
//! intelligent = true
//! strategy = "reliability"
//!
//! [selection]
//! mode = "scored"
//!
//! [[models]]
//! id = "local-mistral"
//! display_name = "Mistral 7B (local)"
//! max_tokens = 32768
//! supports_vision = false
//! supports_streaming = true
//! avg_latency_ms = 400
//! cost_per_token = 0.0
//! quality_score = 0.7
//! medical_accuracy = 0.6
//! supported_complexity = ["simple", "moderate"]
//! supported_languages = ["en", "fr"]
//! tier = "economy"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::capabilities::{ModelCapabilities, ModelCapabilityRegistry};
use crate::routing::config::{FallbackStrategy, RouterConfig, SelectionMode};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Circuit breaker section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerToml {
    /// Whether breakers are consulted
    pub enabled: Option<bool>,
    /// Consecutive failures before opening
    pub failure_threshold: Option<u32>,
    /// Open-state cool-down in milliseconds
    pub recovery_timeout_ms: Option<u64>,
}

/// Adaptive learning section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveToml {
    /// Whether learned weights affect scoring
    pub enabled: Option<bool>,
    /// Weight smoothing factor
    pub decay: Option<f64>,
    /// Weight for unseen backends
    pub initial_weight: Option<f64>,
}

/// Health check section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckToml {
    /// Probe interval in milliseconds (0 disables probes)
    pub interval_ms: Option<u64>,
    /// Per-probe timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Rate limiting section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitToml {
    /// Whether requests are limited
    pub enabled: Option<bool>,
    /// Requests allowed per window and context
    pub requests_per_window: Option<u32>,
    /// Window length in milliseconds
    pub window_ms: Option<u64>,
}

/// Fallback section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackToml {
    /// Reorder fallbacks by strategy
    pub intelligent: Option<bool>,
    /// Fallback ordering
    pub strategy: Option<FallbackStrategy>,
    /// Fallbacks behind the primary
    pub max_fallbacks: Option<usize>,
}

/// Selection section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionToml {
    /// Rule-based or scored selection
    pub mode: Option<SelectionMode>,
    /// Rolling window per backend
    pub window_size: Option<usize>,
    /// Samples required before history counts
    pub min_samples: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterToml {
    /// `[circuit_breaker]`
    pub circuit_breaker: CircuitBreakerToml,
    /// `[adaptive]`
    pub adaptive: AdaptiveToml,
    /// `[health_check]`
    pub health_check: HealthCheckToml,
    /// `[rate_limit]`
    pub rate_limit: RateLimitToml,
    /// `[fallback]`
    pub fallback: FallbackToml,
    /// `[selection]`
    pub selection: SelectionToml,
    /// Extra or replacement backend descriptors
    pub models: Vec<ModelCapabilities>,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Router configuration plus where it came from
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct RouterSettings {
    /// Effective router configuration
    pub router: RouterConfig,

    /// Backend descriptors from the config file, layered over the defaults
    pub models: Vec<ModelCapabilities>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            models: Vec::new(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl RouterSettings {
    /// Create settings with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Default capability table with configured models registered on top
    #[must_use]
    pub fn registry(&self) -> ModelCapabilityRegistry {
        let mut registry = ModelCapabilityRegistry::with_defaults();
        for model in &self.models {
            registry.register(model.clone());
        }
        registry
    }

    /// Reject values the router cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let config = &self.router;
        if config.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "circuit_breaker.failure_threshold must be at least 1".to_string(),
            ));
        }
        if !(config.adaptive.decay > 0.0 && config.adaptive.decay < 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "adaptive.decay must be between 0 and 1 (exclusive), got {}",
                config.adaptive.decay
            )));
        }
        if config.rate_limit.requests_per_window == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.requests_per_window must be at least 1".to_string(),
            ));
        }
        if config.rate_limit.window_ms == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.window_ms must be at least 1".to_string(),
            ));
        }
        if config.health_check.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "health_check.timeout_ms must be at least 1".to_string(),
            ));
        }
        if config.performance.window_size == 0 {
            return Err(ConfigError::ValidationError(
                "selection.window_size must be at least 1".to_string(),
            ));
        }
        for model in &self.models {
            for (name, value) in [
                ("quality_score", model.quality_score),
                ("medical_accuracy", model.medical_accuracy),
            ] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::ValidationError(format!(
                        "model {}: {name} must be between 0 and 1, got {value}",
                        model.id
                    )));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/model-router/router.toml` or
/// `~/.config/model-router/router.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("model-router").join("router.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// resulting configuration fails validation. A missing config file is not an
/// error (defaults are used).
pub fn load_config() -> Result<RouterSettings, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if validation fails.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<RouterSettings, ConfigError> {
    let mut settings = RouterSettings::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: RouterToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut settings, toml_config);
            settings.config_file_path = Some(config_path.clone());
            settings.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut settings);
    settings.validate()?;

    Ok(settings)
}

/// Apply TOML configuration values to the settings
fn apply_toml_config(settings: &mut RouterSettings, toml: RouterToml) {
    let config = &mut settings.router;

    // Circuit breaker
    if let Some(enabled) = toml.circuit_breaker.enabled {
        config.circuit_breaker.enabled = enabled;
    }
    if let Some(threshold) = toml.circuit_breaker.failure_threshold {
        config.circuit_breaker.failure_threshold = threshold;
    }
    if let Some(timeout) = toml.circuit_breaker.recovery_timeout_ms {
        config.circuit_breaker.recovery_timeout_ms = timeout;
    }

    // Adaptive learning
    if let Some(enabled) = toml.adaptive.enabled {
        config.adaptive.enabled = enabled;
    }
    if let Some(decay) = toml.adaptive.decay {
        config.adaptive.decay = decay;
    }
    if let Some(weight) = toml.adaptive.initial_weight {
        config.adaptive.initial_weight = weight;
    }

    // Health checks
    if let Some(interval) = toml.health_check.interval_ms {
        config.health_check.interval_ms = interval;
    }
    if let Some(timeout) = toml.health_check.timeout_ms {
        config.health_check.timeout_ms = timeout;
    }

    // Rate limiting
    if let Some(enabled) = toml.rate_limit.enabled {
        config.rate_limit.enabled = enabled;
    }
    if let Some(limit) = toml.rate_limit.requests_per_window {
        config.rate_limit.requests_per_window = limit;
    }
    if let Some(window) = toml.rate_limit.window_ms {
        config.rate_limit.window_ms = window;
    }

    // Fallback
    if let Some(intelligent) = toml.fallback.intelligent {
        config.fallback.intelligent = intelligent;
    }
    if let Some(strategy) = toml.fallback.strategy {
        config.fallback.strategy = strategy;
    }
    if let Some(max) = toml.fallback.max_fallbacks {
        config.fallback.max_fallbacks = max;
    }

    // Selection
    if let Some(mode) = toml.selection.mode {
        config.selection = mode;
    }
    if let Some(size) = toml.selection.window_size {
        config.performance.window_size = size;
    }
    if let Some(min) = toml.selection.min_samples {
        config.performance.min_samples = min;
    }

    settings.models = toml.models;
}

fn env_flag(value: &str) -> bool {
    value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Apply environment variable overrides to the settings
fn apply_env_config(settings: &mut RouterSettings) {
    let config = &mut settings.router;
    let mut from_env = false;

    if let Ok(enabled) = std::env::var("MODEL_ROUTER_CIRCUIT_BREAKER") {
        config.circuit_breaker.enabled = env_flag(&enabled);
        from_env = true;
    }
    if let Ok(threshold) = std::env::var("MODEL_ROUTER_FAILURE_THRESHOLD") {
        if let Ok(n) = threshold.parse::<u32>() {
            config.circuit_breaker.failure_threshold = n;
            from_env = true;
        }
    }
    if let Ok(timeout) = std::env::var("MODEL_ROUTER_RECOVERY_TIMEOUT_MS") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.circuit_breaker.recovery_timeout_ms = ms;
            from_env = true;
        }
    }

    if let Ok(enabled) = std::env::var("MODEL_ROUTER_ADAPTIVE") {
        config.adaptive.enabled = env_flag(&enabled);
        from_env = true;
    }
    if let Ok(decay) = std::env::var("MODEL_ROUTER_ADAPTIVE_DECAY") {
        if let Ok(d) = decay.parse::<f64>() {
            config.adaptive.decay = d;
            from_env = true;
        }
    }

    if let Ok(interval) = std::env::var("MODEL_ROUTER_HEALTH_INTERVAL_MS") {
        if let Ok(ms) = interval.parse::<u64>() {
            config.health_check.interval_ms = ms;
            from_env = true;
        }
    }
    if let Ok(timeout) = std::env::var("MODEL_ROUTER_HEALTH_TIMEOUT_MS") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.health_check.timeout_ms = ms;
            from_env = true;
        }
    }

    if let Ok(enabled) = std::env::var("MODEL_ROUTER_RATE_LIMIT") {
        config.rate_limit.enabled = env_flag(&enabled);
        from_env = true;
    }
    if let Ok(limit) = std::env::var("MODEL_ROUTER_RATE_LIMIT_REQUESTS") {
        if let Ok(n) = limit.parse::<u32>() {
            config.rate_limit.requests_per_window = n;
            from_env = true;
        }
    }

    if let Ok(enabled) = std::env::var("MODEL_ROUTER_INTELLIGENT_FALLBACK") {
        config.fallback.intelligent = env_flag(&enabled);
        from_env = true;
    }
    if let Ok(strategy) = std::env::var("MODEL_ROUTER_FALLBACK_STRATEGY") {
        match strategy.parse::<FallbackStrategy>() {
            Ok(s) => {
                config.fallback.strategy = s;
                from_env = true;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring MODEL_ROUTER_FALLBACK_STRATEGY"),
        }
    }
    if let Ok(mode) = std::env::var("MODEL_ROUTER_SELECTION") {
        match mode.parse::<SelectionMode>() {
            Ok(m) => {
                config.selection = m;
                from_env = true;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring MODEL_ROUTER_SELECTION"),
        }
    }

    if from_env {
        settings.source = ConfigSource::Env;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::capabilities::ModelTier;
    use crate::routing::complexity::ComplexityCategory;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Serializes tests that read or write `MODEL_ROUTER_*` variables.
    static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    /// Holds the env lock with a clean environment; clears again on drop.
    struct EnvGuard {
        _lock: parking_lot::MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        fn new() -> Self {
            let lock = ENV_LOCK.lock();
            clear_config_env_vars();
            Self { _lock: lock }
        }

        fn set(&self, var: &str, value: &str) {
            std::env::set_var(var, value);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            clear_config_env_vars();
        }
    }

    /// Clean up all environment variables used by config loading.
    fn clear_config_env_vars() {
        for var in [
            "MODEL_ROUTER_CIRCUIT_BREAKER",
            "MODEL_ROUTER_FAILURE_THRESHOLD",
            "MODEL_ROUTER_RECOVERY_TIMEOUT_MS",
            "MODEL_ROUTER_ADAPTIVE",
            "MODEL_ROUTER_ADAPTIVE_DECAY",
            "MODEL_ROUTER_HEALTH_INTERVAL_MS",
            "MODEL_ROUTER_HEALTH_TIMEOUT_MS",
            "MODEL_ROUTER_RATE_LIMIT",
            "MODEL_ROUTER_RATE_LIMIT_REQUESTS",
            "MODEL_ROUTER_INTELLIGENT_FALLBACK",
            "MODEL_ROUTER_FALLBACK_STRATEGY",
            "MODEL_ROUTER_SELECTION",
        ] {
            std::env::remove_var(var);
        }
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().contains("model-router"));
            assert!(p.to_string_lossy().ends_with("router.toml"));
        }
    }

    #[test]
    fn test_parse_valid_toml() {
        let file = write_toml(
            r#"
[circuit_breaker]
failure_threshold = 3
recovery_timeout_ms = 30000

[adaptive]
decay = 0.9

[health_check]
interval_ms = 0

[rate_limit]
requests_per_window = 10

[fallback]
intelligent = false
strategy = "cost"

[selection]
mode = "rule_based"
min_samples = 2
"#,
        );

        let _env = EnvGuard::new();
        let settings = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
        let config = &settings.router;

        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.recovery_timeout_ms, 30_000);
        assert_eq!(config.adaptive.decay, 0.9);
        assert_eq!(config.health_check.interval(), None);
        assert_eq!(config.rate_limit.requests_per_window, 10);
        assert!(!config.fallback.intelligent);
        assert_eq!(config.fallback.strategy, FallbackStrategy::Cost);
        assert_eq!(config.selection, SelectionMode::RuleBased);
        assert_eq!(config.performance.min_samples, 2);
        assert_eq!(settings.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let file = write_toml(
            r#"
[rate_limit]
enabled = false
"#,
        );

        let _env = EnvGuard::new();
        let settings = load_config_from_path(Some(file.path().to_path_buf())).unwrap();

        assert!(!settings.router.rate_limit.enabled);
        assert_eq!(settings.router.rate_limit.window_ms, 60_000);
        assert_eq!(settings.router.fallback.max_fallbacks, 3);
    }

    #[test]
    fn test_models_extend_registry() {
        let file = write_toml(
            r#"
[[models]]
id = "local-mistral"
display_name = "Mistral 7B"
max_tokens = 32768
supports_vision = false
supports_streaming = true
avg_latency_ms = 400
cost_per_token = 0.0
quality_score = 0.7
medical_accuracy = 0.6
supported_complexity = ["simple", "moderate"]
supported_languages = ["en"]
tier = "economy"
"#,
        );

        let _env = EnvGuard::new();
        let settings = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
        let registry = settings.registry();

        assert_eq!(registry.len(), 7);
        let mistral = registry.get("local-mistral").unwrap();
        assert_eq!(mistral.tier, ModelTier::Economy);
        assert!(mistral.supports_complexity(ComplexityCategory::Moderate));
        assert!(!mistral.supports_complexity(ComplexityCategory::Complex));
    }

    #[test]
    fn test_missing_file_graceful() {
        let _env = EnvGuard::new();

        let path = PathBuf::from("/nonexistent/path/router.toml");
        let settings = load_config_from_path(Some(path)).unwrap();

        assert_eq!(settings.source(), ConfigSource::Default);
        assert!(settings.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = write_toml(
            r#"
[circuit_breaker
failure_threshold = "five"
"#,
        );

        let _env = EnvGuard::new();
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_rejects_zero_threshold() {
        let file = write_toml(
            r#"
[circuit_breaker]
failure_threshold = 0
"#,
        );

        let _env = EnvGuard::new();
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validation_rejects_bad_decay() {
        let mut settings = RouterSettings::new();
        settings.router.adaptive.decay = 1.0;
        assert!(settings.validate().is_err());

        settings.router.adaptive.decay = 0.0;
        assert!(settings.validate().is_err());

        settings.router.adaptive.decay = 0.5;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_rate_limit() {
        let mut settings = RouterSettings::new();
        settings.router.rate_limit.requests_per_window = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("requests_per_window"));
    }

    #[test]
    fn test_validation_rejects_zero_rate_window() {
        let mut settings = RouterSettings::new();
        settings.router.rate_limit.window_ms = 0;
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("window_ms"));
    }

    #[test]
    fn test_validation_rejects_zero_health_timeout() {
        let file = write_toml(
            r#"
[health_check]
timeout_ms = 0
"#,
        );

        let _env = EnvGuard::new();
        let err = load_config_from_path(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_toml(
            r#"
[health_check]
timeout_ms = 7000

[rate_limit]
requests_per_window = 10
"#,
        );

        let env = EnvGuard::new();
        env.set("MODEL_ROUTER_HEALTH_TIMEOUT_MS", "2000");
        let settings = load_config_from_path(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(settings.router.health_check.timeout_ms, 2000);
        assert_eq!(settings.router.rate_limit.requests_per_window, 10);
        assert_eq!(settings.source(), ConfigSource::Env);
    }

    #[test]
    fn test_env_overrides_defaults() {
        let env = EnvGuard::new();
        env.set("MODEL_ROUTER_FAILURE_THRESHOLD", "9");
        env.set("MODEL_ROUTER_ADAPTIVE", "false");
        env.set("MODEL_ROUTER_FALLBACK_STRATEGY", "reliability");
        env.set("MODEL_ROUTER_SELECTION", "rule-based");

        let settings = load_config_from_path(None).unwrap();
        let config = &settings.router;

        assert_eq!(config.circuit_breaker.failure_threshold, 9);
        assert!(!config.adaptive.enabled);
        assert_eq!(config.fallback.strategy, FallbackStrategy::Reliability);
        assert_eq!(config.selection, SelectionMode::RuleBased);
        assert_eq!(settings.source(), ConfigSource::Env);
    }

    #[test]
    fn test_invalid_env_value_is_ignored() {
        let env = EnvGuard::new();
        env.set("MODEL_ROUTER_RATE_LIMIT_REQUESTS", "lots");

        let settings = load_config_from_path(None).unwrap();

        assert_eq!(
            settings.router.rate_limit.requests_per_window,
            RouterConfig::default().rate_limit.requests_per_window
        );
        assert_eq!(settings.source(), ConfigSource::Default);
    }

    #[test]
    fn test_env_flag() {
        assert!(env_flag("1"));
        assert!(env_flag("true"));
        assert!(!env_flag("0"));
        assert!(!env_flag("FALSE"));
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::Cli), "CLI");
        assert_eq!(format!("{}", ConfigSource::Env), "environment");
        assert_eq!(format!("{}", ConfigSource::File), "config file");
        assert_eq!(format!("{}", ConfigSource::Default), "default");
    }

    #[test]
    fn test_config_error_display() {
        let read_err = ConfigError::ReadError {
            path: PathBuf::from("/test/path"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let msg = format!("{}", read_err);
        assert!(msg.contains("/test/path"));
        assert!(msg.contains("Failed to read"));
    }
}
