//! Configuration loading for abridged.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.abridge/config.toml` (user)
//! 3. `/etc/abridge/config.toml` (system)
//!
//! When none exists the built-in defaults apply.
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.abridge/secrets.toml` (user, must be 0600)
//! 2. `/etc/abridge/secrets.toml` (system, must be 0600)

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::limiter::RateLimitConfig;
use crate::providers::RetryConfig;
use crate::types::RequestLimits;
use crate::{Result, SummaryError};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub store: StoreSection,
}

/// Server network and logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8000).
    #[serde(default = "default_address")]
    pub address: String,
    /// Default log filter when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Identify unauthenticated callers by `X-Forwarded-For` instead of the
    /// peer address. Enable only behind a trusted reverse proxy.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            trust_forwarded_for: false,
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Generative provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// OpenAI-compatible base URL (default: https://api.openai.com/v1).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-attempt timeout in milliseconds (default: 8000).
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
    /// Health probe timeout in milliseconds (default: 2000).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_ms: default_provider_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    crate::providers::openai::DEFAULT_MODEL.to_string()
}

fn default_provider_timeout_ms() -> u64 {
    8_000
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

/// Retry policy settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_true")]
    pub jitter: bool,
    /// Overall budget for all attempts, in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
            deadline_ms: None,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

/// Request bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    #[serde(default = "default_min_output_tokens")]
    pub min_output_tokens: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
            min_output_tokens: default_min_output_tokens(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_max_text_length() -> usize {
    50_000
}

fn default_min_output_tokens() -> u32 {
    10
}

fn default_max_output_tokens() -> u32 {
    1_000
}

/// Result cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    3_600
}

fn default_max_entries() -> u64 {
    10_000
}

/// Admission limit settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    #[serde(default = "default_requests")]
    pub requests: u64,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_requests() -> u64 {
    100
}

fn default_window_secs() -> u64 {
    60
}

/// Backing store for the cache and the limiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
    /// Cache and limiter disabled.
    None,
}

/// Store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Bound on each store operation, in milliseconds (default: 250).
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    /// Pause between Redis connect attempts while it is unreachable (default: 1000).
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            op_timeout_ms: default_op_timeout_ms(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_op_timeout_ms() -> u64 {
    250
}

fn default_reconnect_backoff_ms() -> u64 {
    1_000
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided, must exist)
    /// 2. `~/.abridge/config.toml`
    /// 3. `/etc/abridge/config.toml`
    ///
    /// Falls back to defaults when no file exists.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a specific config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SummaryError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            SummaryError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(SummaryError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".abridge").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/abridge/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn retry_config(&self) -> RetryConfig {
        let retry = &self.retry;
        let mut config = RetryConfig::new()
            .max_attempts(retry.max_attempts)
            .base_delay(Duration::from_millis(retry.base_delay_ms))
            .max_delay(Duration::from_millis(retry.max_delay_ms))
            .jitter(retry.jitter)
            .attempt_timeout(Duration::from_millis(self.provider.timeout_ms));
        if let Some(deadline) = retry.deadline_ms {
            config = config.deadline(Duration::from_millis(deadline));
        }
        config
    }

    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            max_text_length: self.limits.max_text_length,
            min_output_tokens: self.limits.min_output_tokens,
            max_output_tokens: self.limits.max_output_tokens,
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .ttl(Duration::from_secs(self.cache.ttl_secs))
            .max_entries(self.cache.max_entries)
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::new()
            .requests(self.rate_limit.requests)
            .window(Duration::from_secs(self.rate_limit.window_secs))
    }
}

/// Secrets configuration.
#[derive(Clone, Default, Deserialize)]
pub struct Secrets {
    /// Key for the generative provider.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// Bearer keys accepted by the HTTP API. Empty disables authentication.
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("api_keys", &self.api_keys.len())
            .finish()
    }
}

/// Environment fallback for the provider key.
const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment fallback for the API keys (comma separated).
const API_KEYS_ENV: &str = "ABRIDGE_API_KEYS";

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.abridge/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/abridge/secrets.toml` (if exists, must be 0600)
    ///
    /// Missing values fall back to `OPENAI_API_KEY` and `ABRIDGE_API_KEYS`.
    pub fn load() -> Result<Self> {
        let mut secrets = Self::load_file()?;
        secrets.apply_env(|name| std::env::var(name).ok());
        Ok(secrets)
    }

    fn load_file() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".abridge").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/abridge/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Parse a specific secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            SummaryError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            SummaryError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Fill values the file did not provide from the environment.
    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if self.openai_api_key.is_none() {
            self.openai_api_key = env(OPENAI_API_KEY_ENV).filter(|k| !k.trim().is_empty());
        }
        if self.api_keys.is_empty()
            && let Some(raw) = env(API_KEYS_ENV)
        {
            self.api_keys = raw
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            SummaryError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(SummaryError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }
}
