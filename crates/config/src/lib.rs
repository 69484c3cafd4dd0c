//! Configuration loading, validation, and management for chatforge.
//!
//! Loads configuration from `~/.chatforge/config.toml` with environment
//! variable overrides (`CHATFORGE_*`). Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
///
/// Maps directly to `~/.chatforge/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body, in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// "openai" or "mock".
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// "static" (token map) or "dev" (fixed principal, local only).
    #[serde(default = "default_auth_mode")]
    pub mode: String,

    /// token -> principal.
    #[serde(default)]
    pub tokens: HashMap<String, String>,

    #[serde(default = "default_dev_principal")]
    pub dev_principal: String,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}
fn default_max_rounds() -> u32 {
    5
}
fn default_tool_timeout() -> u64 {
    30
}
fn default_deadline() -> u64 {
    120
}
fn default_history_limit() -> usize {
    50
}
fn default_search_limit() -> usize {
    10
}
fn default_backend() -> String {
    "mock".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_retries() -> u32 {
    2
}
fn default_auth_mode() -> String {
    "dev".into()
}
fn default_dev_principal() -> String {
    "dev-user".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            tool_timeout_secs: default_tool_timeout(),
            deadline_secs: default_deadline(),
            history_limit: default_history_limit(),
            search_limit: default_search_limit(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_retries: default_retries(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            tokens: HashMap::new(),
            dev_principal: default_dev_principal(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("gateway", &self.gateway)
            .field("engine", &self.engine)
            .field("model", &self.model)
            .field("auth_mode", &self.auth.mode)
            .finish()
    }
}

impl AppConfig {
    /// Default config file path: `~/.chatforge/config.toml`, overridable
    /// via `CHATFORGE_CONFIG`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("CHATFORGE_CONFIG") {
            return PathBuf::from(path);
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        Path::new(&home).join(".chatforge").join("config.toml")
    }

    /// Load from the default path. A missing file yields defaults; env
    /// overrides apply either way.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CHATFORGE_HOST") {
            self.gateway.host = host;
        }
        if let Ok(port) = std::env::var("CHATFORGE_PORT") {
            if let Ok(port) = port.parse() {
                self.gateway.port = port;
            }
        }
        if let Ok(key) = std::env::var("CHATFORGE_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Ok(backend) = std::env::var("CHATFORGE_MODEL_BACKEND") {
            self.model.backend = backend;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.host.is_empty() {
            return Err(ConfigError::Invalid("gateway.host must not be empty".into()));
        }
        if self.engine.max_rounds == 0 {
            return Err(ConfigError::Invalid("engine.max_rounds must be at least 1".into()));
        }
        if self.engine.tool_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "engine.tool_timeout_secs must be at least 1".into(),
            ));
        }
        match self.model.backend.as_str() {
            "mock" => {}
            "openai" => {
                if self.model.api_key.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::Invalid(
                        "model.api_key is required for the openai backend".into(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown model.backend \"{other}\" (expected \"openai\" or \"mock\")"
                )));
            }
        }
        match self.auth.mode.as_str() {
            "dev" => {}
            "static" => {
                if self.auth.tokens.is_empty() {
                    return Err(ConfigError::Invalid(
                        "auth.tokens must not be empty in static mode".into(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown auth.mode \"{other}\" (expected \"static\" or \"dev\")"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.engine.max_rounds, 5);
        assert_eq!(config.engine.tool_timeout_secs, 30);
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [gateway]
            port = 9000

            [engine]
            max_rounds = 3

            [auth]
            mode = "static"
            tokens = { "tok-1" = "alice" }
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.engine.max_rounds, 3);
        assert_eq!(config.engine.deadline_secs, 120);
        assert_eq!(config.auth.tokens["tok-1"], "alice");
        config.validate().unwrap();
    }

    #[test]
    fn zero_rounds_is_invalid() {
        let mut config = AppConfig::default();
        config.engine.max_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn static_auth_requires_tokens() {
        let mut config = AppConfig::default();
        config.auth.mode = "static".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn openai_backend_requires_api_key() {
        let mut config = AppConfig::default();
        config.model.backend = "openai".into();
        assert!(config.validate().is_err());

        config.model.api_key = Some("sk-test".into());
        config.validate().unwrap();
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("sk-very-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gateway]\nport = 4242\n").unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.gateway.port, 4242);
    }
}
